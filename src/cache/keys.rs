//! Key construction helpers
//!
//! Keys take the form `<kind>:<id>[:<part>...]`, e.g. `courseDetail:CS101`
//! or `reviews:CS101:user42`.

use crate::cache::kind::CacheKind;
use crate::cache::types::CacheKey;

/// Cache key builder scoped to one kind
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    kind: CacheKind,
    identifier: String,
    parts: Vec<String>,
}

impl CacheKeyBuilder {
    /// Create a new cache key builder
    pub fn new(kind: CacheKind) -> Self {
        Self {
            kind,
            identifier: String::new(),
            parts: Vec::new(),
        }
    }

    /// Set the primary identifier
    pub fn identifier(mut self, id: impl Into<String>) -> Self {
        self.identifier = id.into();
        self
    }

    /// Append a further discriminator
    pub fn part(mut self, part: impl Into<String>) -> Self {
        self.parts.push(part.into());
        self
    }

    /// Append a discriminator only when present
    pub fn part_opt(self, part: Option<impl Into<String>>) -> Self {
        match part {
            Some(part) => self.part(part),
            None => self,
        }
    }

    /// Build the cache key
    pub fn build(self) -> CacheKey {
        let mut key = format!("{}:{}", self.kind, self.identifier);
        for part in &self.parts {
            key.push(':');
            key.push_str(part);
        }
        key
    }
}

/// `courses:all`
pub fn all_courses() -> CacheKey {
    CacheKeyBuilder::new(CacheKind::Courses).identifier("all").build()
}

/// `courseDetail:<code>`
pub fn course_detail(code: &str) -> CacheKey {
    CacheKeyBuilder::new(CacheKind::CourseDetail).identifier(code).build()
}

/// `instructors:all`
pub fn all_instructors() -> CacheKey {
    CacheKeyBuilder::new(CacheKind::Instructors).identifier("all").build()
}

/// `instructorDetail:<id>`
pub fn instructor_detail(id: &str) -> CacheKey {
    CacheKeyBuilder::new(CacheKind::InstructorDetail).identifier(id).build()
}

/// `reviews:<code>` or `reviews:<code>:<user>` when scoped to a viewer
pub fn course_reviews(code: &str, user_id: Option<&str>) -> CacheKey {
    CacheKeyBuilder::new(CacheKind::Reviews)
        .identifier(code)
        .part_opt(user_id)
        .build()
}

/// `stats:<scope>`
pub fn stats(scope: &str) -> CacheKey {
    CacheKeyBuilder::new(CacheKind::Stats).identifier(scope).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_builder() {
        let key = CacheKeyBuilder::new(CacheKind::CourseDetail)
            .identifier("CS101")
            .build();
        assert_eq!(key, "courseDetail:CS101");

        let key = CacheKeyBuilder::new(CacheKind::Reviews)
            .identifier("CS101")
            .part("user42")
            .build();
        assert_eq!(key, "reviews:CS101:user42");
    }

    #[test]
    fn test_helper_keys() {
        assert_eq!(all_courses(), "courses:all");
        assert_eq!(course_detail("MATH200"), "courseDetail:MATH200");
        assert_eq!(all_instructors(), "instructors:all");
        assert_eq!(instructor_detail("42"), "instructorDetail:42");
        assert_eq!(course_reviews("CS101", None), "reviews:CS101");
        assert_eq!(course_reviews("CS101", Some("user42")), "reviews:CS101:user42");
        assert_eq!(stats("global"), "stats:global");
    }
}
