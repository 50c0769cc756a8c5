//! Cache kinds and their per-kind policy table

use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Logical category of cached data
///
/// Every kind has its own TTL, refresh threshold, size bound and version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheKind {
    /// The list of all courses
    Courses,

    /// A single course page, keyed by course code
    CourseDetail,

    /// The list of all instructors
    Instructors,

    /// A single instructor page
    InstructorDetail,

    /// Review lists for a course (optionally scoped to a user)
    Reviews,

    /// Aggregate statistics
    Stats,
}

impl CacheKind {
    /// All kinds, in table order
    pub const ALL: [CacheKind; 6] = [
        CacheKind::Courses,
        CacheKind::CourseDetail,
        CacheKind::Instructors,
        CacheKind::InstructorDetail,
        CacheKind::Reviews,
        CacheKind::Stats,
    ];

    /// Key prefix and display name
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Courses => "courses",
            CacheKind::CourseDetail => "courseDetail",
            CacheKind::Instructors => "instructors",
            CacheKind::InstructorDetail => "instructorDetail",
            CacheKind::Reviews => "reviews",
            CacheKind::Stats => "stats",
        }
    }

    /// Name used in environment variable overrides (`COURSE_DETAIL`, ...)
    pub fn env_name(&self) -> &'static str {
        match self {
            CacheKind::Courses => "COURSES",
            CacheKind::CourseDetail => "COURSE_DETAIL",
            CacheKind::Instructors => "INSTRUCTORS",
            CacheKind::InstructorDetail => "INSTRUCTOR_DETAIL",
            CacheKind::Reviews => "REVIEWS",
            CacheKind::Stats => "STATS",
        }
    }

    /// Built-in policy for this kind
    ///
    /// Lists change rarely and are read on every page, detail pages are high
    /// cardinality, reviews and stats move with every vote.
    pub fn default_config(&self) -> KindConfig {
        match self {
            CacheKind::Courses => KindConfig::new(Duration::from_secs(5 * 60))
                .with_refresh_threshold(0.7)
                .with_max_entries(10),
            CacheKind::CourseDetail => KindConfig::new(Duration::from_secs(10 * 60))
                .with_refresh_threshold(0.8)
                .with_max_entries(500),
            CacheKind::Instructors => KindConfig::new(Duration::from_secs(10 * 60))
                .with_refresh_threshold(0.7)
                .with_max_entries(10),
            CacheKind::InstructorDetail => KindConfig::new(Duration::from_secs(15 * 60))
                .with_refresh_threshold(0.8)
                .with_max_entries(300),
            CacheKind::Reviews => KindConfig::new(Duration::from_secs(2 * 60))
                .with_refresh_threshold(0.5)
                .with_max_entries(1_000),
            CacheKind::Stats => KindConfig::new(Duration::from_secs(60))
                .with_refresh_threshold(0.5)
                .with_max_entries(50),
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CacheKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CacheError::UnknownKind(s.to_string()))
    }
}

/// Longest TTL a kind may be configured with
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Policy applied to every entry of one kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindConfig {
    /// Time until an entry expires
    pub ttl: Duration,

    /// Whether aging hits schedule a background refresh
    pub background_refresh_enabled: bool,

    /// Elapsed fraction of the TTL at which a hit triggers a refresh, in (0, 1]
    pub background_refresh_threshold: f64,

    /// Soft cap on the number of entries of this kind
    pub max_entries: usize,

    /// Entries written under another version are treated as absent
    pub version: String,

    /// Random TTL variation (0.0 - 1.0) to spread expiry of bulk writes
    #[serde(default)]
    pub ttl_jitter: f64,
}

impl KindConfig {
    /// Policy with the given TTL and the default refresh/size settings
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            background_refresh_enabled: true,
            background_refresh_threshold: 0.8,
            max_entries: 100,
            version: "1".to_string(),
            ttl_jitter: 0.0,
        }
    }

    pub fn with_refresh_threshold(mut self, threshold: f64) -> Self {
        self.background_refresh_threshold = threshold;
        self
    }

    pub fn without_background_refresh(mut self) -> Self {
        self.background_refresh_enabled = false;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = jitter;
        self
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.ttl.is_zero() {
            return Err(CacheError::InvalidConfig("ttl must be greater than 0".to_string()));
        }

        if self.ttl > MAX_TTL {
            return Err(CacheError::InvalidConfig(format!(
                "ttl must be at most {} seconds",
                MAX_TTL.as_secs()
            )));
        }

        if self.max_entries == 0 {
            return Err(CacheError::InvalidConfig(
                "max_entries must be greater than 0".to_string(),
            ));
        }

        if !(self.background_refresh_threshold > 0.0 && self.background_refresh_threshold <= 1.0) {
            return Err(CacheError::InvalidConfig(
                "background_refresh_threshold must be in (0.0, 1.0]".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&self.ttl_jitter) {
            return Err(CacheError::InvalidConfig(
                "ttl_jitter must be in [0.0, 1.0)".to_string(),
            ));
        }

        Ok(())
    }

    /// Calculate actual TTL with jitter applied
    pub fn ttl_with_jitter(&self) -> Duration {
        if self.ttl_jitter == 0.0 {
            return self.ttl;
        }

        let base_secs = self.ttl.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;

        Duration::try_from_secs_f64((base_secs + jitter).max(0.001)).unwrap_or(self.ttl)
    }

    /// Whether an entry of age `elapsed` out of `ttl` is due for a refresh
    pub fn wants_refresh(&self, elapsed: Duration, ttl: Duration) -> bool {
        if !self.background_refresh_enabled || ttl.is_zero() {
            return false;
        }
        elapsed.as_secs_f64() / ttl.as_secs_f64() >= self.background_refresh_threshold
    }
}

/// Mapping from every kind to its policy
///
/// Always complete: kinds missing from a deserialized table fall back to
/// their built-in policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<CacheKind, KindConfig>", into = "BTreeMap<CacheKind, KindConfig>")]
pub struct KindTable {
    configs: BTreeMap<CacheKind, KindConfig>,
}

impl Default for KindTable {
    fn default() -> Self {
        Self {
            configs: CacheKind::ALL
                .iter()
                .map(|kind| (*kind, kind.default_config()))
                .collect(),
        }
    }
}

impl KindTable {
    /// Policy for a kind
    pub fn get(&self, kind: CacheKind) -> &KindConfig {
        // The table is filled for every kind on construction.
        &self.configs[&kind]
    }

    /// Replace the policy for a kind
    pub fn set(&mut self, kind: CacheKind, config: KindConfig) {
        self.configs.insert(kind, config);
    }

    pub fn get_mut(&mut self, kind: CacheKind) -> &mut KindConfig {
        self.configs
            .entry(kind)
            .or_insert_with(|| kind.default_config())
    }

    pub fn iter(&self) -> impl Iterator<Item = (CacheKind, &KindConfig)> {
        self.configs.iter().map(|(kind, config)| (*kind, config))
    }

    /// Validate every policy in the table
    pub fn validate(&self) -> Result<(), CacheError> {
        for (kind, config) in self.iter() {
            config
                .validate()
                .map_err(|e| CacheError::InvalidConfig(format!("{}: {}", kind, e)))?;
        }
        Ok(())
    }
}

impl From<BTreeMap<CacheKind, KindConfig>> for KindTable {
    fn from(overrides: BTreeMap<CacheKind, KindConfig>) -> Self {
        let mut table = KindTable::default();
        for (kind, config) in overrides {
            table.set(kind, config);
        }
        table
    }
}

impl From<KindTable> for BTreeMap<CacheKind, KindConfig> {
    fn from(table: KindTable) -> Self {
        table.configs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip_through_from_str() {
        for kind in CacheKind::ALL {
            assert_eq!(kind.as_str().parse::<CacheKind>().unwrap(), kind);
        }
        assert_eq!(format!("{}", CacheKind::CourseDetail), "courseDetail");
    }

    #[test]
    fn test_unknown_kind_fails_fast() {
        let err = "coursez".parse::<CacheKind>().unwrap_err();
        assert!(matches!(err, CacheError::UnknownKind(name) if name == "coursez"));
    }

    #[test]
    fn test_default_table_is_complete_and_valid() {
        let table = KindTable::default();
        assert_eq!(table.iter().count(), CacheKind::ALL.len());
        assert!(table.validate().is_ok());
        assert_eq!(table.get(CacheKind::Courses).ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_kind_config_validation() {
        assert!(KindConfig::new(Duration::from_secs(1)).validate().is_ok());

        let zero_max = KindConfig::new(Duration::from_secs(1)).with_max_entries(0);
        assert!(zero_max.validate().is_err());

        let zero_threshold = KindConfig::new(Duration::from_secs(1)).with_refresh_threshold(0.0);
        assert!(zero_threshold.validate().is_err());

        let full_threshold = KindConfig::new(Duration::from_secs(1)).with_refresh_threshold(1.0);
        assert!(full_threshold.validate().is_ok());

        let zero_ttl = KindConfig::new(Duration::ZERO);
        assert!(zero_ttl.validate().is_err());

        assert!(KindConfig::new(MAX_TTL).validate().is_ok());
        let huge_ttl = KindConfig::new(Duration::from_secs(u64::MAX));
        assert!(matches!(huge_ttl.validate(), Err(CacheError::InvalidConfig(_))));

        let bad_jitter = KindConfig::new(Duration::from_secs(1)).with_ttl_jitter(1.5);
        assert!(bad_jitter.validate().is_err());
    }

    #[test]
    fn test_wants_refresh_threshold() {
        let config = KindConfig::new(Duration::from_secs(300)).with_refresh_threshold(0.7);
        let ttl = config.ttl;

        assert!(!config.wants_refresh(Duration::from_secs(100), ttl));
        assert!(config.wants_refresh(Duration::from_secs(210), ttl));
        assert!(config.wants_refresh(Duration::from_secs(220), ttl));

        let disabled = config.clone().without_background_refresh();
        assert!(!disabled.wants_refresh(Duration::from_secs(299), ttl));
    }

    #[test]
    fn test_ttl_with_jitter() {
        let config = KindConfig::new(Duration::from_secs(3600)).with_ttl_jitter(0.1);

        let ttl = config.ttl_with_jitter();
        assert!(ttl.as_secs_f64() >= 3600.0 - 360.0);
        assert!(ttl.as_secs_f64() <= 3600.0 + 360.0);

        let exact = KindConfig::new(Duration::from_secs(3600));
        assert_eq!(exact.ttl_with_jitter(), Duration::from_secs(3600));
    }

    #[test]
    fn test_partial_table_deserializes_with_defaults() {
        let json = r#"{"stats": {"ttl": {"secs": 5, "nanos": 0},
            "background_refresh_enabled": false,
            "background_refresh_threshold": 0.5,
            "max_entries": 3,
            "version": "2"}}"#;
        let table: KindTable = serde_json::from_str(json).unwrap();

        assert_eq!(table.get(CacheKind::Stats).max_entries, 3);
        assert_eq!(table.get(CacheKind::Stats).version, "2");
        assert_eq!(table.get(CacheKind::Courses), &CacheKind::Courses.default_config());
    }
}
