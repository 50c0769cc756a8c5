//! Configuration for the cache system

use crate::cache::kind::{CacheKind, KindConfig, KindTable, MAX_TTL};
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Prefix for every environment override
pub const ENV_PREFIX: &str = "REVIEW_CACHE";

/// Configuration for the kind cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Interval between janitor sweeps of expired entries
    pub janitor_interval: Duration,

    /// Whether `start_janitor` should spawn the sweep task at all
    pub enable_janitor: bool,

    /// Per-kind policy table
    #[serde(default)]
    pub kinds: KindTable,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            // Sweep every minute
            janitor_interval: Duration::from_secs(60),
            enable_janitor: true,
            kinds: KindTable::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Policy for a kind
    pub fn kind(&self, kind: CacheKind) -> &KindConfig {
        self.kinds.get(kind)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.janitor_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "janitor_interval must be greater than 0".to_string(),
            ));
        }

        if self.janitor_interval > MAX_TTL {
            return Err(CacheError::InvalidConfig(format!(
                "janitor_interval must be at most {} seconds",
                MAX_TTL.as_secs()
            )));
        }

        self.kinds.validate()
    }

    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: CacheConfig = serde_json::from_str(json)
            .map_err(|e| CacheError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults overridden by `REVIEW_CACHE_*` environment variables
    ///
    /// A `.env` file in the working directory is honored when present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`CacheConfig::from_env`] with an explicit variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = CacheConfig::default();

        if let Some(secs) = parse_var::<u64, _>(&lookup, "JANITOR_INTERVAL_SECS")? {
            config.janitor_interval = Duration::from_secs(secs);
        }
        if let Some(enabled) = parse_var::<bool, _>(&lookup, "ENABLE_JANITOR")? {
            config.enable_janitor = enabled;
        }

        for kind in CacheKind::ALL {
            let policy = config.kinds.get_mut(kind);
            let ttl_var = format!("{}_TTL_SECS", kind.env_name());
            if let Some(secs) = parse_var::<u64, _>(&lookup, &ttl_var)? {
                policy.ttl = Duration::from_secs(secs);
            }
            let max_var = format!("{}_MAX_ENTRIES", kind.env_name());
            if let Some(max) = parse_var::<usize, _>(&lookup, &max_var)? {
                policy.max_entries = max;
            }
        }

        config.validate()?;
        debug!("Loaded cache config from environment: {:?}", config);
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, suffix: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let name = format!("{}_{}", ENV_PREFIX, suffix);
    match lookup(&name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CacheError::InvalidConfig(format!("{}={}: {}", name, raw, e))),
    }
}

/// Builder for cache configuration with validation
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    janitor_interval: Option<Duration>,
    enable_janitor: Option<bool>,
    kinds: Vec<(CacheKind, KindConfig)>,
}

impl CacheConfigBuilder {
    /// Set the janitor sweep interval
    pub fn janitor_interval(mut self, interval: Duration) -> Self {
        self.janitor_interval = Some(interval);
        self
    }

    /// Enable or disable the janitor
    pub fn enable_janitor(mut self, enable: bool) -> Self {
        self.enable_janitor = Some(enable);
        self
    }

    /// Override the policy of one kind
    pub fn kind(mut self, kind: CacheKind, config: KindConfig) -> Self {
        self.kinds.push((kind, config));
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        let mut kinds = defaults.kinds;
        for (kind, config) in self.kinds {
            kinds.set(kind, config);
        }

        CacheConfig {
            janitor_interval: self.janitor_interval.unwrap_or(defaults.janitor_interval),
            enable_janitor: self.enable_janitor.unwrap_or(defaults.enable_janitor),
            kinds,
        }
    }

    /// Build and validate the cache configuration
    pub fn try_build(self) -> Result<CacheConfig> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.janitor_interval, Duration::from_secs(60));
        assert!(config.enable_janitor);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::builder()
            .janitor_interval(Duration::from_secs(5))
            .kind(
                CacheKind::Courses,
                KindConfig::new(Duration::from_secs(300)).with_max_entries(1),
            )
            .build();

        assert_eq!(config.janitor_interval, Duration::from_secs(5));
        assert_eq!(config.kind(CacheKind::Courses).max_entries, 1);
        assert_eq!(
            config.kind(CacheKind::Reviews),
            &CacheKind::Reviews.default_config()
        );
    }

    #[test]
    fn test_config_validation() {
        let invalid = CacheConfig::builder()
            .janitor_interval(Duration::ZERO)
            .try_build();
        assert!(invalid.is_err());

        let invalid = CacheConfig::builder()
            .janitor_interval(Duration::from_secs(u64::MAX))
            .try_build();
        assert!(invalid.is_err());

        let invalid = CacheConfig::builder()
            .kind(
                CacheKind::Stats,
                KindConfig::new(Duration::from_secs(1)).with_max_entries(0),
            )
            .try_build();
        assert!(matches!(invalid, Err(CacheError::InvalidConfig(msg)) if msg.starts_with("stats")));
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("REVIEW_CACHE_JANITOR_INTERVAL_SECS", "15"),
            ("REVIEW_CACHE_ENABLE_JANITOR", "false"),
            ("REVIEW_CACHE_COURSE_DETAIL_TTL_SECS", "42"),
            ("REVIEW_CACHE_REVIEWS_MAX_ENTRIES", "7"),
        ]
        .into_iter()
        .collect();

        let config =
            CacheConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(config.janitor_interval, Duration::from_secs(15));
        assert!(!config.enable_janitor);
        assert_eq!(config.kind(CacheKind::CourseDetail).ttl, Duration::from_secs(42));
        assert_eq!(config.kind(CacheKind::Reviews).max_entries, 7);
    }

    #[test]
    fn test_config_from_lookup_rejects_garbage() {
        let result = CacheConfig::from_lookup(|name| {
            (name == "REVIEW_CACHE_STATS_MAX_ENTRIES").then(|| "lots".to_string())
        });
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));

        let result = CacheConfig::from_lookup(|name| {
            (name == "REVIEW_CACHE_STATS_MAX_ENTRIES").then(|| "0".to_string())
        });
        assert!(result.is_err());

        let result = CacheConfig::from_lookup(|name| {
            (name == "REVIEW_CACHE_STATS_TTL_SECS").then(|| u64::MAX.to_string())
        });
        assert!(matches!(result, Err(CacheError::InvalidConfig(msg)) if msg.starts_with("stats")));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "janitor_interval": {"secs": 30, "nanos": 0},
            "enable_janitor": true
        }"#;
        let config = CacheConfig::from_json(json).unwrap();

        assert_eq!(config.janitor_interval, Duration::from_secs(30));
        assert_eq!(config.kinds, KindTable::default());

        assert!(CacheConfig::from_json("{").is_err());
    }
}
