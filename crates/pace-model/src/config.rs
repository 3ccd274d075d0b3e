use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default upper bound on pages fetched per run (max breadth).
pub const DEFAULT_MAX_PAGES: u32 = 5000;
/// Default crawl depth bound.
pub const DEFAULT_MAX_DEPTH: u32 = 5;
/// Default pause between two consecutive runs in repeat mode.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(3600);

/// Per-process run configuration.
///
/// Built once from CLI/environment input and never mutated afterwards; the
/// isolated worker receives an identical copy through the payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Target identifier (URL or job name).
    pub target: String,
    /// Max breadth: pages fetched per run.
    pub max_pages: u32,
    /// Max depth of the crawl.
    pub max_depth: u32,
    /// Remove local artifacts once the upload succeeded.
    pub remove_local_files: bool,
    /// Destination store name.
    pub bucket: String,
    /// Skip objects already present at the destination.
    #[serde(default = "enabled")]
    pub skip_existing: bool,
    /// Ask the collaborator to bypass its HTTP cache.
    #[serde(default = "enabled")]
    pub force_fresh_crawl: bool,
    /// Keep running until stopped instead of running once.
    pub repeat: bool,
    /// Pause between two runs.
    #[serde(rename = "wait_interval_secs", with = "duration_secs")]
    pub wait_interval: Duration,
}

fn enabled() -> bool {
    true
}

impl RunConfig {
    /// Creates a one-shot configuration with default bounds.
    pub fn new(target: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            max_pages: DEFAULT_MAX_PAGES,
            max_depth: DEFAULT_MAX_DEPTH,
            remove_local_files: true,
            bucket: bucket.into(),
            skip_existing: true,
            force_fresh_crawl: true,
            repeat: false,
            wait_interval: DEFAULT_WAIT_INTERVAL,
        }
    }

    pub fn with_bounds(mut self, max_pages: u32, max_depth: u32) -> Self {
        self.max_pages = max_pages;
        self.max_depth = max_depth;
        self
    }

    pub fn with_repeat(mut self, wait_interval: Duration) -> Self {
        self.repeat = true;
        self.wait_interval = wait_interval;
        self
    }

    pub fn with_remove_local_files(mut self, remove: bool) -> Self {
        self.remove_local_files = remove;
        self
    }

    /// Checks the invariants the rest of the runtime relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.trim().is_empty() {
            return Err(ConfigError::EmptyTarget);
        }
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::EmptyBucket);
        }
        if self.max_pages == 0 {
            return Err(ConfigError::ZeroBound { field: "max_pages" });
        }
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroBound { field: "max_depth" });
        }
        if self.repeat && self.wait_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_defaults() {
        let cfg = RunConfig::new("https://example.com", "bucket");
        assert_eq!(cfg.max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(cfg.max_depth, DEFAULT_MAX_DEPTH);
        assert!(cfg.remove_local_files);
        assert!(!cfg.repeat);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_target_and_bucket() {
        let cfg = RunConfig::new("  ", "bucket");
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyTarget)));

        let cfg = RunConfig::new("https://example.com", "");
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyBucket)));
    }

    #[test]
    fn validate_rejects_zero_bounds() {
        let cfg = RunConfig::new("t", "b").with_bounds(0, 5);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroBound { field: "max_pages" })
        ));

        let cfg = RunConfig::new("t", "b").with_bounds(5, 0);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroBound { field: "max_depth" })
        ));
    }

    #[test]
    fn zero_interval_only_matters_in_repeat_mode() {
        let mut once = RunConfig::new("t", "b");
        once.wait_interval = Duration::ZERO;
        assert!(once.validate().is_ok());

        let repeat = RunConfig::new("t", "b").with_repeat(Duration::ZERO);
        assert!(matches!(repeat.validate(), Err(ConfigError::ZeroInterval)));
    }

    #[test]
    fn wait_interval_is_serialized_as_seconds() {
        let cfg = RunConfig::new("t", "b").with_repeat(Duration::from_secs(90));
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["wait_interval_secs"], 90);
        assert!(json.get("wait_interval").is_none());
    }

    #[test]
    fn missing_pass_through_flags_default_to_enabled() {
        let json = r#"{
            "target": "t", "max_pages": 1, "max_depth": 1,
            "remove_local_files": false, "bucket": "b",
            "repeat": false, "wait_interval_secs": 10
        }"#;
        let cfg: RunConfig = serde_json::from_str(json).unwrap();
        assert!(cfg.skip_existing);
        assert!(cfg.force_fresh_crawl);
        assert_eq!(cfg.wait_interval, Duration::from_secs(10));
    }
}
