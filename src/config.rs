// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Writer configuration.

use crate::error::{Result, WriterError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of records per flush.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default upper bound on how long a partial batch is held.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Append-only target file.
    pub file_path: PathBuf,
    /// Maximum records per write. Must be > 0.
    pub batch_size: usize,
    /// Maximum wait before a partial batch is forced out. Must be > 0.
    #[serde(rename = "flush_interval_ms", with = "millis")]
    pub flush_interval: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from("events.log"),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

impl WriterConfig {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Parse a JSON document, e.g.
    /// `{"file_path": "app.log", "batch_size": 10, "flush_interval_ms": 250}`.
    /// Missing fields fall back to the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| WriterError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(WriterError::InvalidConfig("batch_size must be > 0".into()));
        }
        if self.flush_interval.is_zero() {
            return Err(WriterError::InvalidConfig(
                "flush_interval must be > 0".into(),
            ));
        }
        if self.file_path.as_os_str().is_empty() {
            return Err(WriterError::InvalidConfig("file_path is empty".into()));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = WriterConfig::default();
        assert_eq!(cfg.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(cfg.flush_interval, Duration::from_secs(1));
        cfg.validate().unwrap();
    }

    #[test]
    fn test_zero_values_rejected() {
        let cfg = WriterConfig::new("x.log").batch_size(0);
        assert!(matches!(cfg.validate(), Err(WriterError::InvalidConfig(_))));

        let cfg = WriterConfig::new("x.log").flush_interval(Duration::ZERO);
        assert!(matches!(cfg.validate(), Err(WriterError::InvalidConfig(_))));

        let cfg = WriterConfig::new("");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_json() {
        let cfg = WriterConfig::from_json(
            r#"{"file_path": "app.log", "batch_size": 10, "flush_interval_ms": 250}"#,
        )
        .unwrap();
        assert_eq!(cfg.file_path, PathBuf::from("app.log"));
        assert_eq!(cfg.batch_size, 10);
        assert_eq!(cfg.flush_interval, Duration::from_millis(250));

        // Partial documents keep defaults
        let cfg = WriterConfig::from_json(r#"{"file_path": "b.log"}"#).unwrap();
        assert_eq!(cfg.batch_size, DEFAULT_BATCH_SIZE);

        assert!(WriterConfig::from_json(r#"{"batch_size": 0}"#).is_err());
        assert!(WriterConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_json_uses_millis() {
        let cfg = WriterConfig::new("a.log").flush_interval(Duration::from_millis(1500));
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains(r#""flush_interval_ms":1500"#));
    }
}
