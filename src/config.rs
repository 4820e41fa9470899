//! Runtime configuration.
//!
//! Values come from a TOML file, then `NIGHTLY_HISTORY_*` environment
//! variables, then command-line flags (applied by the binary). The resulting
//! `Config` is passed explicitly to the store and the refresh workflow.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::UtcOffset;

use crate::parse::ParserOptions;
use crate::parse::events::{DEFAULT_END_MARKER, DEFAULT_START_MARKER};
use crate::{HistoryError, HistoryResult};

/// Config file picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "nightly-history.toml";

pub const ENV_CHANNEL: &str = "NIGHTLY_HISTORY_CHANNEL";
pub const ENV_HISTORY_FILE: &str = "NIGHTLY_HISTORY_FILE";
pub const ENV_FEED_DIR: &str = "NIGHTLY_HISTORY_FEED_DIR";

/// Upper bound for `lookback_days`, about a century.
pub const MAX_LOOKBACK_DAYS: u32 = 36_500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Channel the nightly process posts to
    pub channel: String,
    /// JSON history file
    pub history_path: PathBuf,
    /// Directory holding exported channel-history pages
    pub feed_dir: PathBuf,
    /// How far back a refresh asks the feed for events
    pub lookback_days: u32,
    /// Offset used to assign sessions to calendar dates
    pub utc_offset_minutes: i32,
    pub start_marker: String,
    pub end_marker: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            channel: "nightly-batch".to_string(),
            history_path: PathBuf::from("workflow_history.json"),
            feed_dir: PathBuf::from("feed"),
            lookback_days: 90,
            utc_offset_minutes: 0,
            start_marker: DEFAULT_START_MARKER.to_string(),
            end_marker: DEFAULT_END_MARKER.to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> HistoryResult<Self> {
        toml::from_str(s).map_err(|e| HistoryError::Config(e.to_string()))
    }

    pub fn load_file(path: &Path) -> HistoryResult<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| HistoryError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&s)
            .map_err(|e| HistoryError::Config(format!("{}: {e}", path.display())))
    }

    /// Load from `explicit`, else from `DEFAULT_CONFIG_FILE` if present, else
    /// defaults; then apply environment overrides and validate.
    pub fn load(explicit: Option<&Path>) -> HistoryResult<Self> {
        let mut cfg = match explicit {
            Some(path) => Self::load_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_file(default_path)?
                } else {
                    Config::default()
                }
            }
        };
        cfg.apply_env_from(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply overrides from an environment lookup. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(channel) = get(ENV_CHANNEL) {
            self.channel = channel;
        }
        if let Some(path) = get(ENV_HISTORY_FILE) {
            self.history_path = PathBuf::from(path);
        }
        if let Some(dir) = get(ENV_FEED_DIR) {
            self.feed_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> HistoryResult<()> {
        if self.channel.trim().is_empty() {
            return Err(HistoryError::Config("channel must not be empty".to_string()));
        }
        if self.lookback_days == 0 {
            return Err(HistoryError::Config(
                "lookback_days must be greater than zero".to_string(),
            ));
        }
        if self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(HistoryError::Config(format!(
                "lookback_days must be at most {MAX_LOOKBACK_DAYS}, got {}",
                self.lookback_days
            )));
        }
        if self.start_marker.is_empty() || self.end_marker.is_empty() {
            return Err(HistoryError::Config(
                "session markers must not be empty".to_string(),
            ));
        }
        self.utc_offset()?;
        Ok(())
    }

    pub fn utc_offset(&self) -> HistoryResult<UtcOffset> {
        let minutes = self.utc_offset_minutes;
        if minutes.abs() >= 24 * 60 {
            return Err(HistoryError::Config(format!(
                "utc_offset_minutes out of range: {minutes}"
            )));
        }
        UtcOffset::from_whole_seconds(minutes * 60)
            .map_err(|e| HistoryError::Config(format!("invalid utc offset: {e}")))
    }

    pub fn parser_options(&self) -> HistoryResult<ParserOptions> {
        Ok(ParserOptions {
            start_marker: self.start_marker.clone(),
            end_marker: self.end_marker.clone(),
            utc_offset: self.utc_offset()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.lookback_days, 90);
        assert_eq!(cfg.history_path, PathBuf::from("workflow_history.json"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = Config::from_toml_str(
            r#"
channel = "etl-alerts"
utc_offset_minutes = -300
"#,
        )
        .unwrap();
        assert_eq!(cfg.channel, "etl-alerts");
        assert_eq!(cfg.utc_offset_minutes, -300);
        assert_eq!(cfg.lookback_days, 90);
        assert_eq!(cfg.start_marker, DEFAULT_START_MARKER);
        assert_eq!(cfg.utc_offset().unwrap(), UtcOffset::from_hms(-5, 0, 0).unwrap());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_toml_str("chanel = \"typo\"").unwrap_err();
        assert!(matches!(err, HistoryError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = Config::default();
        cfg.apply_env_from(|key| match key {
            ENV_CHANNEL => Some("ops".to_string()),
            ENV_HISTORY_FILE => Some("/data/history.json".to_string()),
            ENV_FEED_DIR => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(cfg.channel, "ops");
        assert_eq!(cfg.history_path, PathBuf::from("/data/history.json"));
        assert_eq!(cfg.feed_dir, PathBuf::from("feed"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = Config {
            lookback_days: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config::from_toml_str("lookback_days = 5000000").unwrap();
        assert!(cfg.validate().is_err());

        let cfg = Config {
            lookback_days: MAX_LOOKBACK_DAYS,
            ..Config::default()
        };
        assert!(cfg.validate().is_ok());

        let cfg = Config {
            utc_offset_minutes: 24 * 60,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            end_marker: String::new(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        std::fs::write(&path, "lookback_days = 7\n").unwrap();
        let cfg = Config::load_file(&path).unwrap();
        assert_eq!(cfg.lookback_days, 7);

        let missing = dir.path().join("missing.toml");
        assert!(Config::load_file(&missing).is_err());
    }
}
