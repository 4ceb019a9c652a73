//! Declarative configuration for a [`Context`](crate::context::Context).
//!
//! A `Config` is usually read from JSON:
//!
//! ```json
//! {
//!     "log_level": "debug",
//!     "module_filters": { "polycast::registry": "trace" },
//!     "lock_new_entities": false
//! }
//! ```
//!
//! Every field is optional.
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::log::{set_log_level, set_module_filters, warn, LevelFilter};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Global log level (`"off"`, `"error"`, ..., `"trace"`).
    pub log_level: Option<String>,
    /// Per-module log levels keyed by module path.
    pub module_filters: BTreeMap<String, String>,
    /// When set, entities created by the context start out locked.
    pub lock_new_entities: bool,
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Config> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)?;
        Config::from_json_str(&contents)
    }

    /// Installs the log level and module filters named by this configuration. Levels that do not
    /// parse are reported and skipped.
    pub fn apply_logging(&self) {
        if let Some(level) = &self.log_level {
            match level.parse::<LevelFilter>() {
                Ok(level) => set_log_level(level),
                Err(_) => warn!("ignoring unknown log level `{level}`"),
            }
        }

        let filters: Vec<(&str, LevelFilter)> = self
            .module_filters
            .iter()
            .filter_map(|(module, level)| match level.parse::<LevelFilter>() {
                Ok(level) => Some((module.as_str(), level)),
                Err(_) => {
                    warn!("ignoring unknown log level `{level}` for module `{module}`");
                    None
                }
            })
            .collect();
        if !filters.is_empty() {
            set_module_filters(filters);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolycastError;
    use std::io::Write;

    #[test]
    fn missing_fields_take_defaults() {
        let config = Config::from_json_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn reads_all_fields() {
        let config = Config::from_json_str(
            r#"{"log_level": "info", "module_filters": {"polycast::view": "debug"}, "lock_new_entities": true}"#,
        )
        .unwrap();
        assert_eq!(config.log_level.as_deref(), Some("info"));
        assert_eq!(
            config.module_filters.get("polycast::view").map(String::as_str),
            Some("debug")
        );
        assert!(config.lock_new_entities);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = Config::from_json_str(r#"{"colour": "blue"}"#);
        assert!(matches!(result, Err(PolycastError::JsonError(_))));
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"lock_new_entities": true}}"#).unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert!(config.lock_new_entities);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(PolycastError::IoError(_))));
    }

    #[test]
    fn apply_logging_skips_bad_levels() {
        let _guard = crate::log::tests::TEST_MUTEX
            .lock()
            .expect("Mutex poisoned");
        let config = Config {
            log_level: Some("loud".to_string()),
            ..Config::default()
        };
        config.apply_logging();
        assert_eq!(crate::log::log_level(), LevelFilter::Off);

        let config = Config {
            log_level: Some("warn".to_string()),
            module_filters: BTreeMap::from([("polycast::view".to_string(), "nope".to_string())]),
            ..Config::default()
        };
        config.apply_logging();
        assert_eq!(crate::log::log_level(), LevelFilter::Warn);
        crate::log::disable_logging();
    }
}
