//! Config file loading.

use crate::error::ConfigError;
use crate::model::MuseConfig;
use log::debug;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "muse.json5";

impl MuseConfig {
    /// Load config from an explicit path, or from `muse.json5` in the
    /// working directory when present, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_file(default_path)?
                } else {
                    debug!("no config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and decode one config file.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("loading config (path={})", path.display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::MuseConfig;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn file_values_override_defaults() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("muse.json5");
        std::fs::write(
            &path,
            r#"{
                // project overrides
                memory: { max_size: 10 },
                models: { creator: "sonar-pro" },
            }"#,
        )
        .expect("write config");

        let config = MuseConfig::load(Some(&path)).expect("load");
        assert_eq!(config.memory.max_size, 10);
        assert_eq!(config.models.creator, "sonar-pro");
        // Untouched sections keep their defaults.
        assert_eq!(config.memory.recall_k, 5);
        assert_eq!(config.models.feedback, "llama-3-sonar-large-32k-chat");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("muse.json5");
        std::fs::write(&path, r#"{ memory: { max_size: 0 } }"#).expect("write config");
        assert!(MuseConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("muse.json5");
        std::fs::write(&path, "{ not valid").expect("write config");
        assert!(MuseConfig::load(Some(&path)).is_err());
    }
}
