//! Hub settings persistence via TOML.
//!
//! Settings are stored at `<config_dir>/quay/settings.toml`.
//! Missing or corrupted config files return sensible defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Operator-configurable settings for the hub process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Address the WebSocket listener binds.
    pub listen_addr: String,
    /// Directory holding the shared files.
    pub storage_dir: PathBuf,
    /// Maximum decoded upload size in bytes.
    pub max_file_size: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let storage_dir = directories::ProjectDirs::from("", "", "quay")
            .map(|d| d.data_dir().join("files"))
            .unwrap_or_else(|| PathBuf::from("quay-files"));

        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            storage_dir,
            max_file_size: quay_net::hub::DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Settings {
    /// Load settings from the default config path.
    ///
    /// Returns defaults if the file doesn't exist or is corrupted.
    pub fn load() -> Self {
        Self::load_from_dir(Self::config_dir())
    }

    /// Save settings to the default config path.
    pub fn save(&self) -> Result<()> {
        self.save_to_dir(Self::config_dir())
    }

    /// Load settings from a specific config directory.
    pub fn load_from_dir(config_dir: PathBuf) -> Self {
        let path = config_dir.join("settings.toml");
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => {
                    tracing::info!(path = %path.display(), "settings loaded");
                    settings
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "corrupted settings file, using defaults"
                    );
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %path.display(),
                    "settings file not found, using defaults"
                );
                Self::default()
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to read settings file, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Save settings to a specific config directory.
    pub fn save_to_dir(&self, config_dir: PathBuf) -> Result<()> {
        std::fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let path = config_dir.join("settings.toml");
        let contents = toml::to_string_pretty(self).context("failed to serialize settings")?;
        std::fs::write(&path, &contents)
            .with_context(|| format!("failed to write settings file: {}", path.display()))?;

        tracing::info!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Get the default config directory.
    fn config_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "quay")
            .map(|d| d.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("quay-config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert!(!settings.listen_addr.is_empty());
        assert!(!settings.storage_dir.as_os_str().is_empty());
        assert!(settings.max_file_size > 0);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let config_dir = tmp.path().to_path_buf();

        let settings = Settings {
            listen_addr: "127.0.0.1:9100".to_string(),
            storage_dir: PathBuf::from("/tmp/quay-test-files"),
            max_file_size: 1024 * 1024,
        };

        settings.save_to_dir(config_dir.clone()).unwrap();
        let loaded = Settings::load_from_dir(config_dir);

        assert_eq!(settings, loaded);
    }

    #[test]
    fn missing_config_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let config_dir = tmp.path().join("nonexistent");

        let loaded = Settings::load_from_dir(config_dir);
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn corrupted_config_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let config_dir = tmp.path().to_path_buf();

        std::fs::write(config_dir.join("settings.toml"), "{{{{not valid toml}}}}").unwrap();

        let loaded = Settings::load_from_dir(config_dir);
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn all_fields_serialize_correctly() {
        let settings = Settings {
            listen_addr: "0.0.0.0:4000".to_string(),
            storage_dir: PathBuf::from("/data/quay"),
            max_file_size: 42,
        };

        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let deserialized: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(settings, deserialized);

        assert!(toml_str.contains("listen_addr"));
        assert!(toml_str.contains("storage_dir"));
        assert!(toml_str.contains("max_file_size"));
    }
}
