//! Configuration file of the `homepage` binary

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`StorageConfig::path`]
pub const STORE_ENV: &str = "HOMEPAGE_STORE";

/// Default configuration file, read only when present
pub const DEFAULT_CONFIG_FILE: &str = "homepage.toml";

/// Contents of `homepage.toml`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `[storage]`
    pub storage: StorageConfig,
    /// `[principal]`
    pub principal: PrincipalConfig,
    /// `[log]`
    pub log: LogConfig,
}

/// Where the data store lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the namespaces
    pub path: PathBuf,
    /// Namespace of the app inside the file
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("homepage-store.json"),
            namespace: "home-page-app".to_string(),
        }
    }
}

/// Acting principal; migrations require the `ALL` authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrincipalConfig {
    /// Authorities granted to the principal
    pub authorities: Vec<String>,
}

impl Default for PrincipalConfig {
    fn default() -> Self {
        Self {
            authorities: vec!["ALL".to_string()],
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
    /// One JSON object per line instead of text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Read `path`; a missing file yields defaults unless `required`
    ///
    /// # Errors
    /// Unreadable or invalid TOML, or a missing required file
    pub fn load(path: &Path, required: bool) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::ensure!(!required, "config file {} not found", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Replace the store path when `store` is set
    #[must_use]
    pub fn with_store_override(mut self, store: Option<String>) -> Self {
        if let Some(path) = store.filter(|p| !p.is_empty()) {
            self.storage.path = PathBuf::from(path);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn missing_optional_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.toml"), false).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.storage.namespace, "home-page-app");
        assert_eq!(config.principal.authorities, vec!["ALL".to_string()]);
    }

    #[test]
    fn missing_required_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&dir.path().join("absent.toml"), true).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\npath = \"/tmp/store.json\"\n\n[log]\njson = true").unwrap();

        let config = AppConfig::load(file.path(), true).unwrap();

        assert_eq!(config.storage.path, PathBuf::from("/tmp/store.json"));
        assert_eq!(config.storage.namespace, "home-page-app");
        assert!(config.log.json);
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn invalid_toml_names_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage\npath = 3").unwrap();

        let err = AppConfig::load(file.path(), false).unwrap_err();
        assert!(err.to_string().contains("invalid config file"));
    }

    #[test]
    fn store_override_replaces_path() {
        let config = AppConfig::default().with_store_override(Some("other.json".into()));
        assert_eq!(config.storage.path, PathBuf::from("other.json"));

        let unchanged = AppConfig::default().with_store_override(Some(String::new()));
        assert_eq!(unchanged, AppConfig::default());
    }
}
