//! Storage connection configuration

use crate::error::{Error, Result};
use dirs::home_dir;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration directory name
const CONFIG_DIR: &str = "bucket-upload";

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Connection settings for the S3-compatible store
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Custom endpoint; the provider default is used when absent
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,

    // Explicit keys; otherwise the standard credential chain applies
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,

    #[serde(default)]
    pub force_path_style: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

fn default_region() -> String {
    "auto".to_string()
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let home = home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR))
}

/// Get the configuration file path
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

/// Load configuration from a specific file
pub fn load_config_from(config_path: &Path) -> Result<ConfigFile> {
    if !config_path.exists() {
        return Err(Error::ConfigNotFound(config_path.to_path_buf()));
    }

    let content = fs::read_to_string(config_path).map_err(|e| {
        Error::InvalidConfig(format!("Failed to read config file: {}", e))
    })?;

    let config: ConfigFile = toml::from_str(&content).map_err(|e| {
        Error::InvalidConfig(format!("Failed to parse config file: {}", e))
    })?;

    Ok(config)
}

/// Load the explicit config file, else the default one if present, else defaults
pub fn load_config(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_config_from(path);
    }

    match get_config_path() {
        Ok(path) if path.exists() => load_config_from(&path),
        _ => Ok(ConfigFile::default()),
    }
}

/// Validate configuration
pub fn validate_config(config: &ConfigFile) -> Result<()> {
    let storage = &config.storage;

    if storage.region.trim().is_empty() {
        return Err(Error::InvalidInput("Region cannot be empty".to_string()));
    }

    if storage.access_key_id.is_some() != storage.secret_access_key.is_some() {
        return Err(Error::Config(
            "access_key_id and secret_access_key must be set together".to_string()
        ));
    }

    if let Some(endpoint) = &storage.endpoint {
        if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
            return Err(Error::InvalidInput(format!(
                "Endpoint must be an http(s) URL, got '{}'",
                endpoint
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_valid_config() -> ConfigFile {
        ConfigFile {
            storage: StorageConfig {
                endpoint: Some("https://storage.googleapis.com".to_string()),
                region: "auto".to_string(),
                access_key_id: Some("GOOG1EXAMPLE".to_string()),
                secret_access_key: Some("secret".to_string()),
                force_path_style: false,
            },
        }
    }

    #[test]
    fn test_validate_config_valid() {
        assert!(validate_config(&make_valid_config()).is_ok());
        assert!(validate_config(&ConfigFile::default()).is_ok());
    }

    #[test]
    fn test_validate_config_partial_keys() {
        let mut config = make_valid_config();
        config.storage.secret_access_key = None;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_empty_region() {
        let mut config = make_valid_config();
        config.storage.region = " ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_bad_endpoint() {
        let mut config = make_valid_config();
        config.storage.endpoint = Some("storage.googleapis.com".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[storage]\nendpoint = \"http://localhost:9000\"\nforce_path_style = true\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.storage.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.storage.region, "auto");
        assert!(config.storage.force_path_style);
    }

    #[test]
    fn test_load_config_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[storage\nregion = ").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(Error::InvalidConfig(_))));
    }
}
