//! Application configuration loaded from TOML.
//!
//! ```toml
//! default_profile = "default"
//! default_region = "eu-west-1"
//! log_filter = "sonar=debug"
//!
//! [[profiles]]
//! name = "localstack"
//! region = "us-east-1"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SonarError;

/// Profile used when none is configured.
pub const DEFAULT_PROFILE: &str = "default";

/// Region used when neither the profile nor the config names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Endpoint for profiles whose name starts with `local`.
pub const LOCAL_ENDPOINT: &str = "http://localhost:4566";

/// Name of the config file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonarConfig {
    pub default_profile: String,
    pub default_region: String,
    /// Tracing filter directive, e.g. `sonar=debug`.
    pub log_filter: Option<String>,
    pub profiles: Vec<ProfileConfig>,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            default_profile: DEFAULT_PROFILE.to_string(),
            default_region: DEFAULT_REGION.to_string(),
            log_filter: None,
            profiles: Vec::new(),
        }
    }
}

/// Per-profile overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// A profile with every setting filled in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedProfile {
    pub name: String,
    pub region: String,
    pub endpoint_url: Option<String>,
}

impl ResolvedProfile {
    /// Key under which clients for this profile are cached.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.name, self.region)
    }
}

impl SonarConfig {
    /// Load the config.
    ///
    /// An explicit path must exist. Without one, `<data_dir>/config.toml` is
    /// read if present and defaults are used otherwise.
    pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<Self, SonarError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let path = data_dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            return Self::from_file(&path);
        }

        tracing::debug!(path = %path.display(), "No config file, using defaults");
        Ok(Self::default())
    }

    /// Read and parse one config file.
    pub fn from_file(path: &Path) -> Result<Self, SonarError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SonarError::config(format!("Failed to read config file '{}': {e}", path.display()))
        })?;
        let config = Self::parse(&content).map_err(|e| {
            SonarError::config(format!("Failed to parse config file '{}': {}", path.display(), e.message()))
        })?;
        tracing::info!(path = %path.display(), profiles = config.profiles.len(), "Config loaded");
        Ok(config)
    }

    /// Parse config text.
    pub fn parse(content: &str) -> Result<Self, SonarError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), SonarError> {
        if self.default_region.trim().is_empty() {
            return Err(SonarError::config("default_region must not be empty"));
        }
        if let Some(p) = self.profiles.iter().find(|p| p.name.trim().is_empty()) {
            return Err(SonarError::config(format!(
                "profile names must not be empty (region {:?})",
                p.region
            )));
        }
        Ok(())
    }

    /// Fill in region and endpoint for a profile.
    ///
    /// `profile` and `region` override the config when given.
    pub fn resolve_profile(&self, profile: Option<&str>, region: Option<&str>) -> ResolvedProfile {
        let name = profile.unwrap_or(&self.default_profile).to_string();
        let entry = self.profiles.iter().find(|p| p.name == name);

        let region = region
            .map(String::from)
            .or_else(|| entry.and_then(|p| p.region.clone()))
            .unwrap_or_else(|| self.default_region.clone());

        let endpoint_url = entry
            .and_then(|p| p.endpoint_url.clone())
            .or_else(|| name.starts_with("local").then(|| LOCAL_ENDPOINT.to_string()));

        ResolvedProfile { name, region, endpoint_url }
    }

    /// Names of the profiles listed in the config file.
    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Default location of the config file.
pub fn default_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = SonarConfig::parse("").unwrap();
        assert_eq!(config, SonarConfig::default());
        assert_eq!(config.default_profile, "default");
        assert_eq!(config.default_region, "us-east-1");
    }

    #[test]
    fn test_profile_resolution() {
        let config = SonarConfig::parse(
            r#"
            default_profile = "prod"
            default_region = "eu-west-1"

            [[profiles]]
            name = "prod"
            region = "eu-central-1"

            [[profiles]]
            name = "local-dev"
            "#,
        )
        .unwrap();

        let prod = config.resolve_profile(None, None);
        assert_eq!(prod.name, "prod");
        assert_eq!(prod.region, "eu-central-1");
        assert_eq!(prod.endpoint_url, None);
        assert_eq!(prod.cache_key(), "prod:eu-central-1");

        let overridden = config.resolve_profile(Some("prod"), Some("us-west-2"));
        assert_eq!(overridden.region, "us-west-2");

        let local = config.resolve_profile(Some("local-dev"), None);
        assert_eq!(local.region, "eu-west-1");
        assert_eq!(local.endpoint_url.as_deref(), Some(LOCAL_ENDPOINT));

        let unknown = config.resolve_profile(Some("staging"), None);
        assert_eq!(unknown.region, "eu-west-1");
        assert_eq!(unknown.endpoint_url, None);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = SonarConfig::parse("default_region = \"\"").unwrap_err();
        assert_eq!(err.category(), "Config");
        assert!(SonarConfig::parse("profiles = 3").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(SonarConfig::load(Some(&missing), dir.path()).is_err());

        let defaults = SonarConfig::load(None, dir.path()).unwrap();
        assert_eq!(defaults, SonarConfig::default());
    }
}
