//! App-level configuration for the Google provider.
//!
//! User-provided OAuth client credentials stored at:
//!   ~/.config/visual-planner/providers/google/app_config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Google OAuth client credentials (user-provided).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Loopback port the consent page redirects to.
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,
}

fn default_redirect_port() -> u16 {
    8085
}

pub fn base_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("visual-planner")
        .join("providers")
        .join("google"))
}

impl AppConfig {
    pub fn path() -> Result<PathBuf> {
        Ok(base_dir()?.join("app_config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Google credentials not found.\n\n\
                Create {} with:\n\n\
                client_id = \"your-client-id.apps.googleusercontent.com\"\n\
                client_secret = \"your-client-secret\"\n\n\
                See https://console.cloud.google.com/apis/credentials for setup.",
                path.display()
            );
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials from {}", path.display()))?;

        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials from {}", path.display()))?;

        if config.client_id.trim().is_empty() {
            anyhow::bail!("client_id is empty in {}", path.display());
        }

        Ok(config)
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.redirect_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_explain_setup() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load_from(&dir.path().join("app_config.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("client_id = "));
    }

    #[test]
    fn test_load_defaults_redirect_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app_config.toml");
        std::fs::write(&path, "client_id = \"abc\"\nclient_secret = \"shh\"\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.client_id, "abc");
        assert_eq!(config.redirect_uri(), "http://localhost:8085/callback");
    }
}
