//! The stored OAuth session (access + refresh token) for the Google account.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use planner_core::provider::AccessToken;
use serde::{Deserialize, Serialize};

use crate::app_config::base_dir;
use crate::types::TokenResponse;

/// Tokens are treated as expired this long before Google says they are.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl SessionData {
    /// Build from a token endpoint response. Google usually omits the
    /// refresh token on refresh, so the previous one is kept; the same goes
    /// for the scope list.
    pub fn from_response(response: TokenResponse, previous: Option<&SessionData>, requested: &[&str]) -> Self {
        let scopes = match response.scope {
            Some(scope) => scope.split_whitespace().map(String::from).collect(),
            None => match previous {
                Some(prev) if !prev.scopes.is_empty() => prev.scopes.clone(),
                _ => requested.iter().map(|s| s.to_string()).collect(),
            },
        };

        SessionData {
            access_token: response.access_token,
            refresh_token: response
                .refresh_token
                .filter(|t| !t.is_empty())
                .or_else(|| previous.and_then(|p| p.refresh_token.clone())),
            expires_at: Utc::now() + Duration::seconds(response.expires_in.unwrap_or(3600)),
            scopes,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }

    pub fn grants_all(&self, scopes: &[&str]) -> bool {
        scopes.iter().all(|s| self.scopes.iter().any(|g| g == s))
    }

    pub fn access_token(&self) -> AccessToken {
        AccessToken {
            token: self.access_token.clone(),
            scopes: self.scopes.clone(),
            expires_at: Some(self.expires_at),
        }
    }
}

/// Session file on disk.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        SessionStore { path }
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("session.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<SessionData>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path).with_context(|| {
            format!(
                "Failed to read Google OAuth session from {}",
                self.path.display()
            )
        })?;

        let data: SessionData = toml::from_str(&contents).with_context(|| {
            format!(
                "Failed to parse Google OAuth session from {}",
                self.path.display()
            )
        })?;

        Ok(Some(data))
    }

    pub fn save(&self, data: &SessionData) -> Result<()> {
        let contents = toml::to_string_pretty(data).context("Failed to serialize session")?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write session to {}", self.path.display()))?;

        // Owner-only, the file holds OAuth tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to set permissions on {}", self.path.display()))?;
        }

        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}
