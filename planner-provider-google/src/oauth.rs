//! OAuth authorization against Google's endpoints.
//!
//! Silent requests reuse or refresh the stored session. Interactive requests
//! refresh when possible and otherwise run the loopback consent flow: open
//! the consent page, wait for the redirect on localhost, exchange the code.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use planner_core::error::{PlannerError, PlannerResult};
use planner_core::provider::{AccessToken, Authorizer};
use reqwest::Client;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

use crate::app_config::AppConfig;
use crate::session::{SessionData, SessionStore};
use crate::types::TokenResponse;

#[derive(Debug, Clone)]
pub struct OAuthEndpoints {
    pub authorize: String,
    pub token: String,
    pub revoke: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        OAuthEndpoints {
            authorize: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token: "https://oauth2.googleapis.com/token".to_string(),
            revoke: "https://oauth2.googleapis.com/revoke".to_string(),
        }
    }
}

pub struct GoogleAuthorizer {
    app_config_path: PathBuf,
    store: SessionStore,
    endpoints: OAuthEndpoints,
    http: Client,
    // Serializes refreshes so concurrent callers don't race on the file.
    lock: Mutex<()>,
}

impl GoogleAuthorizer {
    /// Authorizer using the default config and session paths.
    pub fn new() -> Result<Self> {
        Ok(Self::with_paths(
            AppConfig::path()?,
            SessionStore::default_path()?,
            OAuthEndpoints::default(),
        ))
    }

    pub fn with_paths(app_config_path: PathBuf, session_path: PathBuf, endpoints: OAuthEndpoints) -> Self {
        GoogleAuthorizer {
            app_config_path,
            store: SessionStore::new(session_path),
            endpoints,
            http: Client::new(),
            lock: Mutex::new(()),
        }
    }

    fn app_config(&self) -> PlannerResult<AppConfig> {
        AppConfig::load_from(&self.app_config_path)
            .map_err(|e| PlannerError::ConfigurationMissing(format!("{:#}", e)))
    }

    fn load_session(&self) -> PlannerResult<Option<SessionData>> {
        self.store.load().map_err(auth_error)
    }

    fn save_session(&self, data: &SessionData) -> PlannerResult<()> {
        self.store.save(data).map_err(auth_error)
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> PlannerResult<TokenResponse> {
        let response = self
            .http
            .post(&self.endpoints.token)
            .form(form)
            .send()
            .await
            .map_err(|e| PlannerError::Network(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PlannerError::Authorization(format!(
                "Token request failed ({}): {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PlannerError::Serialization(format!("Failed to parse token response: {}", e)))
    }

    async fn refresh(&self, app: &AppConfig, session: &SessionData, scopes: &[&str]) -> PlannerResult<SessionData> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or_else(|| PlannerError::Authorization("No refresh token stored".into()))?;

        let response = self
            .post_token(&[
                ("client_id", app.client_id.as_str()),
                ("client_secret", app.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        let data = SessionData::from_response(response, Some(session), scopes);
        self.save_session(&data)?;
        info!("Refreshed Google access token");
        Ok(data)
    }

    /// URL of the consent page for `scopes`.
    pub fn consent_url(&self, app: &AppConfig, scopes: &[&str], state: &str) -> PlannerResult<Url> {
        let scope = scopes.join(" ");
        let redirect_uri = app.redirect_uri();
        Url::parse_with_params(
            &self.endpoints.authorize,
            &[
                ("client_id", app.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| PlannerError::Config(format!("Invalid authorize endpoint: {}", e)))
    }

    async fn consent(&self, app: &AppConfig, previous: Option<&SessionData>, scopes: &[&str]) -> PlannerResult<SessionData> {
        let state = uuid::Uuid::new_v4().to_string();
        let url = self.consent_url(app, scopes, &state)?;

        // Bind before opening the browser so the redirect can't beat us.
        let listener = TcpListener::bind(("127.0.0.1", app.redirect_port)).await?;

        eprintln!("Open this URL in your browser to authorize visual-planner:\n\n{}\n", url);
        if open::that(url.as_str()).is_err() {
            eprintln!("(Could not open browser automatically, please copy the URL above)");
        }

        let params = wait_for_callback(listener).await.map_err(auth_error)?;
        if let Some(error) = params.get("error") {
            return Err(PlannerError::Authorization(format!("Consent refused: {}", error)));
        }
        if params.get("state") != Some(&state) {
            return Err(PlannerError::Authorization(
                "OAuth state mismatch - possible CSRF attack".into(),
            ));
        }
        let code = params
            .get("code")
            .ok_or_else(|| PlannerError::Authorization("No code in callback".into()))?;

        let redirect_uri = app.redirect_uri();
        let response = self
            .post_token(&[
                ("client_id", app.client_id.as_str()),
                ("client_secret", app.client_secret.as_str()),
                ("code", code.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        let data = SessionData::from_response(response, previous, scopes);
        self.save_session(&data)?;
        info!("Authorized Google account");
        Ok(data)
    }
}

fn auth_error(e: anyhow::Error) -> PlannerError {
    PlannerError::Authorization(format!("{:#}", e))
}

#[async_trait]
impl Authorizer for GoogleAuthorizer {
    async fn request_access_token(&self, scopes: &[&str], interactive: bool) -> PlannerResult<AccessToken> {
        let app = self.app_config()?;
        let _guard = self.lock.lock().await;
        let stored = self.load_session()?;

        if let Some(session) = stored.as_ref().filter(|s| s.grants_all(scopes)) {
            if !interactive && !session.is_expired() {
                return Ok(session.access_token());
            }
            if session.refresh_token.is_some() {
                match self.refresh(&app, session, scopes).await {
                    Ok(data) => return Ok(data.access_token()),
                    Err(e) => warn!("Token refresh failed: {}", e),
                }
            }
        }

        if !interactive {
            return Err(PlannerError::Authorization(
                "Interactive authorization required".into(),
            ));
        }

        let data = self.consent(&app, stored.as_ref(), scopes).await?;
        Ok(data.access_token())
    }

    async fn revoke(&self, token: &AccessToken) -> PlannerResult<()> {
        let _guard = self.lock.lock().await;
        let response = self
            .http
            .post(&self.endpoints.revoke)
            .form(&[("token", token.token.as_str())])
            .send()
            .await
            .map_err(|e| PlannerError::Network(format!("Revoke request failed: {}", e)))?;

        // Already invalid tokens come back as 400; either way the local session goes.
        if !response.status().is_success() {
            warn!(status = %response.status(), "Google did not accept the revoke request");
        }
        self.store.clear().map_err(auth_error)?;
        info!("Revoked Google authorization");
        Ok(())
    }
}

/// Wait for the OAuth redirect on `listener` and return its query parameters.
async fn wait_for_callback(listener: TcpListener) -> Result<HashMap<String, String>> {
    let (stream, _) = listener
        .accept()
        .await
        .context("Failed to accept OAuth callback")?;

    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .await
        .context("Failed to read OAuth callback request line")?;

    let url_part = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("Invalid HTTP request"))?;

    let url = Url::parse(&format!("http://localhost{}", url_part))?;
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    let response = "HTTP/1.1 200 OK\r\n\
        Content-Type: text/html\r\n\
        Connection: close\r\n\
        \r\n\
        <html><body>\
        <h1>visual-planner is authorized</h1>\
        <p>You can close this window and return to the terminal.</p>\
        </body></html>";

    let mut stream = reader.into_inner();
    stream
        .write_all(response.as_bytes())
        .await
        .context("Failed to write OAuth callback response")?;
    stream.flush().await?;

    Ok(params)
}
