//! Authorized access to the provider.
//!
//! `Session` pairs a `CalendarProvider` with the `Authorizer` that feeds it
//! tokens. Every provider call goes through `call`, which re-authorizes on
//! `AuthExpired` and retries the same request once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{PlannerError, PlannerResult};
use crate::provider::{
    AccessToken, Authorizer, CALENDAR_READONLY_SCOPE, CalendarInfo, CalendarProvider,
    ColourPalette, EventQuery, EventsPage,
};

/// Admits at most one failure-triggered action per backoff period.
#[derive(Debug, Clone)]
pub struct FailureGate {
    backoff: Duration,
    last: Option<Instant>,
}

impl FailureGate {
    pub fn new(backoff: Duration) -> Self {
        FailureGate {
            backoff,
            last: None,
        }
    }

    /// True if the action may run now; records the attempt when it may.
    pub fn admit(&mut self) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last {
            if now.duration_since(last) < self.backoff {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

pub struct Session {
    provider: Arc<dyn CalendarProvider>,
    authorizer: Arc<dyn Authorizer>,
    token: Option<AccessToken>,
    auth_gate: FailureGate,
}

impl Session {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        authorizer: Arc<dyn Authorizer>,
        backoff: Duration,
    ) -> Self {
        Session {
            provider,
            authorizer,
            token: None,
            auth_gate: FailureGate::new(backoff),
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.token.is_some()
    }

    /// Get a token, silently if possible, prompting otherwise.
    pub async fn ensure_token(&mut self) -> PlannerResult<AccessToken> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }

        let token = match self
            .authorizer
            .request_access_token(&[CALENDAR_READONLY_SCOPE], false)
            .await
        {
            Ok(token) => token,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!("Silent authorization failed ({}), prompting", e);
                self.authorizer
                    .request_access_token(&[CALENDAR_READONLY_SCOPE], true)
                    .await?
            }
        };

        if !token.grants(CALENDAR_READONLY_SCOPE) {
            return Err(PlannerError::Authorization(
                "Calendar read access was not granted".into(),
            ));
        }

        self.token = Some(token.clone());
        Ok(token)
    }

    /// Drop the current token and ask for a new one interactively.
    async fn reauthorize(&mut self) -> PlannerResult<AccessToken> {
        self.token = None;
        if !self.auth_gate.admit() {
            warn!("Re-authorization suppressed by backoff");
            return Err(PlannerError::AuthExpired);
        }

        let token = self
            .authorizer
            .request_access_token(&[CALENDAR_READONLY_SCOPE], true)
            .await?;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Run `request`, re-authorizing and retrying once on `AuthExpired`.
    async fn call<T, F, Fut>(&mut self, request: F) -> PlannerResult<T>
    where
        F: Fn(Arc<dyn CalendarProvider>, AccessToken) -> Fut,
        Fut: Future<Output = PlannerResult<T>>,
    {
        let token = self.ensure_token().await?;
        match request(self.provider.clone(), token).await {
            Err(PlannerError::AuthExpired) => {
                debug!("Credential expired, re-authorizing");
                let token = self.reauthorize().await?;
                request(self.provider.clone(), token).await
            }
            other => other,
        }
    }

    pub async fn list_calendars(&mut self) -> PlannerResult<Vec<CalendarInfo>> {
        self.call(|provider, token| async move { provider.list_calendars(&token).await })
            .await
    }

    pub async fn list_events(
        &mut self,
        calendar_id: &str,
        query: &EventQuery,
    ) -> PlannerResult<EventsPage> {
        self.call(move |provider, token| async move {
            provider.list_events(&token, calendar_id, query).await
        })
        .await
    }

    pub async fn event_colours(&mut self) -> PlannerResult<ColourPalette> {
        self.call(|provider, token| async move { provider.event_colours(&token).await })
            .await
    }

    pub async fn time_24h(&mut self) -> PlannerResult<Option<bool>> {
        self.call(|provider, token| async move { provider.time_24h(&token).await })
            .await
    }

    /// Revoke the current token, if any.
    pub async fn revoke(&mut self) -> PlannerResult<()> {
        if let Some(token) = self.token.take() {
            self.authorizer.revoke(&token).await?;
        }
        Ok(())
    }
}
