//! Provider contract.
//!
//! The engine talks to two external collaborators:
//! - a `CalendarProvider` serving calendar lists and paged event lists
//! - an `Authorizer` handing out (and revoking) access tokens
//!
//! The wire types mirror the fields of the provider's list responses that the
//! grid consumes; everything else in the payload is ignored.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlannerResult;

/// Read-only access to calendars and their events.
pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// One page of an event list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsPage {
    #[serde(default)]
    pub items: Vec<ProviderEvent>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    /// Only present on the last page.
    #[serde(default)]
    pub next_sync_token: Option<String>,
}

/// An event as the provider returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEvent {
    pub id: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// RRULE/EXDATE lines. Only present on recurrence masters.
    #[serde(default)]
    pub recurrence: Option<Vec<String>>,
    #[serde(default)]
    pub start: Option<EventDateTime>,
    #[serde(default)]
    pub end: Option<EventDateTime>,
    #[serde(default)]
    pub color_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub html_link: Option<String>,
}

impl ProviderEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }

    pub fn is_recurrence_master(&self) -> bool {
        self.recurrence.as_ref().is_some_and(|r| !r.is_empty())
    }
}

/// Either an all-day `date` (`YYYY-MM-DD`) or a timed RFC 3339 `dateTime`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_time: Option<String>,
}

/// Parameters of an event list request.
///
/// A full fetch carries a time window; an incremental fetch carries only the
/// sync token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    pub time_min: Option<DateTime<Utc>>,
    pub time_max: Option<DateTime<Utc>>,
    pub single_events: bool,
    pub sync_token: Option<String>,
    pub page_token: Option<String>,
}

impl EventQuery {
    pub fn window(time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> Self {
        EventQuery {
            time_min: Some(time_min),
            time_max: Some(time_max),
            single_events: true,
            ..Default::default()
        }
    }

    pub fn incremental(sync_token: &str) -> Self {
        EventQuery {
            single_events: true,
            sync_token: Some(sync_token.to_string()),
            ..Default::default()
        }
    }

    pub fn is_incremental(&self) -> bool {
        self.sync_token.is_some()
    }

    /// Same query, continued at `page_token`.
    pub fn with_page(&self, page_token: String) -> Self {
        EventQuery {
            page_token: Some(page_token),
            ..self.clone()
        }
    }
}

/// A calendar from the provider's calendar list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarInfo {
    pub id: String,
    pub name: String,
    pub colour: Colour,
}

/// Text/background colour pair, as CSS colour strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colour {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl Colour {
    pub fn new(text: impl Into<String>, background: impl Into<String>) -> Self {
        Colour {
            text: Some(text.into()),
            background: Some(background.into()),
        }
    }
}

/// Event colours keyed by the provider's `colorId`.
pub type ColourPalette = HashMap<String, Colour>;

/// A granted access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn grants(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// The calendar service.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Calendars the user has selected for display, all pages.
    async fn list_calendars(&self, token: &AccessToken) -> PlannerResult<Vec<CalendarInfo>>;

    /// One page of events for `calendar_id`.
    async fn list_events(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        query: &EventQuery,
    ) -> PlannerResult<EventsPage>;

    /// Per-event colour palette.
    async fn event_colours(&self, _token: &AccessToken) -> PlannerResult<ColourPalette> {
        Ok(ColourPalette::new())
    }

    /// The user's 24 hour clock preference, if the provider knows it.
    async fn time_24h(&self, _token: &AccessToken) -> PlannerResult<Option<bool>> {
        Ok(None)
    }
}

/// The authorization collaborator.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Obtain a token for `scopes`. `interactive` allows prompting the user.
    async fn request_access_token(
        &self,
        scopes: &[&str],
        interactive: bool,
    ) -> PlannerResult<AccessToken>;

    async fn revoke(&self, token: &AccessToken) -> PlannerResult<()>;
}
