//! Wire shapes of the Calendar API and OAuth responses.
//!
//! Event lists deserialize straight into `planner_core::provider::EventsPage`;
//! only the remaining endpoints need local types.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListPage {
    #[serde(default)]
    pub items: Vec<CalendarListEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub summary_override: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub foreground_color: Option<String>,
    #[serde(default)]
    pub selected: bool,
}

impl CalendarListEntry {
    pub fn display_name(&self) -> String {
        self.summary_override
            .as_deref()
            .or(self.summary.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or("(unnamed)")
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
pub struct Colors {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub event: HashMap<String, ColorDefinition>,
}

#[derive(Debug, Deserialize)]
pub struct ColorDefinition {
    pub background: String,
    pub foreground: String,
}

#[derive(Debug, Deserialize)]
pub struct Setting {
    #[serde(default)]
    pub kind: Option<String>,
    pub id: String,
    pub value: String,
}

/// Error body of a failed API call.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Space separated granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}
