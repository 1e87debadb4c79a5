//! Calendar API v3 over plain HTTP.

use async_trait::async_trait;
use chrono::SecondsFormat;
use planner_core::error::{PlannerError, PlannerResult};
use planner_core::provider::{
    AccessToken, CalendarInfo, CalendarProvider, Colour, ColourPalette, EventQuery, EventsPage,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::types::{ApiErrorBody, CalendarListPage, Colors, Setting};

pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar as a `CalendarProvider`.
#[derive(Debug, Clone)]
pub struct GoogleCalendar {
    http: Client,
    base_url: String,
}

impl Default for GoogleCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleCalendar {
    pub fn new() -> Self {
        Self::with_base_url(GOOGLE_CALENDAR_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        GoogleCalendar {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, segments: &[&str]) -> PlannerResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| PlannerError::Config(format!("Invalid API base {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| PlannerError::Config(format!("API base {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        token: &AccessToken,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> PlannerResult<T> {
        let url = self.url(segments)?;
        debug!(%url, "GET");

        let response = self
            .http
            .get(url)
            .bearer_auth(&token.token)
            .query(query)
            .send()
            .await
            .map_err(|e| PlannerError::Network(format!("Google API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(PlannerError::from_status(status.as_u16(), message));
        }

        response
            .json()
            .await
            .map_err(|e| PlannerError::Serialization(format!("Failed to parse Google response: {}", e)))
    }
}

fn rfc3339(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Query parameters of an event list request.
fn event_params(query: &EventQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(sync_token) = &query.sync_token {
        params.push(("syncToken", sync_token.clone()));
    } else {
        if let Some(time_min) = &query.time_min {
            params.push(("timeMin", rfc3339(time_min)));
        }
        if let Some(time_max) = &query.time_max {
            params.push(("timeMax", rfc3339(time_max)));
        }
    }
    if query.single_events {
        params.push(("singleEvents", "true".to_string()));
    }
    if let Some(page_token) = &query.page_token {
        params.push(("pageToken", page_token.clone()));
    }
    params
}

#[async_trait]
impl CalendarProvider for GoogleCalendar {
    async fn list_calendars(&self, token: &AccessToken) -> PlannerResult<Vec<CalendarInfo>> {
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let query: Vec<(&str, String)> = page_token
                .take()
                .map(|t| vec![("pageToken", t)])
                .unwrap_or_default();
            let page: CalendarListPage = self
                .get(token, &["users", "me", "calendarList"], &query)
                .await?;

            for entry in page.items.into_iter().filter(|c| c.selected) {
                calendars.push(CalendarInfo {
                    name: entry.display_name(),
                    colour: Colour {
                        text: entry.foreground_color,
                        background: entry.background_color,
                    },
                    id: entry.id,
                });
            }

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(calendars)
    }

    async fn list_events(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        query: &EventQuery,
    ) -> PlannerResult<EventsPage> {
        self.get(
            token,
            &["calendars", calendar_id, "events"],
            &event_params(query),
        )
        .await
    }

    async fn event_colours(&self, token: &AccessToken) -> PlannerResult<ColourPalette> {
        let colors: Colors = self.get(token, &["colors"], &[]).await?;
        if colors.kind.as_deref() != Some("calendar#colors") {
            return Ok(ColourPalette::new());
        }
        Ok(colors
            .event
            .into_iter()
            .map(|(id, c)| (id, Colour::new(c.foreground, c.background)))
            .collect())
    }

    async fn time_24h(&self, token: &AccessToken) -> PlannerResult<Option<bool>> {
        let setting: Setting = self
            .get(token, &["users", "me", "settings", "format24HourTime"], &[])
            .await?;
        if setting.kind.as_deref() != Some("calendar#setting") || setting.id != "format24HourTime" {
            return Ok(None);
        }
        Ok(Some(setting.value == "true"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{bearer_token, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn token() -> AccessToken {
        AccessToken {
            token: "tok".into(),
            scopes: vec![],
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_list_calendars_pages_and_keeps_selected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .and(query_param_is_missing("pageToken"))
            .and(bearer_token("tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "id": "home", "summary": "Home", "backgroundColor": "#16a765",
                      "foregroundColor": "#000000", "selected": true },
                    { "id": "hidden", "summary": "Hidden", "selected": false }
                ],
                "nextPageToken": "p2"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "id": "work", "summary": "Work", "summaryOverride": "Office", "selected": true }
                ]
            })))
            .mount(&server)
            .await;

        let calendars = GoogleCalendar::with_base_url(server.uri())
            .list_calendars(&token())
            .await
            .unwrap();

        assert_eq!(calendars.len(), 2);
        assert_eq!(calendars[0].id, "home");
        assert_eq!(calendars[0].colour, Colour::new("#000000", "#16a765"));
        assert_eq!(calendars[1].name, "Office");
        assert_eq!(calendars[1].colour, Colour::default());
    }

    #[tokio::test]
    async fn test_window_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/me@example.com/events"))
            .and(query_param("timeMin", "2024-01-01T00:00:00.000Z"))
            .and(query_param("timeMax", "2024-07-01T00:00:00.000Z"))
            .and(query_param("singleEvents", "true"))
            .and(query_param_is_missing("syncToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "id": "e1", "kind": "calendar#event",
                      "start": { "date": "2024-01-05" }, "end": { "date": "2024-01-08" } }
                ],
                "nextSyncToken": "s1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = EventQuery::window(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
        );
        let page = GoogleCalendar::with_base_url(server.uri())
            .list_events(&token(), "me@example.com", &query)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next_sync_token.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_incremental_query_sends_only_sync_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/home/events"))
            .and(query_param("syncToken", "s1"))
            .and(query_param("pageToken", "p2"))
            .and(query_param_is_missing("timeMin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let query = EventQuery::incremental("s1").with_page("p2".into());
        GoogleCalendar::with_base_url(server.uri())
            .list_events(&token(), "home", &query)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_statuses_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/gone/events"))
            .respond_with(ResponseTemplate::new(410).set_body_json(json!({
                "error": { "code": 410, "message": "Sync token is no longer valid" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars/expired/events"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars/broken/events"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": { "code": 500, "message": "Backend Error" }
            })))
            .mount(&server)
            .await;

        let api = GoogleCalendar::with_base_url(server.uri());
        let query = EventQuery::incremental("s1");
        let gone = api.list_events(&token(), "gone", &query).await.unwrap_err();
        assert!(matches!(gone, PlannerError::SyncTokenInvalid));

        let expired = api.list_events(&token(), "expired", &query).await.unwrap_err();
        assert!(matches!(expired, PlannerError::AuthExpired));

        let broken = api.list_events(&token(), "broken", &query).await.unwrap_err();
        assert_eq!(broken.to_string(), "HTTP error 500: Backend Error");
    }

    #[tokio::test]
    async fn test_colours_and_clock_setting() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/colors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "calendar#colors",
                "event": { "11": { "background": "#dc2127", "foreground": "#1d1d1d" } }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me/settings/format24HourTime"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "calendar#setting", "id": "format24HourTime", "value": "false"
            })))
            .mount(&server)
            .await;

        let api = GoogleCalendar::with_base_url(server.uri());
        let palette = api.event_colours(&token()).await.unwrap();
        assert_eq!(palette.get("11"), Some(&Colour::new("#1d1d1d", "#dc2127")));
        assert_eq!(api.time_24h(&token()).await.unwrap(), Some(false));
    }
}
