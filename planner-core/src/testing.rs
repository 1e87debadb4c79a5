//! In-memory provider, authorizer and sink used by the engine's tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::broker::EventSink;
use crate::error::{PlannerError, PlannerResult};
use crate::event::SharedRecord;
use crate::provider::{
    AccessToken, Authorizer, CalendarInfo, CalendarProvider, Colour,
    ColourPalette, EventDateTime, EventQuery, EventsPage, ProviderEvent,
};

pub fn calendar(id: &str, name: &str) -> CalendarInfo {
    CalendarInfo {
        id: id.into(),
        name: name.into(),
        colour: Colour::new("#000000", "#9fe1e7"),
    }
}

pub fn all_day(id: &str, start: &str, end: &str) -> ProviderEvent {
    ProviderEvent {
        id: id.into(),
        kind: Some("calendar#event".into()),
        status: Some("confirmed".into()),
        summary: Some(format!("Event {}", id)),
        start: Some(EventDateTime::all_day(start)),
        end: Some(EventDateTime::all_day(end)),
        ..Default::default()
    }
}

pub fn cancelled(id: &str) -> ProviderEvent {
    ProviderEvent {
        id: id.into(),
        kind: Some("calendar#event".into()),
        status: Some("cancelled".into()),
        ..Default::default()
    }
}

#[derive(Default)]
struct ProviderState {
    calendars: Vec<CalendarInfo>,
    events: HashMap<String, Vec<ProviderEvent>>,
    deltas: HashMap<String, VecDeque<Vec<ProviderEvent>>>,
    failures: VecDeque<PlannerError>,
    page_size: Option<usize>,
    calls: Vec<(String, EventQuery)>,
    sync_serial: u32,
}

/// Serves scripted calendars, pages and deltas, and records every request.
#[derive(Default)]
pub struct ScriptedProvider {
    state: Mutex<ProviderState>,
}

impl ScriptedProvider {
    pub fn with_calendars(calendars: Vec<CalendarInfo>) -> Self {
        let provider = ScriptedProvider::default();
        provider.state.lock().unwrap().calendars = calendars;
        provider
    }

    /// Events returned by full (windowed) fetches.
    pub fn set_events(&self, calendar_id: &str, events: Vec<ProviderEvent>) {
        self.state
            .lock()
            .unwrap()
            .events
            .insert(calendar_id.into(), events);
    }

    /// Items returned by the next incremental fetch.
    pub fn push_delta(&self, calendar_id: &str, items: Vec<ProviderEvent>) {
        self.state
            .lock()
            .unwrap()
            .deltas
            .entry(calendar_id.into())
            .or_default()
            .push_back(items);
    }

    pub fn fail_next_list(&self, error: PlannerError) {
        self.state.lock().unwrap().failures.push_back(error);
    }

    pub fn set_page_size(&self, size: usize) {
        self.state.lock().unwrap().page_size = Some(size);
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn calls(&self) -> Vec<(String, EventQuery)> {
        self.state.lock().unwrap().calls.clone()
    }

    /// First-page windowed requests made for `calendar_id`.
    pub fn full_fetches(&self, calendar_id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(id, q)| id == calendar_id && !q.is_incremental() && q.page_token.is_none())
            .count()
    }
}

#[async_trait]
impl CalendarProvider for ScriptedProvider {
    async fn list_calendars(&self, _token: &AccessToken) -> PlannerResult<Vec<CalendarInfo>> {
        Ok(self.state.lock().unwrap().calendars.clone())
    }

    async fn list_events(
        &self,
        _token: &AccessToken,
        calendar_id: &str,
        query: &EventQuery,
    ) -> PlannerResult<EventsPage> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((calendar_id.to_string(), query.clone()));
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }

        let (items, next_page_token) = if query.is_incremental() {
            let items = state
                .deltas
                .get_mut(calendar_id)
                .and_then(|q| q.pop_front())
                .unwrap_or_default();
            (items, None)
        } else {
            let all = state.events.get(calendar_id).cloned().unwrap_or_default();
            let size = state.page_size.unwrap_or(usize::MAX);
            let offset: usize = query
                .page_token
                .as_deref()
                .and_then(|t| t.strip_prefix("page-"))
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            let end = offset.saturating_add(size).min(all.len());
            let next = (end < all.len()).then(|| format!("page-{}", end));
            (all[offset.min(end)..end].to_vec(), next)
        };

        let next_sync_token = if next_page_token.is_none() {
            state.sync_serial += 1;
            Some(format!("sync-{}", state.sync_serial))
        } else {
            None
        };

        Ok(EventsPage {
            items,
            next_page_token,
            next_sync_token,
        })
    }

    async fn event_colours(&self, _token: &AccessToken) -> PlannerResult<ColourPalette> {
        let mut palette = ColourPalette::new();
        palette.insert("11".into(), Colour::new("#1d1d1d", "#dc2127"));
        Ok(palette)
    }
}

#[derive(Default)]
struct AuthorizerState {
    requests: Vec<bool>,
    revoked: usize,
}

/// Grants a fresh token on every request, remembering whether it was
/// interactive.
#[derive(Default)]
pub struct ScriptedAuthorizer {
    unconfigured: bool,
    state: Mutex<AuthorizerState>,
}

impl ScriptedAuthorizer {
    /// Behaves like an install with no client identity.
    pub fn unconfigured() -> Self {
        ScriptedAuthorizer {
            unconfigured: true,
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<bool> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn revoked(&self) -> usize {
        self.state.lock().unwrap().revoked
    }
}

#[async_trait]
impl Authorizer for ScriptedAuthorizer {
    async fn request_access_token(
        &self,
        scopes: &[&str],
        interactive: bool,
    ) -> PlannerResult<AccessToken> {
        if self.unconfigured {
            return Err(PlannerError::ConfigurationMissing("no client id".into()));
        }
        let mut state = self.state.lock().unwrap();
        state.requests.push(interactive);
        Ok(AccessToken {
            token: format!("token-{}", state.requests.len()),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            expires_at: None,
        })
    }

    async fn revoke(&self, _token: &AccessToken) -> PlannerResult<()> {
        self.state.lock().unwrap().revoked += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Add(String),
    Remove(Option<String>),
    Update,
}

/// Records deltas in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
    pub records: Vec<SharedRecord>,
}

impl RecordingSink {
    /// Ids currently present after replaying the recorded deltas.
    pub fn live_ids(&self) -> Vec<String> {
        let mut live: Vec<String> = Vec::new();
        for call in &self.calls {
            match call {
                SinkCall::Add(id) => live.push(id.clone()),
                SinkCall::Remove(Some(id)) => live.retain(|l| l != id),
                SinkCall::Remove(None) => live.clear(),
                SinkCall::Update => {}
            }
        }
        live
    }
}

impl EventSink for RecordingSink {
    fn add_event(&mut self, record: SharedRecord) {
        self.calls.push(SinkCall::Add(record.id.clone()));
        self.records.push(record);
    }

    fn remove_event(&mut self, id: Option<&str>) {
        self.calls.push(SinkCall::Remove(id.map(str::to_string)));
    }

    fn update_events(&mut self) {
        self.calls.push(SinkCall::Update);
    }
}
