//! One provider calendar.
//!
//! A `CalendarSource` knows its calendar's identity and sync token, pages
//! through the provider's event lists and turns each item into add/remove
//! deltas on an `EventSink`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::broker::EventSink;
use crate::config::EventBackground;
use crate::date::DisplayZone;
use crate::error::PlannerResult;
use crate::event::{EventRecord, NormalizeContext};
use crate::provider::{CalendarInfo, Colour, ColourPalette, EventQuery, ProviderEvent};
use crate::session::Session;

const EVENT_KIND: &str = "calendar#event";

/// Half-open date range `[start, end)` the broker fetches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Normalization settings shared by all sources.
#[derive(Debug, Clone, Default)]
pub struct EventOptions {
    pub background: EventBackground,
    pub zone: DisplayZone,
    pub time_24h: bool,
    pub show_timed: bool,
    pub show_all_day: bool,
    pub palette: ColourPalette,
}

/// Counts of what a fetch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub pages: usize,
    pub added: usize,
    pub removed: usize,
    pub skipped: usize,
}

impl FetchStats {
    pub fn merge(&mut self, other: FetchStats) {
        self.pages += other.pages;
        self.added += other.added;
        self.removed += other.removed;
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Clone)]
pub struct CalendarSource {
    pub id: String,
    pub name: String,
    pub colour: Colour,
    visible: bool,
    sync_token: Option<String>,
    /// Ids this source has put on the grid and not yet removed.
    live_ids: HashSet<String>,
}

impl CalendarSource {
    pub fn new(info: CalendarInfo, visible: bool) -> Self {
        CalendarSource {
            id: info.id,
            name: info.name,
            colour: info.colour,
            visible,
            sync_token: None,
            live_ids: HashSet::new(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn sync_token(&self) -> Option<&str> {
        self.sync_token.as_deref()
    }

    pub fn clear_sync_token(&mut self) {
        self.sync_token = None;
    }

    pub fn live_ids(&self) -> impl Iterator<Item = &str> {
        self.live_ids.iter().map(String::as_str)
    }

    /// Forget placed ids after the sink dropped everything.
    pub fn forget_events(&mut self) {
        self.live_ids.clear();
    }

    /// Remove every event of this source from `sink`.
    pub fn withdraw(&mut self, sink: &mut dyn EventSink) -> usize {
        let count = self.live_ids.len();
        for id in self.live_ids.drain() {
            sink.remove_event(Some(&id));
        }
        count
    }

    /// Fetch all events overlapping `window`, page by page. The sync token
    /// returned with the last page makes later fetches incremental.
    pub async fn fetch_window(
        &mut self,
        session: &mut Session,
        sink: &mut dyn EventSink,
        options: &EventOptions,
        window: FetchWindow,
    ) -> PlannerResult<FetchStats> {
        self.sync_token = None;
        let query = EventQuery::window(
            options.zone.midnight_utc(window.start),
            options.zone.midnight_utc(window.end),
        );
        debug!(calendar = %self.id, start = %window.start, end = %window.end, "Fetching window");
        self.run_query(session, sink, options, query).await
    }

    /// Fetch changes since the last sync token. Every returned item replaces
    /// what the grid holds for its id.
    ///
    /// A source without a token has never completed a full fetch and is
    /// skipped. On `SyncTokenInvalid` or `AuthExpired` the token is dropped so
    /// the caller can fall back to a full fetch.
    pub async fn sync_incremental(
        &mut self,
        session: &mut Session,
        sink: &mut dyn EventSink,
        options: &EventOptions,
    ) -> PlannerResult<FetchStats> {
        let Some(token) = self.sync_token.clone() else {
            return Ok(FetchStats::default());
        };
        debug!(calendar = %self.id, "Incremental sync");

        match self
            .run_query(session, sink, options, EventQuery::incremental(&token))
            .await
        {
            Err(e) if e.is_recoverable() => {
                warn!(calendar = %self.id, "Sync failed ({}), dropping sync token", e);
                self.sync_token = None;
                Err(e)
            }
            other => other,
        }
    }

    async fn run_query(
        &mut self,
        session: &mut Session,
        sink: &mut dyn EventSink,
        options: &EventOptions,
        mut query: EventQuery,
    ) -> PlannerResult<FetchStats> {
        let incremental = query.is_incremental();
        let mut stats = FetchStats::default();

        loop {
            let page = session.list_events(&self.id, &query).await?;
            stats.pages += 1;

            for item in &page.items {
                self.apply_item(item, incremental, sink, options, &mut stats);
            }

            match page.next_page_token {
                Some(next) => query = query.with_page(next),
                None => {
                    if page.next_sync_token.is_none() {
                        warn!(calendar = %self.id, "Last page carried no sync token");
                    }
                    self.sync_token = page.next_sync_token;
                    break;
                }
            }
        }

        Ok(stats)
    }

    fn apply_item(
        &mut self,
        item: &ProviderEvent,
        incremental: bool,
        sink: &mut dyn EventSink,
        options: &EventOptions,
        stats: &mut FetchStats,
    ) {
        if item.kind.as_deref().is_some_and(|k| k != EVENT_KIND) {
            stats.skipped += 1;
            return;
        }

        if item.is_cancelled() {
            sink.remove_event(Some(&item.id));
            self.live_ids.remove(&item.id);
            stats.removed += 1;
            return;
        }

        // Only expanded single instances are drawn.
        if item.is_recurrence_master() {
            stats.skipped += 1;
            return;
        }

        if incremental {
            sink.remove_event(Some(&item.id));
            self.live_ids.remove(&item.id);
        }

        let ctx = NormalizeContext {
            calendar_id: &self.id,
            calendar_name: &self.name,
            calendar_colour: &self.colour,
            palette: &options.palette,
            background: options.background,
            zone: options.zone,
            time_24h: options.time_24h,
            show_timed: options.show_timed,
            show_all_day: options.show_all_day,
        };

        match EventRecord::from_provider(item, &ctx) {
            Ok(Some(record)) => {
                self.live_ids.insert(record.id.clone());
                sink.add_event(Arc::new(record));
                stats.added += 1;
            }
            Ok(None) => stats.skipped += 1,
            Err(e) => {
                warn!(calendar = %self.id, event = %item.id, "Skipping event: {}", e);
                stats.skipped += 1;
            }
        }
    }
}
