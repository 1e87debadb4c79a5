//! Fan-out of fetch and sync requests over all calendar sources.
//!
//! The broker owns the sink that receives every add/remove/update delta. The
//! sink is fixed at construction; there is no runtime re-wiring.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::PlannerConfig;
use crate::error::{PlannerError, PlannerResult};
use crate::event::SharedRecord;
use crate::provider::{Authorizer, CalendarInfo, CalendarProvider, Colour};
use crate::session::{FailureGate, Session};
use crate::source::{CalendarSource, EventOptions, FetchStats, FetchWindow};
use crate::toggles::CalendarToggles;

/// Receiver of event deltas.
pub trait EventSink {
    fn add_event(&mut self, record: SharedRecord);

    /// Remove one id, or everything when `id` is `None`.
    fn remove_event(&mut self, id: Option<&str>);

    /// Something changed that is not an add (visibility, settings).
    fn update_events(&mut self);
}

/// Outcome of a load or sync pass. Errors are contained per source and
/// collected here for display.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub sources: usize,
    pub added: usize,
    pub removed: usize,
    pub skipped: usize,
    /// A sync pass fell back to a full reload.
    pub reloaded: bool,
    pub errors: Vec<String>,
}

impl LoadReport {
    fn record(&mut self, stats: FetchStats) {
        self.sources += 1;
        self.added += stats.added;
        self.removed += stats.removed;
        self.skipped += stats.skipped;
    }

    fn fail(&mut self, source: &str, e: &PlannerError) {
        error!(calendar = %source, "{}", e);
        self.errors.push(format!("{}: {}", source, e));
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct EventBroker<S: EventSink> {
    session: Session,
    sources: Vec<CalendarSource>,
    options: EventOptions,
    window: Option<FetchWindow>,
    reload_gate: FailureGate,
    /// A rejected sync token is waiting for the backoff to admit a reload.
    reload_pending: bool,
    sink: S,
}

impl<S: EventSink> EventBroker<S> {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        authorizer: Arc<dyn Authorizer>,
        options: EventOptions,
        failure_backoff: Duration,
        sink: S,
    ) -> Self {
        EventBroker {
            session: Session::new(provider, authorizer, failure_backoff),
            sources: Vec::new(),
            options,
            window: None,
            reload_gate: FailureGate::new(failure_backoff),
            reload_pending: false,
            sink,
        }
    }

    pub fn from_config(
        provider: Arc<dyn CalendarProvider>,
        authorizer: Arc<dyn Authorizer>,
        config: &PlannerConfig,
        sink: S,
    ) -> PlannerResult<Self> {
        let options = EventOptions {
            background: config.event_background,
            zone: config.display_zone()?,
            time_24h: config.time_24h,
            show_timed: config.show_timed_events,
            show_all_day: config.show_all_day_events,
            palette: Default::default(),
        };
        Ok(Self::new(
            provider,
            authorizer,
            options,
            config.failure_backoff(),
            sink,
        ))
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn sources(&self) -> &[CalendarSource] {
        &self.sources
    }

    pub fn source(&self, id: &str) -> Option<&CalendarSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn options(&self) -> &EventOptions {
        &self.options
    }

    pub fn window(&self) -> Option<FetchWindow> {
        self.window
    }

    pub fn set_window(&mut self, start: NaiveDate, end: NaiveDate) {
        self.window = Some(FetchWindow { start, end });
    }

    /// Authorize and pick up the provider's display settings: the event
    /// colour palette and the user's clock preference.
    pub async fn connect(&mut self) -> PlannerResult<()> {
        self.session.ensure_token().await?;

        match self.session.event_colours().await {
            Ok(palette) => self.options.palette = palette,
            Err(e) => warn!("Could not load event colours: {}", e),
        }
        match self.session.time_24h().await {
            Ok(Some(time_24h)) => self.options.time_24h = time_24h,
            Ok(None) => {}
            Err(e) => warn!("Could not load time format setting: {}", e),
        }
        Ok(())
    }

    /// Replace the source list with the user's selected calendars. Sources
    /// that were already known keep their sync state; visibility comes from
    /// `toggles`, so a known source that is now hidden loses its events and
    /// one that is shown again is fetched for the current window.
    pub async fn discover_calendars(&mut self, toggles: &CalendarToggles) -> PlannerResult<usize> {
        let calendars = self.session.list_calendars().await?;
        let mut previous = std::mem::take(&mut self.sources);
        let mut report = LoadReport::default();
        let mut changed = false;

        for info in calendars {
            let visible = !toggles.is_hidden(&info.id);
            let source = match previous.iter().position(|s| s.id == info.id) {
                Some(i) => {
                    let mut source = previous.swap_remove(i);
                    source.name = info.name;
                    source.colour = info.colour;
                    if source.is_visible() != visible {
                        Self::switch_visibility(
                            &mut source,
                            visible,
                            &mut self.session,
                            &mut self.sink,
                            &self.options,
                            self.window,
                            &mut report,
                        )
                        .await?;
                        changed = true;
                    }
                    source
                }
                None => CalendarSource::new(info, visible),
            };
            self.sources.push(source);
        }

        for gone in &mut previous {
            if gone.withdraw(&mut self.sink) > 0 {
                changed = true;
            }
        }
        if changed {
            self.sink.update_events();
        }

        info!("Discovered {} calendars", self.sources.len());
        Ok(self.sources.len())
    }

    /// Register a calendar that is not in the user's calendar list.
    pub fn add_public_calendar(&mut self, id: &str, name: &str, colour: &str, text_colour: &str) {
        if self.source(id).is_some() {
            return;
        }
        self.sources.push(CalendarSource::new(
            CalendarInfo {
                id: id.to_string(),
                name: name.to_string(),
                colour: Colour::new(text_colour, colour),
            },
            true,
        ));
    }

    /// Clear the sink, then fetch the current window for every visible source.
    ///
    /// A source failing does not stop the others. Only a fatal error (no
    /// provider configuration) aborts the load, before anything is cleared.
    pub async fn load_all(&mut self) -> PlannerResult<LoadReport> {
        let mut report = LoadReport::default();
        let Some(window) = self.window else {
            warn!("load_all called before a window was set");
            return Ok(report);
        };

        if let Err(e) = self.session.ensure_token().await {
            if e.is_fatal() {
                return Err(e);
            }
            report.fail("authorization", &e);
            return Ok(report);
        }

        self.reload(window, &mut report).await?;
        self.sink.update_events();
        Ok(report)
    }

    async fn reload(&mut self, window: FetchWindow, report: &mut LoadReport) -> PlannerResult<()> {
        self.reload_pending = false;
        self.sink.remove_event(None);
        for source in &mut self.sources {
            source.forget_events();
        }

        for source in self.sources.iter_mut().filter(|s| s.is_visible()) {
            match source
                .fetch_window(&mut self.session, &mut self.sink, &self.options, window)
                .await
            {
                Ok(stats) => {
                    debug!(calendar = %source.id, added = stats.added, "Loaded");
                    report.record(stats);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => report.fail(&source.name, &e),
            }
        }
        Ok(())
    }

    /// Pull deltas for every visible source that holds a sync token.
    ///
    /// If a token turns out to be invalid (or the credential cannot be
    /// renewed) the whole window is reloaded once, subject to the failure
    /// backoff, and the pass ends there. A reload the backoff held back runs
    /// at the start of the first pass it admits.
    pub async fn sync_all(&mut self) -> PlannerResult<LoadReport> {
        let mut report = LoadReport::default();
        if self.reload_pending {
            if self.reload_after_failure(&mut report).await? {
                self.sink.update_events();
                return Ok(report);
            }
            debug!("Pending reload still inside the failure backoff");
        }

        let mut needs_reload = false;

        for source in self.sources.iter_mut().filter(|s| s.is_visible()) {
            if source.sync_token().is_none() {
                continue;
            }
            match source
                .sync_incremental(&mut self.session, &mut self.sink, &self.options)
                .await
            {
                Ok(stats) => report.record(stats),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) if e.is_recoverable() => {
                    needs_reload = true;
                    break;
                }
                Err(e) => report.fail(&source.name, &e),
            }
        }

        if needs_reload && !self.reload_after_failure(&mut report).await? {
            report.fail("sync", &PlannerError::SyncTokenInvalid);
        }

        if report.added + report.removed > 0 || report.reloaded {
            self.sink.update_events();
        }
        Ok(report)
    }

    /// Reload the whole window after a rejected token. Returns false when
    /// the backoff holds it back; it then stays pending for the next pass.
    async fn reload_after_failure(&mut self, report: &mut LoadReport) -> PlannerResult<bool> {
        self.reload_pending = true;
        let Some(window) = self.window else {
            return Ok(false);
        };
        if !self.reload_gate.admit() {
            return Ok(false);
        }

        info!("Sync token rejected, reloading window");
        for source in &mut self.sources {
            source.clear_sync_token();
        }
        *report = LoadReport {
            reloaded: true,
            ..Default::default()
        };
        self.reload(window, report).await?;
        Ok(true)
    }

    /// Show or hide a calendar. Hiding removes its events; showing fetches
    /// the current window for it.
    pub async fn set_visible(&mut self, id: &str, visible: bool) -> PlannerResult<LoadReport> {
        let mut report = LoadReport::default();
        let Some(source) = self.sources.iter_mut().find(|s| s.id == id) else {
            return Err(PlannerError::Config(format!("Unknown calendar '{}'", id)));
        };

        if source.is_visible() == visible {
            return Ok(report);
        }
        Self::switch_visibility(
            source,
            visible,
            &mut self.session,
            &mut self.sink,
            &self.options,
            self.window,
            &mut report,
        )
        .await?;

        self.sink.update_events();
        Ok(report)
    }

    async fn switch_visibility(
        source: &mut CalendarSource,
        visible: bool,
        session: &mut Session,
        sink: &mut S,
        options: &EventOptions,
        window: Option<FetchWindow>,
        report: &mut LoadReport,
    ) -> PlannerResult<()> {
        source.set_visible(visible);
        if !visible {
            report.removed += source.withdraw(sink);
            source.clear_sync_token();
            return Ok(());
        }

        if let Some(window) = window {
            match source.fetch_window(session, sink, options, window).await {
                Ok(stats) => report.record(stats),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => report.fail(&source.name, &e),
            }
        }
        Ok(())
    }

    /// Give up the credential.
    pub async fn disconnect(&mut self) -> PlannerResult<()> {
        self.session.revoke().await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::date::DateCursor;
    use crate::grid::{GridModel, GridSettings};
    use crate::testing::{
        RecordingSink, ScriptedAuthorizer, ScriptedProvider, SinkCall, all_day, calendar,
    };

    fn broker(provider: &Arc<ScriptedProvider>) -> EventBroker<RecordingSink> {
        let mut config = PlannerConfig::default();
        config.time_zone = Some("UTC".into());
        let mut broker = EventBroker::from_config(
            provider.clone(),
            Arc::new(ScriptedAuthorizer::default()),
            &config,
            RecordingSink::default(),
        )
        .unwrap();
        broker.set_window(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        );
        broker
    }

    fn two_calendars() -> Arc<ScriptedProvider> {
        let provider = Arc::new(ScriptedProvider::with_calendars(vec![
            calendar("home", "Home"),
            calendar("work", "Work"),
        ]));
        provider.set_events("home", vec![all_day("h1", "2024-01-05", "2024-01-08")]);
        provider.set_events("work", vec![all_day("w1", "2024-01-06", "2024-01-07")]);
        provider
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_all_clears_before_adding() {
        let provider = two_calendars();
        let mut broker = broker(&provider);
        broker.discover_calendars(&CalendarToggles::default()).await.unwrap();

        let report = broker.load_all().await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.sources, 2);
        assert_eq!(report.added, 2);

        let calls = &broker.sink().calls;
        assert_eq!(calls[0], SinkCall::Remove(None));
        assert_eq!(calls.last(), Some(&SinkCall::Update));
        assert_eq!(broker.sink().live_ids(), vec!["h1", "w1"]);
    }

    fn grid_broker(provider: &Arc<ScriptedProvider>) -> EventBroker<GridModel> {
        let mut config = PlannerConfig::default();
        config.time_zone = Some("UTC".into());
        let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut grid = GridModel::with_today(
            GridSettings::from_config(&config).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        );
        grid.build_months(&DateCursor::month_of(first), 3);

        let mut broker = EventBroker::from_config(
            provider.clone(),
            Arc::new(ScriptedAuthorizer::default()),
            &config,
            grid,
        )
        .unwrap();
        broker.set_window(first, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        broker
    }

    /// (id, month index, start day, span) of every label on the grid.
    fn placements(grid: &GridModel) -> BTreeSet<(String, usize, u32, u32)> {
        let mut found = BTreeSet::new();
        for (mi, month) in grid.months().iter().enumerate() {
            let day_labels = month.days().iter().flat_map(|d| d.labels());
            for label in month.labels().iter().chain(day_labels) {
                found.insert((label.id().to_string(), mi, label.start_day(), label.span()));
            }
        }
        found
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_all_twice_is_idempotent() {
        let provider = two_calendars();
        provider.set_events(
            "home",
            vec![
                all_day("h1", "2024-01-05", "2024-01-08"),
                all_day("h2", "2024-01-30", "2024-02-03"),
            ],
        );
        let mut broker = grid_broker(&provider);
        broker.discover_calendars(&CalendarToggles::default()).await.unwrap();

        broker.load_all().await.unwrap();
        broker.sink_mut().settle().await;
        let first = placements(broker.sink());

        let expected: BTreeSet<_> = [
            ("h1", 0, 4, 3),
            ("h2", 0, 29, 2),
            ("h2", 1, 0, 2),
            ("w1", 0, 5, 1),
        ]
        .into_iter()
        .map(|(id, month, start, span)| (id.to_string(), month, start, span))
        .collect();
        assert_eq!(first, expected);

        broker.load_all().await.unwrap();
        broker.sink_mut().settle().await;
        assert_eq!(placements(broker.sink()), first);
        assert_eq!(broker.sink().event_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_source_does_not_abort_siblings() {
        let provider = two_calendars();
        let mut broker = broker(&provider);
        broker.discover_calendars(&CalendarToggles::default()).await.unwrap();
        provider.fail_next_list(PlannerError::from_status(500, "backend"));

        let report = broker.load_all().await.unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Home"));
        assert_eq!(broker.sink().live_ids(), vec!["w1"]);
        assert_eq!(broker.source("home").unwrap().sync_token(), None);
        assert!(broker.source("work").unwrap().sync_token().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_configuration_is_fatal_before_fetching() {
        let provider = two_calendars();
        let mut broker = EventBroker::new(
            provider.clone(),
            Arc::new(ScriptedAuthorizer::unconfigured()),
            EventOptions::default(),
            Duration::from_secs(3),
            RecordingSink::default(),
        );
        broker.add_public_calendar("home", "Home", "#9fe1e7", "#000000");
        broker.set_window(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        );

        let result = broker.load_all().await;
        assert!(matches!(result, Err(PlannerError::ConfigurationMissing(_))));
        assert_eq!(provider.list_calls(), 0);
        assert!(broker.sink().calls.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_skips_sources_that_never_loaded() {
        let provider = two_calendars();
        let mut broker = broker(&provider);
        broker.discover_calendars(&CalendarToggles::default()).await.unwrap();

        let report = broker.sync_all().await.unwrap();
        assert_eq!(report.sources, 0);
        assert_eq!(provider.list_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gone_sync_token_triggers_exactly_one_full_fetch() {
        let provider = two_calendars();
        let mut broker = broker(&provider);
        broker.discover_calendars(&CalendarToggles::default()).await.unwrap();
        broker.load_all().await.unwrap();
        assert_eq!(provider.full_fetches("home"), 1);

        provider.fail_next_list(PlannerError::SyncTokenInvalid);
        let report = broker.sync_all().await.unwrap();

        assert!(report.reloaded);
        assert!(report.is_clean());
        assert_eq!(provider.full_fetches("home"), 2);
        assert_eq!(provider.full_fetches("work"), 2);
        assert!(broker.source("home").unwrap().sync_token().is_some());
        assert_eq!(broker.sink().live_ids(), vec!["h1", "w1"]);

        // a second failure inside the backoff period is reported, not reloaded
        provider.fail_next_list(PlannerError::SyncTokenInvalid);
        let report = broker.sync_all().await.unwrap();
        assert!(!report.reloaded);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(provider.full_fetches("home"), 2);
        assert_eq!(broker.source("home").unwrap().sync_token(), None);

        // still held back
        let report = broker.sync_all().await.unwrap();
        assert!(!report.reloaded);
        assert_eq!(provider.full_fetches("home"), 2);

        // the held-back reload runs once the backoff has passed
        tokio::time::advance(Duration::from_secs(3)).await;
        let report = broker.sync_all().await.unwrap();
        assert!(report.reloaded);
        assert!(report.is_clean());
        assert_eq!(provider.full_fetches("home"), 3);
        assert_eq!(provider.full_fetches("work"), 3);
        assert!(broker.source("home").unwrap().sync_token().is_some());
        assert_eq!(broker.sink().live_ids(), vec!["h1", "w1"]);

        // and the next pass is incremental again
        let report = broker.sync_all().await.unwrap();
        assert!(!report.reloaded);
        assert_eq!(report.sources, 2);
        assert_eq!(provider.full_fetches("home"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rediscovery_applies_changed_toggles() {
        let provider = two_calendars();
        let mut broker = broker(&provider);
        broker.discover_calendars(&CalendarToggles::default()).await.unwrap();
        broker.load_all().await.unwrap();
        assert_eq!(broker.sink().live_ids(), vec!["h1", "w1"]);

        let mut toggles = CalendarToggles::default();
        toggles.set_hidden("work", true);
        broker.discover_calendars(&toggles).await.unwrap();

        let work = broker.source("work").unwrap();
        assert!(!work.is_visible());
        assert_eq!(work.sync_token(), None);
        assert!(broker.source("home").unwrap().sync_token().is_some());
        assert_eq!(broker.sink().live_ids(), vec!["h1"]);
        assert_eq!(broker.sink().calls.last(), Some(&SinkCall::Update));

        toggles.set_hidden("work", false);
        broker.discover_calendars(&toggles).await.unwrap();
        assert!(broker.source("work").unwrap().is_visible());
        assert_eq!(provider.full_fetches("work"), 2);
        assert_eq!(broker.sink().live_ids(), vec!["h1", "w1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_calendars() {
        let provider = two_calendars();
        let mut broker = broker(&provider);
        let mut toggles = CalendarToggles::default();
        toggles.set_hidden("work", true);
        broker.discover_calendars(&toggles).await.unwrap();

        broker.load_all().await.unwrap();
        assert_eq!(broker.sink().live_ids(), vec!["h1"]);
        assert_eq!(provider.full_fetches("work"), 0);

        let report = broker.set_visible("work", true).await.unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(broker.sink().live_ids(), vec!["h1", "w1"]);

        let report = broker.set_visible("home", false).await.unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(broker.sink().live_ids(), vec!["w1"]);
        assert!(broker.set_visible("nope", false).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_loads_palette() {
        let provider = two_calendars();
        let mut broker = broker(&provider);
        broker.connect().await.unwrap();
        assert!(broker.options().palette.contains_key("11"));
    }
}
