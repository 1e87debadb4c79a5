//! Virtual paging over months.
//!
//! The controller keeps one anchor month (the first visible month) and
//! always builds `buffer + visible + buffer` months around it. Scrolling to
//! the end of the page, or jumping via the navbar, moves the anchor and
//! rebuilds the whole page.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::broker::{EventBroker, LoadReport};
use crate::config::PlannerConfig;
use crate::date::DateCursor;
use crate::error::PlannerResult;
use crate::grid::GridModel;

/// Days shown across the full width of the navbar.
const NAVBAR_DAYS: f64 = 365.0 * 5.5;

/// Sent once a rebuilt page is loaded and laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLoaded {
    pub generation: u64,
    /// Months before the first visible one; the renderer scrolls past these.
    pub buffer: u32,
    /// `YYYY-MM` of the first visible month.
    pub anchor: String,
}

/// Months currently in view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisibleMonths {
    /// Page index of the first visible month.
    pub first: usize,
    pub months: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageMetrics {
    /// Scroll area size relative to the viewport, in percent.
    pub scroll_size_percent: f64,
    pub year: i32,
    pub page_length: u32,
}

pub struct PageController {
    config: PlannerConfig,
    anchor: DateCursor,
    broker: EventBroker<GridModel>,
    generation: u64,
    loaded: watch::Sender<Option<PageLoaded>>,
}

impl PageController {
    pub fn new(config: PlannerConfig, broker: EventBroker<GridModel>) -> Self {
        let anchor = DateCursor::month_of(broker.sink().today());
        let (loaded, _) = watch::channel(None);
        PageController {
            config,
            anchor,
            broker,
            generation: 0,
            loaded,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PageLoaded>> {
        self.loaded.subscribe()
    }

    pub fn grid(&self) -> &GridModel {
        self.broker.sink()
    }

    pub fn broker(&self) -> &EventBroker<GridModel> {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut EventBroker<GridModel> {
        &mut self.broker
    }

    pub fn anchor(&self) -> &DateCursor {
        &self.anchor
    }

    pub fn buffer(&self) -> u32 {
        self.config.scroll_buffer
    }

    pub fn page_length(&self) -> u32 {
        self.config.page_length()
    }

    /// Months in view at once.
    pub fn visible_count(&self) -> usize {
        self.config.month_count as usize
    }

    /// Position the anchor from the configuration and build the first page.
    pub async fn start(&mut self) -> PlannerResult<LoadReport> {
        self.anchor = initial_anchor(&self.config, self.grid().today());
        self.load_page().await
    }

    pub async fn reset(&mut self) -> PlannerResult<LoadReport> {
        self.start().await
    }

    /// Start the page at `anchor`'s month.
    pub async fn jump_to(&mut self, anchor: NaiveDate) -> PlannerResult<LoadReport> {
        self.anchor = DateCursor::month_of(anchor);
        self.load_page().await
    }

    /// The user scrolled to the edge of the page; month `visible_index` is
    /// the first one in view. Its month becomes the new anchor.
    pub async fn on_scroll_continue(&mut self, visible_index: usize) -> PlannerResult<LoadReport> {
        let shift = visible_index as i64 - i64::from(self.buffer());
        self.anchor.add_months(shift as i32);
        self.load_page().await
    }

    /// Jump to the month `day_offset` days from the middle of the anchor's
    /// year (July 1st is offset 1).
    pub async fn on_navbar_click(&mut self, day_offset: i64) -> PlannerResult<LoadReport> {
        self.anchor = navbar_anchor(self.anchor.year(), day_offset);
        self.load_page().await
    }

    /// Pull incremental changes and wait for the layout to settle.
    pub async fn sync(&mut self) -> PlannerResult<LoadReport> {
        let report = self.broker.sync_all().await?;
        self.broker.sink_mut().settle().await;
        Ok(report)
    }

    /// Show or hide a calendar on the current page.
    pub async fn set_calendar_visible(&mut self, id: &str, visible: bool) -> PlannerResult<LoadReport> {
        let report = self.broker.set_visible(id, visible).await?;
        self.broker.sink_mut().settle().await;
        Ok(report)
    }

    async fn load_page(&mut self) -> PlannerResult<LoadReport> {
        let mut first = self.anchor.clone();
        first.add_months(-(self.buffer() as i32));

        let page_length = self.page_length();
        let grid = self.broker.sink_mut();
        grid.build_months(&first, page_length);
        let (Some(start), Some(end)) = (grid.first_day(), grid.end_day()) else {
            warn!("Empty page");
            return Ok(LoadReport::default());
        };
        self.broker.set_window(start, end);
        info!(anchor = %self.anchor.ym(), %start, %end, "Loading page");

        let report = self.broker.load_all().await?;
        self.broker.sink_mut().settle().await;

        self.generation += 1;
        self.loaded.send_replace(Some(PageLoaded {
            generation: self.generation,
            buffer: self.buffer(),
            anchor: self.anchor.ym(),
        }));
        Ok(report)
    }

    /// Map scroll position to the months in view.
    ///
    /// `extents` holds each month header's `(position, size)` along the
    /// scroll axis. A month counts as visible once its midpoint is past
    /// `scroll_pos`.
    pub fn visible_months(&self, scroll_pos: f64, extents: &[(f64, f64)]) -> VisibleMonths {
        visible_months(scroll_pos, extents, self.visible_count())
    }

    pub fn grid_areas(&self) -> String {
        self.grid().grid_areas()
    }

    pub fn metrics(&self) -> PageMetrics {
        PageMetrics {
            scroll_size_percent: f64::from(self.page_length()) / f64::from(self.config.month_count)
                * 100.0,
            year: self.anchor.year(),
            page_length: self.page_length(),
        }
    }
}

/// First visible month for a fresh start: the current month shifted by the
/// auto-scroll offset, or the most recent occurrence of `first_month`.
pub fn initial_anchor(config: &PlannerConfig, today: NaiveDate) -> DateCursor {
    let mut anchor = DateCursor::month_of(today);
    if config.auto_scroll {
        anchor.add_months(config.auto_scroll_offset);
    } else {
        let mut offset = config.first_month as i32 - today.month() as i32;
        if offset > 0 {
            offset -= 12;
        }
        anchor.add_months(offset);
    }
    anchor
}

fn navbar_anchor(year: i32, day_offset: i64) -> DateCursor {
    // offset 0 is June 30th
    let mut day = match NaiveDate::from_ymd_opt(year, 7, 1) {
        Some(july) => DateCursor::day(july),
        None => DateCursor::today(),
    };
    day.add_days(day_offset - 1);
    DateCursor::month_of(day.date())
}

/// Day offset from the navbar centre for a click at `click_x` on a bar
/// `width` wide.
pub fn navbar_day_offset(click_x: f64, width: f64) -> i64 {
    if width <= 0.0 {
        return 0;
    }
    let day_px = width / NAVBAR_DAYS;
    ((click_x - width / 2.0) / day_px).round() as i64
}

pub fn visible_months(scroll_pos: f64, extents: &[(f64, f64)], count: usize) -> VisibleMonths {
    let mut visible = VisibleMonths::default();
    for (i, (pos, size)) in extents.iter().enumerate() {
        if pos + size / 2.0 > scroll_pos {
            if visible.months.is_empty() {
                visible.first = i;
            }
            visible.months.push(i);
        }
        if visible.months.len() == count {
            break;
        }
    }
    visible
}
