//! The layout tree: Month → Day → Label.
//!
//! `GridModel` builds a page of months, receives event deltas as an
//! `EventSink` and packs multi-day bars into slots. Each `EventRecord` owns a
//! `Projection` listing where its labels went, one bar per month touched or
//! one day-local label per day.

mod day;
mod intent;
mod label;
mod month;
mod slots;
mod style;

use std::collections::HashMap;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate, Weekday};
use tracing::debug;

pub use day::Day;
pub use intent::ClickIntent;
pub use label::{Label, LabelBorder};
pub use month::Month;
pub use slots::{SlotPacker, interval_mask};
pub use style::{DayStyle, GridSpan, LABEL_INSET_EM, LabelStyle, Side};

use crate::broker::EventSink;
use crate::config::{LayoutOrientation, PlannerConfig};
use crate::date::{DateCursor, MonthNames, WeekendDays};
use crate::error::PlannerResult;
use crate::event::SharedRecord;
use crate::relayout::{Change, RelayoutQueue};

#[derive(Debug, Clone)]
pub struct GridSettings {
    pub week_start: Weekday,
    pub align_weekends: bool,
    pub weekends: WeekendDays,
    pub month_names: MonthNames,
    pub single_day_as_multi_day: bool,
    pub orientation: LayoutOrientation,
    pub slot_height_em: f32,
    pub bulk_relayout_delay: Duration,
    pub change_relayout_delay: Duration,
}

impl Default for GridSettings {
    fn default() -> Self {
        GridSettings {
            week_start: Weekday::Mon,
            align_weekends: true,
            weekends: WeekendDays::default(),
            month_names: MonthNames::default(),
            single_day_as_multi_day: false,
            orientation: LayoutOrientation::Column,
            slot_height_em: 1.4,
            bulk_relayout_delay: Duration::from_millis(1000),
            change_relayout_delay: Duration::from_millis(100),
        }
    }
}

impl GridSettings {
    pub fn from_config(config: &PlannerConfig) -> PlannerResult<Self> {
        Ok(GridSettings {
            week_start: config.week_start()?,
            align_weekends: config.align_weekends,
            weekends: config.weekend_days()?,
            month_names: config.month_name_list()?,
            single_day_as_multi_day: config.single_day_as_multi_day,
            orientation: config.layout,
            slot_height_em: config.slot_height_em,
            bulk_relayout_delay: config.bulk_relayout_delay(),
            change_relayout_delay: config.change_relayout_delay(),
        })
    }
}

/// Where one record's labels live.
#[derive(Debug, Clone)]
pub struct Projection {
    pub record: SharedRecord,
    /// Months holding a bar for the record.
    pub months: Vec<usize>,
    /// `(month, day)` pairs holding a day-local label.
    pub days: Vec<(usize, u32)>,
}

pub struct GridModel {
    settings: GridSettings,
    today: NaiveDate,
    months: Vec<Month>,
    total_days: i64,
    projections: HashMap<String, Projection>,
    relayout: RelayoutQueue,
    generation: u64,
}

impl GridModel {
    pub fn new(settings: GridSettings) -> Self {
        Self::with_today(settings, Local::now().date_naive())
    }

    /// A grid that treats `today` as the current date.
    pub fn with_today(settings: GridSettings, today: NaiveDate) -> Self {
        let relayout = RelayoutQueue::new(settings.bulk_relayout_delay, settings.change_relayout_delay);
        GridModel {
            settings,
            today,
            months: Vec::new(),
            total_days: 0,
            projections: HashMap::new(),
            relayout,
            generation: 0,
        }
    }

    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Discard the current page and build `count` months starting with the
    /// month containing `anchor`.
    pub fn build_months(&mut self, anchor: &DateCursor, count: u32) {
        let week_start = self.settings.align_weekends.then_some(self.settings.week_start);
        let mut cursor = DateCursor::month_of(anchor.date());

        self.months.clear();
        self.projections.clear();
        self.relayout.cancel();
        for _ in 0..count {
            self.months
                .push(Month::new(&cursor, week_start, &self.settings.weekends, self.today));
            cursor.add_months(1);
        }
        self.total_days = self.months.iter().map(|m| i64::from(m.len())).sum();
        debug!(first = %anchor.ym(), count, days = self.total_days, "Built page");
    }

    pub fn months(&self) -> &[Month] {
        &self.months
    }

    pub fn month(&self, index: usize) -> Option<&Month> {
        self.months.get(index)
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.months.first().map(Month::first_day)
    }

    /// Exclusive end of the page.
    pub fn end_day(&self) -> Option<NaiveDate> {
        let mut end = self.months.last()?.cursor().clone();
        end.add_months(1);
        Some(end.date())
    }

    pub fn total_days(&self) -> i64 {
        self.total_days
    }

    fn month_index(&self, date: NaiveDate) -> Option<usize> {
        let first = self.months.first()?.first_day();
        let delta = (date.year() - first.year()) * 12 + date.month() as i32 - first.month() as i32;
        usize::try_from(delta).ok().filter(|&i| i < self.months.len())
    }

    /// Place `record` on every built day it touches. An id already on the
    /// grid is replaced.
    pub fn add_event(&mut self, record: SharedRecord) {
        if self.projections.contains_key(&record.id) {
            self.remove_labels(&record.id);
        }
        self.relayout.schedule(Change::Bulk);

        let Some(first_day) = self.first_day() else {
            return;
        };
        let offset = DateCursor::day_span(first_day, record.start_date.date());
        let span = i64::from(record.span_days.max(1));
        let bar = record.is_multi_day(self.settings.single_day_as_multi_day);

        let from = (-offset).clamp(0, span);
        let to = (self.total_days - offset).clamp(0, span);
        if from >= to {
            debug!(id = %record.id, start = %record.start_date, "Event outside page");
            return;
        }

        let mut projection = Projection {
            record: record.clone(),
            months: Vec::new(),
            days: Vec::new(),
        };
        let mut date = record.start_date.clone();
        date.add_days(from);
        for k in from..to {
            if let Some(mi) = self.month_index(date.date()) {
                let day = date.day_of_month() - 1;
                if bar {
                    let border = LabelBorder {
                        first: k == 0,
                        last: k == span - 1,
                    };
                    if self.months[mi].place(&record, day, border) && !projection.months.contains(&mi)
                    {
                        projection.months.push(mi);
                    }
                } else if self.months[mi].place_day_local(&record, day) {
                    projection.days.push((mi, day));
                }
            }
            date.add_days(1);
        }

        self.projections.insert(record.id.clone(), projection);
    }

    /// Remove one id from every month and day, or clear the page.
    pub fn remove_event(&mut self, id: Option<&str>) {
        match id {
            Some(id) => {
                self.remove_labels(id);
            }
            None => {
                for month in &mut self.months {
                    month.remove(None);
                }
                self.projections.clear();
            }
        }
        self.relayout.schedule(Change::Single);
    }

    /// Walks the live label collections, so it works whether or not a
    /// relayout has run since the labels were placed.
    fn remove_labels(&mut self, id: &str) -> usize {
        self.projections.remove(id);
        self.months.iter_mut().map(|m| m.remove(Some(id))).sum()
    }

    pub fn update_events(&mut self) {
        self.relayout.schedule(Change::Single);
    }

    pub fn projection(&self, id: &str) -> Option<&Projection> {
        self.projections.get(id)
    }

    pub fn event_count(&self) -> usize {
        self.projections.len()
    }

    /// Every label carrying `id`, with its month index. Bars first.
    pub fn labels_for(&self, id: &str) -> Vec<(usize, &Label)> {
        let mut found = Vec::new();
        for (mi, month) in self.months.iter().enumerate() {
            found.extend(month.labels().iter().filter(|l| l.id() == id).map(|l| (mi, l)));
        }
        for (mi, month) in self.months.iter().enumerate() {
            for day in month.days() {
                found.extend(day.labels().iter().filter(|l| l.id() == id).map(|l| (mi, l)));
            }
        }
        found
    }

    /// Repack every month.
    pub fn update_layout(&mut self) {
        for month in &mut self.months {
            month.pack();
        }
        self.generation += 1;
        debug!(generation = self.generation, "Layout updated");
    }

    /// Number of layout passes run so far.
    pub fn layout_generation(&self) -> u64 {
        self.generation
    }

    pub fn relayout_pending(&self) -> bool {
        self.relayout.is_pending()
    }

    /// Run the pending relayout if its quiet period is over.
    pub fn poll_relayout(&mut self) -> bool {
        if self.relayout.take_due() {
            self.update_layout();
            return true;
        }
        false
    }

    /// Wait for the pending relayout, if any, and run it.
    pub async fn settle(&mut self) -> bool {
        if self.relayout.settle().await {
            self.update_layout();
            return true;
        }
        false
    }

    pub fn label_style(&self, month: &Month, label: &Label) -> LabelStyle {
        let bar = label.slot().is_some() || month.labels().iter().any(|l| std::ptr::eq(l, label));
        style::label_style(
            month,
            label,
            bar,
            self.settings.orientation,
            self.settings.slot_height_em,
        )
    }

    pub fn day_style(&self, month: &Month, day: &Day) -> DayStyle {
        style::day_style(month, day, self.settings.orientation, self.settings.slot_height_em)
    }

    pub fn grid_areas(&self) -> String {
        style::grid_areas(&self.months, self.settings.orientation)
    }
}

impl EventSink for GridModel {
    fn add_event(&mut self, record: SharedRecord) {
        GridModel::add_event(self, record);
    }

    fn remove_event(&mut self, id: Option<&str>) {
        GridModel::remove_event(self, id);
    }

    fn update_events(&mut self) {
        GridModel::update_events(self);
    }
}
