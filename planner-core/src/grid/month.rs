use chrono::{Datelike, NaiveDate, Weekday};

use super::day::Day;
use super::label::{Label, LabelBorder};
use super::slots::SlotPacker;
use crate::date::{DateCursor, MonthNames, WeekendDays};
use crate::event::SharedRecord;

#[derive(Debug, Clone)]
pub struct Month {
    cursor: DateCursor,
    days: Vec<Day>,
    labels: Vec<Label>,
    offset: u32,
    is_past: bool,
    is_current: bool,
    slots: SlotPacker,
}

impl Month {
    /// Every day of the month containing `cursor`, 1st to last.
    ///
    /// With `week_start` set, `offset` is the number of cells to skip so the
    /// 1st lands under its weekday column.
    pub(crate) fn new(
        cursor: &DateCursor,
        week_start: Option<Weekday>,
        weekends: &WeekendDays,
        today: NaiveDate,
    ) -> Self {
        let first = DateCursor::month_of(cursor.date());

        let mut days = Vec::with_capacity(31);
        let mut day = DateCursor::day(first.date());
        while day.month() == first.month() {
            days.push(Day::new(day.clone(), days.len() as u32, weekends, today));
            day.add_days(1);
        }

        let offset = week_start
            .map(|start| {
                (first.day_of_week().num_days_from_sunday() + 7 - start.num_days_from_sunday()) % 7
            })
            .unwrap_or(0);

        Month {
            is_past: first.is_past_month(today),
            is_current: first.is_current_month(today),
            cursor: first,
            days,
            labels: Vec::new(),
            offset,
            slots: SlotPacker::new(),
        }
    }

    /// `M-YYYY-MM`, unique within a page.
    pub fn id(&self) -> String {
        format!("M-{}", self.cursor.ym())
    }

    pub fn title(&self, names: &MonthNames) -> String {
        self.cursor.month_title(names)
    }

    pub fn cursor(&self) -> &DateCursor {
        &self.cursor
    }

    pub fn first_day(&self) -> NaiveDate {
        self.cursor.date()
    }

    pub fn year(&self) -> i32 {
        self.cursor.year()
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    pub fn day(&self, index: u32) -> Option<&Day> {
        self.days.get(index as usize)
    }

    pub fn len(&self) -> u32 {
        self.days.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Multi-day labels, in creation order.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn is_past(&self) -> bool {
        self.is_past
    }

    pub fn is_current(&self) -> bool {
        self.is_current
    }

    pub fn slots(&self) -> &[u64] {
        self.slots.occupied()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (date.year(), date.month()) == (self.cursor.year(), self.cursor.month())
    }

    /// Put a day-local label on day `index`.
    pub(crate) fn place_day_local(&mut self, event: &SharedRecord, index: u32) -> bool {
        match self.days.get_mut(index as usize) {
            Some(day) => {
                day.push_label(Label::new(event.clone(), index, LabelBorder { first: true, last: true }));
                true
            }
            None => false,
        }
    }

    /// Extend this month's bar for `event` to day `index`, or start one there.
    pub(crate) fn place(&mut self, event: &SharedRecord, index: u32, border: LabelBorder) -> bool {
        if index >= self.len() {
            return false;
        }
        match self.labels.iter_mut().find(|l| l.id() == event.id) {
            Some(label) => label.extend_to(index, border),
            None => {
                let mut label = Label::new(event.clone(), index, border);
                label.extend_to(index, border);
                self.labels.push(label);
            }
        }
        true
    }

    /// Remove the bar with `id` and the first day-local label with `id` on
    /// each day. `None` clears every label.
    pub(crate) fn remove(&mut self, id: Option<&str>) -> usize {
        let mut removed = match id {
            None => {
                let count = self.labels.len();
                self.labels.clear();
                count
            }
            Some(id) => match self.labels.iter().position(|l| l.id() == id) {
                Some(i) => {
                    self.labels.remove(i);
                    1
                }
                None => 0,
            },
        };
        for day in &mut self.days {
            removed += day.remove(id);
        }
        removed
    }

    /// Repack every bar from scratch, in creation order, then record on each
    /// day the deepest slot crossing it.
    pub(crate) fn pack(&mut self) {
        self.slots = SlotPacker::new();
        for label in &mut self.labels {
            let slot = self.slots.place(label.start_day(), label.span());
            label.set_slot(Some(slot));
        }
        for day in &mut self.days {
            day.set_deepest_slot(self.slots.deepest_on(day.index()));
        }
    }

    /// Slot count after the last pack.
    pub fn depth(&self) -> usize {
        self.slots.slot_count()
    }
}
