use chrono::NaiveDate;

use super::label::Label;
use crate::date::{DateCursor, WeekendDays};

#[derive(Debug, Clone)]
pub struct Day {
    cursor: DateCursor,
    index: u32,
    is_weekend: bool,
    is_today: bool,
    labels: Vec<Label>,
    deepest_slot: Option<u32>,
}

impl Day {
    pub(crate) fn new(cursor: DateCursor, index: u32, weekends: &WeekendDays, today: NaiveDate) -> Self {
        Day {
            is_weekend: cursor.is_weekend(weekends),
            is_today: cursor.date() == today,
            cursor,
            index,
            labels: Vec::new(),
            deepest_slot: None,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.cursor.date()
    }

    pub fn cursor(&self) -> &DateCursor {
        &self.cursor
    }

    /// 0-based position within the month.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Day of month, 1-based.
    pub fn number(&self) -> u32 {
        self.cursor.day_of_month()
    }

    pub fn is_weekend(&self) -> bool {
        self.is_weekend
    }

    pub fn is_today(&self) -> bool {
        self.is_today
    }

    /// Day-local (single-day) labels, in arrival order.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Deepest multi-day slot crossing this day after the last layout pass.
    pub fn deepest_slot(&self) -> Option<u32> {
        self.deepest_slot
    }

    pub(crate) fn push_label(&mut self, label: Label) {
        self.labels.push(label);
    }

    /// Drop the first label with `id`, or all labels when `id` is `None`.
    pub(crate) fn remove(&mut self, id: Option<&str>) -> usize {
        match id {
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
        }
    }

    pub(crate) fn set_deepest_slot(&mut self, slot: Option<u32>) {
        self.deepest_slot = slot;
    }
}
