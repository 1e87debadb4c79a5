use serde::Serialize;

use crate::event::SharedRecord;

/// Which ends of an event a label segment carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelBorder {
    pub first: bool,
    pub last: bool,
}

/// One event's placement inside one month.
///
/// Multi-day labels live on their month and cover `[start_day, start_day +
/// span)`; day-local labels live on a single day with a span of 1.
#[derive(Debug, Clone)]
pub struct Label {
    event: SharedRecord,
    start_day: u32,
    span: u32,
    border: LabelBorder,
    slot: Option<u32>,
}

impl Label {
    pub(crate) fn new(event: SharedRecord, day: u32, border: LabelBorder) -> Self {
        Label {
            event,
            start_day: day,
            span: 1,
            border,
            slot: None,
        }
    }

    /// Stretch the label to end on `day`, taking over its end marker.
    pub(crate) fn extend_to(&mut self, day: u32, border: LabelBorder) {
        if day >= self.start_day {
            self.span = day - self.start_day + 1;
        }
        if border.last {
            self.border.last = true;
        }
    }

    pub(crate) fn set_slot(&mut self, slot: Option<u32>) {
        self.slot = slot;
    }

    pub fn event(&self) -> &SharedRecord {
        &self.event
    }

    pub fn id(&self) -> &str {
        &self.event.id
    }

    /// 0-based day index within the owning month.
    pub fn start_day(&self) -> u32 {
        self.start_day
    }

    pub fn span(&self) -> u32 {
        self.span
    }

    /// Last day index covered, inclusive.
    pub fn end_day(&self) -> u32 {
        self.start_day + self.span - 1
    }

    pub fn is_first_segment(&self) -> bool {
        self.border.first
    }

    pub fn is_last_segment(&self) -> bool {
        self.border.last
    }

    pub fn border(&self) -> LabelBorder {
        self.border
    }

    /// Slot assigned by the last layout pass. Day-local labels have none.
    pub fn slot(&self) -> Option<u32> {
        self.slot
    }
}
