//! What a click on the grid asks for.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::date::DateCursor;
use crate::event::EventRecord;

const PROVIDER_WEB: &str = "https://www.google.com/calendar/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum ClickIntent {
    OpenDay { date: NaiveDate },
    NewEventOnDay { date: NaiveDate },
    OpenEvent { id: String, link: Option<String> },
    OpenMonth { first_day: NaiveDate },
}

impl ClickIntent {
    /// A click on a day number; with the modifier held it creates an event.
    pub fn day(date: NaiveDate, modifier: bool) -> Self {
        if modifier {
            ClickIntent::NewEventOnDay { date }
        } else {
            ClickIntent::OpenDay { date }
        }
    }

    pub fn event(record: &EventRecord) -> Self {
        ClickIntent::OpenEvent {
            id: record.id.clone(),
            link: record.edit_link(),
        }
    }

    pub fn month(first_day: NaiveDate) -> Self {
        ClickIntent::OpenMonth { first_day }
    }

    /// Web page that fulfils the intent, if there is one.
    pub fn url(&self) -> Option<String> {
        match self {
            ClickIntent::OpenDay { date } => Some(format!("{}r/day/{}", PROVIDER_WEB, path_date(*date))),
            ClickIntent::NewEventOnDay { date } => {
                let start = DateCursor::day(*date);
                let mut end = start.clone();
                end.add_days(1);
                Some(format!(
                    "{}r/eventedit?dates={}/{}",
                    PROVIDER_WEB,
                    start.ymd_compact(),
                    end.ymd_compact()
                ))
            }
            ClickIntent::OpenEvent { link, .. } => link.clone(),
            ClickIntent::OpenMonth { first_day } => {
                Some(format!("{}r/month/{}", PROVIDER_WEB, path_date(*first_day)))
            }
        }
    }
}

/// `Y/M/D` without zero padding.
fn path_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.year(), date.month(), date.day())
}
