//! Calendar date cursor.
//!
//! A `DateCursor` is a mutable date value stepped in place by whole days or
//! months. Its `Precision` says what it stands for:
//! - `Day`: midnight of a calendar day
//! - `Month`: midnight on the 1st of a month
//! - `Instant`: a full local date-time (timed event starts)
//!
//! Cursors are cheap to clone, but never `Copy`: callers that need the
//! unmodified value must clone before stepping.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, Months, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Timelike, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};

/// Fixed day length used by [`DateCursor::day_span`].
pub const MS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Day,
    Month,
    Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateCursor {
    dt: NaiveDateTime,
    precision: Precision,
}

impl DateCursor {
    /// Midnight of `date`.
    pub fn day(date: NaiveDate) -> Self {
        DateCursor {
            dt: date.and_time(NaiveTime::MIN),
            precision: Precision::Day,
        }
    }

    /// The 1st of the month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let mut cursor = Self::day(date);
        cursor.align_to_month_start();
        cursor.precision = Precision::Month;
        cursor
    }

    /// A full local date-time.
    pub fn instant(dt: NaiveDateTime) -> Self {
        DateCursor {
            dt,
            precision: Precision::Instant,
        }
    }

    /// Today's date in the local time zone.
    pub fn today() -> Self {
        Self::day(Local::now().date_naive())
    }

    /// Parse a `YYYY-MM-DD` calendar date.
    pub fn parse_ymd(s: &str) -> PlannerResult<Self> {
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| PlannerError::MalformedEvent(format!("Invalid date '{}'", s)))?;
        Ok(Self::day(date))
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn date(&self) -> NaiveDate {
        self.dt.date()
    }

    pub fn year(&self) -> i32 {
        self.dt.year()
    }

    /// Month number, 1-based.
    pub fn month(&self) -> u32 {
        self.dt.month()
    }

    pub fn day_of_month(&self) -> u32 {
        self.dt.day()
    }

    pub fn day_of_week(&self) -> Weekday {
        self.dt.weekday()
    }

    /// Step by `n` days. A month-aligned cursor becomes a day cursor.
    pub fn add_days(&mut self, n: i64) {
        self.dt += Duration::days(n);
        if self.precision == Precision::Month {
            self.precision = Precision::Day;
        }
    }

    /// Step by `n` months, clamping the day to the target month's length.
    pub fn add_months(&mut self, n: i32) {
        let stepped = if n >= 0 {
            self.dt.checked_add_months(Months::new(n.unsigned_abs()))
        } else {
            self.dt.checked_sub_months(Months::new(n.unsigned_abs()))
        };
        if let Some(dt) = stepped {
            self.dt = dt;
        }
    }

    /// Move back to the most recent `start` weekday (or stay if already on it).
    pub fn align_to_week_start(&mut self, start: Weekday) {
        let back = (self.dt.weekday().num_days_from_monday() + 7
            - start.num_days_from_monday())
            % 7;
        self.add_days(-i64::from(back));
    }

    pub fn align_to_month_start(&mut self) {
        let back = self.dt.day() - 1;
        self.dt -= Duration::days(i64::from(back));
    }

    pub fn align_to_year_start(&mut self) {
        self.align_to_month_start();
        let back = self.dt.month() - 1;
        self.add_months(-(back as i32));
    }

    pub fn is_weekend(&self, weekends: &WeekendDays) -> bool {
        weekends.contains(self.day_of_week())
    }

    /// True if this cursor's month lies entirely before `today`'s month.
    pub fn is_past_month(&self, today: NaiveDate) -> bool {
        (self.year(), self.month()) < (today.year(), today.month())
    }

    pub fn is_current_month(&self, today: NaiveDate) -> bool {
        (self.year(), self.month()) == (today.year(), today.month())
    }

    /// Minutes since midnight. Only instants carry a time of day.
    pub fn minutes_of_day(&self) -> Option<u32> {
        match self.precision {
            Precision::Instant => Some(self.dt.hour() * 60 + self.dt.minute()),
            _ => None,
        }
    }

    /// `"9:05"` in 24 hour mode, `"9:05am"` otherwise. Only for instants.
    pub fn time_title(&self, time_24h: bool) -> Option<String> {
        if self.precision != Precision::Instant {
            return None;
        }
        let hh = self.dt.hour();
        let mm = self.dt.minute();
        if time_24h {
            return Some(format!("{}:{:02}", hh, mm));
        }
        let hours = if hh > 12 { hh - 12 } else { hh };
        let suffix = if hh < 12 { "am" } else { "pm" };
        Some(format!("{}:{:02}{}", hours, mm, suffix))
    }

    /// `YYYY-MM`
    pub fn ym(&self) -> String {
        self.dt.format("%Y-%m").to_string()
    }

    /// `YYYY-MM-DD`
    pub fn ymd(&self) -> String {
        self.dt.format("%Y-%m-%d").to_string()
    }

    /// `YYYYMMDD`
    pub fn ymd_compact(&self) -> String {
        self.dt.format("%Y%m%d").to_string()
    }

    /// Month header, e.g. `"Jan 2024"`.
    pub fn month_title(&self, names: &MonthNames) -> String {
        format!("{} {}", names.name(self.month()), self.year())
    }

    /// Whole days from `from` to `to`.
    ///
    /// Both dates are taken as UTC midnight and the millisecond difference is
    /// divided by a fixed day length, matching how the grid has always placed
    /// events.
    pub fn day_span(from: NaiveDate, to: NaiveDate) -> i64 {
        let from_ms = from.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
        let to_ms = to.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
        (to_ms - from_ms) / MS_PER_DAY
    }
}

impl fmt::Display for DateCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.precision {
            Precision::Day => write!(f, "{}", self.ymd()),
            Precision::Month => write!(f, "{}", self.ym()),
            Precision::Instant => write!(f, "{}", self.dt.format("%Y-%m-%dT%H:%M")),
        }
    }
}

/// Time zone the grid is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayZone {
    #[default]
    Local,
    Named(Tz),
}

impl DisplayZone {
    /// `None` means the system zone.
    pub fn from_name(name: Option<&str>) -> PlannerResult<Self> {
        match name {
            None => Ok(DisplayZone::Local),
            Some(name) => name
                .parse::<Tz>()
                .map(DisplayZone::Named)
                .map_err(|_| PlannerError::Config(format!("Unknown time zone '{}'", name))),
        }
    }

    /// Wall-clock time of `dt` in this zone.
    pub fn to_local(&self, dt: &DateTime<FixedOffset>) -> NaiveDateTime {
        match self {
            DisplayZone::Local => dt.with_timezone(&Local).naive_local(),
            DisplayZone::Named(tz) => dt.with_timezone(tz).naive_local(),
        }
    }

    /// The instant of midnight starting `date` in this zone.
    pub fn midnight_utc(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(NaiveTime::MIN);
        let resolved = match self {
            DisplayZone::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            DisplayZone::Named(tz) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        };
        resolved.unwrap_or_else(|| naive.and_utc())
    }
}

/// Weekdays rendered as weekend.
///
/// Parsed from a comma separated list of day numbers where 0 is Sunday,
/// e.g. `"6,0"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekendDays(Vec<Weekday>);

impl WeekendDays {
    pub fn new(days: Vec<Weekday>) -> Self {
        WeekendDays(days)
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0.contains(&day)
    }
}

impl Default for WeekendDays {
    fn default() -> Self {
        WeekendDays(vec![Weekday::Sat, Weekday::Sun])
    }
}

impl FromStr for WeekendDays {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut days = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let n: u8 = part
                .parse()
                .map_err(|_| PlannerError::Config(format!("Invalid weekend day '{}'", part)))?;
            days.push(weekday_from_sunday_index(n)?);
        }
        Ok(WeekendDays(days))
    }
}

/// Map 0 = Sunday .. 6 = Saturday to a `Weekday`.
pub fn weekday_from_sunday_index(n: u8) -> PlannerResult<Weekday> {
    match n {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        _ => Err(PlannerError::Config(format!(
            "Weekday number {} out of range 0-6",
            n
        ))),
    }
}

/// Short month names used in month headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthNames(Vec<String>);

impl MonthNames {
    /// Name of the 1-based `month`, falling back to the number.
    pub fn name(&self, month: u32) -> String {
        (month as usize)
            .checked_sub(1)
            .and_then(|i| self.0.get(i))
            .cloned()
            .unwrap_or_else(|| month.to_string())
    }
}

impl Default for MonthNames {
    fn default() -> Self {
        "Jan-Feb-Mar-Apr-May-Jun-Jul-Aug-Sep-Oct-Nov-Dec"
            .parse()
            .unwrap_or(MonthNames(Vec::new()))
    }
}

impl FromStr for MonthNames {
    type Err = PlannerError;

    /// Parse a dash separated list of twelve names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let names: Vec<String> = s.split('-').map(|n| n.trim().to_string()).collect();
        if names.len() != 12 {
            return Err(PlannerError::Config(format!(
                "Expected 12 month names, got {}",
                names.len()
            )));
        }
        Ok(MonthNames(names))
    }
}
