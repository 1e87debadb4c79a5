//! Normalized events.
//!
//! An `EventRecord` is what the grid places: a start day, a whole-day span and
//! display metadata. It is built once from a provider payload and never
//! mutated; an update arrives as a new record with the same id.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};

use crate::config::EventBackground;
use crate::date::{DateCursor, DisplayZone};
use crate::error::{PlannerError, PlannerResult};
use crate::provider::{Colour, ColourPalette, EventDateTime, ProviderEvent};

/// Records are shared between the broker's deltas and the grid's placements.
pub type SharedRecord = Arc<EventRecord>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub id: String,
    pub calendar_id: String,
    /// Day the event starts on, in the display zone.
    #[serde(serialize_with = "serialize_cursor")]
    pub start_date: DateCursor,
    /// Calendar days touched, at least 1.
    pub span_days: u32,
    pub timed: bool,
    /// Minutes after midnight for timed events, -1 when serialized for all-day.
    #[serde(serialize_with = "serialize_start_minute")]
    pub start_minute: Option<u32>,
    /// Tooltip: calendar name, description and location.
    pub title: String,
    /// Label text: time prefix (timed events) and summary.
    pub description: String,
    pub colour: Colour,
    pub source_link: Option<String>,
    pub location: Option<String>,
}

fn serialize_cursor<S: Serializer>(cursor: &DateCursor, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&cursor.ymd())
}

fn serialize_start_minute<S: Serializer>(minute: &Option<u32>, s: S) -> Result<S::Ok, S::Error> {
    match minute {
        Some(m) => s.serialize_i64(i64::from(*m)),
        None => s.serialize_i64(-1),
    }
}

/// Everything normalization needs besides the payload itself.
#[derive(Debug, Clone)]
pub struct NormalizeContext<'a> {
    pub calendar_id: &'a str,
    pub calendar_name: &'a str,
    pub calendar_colour: &'a Colour,
    pub palette: &'a ColourPalette,
    pub background: EventBackground,
    pub zone: DisplayZone,
    pub time_24h: bool,
    pub show_timed: bool,
    pub show_all_day: bool,
}

impl EventRecord {
    /// Build a record from a provider event.
    ///
    /// Returns `Ok(None)` when the event's category is filtered out, and
    /// `MalformedEvent` when it has no usable start.
    pub fn from_provider(event: &ProviderEvent, ctx: &NormalizeContext) -> PlannerResult<Option<Self>> {
        let start = event
            .start
            .as_ref()
            .ok_or_else(|| PlannerError::MalformedEvent(format!("Event {} has no start", event.id)))?;

        let (start_date, span_days, start_minute, prefix) = if let Some(raw) = &start.date_time {
            if !ctx.show_timed {
                return Ok(None);
            }
            let start_local = parse_timed(raw, &event.id, ctx.zone)?;
            let end_local = match event.end.as_ref().and_then(|e| e.date_time.as_deref()) {
                Some(raw) => parse_timed(raw, &event.id, ctx.zone)?,
                None => start_local,
            };
            let cursor = DateCursor::instant(start_local);
            let prefix = cursor
                .time_title(ctx.time_24h)
                .map(|t| format!("{} ", t))
                .unwrap_or_default();
            (
                DateCursor::day(start_local.date()),
                timed_span(start_local, end_local),
                cursor.minutes_of_day(),
                prefix,
            )
        } else if let Some(raw) = &start.date {
            if !ctx.show_all_day {
                return Ok(None);
            }
            let start_date = DateCursor::parse_ymd(raw)?;
            let span = match event.end.as_ref().and_then(|e| e.date.as_deref()) {
                Some(raw) => DateCursor::day_span(start_date.date(), DateCursor::parse_ymd(raw)?.date()),
                None => 1,
            };
            (start_date, clamp_span(span), None, String::new())
        } else {
            return Err(PlannerError::MalformedEvent(format!(
                "Event {} start has neither date nor dateTime",
                event.id
            )));
        };

        let description = format!("{}{}", prefix, event.summary.as_deref().unwrap_or_default());
        let mut title = format!("{} | {}", ctx.calendar_name, description);
        if let Some(location) = &event.location {
            title.push('\n');
            title.push_str(location);
        }

        Ok(Some(EventRecord {
            id: event.id.clone(),
            calendar_id: ctx.calendar_id.to_string(),
            start_date,
            span_days,
            timed: start_minute.is_some(),
            start_minute,
            title,
            description,
            colour: event_colour(event, ctx),
            source_link: event.html_link.clone(),
            location: event.location.clone(),
        }))
    }

    /// Link to the provider's edit page for this event.
    pub fn edit_link(&self) -> Option<String> {
        self.source_link
            .as_ref()
            .map(|link| link.replace("event?eid=", "r/eventedit/"))
    }

    /// True when the record is drawn as a bar rather than a day-local label.
    /// Single-day timed events always stay day-local.
    pub fn is_multi_day(&self, single_day_as_multi_day: bool) -> bool {
        self.span_days > 1 || (single_day_as_multi_day && !self.timed)
    }
}

fn parse_timed(raw: &str, id: &str, zone: DisplayZone) -> PlannerResult<NaiveDateTime> {
    let dt = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| PlannerError::MalformedEvent(format!("Event {} has bad dateTime '{}': {}", id, raw, e)))?;
    Ok(zone.to_local(&dt))
}

/// Days touched by `[start, end)`. An end at exactly midnight does not touch
/// the day it opens.
fn timed_span(start: NaiveDateTime, end: NaiveDateTime) -> u32 {
    let mut last_day = end.date();
    if end > start && end.time() == NaiveTime::MIN {
        last_day = last_day.pred_opt().unwrap_or(last_day);
    }
    clamp_span(DateCursor::day_span(start.date(), last_day) + 1)
}

fn clamp_span(span: i64) -> u32 {
    u32::try_from(span.max(1)).unwrap_or(u32::MAX)
}

fn event_colour(event: &ProviderEvent, ctx: &NormalizeContext) -> Colour {
    match ctx.background {
        EventBackground::Cal => ctx.calendar_colour.clone(),
        EventBackground::White => Colour {
            text: None,
            background: Some("#ffffff".into()),
        },
        EventBackground::Evt => event
            .color_id
            .as_ref()
            .and_then(|id| ctx.palette.get(id))
            .cloned()
            .unwrap_or_else(|| ctx.calendar_colour.clone()),
    }
}

impl EventDateTime {
    pub fn all_day(date: &str) -> Self {
        EventDateTime {
            date: Some(date.to_string()),
            date_time: None,
        }
    }

    pub fn timed(date_time: &str) -> Self {
        EventDateTime {
            date: None,
            date_time: Some(date_time.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn ctx<'a>(colour: &'a Colour, palette: &'a ColourPalette) -> NormalizeContext<'a> {
        NormalizeContext {
            calendar_id: "work@example.com",
            calendar_name: "Work",
            calendar_colour: colour,
            palette,
            background: EventBackground::Cal,
            zone: DisplayZone::from_name(Some("UTC")).unwrap(),
            time_24h: true,
            show_timed: true,
            show_all_day: true,
        }
    }

    fn all_day(id: &str, start: &str, end: &str) -> ProviderEvent {
        ProviderEvent {
            id: id.into(),
            summary: Some("Offsite".into()),
            start: Some(EventDateTime::all_day(start)),
            end: Some(EventDateTime::all_day(end)),
            ..Default::default()
        }
    }

    #[test]
    fn test_all_day_span_and_metadata() {
        let colour = Colour::new("#000000", "#9fe1e7");
        let palette = ColourPalette::new();
        let mut event = all_day("e1", "2024-01-05", "2024-01-08");
        event.location = Some("Berlin".into());
        event.html_link = Some("https://www.google.com/calendar/event?eid=abc".into());

        let record = EventRecord::from_provider(&event, &ctx(&colour, &palette))
            .unwrap()
            .unwrap();
        assert_eq!(record.start_date.date(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(record.span_days, 3);
        assert!(!record.timed);
        assert_eq!(record.start_minute, None);
        assert_eq!(record.description, "Offsite");
        assert_eq!(record.title, "Work | Offsite\nBerlin");
        assert_eq!(record.colour, colour);
        assert_eq!(
            record.edit_link().as_deref(),
            Some("https://www.google.com/calendar/r/eventedit/abc")
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["start_date"], "2024-01-05");
        assert_eq!(json["start_minute"], -1);
    }

    #[test]
    fn test_zero_span_is_normalized_to_one() {
        let colour = Colour::default();
        let palette = ColourPalette::new();
        let event = all_day("e1", "2024-01-05", "2024-01-05");
        let record = EventRecord::from_provider(&event, &ctx(&colour, &palette))
            .unwrap()
            .unwrap();
        assert_eq!(record.span_days, 1);
    }

    #[test]
    fn test_timed_event_spanning_midnight() {
        let colour = Colour::default();
        let palette = ColourPalette::new();
        let event = ProviderEvent {
            id: "night".into(),
            summary: Some("Deploy".into()),
            start: Some(EventDateTime::timed("2024-01-05T22:30:00Z")),
            end: Some(EventDateTime::timed("2024-01-06T01:00:00Z")),
            ..Default::default()
        };
        let record = EventRecord::from_provider(&event, &ctx(&colour, &palette))
            .unwrap()
            .unwrap();
        assert!(record.timed);
        assert_eq!(record.span_days, 2);
        assert_eq!(record.start_minute, Some(22 * 60 + 30));
        assert_eq!(record.description, "22:30 Deploy");

        let ends_at_midnight = ProviderEvent {
            end: Some(EventDateTime::timed("2024-01-06T00:00:00Z")),
            ..event
        };
        let record = EventRecord::from_provider(&ends_at_midnight, &ctx(&colour, &palette))
            .unwrap()
            .unwrap();
        assert_eq!(record.span_days, 1);
    }

    #[test]
    fn test_twelve_hour_prefix_and_zone() {
        let colour = Colour::default();
        let palette = ColourPalette::new();
        let mut context = ctx(&colour, &palette);
        context.time_24h = false;
        context.zone = DisplayZone::from_name(Some("America/New_York")).unwrap();

        let event = ProviderEvent {
            id: "call".into(),
            summary: Some("Call".into()),
            start: Some(EventDateTime::timed("2024-01-05T14:05:00Z")),
            end: Some(EventDateTime::timed("2024-01-05T15:00:00Z")),
            ..Default::default()
        };
        let record = EventRecord::from_provider(&event, &context).unwrap().unwrap();
        assert_eq!(record.description, "9:05am Call");
        assert_eq!(record.start_minute, Some(9 * 60 + 5));
    }

    #[test]
    fn test_filters_and_malformed() {
        let colour = Colour::default();
        let palette = ColourPalette::new();
        let mut context = ctx(&colour, &palette);
        context.show_all_day = false;
        let event = all_day("e1", "2024-01-05", "2024-01-06");
        assert!(EventRecord::from_provider(&event, &context).unwrap().is_none());

        let no_start = ProviderEvent {
            id: "broken".into(),
            ..Default::default()
        };
        assert!(matches!(
            EventRecord::from_provider(&no_start, &ctx(&colour, &palette)),
            Err(PlannerError::MalformedEvent(_))
        ));

        let bad_date = all_day("bad", "2024-02-30", "2024-03-01");
        assert!(EventRecord::from_provider(&bad_date, &ctx(&colour, &palette)).is_err());
    }

    #[test]
    fn test_colour_policy() {
        let calendar = Colour::new("#000000", "#9fe1e7");
        let mut palette = ColourPalette::new();
        palette.insert("11".into(), Colour::new("#1d1d1d", "#dc2127"));

        let mut context = ctx(&calendar, &palette);
        context.background = EventBackground::Evt;

        let mut event = all_day("e1", "2024-01-05", "2024-01-06");
        event.color_id = Some("11".into());
        let record = EventRecord::from_provider(&event, &context).unwrap().unwrap();
        assert_eq!(record.colour.background.as_deref(), Some("#dc2127"));

        event.color_id = Some("99".into());
        let record = EventRecord::from_provider(&event, &context).unwrap().unwrap();
        assert_eq!(record.colour, calendar);

        context.background = EventBackground::White;
        let record = EventRecord::from_provider(&event, &context).unwrap().unwrap();
        assert_eq!(record.colour.background.as_deref(), Some("#ffffff"));
        assert_eq!(record.colour.text, None);
    }
}
