//! Event types for calendar events.
//!
//! This module provides the core types for representing calendar events:
//! - [`CalendarEvent`]: an event as fetched from the calendar listing API
//! - [`EventRow`]: a display-ready view of an event for table rendering

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::format::format_event_time;
use crate::time::EventTime;

/// Title shown for events without a summary.
pub const UNTITLED: &str = "(No title)";

/// A calendar event as returned by the calendar listing API.
///
/// Records are read-only once fetched: filtering and rendering derive new
/// values but never mutate the event itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Opaque identifier supplied by the calendar API.
    pub id: String,
    /// Display title.
    pub summary: Option<String>,
    /// Free-text location.
    pub location: Option<String>,
    /// When the event starts, if known.
    pub start: Option<EventTime>,
    /// When the event ends, if known.
    pub end: Option<EventTime>,
    /// Link to the event in the calendar web UI.
    pub html_link: Option<String>,
    /// Event status as reported by the API (e.g. "confirmed").
    pub status: Option<String>,
}

impl CalendarEvent {
    /// Creates an event with only an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            summary: None,
            location: None,
            start: None,
            end: None,
            html_link: None,
            status: None,
        }
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the start time.
    pub fn with_start(mut self, start: EventTime) -> Self {
        self.start = Some(start);
        self
    }

    /// Builder method to set the end time.
    pub fn with_end(mut self, end: EventTime) -> Self {
        self.end = Some(end);
        self
    }

    /// Builder method to set the calendar link.
    pub fn with_html_link(mut self, link: impl Into<String>) -> Self {
        self.html_link = Some(link.into());
        self
    }

    /// Returns the summary, or a placeholder for untitled events.
    pub fn display_title(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(UNTITLED)
    }

    /// Returns true if the event starts on a date rather than a timestamp.
    pub fn is_all_day(&self) -> bool {
        self.start.is_some_and(|s| s.is_all_day())
    }

    /// The instant used for filtering this event.
    ///
    /// Prefers the precise timestamp, then the date-only value (midnight UTC),
    /// and falls back to `now` when the start is unknown. The fallback can pull
    /// undated events into or out of a date filter depending on when the
    /// filter runs.
    pub fn resolved_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        resolve(self.start, now, &self.id)
    }

    /// Same resolution policy as [`resolved_start`](Self::resolved_start), over the end time.
    pub fn resolved_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        resolve(self.end, now, &self.id)
    }

    /// The calendar day this event is filed under in `tz`.
    pub fn resolved_day<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> NaiveDate {
        match self.start {
            Some(start) => start.local_date(tz),
            None => self.resolved_start(now).with_timezone(tz).date_naive(),
        }
    }
}

fn resolve(time: Option<EventTime>, now: DateTime<Utc>, id: &str) -> DateTime<Utc> {
    match time {
        Some(t) => t.to_utc_datetime(),
        None => {
            debug!(event = %id, "event has no date, resolving to now");
            now
        }
    }
}

/// A display-ready row of the events table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRow {
    /// The event ID.
    pub id: String,
    /// Title (placeholder when untitled).
    pub title: String,
    /// Location, if any.
    pub location: Option<String>,
    /// Start rendered in the display timezone, `None` when unknown.
    pub start: Option<String>,
    /// End rendered in the display timezone, `None` when unknown.
    pub end: Option<String>,
    /// Whether this is an all-day event.
    pub is_all_day: bool,
    /// Link to the event in the calendar UI.
    pub link: Option<String>,
}

impl EventRow {
    /// Builds a row from an event, rendering times in `tz`.
    pub fn from_event<Tz>(event: &CalendarEvent, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            id: event.id.clone(),
            title: event.display_title().to_string(),
            location: event.location.clone(),
            start: event.start.map(|t| format_event_time(&t, tz)),
            end: event.end.map(|t| format_event_time(&t, tz)),
            is_all_day: event.is_all_day(),
            link: event.html_link.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod calendar_event {
        use super::*;

        #[test]
        fn builder_pattern() {
            let event = CalendarEvent::new("evt-1")
                .with_summary("Team Standup")
                .with_location("Room 101")
                .with_start(EventTime::from_utc(utc(2025, 2, 5, 10, 0, 0)))
                .with_end(EventTime::from_utc(utc(2025, 2, 5, 10, 30, 0)))
                .with_html_link("https://calendar.google.com/event?eid=abc");

            assert_eq!(event.id, "evt-1");
            assert_eq!(event.display_title(), "Team Standup");
            assert_eq!(event.location.as_deref(), Some("Room 101"));
            assert!(!event.is_all_day());
        }

        #[test]
        fn untitled_events_get_placeholder() {
            assert_eq!(CalendarEvent::new("a").display_title(), UNTITLED);
            assert_eq!(
                CalendarEvent::new("b").with_summary("   ").display_title(),
                UNTITLED
            );
        }

        #[test]
        fn resolution_prefers_timestamp_then_date_then_now() {
            let now = utc(2025, 6, 1, 12, 0, 0);

            let timed = CalendarEvent::new("t").with_start(EventTime::from_utc(utc(2025, 2, 5, 10, 0, 0)));
            assert_eq!(timed.resolved_start(now), utc(2025, 2, 5, 10, 0, 0));

            let all_day = CalendarEvent::new("d").with_start(EventTime::from_date(date(2025, 2, 5)));
            assert_eq!(all_day.resolved_start(now), utc(2025, 2, 5, 0, 0, 0));
            assert!(all_day.is_all_day());

            let unknown = CalendarEvent::new("u");
            assert_eq!(unknown.resolved_start(now), now);
            assert_eq!(unknown.resolved_end(now), now);
        }

        #[test]
        fn resolved_day_uses_display_timezone() {
            let tz = chrono_tz::Asia::Tokyo;
            let now = utc(2025, 6, 1, 12, 0, 0);
            let event = CalendarEvent::new("e").with_start(EventTime::from_utc(utc(2025, 2, 5, 20, 0, 0)));
            assert_eq!(event.resolved_day(now, &Utc), date(2025, 2, 5));
            assert_eq!(event.resolved_day(now, &tz), date(2025, 2, 6));

            // Undated events land on "today" in the display timezone
            assert_eq!(CalendarEvent::new("u").resolved_day(now, &tz), date(2025, 6, 1));
        }

        #[test]
        fn serde_roundtrip() {
            let event = CalendarEvent::new("evt-1")
                .with_summary("Review")
                .with_start(EventTime::from_date(date(2025, 2, 5)));
            let json = serde_json::to_string(&event).unwrap();
            let parsed: CalendarEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(event, parsed);
        }
    }

    mod event_row {
        use super::*;

        #[test]
        fn renders_times_in_timezone() {
            let event = CalendarEvent::new("evt-1")
                .with_summary("Lunch")
                .with_start(EventTime::from_utc(utc(2025, 2, 5, 11, 0, 0)))
                .with_end(EventTime::from_utc(utc(2025, 2, 5, 12, 0, 0)));
            let row = EventRow::from_event(&event, &chrono_tz::Europe::Paris);

            assert_eq!(row.title, "Lunch");
            assert_eq!(row.start.as_deref(), Some("2025-02-05 12:00"));
            assert_eq!(row.end.as_deref(), Some("2025-02-05 13:00"));
            assert!(!row.is_all_day);
        }

        #[test]
        fn unknown_times_stay_unknown() {
            let row = EventRow::from_event(&CalendarEvent::new("u"), &Utc);
            assert_eq!(row.title, UNTITLED);
            assert!(row.start.is_none());
            assert!(row.end.is_none());
        }
    }
}
