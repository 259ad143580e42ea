//! Date filtering for the dashboard.
//!
//! A [`FilterState`] is the user's current choice of which events to show. It
//! drives two things: the [`TimeWindow`] sent to the calendar API and the
//! in-memory filter applied to whatever list was fetched last.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::CalendarEvent;
use crate::format::{DATE_FORMAT, format_date};
use crate::time::TimeWindow;

/// How the date filter is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    /// Every upcoming event.
    #[default]
    #[serde(rename = "all")]
    All,
    /// Events on one calendar day.
    #[serde(rename = "single")]
    SingleDate,
    /// Events between two days, inclusive.
    #[serde(rename = "range")]
    DateRange,
}

impl FilterMode {
    /// The query-string value for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::SingleDate => "single",
            Self::DateRange => "range",
        }
    }
}

impl std::str::FromStr for FilterMode {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "single" => Ok(Self::SingleDate),
            "range" => Ok(Self::DateRange),
            other => Err(FilterError::UnknownMode(other.to_string())),
        }
    }
}

/// Reasons a filter query is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unknown filter mode '{0}'")]
    UnknownMode(String),

    #[error("invalid {field} '{value}', expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    #[error("start date {start} is after end date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

/// Raw filter parameters as they arrive in a query string.
///
/// Empty strings are treated as absent, matching what an HTML form submits
/// for a cleared date input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterQuery {
    pub mode: Option<String>,
    pub date: Option<String>,
    pub end: Option<String>,
}

/// The user's current date filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterState {
    pub mode: FilterMode,
    /// The selected day (single) or the first day (range).
    pub anchor_date: Option<NaiveDate>,
    /// The last day of a range.
    pub end_date: Option<NaiveDate>,
}

impl FilterState {
    /// Filter showing one day.
    pub fn single(date: NaiveDate) -> Self {
        Self {
            mode: FilterMode::SingleDate,
            anchor_date: Some(date),
            end_date: None,
        }
    }

    /// Filter showing a range; either bound may be absent.
    pub fn range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            mode: FilterMode::DateRange,
            anchor_date: start,
            end_date: end,
        }
    }

    /// Parses and validates query-string parameters.
    ///
    /// # Errors
    ///
    /// Fails on an unknown mode, a malformed date, or a range whose start is
    /// after its end.
    pub fn from_query(query: &FilterQuery) -> Result<Self, FilterError> {
        let mode = match non_empty(&query.mode) {
            Some(m) => m.parse()?,
            None => FilterMode::All,
        };
        let anchor_date = parse_date("date", &query.date)?;
        let end_date = parse_date("end", &query.end)?;

        if mode == FilterMode::DateRange
            && let (Some(start), Some(end)) = (anchor_date, end_date)
            && start > end
        {
            return Err(FilterError::InvertedRange { start, end });
        }

        Ok(Self {
            mode,
            anchor_date,
            end_date,
        })
    }

    /// The query parameters that reproduce this state.
    pub fn to_query(&self) -> FilterQuery {
        FilterQuery {
            mode: Some(self.mode.as_str().to_string()),
            date: self.anchor_date.map(format_date),
            end: self.end_date.map(format_date),
        }
    }

    /// The window of events to request from the calendar API.
    ///
    /// A single day maps to that local day; a range maps to whole local days
    /// with open sides where a bound is unset; everything else asks for
    /// upcoming events from `now`.
    pub fn time_window<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> TimeWindow {
        match (self.mode, self.anchor_date) {
            (FilterMode::SingleDate, Some(date)) => TimeWindow::for_date(date, tz),
            (FilterMode::DateRange, _) => {
                TimeWindow::for_range(self.anchor_date, self.end_date, tz)
                    .unwrap_or_else(|| TimeWindow::from_now(now))
            }
            _ => TimeWindow::from_now(now),
        }
    }

    /// Human-readable summary, used as the table caption.
    pub fn describe(&self) -> String {
        match (self.mode, self.anchor_date, self.end_date) {
            (FilterMode::SingleDate, Some(d), _) => format!("Events on {}", format_date(d)),
            (FilterMode::DateRange, Some(s), Some(e)) => {
                format!("Events from {} to {}", format_date(s), format_date(e))
            }
            (FilterMode::DateRange, Some(s), None) => format!("Events from {}", format_date(s)),
            (FilterMode::DateRange, None, Some(e)) => format!("Events until {}", format_date(e)),
            _ => "Upcoming events".to_string(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(field: &'static str, value: &Option<String>) -> Result<Option<NaiveDate>, FilterError> {
    non_empty(value)
        .map(|v| {
            NaiveDate::parse_from_str(v, DATE_FORMAT).map_err(|_| FilterError::InvalidDate {
                field,
                value: v.to_string(),
            })
        })
        .transpose()
}

/// Returns the events the current filter selects, in their original order.
///
/// Each event is placed on a calendar day in `tz` (see
/// [`CalendarEvent::resolved_day`]). The input is never modified and applying
/// the filter to its own output returns the same list.
pub fn filter_events<Tz: TimeZone>(
    events: &[CalendarEvent],
    state: &FilterState,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Vec<CalendarEvent> {
    match state.mode {
        FilterMode::All => events.to_vec(),
        FilterMode::SingleDate => match state.anchor_date {
            Some(day) => events
                .iter()
                .filter(|e| e.resolved_day(now, tz) == day)
                .cloned()
                .collect(),
            None => events.to_vec(),
        },
        FilterMode::DateRange => events
            .iter()
            .filter(|e| {
                let day = e.resolved_day(now, tz);
                state.anchor_date.is_none_or(|start| start <= day)
                    && state.end_date.is_none_or(|end| day <= end)
            })
            .cloned()
            .collect(),
    }
}
