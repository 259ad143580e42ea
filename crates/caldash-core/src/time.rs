//! Event instants and query windows.
//!
//! Google returns either `dateTime` (an instant) or `date` (a whole day) for
//! event bounds; [`EventTime`] keeps that distinction. [`TimeWindow`] is the
//! half-open UTC interval sent as `timeMin`/`timeMax`.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Start or end of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// An instant, normalized to UTC.
    DateTime(DateTime<Utc>),
    /// A calendar date with no time of day.
    AllDay(NaiveDate),
}

impl EventTime {
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Sort key: the instant itself, or midnight UTC for all-day values.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    /// Day this value falls on in `tz`. All-day values are not shifted.
    pub fn local_date<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.with_timezone(tz).date_naive(),
            Self::AllDay(date) => *date,
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// Returns the UTC instant at which `date` starts in `tz`.
///
/// When local midnight does not exist (a DST gap at 00:00), midnight UTC on
/// the same date is used instead.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

/// `[start, end)` in UTC. A `None` bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// `None` when both bounds are set and inverted.
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<Self> {
        match (start, end) {
            (Some(s), Some(e)) if s > e => None,
            _ => Some(Self { start, end }),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Everything from `now` on.
    pub fn from_now(now: DateTime<Utc>) -> Self {
        Self {
            start: Some(now),
            end: None,
        }
    }

    /// One local day in `tz`.
    pub fn for_date<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        Self {
            start: Some(start_of_day(date, tz)),
            end: date.succ_opt().map(|next| start_of_day(next, tz)),
        }
    }

    /// Creates a window covering whole local days from `start` through `end`.
    ///
    /// Either date may be absent, leaving that side open. Returns `None` when
    /// `start` is after `end`.
    pub fn for_range<Tz: TimeZone>(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        tz: &Tz,
    ) -> Option<Self> {
        if let (Some(s), Some(e)) = (start, end)
            && s > e
        {
            return None;
        }
        Some(Self {
            start: start.map(|d| start_of_day(d, tz)),
            end: end
                .and_then(|d| d.succ_opt())
                .map(|next| start_of_day(next, tz)),
        })
    }

    pub fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }

    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| s <= dt) && self.end.is_none_or(|e| dt < e)
    }
}
