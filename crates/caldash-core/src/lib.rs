//! Core types: event times, calendar events, date filters, formatting

pub mod event;
pub mod filter;
pub mod format;
pub mod time;
pub mod tracing;

pub use event::{CalendarEvent, EventRow, UNTITLED};
pub use filter::{FilterError, FilterMode, FilterQuery, FilterState, filter_events};
pub use format::{format_date, format_event_time, html_escape};
pub use time::{EventTime, TimeWindow, start_of_day};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
