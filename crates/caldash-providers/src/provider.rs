//! EventSource trait definition.
//!
//! An [`EventSource`] turns a bearer token and a [`TimeWindow`] into a list of
//! [`CalendarEvent`]s with exactly one logical listing call. There is no
//! retry and no caching; a failed fetch is returned to the caller as is.

use std::future::Future;
use std::pin::Pin;

use caldash_core::{CalendarEvent, TimeWindow};

use crate::error::ProviderResult;
use crate::session::BearerToken;

/// Calendar listed when none is configured.
pub const DEFAULT_CALENDAR_ID: &str = "primary";

/// Options for fetching events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Calendar to list (e.g. "primary").
    pub calendar_id: String,
    /// Window of start times to request; open bounds are omitted.
    pub time_window: TimeWindow,
    /// Maximum number of events to return across all pages.
    pub max_results: Option<usize>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            time_window: TimeWindow::unbounded(),
            max_results: None,
        }
    }
}

impl FetchOptions {
    /// Creates new fetch options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the calendar.
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    /// Builder method to set time window.
    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = window;
        self
    }

    /// Builder method to set max results.
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }
}

/// A boxed future for async trait methods.
///
/// Keeps [`EventSource`] and [`SessionProvider`](crate::SessionProvider)
/// object-safe so they can be shared as `Arc<dyn ...>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A source of calendar events.
pub trait EventSource: Send + Sync {
    /// Returns the name of this source (e.g. "google").
    fn name(&self) -> &str;

    /// Lists events visible to `token` within the requested window.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on transport failures, non-success statuses and
    /// unparseable responses.
    fn fetch_events<'a>(
        &'a self,
        token: &'a BearerToken,
        options: FetchOptions,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>>;
}
