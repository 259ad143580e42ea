//! Per-session dashboard state.
//!
//! A [`DashboardView`] owns the last successfully fetched event list, the
//! current filter and any notifications waiting to be shown. The rendered
//! table is always `filter_events(last list, current filter)`.
//!
//! Fetches are fenced with generation tickets: each fetch takes the next
//! generation when it starts, and a result is dropped if a newer one has
//! already been applied. The view lock is never held across the network call.

use std::collections::HashMap;
use std::sync::Arc;

use caldash_core::{CalendarEvent, FilterState, filter_events};
use caldash_providers::{
    BearerToken, EventSource, FetchOptions, ProviderResult, SessionId, SessionProvider,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Fetch status of a view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewStatus {
    /// A fetch is in flight.
    #[default]
    Loading,
    /// The last fetch succeeded.
    Idle,
    /// The last fetch failed; the previous list is still shown.
    Error,
}

/// Generation number handed out when a fetch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// Events, filter and status for one signed-in user.
#[derive(Debug, Default)]
pub struct DashboardView {
    events: Vec<CalendarEvent>,
    filter: FilterState,
    status: ViewStatus,
    notifications: Vec<String>,
    issued: u64,
    applied: u64,
    fetched_at: Option<DateTime<Utc>>,
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last successfully fetched list, unfiltered.
    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn filter(&self) -> FilterState {
        self.filter
    }

    pub fn status(&self) -> ViewStatus {
        self.status
    }

    /// When the current list was fetched.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    /// Queues a message for the next render.
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notifications.push(message.into());
    }

    /// Returns and clears pending notifications.
    pub fn take_notifications(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notifications)
    }

    /// Records a new filter and starts a fetch for it.
    pub fn begin_fetch(&mut self, filter: FilterState) -> FetchTicket {
        self.filter = filter;
        self.status = ViewStatus::Loading;
        self.issued += 1;
        FetchTicket(self.issued)
    }

    /// Applies the outcome of the fetch identified by `ticket`.
    ///
    /// Returns false when the result was discarded because a newer fetch
    /// already completed. On failure the event list is left untouched.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: ProviderResult<Vec<CalendarEvent>>,
        now: DateTime<Utc>,
    ) -> bool {
        if ticket.0 <= self.applied {
            debug!(
                ticket = ticket.0,
                applied = self.applied,
                "discarding superseded fetch"
            );
            return false;
        }
        self.applied = ticket.0;
        let latest = ticket.0 == self.issued;

        match result {
            Ok(events) => {
                debug!(count = events.len(), "events fetched");
                self.events = events;
                self.fetched_at = Some(now);
                if latest {
                    self.status = ViewStatus::Idle;
                }
            }
            Err(e) => {
                warn!(error = %e, "event fetch failed");
                self.notify(format!("Failed to fetch events: {}", e.message()));
                if latest {
                    self.status = ViewStatus::Error;
                }
            }
        }
        true
    }

    /// The events selected by the current filter.
    pub fn visible_events<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> Vec<CalendarEvent> {
        filter_events(&self.events, &self.filter, now, tz)
    }
}

/// Runs one fetch for `filter` and applies it to `view`.
///
/// `options` must already carry the time window derived from `filter`.
/// Returns whether the result was applied.
pub async fn refresh(
    view: &Mutex<DashboardView>,
    source: &dyn EventSource,
    token: &BearerToken,
    filter: FilterState,
    options: FetchOptions,
) -> bool {
    let ticket = view.lock().await.begin_fetch(filter);
    let result = source.fetch_events(token, options).await;
    view.lock().await.complete_fetch(ticket, result, Utc::now())
}

/// Dashboard views keyed by session.
#[derive(Debug, Clone, Default)]
pub struct ViewRegistry {
    views: Arc<RwLock<HashMap<SessionId, Arc<Mutex<DashboardView>>>>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the view for `id`, creating an empty one on first use.
    pub async fn get_or_create(&self, id: &SessionId) -> Arc<Mutex<DashboardView>> {
        if let Some(view) = self.views.read().await.get(id) {
            return Arc::clone(view);
        }
        let mut views = self.views.write().await;
        Arc::clone(views.entry(id.clone()).or_default())
    }

    pub async fn get(&self, id: &SessionId) -> Option<Arc<Mutex<DashboardView>>> {
        self.views.read().await.get(id).cloned()
    }

    /// Drops the view for `id`. Returns true if one existed.
    pub async fn remove(&self, id: &SessionId) -> bool {
        self.views.write().await.remove(id).is_some()
    }

    /// Drops the views of sessions `sessions` no longer considers live.
    ///
    /// Returns how many views were dropped.
    pub async fn retain_live(&self, sessions: &dyn SessionProvider) -> usize {
        let mut views = self.views.write().await;
        let before = views.len();
        views.retain(|id, _| sessions.is_live(id));
        before - views.len()
    }

    pub async fn len(&self) -> usize {
        self.views.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caldash_core::EventTime;
    use caldash_providers::{BoxFuture, ProviderError};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(id: &str, start: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent::new(id).with_start(EventTime::from_utc(start))
    }

    fn ids(events: &[CalendarEvent]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    mod fencing {
        use super::*;

        #[test]
        fn success_replaces_list() {
            let mut view = DashboardView::new();
            let now = utc(2024, 1, 1, 0, 0, 0);

            let t = view.begin_fetch(FilterState::default());
            assert_eq!(view.status(), ViewStatus::Loading);
            assert!(view.complete_fetch(t, Ok(vec![event("a", now)]), now));
            assert_eq!(view.status(), ViewStatus::Idle);
            assert_eq!(ids(view.events()), ["a"]);
            assert_eq!(view.fetched_at(), Some(now));

            let t = view.begin_fetch(FilterState::default());
            assert!(view.complete_fetch(t, Ok(vec![event("b", now)]), now));
            assert_eq!(ids(view.events()), ["b"]);
        }

        #[test]
        fn failure_keeps_previous_list() {
            let mut view = DashboardView::new();
            let now = utc(2024, 1, 1, 0, 0, 0);

            let t = view.begin_fetch(FilterState::default());
            view.complete_fetch(t, Ok(vec![event("a", now)]), now);

            let t = view.begin_fetch(FilterState::single(date(2024, 1, 1)));
            assert!(view.complete_fetch(t, Err(ProviderError::from_status(401, "")), now));

            assert_eq!(view.status(), ViewStatus::Error);
            assert_eq!(ids(view.events()), ["a"]);
            assert_eq!(
                view.take_notifications(),
                ["Failed to fetch events: access token expired or invalid"]
            );
            assert!(view.take_notifications().is_empty());
        }

        #[test]
        fn slow_older_response_is_discarded() {
            let mut view = DashboardView::new();
            let now = utc(2024, 1, 1, 0, 0, 0);

            let first = view.begin_fetch(FilterState::default());
            let second = view.begin_fetch(FilterState::single(date(2024, 1, 1)));

            assert!(view.complete_fetch(second, Ok(vec![event("new", now)]), now));
            assert!(!view.complete_fetch(first, Ok(vec![event("old", now)]), now));

            assert_eq!(ids(view.events()), ["new"]);
            assert_eq!(view.filter(), FilterState::single(date(2024, 1, 1)));
            assert_eq!(view.status(), ViewStatus::Idle);
        }

        #[test]
        fn older_response_first_applies_but_stays_loading() {
            let mut view = DashboardView::new();
            let now = utc(2024, 1, 1, 0, 0, 0);

            let first = view.begin_fetch(FilterState::default());
            let second = view.begin_fetch(FilterState::default());

            assert!(view.complete_fetch(first, Ok(vec![event("old", now)]), now));
            assert_eq!(view.status(), ViewStatus::Loading);
            assert!(view.complete_fetch(second, Ok(vec![event("new", now)]), now));
            assert_eq!(ids(view.events()), ["new"]);
            assert_eq!(view.status(), ViewStatus::Idle);
        }
    }

    #[test]
    fn visible_events_applies_current_filter() {
        let mut view = DashboardView::new();
        let now = utc(2024, 1, 1, 0, 0, 0);
        let t = view.begin_fetch(FilterState::range(Some(date(2024, 1, 6)), Some(date(2024, 1, 12))));
        view.complete_fetch(
            t,
            Ok(vec![
                event("1", utc(2024, 1, 5, 10, 0, 0)),
                event("2", utc(2024, 1, 10, 10, 0, 0)),
            ]),
            now,
        );

        let visible = view.visible_events(now, &Utc);
        assert_eq!(ids(&visible), ["2"]);
        assert_eq!(view.events().len(), 2);
    }

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl EventSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn fetch_events<'a>(
            &'a self,
            _token: &'a BearerToken,
            options: FetchOptions,
        ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    return Err(ProviderError::network("connection refused"));
                }
                let start = options.time_window.start.unwrap_or_else(Utc::now);
                Ok(vec![event("from-window", start)])
            })
        }
    }

    #[tokio::test]
    async fn refresh_calls_source_once() {
        let view = Mutex::new(DashboardView::new());
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let filter = FilterState::single(date(2024, 3, 1));
        let options = FetchOptions::new().with_time_window(filter.time_window(Utc::now(), &Utc));

        assert!(refresh(&view, &source, &BearerToken::new("t"), filter, options).await);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let guard = view.lock().await;
        assert_eq!(guard.filter(), filter);
        assert_eq!(guard.status(), ViewStatus::Idle);
        assert_eq!(
            guard.events()[0].start,
            Some(EventTime::from_utc(utc(2024, 3, 1, 0, 0, 0)))
        );
    }

    #[tokio::test]
    async fn refresh_failure_notifies() {
        let view = Mutex::new(DashboardView::new());
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        refresh(
            &view,
            &source,
            &BearerToken::new("t"),
            FilterState::default(),
            FetchOptions::new(),
        )
        .await;

        let mut guard = view.lock().await;
        assert_eq!(guard.status(), ViewStatus::Error);
        assert!(guard.events().is_empty());
        assert_eq!(
            guard.take_notifications(),
            ["Failed to fetch events: connection refused"]
        );
    }

    #[tokio::test]
    async fn registry_lifecycle() {
        let registry = ViewRegistry::new();
        let id = SessionId::from("abc");
        assert!(registry.get(&id).await.is_none());

        let view = registry.get_or_create(&id).await;
        view.lock().await.notify("hello");
        let again = registry.get_or_create(&id).await;
        assert!(Arc::ptr_eq(&view, &again));
        assert_eq!(registry.len().await, 1);

        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert_eq!(registry.len().await, 0);
    }

    /// Sessions that are live by id; nothing else is used.
    struct LiveSet(Vec<SessionId>);

    impl SessionProvider for LiveSet {
        fn name(&self) -> &str {
            "live-set"
        }

        fn begin_sign_in<'a>(
            &'a self,
            _: &'a str,
        ) -> BoxFuture<'a, ProviderResult<caldash_providers::SignInRequest>> {
            Box::pin(async { Err(ProviderError::internal("unused")) })
        }

        fn complete_sign_in<'a>(
            &'a self,
            _: &'a str,
            _: &'a str,
        ) -> BoxFuture<'a, ProviderResult<caldash_providers::Session>> {
            Box::pin(async { Err(ProviderError::internal("unused")) })
        }

        fn get_session<'a>(
            &'a self,
            _: &'a SessionId,
        ) -> BoxFuture<'a, ProviderResult<Option<caldash_providers::Session>>> {
            Box::pin(async { Ok(None) })
        }

        fn is_live(&self, id: &SessionId) -> bool {
            self.0.contains(id)
        }

        fn sign_out<'a>(&'a self, _: &'a SessionId) -> BoxFuture<'a, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn retain_live_drops_ended_sessions() {
        let registry = ViewRegistry::new();
        let kept = SessionId::from("kept");
        let ended = SessionId::from("ended");
        registry.get_or_create(&kept).await;
        registry.get_or_create(&ended).await;

        let sessions = LiveSet(vec![kept.clone()]);
        assert_eq!(registry.retain_live(&sessions).await, 1);
        assert!(registry.get(&kept).await.is_some());
        assert!(registry.get(&ended).await.is_none());
        assert_eq!(registry.retain_live(&sessions).await, 0);
    }
}
