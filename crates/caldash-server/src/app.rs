//! Router and shared application state.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use caldash_providers::{DEFAULT_CALENDAR_ID, EventSource, FetchOptions, SessionProvider};
use caldash_core::TimeWindow;
use chrono_tz::Tz;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::view::ViewRegistry;

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "caldash_session";

/// Request-handling settings derived from the configuration.
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Absolute callback URL registered with the OAuth client.
    pub redirect_uri: String,
    pub cookie_name: String,
    pub secure_cookies: bool,
    /// Timezone used to place events on days and format times.
    pub timezone: Tz,
    pub calendar_id: String,
    pub max_events: Option<usize>,
}

impl AppSettings {
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            secure_cookies: false,
            timezone: Tz::UTC,
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            max_events: None,
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.timezone = tz;
        self
    }

    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = Some(max);
        self
    }

    /// Name of the cookie binding a sign-in to the browser that started it.
    pub fn state_cookie_name(&self) -> String {
        format!("{}_state", self.cookie_name)
    }

    /// Listing options for one fetch over `window`.
    pub fn fetch_options(&self, window: TimeWindow) -> FetchOptions {
        let options = FetchOptions::new()
            .with_calendar_id(&self.calendar_id)
            .with_time_window(window);
        match self.max_events {
            Some(max) => options.with_max_results(max),
            None => options,
        }
    }
}

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionProvider>,
    pub events: Arc<dyn EventSource>,
    pub views: ViewRegistry,
    pub settings: Arc<AppSettings>,
}

impl AppState {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        events: Arc<dyn EventSource>,
        settings: AppSettings,
    ) -> Self {
        Self {
            sessions,
            events,
            views: ViewRegistry::new(),
            settings: Arc::new(settings),
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/auth/login", get(handlers::login))
        .route("/auth/callback", get(handlers::callback))
        .route(
            "/auth/signout",
            get(handlers::sign_out).post(handlers::sign_out),
        )
        .route("/dashboard", get(handlers::dashboard))
        .route("/api/events", get(handlers::api_events))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
