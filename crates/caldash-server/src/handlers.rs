//! HTTP handlers.
//!
//! Every page request runs the same pipeline: session gate, filter parsing,
//! one fetch, in-memory filter, render.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use caldash_core::{EventRow, FilterError, FilterQuery, FilterState};
use caldash_providers::{ProviderErrorCode, Session, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::{AppSettings, AppState};
use crate::error::ServerError;
use crate::gate::{GateOutcome, SessionGate};
use crate::render::{Banner, DashboardPage, dashboard_page, entry_page};
use crate::view::{ViewStatus, refresh};

/// Query parameters of the entry page.
#[derive(Debug, Default, Deserialize)]
pub struct EntryQuery {
    pub auth_error: Option<String>,
    pub notice: Option<String>,
}

/// Query parameters Google appends to the callback URL.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Body of `GET /api/events`.
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub filter: FilterState,
    pub description: String,
    pub status: ViewStatus,
    /// When the listed events were fetched, `null` before the first success.
    pub fetched_at: Option<DateTime<Utc>>,
    pub events: Vec<EventRow>,
    pub notifications: Vec<String>,
}

/// What a dashboard render needs from the view.
struct ViewSnapshot {
    filter: FilterState,
    status: ViewStatus,
    fetched_at: Option<DateTime<Utc>>,
    rows: Vec<EventRow>,
    notifications: Vec<String>,
}

fn cookie(settings: &AppSettings, name: String, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure_cookies)
        .build()
}

fn removal(name: String) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

fn auth_error_redirect(code: &str) -> Redirect {
    Redirect::to(&format!("/?auth_error={code}"))
}

fn gate(state: &AppState) -> SessionGate<'_> {
    SessionGate::new(state.sessions.as_ref(), &state.settings.cookie_name)
}

/// Drops per-session state for a session the provider no longer knows.
async fn forget_stale(state: &AppState, jar: CookieJar, stale: Option<SessionId>) -> CookieJar {
    match stale {
        Some(id) => {
            if state.views.remove(&id).await {
                debug!(session = %id, "dropped view of expired session");
            }
            jar.remove(removal(state.settings.cookie_name.clone()))
        }
        None => jar,
    }
}

fn is_empty_query(query: &FilterQuery) -> bool {
    query.mode.is_none() && query.date.is_none() && query.end.is_none()
}

/// Fetches for the requested filter and returns what to display.
///
/// `requested` is `None` when the request carried no filter parameters, in
/// which case the view keeps its current filter. An invalid filter is
/// reported as a notification and replaced by the default one.
async fn load_view(
    state: &AppState,
    session: &Session,
    requested: Option<Result<FilterState, FilterError>>,
) -> ViewSnapshot {
    let now = Utc::now();
    let tz = state.settings.timezone;

    let evicted = state.views.retain_live(state.sessions.as_ref()).await;
    if evicted > 0 {
        let remaining = state.views.len().await;
        debug!(
            evicted,
            remaining,
            "dropped views of ended sessions"
        );
    }
    let view = state.views.get_or_create(&session.id).await;

    let filter = {
        let mut guard = view.lock().await;
        match requested {
            None => guard.filter(),
            Some(Ok(filter)) => filter,
            Some(Err(e)) => {
                guard.notify(format!("Invalid filter: {e}"));
                FilterState::default()
            }
        }
    };

    let options = state.settings.fetch_options(filter.time_window(now, &tz));
    refresh(
        &view,
        state.events.as_ref(),
        session.provider_token(),
        filter,
        options,
    )
    .await;

    let mut guard = view.lock().await;
    let rows = guard
        .visible_events(now, &tz)
        .iter()
        .map(|e| EventRow::from_event(e, &tz))
        .collect();
    ViewSnapshot {
        filter: guard.filter(),
        status: guard.status(),
        fetched_at: guard.fetched_at(),
        rows,
        notifications: guard.take_notifications(),
    }
}

/// `GET /` - sign-in page, or the dashboard when already signed in.
pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<EntryQuery>,
) -> Response {
    match gate(&state).check(&jar).await {
        GateOutcome::Authenticated(_) => Redirect::to("/dashboard").into_response(),
        GateOutcome::Unauthenticated { stale } => {
            let jar = forget_stale(&state, jar, stale).await;
            let banner = query
                .auth_error
                .as_deref()
                .and_then(Banner::auth_error)
                .or_else(|| query.notice.as_deref().and_then(Banner::notice));
            (jar, Html(entry_page(banner))).into_response()
        }
    }
}

/// `GET /auth/login` - redirects to the provider's consent screen.
pub async fn login(State(state): State<AppState>, jar: CookieJar) -> Response {
    match state
        .sessions
        .begin_sign_in(&state.settings.redirect_uri)
        .await
    {
        Ok(request) => {
            let jar = jar.add(cookie(
                &state.settings,
                state.settings.state_cookie_name(),
                request.state,
            ));
            (jar, Redirect::to(&request.authorization_url)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "could not start sign-in");
            auth_error_redirect("provider_unavailable").into_response()
        }
    }
}

/// `GET /auth/callback` - completes the sign-in and sets the session cookie.
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let state_cookie = state.settings.state_cookie_name();
    let expected = jar.get(&state_cookie).map(|c| c.value().to_string());
    let jar = jar.remove(removal(state_cookie));

    if let Some(error) = query.error {
        warn!(%error, "provider refused the sign-in");
        let code = if error == "access_denied" {
            "access_denied"
        } else {
            "exchange_failed"
        };
        return (jar, auth_error_redirect(code)).into_response();
    }

    let (Some(code), Some(returned)) = (
        query.code.as_deref().filter(|c| !c.is_empty()),
        query.state.as_deref(),
    ) else {
        return (jar, auth_error_redirect("invalid_state")).into_response();
    };

    if expected.as_deref() != Some(returned) {
        warn!("sign-in state does not match this browser");
        return (jar, auth_error_redirect("invalid_state")).into_response();
    }

    match state.sessions.complete_sign_in(code, returned).await {
        Ok(session) => {
            info!(session = %session.id, "signed in");
            let jar = jar.add(cookie(
                &state.settings,
                state.settings.cookie_name.clone(),
                session.id.as_str().to_string(),
            ));
            (jar, Redirect::to("/dashboard")).into_response()
        }
        Err(e) if e.code() == ProviderErrorCode::BadRequest => {
            warn!(error = %e, "sign-in state rejected");
            (jar, auth_error_redirect("invalid_state")).into_response()
        }
        Err(e) => {
            warn!(error = %e, "code exchange failed");
            (jar, auth_error_redirect("exchange_failed")).into_response()
        }
    }
}

/// `GET|POST /auth/signout` - ends the session and returns to the entry page.
///
/// Navigation happens whether or not the provider confirms the sign-out; the
/// local session and view are gone either way.
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> Response {
    let notice = match gate(&state).session_id(&jar) {
        Some(id) => {
            state.views.remove(&id).await;
            match state.sessions.sign_out(&id).await {
                Ok(()) => {
                    info!(session = %id, "signed out");
                    "signed_out"
                }
                Err(e) => {
                    warn!(session = %id, error = %e, "sign-out failed");
                    "signout_failed"
                }
            }
        }
        None => "signed_out",
    };

    let jar = jar.remove(removal(state.settings.cookie_name.clone()));
    (jar, Redirect::to(&format!("/?notice={notice}"))).into_response()
}

/// `GET /dashboard` - the filtered events table.
pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<FilterQuery>,
) -> Response {
    let session = match gate(&state).check(&jar).await {
        GateOutcome::Authenticated(session) => session,
        GateOutcome::Unauthenticated { stale } => {
            let jar = forget_stale(&state, jar, stale).await;
            return (jar, Redirect::to("/")).into_response();
        }
    };

    let requested = (!is_empty_query(&query)).then(|| FilterState::from_query(&query));
    let snapshot = load_view(&state, &session, requested).await;

    let user = session
        .user
        .email
        .as_deref()
        .or(session.user.name.as_deref());
    Html(dashboard_page(&DashboardPage {
        user,
        filter: &snapshot.filter,
        status: snapshot.status,
        rows: &snapshot.rows,
        notifications: &snapshot.notifications,
    }))
    .into_response()
}

/// `GET /api/events` - the dashboard pipeline as JSON.
pub async fn api_events(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<FilterQuery>,
) -> Response {
    let session = match gate(&state).check(&jar).await {
        GateOutcome::Authenticated(session) => session,
        GateOutcome::Unauthenticated { stale } => {
            let jar = forget_stale(&state, jar, stale).await;
            return (jar, ServerError::unauthorized("sign in required")).into_response();
        }
    };

    let requested = if is_empty_query(&query) {
        None
    } else {
        match FilterState::from_query(&query) {
            Ok(filter) => Some(Ok(filter)),
            Err(e) => return ServerError::bad_request(e.to_string()).into_response(),
        }
    };
    let snapshot = load_view(&state, &session, requested).await;

    Json(EventsResponse {
        description: snapshot.filter.describe(),
        filter: snapshot.filter,
        status: snapshot.status,
        fetched_at: snapshot.fetched_at,
        events: snapshot.rows,
        notifications: snapshot.notifications,
    })
    .into_response()
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
