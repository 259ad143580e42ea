//! Google Calendar API client.
//!
//! Lists events of one calendar with the session's bearer token, following
//! pagination, and converts the API items into [`CalendarEvent`]s.

use caldash_core::{CalendarEvent, EventTime, TimeWindow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::session::BearerToken;

use super::config::GoogleConfig;

/// Partial-response field selector for events.list.
const EVENT_FIELDS: &str = "items(id,summary,location,start,end,htmlLink,status),nextPageToken";

/// Largest page Google serves for events.list.
const MAX_PAGE_SIZE: usize = 2500;

/// Google Calendar API client.
///
/// One client is shared by all sessions; the token is passed per call.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    api_base: String,
}

impl GoogleCalendarClient {
    /// Creates a client from the Google configuration.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration("failed to create HTTP client").with_source(e)
            })?;

        Ok(Self {
            http_client,
            api_base: config
                .endpoints
                .calendar_api_base
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// Lists events from a calendar, ordered by start time.
    ///
    /// Recurring events are expanded into instances. Pages are followed until
    /// the listing is exhausted or `max_results` events were collected.
    pub async fn list_events(
        &self,
        token: &BearerToken,
        calendar_id: &str,
        window: &TimeWindow,
        max_results: Option<usize>,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let all_events = collect_pages(max_results, |page_size, page_token| {
            self.list_events_page(token, calendar_id, window, page_size, page_token)
        })
        .await?;

        debug!(
            calendar = calendar_id,
            count = all_events.len(),
            "fetched events"
        );
        Ok(all_events)
    }

    /// Fetches a single page of events.
    async fn list_events_page(
        &self,
        token: &BearerToken,
        calendar_id: &str,
        window: &TimeWindow,
        page_size: Option<usize>,
        page_token: Option<String>,
    ) -> ProviderResult<EventListResponse> {
        let url = events_url(&self.api_base, calendar_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token.secret())
            .query(&page_query(window, page_size, page_token.as_deref()))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("request timeout")
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {}", e))
                } else {
                    ProviderError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        parse_event_list(&body)
    }
}

/// Drives `fetch_page` until the listing is exhausted or `max_results`
/// events were collected.
///
/// Each call gets the page size to request (the remaining budget, clamped to
/// what Google serves) and the token of the page to fetch.
async fn collect_pages<F, Fut>(
    max_results: Option<usize>,
    mut fetch_page: F,
) -> ProviderResult<Vec<CalendarEvent>>
where
    F: FnMut(Option<usize>, Option<String>) -> Fut,
    Fut: Future<Output = ProviderResult<EventListResponse>>,
{
    let mut events = Vec::new();
    let mut page_token = None;

    loop {
        let page_size = max_results
            .map(|max| max.saturating_sub(events.len()))
            .map(|remaining| remaining.clamp(1, MAX_PAGE_SIZE));

        let page = fetch_page(page_size, page_token.take()).await?;
        events.extend(page.items.into_iter().filter_map(convert_event));

        if let Some(max) = max_results
            && events.len() >= max
        {
            events.truncate(max);
            return Ok(events);
        }

        match page.next_page_token {
            Some(next) => page_token = Some(next),
            None => return Ok(events),
        }
    }
}

fn events_url(api_base: &str, calendar_id: &str) -> String {
    format!(
        "{}/calendars/{}/events",
        api_base,
        urlencoding::encode(calendar_id)
    )
}

/// Query parameters for one events.list page.
///
/// `timeMin`/`timeMax` are only sent for bounded sides of the window.
fn page_query(
    window: &TimeWindow,
    page_size: Option<usize>,
    page_token: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("orderBy", "startTime".to_string()),
        ("singleEvents", "true".to_string()),
        ("fields", EVENT_FIELDS.to_string()),
    ];
    if let Some(start) = window.start {
        query.push(("timeMin", start.to_rfc3339()));
    }
    if let Some(end) = window.end {
        query.push(("timeMax", end.to_rfc3339()));
    }
    if let Some(size) = page_size {
        query.push(("maxResults", size.to_string()));
    }
    if let Some(token) = page_token {
        query.push(("pageToken", token.to_string()));
    }
    query
}

fn parse_event_list(body: &str) -> ProviderResult<EventListResponse> {
    serde_json::from_str(body)
        .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {}", e)))
}

/// Converts a Google Calendar API event to a [`CalendarEvent`].
///
/// Cancelled items and items without an id are dropped. Missing or
/// unparseable times become `None` rather than dropping the event.
fn convert_event(event: ApiEvent) -> Option<CalendarEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let Some(id) = event.id else {
        warn!("skipping event without id");
        return None;
    };

    let start = event.start.as_ref().and_then(|t| parse_event_time(&id, "start", t));
    let end = event.end.as_ref().and_then(|t| parse_event_time(&id, "end", t));

    Some(CalendarEvent {
        id,
        summary: event.summary,
        location: event.location,
        start,
        end,
        html_link: event.html_link,
        status: event.status,
    })
}

fn parse_event_time(id: &str, which: &str, time: &ApiEventTime) -> Option<EventTime> {
    if let Some(dt) = &time.date_time {
        return match DateTime::parse_from_rfc3339(dt) {
            Ok(parsed) => Some(EventTime::from_utc(parsed.with_timezone(&Utc))),
            Err(e) => {
                warn!(event = id, "failed to parse {} time '{}': {}", which, dt, e);
                None
            }
        };
    }
    if let Some(date) = &time.date {
        return match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(parsed) => Some(EventTime::from_date(parsed)),
            Err(e) => {
                warn!(event = id, "failed to parse {} date '{}': {}", which, date, e);
                None
            }
        };
    }
    None
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    location: Option<String>,
    #[serde(default)]
    start: Option<ApiEventTime>,
    #[serde(default)]
    end: Option<ApiEventTime>,
    html_link: Option<String>,
    status: Option<String>,
}

/// Event time from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}
