//! Google Calendar event source.
//!
//! This module implements the [`EventSource`] trait for Google Calendar.

use caldash_core::CalendarEvent;
use tracing::debug;

use crate::error::ProviderResult;
use crate::provider::{BoxFuture, EventSource, FetchOptions};
use crate::session::BearerToken;

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;

const PROVIDER_NAME: &str = "google";

/// Lists events with the Calendar API v3 on behalf of a signed-in user.
#[derive(Debug, Clone)]
pub struct GoogleEventSource {
    client: GoogleCalendarClient,
}

impl GoogleEventSource {
    /// Creates a new event source with the given configuration.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: GoogleCalendarClient::new(config)?,
        })
    }
}

impl EventSource for GoogleEventSource {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn fetch_events<'a>(
        &'a self,
        token: &'a BearerToken,
        options: FetchOptions,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(async move {
            debug!(
                calendar = %options.calendar_id,
                time_min = ?options.time_window.start,
                time_max = ?options.time_window.end,
                "listing events"
            );
            self.client
                .list_events(
                    token,
                    &options.calendar_id,
                    &options.time_window,
                    options.max_results,
                )
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::google::config::{GoogleEndpoints, OAuthCredentials};

    #[tokio::test]
    async fn transport_failure_is_tagged_network_error() {
        let config = GoogleConfig::new(OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
        ))
        .with_timeout(std::time::Duration::from_secs(2))
        .with_endpoints(GoogleEndpoints {
            calendar_api_base: "http://127.0.0.1:9/calendar/v3".into(),
            ..GoogleEndpoints::default()
        });
        let source = GoogleEventSource::new(&config).unwrap();
        assert_eq!(source.name(), "google");

        let err = source
            .fetch_events(&BearerToken::new("ya29.x"), FetchOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
        assert_eq!(err.provider(), Some("google"));
    }
}
