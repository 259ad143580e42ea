//! Session gate.
//!
//! Turns the session cookie into either a live [`Session`] or
//! "unauthenticated". A missing cookie, an unknown or expired session and a
//! failed lookup all count as unauthenticated; nothing is retried.

use axum_extra::extract::cookie::CookieJar;
use caldash_providers::{Session, SessionId, SessionProvider};
use tracing::{debug, warn};

/// Result of a gate check.
#[derive(Debug)]
pub enum GateOutcome {
    /// A live session was found.
    Authenticated(Session),
    /// No usable session.
    ///
    /// `stale` carries the cookie's session id when the browser presented one
    /// the provider no longer knows, so callers can forget per-session state
    /// and clear the cookie.
    Unauthenticated { stale: Option<SessionId> },
}

/// Checks the session cookie against a [`SessionProvider`].
pub struct SessionGate<'a> {
    provider: &'a dyn SessionProvider,
    cookie_name: &'a str,
}

impl<'a> SessionGate<'a> {
    pub fn new(provider: &'a dyn SessionProvider, cookie_name: &'a str) -> Self {
        Self {
            provider,
            cookie_name,
        }
    }

    /// The session id carried by the request, if any.
    pub fn session_id(&self, jar: &CookieJar) -> Option<SessionId> {
        jar.get(self.cookie_name)
            .map(|c| c.value())
            .filter(|v| !v.is_empty())
            .map(SessionId::from)
    }

    /// Resolves the request's session.
    pub async fn check(&self, jar: &CookieJar) -> GateOutcome {
        let Some(id) = self.session_id(jar) else {
            return GateOutcome::Unauthenticated { stale: None };
        };

        match self.provider.get_session(&id).await {
            Ok(Some(session)) => GateOutcome::Authenticated(session),
            Ok(None) => {
                debug!(session = %id, "session not found or expired");
                GateOutcome::Unauthenticated { stale: Some(id) }
            }
            Err(e) => {
                warn!(session = %id, error = %e, "session lookup failed");
                GateOutcome::Unauthenticated { stale: Some(id) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Cookie;
    use caldash_providers::{
        BearerToken, BoxFuture, ProviderError, ProviderResult, SessionTokens, SignInRequest,
        UserProfile,
    };
    use chrono::{Duration, Utc};

    const COOKIE: &str = "caldash_session";

    /// Knows exactly one session; ids starting with "err" fail the lookup.
    struct OneSession(Session);

    impl OneSession {
        fn new() -> Self {
            let tokens = SessionTokens {
                access_token: BearerToken::new("ya29.token"),
                refresh_token: None,
                expires_at: None,
                scopes: Vec::new(),
            };
            Self(Session::new(
                tokens,
                UserProfile::default(),
                Utc::now(),
                Duration::hours(1),
            ))
        }
    }

    impl SessionProvider for OneSession {
        fn name(&self) -> &str {
            "one"
        }

        fn begin_sign_in<'a>(&'a self, _: &'a str) -> BoxFuture<'a, ProviderResult<SignInRequest>> {
            Box::pin(async { Err(ProviderError::internal("unused")) })
        }

        fn complete_sign_in<'a>(
            &'a self,
            _: &'a str,
            _: &'a str,
        ) -> BoxFuture<'a, ProviderResult<Session>> {
            Box::pin(async { Err(ProviderError::internal("unused")) })
        }

        fn get_session<'a>(
            &'a self,
            id: &'a SessionId,
        ) -> BoxFuture<'a, ProviderResult<Option<Session>>> {
            Box::pin(async move {
                if id.as_str().starts_with("err") {
                    return Err(ProviderError::network("store unavailable"));
                }
                Ok((id == &self.0.id).then(|| self.0.clone()))
            })
        }

        fn is_live(&self, id: &SessionId) -> bool {
            id == &self.0.id
        }

        fn sign_out<'a>(&'a self, _: &'a SessionId) -> BoxFuture<'a, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn jar(value: &str) -> CookieJar {
        CookieJar::new().add(Cookie::new(COOKIE, value.to_string()))
    }

    #[tokio::test]
    async fn no_cookie_is_unauthenticated() {
        let provider = OneSession::new();
        let gate = SessionGate::new(&provider, COOKIE);
        let outcome = gate.check(&CookieJar::new()).await;
        assert!(matches!(outcome, GateOutcome::Unauthenticated { stale: None }));
    }

    #[tokio::test]
    async fn empty_cookie_is_ignored() {
        let provider = OneSession::new();
        let gate = SessionGate::new(&provider, COOKIE);
        assert!(gate.session_id(&jar("")).is_none());
    }

    #[tokio::test]
    async fn known_session_is_authenticated() {
        let provider = OneSession::new();
        let gate = SessionGate::new(&provider, COOKIE);
        let outcome = gate.check(&jar(provider.0.id.as_str())).await;
        match outcome {
            GateOutcome::Authenticated(session) => assert_eq!(session.id, provider.0.id),
            other => panic!("expected authenticated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_session_is_stale() {
        let provider = OneSession::new();
        let gate = SessionGate::new(&provider, COOKIE);
        let outcome = gate.check(&jar("forgotten")).await;
        assert!(matches!(
            outcome,
            GateOutcome::Unauthenticated { stale: Some(ref id) } if id.as_str() == "forgotten"
        ));
    }

    #[tokio::test]
    async fn lookup_failure_is_unauthenticated() {
        let provider = OneSession::new();
        let gate = SessionGate::new(&provider, COOKIE);
        let outcome = gate.check(&jar("err-123")).await;
        assert!(matches!(
            outcome,
            GateOutcome::Unauthenticated { stale: Some(_) }
        ));
    }
}
