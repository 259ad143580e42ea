//! Google-backed session broker.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::BoxFuture;
use crate::session::{
    PendingSignIn, Session, SessionId, SessionProvider, SessionStore, SignInRequest, UserProfile,
};

use super::config::GoogleConfig;
use super::oauth::{OAuthClient, PkceFlow};

const PROVIDER_NAME: &str = "google";

/// Session broker backed by Google OAuth and an in-memory [`SessionStore`].
#[derive(Debug)]
pub struct GoogleSessionBroker {
    oauth: OAuthClient,
    store: Arc<SessionStore>,
    session_ttl: chrono::Duration,
}

impl GoogleSessionBroker {
    /// Creates a broker with an empty session store.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        Self::with_store(config, Arc::new(SessionStore::new()))
    }

    /// Creates a broker over an existing store.
    pub fn with_store(config: &GoogleConfig, store: Arc<SessionStore>) -> ProviderResult<Self> {
        config
            .validate()
            .map_err(|e| ProviderError::configuration(e).with_provider(PROVIDER_NAME))?;

        Ok(Self {
            oauth: OAuthClient::new(config)?,
            store,
            session_ttl: config.session_ttl,
        })
    }

    /// The underlying session store.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Starts a sign-in at a given instant.
    pub fn begin_sign_in_at(
        &self,
        redirect_uri: &str,
        now: DateTime<Utc>,
    ) -> ProviderResult<SignInRequest> {
        self.store.purge_expired(now);

        let pkce = PkceFlow::new();
        let authorization_url = self
            .oauth
            .authorization_url(&pkce, redirect_uri)
            .map_err(|e| e.with_provider(PROVIDER_NAME))?;

        self.store.insert_pending(
            pkce.state.clone(),
            PendingSignIn {
                verifier: pkce.verifier,
                redirect_uri: redirect_uri.to_string(),
                created_at: now,
            },
        );

        debug!("sign-in started");
        Ok(SignInRequest {
            authorization_url,
            state: pkce.state,
        })
    }

    /// Completes a sign-in at a given instant.
    pub async fn complete_sign_in_at(
        &self,
        code: &str,
        state: &str,
        now: DateTime<Utc>,
    ) -> ProviderResult<Session> {
        let pending = self.store.take_pending(state, now).ok_or_else(|| {
            ProviderError::bad_request("unknown or expired sign-in state")
                .with_provider(PROVIDER_NAME)
        })?;

        let tokens = self
            .oauth
            .exchange_code(code, &pending.verifier, &pending.redirect_uri, now)
            .await
            .map_err(|e| e.with_provider(PROVIDER_NAME))?;

        let user = match self.oauth.user_info(&tokens.access_token).await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "failed to read user profile, continuing without it");
                UserProfile::default()
            }
        };

        let session = Session::new(tokens, user, now, self.session_ttl);
        info!(
            session = %session.id,
            email = session.user.email.as_deref().unwrap_or("-"),
            "user signed in"
        );
        self.store.insert(session.clone());
        debug!(sessions = self.store.len(), "session stored");
        Ok(session)
    }

    /// Resolves a session at a given instant.
    ///
    /// An expired access token is refreshed once; if that fails, or there is
    /// no refresh token, the session is dropped and `None` is returned.
    pub async fn get_session_at(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> ProviderResult<Option<Session>> {
        let Some(session) = self.store.get(id) else {
            return Ok(None);
        };

        if session.is_expired_at(now) {
            debug!(session = %id, "session lifetime elapsed");
            self.store.remove(id);
            return Ok(None);
        }

        if !session.tokens.is_expired_at(now) {
            return Ok(Some(session));
        }

        if session.tokens.refresh_token.is_none() {
            info!(session = %id, "access token expired without refresh token, dropping session");
            self.store.remove(id);
            return Ok(None);
        }

        match self.oauth.refresh(&session.tokens, now).await {
            Ok(tokens) => Ok(self.store.update_tokens(id, tokens)),
            Err(e) => {
                warn!(session = %id, error = %e, "token refresh failed, dropping session");
                self.store.remove(id);
                Ok(None)
            }
        }
    }

    /// Signs a session out: local removal first, then remote revocation.
    pub async fn sign_out_session(&self, id: &SessionId) -> ProviderResult<()> {
        let Some(session) = self.store.remove(id) else {
            debug!(session = %id, "sign-out for unknown session");
            return Ok(());
        };
        info!(session = %id, "session removed");

        let token = session
            .tokens
            .refresh_token
            .as_ref()
            .unwrap_or(&session.tokens.access_token);

        self.oauth
            .revoke(token)
            .await
            .map_err(|e| e.with_provider(PROVIDER_NAME))
    }
}

impl SessionProvider for GoogleSessionBroker {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn begin_sign_in<'a>(
        &'a self,
        redirect_uri: &'a str,
    ) -> BoxFuture<'a, ProviderResult<SignInRequest>> {
        Box::pin(async move { self.begin_sign_in_at(redirect_uri, Utc::now()) })
    }

    fn complete_sign_in<'a>(
        &'a self,
        code: &'a str,
        state: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Session>> {
        Box::pin(self.complete_sign_in_at(code, state, Utc::now()))
    }

    fn get_session<'a>(
        &'a self,
        id: &'a SessionId,
    ) -> BoxFuture<'a, ProviderResult<Option<Session>>> {
        Box::pin(self.get_session_at(id, Utc::now()))
    }

    fn is_live(&self, id: &SessionId) -> bool {
        self.store.is_live(id, Utc::now())
    }

    fn sign_out<'a>(&'a self, id: &'a SessionId) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.sign_out_session(id))
    }
}
