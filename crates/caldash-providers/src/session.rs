//! Session capability and the in-memory session store.
//!
//! A [`SessionProvider`] is the identity broker seen by the web layer: it
//! starts and completes the OAuth sign-in, resolves a session cookie into a
//! [`Session`] that carries the calendar bearer token, and signs users out.
//! Handlers only ever see the trait object, so tests swap in fakes.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::Rng as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderResult;
use crate::provider::BoxFuture;

/// How long a started sign-in may wait for its callback, in seconds.
pub const PENDING_SIGN_IN_TTL_SECS: i64 = 600;

/// Number of random bytes in a session identifier.
const SESSION_ID_BYTES: usize = 32;

/// Returns `len` random bytes encoded as unpadded base64url.
pub fn random_urlsafe(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Opaque session identifier, stored in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(random_urlsafe(SESSION_ID_BYTES))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Prefix only: the full value is a credential.
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "{prefix}…")
    }
}

/// A secret token whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for `Authorization` headers and form bodies only.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// OAuth tokens attached to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    /// Token sent to the calendar API.
    pub access_token: BearerToken,
    /// Token used to obtain a new access token.
    pub refresh_token: Option<BearerToken>,
    /// When the access token stops being usable, if the provider said so.
    pub expires_at: Option<DateTime<Utc>>,
    /// Scopes that were granted.
    pub scopes: Vec<String>,
}

impl SessionTokens {
    /// Returns true if the access token is expired at `now`.
    ///
    /// Tokens without a known expiry are treated as valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Identity of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: Option<String>,
    pub name: Option<String>,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub tokens: SessionTokens,
    pub user: UserProfile,
    pub created_at: DateTime<Utc>,
    /// After this instant the session is gone regardless of token state.
    pub valid_until: DateTime<Utc>,
}

impl Session {
    /// Creates a session with a fresh identifier.
    ///
    /// A lifetime reaching past the representable range never ends.
    pub fn new(
        tokens: SessionTokens,
        user: UserProfile,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        Self {
            id: SessionId::generate(),
            tokens,
            user,
            created_at: now,
            valid_until: now
                .checked_add_signed(lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// The bearer token to send to the calendar API.
    pub fn provider_token(&self) -> &BearerToken {
        &self.tokens.access_token
    }

    /// Returns true once the session lifetime has elapsed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_until
    }
}

/// What the browser needs to start a sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRequest {
    /// Provider authorization URL to redirect the browser to.
    pub authorization_url: String,
    /// CSRF state echoed back on the callback.
    pub state: String,
}

/// A sign-in that was started but not yet completed.
#[derive(Debug, Clone)]
pub struct PendingSignIn {
    pub verifier: String,
    pub redirect_uri: String,
    pub created_at: DateTime<Utc>,
}

impl PendingSignIn {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= Duration::seconds(PENDING_SIGN_IN_TTL_SECS)
    }
}

/// In-memory storage for sessions and pending sign-ins.
///
/// Locks are only held for map operations, never across an `.await`.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    pending: RwLock<HashMap<String, PendingSignIn>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a session, replacing any session with the same id.
    pub fn insert(&self, session: Session) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session.id.clone(), session);
    }

    /// Returns a copy of the session with this id.
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(id).cloned()
    }

    /// Removes and returns a session.
    pub fn remove(&self, id: &SessionId) -> Option<Session> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(id)
    }

    /// Replaces the tokens of an existing session.
    ///
    /// Returns the updated session, or `None` if it was removed meanwhile.
    pub fn update_tokens(&self, id: &SessionId, tokens: SessionTokens) -> Option<Session> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get_mut(id)?;
        session.tokens = tokens;
        Some(session.clone())
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if `id` is stored and its lifetime has not elapsed.
    pub fn is_live(&self, id: &SessionId, now: DateTime<Utc>) -> bool {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(id).is_some_and(|s| !s.is_expired_at(now))
    }

    /// Records a pending sign-in under its state value.
    pub fn insert_pending(&self, state: impl Into<String>, pending: PendingSignIn) {
        let mut map = self.pending.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(state.into(), pending);
    }

    /// Removes and returns the pending sign-in for `state` if it has not expired.
    ///
    /// A state value can only be redeemed once.
    pub fn take_pending(&self, state: &str, now: DateTime<Utc>) -> Option<PendingSignIn> {
        let mut map = self.pending.write().unwrap_or_else(PoisonError::into_inner);
        map.remove(state).filter(|p| !p.is_expired_at(now))
    }

    /// Drops expired sessions and pending sign-ins.
    pub fn purge_expired(&self, now: DateTime<Utc>) {
        let removed_sessions = {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            let before = sessions.len();
            sessions.retain(|_, s| !s.is_expired_at(now));
            before - sessions.len()
        };
        let removed_pending = {
            let mut pending = self.pending.write().unwrap_or_else(PoisonError::into_inner);
            let before = pending.len();
            pending.retain(|_, p| !p.is_expired_at(now));
            before - pending.len()
        };
        if removed_sessions > 0 || removed_pending > 0 {
            debug!(
                sessions = removed_sessions,
                pending = removed_pending,
                "purged expired entries"
            );
        }
    }
}

/// The identity/session capability used by the web layer.
///
/// # Example Implementation
///
/// ```ignore
/// impl SessionProvider for StaticSessions {
///     fn name(&self) -> &str { "static" }
///
///     fn get_session<'a>(&'a self, id: &'a SessionId) -> BoxFuture<'a, ProviderResult<Option<Session>>> {
///         Box::pin(async move { Ok(self.sessions.get(id).cloned()) })
///     }
///     // ... other methods
/// }
/// ```
pub trait SessionProvider: Send + Sync {
    /// Returns the provider name (e.g. "google").
    fn name(&self) -> &str;

    /// Starts a sign-in whose callback will land on `redirect_uri`.
    fn begin_sign_in<'a>(
        &'a self,
        redirect_uri: &'a str,
    ) -> BoxFuture<'a, ProviderResult<SignInRequest>>;

    /// Exchanges the authorization code from the callback for a new session.
    ///
    /// # Errors
    ///
    /// Fails with `BadRequest` for an unknown or expired `state`, and with the
    /// token endpoint's error if the exchange itself fails.
    fn complete_sign_in<'a>(
        &'a self,
        code: &'a str,
        state: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Session>>;

    /// Resolves a session id into a live session.
    ///
    /// `Ok(None)` means the user is not signed in.
    fn get_session<'a>(
        &'a self,
        id: &'a SessionId,
    ) -> BoxFuture<'a, ProviderResult<Option<Session>>>;

    /// Returns true while `id` names a session that has not ended.
    ///
    /// Unlike [`get_session`](Self::get_session) this never refreshes tokens
    /// or calls out to the provider.
    fn is_live(&self, id: &SessionId) -> bool;

    /// Ends a session.
    ///
    /// The session is forgotten locally before the provider is asked to revoke
    /// its tokens, so an error here never leaves the session usable.
    fn sign_out<'a>(&'a self, id: &'a SessionId) -> BoxFuture<'a, ProviderResult<()>>;
}
