//! Session and event-source capabilities.
//!
//! This crate provides the two seams between the web layer and the outside
//! world:
//!
//! - [`SessionProvider`] - sign-in, session lookup and sign-out
//! - [`EventSource`] - listing calendar events with a session's bearer token
//! - [`ProviderError`] - Error types for both
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────────────┐      ┌──────────────────────┐
//!  │ Google OAuth/userinfo│      │ Google Calendar API  │
//!  └──────────┬───────────┘      └──────────┬───────────┘
//!             │                             │
//!             ▼                             ▼
//!  ┌──────────────────────┐      ┌──────────────────────┐
//!  │ GoogleSessionBroker  │      │  GoogleEventSource   │
//!  └──────────┬───────────┘      └──────────┬───────────┘
//!             │ SessionProvider             │ EventSource
//!             ▼                             ▼
//!        Session (BearerToken) ──────► Vec<CalendarEvent>
//! ```

pub mod error;
pub mod google;
pub mod provider;
pub mod session;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{BoxFuture, DEFAULT_CALENDAR_ID, EventSource, FetchOptions};
pub use session::{
    BearerToken, PendingSignIn, Session, SessionId, SessionProvider, SessionStore, SessionTokens,
    SignInRequest, UserProfile,
};
