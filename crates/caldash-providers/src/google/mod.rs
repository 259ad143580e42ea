//! Google OAuth session broker and Calendar event source.
//!
//! # Authentication Flow
//!
//! 1. The operator registers a "web application" OAuth client and configures
//!    its ID/secret plus the public callback URL
//! 2. [`GoogleSessionBroker::begin_sign_in`](crate::SessionProvider::begin_sign_in)
//!    records a PKCE verifier under a random state and returns Google's consent URL
//! 3. Google redirects back to `/auth/callback` with `code` and `state`
//! 4. The broker exchanges the code, reads the user's profile and stores a session
//! 5. [`GoogleEventSource`] lists events with the session's access token
//!
//! # Example
//!
//! ```ignore
//! use caldash_providers::google::{GoogleConfig, GoogleEventSource, GoogleSessionBroker, OAuthCredentials};
//!
//! let config = GoogleConfig::new(OAuthCredentials::new(
//!     "your-client-id.apps.googleusercontent.com",
//!     "your-client-secret",
//! ));
//! let broker = GoogleSessionBroker::new(&config)?;
//! let source = GoogleEventSource::new(&config)?;
//! ```

mod broker;
mod client;
mod config;
mod oauth;
mod provider;

pub use broker::GoogleSessionBroker;
pub use client::GoogleCalendarClient;
pub use config::{DEFAULT_SCOPES, GoogleConfig, GoogleEndpoints, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow};
pub use provider::GoogleEventSource;
