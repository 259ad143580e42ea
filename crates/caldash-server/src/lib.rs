//! caldash web server.
//!
//! This crate serves the calendar dashboard:
//!
//! - [`gate`] - resolves the session cookie into a signed-in session
//! - [`view`] - per-session event list, filter and fetch fencing
//! - [`render`] - HTML pages
//! - [`handlers`] / [`app`] - axum routes and shared state
//! - [`config`] / [`cli`] / [`commands`] - the `caldash` binary
//!
//! The identity broker and the event source are injected as trait objects
//! ([`caldash_providers::SessionProvider`], [`caldash_providers::EventSource`]),
//! so the router can be driven with fakes.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod render;
pub mod secret;
pub mod view;

pub use app::{AppSettings, AppState, router};
pub use error::{ServerError, ServerResult};
