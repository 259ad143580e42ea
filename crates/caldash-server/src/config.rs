//! Server configuration.
//!
//! All settings live in a single `config.toml`, by default at
//! `~/.config/caldash/config.toml`. Every section is optional.
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is
//!
//! When the file carries no credentials at all, `GOOGLE_CLIENT_ID` and
//! `GOOGLE_CLIENT_SECRET` are read from the environment.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use caldash_providers::DEFAULT_CALENDAR_ID;
use caldash_providers::google::{GoogleConfig, GoogleEndpoints, OAuthCredentials};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::app::AppSettings;

/// Path of the OAuth callback below the public URL.
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Environment variables consulted when the file has no credentials.
const CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
const CLIENT_SECRET_ENV: &str = "GOOGLE_CLIENT_SECRET";

// ---------------------------------------------------------------------------
// ServerConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the caldash web server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listener and cookie settings.
    pub server: ServerSettings,

    /// Google OAuth and Calendar settings.
    pub google: GoogleSettings,

    /// Display settings.
    pub display: DisplaySettings,
}

/// HTTP listener and session cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind: String,

    /// Externally visible base URL, used to build the OAuth redirect URL.
    pub public_url: String,

    /// Mark the session cookie `Secure` (required behind HTTPS).
    pub secure_cookies: bool,

    /// Name of the session cookie.
    pub cookie_name: String,

    /// Hours a session stays valid after sign-in.
    pub session_ttl_hours: i64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            public_url: "http://localhost:3000".to_string(),
            secure_cookies: false,
            cookie_name: "caldash_session".to_string(),
            session_ttl_hours: GoogleConfig::DEFAULT_SESSION_TTL_HOURS,
        }
    }
}

/// Google OAuth and Calendar settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Google Cloud Console credentials JSON, used when id/secret are unset.
    pub credentials_file: Option<PathBuf>,

    /// Calendar to list.
    pub calendar_id: String,

    /// HTTP timeout for Google requests, in seconds.
    pub timeout_secs: u64,

    /// Upper bound on events fetched per request.
    pub max_events: Option<usize>,

    /// Overrides the Calendar API base URL (proxies, local fakes).
    pub api_base: Option<String>,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            credentials_file: None,
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            timeout_secs: GoogleConfig::DEFAULT_TIMEOUT_SECS,
            max_events: Some(250),
            api_base: None,
        }
    }
}

/// Display settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// IANA timezone used to place events on days and format times.
    /// Defaults to UTC.
    pub timezone: Option<String>,
}

impl DisplaySettings {
    /// Parses the configured timezone.
    pub fn timezone(&self) -> Result<Tz, String> {
        match self.timezone.as_deref().map(str::trim) {
            None | Some("") => Ok(Tz::UTC),
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| format!("invalid timezone '{name}': {e}")),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the default path, falling back to defaults
    /// when no file exists.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("caldash")
    }

    /// Parses the listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, String> {
        self.server
            .bind
            .parse()
            .map_err(|e| format!("invalid bind address '{}': {}", self.server.bind, e))
    }

    /// The URL Google redirects back to after consent.
    pub fn redirect_uri(&self) -> Result<String, String> {
        let base = url::Url::parse(&self.server.public_url)
            .map_err(|e| format!("invalid public_url '{}': {}", self.server.public_url, e))?;
        base.join(CALLBACK_PATH)
            .map(String::from)
            .map_err(|e| format!("cannot build callback URL: {}", e))
    }

    /// Builds the provider configuration, resolving credentials.
    pub fn to_google_config(&self) -> Result<GoogleConfig, String> {
        let hours = self.server.session_ttl_hours;
        let session_ttl = (1..=GoogleConfig::MAX_SESSION_TTL_HOURS)
            .contains(&hours)
            .then(|| chrono::Duration::try_hours(hours))
            .flatten()
            .ok_or_else(|| {
                format!(
                    "session_ttl_hours must be between 1 and {}, got {hours}",
                    GoogleConfig::MAX_SESSION_TTL_HOURS
                )
            })?;

        let credentials = self.google.resolve_credentials()?;
        let mut config = GoogleConfig::new(credentials)
            .with_timeout(Duration::from_secs(self.google.timeout_secs))
            .with_session_ttl(session_ttl);

        if let Some(ref base) = self.google.api_base {
            config = config.with_endpoints(GoogleEndpoints {
                calendar_api_base: base.trim_end_matches('/').to_string(),
                ..GoogleEndpoints::default()
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Builds the request-handling settings.
    pub fn to_app_settings(&self) -> Result<AppSettings, String> {
        let mut settings = AppSettings::new(self.redirect_uri()?)
            .with_cookie_name(&self.server.cookie_name)
            .with_secure_cookies(self.server.secure_cookies)
            .with_timezone(self.display.timezone()?)
            .with_calendar_id(&self.google.calendar_id);
        if let Some(max) = self.google.max_events {
            settings = settings.with_max_events(max);
        }
        Ok(settings)
    }

    /// Checks everything `serve` needs, without touching the network.
    pub fn validate(&self) -> Result<(), String> {
        self.bind_addr()?;
        if self.server.cookie_name.trim().is_empty() {
            return Err("cookie_name must not be empty".to_string());
        }
        if self.google.calendar_id.trim().is_empty() {
            return Err("calendar_id must not be empty".to_string());
        }
        if self.google.max_events == Some(0) {
            return Err("max_events must be at least 1".to_string());
        }
        self.to_app_settings()?;
        self.to_google_config()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

impl GoogleSettings {
    fn has_inline_credentials(&self) -> bool {
        self.client_id.is_some() || self.client_secret.is_some()
    }

    /// Resolves the OAuth client credentials.
    ///
    /// Inline `client_id`/`client_secret` win, then `credentials_file`, then
    /// the `GOOGLE_CLIENT_ID`/`GOOGLE_CLIENT_SECRET` environment variables.
    pub fn resolve_credentials(&self) -> Result<OAuthCredentials, String> {
        if self.has_inline_credentials() {
            return self.resolve_inline();
        }

        if let Some(ref path) = self.credentials_file {
            return OAuthCredentials::from_file(path);
        }

        match (
            std::env::var(CLIENT_ID_ENV).ok(),
            std::env::var(CLIENT_SECRET_ENV).ok(),
        ) {
            (Some(id), Some(secret)) => Ok(OAuthCredentials::new(id, secret)),
            _ => Err(format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"\n\n  \
                 Or set {} and {}",
                ServerConfig::default_path().display(),
                CLIENT_ID_ENV,
                CLIENT_SECRET_ENV,
            )),
        }
    }

    fn resolve_inline(&self) -> Result<OAuthCredentials, String> {
        let raw_id = self
            .client_id
            .as_deref()
            .ok_or("client_id is missing from [google] section in config.toml")?;
        let raw_secret = self
            .client_secret
            .as_deref()
            .ok_or("client_secret is missing from [google] section in config.toml")?;

        let client_id = crate::secret::resolve(raw_id)
            .map_err(|e| format!("failed to resolve client_id: {}", e))?;
        let client_secret = crate::secret::resolve(raw_secret)
            .map_err(|e| format!("failed to resolve client_secret: {}", e))?;

        Ok(OAuthCredentials::new(client_id, client_secret))
    }
}
