//! Failures reported by the identity and calendar backends.
//!
//! Token exchange, userinfo, revocation and event listing all fail with a
//! [`ProviderError`]. Callers branch on its [`ProviderErrorCode`]; the message
//! is for logs and notifications.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Coarse failure category, stable enough to map to HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// 401, or a token that is expired or revoked.
    AuthenticationFailed,
    /// 403.
    AuthorizationFailed,
    /// Transport failure: refused, timed out, truncated body.
    NetworkError,
    /// 429.
    RateLimited,
    /// Any other unsuccessful status.
    ServerError,
    /// A body we could not decode.
    InvalidResponse,
    /// Unusable input from our side, e.g. an unknown sign-in state.
    BadRequest,
    ConfigurationError,
    InternalError,
}

impl ProviderErrorCode {
    pub fn as_str(&self) -> &'static str {
        use ProviderErrorCode::*;
        match self {
            AuthenticationFailed => "authentication_failed",
            AuthorizationFailed => "authorization_failed",
            NetworkError => "network_error",
            RateLimited => "rate_limited",
            ServerError => "server_error",
            InvalidResponse => "invalid_response",
            BadRequest => "bad_request",
            ConfigurationError => "configuration_error",
            InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type BoxedCause = Box<dyn StdError + Send + Sync>;

/// A failed call to Google (or whichever backend is tagged in `provider`).
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    provider: Option<String>,
    #[source]
    source: Option<BoxedCause>,
}

macro_rules! shorthand {
    ($($(#[$doc:meta])* $name:ident => $code:ident;)+) => {
        $(
            $(#[$doc])*
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ProviderErrorCode::$code, message)
            }
        )+
    };
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    shorthand! {
        authentication => AuthenticationFailed;
        authorization => AuthorizationFailed;
        network => NetworkError;
        rate_limited => RateLimited;
        server => ServerError;
        invalid_response => InvalidResponse;
        /// Input the backend will never accept, retrying is pointless.
        bad_request => BadRequest;
        configuration => ConfigurationError;
        internal => InternalError;
    }

    /// Classifies an unsuccessful HTTP response.
    ///
    /// Only 401, 403 and 429 have their own codes. Every other status becomes
    /// [`ProviderErrorCode::ServerError`] with the status and trimmed body in
    /// the message.
    pub fn from_status(status: u16, body: &str) -> Self {
        match (status, body.trim()) {
            (401, _) => Self::authentication("access token expired or invalid"),
            (403, _) => Self::authorization("access denied to calendar"),
            (429, _) => Self::rate_limited("rate limit exceeded"),
            (_, "") => Self::server(format!("API error ({status})")),
            (_, detail) => Self::server(format!("API error ({status}): {detail}")),
        }
    }

    /// Tags the error with the backend that produced it.
    pub fn with_provider(self, provider: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            ..self
        }
    }

    pub fn with_source(self, source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..self
        }
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provider.as_deref() {
            Some(provider) => write!(f, "[{provider}] {}: {}", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_names() {
        assert_eq!(
            ProviderErrorCode::AuthenticationFailed.as_str(),
            "authentication_failed"
        );
        assert_eq!(ProviderErrorCode::RateLimited.to_string(), "rate_limited");
    }

    #[test]
    fn shorthand_constructors() {
        let err = ProviderError::authentication("token expired");
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.message(), "token expired");
        assert!(err.provider().is_none());
    }

    #[test]
    fn display_includes_provider_tag() {
        let err = ProviderError::rate_limited("too many requests").with_provider("google");
        assert_eq!(err.to_string(), "[google] rate_limited: too many requests");
    }

    #[test]
    fn keeps_cause() {
        let io_err = std::io::Error::other("connection reset");
        let err = ProviderError::network("request failed").with_source(io_err);
        assert!(err.source().is_some());
    }

    mod from_status {
        use super::*;

        #[test]
        fn dedicated_codes() {
            assert_eq!(
                ProviderError::from_status(401, "").code(),
                ProviderErrorCode::AuthenticationFailed
            );
            assert_eq!(
                ProviderError::from_status(403, "").code(),
                ProviderErrorCode::AuthorizationFailed
            );
            assert_eq!(
                ProviderError::from_status(429, "").code(),
                ProviderErrorCode::RateLimited
            );
        }

        #[test]
        fn other_statuses_keep_status_and_body() {
            let err = ProviderError::from_status(503, "backend unavailable\n");
            assert_eq!(err.code(), ProviderErrorCode::ServerError);
            assert_eq!(err.message(), "API error (503): backend unavailable");

            let err = ProviderError::from_status(404, "");
            assert_eq!(err.message(), "API error (404)");
        }
    }
}
