//! OAuth 2.0 web-server flow with PKCE for Google.
//!
//! 1. [`PkceFlow`] generates a code verifier, its SHA-256 challenge and a CSRF
//!    state, and builds the consent URL.
//! 2. Google redirects the browser to our callback with `code` and `state`.
//! 3. [`OAuthClient::exchange_code`] trades the code (plus verifier) for tokens.
//! 4. Later requests refresh the access token, read the user profile, and
//!    finally revoke the grant on sign-out.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::session::{BearerToken, SessionTokens, UserProfile, random_urlsafe};

use super::config::{GoogleConfig, GoogleEndpoints, OAuthCredentials};

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Length of the CSRF state (in bytes, before base64 encoding).
const STATE_LENGTH: usize = 16;

/// Access tokens are considered expired this many seconds early.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// OAuth client for Google's token, revocation and userinfo endpoints.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    scopes: Vec<String>,
    endpoints: GoogleEndpoints,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration("failed to create HTTP client").with_source(e)
            })?;

        Ok(Self {
            credentials: config.credentials.clone(),
            scopes: config.scopes.clone(),
            endpoints: config.endpoints.clone(),
            http_client,
        })
    }

    /// Builds the consent URL for a new PKCE flow.
    pub fn authorization_url(&self, pkce: &PkceFlow, redirect_uri: &str) -> ProviderResult<String> {
        pkce.build_auth_url(
            &self.endpoints.auth_url,
            &self.credentials.client_id,
            redirect_uri,
            &self.scopes,
        )
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        now: DateTime<Utc>,
    ) -> ProviderResult<SessionTokens> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.post_token_form(&params, "token exchange").await?;
        info!("obtained tokens from authorization code");
        Ok(response.into_tokens(now, None, &self.scopes))
    }

    /// Obtains a new access token with the session's refresh token.
    ///
    /// Google usually omits the refresh token on refresh; the existing one is
    /// carried over in that case.
    pub async fn refresh(
        &self,
        current: &SessionTokens,
        now: DateTime<Utc>,
    ) -> ProviderResult<SessionTokens> {
        let refresh_token = current
            .refresh_token
            .as_ref()
            .ok_or_else(|| ProviderError::authentication("session has no refresh token"))?;

        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token.secret()),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_token_form(&params, "token refresh").await?;
        info!("refreshed access token");
        Ok(response.into_tokens(now, Some(refresh_token.clone()), &current.scopes))
    }

    /// Revokes a token at Google. Revoking a refresh token also revokes the
    /// access tokens minted from it.
    pub async fn revoke(&self, token: &BearerToken) -> ProviderResult<()> {
        let response = self
            .http_client
            .post(&self.endpoints.revoke_url)
            .form(&[("token", token.secret())])
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("revocation request failed: {}", e)).with_source(e)
            })?;

        let status = response.status();
        if status.is_success() {
            debug!("token revoked");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(token_error(status.as_u16(), &body, "token revocation"))
    }

    /// Reads the signed-in user's email and name.
    pub async fn user_info(&self, access_token: &BearerToken) -> ProviderResult<UserProfile> {
        let response = self
            .http_client
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(access_token.secret())
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("userinfo request failed: {}", e)).with_source(e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        parse_user_info(&body)
    }

    async fn post_token_form(
        &self,
        params: &[(&str, &str)],
        operation: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("{} request failed: {}", operation, e))
                    .with_source(e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(token_error(status.as_u16(), &body, operation));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })
    }
}

/// Maps a failed token-endpoint call to an error.
///
/// Google reports OAuth failures as 400/401 with `{"error": "...",
/// "error_description": "..."}`; those become authentication errors.
fn token_error(status: u16, body: &str, operation: &str) -> ProviderError {
    let detail = serde_json::from_str::<OAuthErrorBody>(body)
        .ok()
        .map(|e| match e.error_description {
            Some(desc) => format!("{} ({})", e.error, desc),
            None => e.error,
        })
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        400 | 401 => ProviderError::authentication(format!(
            "{} failed ({}): {}",
            operation, status, detail
        )),
        _ => ProviderError::from_status(status, &detail),
    }
}

fn parse_user_info(body: &str) -> ProviderResult<UserProfile> {
    let info: UserInfoResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::invalid_response(format!("invalid userinfo response: {}", e)))?;
    Ok(UserProfile {
        email: info.email,
        name: info.name,
    })
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = random_urlsafe(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        let state = random_urlsafe(STATE_LENGTH);

        Self {
            verifier,
            challenge,
            state,
        }
    }

    /// Computes the SHA-256 challenge for a code verifier.
    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Builds the Google OAuth authorization URL.
    ///
    /// Requests offline access so a refresh token is issued.
    pub fn build_auth_url(
        &self,
        auth_url: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<String> {
        let scope = scopes.join(" ");
        let url = url::Url::parse_with_params(
            auth_url,
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("code_challenge", self.challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("state", self.state.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| ProviderError::configuration(format!("invalid authorization URL: {}", e)))?;

        Ok(url.into())
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Space-separated list of granted scopes.
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_tokens(
        self,
        now: DateTime<Utc>,
        previous_refresh: Option<BearerToken>,
        requested_scopes: &[String],
    ) -> SessionTokens {
        let scopes = match self.scope {
            Some(granted) => granted.split_whitespace().map(String::from).collect(),
            None => requested_scopes.to_vec(),
        };

        SessionTokens {
            access_token: BearerToken::new(self.access_token),
            refresh_token: self.refresh_token.map(BearerToken::new).or(previous_refresh),
            // an expiry we cannot represent is treated as unknown
            expires_at: self.expires_in.and_then(|secs| {
                let lifetime = Duration::try_seconds(secs.saturating_sub(EXPIRY_BUFFER_SECS))?;
                now.checked_add_signed(lifetime)
            }),
            scopes,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::TimeZone;

    const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    mod pkce {
        use super::*;

        #[test]
        fn verifier_length() {
            let flow = PkceFlow::new();
            // Base64 encoding of 32 bytes = 43 characters (no padding)
            assert_eq!(flow.verifier.len(), 43);
        }

        #[test]
        fn challenge_matches_rfc7636_example() {
            // Appendix B of RFC 7636
            let challenge = PkceFlow::compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
            assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
        }

        #[test]
        fn flows_are_random() {
            let flow1 = PkceFlow::new();
            let flow2 = PkceFlow::new();
            assert_ne!(flow1.challenge, flow2.challenge);
            assert_ne!(flow1.state, flow2.state);
        }

        #[test]
        fn auth_url_format() {
            let flow = PkceFlow::new();
            let url = flow
                .build_auth_url(
                    AUTH_URL,
                    "test-client.apps.googleusercontent.com",
                    "http://localhost:3000/auth/callback",
                    &[
                        "https://www.googleapis.com/auth/userinfo.email".to_string(),
                        "https://www.googleapis.com/auth/calendar.readonly".to_string(),
                    ],
                )
                .unwrap();

            let parsed = url::Url::parse(&url).unwrap();
            let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();

            assert!(url.starts_with(AUTH_URL));
            assert_eq!(params["redirect_uri"], "http://localhost:3000/auth/callback");
            assert_eq!(params["code_challenge"], flow.challenge);
            assert_eq!(params["code_challenge_method"], "S256");
            assert_eq!(params["state"], flow.state);
            assert_eq!(params["access_type"], "offline");
            assert_eq!(
                params["scope"],
                "https://www.googleapis.com/auth/userinfo.email https://www.googleapis.com/auth/calendar.readonly"
            );
        }

        #[test]
        fn invalid_auth_endpoint() {
            let err = PkceFlow::new()
                .build_auth_url("::not-a-url", "id", "http://localhost/cb", &[])
                .unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        }
    }

    mod token_response {
        use super::*;

        #[test]
        fn expiry_has_buffer() {
            let now = utc(2025, 2, 5, 10, 0, 0);
            let response: TokenResponse = serde_json::from_str(
                r#"{"access_token":"ya29.a","expires_in":3599,"refresh_token":"1//r","scope":"openid email","token_type":"Bearer"}"#,
            )
            .unwrap();

            let tokens = response.into_tokens(now, None, &[]);
            assert_eq!(tokens.access_token.secret(), "ya29.a");
            assert_eq!(tokens.refresh_token.as_ref().map(|t| t.secret()), Some("1//r"));
            assert_eq!(tokens.expires_at, Some(utc(2025, 2, 5, 10, 58, 59)));
            assert_eq!(tokens.scopes, vec!["openid", "email"]);
        }

        #[test]
        fn unrepresentable_expiry_is_unknown() {
            let now = utc(2025, 2, 5, 10, 0, 0);
            for expires_in in [i64::MAX, i64::MIN, 9_000_000_000_000_000] {
                let response = TokenResponse {
                    access_token: "ya29.c".to_string(),
                    refresh_token: None,
                    expires_in: Some(expires_in),
                    scope: None,
                };
                let tokens = response.into_tokens(now, None, &[]);
                assert_eq!(tokens.expires_at, None, "expires_in = {expires_in}");
                assert!(!tokens.is_expired_at(now));
            }
        }

        #[test]
        fn refresh_keeps_previous_refresh_token() {
            let now = utc(2025, 2, 5, 10, 0, 0);
            let response: TokenResponse =
                serde_json::from_str(r#"{"access_token":"ya29.b","expires_in":3600}"#).unwrap();

            let tokens = response.into_tokens(
                now,
                Some(BearerToken::new("1//old")),
                &["https://www.googleapis.com/auth/calendar.readonly".to_string()],
            );
            assert_eq!(tokens.refresh_token.as_ref().map(|t| t.secret()), Some("1//old"));
            assert_eq!(tokens.scopes.len(), 1);
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn invalid_grant_is_authentication_failure() {
            let err = token_error(
                400,
                r#"{"error":"invalid_grant","error_description":"Bad Request"}"#,
                "token exchange",
            );
            assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
            insta::assert_snapshot!(err.message(), @"token exchange failed (400): invalid_grant (Bad Request)");
        }

        #[test]
        fn server_failure_keeps_status() {
            let err = token_error(503, "unavailable", "token refresh");
            assert_eq!(err.code(), ProviderErrorCode::ServerError);
            assert!(err.message().contains("503"));
        }
    }

    #[test]
    fn parses_user_info() {
        let profile = parse_user_info(
            r#"{"id":"1","email":"ada@example.com","verified_email":true,"name":"Ada"}"#,
        )
        .unwrap();
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
        assert_eq!(profile.name.as_deref(), Some("Ada"));

        assert!(parse_user_info("<html>").is_err());
    }
}
