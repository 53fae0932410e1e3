//! Auth configuration and shared state.

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use secrecy::SecretString;
use url::Url;

use super::tokens::TokenService;

const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 10 * 24 * 60 * 60;
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    access_token_secret: SecretString,
    refresh_token_secret: SecretString,
    access_token_ttl_secs: i64,
    refresh_token_ttl_secs: i64,
    public_base_url: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(access_token_secret: SecretString, refresh_token_secret: SecretString) -> Self {
        Self {
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_access_token_ttl_secs(mut self, seconds: i64) -> Self {
        self.access_token_ttl_secs = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_secs(mut self, seconds: i64) -> Self {
        self.refresh_token_ttl_secs = seconds;
        self
    }

    #[must_use]
    pub fn with_public_base_url(mut self, url: String) -> Self {
        self.public_base_url = url;
        self
    }

    pub(crate) fn access_token_secret(&self) -> &SecretString {
        &self.access_token_secret
    }

    pub(crate) fn refresh_token_secret(&self) -> &SecretString {
        &self.refresh_token_secret
    }

    #[must_use]
    pub fn access_token_ttl_secs(&self) -> i64 {
        self.access_token_ttl_secs
    }

    #[must_use]
    pub fn refresh_token_ttl_secs(&self) -> i64 {
        self.refresh_token_ttl_secs
    }

    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    pub(crate) fn cookie_secure(&self) -> bool {
        self.public_base_url.starts_with("https://")
    }

    /// Exact origin of the frontend, for CORS.
    ///
    /// # Errors
    /// Fails if the configured public URL cannot be parsed into an origin.
    pub fn public_origin(&self) -> Result<HeaderValue> {
        let url = Url::parse(&self.public_base_url).context("invalid public URL")?;
        let origin = url.origin().ascii_serialization();
        HeaderValue::from_str(&origin).context("invalid public origin header")
    }
}

/// Immutable per-process auth state: configuration plus the signing keys
/// derived from it. Built once at startup; safe for unsynchronized
/// concurrent reads.
pub struct AuthState {
    config: AuthConfig,
    tokens: TokenService,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let tokens = TokenService::new(&config);
        Self { config, tokens }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("access-secret"),
            SecretString::from("refresh-secret"),
        )
    }

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = test_config();

        assert_eq!(
            config.access_token_ttl_secs(),
            DEFAULT_ACCESS_TOKEN_TTL_SECS
        );
        assert_eq!(
            config.refresh_token_ttl_secs(),
            DEFAULT_REFRESH_TOKEN_TTL_SECS
        );
        assert_eq!(config.public_base_url(), DEFAULT_PUBLIC_BASE_URL);

        let config = config
            .with_access_token_ttl_secs(120)
            .with_refresh_token_ttl_secs(3600)
            .with_public_base_url("https://vidtube.dev".to_string());

        assert_eq!(config.access_token_ttl_secs(), 120);
        assert_eq!(config.refresh_token_ttl_secs(), 3600);
        assert_eq!(config.public_base_url(), "https://vidtube.dev");
    }

    #[test]
    fn cookie_secure_follows_scheme() {
        let config = test_config();
        assert!(!config.cookie_secure());

        let config = config.with_public_base_url("https://vidtube.dev".to_string());
        assert!(config.cookie_secure());
    }

    #[test]
    fn public_origin_strips_path() -> Result<()> {
        let config = test_config().with_public_base_url("https://vidtube.dev/app/".to_string());
        let origin = config.public_origin()?;
        assert_eq!(origin.to_str()?, "https://vidtube.dev");
        Ok(())
    }

    #[test]
    fn auth_state_exposes_token_service() {
        let state = AuthState::new(test_config());
        let user_id = uuid::Uuid::new_v4();
        let token = state
            .tokens()
            .issue(super::super::tokens::TokenKind::Access, user_id);
        assert!(token.is_ok());
    }
}
