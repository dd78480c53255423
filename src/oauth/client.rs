//! Authenticated external-API clients and the token exchange seam

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};

use crate::models::AuthError;
use crate::oauth::config::OAuthConfig;

/// HTTP client bound to one platform's access token
#[derive(Clone)]
pub struct AuthClient {
    platform: String,
    access_token: String,
    api_base: String,
    http: reqwest::Client,
}

impl AuthClient {
    #[must_use]
    pub fn new(
        platform: impl Into<String>,
        access_token: impl Into<String>,
        api_base: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            platform: platform.into(),
            access_token: access_token.into(),
            api_base: api_base.into(),
            http,
        }
    }

    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Authorized GET against a path under the platform's API base
    #[must_use]
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{path}", self.api_base))
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("stampgate/", env!("CARGO_PKG_VERSION")))
    }
}

impl fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClient")
            .field("platform", &self.platform)
            .field("api_base", &self.api_base)
            .field("access_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Turns a one-time authorization code into an authenticated client
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Exchange `code` obtained for the attempt identified by `session_key`
    ///
    /// # Errors
    ///
    /// Returns an error if the code is rejected or the token endpoint is unreachable
    async fn exchange(&self, session_key: &str, code: &str) -> Result<AuthClient, AuthError>;
}

/// Token exchange against one platform configured in [`OAuthConfig`]
pub struct PlatformTokenExchange {
    config: Arc<OAuthConfig>,
    platform: String,
}

impl PlatformTokenExchange {
    #[must_use]
    pub fn new(config: Arc<OAuthConfig>, platform: impl Into<String>) -> Self {
        Self {
            config,
            platform: platform.into(),
        }
    }
}

#[async_trait]
impl TokenExchange for PlatformTokenExchange {
    async fn exchange(&self, session_key: &str, code: &str) -> Result<AuthClient, AuthError> {
        self.config.exchange_code(&self.platform, session_key, code).await
    }
}
