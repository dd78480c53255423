// Config-driven OAuth client: authorization URL building and code exchange
// for every platform declared in settings

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::models::AuthError;
use crate::oauth::client::AuthClient;
use crate::oauth::pkce::{
    code_challenge, generate_code_verifier, PendingAuthorization, PendingAuthorizations,
};
use crate::settings::{ProviderSettings, StampSettings, TokenAuthMethod};
use crate::utils::logging::LoggingHelper;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
}

/// Runtime provider configuration with resolved endpoints and credentials
#[derive(Debug, Clone)]
pub struct RuntimeProvider {
    pub settings: ProviderSettings,
    pub auth_url: String,
    pub token_url: String,
    pub api_base: String,
    pub client_id: String,
    pub client_secret: Option<String>,
}

impl RuntimeProvider {
    /// Resolve a provider from settings
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` when endpoints or the client ID are missing
    pub fn from_settings(settings: ProviderSettings) -> Result<Self, AuthError> {
        let missing = |what: &str| {
            AuthError::Configuration(format!("Provider {} missing {what}", settings.name))
        };
        let auth_url = settings
            .authorization_endpoint
            .clone()
            .ok_or_else(|| missing("authorization_endpoint"))?;
        let token_url = settings
            .token_endpoint
            .clone()
            .ok_or_else(|| missing("token_endpoint"))?;
        let api_base = settings.api_base.clone().ok_or_else(|| missing("api_base"))?;
        let client_id = settings.get_client_id().ok_or_else(|| {
            AuthError::Configuration(format!(
                "Client ID not configured for provider {}",
                settings.name
            ))
        })?;
        let client_secret = settings.get_client_secret();

        if client_secret.is_none() && !settings.use_pkce {
            return Err(AuthError::Configuration(format!(
                "Provider {} needs a client secret or PKCE",
                settings.name
            )));
        }

        Ok(Self {
            settings,
            auth_url,
            token_url,
            api_base: api_base.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.settings.display_name.as_deref().unwrap_or(&self.settings.name)
    }
}

/// Authorization URL plus the state (session key) minted for it
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub auth_url: String,
    pub session_key: String,
}

// Config-driven OAuth configuration
#[derive(Clone)]
pub struct OAuthConfig {
    providers: HashMap<String, RuntimeProvider>,
    pub redirect_base_url: String,
    pending: Arc<PendingAuthorizations>,
    http_client: reqwest::Client,
}

impl OAuthConfig {
    #[must_use]
    pub fn new(redirect_base_url: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            redirect_base_url: redirect_base_url.into().trim_end_matches('/').to_string(),
            pending: Arc::new(PendingAuthorizations::default()),
            http_client: reqwest::Client::new(),
        }
    }

    /// Build the configuration from settings, skipping disabled or unconfigured platforms
    #[must_use]
    pub fn from_settings(settings: &StampSettings) -> Self {
        LoggingHelper::log_oauth_provider_initialization();
        let mut config = Self::new(settings.application.redirect_base_url.clone());

        for provider_settings in &settings.providers {
            if !provider_settings.enabled {
                LoggingHelper::log_oauth_provider_disabled(&provider_settings.name);
                continue;
            }

            match RuntimeProvider::from_settings(provider_settings.clone()) {
                Ok(runtime_provider) => {
                    LoggingHelper::log_oauth_provider_configured(
                        runtime_provider.display_name(),
                        runtime_provider.name(),
                    );
                    config.insert_provider(runtime_provider);
                }
                Err(e) => {
                    LoggingHelper::log_oauth_provider_not_configured(&provider_settings.name, &e);
                }
            }
        }

        LoggingHelper::log_oauth_providers_summary(&config.platforms());
        config
    }

    pub fn insert_provider(&mut self, provider: RuntimeProvider) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    #[must_use]
    pub fn provider(&self, platform: &str) -> Option<&RuntimeProvider> {
        self.providers.get(platform)
    }

    /// Names of configured platforms, sorted
    #[must_use]
    pub fn platforms(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn pending(&self) -> &PendingAuthorizations {
        &self.pending
    }

    /// Callback used when the caller does not supply one
    #[must_use]
    pub fn default_callback(&self, platform: &str) -> String {
        format!("{}/{platform}/callback", self.redirect_base_url)
    }

    /// Build an authorization URL and remember the attempt under a fresh session key
    ///
    /// # Errors
    ///
    /// Returns an error if the platform is not configured or its authorization
    /// endpoint is not a URL
    pub fn get_auth_url(
        &self,
        platform: &str,
        callback: Option<&str>,
    ) -> Result<AuthorizationRequest, AuthError> {
        let runtime_provider = self
            .providers
            .get(platform)
            .ok_or_else(|| {
                AuthError::Configuration(format!("Provider {platform} not configured"))
            })?;

        let redirect_uri =
            callback.map_or_else(|| self.default_callback(platform), ToString::to_string);
        let session_key = uuid::Uuid::new_v4().simple().to_string();
        let scopes = runtime_provider.settings.scopes.join(" ");

        let mut url = url::Url::parse(&runtime_provider.auth_url)
            .map_err(|e| AuthError::Configuration(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", &runtime_provider.client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes)
            .append_pair("state", &session_key);

        let code_verifier = if runtime_provider.settings.use_pkce {
            let verifier = generate_code_verifier();
            url.query_pairs_mut()
                .append_pair("code_challenge", &code_challenge(&verifier))
                .append_pair("code_challenge_method", "S256");
            Some(verifier)
        } else {
            None
        };

        for (key, value) in &runtime_provider.settings.extra_auth_params {
            url.query_pairs_mut().append_pair(key, value);
        }

        self.pending.insert(
            &session_key,
            PendingAuthorization::new(platform, redirect_uri, code_verifier),
        );
        LoggingHelper::log_oauth_url_built(platform, &scopes);

        Ok(AuthorizationRequest {
            auth_url: url.to_string(),
            session_key,
        })
    }

    /// Exchange an authorization code for an authenticated API client
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The platform is not configured
    /// - The session key is unknown for a PKCE platform
    /// - The token endpoint is unreachable or rejects the code
    pub async fn exchange_code(
        &self,
        platform: &str,
        session_key: &str,
        code: &str,
    ) -> Result<AuthClient, AuthError> {
        let runtime_provider = self
            .providers
            .get(platform)
            .ok_or_else(|| {
                AuthError::Configuration(format!("Provider {platform} not configured"))
            })?;

        let (redirect_uri, code_verifier) = match self.pending.take_for(session_key, platform) {
            Some(pending) => (pending.redirect_uri, pending.code_verifier),
            None if runtime_provider.settings.use_pkce => {
                return Err(AuthError::UnknownSession(platform.to_string()));
            }
            None => (self.default_callback(platform), None),
        };

        let mut params: Vec<(&str, String)> = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("redirect_uri", redirect_uri),
            ("client_id", runtime_provider.client_id.clone()),
        ];
        if let Some(verifier) = code_verifier {
            params.push(("code_verifier", verifier));
        }

        let mut request = self
            .http_client
            .post(&runtime_provider.token_url)
            .header(ACCEPT, "application/json");
        match (runtime_provider.settings.token_auth, &runtime_provider.client_secret) {
            (TokenAuthMethod::ClientSecretBasic, Some(secret)) => {
                request = request.basic_auth(&runtime_provider.client_id, Some(secret));
            }
            (TokenAuthMethod::ClientSecretPost, Some(secret)) => {
                params.push(("client_secret", secret.clone()));
            }
            (_, None) => {}
        }

        LoggingHelper::log_token_exchange_start(platform);
        let response = request
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AuthError::Rejected(format!("unreadable token response: {e}")))?;

        let token = parse_token_response(status, body)?;
        LoggingHelper::log_token_exchange_summary(
            platform,
            token.token_type.as_deref().unwrap_or("bearer"),
            token.expires_in,
            token.scope.as_deref(),
        );

        Ok(AuthClient::new(
            platform,
            token.access_token,
            runtime_provider.api_base.clone(),
            self.http_client.clone(),
        ))
    }
}

/// Interpret a token endpoint response
///
/// Some providers (GitHub) answer 200 with an `error` member for bad codes.
fn parse_token_response(
    status: reqwest::StatusCode,
    body: serde_json::Value,
) -> Result<TokenResponse, AuthError> {
    if let Some(error) = body.get("error").and_then(serde_json::Value::as_str) {
        return Err(AuthError::Rejected(error.to_string()));
    }
    if status.is_server_error() {
        return Err(AuthError::Network(format!("token endpoint returned {status}")));
    }
    if !status.is_success() {
        return Err(AuthError::Rejected(format!("token endpoint returned {status}")));
    }
    serde_json::from_value(body)
        .map_err(|e| AuthError::Rejected(format!("malformed token response: {e}")))
}
