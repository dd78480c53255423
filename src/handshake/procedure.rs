//! Client for the authorization-URL endpoint

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::HandshakeError;

#[derive(Debug, Serialize)]
struct GenerateAuthUrlRequest<'a> {
    callback: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAuthUrlResponse {
    auth_url: String,
}

/// Source of provider authorization URLs
#[async_trait]
pub trait AuthUrlSource: Send + Sync {
    /// Ask for an authorization URL whose redirect lands on `callback`
    ///
    /// # Errors
    ///
    /// Returns `HandshakeError::AuthUrl` on transport failure, a non-success
    /// status, or a body without `authUrl`.
    async fn generate_auth_url(
        &self,
        provider: &str,
        callback: &str,
    ) -> Result<String, HandshakeError>;
}

/// `POST {base}/{provider}/generateAuthUrl` over HTTP
pub struct ProcedureClient {
    base_url: String,
    http: reqwest::Client,
}

impl ProcedureClient {
    #[must_use]
    pub fn new(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    #[must_use]
    pub fn endpoint(&self, provider: &str) -> String {
        format!("{}/{provider}/generateAuthUrl", self.base_url)
    }
}

#[async_trait]
impl AuthUrlSource for ProcedureClient {
    async fn generate_auth_url(
        &self,
        provider: &str,
        callback: &str,
    ) -> Result<String, HandshakeError> {
        let response = self
            .http
            .post(self.endpoint(provider))
            .json(&GenerateAuthUrlRequest { callback })
            .send()
            .await
            .map_err(|e| HandshakeError::AuthUrl(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HandshakeError::AuthUrl(format!("status {status}")));
        }

        let body: GenerateAuthUrlResponse = response
            .json()
            .await
            .map_err(|e| HandshakeError::AuthUrl(format!("malformed response: {e}")))?;
        Ok(body.auth_url)
    }
}
