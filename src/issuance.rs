//! Credential issuance and stamp storage
//!
//! Issuance is a challenge/response exchange with the issuer: request a
//! challenge for `{type, address}`, have the wallet signer sign it, then
//! submit the signed challenge together with the OAuth proofs. The issuer
//! runs the verification provider and answers with a credential when the
//! proofs hold.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{IssuanceError, Proofs};

/// Issuance request for one provider type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampRequest {
    #[serde(rename = "type")]
    pub provider_type: String,
    pub version: String,
    pub address: String,
    pub proofs: Proofs,
}

/// Wallet-side signer
#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> String;

    /// # Errors
    ///
    /// Returns `IssuanceError::Signer` if the wallet refuses to sign.
    async fn sign_message(&self, message: &str) -> Result<String, IssuanceError>;
}

/// Issuer response carrying the credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedCredential {
    pub credential: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Value>,
}

#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// # Errors
    ///
    /// Returns an `IssuanceError` when any step of the exchange fails or the
    /// issuer declines to issue.
    async fn fetch_verifiable_credential(
        &self,
        request: &StampRequest,
        signer: &dyn Signer,
    ) -> Result<IssuedCredential, IssuanceError>;
}

#[derive(Debug, Serialize)]
struct ChallengeRequest<'a> {
    payload: ChallengePayload<'a>,
}

#[derive(Debug, Serialize)]
struct ChallengePayload<'a> {
    #[serde(rename = "type")]
    provider_type: &'a str,
    address: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChallengeResponse {
    credential: ChallengeCredential,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChallengeCredential {
    credential_subject: ChallengeSubject,
}

#[derive(Debug, Deserialize)]
struct ChallengeSubject {
    challenge: String,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    payload: &'a StampRequest,
    challenge: &'a str,
    signature: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    credential: Option<Value>,
    record: Option<Value>,
    error: Option<String>,
}

/// Issuer reached over HTTP at `{issuer_url}v{version}/...`
pub struct HttpCredentialIssuer {
    issuer_url: String,
    http: reqwest::Client,
}

impl HttpCredentialIssuer {
    #[must_use]
    pub fn new(issuer_url: &str, http: reqwest::Client) -> Self {
        Self {
            issuer_url: issuer_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    #[must_use]
    pub fn endpoint(&self, version: &str, operation: &str) -> String {
        format!("{}/v{version}/{operation}", self.issuer_url)
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned + Send>(
        &self,
        url: String,
        body: &B,
    ) -> Result<R, IssuanceError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| IssuanceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IssuanceError::Status(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| IssuanceError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CredentialIssuer for HttpCredentialIssuer {
    async fn fetch_verifiable_credential(
        &self,
        request: &StampRequest,
        signer: &dyn Signer,
    ) -> Result<IssuedCredential, IssuanceError> {
        let challenge: ChallengeResponse = self
            .post(
                self.endpoint(&request.version, "challenge"),
                &ChallengeRequest {
                    payload: ChallengePayload {
                        provider_type: &request.provider_type,
                        address: &request.address,
                    },
                },
            )
            .await?;
        let challenge = challenge.credential.credential_subject.challenge;

        let signature = signer.sign_message(&challenge).await?;

        let verified: VerifyResponse = self
            .post(
                self.endpoint(&request.version, "verify"),
                &VerifyRequest {
                    payload: request,
                    challenge: &challenge,
                    signature: &signature,
                },
            )
            .await?;

        match (verified.credential, verified.error) {
            (_, Some(error)) => Err(IssuanceError::InvalidResponse(error)),
            (Some(credential), None) => Ok(IssuedCredential {
                credential,
                record: verified.record,
            }),
            (None, None) => Err(IssuanceError::InvalidResponse("no credential issued".to_string())),
        }
    }
}

/// A stored credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamp {
    pub provider: String,
    pub credential: Value,
    pub issued_at: DateTime<Utc>,
}

impl Stamp {
    #[must_use]
    pub fn new(provider: impl Into<String>, credential: Value) -> Self {
        Self {
            provider: provider.into(),
            credential,
            issued_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait StampStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `IssuanceError::Store` if the stamp cannot be persisted.
    async fn add_stamp(&self, stamp: Stamp) -> Result<(), IssuanceError>;
}

/// In-process stamp store; a newer stamp replaces the same provider's older one
#[derive(Default)]
pub struct MemoryStampStore {
    stamps: Mutex<Vec<Stamp>>,
}

impl MemoryStampStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stamps(&self) -> Vec<Stamp> {
        self.stamps.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn get(&self, provider: &str) -> Option<Stamp> {
        self.stamps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|stamp| stamp.provider == provider)
            .cloned()
    }
}

#[async_trait]
impl StampStore for MemoryStampStore {
    async fn add_stamp(&self, stamp: Stamp) -> Result<(), IssuanceError> {
        let mut stamps = self.stamps.lock().unwrap_or_else(PoisonError::into_inner);
        stamps.retain(|existing| existing.provider != stamp.provider);
        stamps.push(stamp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stamp_request_wire_shape() {
        let request = StampRequest {
            provider_type: "Github".to_string(),
            version: "0.0.0".to_string(),
            address: "0xabc".to_string(),
            proofs: Proofs::new("state-1", "code-1"),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "Github",
                "version": "0.0.0",
                "address": "0xabc",
                "proofs": {"sessionKey": "state-1", "code": "code-1"}
            })
        );
    }

    #[test]
    fn test_issuer_endpoints() {
        let issuer =
            HttpCredentialIssuer::new("http://localhost:8081/api/", reqwest::Client::new());
        assert_eq!(
            issuer.endpoint("0.0.0", "challenge"),
            "http://localhost:8081/api/v0.0.0/challenge"
        );
        assert_eq!(
            issuer.endpoint("0.0.0", "verify"),
            "http://localhost:8081/api/v0.0.0/verify"
        );
    }

    #[test]
    fn test_challenge_response_shape() {
        let body =
            r#"{"credential":{"credentialSubject":{"challenge":"sign me","address":"0xabc"}}}"#;
        let response: ChallengeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.credential.credential_subject.challenge, "sign me");
    }

    #[tokio::test]
    async fn test_memory_store_replaces_same_provider() {
        let store = MemoryStampStore::new();
        store.add_stamp(Stamp::new("Github", json!({"n": 1}))).await.unwrap();
        store.add_stamp(Stamp::new("Twitter", json!({"n": 2}))).await.unwrap();
        store.add_stamp(Stamp::new("Github", json!({"n": 3}))).await.unwrap();

        assert_eq!(store.stamps().len(), 2);
        assert_eq!(store.get("Github").unwrap().credential, json!({"n": 3}));
    }
}
