//! Mock objects and fake implementations for testing
//!
//! Every mock counts its calls so tests can assert how often a collaborator
//! was reached, not just what came back.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::json;

use super::constants::{TEST_ACCESS_TOKEN, TEST_API_BASE};
use crate::handshake::{AuthUrlSource, PopupGeometry, PopupOpener};
use crate::issuance::{CredentialIssuer, IssuedCredential, Signer, StampRequest};
use crate::models::{AuthError, ExternalRecord, FetchError, HandshakeError, IssuanceError};
use crate::oauth::{AuthClient, TokenExchange};
use crate::providers::ExternalDataFetcher;

/// Token exchange that always succeeds or always rejects
pub struct MockTokenExchange {
    platform: String,
    result: Result<(), AuthError>,
    calls: AtomicUsize,
}

impl MockTokenExchange {
    #[must_use]
    pub fn succeeding(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            result: Ok(()),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn rejecting(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            result: Err(AuthError::Rejected("bad_verification_code".to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of exchanges performed so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenExchange for MockTokenExchange {
    async fn exchange(&self, _session_key: &str, _code: &str) -> Result<AuthClient, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map(|()| {
            AuthClient::new(
                self.platform.clone(),
                TEST_ACCESS_TOKEN,
                TEST_API_BASE,
                reqwest::Client::new(),
            )
        })
    }
}

/// Fetcher returning a scripted result
pub struct MockFetcher {
    result: Result<ExternalRecord, FetchError>,
    calls: AtomicUsize,
}

impl MockFetcher {
    #[must_use]
    pub fn returning(result: Result<ExternalRecord, FetchError>) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fetcher reporting `username` with `metric`
    #[must_use]
    pub fn record(username: &str, metric: u64) -> Self {
        Self::returning(Ok(ExternalRecord::new(Some(username.to_string()), Some(metric))))
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExternalDataFetcher for MockFetcher {
    async fn fetch(&self, _client: &AuthClient) -> Result<ExternalRecord, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Authorization URL source with a fixed answer
pub struct MockAuthUrlSource {
    auth_url: Option<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockAuthUrlSource {
    #[must_use]
    pub fn returning(auth_url: &str) -> Self {
        Self {
            auth_url: Some(auth_url.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Source that fails like an unreachable procedure service
    #[must_use]
    pub fn failing() -> Self {
        Self {
            auth_url: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(provider, callback)` pairs requested so far
    #[must_use]
    pub fn requests(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl AuthUrlSource for MockAuthUrlSource {
    async fn generate_auth_url(
        &self,
        provider: &str,
        callback: &str,
    ) -> Result<String, HandshakeError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((provider.to_string(), callback.to_string()));
        self.auth_url
            .clone()
            .ok_or_else(|| HandshakeError::AuthUrl("connection refused".to_string()))
    }
}

/// Popup opener that records what it was asked to open
#[derive(Default)]
pub struct RecordingPopupOpener {
    opened: Mutex<Vec<(String, PopupGeometry)>>,
}

impl RecordingPopupOpener {
    #[must_use]
    pub fn opened(&self) -> Vec<(String, PopupGeometry)> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl PopupOpener for RecordingPopupOpener {
    fn open(&self, url: &str, geometry: &PopupGeometry) -> Result<(), HandshakeError> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((url.to_string(), *geometry));
        Ok(())
    }
}

/// Issuer that issues a fixed credential or always declines
pub struct MockCredentialIssuer {
    issue: bool,
    calls: AtomicUsize,
    last_request: Mutex<Option<StampRequest>>,
}

impl MockCredentialIssuer {
    #[must_use]
    pub fn issuing() -> Self {
        Self {
            issue: true,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            issue: false,
            ..Self::issuing()
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn last_request(&self) -> Option<StampRequest> {
        self.last_request.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl CredentialIssuer for MockCredentialIssuer {
    async fn fetch_verifiable_credential(
        &self,
        request: &StampRequest,
        signer: &dyn Signer,
    ) -> Result<IssuedCredential, IssuanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(PoisonError::into_inner) = Some(request.clone());

        if !self.issue {
            return Err(IssuanceError::InvalidResponse("Unable to verify proofs".to_string()));
        }
        let signature = signer.sign_message("mock challenge").await?;
        Ok(IssuedCredential {
            credential: json!({
                "type": ["VerifiableCredential"],
                "credentialSubject": {
                    "id": format!("did:pkh:eip155:1:{}", request.address),
                    "provider": request.provider_type,
                },
                "proof": {"jws": signature},
            }),
            record: None,
        })
    }
}

/// Signer producing a deterministic signature over the message
pub struct MockSigner {
    address: String,
}

impl MockSigner {
    #[must_use]
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
        }
    }
}

#[async_trait]
impl Signer for MockSigner {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn sign_message(&self, message: &str) -> Result<String, IssuanceError> {
        Ok(format!("signed:{}:{message}", self.address))
    }
}
