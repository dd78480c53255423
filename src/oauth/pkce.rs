//! PKCE helpers and the store of in-flight authorization attempts

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// How long an authorization attempt may wait for its code
pub const PENDING_AUTHORIZATION_TTL: Duration = Duration::from_secs(600);

/// Generate a random code verifier (43 base64url characters)
#[must_use]
pub fn generate_code_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 code challenge for a verifier
#[must_use]
pub fn code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(hash)
}

/// Everything the token exchange needs to know about an authorization attempt
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub platform: String,
    pub redirect_uri: String,
    pub code_verifier: Option<String>,
    created_at: Instant,
}

impl PendingAuthorization {
    #[must_use]
    pub fn new(platform: &str, redirect_uri: String, code_verifier: Option<String>) -> Self {
        Self {
            platform: platform.to_string(),
            redirect_uri,
            code_verifier,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Authorization attempts keyed by session key (the OAuth `state`)
#[derive(Debug)]
pub struct PendingAuthorizations {
    entries: Mutex<HashMap<String, PendingAuthorization>>,
    ttl: Duration,
}

impl Default for PendingAuthorizations {
    fn default() -> Self {
        Self::with_ttl(PENDING_AUTHORIZATION_TTL)
    }
}

impl PendingAuthorizations {
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Remember an attempt, dropping any that have expired
    pub fn insert(&self, session_key: &str, pending: PendingAuthorization) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| !entry.is_expired(self.ttl));
        entries.insert(session_key.to_string(), pending);
    }

    /// Consume the attempt for `session_key` if it belongs to `platform` and is still fresh
    pub fn take_for(&self, session_key: &str, platform: &str) -> Option<PendingAuthorization> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.get(session_key)?.platform != platform {
            return None;
        }
        entries
            .remove(session_key)
            .filter(|entry| !entry.is_expired(self.ttl))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
