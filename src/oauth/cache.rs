//! Per-request memoization of authenticated clients
//!
//! A [`VerificationContext`] lives for exactly one verification request and is
//! dropped with it. Only [`AuthClientCache`] reads or writes its entries.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::AuthError;
use crate::oauth::client::{AuthClient, TokenExchange};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    platform: String,
    session_key: String,
}

/// Request-scoped cache shared by every provider invoked in one request
#[derive(Debug, Default)]
pub struct VerificationContext {
    clients: HashMap<ClientKey, Arc<AuthClient>>,
}

impl VerificationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clients resolved so far in this request
    #[must_use]
    pub fn cached_clients(&self) -> usize {
        self.clients.len()
    }
}

/// Resolves the authenticated client for one platform
pub struct AuthClientCache {
    platform: String,
    exchange: Arc<dyn TokenExchange>,
}

impl AuthClientCache {
    #[must_use]
    pub fn new(platform: impl Into<String>, exchange: Arc<dyn TokenExchange>) -> Self {
        Self {
            platform: platform.into(),
            exchange,
        }
    }

    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Return the client cached for `session_key`, exchanging `code` on first use
    ///
    /// # Errors
    ///
    /// Returns the exchange failure unchanged; nothing is cached and nothing is retried.
    pub async fn get_client(
        &self,
        session_key: &str,
        code: &str,
        context: &mut VerificationContext,
    ) -> Result<Arc<AuthClient>, AuthError> {
        let key = ClientKey {
            platform: self.platform.clone(),
            session_key: session_key.to_string(),
        };

        if let Some(client) = context.clients.get(&key) {
            log::debug!("Reusing {} client for session", self.platform);
            return Ok(Arc::clone(client));
        }

        let client = Arc::new(self.exchange.exchange(session_key, code).await?);
        context.clients.insert(key, Arc::clone(&client));
        Ok(client)
    }
}
