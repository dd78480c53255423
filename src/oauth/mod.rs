//! OAuth client module
//!
//! This module provides the client side of the authorization-code flow:
//! authorization URL building, PKCE, code exchange and the per-request
//! client cache used by verification providers.

pub mod cache;
pub mod client;
pub mod config;
pub mod pkce;

pub use cache::{AuthClientCache, VerificationContext};
pub use client::{AuthClient, PlatformTokenExchange, TokenExchange};
pub use config::{AuthorizationRequest, OAuthConfig, RuntimeProvider};
pub use pkce::{PendingAuthorization, PendingAuthorizations};

use serde::Deserialize;

/// Query parameters the platform appends when redirecting back to us
#[derive(Deserialize, Debug)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}
