#![warn(clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the stampgate application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod handlers;
pub mod handshake;
pub mod issuance;
pub mod models;
pub mod oauth;
pub mod providers;
pub mod settings;
pub mod utils;

// Make test utilities available for both unit tests and integration tests
pub mod testing;

/// Re-export commonly used items
pub use handlers::configure_services;
pub use handshake::{AuthorizationHandshake, HandshakeOutcome, HandshakeServices, RedirectHub};
pub use models::{RequestPayload, VerifiedPayload};
pub use oauth::{OAuthConfig, VerificationContext};
pub use providers::{ProviderRegistry, VerificationProvider};
pub use settings::StampSettings;
