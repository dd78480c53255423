//! Test fixtures providing pre-built test objects

use crate::models::RequestPayload;
use crate::oauth::OAuthConfig;
use crate::settings::{ProviderSettings, StampSettings};

use super::constants::{TEST_CODE, TEST_SESSION_KEY};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Payload carrying the standard session key and code
    #[must_use]
    pub fn payload() -> RequestPayload {
        RequestPayload::new(TEST_SESSION_KEY, TEST_CODE)
    }

    /// Provider settings with inline credentials and endpoints filled in
    #[must_use]
    pub fn provider_settings(name: &str) -> ProviderSettings {
        let mut provider = ProviderSettings {
            name: name.to_string(),
            client_id: Some(format!("{name}-client-id")),
            client_secret: Some(format!("{name}-client-secret")),
            ..ProviderSettings::default()
        };
        provider.apply_known_defaults();
        provider
    }

    /// Settings with configured Twitter and GitHub providers
    #[must_use]
    pub fn settings() -> StampSettings {
        StampSettings {
            providers: vec![Self::provider_settings("twitter"), Self::provider_settings("github")],
            ..StampSettings::default()
        }
    }

    /// OAuth configuration built from [`TestFixtures::settings`]
    #[must_use]
    pub fn oauth_config() -> OAuthConfig {
        OAuthConfig::from_settings(&Self::settings())
    }
}
