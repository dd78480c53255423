//! Verification providers
//!
//! Every provider implements [`VerificationProvider`]. Expected failures
//! (rejected code, failed fetch, missing fields, unmet tier) never escape
//! `verify`; they all resolve to `valid: false`.

pub mod account;
pub mod fetch;
pub mod github;
pub mod threshold;
pub mod twitter;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{ExternalRecord, RequestPayload, VerificationError, VerifiedPayload};
use crate::oauth::{AuthClientCache, OAuthConfig, PlatformTokenExchange, VerificationContext};

pub use account::AccountProvider;
pub use fetch::ExternalDataFetcher;
pub use threshold::{Comparator, Threshold, ThresholdProvider, Tier};

/// Uniform contract for all providers
#[async_trait]
pub trait VerificationProvider: Send + Sync {
    /// Identifier of the credential type this provider verifies
    fn id(&self) -> &str;

    /// Verify the proofs in `payload`
    ///
    /// State shared with other providers of the same request lives only in `context`.
    async fn verify(
        &self,
        payload: &RequestPayload,
        context: &mut VerificationContext,
    ) -> VerifiedPayload;
}

/// Resolve the client, then fetch. Resolution always completes before the fetch starts.
pub(crate) async fn fetch_external_record(
    clients: &AuthClientCache,
    fetcher: &dyn ExternalDataFetcher,
    payload: &RequestPayload,
    context: &mut VerificationContext,
) -> Result<ExternalRecord, VerificationError> {
    let proofs = &payload.proofs;
    let client = clients
        .get_client(&proofs.session_key, &proofs.code, context)
        .await?;
    Ok(fetcher.fetch(&client).await?)
}

/// Providers available to the service, keyed by identifier
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn VerificationProvider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register providers for every platform configured in `config`
    #[must_use]
    pub fn from_oauth_config(config: &Arc<OAuthConfig>) -> Self {
        let mut registry = Self::new();

        for platform in config.platforms() {
            let exchange = Arc::new(PlatformTokenExchange::new(Arc::clone(config), platform));
            let clients = Arc::new(AuthClientCache::new(platform, exchange));
            let providers = match platform {
                "twitter" => twitter::providers(&clients),
                "github" => github::providers(&clients),
                other => {
                    log::warn!("No verification providers known for platform {other}");
                    continue;
                }
            };
            for provider in providers {
                registry.register(provider);
            }
        }

        log::info!("Registered verification providers: {:?}", registry.ids());
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn VerificationProvider>) {
        self.providers.insert(provider.id().to_string(), provider);
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    /// Registered identifiers, sorted
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Verify several credential types for one request, sharing one context
    ///
    /// Unknown types resolve to invalid.
    pub async fn verify_all(
        &self,
        types: &[String],
        payload: &RequestPayload,
    ) -> BTreeMap<String, VerifiedPayload> {
        let mut context = VerificationContext::new();
        let mut results = BTreeMap::new();

        for provider_type in types {
            let result = match self.providers.get(provider_type) {
                Some(provider) => provider.verify(payload, &mut context).await,
                None => {
                    log::warn!("Verification requested for unknown provider {provider_type}");
                    VerifiedPayload::invalid()
                }
            };
            results.insert(provider_type.clone(), result);
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock::{MockFetcher, MockTokenExchange};
    use crate::testing::TestFixtures;

    fn twitter_registry(exchange: &Arc<MockTokenExchange>) -> ProviderRegistry {
        let clients = Arc::new(AuthClientCache::new("twitter", exchange.clone()));
        let fetcher: Arc<dyn ExternalDataFetcher> = Arc::new(MockFetcher::record("DpoppDev", 1200));

        let mut registry = ProviderRegistry::new();
        for tier in twitter::FOLLOWER_TIERS {
            registry.register(Arc::new(ThresholdProvider::new(
                tier,
                "followerCount",
                Arc::clone(&clients),
                Arc::clone(&fetcher),
            )));
        }
        registry
    }

    #[tokio::test]
    async fn test_verify_all_shares_one_token_exchange() {
        let exchange = Arc::new(MockTokenExchange::succeeding("twitter"));
        let registry = twitter_registry(&exchange);
        let types: Vec<String> = registry.ids().into_iter().map(ToString::to_string).collect();

        let results = registry.verify_all(&types, &TestFixtures::payload()).await;

        assert_eq!(exchange.calls(), 1);
        assert!(results["TwitterFollowerGT100"].is_valid());
        assert!(results["TwitterFollowerGT500"].is_valid());
        assert!(results["TwitterFollowerGTE1000"].is_valid());
        assert!(!results["TwitterFollowerGT5000"].is_valid());
    }

    #[tokio::test]
    async fn test_verify_all_unknown_type_is_invalid() {
        let exchange = Arc::new(MockTokenExchange::succeeding("twitter"));
        let registry = twitter_registry(&exchange);

        let results = registry
            .verify_all(&["Myspace".to_string()], &TestFixtures::payload())
            .await;

        assert!(!results["Myspace"].is_valid());
        assert_eq!(exchange.calls(), 0);
    }

    #[test]
    fn test_registry_from_config_without_platforms_is_empty() {
        let config = Arc::new(OAuthConfig::new("http://localhost:8080"));
        assert!(ProviderRegistry::from_oauth_config(&config).ids().is_empty());
    }
}
