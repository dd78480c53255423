//! Account ownership provider: valid whenever the platform reports a username

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{RequestPayload, VerificationError, VerifiedPayload};
use crate::oauth::{AuthClientCache, VerificationContext};
use crate::providers::fetch::ExternalDataFetcher;
use crate::providers::{fetch_external_record, VerificationProvider};
use crate::utils::logging::LoggingHelper;

pub struct AccountProvider {
    id: &'static str,
    clients: Arc<AuthClientCache>,
    fetcher: Arc<dyn ExternalDataFetcher>,
}

impl AccountProvider {
    #[must_use]
    pub fn new(
        id: &'static str,
        clients: Arc<AuthClientCache>,
        fetcher: Arc<dyn ExternalDataFetcher>,
    ) -> Self {
        Self { id, clients, fetcher }
    }
}

#[async_trait]
impl VerificationProvider for AccountProvider {
    fn id(&self) -> &str {
        self.id
    }

    async fn verify(
        &self,
        payload: &RequestPayload,
        context: &mut VerificationContext,
    ) -> VerifiedPayload {
        let outcome = fetch_external_record(&self.clients, self.fetcher.as_ref(), payload, context)
            .await
            .and_then(|record| {
                record
                    .username()
                    .map(ToString::to_string)
                    .ok_or(VerificationError::DataShape("username"))
            });

        match outcome {
            Ok(username) => {
                LoggingHelper::log_verification_success(self.id);
                VerifiedPayload::verified(BTreeMap::from([("id".to_string(), username)]))
            }
            Err(e) => {
                LoggingHelper::log_verification_failure(self.id, &payload.proofs.session_key, &e);
                VerifiedPayload::invalid()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExternalRecord, FetchError};
    use crate::testing::mock::{MockFetcher, MockTokenExchange};
    use crate::testing::TestFixtures;

    fn provider(fetcher: MockFetcher) -> AccountProvider {
        let clients = Arc::new(AuthClientCache::new(
            "github",
            Arc::new(MockTokenExchange::succeeding("github")),
        ));
        AccountProvider::new("Github", clients, Arc::new(fetcher))
    }

    #[tokio::test]
    async fn test_username_present_is_valid() {
        let payload = provider(MockFetcher::record("octocat", 0))
            .verify(&TestFixtures::payload(), &mut VerificationContext::new())
            .await;

        assert!(payload.is_valid());
        assert_eq!(payload.record().unwrap()["id"], "octocat");
    }

    #[tokio::test]
    async fn test_missing_username_is_invalid() {
        let fetcher = MockFetcher::returning(Ok(ExternalRecord::default()));
        let payload = provider(fetcher)
            .verify(&TestFixtures::payload(), &mut VerificationContext::new())
            .await;

        assert!(!payload.is_valid());
    }

    #[tokio::test]
    async fn test_unauthorized_fetch_is_invalid() {
        let fetcher = MockFetcher::returning(Err(FetchError::Unauthorized));
        let payload = provider(fetcher)
            .verify(&TestFixtures::payload(), &mut VerificationContext::new())
            .await;

        assert!(!payload.is_valid());
    }
}
