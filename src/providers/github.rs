//! GitHub account and follower tier providers

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{ExternalRecord, FetchError};
use crate::oauth::{AuthClient, AuthClientCache};
use crate::providers::fetch::{get_json, ExternalDataFetcher};
use crate::providers::threshold::{Threshold, ThresholdProvider, Tier};
use crate::providers::{AccountProvider, VerificationProvider};

pub const FOLLOWER_TIERS: [Tier; 2] = [
    Tier::new("GithubFollowerGT10", Threshold::greater_than(10, "gt10")),
    Tier::new("GithubFollowerGT50", Threshold::greater_than(50, "gt50")),
];

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: Option<String>,
    followers: Option<u64>,
}

/// Reads `/user`: login and follower count
pub struct GithubUserFetcher;

#[async_trait]
impl ExternalDataFetcher for GithubUserFetcher {
    async fn fetch(&self, client: &AuthClient) -> Result<ExternalRecord, FetchError> {
        let user: GithubUser = get_json(client, "/user").await?;
        Ok(ExternalRecord::new(user.login, user.followers))
    }
}

/// All GitHub providers sharing one client cache
#[must_use]
pub fn providers(clients: &Arc<AuthClientCache>) -> Vec<Arc<dyn VerificationProvider>> {
    let fetcher: Arc<dyn ExternalDataFetcher> = Arc::new(GithubUserFetcher);

    let mut providers: Vec<Arc<dyn VerificationProvider>> = vec![Arc::new(AccountProvider::new(
        "Github",
        Arc::clone(clients),
        Arc::clone(&fetcher),
    ))];
    for tier in FOLLOWER_TIERS {
        providers.push(Arc::new(ThresholdProvider::new(
            tier,
            "followerCount",
            Arc::clone(clients),
            Arc::clone(&fetcher),
        )));
    }
    providers
}
