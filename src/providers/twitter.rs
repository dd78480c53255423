//! Twitter account and follower/tweet tier providers

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{ExternalRecord, FetchError};
use crate::oauth::{AuthClient, AuthClientCache};
use crate::providers::fetch::{get_json, ExternalDataFetcher};
use crate::providers::threshold::{Threshold, ThresholdProvider, Tier};
use crate::providers::{AccountProvider, VerificationProvider};

const USERS_ME_PATH: &str = "/2/users/me?user.fields=public_metrics";

pub const FOLLOWER_TIERS: [Tier; 4] = [
    Tier::new("TwitterFollowerGT100", Threshold::greater_than(100, "gt100")),
    Tier::new("TwitterFollowerGT500", Threshold::greater_than(500, "gt500")),
    Tier::new("TwitterFollowerGTE1000", Threshold::at_least(1000, "gte1000")),
    Tier::new("TwitterFollowerGT5000", Threshold::greater_than(5000, "gt5000")),
];

pub const TWEET_TIERS: [Tier; 1] = [Tier::new(
    "TwitterTweetGT10",
    Threshold::greater_than(10, "gt10"),
)];

#[derive(Debug, Deserialize)]
struct UsersMeResponse {
    data: Option<TwitterUser>,
}

#[derive(Debug, Deserialize)]
struct TwitterUser {
    username: Option<String>,
    public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Deserialize)]
struct PublicMetrics {
    followers_count: Option<u64>,
    tweet_count: Option<u64>,
}

/// Which public metric the fetcher reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwitterMetric {
    Followers,
    Tweets,
}

/// Reads the authenticated user's profile and one public metric
pub struct TwitterMetricsFetcher {
    metric: TwitterMetric,
}

impl TwitterMetricsFetcher {
    #[must_use]
    pub fn new(metric: TwitterMetric) -> Self {
        Self { metric }
    }

    fn normalize(&self, response: UsersMeResponse) -> ExternalRecord {
        let Some(user) = response.data else {
            return ExternalRecord::default();
        };
        let metric = user.public_metrics.and_then(|metrics| match self.metric {
            TwitterMetric::Followers => metrics.followers_count,
            TwitterMetric::Tweets => metrics.tweet_count,
        });
        ExternalRecord::new(user.username, metric)
    }
}

#[async_trait]
impl ExternalDataFetcher for TwitterMetricsFetcher {
    async fn fetch(&self, client: &AuthClient) -> Result<ExternalRecord, FetchError> {
        let response: UsersMeResponse = get_json(client, USERS_ME_PATH).await?;
        Ok(self.normalize(response))
    }
}

/// All Twitter providers sharing one client cache
#[must_use]
pub fn providers(clients: &Arc<AuthClientCache>) -> Vec<Arc<dyn VerificationProvider>> {
    let followers: Arc<dyn ExternalDataFetcher> =
        Arc::new(TwitterMetricsFetcher::new(TwitterMetric::Followers));
    let tweets: Arc<dyn ExternalDataFetcher> =
        Arc::new(TwitterMetricsFetcher::new(TwitterMetric::Tweets));

    let mut providers: Vec<Arc<dyn VerificationProvider>> = vec![Arc::new(AccountProvider::new(
        "Twitter",
        Arc::clone(clients),
        Arc::clone(&followers),
    ))];
    providers.extend(FOLLOWER_TIERS.into_iter().map(|tier| {
        Arc::new(ThresholdProvider::new(
            tier,
            "followerCount",
            Arc::clone(clients),
            Arc::clone(&followers),
        )) as Arc<dyn VerificationProvider>
    }));
    providers.extend(TWEET_TIERS.into_iter().map(|tier| {
        Arc::new(ThresholdProvider::new(
            tier,
            "tweetCount",
            Arc::clone(clients),
            Arc::clone(&tweets),
        )) as Arc<dyn VerificationProvider>
    }));
    providers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock::MockTokenExchange;

    fn parse(json: &str) -> UsersMeResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_normalize_follower_count() {
        let response = parse(
            r#"{"data":{"id":"1","name":"Dev","username":"DpoppDev",
                "public_metrics":{"followers_count":150,"following_count":3,
                "tweet_count":42,"listed_count":0}}}"#,
        );
        let record = TwitterMetricsFetcher::new(TwitterMetric::Followers).normalize(response);
        assert_eq!(record, ExternalRecord::new(Some("DpoppDev".to_string()), Some(150)));
    }

    #[test]
    fn test_normalize_tweet_count() {
        let response = parse(
            r#"{"data":{"username":"DpoppDev",
                "public_metrics":{"followers_count":150,"tweet_count":42}}}"#,
        );
        let record = TwitterMetricsFetcher::new(TwitterMetric::Tweets).normalize(response);
        assert_eq!(record.metric, Some(42));
    }

    #[test]
    fn test_error_body_normalizes_to_empty_record() {
        let response = parse(r#"{"errors":[{"title":"Forbidden"}]}"#);
        let record = TwitterMetricsFetcher::new(TwitterMetric::Followers).normalize(response);
        assert_eq!(record, ExternalRecord::default());
    }

    #[test]
    fn test_tier_table() {
        let labels: Vec<_> = FOLLOWER_TIERS.iter().map(|t| t.threshold.label()).collect();
        assert_eq!(labels, vec!["gt100", "gt500", "gte1000", "gt5000"]);
        assert!(FOLLOWER_TIERS[2].threshold.is_met(1000));
        assert!(!FOLLOWER_TIERS[3].threshold.is_met(5000));
    }

    #[test]
    fn test_provider_ids() {
        let clients = Arc::new(AuthClientCache::new(
            "twitter",
            Arc::new(MockTokenExchange::succeeding("twitter")),
        ));
        let ids: Vec<String> = providers(&clients).iter().map(|p| p.id().to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "Twitter",
                "TwitterFollowerGT100",
                "TwitterFollowerGT500",
                "TwitterFollowerGTE1000",
                "TwitterFollowerGT5000",
                "TwitterTweetGT10"
            ]
        );
    }
}
