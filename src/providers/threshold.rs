//! Threshold-based providers
//!
//! Every tier is a value: the same verification routine runs for all of
//! them, parameterized by an immutable [`Threshold`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{RequestPayload, VerificationError, VerifiedPayload};
use crate::oauth::{AuthClientCache, VerificationContext};
use crate::providers::fetch::ExternalDataFetcher;
use crate::providers::{fetch_external_record, VerificationProvider};
use crate::utils::logging::LoggingHelper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    GreaterThan,
    GreaterThanOrEqual,
}

impl Comparator {
    #[must_use]
    pub fn holds(self, metric: u64, boundary: u64) -> bool {
        match self {
            Comparator::GreaterThan => metric > boundary,
            Comparator::GreaterThanOrEqual => metric >= boundary,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::GreaterThan => write!(f, ">"),
            Comparator::GreaterThanOrEqual => write!(f, ">="),
        }
    }
}

/// Comparator, boundary and the label published in place of the raw metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    comparator: Comparator,
    boundary: u64,
    label: &'static str,
}

impl Threshold {
    #[must_use]
    pub const fn greater_than(boundary: u64, label: &'static str) -> Self {
        Self {
            comparator: Comparator::GreaterThan,
            boundary,
            label,
        }
    }

    #[must_use]
    pub const fn at_least(boundary: u64, label: &'static str) -> Self {
        Self {
            comparator: Comparator::GreaterThanOrEqual,
            boundary,
            label,
        }
    }

    #[must_use]
    pub fn is_met(&self, metric: u64) -> bool {
        self.comparator.holds(metric, self.boundary)
    }

    #[must_use]
    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    #[must_use]
    pub fn boundary(&self) -> u64 {
        self.boundary
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }
}

/// A named tier: provider identifier plus its threshold
#[derive(Debug, Clone, Copy)]
pub struct Tier {
    pub provider_id: &'static str,
    pub threshold: Threshold,
}

impl Tier {
    #[must_use]
    pub const fn new(provider_id: &'static str, threshold: Threshold) -> Self {
        Self {
            provider_id,
            threshold,
        }
    }
}

/// Provider that proves a fetched metric clears a fixed tier
pub struct ThresholdProvider {
    tier: Tier,
    record_key: &'static str,
    clients: Arc<AuthClientCache>,
    fetcher: Arc<dyn ExternalDataFetcher>,
}

impl ThresholdProvider {
    #[must_use]
    pub fn new(
        tier: Tier,
        record_key: &'static str,
        clients: Arc<AuthClientCache>,
        fetcher: Arc<dyn ExternalDataFetcher>,
    ) -> Self {
        Self {
            tier,
            record_key,
            clients,
            fetcher,
        }
    }

    async fn evaluate(
        &self,
        payload: &RequestPayload,
        context: &mut VerificationContext,
    ) -> Result<Option<BTreeMap<String, String>>, VerificationError> {
        let record =
            fetch_external_record(&self.clients, self.fetcher.as_ref(), payload, context).await?;

        let username = record
            .username()
            .ok_or(VerificationError::DataShape("username"))?;
        let metric = record.metric.ok_or(VerificationError::DataShape("metric"))?;

        let threshold = self.tier.threshold;
        if !threshold.is_met(metric) {
            LoggingHelper::log_threshold_unmet(
                self.tier.provider_id,
                threshold.comparator(),
                threshold.boundary(),
            );
            return Ok(None);
        }

        Ok(Some(BTreeMap::from([
            ("username".to_string(), username.to_string()),
            (self.record_key.to_string(), threshold.label().to_string()),
        ])))
    }
}

#[async_trait]
impl VerificationProvider for ThresholdProvider {
    fn id(&self) -> &str {
        self.tier.provider_id
    }

    async fn verify(
        &self,
        payload: &RequestPayload,
        context: &mut VerificationContext,
    ) -> VerifiedPayload {
        match self.evaluate(payload, context).await {
            Ok(Some(record)) => {
                LoggingHelper::log_verification_success(self.id());
                VerifiedPayload::verified(record)
            }
            Ok(None) => VerifiedPayload::invalid(),
            Err(e) => {
                LoggingHelper::log_verification_failure(self.id(), &payload.proofs.session_key, &e);
                VerifiedPayload::invalid()
            }
        }
    }
}
