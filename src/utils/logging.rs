// Centralized logging for provider setup, verification and the handshake.
// Authorization codes, tokens and secrets never reach these helpers.
use log::{debug, info, warn};

use crate::models::{AuthError, VerificationError};
use crate::providers::Comparator;

pub struct LoggingHelper;

impl LoggingHelper {
    /// Short, non-secret tag correlating log lines of one authorization attempt
    #[must_use]
    pub fn attempt_tag(session_key: &str) -> &str {
        let end = session_key
            .char_indices()
            .nth(8)
            .map_or(session_key.len(), |(idx, _)| idx);
        &session_key[..end]
    }

    /// Log OAuth provider initialization start
    pub fn log_oauth_provider_initialization() {
        info!("🔧 Initializing OAuth providers from configuration...");
    }

    /// Log that a provider is disabled
    pub fn log_oauth_provider_disabled(provider_name: &str) {
        info!("⏭️  Provider {provider_name} is disabled, skipping");
    }

    /// Log that a provider is configured
    pub fn log_oauth_provider_configured(display_name: &str, provider_name: &str) {
        info!("✅ {display_name} OAuth2 configured ({provider_name})");
    }

    /// Log that a provider is not configured
    pub fn log_oauth_provider_not_configured(provider_name: &str, reason: &AuthError) {
        info!("❌ {provider_name} OAuth2 not configured: {reason}");
    }

    /// Log summary of configured OAuth providers
    pub fn log_oauth_providers_summary(provider_names: &[&str]) {
        info!("🎯 Configured OAuth providers: {provider_names:?}");
    }

    /// Log OAuth URL building
    pub fn log_oauth_url_built(provider: &str, scopes: &str) {
        info!("🔍 Built {provider} OAuth URL with scopes: {scopes}");
    }

    /// Log token exchange start
    pub fn log_token_exchange_start(provider: &str) {
        info!("🔄 Exchanging authorization code for tokens with {provider}");
    }

    /// Log token exchange summary
    pub fn log_token_exchange_summary(
        provider: &str,
        token_type: &str,
        expires_in: Option<u64>,
        scope: Option<&str>,
    ) {
        info!(
            "🔍 Token exchange summary for {provider}: token_type={token_type}, \
             expires_in={expires_in:?}, scope={scope:?}"
        );
    }

    pub fn log_verification_success(provider_id: &str) {
        info!("Verified {provider_id}");
    }

    /// Log a failed verification with its coarse category
    pub fn log_verification_failure(
        provider_id: &str,
        session_key: &str,
        error: &VerificationError,
    ) {
        warn!(
            "Verification failed provider={provider_id} attempt={} category={}: {error}",
            Self::attempt_tag(session_key),
            error.category()
        );
    }

    pub fn log_threshold_unmet(provider_id: &str, comparator: Comparator, boundary: u64) {
        info!("Threshold not met provider={provider_id} requires {comparator} {boundary}");
    }

    pub fn log_redirect_ignored(expected: &str, target: &str) {
        debug!("Redirect for {target} ignored by {expected} handshake");
    }

    pub fn log_redirect_suppressed(provider_id: &str, same_delivery: bool) {
        debug!(
            "Duplicate redirect suppressed provider={provider_id} same_delivery={same_delivery}"
        );
    }

    pub fn log_saving_stamp(provider_id: &str, session_key: &str) {
        info!("Saving Stamp provider={provider_id} attempt={}", Self::attempt_tag(session_key));
    }

    pub fn log_stamp_saved(provider_id: &str) {
        info!("Successfully saved Stamp provider={provider_id}");
    }

    pub fn log_stamp_failed(provider_id: &str, error: &dyn std::fmt::Display) {
        warn!("Stamp not issued provider={provider_id}: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_tag_truncates() {
        assert_eq!(LoggingHelper::attempt_tag("0123456789abcdef"), "01234567");
        assert_eq!(LoggingHelper::attempt_tag("abc"), "abc");
        assert_eq!(LoggingHelper::attempt_tag(""), "");
    }
}
