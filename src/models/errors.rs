//! Error taxonomy for verification, handshake and issuance
//!
//! Auth and fetch failures stay separate types so logs can tell a rejected
//! code apart from an external API outage, even though both end up as an
//! unverified result.

use thiserror::Error;

/// OAuth token exchange failures
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The provider refused the code (expired, reused or invalid)
    #[error("authorization code rejected: {0}")]
    Rejected(String),
    /// No pending authorization matches the session key
    #[error("unknown or expired session: {0}")]
    UnknownSession(String),
    #[error("network error during token exchange: {0}")]
    Network(String),
    #[error("OAuth configuration error: {0}")]
    Configuration(String),
}

/// External data query failures
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("external API rejected the access token")]
    Unauthorized,
    #[error("external API rate limit reached")]
    RateLimited,
    #[error("external API returned status {0}")]
    Status(u16),
    #[error("network error during fetch: {0}")]
    Network(String),
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

impl FetchError {
    /// Map a non-success HTTP status onto a fetch failure
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => FetchError::Unauthorized,
            429 => FetchError::RateLimited,
            other => FetchError::Status(other),
        }
    }
}

/// Reasons a provider refused to verify
///
/// Only used internally and for logging; the verification boundary exposes
/// nothing but `valid: false`.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The fetch succeeded but a required field was missing
    #[error("fetched record is missing {0}")]
    DataShape(&'static str),
}

impl VerificationError {
    /// Coarse category suitable for structured logs
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            VerificationError::Auth(_) => "auth",
            VerificationError::Fetch(_) => "fetch",
            VerificationError::DataShape(_) => "data_shape",
        }
    }
}

/// Credential issuance and stamp storage failures
#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error("signer failed: {0}")]
    Signer(String),
    #[error("issuer request failed: {0}")]
    Network(String),
    #[error("issuer returned status {0}")]
    Status(u16),
    #[error("issuer response malformed: {0}")]
    InvalidResponse(String),
    #[error("stamp store rejected credential: {0}")]
    Store(String),
}

/// Authorization handshake failures
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("authorization URL request failed: {0}")]
    AuthUrl(String),
    #[error("failed to open authorization window: {0}")]
    Popup(String),
    #[error(transparent)]
    Issuance(#[from] IssuanceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_from_status() {
        assert!(matches!(FetchError::from_status(401), FetchError::Unauthorized));
        assert!(matches!(FetchError::from_status(429), FetchError::RateLimited));
        assert!(matches!(FetchError::from_status(502), FetchError::Status(502)));
    }

    #[test]
    fn test_verification_error_categories_stay_distinct() {
        let auth: VerificationError = AuthError::Rejected("bad_verification_code".into()).into();
        let fetch: VerificationError = FetchError::Unauthorized.into();
        let shape = VerificationError::DataShape("username");

        assert_eq!(auth.category(), "auth");
        assert_eq!(fetch.category(), "fetch");
        assert_eq!(shape.category(), "data_shape");
    }
}
