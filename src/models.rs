//! Core data types shared by providers, the handshake and the HTTP layer

pub mod errors;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use errors::{AuthError, FetchError, HandshakeError, IssuanceError, VerificationError};

/// Proof fields submitted with a verification request
///
/// `session_key` correlates the authorization attempt (it is the OAuth `state`),
/// `code` is the one-time authorization code. Any other proof fields are kept
/// untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proofs {
    pub session_key: String,
    pub code: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Proofs {
    #[must_use]
    pub fn new(session_key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            code: code.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// Verification request payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub proofs: Proofs,
}

impl RequestPayload {
    #[must_use]
    pub fn new(session_key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            proofs: Proofs::new(session_key, code),
        }
    }
}

/// Normalized response from an external data provider
///
/// A missing `username` means the fetch produced nothing usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalRecord {
    pub username: Option<String>,
    pub metric: Option<u64>,
}

impl ExternalRecord {
    #[must_use]
    pub fn new(username: Option<String>, metric: Option<u64>) -> Self {
        Self { username, metric }
    }

    /// Username, if present and non-empty
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|name| !name.is_empty())
    }
}

/// Outcome of a verification
///
/// Constructed only through [`VerifiedPayload::invalid`] and
/// [`VerifiedPayload::verified`], so a valid payload always carries a
/// non-empty record and an invalid one never carries any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedPayload {
    valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    record: Option<BTreeMap<String, String>>,
}

impl VerifiedPayload {
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            valid: false,
            record: None,
        }
    }

    /// Build a valid payload; an empty record degrades to invalid
    #[must_use]
    pub fn verified(record: BTreeMap<String, String>) -> Self {
        if record.is_empty() {
            return Self::invalid();
        }
        Self {
            valid: true,
            record: Some(record),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[must_use]
    pub fn record(&self) -> Option<&BTreeMap<String, String>> {
        self.record.as_ref()
    }
}

/// Body of a redirect notification posted by the authorization popup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectData {
    pub code: String,
    pub state: String,
}

/// Message delivered on a redirect channel once an OAuth flow completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectMessage {
    pub target: String,
    pub data: RedirectData,
}

impl RedirectMessage {
    #[must_use]
    pub fn new(
        target: impl Into<String>,
        code: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            data: RedirectData {
                code: code.into(),
                state: state.into(),
            },
        }
    }

    /// Identity of the delivery, used to recognise repeated events
    #[must_use]
    pub fn delivery_id(&self) -> String {
        format!("{}:{}", self.target, self.data.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_payload_uses_camel_case_session_key() {
        let payload: RequestPayload = serde_json::from_str(
            r#"{"proofs":{"sessionKey":"abc","code":"xyz","handle":"dev"}}"#,
        )
        .unwrap();

        assert_eq!(payload.proofs.session_key, "abc");
        assert_eq!(payload.proofs.code, "xyz");
        assert_eq!(payload.proofs.extra.get("handle").map(String::as_str), Some("dev"));
    }

    #[test]
    fn test_request_payload_requires_code() {
        let result = serde_json::from_str::<RequestPayload>(r#"{"proofs":{"sessionKey":"abc"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_payload_serializes_without_record() {
        let json = serde_json::to_value(VerifiedPayload::invalid()).unwrap();
        assert_eq!(json, serde_json::json!({ "valid": false }));
    }

    #[test]
    fn test_empty_record_is_never_valid() {
        let payload = VerifiedPayload::verified(BTreeMap::new());
        assert!(!payload.is_valid());
        assert!(payload.record().is_none());
    }

    #[test]
    fn test_blank_username_is_absent() {
        let record = ExternalRecord::new(Some(String::new()), Some(10));
        assert_eq!(record.username(), None);
    }
}
