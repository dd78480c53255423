// Request and response bodies used across handlers
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Proofs, VerifiedPayload};

#[derive(Debug, Default, Deserialize)]
pub struct GenerateAuthUrlRequest {
    pub callback: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAuthUrlResponse {
    pub auth_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub types: Vec<String>,
    pub proofs: Proofs,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub results: BTreeMap<String, VerifiedPayload>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}
