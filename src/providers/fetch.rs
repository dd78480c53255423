//! External data fetching

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::models::{ExternalRecord, FetchError};
use crate::oauth::AuthClient;

/// Queries an external service and normalizes the answer
#[async_trait]
pub trait ExternalDataFetcher: Send + Sync {
    /// Fetch identity and metric fields with an authenticated client
    ///
    /// # Errors
    ///
    /// Returns a `FetchError` when any call fails. An answer that merely
    /// lacks fields is returned as `Ok` with those fields unset.
    async fn fetch(&self, client: &AuthClient) -> Result<ExternalRecord, FetchError>;
}

/// GET `path` and decode the JSON body, mapping failures onto [`FetchError`]
///
/// # Errors
///
/// Returns an error on transport failure, non-success status or undecodable body
pub async fn get_json<T: DeserializeOwned>(
    client: &AuthClient,
    path: &str,
) -> Result<T, FetchError> {
    let response = client
        .get(path)
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::from_status(status.as_u16()));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| FetchError::Decode(e.to_string()))
}
