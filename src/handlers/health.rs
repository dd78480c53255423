use actix_web::{HttpResponse, Result};

use super::types::HealthResponse;

/// Health check endpoint
///
/// # Errors
///
/// This function currently never returns an error
pub async fn health() -> Result<HttpResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        message: format!("Stampgate {} is running", crate::VERSION),
    };
    Ok(HttpResponse::Ok().json(response))
}
