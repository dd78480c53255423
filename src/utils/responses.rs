//! JSON error responses shared by the handlers

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// `{ "error": code, "error_description": description }` with `status`
    #[must_use]
    pub fn error(status: StatusCode, code: &str, description: &str) -> HttpResponse {
        HttpResponse::build(status).json(json!({
            "error": code,
            "error_description": description
        }))
    }

    #[must_use]
    pub fn invalid_provider(provider: &str) -> HttpResponse {
        Self::error(
            StatusCode::BAD_REQUEST,
            "invalid_provider",
            &format!("'{provider}' is not a valid provider name"),
        )
    }

    #[must_use]
    pub fn unknown_provider(provider: &str) -> HttpResponse {
        Self::error(
            StatusCode::NOT_FOUND,
            "unknown_provider",
            &format!("Provider {provider} is not configured"),
        )
    }

    #[must_use]
    pub fn missing_parameters() -> HttpResponse {
        Self::error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Required parameters are missing from the request",
        )
    }

    #[must_use]
    pub fn server_error() -> HttpResponse {
        Self::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            "An internal server error occurred",
        )
    }
}
