use actix_web::{web, HttpResponse, Result};

use super::types::{VerifyRequest, VerifyResponse};
use crate::models::RequestPayload;
use crate::providers::ProviderRegistry;
use crate::utils::responses::ResponseBuilder;

/// `POST /verify`
///
/// All requested types share one verification context, so a platform's
/// authorization code is exchanged at most once per request. Only `valid`
/// and the record are returned; failure reasons stay in the logs.
///
/// # Errors
///
/// This function currently never returns an error; failures become JSON error responses
pub async fn verify(
    body: web::Json<VerifyRequest>,
    registry: web::Data<ProviderRegistry>,
) -> Result<HttpResponse> {
    let VerifyRequest { types, proofs } = body.into_inner();
    if types.is_empty() {
        return Ok(ResponseBuilder::missing_parameters());
    }

    let payload = RequestPayload { proofs };
    let results = registry.verify_all(&types, &payload).await;
    Ok(HttpResponse::Ok().json(VerifyResponse { results }))
}
