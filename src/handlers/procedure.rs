// Authorization URL and OAuth redirect handlers
use actix_web::http::header::ContentType;
use actix_web::{web, HttpResponse, Result};
use log::{info, warn};

use super::types::{GenerateAuthUrlRequest, GenerateAuthUrlResponse};
use crate::handshake::{channel_name, RedirectHub};
use crate::models::RedirectMessage;
use crate::oauth::{OAuthCallback, OAuthConfig};
use crate::utils::logging::LoggingHelper;
use crate::utils::responses::ResponseBuilder;
use crate::utils::validation::validate_provider;

/// `POST /{provider}/generateAuthUrl`
///
/// # Errors
///
/// This function currently never returns an error; failures become JSON error responses
pub async fn generate_auth_url(
    path: web::Path<String>,
    body: Option<web::Json<GenerateAuthUrlRequest>>,
    oauth_config: web::Data<OAuthConfig>,
) -> Result<HttpResponse> {
    let provider = match validate_provider(&path) {
        Ok(provider) => provider,
        Err(response) => return Ok(response),
    };
    if oauth_config.provider(provider).is_none() {
        return Ok(ResponseBuilder::unknown_provider(provider));
    }

    let request = body.map(web::Json::into_inner).unwrap_or_default();
    match oauth_config.get_auth_url(provider, request.callback.as_deref()) {
        Ok(authorization) => Ok(HttpResponse::Ok().json(GenerateAuthUrlResponse {
            auth_url: authorization.auth_url,
        })),
        Err(e) => {
            warn!("Failed to build {provider} authorization URL: {e}");
            Ok(ResponseBuilder::server_error())
        }
    }
}

/// `GET /{provider}/callback`
///
/// Publishes the redirect on the provider's channel and renders a page that
/// relays it to the opener's browser channel before closing the popup.
///
/// # Errors
///
/// This function currently never returns an error; failures become JSON error responses
pub async fn oauth_redirect(
    path: web::Path<String>,
    query: web::Query<OAuthCallback>,
    hub: web::Data<RedirectHub>,
) -> Result<HttpResponse> {
    let provider = match validate_provider(&path) {
        Ok(provider) => provider,
        Err(response) => return Ok(response),
    };
    let callback = query.into_inner();

    if let Some(error) = callback.error {
        info!("Authorization with {provider} ended with {error}");
        return Ok(close_window_page(
            None,
            "Authorization was not completed. You can close this window.",
        ));
    }
    let (Some(code), Some(state)) = (callback.code, callback.state) else {
        return Ok(ResponseBuilder::missing_parameters());
    };

    let channel = channel_name(provider);
    let message = RedirectMessage::new(provider, code, state);
    let delivered = hub.publish(&channel, message.clone());
    info!(
        "Redirect for {provider} published on {channel} to {delivered} listener(s), attempt={}",
        LoggingHelper::attempt_tag(&message.data.state)
    );

    Ok(close_window_page(
        Some((&channel, &message)),
        "Authorization complete. You can close this window.",
    ))
}

fn close_window_page(relay: Option<(&str, &RedirectMessage)>, text: &str) -> HttpResponse {
    let script = relay
        .and_then(|(channel, message)| {
            let channel = serde_json::to_string(channel).ok()?;
            let message = serde_json::to_string(message).ok()?;
            Some(format!(
                concat!(
                    "<script>const c=new BroadcastChannel({});",
                    "c.postMessage({});c.close();window.close();</script>"
                ),
                channel.replace('<', "\\u003c"),
                message.replace('<', "\\u003c")
            ))
        })
        .unwrap_or_default();

    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(format!(
            concat!(
                "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Stampgate</title>",
                "</head><body><p>{}</p>{}</body></html>"
            ),
            text, script
        ))
}
