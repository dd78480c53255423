use actix_web::HttpResponse;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::responses::ResponseBuilder;

// lowercase platform names as they appear in callback paths and channel names
static PROVIDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_-]{0,31}$").expect("provider pattern compiles"));

/// Validate the `{provider}` path segment
///
/// # Errors
///
/// Returns a 400 response if the segment is not a plausible platform name.
pub fn validate_provider(provider: &str) -> Result<&str, HttpResponse> {
    if PROVIDER_PATTERN.is_match(provider) {
        Ok(provider)
    } else {
        warn!("Rejected provider path segment of {} bytes", provider.len());
        Err(ResponseBuilder::invalid_provider(provider))
    }
}
