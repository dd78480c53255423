// HTTP request handlers for the stamp verification service
pub mod health;
pub mod procedure;
pub mod types;
pub mod verify;


use actix_web::web;

// Re-export the main handler functions
pub use health::health;
pub use procedure::{generate_auth_url, oauth_redirect};
pub use verify::verify;

/// Register all routes
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.route("/ping", web::get().to(health))
        .route("/verify", web::post().to(verify))
        .route("/{provider}/generateAuthUrl", web::post().to(generate_auth_url))
        .route("/{provider}/callback", web::get().to(oauth_redirect));
}
