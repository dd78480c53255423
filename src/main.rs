#![warn(clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use stampgate::{configure_services, OAuthConfig, ProviderRegistry, RedirectHub, StampSettings};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = StampSettings::load()
        .map_err(|e| anyhow::anyhow!("Failed to load settings: {e}"))?;

    let oauth_config = Arc::new(OAuthConfig::from_settings(&settings));
    let registry = Arc::new(ProviderRegistry::from_oauth_config(&oauth_config));
    // Callbacks are published here for in-process handshake clients; browser
    // clients receive them through the callback page instead
    let hub = RedirectHub::new();

    start_server(oauth_config, registry, hub, &settings)
        .await
        .context("Server terminated with an error")
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(
    oauth_config: Arc<OAuthConfig>,
    registry: Arc<ProviderRegistry>,
    hub: RedirectHub,
    settings: &StampSettings,
) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &oauth_config);

    let cors_origins = settings.get_cors_origins();

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Content-Type", "Accept"])
            .max_age(3600);

        App::new()
            .app_data(web::Data::from(Arc::clone(&oauth_config)))
            .app_data(web::Data::from(Arc::clone(&registry)))
            .app_data(web::Data::new(hub.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, oauth_config: &OAuthConfig) {
    println!("Starting Stampgate {} on http://{bind_address}", stampgate::VERSION);
    println!("Configured platforms: {:?}", oauth_config.platforms());
    println!();
    println!("Endpoints:");
    println!("  POST /{{provider}}/generateAuthUrl - Authorization URL for a platform");
    println!("  GET  /{{provider}}/callback        - OAuth redirect target (popup)");
    println!("  POST /verify                     - Verify stamp types against proofs");
    println!("  GET  /ping                       - Health check");
    println!();
    println!("OAuth callback URLs for platforms:");
    for platform in oauth_config.platforms() {
        println!("  {}", oauth_config.default_callback(platform));
    }
}
