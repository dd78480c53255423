use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StampSettings {
    pub application: ApplicationSettings,
    pub logging: LoggingSettings,
    pub handshake: HandshakeSettings,
    pub providers: Vec<ProviderSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub redirect_base_url: String,
    pub cors_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeSettings {
    /// Base URL of the procedure service exposing `/{provider}/generateAuthUrl`
    pub procedure_url: String,
    /// Base URL of the credential issuer
    pub issuer_url: String,
    /// Payload version sent to the issuer
    pub version: String,
    /// Window in which repeated redirect deliveries are dropped
    pub debounce_ms: u64,
    pub popup_width: u32,
    pub popup_height: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

/// How client credentials are presented to the token endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenAuthMethod {
    ClientSecretPost,
    ClientSecretBasic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub name: String,
    pub display_name: Option<String>,
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    /// Base URL of the platform's data API
    pub api_base: Option<String>,
    pub scopes: Vec<String>,

    // Direct values (can be overridden by environment variables)
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    // Environment variable names for overrides
    pub client_id_env: Option<String>,
    pub client_secret_env: Option<String>,

    pub enabled: bool,
    pub use_pkce: bool,
    pub token_auth: TokenAuthMethod,
    pub extra_auth_params: HashMap<String, String>,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            redirect_base_url: "http://localhost:8080".to_string(),
            cors_origins: "http://localhost:3000,http://localhost:8080".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        Self {
            procedure_url: "http://localhost:8080".to_string(),
            issuer_url: "http://localhost:8081/api/".to_string(),
            version: "0.0.0".to_string(),
            debounce_ms: 300,
            popup_width: 600,
            popup_height: 800,
            screen_width: 1920,
            screen_height: 1080,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            display_name: None,
            authorization_endpoint: None,
            token_endpoint: None,
            api_base: None,
            scopes: Vec::new(),
            client_id: None,
            client_secret: None,
            client_id_env: None,
            client_secret_env: None,
            enabled: true,
            use_pkce: false,
            token_auth: TokenAuthMethod::ClientSecretPost,
            extra_auth_params: HashMap::new(),
        }
    }
}

impl StampSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - Settings file cannot be read or parsed
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();
        env_logger::try_init()?;

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);
        settings.fill_known_provider_defaults();

        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `STAMPGATE_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be read or parsed
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::with_default_providers();

        let default_config_path = Path::new("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(default_config_path)?;
            log::info!("Loaded base settings from {}", default_config_path.display());
        }

        if let Ok(secrets_dir) = std::env::var("STAMPGATE_SECRETS_DIR") {
            let secrets_path = Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                log::info!("Overriding settings from {}", secrets_path.display());
            } else {
                log::info!(
                    "STAMPGATE_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        let settings: Self = basic_toml::from_str(&toml_content)?;
        Ok(settings)
    }

    /// Defaults with the Twitter and GitHub platforms pre-declared
    #[must_use]
    pub fn with_default_providers() -> Self {
        Self {
            providers: vec![
                ProviderSettings {
                    name: "twitter".to_string(),
                    display_name: Some("Twitter".to_string()),
                    client_id_env: Some("TWITTER_CLIENT_ID".to_string()),
                    client_secret_env: Some("TWITTER_CLIENT_SECRET".to_string()),
                    ..Default::default()
                },
                ProviderSettings {
                    name: "github".to_string(),
                    display_name: Some("Github".to_string()),
                    client_id_env: Some("GITHUB_CLIENT_ID".to_string()),
                    client_secret_env: Some("GITHUB_CLIENT_SECRET".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    /// Fill endpoints, scopes and flow options for platforms we know about
    fn fill_known_provider_defaults(&mut self) {
        for provider in &mut self.providers {
            provider.apply_known_defaults();
        }
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_handshake_env_overrides(&mut settings.handshake);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(redirect_base_url) = std::env::var("REDIRECT_BASE_URL") {
            app_settings.redirect_base_url = redirect_base_url;
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
    }

    /// Apply environment overrides for handshake settings
    pub fn apply_handshake_env_overrides(handshake: &mut HandshakeSettings) {
        if let Ok(procedure_url) = std::env::var("PROCEDURE_URL") {
            handshake.procedure_url = procedure_url;
        }
        if let Ok(issuer_url) = std::env::var("IAM_URL") {
            handshake.issuer_url = issuer_url;
        }
        if let Ok(debounce_str) = std::env::var("HANDSHAKE_DEBOUNCE_MS") {
            if let Ok(debounce_ms) = debounce_str.parse::<u64>() {
                handshake.debounce_ms = debounce_ms;
            }
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if line.trim_start().starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl ProviderSettings {
    /// Get the client ID, checking environment variable first, then falling back to direct value
    #[must_use]
    pub fn get_client_id(&self) -> Option<String> {
        if let Some(env_var) = &self.client_id_env {
            if let Ok(value) = std::env::var(env_var) {
                return Some(value);
            }
        }
        self.client_id.clone()
    }

    /// Get the client secret, checking environment variable first, then falling back
    /// to direct value
    #[must_use]
    pub fn get_client_secret(&self) -> Option<String> {
        if let Some(env_var) = &self.client_secret_env {
            if let Ok(value) = std::env::var(env_var) {
                return Some(value);
            }
        }
        self.client_secret.clone()
    }

    /// Fill unset endpoints with the platform's well-known values
    pub fn apply_known_defaults(&mut self) {
        let (auth_endpoint, token_endpoint, api_base, scopes) = match self.name.as_str() {
            "twitter" => {
                self.use_pkce = true;
                self.token_auth = TokenAuthMethod::ClientSecretBasic;
                (
                    "https://twitter.com/i/oauth2/authorize",
                    "https://api.twitter.com/2/oauth2/token",
                    "https://api.twitter.com",
                    &["tweet.read", "users.read"][..],
                )
            }
            "github" => (
                "https://github.com/login/oauth/authorize",
                "https://github.com/login/oauth/access_token",
                "https://api.github.com",
                &["read:user"][..],
            ),
            _ => return,
        };

        self.authorization_endpoint
            .get_or_insert_with(|| auth_endpoint.to_string());
        self.token_endpoint
            .get_or_insert_with(|| token_endpoint.to_string());
        self.api_base.get_or_insert_with(|| api_base.to_string());
        if self.scopes.is_empty() {
            self.scopes = scopes.iter().map(ToString::to_string).collect();
        }
    }
}
