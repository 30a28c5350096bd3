//! Configuration management for the Practice Journal server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with PJ__ prefix (e.g. PJ__DATABASE__URL)

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub jwt: JwtConfig,

    pub auth: AuthConfig,

    pub cors: CorsConfig,

    pub uploads: UploadConfig,

    pub verification: VerificationConfig,

    #[serde(default)]
    pub sms: SmsConfig,

    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Apply pending migrations on startup
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Token lifetime in seconds
    pub token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Allow the public register endpoint to create director accounts
    pub allow_director_registration: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed browser origins; empty allows any origin
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Directory logo files are written to and served from
    pub dir: String,

    pub max_logo_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerificationConfig {
    /// Lifetime of a parent approval request
    pub expiry_hours: i64,
}

/// Outbound/inbound SMS gateway. Without `api_url`, approval texts are only logged.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SmsConfig {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub from_number: Option<String>,

    /// Shared secret used to sign inbound reply webhooks
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("PJ_ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let is_development = environment == "development";

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3001)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.run_migrations", is_development)?
            .set_default("jwt.token_expiry", 86400)?
            .set_default("auth.allow_director_registration", false)?
            .set_default("cors.allowed_origins", Vec::<String>::new())?
            .set_default("uploads.dir", "uploads")?
            .set_default("uploads.max_logo_bytes", 5_i64 * 1024 * 1024)?
            .set_default("verification.expiry_hours", 24)?
            .set_default("logging.json", !is_development)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (PJ prefix)
            .add_source(
                Environment::with_prefix("PJ")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
