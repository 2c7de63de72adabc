//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `LABTRACK` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use labtrack::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.port);
//! ```

mod auth;
mod database;
mod dispatch;
mod error;
mod push;
mod server;
mod side_effects;
mod tokens;
mod transitions;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use dispatch::DispatchConfig;
pub use error::{ConfigError, ValidationError};
pub use push::{PushConfig, PushProviderKind};
pub use server::{Environment, ServerConfig};
pub use side_effects::SideEffectsConfig;
pub use tokens::TokensConfig;
pub use transitions::TransitionsConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection; in-memory adapters are used when absent
    pub database: Option<DatabaseConfig>,

    /// Session token verification
    pub auth: AuthConfig,

    /// Push provider selection and credentials
    #[serde(default)]
    pub push: PushConfig,

    /// Realtime connection settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Post-commit worker pool
    #[serde(default)]
    pub side_effects: SideEffectsConfig,

    #[serde(default)]
    pub transitions: TransitionsConfig,

    /// Device token retention
    #[serde(default)]
    pub tokens: TokensConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `LABTRACK` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `LABTRACK__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `LABTRACK__PUSH__PROVIDER=fcm` -> `push.provider = fcm`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("LABTRACK")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first section that is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.auth.validate(&self.server.environment)?;
        self.push.validate()?;
        self.dispatch.validate()?;
        self.side_effects.validate()?;
        self.transitions.validate()?;
        self.tokens.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
