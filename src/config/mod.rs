//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `TATTOO_INTAKE__`
//! prefix and `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use tattoo_intake::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod conversation;
mod database;
mod error;
mod features;
mod logging;
mod payment;

pub use conversation::ConversationConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use features::FeatureFlags;
pub use logging::LoggingConfig;
pub use payment::PaymentConfig;

use serde::Deserialize;

const ENV_PREFIX: &str = "TATTOO_INTAKE";

/// Root application configuration
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,

    pub payment: PaymentConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub features: FeatureFlags,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `.env` if present, then `TATTOO_INTAKE__*` variables:
    ///
    /// - `TATTOO_INTAKE__DATABASE__URL=...` -> `database.url`
    /// - `TATTOO_INTAKE__CONVERSATION__TOUR_COUNTRIES=Germany,France` -> list
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .prefix_separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("conversation.tour_countries"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration sections
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.payment.validate()?;
        self.conversation.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
