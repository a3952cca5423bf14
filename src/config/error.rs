//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid Stripe webhook secret format")]
    InvalidStripeWebhookSecret,

    #[error("Deposit amount must be positive")]
    InvalidDepositAmount,

    #[error("Parse failure threshold must be at least 1")]
    InvalidFailureThreshold,

    #[error("{0} must be positive")]
    NonPositive(&'static str),

    #[error("Invalid channel identifier for {0}")]
    InvalidChannel(&'static str),

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
