//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Deposit checkout settings (Stripe)
#[derive(Debug, Deserialize)]
pub struct PaymentConfig {
    /// Webhook signing secret used to verify payment events
    pub stripe_webhook_secret: SecretString,

    /// Deposit locked in when a lead is approved, in pence
    #[serde(default = "default_deposit_pence")]
    pub deposit_pence: i64,
}

impl PaymentConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let secret = self.stripe_webhook_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"));
        }
        if !secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if self.deposit_pence <= 0 {
            return Err(ValidationError::InvalidDepositAmount);
        }
        Ok(())
    }
}

fn default_deposit_pence() -> i64 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str, deposit_pence: i64) -> PaymentConfig {
        PaymentConfig {
            stripe_webhook_secret: SecretString::new(secret.to_string()),
            deposit_pence,
        }
    }

    #[test]
    fn missing_secret_is_rejected() {
        assert_eq!(
            config("", 5_000).validate(),
            Err(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"))
        );
    }

    #[test]
    fn secret_prefix_is_checked() {
        assert_eq!(
            config("secret_xxx", 5_000).validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn deposit_must_be_positive() {
        assert_eq!(
            config("whsec_xxx", 0).validate(),
            Err(ValidationError::InvalidDepositAmount)
        );
    }

    #[test]
    fn secret_is_redacted_in_debug_output() {
        let rendered = format!("{:?}", config("whsec_topsecret", 5_000));
        assert!(!rendered.contains("topsecret"));
    }

    #[test]
    fn deposit_defaults_when_absent() {
        let parsed: PaymentConfig =
            serde_json::from_str(r#"{ "stripe_webhook_secret": "whsec_abc" }"#).unwrap();
        assert_eq!(parsed.deposit_pence, 5_000);
        assert!(parsed.validate().is_ok());
    }
}
