//! Payment module - Deposit confirmations from the payment provider.

mod errors;
mod stripe_event;
mod verifier;

pub use errors::WebhookError;
pub use stripe_event::{
    PaymentConfirmation, PaymentOutcome, StripeEvent, StripeEventData, StripeEventType,
    STRIPE_PROVIDER,
};
pub use verifier::{SignatureHeader, StripeWebhookVerifier};
