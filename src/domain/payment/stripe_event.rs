//! Stripe event payloads and the deposit confirmation read from them.
//!
//! Only the fields deposit handling needs are captured.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::WebhookError;
use crate::domain::foundation::LeadId;

/// Provider name recorded in the idempotency ledger for Stripe events.
pub const STRIPE_PROVIDER: &str = "stripe";

/// Stripe webhook event (simplified).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp.
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// Event types deposit handling reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    CheckoutSessionCompleted,
    CheckoutSessionExpired,
    CheckoutSessionAsyncPaymentFailed,
    Unknown,
}

impl StripeEventType {
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "checkout.session.expired" => Self::CheckoutSessionExpired,
            "checkout.session.async_payment_failed" => Self::CheckoutSessionAsyncPaymentFailed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CheckoutSessionExpired => "checkout.session.expired",
            Self::CheckoutSessionAsyncPaymentFailed => "checkout.session.async_payment_failed",
            Self::Unknown => "unknown",
        }
    }
}

impl StripeEvent {
    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::parse(&self.event_type)
    }
}

/// Result the payment provider reports for a deposit checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid { amount_pence: i64 },
    Failed,
    Expired,
}

/// Deposit confirmation event in provider-neutral form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub provider: String,
    pub external_event_id: String,
    pub event_type: String,
    pub lead_id: LeadId,
    pub checkout_session_id: Option<String>,
    pub outcome: PaymentOutcome,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    id: Option<String>,
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: std::collections::HashMap<String, String>,
    amount_total: Option<i64>,
    payment_status: Option<String>,
}

impl PaymentConfirmation {
    /// Reads a confirmation from a checkout session event.
    ///
    /// The lead is taken from `client_reference_id`, falling back to
    /// `metadata.lead_id`. Unhandled event types are `Ignored`.
    pub fn from_stripe_event(event: &StripeEvent) -> Result<Self, WebhookError> {
        let event_type = event.parsed_type();
        if event_type == StripeEventType::Unknown {
            return Err(WebhookError::Ignored(format!(
                "unhandled event type: {}",
                event.event_type
            )));
        }

        let session: CheckoutSessionObject = serde_json::from_value(event.data.object.clone())
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let reference = session
            .client_reference_id
            .clone()
            .or_else(|| session.metadata.get("lead_id").cloned())
            .ok_or(WebhookError::MissingField("client_reference_id"))?;
        let lead_id = Uuid::parse_str(&reference)
            .map(LeadId::from_uuid)
            .map_err(|e| WebhookError::ParseError(format!("invalid lead reference: {}", e)))?;

        let outcome = match event_type {
            StripeEventType::CheckoutSessionCompleted => {
                if session.payment_status.as_deref() == Some("unpaid") {
                    return Err(WebhookError::Ignored(
                        "checkout completed without payment".to_string(),
                    ));
                }
                PaymentOutcome::Paid {
                    amount_pence: session
                        .amount_total
                        .ok_or(WebhookError::MissingField("amount_total"))?,
                }
            }
            StripeEventType::CheckoutSessionExpired => PaymentOutcome::Expired,
            StripeEventType::CheckoutSessionAsyncPaymentFailed => PaymentOutcome::Failed,
            StripeEventType::Unknown => {
                return Err(WebhookError::Ignored(event.event_type.clone()));
            }
        };

        Ok(Self {
            provider: STRIPE_PROVIDER.to_string(),
            external_event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            lead_id,
            checkout_session_id: session.id,
            outcome,
        })
    }
}
