//! Payment handlers.

mod handle_payment_confirmation;

pub use handle_payment_confirmation::{
    HandlePaymentConfirmationCommand, HandlePaymentConfirmationHandler,
    HandlePaymentConfirmationResult,
};
