//! Messaging adapters - Chat delivery implementations.

mod logging_sender;

pub use logging_sender::LoggingMessageSender;
