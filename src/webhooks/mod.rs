//! Inbound payment-provider webhooks
pub mod payload;
pub mod signature;

pub use payload::{parse_webhook, ParsedWebhook, PayloadError, PaymentEvent, PaymentEventKind};
pub use signature::PaymentSignatureVerifier;
