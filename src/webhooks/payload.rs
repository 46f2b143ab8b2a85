//! Parsing of the provider's callback envelope into a normalized event.
//!
//! The provider wraps entities as
//! `{"event": "...", "payload": {"payment": {"entity": {...}}, "order": {"entity": {...}}}}`.

use serde::Deserialize;
use thiserror::Error;

use crate::models::OrderStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload is not a valid webhook envelope: {0}")]
    Malformed(String),
    #[error("event {0} carries no payment or order entity")]
    MissingEntity(String),
}

/// Business meaning of a provider event for the order state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentEventKind {
    Captured,
    Failed,
    Expired,
}

impl PaymentEventKind {
    fn from_event_name(event: &str) -> Option<Self> {
        match event {
            "payment.captured" | "order.paid" => Some(Self::Captured),
            "payment.failed" => Some(Self::Failed),
            "payment.expired" | "order.expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Status the order moves to when this event applies.
    pub fn target_status(self) -> OrderStatus {
        match self {
            Self::Captured => OrderStatus::Completed,
            Self::Failed | Self::Expired => OrderStatus::Failed,
        }
    }
}

/// A verified provider event reduced to the fields reconciliation needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentEvent {
    pub event: String,
    pub kind: PaymentEventKind,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount: i64,
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedWebhook {
    Payment(PaymentEvent),
    /// Authentic, but not an event this service acts on.
    Ignored { event: String },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: EnvelopePayload,
}

#[derive(Debug, Default, Deserialize)]
struct EnvelopePayload {
    payment: Option<Wrapped<PaymentEntity>>,
    order: Option<Wrapped<GatewayOrderEntity>>,
}

#[derive(Debug, Deserialize)]
struct Wrapped<T> {
    entity: T,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    order_id: Option<String>,
    amount: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct GatewayOrderEntity {
    id: String,
    amount: i64,
    #[serde(default)]
    amount_paid: Option<i64>,
    currency: String,
}

pub fn parse_webhook(raw: &[u8]) -> Result<ParsedWebhook, PayloadError> {
    let envelope: Envelope =
        serde_json::from_slice(raw).map_err(|e| PayloadError::Malformed(e.to_string()))?;

    let kind = match PaymentEventKind::from_event_name(&envelope.event) {
        Some(kind) => kind,
        None => {
            return Ok(ParsedWebhook::Ignored {
                event: envelope.event,
            })
        }
    };

    let EnvelopePayload { payment, order } = envelope.payload;
    let order = order.map(|w| w.entity);

    let event = match (payment.map(|w| w.entity), order) {
        (Some(payment), order) => {
            let gateway_order_id = payment
                .order_id
                .filter(|id| !id.is_empty())
                .or_else(|| order.map(|o| o.id))
                .ok_or_else(|| PayloadError::MissingEntity(envelope.event.clone()))?;
            PaymentEvent {
                event: envelope.event,
                kind,
                gateway_order_id,
                gateway_payment_id: Some(payment.id),
                amount: payment.amount,
                currency: payment.currency.to_ascii_uppercase(),
            }
        }
        (None, Some(order)) if kind != PaymentEventKind::Captured => PaymentEvent {
            event: envelope.event,
            kind,
            gateway_order_id: order.id,
            gateway_payment_id: None,
            amount: order.amount_paid.filter(|paid| *paid > 0).unwrap_or(order.amount),
            currency: order.currency.to_ascii_uppercase(),
        },
        _ => return Err(PayloadError::MissingEntity(envelope.event)),
    };

    Ok(ParsedWebhook::Payment(event))
}
