use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Why a verified webhook could not be applied automatically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnomalyKind {
    AmountMismatch,
    UnknownOrder,
    MalformedPayload,
    /// A capture for an order that had already failed or completed with
    /// another payment.
    CaptureOnTerminalOrder,
}

/// Operator-review record. `raw_payload` is the verified body exactly as
/// received.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAnomaly {
    pub id: Uuid,
    pub kind: AnomalyKind,
    pub event: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub order_id: Option<Uuid>,
    pub expected_amount: Option<i64>,
    pub received_amount: Option<i64>,
    pub expected_currency: Option<String>,
    pub received_currency: Option<String>,
    pub raw_payload: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentAnomaly {
    pub fn new(kind: AnomalyKind, raw_payload: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            event: None,
            gateway_order_id: None,
            gateway_payment_id: None,
            order_id: None,
            expected_amount: None,
            received_amount: None,
            expected_currency: None,
            received_currency: None,
            raw_payload: raw_payload.into(),
            created_at: Utc::now(),
        }
    }
}
