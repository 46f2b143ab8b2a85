use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::variant::Variant;

/// Order lifecycle: `Pending` is the only non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

/// Fields written together with a status transition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderPatch {
    /// Provider payment id; only meaningful when completing.
    pub gateway_payment_id: Option<String>,
}

impl OrderPatch {
    pub fn completed(gateway_payment_id: impl Into<String>) -> Self {
        Self {
            gateway_payment_id: Some(gateway_payment_id.into()),
        }
    }
}

/// One purchase attempt for one priced variant of one product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: String,
    pub buyer_email: Option<String>,
    pub product_id: Uuid,
    pub product_name: String,
    pub variant: Variant,
    pub amount_minor_units: i64,
    pub currency: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub status: OrderStatus,
    pub needs_review: bool,
    pub review_reason: Option<String>,
    pub download_url: Option<String>,
    pub preview_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to place a `pending` order.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub buyer_id: String,
    pub buyer_email: Option<String>,
    pub product_id: Uuid,
    pub product_name: String,
    pub variant: Variant,
    pub currency: String,
    pub gateway_order_id: String,
}

impl Order {
    /// Builds a fresh `pending` order. The amount is taken from the variant
    /// snapshot and never supplied separately.
    pub fn new_pending(new: NewOrder) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            amount_minor_units: new.variant.price(),
            buyer_id: new.buyer_id,
            buyer_email: new.buyer_email,
            product_id: new.product_id,
            product_name: new.product_name,
            variant: new.variant,
            currency: new.currency,
            gateway_order_id: new.gateway_order_id,
            gateway_payment_id: None,
            status: OrderStatus::Pending,
            needs_review: false,
            review_reason: None,
            download_url: None,
            preview_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Short human reference: the last six characters of the id, upper-cased.
    pub fn reference(&self) -> String {
        let id = self.id.simple().to_string();
        id[id.len() - 6..].to_ascii_uppercase()
    }

    /// Applies a transition to an in-memory copy. Returns false, leaving the
    /// order untouched, when the current status is not `expected`.
    pub fn apply_transition(
        &mut self,
        expected: OrderStatus,
        new: OrderStatus,
        patch: &OrderPatch,
    ) -> bool {
        if self.status != expected {
            return false;
        }
        self.status = new;
        if new == OrderStatus::Completed {
            self.gateway_payment_id = patch.gateway_payment_id.clone();
        }
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::variant::{ImageSize, ImageVariant, License};

    fn sample_order() -> Order {
        Order::new_pending(NewOrder {
            buyer_id: "buyer-1".into(),
            buyer_email: Some("buyer@example.com".into()),
            product_id: Uuid::new_v4(),
            product_name: "Neon Skyline".into(),
            variant: Variant::Image(ImageVariant {
                size: ImageSize::Square,
                price: 999,
                license: License::Personal,
            }),
            currency: "USD".into(),
            gateway_order_id: "gw_123".into(),
        })
    }

    #[test]
    fn new_order_is_pending_with_variant_price() {
        let order = sample_order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.amount_minor_units, 999);
        assert!(order.gateway_payment_id.is_none());
        assert!(!order.needs_review);
    }

    #[test]
    fn transition_requires_expected_status() {
        let mut order = sample_order();
        assert!(order.apply_transition(
            OrderStatus::Pending,
            OrderStatus::Completed,
            &OrderPatch::completed("pay_1")
        ));
        assert_eq!(order.gateway_payment_id.as_deref(), Some("pay_1"));

        assert!(!order.apply_transition(
            OrderStatus::Pending,
            OrderStatus::Failed,
            &OrderPatch::default()
        ));
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[test]
    fn failing_does_not_set_payment_id() {
        let mut order = sample_order();
        assert!(order.apply_transition(
            OrderStatus::Pending,
            OrderStatus::Failed,
            &OrderPatch::completed("pay_ignored")
        ));
        assert!(order.gateway_payment_id.is_none());
    }

    #[test]
    fn reference_is_six_uppercase_chars() {
        let order = sample_order();
        let reference = order.reference();
        assert_eq!(reference.len(), 6);
        assert_eq!(reference, reference.to_ascii_uppercase());
    }

    #[test]
    fn status_round_trips_through_strings() {
        assert_eq!(OrderStatus::Completed.to_string(), "completed");
        assert_eq!("failed".parse::<OrderStatus>().unwrap(), OrderStatus::Failed);
        assert!(OrderStatus::Failed.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }
}
