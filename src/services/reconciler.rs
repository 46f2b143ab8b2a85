//! Applies verified payment-provider callbacks to orders.
//!
//! Every delivery is authenticated before anything else happens. After that
//! the callback is always acknowledged; business problems become
//! [`Disposition`]s and, where an operator has to look, a stored
//! [`PaymentAnomaly`]. Only a storage outage is surfaced as an error so the
//! provider retries.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::models::{AnomalyKind, Order, OrderPatch, OrderStatus, PaymentAnomaly};
use crate::repositories::{AnomalyRepository, OrderRepository};
use crate::services::notifications::{NotificationDispatcher, OrderSummary};
use crate::webhooks::{
    parse_webhook, ParsedWebhook, PaymentEvent, PaymentEventKind, PaymentSignatureVerifier,
};

/// Outcome reported back to the provider with a `200`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Disposition {
    Completed,
    Failed,
    /// The order had already left `pending`.
    AlreadyTerminal,
    /// Another delivery of the same event won the transition.
    Duplicate,
    AmountMismatch,
    UnknownOrder,
    MalformedPayload,
    Ignored,
}

pub struct WebhookReconciler {
    verifier: PaymentSignatureVerifier,
    orders: Arc<dyn OrderRepository>,
    anomalies: Arc<dyn AnomalyRepository>,
    notifier: Arc<dyn NotificationDispatcher>,
    notification_timeout: Duration,
}

impl WebhookReconciler {
    pub fn new(
        verifier: PaymentSignatureVerifier,
        orders: Arc<dyn OrderRepository>,
        anomalies: Arc<dyn AnomalyRepository>,
        notifier: Arc<dyn NotificationDispatcher>,
        notification_timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            orders,
            anomalies,
            notifier,
            notification_timeout,
        }
    }

    /// Verifies and applies one callback.
    ///
    /// Returns `InvalidSignature` without touching storage when the body is
    /// not authentic, and `RepositoryUnavailable` when storage fails midway.
    #[instrument(skip_all, fields(body_len = raw_body.len()))]
    pub async fn handle_callback(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<Disposition, ServiceError> {
        if let Err(e) = self.verifier.verify(raw_body, signature) {
            counter!("payment_webhook_signature_failures_total", 1);
            warn!(
                signature_present = signature.is_some(),
                "Rejected payment webhook with invalid signature"
            );
            return Err(e);
        }

        let disposition = self.reconcile(raw_body).await?;
        counter!("payment_webhooks_total", 1, "disposition" => disposition.to_string());
        info!(%disposition, "Payment webhook processed");
        Ok(disposition)
    }

    async fn reconcile(&self, raw_body: &[u8]) -> Result<Disposition, ServiceError> {
        let raw = String::from_utf8_lossy(raw_body).into_owned();

        let event = match parse_webhook(raw_body) {
            Ok(ParsedWebhook::Payment(event)) => event,
            Ok(ParsedWebhook::Ignored { event }) => {
                debug!(%event, "Ignoring payment webhook event");
                return Ok(Disposition::Ignored);
            }
            Err(e) => {
                warn!(error = %e, "Verified payment webhook could not be parsed");
                self.anomalies
                    .record(PaymentAnomaly::new(AnomalyKind::MalformedPayload, raw))
                    .await?;
                return Ok(Disposition::MalformedPayload);
            }
        };

        let order = match self.order_for(&event).await {
            Ok(order) => order,
            Err(unknown @ ServiceError::UnknownOrder(_)) => {
                warn!(error = %unknown, event = %event.event, "Payment webhook for unknown order");
                let mut anomaly = Self::anomaly_for(AnomalyKind::UnknownOrder, &event, raw);
                anomaly.received_amount = Some(event.amount);
                anomaly.received_currency = Some(event.currency.clone());
                self.anomalies.record(anomaly).await?;
                return Ok(Disposition::UnknownOrder);
            }
            Err(e) => return Err(e),
        };

        if order.status.is_terminal() {
            if Self::is_stray_capture(&order, &event) {
                self.record_stray_capture(&order, &event, raw).await?;
            } else {
                debug!(order_id = %order.id, status = %order.status, "Order already terminal");
            }
            return Ok(Disposition::AlreadyTerminal);
        }

        if event.kind == PaymentEventKind::Captured {
            if let Err(mismatch) = Self::check_amount(&order, &event) {
                return self.record_mismatch(&order, &event, raw, mismatch).await;
            }
        }

        let target = event.kind.target_status();
        let patch = OrderPatch {
            gateway_payment_id: event.gateway_payment_id.clone(),
        };
        let won = self
            .orders
            .compare_and_swap_status(order.id, OrderStatus::Pending, target, patch.clone())
            .await?;

        if !won {
            debug!(order_id = %order.id, "Lost transition race; treating as duplicate");
            return Ok(Disposition::Duplicate);
        }

        info!(
            order_id = %order.id,
            gateway_order_id = %order.gateway_order_id,
            status = %target,
            "Order transitioned"
        );

        match target {
            OrderStatus::Completed => {
                let mut completed = order;
                completed.apply_transition(OrderStatus::Pending, target, &patch);
                self.notify(&completed).await;
                Ok(Disposition::Completed)
            }
            _ => Ok(Disposition::Failed),
        }
    }

    async fn order_for(&self, event: &PaymentEvent) -> Result<Order, ServiceError> {
        self.orders
            .find_by_gateway_order_id(&event.gateway_order_id)
            .await?
            .ok_or_else(|| ServiceError::UnknownOrder(event.gateway_order_id.clone()))
    }

    fn check_amount(order: &Order, event: &PaymentEvent) -> Result<(), ServiceError> {
        if event.amount == order.amount_minor_units
            && event.currency.eq_ignore_ascii_case(&order.currency)
        {
            return Ok(());
        }
        Err(ServiceError::AmountMismatch {
            expected_amount: order.amount_minor_units,
            expected_currency: order.currency.clone(),
            received_amount: event.amount,
            received_currency: event.currency.clone(),
        })
    }

    async fn record_mismatch(
        &self,
        order: &Order,
        event: &PaymentEvent,
        raw: String,
        mismatch: ServiceError,
    ) -> Result<Disposition, ServiceError> {
        error!(
            order_id = %order.id,
            gateway_order_id = %order.gateway_order_id,
            error = %mismatch,
            "Captured payment does not match order"
        );
        self.orders
            .flag_for_review(order.id, &mismatch.to_string())
            .await?;

        let mut anomaly = Self::anomaly_for(AnomalyKind::AmountMismatch, event, raw);
        anomaly.order_id = Some(order.id);
        anomaly.expected_amount = Some(order.amount_minor_units);
        anomaly.expected_currency = Some(order.currency.clone());
        anomaly.received_amount = Some(event.amount);
        anomaly.received_currency = Some(event.currency.clone());
        self.anomalies.record(anomaly).await?;

        Ok(Disposition::AmountMismatch)
    }

    /// A capture that is not a redelivery of the one that completed the order:
    /// money was taken for a failed order, or a second payment landed.
    fn is_stray_capture(order: &Order, event: &PaymentEvent) -> bool {
        event.kind == PaymentEventKind::Captured
            && (order.status == OrderStatus::Failed
                || order.gateway_payment_id != event.gateway_payment_id)
    }

    async fn record_stray_capture(
        &self,
        order: &Order,
        event: &PaymentEvent,
        raw: String,
    ) -> Result<(), ServiceError> {
        error!(
            order_id = %order.id,
            status = %order.status,
            gateway_payment_id = ?event.gateway_payment_id,
            "Captured payment for an order that is no longer pending"
        );
        counter!("payment_webhook_stray_captures_total", 1);

        let mut anomaly = Self::anomaly_for(AnomalyKind::CaptureOnTerminalOrder, event, raw);
        anomaly.order_id = Some(order.id);
        anomaly.expected_amount = Some(order.amount_minor_units);
        anomaly.expected_currency = Some(order.currency.clone());
        anomaly.received_amount = Some(event.amount);
        anomaly.received_currency = Some(event.currency.clone());
        self.anomalies.record(anomaly).await
    }

    fn anomaly_for(kind: AnomalyKind, event: &PaymentEvent, raw: String) -> PaymentAnomaly {
        let mut anomaly = PaymentAnomaly::new(kind, raw);
        anomaly.event = Some(event.event.clone());
        anomaly.gateway_order_id = Some(event.gateway_order_id.clone());
        anomaly.gateway_payment_id = event.gateway_payment_id.clone();
        anomaly
    }

    /// Best effort: a failed or slow confirmation never undoes the completion.
    async fn notify(&self, order: &Order) {
        let Some(contact) = order.buyer_email.as_deref() else {
            warn!(order_id = %order.id, "Completed order has no buyer contact");
            return;
        };
        let summary = OrderSummary::from(order);

        match tokio::time::timeout(
            self.notification_timeout,
            self.notifier.send_purchase_confirmation(contact, &summary),
        )
        .await
        {
            Ok(Ok(())) => {
                counter!("purchase_confirmations_sent_total", 1);
            }
            Ok(Err(e)) => {
                counter!("purchase_confirmations_failed_total", 1);
                error!(order_id = %order.id, error = %e, "Purchase confirmation failed");
            }
            Err(_) => {
                counter!("purchase_confirmations_failed_total", 1);
                error!(order_id = %order.id, "Purchase confirmation timed out");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageSize, ImageVariant, License, NewOrder, Variant};
    use crate::repositories::{InMemoryAnomalyRepository, InMemoryOrderRepository};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use mockall::mock;
    use serde_json::json;
    use std::sync::Mutex;
    use uuid::Uuid;

    const SECRET: &str = "whsec_reconciler_unit_secret";

    mock! {
        pub Orders {}
        #[async_trait]
        impl OrderRepository for Orders {
            async fn insert(&self, order: Order) -> Result<Order, ServiceError>;
            async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, ServiceError>;
            async fn find_by_gateway_order_id(
                &self,
                gateway_order_id: &str,
            ) -> Result<Option<Order>, ServiceError>;
            async fn list_by_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, ServiceError>;
            async fn compare_and_swap_status(
                &self,
                order_id: Uuid,
                expected: OrderStatus,
                new: OrderStatus,
                patch: OrderPatch,
            ) -> Result<bool, ServiceError>;
            async fn flag_for_review(&self, order_id: Uuid, reason: &str) -> Result<bool, ServiceError>;
        }
    }

    mock! {
        pub Anomalies {}
        #[async_trait]
        impl AnomalyRepository for Anomalies {
            async fn record(&self, anomaly: PaymentAnomaly) -> Result<(), ServiceError>;
            async fn list_recent(&self, limit: u64) -> Result<Vec<PaymentAnomaly>, ServiceError>;
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, OrderSummary)>>,
    }

    impl RecordingNotifier {
        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotificationDispatcher for RecordingNotifier {
        async fn send_purchase_confirmation(
            &self,
            buyer_contact: &str,
            summary: &OrderSummary,
        ) -> Result<(), ServiceError> {
            self.sent
                .lock()
                .unwrap()
                .push((buyer_contact.to_string(), summary.clone()));
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl NotificationDispatcher for FailingNotifier {
        async fn send_purchase_confirmation(
            &self,
            _buyer_contact: &str,
            _summary: &OrderSummary,
        ) -> Result<(), ServiceError> {
            Err(ServiceError::NotificationFailed("relay down".into()))
        }
    }

    fn verifier() -> PaymentSignatureVerifier {
        PaymentSignatureVerifier::new(SECRET).unwrap()
    }

    fn captured(gateway_order_id: &str, amount: i64, currency: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "event": "payment.captured",
            "payload": {"payment": {"entity": {
                "id": "pay_1", "order_id": gateway_order_id,
                "amount": amount, "currency": currency, "status": "captured"
            }}}
        }))
        .unwrap()
    }

    fn pending_order(gateway_order_id: &str) -> Order {
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
            gateway_order_id: gateway_order_id.into(),
        })
    }

    struct Harness {
        reconciler: WebhookReconciler,
        orders: Arc<InMemoryOrderRepository>,
        anomalies: Arc<InMemoryAnomalyRepository>,
        notifier: Arc<RecordingNotifier>,
    }

    async fn harness_with(order: Option<Order>) -> Harness {
        let orders = Arc::new(InMemoryOrderRepository::new());
        if let Some(order) = order {
            orders.insert(order).await.unwrap();
        }
        let anomalies = Arc::new(InMemoryAnomalyRepository::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let reconciler = WebhookReconciler::new(
            verifier(),
            orders.clone(),
            anomalies.clone(),
            notifier.clone(),
            Duration::from_millis(200),
        );
        Harness {
            reconciler,
            orders,
            anomalies,
            notifier,
        }
    }

    async fn deliver(h: &Harness, body: &[u8]) -> Result<Disposition, ServiceError> {
        let sig = verifier().sign(body);
        h.reconciler.handle_callback(body, Some(&sig)).await
    }

    #[tokio::test]
    async fn bad_signature_never_touches_repositories() {
        let mut orders = MockOrders::new();
        orders.expect_find_by_gateway_order_id().never();
        orders.expect_compare_and_swap_status().never();
        orders.expect_flag_for_review().never();
        let mut anomalies = MockAnomalies::new();
        anomalies.expect_record().never();

        let reconciler = WebhookReconciler::new(
            verifier(),
            Arc::new(orders),
            Arc::new(anomalies),
            Arc::new(RecordingNotifier::default()),
            Duration::from_millis(200),
        );

        let body = captured("gw_123", 999, "USD");
        let forged = PaymentSignatureVerifier::new("some_other_secret").unwrap().sign(&body);
        assert_matches!(
            reconciler.handle_callback(&body, Some(&forged)).await,
            Err(ServiceError::InvalidSignature)
        );
        assert_matches!(
            reconciler.handle_callback(&body, None).await,
            Err(ServiceError::InvalidSignature)
        );
    }

    #[tokio::test]
    async fn capture_completes_once_and_notifies_once() {
        let h = harness_with(Some(pending_order("gw_123"))).await;
        let body = captured("gw_123", 999, "USD");

        assert_eq!(deliver(&h, &body).await.unwrap(), Disposition::Completed);
        assert_eq!(deliver(&h, &body).await.unwrap(), Disposition::AlreadyTerminal);

        let stored = h.orders.find_by_gateway_order_id("gw_123").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
        assert_eq!(stored.gateway_payment_id.as_deref(), Some("pay_1"));
        assert_eq!(h.notifier.count(), 1);
        let (contact, summary) = h.notifier.sent.lock().unwrap()[0].clone();
        assert_eq!(contact, "buyer@example.com");
        assert_eq!(summary.payment_id.as_deref(), Some("pay_1"));
    }

    #[tokio::test]
    async fn underpayment_keeps_order_pending_and_records_anomaly() {
        let h = harness_with(Some(pending_order("gw_123"))).await;

        let disposition = deliver(&h, &captured("gw_123", 899, "USD")).await.unwrap();
        assert_eq!(disposition, Disposition::AmountMismatch);

        let stored = h.orders.find_by_gateway_order_id("gw_123").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert!(stored.needs_review);
        assert_eq!(h.notifier.count(), 0);

        let recorded = h.anomalies.all();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].kind, AnomalyKind::AmountMismatch);
        assert_eq!(recorded[0].expected_amount, Some(999));
        assert_eq!(recorded[0].received_amount, Some(899));
        assert!(recorded[0].raw_payload.contains("\"amount\":899"));
    }

    #[tokio::test]
    async fn currency_mismatch_is_an_amount_mismatch() {
        let h = harness_with(Some(pending_order("gw_123"))).await;
        assert_eq!(
            deliver(&h, &captured("gw_123", 999, "INR")).await.unwrap(),
            Disposition::AmountMismatch
        );
        assert_eq!(
            deliver(&h, &captured("gw_123", 999, "usd")).await.unwrap(),
            Disposition::Completed
        );
    }

    #[tokio::test]
    async fn failed_payment_fails_order_without_notification() {
        let h = harness_with(Some(pending_order("gw_123"))).await;
        let body = serde_json::to_vec(&json!({
            "event": "payment.failed",
            "payload": {"payment": {"entity": {
                "id": "pay_2", "order_id": "gw_123", "amount": 999, "currency": "USD"
            }}}
        }))
        .unwrap();

        assert_eq!(deliver(&h, &body).await.unwrap(), Disposition::Failed);
        let stored = h.orders.find_by_gateway_order_id("gw_123").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Failed);
        assert_eq!(h.notifier.count(), 0);
    }

    fn captured_with_payment(gateway_order_id: &str, payment_id: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "event": "payment.captured",
            "payload": {"payment": {"entity": {
                "id": payment_id, "order_id": gateway_order_id,
                "amount": 999, "currency": "USD", "status": "captured"
            }}}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn capture_after_failure_is_recorded_for_review() {
        let h = harness_with(Some(pending_order("gw_1"))).await;
        let failed = serde_json::to_vec(&json!({
            "event": "payment.failed",
            "payload": {"payment": {"entity": {
                "id": "pay_a", "order_id": "gw_1", "amount": 999, "currency": "USD"
            }}}
        }))
        .unwrap();

        assert_eq!(deliver(&h, &failed).await.unwrap(), Disposition::Failed);
        assert_eq!(
            deliver(&h, &captured_with_payment("gw_1", "pay_b")).await.unwrap(),
            Disposition::AlreadyTerminal
        );

        let stored = h.orders.find_by_gateway_order_id("gw_1").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Failed);
        assert!(stored.gateway_payment_id.is_none());
        assert_eq!(h.notifier.count(), 0);

        let recorded = h.anomalies.all();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].kind, AnomalyKind::CaptureOnTerminalOrder);
        assert_eq!(recorded[0].order_id, Some(stored.id));
        assert_eq!(recorded[0].gateway_payment_id.as_deref(), Some("pay_b"));
        assert_eq!(recorded[0].received_amount, Some(999));
        assert!(recorded[0].raw_payload.contains("pay_b"));
    }

    #[tokio::test]
    async fn second_capture_on_completed_order_is_recorded_for_review() {
        let h = harness_with(Some(pending_order("gw_1"))).await;

        assert_eq!(
            deliver(&h, &captured_with_payment("gw_1", "pay_a")).await.unwrap(),
            Disposition::Completed
        );
        // Same payment redelivered: nothing to review
        assert_eq!(
            deliver(&h, &captured_with_payment("gw_1", "pay_a")).await.unwrap(),
            Disposition::AlreadyTerminal
        );
        assert!(h.anomalies.all().is_empty());

        assert_eq!(
            deliver(&h, &captured_with_payment("gw_1", "pay_b")).await.unwrap(),
            Disposition::AlreadyTerminal
        );

        let stored = h.orders.find_by_gateway_order_id("gw_1").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
        assert_eq!(stored.gateway_payment_id.as_deref(), Some("pay_a"));
        assert_eq!(h.notifier.count(), 1);

        let recorded = h.anomalies.all();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].kind, AnomalyKind::CaptureOnTerminalOrder);
        assert_eq!(recorded[0].order_id, Some(stored.id));
        assert_eq!(recorded[0].gateway_payment_id.as_deref(), Some("pay_b"));
    }

    #[tokio::test]
    async fn unknown_and_malformed_payloads_are_acknowledged_as_anomalies() {
        let h = harness_with(None).await;

        assert_eq!(
            deliver(&h, &captured("gw_missing", 999, "USD")).await.unwrap(),
            Disposition::UnknownOrder
        );
        assert_eq!(
            deliver(&h, br#"{"event":"payment.captured","payload":{}}"#).await.unwrap(),
            Disposition::MalformedPayload
        );
        assert_eq!(
            deliver(&h, br#"{"event":"refund.created","payload":{}}"#).await.unwrap(),
            Disposition::Ignored
        );

        let kinds: Vec<_> = h.anomalies.all().into_iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AnomalyKind::UnknownOrder, AnomalyKind::MalformedPayload]);
    }

    #[tokio::test]
    async fn lookup_distinguishes_unknown_order_from_outage() {
        let h = harness_with(None).await;
        let event = match parse_webhook(&captured("gw_missing", 999, "USD")).unwrap() {
            ParsedWebhook::Payment(event) => event,
            other => panic!("unexpected parse result: {:?}", other),
        };

        assert_matches!(
            h.reconciler.order_for(&event).await,
            Err(ServiceError::UnknownOrder(id)) if id == "gw_missing"
        );

        h.orders.set_unavailable(true);
        assert_matches!(
            h.reconciler.order_for(&event).await,
            Err(ServiceError::RepositoryUnavailable(_))
        );
    }

    #[tokio::test]
    async fn lost_race_is_reported_as_duplicate() {
        let order = pending_order("gw_123");
        let mut orders = MockOrders::new();
        let found = order.clone();
        orders
            .expect_find_by_gateway_order_id()
            .returning(move |_| Ok(Some(found.clone())));
        orders
            .expect_compare_and_swap_status()
            .times(1)
            .returning(|_, _, _, _| Ok(false));

        let notifier = Arc::new(RecordingNotifier::default());
        let reconciler = WebhookReconciler::new(
            verifier(),
            Arc::new(orders),
            Arc::new(InMemoryAnomalyRepository::new()),
            notifier.clone(),
            Duration::from_millis(200),
        );

        let body = captured("gw_123", 999, "USD");
        let sig = verifier().sign(&body);
        assert_eq!(
            reconciler.handle_callback(&body, Some(&sig)).await.unwrap(),
            Disposition::Duplicate
        );
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn notification_failure_does_not_undo_completion() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        orders.insert(pending_order("gw_123")).await.unwrap();
        let reconciler = WebhookReconciler::new(
            verifier(),
            orders.clone(),
            Arc::new(InMemoryAnomalyRepository::new()),
            Arc::new(FailingNotifier),
            Duration::from_millis(200),
        );

        let body = captured("gw_123", 999, "USD");
        let sig = verifier().sign(&body);
        assert_eq!(
            reconciler.handle_callback(&body, Some(&sig)).await.unwrap(),
            Disposition::Completed
        );
        let stored = orders.find_by_gateway_order_id("gw_123").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn storage_outage_surfaces_as_transient_error() {
        let h = harness_with(Some(pending_order("gw_123"))).await;
        h.orders.set_unavailable(true);

        let err = deliver(&h, &captured("gw_123", 999, "USD")).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(h.notifier.count(), 0);
    }

    #[test]
    fn dispositions_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(Disposition::AlreadyTerminal).unwrap(),
            json!("already_terminal")
        );
        assert_eq!(Disposition::AmountMismatch.to_string(), "amount_mismatch");
    }
}
