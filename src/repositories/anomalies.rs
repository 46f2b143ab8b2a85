use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, QuerySelect, Set};
use std::sync::{Arc, Mutex};
use tracing::{error, instrument};

use super::{BaseRepository, Repository};
use crate::entities::payment_anomaly::{self, Column, Entity as AnomalyEntity};
use crate::errors::ServiceError;
use crate::models::{AnomalyKind, PaymentAnomaly};

/// Durable log of verified webhooks that need an operator.
#[async_trait]
pub trait AnomalyRepository: Send + Sync {
    async fn record(&self, anomaly: PaymentAnomaly) -> Result<(), ServiceError>;

    /// Most recent anomalies first.
    async fn list_recent(&self, limit: u64) -> Result<Vec<PaymentAnomaly>, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct SeaOrmAnomalyRepository {
    base: BaseRepository,
}

impl SeaOrmAnomalyRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

fn to_domain(model: payment_anomaly::Model) -> Result<PaymentAnomaly, ServiceError> {
    let kind = model.kind.parse::<AnomalyKind>().map_err(|_| {
        ServiceError::Internal(format!("anomaly {} has unknown kind {}", model.id, model.kind))
    })?;
    Ok(PaymentAnomaly {
        id: model.id,
        kind,
        event: model.event,
        gateway_order_id: model.gateway_order_id,
        gateway_payment_id: model.gateway_payment_id,
        order_id: model.order_id,
        expected_amount: model.expected_amount,
        received_amount: model.received_amount,
        expected_currency: model.expected_currency,
        received_currency: model.received_currency,
        raw_payload: model.raw_payload,
        created_at: model.created_at,
    })
}

#[async_trait]
impl AnomalyRepository for SeaOrmAnomalyRepository {
    #[instrument(skip(self, anomaly), fields(kind = %anomaly.kind, gateway_order_id = ?anomaly.gateway_order_id))]
    async fn record(&self, anomaly: PaymentAnomaly) -> Result<(), ServiceError> {
        payment_anomaly::ActiveModel {
            id: Set(anomaly.id),
            kind: Set(anomaly.kind.to_string()),
            event: Set(anomaly.event),
            gateway_order_id: Set(anomaly.gateway_order_id),
            gateway_payment_id: Set(anomaly.gateway_payment_id),
            order_id: Set(anomaly.order_id),
            expected_amount: Set(anomaly.expected_amount),
            received_amount: Set(anomaly.received_amount),
            expected_currency: Set(anomaly.expected_currency),
            received_currency: Set(anomaly.received_currency),
            raw_payload: Set(anomaly.raw_payload),
            created_at: Set(anomaly.created_at),
        }
        .insert(self.base.get_db())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to record payment anomaly");
            ServiceError::from(e)
        })?;
        Ok(())
    }

    async fn list_recent(&self, limit: u64) -> Result<Vec<PaymentAnomaly>, ServiceError> {
        AnomalyEntity::find()
            .order_by_desc(Column::CreatedAt)
            .limit(limit)
            .all(self.base.get_db())
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAnomalyRepository {
    entries: Mutex<Vec<PaymentAnomaly>>,
}

impl InMemoryAnomalyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, oldest first.
    pub fn all(&self) -> Vec<PaymentAnomaly> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AnomalyRepository for InMemoryAnomalyRepository {
    async fn record(&self, anomaly: PaymentAnomaly) -> Result<(), ServiceError> {
        self.entries
            .lock()
            .map_err(|_| ServiceError::Internal("anomaly log lock poisoned".to_string()))?
            .push(anomaly);
        Ok(())
    }

    async fn list_recent(&self, limit: u64) -> Result<Vec<PaymentAnomaly>, ServiceError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ServiceError::Internal("anomaly log lock poisoned".to_string()))?;
        Ok(entries.iter().rev().take(limit as usize).cloned().collect())
    }
}
