use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_anomalies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// snake_case `AnomalyKind` name, e.g. `capture_on_terminal_order`.
    pub kind: String,
    pub event: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub order_id: Option<Uuid>,
    pub expected_amount: Option<i64>,
    pub received_amount: Option<i64>,
    pub expected_currency: Option<String>,
    pub received_currency: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub raw_payload: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
