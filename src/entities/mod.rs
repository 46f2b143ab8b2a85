pub mod order;
pub mod payment_anomaly;
pub mod product;
