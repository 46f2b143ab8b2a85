use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod anomalies;
pub mod orders;

pub use anomalies::{AnomalyRepository, InMemoryAnomalyRepository, SeaOrmAnomalyRepository};
pub use orders::{InMemoryOrderRepository, OrderRepository, SeaOrmOrderRepository};

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

/// Shared handle to the injected connection pool.
#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
