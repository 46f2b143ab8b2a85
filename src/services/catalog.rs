use async_trait::async_trait;
use dashmap::DashMap;
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::entities::product::Entity as ProductEntity;
use crate::errors::ServiceError;
use crate::models::{Product, Variant, VariantSelector};
use crate::repositories::{BaseRepository, Repository};

/// Authoritative price, license and currency for one selected variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedVariant {
    pub product_id: Uuid,
    pub product_name: String,
    pub currency: String,
    pub variant: Variant,
}

impl ResolvedVariant {
    fn from_product(product: &Product, selector: &VariantSelector) -> Result<Self, ServiceError> {
        let variant = product.resolve(selector)?;
        Ok(Self {
            product_id: product.id,
            product_name: product.name.clone(),
            currency: product.currency.to_ascii_uppercase(),
            variant: variant.clone(),
        })
    }
}

/// Read-only view of the product catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// `NotFound` when the product is absent or inactive, `InvalidVariant`
    /// when the selector does not name exactly one purchasable variant.
    async fn get_variant(
        &self,
        product_id: Uuid,
        selector: &VariantSelector,
    ) -> Result<ResolvedVariant, ServiceError>;
}

fn product_not_found(product_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("product {} not found", product_id))
}

/// Catalog reads from the `products` table.
#[derive(Debug, Clone)]
pub struct SeaOrmCatalogStore {
    base: BaseRepository,
}

impl SeaOrmCatalogStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl CatalogStore for SeaOrmCatalogStore {
    #[instrument(skip(self, selector), fields(selector = %selector))]
    async fn get_variant(
        &self,
        product_id: Uuid,
        selector: &VariantSelector,
    ) -> Result<ResolvedVariant, ServiceError> {
        let row = ProductEntity::find_by_id(product_id)
            .one(self.base.get_db())
            .await?
            .filter(|row| row.is_active)
            .ok_or_else(|| product_not_found(product_id))?;

        let variants: Vec<Variant> = serde_json::from_value(row.variants).map_err(|e| {
            error!(error = %e, %product_id, "Product has unreadable variants");
            ServiceError::Internal(format!("product {} has unreadable variants", product_id))
        })?;

        let product = Product {
            id: row.id,
            name: row.name,
            currency: row.currency,
            variants,
            active: row.is_active,
        };
        ResolvedVariant::from_product(&product, selector)
    }
}

/// Catalog held in memory; seeded by tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    products: DashMap<Uuid, Product>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, product: Product) {
        self.products.insert(product.id, product);
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn get_variant(
        &self,
        product_id: Uuid,
        selector: &VariantSelector,
    ) -> Result<ResolvedVariant, ServiceError> {
        let product = self
            .products
            .get(&product_id)
            .filter(|p| p.active)
            .ok_or_else(|| product_not_found(product_id))?;
        ResolvedVariant::from_product(&product, selector)
    }
}
