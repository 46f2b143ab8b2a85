use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::variant::{Variant, VariantSelector};
use crate::errors::ServiceError;

/// Catalog product with its embedded priced variants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// ISO-4217 code every variant price is expressed in.
    pub currency: String,
    pub variants: Vec<Variant>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Product {
    /// Picks the single purchasable variant named by `selector`.
    pub fn resolve(&self, selector: &VariantSelector) -> Result<&Variant, ServiceError> {
        let mut matching = self.variants.iter().filter(|v| v.matches(selector));
        let variant = matching.next().ok_or_else(|| {
            ServiceError::InvalidVariant(format!("no {} variant on product {}", selector, self.id))
        })?;
        if matching.next().is_some() {
            return Err(ServiceError::InvalidVariant(format!(
                "selector {} is ambiguous on product {}",
                selector, self.id
            )));
        }
        if variant.price() <= 0 {
            return Err(ServiceError::InvalidVariant(format!(
                "variant {} of product {} is not purchasable",
                selector, self.id
            )));
        }
        Ok(variant)
    }
}
