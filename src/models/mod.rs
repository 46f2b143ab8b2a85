pub mod anomaly;
pub mod order;
pub mod product;
pub mod variant;

pub use anomaly::{AnomalyKind, PaymentAnomaly};
pub use order::{NewOrder, Order, OrderPatch, OrderStatus};
pub use product::Product;
pub use variant::{
    DocumentFormat, DocumentVariant, ImageSize, ImageVariant, License, Variant, VariantSelector,
    VideoQuality, VideoVariant,
};
