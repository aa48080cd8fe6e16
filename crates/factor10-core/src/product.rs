use crate::fixed::Fixed64;
use crate::id::ProductId;

/// A product type moved between sources and sinks.
///
/// Sinks match incoming products by `name`, not by id: two products declared
/// with the same name are interchangeable.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price used for profit.
    pub price: Fixed64,
    /// Free-form color tag, passed through to presentation.
    pub color: Option<String>,
    /// Visual asset used when this product travels along a link.
    pub asset_name: String,
    pub asset_scale: f64,
}

impl Product {
    pub const DEFAULT_NAME: &'static str = "Unknown Product";
    pub const DEFAULT_ASSET: &'static str = "pyramid";

    pub fn new(id: ProductId) -> Self {
        Self {
            id,
            name: Self::DEFAULT_NAME.to_string(),
            price: Fixed64::ZERO,
            color: None,
            asset_name: Self::DEFAULT_ASSET.to_string(),
            asset_scale: 1.0,
        }
    }

    /// Associate a visual asset. Placement offsets are ignored for products;
    /// only the asset name and scale travel with the item.
    pub fn set_asset(&mut self, name: impl Into<String>, scale: f64) {
        self.asset_name = name.into();
        self.asset_scale = scale;
    }

    /// Whether `other` is accepted wherever this product is expected.
    pub fn matches(&self, other: &Product) -> bool {
        self.name == other.name
    }
}
