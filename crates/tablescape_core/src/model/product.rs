//! Catalog product domain model.
//!
//! # Responsibility
//! - Define the immutable catalog entry shared by placement and UI layers.
//! - Validate scale metadata before any placement math consumes it.
//!
//! # Invariants
//! - Products are created from the static catalog document and never mutated
//!   at runtime.
//! - `real_world_scale` is a positive, finite length in meters.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a catalog product.
pub type ProductId = Uuid;

/// Closed set of catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Plates,
    Cups,
    Bowls,
    Centerpieces,
    Cutlery,
}

impl ProductCategory {
    /// Stable string id used in catalog documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plates => "plates",
            Self::Cups => "cups",
            Self::Bowls => "bowls",
            Self::Centerpieces => "centerpieces",
            Self::Cutlery => "cutlery",
        }
    }

    /// Localized display label for the category.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Plates => "أطباق",
            Self::Cups => "أكواب",
            Self::Bowls => "أوعية",
            Self::Centerpieces => "قطع مركزية",
            Self::Cutlery => "أدوات المائدة",
        }
    }

    /// All categories in catalog display order.
    pub fn all() -> &'static [ProductCategory] {
        &[
            Self::Plates,
            Self::Cups,
            Self::Bowls,
            Self::Centerpieces,
            Self::Cutlery,
        ]
    }
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Stable global ID referenced by placed-product records.
    pub id: ProductId,
    pub name: String,
    /// Localized (Arabic) display name.
    pub localized_name: String,
    pub category: ProductCategory,
    /// Reference to the 3D model asset resolved by the host renderer.
    pub model_reference: String,
    pub thumbnail_reference: Option<String>,
    /// Physical footprint of the real object, in meters.
    pub real_world_scale: f32,
    pub description: Option<String>,
    pub localized_description: Option<String>,
}

impl Product {
    /// Validates scale metadata for placement use.
    ///
    /// # Errors
    /// - `InvalidRealWorldScale` when scale is non-positive or non-finite.
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        if !self.real_world_scale.is_finite() || self.real_world_scale <= 0.0 {
            return Err(ProductValidationError::InvalidRealWorldScale {
                product_id: self.id,
                value: self.real_world_scale,
            });
        }
        Ok(())
    }
}

/// Product metadata validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductValidationError {
    InvalidRealWorldScale { product_id: ProductId, value: f32 },
}

impl Display for ProductValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRealWorldScale { product_id, value } => write!(
                f,
                "product {product_id} has invalid real_world_scale {value}; expected a positive finite length in meters"
            ),
        }
    }
}

impl Error for ProductValidationError {}
