//! Product catalog loading and lookup.
//!
//! # Responsibility
//! - Load the static catalog document and expose it as an immutable
//!   snapshot object.
//! - Provide id lookup, category filtering and simple search.
//!
//! # Invariants
//! - The catalog never mutates after load.
//! - Individually corrupt catalog records are skipped, not fatal.

use crate::model::product::{Product, ProductCategory, ProductId};
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Catalog document loading errors.
#[derive(Debug)]
pub enum CatalogError {
    /// Document could not be read from disk.
    Io(std::io::Error),
    /// Document is not a JSON object with a `products` array.
    MalformedDocument(String),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read catalog document: {err}"),
            Self::MalformedDocument(message) => {
                write!(f, "malformed catalog document: {message}")
            }
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::MalformedDocument(_) => None,
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Result of one catalog load, with corruption accounting.
#[derive(Debug)]
pub struct CatalogLoadOutcome {
    pub catalog: ProductCatalog,
    /// Records dropped because they failed to parse or validate.
    pub skipped_records: usize,
}

/// Immutable catalog snapshot.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    /// Wraps already-validated products (test and import paths).
    pub fn from_products(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Looks one product up by stable id.
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    /// All products in one category, in document order.
    pub fn in_category(&self, category: ProductCategory) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|product| product.category == category)
            .collect()
    }

    /// Case-insensitive search over names and category labels.
    ///
    /// An empty query returns the whole catalog, matching the gallery's
    /// type-as-you-search behavior.
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return self.products.iter().collect();
        }

        let lowered = trimmed.to_lowercase();
        self.products
            .iter()
            .filter(|product| {
                product.name.to_lowercase().contains(&lowered)
                    || product.localized_name.contains(trimmed)
                    || product.category.display_name().contains(trimmed)
                    || product.category.as_str().contains(&lowered)
            })
            .collect()
    }
}

/// Loads the catalog document from a file path.
pub fn load_catalog_file(path: impl AsRef<Path>) -> Result<CatalogLoadOutcome, CatalogError> {
    let document = std::fs::read_to_string(path)?;
    load_catalog_document(&document)
}

/// Parses a catalog document, skipping individually corrupt records.
///
/// # Errors
/// - `MalformedDocument` when the document itself is not `{ "products": [...] }`.
pub fn load_catalog_document(document: &str) -> Result<CatalogLoadOutcome, CatalogError> {
    let root: Value = serde_json::from_str(document)
        .map_err(|err| CatalogError::MalformedDocument(err.to_string()))?;
    let entries = root
        .get("products")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            CatalogError::MalformedDocument("missing `products` array".to_string())
        })?;

    let mut products = Vec::new();
    let mut skipped_records = 0;
    for entry in entries {
        let product: Product = match serde_json::from_value(entry.clone()) {
            Ok(product) => product,
            Err(err) => {
                warn!(
                    "event=catalog_load module=catalog status=skip error_code=record_unparseable error={err}"
                );
                skipped_records += 1;
                continue;
            }
        };

        if let Err(err) = product.validate() {
            warn!(
                "event=catalog_load module=catalog status=skip product_id={} error_code=record_invalid error={err}",
                product.id
            );
            skipped_records += 1;
            continue;
        }

        products.push(product);
    }

    info!(
        "event=catalog_load module=catalog status=ok products={} skipped={skipped_records}",
        products.len()
    );

    Ok(CatalogLoadOutcome {
        catalog: ProductCatalog::from_products(products),
        skipped_records,
    })
}
