//! Formation snapshot domain model.
//!
//! # Responsibility
//! - Define the persisted shape of one captured arrangement: reference image
//!   plus the list of placed products.
//! - Validate stored records before they re-enter the live model.
//!
//! # Invariants
//! - `PlacedProduct::product_id` must resolve to a real catalog product;
//!   identity is tagged at placement time, never re-derived later.
//! - `image_path` is relative to the formations directory so the store stays
//!   valid if that directory moves.

use crate::model::product::ProductId;
use crate::model::transform::{
    decode_quat, decode_vec3, encode_quat, encode_vec3, QuatRecord, Transform, TransformCodecError,
    Vec3Record,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for one persisted formation.
pub type FormationId = Uuid;

/// Stable identifier for one placed-product record.
pub type PlacedProductId = Uuid;

/// One anchored product instance at formation-capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedProduct {
    pub id: PlacedProductId,
    /// Catalog product this instance was placed from.
    pub product_id: ProductId,
    pub position: Vec3Record,
    pub rotation: QuatRecord,
    pub scale: Vec3Record,
}

impl PlacedProduct {
    /// Builds a record from a live transform read at capture time.
    pub fn from_transform(product_id: ProductId, transform: &Transform) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            position: encode_vec3(transform.translation),
            rotation: encode_quat(transform.rotation),
            scale: encode_vec3(transform.scale),
        }
    }

    /// Decodes the stored records back into a live transform.
    ///
    /// # Errors
    /// - Codec validation errors for non-finite components or a drifted
    ///   quaternion magnitude (corrupted storage).
    pub fn to_transform(&self) -> Result<Transform, TransformCodecError> {
        Ok(Transform {
            translation: decode_vec3(&self.position)?,
            rotation: decode_quat(&self.rotation)?,
            scale: decode_vec3(&self.scale)?,
        })
    }

    /// Validates stored numeric records without materializing a transform.
    pub fn validate(&self) -> Result<(), TransformCodecError> {
        self.to_transform().map(|_| ())
    }
}

/// Named, persisted collection of placed products plus a reference image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationSnapshot {
    pub id: FormationId,
    pub name: String,
    /// Creation time in unix epoch milliseconds.
    pub created_at_epoch_ms: i64,
    /// Image filename relative to the formations directory.
    pub image_path: String,
    pub products: Vec<PlacedProduct>,
}

impl FormationSnapshot {
    /// Creates a snapshot with a fresh id and the current timestamp.
    pub fn new(
        name: impl Into<String>,
        image_path: impl Into<String>,
        products: Vec<PlacedProduct>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at_epoch_ms: now_epoch_ms(),
            image_path: image_path.into(),
            products,
        }
    }

    /// Validates every placed-product record in this snapshot.
    pub fn validate(&self) -> Result<(), TransformCodecError> {
        for product in &self.products {
            product.validate()?;
        }
        Ok(())
    }
}

static LAST_TIMESTAMP_MS: AtomicI64 = AtomicI64::new(0);

/// Current wall-clock time in unix epoch milliseconds.
///
/// Strictly monotonic within a process: back-to-back snapshots never share
/// a timestamp, so most-recent-first ordering has no ties to break.
pub fn now_epoch_ms() -> i64 {
    let wall_clock = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0);

    LAST_TIMESTAMP_MS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(if wall_clock > last { wall_clock } else { last + 1 })
        })
        .map(|last| if wall_clock > last { wall_clock } else { last + 1 })
        .unwrap_or(wall_clock)
}
