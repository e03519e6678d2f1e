//! Live anchor registry for the active AR session.
//!
//! # Responsibility
//! - Map anchor ids to the product tagged at placement time plus the live,
//!   gesture-mutated current transform.
//! - Derive capture-time placed-product records from live state.
//!
//! # Invariants
//! - Registry state is session-local and never persisted directly; it is
//!   the source a formation snapshot is derived from at save time.
//! - Snapshot reads take the registry lock once, so a captured transform
//!   never interleaves with a concurrent gesture write mid-update.

use crate::model::formation::PlacedProduct;
use crate::model::product::ProductId;
use crate::model::transform::Transform;
use crate::spatial::scene_spi::{Renderable, SceneAnchorHandle};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;
use uuid::Uuid;

/// Stable identifier for one live anchor.
pub type AnchorId = Uuid;

/// Anchor lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorRegistryError {
    AnchorNotFound(AnchorId),
}

impl Display for AnchorRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AnchorNotFound(id) => write!(f, "anchor not found: {id}"),
        }
    }
}

impl Error for AnchorRegistryError {}

#[derive(Debug, Clone)]
struct AnchorRecord {
    product_id: ProductId,
    creation_transform: Transform,
    current_transform: Transform,
    renderable: Renderable,
    scene_handle: SceneAnchorHandle,
    /// Monotonic placement order, used to keep capture output stable.
    sequence: u64,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_sequence: u64,
    anchors: BTreeMap<AnchorId, AnchorRecord>,
}

/// Registry of live anchors, shared between the interaction context and the
/// capture/save path.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    inner: Mutex<RegistryInner>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one anchored object and returns its id.
    ///
    /// The product id tagged here is authoritative for the anchor's whole
    /// lifetime; capture never re-derives it.
    pub fn place(
        &self,
        product_id: ProductId,
        transform: Transform,
        renderable: Renderable,
        scene_handle: SceneAnchorHandle,
    ) -> AnchorId {
        let anchor_id = Uuid::new_v4();
        let mut inner = self.lock_inner();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.anchors.insert(
            anchor_id,
            AnchorRecord {
                product_id,
                creation_transform: transform,
                current_transform: transform,
                renderable,
                scene_handle,
                sequence,
            },
        );
        anchor_id
    }

    /// Live transform of one anchor, read at the moment of the call.
    pub fn current_transform(&self, anchor_id: AnchorId) -> Option<Transform> {
        self.lock_inner()
            .anchors
            .get(&anchor_id)
            .map(|record| record.current_transform)
    }

    /// Transform the anchor was created with.
    pub fn creation_transform(&self, anchor_id: AnchorId) -> Option<Transform> {
        self.lock_inner()
            .anchors
            .get(&anchor_id)
            .map(|record| record.creation_transform)
    }

    /// Product tagged at placement time.
    pub fn product_id(&self, anchor_id: AnchorId) -> Option<ProductId> {
        self.lock_inner()
            .anchors
            .get(&anchor_id)
            .map(|record| record.product_id)
    }

    /// Visual attached to the anchor (model or fallback cube).
    pub fn renderable(&self, anchor_id: AnchorId) -> Option<Renderable> {
        self.lock_inner()
            .anchors
            .get(&anchor_id)
            .map(|record| record.renderable.clone())
    }

    /// Host-scene handle recorded at placement time.
    pub fn scene_handle(&self, anchor_id: AnchorId) -> Option<SceneAnchorHandle> {
        self.lock_inner()
            .anchors
            .get(&anchor_id)
            .map(|record| record.scene_handle)
    }

    /// Applies an externally driven manipulation-gesture mutation.
    ///
    /// # Errors
    /// - `AnchorNotFound` when the anchor was never placed or was removed.
    pub fn apply_gesture_transform(
        &self,
        anchor_id: AnchorId,
        transform: Transform,
    ) -> Result<(), AnchorRegistryError> {
        let mut inner = self.lock_inner();
        let record = inner
            .anchors
            .get_mut(&anchor_id)
            .ok_or(AnchorRegistryError::AnchorNotFound(anchor_id))?;
        record.current_transform = transform;
        Ok(())
    }

    /// Removes one anchor; unknown ids are a no-op.
    pub fn remove(&self, anchor_id: AnchorId) {
        self.lock_inner().anchors.remove(&anchor_id);
    }

    /// Removes all anchors (session reset).
    pub fn clear(&self) {
        let mut inner = self.lock_inner();
        inner.anchors.clear();
    }

    pub fn len(&self) -> usize {
        self.lock_inner().anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_inner().anchors.is_empty()
    }

    /// Derives capture-time records from every live anchor, in placement
    /// order.
    ///
    /// All transforms are read under one lock acquisition, so the snapshot
    /// is consistent against concurrent gesture writes.
    pub fn snapshot_placed_products(&self) -> Vec<PlacedProduct> {
        let inner = self.lock_inner();
        let mut records: Vec<&AnchorRecord> = inner.anchors.values().collect();
        records.sort_by_key(|record| record.sequence);
        records
            .iter()
            .map(|record| {
                PlacedProduct::from_transform(record.product_id, &record.current_transform)
            })
            .collect()
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        // A poisoned lock only means a panicking reader/writer; registry
        // state stays structurally valid, so recover the guard.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
