//! Formation store: capture, persistence and listing of saved arrangements.
//!
//! # Responsibility
//! - Own the persisted formation index and the image files beside it.
//! - Order every image write before the index rewrite it belongs to.
//! - Expose immutable list snapshots plus change notification callbacks.
//!
//! # Invariants
//! - A snapshot becomes visible to readers only after its image is durably
//!   written.
//! - Every consumer observes descending-by-creation-time order, independent
//!   of insertion or storage order.
//! - The store is the single logical owner of the index; mutations take
//!   `&mut self` and callers must not interleave overlapping rewrites.

use crate::capture::{capture_scene, CaptureError, CapturedImage, FrameSource};
use crate::model::formation::{FormationId, FormationSnapshot, PlacedProduct};
use crate::model::product::ProductId;
use crate::repo::formation_repo::FormationIndexRepository;
use crate::repo::RepoError;
use crate::service::catalog_service::ProductCatalog;
use crate::spatial::anchor_registry::AnchorRegistry;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Fixed raster extension for formation reference images.
const IMAGE_EXTENSION: &str = "jpg";

/// Change listener invoked with the current (already re-sorted) list.
pub type FormationListener = Box<dyn Fn(&[FormationSnapshot]) + Send>;

/// Formation store failures. Persistence is untouched unless stated.
#[derive(Debug)]
pub enum FormationStoreError {
    /// Formations directory could not be created.
    DirectoryUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Reference image could not be written; no record or index mutation
    /// happened, safe to retry.
    ImageWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Index rewrite failed; in-memory state was restored to agree with
    /// storage (save rolls back its insert and removes the just-written
    /// image best-effort, delete keeps record and image), safe to retry.
    IndexWriteFailed(RepoError),
    /// A placed-product record references a product missing from the
    /// catalog; placement tagging is broken upstream.
    UnknownProductReference(ProductId),
    /// Scene capture failed before any persistence work started.
    Capture(CaptureError),
    /// Index read failed while opening the store.
    Repo(RepoError),
}

impl Display for FormationStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryUnavailable { path, source } => write!(
                f,
                "formations directory `{}` unavailable: {source}",
                path.display()
            ),
            Self::ImageWriteFailed { path, source } => write!(
                f,
                "failed to write formation image `{}`: {source}",
                path.display()
            ),
            Self::IndexWriteFailed(err) => write!(f, "failed to rewrite formation index: {err}"),
            Self::UnknownProductReference(id) => {
                write!(f, "placed product references unknown product {id}")
            }
            Self::Capture(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FormationStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DirectoryUnavailable { source, .. } | Self::ImageWriteFailed { source, .. } => {
                Some(source)
            }
            Self::IndexWriteFailed(err) | Self::Repo(err) => Some(err),
            Self::Capture(err) => Some(err),
            Self::UnknownProductReference(_) => None,
        }
    }
}

impl From<CaptureError> for FormationStoreError {
    fn from(value: CaptureError) -> Self {
        Self::Capture(value)
    }
}

/// Persisted formation store over one index repository and one image
/// directory.
pub struct FormationStore<R: FormationIndexRepository> {
    repo: R,
    formations_dir: PathBuf,
    catalog: Arc<ProductCatalog>,
    /// Most-recent-first; the only order readers ever observe.
    formations: Vec<FormationSnapshot>,
    listeners: Vec<FormationListener>,
    skipped_on_load: usize,
}

impl<R: FormationIndexRepository> FormationStore<R> {
    /// Opens the store: ensures the image directory exists, reads the
    /// persisted index and re-sorts it by descending creation time.
    ///
    /// The re-sort is a defensive invariant, not an optimization; storage
    /// order is not guaranteed by earlier writers. Placed-product records
    /// referencing products missing from `catalog` are skipped.
    pub fn open(
        repo: R,
        formations_dir: impl Into<PathBuf>,
        catalog: Arc<ProductCatalog>,
    ) -> Result<Self, FormationStoreError> {
        let formations_dir = formations_dir.into();
        fs::create_dir_all(&formations_dir).map_err(|source| {
            FormationStoreError::DirectoryUnavailable {
                path: formations_dir.clone(),
                source,
            }
        })?;

        let outcome = repo.read_index().map_err(FormationStoreError::Repo)?;
        let mut skipped_on_load = outcome.skipped_records;
        let mut formations = outcome.formations;

        for formation in &mut formations {
            let before = formation.products.len();
            formation
                .products
                .retain(|placed| catalog.product(placed.product_id).is_some());
            let dropped = before - formation.products.len();
            if dropped > 0 {
                warn!(
                    "event=store_open module=formation_store status=skip formation_id={} error_code=unknown_product_reference dropped={dropped}",
                    formation.id
                );
                skipped_on_load += dropped;
            }
        }

        sort_most_recent_first(&mut formations);

        info!(
            "event=store_open module=formation_store status=ok formations={} skipped={skipped_on_load}",
            formations.len()
        );

        Ok(Self {
            repo,
            formations_dir,
            catalog,
            formations,
            listeners: Vec::new(),
            skipped_on_load,
        })
    }

    /// Immutable view of the formation list, most recent first.
    pub fn formations(&self) -> &[FormationSnapshot] {
        &self.formations
    }

    /// Records (index entries or placed products) dropped while opening.
    pub fn skipped_on_load(&self) -> usize {
        self.skipped_on_load
    }

    /// Registers a change listener invoked after every successful mutation.
    pub fn subscribe(&mut self, listener: impl Fn(&[FormationSnapshot]) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Captures the current frame and live anchors, then saves a formation.
    ///
    /// This is the full save path: scene capture, snapshot-consistent
    /// registry read, image write, index rewrite.
    pub fn capture_formation(
        &mut self,
        name: &str,
        frames: &dyn FrameSource,
        registry: &AnchorRegistry,
    ) -> Result<FormationSnapshot, FormationStoreError> {
        let image = capture_scene(frames)?;
        let products = registry.snapshot_placed_products();
        self.save(name, &image, products)
    }

    /// Saves one formation: image first, index rewrite second.
    ///
    /// # Errors
    /// - `UnknownProductReference` before any I/O when a record carries a
    ///   product id the catalog cannot resolve.
    /// - `ImageWriteFailed` with no record or index mutation.
    /// - `IndexWriteFailed` after rolling back the in-memory insert and
    ///   removing the image best-effort.
    pub fn save(
        &mut self,
        name: &str,
        image: &CapturedImage,
        products: Vec<PlacedProduct>,
    ) -> Result<FormationSnapshot, FormationStoreError> {
        for placed in &products {
            if self.catalog.product(placed.product_id).is_none() {
                return Err(FormationStoreError::UnknownProductReference(
                    placed.product_id,
                ));
            }
        }

        let image_filename = format!("{}.{IMAGE_EXTENSION}", Uuid::new_v4());
        let image_path = self.formations_dir.join(&image_filename);
        fs::write(&image_path, &image.jpeg_bytes).map_err(|source| {
            FormationStoreError::ImageWriteFailed {
                path: image_path.clone(),
                source,
            }
        })?;

        let snapshot = FormationSnapshot::new(name, image_filename, products);
        self.formations.insert(0, snapshot.clone());

        if let Err(err) = self.repo.write_index(&self.formations) {
            self.formations.remove(0);
            if let Err(cleanup_err) = fs::remove_file(&image_path) {
                warn!(
                    "event=formation_save module=formation_store status=error error_code=orphan_image_cleanup_failed path={} error={cleanup_err}",
                    image_path.display()
                );
            }
            return Err(FormationStoreError::IndexWriteFailed(err));
        }

        info!(
            "event=formation_save module=formation_store status=ok formation_id={} products={} image={}",
            snapshot.id,
            snapshot.products.len(),
            snapshot.image_path
        );
        self.notify_listeners();

        Ok(snapshot)
    }

    /// Deletes one formation by id; unknown ids are a no-op.
    ///
    /// The index entry is removed first; only after the rewrite succeeds is
    /// the image removed best-effort (a missing file is not an error). A
    /// persisted record must never outlive its image.
    ///
    /// # Errors
    /// - `IndexWriteFailed` with the entry restored in memory; record and
    ///   image both survive, safe to retry.
    pub fn delete(&mut self, id: FormationId) -> Result<(), FormationStoreError> {
        let Some(position) = self.formations.iter().position(|entry| entry.id == id) else {
            return Ok(());
        };

        let removed = self.formations.remove(position);
        if let Err(err) = self.repo.write_index(&self.formations) {
            self.formations.insert(position, removed);
            return Err(FormationStoreError::IndexWriteFailed(err));
        }

        let image_path = self.formations_dir.join(&removed.image_path);
        if let Err(err) = fs::remove_file(&image_path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "event=formation_delete module=formation_store status=warn error_code=image_remove_failed path={} error={err}",
                    image_path.display()
                );
            }
        }

        info!(
            "event=formation_delete module=formation_store status=ok formation_id={id}"
        );
        self.notify_listeners();

        Ok(())
    }

    /// Absolute path of one formation's reference image.
    pub fn image_path(&self, formation: &FormationSnapshot) -> PathBuf {
        self.formations_dir.join(&formation.image_path)
    }

    /// Reads one formation's reference image; `None` when unretrievable.
    pub fn read_image(&self, formation: &FormationSnapshot) -> Option<Vec<u8>> {
        fs::read(self.image_path(formation)).ok()
    }

    /// Directory the image files live in.
    pub fn formations_dir(&self) -> &Path {
        &self.formations_dir
    }

    fn notify_listeners(&self) {
        for listener in &self.listeners {
            listener(&self.formations);
        }
    }
}

/// Sorts descending by creation time, tie-broken by id for determinism.
fn sort_most_recent_first(formations: &mut [FormationSnapshot]) {
    formations.sort_by(|a, b| {
        b.created_at_epoch_ms
            .cmp(&a.created_at_epoch_ms)
            .then_with(|| a.id.cmp(&b.id))
    });
}
