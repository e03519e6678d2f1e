//! Core domain logic for Tablescape, an AR table-setting planner.
//! This crate is the single source of truth for placement and formation
//! persistence invariants; rendering, tracking and UI live in the host app.

pub mod capture;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod spatial;

pub use capture::{capture_scene, encode_frame, CaptureError, CapturedImage, FrameBuffer, FrameSource};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::formation::{FormationId, FormationSnapshot, PlacedProduct};
pub use model::product::{Product, ProductCategory, ProductId, ProductValidationError};
pub use model::transform::{
    decode_quat, decode_vec3, encode_quat, encode_vec3, QuatRecord, Transform,
    TransformCodecError, Vec3Record,
};
pub use repo::favorites_repo::{FavoritesRepository, SqliteFavoritesRepository};
pub use repo::formation_repo::{FormationIndexRepository, SqliteFormationIndexRepository};
pub use repo::{RepoError, RepoResult};
pub use service::catalog_service::{
    load_catalog_document, load_catalog_file, CatalogError, CatalogLoadOutcome, ProductCatalog,
};
pub use service::favorites_service::FavoritesStore;
pub use service::formation_service::{FormationStore, FormationStoreError};
pub use spatial::anchor_registry::{AnchorId, AnchorRegistry, AnchorRegistryError};
pub use spatial::placement::{
    resolve_placement, PlacementEngine, PlacementError, PlacementOutcome,
    CAMERA_FALLBACK_OFFSET_M,
};
pub use spatial::scene_spi::{
    ModelLoadError, ModelLoaderSpi, Renderable, SceneAnchorHandle, SceneSpi, ScreenPoint,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
