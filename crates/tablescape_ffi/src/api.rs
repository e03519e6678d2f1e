//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Keep error semantics simple for early-stage UI integration.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Host-owned concerns (AR session, rendering, gestures) stay on the Dart
//!   side; calls hand over plain data such as frame bytes and placed records.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use tablescape_core::db::open_db;
use tablescape_core::{
    core_version as core_version_inner, encode_frame, init_logging as init_logging_inner,
    load_catalog_document, ping as ping_inner, FormationStore, FrameBuffer, PlacedProduct,
    ProductCatalog, ProductCategory, SqliteFavoritesRepository, SqliteFormationIndexRepository,
};
use uuid::Uuid;

/// Process-wide core configuration, set once by `init_core`.
struct CoreState {
    db_path: PathBuf,
    formations_dir: PathBuf,
    catalog_fingerprint: String,
    catalog: Arc<ProductCatalog>,
}

static CORE_STATE: OnceLock<CoreState> = OnceLock::new();

/// Serializes store mutations: the formation index and the favorites set are
/// whole-document rewrites, so overlapping writers must not interleave.
static STORE_LOCK: Mutex<()> = Mutex::new(());

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - UI-thread safe for current implementation.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - UI-thread safe for current implementation.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Initializes core storage paths and the product catalog once per process.
///
/// Input semantics:
/// - `db_path`: absolute path for the SQLite store.
/// - `formations_dir`: absolute directory for formation reference images.
/// - `catalog_json`: product catalog document shipped with the host app.
///
/// # FFI contract
/// - Sync call; opens the database once to run migrations eagerly.
/// - Safe to call repeatedly with the same arguments (idempotent).
/// - Reconfiguration attempts with different arguments return an error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_core(db_path: String, formations_dir: String, catalog_json: String) -> String {
    let db_path = db_path.trim().to_string();
    let formations_dir = formations_dir.trim().to_string();
    if db_path.is_empty() || formations_dir.is_empty() {
        return "init_core failed: db_path and formations_dir must be non-empty".to_string();
    }

    if let Some(state) = CORE_STATE.get() {
        let same = state.db_path == PathBuf::from(&db_path)
            && state.formations_dir == PathBuf::from(&formations_dir)
            && state.catalog_fingerprint == catalog_json;
        return if same {
            String::new()
        } else {
            "init_core failed: core already configured with different arguments".to_string()
        };
    }

    let outcome = match load_catalog_document(&catalog_json) {
        Ok(outcome) => outcome,
        Err(err) => return format!("init_core failed: {err}"),
    };
    if outcome.skipped_records > 0 {
        log::warn!(
            "event=init_core module=ffi status=warn skipped_records={}",
            outcome.skipped_records
        );
    }

    // Run migrations eagerly so later calls hit a ready schema.
    if let Err(err) = open_db(PathBuf::from(&db_path)) {
        return format!("init_core failed: {err}");
    }

    let state = CoreState {
        db_path: PathBuf::from(&db_path),
        formations_dir: PathBuf::from(&formations_dir),
        catalog_fingerprint: catalog_json,
        catalog: Arc::new(outcome.catalog),
    };
    match CORE_STATE.set(state) {
        Ok(()) => String::new(),
        // Lost a setup race; the winner's arguments stand.
        Err(_) => "init_core failed: core already configured".to_string(),
    }
}

/// Catalog product projection for result display.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductItem {
    /// Stable product ID in string form.
    pub product_id: String,
    pub name: String,
    pub localized_name: String,
    /// Category key (`plates|cups|bowls|centerpieces|cutlery`).
    pub category: String,
    pub model_reference: String,
    pub thumbnail_reference: Option<String>,
    pub real_world_scale: f32,
}

/// Response envelope for catalog listing and search.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductListResponse {
    /// Matching products (empty when no hits).
    pub items: Vec<ProductItem>,
    /// Human-readable response message for diagnostics.
    pub message: String,
}

/// Generic action response envelope for command flows.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Optional created record ID.
    pub record_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, record_id: Option<String>) -> Self {
        Self {
            ok: true,
            record_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            record_id: None,
            message: message.into(),
        }
    }
}

/// Favorite-toggle response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteToggleResponse {
    pub ok: bool,
    /// Whether the product is a favorite after the toggle.
    pub now_favorite: bool,
    pub message: String,
}

/// Saved-formation projection for list display.
#[derive(Debug, Clone, PartialEq)]
pub struct FormationItem {
    /// Stable formation ID in string form.
    pub formation_id: String,
    pub name: String,
    /// Creation time in unix epoch milliseconds.
    pub created_at_epoch_ms: i64,
    /// Absolute path of the reference image for thumbnail display.
    pub image_path: String,
    /// Placed-product count for list badges.
    pub product_count: u32,
}

/// Response envelope for the saved-formation list.
#[derive(Debug, Clone, PartialEq)]
pub struct FormationListResponse {
    /// Formations, most recent first (empty when none saved).
    pub items: Vec<FormationItem>,
    /// Human-readable response message for diagnostics.
    pub message: String,
}

/// Lists catalog products, optionally filtered by category key.
///
/// # FFI contract
/// - Sync call against the in-memory catalog.
/// - Unknown category keys return an empty list with a diagnostic message.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn list_products(category: Option<String>) -> ProductListResponse {
    let Some(state) = CORE_STATE.get() else {
        return ProductListResponse {
            items: Vec::new(),
            message: "list_products failed: init_core has not been called".to_string(),
        };
    };

    let products: Vec<ProductItem> = match category.as_deref().map(str::trim) {
        None | Some("") => state.catalog.products().iter().map(to_product_item).collect(),
        Some(key) => match parse_category(key) {
            Some(category) => state
                .catalog
                .in_category(category)
                .into_iter()
                .map(to_product_item)
                .collect(),
            None => {
                return ProductListResponse {
                    items: Vec::new(),
                    message: format!("Unknown category `{key}`."),
                };
            }
        },
    };

    let message = format!("{} product(s).", products.len());
    ProductListResponse {
        items: products,
        message,
    }
}

/// Searches the catalog across Latin and Arabic names plus category labels.
///
/// # FFI contract
/// - Sync call against the in-memory catalog.
/// - Empty query returns the full catalog.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn search_products(query: String) -> ProductListResponse {
    let Some(state) = CORE_STATE.get() else {
        return ProductListResponse {
            items: Vec::new(),
            message: "search_products failed: init_core has not been called".to_string(),
        };
    };

    let items: Vec<ProductItem> = state
        .catalog
        .search(&query)
        .into_iter()
        .map(to_product_item)
        .collect();
    let message = if items.is_empty() {
        "No results.".to_string()
    } else {
        format!("Found {} result(s).", items.len())
    };
    ProductListResponse { items, message }
}

/// Toggles one product in the persisted favorites set.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns the post-toggle favorite state on success.
#[flutter_rust_bridge::frb(sync)]
pub fn toggle_favorite(product_id: String) -> FavoriteToggleResponse {
    let product_id = match Uuid::parse_str(product_id.trim()) {
        Ok(id) => id,
        Err(err) => {
            return FavoriteToggleResponse {
                ok: false,
                now_favorite: false,
                message: format!("toggle_favorite failed: invalid product id: {err}"),
            };
        }
    };

    let result = with_core_state(|state| {
        let _guard = lock_stores();
        let conn = open_db(&state.db_path).map_err(|err| format!("DB open failed: {err}"))?;
        let mut store =
            tablescape_core::FavoritesStore::open(SqliteFavoritesRepository::new(&conn))
                .map_err(|err| err.to_string())?;
        store.toggle(product_id).map_err(|err| err.to_string())
    });

    match result {
        Ok(now_favorite) => FavoriteToggleResponse {
            ok: true,
            now_favorite,
            message: String::new(),
        },
        Err(err) => FavoriteToggleResponse {
            ok: false,
            now_favorite: false,
            message: format!("toggle_favorite failed: {err}"),
        },
    }
}

/// Lists persisted favorite product ids in string form.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics; failures are logged and surface as an empty list so the
///   Dart side keeps a plain id list.
#[flutter_rust_bridge::frb(sync)]
pub fn list_favorite_ids() -> Vec<String> {
    let result = with_core_state(|state| {
        let conn = open_db(&state.db_path).map_err(|err| format!("DB open failed: {err}"))?;
        let store = tablescape_core::FavoritesStore::open(SqliteFavoritesRepository::new(&conn))
            .map_err(|err| err.to_string())?;
        Ok(store.favorite_ids().iter().map(Uuid::to_string).collect())
    });

    match result {
        Ok(ids) => ids,
        Err(err) => {
            log::warn!("event=list_favorite_ids module=ffi status=error error={err}");
            Vec::new()
        }
    }
}

/// Lists saved formations, most recent first.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn list_formations() -> FormationListResponse {
    let result = with_formation_store(|store| {
        Ok(store
            .formations()
            .iter()
            .map(|formation| FormationItem {
                formation_id: formation.id.to_string(),
                name: formation.name.clone(),
                created_at_epoch_ms: formation.created_at_epoch_ms,
                image_path: store.image_path(formation).display().to_string(),
                product_count: formation.products.len() as u32,
            })
            .collect::<Vec<_>>())
    });

    match result {
        Ok(items) => {
            let message = format!("{} formation(s).", items.len());
            FormationListResponse { items, message }
        }
        Err(err) => FormationListResponse {
            items: Vec::new(),
            message: format!("list_formations failed: {err}"),
        },
    }
}

/// Saves a formation from a captured frame plus placed-product records.
///
/// Input semantics:
/// - `frame_rgba`: tightly packed RGBA8 pixels, `width * height * 4` bytes.
/// - `products_json`: JSON array of placed-product records read from the
///   host-side anchor registry at capture time.
///
/// # FFI contract
/// - Sync call; encodes the frame and performs image + index writes.
/// - Never panics.
/// - Returns the new formation id on success.
#[flutter_rust_bridge::frb(sync)]
pub fn save_formation(
    name: String,
    frame_width: u32,
    frame_height: u32,
    frame_scale_factor: f32,
    frame_rgba: Vec<u8>,
    products_json: String,
) -> ActionResponse {
    let products: Vec<PlacedProduct> = match serde_json::from_str(&products_json) {
        Ok(products) => products,
        Err(err) => {
            return ActionResponse::failure(format!(
                "save_formation failed: malformed products payload: {err}"
            ));
        }
    };

    let image = match encode_frame(FrameBuffer {
        width: frame_width,
        height: frame_height,
        scale_factor: frame_scale_factor,
        pixels: frame_rgba,
    }) {
        Ok(image) => image,
        Err(err) => return ActionResponse::failure(format!("save_formation failed: {err}")),
    };

    let result = with_formation_store(|store| {
        store
            .save(name.trim(), &image, products)
            .map_err(|err| err.to_string())
    });

    match result {
        Ok(snapshot) => {
            ActionResponse::success("Formation saved.", Some(snapshot.id.to_string()))
        }
        Err(err) => ActionResponse::failure(format!("save_formation failed: {err}")),
    }
}

/// Deletes one saved formation; unknown ids succeed as a no-op.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_formation(formation_id: String) -> ActionResponse {
    let formation_id = match Uuid::parse_str(formation_id.trim()) {
        Ok(id) => id,
        Err(err) => {
            return ActionResponse::failure(format!(
                "delete_formation failed: invalid formation id: {err}"
            ));
        }
    };

    let result = with_formation_store(|store| {
        store.delete(formation_id).map_err(|err| err.to_string())
    });

    match result {
        Ok(()) => ActionResponse::success("Formation deleted.", None),
        Err(err) => ActionResponse::failure(format!("delete_formation failed: {err}")),
    }
}

fn lock_stores() -> std::sync::MutexGuard<'static, ()> {
    // A poisoned lock only means an earlier call panicked; nothing behind the
    // guard is left structurally invalid, so recover it.
    STORE_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn with_core_state<T>(f: impl FnOnce(&CoreState) -> Result<T, String>) -> Result<T, String> {
    let state = CORE_STATE
        .get()
        .ok_or_else(|| "init_core has not been called".to_string())?;
    f(state)
}

fn with_formation_store<T>(
    f: impl FnOnce(&mut FormationStore<SqliteFormationIndexRepository<'_>>) -> Result<T, String>,
) -> Result<T, String> {
    with_core_state(|state| {
        let _guard = lock_stores();
        let conn = open_db(&state.db_path).map_err(|err| format!("DB open failed: {err}"))?;
        let mut store = FormationStore::open(
            SqliteFormationIndexRepository::new(&conn),
            &state.formations_dir,
            Arc::clone(&state.catalog),
        )
        .map_err(|err| err.to_string())?;
        f(&mut store)
    })
}

fn to_product_item(product: &tablescape_core::Product) -> ProductItem {
    ProductItem {
        product_id: product.id.to_string(),
        name: product.name.clone(),
        localized_name: product.localized_name.clone(),
        category: product.category.as_str().to_string(),
        model_reference: product.model_reference.clone(),
        thumbnail_reference: product.thumbnail_reference.clone(),
        real_world_scale: product.real_world_scale,
    }
}

fn parse_category(key: &str) -> Option<ProductCategory> {
    ProductCategory::all()
        .iter()
        .copied()
        .find(|category| category.as_str() == key)
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, delete_formation, init_core, init_logging, list_formations,
        list_favorite_ids, list_products, ping, save_formation, search_products, toggle_favorite,
    };

    const PLATE_ID: &str = "6e9bb12f-4f5f-4aa9-9f5e-2b8f6f3d0a01";
    const VASE_ID: &str = "6e9bb12f-4f5f-4aa9-9f5e-2b8f6f3d0a02";

    fn catalog_json() -> String {
        serde_json::json!({
            "products": [
                {
                    "id": PLATE_ID,
                    "name": "White Ceramic Plate",
                    "localized_name": "طبق سيراميك أبيض",
                    "category": "plates",
                    "model_reference": "plate_ceramic_white",
                    "real_world_scale": 0.27
                },
                {
                    "id": VASE_ID,
                    "name": "Flower Vase",
                    "localized_name": "مزهرية",
                    "category": "centerpieces",
                    "model_reference": "vase_flower",
                    "real_world_scale": 0.25
                }
            ]
        })
        .to_string()
    }

    // All tests share one process-wide configuration; init_core is set once.
    fn ensure_core_initialized() {
        let root = std::env::temp_dir().join("tablescape_ffi_test");
        let _ = std::fs::create_dir_all(&root);
        let error = init_core(
            root.join("tablescape.sqlite3").display().to_string(),
            root.join("formations").display().to_string(),
            catalog_json(),
        );
        assert!(error.is_empty(), "{error}");
    }

    fn frame_rgba(width: u32, height: u32) -> Vec<u8> {
        vec![200; (width * height * 4) as usize]
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_core_rejects_reconfiguration() {
        ensure_core_initialized();
        let error = init_core(
            "/elsewhere/tablescape.sqlite3".to_string(),
            "/elsewhere/formations".to_string(),
            catalog_json(),
        );
        assert!(error.contains("different arguments"));
    }

    #[test]
    fn product_listing_and_search_resolve_catalog() {
        ensure_core_initialized();

        let all = list_products(None);
        assert_eq!(all.items.len(), 2);

        let plates = list_products(Some("plates".to_string()));
        assert_eq!(plates.items.len(), 1);
        assert_eq!(plates.items[0].product_id, PLATE_ID);

        let unknown = list_products(Some("plasma".to_string()));
        assert!(unknown.items.is_empty());
        assert!(unknown.message.contains("plasma"));

        let hits = search_products("مزهرية".to_string());
        assert_eq!(hits.items.len(), 1);
        assert_eq!(hits.items[0].product_id, VASE_ID);
    }

    #[test]
    fn favorite_toggle_roundtrip() {
        ensure_core_initialized();

        let on = toggle_favorite(PLATE_ID.to_string());
        assert!(on.ok, "{}", on.message);
        let expected_after_first = on.now_favorite;
        assert_eq!(
            list_favorite_ids().contains(&PLATE_ID.to_string()),
            expected_after_first
        );

        let off = toggle_favorite(PLATE_ID.to_string());
        assert!(off.ok, "{}", off.message);
        assert_ne!(on.now_favorite, off.now_favorite);
    }

    #[test]
    fn toggle_favorite_rejects_malformed_id() {
        ensure_core_initialized();
        let response = toggle_favorite("not-a-uuid".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("invalid product id"));
    }

    #[test]
    fn save_list_delete_formation_roundtrip() {
        ensure_core_initialized();

        let products_json = serde_json::json!([
            {
                "id": uuid::Uuid::new_v4(),
                "product_id": PLATE_ID,
                "position": { "x": 0.0, "y": 0.0, "z": -0.5 },
                "rotation": { "x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0 },
                "scale": { "x": 0.27, "y": 0.27, "z": 0.27 }
            }
        ])
        .to_string();

        let saved = save_formation(
            "Evening Table".to_string(),
            8,
            8,
            2.0,
            frame_rgba(8, 8),
            products_json,
        );
        assert!(saved.ok, "{}", saved.message);
        let formation_id = saved.record_id.expect("save should return formation id");

        let listed = list_formations();
        let item = listed
            .items
            .iter()
            .find(|item| item.formation_id == formation_id)
            .expect("saved formation should be listed");
        assert_eq!(item.name, "Evening Table");
        assert_eq!(item.product_count, 1);
        assert!(std::path::Path::new(&item.image_path).is_file());

        let deleted = delete_formation(formation_id.clone());
        assert!(deleted.ok, "{}", deleted.message);
        assert!(!list_formations()
            .items
            .iter()
            .any(|item| item.formation_id == formation_id));

        // Repeated delete is a no-op, not an error.
        assert!(delete_formation(formation_id).ok);
    }

    #[test]
    fn save_formation_rejects_unknown_product_reference() {
        ensure_core_initialized();

        let products_json = serde_json::json!([
            {
                "id": uuid::Uuid::new_v4(),
                "product_id": uuid::Uuid::new_v4(),
                "position": { "x": 0.0, "y": 0.0, "z": 0.0 },
                "rotation": { "x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0 },
                "scale": { "x": 1.0, "y": 1.0, "z": 1.0 }
            }
        ])
        .to_string();

        let response = save_formation(
            "broken tagging".to_string(),
            8,
            8,
            2.0,
            frame_rgba(8, 8),
            products_json,
        );
        assert!(!response.ok);
        assert!(response.message.contains("unknown product"));
    }

    #[test]
    fn save_formation_rejects_short_frame_buffer() {
        ensure_core_initialized();
        let response = save_formation(
            "short frame".to_string(),
            8,
            8,
            2.0,
            vec![0; 16],
            "[]".to_string(),
        );
        assert!(!response.ok);
    }
}
