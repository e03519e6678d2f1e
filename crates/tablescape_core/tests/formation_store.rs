use glam::{Quat, Vec3};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tablescape_core::db::open_db_in_memory;
use tablescape_core::repo::formation_repo::IndexReadOutcome;
use tablescape_core::{
    encode_frame, FormationIndexRepository, FormationSnapshot, FormationStore,
    FormationStoreError, FrameBuffer, PlacedProduct, Product, ProductCatalog, ProductCategory,
    RepoError, SqliteFormationIndexRepository, Transform,
};
use uuid::Uuid;

fn plate() -> Product {
    Product {
        id: Uuid::new_v4(),
        name: "White Ceramic Plate".to_string(),
        localized_name: "طبق سيراميك أبيض".to_string(),
        category: ProductCategory::Plates,
        model_reference: "plate_ceramic_white".to_string(),
        thumbnail_reference: None,
        real_world_scale: 0.27,
        description: None,
        localized_description: None,
    }
}

fn catalog_with(product: &Product) -> Arc<ProductCatalog> {
    Arc::new(ProductCatalog::from_products(vec![product.clone()]))
}

fn test_image() -> tablescape_core::CapturedImage {
    encode_frame(FrameBuffer {
        width: 8,
        height: 8,
        scale_factor: 2.0,
        pixels: vec![180; 8 * 8 * 4],
    })
    .expect("fixture frame should encode")
}

fn placed_at(product: &Product, position: Vec3) -> PlacedProduct {
    let transform = Transform {
        translation: position,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };
    PlacedProduct::from_transform(product.id, &transform)
}

#[test]
fn empty_index_loads_as_empty_list() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = FormationStore::open(
        SqliteFormationIndexRepository::new(&conn),
        dir.path(),
        Arc::new(ProductCatalog::default()),
    )
    .unwrap();

    assert!(store.formations().is_empty());
    assert_eq!(store.skipped_on_load(), 0);
}

#[test]
fn save_then_reload_yields_exactly_one_matching_entry() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let product = plate();
    let catalog = catalog_with(&product);

    let saved = {
        let mut store = FormationStore::open(
            SqliteFormationIndexRepository::new(&conn),
            dir.path(),
            Arc::clone(&catalog),
        )
        .unwrap();
        store
            .save(
                "Dinner Setup",
                &test_image(),
                vec![placed_at(&product, Vec3::new(0.0, 0.0, -0.5))],
            )
            .unwrap()
    };

    let reopened = FormationStore::open(
        SqliteFormationIndexRepository::new(&conn),
        dir.path(),
        catalog,
    )
    .unwrap();

    assert_eq!(reopened.formations().len(), 1);
    let loaded = &reopened.formations()[0];
    assert_eq!(loaded, &saved);
    assert_eq!(loaded.name, "Dinner Setup");
    assert_eq!(loaded.products.len(), 1);
    // Stored position must equal the input exactly after round-trip.
    assert_eq!(loaded.products[0].position.x, 0.0);
    assert_eq!(loaded.products[0].position.y, 0.0);
    assert_eq!(loaded.products[0].position.z, -0.5);
}

#[test]
fn reload_orders_most_recent_first_regardless_of_storage_order() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let product = plate();
    let catalog = catalog_with(&product);

    {
        let mut store = FormationStore::open(
            SqliteFormationIndexRepository::new(&conn),
            dir.path(),
            Arc::clone(&catalog),
        )
        .unwrap();
        for name in ["A", "B", "C"] {
            store.save(name, &test_image(), Vec::new()).unwrap();
        }
    }

    // Rewrite the physical index oldest-first to prove loading re-sorts.
    let repo = SqliteFormationIndexRepository::new(&conn);
    let mut stored = repo.read_index().unwrap().formations;
    stored.sort_by_key(|entry| entry.created_at_epoch_ms);
    repo.write_index(&stored).unwrap();

    let reopened = FormationStore::open(repo, dir.path(), catalog).unwrap();
    let names: Vec<&str> = reopened
        .formations()
        .iter()
        .map(|entry| entry.name.as_str())
        .collect();
    assert_eq!(names, vec!["C", "B", "A"]);
}

#[test]
fn delete_removes_entry_and_image_and_tolerates_unknown_ids() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let product = plate();
    let catalog = catalog_with(&product);

    let mut store = FormationStore::open(
        SqliteFormationIndexRepository::new(&conn),
        dir.path(),
        Arc::clone(&catalog),
    )
    .unwrap();

    let saved = store.save("Dinner Setup", &test_image(), Vec::new()).unwrap();
    assert!(store.read_image(&saved).is_some());

    store.delete(saved.id).unwrap();
    assert!(store.formations().is_empty());
    assert!(store.read_image(&saved).is_none());

    // Unknown id (including a repeated delete) is a no-op, not an error.
    store.delete(saved.id).unwrap();
    store.delete(Uuid::new_v4()).unwrap();

    let reopened = FormationStore::open(
        SqliteFormationIndexRepository::new(&conn),
        dir.path(),
        catalog,
    )
    .unwrap();
    assert!(reopened.formations().is_empty());
}

#[test]
fn image_write_failure_aborts_before_any_index_mutation() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let product = plate();
    let catalog = catalog_with(&product);
    let formations_dir = dir.path().join("formations");

    let mut store = FormationStore::open(
        SqliteFormationIndexRepository::new(&conn),
        &formations_dir,
        Arc::clone(&catalog),
    )
    .unwrap();

    // Replace the formations directory with a plain file so the image write
    // must fail.
    std::fs::remove_dir_all(&formations_dir).unwrap();
    std::fs::write(&formations_dir, b"not a directory").unwrap();

    let error = store
        .save("Dinner Setup", &test_image(), Vec::new())
        .unwrap_err();
    assert!(matches!(error, FormationStoreError::ImageWriteFailed { .. }));
    assert!(store.formations().is_empty());

    let outcome = SqliteFormationIndexRepository::new(&conn)
        .read_index()
        .unwrap();
    assert!(outcome.formations.is_empty());
}

/// Index repository stub whose writes can be forced to fail.
struct FlakyIndexRepo {
    stored: Mutex<Vec<FormationSnapshot>>,
    fail_writes: Arc<AtomicBool>,
}

impl FormationIndexRepository for FlakyIndexRepo {
    fn read_index(&self) -> Result<IndexReadOutcome, RepoError> {
        Ok(IndexReadOutcome {
            formations: self.stored.lock().unwrap().clone(),
            skipped_records: 0,
        })
    }

    fn write_index(&self, formations: &[FormationSnapshot]) -> Result<(), RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Db(tablescape_core::db::DbError::Sqlite(
                rusqlite::Error::InvalidQuery,
            )));
        }
        *self.stored.lock().unwrap() = formations.to_vec();
        Ok(())
    }
}

#[test]
fn index_write_failure_rolls_back_insert_and_cleans_up_image() {
    let dir = tempfile::tempdir().unwrap();
    let product = plate();
    let fail_writes = Arc::new(AtomicBool::new(false));
    let repo = FlakyIndexRepo {
        stored: Mutex::new(Vec::new()),
        fail_writes: Arc::clone(&fail_writes),
    };
    let mut store = FormationStore::open(repo, dir.path(), catalog_with(&product)).unwrap();

    let kept = store.save("kept", &test_image(), Vec::new()).unwrap();

    fail_writes.store(true, Ordering::SeqCst);
    let error = store
        .save("doomed", &test_image(), Vec::new())
        .unwrap_err();
    assert!(matches!(error, FormationStoreError::IndexWriteFailed(_)));

    // In-memory list rolled back to the surviving save only.
    assert_eq!(store.formations().len(), 1);
    assert_eq!(store.formations()[0].id, kept.id);

    // The doomed image was cleaned up; only the kept one remains on disk.
    let image_count = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(image_count, 1);
}

#[test]
fn index_write_failure_during_delete_keeps_record_and_image() {
    let dir = tempfile::tempdir().unwrap();
    let product = plate();
    let fail_writes = Arc::new(AtomicBool::new(false));
    let repo = FlakyIndexRepo {
        stored: Mutex::new(Vec::new()),
        fail_writes: Arc::clone(&fail_writes),
    };
    let mut store = FormationStore::open(repo, dir.path(), catalog_with(&product)).unwrap();

    let saved = store.save("kept", &test_image(), Vec::new()).unwrap();

    fail_writes.store(true, Ordering::SeqCst);
    let error = store.delete(saved.id).unwrap_err();
    assert!(matches!(error, FormationStoreError::IndexWriteFailed(_)));

    // The record survives in memory and its image is still on disk; a
    // persisted snapshot must never dangle without its image.
    assert_eq!(store.formations().len(), 1);
    assert_eq!(store.formations()[0].id, saved.id);
    assert!(store.read_image(&saved).is_some());

    // A retry after the fault clears removes both.
    fail_writes.store(false, Ordering::SeqCst);
    store.delete(saved.id).unwrap();
    assert!(store.formations().is_empty());
    assert!(store.read_image(&saved).is_none());
}

#[test]
fn unknown_product_reference_is_rejected_before_io() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let product = plate();
    let catalog = catalog_with(&product);

    let mut store = FormationStore::open(
        SqliteFormationIndexRepository::new(&conn),
        dir.path(),
        catalog,
    )
    .unwrap();

    let untagged = plate(); // Different id, not in the catalog.
    let error = store
        .save(
            "broken tagging",
            &test_image(),
            vec![placed_at(&untagged, Vec3::ZERO)],
        )
        .unwrap_err();
    assert!(matches!(
        error,
        FormationStoreError::UnknownProductReference(_)
    ));
    assert!(store.formations().is_empty());
}

#[test]
fn listeners_observe_saves_and_deletes() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let product = plate();
    let catalog = catalog_with(&product);

    let mut store = FormationStore::open(
        SqliteFormationIndexRepository::new(&conn),
        dir.path(),
        catalog,
    )
    .unwrap();

    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);
    store.subscribe(move |formations| {
        sink.lock().unwrap().push(formations.len());
    });

    let saved = store.save("observed", &test_image(), Vec::new()).unwrap();
    store.delete(saved.id).unwrap();

    assert_eq!(*observed.lock().unwrap(), vec![1, 0]);
}
