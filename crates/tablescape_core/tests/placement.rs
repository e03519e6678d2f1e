use glam::{Quat, Vec3};
use std::cell::Cell;
use tablescape_core::{
    resolve_placement, AnchorRegistry, ModelLoadError, ModelLoaderSpi, PlacementEngine,
    PlacementError, Product, ProductCategory, Renderable, SceneAnchorHandle, SceneSpi,
    ScreenPoint, Transform, CAMERA_FALLBACK_OFFSET_M,
};
use uuid::Uuid;

/// Scene stub with configurable raycast and camera state.
struct StubScene {
    raycast_hit: Option<Transform>,
    camera: Cell<Option<Transform>>,
    next_handle: Cell<u64>,
    anchors_added: Cell<usize>,
}

impl StubScene {
    fn new(raycast_hit: Option<Transform>, camera: Option<Transform>) -> Self {
        Self {
            raycast_hit,
            camera: Cell::new(camera),
            next_handle: Cell::new(1),
            anchors_added: Cell::new(0),
        }
    }
}

impl SceneSpi for StubScene {
    fn raycast_horizontal(&self, _point: ScreenPoint) -> Option<Transform> {
        self.raycast_hit
    }

    fn camera_pose(&self) -> Option<Transform> {
        self.camera.get()
    }

    fn add_anchor(&self, _transform: &Transform) -> SceneAnchorHandle {
        self.anchors_added.set(self.anchors_added.get() + 1);
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        SceneAnchorHandle(handle)
    }

    fn install_manipulation_gestures(&self, _handle: SceneAnchorHandle) {}
}

struct LoadingModels;

impl ModelLoaderSpi for LoadingModels {
    fn load_model(&self, reference: &str) -> Result<Renderable, ModelLoadError> {
        Ok(Renderable::Model {
            reference: reference.to_string(),
        })
    }
}

struct FailingModels;

impl ModelLoaderSpi for FailingModels {
    fn load_model(&self, reference: &str) -> Result<Renderable, ModelLoadError> {
        Err(ModelLoadError {
            reference: reference.to_string(),
            message: "asset missing from bundle".to_string(),
        })
    }
}

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

fn tap() -> ScreenPoint {
    ScreenPoint::new(200.0, 400.0)
}

#[test]
fn raycast_hit_wins_over_camera_fallback() {
    let hit = Transform::from_pose(Vec3::new(0.2, 0.0, -1.0), Quat::IDENTITY);
    let camera = Transform::from_pose(Vec3::new(9.0, 9.0, 9.0), Quat::IDENTITY);
    let scene = StubScene::new(Some(hit), Some(camera));

    let resolved = resolve_placement(tap(), &scene).unwrap();
    assert_eq!(resolved.translation, hit.translation);
}

#[test]
fn camera_fallback_places_half_meter_in_front() {
    // Camera at origin looking down -Z: fallback lands at z = -0.5.
    let camera = Transform::from_pose(Vec3::ZERO, Quat::IDENTITY);
    let scene = StubScene::new(None, Some(camera));

    let resolved = resolve_placement(tap(), &scene).unwrap();
    assert!((resolved.translation.z + CAMERA_FALLBACK_OFFSET_M).abs() < 1e-6);
    assert!(resolved.translation.x.abs() < 1e-6);
    assert!(resolved.translation.y.abs() < 1e-6);
}

#[test]
fn fallback_uses_camera_orientation_snapshot() {
    // Camera yawed 90 degrees left: forward is world -X.
    let camera = Transform::from_pose(
        Vec3::new(1.0, 0.0, 0.0),
        Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
    );
    let scene = StubScene::new(None, Some(camera));

    let resolved = resolve_placement(tap(), &scene).unwrap();
    assert!((resolved.translation.x - 0.5).abs() < 1e-5);
    assert!(resolved.translation.z.abs() < 1e-5);
}

#[test]
fn no_tracking_data_fails_and_creates_zero_anchors() {
    let scene = StubScene::new(None, None);
    let registry = AnchorRegistry::new();
    let engine = PlacementEngine::new(&scene, &LoadingModels, &registry);

    let error = engine.place_product(&plate(), tap()).unwrap_err();
    assert_eq!(error, PlacementError::NoTrackingData);
    assert!(registry.is_empty());
    assert_eq!(scene.anchors_added.get(), 0);
}

#[test]
fn placement_applies_uniform_real_world_scale() {
    let hit = Transform::from_pose(Vec3::new(0.0, 0.0, -1.0), Quat::IDENTITY);
    let scene = StubScene::new(Some(hit), None);
    let registry = AnchorRegistry::new();
    let engine = PlacementEngine::new(&scene, &LoadingModels, &registry);

    let product = plate();
    let outcome = engine.place_product(&product, tap()).unwrap();
    assert!(outcome.surface_hit);
    assert!(!outcome.used_fallback_model);

    let placed = registry.current_transform(outcome.anchor_id).unwrap();
    assert_eq!(placed.scale, Vec3::splat(product.real_world_scale));
    assert_eq!(placed.translation, hit.translation);
}

#[test]
fn model_load_failure_still_anchors_exactly_one_fallback_cube() {
    let hit = Transform::from_pose(Vec3::new(0.0, 0.0, -1.0), Quat::IDENTITY);
    let scene = StubScene::new(Some(hit), None);
    let registry = AnchorRegistry::new();
    let engine = PlacementEngine::new(&scene, &FailingModels, &registry);

    let outcome = engine.place_product(&plate(), tap()).unwrap();
    assert!(outcome.used_fallback_model);
    assert_eq!(registry.len(), 1);
    assert_eq!(scene.anchors_added.get(), 1);
    assert_eq!(
        registry.renderable(outcome.anchor_id),
        Some(Renderable::fallback_cube())
    );
}

#[test]
fn placed_object_does_not_follow_later_camera_motion() {
    let camera = Transform::from_pose(Vec3::ZERO, Quat::IDENTITY);
    let scene = StubScene::new(None, Some(camera));
    let registry = AnchorRegistry::new();
    let engine = PlacementEngine::new(&scene, &LoadingModels, &registry);

    let outcome = engine.place_product(&plate(), tap()).unwrap();
    let before = registry.current_transform(outcome.anchor_id).unwrap();

    // The camera moving afterwards must not drag the anchor with it.
    scene.camera.set(Some(Transform::from_pose(
        Vec3::new(5.0, 5.0, 5.0),
        Quat::IDENTITY,
    )));

    let after = registry.current_transform(outcome.anchor_id).unwrap();
    assert_eq!(before.translation, after.translation);
}

#[test]
fn invalid_product_scale_is_rejected_before_any_anchor() {
    let hit = Transform::from_pose(Vec3::ZERO, Quat::IDENTITY);
    let scene = StubScene::new(Some(hit), None);
    let registry = AnchorRegistry::new();
    let engine = PlacementEngine::new(&scene, &LoadingModels, &registry);

    let mut product = plate();
    product.real_world_scale = -1.0;

    assert!(matches!(
        engine.place_product(&product, tap()),
        Err(PlacementError::InvalidProduct(_))
    ));
    assert!(registry.is_empty());
}
