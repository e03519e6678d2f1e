//! Capability seams for the host scene/rendering subsystem.
//!
//! # Responsibility
//! - Declare the narrow contracts core consumes from the AR host: raycast,
//!   camera pose, anchor creation, gesture installation, model loading.
//! - Keep core testable without any rendering runtime behind it.
//!
//! # Invariants
//! - `camera_pose` returns a value snapshot, never a live reference; placed
//!   objects must not keep following the camera.
//! - Model-load failure is an explicit result, recovered by substituting the
//!   deterministic fallback primitive.

use crate::model::transform::Transform;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Edge length of the fallback cube, in meters.
pub const FALLBACK_CUBE_SIZE_M: f32 = 0.1;

/// Fixed material id of the fallback cube.
pub const FALLBACK_CUBE_MATERIAL: &str = "blue_metallic";

/// Tap location in host view coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Opaque handle to an anchor created in the host scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneAnchorHandle(pub u64);

/// Scene/rendering capabilities consumed by placement.
pub trait SceneSpi {
    /// Intersects a ray from `point` with the best available horizontal
    /// surface estimate. Returns the hit pose, if any.
    fn raycast_horizontal(&self, point: ScreenPoint) -> Option<Transform>;

    /// Snapshot of the current camera pose, or `None` while tracking has not
    /// initialized.
    fn camera_pose(&self) -> Option<Transform>;

    /// Creates an anchor fixed at `transform` in the tracked world frame.
    fn add_anchor(&self, transform: &Transform) -> SceneAnchorHandle;

    /// Attaches rotate/scale/translate manipulation gestures to the anchored
    /// object. Gesture-driven mutations flow back through
    /// `AnchorRegistry::apply_gesture_transform`.
    fn install_manipulation_gestures(&self, handle: SceneAnchorHandle);
}

/// Visual attached to an anchor: the requested model or the fallback cube.
#[derive(Debug, Clone, PartialEq)]
pub enum Renderable {
    /// Successfully loaded model asset.
    Model { reference: String },
    /// Deterministic substitute used when model loading fails.
    FallbackCube {
        size_m: f32,
        material: &'static str,
    },
}

impl Renderable {
    /// The fixed-size, fixed-material fallback primitive.
    pub fn fallback_cube() -> Self {
        Self::FallbackCube {
            size_m: FALLBACK_CUBE_SIZE_M,
            material: FALLBACK_CUBE_MATERIAL,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::FallbackCube { .. })
    }
}

/// Model-loading failure reported by the host asset pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLoadError {
    pub reference: String,
    pub message: String,
}

impl Display for ModelLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to load model `{}`: {}",
            self.reference, self.message
        )
    }
}

impl Error for ModelLoadError {}

/// Model-loading capability consumed by placement.
pub trait ModelLoaderSpi {
    fn load_model(&self, reference: &str) -> Result<Renderable, ModelLoadError>;
}
