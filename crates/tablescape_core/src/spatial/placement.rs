//! Placement resolution for tapped screen points.
//!
//! # Responsibility
//! - Turn a tap plus current tracking state into a world transform.
//! - Orchestrate model loading, anchor creation and registry tagging for one
//!   placement.
//!
//! # Invariants
//! - Surface raycast wins over the camera-relative fallback.
//! - The fallback composes a *snapshot* of the camera pose with a fixed
//!   forward offset; the placed object stays put afterwards.
//! - With no surface hit and no camera pose, placement fails and creates
//!   zero anchors.

use crate::model::product::{Product, ProductValidationError};
use crate::model::transform::Transform;
use crate::spatial::anchor_registry::{AnchorId, AnchorRegistry};
use crate::spatial::scene_spi::{ModelLoaderSpi, Renderable, SceneSpi, ScreenPoint};
use glam::Vec3;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fallback distance in front of the camera, in meters.
pub const CAMERA_FALLBACK_OFFSET_M: f32 = 0.5;

/// Placement failures. Zero anchors exist after any of these.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementError {
    /// No raycast hit and no camera pose; tracking has not initialized.
    /// Recoverable: retry once tracking stabilizes.
    NoTrackingData,
    /// Product scale metadata failed validation.
    InvalidProduct(ProductValidationError),
}

impl Display for PlacementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoTrackingData => {
                write!(f, "no tracking data available to resolve a placement")
            }
            Self::InvalidProduct(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlacementError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoTrackingData => None,
            Self::InvalidProduct(err) => Some(err),
        }
    }
}

impl From<ProductValidationError> for PlacementError {
    fn from(value: ProductValidationError) -> Self {
        Self::InvalidProduct(value)
    }
}

/// Resolves a world transform for `point` from current tracking state.
///
/// Raycasts against the best horizontal surface estimate first; on miss,
/// falls back to a pose [`CAMERA_FALLBACK_OFFSET_M`] in front of a snapshot
/// of the current camera pose.
///
/// # Errors
/// - `NoTrackingData` when neither a surface hit nor a camera pose exists.
pub fn resolve_placement(
    point: ScreenPoint,
    scene: &dyn SceneSpi,
) -> Result<Transform, PlacementError> {
    if let Some(hit) = scene.raycast_horizontal(point) {
        return Ok(hit);
    }

    let camera = scene.camera_pose().ok_or(PlacementError::NoTrackingData)?;
    // Local -Z is the camera's forward axis.
    Ok(camera.translated_local(Vec3::new(0.0, 0.0, -CAMERA_FALLBACK_OFFSET_M)))
}

/// Result of one successful placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementOutcome {
    pub anchor_id: AnchorId,
    /// Whether a surface raycast hit was used (vs the camera fallback).
    pub surface_hit: bool,
    /// Whether the fallback cube substituted for a failed model load.
    pub used_fallback_model: bool,
}

/// Ties placement resolution, model loading and anchor registration together
/// for the live session.
pub struct PlacementEngine<'a, S: SceneSpi, M: ModelLoaderSpi> {
    scene: &'a S,
    models: &'a M,
    registry: &'a AnchorRegistry,
}

impl<'a, S: SceneSpi, M: ModelLoaderSpi> PlacementEngine<'a, S, M> {
    pub fn new(scene: &'a S, models: &'a M, registry: &'a AnchorRegistry) -> Self {
        Self {
            scene,
            models,
            registry,
        }
    }

    /// Places one product at the tapped point.
    ///
    /// A model-load failure is recovered locally by substituting the
    /// fallback cube; the placement still yields exactly one anchored
    /// entity. The placed object's scale is the product's real-world scale
    /// applied uniformly, independent of the placement transform.
    ///
    /// # Errors
    /// - `NoTrackingData` / `InvalidProduct`; zero anchors are created.
    pub fn place_product(
        &self,
        product: &Product,
        point: ScreenPoint,
    ) -> Result<PlacementOutcome, PlacementError> {
        product.validate()?;

        // Single raycast; a second query could answer differently mid-frame.
        let (resolved, surface_hit) = match self.scene.raycast_horizontal(point) {
            Some(hit) => (hit, true),
            None => {
                let camera = self
                    .scene
                    .camera_pose()
                    .ok_or(PlacementError::NoTrackingData)?;
                (
                    camera.translated_local(Vec3::new(0.0, 0.0, -CAMERA_FALLBACK_OFFSET_M)),
                    false,
                )
            }
        };

        let renderable = match self.models.load_model(&product.model_reference) {
            Ok(renderable) => renderable,
            Err(err) => {
                warn!(
                    "event=model_load module=placement status=fallback product_id={} error={err}",
                    product.id
                );
                Renderable::fallback_cube()
            }
        };
        let used_fallback_model = renderable.is_fallback();

        let placed = Transform {
            translation: resolved.translation,
            rotation: resolved.rotation,
            scale: Vec3::splat(product.real_world_scale),
        };

        let scene_handle = self.scene.add_anchor(&placed);
        self.scene.install_manipulation_gestures(scene_handle);
        let anchor_id = self
            .registry
            .place(product.id, placed, renderable, scene_handle);

        info!(
            "event=placement module=placement status=ok product_id={} anchor_id={anchor_id} surface_hit={surface_hit} fallback_model={used_fallback_model}",
            product.id
        );

        Ok(PlacementOutcome {
            anchor_id,
            surface_hit,
            used_fallback_model,
        })
    }
}
