//! World-transform model and storage codec for 3D math types.
//!
//! # Responsibility
//! - Define the canonical pose/scale record used across placement and
//!   persistence.
//! - Convert `glam` vectors/quaternions to serializable records and back
//!   without loss.
//!
//! # Invariants
//! - `decode(encode(v))` matches `v` component-wise within 1e-6 for all
//!   finite inputs.
//! - Decoding never renormalizes a quaternion; magnitude drift beyond
//!   tolerance is rejected as corrupted storage.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Allowed deviation of a stored quaternion's magnitude from 1.
pub const QUAT_MAGNITUDE_TOLERANCE: f32 = 1e-3;

/// Pose plus scale in the tracked world coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Creates a transform with unit scale.
    pub fn from_pose(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Identity pose at the world origin with unit scale.
    pub fn identity() -> Self {
        Self::from_pose(Vec3::ZERO, Quat::IDENTITY)
    }

    /// Returns this pose translated by `offset` expressed in local axes.
    ///
    /// Used to derive a world pose a fixed distance in front of a camera
    /// pose: local -Z is the camera's forward axis.
    pub fn translated_local(&self, offset: Vec3) -> Self {
        Self {
            translation: self.translation + self.rotation * offset,
            rotation: self.rotation,
            scale: self.scale,
        }
    }
}

/// Serializable 3-component vector record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3Record {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Serializable quaternion record, component order `x, y, z, w`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuatRecord {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

/// Result type for codec decode operations.
pub type CodecResult<T> = Result<T, TransformCodecError>;

/// Decode-side validation errors for persisted transform records.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformCodecError {
    /// A stored component is NaN or infinite.
    NonFiniteComponent { field: &'static str },
    /// Stored quaternion magnitude deviates from 1 beyond tolerance.
    NonUnitQuaternion { magnitude: f32 },
}

impl Display for TransformCodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFiniteComponent { field } => {
                write!(f, "non-finite component in stored {field} record")
            }
            Self::NonUnitQuaternion { magnitude } => write!(
                f,
                "stored quaternion magnitude {magnitude} deviates from 1 beyond {QUAT_MAGNITUDE_TOLERANCE}"
            ),
        }
    }
}

impl Error for TransformCodecError {}

/// Encodes a vector into its storage record.
pub fn encode_vec3(value: Vec3) -> Vec3Record {
    Vec3Record {
        x: value.x,
        y: value.y,
        z: value.z,
    }
}

/// Decodes a stored vector record.
///
/// # Errors
/// - `NonFiniteComponent` when any stored component is NaN or infinite.
pub fn decode_vec3(record: &Vec3Record) -> CodecResult<Vec3> {
    let value = Vec3::new(record.x, record.y, record.z);
    if !value.is_finite() {
        return Err(TransformCodecError::NonFiniteComponent { field: "vector" });
    }
    Ok(value)
}

/// Encodes a quaternion into its storage record.
pub fn encode_quat(value: Quat) -> QuatRecord {
    QuatRecord {
        x: value.x,
        y: value.y,
        z: value.z,
        w: value.w,
    }
}

/// Decodes a stored quaternion record without renormalizing.
///
/// A magnitude drifted beyond [`QUAT_MAGNITUDE_TOLERANCE`] implies corrupted
/// storage and is rejected instead of silently corrected.
///
/// # Errors
/// - `NonFiniteComponent` when any stored component is NaN or infinite.
/// - `NonUnitQuaternion` when magnitude deviates from 1 beyond tolerance.
pub fn decode_quat(record: &QuatRecord) -> CodecResult<Quat> {
    let value = Quat::from_xyzw(record.x, record.y, record.z, record.w);
    if !value.is_finite() {
        return Err(TransformCodecError::NonFiniteComponent {
            field: "quaternion",
        });
    }

    let magnitude = value.length();
    if (magnitude - 1.0).abs() > QUAT_MAGNITUDE_TOLERANCE {
        return Err(TransformCodecError::NonUnitQuaternion { magnitude });
    }

    Ok(value)
}
