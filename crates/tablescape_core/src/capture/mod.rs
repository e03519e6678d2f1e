//! Scene capture: current rendered frame to a JPEG reference image.
//!
//! # Responsibility
//! - Pull the currently rendered frame from the host and encode it at the
//!   device's native output resolution.
//!
//! # Invariants
//! - Capture is a pure function of the frame at call time.
//! - Failure produces no partial artifact.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Cursor;

/// JPEG quality used for formation reference images.
const JPEG_QUALITY: u8 = 80;

/// One rendered frame in RGBA8, already at native pixel resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    /// Device scale factor the pixel dimensions were produced with.
    pub scale_factor: f32,
    /// Tightly packed RGBA8 rows, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

/// Frame delivery capability of the host rendering subsystem.
///
/// Callers on a separate interaction context must marshal onto the rendering
/// context before reading frame state.
pub trait FrameSource {
    /// The currently rendered frame, or `None` while no session is running.
    fn current_frame(&self) -> Option<FrameBuffer>;
}

/// Encoded capture result.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    pub jpeg_bytes: Vec<u8>,
}

/// Capture failures. No artifact exists after any of these.
#[derive(Debug)]
pub enum CaptureError {
    /// No frame is currently being rendered (session not running).
    CaptureUnavailable,
    /// Frame buffer dimensions and byte length disagree.
    MalformedFrame { expected_len: usize, actual_len: usize },
    Encode(image::ImageError),
}

impl Display for CaptureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CaptureUnavailable => write!(f, "no rendered frame available to capture"),
            Self::MalformedFrame {
                expected_len,
                actual_len,
            } => write!(
                f,
                "frame buffer length {actual_len} does not match dimensions (expected {expected_len})"
            ),
            Self::Encode(err) => write!(f, "failed to encode captured frame: {err}"),
        }
    }
}

impl Error for CaptureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(value: image::ImageError) -> Self {
        Self::Encode(value)
    }
}

/// Captures the currently rendered frame as a JPEG.
///
/// # Errors
/// - `CaptureUnavailable` when the host has no frame to deliver.
/// - `MalformedFrame` / `Encode` for defective buffers; nothing is written.
pub fn capture_scene(source: &dyn FrameSource) -> Result<CapturedImage, CaptureError> {
    let frame = source
        .current_frame()
        .ok_or(CaptureError::CaptureUnavailable)?;
    encode_frame(frame)
}

/// Encodes one frame buffer as a JPEG at its native resolution.
pub fn encode_frame(frame: FrameBuffer) -> Result<CapturedImage, CaptureError> {
    let expected_len = frame.width as usize * frame.height as usize * 4;
    if frame.pixels.len() != expected_len {
        return Err(CaptureError::MalformedFrame {
            expected_len,
            actual_len: frame.pixels.len(),
        });
    }

    let rgba = RgbaImage::from_raw(frame.width, frame.height, frame.pixels).ok_or(
        CaptureError::MalformedFrame {
            expected_len,
            actual_len: 0,
        },
    )?;
    // JPEG has no alpha channel; flatten before encoding.
    let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();

    let mut jpeg_bytes = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut jpeg_bytes, JPEG_QUALITY).encode_image(&rgb)?;

    Ok(CapturedImage {
        width: frame.width,
        height: frame.height,
        jpeg_bytes: jpeg_bytes.into_inner(),
    })
}
