//! Vision and template matching module
//!
//! Handles captured frames from the emulator and locates named UI templates
//! in them. Matching is resolution-normalized: frames are rescaled to the
//! template set's reference width before comparison, and all reported
//! coordinates are normalized to 0..1 so callers never deal with physical
//! pixels directly.

pub mod matcher;
pub mod template;

use std::time::Instant;

use image::{ImageBuffer, RgbaImage};
use serde::{Deserialize, Serialize};

pub use matcher::Matcher;
pub use template::{Template, TemplateStore};

/// A point in normalized screen coordinates (0..1 on both axes)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Clamp both axes into the visible 0..1 range
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A rectangular search region in reference-resolution pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One captured screenshot from the controlled device
///
/// Owned briefly by the scheduler cycle that requested it and never mutated.
pub struct Frame {
    image: RgbaImage,
    captured_at: Instant,
}

impl Frame {
    /// Create a frame from an already-decoded image
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            captured_at: Instant::now(),
        }
    }

    /// Create a frame from raw RGBA bytes as delivered by a capture channel
    pub fn from_raw(data: &[u8], width: u32, height: u32) -> Result<Self, VisionError> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(VisionError::InvalidFrameData);
        }
        let image: RgbaImage = ImageBuffer::from_raw(width, height, data.to_vec())
            .ok_or(VisionError::InvalidFrameData)?;
        Ok(Self::new(image))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }
}

/// Result of searching a frame for a single template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// Whether the template was located above its threshold
    pub found: bool,
    /// Best correlation score observed, in 0..1
    pub confidence: f32,
    /// Center of the best match in normalized coordinates
    pub point: Point,
    /// Name of the template this result refers to
    pub template_name: String,
}

impl MatchResult {
    /// A definitive miss for the given template
    pub fn not_found(template_name: &str) -> Self {
        Self {
            found: false,
            confidence: 0.0,
            point: Point::new(0.0, 0.0),
            template_name: template_name.to_string(),
        }
    }
}

/// Vision errors
///
/// These only occur at startup (template loading) or when a capture channel
/// hands over malformed data. Matching itself never errors: a frame that
/// cannot be searched yields a not-found result.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("template directory not readable: {0}")]
    TemplateDir(String),
    #[error("failed to decode template '{0}': {1}")]
    TemplateDecode(String, String),
    #[error("template manifest invalid: {0}")]
    Manifest(String),
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),
    #[error("invalid frame data")]
    InvalidFrameData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_from_raw() {
        let data = vec![255u8; 10 * 10 * 4];
        let frame = Frame::from_raw(&data, 10, 10).unwrap();
        assert_eq!(frame.width(), 10);
        assert_eq!(frame.height(), 10);
    }

    #[test]
    fn test_frame_rejects_wrong_size() {
        let data = vec![255u8; 100];
        assert!(Frame::from_raw(&data, 10, 10).is_err());
    }

    #[test]
    fn test_point_clamp_and_distance() {
        let p = Point::new(1.4, -0.2).clamped();
        assert_eq!(p, Point::new(1.0, 0.0));

        let d = Point::new(0.0, 0.0).distance(&Point::new(0.3, 0.4));
        assert!((d - 0.5).abs() < 1e-6);
    }
}
