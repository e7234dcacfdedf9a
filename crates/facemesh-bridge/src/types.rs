//! Core types for the face landmark bridge
//!
//! These are the Rust-side shapes; the FFI and JNI layers convert them
//! into their own caller representations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Graph definition, relative to the resource directory.
pub const GRAPH_ASSET_PATH: &str =
    "mediapipe/modules/face_landmark/face_landmark_front_cpu.binarypb";
/// Primary input stream carrying image frames.
pub const INPUT_STREAM: &str = "image";
/// Output stream carrying normalized multi-face landmarks.
pub const OUTPUT_STREAM: &str = "multi_face_landmarks";
/// Calculator node whose score threshold is tuned at build time.
pub const DETECTOR_NODE: &str = "FaceDetectionShortRangeCpu__TensorsToDetectionsCalculator";
/// Option on [`DETECTOR_NODE`] holding the detection threshold.
pub const MIN_SCORE_OPTION: &str = "min_score_thresh";
/// Side packet capping the number of tracked faces.
pub const NUM_FACES_SIDE_PACKET: &str = "num_faces";
/// Side packet toggling the attention mesh refinement.
pub const WITH_ATTENTION_SIDE_PACKET: &str = "with_attention";

/// Bytes per pixel of the only accepted frame format (8-bit sRGB).
pub const SRGB_CHANNELS: usize = 3;

/// One normalized 3D landmark.
///
/// `#[repr(C)]` so native landmark lists can be viewed in place before
/// they are copied out.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position, normalized to image width
    pub x: f32,
    /// Vertical position, normalized to image height
    pub y: f32,
    /// Depth relative to the face center, same scale as `x`
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// All landmarks of one detected face, in pipeline order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarks {
    pub landmarks: Vec<Landmark>,
}

impl FaceLandmarks {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

/// A borrowed sRGB frame, valid for a single process call.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
}

impl<'a> Frame<'a> {
    pub fn srgb(pixels: &'a [u8], width: u32, height: u32) -> Self {
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Bytes needed for an sRGB frame of the given size, `None` if that
    /// does not fit in `usize`.
    pub fn expected_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(SRGB_CHANNELS)
    }

    /// Reject frames the engine cannot safely read.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BridgeError::InvalidFrame(format!(
                "invalid frame dimensions {}x{}",
                self.width, self.height
            )));
        }
        let expected = Self::expected_len(self.width, self.height).ok_or_else(|| {
            BridgeError::InvalidFrame(format!(
                "frame dimensions {}x{} overflow the addressable size",
                self.width, self.height
            ))
        })?;
        if self.pixels.len() < expected {
            return Err(BridgeError::InvalidFrame(format!(
                "frame data too small: {} bytes for {}x{} sRGB (need {})",
                self.pixels.len(),
                self.width,
                self.height,
                expected
            )));
        }
        Ok(())
    }
}

/// Value of a side packet supplied once at graph build time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SidePacket {
    Int(i32),
    Bool(bool),
}

/// Configuration fixed at context creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMeshConfig {
    /// Directory holding the `mediapipe/` resource tree
    pub resource_dir: PathBuf,
    /// Face detector score threshold (0.0-1.0)
    #[serde(default = "default_min_score")]
    pub min_score_thresh: f32,
    /// Maximum number of faces tracked
    #[serde(default = "default_num_faces")]
    pub num_faces: i32,
    /// Run the attention mesh refinement
    #[serde(default)]
    pub with_attention: bool,
}

fn default_min_score() -> f32 {
    0.5
}

fn default_num_faces() -> i32 {
    1
}

impl FaceMeshConfig {
    pub fn new(resource_dir: impl Into<PathBuf>) -> Self {
        Self {
            resource_dir: resource_dir.into(),
            min_score_thresh: default_min_score(),
            num_faces: default_num_faces(),
            with_attention: false,
        }
    }

    pub fn with_min_score(mut self, min_score_thresh: f32) -> Self {
        self.min_score_thresh = min_score_thresh;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.resource_dir.as_os_str().is_empty() {
            return Err(BridgeError::InvalidConfig(
                "resource_dir must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_score_thresh) {
            return Err(BridgeError::InvalidConfig(
                "min_score_thresh must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.num_faces < 1 {
            return Err(BridgeError::InvalidConfig(
                "num_faces must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute location of the face landmark graph definition.
    pub fn graph_path(&self) -> PathBuf {
        self.resource_dir.join(GRAPH_ASSET_PATH)
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = FaceMeshConfig::new("/res");
        assert_eq!(config.min_score_thresh, 0.5);
        assert_eq!(config.num_faces, 1);
        assert!(!config.with_attention);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json_fills_defaults() {
        let config: FaceMeshConfig =
            serde_json::from_str(r#"{"resource_dir": "/res", "min_score_thresh": 0.7}"#).unwrap();
        assert_eq!(config.resource_dir, PathBuf::from("/res"));
        assert_eq!(config.min_score_thresh, 0.7);
        assert_eq!(config.num_faces, 1);
        assert!(!config.with_attention);
    }

    #[test]
    fn test_invalid_threshold() {
        let config = FaceMeshConfig::new("/res").with_min_score(1.5);
        assert!(matches!(config.validate(), Err(BridgeError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_resource_dir_rejected() {
        assert!(FaceMeshConfig::new("").validate().is_err());
    }

    #[test]
    fn test_graph_path_joins_fixed_asset() {
        let config = FaceMeshConfig::new("/opt/res");
        assert_eq!(
            config.graph_path(),
            PathBuf::from("/opt/res/mediapipe/modules/face_landmark/face_landmark_front_cpu.binarypb")
        );
    }

    #[test]
    fn test_frame_validation() {
        let pixels = vec![0u8; Frame::expected_len(4, 2).unwrap()];
        assert!(Frame::srgb(&pixels, 4, 2).validate().is_ok());
        assert!(Frame::srgb(&pixels, 4, 3).validate().is_err());
        assert!(Frame::srgb(&pixels, 0, 2).validate().is_err());
    }

    #[test]
    fn test_expected_len() {
        assert_eq!(Frame::expected_len(640, 480), Some(640 * 480 * 3));
        assert_eq!(Frame::expected_len(0, 480), Some(0));
    }

    #[test]
    fn test_expected_len_overflow() {
        assert_eq!(Frame::expected_len(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn test_frame_validation_rejects_overflowing_dimensions() {
        let pixels = vec![0u8; 12];
        let err = Frame::srgb(&pixels, u32::MAX, u32::MAX)
            .validate()
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidFrame(_)));
    }

    #[test]
    fn test_face_serializes_as_landmark_array() {
        let face = FaceLandmarks::new(vec![Landmark::new(0.5, 0.25, -0.125)]);
        let json = serde_json::to_string(&face).unwrap();
        assert_eq!(json, r#"[{"x":0.5,"y":0.25,"z":-0.125}]"#);
    }
}
