//! Error types for the face landmark bridge

use std::ffi::NulError;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Everything that can go wrong between the caller and the graph engine.
///
/// The Rust API reports these; the C ABI and JNI layers collapse them to
/// their sentinel values (0 handle, null result) after logging.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration rejected before touching the engine
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Graph definition not found under the resource directory
    #[error("graph asset not found: {}", .0.display())]
    GraphAssetMissing(PathBuf),

    /// Asset root already pinned to another directory by live contexts
    #[error(
        "resource directory {} conflicts with {} used by {live} live context(s)",
        .requested.display(),
        .current.display()
    )]
    ResourceRootConflict {
        current: PathBuf,
        requested: PathBuf,
        live: usize,
    },

    /// The graph engine refused an operation
    #[error("engine failed to {stage}: {message}")]
    Engine { stage: &'static str, message: String },

    /// Frame buffer or dimensions unusable
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Handle is zero, destroyed or was never issued
    #[error("unknown context handle {0}")]
    InvalidHandle(u64),

    /// Built without the `mediapipe` feature
    #[error("native graph engine not available (built without the `mediapipe` feature)")]
    NativeUnavailable,

    /// String with an interior null byte headed for the C API
    #[error("string contains a null byte: {0}")]
    Nul(#[from] NulError),
}

impl BridgeError {
    pub fn engine(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Engine {
            stage,
            message: message.into(),
        }
    }
}
