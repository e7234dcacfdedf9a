//! Face landmark bridge (C ABI / JNI)
//!
//! Exposes MediaPipe's frontal face landmark graph to foreign callers
//! through three calls on an opaque integer handle.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌────────────────────┐
//! │ sRGB frame   │────▶│ Bridge / context │────▶│ faces → landmarks  │
//! │ (borrowed)   │     │ (MediaPipe graph)│     │ (caller-owned copy)│
//! └──────────────┘     └──────────────────┘     └────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! - `facemesh_create()` builds and starts the graph, returns a handle or 0
//! - `facemesh_process_image()` pushes one frame, waits for the graph to go
//!   idle, returns at most one result batch (null when there is none)
//! - `facemesh_destroy()` releases the poller, then the graph, then the context
//!
//! ## Memory Ownership
//!
//! - Pixel buffers are borrowed for the duration of a call and never mutated
//! - `FaceBatchC` results are owned by the caller; free with `facemesh_batch_free()`
//! - Error strings are owned by the caller; free with `facemesh_string_free()`
//!
//! ## Features
//!
//! - `mediapipe`: link `libmediapipe` and use it as the default engine
//! - `jni`: export `Java_fr_audioptic_mediapipe_jni_MediaPipeFaceNative_*`

pub mod bridge;
pub mod context;
pub mod error;
pub mod ffi;
pub mod graph;
pub mod initializer;
pub mod marshal;
pub mod processor;
pub mod resource;
pub mod scripted;
pub mod types;

#[cfg(feature = "jni")]
pub mod java;
#[cfg(feature = "mediapipe")]
mod sys;

// Re-export main types
pub use bridge::{shared, Bridge};
pub use context::ContextHandle;
pub use error::{BridgeError, Result};
pub use graph::{DefaultEngine, GraphEngine};
pub use types::{FaceLandmarks, FaceMeshConfig, Frame, Landmark};

// Re-export FFI types for C consumers
pub use ffi::{CreateResultC, FaceBatchC, FaceLandmarksC, FaceMeshConfigC, LandmarkC};
