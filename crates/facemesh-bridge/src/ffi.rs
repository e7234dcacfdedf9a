//! C-compatible FFI interface for the face landmark bridge
//!
//! # Memory Ownership Rules
//!
//! - Handles are plain integers; 0 means "no context"
//! - `facemesh_destroy()` must be called once per handle
//! - `FaceBatchC` returned by `facemesh_process_image()` is owned by the caller;
//!   release it with `facemesh_batch_free()`
//! - `CreateResultC.error_msg` is owned by the caller; release it with
//!   `facemesh_string_free()`
//!
//! # Thread Safety
//!
//! A handle should be driven by one thread at a time. Concurrent calls on the
//! same handle are serialized rather than raced.
//!
//! # Safety
//!
//! All exported functions check for null pointers. Pixel buffers must hold
//! at least `pixels_len` readable bytes.

use std::os::raw::c_char;
use std::ptr;
use std::slice;

use facemesh_ffi_common::{
    cstr_to_str, free_boxed, free_boxed_slice, vec_into_raw, FfiResult,
};
use tracing::warn;

use crate::bridge::{shared, Bridge};
use crate::context::ContextHandle;
use crate::graph::GraphEngine;
use crate::types::{FaceLandmarks, FaceMeshConfig, Frame, Landmark};

// Safety limits
const MAX_FRAME_SIZE: usize = 100_000_000; // 100MB max frame
const MAX_RESOURCE_DIR_LEN: usize = 4096;

/// C-compatible landmark
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkC {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// C-compatible face: one array of landmarks
#[repr(C)]
pub struct FaceLandmarksC {
    /// Landmarks in pipeline order (owned, freed with the batch)
    pub landmarks: *mut LandmarkC,
    /// Number of landmarks
    pub landmarks_len: usize,
}

/// C-compatible result batch for one frame
#[repr(C)]
pub struct FaceBatchC {
    /// Faces in pipeline order (owned, freed with the batch)
    pub faces: *mut FaceLandmarksC,
    /// Number of faces; 0 is a valid "no face detected" batch
    pub faces_len: usize,
}

/// C-compatible context configuration
#[repr(C)]
pub struct FaceMeshConfigC {
    /// Resource directory containing `mediapipe/` (null-terminated)
    pub resource_dir: *const c_char,
    /// Face detector score threshold (0.0-1.0)
    pub min_score_thresh: f32,
}

/// C-compatible result of `facemesh_create_with_config`
#[repr(C)]
pub struct CreateResultC {
    /// True if the context was created
    pub success: bool,
    /// Error message if success is false (owned, must be freed)
    pub error_msg: *mut c_char,
    /// Context handle, 0 on failure
    pub handle: i64,
}

impl FfiResult for CreateResultC {
    const ERROR_FALLBACK: &'static str = "failed to create face landmark context";

    fn error_fields(error_msg: *mut c_char) -> Self {
        Self {
            success: false,
            error_msg,
            handle: 0,
        }
    }
}

impl From<Landmark> for LandmarkC {
    fn from(l: Landmark) -> Self {
        Self {
            x: l.x,
            y: l.y,
            z: l.z,
        }
    }
}

impl FaceBatchC {
    fn from_faces(faces: Vec<FaceLandmarks>) -> Self {
        let faces: Vec<FaceLandmarksC> = faces
            .into_iter()
            .map(|face| {
                let landmarks: Vec<LandmarkC> =
                    face.landmarks.into_iter().map(LandmarkC::from).collect();
                let (landmarks, landmarks_len) = vec_into_raw(landmarks);
                FaceLandmarksC {
                    landmarks,
                    landmarks_len,
                }
            })
            .collect();
        let (faces, faces_len) = vec_into_raw(faces);
        Self { faces, faces_len }
    }
}

// ============================================================================
// Context Lifecycle
// ============================================================================

/// Create a face landmark context with default tuning.
///
/// # Arguments
/// - `resource_dir`: directory containing the `mediapipe/` resource tree
///
/// # Returns
/// Non-zero handle, or 0 on any failure (missing asset, build or start failure).
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn facemesh_create(resource_dir: *const c_char) -> i64 {
    let dir = match unsafe { cstr_to_str(resource_dir) } {
        Ok(s) if s.len() <= MAX_RESOURCE_DIR_LEN => s,
        Ok(_) => {
            warn!("Resource directory path too long");
            return 0;
        }
        Err(e) => {
            warn!("Invalid resource directory: {}", e);
            return 0;
        }
    };

    match shared().create(&FaceMeshConfig::new(dir)) {
        Ok(handle) => handle.as_raw(),
        Err(e) => {
            warn!("Failed to create face landmark context: {}", e);
            0
        }
    }
}

/// Create a face landmark context with a custom configuration.
///
/// # Returns
/// `CreateResultC` with the handle on success, or an error message that the
/// caller must release with `facemesh_string_free`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn facemesh_create_with_config(config: *const FaceMeshConfigC) -> CreateResultC {
    create_with_config_on(shared(), config)
}

fn create_with_config_on<E: GraphEngine>(
    bridge: &Bridge<E>,
    config: *const FaceMeshConfigC,
) -> CreateResultC {
    if config.is_null() {
        return CreateResultC::error("null config pointer");
    }
    let config = unsafe { &*config };

    let dir = match unsafe { cstr_to_str(config.resource_dir) } {
        Ok(s) if s.len() <= MAX_RESOURCE_DIR_LEN => s,
        Ok(_) => return CreateResultC::error("resource_dir exceeds maximum length"),
        Err(e) => return CreateResultC::error(&format!("resource_dir: {}", e)),
    };

    match bridge.create(&FaceMeshConfig::new(dir).with_min_score(config.min_score_thresh)) {
        Ok(handle) => CreateResultC {
            success: true,
            error_msg: ptr::null_mut(),
            handle: handle.as_raw(),
        },
        Err(e) => {
            warn!("Failed to create face landmark context: {}", e);
            CreateResultC::error(&e.to_string())
        }
    }
}

/// Destroy a context. 0 and unknown handles are ignored.
#[no_mangle]
pub extern "C" fn facemesh_destroy(handle: i64) {
    shared().destroy(ContextHandle::from_raw(handle));
}

// ============================================================================
// Frame Processing
// ============================================================================

/// Process one sRGB frame and return the detected faces.
///
/// # Arguments
/// - `handle`: context handle from `facemesh_create`
/// - `pixels`: packed 8-bit RGB data, borrowed for the duration of the call
/// - `pixels_len`: length of `pixels` in bytes, at least `width * height * 3`
/// - `width`, `height`: frame dimensions in pixels
///
/// # Returns
/// - NULL when the graph produced no result for this frame, or on any error
/// - otherwise a batch (possibly with `faces_len == 0`) that the caller must
///   release with `facemesh_batch_free`
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn facemesh_process_image(
    handle: i64,
    pixels: *const u8,
    pixels_len: usize,
    width: u32,
    height: u32,
) -> *mut FaceBatchC {
    process_image_on(shared(), handle, pixels, pixels_len, width, height)
}

fn process_image_on<E: GraphEngine>(
    bridge: &Bridge<E>,
    handle: i64,
    pixels: *const u8,
    pixels_len: usize,
    width: u32,
    height: u32,
) -> *mut FaceBatchC {
    let handle = ContextHandle::from_raw(handle);
    if handle.is_null() {
        return ptr::null_mut();
    }
    if pixels.is_null() {
        warn!("Null pixel buffer for context {}", handle);
        return ptr::null_mut();
    }
    if pixels_len > MAX_FRAME_SIZE {
        warn!("Frame of {} bytes exceeds maximum", pixels_len);
        return ptr::null_mut();
    }

    let pixels = unsafe { slice::from_raw_parts(pixels, pixels_len) };

    match bridge.process(handle, &Frame::srgb(pixels, width, height)) {
        Ok(Some(faces)) => Box::into_raw(Box::new(FaceBatchC::from_faces(faces))),
        Ok(None) => ptr::null_mut(),
        Err(e) => {
            warn!("Failed to process frame on context {}: {}", handle, e);
            ptr::null_mut()
        }
    }
}

/// Free a batch returned by `facemesh_process_image`.
///
/// # Safety
/// - `batch` must come from `facemesh_process_image` or be null
/// - `batch` must not be used after this call
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn facemesh_batch_free(batch: *mut FaceBatchC) {
    let Some(batch) = (unsafe { free_boxed(batch) }) else {
        return;
    };
    let faces = unsafe { free_boxed_slice(batch.faces, batch.faces_len) };
    for face in faces {
        unsafe { free_boxed_slice(face.landmarks, face.landmarks_len) };
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Bytes required for an sRGB frame of the given size, 0 if it overflows.
#[no_mangle]
pub extern "C" fn facemesh_expected_frame_size(width: u32, height: u32) -> usize {
    Frame::expected_len(width, height).unwrap_or(0)
}

facemesh_ffi_common::define_string_free!(facemesh_string_free);

facemesh_ffi_common::define_version_fn!(facemesh_version);
