//! [`GraphEngine`] over `libmediapipe`.
//!
//! Every native object is wrapped in an owning type whose `Drop` calls the
//! matching `mp_destroy_*`, so early returns and panics never leak engine
//! memory.

use std::ffi::{CStr, CString};
use std::mem;
use std::os::raw::c_int;
use std::path::Path;
use std::ptr::NonNull;
use std::slice;
use std::sync::Arc;

use lazy_static::lazy_static;
use tracing::debug;

use super::{GraphBuilder, GraphEngine, GraphInstance, LandmarkPacket, OutputPoller};
use crate::error::{BridgeError, Result};
use crate::resource::AssetRoot;
use crate::sys;
use crate::types::{Frame, Landmark, SidePacket};

// Native landmark lists are viewed as `[Landmark]` without copying.
const _: () = assert!(mem::size_of::<sys::mp_landmark>() == mem::size_of::<Landmark>());
const _: () = assert!(mem::align_of::<sys::mp_landmark>() == mem::align_of::<Landmark>());

/// Fetch and free the engine's last error message.
fn last_error(stage: &'static str) -> BridgeError {
    let message = unsafe {
        let ptr = sys::mp_get_last_error();
        if ptr.is_null() {
            "no error message".to_string()
        } else {
            let message = CStr::from_ptr(ptr).to_string_lossy().into_owned();
            sys::mp_free_error(ptr);
            message
        }
    };
    BridgeError::engine(stage, message)
}

fn path_cstring(path: &Path) -> Result<CString> {
    let path = path.to_str().ok_or_else(|| {
        BridgeError::InvalidConfig(format!("path is not valid UTF-8: {}", path.display()))
    })?;
    Ok(CString::new(path)?)
}

fn dimension(value: u32) -> Result<c_int> {
    c_int::try_from(value)
        .map_err(|_| BridgeError::InvalidFrame(format!("dimension {} out of range", value)))
}

lazy_static! {
    // `mp_set_resource_dir` sets a process-wide flag.
    static ref NATIVE_ROOT: Arc<AssetRoot> = AssetRoot::new();
}

/// The MediaPipe C API as a [`GraphEngine`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MediaPipeEngine;

impl GraphEngine for MediaPipeEngine {
    fn set_resource_dir(&self, dir: &Path) -> Result<()> {
        let dir = path_cstring(dir)?;
        // The engine copies the string into its own flag storage.
        unsafe { sys::mp_set_resource_dir(dir.as_ptr()) };
        Ok(())
    }

    fn create_builder(
        &self,
        graph_path: &Path,
        input_stream: &str,
    ) -> Result<Box<dyn GraphBuilder>> {
        Ok(Box::new(NativeBuilder {
            graph: path_cstring(graph_path)?,
            input_stream: CString::new(input_stream)?,
            float_options: Vec::new(),
            side_packets: Vec::new(),
        }))
    }

    fn asset_root(&self) -> Arc<AssetRoot> {
        Arc::clone(&NATIVE_ROOT)
    }
}

/// Options are staged on the Rust side and only handed to the engine in
/// [`build`](GraphBuilder::build), because `libmediapipe` has no way to free
/// a builder that is never finalized.
struct NativeBuilder {
    graph: CString,
    input_stream: CString,
    float_options: Vec<(CString, CString, f32)>,
    side_packets: Vec<(CString, SidePacket)>,
}

impl GraphBuilder for NativeBuilder {
    fn add_option_float(&mut self, node: &str, option: &str, value: f32) -> Result<()> {
        self.float_options
            .push((CString::new(node)?, CString::new(option)?, value));
        Ok(())
    }

    fn add_side_packet(&mut self, name: &str, packet: SidePacket) -> Result<()> {
        self.side_packets.push((CString::new(name)?, packet));
        Ok(())
    }

    fn build(self: Box<Self>) -> Result<Box<dyn GraphInstance>> {
        let builder = unsafe {
            sys::mp_create_instance_builder(self.graph.as_ptr(), self.input_stream.as_ptr())
        };
        if builder.is_null() {
            return Err(last_error("create instance builder"));
        }

        for (node, option, value) in &self.float_options {
            unsafe { sys::mp_add_option_float(builder, node.as_ptr(), option.as_ptr(), *value) };
        }

        for (name, packet) in &self.side_packets {
            let packet = match *packet {
                SidePacket::Int(value) => unsafe { sys::mp_create_packet_int(value) },
                SidePacket::Bool(value) => unsafe { sys::mp_create_packet_bool(value) },
            };
            unsafe { sys::mp_add_side_packet(builder, name.as_ptr(), packet) };
        }

        let instance = unsafe { sys::mp_create_instance(builder) };
        let ptr = NonNull::new(instance).ok_or_else(|| last_error("create instance"))?;
        debug!("MediaPipe instance built from {:?}", self.graph);
        Ok(Box::new(NativeInstance { ptr }))
    }
}

struct NativeInstance {
    ptr: NonNull<sys::mp_instance>,
}

// The instance is only ever driven by one thread at a time (the context mutex).
unsafe impl Send for NativeInstance {}

impl GraphInstance for NativeInstance {
    fn create_poller(&mut self, output_stream: &str) -> Result<Box<dyn OutputPoller>> {
        let stream = CString::new(output_stream)?;
        let poller = unsafe { sys::mp_create_poller(self.ptr.as_ptr(), stream.as_ptr()) };
        let ptr = NonNull::new(poller).ok_or_else(|| last_error("create poller"))?;
        Ok(Box::new(NativePoller { ptr }))
    }

    fn start(&mut self) -> Result<()> {
        if unsafe { sys::mp_start(self.ptr.as_ptr()) } {
            Ok(())
        } else {
            Err(last_error("start graph"))
        }
    }

    fn process(&mut self, frame: &Frame<'_>) -> Result<()> {
        let image = sys::mp_image {
            data: frame.pixels.as_ptr(),
            width: dimension(frame.width)?,
            height: dimension(frame.height)?,
            format: sys::mp_image_format::mp_image_format_srgb,
        };

        // Copies the pixels, so the caller's buffer is free again once this returns.
        let packet = unsafe { sys::mp_create_packet_image(image) };
        if packet.is_null() {
            return Err(last_error("create image packet"));
        }

        if unsafe { sys::mp_process(self.ptr.as_ptr(), packet) } {
            Ok(())
        } else {
            Err(last_error("process frame"))
        }
    }

    fn wait_until_idle(&mut self) -> Result<()> {
        if unsafe { sys::mp_wait_until_idle(self.ptr.as_ptr()) } {
            Ok(())
        } else {
            Err(last_error("wait until idle"))
        }
    }
}

impl Drop for NativeInstance {
    fn drop(&mut self) {
        unsafe { sys::mp_destroy_instance(self.ptr.as_ptr()) };
    }
}

struct NativePoller {
    ptr: NonNull<sys::mp_poller>,
}

unsafe impl Send for NativePoller {}

impl OutputPoller for NativePoller {
    fn queue_size(&self) -> usize {
        let size = unsafe { sys::mp_get_queue_size(self.ptr.as_ptr()) };
        size.max(0) as usize
    }

    fn poll(&mut self) -> Result<Box<dyn LandmarkPacket>> {
        let packet = unsafe { sys::mp_poll_packet(self.ptr.as_ptr()) };
        let packet = NonNull::new(packet).ok_or_else(|| last_error("poll packet"))?;

        let faces = unsafe { sys::mp_get_norm_multi_face_landmarks(packet.as_ptr()) };
        match NonNull::new(faces) {
            Some(faces) => Ok(Box::new(NativeLandmarkPacket { packet, faces })),
            None => {
                let err = last_error("read multi-face landmarks");
                unsafe { sys::mp_destroy_packet(packet.as_ptr()) };
                Err(err)
            }
        }
    }
}

impl Drop for NativePoller {
    fn drop(&mut self) {
        unsafe { sys::mp_destroy_poller(self.ptr.as_ptr()) };
    }
}

/// A polled packet together with the landmark list extracted from it.
struct NativeLandmarkPacket {
    packet: NonNull<sys::mp_packet>,
    faces: NonNull<sys::mp_multi_face_landmark_list>,
}

impl NativeLandmarkPacket {
    fn lists(&self) -> &[sys::mp_landmark_list] {
        let faces = unsafe { self.faces.as_ref() };
        if faces.elements.is_null() || faces.length <= 0 {
            return &[];
        }
        unsafe { slice::from_raw_parts(faces.elements, faces.length as usize) }
    }
}

impl LandmarkPacket for NativeLandmarkPacket {
    fn face_count(&self) -> usize {
        self.lists().len()
    }

    fn face(&self, index: usize) -> &[Landmark] {
        let list = &self.lists()[index];
        if list.elements.is_null() || list.length <= 0 {
            return &[];
        }
        unsafe { slice::from_raw_parts(list.elements as *const Landmark, list.length as usize) }
    }
}

impl Drop for NativeLandmarkPacket {
    fn drop(&mut self) {
        unsafe {
            sys::mp_destroy_multi_face_landmarks(self.faces.as_ptr());
            sys::mp_destroy_packet(self.packet.as_ptr());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engines_share_one_asset_root() {
        let first = MediaPipeEngine.asset_root();
        let second = MediaPipeEngine::default().asset_root();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_image_format_matches_header() {
        assert_eq!(sys::mp_image_format::mp_image_format_unknown as i32, 0);
        assert_eq!(sys::mp_image_format::mp_image_format_srgb as i32, 1);
        assert_eq!(sys::mp_image_format::mp_image_format_srgba as i32, 2);
        assert_eq!(sys::mp_image_format::mp_image_format_gray8 as i32, 3);
    }
}
