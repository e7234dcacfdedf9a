//! Raw bindings to the `libmediapipe` C API (`mediapipe.h`).
//!
//! Only the subset the face landmark graph needs. Opaque engine types are
//! zero-sized `#[repr(C)]` structs that are only ever handled by pointer.

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_float, c_int};

#[repr(C)]
pub struct mp_instance_builder {
    _private: [u8; 0],
}

#[repr(C)]
pub struct mp_instance {
    _private: [u8; 0],
}

#[repr(C)]
pub struct mp_poller {
    _private: [u8; 0],
}

#[repr(C)]
pub struct mp_packet {
    _private: [u8; 0],
}

/// Mirrors `mediapipe::ImageFormat::Format`. Only sRGB is sent.
#[allow(dead_code)]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum mp_image_format {
    mp_image_format_unknown = 0,
    mp_image_format_srgb = 1,
    mp_image_format_srgba = 2,
    mp_image_format_gray8 = 3,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mp_image {
    pub data: *const u8,
    pub width: c_int,
    pub height: c_int,
    pub format: mp_image_format,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct mp_landmark {
    pub x: c_float,
    pub y: c_float,
    pub z: c_float,
}

#[repr(C)]
#[derive(Debug)]
pub struct mp_landmark_list {
    pub elements: *mut mp_landmark,
    pub length: c_int,
}

#[repr(C)]
#[derive(Debug)]
pub struct mp_multi_face_landmark_list {
    pub elements: *mut mp_landmark_list,
    pub length: c_int,
}

#[link(name = "mediapipe")]
extern "C" {
    pub fn mp_set_resource_dir(dir: *const c_char);

    pub fn mp_create_instance_builder(
        graph_filename: *const c_char,
        input_stream: *const c_char,
    ) -> *mut mp_instance_builder;
    pub fn mp_add_option_float(
        builder: *mut mp_instance_builder,
        node: *const c_char,
        option: *const c_char,
        value: c_float,
    );
    /// Takes ownership of `packet`.
    pub fn mp_add_side_packet(
        builder: *mut mp_instance_builder,
        name: *const c_char,
        packet: *mut mp_packet,
    );
    /// Consumes `builder`, even on failure.
    pub fn mp_create_instance(builder: *mut mp_instance_builder) -> *mut mp_instance;
    pub fn mp_create_poller(instance: *mut mp_instance, output_stream: *const c_char)
        -> *mut mp_poller;
    pub fn mp_start(instance: *mut mp_instance) -> bool;
    /// Takes ownership of `packet`.
    pub fn mp_process(instance: *mut mp_instance, packet: *mut mp_packet) -> bool;
    pub fn mp_wait_until_idle(instance: *mut mp_instance) -> bool;
    pub fn mp_destroy_instance(instance: *mut mp_instance);

    pub fn mp_get_queue_size(poller: *mut mp_poller) -> c_int;
    pub fn mp_poll_packet(poller: *mut mp_poller) -> *mut mp_packet;
    pub fn mp_destroy_poller(poller: *mut mp_poller);

    pub fn mp_create_packet_int(value: c_int) -> *mut mp_packet;
    pub fn mp_create_packet_bool(value: bool) -> *mut mp_packet;
    /// Copies the pixel data; `image.data` may be released afterwards.
    pub fn mp_create_packet_image(image: mp_image) -> *mut mp_packet;
    pub fn mp_destroy_packet(packet: *mut mp_packet);

    pub fn mp_get_norm_multi_face_landmarks(
        packet: *mut mp_packet,
    ) -> *mut mp_multi_face_landmark_list;
    pub fn mp_destroy_multi_face_landmarks(list: *mut mp_multi_face_landmark_list);

    pub fn mp_get_last_error() -> *const c_char;
    pub fn mp_free_error(message: *const c_char);
}
