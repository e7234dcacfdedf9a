//! JNI entry points for `fr.audioptic.mediapipe.jni.MediaPipeFaceNative`.
//!
//! ```java
//! public final class MediaPipeFaceNative {
//!     public static final class Landmark { public Landmark(float x, float y, float z) { ... } }
//!     public static final class FaceLandmarks { public FaceLandmarks(Landmark[] landmarks) { ... } }
//!
//!     public static native long create(String resourceDir);
//!     public static native FaceLandmarks[] processImage(long handle, byte[] rgb, int width, int height);
//!     public static native void destroy(long handle);
//! }
//! ```
//!
//! Same sentinels as the C ABI: `0` from `create` on failure, `null` from
//! `processImage` when there is no result or on error. A Java exception
//! raised while building the result array is left pending for the caller.

use std::ptr;
use std::slice;

use jni::errors::Result as JniResult;
use jni::objects::{JByteArray, JClass, JObject, JObjectArray, JString, JValue, ReleaseMode};
use jni::sys::{jint, jlong, jobjectArray};
use jni::JNIEnv;
use tracing::warn;

use crate::bridge::shared;
use crate::context::ContextHandle;
use crate::types::{FaceLandmarks, FaceMeshConfig, Frame};

const LANDMARK_CLASS: &str = "fr/audioptic/mediapipe/jni/MediaPipeFaceNative$Landmark";
const LANDMARK_CTOR: &str = "(FFF)V";
const FACE_CLASS: &str = "fr/audioptic/mediapipe/jni/MediaPipeFaceNative$FaceLandmarks";
const FACE_CTOR: &str = "([Lfr/audioptic/mediapipe/jni/MediaPipeFaceNative$Landmark;)V";

#[no_mangle]
pub extern "system" fn Java_fr_audioptic_mediapipe_jni_MediaPipeFaceNative_create<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    resource_dir: JString<'local>,
) -> jlong {
    let dir: String = match env.get_string(&resource_dir) {
        Ok(dir) => dir.into(),
        Err(e) => {
            warn!("Unreadable resource directory string: {}", e);
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

#[no_mangle]
pub extern "system" fn Java_fr_audioptic_mediapipe_jni_MediaPipeFaceNative_processImage<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
    rgb: JByteArray<'local>,
    width: jint,
    height: jint,
) -> jobjectArray {
    let handle = ContextHandle::from_raw(handle);
    if handle.is_null() {
        return ptr::null_mut();
    }
    let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
        warn!("Negative frame dimensions {}x{}", width, height);
        return ptr::null_mut();
    };

    let result = {
        // Borrowed for this block only; released without copy-back.
        let elements = match unsafe { env.get_array_elements(&rgb, ReleaseMode::NoCopyBack) } {
            Ok(elements) => elements,
            Err(e) => {
                warn!("Unable to access pixel array: {}", e);
                return ptr::null_mut();
            }
        };
        let pixels = unsafe { slice::from_raw_parts(elements.as_ptr() as *const u8, elements.len()) };
        shared().process(handle, &Frame::srgb(pixels, width, height))
    };

    let faces = match result {
        Ok(Some(faces)) => faces,
        Ok(None) => return ptr::null_mut(),
        Err(e) => {
            warn!("Failed to process frame on context {}: {}", handle, e);
            return ptr::null_mut();
        }
    };

    match to_java_faces(&mut env, &faces) {
        Ok(array) => array.into_raw(),
        Err(e) => {
            warn!("Failed to build Java landmark objects: {}", e);
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_fr_audioptic_mediapipe_jni_MediaPipeFaceNative_destroy<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
) {
    shared().destroy(ContextHandle::from_raw(handle));
}

/// Build `FaceLandmarks[]`, one `Landmark` object per point, in order.
fn to_java_faces<'local>(
    env: &mut JNIEnv<'local>,
    faces: &[FaceLandmarks],
) -> JniResult<JObjectArray<'local>> {
    let landmark_class = env.find_class(LANDMARK_CLASS)?;
    let face_class = env.find_class(FACE_CLASS)?;

    let result = env.new_object_array(faces.len() as jint, &face_class, JObject::null())?;

    for (i, face) in faces.iter().enumerate() {
        let landmarks =
            env.new_object_array(face.len() as jint, &landmark_class, JObject::null())?;

        for (j, landmark) in face.landmarks.iter().enumerate() {
            let object = env.new_object(
                &landmark_class,
                LANDMARK_CTOR,
                &[
                    JValue::Float(landmark.x),
                    JValue::Float(landmark.y),
                    JValue::Float(landmark.z),
                ],
            )?;
            env.set_object_array_element(&landmarks, j as jint, &object)?;
            // 468 landmarks per face would exhaust the local reference table.
            env.delete_local_ref(object)?;
        }

        let face_object = env.new_object(&face_class, FACE_CTOR, &[JValue::Object(&landmarks)])?;
        env.set_object_array_element(&result, i as jint, &face_object)?;
        env.delete_local_ref(face_object)?;
        env.delete_local_ref(landmarks)?;
    }

    Ok(result)
}
