//! Common FFI utilities for facemesh C-compatible interfaces.
//!
//! Shared between the bridge's C ABI and its JNI entry points:
//! C string conversion, boxed slice hand-off, the [`FfiResult`] error
//! convention and the integer [`HandleTable`] that stands in for raw
//! pointers at the boundary.
//!
//! # Memory Ownership
//!
//! - Functions returning `*mut c_char` or boxed slices transfer ownership to the caller
//! - Callers must use the corresponding `free_*` function to deallocate
//! - NULL pointers are handled safely (no-op for free functions)

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

mod handle;

pub use handle::HandleTable;

/// Convert a Rust string to an owned C string pointer.
///
/// If `s` contains an interior null byte, `fallback` is returned instead.
/// The pointer must be released with [`free_cstring`].
///
/// # Example
/// ```
/// use facemesh_ffi_common::{cstring_new_or_fallback, free_cstring};
///
/// let ptr = cstring_new_or_fallback("graph asset missing", "error");
/// unsafe { free_cstring(ptr) };
/// ```
#[inline]
pub fn cstring_new_or_fallback(s: &str, fallback: &'static str) -> *mut c_char {
    CString::new(s)
        .unwrap_or_else(|_| CString::new(fallback).expect("fallback must be valid"))
        .into_raw()
}

/// Free a C string produced by [`cstring_new_or_fallback`].
///
/// # Safety
/// The pointer must have been allocated by `CString::into_raw()` or be null.
#[inline]
pub unsafe fn free_cstring(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}

/// Free a boxed value handed out with `Box::into_raw`.
///
/// # Safety
/// The pointer must have been allocated by `Box::into_raw()` or be null.
#[inline]
pub unsafe fn free_boxed<T>(ptr: *mut T) -> Option<T> {
    if ptr.is_null() {
        return None;
    }
    Some(*unsafe { Box::from_raw(ptr) })
}

/// Free a boxed slice handed out with [`vec_into_raw`].
///
/// Does nothing if the pointer is null or the length is zero.
///
/// # Safety
/// The pointer and length must come from the same [`vec_into_raw`] call.
#[inline]
pub unsafe fn free_boxed_slice<T>(ptr: *mut T, len: usize) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)) }.into_vec()
}

/// Leak a vector as a boxed slice, returning pointer and length.
///
/// Empty vectors become `(null, 0)` so callers never see a dangling pointer.
#[inline]
pub fn vec_into_raw<T>(vec: Vec<T>) -> (*mut T, usize) {
    let len = vec.len();
    if len == 0 {
        (ptr::null_mut(), 0)
    } else {
        (Box::into_raw(vec.into_boxed_slice()) as *mut T, len)
    }
}

/// Borrow a C string as `&str`.
///
/// # Safety
/// The pointer must be valid and null-terminated, or null.
pub unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Result<&'a str, &'static str> {
    if ptr.is_null() {
        return Err("null pointer");
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| "invalid UTF-8")
}

/// Trait for `#[repr(C)]` result structs that carry an owned error message.
///
/// # Example
/// ```ignore
/// #[repr(C)]
/// pub struct CreateResultC {
///     pub success: bool,
///     pub error_msg: *mut c_char,
///     pub handle: i64,
/// }
///
/// impl FfiResult for CreateResultC {
///     const ERROR_FALLBACK: &'static str = "create failed";
///
///     fn error_fields(error_msg: *mut c_char) -> Self {
///         Self { success: false, error_msg, handle: 0 }
///     }
/// }
///
/// let result = CreateResultC::error("graph asset missing");
/// ```
pub trait FfiResult: Sized {
    /// Message used when the real one contains null bytes.
    const ERROR_FALLBACK: &'static str;

    /// Build the failed result around an already-allocated message.
    fn error_fields(error_msg: *mut c_char) -> Self;

    /// Create a failed result carrying `msg`.
    #[inline]
    fn error(msg: &str) -> Self {
        let error_msg = cstring_new_or_fallback(msg, Self::ERROR_FALLBACK);
        Self::error_fields(error_msg)
    }
}

/// Generate a version function that returns a static C string.
///
/// ```ignore
/// facemesh_ffi_common::define_version_fn!(facemesh_version);
/// ```
#[macro_export]
macro_rules! define_version_fn {
    ($fn_name:ident) => {
        #[no_mangle]
        pub extern "C" fn $fn_name() -> *const std::os::raw::c_char {
            concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const std::os::raw::c_char
        }
    };
}

/// Generate a function that frees strings handed out by this library.
///
/// ```ignore
/// facemesh_ffi_common::define_string_free!(facemesh_string_free);
/// ```
#[macro_export]
macro_rules! define_string_free {
    ($fn_name:ident) => {
        #[no_mangle]
        #[allow(clippy::not_unsafe_ptr_arg_deref)]
        pub extern "C" fn $fn_name(s: *mut std::os::raw::c_char) {
            unsafe { $crate::free_cstring(s) };
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubResult {
        ok: bool,
        error_msg: *mut c_char,
    }

    impl FfiResult for StubResult {
        const ERROR_FALLBACK: &'static str = "stub failed";

        fn error_fields(error_msg: *mut c_char) -> Self {
            Self {
                ok: false,
                error_msg,
            }
        }
    }

    #[test]
    fn test_cstring_new_or_fallback() {
        let ptr = cstring_new_or_fallback("hello", "fallback");
        assert!(!ptr.is_null());
        let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        assert_eq!(s, "hello");
        unsafe { free_cstring(ptr) };
    }

    #[test]
    fn test_cstring_with_null_bytes_uses_fallback() {
        let ptr = cstring_new_or_fallback("hel\0lo", "fallback");
        let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        assert_eq!(s, "fallback");
        unsafe { free_cstring(ptr) };
    }

    #[test]
    fn test_free_null_pointers_is_safe() {
        unsafe {
            free_cstring(ptr::null_mut());
            assert!(free_boxed::<i32>(ptr::null_mut()).is_none());
            assert!(free_boxed_slice::<f32>(ptr::null_mut(), 0).is_empty());
        }
    }

    #[test]
    fn test_vec_into_raw_empty() {
        let (ptr, len): (*mut i32, usize) = vec_into_raw(Vec::new());
        assert!(ptr.is_null());
        assert_eq!(len, 0);
    }

    #[test]
    fn test_vec_into_raw_gives_back_same_elements() {
        let (ptr, len) = vec_into_raw(vec![1.5f32, -2.0, 3.25]);
        assert!(!ptr.is_null());
        assert_eq!(len, 3);
        let back = unsafe { free_boxed_slice(ptr, len) };
        assert_eq!(back, vec![1.5, -2.0, 3.25]);
    }

    #[test]
    fn test_free_boxed_returns_value() {
        let ptr = Box::into_raw(Box::new(42u64));
        assert_eq!(unsafe { free_boxed(ptr) }, Some(42));
    }

    #[test]
    fn test_cstr_to_str_null() {
        let result = unsafe { cstr_to_str(ptr::null()) };
        assert_eq!(result.unwrap_err(), "null pointer");
    }

    #[test]
    fn test_cstr_to_str_valid() {
        let s = CString::new("/opt/facemesh/resources").unwrap();
        let result = unsafe { cstr_to_str(s.as_ptr()) };
        assert_eq!(result.unwrap(), "/opt/facemesh/resources");
    }

    #[test]
    fn test_ffi_result_error_owns_message() {
        let result = StubResult::error("bad\0message");
        assert!(!result.ok);
        let msg = unsafe { CStr::from_ptr(result.error_msg) }.to_str().unwrap();
        assert_eq!(msg, "stub failed");
        unsafe { free_cstring(result.error_msg) };
    }
}
