//! Face landmark contexts and their handles.

use std::fmt;

use crate::initializer::Pipeline;
use crate::resource::AssetRootLease;

/// Opaque identifier handed to callers. `0` is never a live context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(u64);

impl ContextHandle {
    pub const NULL: ContextHandle = ContextHandle(0);

    /// Reinterpret a boundary integer (C `int64_t`, Java `long`).
    pub fn from_raw(raw: i64) -> Self {
        Self(raw as u64)
    }

    pub fn as_raw(self) -> i64 {
        self.0 as i64
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn from_table(id: u64) -> Self {
        Self(id)
    }

    pub(crate) fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything one handle owns.
///
/// Drops in declaration order: poller, instance, then the asset root lease.
pub struct FaceContext {
    pub(crate) pipeline: Pipeline,
    _root: AssetRootLease,
    pub(crate) frames: u64,
}

impl FaceContext {
    pub(crate) fn new(pipeline: Pipeline, root: AssetRootLease) -> Self {
        Self {
            pipeline,
            _root: root,
            frames: 0,
        }
    }

    /// Frames pushed through this context so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_round_trip_through_java_long() {
        let handle = ContextHandle::from_table(42);
        assert_eq!(ContextHandle::from_raw(handle.as_raw()), handle);
        assert!(!handle.is_null());
    }

    #[test]
    fn test_zero_is_null() {
        assert!(ContextHandle::from_raw(0).is_null());
        assert_eq!(ContextHandle::NULL.as_raw(), 0);
    }
}
