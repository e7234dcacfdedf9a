//! Create / process / destroy over a handle table.
//!
//! [`Bridge`] is the whole lifecycle behind the boundary: it owns the graph
//! engine, the asset root and every live context. The C ABI and the JNI
//! entry points both drive the process-wide [`shared`] instance.

use std::sync::Arc;

use facemesh_ffi_common::HandleTable;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::context::{ContextHandle, FaceContext};
use crate::error::{BridgeError, Result};
use crate::graph::{DefaultEngine, GraphEngine};
use crate::initializer;
use crate::processor;
use crate::resource::AssetRoot;
use crate::types::{FaceLandmarks, FaceMeshConfig, Frame};

lazy_static! {
    static ref SHARED: Bridge<DefaultEngine> = Bridge::new(DefaultEngine::default());
}

/// The bridge used by the exported C and JNI functions.
pub fn shared() -> &'static Bridge<DefaultEngine> {
    &SHARED
}

/// Face landmark contexts over one graph engine.
///
/// The asset root comes from the engine, so several bridges over the same
/// engine (the [`shared`] one included) agree on the resource directory.
pub struct Bridge<E: GraphEngine> {
    engine: E,
    root: Arc<AssetRoot>,
    contexts: HandleTable<FaceContext>,
}

impl<E: GraphEngine> Bridge<E> {
    pub fn new(engine: E) -> Self {
        Self {
            root: engine.asset_root(),
            engine,
            contexts: HandleTable::new(),
        }
    }

    /// Build, start and register a face landmark pipeline.
    ///
    /// All-or-nothing: on error nothing stays allocated and the asset root
    /// lease is returned.
    pub fn create(&self, config: &FaceMeshConfig) -> Result<ContextHandle> {
        config.validate()?;
        // A missing asset never touches the process-wide root.
        initializer::locate_graph(config)?;

        let lease = self.root.acquire(&self.engine, config.resource_dir())?;
        let pipeline = initializer::initialize(&self.engine, config)?;
        let handle = ContextHandle::from_table(self.contexts.insert(FaceContext::new(pipeline, lease)));

        info!(
            "Created face landmark context {} ({} live)",
            handle,
            self.contexts.len()
        );
        Ok(handle)
    }

    /// Process one frame on `handle`.
    ///
    /// `Ok(None)`: the graph produced nothing for this frame.
    /// `Ok(Some(faces))`: one result batch, possibly with zero faces.
    pub fn process(
        &self,
        handle: ContextHandle,
        frame: &Frame<'_>,
    ) -> Result<Option<Vec<FaceLandmarks>>> {
        self.contexts
            .with(handle.id(), |context| processor::process_frame(context, frame))
            .unwrap_or(Err(BridgeError::InvalidHandle(handle.id())))
    }

    /// Tear down `handle`. Unknown, zero and already-destroyed handles are ignored.
    ///
    /// Returns whether a context was removed.
    pub fn destroy(&self, handle: ContextHandle) -> bool {
        let Some(entry) = self.contexts.remove(handle.id()) else {
            debug!("Ignoring destroy of unknown context {}", handle);
            return false;
        };

        match Arc::try_unwrap(entry) {
            Ok(context) => drop(Mutex::into_inner(context)),
            // A concurrent call still holds it; it is dropped when that call returns.
            Err(shared) => drop(shared),
        }

        info!(
            "Destroyed face landmark context {} ({} live)",
            handle,
            self.contexts.len()
        );
        true
    }

    /// Number of contexts not yet destroyed.
    pub fn live_contexts(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_live(&self, handle: ContextHandle) -> bool {
        self.contexts.contains(handle.id())
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn asset_root(&self) -> &AssetRoot {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;
    use crate::graph::UnavailableEngine;
    use crate::scripted::{FailPoint, ScriptedEngine};
    use crate::types::{Landmark, GRAPH_ASSET_PATH};

    fn resource_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let graph = dir.path().join(GRAPH_ASSET_PATH);
        fs::create_dir_all(graph.parent().unwrap()).unwrap();
        fs::write(&graph, b"graph").unwrap();
        dir
    }

    #[test]
    fn test_create_and_destroy() {
        let dir = resource_dir();
        let bridge = Bridge::new(ScriptedEngine::new());

        let handle = bridge.create(&FaceMeshConfig::new(dir.path())).unwrap();

        assert!(!handle.is_null());
        assert!(bridge.is_live(handle));
        assert_eq!(bridge.asset_root().live(), 1);

        assert!(bridge.destroy(handle));
        assert!(!bridge.is_live(handle));
        assert_eq!(bridge.live_contexts(), 0);
        assert_eq!(bridge.asset_root().live(), 0);
        assert_eq!(bridge.engine().live_instances(), 0);
        assert_eq!(bridge.engine().live_pollers(), 0);
    }

    #[test]
    fn test_create_missing_asset_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Bridge::new(ScriptedEngine::new());

        let err = bridge.create(&FaceMeshConfig::new(dir.path())).unwrap_err();

        assert!(matches!(err, BridgeError::GraphAssetMissing(_)));
        assert_eq!(bridge.live_contexts(), 0);
        assert_eq!(bridge.asset_root().live(), 0);
    }

    #[test]
    fn test_create_failure_returns_lease() {
        let dir = resource_dir();
        let engine = ScriptedEngine::new();
        engine.fail_at(FailPoint::Start);
        let bridge = Bridge::new(engine);

        assert!(bridge.create(&FaceMeshConfig::new(dir.path())).is_err());
        assert_eq!(bridge.asset_root().live(), 0);
        assert_eq!(bridge.engine().live_instances(), 0);
    }

    #[test]
    fn test_process_null_handle() {
        let bridge = Bridge::new(ScriptedEngine::new());
        let pixels = vec![0u8; Frame::expected_len(2, 2).unwrap()];

        let err = bridge
            .process(ContextHandle::NULL, &Frame::srgb(&pixels, 2, 2))
            .unwrap_err();

        assert!(matches!(err, BridgeError::InvalidHandle(0)));
        assert_eq!(bridge.engine().frames_processed(), 0);
    }

    #[test]
    fn test_process_after_destroy_is_invalid() {
        let dir = resource_dir();
        let bridge = Bridge::new(ScriptedEngine::new());
        let handle = bridge.create(&FaceMeshConfig::new(dir.path())).unwrap();
        bridge.destroy(handle);
        let pixels = vec![0u8; Frame::expected_len(2, 2).unwrap()];

        let result = bridge.process(handle, &Frame::srgb(&pixels, 2, 2));

        assert!(matches!(result, Err(BridgeError::InvalidHandle(_))));
    }

    #[test]
    fn test_destroy_null_and_twice() {
        let dir = resource_dir();
        let bridge = Bridge::new(ScriptedEngine::new());
        let handle = bridge.create(&FaceMeshConfig::new(dir.path())).unwrap();

        assert!(!bridge.destroy(ContextHandle::NULL));
        assert!(bridge.destroy(handle));
        assert!(!bridge.destroy(handle));
        assert_eq!(bridge.asset_root().live(), 0);
    }

    #[test]
    fn test_second_root_rejected_while_first_live() {
        let first = resource_dir();
        let second = resource_dir();
        let bridge = Bridge::new(ScriptedEngine::new());

        let handle = bridge.create(&FaceMeshConfig::new(first.path())).unwrap();
        let err = bridge
            .create(&FaceMeshConfig::new(second.path()))
            .unwrap_err();
        assert!(matches!(err, BridgeError::ResourceRootConflict { .. }));

        bridge.destroy(handle);
        let moved = bridge.create(&FaceMeshConfig::new(second.path())).unwrap();
        assert_eq!(
            bridge.asset_root().current(),
            Some(PathBuf::from(second.path()))
        );
        bridge.destroy(moved);
    }

    #[test]
    fn test_bridges_over_one_engine_share_root() {
        let first = resource_dir();
        let second = resource_dir();
        let engine = ScriptedEngine::new();
        let a = Bridge::new(engine.clone());
        let b = Bridge::new(engine.clone());

        let handle = a.create(&FaceMeshConfig::new(first.path())).unwrap();
        let err = b
            .create(&FaceMeshConfig::new(second.path()))
            .unwrap_err();

        assert!(matches!(err, BridgeError::ResourceRootConflict { live: 1, .. }));
        assert_eq!(b.asset_root().current(), Some(PathBuf::from(first.path())));
        assert_eq!(engine.resource_dirs(), vec![PathBuf::from(first.path())]);

        a.destroy(handle);
        let moved = b.create(&FaceMeshConfig::new(second.path())).unwrap();
        assert_eq!(a.asset_root().current(), Some(PathBuf::from(second.path())));
        b.destroy(moved);
    }

    #[test]
    fn test_contexts_are_independent() {
        let dir = resource_dir();
        let bridge = Bridge::new(ScriptedEngine::new());
        let a = bridge.create(&FaceMeshConfig::new(dir.path())).unwrap();
        let b = bridge.create(&FaceMeshConfig::new(dir.path())).unwrap();
        assert_ne!(a, b);

        bridge.destroy(a);
        bridge.engine().push_batch(vec![vec![Landmark::new(0.4, 0.5, 0.6)]]);
        let pixels = vec![0u8; Frame::expected_len(2, 2).unwrap()];
        let faces = bridge
            .process(b, &Frame::srgb(&pixels, 2, 2))
            .unwrap()
            .unwrap();

        assert_eq!(faces.len(), 1);
        assert_eq!(bridge.live_contexts(), 1);
    }

    #[test]
    fn test_unavailable_engine_never_creates() {
        let dir = resource_dir();
        let bridge = Bridge::new(UnavailableEngine);

        let err = bridge.create(&FaceMeshConfig::new(dir.path())).unwrap_err();

        assert!(matches!(err, BridgeError::NativeUnavailable));
        assert_eq!(bridge.asset_root().live(), 0);
    }
}
