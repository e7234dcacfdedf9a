//! Seam between the bridge and the graph engine.
//!
//! The bridge never talks to MediaPipe directly; it drives these traits.
//! [`mediapipe::MediaPipeEngine`] implements them over `libmediapipe`,
//! [`crate::scripted::ScriptedEngine`] replays canned results in-process.
//!
//! Ownership follows the engine's C API: a builder is consumed by
//! [`GraphBuilder::build`], a poller must be dropped before the instance
//! it polls, and a [`LandmarkPacket`] releases its native storage on drop.

use std::path::Path;
use std::sync::Arc;

use crate::error::{BridgeError, Result};
use crate::resource::AssetRoot;
use crate::types::{Frame, Landmark, SidePacket};

#[cfg(feature = "mediapipe")]
pub mod mediapipe;

/// Entry point of a graph engine.
pub trait GraphEngine: Send + Sync {
    /// Set the process-wide directory the engine resolves assets against.
    fn set_resource_dir(&self, dir: &Path) -> Result<()>;

    /// Start building an instance of the graph stored at `graph_path`.
    fn create_builder(&self, graph_path: &Path, input_stream: &str)
        -> Result<Box<dyn GraphBuilder>>;

    /// Tracker for the directory passed to [`set_resource_dir`](Self::set_resource_dir).
    ///
    /// Every bridge over engines that share one resource directory must get
    /// the same root. The default is a fresh root per call.
    fn asset_root(&self) -> Arc<AssetRoot> {
        AssetRoot::new()
    }
}

/// Collects build-time options for one graph instance.
pub trait GraphBuilder {
    fn add_option_float(&mut self, node: &str, option: &str, value: f32) -> Result<()>;

    fn add_side_packet(&mut self, name: &str, packet: SidePacket) -> Result<()>;

    /// Finalize the graph. The builder is consumed whether or not this succeeds.
    fn build(self: Box<Self>) -> Result<Box<dyn GraphInstance>>;
}

/// A finalized graph instance.
pub trait GraphInstance: Send {
    /// Attach a poller to `output_stream`. Must be called before [`start`](Self::start).
    fn create_poller(&mut self, output_stream: &str) -> Result<Box<dyn OutputPoller>>;

    fn start(&mut self) -> Result<()>;

    /// Push one frame into the primary input stream. The engine copies the pixels.
    fn process(&mut self, frame: &Frame<'_>) -> Result<()>;

    /// Block until every in-flight packet has been fully processed.
    fn wait_until_idle(&mut self) -> Result<()>;
}

/// Pull side of one output stream.
pub trait OutputPoller: Send {
    /// Number of packets ready to be polled.
    fn queue_size(&self) -> usize;

    /// Pop the oldest ready packet.
    fn poll(&mut self) -> Result<Box<dyn LandmarkPacket>>;
}

/// Multi-face landmark result still owned by the engine.
pub trait LandmarkPacket {
    fn face_count(&self) -> usize;

    /// Landmarks of face `index`, in engine order. Panics if out of range.
    fn face(&self, index: usize) -> &[Landmark];
}

/// Engine used when the crate is built without native support.
///
/// Every build attempt fails with [`BridgeError::NativeUnavailable`], which
/// keeps the exported symbols linkable and Create answering 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableEngine;

impl GraphEngine for UnavailableEngine {
    fn set_resource_dir(&self, _dir: &Path) -> Result<()> {
        Ok(())
    }

    fn create_builder(
        &self,
        _graph_path: &Path,
        _input_stream: &str,
    ) -> Result<Box<dyn GraphBuilder>> {
        Err(BridgeError::NativeUnavailable)
    }
}

/// Engine behind the process-wide bridge.
#[cfg(feature = "mediapipe")]
pub type DefaultEngine = mediapipe::MediaPipeEngine;

/// Engine behind the process-wide bridge.
#[cfg(not(feature = "mediapipe"))]
pub type DefaultEngine = UnavailableEngine;
