//! Graph initialization
//!
//! Turns a [`FaceMeshConfig`] into a started, pollable face landmark
//! pipeline. Nothing partially built survives a failure: whatever was
//! created before the failing step is dropped on the way out, poller
//! before instance.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{BridgeError, Result};
use crate::graph::{GraphEngine, GraphInstance, OutputPoller};
use crate::types::{
    FaceMeshConfig, SidePacket, DETECTOR_NODE, INPUT_STREAM, MIN_SCORE_OPTION,
    NUM_FACES_SIDE_PACKET, OUTPUT_STREAM, WITH_ATTENTION_SIDE_PACKET,
};

/// A running graph instance and the poller on its landmark stream.
///
/// Field order is drop order: the poller goes first.
pub struct Pipeline {
    pub(crate) poller: Box<dyn OutputPoller>,
    pub(crate) instance: Box<dyn GraphInstance>,
}

/// Path of the graph definition, if it exists under the resource directory.
pub fn locate_graph(config: &FaceMeshConfig) -> Result<PathBuf> {
    let graph_path = config.graph_path();
    if !graph_path.is_file() {
        return Err(BridgeError::GraphAssetMissing(graph_path));
    }
    Ok(graph_path)
}

/// Build and start the face landmark graph.
///
/// The asset root must already be registered with `engine`; see
/// [`crate::resource::AssetRoot`].
pub fn initialize<E: GraphEngine + ?Sized>(engine: &E, config: &FaceMeshConfig) -> Result<Pipeline> {
    config.validate()?;
    let graph_path = locate_graph(config)?;

    let mut builder = engine.create_builder(&graph_path, INPUT_STREAM)?;
    builder.add_option_float(DETECTOR_NODE, MIN_SCORE_OPTION, config.min_score_thresh)?;
    builder.add_side_packet(NUM_FACES_SIDE_PACKET, SidePacket::Int(config.num_faces))?;
    builder.add_side_packet(WITH_ATTENTION_SIDE_PACKET, SidePacket::Bool(config.with_attention))?;

    let mut instance = builder.build()?;
    debug!("Face landmark graph built from {}", graph_path.display());

    let poller = instance.create_poller(OUTPUT_STREAM)?;
    let mut pipeline = Pipeline { poller, instance };
    pipeline.instance.start()?;

    info!(
        "Face landmark graph started (min_score_thresh={}, num_faces={}, with_attention={})",
        config.min_score_thresh, config.num_faces, config.with_attention
    );
    Ok(pipeline)
}
