//! Frame processing
//!
//! One call is one synchronous round trip: push the frame, wait for the
//! graph to go idle, then take at most one result packet.

use tracing::debug;

use crate::context::FaceContext;
use crate::error::Result;
use crate::marshal;
use crate::types::{FaceLandmarks, Frame};

/// Run `frame` through the context's pipeline.
///
/// Returns `Ok(None)` when the graph produced no packet for this frame and
/// `Ok(Some(faces))` otherwise, where `faces` may be empty.
pub fn process_frame(
    context: &mut FaceContext,
    frame: &Frame<'_>,
) -> Result<Option<Vec<FaceLandmarks>>> {
    frame.validate()?;

    let pipeline = &mut context.pipeline;
    pipeline.instance.process(frame)?;
    pipeline.instance.wait_until_idle()?;
    context.frames += 1;

    if pipeline.poller.queue_size() == 0 {
        debug!("Frame {}: no landmark packet", context.frames);
        return Ok(None);
    }

    let packet = pipeline.poller.poll()?;
    let faces = marshal::take_faces(packet);
    debug!("Frame {}: {} face(s)", context.frames, faces.len());
    Ok(Some(faces))
}
