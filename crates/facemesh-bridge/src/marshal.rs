//! Native landmark results to caller-owned values.

use crate::graph::LandmarkPacket;
use crate::types::FaceLandmarks;

/// Deep-copy every face of `packet`, preserving face and landmark order.
///
/// Zero faces yields an empty vector. Nothing in the result borrows from the
/// packet, so it can be released as soon as this returns.
pub fn to_faces(packet: &dyn LandmarkPacket) -> Vec<FaceLandmarks> {
    (0..packet.face_count())
        .map(|index| FaceLandmarks::new(packet.face(index).to_vec()))
        .collect()
}

/// Copy the packet out, then release it. Release also runs if copying panics.
pub fn take_faces(packet: Box<dyn LandmarkPacket>) -> Vec<FaceLandmarks> {
    to_faces(packet.as_ref())
}
