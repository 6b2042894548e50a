// THEORY:
// The `TargetSelector` picks the one blob the actuator will chase this frame.
//
// The policy is "first blob in extraction order": the blob whose first pixel
// comes earliest in the row-major scan of the mask. There is no memory of which
// object was followed in the previous frame. With several moving objects in
// view the chosen target can jump from one object to another between frames;
// that behaviour is kept as-is because there is no notion of object identity at
// this layer.

use crate::core_modules::blob::{Blob, Point};

/// The blob selected as this frame's target. Lives for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub blob: Blob,
}

impl Target {
    pub fn centroid(&self) -> Point {
        self.blob.centroid
    }
}

pub mod target_selector {
    use super::*;

    /// Selects the first blob of `blobs`; every other blob is ignored.
    pub fn select(blobs: &[Blob]) -> Option<Target> {
        blobs.first().cloned().map(|blob| Target { blob })
    }
}
