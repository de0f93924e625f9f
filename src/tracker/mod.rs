mod ids;
mod tracker;
mod types;

pub use tracker::{Refinement, SignalTracker};
pub use types::{PositionSample, Track, TrackId};
