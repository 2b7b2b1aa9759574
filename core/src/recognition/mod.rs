//! Field of view and contrast phase recognition
//!
//! FOV recognition is rule-based over organ presence masks. Phase recognition
//! is delegated to an external backend behind [`PhaseRecognizer`].

mod fov;
mod phase;

pub use fov::{
    probe_organs, FovAnalysis, FovRecognizer, FovSignals, EDGE_SLICES, MIN_SLICES,
};
pub use phase::{CommandPhaseRecognizer, PhaseRecognizer};
