//! Manifest-driven batch processing with resume support

mod manifest;
mod runner;

pub use manifest::{
    processed_manifest_path, read_input_manifest, ExistingOutput, ManifestEntry, OutputWriter,
    PROCESSED_SUFFIX,
};
pub use runner::{BatchRunner, BatchSummary, NoProgress, ProgressBarSink, ProgressSink};
