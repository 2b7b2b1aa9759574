pub mod api;
pub mod batch;
pub mod cli;
pub mod error;
pub mod recognition;
pub mod segmentation;
pub mod types;
pub mod volume;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::{ClassificationRecord, ImageRecognizer, Recognized, ERROR_LABEL};
pub use batch::{
    processed_manifest_path, BatchRunner, BatchSummary, NoProgress, ProgressBarSink,
    ProgressSink,
};
pub use cli::report::{AnalysisReport, TextReport};
pub use error::{FovcatError, Result};
pub use recognition::{
    CommandPhaseRecognizer, FovAnalysis, FovRecognizer, FovSignals, PhaseRecognizer,
};
pub use segmentation::{Segmentation, Segmenter, TotalSegmentatorCli};
pub use types::*;
pub use volume::{SliceMask, Volume};
