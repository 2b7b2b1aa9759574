use crate::error::{FovcatError, Result};
use crate::types::Modality;
use std::path::PathBuf;

/// Name of the image path column in input and output manifests
pub const IM_PATH_COLUMN: &str = "im_path";

/// Name of the field of view column in the output manifest
pub const FOV_COLUMN: &str = "fov";

/// Name of the phase column in the output manifest
pub const PHASE_COLUMN: &str = "phase";

/// Options forwarded to the segmentation model command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmenterOptions {
    /// Segmentation program to invoke
    pub program: PathBuf,

    /// Device to run on (e.g. `gpu`, `cpu`)
    pub device: Option<String>,

    /// Use the lower-resolution fast model
    pub fast: bool,
}

impl Default for SegmenterOptions {
    fn default() -> Self {
        Self {
            program: PathBuf::from("TotalSegmentator"),
            device: None,
            fast: false,
        }
    }
}

/// External program used for phase recognition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseCommand {
    /// Program to invoke
    pub program: PathBuf,

    /// Arguments passed before the generated ones
    pub args: Vec<String>,
}

impl PhaseCommand {
    /// Creates a phase command without extra arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Builder: Set extra arguments
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// Resolved configuration of one batch run
///
/// # Example
///
/// ```
/// use fovcat_core::{Modality, RunConfig};
///
/// let config = RunConfig::new("scans.csv", Modality::Ct).no_phase(true);
///
/// assert!(config.run_fov);
/// assert!(!config.run_phase);
/// assert_eq!(config.columns(), vec!["im_path", "fov"]);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Input manifest path
    pub input: PathBuf,

    /// Modality of every image in the manifest
    pub modality: Modality,

    /// Directory where segmentation masks are persisted
    pub output_dir: Option<PathBuf>,

    /// Run field of view recognition
    pub run_fov: bool,

    /// Run phase recognition
    pub run_phase: bool,

    /// Segmentation model options
    pub segmenter: SegmenterOptions,

    /// JSON file with class map overrides
    pub class_map_overrides: Option<PathBuf>,

    /// Phase recognition backend
    pub phase_command: Option<PhaseCommand>,

    /// Show a progress bar
    pub show_progress: bool,
}

impl RunConfig {
    /// Creates a configuration running both classifiers
    pub fn new(input: impl Into<PathBuf>, modality: Modality) -> Self {
        Self {
            input: input.into(),
            modality,
            output_dir: None,
            run_fov: true,
            run_phase: true,
            segmenter: SegmenterOptions::default(),
            class_map_overrides: None,
            phase_command: None,
            show_progress: true,
        }
    }

    /// Builder: Persist segmentation masks under `dir`
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Builder: Disable field of view recognition
    pub fn no_fov(mut self, no_fov: bool) -> Self {
        self.run_fov = !no_fov;
        self
    }

    /// Builder: Disable phase recognition
    pub fn no_phase(mut self, no_phase: bool) -> Self {
        self.run_phase = !no_phase;
        self
    }

    /// Builder: Set segmentation model options
    pub fn with_segmenter(mut self, segmenter: SegmenterOptions) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Builder: Load class map overrides from a JSON file
    pub fn with_class_map_overrides(mut self, path: impl Into<PathBuf>) -> Self {
        self.class_map_overrides = Some(path.into());
        self
    }

    /// Builder: Set the phase recognition backend
    pub fn with_phase_command(mut self, command: PhaseCommand) -> Self {
        self.phase_command = Some(command);
        self
    }

    /// Builder: Show or hide the progress bar
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Output manifest columns for the enabled classifiers
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec![IM_PATH_COLUMN];
        if self.run_fov {
            columns.push(FOV_COLUMN);
        }
        if self.run_phase {
            columns.push(PHASE_COLUMN);
        }
        columns
    }

    /// Checks the configuration before any row is processed
    ///
    /// # Errors
    ///
    /// Returns [`FovcatError::Config`] if:
    /// - Both classifiers are disabled
    /// - Phase recognition is enabled without a phase command
    pub fn validate(&self) -> Result<()> {
        if !self.run_fov && !self.run_phase {
            return Err(FovcatError::Config(
                "both FOV and phase recognition are disabled; nothing to do".to_string(),
            ));
        }
        if self.run_phase && self.phase_command.is_none() {
            return Err(FovcatError::Config(
                "phase recognition needs --phase-command (or pass --no_phase)".to_string(),
            ));
        }
        Ok(())
    }
}
