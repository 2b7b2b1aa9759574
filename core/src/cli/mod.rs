pub mod report;

use crate::types::{Modality, PhaseCommand, RunConfig, SegmenterOptions};
use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for fovcat
#[derive(Parser, Debug)]
#[command(name = "fovcat")]
#[command(about = "Field of view and contrast phase classification for CT/MRI manifests")]
#[command(version)]
pub struct Cli {
    /// CSV manifest with an `im_path` column
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Modality of every image in the manifest
    #[arg(value_name = "MODALITY")]
    pub modality: ModalityArg,

    /// Directory where segmentation masks are saved
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Skip field of view recognition
    #[arg(long = "no_fov")]
    pub no_fov: bool,

    /// Skip contrast phase recognition
    #[arg(long = "no_phase")]
    pub no_phase: bool,

    #[command(flatten)]
    pub segmentation: SegmenterArgs,

    /// Phase recognition program
    #[arg(long, value_name = "PROGRAM")]
    pub phase_command: Option<PathBuf>,

    /// Extra argument for the phase program (repeatable)
    #[arg(long = "phase-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub phase_args: Vec<String>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolves the arguments into a run configuration
    pub fn into_config(self) -> RunConfig {
        let mut config = RunConfig::new(self.input, self.modality.into())
            .no_fov(self.no_fov)
            .no_phase(self.no_phase)
            .with_segmenter(self.segmentation.options())
            .show_progress(!self.no_progress);

        if let Some(dir) = self.output {
            config = config.with_output_dir(dir);
        }
        if let Some(path) = self.segmentation.class_map {
            config = config.with_class_map_overrides(path);
        }
        if let Some(program) = self.phase_command {
            let command = PhaseCommand::new(program).with_args(self.phase_args);
            config = config.with_phase_command(command);
        }
        config
    }
}

/// Segmentation backend arguments shared by the binaries
#[derive(Args, Debug, Clone)]
pub struct SegmenterArgs {
    /// Segmentation program
    #[arg(long, value_name = "PROGRAM", default_value = "TotalSegmentator")]
    pub segmenter: PathBuf,

    /// Device for the segmentation model (e.g. gpu, cpu)
    #[arg(long)]
    pub device: Option<String>,

    /// Use the fast, lower-resolution segmentation model
    #[arg(long)]
    pub fast: bool,

    /// JSON file overriding class codes per task
    #[arg(long, value_name = "JSON")]
    pub class_map: Option<PathBuf>,
}

impl SegmenterArgs {
    pub fn options(&self) -> SegmenterOptions {
        SegmenterOptions {
            program: self.segmenter.clone(),
            device: self.device.clone(),
            fast: self.fast,
        }
    }
}

/// Modality argument
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModalityArg {
    #[value(name = "CT")]
    Ct,
    #[value(name = "MRI")]
    Mri,
}

impl From<ModalityArg> for Modality {
    fn from(arg: ModalityArg) -> Self {
        match arg {
            ModalityArg::Ct => Modality::Ct,
            ModalityArg::Mri => Modality::Mri,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}
