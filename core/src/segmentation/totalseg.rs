use super::{Segmentation, Segmenter};
use crate::error::{FovcatError, Result};
use crate::types::{ClassMapRegistry, SegmentationTask, SegmenterOptions};
use crate::volume::{squeeze_to_3d, Volume};
use log::debug;
use ndarray::Array3;
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::path::Path;
use std::process::Command;

/// Number of stderr lines kept in error messages
const STDERR_TAIL_LINES: usize = 5;

/// Segmenter running the TotalSegmentator command-line tool
///
/// Each call writes the volume to a temporary directory, runs
/// `TotalSegmentator -i <in> -o <out> --ml --task <task>` and reads the
/// multilabel output back.
#[derive(Debug, Clone)]
pub struct TotalSegmentatorCli {
    options: SegmenterOptions,
    class_maps: ClassMapRegistry,
}

impl TotalSegmentatorCli {
    /// Creates a segmenter from options and the class maps of each task
    pub fn new(options: SegmenterOptions, class_maps: ClassMapRegistry) -> Self {
        Self {
            options,
            class_maps,
        }
    }

    /// Builds the command segmenting `input` into `output`
    fn command(&self, input: &Path, output: &Path, task: SegmentationTask) -> Command {
        let mut command = Command::new(&self.options.program);
        command
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .arg("--ml")
            .arg("--task")
            .arg(task.name());
        if let Some(device) = &self.options.device {
            command.arg("--device").arg(device);
        }
        if self.options.fast {
            command.arg("--fast");
        }
        command
    }
}

/// Last lines of a process' stderr
pub(crate) fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Reads a multilabel NIfTI file as a 3D label grid
pub(crate) fn read_labels(path: &Path) -> Result<Array3<u16>> {
    let obj = ReaderOptions::new().read_file(path)?;
    squeeze_to_3d(obj.into_volume().into_ndarray::<u16>()?)
}

impl Segmenter for TotalSegmentatorCli {
    fn segment(&self, volume: &Volume, task: SegmentationTask) -> Result<Segmentation> {
        let workdir = tempfile::Builder::new().prefix("fovcat-seg-").tempdir()?;
        let input = workdir.path().join("image.nii.gz");
        let output = workdir.path().join("segmentation.nii.gz");
        volume.save(&input)?;

        let mut command = self.command(&input, &output, task);
        debug!("Running {:?}", command);
        let result = command.output().map_err(|e| {
            FovcatError::Segmentation(format!(
                "failed to run {}: {}",
                self.options.program.display(),
                e
            ))
        })?;

        if !result.status.success() {
            return Err(FovcatError::Segmentation(format!(
                "{} exited with {}: {}",
                self.options.program.display(),
                result.status,
                stderr_tail(&result.stderr)
            )));
        }

        let labels = read_labels(&output)?;
        if labels.shape() != volume.data().shape() {
            return Err(FovcatError::InvalidVolume(format!(
                "segmentation shape {:?} does not match volume shape {:?}",
                labels.shape(),
                volume.data().shape()
            )));
        }

        Ok(Segmentation::new(
            labels,
            self.class_maps.get(task).clone(),
        ))
    }
}
