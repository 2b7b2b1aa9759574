use crate::error::{FovcatError, Result};
use crate::segmentation::stderr_tail;
use crate::types::{Modality, PhaseCommand};
use crate::volume::Volume;
use log::debug;
use std::path::Path;
use std::process::Command;

/// Contrast phase recognition capability
///
/// Labels are opaque strings owned by the backend.
pub trait PhaseRecognizer {
    /// Recognizes the contrast phase of a canonical volume
    ///
    /// `output_base` is a per-image path prefix the backend may use for its
    /// own artifacts.
    fn recognize(
        &self,
        volume: &Volume,
        modality: Modality,
        output_base: Option<&Path>,
    ) -> Result<String>;
}

impl<P: PhaseRecognizer + ?Sized> PhaseRecognizer for Box<P> {
    fn recognize(
        &self,
        volume: &Volume,
        modality: Modality,
        output_base: Option<&Path>,
    ) -> Result<String> {
        (**self).recognize(volume, modality, output_base)
    }
}

/// Phase recognizer delegating to an external program
///
/// The program is invoked as
/// `<program> [args...] --input <file> --modality <CT|MRI> [--output <base>]`
/// and must print the phase label as the last non-empty line of stdout.
#[derive(Debug, Clone)]
pub struct CommandPhaseRecognizer {
    command: PhaseCommand,
}

impl CommandPhaseRecognizer {
    pub fn new(command: PhaseCommand) -> Self {
        Self { command }
    }

    fn command(&self, input: &Path, modality: Modality, output_base: Option<&Path>) -> Command {
        let mut command = Command::new(&self.command.program);
        command
            .args(&self.command.args)
            .arg("--input")
            .arg(input)
            .arg("--modality")
            .arg(modality.simple_name());
        if let Some(base) = output_base {
            command.arg("--output").arg(base);
        }
        command
    }
}

/// Last non-empty line of a program's stdout
fn last_line(stdout: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .map(String::from)
}

impl PhaseRecognizer for CommandPhaseRecognizer {
    fn recognize(
        &self,
        volume: &Volume,
        modality: Modality,
        output_base: Option<&Path>,
    ) -> Result<String> {
        let workdir = tempfile::Builder::new().prefix("fovcat-phase-").tempdir()?;
        let input = workdir.path().join("image.nii.gz");
        volume.save(&input)?;

        let mut command = self.command(&input, modality, output_base);
        debug!("Running {:?}", command);
        let program = self.command.program.display();
        let result = command
            .output()
            .map_err(|e| FovcatError::Phase(format!("failed to run {}: {}", program, e)))?;

        if !result.status.success() {
            return Err(FovcatError::Phase(format!(
                "{} exited with {}: {}",
                program,
                result.status,
                stderr_tail(&result.stderr)
            )));
        }

        last_line(&result.stdout)
            .ok_or_else(|| FovcatError::Phase(format!("{} printed no phase label", program)))
    }
}
