use crate::error::{FovcatError, Result};
use crate::recognition::{CommandPhaseRecognizer, FovRecognizer, PhaseRecognizer};
use crate::segmentation::{Segmenter, TotalSegmentatorCli};
use crate::types::{
    ClassMapRegistry, FovLabel, Modality, RunConfig, FOV_COLUMN, IM_PATH_COLUMN, PHASE_COLUMN,
};
use crate::volume::Volume;
use log::{debug, warn};
use std::fmt;
use std::path::{Path, PathBuf};

/// Label cell written for a classifier that failed on an image
pub const ERROR_LABEL: &str = "error";

/// Outcome of one classifier on one image
///
/// Failures are kept as values so one bad image never aborts a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognized<T> {
    /// Classifier produced a label
    Label(T),
    /// Classifier failed; holds the error message
    Error(String),
}

impl<T> Recognized<T> {
    /// Wraps a classifier result
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(label) => Recognized::Label(label),
            Err(e) => Recognized::Error(e.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Recognized::Error(_))
    }

    /// Returns the label, if any
    pub fn label(&self) -> Option<&T> {
        match self {
            Recognized::Label(label) => Some(label),
            Recognized::Error(_) => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Recognized<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recognized::Label(label) => write!(f, "{}", label),
            Recognized::Error(_) => write!(f, "{}", ERROR_LABEL),
        }
    }
}

/// Result of running the enabled classifiers on one image
///
/// A classifier that is disabled for the run has `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRecord {
    /// Image path as written in the input manifest
    pub im_path: String,

    /// Field of view outcome
    pub fov: Option<Recognized<FovLabel>>,

    /// Contrast phase outcome
    pub phase: Option<Recognized<String>>,
}

impl ClassificationRecord {
    /// Returns whether any enabled classifier failed
    pub fn has_errors(&self) -> bool {
        self.fov.as_ref().is_some_and(Recognized::is_error)
            || self.phase.as_ref().is_some_and(Recognized::is_error)
    }

    /// Output manifest cells, in column order
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![self.im_path.clone()];
        if let Some(fov) = &self.fov {
            cells.push(fov.to_string());
        }
        if let Some(phase) = &self.phase {
            cells.push(phase.to_string());
        }
        cells
    }
}

/// Per-image pipeline: load, reorient, then run each enabled classifier
///
/// Each classifier is isolated: a FOV failure does not prevent the phase
/// attempt, and a load failure marks every enabled classifier as failed.
pub struct ImageRecognizer {
    modality: Modality,
    fov: Option<FovRecognizer<Box<dyn Segmenter>>>,
    phase: Option<Box<dyn PhaseRecognizer>>,
    output_dir: Option<PathBuf>,
}

impl ImageRecognizer {
    /// Creates a pipeline with no classifier enabled
    pub fn new(modality: Modality) -> Self {
        Self {
            modality,
            fov: None,
            phase: None,
            output_dir: None,
        }
    }

    /// Builds the pipeline a run configuration asks for
    ///
    /// FOV recognition uses the TotalSegmentator command with the built-in
    /// class maps, merged with the configured overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the class map
    /// overrides cannot be read or the output directory cannot be created.
    /// Nothing is created on disk for an invalid configuration.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        config.validate()?;
        let mut recognizer = Self::new(config.modality);

        if config.run_fov {
            let mut class_maps = ClassMapRegistry::builtin();
            if let Some(path) = &config.class_map_overrides {
                class_maps = class_maps.with_overrides_from_file(path)?;
            }
            let segmenter = TotalSegmentatorCli::new(config.segmenter.clone(), class_maps);
            recognizer = recognizer.with_fov(Box::new(segmenter));
        }

        if config.run_phase {
            let command = config.phase_command.clone().ok_or_else(|| {
                FovcatError::Config("phase recognition needs a phase command".to_string())
            })?;
            recognizer = recognizer.with_phase(Box::new(CommandPhaseRecognizer::new(command)));
        }

        if let Some(dir) = &config.output_dir {
            std::fs::create_dir_all(dir)?;
            recognizer = recognizer.with_output_dir(dir);
        }
        Ok(recognizer)
    }

    /// Builder: Enable FOV recognition with the given segmenter
    pub fn with_fov(mut self, segmenter: Box<dyn Segmenter>) -> Self {
        self.fov = Some(FovRecognizer::new(segmenter));
        self
    }

    /// Builder: Enable phase recognition with the given backend
    pub fn with_phase(mut self, phase: Box<dyn PhaseRecognizer>) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Builder: Persist segmentation masks under `dir`
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    /// Output manifest columns for the enabled classifiers
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec![IM_PATH_COLUMN];
        if self.fov.is_some() {
            columns.push(FOV_COLUMN);
        }
        if self.phase.is_some() {
            columns.push(PHASE_COLUMN);
        }
        columns
    }

    /// Classifies one image
    ///
    /// `row_index` names the per-image artifacts under the output directory:
    /// the mask is written to `<dir>/<row_index>.nii.gz` and the phase backend
    /// gets `<dir>/<row_index>` as its output base.
    pub fn process(&self, row_index: usize, im_path: &str) -> ClassificationRecord {
        let volume = match Volume::open_canonical(Path::new(im_path)) {
            Ok(volume) => volume,
            Err(e) => {
                warn!("Failed to load {}: {}", im_path, e);
                let message = e.to_string();
                return ClassificationRecord {
                    im_path: im_path.to_string(),
                    fov: self.fov.as_ref().map(|_| Recognized::Error(message.clone())),
                    phase: self.phase.as_ref().map(|_| Recognized::Error(message.clone())),
                };
            }
        };
        debug!("Loaded {} with shape {:?}", im_path, volume.shape());

        let output_base = self
            .output_dir
            .as_ref()
            .map(|dir| dir.join(row_index.to_string()));

        let fov = self.fov.as_ref().map(|fov| {
            let mask_path = output_base
                .as_ref()
                .map(|base| base.with_extension("nii.gz"));
            let result = fov.recognize(&volume, self.modality, mask_path.as_deref());
            if let Err(e) = &result {
                warn!("FOV recognition failed for {}: {}", im_path, e);
            }
            Recognized::from_result(result)
        });

        let phase = self.phase.as_ref().map(|phase| {
            let result = phase.recognize(&volume, self.modality, output_base.as_deref());
            if let Err(e) = &result {
                warn!("Phase recognition failed for {}: {}", im_path, e);
            }
            Recognized::from_result(result)
        });

        ClassificationRecord {
            im_path: im_path.to_string(),
            fov,
            phase,
        }
    }
}
