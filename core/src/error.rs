use thiserror::Error;

/// Result type for fovcat operations
pub type Result<T> = std::result::Result<T, FovcatError>;

/// Error types for fovcat operations
#[derive(Error, Debug)]
pub enum FovcatError {
    /// NIfTI reading or writing error
    #[error("NIfTI error: {0}")]
    Nifti(String),

    /// Volume does not have the expected layout
    #[error("Invalid volume: {0}")]
    InvalidVolume(String),

    /// External segmentation failed
    #[error("Segmentation error: {0}")]
    Segmentation(String),

    /// Requested organ has no class code for the active task
    #[error("Organ '{organ}' is not available in the '{task}' class map")]
    OrganNotInClassMap { organ: String, task: String },

    /// Phase recognition failed
    #[error("Phase recognition error: {0}")]
    Phase(String),

    /// Required manifest column is missing
    #[error("Manifest is missing required column '{0}'")]
    MissingColumn(String),

    /// Existing output manifest does not match the requested classifiers
    #[error("Existing output has columns {found:?}, but this run expects {expected:?}")]
    ManifestMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Invalid run configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FovcatError {
    /// Returns whether this error is an organ lookup failure
    pub fn is_extraction_error(&self) -> bool {
        matches!(self, FovcatError::OrganNotInClassMap { .. })
    }
}

// Convert nifti errors
impl From<nifti::NiftiError> for FovcatError {
    fn from(e: nifti::NiftiError) -> Self {
        FovcatError::Nifti(format!("{}", e))
    }
}

impl From<ndarray::ShapeError> for FovcatError {
    fn from(e: ndarray::ShapeError) -> Self {
        FovcatError::InvalidVolume(format!("{}", e))
    }
}
