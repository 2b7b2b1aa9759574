//! Core type definitions for field of view and phase recognition
//!
//! This module provides the fundamental types used throughout the fovcat library:
//! - [`Modality`]: Imaging modality of a manifest (CT, MRI)
//! - [`FovLabel`]: Closed set of field of view labels
//! - [`SegmentationTask`]: Segmentation profile selected per modality
//! - [`Organ`]: Organs probed by the field of view classifier
//! - [`ClassMap`]: Organ name to class code mapping of one task
//! - [`RunConfig`]: Configuration of a batch run

mod class_map;
mod config;
mod enums;

pub use class_map::{ClassMap, ClassMapRegistry};
pub use config::{
    PhaseCommand, RunConfig, SegmenterOptions, FOV_COLUMN, IM_PATH_COLUMN, PHASE_COLUMN,
};
pub use enums::{FovLabel, Modality, Organ, SegmentationTask};
