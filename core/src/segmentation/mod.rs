//! Organ segmentation and presence mask extraction
//!
//! The segmentation model itself is an external collaborator behind the
//! [`Segmenter`] trait. [`TotalSegmentatorCli`] drives the TotalSegmentator
//! command-line tool.

mod mask;
mod totalseg;

pub use mask::{extract_mask, has_voxels, slice_has_voxels, slices_clear, PresenceMask};
pub use totalseg::TotalSegmentatorCli;
pub(crate) use totalseg::stderr_tail;

use crate::error::Result;
use crate::types::{ClassMap, Organ, SegmentationTask};
use crate::volume::{SliceMask, Volume};
use ndarray::{Array3, ArrayView3};
use nifti::writer::WriterOptions;
use std::path::Path;

/// Organ segmentation capability
pub trait Segmenter {
    /// Segments a canonical volume with the given task profile
    ///
    /// The returned label grid has the same shape as the volume.
    fn segment(&self, volume: &Volume, task: SegmentationTask) -> Result<Segmentation>;
}

impl<S: Segmenter + ?Sized> Segmenter for Box<S> {
    fn segment(&self, volume: &Volume, task: SegmentationTask) -> Result<Segmentation> {
        (**self).segment(volume, task)
    }
}

impl<S: Segmenter + ?Sized> Segmenter for &S {
    fn segment(&self, volume: &Volume, task: SegmentationTask) -> Result<Segmentation> {
        (**self).segment(volume, task)
    }
}

/// Label volume produced by a [`Segmenter`], with its class map
#[derive(Debug, Clone)]
pub struct Segmentation {
    labels: Array3<u16>,
    class_map: ClassMap,
}

impl Segmentation {
    /// Creates a segmentation from a label grid and the task's class map
    pub fn new(labels: Array3<u16>, class_map: ClassMap) -> Self {
        Self { labels, class_map }
    }

    /// Returns a view of the label grid
    pub fn labels(&self) -> ArrayView3<'_, u16> {
        self.labels.view()
    }

    /// Returns the class map of the task
    pub fn class_map(&self) -> &ClassMap {
        &self.class_map
    }

    /// Returns the task that produced the labels
    pub fn task(&self) -> SegmentationTask {
        self.class_map.task()
    }

    /// Extracts the presence mask of an organ, restricted to `keep`
    pub fn presence_mask(&self, organ: Organ, keep: &SliceMask) -> Result<PresenceMask> {
        extract_mask(self.labels.view(), &self.class_map, organ, keep)
    }

    /// Writes the label grid as NIfTI in the space of `reference`
    pub fn save<P: AsRef<Path>>(&self, path: P, reference: &Volume) -> Result<()> {
        WriterOptions::new(path.as_ref())
            .reference_header(reference.header())
            .write_nifti(&self.labels)?;
        Ok(())
    }
}
