//! Synthetic volumes and in-memory segmenters shared by unit tests.

use crate::error::{FovcatError, Result};
use crate::recognition::PhaseRecognizer;
use crate::segmentation::{Segmentation, Segmenter};
use crate::types::{ClassMap, Modality, SegmentationTask};
use crate::volume::Volume;
use ndarray::{s, Array3};
use std::cell::{Cell, RefCell};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// In-plane size of synthetic volumes
pub(crate) const PLANE: usize = 6;

/// Volume whose axial slices all carry information
pub(crate) fn textured_volume(slices: usize) -> Volume {
    Volume::from_array(Array3::from_shape_fn((PLANE, PLANE, slices), |(i, j, k)| {
        (i * 3 + j + k % 5) as f32
    }))
}

/// Textured volume with the listed axial slices made uniform
pub(crate) fn volume_with_blank_slices(slices: usize, blank: &[usize]) -> Volume {
    let mut data = textured_volume(slices).data().to_owned();
    for k in blank {
        data.slice_mut(s![.., .., *k]).fill(-1000.0);
    }
    Volume::from_array(data)
}

/// Builds label grids by painting organs onto slice ranges
pub(crate) struct LabelPainter {
    labels: Array3<u16>,
    class_map: ClassMap,
}

impl LabelPainter {
    pub(crate) fn new(modality: Modality, slices: usize) -> Self {
        Self {
            labels: Array3::zeros((PLANE, PLANE, slices)),
            class_map: ClassMap::builtin(SegmentationTask::for_modality(modality)),
        }
    }

    /// Paints a small blob of `organ` on every slice of `slices`
    ///
    /// Each organ gets its own in-plane spot so organs never overwrite each other.
    pub(crate) fn paint(mut self, organ: &str, slices: Range<usize>) -> Self {
        let code = self
            .class_map
            .code_for(organ)
            .unwrap_or_else(|_| panic!("{} is not in the class map", organ));
        let spot = (code as usize) % (PLANE * PLANE);
        let (i, j) = (spot / PLANE, spot % PLANE);
        for k in slices {
            self.labels[[i, j, k]] = code;
        }
        self
    }

    pub(crate) fn build(self) -> Array3<u16> {
        self.labels
    }
}

/// Segmenter returning a fixed label grid, counting its calls
pub(crate) struct FakeSegmenter {
    labels: Array3<u16>,
    calls: Cell<usize>,
}

impl FakeSegmenter {
    pub(crate) fn new(labels: Array3<u16>) -> Self {
        Self {
            labels,
            calls: Cell::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Segmenter for FakeSegmenter {
    fn segment(&self, _volume: &Volume, task: SegmentationTask) -> Result<Segmentation> {
        self.calls.set(self.calls.get() + 1);
        Ok(Segmentation::new(
            self.labels.clone(),
            ClassMap::builtin(task),
        ))
    }
}

/// Segmenter that always fails
pub(crate) struct FailingSegmenter;

impl Segmenter for FailingSegmenter {
    fn segment(&self, _volume: &Volume, _task: SegmentationTask) -> Result<Segmentation> {
        Err(FovcatError::Segmentation("model crashed".to_string()))
    }
}

/// Phase backend returning a fixed label, recording the output bases it was given
pub(crate) struct FakePhase {
    label: String,
    bases: Rc<RefCell<Vec<Option<PathBuf>>>>,
}

impl FakePhase {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            bases: Rc::default(),
        }
    }

    pub(crate) fn bases(&self) -> Rc<RefCell<Vec<Option<PathBuf>>>> {
        Rc::clone(&self.bases)
    }
}

impl PhaseRecognizer for FakePhase {
    fn recognize(
        &self,
        _volume: &Volume,
        _modality: Modality,
        output_base: Option<&Path>,
    ) -> Result<String> {
        self.bases.borrow_mut().push(output_base.map(Path::to_path_buf));
        Ok(self.label.clone())
    }
}

/// Phase backend that always fails
pub(crate) struct FailingPhase;

impl PhaseRecognizer for FailingPhase {
    fn recognize(
        &self,
        _volume: &Volume,
        _modality: Modality,
        _output_base: Option<&Path>,
    ) -> Result<String> {
        Err(FovcatError::Phase("no weights".to_string()))
    }
}
