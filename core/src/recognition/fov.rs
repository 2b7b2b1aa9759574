use crate::error::Result;
use crate::segmentation::{has_voxels, slice_has_voxels, slices_clear, PresenceMask, Segmenter};
use crate::types::{FovLabel, Modality, Organ, SegmentationTask};
use crate::volume::{non_blank_slices, Volume};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::Path;

/// Volumes with fewer non-blank axial slices are scouts
pub const MIN_SLICES: usize = 10;

/// Axial slices that must be empty for an organ to count as fully inside the scan
///
/// Two slices per end, since the outermost one is sometimes not segmented.
pub const EDGE_SLICES: [isize; 4] = [0, 1, -1, -2];

/// Organs probed for a modality
///
/// The MR task has no sternum class; prostate is only used for MRI pelvis scans.
pub fn probe_organs(modality: Modality) -> Vec<Organ> {
    match modality {
        Modality::Ct => vec![
            Organ::Heart,
            Organ::Sternum,
            Organ::Sacrum,
            Organ::Liver,
            Organ::Spleen,
            Organ::Kidney,
        ],
        Modality::Mri => vec![
            Organ::Heart,
            Organ::Sacrum,
            Organ::Liver,
            Organ::Spleen,
            Organ::Kidney,
            Organ::Prostate,
        ],
    }
}

/// Boolean signals derived from the organ presence masks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct FovSignals {
    /// Heart present anywhere
    pub heart_ok: bool,

    /// Sternum present anywhere (always true for MRI)
    pub sternum_ok: bool,

    /// Heart (and sternum for CT) absent from the edge slices
    pub edges_clear: bool,

    pub sacrum: bool,
    pub liver: bool,

    /// Liver present on the first kept slice
    pub liver_on_first_slice: bool,

    pub spleen: bool,
    pub kidney: bool,
    pub prostate: bool,

    /// Prostate absent from the edge slices
    pub prostate_clear: bool,
}

impl FovSignals {
    /// Derives the signals from the presence masks of the probed organs
    ///
    /// Organs without a mask count as absent.
    pub fn from_masks(modality: Modality, masks: &HashMap<Organ, PresenceMask>) -> Self {
        let present = |organ: Organ| masks.get(&organ).is_some_and(|m| has_voxels(m.view()));
        let clear = |organ: Organ| {
            masks
                .get(&organ)
                .map_or(true, |m| slices_clear(m.view(), &EDGE_SLICES))
        };

        let (sternum_ok, edges_clear) = match modality {
            Modality::Mri => (true, clear(Organ::Heart)),
            Modality::Ct => (
                present(Organ::Sternum),
                clear(Organ::Sternum) && clear(Organ::Heart),
            ),
        };

        Self {
            heart_ok: present(Organ::Heart),
            sternum_ok,
            edges_clear,
            sacrum: present(Organ::Sacrum),
            liver: present(Organ::Liver),
            liver_on_first_slice: masks
                .get(&Organ::Liver)
                .is_some_and(|m| slice_has_voxels(m.view(), 0)),
            spleen: present(Organ::Spleen),
            kidney: present(Organ::Kidney),
            prostate: present(Organ::Prostate),
            prostate_clear: clear(Organ::Prostate),
        }
    }

    /// Applies the decision tree; the first matching branch wins
    ///
    /// 1. Heart (and sternum) fully inside the scan: whole body or spine if the
    ///    sacrum is seen, thorax-abdomen if the liver starts above the first
    ///    slice, thorax otherwise
    /// 2. Liver with spleen or kidneys: abdomen
    /// 3. MRI with a prostate away from the scan edges: pelvis
    /// 4. Unknown
    pub fn decide(&self, modality: Modality) -> FovLabel {
        if self.heart_ok && self.sternum_ok && self.edges_clear {
            if self.sacrum {
                if modality.is_mri() && !self.liver {
                    FovLabel::Spine
                } else {
                    FovLabel::WholeBody
                }
            } else if self.liver && !self.liver_on_first_slice {
                FovLabel::ThoraxAbdomen
            } else {
                FovLabel::Thorax
            }
        } else if self.liver && (self.spleen || self.kidney) {
            FovLabel::Abdomen
        } else if modality.is_mri() && self.prostate && self.prostate_clear {
            FovLabel::Pelvis
        } else {
            FovLabel::Unknown
        }
    }
}

/// Outcome of a field of view classification, with its inputs
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FovAnalysis {
    /// Resolved label
    pub label: FovLabel,

    /// Axial slices in the volume
    pub total_slices: usize,

    /// Axial slices left after blank-slice removal
    pub kept_slices: usize,

    /// Segmentation task used (None for scouts)
    pub task: Option<SegmentationTask>,

    /// Organ signals (None for scouts)
    pub signals: Option<FovSignals>,
}

/// Field of view classifier over organ segmentations
///
/// # Example
///
/// ```no_run
/// use fovcat_core::{
///     ClassMapRegistry, FovRecognizer, Modality, SegmenterOptions, TotalSegmentatorCli, Volume,
/// };
///
/// let segmenter =
///     TotalSegmentatorCli::new(SegmenterOptions::default(), ClassMapRegistry::builtin());
/// let recognizer = FovRecognizer::new(segmenter);
///
/// let volume = Volume::open_canonical("scan.nii.gz").unwrap();
/// let label = recognizer.recognize(&volume, Modality::Ct, None).unwrap();
/// println!("{}", label);
/// ```
pub struct FovRecognizer<S> {
    segmenter: S,
}

impl<S: Segmenter> FovRecognizer<S> {
    /// Creates a classifier on top of a segmenter
    pub fn new(segmenter: S) -> Self {
        Self { segmenter }
    }

    /// Returns the underlying segmenter
    pub fn segmenter(&self) -> &S {
        &self.segmenter
    }

    /// Classifies the field of view of a canonical volume
    ///
    /// When `mask_path` is given, the segmentation is also written there;
    /// a failed write is logged and does not change the label.
    ///
    /// # Errors
    ///
    /// Returns an error if segmentation fails or a probed organ is missing
    /// from the task's class map.
    pub fn recognize(
        &self,
        volume: &Volume,
        modality: Modality,
        mask_path: Option<&Path>,
    ) -> Result<FovLabel> {
        Ok(self.analyze(volume, modality, mask_path)?.label)
    }

    /// Classifies the field of view and returns the signals behind the label
    pub fn analyze(
        &self,
        volume: &Volume,
        modality: Modality,
        mask_path: Option<&Path>,
    ) -> Result<FovAnalysis> {
        let total_slices = volume.len_z();
        let keep = non_blank_slices(volume.data());
        let kept_slices = keep.kept_count(total_slices);

        if kept_slices < MIN_SLICES {
            debug!(
                "Only {} of {} slices are non-blank, classifying as scout",
                kept_slices, total_slices
            );
            return Ok(FovAnalysis {
                label: FovLabel::Scout,
                total_slices,
                kept_slices,
                task: None,
                signals: None,
            });
        }

        let task = SegmentationTask::for_modality(modality);
        let segmentation = self.segmenter.segment(volume, task)?;

        if let Some(path) = mask_path {
            if let Err(e) = segmentation.save(path, volume) {
                warn!("Failed to save segmentation to {}: {}", path.display(), e);
            }
        }

        let masks = probe_organs(modality)
            .into_iter()
            .map(|organ| Ok((organ, segmentation.presence_mask(organ, &keep)?)))
            .collect::<Result<HashMap<_, _>>>()?;

        let signals = FovSignals::from_masks(modality, &masks);
        let label = signals.decide(modality);
        debug!("FOV signals {:?} -> {}", signals, label);

        Ok(FovAnalysis {
            label,
            total_slices,
            kept_slices,
            task: Some(task),
            signals: Some(signals),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FovcatError;
    use crate::segmentation::Segmentation;
    use crate::test_utils::{
        textured_volume, volume_with_blank_slices, FailingSegmenter, FakeSegmenter, LabelPainter,
    };
    use crate::types::ClassMap;
    use ndarray::Array3;
    use rstest::rstest;
    use tempfile::TempDir;

    fn classify(modality: Modality, painter: LabelPainter, slices: usize) -> FovLabel {
        let volume = textured_volume(slices);
        let recognizer = FovRecognizer::new(FakeSegmenter::new(painter.build()));
        recognizer.recognize(&volume, modality, None).unwrap()
    }

    fn signals() -> FovSignals {
        FovSignals::default()
    }

    /// Heart and sternum found, nothing on the edge slices
    fn chest() -> FovSignals {
        FovSignals {
            heart_ok: true,
            sternum_ok: true,
            edges_clear: true,
            ..signals()
        }
    }

    #[rstest]
    #[case::ct_thorax(Modality::Ct, chest(), FovLabel::Thorax)]
    #[case::ct_whole_body(
        Modality::Ct,
        FovSignals { sacrum: true, ..chest() },
        FovLabel::WholeBody
    )]
    #[case::mri_spine(Modality::Mri, FovSignals { sacrum: true, ..chest() }, FovLabel::Spine)]
    #[case::mri_whole_body(
        Modality::Mri,
        FovSignals { sacrum: true, liver: true, ..chest() },
        FovLabel::WholeBody
    )]
    #[case::thorax_abdomen(
        Modality::Ct,
        FovSignals { liver: true, ..chest() },
        FovLabel::ThoraxAbdomen
    )]
    #[case::liver_on_first_slice(
        Modality::Ct,
        FovSignals { liver: true, liver_on_first_slice: true, ..chest() },
        FovLabel::Thorax
    )]
    #[case::abdomen_spleen(
        Modality::Ct,
        FovSignals { liver: true, spleen: true, ..signals() },
        FovLabel::Abdomen
    )]
    #[case::abdomen_kidney(
        Modality::Mri,
        FovSignals { heart_ok: true, liver: true, kidney: true, ..signals() },
        FovLabel::Abdomen
    )]
    #[case::liver_alone(Modality::Ct, FovSignals { liver: true, ..signals() }, FovLabel::Unknown)]
    #[case::mri_pelvis(
        Modality::Mri,
        FovSignals { prostate: true, prostate_clear: true, ..signals() },
        FovLabel::Pelvis
    )]
    #[case::clipped_prostate(
        Modality::Mri,
        FovSignals { prostate: true, ..signals() },
        FovLabel::Unknown
    )]
    #[case::ct_prostate_ignored(
        Modality::Ct,
        FovSignals { prostate: true, prostate_clear: true, ..signals() },
        FovLabel::Unknown
    )]
    #[case::nothing(Modality::Ct, signals(), FovLabel::Unknown)]
    fn test_decision_tree(
        #[case] modality: Modality,
        #[case] signals: FovSignals,
        #[case] expected: FovLabel,
    ) {
        assert_eq!(signals.decide(modality), expected);
    }

    #[rstest]
    #[case(Modality::Ct)]
    #[case(Modality::Mri)]
    fn test_short_volume_is_scout_without_segmenting(#[case] modality: Modality) {
        let labels = LabelPainter::new(modality, 9)
            .paint("heart", 2..5)
            .paint("liver", 3..7)
            .build();
        let recognizer = FovRecognizer::new(FakeSegmenter::new(labels));
        let volume = textured_volume(9);

        let analysis = recognizer.analyze(&volume, modality, None).unwrap();
        assert_eq!(analysis.label, FovLabel::Scout);
        assert_eq!(analysis.kept_slices, 9);
        assert_eq!(recognizer.segmenter().calls(), 0);
    }

    #[test]
    fn test_blank_slices_count_towards_scout() {
        // 12 slices, 3 of them blank
        let volume = volume_with_blank_slices(12, &[0, 5, 11]);
        let recognizer = FovRecognizer::new(FailingSegmenter);
        let analysis = recognizer.analyze(&volume, Modality::Ct, None).unwrap();
        assert_eq!(analysis.label, FovLabel::Scout);
        assert_eq!(analysis.total_slices, 12);
        assert_eq!(analysis.kept_slices, 9);
    }

    #[test]
    fn test_ct_thorax_abdomen() {
        let painter = LabelPainter::new(Modality::Ct, 40)
            .paint("heart", 10..20)
            .paint("sternum", 8..22)
            .paint("liver", 5..15);
        assert_eq!(classify(Modality::Ct, painter, 40), FovLabel::ThoraxAbdomen);
    }

    #[test]
    fn test_ct_abdomen_without_sternum() {
        let painter = LabelPainter::new(Modality::Ct, 30)
            .paint("heart", 25..30)
            .paint("liver", 5..20)
            .paint("spleen", 8..15);
        assert_eq!(classify(Modality::Ct, painter, 30), FovLabel::Abdomen);
    }

    #[test]
    fn test_ct_abdomen_with_kidneys_only() {
        let painter = LabelPainter::new(Modality::Ct, 30)
            .paint("liver", 5..20)
            .paint("kidney_right", 2..10);
        assert_eq!(classify(Modality::Ct, painter, 30), FovLabel::Abdomen);
    }

    #[test]
    fn test_mri_spine() {
        let painter = LabelPainter::new(Modality::Mri, 40)
            .paint("heart", 25..32)
            .paint("sacrum", 2..6);
        assert_eq!(classify(Modality::Mri, painter, 40), FovLabel::Spine);
    }

    #[test]
    fn test_mri_pelvis() {
        let painter = LabelPainter::new(Modality::Mri, 20).paint("prostate", 8..12);
        assert_eq!(classify(Modality::Mri, painter, 20), FovLabel::Pelvis);
    }

    #[test]
    fn test_mri_pelvis_requires_interior_prostate() {
        let painter = LabelPainter::new(Modality::Mri, 20).paint("prostate", 17..19);
        assert_eq!(classify(Modality::Mri, painter, 20), FovLabel::Unknown);
    }

    #[test]
    fn test_mri_heart_on_edge_falls_through_to_pelvis() {
        let painter = LabelPainter::new(Modality::Mri, 20)
            .paint("heart", 18..20)
            .paint("prostate", 4..8);
        assert_eq!(classify(Modality::Mri, painter, 20), FovLabel::Pelvis);
    }

    #[test]
    fn test_no_organs_is_unknown() {
        let painter = LabelPainter::new(Modality::Ct, 15);
        assert_eq!(classify(Modality::Ct, painter, 15), FovLabel::Unknown);
    }

    #[test]
    fn test_ct_whole_body() {
        let painter = LabelPainter::new(Modality::Ct, 60)
            .paint("heart", 40..50)
            .paint("sternum", 38..52)
            .paint("liver", 30..42)
            .paint("sacrum", 5..10);
        assert_eq!(classify(Modality::Ct, painter, 60), FovLabel::WholeBody);
    }

    #[test]
    fn test_ct_sternum_on_edge_is_not_thorax() {
        let painter = LabelPainter::new(Modality::Ct, 30)
            .paint("heart", 10..20)
            .paint("sternum", 1..20);
        assert_eq!(classify(Modality::Ct, painter, 30), FovLabel::Unknown);
    }

    #[test]
    fn test_edge_slices_follow_trimmed_order() {
        // Heart sits on original slice 2, which becomes kept slice 0
        let volume = volume_with_blank_slices(30, &[0, 1]);
        let labels = LabelPainter::new(Modality::Ct, 30)
            .paint("heart", 2..12)
            .paint("sternum", 5..12)
            .build();
        let recognizer = FovRecognizer::new(FakeSegmenter::new(labels));

        let analysis = recognizer.analyze(&volume, Modality::Ct, None).unwrap();
        let signals = analysis.signals.unwrap();
        assert!(signals.heart_ok);
        assert!(!signals.edges_clear);
        assert_eq!(analysis.label, FovLabel::Unknown);
    }

    #[test]
    fn test_liver_on_first_kept_slice_is_thorax() {
        let volume = volume_with_blank_slices(30, &[0]);
        let labels = LabelPainter::new(Modality::Ct, 30)
            .paint("heart", 10..20)
            .paint("sternum", 10..20)
            .paint("liver", 0..8)
            .build();
        let recognizer = FovRecognizer::new(FakeSegmenter::new(labels));

        // Liver on blank slice 0 is trimmed; slice 1 is the first kept one
        let label = recognizer.recognize(&volume, Modality::Ct, None).unwrap();
        assert_eq!(label, FovLabel::Thorax);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let labels = LabelPainter::new(Modality::Ct, 40)
            .paint("heart", 10..20)
            .paint("sternum", 8..22)
            .paint("liver", 5..15)
            .build();
        let recognizer = FovRecognizer::new(FakeSegmenter::new(labels));
        let volume = textured_volume(40);

        let first = recognizer.analyze(&volume, Modality::Ct, None).unwrap();
        let second = recognizer.analyze(&volume, Modality::Ct, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(recognizer.segmenter().calls(), 2);
    }

    #[test]
    fn test_segmentation_failure_propagates() {
        let recognizer = FovRecognizer::new(FailingSegmenter);
        let err = recognizer
            .recognize(&textured_volume(20), Modality::Ct, None)
            .unwrap_err();
        assert!(matches!(err, FovcatError::Segmentation(_)));
    }

    #[test]
    fn test_missing_class_propagates_as_extraction_error() {
        struct NoSternum;
        impl Segmenter for NoSternum {
            fn segment(&self, volume: &Volume, task: SegmentationTask) -> Result<Segmentation> {
                let mut map = ClassMap::new(task);
                for organ in ["heart", "sacrum", "liver", "spleen", "kidney_left", "kidney_right"] {
                    map.insert(organ, 1);
                }
                let (x, y, z) = volume.data().dim();
                Ok(Segmentation::new(Array3::zeros((x, y, z)), map))
            }
        }

        let err = FovRecognizer::new(NoSternum)
            .recognize(&textured_volume(20), Modality::Ct, None)
            .unwrap_err();
        assert!(err.is_extraction_error());
    }

    #[test]
    fn test_mask_is_persisted_when_requested() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("0.nii.gz");
        let labels = LabelPainter::new(Modality::Ct, 20).paint("liver", 3..9).build();
        let recognizer = FovRecognizer::new(FakeSegmenter::new(labels));

        recognizer
            .recognize(&textured_volume(20), Modality::Ct, Some(&path))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_failed_mask_write_keeps_label() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("deeper").join("0.nii.gz");
        let labels = LabelPainter::new(Modality::Ct, 20)
            .paint("liver", 3..9)
            .paint("spleen", 4..6)
            .build();
        let recognizer = FovRecognizer::new(FakeSegmenter::new(labels));

        let label = recognizer
            .recognize(&textured_volume(20), Modality::Ct, Some(&path))
            .unwrap();
        assert_eq!(label, FovLabel::Abdomen);
        assert!(!path.exists());
    }
}
