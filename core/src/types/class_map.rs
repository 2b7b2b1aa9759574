use crate::error::{FovcatError, Result};
use crate::types::SegmentationTask;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Mapping from organ name to integer class code for one segmentation task
///
/// Built once per task profile and queried with [`ClassMap::code_for`].
///
/// # Example
///
/// ```
/// use fovcat_core::{ClassMap, SegmentationTask};
///
/// let map = ClassMap::builtin(SegmentationTask::Total);
/// assert_eq!(map.code_for("heart").unwrap(), 51);
/// assert!(map.code_for("prostate").is_ok());
///
/// let mr = ClassMap::builtin(SegmentationTask::TotalMr);
/// assert!(mr.code_for("sternum").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
    task: SegmentationTask,
    codes: BTreeMap<String, u16>,
}

/// General CT organs (TotalSegmentator v2 `total`), excluding generated ranges
const TOTAL_CLASSES: &[(u16, &str)] = &[
    (1, "spleen"),
    (2, "kidney_right"),
    (3, "kidney_left"),
    (4, "gallbladder"),
    (5, "liver"),
    (6, "stomach"),
    (7, "pancreas"),
    (8, "adrenal_gland_right"),
    (9, "adrenal_gland_left"),
    (10, "lung_upper_lobe_left"),
    (11, "lung_lower_lobe_left"),
    (12, "lung_upper_lobe_right"),
    (13, "lung_middle_lobe_right"),
    (14, "lung_lower_lobe_right"),
    (15, "esophagus"),
    (16, "trachea"),
    (17, "thyroid_gland"),
    (18, "small_bowel"),
    (19, "duodenum"),
    (20, "colon"),
    (21, "urinary_bladder"),
    (22, "prostate"),
    (23, "kidney_cyst_left"),
    (24, "kidney_cyst_right"),
    (25, "sacrum"),
    (51, "heart"),
    (52, "aorta"),
    (53, "pulmonary_vein"),
    (54, "brachiocephalic_trunk"),
    (55, "subclavian_artery_right"),
    (56, "subclavian_artery_left"),
    (57, "common_carotid_artery_right"),
    (58, "common_carotid_artery_left"),
    (59, "brachiocephalic_vein_left"),
    (60, "brachiocephalic_vein_right"),
    (61, "atrial_appendage_left"),
    (62, "superior_vena_cava"),
    (63, "inferior_vena_cava"),
    (64, "portal_vein_and_splenic_vein"),
    (65, "iliac_artery_left"),
    (66, "iliac_artery_right"),
    (67, "iliac_vena_left"),
    (68, "iliac_vena_right"),
    (69, "humerus_left"),
    (70, "humerus_right"),
    (71, "scapula_left"),
    (72, "scapula_right"),
    (73, "clavicula_left"),
    (74, "clavicula_right"),
    (75, "femur_left"),
    (76, "femur_right"),
    (77, "hip_left"),
    (78, "hip_right"),
    (79, "spinal_cord"),
    (80, "gluteus_maximus_left"),
    (81, "gluteus_maximus_right"),
    (82, "gluteus_medius_left"),
    (83, "gluteus_medius_right"),
    (84, "gluteus_minimus_left"),
    (85, "gluteus_minimus_right"),
    (86, "autochthon_left"),
    (87, "autochthon_right"),
    (88, "iliopsoas_left"),
    (89, "iliopsoas_right"),
    (90, "brain"),
    (91, "skull"),
    (116, "sternum"),
    (117, "costal_cartilages"),
];

/// Vertebrae of the `total` task, codes 26 (S1) to 50 (C1)
const TOTAL_VERTEBRAE: &[&str] = &[
    "S1", "L5", "L4", "L3", "L2", "L1", "T12", "T11", "T10", "T9", "T8", "T7", "T6", "T5", "T4",
    "T3", "T2", "T1", "C7", "C6", "C5", "C4", "C3", "C2", "C1",
];

/// General MR organs (TotalSegmentator v2 `total_mr`)
const TOTAL_MR_CLASSES: &[(u16, &str)] = &[
    (1, "spleen"),
    (2, "kidney_right"),
    (3, "kidney_left"),
    (4, "gallbladder"),
    (5, "liver"),
    (6, "stomach"),
    (7, "pancreas"),
    (8, "adrenal_gland_right"),
    (9, "adrenal_gland_left"),
    (10, "lung_left"),
    (11, "lung_right"),
    (12, "esophagus"),
    (13, "small_bowel"),
    (14, "duodenum"),
    (15, "colon"),
    (16, "urinary_bladder"),
    (17, "prostate"),
    (18, "sacrum"),
    (19, "vertebrae"),
    (20, "intervertebral_discs"),
    (21, "spinal_cord"),
    (22, "heart"),
    (23, "aorta"),
    (24, "inferior_vena_cava"),
    (25, "portal_vein_and_splenic_vein"),
    (26, "iliac_artery_left"),
    (27, "iliac_artery_right"),
    (28, "iliac_vena_left"),
    (29, "iliac_vena_right"),
    (30, "humerus_left"),
    (31, "humerus_right"),
    (32, "scapula_left"),
    (33, "scapula_right"),
    (34, "clavicula_left"),
    (35, "clavicula_right"),
    (36, "femur_left"),
    (37, "femur_right"),
    (38, "hip_left"),
    (39, "hip_right"),
    (40, "gluteus_maximus_left"),
    (41, "gluteus_maximus_right"),
    (42, "gluteus_medius_left"),
    (43, "gluteus_medius_right"),
    (44, "gluteus_minimus_left"),
    (45, "gluteus_minimus_right"),
    (46, "autochthon_left"),
    (47, "autochthon_right"),
    (48, "iliopsoas_left"),
    (49, "iliopsoas_right"),
    (50, "brain"),
];

impl ClassMap {
    /// Creates an empty class map for a task
    pub fn new(task: SegmentationTask) -> Self {
        Self {
            task,
            codes: BTreeMap::new(),
        }
    }

    /// Creates a class map from `(code, name)` pairs
    pub fn from_pairs<'a, I>(task: SegmentationTask, pairs: I) -> Self
    where
        I: IntoIterator<Item = (u16, &'a str)>,
    {
        let mut map = Self::new(task);
        for (code, name) in pairs {
            map.insert(name, code);
        }
        map
    }

    /// Returns the built-in class map of a task
    pub fn builtin(task: SegmentationTask) -> Self {
        match task {
            SegmentationTask::Total => {
                let mut map = Self::from_pairs(task, TOTAL_CLASSES.iter().copied());
                for (offset, name) in TOTAL_VERTEBRAE.iter().enumerate() {
                    map.insert(&format!("vertebrae_{}", name), 26 + offset as u16);
                }
                for rib in 1..=12u16 {
                    map.insert(&format!("rib_left_{}", rib), 91 + rib);
                    map.insert(&format!("rib_right_{}", rib), 103 + rib);
                }
                map
            }
            SegmentationTask::TotalMr => Self::from_pairs(task, TOTAL_MR_CLASSES.iter().copied()),
        }
    }

    /// Returns the task this map belongs to
    pub fn task(&self) -> SegmentationTask {
        self.task
    }

    /// Inserts or replaces the code of an organ
    pub fn insert(&mut self, name: &str, code: u16) {
        self.codes.insert(name.to_string(), code);
    }

    /// Looks up the class code of an organ
    ///
    /// # Errors
    ///
    /// Returns [`FovcatError::OrganNotInClassMap`] if the organ has no code
    /// for this task.
    pub fn code_for(&self, name: &str) -> Result<u16> {
        self.codes
            .get(name)
            .copied()
            .ok_or_else(|| FovcatError::OrganNotInClassMap {
                organ: name.to_string(),
                task: self.task.name().to_string(),
            })
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Returns whether the map has no classes
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Class maps for every segmentation task, built once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMapRegistry {
    maps: HashMap<SegmentationTask, ClassMap>,
}

impl Default for ClassMapRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ClassMapRegistry {
    /// Registry holding the built-in maps of all tasks
    pub fn builtin() -> Self {
        let maps = [SegmentationTask::Total, SegmentationTask::TotalMr]
            .into_iter()
            .map(|task| (task, ClassMap::builtin(task)))
            .collect();
        Self { maps }
    }

    /// Merges overrides from a JSON file over the current maps
    ///
    /// The file maps task identifiers to `{organ: code}` objects:
    ///
    /// ```json
    /// {"total": {"heart": 51}, "total_mr": {"prostate": 17}}
    /// ```
    pub fn with_overrides_from_file(self, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        self.with_overrides_from_json(&text)
    }

    /// Merges overrides given as a JSON string
    pub fn with_overrides_from_json(mut self, json: &str) -> Result<Self> {
        let overrides: HashMap<String, BTreeMap<String, u16>> = serde_json::from_str(json)?;
        for (task_name, entries) in overrides {
            let task = SegmentationTask::from_str(&task_name).ok_or_else(|| {
                FovcatError::Config(format!("unknown segmentation task '{}'", task_name))
            })?;
            let map = self
                .maps
                .entry(task)
                .or_insert_with(|| ClassMap::new(task));
            for (name, code) in entries {
                map.insert(&name, code);
            }
        }
        Ok(self)
    }

    /// Returns the class map of a task
    pub fn get(&self, task: SegmentationTask) -> &ClassMap {
        // Every task is populated by `builtin`
        &self.maps[&task]
    }
}
