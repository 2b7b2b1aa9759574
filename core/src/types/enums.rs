use std::fmt;

/// Imaging modality of the volumes in a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Modality {
    #[serde(rename = "CT")]
    Ct,
    #[serde(rename = "MRI")]
    Mri,
}

impl Modality {
    /// Returns the name used on the command line and in manifests
    pub fn simple_name(&self) -> &'static str {
        match self {
            Modality::Ct => "CT",
            Modality::Mri => "MRI",
        }
    }

    /// Returns whether this is an MRI modality
    pub fn is_mri(&self) -> bool {
        matches!(self, Modality::Mri)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Segmentation profile of the external organ segmentation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationTask {
    /// General CT organs
    Total,
    /// General MR organs
    TotalMr,
}

impl SegmentationTask {
    /// Selects the organ task matching a modality
    pub fn for_modality(modality: Modality) -> Self {
        match modality {
            Modality::Ct => SegmentationTask::Total,
            Modality::Mri => SegmentationTask::TotalMr,
        }
    }

    /// Returns the task identifier understood by the segmentation model
    pub fn name(&self) -> &'static str {
        match self {
            SegmentationTask::Total => "total",
            SegmentationTask::TotalMr => "total_mr",
        }
    }

    /// Parses a task identifier
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "total" => Some(SegmentationTask::Total),
            "total_mr" => Some(SegmentationTask::TotalMr),
            _ => None,
        }
    }
}

impl fmt::Display for SegmentationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Anatomical field of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FovLabel {
    Scout,
    WholeBody,
    Spine,
    ThoraxAbdomen,
    Thorax,
    Abdomen,
    Pelvis,
    Unknown,
}

impl FovLabel {
    /// All labels, in decision order
    pub const ALL: [FovLabel; 8] = [
        FovLabel::Scout,
        FovLabel::WholeBody,
        FovLabel::Spine,
        FovLabel::ThoraxAbdomen,
        FovLabel::Thorax,
        FovLabel::Abdomen,
        FovLabel::Pelvis,
        FovLabel::Unknown,
    ];

    /// Returns simple name for display and manifests
    pub fn simple_name(&self) -> &'static str {
        match self {
            FovLabel::Scout => "scout",
            FovLabel::WholeBody => "whole_body",
            FovLabel::Spine => "spine",
            FovLabel::ThoraxAbdomen => "thorax_abdomen",
            FovLabel::Thorax => "thorax",
            FovLabel::Abdomen => "abdomen",
            FovLabel::Pelvis => "pelvis",
            FovLabel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FovLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Organs probed by the field of view classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Organ {
    Heart,
    Sternum,
    Sacrum,
    Liver,
    Spleen,
    /// Union of both kidneys
    Kidney,
    KidneyLeft,
    KidneyRight,
    Prostate,
}

impl Organ {
    /// Returns the organ name as used in class maps
    pub fn name(&self) -> &'static str {
        match self {
            Organ::Heart => "heart",
            Organ::Sternum => "sternum",
            Organ::Sacrum => "sacrum",
            Organ::Liver => "liver",
            Organ::Spleen => "spleen",
            Organ::Kidney => "kidney",
            Organ::KidneyLeft => "kidney_left",
            Organ::KidneyRight => "kidney_right",
            Organ::Prostate => "prostate",
        }
    }

    /// Returns whether the organ is a union of several classes
    pub fn is_composite(&self) -> bool {
        matches!(self, Organ::Kidney)
    }

    /// Returns the class names whose union forms this organ
    pub fn class_names(&self) -> Vec<&'static str> {
        match self {
            Organ::Kidney => vec![Organ::KidneyLeft.name(), Organ::KidneyRight.name()],
            other => vec![other.name()],
        }
    }
}

impl fmt::Display for Organ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
