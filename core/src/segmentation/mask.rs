use crate::error::Result;
use crate::types::{ClassMap, Organ};
use crate::volume::SliceMask;
use ndarray::{Array3, ArrayView3, Axis};

/// Boolean grid marking the voxels of one organ
pub type PresenceMask = Array3<bool>;

/// Extracts the presence mask of an organ from a label grid
///
/// The mask is restricted to the axial slices selected by `keep`. Composite
/// organs (the kidneys) are the union of their constituent classes.
///
/// # Errors
///
/// Returns [`crate::FovcatError::OrganNotInClassMap`] if any constituent
/// class is missing from `class_map`.
pub fn extract_mask(
    labels: ArrayView3<'_, u16>,
    class_map: &ClassMap,
    organ: Organ,
    keep: &SliceMask,
) -> Result<PresenceMask> {
    let codes = organ
        .class_names()
        .into_iter()
        .map(|name| class_map.code_for(name))
        .collect::<Result<Vec<u16>>>()?;

    Ok(keep.apply(labels).mapv(|label| codes.contains(&label)))
}

/// Returns whether any voxel of the mask is set
pub fn has_voxels(mask: ArrayView3<'_, bool>) -> bool {
    mask.iter().any(|v| *v)
}

/// Returns whether the axial slice at `index` has any voxel set
///
/// Negative indices count from the last slice; out of range indices have
/// no voxels.
pub fn slice_has_voxels(mask: ArrayView3<'_, bool>, index: isize) -> bool {
    let len = mask.len_of(Axis(2)) as isize;
    let resolved = if index < 0 { len + index } else { index };
    if resolved < 0 || resolved >= len {
        return false;
    }
    mask.index_axis(Axis(2), resolved as usize)
        .iter()
        .any(|v| *v)
}

/// Returns whether every listed axial slice is empty
pub fn slices_clear(mask: ArrayView3<'_, bool>, indices: &[isize]) -> bool {
    indices.iter().all(|i| !slice_has_voxels(mask, *i))
}
