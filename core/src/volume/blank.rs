use ndarray::{Array3, ArrayD, ArrayView3, ArrayViewD, Axis, Ix3};

/// Axial slices kept after blank-slice removal
///
/// `All` is the degenerate "keep everything" selection, used when the input
/// is not 3D or when every slice is blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceMask {
    /// Every slice is kept
    All,
    /// One flag per original axial slice, `true` where the slice is kept
    Select(Vec<bool>),
}

impl SliceMask {
    /// Returns whether the slice at `index` is kept
    pub fn is_kept(&self, index: usize) -> bool {
        match self {
            SliceMask::All => true,
            SliceMask::Select(keep) => keep.get(index).copied().unwrap_or(false),
        }
    }

    /// Number of kept slices out of `total`
    pub fn kept_count(&self, total: usize) -> usize {
        match self {
            SliceMask::All => total,
            SliceMask::Select(keep) => keep.iter().take(total).filter(|k| **k).count(),
        }
    }

    /// Indices of the kept slices, in original order
    pub fn kept_indices(&self, total: usize) -> Vec<usize> {
        (0..total).filter(|i| self.is_kept(*i)).collect()
    }

    /// Restricts a grid to the kept axial slices
    pub fn apply<A: Clone>(&self, grid: ArrayView3<'_, A>) -> Array3<A> {
        match self {
            SliceMask::All => grid.to_owned(),
            SliceMask::Select(_) => {
                let indices = self.kept_indices(grid.len_of(Axis(2)));
                grid.select(Axis(2), &indices)
            }
        }
    }
}

/// A slice is blank when its minimum equals its maximum (exact comparison)
///
/// A NaN voxel makes both extremes NaN, which never compare equal, so such
/// slices are kept.
fn is_blank(slice: ndarray::ArrayView2<'_, f32>) -> bool {
    if slice.iter().any(|v| v.is_nan()) {
        return false;
    }
    let mut values = slice.iter();
    let Some(first) = values.next() else {
        return true;
    };
    let (min, max) = values.fold((*first, *first), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    min == max
}

/// Computes the non-blank slice mask of a 3D grid
///
/// Falls back to [`SliceMask::All`] when every slice is blank, so the
/// selection is never empty.
pub fn non_blank_slices(grid: ArrayView3<'_, f32>) -> SliceMask {
    let keep: Vec<bool> = grid.axis_iter(Axis(2)).map(|s| !is_blank(s)).collect();
    if keep.iter().any(|k| *k) {
        SliceMask::Select(keep)
    } else {
        SliceMask::All
    }
}

/// Removes blank axial slices (along axis 2) from an image
///
/// Returns the trimmed image and the mask of kept slices. Images that are
/// not 3D are returned unchanged with [`SliceMask::All`].
///
/// # Example
///
/// ```
/// use fovcat_core::volume::{remove_blank_slices, SliceMask};
/// use ndarray::Array3;
///
/// let mut image = Array3::<f32>::zeros((4, 4, 5));
/// image[[1, 1, 2]] = 1.0;
/// image[[0, 3, 4]] = -2.0;
///
/// let (trimmed, mask) = remove_blank_slices(image.view().into_dyn());
/// assert_eq!(trimmed.shape(), &[4, 4, 2]);
/// assert_eq!(mask, SliceMask::Select(vec![false, false, true, false, true]));
/// ```
pub fn remove_blank_slices(image: ArrayViewD<'_, f32>) -> (ArrayD<f32>, SliceMask) {
    let grid = match image.view().into_dimensionality::<Ix3>() {
        Ok(grid) => grid,
        Err(_) => return (image.to_owned(), SliceMask::All),
    };
    let mask = non_blank_slices(grid.view());
    let trimmed = mask.apply(grid).into_dyn();
    (trimmed, mask)
}
