//! Volumetric image loading and axial slice utilities
//!
//! Volumes are read from NIfTI-1 files into an [`Array3<f32>`] and can be
//! reoriented to the closest RAS orientation, after which axis 2 is the
//! axial (slice) axis.

mod blank;
pub mod orientation;

pub use blank::{non_blank_slices, remove_blank_slices, SliceMask};
pub use orientation::{Affine, AxisOrientation};

use crate::error::{FovcatError, Result};
use ndarray::{Array, Array3, ArrayView3, Axis, Ix3, IxDyn};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;

/// `NiftiHeader` is a large stack object, keep it boxed
type BoxedHeader = Box<NiftiHeader>;

/// 3D image with its NIfTI header
#[derive(Debug, Clone)]
pub struct Volume {
    header: BoxedHeader,
    data: Array3<f32>,
}

/// Updates header dimensions to a 3D shape
fn set_header_shape(h: &mut NiftiHeader, shape: [usize; 3]) {
    h.dim = [3, shape[0] as u16, shape[1] as u16, shape[2] as u16, 1, 1, 1, 1];
}

/// Drops trailing singleton axes and checks that three remain
pub(crate) fn squeeze_to_3d<A>(data: Array<A, IxDyn>) -> Result<Array3<A>> {
    let mut data = data;
    while data.ndim() > 3 && data.len_of(Axis(data.ndim() - 1)) == 1 {
        let last = Axis(data.ndim() - 1);
        data = data.index_axis_move(last, 0);
    }
    if data.ndim() != 3 {
        return Err(FovcatError::InvalidVolume(format!(
            "expected a 3D volume, found shape {:?}",
            data.shape()
        )));
    }
    Ok(data.into_dimensionality::<Ix3>()?)
}

impl Volume {
    /// Wraps a grid with an identity affine (1 mm isotropic voxels)
    pub fn from_array(data: Array3<f32>) -> Self {
        Self::with_affine(data, &orientation::IDENTITY)
    }

    /// Wraps a grid with the given voxel-to-world affine
    pub fn with_affine(data: Array3<f32>, affine: &Affine) -> Self {
        let mut header = NiftiHeader::default();
        let (x, y, z) = data.dim();
        set_header_shape(&mut header, [x, y, z]);
        orientation::set_header_affine(&mut header, affine);
        Self {
            header: Box::new(header),
            data,
        }
    }

    /// Opens a NIfTI file as stored on disk
    ///
    /// 4D files with a single volume are squeezed to 3D.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not 3D.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let mut header = Box::new(obj.header().clone());
        let data = squeeze_to_3d(obj.into_volume().into_ndarray::<f32>()?)?;
        let (x, y, z) = data.dim();
        set_header_shape(&mut header, [x, y, z]);
        Ok(Self { header, data })
    }

    /// Opens a NIfTI file and reorients it to the closest RAS orientation
    pub fn open_canonical<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::open(path)?.into_canonical())
    }

    /// Reorients the grid to the closest RAS orientation
    ///
    /// Afterwards axis 0 runs left to right, axis 1 posterior to anterior
    /// and axis 2 inferior to superior.
    pub fn into_canonical(self) -> Self {
        let affine = self.affine();
        let ornt = orientation::io_orientation(&affine);
        if orientation::is_canonical(&ornt) {
            return self;
        }

        let (x, y, z) = self.data.dim();
        let new_affine = orientation::reorient_affine(&affine, &ornt, [x, y, z]);
        let data = orientation::reorient_grid(self.data, &ornt);

        let mut header = self.header;
        let (x, y, z) = data.dim();
        set_header_shape(&mut header, [x, y, z]);
        orientation::set_header_affine(&mut header, &new_affine);

        Self { header, data }
    }

    /// Returns the NIfTI header
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// Returns the voxel-to-world affine
    pub fn affine(&self) -> Affine {
        orientation::header_affine(&self.header)
    }

    /// Returns a view of the voxel grid
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// Grid shape
    pub fn shape(&self) -> [usize; 3] {
        let (x, y, z) = self.data.dim();
        [x, y, z]
    }

    /// Number of axial slices
    pub fn len_z(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Writes the volume as NIfTI (`.nii` or `.nii.gz`)
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        WriterOptions::new(path.as_ref())
            .reference_header(&self.header)
            .write_nifti(&self.data)?;
        Ok(())
    }
}
