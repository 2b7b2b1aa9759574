use ndarray::{Array3, Axis};
use nifti::NiftiHeader;

/// Voxel-to-world affine transform, row major
pub type Affine = [[f64; 4]; 4];

/// Identity affine
pub const IDENTITY: Affine = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Where one voxel axis ends up in the closest RAS orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisOrientation {
    /// World axis (0 = R, 1 = A, 2 = S) this voxel axis runs along
    pub world_axis: usize,

    /// Whether the voxel axis runs against the world axis
    pub flipped: bool,
}

/// Orientation of an already canonical grid
pub const CANONICAL: [AxisOrientation; 3] = [
    AxisOrientation {
        world_axis: 0,
        flipped: false,
    },
    AxisOrientation {
        world_axis: 1,
        flipped: false,
    },
    AxisOrientation {
        world_axis: 2,
        flipped: false,
    },
];

/// Resolves the voxel-to-world affine of a NIfTI header
///
/// Uses the sform when `sform_code > 0`, the quaternion qform when
/// `qform_code > 0`, and a plain pixdim scaling otherwise.
pub fn header_affine(h: &NiftiHeader) -> Affine {
    if h.sform_code > 0 {
        let mut affine = IDENTITY;
        for (row, srow) in [h.srow_x, h.srow_y, h.srow_z].iter().enumerate() {
            for col in 0..4 {
                affine[row][col] = srow[col] as f64;
            }
        }
        return affine;
    }

    let zooms = [h.pixdim[1] as f64, h.pixdim[2] as f64, h.pixdim[3] as f64];

    if h.qform_code > 0 {
        let (b, c, d) = (h.quatern_b as f64, h.quatern_c as f64, h.quatern_d as f64);
        let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
        let rotation = [
            [
                a * a + b * b - c * c - d * d,
                2.0 * (b * c - a * d),
                2.0 * (b * d + a * c),
            ],
            [
                2.0 * (b * c + a * d),
                a * a + c * c - b * b - d * d,
                2.0 * (c * d - a * b),
            ],
            [
                2.0 * (b * d - a * c),
                2.0 * (c * d + a * b),
                a * a + d * d - b * b - c * c,
            ],
        ];
        let qfac = if h.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let scale = [zooms[0], zooms[1], zooms[2] * qfac];
        let offset = [h.quatern_x as f64, h.quatern_y as f64, h.quatern_z as f64];

        let mut affine = IDENTITY;
        for row in 0..3 {
            for col in 0..3 {
                affine[row][col] = rotation[row][col] * scale[col];
            }
            affine[row][3] = offset[row];
        }
        return affine;
    }

    let mut affine = IDENTITY;
    for (axis, zoom) in zooms.iter().enumerate() {
        affine[axis][axis] = if *zoom > 0.0 { *zoom } else { 1.0 };
    }
    affine
}

/// Writes an affine into the sform of a header and disables the qform
pub fn set_header_affine(h: &mut NiftiHeader, affine: &Affine) {
    let row = |r: usize| {
        [
            affine[r][0] as f32,
            affine[r][1] as f32,
            affine[r][2] as f32,
            affine[r][3] as f32,
        ]
    };
    h.srow_x = row(0);
    h.srow_y = row(1);
    h.srow_z = row(2);
    if h.sform_code <= 0 {
        h.sform_code = 1;
    }
    h.qform_code = 0;
    for (axis, zoom) in voxel_sizes(affine).iter().enumerate() {
        h.pixdim[axis + 1] = *zoom as f32;
    }
}

/// Voxel size along each voxel axis
pub fn voxel_sizes(affine: &Affine) -> [f64; 3] {
    let mut sizes = [0.0; 3];
    for (col, size) in sizes.iter_mut().enumerate() {
        *size = (0..3).map(|row| affine[row][col].powi(2)).sum::<f64>().sqrt();
    }
    sizes
}

/// Computes the closest RAS orientation of each voxel axis
///
/// Voxel axes are visited in order; each one claims the world axis with the
/// largest absolute direction cosine among those not yet claimed.
pub fn io_orientation(affine: &Affine) -> [AxisOrientation; 3] {
    let sizes = voxel_sizes(affine);
    let mut cosines = [[0.0f64; 3]; 3];
    for row in 0..3 {
        for col in 0..3 {
            if sizes[col] > 0.0 {
                cosines[row][col] = affine[row][col] / sizes[col];
            }
        }
    }

    let mut ornt = CANONICAL;
    let mut claimed = [false; 3];
    for (voxel_axis, slot) in ornt.iter_mut().enumerate() {
        // First maximum wins, so a degenerate column keeps the identity mapping
        let mut best: Option<(usize, f64)> = None;
        for world in (0..3).filter(|world| !claimed[*world]) {
            let weight = cosines[world][voxel_axis].abs();
            if best.map_or(true, |(_, w)| weight > w) {
                best = Some((world, weight));
            }
        }
        let Some((world_axis, _)) = best else { break };
        claimed[world_axis] = true;
        *slot = AxisOrientation {
            world_axis,
            flipped: cosines[world_axis][voxel_axis] < 0.0,
        };
    }
    ornt
}

/// Returns whether an orientation leaves the grid untouched
pub fn is_canonical(ornt: &[AxisOrientation; 3]) -> bool {
    *ornt == CANONICAL
}

/// Flips and permutes a grid into the given orientation
pub fn reorient_grid<A: Clone>(data: Array3<A>, ornt: &[AxisOrientation; 3]) -> Array3<A> {
    let mut data = data;
    for (voxel_axis, o) in ornt.iter().enumerate() {
        if o.flipped {
            data.invert_axis(Axis(voxel_axis));
        }
    }
    let mut perm = [0usize; 3];
    for (voxel_axis, o) in ornt.iter().enumerate() {
        perm[o.world_axis] = voxel_axis;
    }
    data.permuted_axes(perm).as_standard_layout().into_owned()
}

/// Affine of a grid after [`reorient_grid`]
pub fn reorient_affine(
    affine: &Affine,
    ornt: &[AxisOrientation; 3],
    shape: [usize; 3],
) -> Affine {
    let mut out = IDENTITY;
    let mut translation = [affine[0][3], affine[1][3], affine[2][3]];
    for (voxel_axis, o) in ornt.iter().enumerate() {
        let sign = if o.flipped { -1.0 } else { 1.0 };
        let extent = shape[voxel_axis].saturating_sub(1) as f64;
        for row in 0..3 {
            out[row][o.world_axis] = affine[row][voxel_axis] * sign;
            if o.flipped {
                translation[row] += affine[row][voxel_axis] * extent;
            }
        }
    }
    for row in 0..3 {
        out[row][3] = translation[row];
    }
    out
}
