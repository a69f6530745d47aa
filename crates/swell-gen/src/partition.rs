//! Partitioning of the output grid into rectangular blocks.

use swell_core::Real;

/// A rectangular sub-block of the output surface, generated by a single
/// worker.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Position in the block lattice.
    pub ijk: [usize; 3],
    /// Inclusive lower corner in grid coordinates.
    pub lower: [usize; 3],
    /// Exclusive upper corner in grid coordinates.
    pub upper: [usize; 3],
    /// Visit order in the lattice; indexes the PRNG pool.
    pub index: usize,
}

impl Partition {
    pub fn shape(&self) -> [usize; 3] {
        [
            self.upper[0] - self.lower[0],
            self.upper[1] - self.lower[1],
            self.upper[2] - self.lower[2],
        ]
    }

    pub fn num_elements(&self) -> usize {
        self.shape().iter().product()
    }
}

fn div_ceil(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// Default block-shape heuristic: `max(2·order, (10,10,10))` clamped above
/// by `⌈shape / (7·∛parallelism)⌉` and by the grid shape itself. An
/// explicitly configured shape wins.
pub fn partition_shape(
    explicit: Option<[usize; 3]>,
    grid_shape: [usize; 3],
    order: [usize; 3],
    parallelism: usize,
) -> [usize; 3] {
    if let Some(shape) = explicit {
        if shape.iter().all(|&n| n > 0) {
            return [
                shape[0].min(grid_shape[0]),
                shape[1].min(grid_shape[1]),
                shape[2].min(grid_shape[2]),
            ];
        }
    }
    let npar = (7.0 * (parallelism.max(1) as Real).cbrt()).max(1.0) as usize;
    let mut result = [0; 3];
    for axis in 0..3 {
        let guess = (2 * order[axis]).max(10);
        let limit = div_ceil(grid_shape[axis], npar).max(1);
        result[axis] = guess.min(limit).min(grid_shape[axis]).max(1);
    }
    result
}

/// Block lattice dimensions for a grid split into `partshape` blocks.
pub fn num_partitions(shape: [usize; 3], partshape: [usize; 3]) -> [usize; 3] {
    [
        div_ceil(shape[0], partshape[0]),
        div_ceil(shape[1], partshape[1]),
        div_ceil(shape[2], partshape[2]),
    ]
}

/// Enumerate the partitions of the grid in row-major lattice order; the
/// enumeration index doubles as the PRNG stream index.
pub fn make_partitions(shape: [usize; 3], partshape: [usize; 3]) -> Vec<Partition> {
    let nparts = num_partitions(shape, partshape);
    let mut parts = Vec::with_capacity(nparts.iter().product());
    for i in 0..nparts[0] {
        for j in 0..nparts[1] {
            for k in 0..nparts[2] {
                let ijk = [i, j, k];
                let mut lower = [0; 3];
                let mut upper = [0; 3];
                for axis in 0..3 {
                    lower[axis] = (ijk[axis] * partshape[axis]).min(shape[axis]);
                    upper[axis] = ((ijk[axis] + 1) * partshape[axis]).min(shape[axis]);
                }
                let index = parts.len();
                parts.push(Partition {
                    ijk,
                    lower,
                    upper,
                    index,
                });
            }
        }
    }
    parts
}
