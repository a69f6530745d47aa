//! Dense arrays paired with the grid they are sampled on.

use ndarray::Array3;

use crate::grid::Grid3;
use crate::Real;

/// A discrete function: a dense 3-D array over a rectilinear grid.
///
/// The array and the grid always have the same shape; storage is row-major
/// with a contiguous last axis (ndarray's default layout).
#[derive(Debug, Clone)]
pub struct DiscreteFunction3 {
    data: Array3<Real>,
    grid: Grid3,
}

impl DiscreteFunction3 {
    pub fn new(data: Array3<Real>, grid: Grid3) -> Self {
        debug_assert_eq!(data.shape(), grid.size());
        Self { data, grid }
    }

    pub fn zeros(grid: Grid3) -> Self {
        let [n0, n1, n2] = grid.size();
        Self {
            data: Array3::zeros((n0, n1, n2)),
            grid,
        }
    }

    pub fn grid(&self) -> &Grid3 {
        &self.grid
    }

    pub fn data(&self) -> &Array3<Real> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array3<Real> {
        &mut self.data
    }

    pub fn into_data(self) -> Array3<Real> {
        self.data
    }

    pub fn shape(&self) -> [usize; 3] {
        self.grid.size()
    }
}
