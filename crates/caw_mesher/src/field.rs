//! Dense voxel occupancy grid.

use crate::error::{MeshError, Result};

/// Occupancy byte of an empty cell.
pub const EMPTY: u8 = 0;
/// Occupancy byte of a solid cell.
pub const SOLID: u8 = 255;
/// Density threshold used by the reference terrain sample.
pub const DEFAULT_DENSITY_THRESHOLD: f32 = 0.25;

/// Dense `width × height × depth` occupancy grid, one byte per cell.
///
/// Memory layout: `cells[x * height * depth + y * depth + z]` (x outer, z inner).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelField {
    dims: [usize; 3],
    cells: Vec<u8>,
}

impl VoxelField {
    /// Create an all-empty field.
    pub fn new(dims: [usize; 3]) -> Self {
        Self {
            dims,
            cells: vec![EMPTY; dims[0] * dims[1] * dims[2]],
        }
    }

    /// Wrap a cell buffer produced by an external generator.
    ///
    /// Only the buffer length is checked here; cell values are checked by
    /// [`validate`](Self::validate) before meshing.
    pub fn from_cells(dims: [usize; 3], cells: Vec<u8>) -> Result<Self> {
        let expected = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| MeshError::invalid(format!("field dims {dims:?} overflow")))?;
        if cells.len() != expected {
            return Err(MeshError::invalid(format!(
                "field dims {dims:?} need {expected} cells, got {}",
                cells.len()
            )));
        }
        Ok(Self { dims, cells })
    }

    /// Build a field from an occupancy predicate.
    pub fn from_fn(dims: [usize; 3], mut solid: impl FnMut(usize, usize, usize) -> bool) -> Self {
        let mut field = Self::new(dims);
        for x in 0..dims[0] {
            for y in 0..dims[1] {
                for z in 0..dims[2] {
                    if solid(x, y, z) {
                        field.set_solid(x, y, z, true);
                    }
                }
            }
        }
        field
    }

    /// Threshold a density function: a cell is solid when `density > threshold`.
    pub fn from_density(
        dims: [usize; 3],
        threshold: f32,
        mut density: impl FnMut(usize, usize, usize) -> f32,
    ) -> Self {
        Self::from_fn(dims, |x, y, z| density(x, y, z) > threshold)
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.dims[0]
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.dims[1]
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.dims[2]
    }

    /// Total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Raw cell bytes in linear order.
    #[inline]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Linear index of a cell.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(self.contains(x, y, z), "Coordinates out of bounds");
        (x * self.dims[1] + y) * self.dims[2] + z
    }

    /// Cell coordinates of a linear index.
    #[inline]
    pub fn coords(&self, index: usize) -> [usize; 3] {
        let height_depth = self.dims[1] * self.dims[2];
        let x = index / height_depth;
        let rest = index % height_depth;
        [x, rest / self.dims[2], rest % self.dims[2]]
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.dims[0] && y < self.dims[1] && z < self.dims[2]
    }

    /// Check if a cell is solid.
    #[inline]
    pub fn is_solid(&self, x: usize, y: usize, z: usize) -> bool {
        self.cells[self.index(x, y, z)] == SOLID
    }

    /// Check if the cell at a linear index is solid.
    #[inline]
    pub fn is_solid_at(&self, index: usize) -> bool {
        self.cells[index] == SOLID
    }

    pub fn set_solid(&mut self, x: usize, y: usize, z: usize, solid: bool) {
        let index = self.index(x, y, z);
        self.cells[index] = if solid { SOLID } else { EMPTY };
    }

    /// Count solid cells.
    pub fn solid_count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell == SOLID).count()
    }

    /// Check that the buffer matches the dims and every cell is 0 or 255.
    pub fn validate(&self) -> Result<()> {
        let expected = self.dims[0] * self.dims[1] * self.dims[2];
        if self.cells.len() != expected {
            return Err(MeshError::invalid(format!(
                "field dims {:?} need {expected} cells, got {}",
                self.dims,
                self.cells.len()
            )));
        }
        if let Some(index) = self.cells.iter().position(|&c| c != EMPTY && c != SOLID) {
            return Err(MeshError::invalid(format!(
                "cell {:?} holds occupancy {}, expected 0 or 255",
                self.coords(index),
                self.cells[index]
            )));
        }
        Ok(())
    }
}
