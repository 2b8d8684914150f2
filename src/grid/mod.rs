//! Uniform grid for neighbor queries over a fixed set of atom positions
//!
//! Space is cut into cubic cells of edge `cell_size`. Each occupied cell keeps
//! the indices of the points that fall inside it. A range query visits the
//! block of cells covering the bounding box of the query sphere, so radii
//! larger than one cell are handled by scanning a wider block rather than by
//! rebuilding the index.

use nalgebra::Vector3;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Cell edge used by [`SpatialIndex::build`], in Angstroms
pub const DEFAULT_CELL_SIZE: f64 = 4.0;

/// Errors that can occur when building a spatial index
#[derive(Error, Debug, PartialEq)]
pub enum GridError {
    #[error("Invalid cell size: {0} (must be positive and finite)")]
    InvalidCellSize(f64),
}

type CellKey = (i64, i64, i64);

/// Neighbor index over an immutable point set
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    /// Cell edge length in Angstroms
    cell_size: f64,

    inv_cell_size: f64,

    /// Owned copy of the indexed coordinates
    points: Vec<Vector3<f64>>,

    /// Occupied cells and the point indices they contain
    cells: FxHashMap<CellKey, Vec<usize>>,

    /// Lowest and highest occupied cell on each axis
    bounds: (CellKey, CellKey),
}

impl SpatialIndex {
    /// Index `points` with the default cell size
    pub fn build(points: &[Vector3<f64>]) -> Self {
        Self::index(points, DEFAULT_CELL_SIZE)
    }

    /// Index `points` with a custom cell size
    pub fn with_cell_size(points: &[Vector3<f64>], cell_size: f64) -> Result<Self, GridError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GridError::InvalidCellSize(cell_size));
        }

        Ok(Self::index(points, cell_size))
    }

    fn index(points: &[Vector3<f64>], cell_size: f64) -> Self {
        let inv_cell_size = 1.0 / cell_size;
        let mut cells: FxHashMap<CellKey, Vec<usize>> = FxHashMap::default();
        let mut lo = (i64::MAX, i64::MAX, i64::MAX);
        let mut hi = (i64::MIN, i64::MIN, i64::MIN);

        for (i, point) in points.iter().enumerate() {
            // Points that cannot be placed are never reported as neighbors
            if !(point.x.is_finite() && point.y.is_finite() && point.z.is_finite()) {
                continue;
            }
            let key = cell_of(point, inv_cell_size);
            lo = (lo.0.min(key.0), lo.1.min(key.1), lo.2.min(key.2));
            hi = (hi.0.max(key.0), hi.1.max(key.1), hi.2.max(key.2));
            cells.entry(key).or_default().push(i);
        }

        Self {
            cell_size,
            inv_cell_size,
            points: points.to_vec(),
            cells,
            bounds: (lo, hi),
        }
    }

    /// Indices of all points within `radius` (inclusive) of `query`
    ///
    /// The order of the returned indices is unspecified.
    pub fn neighbors(&self, query: &Vector3<f64>, radius: f64) -> Vec<usize> {
        let mut found = Vec::new();
        self.for_each_neighbor(query, radius, |i, _| found.push(i));
        found
    }

    /// Calls `f(index, squared_distance)` for every point within `radius` of `query`
    pub fn for_each_neighbor<F: FnMut(usize, f64)>(
        &self,
        query: &Vector3<f64>,
        radius: f64,
        mut f: F,
    ) {
        if self.cells.is_empty() || !radius.is_finite() || radius <= 0.0 {
            return;
        }
        if !(query.x.is_finite() && query.y.is_finite() && query.z.is_finite()) {
            return;
        }

        let radius_sq = radius * radius;
        let extent = Vector3::repeat(radius);
        let from = cell_of(&(query - extent), self.inv_cell_size);
        let to = cell_of(&(query + extent), self.inv_cell_size);

        // Never walk past the occupied block, whatever the radius
        let (lo, hi) = self.bounds;
        for gx in from.0.max(lo.0)..=to.0.min(hi.0) {
            for gy in from.1.max(lo.1)..=to.1.min(hi.1) {
                for gz in from.2.max(lo.2)..=to.2.min(hi.2) {
                    let Some(members) = self.cells.get(&(gx, gy, gz)) else {
                        continue;
                    };
                    for &i in members {
                        let dist_sq = (self.points[i] - query).norm_squared();
                        if dist_sq <= radius_sq {
                            f(i, dist_sq);
                        }
                    }
                }
            }
        }
    }

    /// Coordinates of one indexed point
    pub fn point(&self, idx: usize) -> Option<&Vector3<f64>> {
        self.points.get(idx)
    }

    /// All indexed coordinates, in insertion order
    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Cell edge length in Angstroms
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }
}

fn cell_of(point: &Vector3<f64>, inv_cell_size: f64) -> CellKey {
    (
        (point.x * inv_cell_size).floor() as i64,
        (point.y * inv_cell_size).floor() as i64,
        (point.z * inv_cell_size).floor() as i64,
    )
}
