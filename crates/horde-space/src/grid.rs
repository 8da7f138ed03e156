//! Grid geometry and the walkable map.

use glam::Vec2;
use horde_core::GridVersion;

use crate::error::GridError;

/// Immutable per-build grid geometry: dimensions, cell size and the
/// world-space position of cell `(0, 0)`'s minimum corner.
///
/// Cell `(x, y)` covers `origin + [x, x+1) * cell_size` by
/// `origin + [y, y+1) * cell_size`. Flat indices are row-major:
/// `index = x + y * width`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSpec {
    width: u32,
    height: u32,
    cell_size: f32,
    origin: Vec2,
}

impl GridSpec {
    /// Maximum dimension size: cell coordinates use `i32`.
    pub const MAX_DIM: u32 = i32::MAX as u32;

    /// Create a grid description.
    ///
    /// Returns `Err(GridError::EmptyGrid)` if either dimension is 0.
    pub fn new(width: u32, height: u32, cell_size: f32, origin: Vec2) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyGrid);
        }
        if width > Self::MAX_DIM {
            return Err(GridError::DimensionTooLarge {
                name: "width",
                value: width,
            });
        }
        if height > Self::MAX_DIM {
            return Err(GridError::DimensionTooLarge {
                name: "height",
                value: height,
            });
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GridError::InvalidCellSize { value: cell_size });
        }
        if !origin.is_finite() {
            return Err(GridError::InvalidOrigin);
        }
        Ok(Self {
            width,
            height,
            cell_size,
            origin,
        })
    }

    /// Number of columns.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// World-space edge length of a cell.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World-space minimum corner of cell `(0, 0)`.
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Cell coordinate containing `pos`: `floor((pos - origin) / cell_size)`.
    ///
    /// The result may lie outside the grid.
    #[inline]
    pub fn world_to_cell(&self, pos: Vec2) -> (i32, i32) {
        let rel = (pos - self.origin) / self.cell_size;
        (rel.x.floor() as i32, rel.y.floor() as i32)
    }

    /// Whether `(x, y)` lies inside the grid.
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Flat index of `(x, y)`, or `None` if out of bounds.
    #[inline]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| x as usize + y as usize * self.width as usize)
    }

    /// Flat index of the cell containing `pos`, or `None` if off-grid.
    #[inline]
    pub fn index_at(&self, pos: Vec2) -> Option<usize> {
        let (x, y) = self.world_to_cell(pos);
        self.index(x, y)
    }

    /// Cell coordinate of a flat index.
    #[inline]
    pub fn coords(&self, index: usize) -> (i32, i32) {
        let w = self.width as usize;
        ((index % w) as i32, (index / w) as i32)
    }

    /// World-space centre of cell `(x, y)` (valid for any coordinate).
    #[inline]
    pub fn cell_center(&self, x: i32, y: i32) -> Vec2 {
        self.origin + (Vec2::new(x as f32, y as f32) + Vec2::splat(0.5)) * self.cell_size
    }

    /// World-space minimum corner of cell `(x, y)`.
    #[inline]
    pub fn cell_min(&self, x: i32, y: i32) -> Vec2 {
        self.origin + Vec2::new(x as f32, y as f32) * self.cell_size
    }
}

/// The map producer's walkable/blocked state over a [`GridSpec`].
///
/// Every change to walkable state bumps the [`GridVersion`], which is how
/// derived navigation fields detect that they are stale.
#[derive(Clone, Debug)]
pub struct WalkableGrid {
    spec: GridSpec,
    walkable: Vec<bool>,
    version: GridVersion,
}

impl WalkableGrid {
    /// Wrap a row-major walkable array (`index = x + y * width`).
    pub fn new(spec: GridSpec, walkable: Vec<bool>) -> Result<Self, GridError> {
        if walkable.len() != spec.cell_count() {
            return Err(GridError::WalkableSizeMismatch {
                expected: spec.cell_count(),
                actual: walkable.len(),
            });
        }
        Ok(Self {
            spec,
            walkable,
            version: GridVersion::default(),
        })
    }

    /// A grid where every cell is walkable.
    pub fn open(spec: GridSpec) -> Self {
        Self {
            walkable: vec![true; spec.cell_count()],
            spec,
            version: GridVersion::default(),
        }
    }

    /// Grid geometry.
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Current version.
    pub fn version(&self) -> GridVersion {
        self.version
    }

    /// Raw row-major walkable flags.
    pub fn cells(&self) -> &[bool] {
        &self.walkable
    }

    /// Walkable state of `(x, y)`. Out-of-bounds cells are walkable
    /// (no constraint).
    #[inline]
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        match self.spec.index(x, y) {
            Some(i) => self.walkable[i],
            None => true,
        }
    }

    /// Whether `(x, y)` is an in-bounds blocked cell.
    #[inline]
    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        !self.is_walkable(x, y)
    }

    /// Walkable state of the cell containing `pos`.
    #[inline]
    pub fn is_walkable_at(&self, pos: Vec2) -> bool {
        let (x, y) = self.spec.world_to_cell(pos);
        self.is_walkable(x, y)
    }

    /// Walkable state by flat index.
    #[inline]
    pub fn is_walkable_index(&self, index: usize) -> bool {
        self.walkable.get(index).copied().unwrap_or(true)
    }

    /// Set one cell's walkable state. Returns `true` (and bumps the
    /// version) only if the state changed.
    pub fn set_walkable(&mut self, x: i32, y: i32, walkable: bool) -> bool {
        let Some(i) = self.spec.index(x, y) else {
            return false;
        };
        if self.walkable[i] == walkable {
            return false;
        }
        self.walkable[i] = walkable;
        self.version = self.version.next();
        true
    }

    /// Move the version past `previous`, so a grid swapped in for an
    /// older one never repeats one of its versions.
    pub fn advance_past(&mut self, previous: GridVersion) {
        self.version = self.version.max(previous).next();
    }

    /// Replace the whole walkable array, bumping the version.
    pub fn replace(&mut self, walkable: Vec<bool>) -> Result<(), GridError> {
        if walkable.len() != self.spec.cell_count() {
            return Err(GridError::WalkableSizeMismatch {
                expected: self.spec.cell_count(),
                actual: walkable.len(),
            });
        }
        self.walkable = walkable;
        self.version = self.version.next();
        Ok(())
    }

    /// Flat index of the walkable cell whose center is nearest `point`.
    /// Ties keep the lowest index.
    pub fn nearest_walkable(&self, point: Vec2) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, _) in self.walkable.iter().enumerate().filter(|(_, &w)| w) {
            let (x, y) = self.spec.coords(i);
            let d2 = self.spec.cell_center(x, y).distance_squared(point);
            if best.map_or(true, |(_, b)| d2 < b) {
                best = Some((i, d2));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Number of walkable cells.
    pub fn walkable_count(&self) -> usize {
        self.walkable.iter().filter(|&&w| w).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(w: u32, h: u32) -> GridSpec {
        GridSpec::new(w, h, 1.0, Vec2::ZERO).unwrap()
    }

    #[test]
    fn new_rejects_zero_area() {
        assert_eq!(
            GridSpec::new(0, 4, 1.0, Vec2::ZERO),
            Err(GridError::EmptyGrid)
        );
        assert_eq!(
            GridSpec::new(4, 0, 1.0, Vec2::ZERO),
            Err(GridError::EmptyGrid)
        );
    }

    #[test]
    fn new_rejects_bad_cell_size() {
        assert!(matches!(
            GridSpec::new(4, 4, 0.0, Vec2::ZERO),
            Err(GridError::InvalidCellSize { .. })
        ));
        assert!(matches!(
            GridSpec::new(4, 4, f32::NAN, Vec2::ZERO),
            Err(GridError::InvalidCellSize { .. })
        ));
    }

    #[test]
    fn world_to_cell_floors_relative_to_origin() {
        let s = GridSpec::new(10, 10, 2.0, Vec2::new(-10.0, -10.0)).unwrap();
        assert_eq!(s.world_to_cell(Vec2::new(-10.0, -10.0)), (0, 0));
        assert_eq!(s.world_to_cell(Vec2::new(-8.1, -6.0)), (0, 2));
        assert_eq!(s.world_to_cell(Vec2::new(-10.5, 0.0)), (-1, 5));
        assert_eq!(s.index_at(Vec2::new(-10.5, 0.0)), None);
    }

    #[test]
    fn index_and_coords_are_row_major() {
        let s = spec(4, 3);
        assert_eq!(s.index(1, 2), Some(9));
        assert_eq!(s.coords(9), (1, 2));
        assert_eq!(s.index(4, 0), None);
        assert_eq!(s.index(0, -1), None);
    }

    #[test]
    fn cell_center_is_mid_cell() {
        let s = GridSpec::new(4, 4, 2.0, Vec2::new(1.0, 1.0)).unwrap();
        assert_eq!(s.cell_center(0, 0), Vec2::new(2.0, 2.0));
        assert_eq!(s.cell_center(1, 2), Vec2::new(4.0, 6.0));
        assert_eq!(s.cell_min(1, 2), Vec2::new(3.0, 5.0));
    }

    #[test]
    fn walkable_size_mismatch() {
        assert!(matches!(
            WalkableGrid::new(spec(3, 3), vec![true; 8]),
            Err(GridError::WalkableSizeMismatch {
                expected: 9,
                actual: 8
            })
        ));
    }

    #[test]
    fn out_of_bounds_is_walkable() {
        let g = WalkableGrid::new(spec(2, 2), vec![false; 4]).unwrap();
        assert!(!g.is_walkable(0, 0));
        assert!(g.is_walkable(-1, 0));
        assert!(g.is_walkable(2, 2));
        assert!(g.is_walkable_at(Vec2::new(-3.0, 0.5)));
    }

    #[test]
    fn set_walkable_bumps_version_only_on_change() {
        let mut g = WalkableGrid::open(spec(3, 3));
        let v0 = g.version();
        assert!(!g.set_walkable(1, 1, true));
        assert_eq!(g.version(), v0);
        assert!(g.set_walkable(1, 1, false));
        assert_eq!(g.version(), v0.next());
        assert!(g.is_blocked(1, 1));
        assert!(!g.set_walkable(5, 5, false));
    }

    #[test]
    fn advance_past_skips_older_versions() {
        let mut old = WalkableGrid::open(spec(3, 3));
        old.set_walkable(0, 0, false);
        old.set_walkable(1, 0, false);
        let mut fresh = WalkableGrid::open(spec(3, 3));
        fresh.advance_past(old.version());
        assert!(fresh.version() > old.version());
    }

    #[test]
    fn nearest_walkable_by_cell_center() {
        let mut cells = vec![false; 9];
        cells[5] = true;
        cells[7] = true;
        let g = WalkableGrid::new(spec(3, 3), cells).unwrap();
        assert_eq!(g.walkable_count(), 2);
        // (2, 1) and (1, 2) are equally far from the middle: lowest index.
        assert_eq!(g.nearest_walkable(Vec2::splat(1.5)), Some(5));
        assert_eq!(g.nearest_walkable(Vec2::new(1.5, 2.9)), Some(7));
        let closed = WalkableGrid::new(spec(2, 2), vec![false; 4]).unwrap();
        assert_eq!(closed.nearest_walkable(Vec2::ZERO), None);
    }
}
