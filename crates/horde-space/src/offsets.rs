//! Neighbourhood offsets and the diagonal corner rule.
//!
//! Every field builder expands 4-connected and reads 8-connected
//! neighbourhoods. The offsets and the corner-cutting check live here so
//! the wall field, flow field and pressure sampling agree on them.

use smallvec::SmallVec;

use crate::grid::{GridSpec, WalkableGrid};

/// 4-connected offsets `(dx, dy)`: west, east, north, south.
pub const OFFSETS_4: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// 8-connected offsets `(dx, dy)`: the four axial neighbours followed by
/// the four diagonals.
pub const OFFSETS_8: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

/// Whether an offset moves along both axes.
#[inline]
pub fn is_diagonal(dx: i32, dy: i32) -> bool {
    dx != 0 && dy != 0
}

/// Whether stepping from `(x, y)` by `(dx, dy)` cuts a blocked corner.
///
/// A diagonal step is rejected when either flanking axial cell
/// (`(x + dx, y)` or `(x, y + dy)`) is blocked. Axial steps never cut.
#[inline]
pub fn cuts_corner(grid: &WalkableGrid, x: i32, y: i32, dx: i32, dy: i32) -> bool {
    is_diagonal(dx, dy) && (grid.is_blocked(x + dx, y) || grid.is_blocked(x, y + dy))
}

/// In-bounds 4-connected neighbour indices of `(x, y)`.
pub fn neighbours_4(spec: &GridSpec, x: i32, y: i32) -> SmallVec<[usize; 4]> {
    let mut out = SmallVec::new();
    for (dx, dy) in OFFSETS_4 {
        if let Some(i) = spec.index(x + dx, y + dy) {
            out.push(i);
        }
    }
    out
}
