//! Wall-avoidance field.

use horde_space::WalkableGrid;
use tracing::debug;

use crate::nav::{build_nav_field, FieldKind, NavField};

/// Build the wall field: every blocked cell is a seed at distance 0, the
/// BFS runs through every cell, and walkable-cell directions point toward
/// increasing distance (away from the nearest wall).
///
/// A grid with no blocked cells yields an all-[`UNREACHABLE`] field.
///
/// [`UNREACHABLE`]: crate::nav::UNREACHABLE
pub fn build_wall_field(grid: &WalkableGrid) -> NavField {
    let seeds = grid
        .cells()
        .iter()
        .enumerate()
        .filter(|(_, &w)| !w)
        .map(|(i, _)| i);
    let field = build_nav_field(grid, FieldKind::Wall, seeds, true);
    debug!(
        version = %grid.version(),
        reachable = field.reachable_count(),
        "wall field built"
    );
    field
}
