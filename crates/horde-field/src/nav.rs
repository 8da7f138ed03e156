//! Navigation fields: BFS distance plus quantized direction per cell.
//!
//! Both field kinds share one construction:
//!
//! 1. Multi-source 4-connected BFS from a seed set. The flow field only
//!    expands across walkable cells; the wall field expands across every
//!    cell.
//! 2. Per-cell direction from the 8-neighbourhood: each admissible
//!    neighbour that improves distance contributes its unit offset weighted
//!    by the improvement. The sum is quantized to the shared
//!    [`DirectionTable`].
//! 3. The quantized direction is checked against the grid: rounding it to a
//!    cell step must land on an admissible, strictly improving neighbour.
//!    Otherwise the single best improving neighbour is used instead, and if
//!    none exists the cell gets [`DIR_NONE`].
//!
//! A diagonal neighbour is admissible only when neither flanking axial cell
//! is blocked, so no stored direction cuts a blocked corner.

use std::collections::VecDeque;

use glam::Vec2;
use horde_core::GridVersion;
use horde_space::offsets::{cuts_corner, neighbours_4, OFFSETS_8};
use horde_space::{GridSpec, WalkableGrid};

use crate::direction::{DirectionTable, DIR_NONE};

/// Distance value for cells the BFS never reached.
pub const UNREACHABLE: u32 = u32::MAX;

/// Which target set a [`NavField`] was built toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Distance to the nearest blocked cell; directions point away from it.
    Wall,
    /// Distance to the goal region; directions point toward it.
    Flow,
}

impl FieldKind {
    /// Short lowercase name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::Flow => "flow",
        }
    }

    /// Whether neighbour `n` improves on `current` for this field kind.
    #[inline]
    fn improvement(self, current: u32, n: u32) -> Option<u32> {
        if current == UNREACHABLE || n == UNREACHABLE {
            return None;
        }
        match self {
            Self::Flow => current.checked_sub(n).filter(|&d| d > 0),
            Self::Wall => n.checked_sub(current).filter(|&d| d > 0),
        }
    }
}

/// Immutable per-cell distance and direction arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct NavField {
    kind: FieldKind,
    spec: GridSpec,
    version: GridVersion,
    distance: Vec<u32>,
    direction: Vec<u8>,
}

/// Result of looking up a [`NavField`] at a world position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavSample {
    /// Cell coordinate.
    pub cell: (i32, i32),
    /// BFS distance, or [`UNREACHABLE`].
    pub distance: u32,
    /// Unit direction, or [`Vec2::ZERO`] for the sentinel.
    pub direction: Vec2,
}

impl NavField {
    /// Field kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Geometry the field was built over.
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Walkable-grid version the field was built from.
    pub fn version(&self) -> GridVersion {
        self.version
    }

    /// Row-major distance array.
    pub fn distances(&self) -> &[u32] {
        &self.distance
    }

    /// Row-major direction index array.
    pub fn directions(&self) -> &[u8] {
        &self.direction
    }

    /// Distance at `(x, y)`; out-of-bounds is [`UNREACHABLE`].
    #[inline]
    pub fn distance_at(&self, x: i32, y: i32) -> u32 {
        self.spec
            .index(x, y)
            .map_or(UNREACHABLE, |i| self.distance[i])
    }

    /// Direction index at `(x, y)`; out-of-bounds is [`DIR_NONE`].
    #[inline]
    pub fn direction_index_at(&self, x: i32, y: i32) -> u8 {
        self.spec
            .index(x, y)
            .map_or(DIR_NONE, |i| self.direction[i])
    }

    /// Unit direction at `(x, y)`; sentinel and out-of-bounds give zero.
    #[inline]
    pub fn direction_at(&self, x: i32, y: i32) -> Vec2 {
        DirectionTable::shared().get(self.direction_index_at(x, y))
    }

    /// Look up the cell containing `pos`. `None` if off-grid.
    #[inline]
    pub fn sample(&self, pos: Vec2) -> Option<NavSample> {
        let (x, y) = self.spec.world_to_cell(pos);
        let i = self.spec.index(x, y)?;
        Some(NavSample {
            cell: (x, y),
            distance: self.distance[i],
            direction: DirectionTable::shared().get(self.direction[i]),
        })
    }

    /// Number of cells with a finite distance.
    pub fn reachable_count(&self) -> usize {
        self.distance.iter().filter(|&&d| d != UNREACHABLE).count()
    }
}

/// Build a field of `kind` from `seeds` (flat indices at distance 0).
///
/// `expand_blocked` lets the BFS travel through blocked cells.
pub(crate) fn build_nav_field(
    grid: &WalkableGrid,
    kind: FieldKind,
    seeds: impl IntoIterator<Item = usize>,
    expand_blocked: bool,
) -> NavField {
    let distance = bfs(grid, seeds, expand_blocked);
    let direction = derive_directions(grid, kind, &distance);
    NavField {
        kind,
        spec: *grid.spec(),
        version: grid.version(),
        distance,
        direction,
    }
}

fn bfs(
    grid: &WalkableGrid,
    seeds: impl IntoIterator<Item = usize>,
    expand_blocked: bool,
) -> Vec<u32> {
    let spec = grid.spec();
    let mut dist = vec![UNREACHABLE; spec.cell_count()];
    let mut queue = VecDeque::new();
    for s in seeds {
        if s < dist.len() && dist[s] == UNREACHABLE {
            dist[s] = 0;
            queue.push_back(s);
        }
    }
    while let Some(i) = queue.pop_front() {
        let (x, y) = spec.coords(i);
        let next = dist[i] + 1;
        for n in neighbours_4(spec, x, y) {
            if dist[n] != UNREACHABLE {
                continue;
            }
            if !expand_blocked && !grid.is_walkable_index(n) {
                continue;
            }
            dist[n] = next;
            queue.push_back(n);
        }
    }
    dist
}

fn derive_directions(grid: &WalkableGrid, kind: FieldKind, dist: &[u32]) -> Vec<u8> {
    let spec = grid.spec();
    let table = DirectionTable::shared();
    (0..spec.cell_count())
        .map(|i| {
            if !grid.is_walkable_index(i) || dist[i] == UNREACHABLE {
                return DIR_NONE;
            }
            let (x, y) = spec.coords(i);
            cell_direction(grid, kind, dist, table, x, y)
        })
        .collect()
}

/// Improvement from `(x, y)` to its neighbour at `(dx, dy)`, if that
/// neighbour is in bounds, walkable, reachable, not a cut corner and
/// strictly better.
#[inline]
fn admissible(
    grid: &WalkableGrid,
    kind: FieldKind,
    dist: &[u32],
    x: i32,
    y: i32,
    dx: i32,
    dy: i32,
) -> Option<u32> {
    let n = grid.spec().index(x + dx, y + dy)?;
    if !grid.is_walkable_index(n) || cuts_corner(grid, x, y, dx, dy) {
        return None;
    }
    let current = dist[grid.spec().index(x, y)?];
    kind.improvement(current, dist[n])
}

fn cell_direction(
    grid: &WalkableGrid,
    kind: FieldKind,
    dist: &[u32],
    table: &DirectionTable,
    x: i32,
    y: i32,
) -> u8 {
    let mut sum = Vec2::ZERO;
    let mut best: Option<((i32, i32), u32)> = None;
    for (dx, dy) in OFFSETS_8 {
        let Some(gain) = admissible(grid, kind, dist, x, y, dx, dy) else {
            continue;
        };
        sum += Vec2::new(dx as f32, dy as f32).normalize() * gain as f32;
        if best.map_or(true, |(_, g)| gain > g) {
            best = Some(((dx, dy), gain));
        }
    }
    let Some(((bx, by), _)) = best else {
        return DIR_NONE;
    };

    let q = table.quantize(sum);
    if let Some((sx, sy)) = table.step(q) {
        if admissible(grid, kind, dist, x, y, sx, sy).is_some() {
            return q;
        }
    }
    table.quantize(Vec2::new(bx as f32, by as f32))
}
