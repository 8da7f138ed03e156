//! Goal-seeking flow field.

use glam::Vec2;
use horde_space::{GridSpec, WalkableGrid};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::FieldError;
use crate::nav::{build_nav_field, FieldKind, NavField};

/// The shared destination: a disk in world space.
///
/// A cell belongs to the goal when its center lies within `radius` of
/// `center`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GoalRegion {
    /// World-space center.
    pub center: Vec2,
    /// World-space radius. Negative values behave as zero.
    pub radius: f32,
}

impl Default for GoalRegion {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            radius: 1.0,
        }
    }
}

impl GoalRegion {
    /// Create a goal region.
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Whether center and radius are finite.
    pub fn is_valid(&self) -> bool {
        self.center.is_finite() && self.radius.is_finite()
    }

    /// Whether cell `(x, y)` of `spec` is inside the disk.
    pub fn contains_cell(&self, spec: &GridSpec, x: i32, y: i32) -> bool {
        let r = self.radius.max(0.0);
        spec.cell_center(x, y).distance_squared(self.center) <= r * r
    }

    /// Flat indices of in-bounds cells inside the disk, row-major.
    pub fn cells(&self, spec: &GridSpec) -> Vec<usize> {
        let r = self.radius.max(0.0);
        let cs = spec.cell_size();
        let (x0, y0) = spec.world_to_cell(self.center - Vec2::splat(r + cs));
        let (x1, y1) = spec.world_to_cell(self.center + Vec2::splat(r + cs));
        let x0 = x0.max(0);
        let y0 = y0.max(0);
        let x1 = x1.min(spec.width() as i32 - 1);
        let y1 = y1.min(spec.height() as i32 - 1);
        let mut out = Vec::new();
        for y in y0..=y1 {
            for x in x0..=x1 {
                if self.contains_cell(spec, x, y) {
                    if let Some(i) = spec.index(x, y) {
                        out.push(i);
                    }
                }
            }
        }
        out
    }
}

/// Build the flow field toward `goal`.
///
/// Walkable cells inside the goal disk are seeds at distance 0. If the disk
/// holds no walkable cell (a goal placed on a building), the walkable cell
/// whose center is nearest the goal center is the single seed, ties going
/// to the lowest row-major index. The BFS expands across walkable cells only; walkable
/// cells it never reaches keep [`UNREACHABLE`] and the sentinel direction.
///
/// [`UNREACHABLE`]: crate::nav::UNREACHABLE
pub fn build_flow_field(grid: &WalkableGrid, goal: &GoalRegion) -> Result<NavField, FieldError> {
    if !goal.is_valid() {
        return Err(FieldError::InvalidGoal);
    }
    let spec = grid.spec();
    let mut seeds: Vec<usize> = goal
        .cells(spec)
        .into_iter()
        .filter(|&i| grid.is_walkable_index(i))
        .collect();
    if seeds.is_empty() {
        match grid.nearest_walkable(goal.center) {
            Some(i) => {
                warn!(
                    center = ?goal.center,
                    radius = goal.radius,
                    fallback = i,
                    "goal region has no walkable cell, seeding nearest walkable cell"
                );
                seeds.push(i);
            }
            None => warn!("grid has no walkable cell, flow field is empty"),
        }
    }
    let field = build_nav_field(grid, FieldKind::Flow, seeds, false);
    debug!(
        version = %grid.version(),
        reachable = field.reachable_count(),
        "flow field built"
    );
    Ok(field)
}
