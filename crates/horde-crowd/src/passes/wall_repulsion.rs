//! Push away from nearby walls; snap out of blocked cells.

use glam::Vec2;
use horde_core::{PassError, Resource, ResourceSet};
use horde_field::{NavField, UNREACHABLE};
use horde_space::WalkableGrid;
use serde::Deserialize;

use crate::context::PassContext;
use crate::diagnostics::Warning;
use crate::pass::CrowdPass;

/// Largest projection search radius, in cells.
pub const MAX_SEARCH_RADIUS: u32 = 64;

/// Wall repulsion and projection parameters.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WallConfig {
    /// Wall distance (in cells) below which agents are pushed. Default: 2.0.
    pub radius: f32,
    /// Push per cell of intrusion, as a fraction of the cell size.
    /// Default: 0.5.
    pub strength: f32,
    /// Absolute cap on push distance per tick. Default: 0.2.
    pub max_push: f32,
    /// Cap on push distance as a fraction of `speed * dt`, in `[0, 1]`.
    /// Default: 1.0.
    pub speed_fraction: f32,
    /// Projection searches rings `1..=search_radius + 1` around a blocked
    /// cell, clamped to `[1, 64]`. Default: 3.
    pub search_radius: u32,
    /// Inward inset of the projection target from the cell boundary, as a
    /// fraction of the cell size, in `[0, 0.49]`. Default: 0.05.
    pub inset: f32,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            radius: 2.0,
            strength: 0.5,
            max_push: 0.2,
            speed_fraction: 1.0,
            search_radius: 3,
            inset: 0.05,
        }
    }
}

impl WallConfig {
    /// Copy with values clamped into range; non-finite values take the
    /// default.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let pick = |v: f32, def: f32| if v.is_finite() { v } else { def };
        Self {
            radius: pick(self.radius, d.radius).max(0.0),
            strength: pick(self.strength, d.strength).max(0.0),
            max_push: pick(self.max_push, d.max_push).max(0.0),
            speed_fraction: pick(self.speed_fraction, d.speed_fraction).clamp(0.0, 1.0),
            search_radius: self.search_radius.clamp(1, MAX_SEARCH_RADIUS),
            inset: pick(self.inset, d.inset).clamp(0.0, 0.49),
        }
    }
}

/// Nearest point inside a walkable cell around the blocked cell holding
/// `pos`, searching square rings of radius `1..=search_radius + 1`.
///
/// Candidates are each walkable cell's closest interior point, pulled in by
/// `inset` so the result never sits on a cell boundary. Ties keep the
/// first cell in ring scan order.
pub fn project_to_walkable(grid: &WalkableGrid, pos: Vec2, cfg: &WallConfig) -> Option<Vec2> {
    let spec = grid.spec();
    let cs = spec.cell_size();
    let (bx, by) = spec.world_to_cell(pos);
    let pad = Vec2::splat(cfg.inset * cs);
    let mut best: Option<(Vec2, f32)> = None;

    for r in 1..=(cfg.search_radius as i32 + 1) {
        if let Some((_, d2)) = best {
            let floor = (r - 1) as f32 * cs;
            if d2 <= floor * floor {
                break;
            }
        }
        for dy in -r..=r {
            for dx in -r..=r {
                if dx.abs() != r && dy.abs() != r {
                    continue;
                }
                let (x, y) = (bx + dx, by + dy);
                if !spec.in_bounds(x, y) || !grid.is_walkable(x, y) {
                    continue;
                }
                let lo = spec.cell_min(x, y);
                let candidate = pos.clamp(lo + pad, lo + Vec2::splat(cs) - pad);
                let d2 = candidate.distance_squared(pos);
                if best.map_or(true, |(_, b)| d2 < b) {
                    best = Some((candidate, d2));
                }
            }
        }
    }
    best.map(|(p, _)| p)
}

#[derive(Clone, Copy, Debug, Default)]
struct Outcome {
    pos: Vec2,
    projected: bool,
    failed: bool,
}

fn resolve(
    grid: &WalkableGrid,
    wall: &NavField,
    cfg: &WallConfig,
    pos: Vec2,
    speed: f32,
    dt: f32,
) -> Outcome {
    let spec = grid.spec();
    let (x, y) = spec.world_to_cell(pos);
    let stay = Outcome {
        pos,
        projected: false,
        failed: false,
    };
    if !spec.in_bounds(x, y) {
        return stay;
    }
    if grid.is_blocked(x, y) {
        return project(grid, cfg, pos, pos);
    }

    let d = wall.distance_at(x, y);
    if d == UNREACHABLE || d as f32 >= cfg.radius {
        return stay;
    }
    let dir = wall.direction_at(x, y);
    if dir == Vec2::ZERO {
        return stay;
    }
    let magnitude = ((cfg.radius - d as f32) * cfg.strength * spec.cell_size())
        .min(cfg.max_push)
        .min(cfg.speed_fraction * (speed * dt).max(0.0));
    if magnitude <= 0.0 {
        return stay;
    }
    let pushed = pos + dir * magnitude;
    if grid.is_walkable_at(pushed) {
        Outcome {
            pos: pushed,
            projected: false,
            failed: false,
        }
    } else {
        project(grid, cfg, pushed, pos)
    }
}

fn project(grid: &WalkableGrid, cfg: &WallConfig, from: Vec2, fallback: Vec2) -> Outcome {
    match project_to_walkable(grid, from, cfg) {
        Some(pos) => Outcome {
            pos,
            projected: true,
            failed: false,
        },
        None => Outcome {
            pos: fallback,
            projected: false,
            failed: true,
        },
    }
}

/// Pushes agents near walls along the wall field and projects agents
/// inside blocked cells to the nearest walkable cell.
///
/// Push magnitude is `(radius - distance) * strength` cells, capped by
/// `max_push` and by `speed_fraction * speed * dt`. A push that lands in a
/// blocked cell is projected instead.
#[derive(Debug)]
pub struct WallRepulsionPass {
    config: WallConfig,
    outcomes: Vec<Outcome>,
}

impl WallRepulsionPass {
    /// Create the pass.
    pub fn new(config: WallConfig) -> Self {
        Self {
            config,
            outcomes: Vec::new(),
        }
    }

    /// Wall parameters.
    pub fn config(&self) -> &WallConfig {
        &self.config
    }
}

impl CrowdPass for WallRepulsionPass {
    fn name(&self) -> &str {
        "wall_repulsion"
    }

    fn reads(&self) -> ResourceSet {
        [
            Resource::Walkable,
            Resource::WallField,
            Resource::Speeds,
            Resource::Positions,
        ]
        .into_iter()
        .collect()
    }

    fn writes(&self) -> ResourceSet {
        [Resource::Positions].into_iter().collect()
    }

    fn step(&mut self, ctx: &mut PassContext<'_>) -> Result<(), PassError> {
        let Some(wall) = ctx.wall() else {
            ctx.diagnostics().warn_once(Warning::WallFieldPending);
            return Ok(());
        };
        let cfg = self.config.sanitized();
        let grid = ctx.grid();
        let dt = ctx.dt();
        let diagnostics = ctx.diagnostics();

        let (agents, pool) = ctx.agents_mut();
        self.outcomes.resize(agents.positions.len(), Outcome::default());
        {
            let positions: &[Vec2] = &*agents.positions;
            let speeds = agents.speeds;
            let active = agents.active;
            pool.fill(&mut self.outcomes, |i| {
                if !active[i] {
                    return Outcome {
                        pos: positions[i],
                        projected: false,
                        failed: false,
                    };
                }
                resolve(grid, wall, &cfg, positions[i], speeds[i], dt)
            });
        }

        let mut projections = 0;
        let mut failed = false;
        for (i, o) in self.outcomes.iter().enumerate() {
            agents.positions[i] = o.pos;
            projections += u64::from(o.projected);
            failed |= o.failed;
        }
        if failed {
            diagnostics.warn_once(Warning::ProjectionFailed);
        }
        ctx.counters().projections += projections;
        Ok(())
    }
}
