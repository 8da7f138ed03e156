//! Flow-following movement, throttled and biased by congestion.

use glam::Vec2;
use horde_core::{PassError, Resource, ResourceSet};
use horde_field::{GoalRegion, NavField, PressureConfig, PressureField};
use horde_space::WalkableGrid;
use serde::Deserialize;

use crate::context::PassContext;
use crate::diagnostics::Warning;
use crate::pass::CrowdPass;

/// Steering parameters.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Multiplier on every agent's intrinsic speed. Default: 1.0.
    pub speed_multiplier: f32,
    /// Longest step per tick as a fraction of the cell size, so the
    /// blocked-destination check never skips a cell. Default: 0.9.
    pub max_step_cells: f32,
    /// Add the congestion push to the flow step. Default: true.
    pub pressure_push: bool,
    /// Scale speed down in congested cells. Default: true.
    pub throttle: bool,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            max_step_cells: 0.9,
            pressure_push: true,
            throttle: true,
        }
    }
}

impl SteeringConfig {
    /// Copy with values clamped into range; non-finite values take the
    /// default.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        Self {
            speed_multiplier: finite_or(self.speed_multiplier, d.speed_multiplier).max(0.0),
            max_step_cells: finite_or(self.max_step_cells, d.max_step_cells).clamp(0.01, 1.0),
            pressure_push: self.pressure_push,
            throttle: self.throttle,
        }
    }
}

fn finite_or(v: f32, default: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        default
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Move {
    pos: Vec2,
    dir: Vec2,
    blocked: bool,
}

struct Inputs<'a> {
    grid: &'a WalkableGrid,
    flow: &'a NavField,
    pressure: &'a PressureField,
    goal: GoalRegion,
    steering: &'a SteeringConfig,
    congestion: &'a PressureConfig,
    dt: f32,
}

impl Inputs<'_> {
    /// One agent's move. `None` leaves position and direction untouched.
    fn plan(&self, id: u32, pos: Vec2, speed: f32) -> Option<Move> {
        let spec = self.grid.spec();
        let speed = speed * self.steering.speed_multiplier;
        let (x, y) = spec.world_to_cell(pos);
        let scale = if self.steering.throttle {
            self.pressure
                .pressure_at(x, y)
                .map_or(1.0, |p| self.congestion.speed_scale(p))
        } else {
            1.0
        };
        let step = (speed * self.dt * scale).min(self.steering.max_step_cells * spec.cell_size());
        if !(step > 0.0) {
            return None;
        }

        let desired = match self.flow.sample(pos) {
            Some(s) if s.direction != Vec2::ZERO => s.direction,
            Some(s) if s.distance == 0 => Vec2::ZERO,
            _ => (self.goal.center - pos).normalize_or_zero(),
        };
        if desired == Vec2::ZERO {
            return Some(Move {
                pos,
                dir: Vec2::ZERO,
                blocked: false,
            });
        }

        let mut target = pos + desired * step;
        if self.steering.pressure_push {
            target += self.pressure.push_displacement(
                self.grid,
                pos,
                id,
                desired,
                speed,
                self.dt,
                self.congestion,
            );
        }
        if self.grid.is_walkable_at(target) {
            Some(Move {
                pos: target,
                dir: desired,
                blocked: false,
            })
        } else {
            Some(Move {
                pos,
                dir: Vec2::ZERO,
                blocked: true,
            })
        }
    }
}

/// Moves every agent along the flow field.
///
/// Per agent: congestion speed scale, step `speed * dt * scale`, desired
/// direction from the flow field (straight toward the goal center when
/// off-grid or on an unreachable cell, none inside the goal), plus the
/// congestion push. A destination inside a blocked cell cancels the whole
/// move and clears the agent's direction.
#[derive(Debug)]
pub struct SteeringPass {
    config: SteeringConfig,
    pressure: PressureConfig,
    moves: Vec<Move>,
}

impl SteeringPass {
    /// Create the pass with its own steering parameters and the pressure
    /// parameters that drive throttle and push.
    pub fn new(config: SteeringConfig, pressure: PressureConfig) -> Self {
        Self {
            config,
            pressure,
            moves: Vec::new(),
        }
    }
}

impl CrowdPass for SteeringPass {
    fn name(&self) -> &str {
        "steering"
    }

    fn reads(&self) -> ResourceSet {
        [
            Resource::Walkable,
            Resource::FlowField,
            Resource::Pressure,
            Resource::Speeds,
            Resource::Positions,
        ]
        .into_iter()
        .collect()
    }

    fn writes(&self) -> ResourceSet {
        [Resource::Positions, Resource::Directions]
            .into_iter()
            .collect()
    }

    fn step(&mut self, ctx: &mut PassContext<'_>) -> Result<(), PassError> {
        let Some(flow) = ctx.flow() else {
            ctx.diagnostics().warn_once(Warning::FlowFieldPending);
            return Ok(());
        };
        if !ctx.pressure().is_built() {
            ctx.diagnostics().warn_once(Warning::PressurePending);
        }

        let steering = self.config.sanitized();
        let congestion = self.pressure.sanitized();
        let n = ctx.positions().len();
        self.moves.resize(n, Move::default());
        {
            let inputs = Inputs {
                grid: ctx.grid(),
                flow,
                pressure: ctx.pressure(),
                goal: ctx.goal(),
                steering: &steering,
                congestion: &congestion,
                dt: ctx.dt(),
            };
            let positions = ctx.positions();
            let directions = ctx.directions();
            let speeds = ctx.speeds();
            let active = ctx.active();
            let keep = |i: usize| Move {
                pos: positions[i],
                dir: directions[i],
                blocked: false,
            };
            ctx.pool().fill(&mut self.moves, |i| {
                if !active[i] {
                    return keep(i);
                }
                inputs
                    .plan(i as u32, positions[i], speeds[i])
                    .unwrap_or_else(|| keep(i))
            });
        }

        let (agents, _) = ctx.agents_mut();
        let mut blocked = 0;
        for (i, m) in self.moves.iter().enumerate() {
            agents.positions[i] = m.pos;
            agents.directions[i] = m.dir;
            blocked += u64::from(m.blocked);
        }
        ctx.counters().blocked_moves += blocked;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horde_field::build_flow_field;
    use horde_space::GridSpec;

    fn open(w: u32, h: u32) -> WalkableGrid {
        WalkableGrid::open(GridSpec::new(w, h, 1.0, Vec2::ZERO).unwrap())
    }

    fn plan_with(
        grid: &WalkableGrid,
        goal: GoalRegion,
        steering: &SteeringConfig,
        pos: Vec2,
        speed: f32,
    ) -> Option<Move> {
        let flow = build_flow_field(grid, &goal).unwrap();
        let pressure = PressureField::new(*grid.spec());
        let congestion = PressureConfig::default();
        let inputs = Inputs {
            grid,
            flow: &flow,
            pressure: &pressure,
            goal,
            steering,
            congestion: &congestion,
            dt: 0.1,
        };
        inputs.plan(0, pos, speed)
    }

    #[test]
    fn moves_along_flow_by_speed_times_dt() {
        let g = open(10, 3);
        let goal = GoalRegion::new(Vec2::new(9.5, 1.5), 0.5);
        let m = plan_with(&g, goal, &SteeringConfig::default(), Vec2::new(1.5, 1.5), 2.0).unwrap();
        assert!((m.pos - Vec2::new(1.7, 1.5)).length() < 1e-5);
        assert_eq!(m.dir, Vec2::X);
        assert!(!m.blocked);
    }

    #[test]
    fn zero_speed_skips_entirely() {
        let g = open(4, 4);
        let goal = GoalRegion::new(Vec2::splat(3.5), 0.5);
        assert!(plan_with(&g, goal, &SteeringConfig::default(), Vec2::splat(0.5), 0.0).is_none());
    }

    #[test]
    fn inside_goal_stops() {
        let g = open(4, 4);
        let goal = GoalRegion::new(Vec2::splat(3.5), 0.5);
        let m = plan_with(&g, goal, &SteeringConfig::default(), Vec2::splat(3.4), 1.0).unwrap();
        assert_eq!(m.pos, Vec2::splat(3.4));
        assert_eq!(m.dir, Vec2::ZERO);
    }

    #[test]
    fn off_grid_heads_for_goal_center() {
        let g = open(4, 4);
        let goal = GoalRegion::new(Vec2::new(2.0, 2.0), 0.5);
        let m = plan_with(&g, goal, &SteeringConfig::default(), Vec2::new(-3.0, 2.0), 1.0).unwrap();
        assert_eq!(m.dir, Vec2::X);
        assert!(m.pos.x > -3.0);
    }

    #[test]
    fn blocked_destination_cancels_move() {
        let mut g = open(4, 1);
        g.set_walkable(2, 0, false);
        // Goal beyond the wall: the cell left of it is unreachable, so the
        // agent heads straight for the center and would step into the wall.
        let goal = GoalRegion::new(Vec2::new(3.5, 0.5), 0.4);
        let cfg = SteeringConfig::default();
        let m = plan_with(&g, goal, &cfg, Vec2::new(1.95, 0.5), 1.0).unwrap();
        assert!(m.blocked);
        assert_eq!(m.pos, Vec2::new(1.95, 0.5));
        assert_eq!(m.dir, Vec2::ZERO);
    }

    #[test]
    fn step_is_capped_below_one_cell() {
        let g = open(10, 1);
        let goal = GoalRegion::new(Vec2::new(9.5, 0.5), 0.4);
        let m = plan_with(&g, goal, &SteeringConfig::default(), Vec2::new(0.5, 0.5), 100.0).unwrap();
        assert!((m.pos.x - 1.4).abs() < 1e-5);
    }

    #[test]
    fn sanitized_replaces_nonsense() {
        let cfg = SteeringConfig {
            speed_multiplier: f32::NAN,
            max_step_cells: 7.0,
            ..SteeringConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.speed_multiplier, 1.0);
        assert_eq!(cfg.max_step_cells, 1.0);
    }
}
