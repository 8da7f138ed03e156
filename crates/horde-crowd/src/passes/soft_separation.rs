//! Bounded pairwise overlap relief.

use std::ops::ControlFlow;

use glam::Vec2;
use horde_core::{PassError, Resource, ResourceSet};
use horde_space::spatial_hash::MIN_CELL_SIZE;
use horde_space::SpatialHash;
use serde::Deserialize;

use super::separation_normal;
use crate::context::PassContext;
use crate::pass::CrowdPass;

/// Soft separation parameters.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SoftSeparationConfig {
    /// Desired minimum spacing between agents. Default: 0.5.
    pub min_distance: f32,
    /// Neighbours farther than this are ignored even when closer than
    /// `min_distance`. Default: 0.75.
    pub influence_radius: f32,
    /// Fraction of the summed correction applied, in `[0, 1]`. Default: 0.5.
    pub strength: f32,
    /// Largest total displacement per tick. Default: 0.1.
    pub max_push: f32,
    /// Relaxation iterations, clamped to `[1, 2]`. Default: 1.
    pub iterations: u32,
    /// Neighbours examined per agent before the rest are skipped.
    /// Default: 16.
    pub max_neighbors: u32,
}

impl Default for SoftSeparationConfig {
    fn default() -> Self {
        Self {
            min_distance: 0.5,
            influence_radius: 0.75,
            strength: 0.5,
            max_push: 0.1,
            iterations: 1,
            max_neighbors: 16,
        }
    }
}

impl SoftSeparationConfig {
    /// Copy with values clamped into range; non-finite values take the
    /// default.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let pick = |v: f32, def: f32| if v.is_finite() { v } else { def };
        Self {
            min_distance: pick(self.min_distance, d.min_distance).max(MIN_CELL_SIZE),
            influence_radius: pick(self.influence_radius, d.influence_radius).max(MIN_CELL_SIZE),
            strength: pick(self.strength, d.strength).clamp(0.0, 1.0),
            max_push: pick(self.max_push, d.max_push).max(0.0),
            iterations: self.iterations.clamp(1, 2),
            max_neighbors: self.max_neighbors.max(1),
        }
    }

    /// Distance below which a neighbour contributes.
    pub fn cutoff(&self) -> f32 {
        self.min_distance.min(self.influence_radius)
    }
}

/// Pushes agents closer than `min_distance` apart.
///
/// Each iteration re-hashes current positions and computes every agent's
/// correction `strength * Σ (min_distance - d) * n` from the same snapshot
/// before applying any of them. The total displacement an agent receives
/// over all iterations is capped at `max_push`.
#[derive(Debug)]
pub struct SoftSeparationPass {
    config: SoftSeparationConfig,
    hash: SpatialHash,
    start: Vec<Vec2>,
    corrections: Vec<Vec2>,
}

impl SoftSeparationPass {
    /// Create the pass.
    pub fn new(config: SoftSeparationConfig) -> Self {
        let cell = config.sanitized().cutoff();
        Self {
            config,
            hash: SpatialHash::new(cell),
            start: Vec::new(),
            corrections: Vec::new(),
        }
    }

    /// Separation parameters.
    pub fn config(&self) -> &SoftSeparationConfig {
        &self.config
    }
}

impl CrowdPass for SoftSeparationPass {
    fn name(&self) -> &str {
        "soft_separation"
    }

    fn reads(&self) -> ResourceSet {
        [Resource::Positions].into_iter().collect()
    }

    fn writes(&self) -> ResourceSet {
        [Resource::Positions].into_iter().collect()
    }

    fn step(&mut self, ctx: &mut PassContext<'_>) -> Result<(), PassError> {
        let cfg = self.config.sanitized();
        let cutoff = cfg.cutoff();
        let Self {
            hash,
            start,
            corrections,
            ..
        } = self;
        hash.set_cell_size(cutoff);

        let (agents, pool) = ctx.agents_mut();
        let n = agents.positions.len();
        start.clear();
        start.extend_from_slice(agents.positions);
        corrections.resize(n, Vec2::ZERO);

        for iteration in 0..cfg.iterations {
            let positions: &[Vec2] = &*agents.positions;
            let active = agents.active;
            pool.install(|| hash.rebuild(positions, active));
            let table: &SpatialHash = &*hash;
            pool.fill(corrections, |i| {
                if !active[i] {
                    return Vec2::ZERO;
                }
                let me = positions[i];
                let mut sum = Vec2::ZERO;
                let mut examined = 0;
                table.for_each_neighbour(me, |j| {
                    if j as usize == i {
                        return ControlFlow::Continue(());
                    }
                    examined += 1;
                    let delta = me - positions[j as usize];
                    let d = delta.length();
                    if d < cutoff {
                        let n = separation_normal(delta, d, i as u32, j, iteration);
                        sum += n * (cfg.min_distance - d);
                    }
                    if examined >= cfg.max_neighbors {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                });
                (sum * cfg.strength).clamp_length_max(cfg.max_push)
            });

            for (i, c) in corrections.iter().enumerate() {
                if *c == Vec2::ZERO {
                    continue;
                }
                let moved = agents.positions[i] + *c - start[i];
                agents.positions[i] = start[i] + moved.clamp_length_max(cfg.max_push);
            }
        }
        Ok(())
    }
}
