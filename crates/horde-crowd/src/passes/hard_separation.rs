//! Double-buffered overlap removal.

use std::ops::ControlFlow;

use glam::Vec2;
use horde_core::{PassError, Resource, ResourceSet};
use horde_space::spatial_hash::MIN_CELL_SIZE;
use horde_space::SpatialHash;
use rayon::prelude::*;
use serde::Deserialize;

use super::separation_normal;
use crate::context::PassContext;
use crate::pass::CrowdPass;

/// Hard separation parameters.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct HardSeparationConfig {
    /// Minimum centre-to-centre distance. Default: 0.5.
    pub min_distance: f32,
    /// Penetration tolerated without correction. Default: 0.01.
    pub slop: f32,
    /// Largest correction per agent per iteration. Default: 0.25.
    pub max_correction: f32,
    /// Iterations, clamped to `[1, 2]`. Default: 2.
    pub iterations: u32,
    /// Neighbours examined per agent before the rest are skipped.
    /// Default: 24.
    pub max_neighbors: u32,
    /// Reserved. Accepted and carried, no effect.
    pub jam_only: bool,
}

impl Default for HardSeparationConfig {
    fn default() -> Self {
        Self {
            min_distance: 0.5,
            slop: 0.01,
            max_correction: 0.25,
            iterations: 2,
            max_neighbors: 24,
            jam_only: false,
        }
    }
}

impl HardSeparationConfig {
    /// Copy with values clamped into range; non-finite values take the
    /// default.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let pick = |v: f32, def: f32| if v.is_finite() { v } else { def };
        let min_distance = pick(self.min_distance, d.min_distance).max(MIN_CELL_SIZE);
        Self {
            min_distance,
            slop: pick(self.slop, d.slop).clamp(0.0, min_distance * 0.5),
            max_correction: pick(self.max_correction, d.max_correction).max(0.0),
            iterations: self.iterations.clamp(1, 2),
            max_neighbors: self.max_neighbors.max(1),
            jam_only: self.jam_only,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Probe {
    overlaps: u32,
    jammed: bool,
}

/// Removes residual overlap left by soft separation.
///
/// Positions are copied into a front buffer. Each iteration hashes the
/// front buffer, computes for every agent `Σ 0.5 * penetration * n` over
/// overlapping neighbours (capped at `max_correction`), writes the advanced
/// positions into the back buffer and swaps. Each overlapping pair gets
/// half the correction on each side, so a lone pair lands exactly at
/// `min_distance` in one iteration.
///
/// A final check re-hashes the result without moving anyone. An agent is
/// jammed if it still has a neighbour closer than `min_distance - slop`,
/// or if its neighbour cap cut the check short. Every pair left closer
/// than `min_distance - slop` therefore has at least one jammed member.
#[derive(Debug)]
pub struct HardSeparationPass {
    config: HardSeparationConfig,
    hash: SpatialHash,
    front: Vec<Vec2>,
    back: Vec<Vec2>,
    probes: Vec<Probe>,
}

impl HardSeparationPass {
    /// Create the pass.
    pub fn new(config: HardSeparationConfig) -> Self {
        let cell = config.sanitized().min_distance;
        Self {
            config,
            hash: SpatialHash::new(cell),
            front: Vec::new(),
            back: Vec::new(),
            probes: Vec::new(),
        }
    }

    /// Separation parameters.
    pub fn config(&self) -> &HardSeparationConfig {
        &self.config
    }

    /// Whether slot `slot` was jammed after the last step.
    pub fn is_jammed(&self, slot: usize) -> bool {
        self.probes.get(slot).is_some_and(|p| p.jammed)
    }
}

impl CrowdPass for HardSeparationPass {
    fn name(&self) -> &str {
        "hard_separation"
    }

    fn reads(&self) -> ResourceSet {
        [Resource::Positions].into_iter().collect()
    }

    fn writes(&self) -> ResourceSet {
        [Resource::Positions].into_iter().collect()
    }

    fn step(&mut self, ctx: &mut PassContext<'_>) -> Result<(), PassError> {
        let cfg = self.config.sanitized();
        let Self {
            hash,
            front,
            back,
            probes,
            ..
        } = self;
        hash.set_cell_size(cfg.min_distance);

        let (agents, pool) = ctx.agents_mut();
        let active = agents.active;
        let n = agents.positions.len();
        front.clear();
        front.extend_from_slice(agents.positions);
        back.resize(n, Vec2::ZERO);
        probes.resize(n, Probe::default());

        let mut sampled = 0u64;
        let mut overlap_hits = 0u64;

        // The last round only checks the settled positions.
        for iteration in 0..=cfg.iterations {
            let src: &[Vec2] = &front[..];
            pool.install(|| hash.rebuild(src, active));
            let table: &SpatialHash = &*hash;
            pool.install(|| {
                back.par_iter_mut()
                    .zip(probes.par_iter_mut())
                    .enumerate()
                    .for_each(|(i, (out, probe))| {
                        *probe = Probe::default();
                        let me = src[i];
                        if !active[i] {
                            *out = me;
                            return;
                        }
                        let mut sum = Vec2::ZERO;
                        let mut examined = 0;
                        let finished = table.for_each_neighbour(me, |j| {
                            if j as usize == i {
                                return ControlFlow::Continue(());
                            }
                            examined += 1;
                            let delta = me - src[j as usize];
                            let d = delta.length();
                            let penetration = cfg.min_distance - d;
                            if penetration > cfg.slop {
                                let n = separation_normal(delta, d, i as u32, j, iteration);
                                sum += n * (0.5 * penetration);
                                probe.overlaps += 1;
                            }
                            if examined >= cfg.max_neighbors {
                                ControlFlow::Break(())
                            } else {
                                ControlFlow::Continue(())
                            }
                        });
                        probe.jammed = !finished || probe.overlaps > 0;
                        *out = me + sum.clamp_length_max(cfg.max_correction);
                    })
            });

            if iteration == cfg.iterations {
                break;
            }
            for (probe, _) in probes.iter().zip(active).filter(|(_, &live)| live) {
                sampled += 1;
                overlap_hits += u64::from(probe.overlaps);
            }
            std::mem::swap(front, back);
        }

        let jam_hits = probes
            .iter()
            .zip(active)
            .filter(|(p, &live)| live && p.jammed)
            .count() as u64;
        agents.positions.copy_from_slice(front);
        let counters = ctx.counters();
        counters.sampled += sampled;
        counters.overlap_hits += overlap_hits;
        counters.jam_hits += jam_hits;
        Ok(())
    }
}
