//! Benchmark profiles and utilities for the Horde crowd framework.
//!
//! - [`obstacle_grid`]: bordered square grid with seeded pillar clusters
//! - [`crowd_positions`]: seeded agent placement on walkable cells
//! - [`reference_profile`]: 128x128 grid, 4K agents, standard pipeline
//! - [`stress_profile`]: 384x384 grid, 40K agents

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::error::Error;

use glam::Vec2;
use horde_engine::{CrowdConfig, CrowdWorld};
use horde_field::GoalRegion;
use horde_space::{GridError, GridSpec, WalkableGrid};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Fraction of interior cells turned into pillars.
pub const OBSTACLE_DENSITY: f32 = 0.08;

/// Bordered `size x size` grid with unit cells. About `density` of the
/// interior is blocked, in 2x2 pillars placed from `seed`.
pub fn obstacle_grid(size: u32, density: f32, seed: u64) -> Result<WalkableGrid, GridError> {
    let spec = GridSpec::new(size, size, 1.0, Vec2::ZERO)?;
    let mut grid = WalkableGrid::open(spec);
    let n = size as i32;
    for i in 0..n {
        grid.set_walkable(i, 0, false);
        grid.set_walkable(i, n - 1, false);
        grid.set_walkable(0, i, false);
        grid.set_walkable(n - 1, i, false);
    }
    if n < 6 {
        return Ok(grid);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let pillars = ((n - 2) * (n - 2)) as f32 * density.clamp(0.0, 0.5) / 4.0;
    for _ in 0..pillars as usize {
        let x = rng.gen_range(2..n - 3);
        let y = rng.gen_range(2..n - 3);
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            grid.set_walkable(x + dx, y + dy, false);
        }
    }
    Ok(grid)
}

/// `n` positions on walkable cells of `grid`, reproducible from `seed`.
pub fn crowd_positions(grid: &WalkableGrid, n: usize, seed: u64) -> Vec<Vec2> {
    let spec = grid.spec();
    let open: Vec<usize> = (0..spec.cell_count())
        .filter(|&i| grid.is_walkable_index(i))
        .collect();
    if open.is_empty() {
        return Vec::new();
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let (x, y) = spec.coords(open[rng.gen_range(0..open.len())]);
            spec.cell_min(x, y) + Vec2::new(rng.gen_range(0.1..0.9), rng.gen_range(0.1..0.9))
        })
        .collect()
}

fn profile(size: u32, agents: usize, seed: u64) -> Result<CrowdWorld, Box<dyn Error>> {
    let grid = obstacle_grid(size, OBSTACLE_DENSITY, seed)?;
    let positions = crowd_positions(&grid, agents, seed ^ 0x5eed);
    let mut config = CrowdConfig::default();
    let far = (size as f32 - 4.0).max(1.0);
    config.goal = GoalRegion::new(Vec2::splat(far), 3.0);
    let mut world = CrowdWorld::new(grid, config)?;
    for p in positions {
        world.spawn(p, 1.4);
    }
    world.rebuild_fields();
    Ok(world)
}

/// 128x128 grid, 4,096 agents, standard pipeline, fields prebuilt.
pub fn reference_profile(seed: u64) -> Result<CrowdWorld, Box<dyn Error>> {
    profile(128, 4096, seed)
}

/// 384x384 grid, 40,000 agents. Same pipeline as [`reference_profile`].
pub fn stress_profile(seed: u64) -> Result<CrowdWorld, Box<dyn Error>> {
    profile(384, 40_000, seed)
}
