//! Horde Quickstart: a walled room, a crowd, and a goal.
//!
//! Demonstrates:
//!   1. Building a walkable grid with walls and a doorway
//!   2. Loading a partial configuration from TOML
//!   3. Spawning a crowd and stepping the world
//!   4. Reading per-tick metrics and field snapshots
//!   5. Editing the grid mid-run
//!
//! Run with:
//!   RUST_LOG=horde=debug cargo run --example quickstart

use glam::Vec2;
use horde_engine::{CrowdConfig, CrowdWorld};
use horde_space::{GridSpec, WalkableGrid};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ─── Map ────────────────────────────────────────────────────────

const WIDTH: u32 = 32;
const HEIGHT: u32 = 20;
const WALL_X: i32 = 16;
const DOOR_Y: std::ops::Range<i32> = 8..12;

const CONFIG: &str = r#"
[schedule]
dt = 0.05
pressure_rebuild_every = 3

[goal]
center = [28.0, 10.0]
radius = 2.5

[hard_separation]
min_distance = 0.45
"#;

fn build_grid() -> Result<WalkableGrid, Box<dyn std::error::Error>> {
    let spec = GridSpec::new(WIDTH, HEIGHT, 1.0, Vec2::ZERO)?;
    let mut grid = WalkableGrid::open(spec);
    let (w, h) = (WIDTH as i32, HEIGHT as i32);
    for x in 0..w {
        grid.set_walkable(x, 0, false);
        grid.set_walkable(x, h - 1, false);
    }
    for y in 0..h {
        grid.set_walkable(0, y, false);
        grid.set_walkable(w - 1, y, false);
        if !DOOR_Y.contains(&y) {
            grid.set_walkable(WALL_X, y, false);
        }
    }
    Ok(grid)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = CrowdConfig::from_toml_str(CONFIG)?;
    let mut world = CrowdWorld::new(build_grid()?, config)?;

    // A block of agents in the left half.
    for row in 0..12 {
        for col in 0..16 {
            let pos = Vec2::new(2.0 + col as f32 * 0.8, 3.0 + row as f32 * 1.1);
            world.spawn(pos, 1.2 + 0.1 * (col % 4) as f32);
        }
    }
    info!(agents = world.agents().active_count(), "crowd spawned");

    for tick in 0..400 {
        if tick == 200 {
            // Close the doorway's top half.
            for y in DOOR_Y.start..DOOR_Y.start + 2 {
                world.set_walkable(WALL_X, y, false);
            }
            info!("doorway narrowed");
        }
        let m = world.step()?;
        if tick % 50 == 0 {
            let goal = world.goal();
            let arrived = world
                .positions()
                .iter()
                .zip(world.agents().active())
                .filter(|(p, &live)| live && p.distance(goal.center) <= goal.radius + 1.0)
                .count();
            info!(
                tick,
                total_us = m.total_us,
                overlaps = m.overlap_hits,
                jams = m.jam_hits,
                blocked = m.blocked_moves,
                pressure_rebuilt = m.pressure_rebuilt,
                arrived,
                "progress"
            );
        }
    }

    if let Some(flow) = world.flow_field() {
        info!(
            version = %flow.version(),
            reachable = flow.reachable_count(),
            "final flow field"
        );
    }
    let densest = world.pressure().density().iter().copied().max().unwrap_or(0);
    info!(densest_cell = densest, "done");
    Ok(())
}
