//! Test fixtures for Horde development.
//!
//! Grid builders for the standard scenarios (open field, walled room,
//! sealed cell, corridor with a pillar, ASCII maps), seeded agent scatter,
//! and a few [`CrowdPass`](horde_crowd::CrowdPass) implementations for
//! schedule and engine tests (see [`fixtures`]).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use glam::Vec2;
use horde_core::{AgentId, AgentStore};
use horde_space::{GridSpec, WalkableGrid};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Unit-cell geometry with the origin at zero.
pub fn unit_spec(width: u32, height: u32) -> GridSpec {
    GridSpec::new(width, height, 1.0, Vec2::ZERO).expect("fixture grid dimensions are non-zero")
}

/// Every cell walkable.
pub fn open_grid(width: u32, height: u32) -> WalkableGrid {
    WalkableGrid::open(unit_spec(width, height))
}

/// Open interior surrounded by a one-cell blocked border.
pub fn bordered_room(width: u32, height: u32) -> WalkableGrid {
    let mut grid = open_grid(width, height);
    let (w, h) = (width as i32, height as i32);
    for x in 0..w {
        grid.set_walkable(x, 0, false);
        grid.set_walkable(x, h - 1, false);
    }
    for y in 0..h {
        grid.set_walkable(0, y, false);
        grid.set_walkable(w - 1, y, false);
    }
    grid
}

/// Open grid where the single walkable cell `(cx, cy)` is sealed off by a
/// blocked ring of its eight neighbours.
pub fn enclosed_cell(width: u32, height: u32, cx: i32, cy: i32) -> WalkableGrid {
    let mut grid = open_grid(width, height);
    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx != 0 || dy != 0 {
                grid.set_walkable(cx + dx, cy + dy, false);
            }
        }
    }
    grid
}

/// Horizontal corridor three cells tall with a one-cell pillar in the
/// middle row at `x = width / 2`.
pub fn corridor_with_pillar(width: u32) -> WalkableGrid {
    let mut grid = bordered_room(width, 5);
    grid.set_walkable(width as i32 / 2, 2, false);
    grid
}

/// Build a grid from rows of text: `#` is blocked, anything else walkable.
/// Row 0 is `y = 0`.
pub fn grid_from_ascii(rows: &[&str]) -> WalkableGrid {
    let height = rows.len() as u32;
    let width = rows.first().map_or(0, |r| r.chars().count()) as u32;
    let cells: Vec<bool> = rows
        .iter()
        .flat_map(|r| r.chars().map(|c| c != '#'))
        .collect();
    WalkableGrid::new(unit_spec(width, height), cells).expect("ascii rows must be equal length")
}

/// `n` positions uniformly scattered over walkable cells of `grid`,
/// reproducible from `seed`.
pub fn scatter(grid: &WalkableGrid, n: usize, seed: u64) -> Vec<Vec2> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let spec = grid.spec();
    let open: Vec<usize> = (0..spec.cell_count())
        .filter(|&i| grid.is_walkable_index(i))
        .collect();
    assert!(!open.is_empty(), "scatter needs at least one walkable cell");
    (0..n)
        .map(|_| {
            let (x, y) = spec.coords(open[rng.gen_range(0..open.len())]);
            let offset = Vec2::new(rng.gen_range(0.05..0.95), rng.gen_range(0.05..0.95));
            spec.cell_min(x, y) + offset * spec.cell_size()
        })
        .collect()
}

/// Spawn one agent per position, all at `speed`.
pub fn spawn_all(store: &mut AgentStore, positions: &[Vec2], speed: f32) -> Vec<AgentId> {
    positions
        .iter()
        .map(|&p| store.spawn(p, speed).expect("fixture positions are finite"))
        .collect()
}
