//! Uniform-cell spatial hash for neighbour queries.
//!
//! Positions are bucketed by `floor(pos / cell_size)`; the integer cell is
//! hashed into a power-of-two table. Entries are stored flat, sorted by
//! `(bucket, id)`, with a prefix-sum offset array per bucket, so a rebuild
//! is a parallel key computation plus one parallel sort and the query side
//! is read-only and freely shared across worker threads.
//!
//! Hash collisions are filtered by comparing the stored cell coordinate,
//! so a 3×3 query never reports an id twice and never reports an id from
//! an unrelated cell.

use std::ops::ControlFlow;

use glam::Vec2;
use horde_core::hash::hash_cell;
use rayon::prelude::*;

/// Below this many entries, rebuilds stay on the calling thread.
const PARALLEL_THRESHOLD: usize = 2048;

/// Smallest bucket table.
const MIN_TABLE: usize = 64;

/// Smallest accepted cell size.
pub const MIN_CELL_SIZE: f32 = 1e-3;

#[derive(Clone, Copy, Debug)]
struct Entry {
    bucket: u32,
    cx: i32,
    cy: i32,
    id: u32,
}

/// Flat bucketed spatial hash over agent ids.
#[derive(Clone, Debug)]
pub struct SpatialHash {
    cell_size: f32,
    inv_cell: f32,
    entries: Vec<Entry>,
    /// `starts[b]..starts[b + 1]` is bucket `b`'s range in `entries`.
    starts: Vec<u32>,
    mask: u32,
    sorted: bool,
}

impl SpatialHash {
    /// Create an empty hash. Non-finite or tiny cell sizes are floored to
    /// [`MIN_CELL_SIZE`].
    pub fn new(cell_size: f32) -> Self {
        let cell_size = sanitize_cell_size(cell_size);
        Self {
            cell_size,
            inv_cell: 1.0 / cell_size,
            entries: Vec::new(),
            starts: vec![0; MIN_TABLE + 1],
            mask: (MIN_TABLE - 1) as u32,
            sorted: true,
        }
    }

    /// Cell edge length.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Change the cell size. Clears the table.
    pub fn set_cell_size(&mut self, cell_size: f32) {
        let cell_size = sanitize_cell_size(cell_size);
        self.cell_size = cell_size;
        self.inv_cell = 1.0 / cell_size;
        self.clear();
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the hash holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry, keeping allocations.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.starts.clear();
        self.starts.resize(MIN_TABLE + 1, 0);
        self.mask = (MIN_TABLE - 1) as u32;
        self.sorted = true;
    }

    /// Integer cell containing `pos`.
    #[inline]
    pub fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        let c = pos * self.inv_cell;
        (c.x.floor() as i32, c.y.floor() as i32)
    }

    /// Insert one id. Non-finite positions are ignored.
    ///
    /// Call [`finish`](Self::finish) after a batch of inserts; queries on
    /// an unfinished table fall back to a linear scan.
    pub fn insert(&mut self, pos: Vec2, id: u32) {
        if !pos.is_finite() {
            return;
        }
        let (cx, cy) = self.cell_of(pos);
        self.entries.push(Entry {
            bucket: 0,
            cx,
            cy,
            id,
        });
        self.sorted = false;
    }

    /// Clear and re-insert every active position (id = slot index), then
    /// finish the table. Large batches compute keys and sort in parallel.
    pub fn rebuild(&mut self, positions: &[Vec2], active: &[bool]) {
        self.entries.clear();
        let inv = self.inv_cell;
        let key = |(i, (p, live)): (usize, (&Vec2, &bool))| {
            (*live && p.is_finite()).then(|| {
                let c = *p * inv;
                Entry {
                    bucket: 0,
                    cx: c.x.floor() as i32,
                    cy: c.y.floor() as i32,
                    id: i as u32,
                }
            })
        };
        if positions.len() >= PARALLEL_THRESHOLD {
            self.entries.par_extend(
                positions
                    .par_iter()
                    .zip(active.par_iter())
                    .enumerate()
                    .filter_map(key),
            );
        } else {
            self.entries.extend(
                positions
                    .iter()
                    .zip(active.iter())
                    .enumerate()
                    .filter_map(key),
            );
        }
        self.sorted = false;
        self.finish();
    }

    /// Size the bucket table, sort entries by `(bucket, id)` and build the
    /// per-bucket offsets.
    pub fn finish(&mut self) {
        if self.sorted {
            return;
        }
        let table = (self.entries.len() * 2).next_power_of_two().max(MIN_TABLE);
        self.mask = (table - 1) as u32;
        let mask = self.mask;
        let assign = |e: &mut Entry| e.bucket = hash_cell(e.cx, e.cy) & mask;
        if self.entries.len() >= PARALLEL_THRESHOLD {
            self.entries.par_iter_mut().for_each(assign);
            self.entries.par_sort_unstable_by_key(|e| (e.bucket, e.id));
        } else {
            self.entries.iter_mut().for_each(assign);
            self.entries.sort_unstable_by_key(|e| (e.bucket, e.id));
        }

        self.starts.clear();
        self.starts.resize(table + 1, 0);
        for e in &self.entries {
            self.starts[e.bucket as usize + 1] += 1;
        }
        for b in 0..table {
            self.starts[b + 1] += self.starts[b];
        }
        self.sorted = true;
    }

    /// Visit every id stored in the 3×3 block of cells around `pos`.
    ///
    /// Cells are visited row by row and ids in ascending order within a
    /// cell, so iteration order is deterministic. Returns `false` if the
    /// callback broke out early.
    pub fn for_each_neighbour<F>(&self, pos: Vec2, mut f: F) -> bool
    where
        F: FnMut(u32) -> ControlFlow<()>,
    {
        if !pos.is_finite() {
            return true;
        }
        let (cx, cy) = self.cell_of(pos);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (Some(x), Some(y)) = (cx.checked_add(dx), cy.checked_add(dy)) else {
                    continue;
                };
                if self.visit_cell(x, y, &mut f).is_break() {
                    return false;
                }
            }
        }
        true
    }

    /// Collect the 3×3 neighbourhood of `pos` into a vector.
    pub fn query(&self, pos: Vec2) -> Vec<u32> {
        let mut out = Vec::new();
        self.for_each_neighbour(pos, |id| {
            out.push(id);
            ControlFlow::Continue(())
        });
        out
    }

    fn visit_cell<F>(&self, x: i32, y: i32, f: &mut F) -> ControlFlow<()>
    where
        F: FnMut(u32) -> ControlFlow<()>,
    {
        if !self.sorted {
            for e in self.entries.iter().filter(|e| e.cx == x && e.cy == y) {
                f(e.id)?;
            }
            return ControlFlow::Continue(());
        }
        let b = (hash_cell(x, y) & self.mask) as usize;
        let (lo, hi) = (self.starts[b] as usize, self.starts[b + 1] as usize);
        for e in &self.entries[lo..hi] {
            if e.cx == x && e.cy == y {
                f(e.id)?;
            }
        }
        ControlFlow::Continue(())
    }
}

fn sanitize_cell_size(cell_size: f32) -> f32 {
    if cell_size.is_finite() {
        cell_size.max(MIN_CELL_SIZE)
    } else {
        1.0
    }
}
