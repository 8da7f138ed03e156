//! Quantized direction lookup table.

use std::f32::consts::TAU;
use std::sync::OnceLock;

use glam::Vec2;

/// Number of quantized directions.
pub const DIRECTION_COUNT: usize = 32;

/// Direction index meaning "no direction".
pub const DIR_NONE: u8 = u8::MAX;

/// Components smaller than this are snapped to zero so the axial entries
/// are exact.
const SNAP_EPSILON: f32 = 1e-6;

/// `DIRECTION_COUNT` unit vectors at angles `k * 2π / DIRECTION_COUNT`.
///
/// Index 0 points along +x and indices increase counter-clockwise (toward
/// +y). Every multiple of 4 is an axis or exact diagonal.
#[derive(Clone, Debug)]
pub struct DirectionTable {
    dirs: [Vec2; DIRECTION_COUNT],
}

impl DirectionTable {
    /// Build the table.
    pub fn new() -> Self {
        let mut dirs = [Vec2::ZERO; DIRECTION_COUNT];
        for (k, d) in dirs.iter_mut().enumerate() {
            let v = Vec2::from_angle(k as f32 * TAU / DIRECTION_COUNT as f32);
            *d = Vec2::new(snap(v.x), snap(v.y));
        }
        Self { dirs }
    }

    /// Process-wide shared table.
    pub fn shared() -> &'static DirectionTable {
        static TABLE: OnceLock<DirectionTable> = OnceLock::new();
        TABLE.get_or_init(DirectionTable::new)
    }

    /// Unit vector for `index`; [`DIR_NONE`] and out-of-range indices give
    /// [`Vec2::ZERO`].
    #[inline]
    pub fn get(&self, index: u8) -> Vec2 {
        self.dirs.get(index as usize).copied().unwrap_or(Vec2::ZERO)
    }

    /// Index of the table entry with the largest dot product against `v`.
    ///
    /// Zero-length or non-finite input gives [`DIR_NONE`]. Ties resolve to
    /// the lowest index.
    pub fn quantize(&self, v: Vec2) -> u8 {
        if !v.is_finite() || v.length_squared() <= f32::EPSILON * f32::EPSILON {
            return DIR_NONE;
        }
        let mut best = 0usize;
        let mut best_dot = f32::NEG_INFINITY;
        for (k, d) in self.dirs.iter().enumerate() {
            let dot = d.dot(v);
            if dot > best_dot {
                best_dot = dot;
                best = k;
            }
        }
        best as u8
    }

    /// Grid step `(dx, dy)` a direction points at, by rounding each
    /// component. `None` for [`DIR_NONE`].
    #[inline]
    pub fn step(&self, index: u8) -> Option<(i32, i32)> {
        let d = self.dirs.get(index as usize)?;
        Some((d.x.round() as i32, d.y.round() as i32))
    }
}

impl Default for DirectionTable {
    fn default() -> Self {
        Self::new()
    }
}

fn snap(c: f32) -> f32 {
    if c.abs() < SNAP_EPSILON {
        0.0
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_unit_length() {
        let t = DirectionTable::new();
        for k in 0..DIRECTION_COUNT as u8 {
            assert!((t.get(k).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn axis_entries_are_exact() {
        let t = DirectionTable::new();
        assert_eq!(t.get(0), Vec2::new(1.0, 0.0));
        assert_eq!(t.get(8), Vec2::new(0.0, 1.0));
        assert_eq!(t.get(16), Vec2::new(-1.0, 0.0));
        assert_eq!(t.get(24), Vec2::new(0.0, -1.0));
    }

    #[test]
    fn quantize_axes_and_diagonals() {
        let t = DirectionTable::new();
        assert_eq!(t.quantize(Vec2::X), 0);
        assert_eq!(t.quantize(Vec2::Y), 8);
        assert_eq!(t.quantize(Vec2::new(1.0, 1.0)), 4);
        assert_eq!(t.quantize(Vec2::new(-3.0, -3.0)), 20);
        assert_eq!(t.step(4), Some((1, 1)));
        assert_eq!(t.step(20), Some((-1, -1)));
    }

    #[test]
    fn quantize_degenerate_is_none() {
        let t = DirectionTable::new();
        assert_eq!(t.quantize(Vec2::ZERO), DIR_NONE);
        assert_eq!(t.quantize(Vec2::new(f32::NAN, 1.0)), DIR_NONE);
        assert_eq!(t.get(DIR_NONE), Vec2::ZERO);
        assert_eq!(t.step(DIR_NONE), None);
    }

    #[test]
    fn quantize_error_is_within_half_step() {
        let t = DirectionTable::new();
        let half_step = TAU / DIRECTION_COUNT as f32 / 2.0;
        for i in 0..360 {
            let v = Vec2::from_angle((i as f32).to_radians());
            let q = t.get(t.quantize(v));
            assert!(v.dot(q).clamp(-1.0, 1.0).acos() <= half_step + 1e-3);
        }
    }
}
