//! The five crowd passes, in tick order.

pub mod hard_separation;
pub mod pressure_update;
pub mod soft_separation;
pub mod steering;
pub mod wall_repulsion;

pub use hard_separation::{HardSeparationConfig, HardSeparationPass};
pub use pressure_update::PressureUpdatePass;
pub use soft_separation::{SoftSeparationConfig, SoftSeparationPass};
pub use steering::{SteeringConfig, SteeringPass};
pub use wall_repulsion::{WallConfig, WallRepulsionPass};

use glam::Vec2;
use horde_core::hash::hashed_unit;

/// Pairs closer than this are treated as coincident.
pub(crate) const COINCIDENT: f32 = 1e-6;

/// Separation normal for agent `me` against a coincident `other`.
///
/// Derived from the sorted id pair and `salt` (the iteration index), so the
/// two agents always get exactly opposite unit vectors and the same overlap
/// resolves the same way on every run.
pub(crate) fn coincident_normal(me: u32, other: u32, salt: u32) -> Vec2 {
    let (lo, hi) = if me < other { (me, other) } else { (other, me) };
    let n = hashed_unit(lo, hi, salt);
    if me == lo {
        -n
    } else {
        n
    }
}

/// Unit vector pushing `me` away from `other`.
#[inline]
pub(crate) fn separation_normal(delta: Vec2, dist: f32, me: u32, other: u32, salt: u32) -> Vec2 {
    if dist > COINCIDENT {
        delta / dist
    } else {
        coincident_normal(me, other, salt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coincident_normals_are_opposite_and_stable() {
        let a = coincident_normal(3, 9, 0);
        let b = coincident_normal(9, 3, 0);
        assert!((a + b).length() < 1e-6);
        assert!((a.length() - 1.0).abs() < 1e-5);
        assert_eq!(a, coincident_normal(3, 9, 0));
        assert_ne!(a, coincident_normal(3, 9, 1));
    }

    #[test]
    fn separated_pairs_use_geometry() {
        let n = separation_normal(Vec2::new(0.0, 2.0), 2.0, 0, 1, 0);
        assert_eq!(n, Vec2::Y);
    }
}
