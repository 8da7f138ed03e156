//! Deterministic integer hashing.
//!
//! Cell bucketing and per-agent jitter both need a cheap hash that is
//! identical across runs and platforms. Integer coordinates are combined
//! with large odd multipliers and XOR, then finalised with the 32-bit
//! MurmurHash3 mixer so that neighbouring inputs land far apart.

use glam::Vec2;
use std::f32::consts::TAU;

/// Odd multiplier applied to the x coordinate.
pub const HASH_PRIME_X: u32 = 73_856_093;
/// Odd multiplier applied to the y coordinate.
pub const HASH_PRIME_Y: u32 = 19_349_663;
/// Odd multiplier applied to a third key (agent id, iteration, salt).
pub const HASH_PRIME_Z: u32 = 83_492_791;

/// Hash an integer cell coordinate.
#[inline]
pub fn hash_cell(x: i32, y: i32) -> u32 {
    fmix32((x as u32).wrapping_mul(HASH_PRIME_X) ^ (y as u32).wrapping_mul(HASH_PRIME_Y))
}

/// Hash three integer keys into one well-mixed word.
#[inline]
pub fn mix3(a: u32, b: u32, c: u32) -> u32 {
    fmix32(
        a.wrapping_mul(HASH_PRIME_X) ^ b.wrapping_mul(HASH_PRIME_Y) ^ c.wrapping_mul(HASH_PRIME_Z),
    )
}

/// Unit vector whose angle is derived from three integer keys.
///
/// Same keys always give the same vector.
#[inline]
pub fn hashed_unit(a: u32, b: u32, c: u32) -> Vec2 {
    let h = mix3(a, b, c);
    let angle = (h >> 8) as f32 / (1u32 << 24) as f32 * TAU;
    Vec2::from_angle(angle)
}

/// MurmurHash3 32-bit finaliser.
#[inline]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}
