//! Congestion (pressure) field.
//!
//! Each rebuild counts agents per cell from scratch, converts the count to
//! pressure `max(0, density - target)`, then runs up to two 3×3 box-blur
//! passes. Two buffers alternate as blur source and destination; whichever
//! holds the final pass becomes the published buffer, and it stays in use
//! until the next rebuild.
//!
//! Blocked cells always report [`BLOCKED_PRESSURE`], and so do walkable
//! cells the flow field marks unreachable: nobody should be steered into a
//! pocket the goal cannot be reached from. During blurring, out-of-bounds
//! and closed neighbours contribute the same constant, so walls and map
//! edges repel like a permanently packed cell.

use glam::Vec2;
use horde_core::hash::{hash_cell, hashed_unit, mix3};
use horde_core::GridVersion;
use horde_space::offsets::{cuts_corner, OFFSETS_8};
use horde_space::{GridSpec, WalkableGrid};
use serde::Deserialize;

use crate::error::FieldError;
use crate::nav::{NavField, UNREACHABLE};

/// Pressure reported by (and contributed from) blocked or missing cells.
pub const BLOCKED_PRESSURE: f32 = 4.0;

/// Largest number of diffusion passes.
pub const MAX_DIFFUSION_PASSES: u32 = 2;

const JITTER_SALT: u32 = 0x9e37_79b9;
const FALLBACK_SALT: u32 = 0x7f4a_7c15;
const LATERAL_SALT: u32 = 0x94d0_49bb;

// ── PressureConfig ─────────────────────────────────────────────────

/// Density, diffusion, steering-bias and throttle parameters.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PressureConfig {
    /// Agents per cell tolerated before pressure rises. Default: 2.0.
    pub target_density: f32,
    /// Box-blur passes per rebuild, clamped to `[0, 2]`. Default: 1.
    pub diffusion_passes: u32,
    /// Gradient magnitude below which the gradient is ignored. Default: 0.05.
    pub gradient_epsilon: f32,
    /// Pressure below which no push is applied. Default: 0.01.
    pub push_threshold: f32,
    /// Push distance per unit of pressure. Default: 0.05.
    pub push_strength: f32,
    /// Absolute cap on push distance per tick. Default: 0.1.
    pub push_cap: f32,
    /// Cap on push distance as a fraction of `speed * dt`, in `[0, 1]`.
    /// Default: 0.5.
    pub push_speed_fraction: f32,
    /// Weight of the outward push from the cell center. Default: 0.25.
    pub radial_bias: f32,
    /// Weight of the per-agent hashed jitter. Default: 0.1.
    pub jitter: f32,
    /// How far (as a cosine) a push may point against the flow before its
    /// backward part is removed. Default: 0.1.
    pub backward_margin: f32,
    /// Pressure above which speed is throttled. Default: 1.5.
    pub throttle_threshold: f32,
    /// Throttle steepness `k`. Default: 0.5.
    pub throttle_k: f32,
    /// Lower clamp on the speed scale. Default: 0.2.
    pub throttle_min: f32,
    /// Upper clamp on the speed scale. Default: 1.0.
    pub throttle_max: f32,
    /// Reserved. Accepted and carried, no effect.
    pub backpressure_gain: f32,
    /// Reserved. Accepted and carried, no effect.
    pub backpressure_window: u32,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            target_density: 2.0,
            diffusion_passes: 1,
            gradient_epsilon: 0.05,
            push_threshold: 0.01,
            push_strength: 0.05,
            push_cap: 0.1,
            push_speed_fraction: 0.5,
            radial_bias: 0.25,
            jitter: 0.1,
            backward_margin: 0.1,
            throttle_threshold: 1.5,
            throttle_k: 0.5,
            throttle_min: 0.2,
            throttle_max: 1.0,
            backpressure_gain: 0.0,
            backpressure_window: 0,
        }
    }
}

impl PressureConfig {
    /// Copy with every value clamped into its valid range. Non-finite
    /// values take the default.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let throttle_min = finite_or(self.throttle_min, d.throttle_min).clamp(0.0, 1.0);
        let throttle_max = finite_or(self.throttle_max, d.throttle_max)
            .clamp(0.0, 1.0)
            .max(throttle_min);
        Self {
            target_density: finite_or(self.target_density, d.target_density).max(0.0),
            diffusion_passes: self.diffusion_passes.min(MAX_DIFFUSION_PASSES),
            gradient_epsilon: finite_or(self.gradient_epsilon, d.gradient_epsilon).max(0.0),
            push_threshold: finite_or(self.push_threshold, d.push_threshold).max(0.0),
            push_strength: finite_or(self.push_strength, d.push_strength).max(0.0),
            push_cap: finite_or(self.push_cap, d.push_cap).max(0.0),
            push_speed_fraction: finite_or(self.push_speed_fraction, d.push_speed_fraction)
                .clamp(0.0, 1.0),
            radial_bias: finite_or(self.radial_bias, d.radial_bias).max(0.0),
            jitter: finite_or(self.jitter, d.jitter).max(0.0),
            backward_margin: finite_or(self.backward_margin, d.backward_margin).clamp(0.0, 1.0),
            throttle_threshold: finite_or(self.throttle_threshold, d.throttle_threshold)
                .max(0.0),
            throttle_k: finite_or(self.throttle_k, d.throttle_k).max(0.0),
            throttle_min,
            throttle_max,
            backpressure_gain: self.backpressure_gain,
            backpressure_window: self.backpressure_window,
        }
    }

    /// Congestion speed scale:
    /// `clamp(1 / (1 + k * max(0, p - threshold)), min, max)`.
    #[inline]
    pub fn speed_scale(&self, pressure: f32) -> f32 {
        if !pressure.is_finite() {
            return self.throttle_min;
        }
        let excess = (pressure - self.throttle_threshold).max(0.0);
        (1.0 / (1.0 + self.throttle_k * excess)).clamp(self.throttle_min, self.throttle_max)
    }
}

pub(crate) fn finite_or(v: f32, default: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        default
    }
}

// ── PressureField ──────────────────────────────────────────────────

/// Per-cell density counts and double-buffered pressure.
#[derive(Clone, Debug)]
pub struct PressureField {
    spec: GridSpec,
    density: Vec<u32>,
    open: Vec<bool>,
    buffers: [Vec<f32>; 2],
    front: usize,
    built: bool,
    version: GridVersion,
    rebuilds: u64,
}

impl PressureField {
    /// An unbuilt field over `spec`.
    pub fn new(spec: GridSpec) -> Self {
        let n = spec.cell_count();
        Self {
            spec,
            density: vec![0; n],
            open: vec![true; n],
            buffers: [vec![0.0; n], vec![0.0; n]],
            front: 0,
            built: false,
            version: GridVersion::default(),
            rebuilds: 0,
        }
    }

    /// Geometry of the current buffers.
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Whether at least one rebuild has completed for the current geometry.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Version of the walkable grid the published buffer was built from.
    pub fn version(&self) -> GridVersion {
        self.version
    }

    /// Whether the published buffer was built from `grid` as it is now:
    /// same geometry, same walkable version.
    pub fn is_current(&self, grid: &WalkableGrid) -> bool {
        self.built && self.spec == *grid.spec() && self.version == grid.version()
    }

    /// Completed rebuilds.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Published pressure buffer, row-major.
    pub fn values(&self) -> &[f32] {
        &self.buffers[self.front]
    }

    /// Agent counts from the last rebuild, row-major.
    pub fn density(&self) -> &[u32] {
        &self.density
    }

    /// Recount agents and recompute pressure.
    ///
    /// `flow`, when given and built over the same geometry, closes walkable
    /// cells it cannot reach. A grid with different geometry reallocates the
    /// buffers first.
    pub fn rebuild(
        &mut self,
        grid: &WalkableGrid,
        flow: Option<&NavField>,
        positions: &[Vec2],
        active: &[bool],
        config: &PressureConfig,
    ) -> Result<(), FieldError> {
        if positions.len() != active.len() {
            return Err(FieldError::LengthMismatch {
                expected: positions.len(),
                actual: active.len(),
            });
        }
        if *grid.spec() != self.spec {
            *self = Self::new(*grid.spec());
        }

        let flow = flow.filter(|f| f.spec() == grid.spec());
        for (i, open) in self.open.iter_mut().enumerate() {
            let reachable = flow.map_or(true, |f| f.distances()[i] != UNREACHABLE);
            *open = grid.is_walkable_index(i) && reachable;
        }

        self.density.fill(0);
        for (p, _) in positions.iter().zip(active).filter(|(_, &live)| live) {
            if let Some(i) = self.spec.index_at(*p) {
                self.density[i] = self.density[i].saturating_add(1);
            }
        }

        let mut cur = 1 - self.front;
        let target = config.target_density;
        for (i, out) in self.buffers[cur].iter_mut().enumerate() {
            *out = if self.open[i] {
                (self.density[i] as f32 - target).max(0.0)
            } else {
                BLOCKED_PRESSURE
            };
        }

        for _ in 0..config.diffusion_passes.min(MAX_DIFFUSION_PASSES) {
            let [a, b] = &mut self.buffers;
            let (src, dst) = if cur == 0 { (&*a, b) } else { (&*b, a) };
            box_blur(&self.spec, &self.open, src, dst);
            cur = 1 - cur;
        }

        self.front = cur;
        self.built = true;
        self.version = grid.version();
        self.rebuilds += 1;
        Ok(())
    }

    /// Pressure of an in-bounds cell. `None` when off-grid or unbuilt.
    #[inline]
    pub fn pressure_at(&self, x: i32, y: i32) -> Option<f32> {
        if !self.built {
            return None;
        }
        self.spec.index(x, y).map(|i| self.values()[i])
    }

    /// Pressure a neighbour lookup sees: missing cells count as blocked.
    #[inline]
    pub fn neighbour_pressure(&self, x: i32, y: i32) -> f32 {
        self.pressure_at(x, y).unwrap_or(BLOCKED_PRESSURE)
    }

    /// Central-difference gradient over the 4-neighbourhood.
    pub fn gradient(&self, x: i32, y: i32) -> Vec2 {
        Vec2::new(
            self.neighbour_pressure(x + 1, y) - self.neighbour_pressure(x - 1, y),
            self.neighbour_pressure(x, y + 1) - self.neighbour_pressure(x, y - 1),
        ) * 0.5
    }

    /// Unit direction in which congestion pushes the agent `agent` at
    /// `pos`, constrained against `flow` (the agent's goal direction, or
    /// zero). Zero when the field is unbuilt or `pos` is off-grid.
    ///
    /// Tried in order: down the gradient (with a radial bias away from the
    /// cell center and a hashed jitter), toward the lowest strictly
    /// lower-pressure 8-neighbour, away from adjacent blocked cells, a
    /// hashed direction.
    pub fn push_direction(
        &self,
        grid: &WalkableGrid,
        pos: Vec2,
        agent: u32,
        flow: Vec2,
        config: &PressureConfig,
    ) -> Vec2 {
        let (x, y) = self.spec.world_to_cell(pos);
        let Some(p) = self.pressure_at(x, y) else {
            return Vec2::ZERO;
        };
        let cell_key = hash_cell(x, y);

        let mut dir = Vec2::ZERO;
        let grad = self.gradient(x, y);
        if grad.length() > config.gradient_epsilon {
            let radial = (pos - self.spec.cell_center(x, y)).normalize_or_zero();
            let jitter = hashed_unit(agent, cell_key, JITTER_SALT);
            dir = (-grad.normalize() + radial * config.radial_bias + jitter * config.jitter)
                .normalize_or_zero();
        }
        if dir == Vec2::ZERO {
            dir = self.lowest_neighbour(grid, x, y, p);
        }
        if dir == Vec2::ZERO {
            dir = away_from_blocked(grid, x, y);
        }
        if dir == Vec2::ZERO {
            dir = hashed_unit(agent, cell_key, FALLBACK_SALT);
        }
        constrain_to_flow(dir, flow, config.backward_margin, agent, cell_key)
    }

    /// Congestion displacement for one agent this tick.
    ///
    /// Magnitude is `push_strength * pressure`, capped by both `push_cap`
    /// and `push_speed_fraction * speed * dt`. Zero below
    /// `push_threshold`, off-grid, or before the first rebuild.
    #[allow(clippy::too_many_arguments)]
    pub fn push_displacement(
        &self,
        grid: &WalkableGrid,
        pos: Vec2,
        agent: u32,
        flow: Vec2,
        speed: f32,
        dt: f32,
        config: &PressureConfig,
    ) -> Vec2 {
        let (x, y) = self.spec.world_to_cell(pos);
        let Some(p) = self.pressure_at(x, y) else {
            return Vec2::ZERO;
        };
        if p <= config.push_threshold {
            return Vec2::ZERO;
        }
        let budget = (speed * dt).max(0.0) * config.push_speed_fraction;
        let magnitude = (config.push_strength * p).min(config.push_cap).min(budget);
        if magnitude <= 0.0 {
            return Vec2::ZERO;
        }
        self.push_direction(grid, pos, agent, flow, config) * magnitude
    }

    fn lowest_neighbour(&self, grid: &WalkableGrid, x: i32, y: i32, p: f32) -> Vec2 {
        let mut best: Option<((i32, i32), f32)> = None;
        for (dx, dy) in OFFSETS_8 {
            let Some(q) = self.pressure_at(x + dx, y + dy) else {
                continue;
            };
            if q >= p || !grid.is_walkable(x + dx, y + dy) || cuts_corner(grid, x, y, dx, dy) {
                continue;
            }
            if best.map_or(true, |(_, b)| q < b) {
                best = Some(((dx, dy), q));
            }
        }
        best.map_or(Vec2::ZERO, |((dx, dy), _)| {
            Vec2::new(dx as f32, dy as f32).normalize()
        })
    }
}

fn box_blur(spec: &GridSpec, open: &[bool], src: &[f32], dst: &mut [f32]) {
    for (i, out) in dst.iter_mut().enumerate() {
        if !open[i] {
            *out = BLOCKED_PRESSURE;
            continue;
        }
        let (x, y) = spec.coords(i);
        let mut sum = 0.0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                sum += match spec.index(x + dx, y + dy) {
                    Some(n) if open[n] => src[n],
                    _ => BLOCKED_PRESSURE,
                };
            }
        }
        *out = sum / 9.0;
    }
}

fn away_from_blocked(grid: &WalkableGrid, x: i32, y: i32) -> Vec2 {
    let mut sum = Vec2::ZERO;
    for (dx, dy) in OFFSETS_8 {
        if grid.spec().in_bounds(x + dx, y + dy) && grid.is_blocked(x + dx, y + dy) {
            sum -= Vec2::new(dx as f32, dy as f32).normalize();
        }
    }
    sum.normalize_or_zero()
}

/// Remove the part of `dir` pointing backward along `flow` when it exceeds
/// `margin`; a push cancelled entirely turns into a hashed sideways one.
fn constrain_to_flow(dir: Vec2, flow: Vec2, margin: f32, agent: u32, cell_key: u32) -> Vec2 {
    let flow = flow.normalize_or_zero();
    if flow == Vec2::ZERO {
        return dir;
    }
    let along = dir.dot(flow);
    if along >= -margin {
        return dir;
    }
    let lateral = dir - flow * along;
    if lateral.length_squared() > 1e-8 {
        return lateral.normalize();
    }
    let perp = flow.perp();
    if mix3(agent, cell_key, LATERAL_SALT) & 1 == 0 {
        perp
    } else {
        -perp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn open(w: u32, h: u32) -> WalkableGrid {
        WalkableGrid::open(GridSpec::new(w, h, 1.0, Vec2::ZERO).unwrap())
    }

    fn no_diffusion() -> PressureConfig {
        PressureConfig {
            diffusion_passes: 0,
            target_density: 1.0,
            ..PressureConfig::default()
        }
    }

    #[test]
    fn unbuilt_field_reports_nothing() {
        let g = open(3, 3);
        let f = PressureField::new(*g.spec());
        assert!(!f.is_built());
        assert_eq!(f.pressure_at(1, 1), None);
        assert_eq!(
            f.push_direction(&g, Vec2::splat(1.5), 0, Vec2::X, &PressureConfig::default()),
            Vec2::ZERO
        );
    }

    #[test]
    fn cell_edit_makes_field_out_of_date() {
        let mut g = open(4, 4);
        let mut f = PressureField::new(*g.spec());
        assert!(!f.is_current(&g));
        f.rebuild(&g, None, &[Vec2::splat(1.5)], &[true], &no_diffusion())
            .unwrap();
        assert!(f.is_current(&g));
        assert_eq!(f.version(), g.version());

        assert!(g.set_walkable(1, 1, false));
        assert!(!f.is_current(&g));
        f.rebuild(&g, None, &[Vec2::splat(1.5)], &[true], &no_diffusion())
            .unwrap();
        assert!(f.is_current(&g));
        assert_eq!(f.pressure_at(1, 1), Some(BLOCKED_PRESSURE));
    }

    #[test]
    fn density_minus_target_without_diffusion() {
        let g = open(3, 3);
        let mut f = PressureField::new(*g.spec());
        let positions = vec![Vec2::splat(1.5); 4];
        f.rebuild(&g, None, &positions, &[true, true, true, false], &no_diffusion())
            .unwrap();
        assert_eq!(f.density()[4], 3);
        assert_eq!(f.pressure_at(1, 1), Some(2.0));
        assert_eq!(f.pressure_at(0, 0), Some(0.0));
    }

    #[test]
    fn blocked_cell_reports_penalty() {
        let mut g = open(3, 3);
        g.set_walkable(1, 1, false);
        let mut f = PressureField::new(*g.spec());
        let positions = vec![Vec2::splat(1.5); 10];
        f.rebuild(&g, None, &positions, &[true; 10], &PressureConfig::default())
            .unwrap();
        assert_eq!(f.density()[4], 10);
        assert_eq!(f.pressure_at(1, 1), Some(BLOCKED_PRESSURE));
    }

    #[test]
    fn blur_treats_missing_neighbours_as_blocked() {
        let g = open(3, 3);
        let mut f = PressureField::new(*g.spec());
        let cfg = PressureConfig {
            diffusion_passes: 1,
            ..PressureConfig::default()
        };
        f.rebuild(&g, None, &[], &[], &cfg).unwrap();
        assert_eq!(f.pressure_at(1, 1), Some(0.0));
        let corner = f.pressure_at(0, 0).unwrap();
        assert!((corner - 5.0 * BLOCKED_PRESSURE / 9.0).abs() < 1e-5);
        let edge = f.pressure_at(1, 0).unwrap();
        assert!((edge - 3.0 * BLOCKED_PRESSURE / 9.0).abs() < 1e-5);
    }

    #[test]
    fn geometry_change_reallocates() {
        let mut f = PressureField::new(*open(2, 2).spec());
        let g = open(4, 3);
        f.rebuild(&g, None, &[], &[], &no_diffusion()).unwrap();
        assert_eq!(f.values().len(), 12);
        assert_eq!(f.rebuild_count(), 1);
    }

    #[test]
    fn mismatched_agent_arrays_are_rejected() {
        let g = open(2, 2);
        let mut f = PressureField::new(*g.spec());
        let err = f.rebuild(&g, None, &[Vec2::ZERO], &[], &no_diffusion());
        assert!(matches!(err, Err(FieldError::LengthMismatch { .. })));
        assert!(!f.is_built());
    }

    #[test]
    fn speed_scale_throttles_above_threshold() {
        let cfg = PressureConfig::default();
        assert_eq!(cfg.speed_scale(0.0), 1.0);
        assert_eq!(cfg.speed_scale(cfg.throttle_threshold), 1.0);
        let s = cfg.speed_scale(cfg.throttle_threshold + 2.0);
        assert!((s - 0.5).abs() < 1e-6);
        assert_eq!(cfg.speed_scale(1e9), cfg.throttle_min);
    }

    #[test]
    fn gradient_push_points_to_lower_pressure() {
        let g = open(5, 5);
        let mut f = PressureField::new(*g.spec());
        // Crowd at x = 1, empty at x = 3.
        let mut positions = vec![Vec2::new(1.5, 2.5); 6];
        positions.extend(vec![Vec2::new(2.5, 2.5); 3]);
        let active = vec![true; positions.len()];
        f.rebuild(&g, None, &positions, &active, &no_diffusion()).unwrap();
        let dir = f.push_direction(&g, Vec2::new(2.5, 2.5), 7, Vec2::ZERO, &no_diffusion());
        assert!(dir.x > 0.5, "{dir:?}");
    }

    #[test]
    fn push_never_points_backward_past_margin() {
        let g = open(5, 5);
        let mut f = PressureField::new(*g.spec());
        // Pressure ahead (+x), so the raw push points backward (-x).
        let mut positions = vec![Vec2::new(3.5, 2.5); 6];
        positions.extend(vec![Vec2::new(2.5, 2.5); 3]);
        let active = vec![true; positions.len()];
        let cfg = no_diffusion();
        f.rebuild(&g, None, &positions, &active, &cfg).unwrap();
        for agent in 0..16 {
            let dir = f.push_direction(&g, Vec2::new(2.5, 2.5), agent, Vec2::X, &cfg);
            assert!(dir.dot(Vec2::X) >= -cfg.backward_margin - 1e-5);
            assert!((dir.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn push_magnitude_respects_speed_budget() {
        let g = open(3, 3);
        let mut f = PressureField::new(*g.spec());
        let positions = vec![Vec2::splat(1.5); 50];
        let cfg = PressureConfig {
            push_strength: 10.0,
            push_cap: 10.0,
            ..no_diffusion()
        };
        f.rebuild(&g, None, &positions, &[true; 50], &cfg).unwrap();
        let d = f.push_displacement(&g, Vec2::splat(1.5), 0, Vec2::ZERO, 2.0, 0.1, &cfg);
        assert!(d.length() <= cfg.push_speed_fraction * 0.2 + 1e-6);
        assert!(d.length() > 0.0);
    }

    #[test]
    fn lateral_fallback_when_push_is_directly_backward() {
        let dir = constrain_to_flow(-Vec2::X, Vec2::X, 0.1, 3, 5);
        assert!(dir.dot(Vec2::X).abs() < 1e-6);
        assert!((dir.length() - 1.0).abs() < 1e-6);
        assert_eq!(dir, constrain_to_flow(-Vec2::X, Vec2::X, 0.1, 3, 5));
    }

    #[test]
    fn sanitized_clamps_and_replaces_nan() {
        let cfg = PressureConfig {
            diffusion_passes: 9,
            push_speed_fraction: 3.0,
            target_density: f32::NAN,
            throttle_min: 0.9,
            throttle_max: 0.5,
            ..PressureConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.diffusion_passes, 2);
        assert_eq!(cfg.push_speed_fraction, 1.0);
        assert_eq!(cfg.target_density, PressureConfig::default().target_density);
        assert!(cfg.throttle_max >= cfg.throttle_min);
    }

    proptest! {
        #[test]
        fn pressure_is_never_negative(
            pts in prop::collection::vec((0.0f32..6.0, 0.0f32..6.0), 0..64),
            blocked in prop::collection::vec(any::<bool>(), 36),
            passes in 0u32..3,
        ) {
            let spec = GridSpec::new(6, 6, 1.0, Vec2::ZERO).unwrap();
            let walkable: Vec<bool> = blocked.iter().map(|b| !b).collect();
            let g = WalkableGrid::new(spec, walkable).unwrap();
            let positions: Vec<Vec2> = pts.iter().map(|&(x, y)| Vec2::new(x, y)).collect();
            let active = vec![true; positions.len()];
            let cfg = PressureConfig { diffusion_passes: passes, ..PressureConfig::default() };
            let mut f = PressureField::new(spec);
            f.rebuild(&g, None, &positions, &active, &cfg).unwrap();
            for (i, &p) in f.values().iter().enumerate() {
                prop_assert!(p >= 0.0);
                if !g.is_walkable_index(i) {
                    prop_assert_eq!(p, BLOCKED_PRESSURE);
                }
            }
        }
    }
}
