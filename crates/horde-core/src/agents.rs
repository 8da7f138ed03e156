//! Struct-of-arrays agent storage.
//!
//! Agents are parallel arrays indexed by a stable [`AgentId`]. The
//! external spawner owns the lifecycle: [`AgentStore::spawn`] and
//! [`AgentStore::despawn`] run between ticks, never inside a pass. Passes
//! only read and overwrite positions and directions in place.
//!
//! Despawned slots stay allocated (marked inactive) and are recycled by
//! later spawns, so IDs and array lengths are stable across a tick.

use glam::Vec2;

use crate::id::AgentId;

/// Parallel per-agent arrays.
#[derive(Clone, Debug, Default)]
pub struct AgentStore {
    positions: Vec<Vec2>,
    speeds: Vec<f32>,
    directions: Vec<Vec2>,
    active: Vec<bool>,
    free: Vec<u32>,
}

impl AgentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with room for `capacity` agents.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            speeds: Vec::with_capacity(capacity),
            directions: Vec::with_capacity(capacity),
            active: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// Add an agent at `position` moving at `speed` world units per second.
    ///
    /// Reuses the most recently freed slot if one exists. Non-finite or
    /// negative speeds are stored as zero. Returns `None`, and stores
    /// nothing, if `position` is not finite.
    pub fn spawn(&mut self, position: Vec2, speed: f32) -> Option<AgentId> {
        if !position.is_finite() {
            return None;
        }
        let speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
        if let Some(slot) = self.free.pop() {
            let i = slot as usize;
            self.positions[i] = position;
            self.speeds[i] = speed;
            self.directions[i] = Vec2::ZERO;
            self.active[i] = true;
            return Some(AgentId(slot));
        }
        let id = AgentId(self.positions.len() as u32);
        self.positions.push(position);
        self.speeds.push(speed);
        self.directions.push(Vec2::ZERO);
        self.active.push(true);
        Some(id)
    }

    /// Remove an agent. Returns `false` if the ID was not live.
    pub fn despawn(&mut self, id: AgentId) -> bool {
        let i = id.index();
        if i >= self.active.len() || !self.active[i] {
            return false;
        }
        self.active[i] = false;
        self.directions[i] = Vec2::ZERO;
        self.speeds[i] = 0.0;
        self.free.push(id.0);
        true
    }

    /// Number of slots (live and recycled). Every per-agent array has
    /// exactly this length.
    pub fn slot_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of live agents.
    pub fn active_count(&self) -> usize {
        self.positions.len() - self.free.len()
    }

    /// Whether no live agents exist.
    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    /// Whether `id` refers to a live agent.
    pub fn is_active(&self, id: AgentId) -> bool {
        self.active.get(id.index()).copied().unwrap_or(false)
    }

    /// Position of a live agent.
    pub fn position(&self, id: AgentId) -> Option<Vec2> {
        self.is_active(id).then(|| self.positions[id.index()])
    }

    /// Last-chosen direction of a live agent.
    pub fn direction(&self, id: AgentId) -> Option<Vec2> {
        self.is_active(id).then(|| self.directions[id.index()])
    }

    /// Teleport a live agent. Returns `false` if the ID was not live or
    /// `position` is not finite.
    pub fn set_position(&mut self, id: AgentId, position: Vec2) -> bool {
        if !self.is_active(id) || !position.is_finite() {
            return false;
        }
        self.positions[id.index()] = position;
        true
    }

    /// All positions, indexed by slot.
    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    /// Mutable positions, indexed by slot.
    pub fn positions_mut(&mut self) -> &mut [Vec2] {
        &mut self.positions
    }

    /// All speeds, indexed by slot.
    pub fn speeds(&self) -> &[f32] {
        &self.speeds
    }

    /// All last-chosen directions, indexed by slot.
    pub fn directions(&self) -> &[Vec2] {
        &self.directions
    }

    /// Activity mask, indexed by slot.
    pub fn active(&self) -> &[bool] {
        &self.active
    }

    /// Split borrow: mutable positions and directions alongside read-only
    /// speeds and activity mask.
    pub fn split_mut(&mut self) -> AgentArraysMut<'_> {
        AgentArraysMut {
            positions: &mut self.positions,
            directions: &mut self.directions,
            speeds: &self.speeds,
            active: &self.active,
        }
    }

    /// Iterate IDs of live agents in slot order.
    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter(|(_, &live)| live)
            .map(|(i, _)| AgentId(i as u32))
    }
}

/// Disjoint mutable views into an [`AgentStore`].
pub struct AgentArraysMut<'a> {
    /// Positions, writable.
    pub positions: &'a mut [Vec2],
    /// Last-chosen directions, writable.
    pub directions: &'a mut [Vec2],
    /// Intrinsic speeds, read-only.
    pub speeds: &'a [f32],
    /// Activity mask, read-only.
    pub active: &'a [bool],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_assigns_sequential_ids() {
        let mut store = AgentStore::new();
        let a = store.spawn(Vec2::new(1.0, 2.0), 3.0).unwrap();
        let b = store.spawn(Vec2::ZERO, 1.0).unwrap();
        assert_eq!(a, AgentId(0));
        assert_eq!(b, AgentId(1));
        assert_eq!(store.position(a), Some(Vec2::new(1.0, 2.0)));
        assert_eq!(store.speeds()[0], 3.0);
        assert_eq!(store.active_count(), 2);
    }

    #[test]
    fn despawn_recycles_slot() {
        let mut store = AgentStore::new();
        let a = store.spawn(Vec2::ZERO, 1.0).unwrap();
        store.spawn(Vec2::ONE, 1.0).unwrap();
        assert!(store.despawn(a));
        assert!(!store.despawn(a));
        assert_eq!(store.active_count(), 1);
        assert_eq!(store.slot_count(), 2);
        assert!(store.position(a).is_none());

        let c = store.spawn(Vec2::new(5.0, 5.0), 2.0).unwrap();
        assert_eq!(c, a);
        assert_eq!(store.slot_count(), 2);
        assert_eq!(store.direction(c), Some(Vec2::ZERO));
    }

    #[test]
    fn invalid_speed_is_zeroed() {
        let mut store = AgentStore::new();
        store.spawn(Vec2::ZERO, f32::NAN).unwrap();
        store.spawn(Vec2::ZERO, -4.0).unwrap();
        assert_eq!(store.speeds(), &[0.0, 0.0]);
    }

    #[test]
    fn ids_skip_inactive() {
        let mut store = AgentStore::new();
        let a = store.spawn(Vec2::ZERO, 1.0).unwrap();
        let b = store.spawn(Vec2::ZERO, 1.0).unwrap();
        store.despawn(a);
        assert_eq!(store.ids().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn set_position_only_for_live() {
        let mut store = AgentStore::new();
        let a = store.spawn(Vec2::ZERO, 1.0).unwrap();
        assert!(store.set_position(a, Vec2::ONE));
        assert_eq!(store.positions()[0], Vec2::ONE);
        assert!(!store.set_position(AgentId(9), Vec2::ONE));
    }

    #[test]
    fn non_finite_position_is_refused() {
        let mut store = AgentStore::new();
        assert_eq!(store.spawn(Vec2::new(f32::NAN, 2.0), 1.0), None);
        assert_eq!(store.spawn(Vec2::new(1.0, f32::INFINITY), 1.0), None);
        assert_eq!(store.slot_count(), 0);

        let a = store.spawn(Vec2::ONE, 1.0).unwrap();
        assert!(!store.set_position(a, Vec2::NAN));
        assert_eq!(store.position(a), Some(Vec2::ONE));
    }
}
