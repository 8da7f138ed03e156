//! Shared resources passes read and write, and the [`ResourceSet`] bitset.
//!
//! Passes declare their inputs and outputs as resources so the schedule
//! can be validated once at startup: every read must be satisfied by an
//! engine input or an earlier pass, which gives each stage an explicit
//! happens-before edge on the stage it reads from.

use std::fmt;

/// A shared buffer or snapshot that passes operate on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Resource {
    /// Walkable grid published by the map producer.
    Walkable = 0,
    /// Wall-avoidance navigation field.
    WallField = 1,
    /// Goal-seeking navigation field.
    FlowField = 2,
    /// Congestion (pressure) field.
    Pressure = 3,
    /// Agent intrinsic move speeds.
    Speeds = 4,
    /// Agent positions.
    Positions = 5,
    /// Agent last-chosen directions.
    Directions = 6,
}

impl Resource {
    /// Every resource in declaration order.
    pub const ALL: [Resource; 7] = [
        Resource::Walkable,
        Resource::WallField,
        Resource::FlowField,
        Resource::Pressure,
        Resource::Speeds,
        Resource::Positions,
        Resource::Directions,
    ];

    /// Short lowercase name for logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Walkable => "walkable",
            Self::WallField => "wall_field",
            Self::FlowField => "flow_field",
            Self::Pressure => "pressure",
            Self::Speeds => "speeds",
            Self::Positions => "positions",
            Self::Directions => "directions",
        }
    }

    /// Whether this resource is per-agent state (written in sequence by
    /// several passes) rather than a derived field snapshot.
    pub fn is_agent_state(self) -> bool {
        matches!(self, Self::Positions | Self::Directions | Self::Speeds)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of [`Resource`]s backed by a single word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ResourceSet {
    bits: u32,
}

impl ResourceSet {
    /// Create an empty resource set.
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Insert a resource into the set.
    pub fn insert(&mut self, resource: Resource) {
        self.bits |= 1 << resource as u8;
    }

    /// Check whether the set contains a resource.
    pub fn contains(&self, resource: Resource) -> bool {
        self.bits & (1 << resource as u8) != 0
    }

    /// Return the union of two sets.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Return the intersection of two sets.
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    /// Number of resources in the set.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterate resources in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Resource> + '_ {
        Resource::ALL.into_iter().filter(|r| self.contains(*r))
    }
}

impl FromIterator<Resource> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        let mut set = Self::empty();
        for resource in iter {
            set.insert(resource);
        }
        set
    }
}
