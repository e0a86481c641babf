//! Entity identifiers, allocation and id remapping.
//!
//! An [`Entity`] is a `u64` identity with no data of its own. Components
//! refer to other entities through [`PropertyValue::Entity`](crate::PropertyValue::Entity)
//! values, which are plain ids rather than ownership.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A process-unique entity identifier, stable for the entity's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u64);

impl Entity {
    /// The null / invalid entity sentinel. Detached components report it as
    /// their owner, and dangling references decode to it.
    pub const INVALID: Entity = Entity(0);

    /// Create an entity from a raw `u64` identifier.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) entity.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Allocates monotonically increasing entity ids.
///
/// Ids start at 1 (0 is reserved for [`Entity::INVALID`]) and are never
/// reused within a process. Once `u64::MAX` has been handed out the
/// allocator is exhausted.
#[derive(Debug)]
pub struct EntityAllocator {
    next_id: Option<u64>,
    allocated: u64,
}

impl EntityAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: Some(1),
            allocated: 0,
        }
    }

    /// Resume allocation after ids already in use, e.g. after loading a
    /// world that keeps its saved ids.
    #[must_use]
    pub fn starting_after(last: Entity) -> Self {
        Self {
            next_id: last.0.checked_add(1),
            allocated: 0,
        }
    }

    /// Allocates a fresh entity id, or `None` once the id space is used up.
    pub fn allocate(&mut self) -> Option<Entity> {
        let id = self.next_id?;
        self.next_id = id.checked_add(1);
        self.allocated += 1;
        Some(Entity(id))
    }

    /// Returns the number of entities this allocator has handed out.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.allocated
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Translation from ids in a saved document to ids in the live process.
///
/// Ids missing from the map resolve to [`Entity::INVALID`], so a reference
/// to an entity that was not part of the load never aliases a live entity.
#[derive(Debug, Clone, Default)]
pub struct EntityRemap {
    map: HashMap<Entity, Entity>,
}

impl EntityRemap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that saved id `from` now lives at `to`.
    pub fn insert(&mut self, from: Entity, to: Entity) {
        self.map.insert(from, to);
    }

    /// The live id for a saved id.
    #[must_use]
    pub fn resolve(&self, saved: Entity) -> Entity {
        if !saved.is_valid() {
            return Entity::INVALID;
        }
        self.map.get(&saved).copied().unwrap_or(Entity::INVALID)
    }

    /// The live id recorded for `saved`, if any.
    #[must_use]
    pub fn get(&self, saved: Entity) -> Option<Entity> {
        self.map.get(&saved).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
