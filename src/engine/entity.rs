//! Entity identity, lifecycle, and the generational slot map.
//!
//! ## Purpose
//! Entities are lightweight, opaque identifiers that reference rows in
//! archetype chunk storage. This module is responsible for:
//!
//! - generating stable entity identifiers,
//! - tracking entity liveness via generations,
//! - mapping entities to their current chunk location in O(1),
//! - recycling destroyed identifiers safely.
//!
//! ## Entity model
//! An [`Entity`] packs two values into a single 64-bit integer:
//!
//! - an **index** addressing a handle slot in the manager,
//! - a **generation**, incremented on destroy so recycled indices never
//!   alias old handles.
//!
//! ## Storage model
//! The manager is a slot map in the style of a beach map: a sparse `handles`
//! table indexed by entity index, and two dense, parallel arrays (`slots`
//! and `locations`) that always have length equal to the live entity count.
//! `handles[i].slot` points into the dense arrays; `slots[k]` points back at
//! the owning handle so dense swap-removal can repair the indirection.
//!
//! Free handle slots form an intrusive singly linked list threaded through
//! the `slot` field, headed by `first_available` and terminated by a handle
//! whose stored link equals its own index.
//!
//! ## Invariants
//! - `slots.len() == locations.len() ==` live entity count.
//! - For every live entity `e`: `slots[handles[e.index].slot] == e.index`.
//! - A handle's generation never decreases; once incremented, every
//!   previously issued id for that index is permanently dead.

use crate::engine::types::{EntityId, GenerationId, IndexId, RowId};

/// Opaque, versioned identifier for an entity.
///
/// The value packs `generation << 32 | index`. Entities are cheap to copy
/// and compare and are safe to pass across threads.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct Entity(pub EntityId);

impl Entity {
    /// Packs an index and generation into an entity id.
    #[inline]
    pub const fn new(index: IndexId, generation: GenerationId) -> Self {
        Entity(((generation as EntityId) << 32) | index as EntityId)
    }

    /// Index half of the id.
    #[inline]
    pub const fn index(self) -> IndexId {
        self.0 as IndexId
    }

    /// Generation half of the id.
    #[inline]
    pub const fn generation(self) -> GenerationId {
        (self.0 >> 32) as GenerationId
    }
}

/// Physical storage location of a live entity.
///
/// Identifies the chunk root, the chunk within the root, and the row within
/// the chunk that hold the entity's component data. Must always reflect the
/// true row; every structural move updates it in the same operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntityLocation {
    /// Index of the chunk root (one per archetype) in the world.
    pub root: u32,
    /// Chunk index within the root.
    pub chunk: u32,
    /// Row index within the chunk.
    pub row: RowId,
}

#[derive(Clone, Copy, Debug)]
struct Handle {
    /// Index into the dense arrays while live; freelist link while dead.
    slot: u32,
    generation: GenerationId,
}

/// Generational slot map from entity ids to chunk locations.
///
/// Supports O(1) create, destroy, and lookup, with id recycling that is safe
/// against dangling references: a destroyed id's generation is bumped, so
/// lookups through old handles return nothing.
#[derive(Default)]
pub struct EntityManager {
    handles: Vec<Handle>,
    slots: Vec<u32>,
    locations: Vec<EntityLocation>,
    first_available: Option<u32>,
}

impl EntityManager {
    /// Creates an empty manager with reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            handles: Vec::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            locations: Vec::with_capacity(capacity),
            first_available: None,
        }
    }

    /// Allocates an entity id bound to `location`.
    ///
    /// Reuses the freelist head when one exists, preserving the slot's
    /// current generation; otherwise appends a fresh handle at generation
    /// zero. The dense arrays grow by exactly one entry.
    pub fn create(&mut self, location: EntityLocation) -> Entity {
        let dense = self.slots.len() as u32;
        let (index, generation) = match self.first_available {
            Some(index) => {
                let handle = &mut self.handles[index as usize];
                // A link equal to the handle's own index terminates the list.
                self.first_available = if handle.slot == index {
                    None
                } else {
                    Some(handle.slot)
                };
                handle.slot = dense;
                (index, handle.generation)
            }
            None => {
                let index = self.handles.len() as u32;
                self.handles.push(Handle {
                    slot: dense,
                    generation: 0,
                });
                (index, 0)
            }
        };
        self.slots.push(index);
        self.locations.push(location);
        Entity::new(index, generation)
    }

    /// Releases an entity id, invalidating every copy of it.
    ///
    /// Stale ids are ignored. The dense arrays are compacted by swap-removal;
    /// the handle backing the previous dense tail is re-pointed at the freed
    /// dense slot *before* the swap so the indirection stays consistent.
    pub fn remove(&mut self, entity: Entity) {
        let index = entity.index() as usize;
        let Some(handle) = self.handles.get(index) else {
            return;
        };
        if handle.generation != entity.generation() {
            return;
        }
        let dense = handle.slot as usize;

        if let Some(&tail) = self.slots.last() {
            self.handles[tail as usize].slot = dense as u32;
        }

        let handle = &mut self.handles[index];
        handle.generation = handle.generation.wrapping_add(1);
        handle.slot = self.first_available.unwrap_or(index as u32);
        self.first_available = Some(index as u32);

        self.slots.swap_remove(dense);
        self.locations.swap_remove(dense);
    }

    /// Returns the location of a live entity, or `None` for stale ids.
    #[inline]
    pub fn get(&self, entity: Entity) -> Option<EntityLocation> {
        let handle = self.handles.get(entity.index() as usize)?;
        if handle.generation != entity.generation() {
            return None;
        }
        Some(self.locations[handle.slot as usize])
    }

    /// Overwrites the location of a live entity in place.
    ///
    /// Stale ids are ignored; callers performing row moves are expected to
    /// pass ids they just observed in chunk storage.
    #[inline]
    pub fn update(&mut self, entity: Entity, location: EntityLocation) {
        let Some(handle) = self.handles.get(entity.index() as usize) else {
            return;
        };
        if handle.generation != entity.generation() {
            return;
        }
        self.locations[handle.slot as usize] = location;
    }

    /// Returns `true` if the id refers to a live entity.
    #[inline]
    pub fn exists(&self, entity: Entity) -> bool {
        self.handles
            .get(entity.index() as usize)
            .map(|handle| handle.generation == entity.generation())
            .unwrap_or(false)
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no entities are live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reserved entity capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }
}
