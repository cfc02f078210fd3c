//! # strata_ecs
//!
//! Archetype-based, parallel Entity-Component-System runtime.
//!
//! ## Design goals
//! - Cache-dense columnar storage in fixed 16 KiB chunks
//! - Constant-time access to any component of any entity
//! - Stable entity identity across arbitrary composition changes
//! - Automatic data-parallel execution derived from declared reads/writes
//!
//! ## Shape
//! Entities are opaque 64-bit ids; component data lives in per-archetype
//! chunks laid out as structs of arrays; systems declare their data as
//! typed query tuples and the scheduler packs them into execution blocks
//! with pairwise disjoint write sets, which run in parallel.

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::archetype::{Archetype, ChunkRoot};
pub use engine::component::{Component, ComponentDesc, ComponentMeta, ComponentSet, MemoryLayout};
pub use engine::entity::{Entity, EntityLocation, EntityManager};
pub use engine::error::{
    ComponentMissingError, DuplicateComponentError, EcsResult, SingletonMissingError,
    StaleEntityError, WorldError,
};
pub use engine::query::{QueryData, QueryItem, Read, View, Write};
pub use engine::scheduler::{ExecutionBlock, Scheduler};
pub use engine::storage::Chunk;
pub use engine::systems::{ChunkSystem, System, SystemMeta, SystemRef};
pub use engine::types::{EntityId, Mask, CHUNK_ALIGN, CHUNK_SIZE};
pub use engine::world::World;

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used ECS types.
///
/// Import with:
/// ```rust
/// use strata_ecs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Archetype, ChunkSystem, Component, ComponentSet, EcsResult, Entity, QueryItem, Read,
        System, View, World, WorldError, Write,
    };
}
