//! System abstractions and type-erased dispatch.
//!
//! A **system** is a unit of update logic dispatched by the scheduler over
//! every entity matching its declared component signature. Systems:
//!
//! - declare their data as a query tuple (`type Data`), from which the
//!   match, read, and write masks are derived,
//! - are grouped into execution blocks by their write masks,
//! - may run sequentially or in parallel,
//! - receive component references only for the duration of one invocation
//!   and never hold a reference to the world.
//!
//! ## Two dispatch granularities
//!
//! [`System`] is invoked once per matching *row* with a tuple of component
//! references; [`ChunkSystem`] is invoked once per matching *chunk* with a
//! [`View`], letting the system iterate rows itself or index them randomly.
//!
//! ## Structural purity
//!
//! An `update` must be pure with respect to world structure: no create,
//! destroy, add, or remove on the world it runs under. The API enforces
//! this statically, since structural mutation needs `&mut World` and systems
//! only ever observe shared world state through their query items.
//!
//! ## Type erasure
//!
//! The scheduler stores systems behind [`SystemRef`], which carries the
//! masks and a monomorphized invocation path. The proxies in this module
//! bridge a concrete system type to that object-safe surface.

use std::any::type_name;

use crate::engine::query::{QueryData, QueryItem, View};
use crate::engine::types::Mask;
use crate::engine::world::World;

/// Access summary of a system, derived from its query tuple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemMeta {
    /// OR of every component parameter's mask bit.
    pub mask: Mask,
    /// OR of the read-only component masks.
    pub read_mask: Mask,
    /// OR of the mutable component masks.
    pub write_mask: Mask,
}

impl SystemMeta {
    /// Derives the meta of a query tuple.
    pub fn of<Q: QueryData>() -> Self {
        Self {
            mask: Q::component_mask(),
            read_mask: Q::read_mask(),
            write_mask: Q::write_mask(),
        }
    }
}

/// A per-entity update system.
///
/// The declared `Data` tuple plays the role of the update signature: each
/// element is a [`Read`](crate::engine::query::Read),
/// [`Write`](crate::engine::query::Write), or
/// [`Entity`](crate::engine::entity::Entity) parameter, and the scheduler
/// derives the system's masks from it.
pub trait System: Send + Sync + 'static {
    /// Query tuple describing the components this system touches.
    type Data: QueryData;

    /// Processes one matching row.
    fn update(&self, item: QueryItem<'_, Self::Data>);
}

/// A per-chunk update system.
///
/// Receives a [`View`] per matching chunk instead of loose component
/// references. Useful when the update wants row indices, the entity array,
/// or singleton components alongside iteration.
pub trait ChunkSystem: Send + Sync + 'static {
    /// Query tuple describing the components this system touches.
    type Data: QueryData;

    /// Processes one matching chunk.
    fn update(&self, view: View<'_, Self::Data>);
}

/// Object-safe handle to a registered system.
///
/// Stored by the scheduler; carries the derived masks and both invocation
/// paths (parallel and sequential query execution).
pub trait SystemRef: Send + Sync {
    /// Type name of the underlying system, for diagnostics.
    fn name(&self) -> &'static str;

    /// Derived access masks.
    fn meta(&self) -> SystemMeta;

    /// Runs the system's query in parallel across chunk roots and chunks.
    fn invoke(&self, world: &World);

    /// Runs the system's query sequentially in deterministic order.
    fn invoke_sequential(&self, world: &World);
}

/// Bridges a [`System`] to the object-safe [`SystemRef`] surface.
pub(crate) struct SystemProxy<S: System>(pub S);

impl<S: System> SystemRef for SystemProxy<S> {
    fn name(&self) -> &'static str {
        type_name::<S>()
    }

    fn meta(&self) -> SystemMeta {
        SystemMeta::of::<S::Data>()
    }

    fn invoke(&self, world: &World) {
        world.for_each::<S::Data>(|item| self.0.update(item));
    }

    fn invoke_sequential(&self, world: &World) {
        world.for_each_sequential::<S::Data>(|item| self.0.update(item));
    }
}

/// Bridges a [`ChunkSystem`] to the object-safe [`SystemRef`] surface.
pub(crate) struct ChunkSystemProxy<S: ChunkSystem>(pub S);

impl<S: ChunkSystem> SystemRef for ChunkSystemProxy<S> {
    fn name(&self) -> &'static str {
        type_name::<S>()
    }

    fn meta(&self) -> SystemMeta {
        SystemMeta::of::<S::Data>()
    }

    fn invoke(&self, world: &World) {
        world.for_each_chunk::<S::Data>(|view| self.0.update(view));
    }

    fn invoke_sequential(&self, world: &World) {
        world.for_each_chunk_sequential::<S::Data>(|view| self.0.update(view));
    }
}
