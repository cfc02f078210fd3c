//! Typed query parameters and per-chunk views.
//!
//! ## Design goals
//! * **Static intent:** a query is described by a tuple of parameter types;
//!   read/write access is encoded in the types themselves ([`Read`],
//!   [`Write`], [`Entity`]) and reflected into match, read, and write masks
//!   without runtime registration.
//! * **Runtime efficiency:** iteration walks chunk columns directly through
//!   raw pointers; no intermediate allocation per row.
//! * **Safety by discipline:** the borrow checker cannot see through the
//!   type-erased columns, so correctness rests on two guarantees upheld by
//!   the callers: archetype matching (a fetched component exists in the
//!   chunk) and scheduler write exclusion (no two concurrently running
//!   systems write the same component type).
//!
//! ## Execution model
//! A query derives three masks from its parameter tuple:
//!
//! - the *match mask*, the OR of every component parameter's mask bit (the
//!   entity parameter contributes nothing),
//! - the *read mask* over [`Read`] parameters,
//! - the *write mask* over [`Write`] parameters.
//!
//! A chunk root matches when its archetype mask is a superset of the match
//! mask, after singleton bits are removed: singleton components are not part
//! of any archetype and are resolved from the world instead of the chunk.
//!
//! ## Singleton hazard
//! A `Write` parameter naming a singleton component yields the same world
//! instance for every row. Mutating one from a parallel iteration aliases
//! the reference across workers; keep such systems sequential or mutate
//! singletons between ticks through the world surface.

use std::marker::PhantomData;

use crate::engine::component::{Component, ComponentMeta};
use crate::engine::entity::Entity;
use crate::engine::storage::Chunk;
use crate::engine::types::{Mask, RowId};
use crate::engine::world::World;

/// Read-only query parameter for component `T`.
pub struct Read<T>(PhantomData<T>);

/// Mutable query parameter for component `T`.
pub struct Write<T>(PhantomData<T>);

/// One parameter of a query tuple.
///
/// ## Safety
/// `fetch` hands out references derived from raw column pointers. An
/// implementation must only be fetched for chunks whose archetype contains
/// the parameter's component (guaranteed by match-mask filtering) and must
/// report its access direction truthfully, since the scheduler builds its
/// exclusion blocks from these masks.
pub unsafe trait QueryParam {
    /// Value handed to the closure for this parameter.
    type Item<'w>;

    /// Component identity, or `None` for the entity-id parameter.
    fn meta() -> Option<ComponentMeta>;

    /// Whether the parameter takes mutable access.
    const WRITES: bool;

    /// Resolves the parameter for one row.
    ///
    /// ## Safety
    /// `row` must be a live row of `chunk`, the chunk's archetype must
    /// contain the component (unless it is a registered singleton), and the
    /// caller must guarantee no conflicting access to the same component
    /// slot for the lifetime of the returned item.
    unsafe fn fetch<'w>(world: &'w World, chunk: &'w Chunk, row: RowId) -> Self::Item<'w>;
}

unsafe impl<T: Component> QueryParam for Read<T> {
    type Item<'w> = &'w T;

    fn meta() -> Option<ComponentMeta> {
        Some(ComponentMeta::of::<T>())
    }

    const WRITES: bool = false;

    unsafe fn fetch<'w>(world: &'w World, chunk: &'w Chunk, row: RowId) -> &'w T {
        match world.singleton_ptr(ComponentMeta::of::<T>()) {
            // Safety: the slot holds an initialized `T` for the life of the
            // world; shared access only.
            Some(ptr) => unsafe { &*(ptr as *const T) },
            // Safety: upheld by the caller per the trait contract.
            None => unsafe { &*chunk.component_ptr::<T>(row) },
        }
    }
}

unsafe impl<T: Component> QueryParam for Write<T> {
    type Item<'w> = &'w mut T;

    fn meta() -> Option<ComponentMeta> {
        Some(ComponentMeta::of::<T>())
    }

    const WRITES: bool = true;

    unsafe fn fetch<'w>(world: &'w World, chunk: &'w Chunk, row: RowId) -> &'w mut T {
        match world.singleton_ptr(ComponentMeta::of::<T>()) {
            // Safety: exclusivity over singleton writes is the caller's
            // responsibility (see the module-level hazard note).
            Some(ptr) => unsafe { &mut *(ptr as *mut T) },
            // Safety: rows are visited at most once per iteration and the
            // scheduler excludes concurrent writers of this component.
            None => unsafe { &mut *chunk.component_ptr::<T>(row) },
        }
    }
}

unsafe impl QueryParam for Entity {
    type Item<'w> = Entity;

    fn meta() -> Option<ComponentMeta> {
        None
    }

    const WRITES: bool = false;

    unsafe fn fetch<'w>(_world: &'w World, chunk: &'w Chunk, row: RowId) -> Entity {
        chunk.entity(row)
    }
}

/// A full query description: a tuple of [`QueryParam`]s.
///
/// ## Safety
/// Mask reporting must cover every component parameter in the tuple; the
/// scheduler and the iteration code trust these masks.
pub unsafe trait QueryData {
    /// Tuple of per-parameter items handed to the closure.
    type Item<'w>;

    /// OR of every component parameter's mask bit.
    fn component_mask() -> Mask;

    /// OR of the read-only component masks.
    fn read_mask() -> Mask;

    /// OR of the mutable component masks.
    fn write_mask() -> Mask;

    /// Resolves the whole tuple for one row.
    ///
    /// ## Safety
    /// Same contract as [`QueryParam::fetch`] for every element.
    unsafe fn fetch<'w>(world: &'w World, chunk: &'w Chunk, row: RowId) -> Self::Item<'w>;
}

macro_rules! impl_query_data {
    ($($param:ident),+) => {
        unsafe impl<$($param: QueryParam),+> QueryData for ($($param,)+) {
            type Item<'w> = ($($param::Item<'w>,)+);

            fn component_mask() -> Mask {
                let mut mask = 0;
                $(if let Some(meta) = $param::meta() {
                    mask |= meta.mask;
                })+
                mask
            }

            fn read_mask() -> Mask {
                let mut mask = 0;
                $(if !$param::WRITES {
                    if let Some(meta) = $param::meta() {
                        mask |= meta.mask;
                    }
                })+
                mask
            }

            fn write_mask() -> Mask {
                let mut mask = 0;
                $(if $param::WRITES {
                    if let Some(meta) = $param::meta() {
                        mask |= meta.mask;
                    }
                })+
                mask
            }

            unsafe fn fetch<'w>(
                world: &'w World,
                chunk: &'w Chunk,
                row: RowId,
            ) -> Self::Item<'w> {
                // Safety: forwarded contract.
                ($(unsafe { $param::fetch(world, chunk, row) },)+)
            }
        }
    };
}

impl_query_data!(A);
impl_query_data!(A, B);
impl_query_data!(A, B, C);
impl_query_data!(A, B, C, D);
impl_query_data!(A, B, C, D, E);
impl_query_data!(A, B, C, D, E, F);
impl_query_data!(A, B, C, D, E, F, G);
impl_query_data!(A, B, C, D, E, F, G, H);

/// Item tuple of a query for a given world lifetime.
pub type QueryItem<'w, Q> = <Q as QueryData>::Item<'w>;

/// Iteration handle over the rows of a single chunk.
///
/// Handed to chunk-level closures and systems; exposes tuple iteration plus
/// random access by row. Component lookups that name a registered singleton
/// resolve to the world-level instance instead of the chunk.
pub struct View<'w, Q: QueryData> {
    world: &'w World,
    chunk: &'w Chunk,
    _query: PhantomData<Q>,
}

impl<'w, Q: QueryData> View<'w, Q> {
    pub(crate) fn new(world: &'w World, chunk: &'w Chunk) -> Self {
        Self {
            world,
            chunk,
            _query: PhantomData,
        }
    }

    /// Number of live rows in the viewed chunk.
    #[inline]
    pub fn len(&self) -> u32 {
        self.chunk.len()
    }

    /// Returns `true` if the viewed chunk holds no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunk.is_empty()
    }

    /// Entity stored at `row`.
    #[inline]
    pub fn entity(&self, row: RowId) -> Entity {
        self.chunk.entity(row)
    }

    /// Shared reference to the `T` of the entity at `row`, or the world
    /// instance when `T` is a registered singleton.
    #[inline]
    pub fn get<T: Component>(&self, row: RowId) -> &'w T {
        match self.world.singleton_ptr(ComponentMeta::of::<T>()) {
            // Safety: initialized for the life of the world.
            Some(ptr) => unsafe { &*(ptr as *const T) },
            // Safety: the view only exists for matched chunks.
            None => {
                debug_assert!(row < self.chunk.len());
                unsafe { &*self.chunk.component_ptr::<T>(row) }
            }
        }
    }

    /// Iterates the query tuple over every row in ascending order.
    pub fn iter(&self) -> ViewIter<'w, Q> {
        ViewIter {
            world: self.world,
            chunk: self.chunk,
            row: 0,
            _query: PhantomData,
        }
    }
}

impl<'a, 'w, Q: QueryData> IntoIterator for &'a View<'w, Q> {
    type Item = QueryItem<'w, Q>;
    type IntoIter = ViewIter<'w, Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Row iterator of a [`View`].
pub struct ViewIter<'w, Q: QueryData> {
    world: &'w World,
    chunk: &'w Chunk,
    row: RowId,
    _query: PhantomData<Q>,
}

impl<'w, Q: QueryData> Iterator for ViewIter<'w, Q> {
    type Item = QueryItem<'w, Q>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.chunk.len() {
            return None;
        }
        let row = self.row;
        self.row += 1;
        // Safety: `row` is live; access discipline is inherited from the
        // iteration that produced the view.
        Some(unsafe { Q::fetch(self.world, self.chunk, row) })
    }
}
