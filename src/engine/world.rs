use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::collections::HashMap;
use std::ptr::NonNull;

use rayon::prelude::*;

use crate::engine::archetype::{Archetype, ChunkRoot};
use crate::engine::component::{Component, ComponentDesc, ComponentMeta, ComponentSet};
use crate::engine::entity::{Entity, EntityLocation, EntityManager};
use crate::engine::error::{
    ComponentMissingError, DuplicateComponentError, EcsResult, SingletonMissingError,
    StaleEntityError,
};
use crate::engine::query::{QueryData, QueryItem, View};
use crate::engine::scheduler::Scheduler;
use crate::engine::storage::Chunk;
use crate::engine::systems::{ChunkSystem, ChunkSystemProxy, System, SystemProxy};
use crate::engine::types::{subset, ComponentHash, Mask};

const DEFAULT_CAPACITY: usize = 100_000;

/// One world-level component instance, stored in descriptor-managed raw
/// memory so lifecycle runs through the same construct/destruct path as
/// chunk rows.
struct SingletonSlot {
    desc: ComponentDesc,
    data: NonNull<u8>,
}

// Safety: singleton component types are constrained `Send + Sync`; the raw
// pointer is owned by the slot.
unsafe impl Send for SingletonSlot {}
unsafe impl Sync for SingletonSlot {}

impl SingletonSlot {
    fn new(desc: ComponentDesc) -> Self {
        let data = if desc.layout.size == 0 {
            NonNull::dangling()
        } else {
            let layout = match Layout::from_size_align(desc.layout.size, desc.layout.align) {
                Ok(layout) => layout,
                Err(_) => unreachable!("component layout is a valid allocation layout"),
            };
            // Safety: non-zero size.
            let raw = unsafe { alloc(layout) };
            match NonNull::new(raw) {
                Some(ptr) => ptr,
                None => handle_alloc_error(layout),
            }
        };
        // Safety: freshly allocated, correctly aligned storage.
        unsafe { (desc.construct)(data.as_ptr()) }
        Self { desc, data }
    }
}

impl Drop for SingletonSlot {
    fn drop(&mut self) {
        // Safety: the slot holds an initialized value.
        unsafe { (self.desc.destruct)(self.data.as_ptr()) }
        if self.desc.layout.size > 0 {
            if let Ok(layout) = Layout::from_size_align(self.desc.layout.size, self.desc.layout.align)
            {
                // Safety: allocated with this layout in `new`.
                unsafe { dealloc(self.data.as_ptr(), layout) }
            }
        }
    }
}

/// The core collection of the ECS: owns chunk storage, the entity manager,
/// singleton components, and the scheduler, and exposes the structural and
/// data surface the application drives.
///
/// Structural mutation (create, destroy, add, remove) takes `&mut self` and
/// therefore can never overlap a running tick or query, which only ever see
/// `&self`.
pub struct World {
    roots: Vec<ChunkRoot>,
    roots_by_mask: HashMap<Mask, usize>,
    entities: EntityManager,
    singletons: Vec<SingletonSlot>,
    singletons_by_hash: HashMap<ComponentHash, usize>,
    singleton_mask: Mask,
    scheduler: Scheduler,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world with the default entity capacity reservation.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a world reserving room for `capacity` entities.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            roots: Vec::new(),
            roots_by_mask: HashMap::new(),
            entities: EntityManager::with_capacity(capacity),
            singletons: Vec::new(),
            singletons_by_hash: HashMap::new(),
            singleton_mask: 0,
            scheduler: Scheduler::new(),
        }
    }

    // ── storage resolution ──────────────────────────────────────────────

    fn root_index(&mut self, archetype: &Archetype) -> usize {
        match self.roots_by_mask.get(&archetype.mask()) {
            Some(&index) => index,
            None => {
                let index = self.roots.len();
                self.roots.push(ChunkRoot::new(archetype.clone()));
                self.roots_by_mask.insert(archetype.mask(), index);
                index
            }
        }
    }

    fn chunk_at(&self, location: EntityLocation) -> &Chunk {
        &self.roots[location.root as usize].chunks()[location.chunk as usize]
    }

    fn chunk_at_mut(&mut self, location: EntityLocation) -> &mut Chunk {
        &mut self.roots[location.root as usize].chunks_mut()[location.chunk as usize]
    }

    fn location_of(&self, entity: Entity) -> EcsResult<EntityLocation> {
        self.entities
            .get(entity)
            .ok_or_else(|| StaleEntityError { entity }.into())
    }

    /// All chunk roots currently present, one per archetype.
    pub fn chunk_roots(&self) -> &[ChunkRoot] {
        &self.roots
    }

    // ── creation and destruction ────────────────────────────────────────

    /// Creates an entity with the given archetype and returns its id.
    pub fn create_from(&mut self, archetype: &Archetype) -> Entity {
        let root = self.root_index(archetype);
        let chunk_index = self.roots[root].find_free();
        let row = self.roots[root].chunks()[chunk_index].len();
        let entity = self.entities.create(EntityLocation {
            root: root as u32,
            chunk: chunk_index as u32,
            row,
        });
        self.roots[root].chunks_mut()[chunk_index].insert(entity);
        entity
    }

    /// Creates an entity carrying the component set `S`, every component
    /// default-constructed.
    pub fn create<S: ComponentSet>(&mut self) -> Entity {
        self.create_from(&Archetype::of::<S>())
    }

    /// Creates `n` entities of the given archetype.
    pub fn batch_from(&mut self, n: u32, archetype: &Archetype) -> Vec<Entity> {
        let mut entities = Vec::with_capacity(n as usize);
        for _ in 0..n {
            entities.push(self.create_from(archetype));
        }
        entities
    }

    /// Creates `n` entities carrying the component set `S`.
    pub fn batch<S: ComponentSet>(&mut self, n: u32) -> Vec<Entity> {
        self.batch_from(n, &Archetype::of::<S>())
    }

    /// Destroys an entity, dropping its components and invalidating its id.
    ///
    /// Returns `false` without effect for stale ids.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        let Some(location) = self.entities.get(entity) else {
            return false;
        };
        let moved = self.chunk_at_mut(location).swap_remove(location.row, 0);
        // The last row was swapped into the vacated one; point its handle
        // at the new row unless the vacated row was the last itself.
        if moved != entity {
            self.entities.update(moved, location);
        }
        self.entities.remove(entity);
        true
    }

    /// Returns `true` if the id refers to a live entity.
    pub fn exists(&self, entity: Entity) -> bool {
        self.entities.exists(entity)
    }

    // ── component access ────────────────────────────────────────────────

    /// Shared reference to the `T` of an entity.
    pub fn get<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        let location = self.location_of(entity)?;
        let chunk = self.chunk_at(location);
        if !chunk.archetype().has_meta(ComponentMeta::of::<T>()) {
            return Err(ComponentMissingError {
                component: std::any::type_name::<T>(),
            }
            .into());
        }
        Ok(chunk.get::<T>(location.row))
    }

    /// Mutable reference to the `T` of an entity.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        let location = self.location_of(entity)?;
        let chunk = self.chunk_at_mut(location);
        if !chunk.archetype().has_meta(ComponentMeta::of::<T>()) {
            return Err(ComponentMissingError {
                component: std::any::type_name::<T>(),
            }
            .into());
        }
        Ok(chunk.get_mut::<T>(location.row))
    }

    /// Overwrites the `T` of an entity, dropping the previous value.
    pub fn set<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        *self.get_mut::<T>(entity)? = value;
        Ok(())
    }

    /// Returns `true` if the entity's archetype contains every component in
    /// `S`.
    pub fn has<S: ComponentSet>(&self, entity: Entity) -> EcsResult<bool> {
        let location = self.location_of(entity)?;
        Ok(self.roots[location.root as usize]
            .archetype()
            .contains(S::mask()))
    }

    /// The archetype of an entity.
    pub fn archetype_of(&self, entity: Entity) -> EcsResult<&Archetype> {
        let location = self.location_of(entity)?;
        Ok(self.roots[location.root as usize].archetype())
    }

    // ── structural component changes ────────────────────────────────────

    /// Adds the component set `S` to an entity, migrating it to the
    /// extended archetype. Added components are default-constructed;
    /// existing component values are preserved.
    pub fn add<S: ComponentSet>(&mut self, entity: Entity) -> EcsResult<()> {
        let current = self.archetype_of(entity)?;
        let added = S::descriptors();
        for desc in &added {
            if current.has_meta(desc.meta) {
                return Err(DuplicateComponentError {
                    component: desc.name,
                }
                .into());
            }
        }
        let target = current.with(added);
        self.migrate(entity, target)
    }

    /// Removes the component set `S` from an entity, migrating it to the
    /// narrowed archetype. Removed components are destructed; the remaining
    /// values are preserved.
    pub fn remove<S: ComponentSet>(&mut self, entity: Entity) -> EcsResult<()> {
        let current = self.archetype_of(entity)?;
        for desc in &S::descriptors() {
            if !current.has_meta(desc.meta) {
                return Err(ComponentMissingError {
                    component: desc.name,
                }
                .into());
            }
        }
        let target = current.without(S::mask());
        self.migrate(entity, target)
    }

    /// Moves an entity into a chunk of `target`, preserving the values of
    /// every component both archetypes share.
    ///
    /// Order matters for the packing and identity invariants: the new row
    /// is inserted first, shared columns are copied, then the old row is
    /// swap-removed (dropping only the components that did not move) and the
    /// swapped-in entity's location is repaired before the migrating
    /// entity's own location is updated.
    fn migrate(&mut self, entity: Entity, target: Archetype) -> EcsResult<()> {
        let location = self.location_of(entity)?;
        let source_root = location.root as usize;
        if self.roots[source_root].archetype().mask() == target.mask() {
            // Mask-identical archetypes share storage, including the
            // collision case; nothing to move.
            return Ok(());
        }

        let target_root = self.root_index(&target);
        let target_chunk = self.roots[target_root].find_free();

        let (source, destination) = pair_mut(&mut self.roots, source_root, target_root);
        let destination_chunk = &mut destination.chunks_mut()[target_chunk];
        let row = destination_chunk.insert(entity);
        let source_chunk = &mut source.chunks_mut()[location.chunk as usize];
        source_chunk.copy_to(location.row, destination_chunk, row);
        let moved = source_chunk.swap_remove(location.row, destination_chunk.archetype().mask());

        if moved != entity {
            self.entities.update(moved, location);
        }
        self.entities.update(
            entity,
            EntityLocation {
                root: target_root as u32,
                chunk: target_chunk as u32,
                row,
            },
        );
        Ok(())
    }

    // ── singleton components ────────────────────────────────────────────

    /// Registers `T` as a singleton component with a default-constructed
    /// instance. Registration is one-shot; repeated calls are no-ops.
    pub fn register_singleton<T: Component>(&mut self) {
        let desc = ComponentDesc::of::<T>();
        if self.singletons_by_hash.contains_key(&desc.meta.hash) {
            return;
        }
        log::debug!("registered singleton component {}", desc.name);
        self.singleton_mask |= desc.meta.mask;
        self.singletons.push(SingletonSlot::new(desc));
        self.singletons_by_hash
            .insert(desc.meta.hash, self.singletons.len() - 1);
    }

    /// Shared reference to the world instance of singleton `T`.
    pub fn singleton<T: Component>(&self) -> EcsResult<&T> {
        match self.singleton_ptr(ComponentMeta::of::<T>()) {
            // Safety: the slot stays initialized for the world's lifetime.
            Some(ptr) => Ok(unsafe { &*(ptr as *const T) }),
            None => Err(SingletonMissingError {
                component: std::any::type_name::<T>(),
            }
            .into()),
        }
    }

    /// Mutable reference to the world instance of singleton `T`.
    pub fn singleton_mut<T: Component>(&mut self) -> EcsResult<&mut T> {
        match self.singleton_ptr(ComponentMeta::of::<T>()) {
            // Safety: exclusive through `&mut self`.
            Some(ptr) => Ok(unsafe { &mut *(ptr as *mut T) }),
            None => Err(SingletonMissingError {
                component: std::any::type_name::<T>(),
            }
            .into()),
        }
    }

    /// Raw pointer to a singleton instance, if `meta` names a registered
    /// singleton component.
    #[inline]
    pub(crate) fn singleton_ptr(&self, meta: ComponentMeta) -> Option<*mut u8> {
        if self.singleton_mask & meta.mask == 0 {
            return None;
        }
        self.singletons_by_hash
            .get(&meta.hash)
            .map(|&index| self.singletons[index].data.as_ptr())
    }

    #[inline]
    pub(crate) fn singleton_mask(&self) -> Mask {
        self.singleton_mask
    }

    // ── query execution ─────────────────────────────────────────────────

    fn matching_roots(&self, match_mask: Mask) -> impl Iterator<Item = &ChunkRoot> {
        self.roots
            .iter()
            .filter(move |root| subset(root.archetype().mask(), match_mask))
    }

    /// Invokes `f` once per entity matching the query tuple `Q`, in
    /// parallel across chunk roots and across the chunks of each root.
    /// Rows within one chunk are visited sequentially in ascending order.
    pub fn for_each<Q: QueryData>(&self, f: impl Fn(QueryItem<'_, Q>) + Send + Sync) {
        let match_mask = Q::component_mask() & !self.singleton_mask;
        let roots: Vec<&ChunkRoot> = self.matching_roots(match_mask).collect();
        roots.par_iter().for_each(|root| {
            root.chunks().par_iter().for_each(|chunk| {
                for row in 0..chunk.len() {
                    // Safety: matched chunk, live row; write exclusion is
                    // the scheduler's construction.
                    f(unsafe { Q::fetch(self, chunk, row) });
                }
            });
        });
    }

    /// Invokes `f` once per entity matching `Q`, sequentially: roots in
    /// creation order, chunks in order, rows ascending.
    pub fn for_each_sequential<Q: QueryData>(&self, mut f: impl FnMut(QueryItem<'_, Q>)) {
        let match_mask = Q::component_mask() & !self.singleton_mask;
        for root in self.matching_roots(match_mask) {
            for chunk in root.chunks() {
                for row in 0..chunk.len() {
                    // Safety: as in `for_each`.
                    f(unsafe { Q::fetch(self, chunk, row) });
                }
            }
        }
    }

    /// Invokes `f` once per matching chunk with a [`View`], in parallel
    /// across roots and chunks.
    pub fn for_each_chunk<Q: QueryData>(&self, f: impl Fn(View<'_, Q>) + Send + Sync) {
        let match_mask = Q::component_mask() & !self.singleton_mask;
        let roots: Vec<&ChunkRoot> = self.matching_roots(match_mask).collect();
        roots.par_iter().for_each(|root| {
            root.chunks()
                .par_iter()
                .for_each(|chunk| f(View::new(self, chunk)));
        });
    }

    /// Invokes `f` once per matching chunk with a [`View`], sequentially.
    pub fn for_each_chunk_sequential<Q: QueryData>(&self, mut f: impl FnMut(View<'_, Q>)) {
        let match_mask = Q::component_mask() & !self.singleton_mask;
        for root in self.matching_roots(match_mask) {
            for chunk in root.chunks() {
                f(View::new(self, chunk));
            }
        }
    }

    // ── systems and ticking ─────────────────────────────────────────────

    /// Registers a per-entity system.
    pub fn register_system<S: System>(&mut self, system: S) {
        self.scheduler.insert(Box::new(SystemProxy(system)));
    }

    /// Registers a per-entity system constructed with `S::default()`.
    pub fn register_default_system<S: System + Default>(&mut self) {
        self.register_system(S::default());
    }

    /// Registers a per-chunk system.
    pub fn register_chunk_system<S: ChunkSystem>(&mut self, system: S) {
        self.scheduler.insert(Box::new(ChunkSystemProxy(system)));
    }

    /// The scheduler holding the registered systems.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Runs one parallel tick: execution blocks run concurrently, each
    /// system's query runs in parallel across chunks.
    pub fn update(&mut self) {
        let scheduler = std::mem::take(&mut self.scheduler);
        scheduler.exec(self);
        self.scheduler = scheduler;
    }

    /// Runs one deterministic tick: blocks in order, systems in insertion
    /// order, chunks sequentially.
    pub fn update_sequential(&mut self) {
        let scheduler = std::mem::take(&mut self.scheduler);
        scheduler.exec_sequential(self);
        self.scheduler = scheduler;
    }

    // ── counters ────────────────────────────────────────────────────────

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if no entities are live.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Reserved entity capacity.
    pub fn capacity(&self) -> usize {
        self.entities.capacity()
    }

    /// Number of registered systems.
    pub fn system_count(&self) -> usize {
        self.scheduler.len()
    }
}

/// Mutable references to two distinct roots.
fn pair_mut(roots: &mut [ChunkRoot], a: usize, b: usize) -> (&mut ChunkRoot, &mut ChunkRoot) {
    debug_assert!(a != b, "source and destination root must differ");
    if a < b {
        let (head, tail) = roots.split_at_mut(b);
        (&mut head[a], &mut tail[0])
    } else {
        let (head, tail) = roots.split_at_mut(a);
        (&mut tail[0], &mut head[b])
    }
}
