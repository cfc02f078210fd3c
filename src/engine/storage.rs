use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::collections::HashMap;
use std::ptr::{self, NonNull};

use crate::engine::archetype::Archetype;
use crate::engine::component::{Component, ComponentDesc, ComponentMeta};
use crate::engine::entity::Entity;
use crate::engine::types::{align_up, ComponentHash, Mask, RowId, CHUNK_ALIGN, CHUNK_SIZE};

/// A fixed-capacity, 64-byte aligned arena holding the component data of one
/// archetype as a struct of arrays.
///
/// Invariants:
/// - Rows `[0, len)` hold live, initialized component values for every
///   column; rows `[len, capacity)` are uninitialized.
/// - `entities[row]` names the entity stored at `row` for every live row.
/// - Column offsets are fixed at construction; a row never moves except
///   through [`Chunk::swap_remove`].
pub struct Chunk {
    archetype: Archetype,
    data: NonNull<u8>,
    data_size: usize,
    offsets: HashMap<ComponentHash, usize>,
    entities: Vec<Entity>,
    capacity: u32,
    len: u32,
}

// Safety: the raw data pointer is owned by the chunk and all stored
// component types are constrained `Send + Sync`. Concurrent access from
// query workers touches disjoint rows and is coordinated by the scheduler's
// write-exclusion blocks.
unsafe impl Send for Chunk {}
unsafe impl Sync for Chunk {}

impl Chunk {
    /// Allocates a chunk for `archetype` holding up to `capacity` rows.
    ///
    /// Column offsets are computed by walking the archetype's descriptors in
    /// order, aligning the running offset up to each component's alignment.
    /// The packed total must fit [`CHUNK_SIZE`]; allocation failure is fatal.
    pub fn new(archetype: Archetype, capacity: u32) -> Self {
        let mut offsets = HashMap::with_capacity(archetype.component_count());
        let mut data_size = 0usize;
        for desc in archetype.components() {
            data_size = align_up(data_size, desc.layout.align);
            offsets.insert(desc.meta.hash, data_size);
            data_size += desc.layout.size * capacity as usize;
        }
        assert!(
            data_size <= CHUNK_SIZE,
            "archetype of size {} with capacity {} exceeds the {} byte chunk",
            archetype.size(),
            capacity,
            CHUNK_SIZE
        );

        let data = if data_size == 0 {
            NonNull::dangling()
        } else {
            let layout = match Layout::from_size_align(data_size, CHUNK_ALIGN) {
                Ok(layout) => layout,
                Err(_) => unreachable!("chunk layout is bounded by CHUNK_SIZE"),
            };
            // Safety: `layout` has non-zero size.
            let raw = unsafe { alloc(layout) };
            match NonNull::new(raw) {
                Some(ptr) => ptr,
                None => handle_alloc_error(layout),
            }
        };

        log::trace!(
            "allocated chunk: mask {:#018x}, capacity {}, {} bytes",
            archetype.mask(),
            capacity,
            data_size
        );

        Self {
            entities: vec![Entity::new(0, 0); capacity as usize],
            archetype,
            data,
            data_size,
            offsets,
            capacity,
            len: 0,
        }
    }

    /// The archetype stored by this chunk.
    #[inline]
    pub fn archetype(&self) -> &Archetype {
        &self.archetype
    }

    /// Number of live rows.
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Returns `true` if the chunk holds no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of rows.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns `true` if no further rows can be inserted.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Entity stored at `row`.
    #[inline]
    pub fn entity(&self, row: RowId) -> Entity {
        debug_assert!(row < self.len);
        self.entities[row as usize]
    }

    #[inline]
    fn column_ptr(&self, desc: &ComponentDesc, row: RowId) -> *mut u8 {
        debug_assert!(row < self.capacity);
        let offset = self.offsets[&desc.meta.hash] + desc.layout.size * row as usize;
        debug_assert!(offset <= self.data_size);
        // Safety at the call sites: `offset` stays within the allocation
        // computed at construction.
        unsafe { self.data.as_ptr().add(offset) }
    }

    /// Raw pointer to the `T` slot at `row`.
    ///
    /// ## Safety
    /// The archetype must contain `T`, `row` must be a live row, and the
    /// caller must uphold aliasing discipline for any reference derived from
    /// the pointer. Queries guarantee this through archetype matching and
    /// the scheduler's write exclusion.
    #[inline]
    pub(crate) unsafe fn component_ptr<T: Component>(&self, row: RowId) -> *mut T {
        let desc = ComponentDesc::of::<T>();
        debug_assert!(
            self.archetype.has_meta(ComponentMeta::of::<T>()),
            "archetype does not contain {}",
            desc.name
        );
        self.column_ptr(&desc, row) as *mut T
    }

    /// Places `entity` in the next free row, default-constructing every
    /// component column at that row. Returns the row index.
    ///
    /// The chunk root guarantees a chunk is never full when this is called.
    pub fn insert(&mut self, entity: Entity) -> RowId {
        debug_assert!(!self.is_full(), "insert into a full chunk");
        let row = self.len;
        for desc in self.archetype.components() {
            // Safety: the slot is within the allocation and uninitialized.
            unsafe { (desc.construct)(self.column_ptr(desc, row)) }
        }
        self.entities[row as usize] = entity;
        self.len += 1;
        row
    }

    /// Removes `row`, keeping the chunk packed by moving the last row into
    /// its place, and returns the entity that now occupies `row`.
    ///
    /// Components whose mask bit is set in `preserved` are *not* destructed:
    /// their bytes have been moved to another chunk and ownership travels
    /// with them. When the removed row was the last one no swap happens and
    /// the returned entity is the removed entity itself; callers compare and
    /// skip their location fix-up in that case.
    pub fn swap_remove(&mut self, row: RowId, preserved: Mask) -> Entity {
        debug_assert!(row < self.len);
        let last = self.len - 1;

        for desc in self.archetype.components() {
            if desc.meta.mask & preserved == 0 {
                // Safety: the row is live and its value is dropped exactly
                // once; the slot is overwritten or abandoned below.
                unsafe { (desc.destruct)(self.column_ptr(desc, row)) }
            }
        }

        if row != last {
            self.entities.swap(row as usize, last as usize);
            for desc in self.archetype.components() {
                // Safety: distinct rows of the same column never overlap.
                // The source slot is left uninitialized; its value now
                // lives at `row`.
                unsafe {
                    ptr::copy_nonoverlapping(
                        self.column_ptr(desc, last),
                        self.column_ptr(desc, row),
                        desc.layout.size,
                    );
                }
            }
        }

        self.len -= 1;
        self.entities[row as usize]
    }

    /// Shared reference to the `T` of the entity at `row`.
    #[inline]
    pub fn get<T: Component>(&self, row: RowId) -> &T {
        debug_assert!(row < self.len);
        // Safety: live row; shared access.
        unsafe { &*self.component_ptr::<T>(row) }
    }

    /// Mutable reference to the `T` of the entity at `row`.
    #[inline]
    pub fn get_mut<T: Component>(&mut self, row: RowId) -> &mut T {
        debug_assert!(row < self.len);
        // Safety: live row; exclusive access through `&mut self`.
        unsafe { &mut *self.component_ptr::<T>(row) }
    }

    /// Overwrites the `T` at `row`, dropping the previous value.
    #[inline]
    pub fn set<T: Component>(&mut self, row: RowId, value: T) {
        *self.get_mut::<T>(row) = value;
    }

    /// Copies one row's worth of bytes for every component the two
    /// archetypes share, from `from_row` in this chunk to `to_row` in
    /// `other`.
    ///
    /// Destination slots must hold initialized values (rows are
    /// default-constructed on insert); the previous values are dropped
    /// before being overwritten. Source slots keep their bytes: the caller
    /// completes the move by removing the source row with the shared
    /// components preserved from destruction.
    pub fn copy_to(&self, from_row: RowId, other: &mut Chunk, to_row: RowId) {
        debug_assert!(from_row < self.len);
        debug_assert!(to_row < other.len);
        for desc in self.archetype.components() {
            if !other.archetype.has_meta(desc.meta) {
                continue;
            }
            let src = self.column_ptr(desc, from_row);
            let dst = other.column_ptr(desc, to_row);
            // Safety: both slots are live and belong to different chunks.
            unsafe {
                (desc.destruct)(dst);
                ptr::copy_nonoverlapping(src, dst, desc.layout.size);
            }
        }
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        for row in 0..self.len {
            for desc in self.archetype.components() {
                // Safety: rows below `len` are initialized.
                unsafe { (desc.destruct)(self.column_ptr(desc, row)) }
            }
        }
        if self.data_size > 0 {
            let layout = match Layout::from_size_align(self.data_size, CHUNK_ALIGN) {
                Ok(layout) => layout,
                Err(_) => return,
            };
            // Safety: `data` was allocated with this exact layout.
            unsafe { dealloc(self.data.as_ptr(), layout) }
        }
    }
}
