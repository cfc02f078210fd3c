//! Archetype descriptors and per-archetype chunk ownership.
//!
//! ## Purpose
//! An [`Archetype`] describes the exact set of component types attached to
//! an entity: the sorted descriptor list, the OR of the component masks, and
//! the summed row size. Archetype equality is mask equality, which keeps
//! matching and lookup O(1) at the cost of tolerating hash collisions in the
//! 63-slot mask space.
//!
//! A [`ChunkRoot`] owns every chunk of one archetype present in the world
//! and answers free-space queries, caching the most recently used non-full
//! chunk so steady-state insertion does not scan.

use crate::engine::component::{ComponentDesc, ComponentMeta, ComponentSet};
use crate::engine::storage::Chunk;
use crate::engine::types::{intersects, subset, Mask, CHUNK_SIZE};

/// The set of component types carried by an entity.
#[derive(Clone, Debug, Default)]
pub struct Archetype {
    components: Vec<ComponentDesc>,
    mask: Mask,
    size: usize,
}

impl Archetype {
    /// Builds an archetype from a descriptor list.
    ///
    /// Descriptors are sorted by hash so archetypes built from the same set
    /// in any order lay their columns out identically.
    pub fn new(mut components: Vec<ComponentDesc>) -> Self {
        components.sort_by_key(|desc| desc.meta.hash);
        let mask = components.iter().fold(0, |mask, desc| mask | desc.meta.mask);
        let size = components.iter().map(|desc| desc.layout.size).sum();
        Self {
            components,
            mask,
            size,
        }
    }

    /// Builds the archetype of a component-set tuple.
    pub fn of<S: ComponentSet>() -> Self {
        Self::new(S::descriptors())
    }

    /// Combined mask of every component in the archetype.
    #[inline]
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// Summed byte size of one row.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of component types.
    #[inline]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// The sorted descriptor list.
    #[inline]
    pub fn components(&self) -> &[ComponentDesc] {
        &self.components
    }

    /// Returns `true` if `other_mask` is a subset of this archetype's mask.
    #[inline]
    pub fn contains(&self, other_mask: Mask) -> bool {
        subset(self.mask, other_mask)
    }

    /// Returns `true` if either archetype is a subset of the other.
    #[inline]
    pub fn intersects(&self, other: &Archetype) -> bool {
        intersects(self.mask, other.mask)
    }

    /// Returns `true` if the archetype carries the component identified by
    /// `meta`.
    #[inline]
    pub fn has_meta(&self, meta: ComponentMeta) -> bool {
        self.mask & meta.mask == meta.mask
    }

    /// Archetype extended by the given descriptors.
    pub fn with(&self, added: Vec<ComponentDesc>) -> Self {
        let mut components = self.components.clone();
        components.extend(added);
        Self::new(components)
    }

    /// Archetype with every component whose mask bit is in `removed` taken
    /// out.
    pub fn without(&self, removed: Mask) -> Self {
        let components = self
            .components
            .iter()
            .filter(|desc| desc.meta.mask & removed != desc.meta.mask)
            .copied()
            .collect();
        Self::new(components)
    }
}

impl PartialEq for Archetype {
    fn eq(&self, other: &Self) -> bool {
        self.mask == other.mask
    }
}

impl Eq for Archetype {}

/// Owner of all chunks of one archetype.
///
/// Chunks are fixed-size and never grown: when one fills, a sibling is
/// created for the same archetype. Row indices therefore stay stable for the
/// lifetime of a chunk, and fragmentation is bounded by the chunk capacity.
/// Emptied chunks are kept until the world is dropped.
pub struct ChunkRoot {
    archetype: Archetype,
    chunks: Vec<Chunk>,
    free_hint: Option<usize>,
    per_chunk: u32,
}

impl ChunkRoot {
    /// Creates an empty root for `archetype`.
    ///
    /// Per-chunk capacity is `CHUNK_SIZE / archetype.size()`. An archetype
    /// whose row does not fit a single chunk cannot be stored; this is fatal
    /// at root creation rather than undefined at insertion.
    pub fn new(archetype: Archetype) -> Self {
        let per_chunk = if archetype.size() == 0 {
            // Rows carry no bytes; only the entity array bounds capacity.
            CHUNK_SIZE as u32
        } else {
            (CHUNK_SIZE / archetype.size()) as u32
        };
        assert!(
            per_chunk > 0,
            "archetype row of {} bytes exceeds the {} byte chunk",
            archetype.size(),
            CHUNK_SIZE
        );
        log::debug!(
            "new chunk root: mask {:#018x}, {} components, {} rows per chunk",
            archetype.mask(),
            archetype.component_count(),
            per_chunk
        );
        Self {
            archetype,
            chunks: Vec::new(),
            free_hint: None,
            per_chunk,
        }
    }

    /// The archetype stored under this root.
    #[inline]
    pub fn archetype(&self) -> &Archetype {
        &self.archetype
    }

    /// All chunks of the root.
    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Mutable access to the chunk list.
    #[inline]
    pub(crate) fn chunks_mut(&mut self) -> &mut [Chunk] {
        &mut self.chunks
    }

    /// Total number of live entities across all chunks.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.len() as usize).sum()
    }

    /// Returns `true` if the root holds no entities.
    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(|chunk| chunk.is_empty())
    }

    /// Index of a chunk with free space, allocating a new chunk when every
    /// existing one is full.
    ///
    /// The most recently returned non-full chunk is cached; the cache is
    /// consulted first, then existing chunks are scanned in order.
    pub fn find_free(&mut self) -> usize {
        if let Some(index) = self.free_hint {
            if !self.chunks[index].is_full() {
                return index;
            }
        }

        let index = match self.chunks.iter().position(|chunk| !chunk.is_full()) {
            Some(index) => index,
            None => self.create_chunk(),
        };
        self.free_hint = Some(index);
        index
    }

    /// Appends a freshly allocated chunk and returns its index.
    fn create_chunk(&mut self) -> usize {
        self.chunks
            .push(Chunk::new(self.archetype.clone(), self.per_chunk));
        self.chunks.len() - 1
    }
}
