//! Component descriptors and component-set tuples.
//!
//! ## Purpose
//! The runtime stores component data as raw bytes inside chunks and never
//! sees concrete component types at rest. This module produces the portable
//! abstraction that makes that possible: a [`ComponentDesc`] carrying the
//! type's stable hash, its mask bit, its memory layout, and monomorphized
//! lifecycle functions for in-place construction and destruction.
//!
//! ## Identity
//! A component type's hash is FNV-1a over `std::any::type_name::<T>()`,
//! computed once per call site and stable for the life of the process. Its
//! mask is `1 << (hash % 63)`. Descriptors compare equal by hash.
//!
//! ## Component sets
//! Structural operations take *sets* of component types. [`ComponentSet`] is
//! implemented for tuples of component types up to arity eight and yields
//! the descriptor list and combined mask used to build archetypes.

use std::any::type_name;
use std::fmt;
use std::mem::{align_of, size_of};
use std::ptr;

use crate::engine::types::{fnv1a, mask_of_hash, ComponentHash, Mask};

/// Marker for types storable as components.
///
/// Any plain value type works: components must be default-constructible so a
/// freshly allocated row can be initialized in place, and `Send + Sync` so
/// chunks can be iterated from worker threads.
pub trait Component: Default + Send + Sync + 'static {}

impl<T: Default + Send + Sync + 'static> Component for T {}

/// Stable identity of a component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentMeta {
    /// FNV-1a hash of the type name.
    pub hash: ComponentHash,
    /// Mask bit, `1 << (hash % 63)`.
    pub mask: Mask,
}

impl ComponentMeta {
    /// Computes the identity of component type `T`.
    #[inline]
    pub fn of<T: 'static>() -> Self {
        let hash = fnv1a(type_name::<T>().as_bytes());
        Self {
            hash,
            mask: mask_of_hash(hash),
        }
    }
}

/// Native size and alignment of a component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemoryLayout {
    /// Size in bytes.
    pub size: usize,
    /// Alignment in bytes. Always a power of two.
    pub align: usize,
}

impl MemoryLayout {
    /// Layout of type `T`.
    #[inline]
    pub fn of<T>() -> Self {
        Self {
            size: size_of::<T>(),
            align: align_of::<T>(),
        }
    }
}

/// In-place lifecycle callback operating on a raw component slot.
pub type LifecycleFn = unsafe fn(*mut u8);

unsafe fn construct_in_place<T: Component>(slot: *mut u8) {
    // Safety: the caller guarantees `slot` points at uninitialized,
    // correctly aligned storage for a `T`.
    unsafe { (slot as *mut T).write(T::default()) }
}

unsafe fn destruct_in_place<T: Component>(slot: *mut u8) {
    // Safety: the caller guarantees `slot` holds an initialized `T` that is
    // not referenced elsewhere.
    unsafe { ptr::drop_in_place(slot as *mut T) }
}

/// Type-erased descriptor of a component type.
///
/// Chunks index columns by `meta.hash`, compute offsets from `layout`, and
/// run `construct`/`destruct` through the stored function pointers whenever
/// rows are allocated or removed. Descriptors are cheap, `Copy`, and used as
/// map keys by hash.
#[derive(Clone, Copy)]
pub struct ComponentDesc {
    /// Stable identity (hash and mask bit).
    pub meta: ComponentMeta,
    /// Native memory layout.
    pub layout: MemoryLayout,
    /// Writes a default value into a raw slot.
    pub construct: LifecycleFn,
    /// Runs the type's destructor on a raw slot.
    pub destruct: LifecycleFn,
    /// Type name for diagnostics.
    pub name: &'static str,
}

impl ComponentDesc {
    /// Builds the descriptor for component type `T`.
    #[inline]
    pub fn of<T: Component>() -> Self {
        Self {
            meta: ComponentMeta::of::<T>(),
            layout: MemoryLayout::of::<T>(),
            construct: construct_in_place::<T>,
            destruct: destruct_in_place::<T>,
            name: type_name::<T>(),
        }
    }
}

impl PartialEq for ComponentDesc {
    fn eq(&self, other: &Self) -> bool {
        self.meta.hash == other.meta.hash
    }
}

impl Eq for ComponentDesc {}

impl fmt::Debug for ComponentDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDesc")
            .field("name", &self.name)
            .field("hash", &self.meta.hash)
            .field("mask", &format_args!("{:#018x}", self.meta.mask))
            .field("size", &self.layout.size)
            .field("align", &self.layout.align)
            .finish()
    }
}

impl fmt::Display for ComponentDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (size {}, align {})",
            self.name, self.layout.size, self.layout.align
        )
    }
}

/// A static set of component types.
///
/// Implemented for tuples of component types up to arity eight; single
/// components use the one-element tuple form, `(T,)`.
pub trait ComponentSet {
    /// Descriptors of every component in the set, in declaration order.
    fn descriptors() -> Vec<ComponentDesc>;

    /// Combined mask of the set.
    fn mask() -> Mask {
        Self::descriptors()
            .iter()
            .fold(0, |mask, desc| mask | desc.meta.mask)
    }
}

macro_rules! impl_component_set {
    ($($ty:ident),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            fn descriptors() -> Vec<ComponentDesc> {
                vec![$(ComponentDesc::of::<$ty>()),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);
