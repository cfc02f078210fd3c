//! Error types for world operations.
//!
//! This module declares focused error types used across the world surface.
//! Each error carries enough context to make failures actionable while
//! remaining small and cheap to pass around or convert into the aggregate
//! [`WorldError`].
//!
//! ## Goals
//! * **Specificity:** each type models a single failure mode (stale entity
//!   handles, missing components, duplicate additions, unregistered
//!   singletons).
//! * **Ergonomics:** all errors implement [`std::error::Error`] and
//!   [`std::fmt::Display`], and provide `From<T>` conversions into
//!   [`WorldError`] so call sites can use `?`.
//! * **Actionability:** structured fields (the offending component name, the
//!   rejected entity id) make logs useful without reproducing the issue.
//!
//! ## Policy
//! Only recoverable, caller-visible conditions surface as errors. Internal
//! invariant violations and allocation failure are fatal: the runtime has no
//! recovery path for a chunk that cannot be allocated.

use std::fmt;

use crate::engine::entity::Entity;

/// Returned when an operation receives an entity id whose generation no
/// longer matches live storage, typically because the entity was destroyed
/// and its index slot recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleEntityError {
    /// The rejected entity id.
    pub entity: Entity,
}

impl fmt::Display for StaleEntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stale or dead entity reference (index {}, generation {})",
            self.entity.index(),
            self.entity.generation()
        )
    }
}

impl std::error::Error for StaleEntityError {}

/// Returned when a component access targets a type that is not part of the
/// entity's archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentMissingError {
    /// Type name of the absent component.
    pub component: &'static str,
}

impl fmt::Display for ComponentMissingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component not present on entity: {}", self.component)
    }
}

impl std::error::Error for ComponentMissingError {}

/// Returned when a component addition targets a type the entity already has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateComponentError {
    /// Type name of the duplicated component.
    pub component: &'static str,
}

impl fmt::Display for DuplicateComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component already present on entity: {}", self.component)
    }
}

impl std::error::Error for DuplicateComponentError {}

/// Returned when a singleton component is read before registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingletonMissingError {
    /// Type name of the unregistered singleton.
    pub component: &'static str,
}

impl fmt::Display for SingletonMissingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "singleton component not registered: {}", self.component)
    }
}

impl std::error::Error for SingletonMissingError {}

/// Aggregate error for fallible world operations.
///
/// `From<T>` conversions are implemented for every low-level error so callers
/// can write `?` and still return a single expressive type. `Display`
/// messages are concise, single-line, and suitable for logs; `Debug` retains
/// full structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldError {
    /// An entity handle was stale or referred to a destroyed entity.
    StaleEntity(StaleEntityError),
    /// A component access targeted a type absent from the archetype.
    ComponentMissing(ComponentMissingError),
    /// A component addition targeted a type already present.
    DuplicateComponent(DuplicateComponentError),
    /// A singleton component was read before registration.
    SingletonMissing(SingletonMissingError),
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::StaleEntity(e) => write!(f, "{e}"),
            WorldError::ComponentMissing(e) => write!(f, "{e}"),
            WorldError::DuplicateComponent(e) => write!(f, "{e}"),
            WorldError::SingletonMissing(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for WorldError {}

impl From<StaleEntityError> for WorldError {
    fn from(e: StaleEntityError) -> Self {
        WorldError::StaleEntity(e)
    }
}

impl From<ComponentMissingError> for WorldError {
    fn from(e: ComponentMissingError) -> Self {
        WorldError::ComponentMissing(e)
    }
}

impl From<DuplicateComponentError> for WorldError {
    fn from(e: DuplicateComponentError) -> Self {
        WorldError::DuplicateComponent(e)
    }
}

impl From<SingletonMissingError> for WorldError {
    fn from(e: SingletonMissingError) -> Self {
        WorldError::SingletonMissing(e)
    }
}

/// Result alias for world operations.
pub type EcsResult<T> = Result<T, WorldError>;
