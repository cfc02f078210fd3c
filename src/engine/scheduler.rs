//! System scheduling and execution blocks.
//!
//! ## Scheduling model
//!
//! The scheduler holds an ordered list of **execution blocks**. Each block
//! carries the OR of its systems' write masks and runs its systems
//! sequentially in insertion order; distinct blocks have pairwise disjoint
//! write masks and may run in parallel. Block 0 is reserved for read-only
//! systems (write mask zero).
//!
//! ## Insertion policy
//!
//! Inserting a system with write mask `W`:
//!
//! 1. `W == 0`: append to block 0.
//! 2. Otherwise scan blocks `1..`. The first block whose write mask overlaps
//!    `W` becomes the target; every further overlapping block is merged into
//!    the target (masks OR'd, system lists concatenated in order). Merging
//!    resolves transitive dependencies: a system writing `{A, B}` fuses
//!    separate blocks writing `{A}` and `{B}`.
//! 3. Append to the target, or open a new block when none overlapped.
//!
//! ## Read safety across blocks
//!
//! Blocks exclude concurrent *writers* of a component but say nothing about
//! block-0 readers racing a writer block. At execution time the read-only
//! block is therefore partitioned: systems whose read mask is disjoint from
//! the union of all write masks run concurrently with the writer blocks;
//! the rest run after every writer block has completed. Pure readers cannot
//! affect component values, so parallel and sequential ticks still converge
//! to the same state. Block structure as seen through [`Scheduler::block`]
//! is unaffected.

use std::fmt;

use rayon::prelude::*;

use crate::engine::systems::{
    ChunkSystem, ChunkSystemProxy, System, SystemProxy, SystemRef,
};
use crate::engine::types::Mask;
use crate::engine::world::World;

/// A set of systems sharing write access, executed sequentially.
pub struct ExecutionBlock {
    write_mask: Mask,
    systems: Vec<Box<dyn SystemRef>>,
}

impl ExecutionBlock {
    /// Combined write mask of the block's systems.
    #[inline]
    pub fn write_mask(&self) -> Mask {
        self.write_mask
    }

    /// Number of systems in the block.
    #[inline]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if the block holds no systems.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Names of the systems in insertion order.
    pub fn system_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.systems.iter().map(|system| system.name())
    }

    fn exec(&self, world: &World) {
        for system in &self.systems {
            system.invoke(world);
        }
    }

    fn exec_sequential(&self, world: &World) {
        for system in &self.systems {
            system.invoke_sequential(world);
        }
    }
}

/// Packs systems into execution blocks and runs them.
pub struct Scheduler {
    blocks: Vec<ExecutionBlock>,
    count: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates a scheduler with the reserved read-only block.
    pub fn new() -> Self {
        Self {
            blocks: vec![ExecutionBlock {
                write_mask: 0,
                systems: Vec::new(),
            }],
            count: 0,
        }
    }

    /// Number of registered systems.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no systems are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of execution blocks, including the read-only block.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The block at `index`. Block 0 is the read-only block.
    #[inline]
    pub fn block(&self, index: usize) -> &ExecutionBlock {
        &self.blocks[index]
    }

    /// Registers a per-entity system.
    pub fn add_system<S: System>(&mut self, system: S) {
        self.insert(Box::new(SystemProxy(system)));
    }

    /// Registers a per-chunk system.
    pub fn add_chunk_system<S: ChunkSystem>(&mut self, system: S) {
        self.insert(Box::new(ChunkSystemProxy(system)));
    }

    /// Inserts a type-erased system, merging blocks whose write masks its
    /// own overlaps.
    pub fn insert(&mut self, system: Box<dyn SystemRef>) {
        self.count += 1;
        let meta = system.meta();

        if meta.write_mask == 0 {
            log::trace!("scheduler: {} joins the read-only block", system.name());
            self.blocks[0].systems.push(system);
            return;
        }

        let mut target: Option<usize> = None;
        let mut index = 1;
        while index < self.blocks.len() {
            if self.blocks[index].write_mask & meta.write_mask == 0 {
                index += 1;
                continue;
            }
            match target {
                None => {
                    target = Some(index);
                    index += 1;
                }
                Some(target_index) => {
                    // A second overlap means the new system bridges two
                    // previously independent blocks; fuse them.
                    let merged = self.blocks.remove(index);
                    let target_block = &mut self.blocks[target_index];
                    log::trace!(
                        "scheduler: merging block {:#018x} into {:#018x}",
                        merged.write_mask,
                        target_block.write_mask
                    );
                    target_block.write_mask |= merged.write_mask;
                    target_block.systems.extend(merged.systems);
                }
            }
        }

        match target {
            Some(target_index) => {
                let block = &mut self.blocks[target_index];
                block.write_mask |= meta.write_mask;
                block.systems.push(system);
            }
            None => {
                log::trace!(
                    "scheduler: new block {:#018x} for {}",
                    meta.write_mask,
                    system.name()
                );
                self.blocks.push(ExecutionBlock {
                    write_mask: meta.write_mask,
                    systems: vec![system],
                });
            }
        }
    }

    /// Runs every block in parallel over `world`.
    ///
    /// Writer blocks and non-conflicting readers execute concurrently on
    /// the worker pool; readers whose read mask overlaps some writer block
    /// run after all writers complete.
    pub fn exec(&self, world: &World) {
        enum Unit<'s> {
            Block(&'s ExecutionBlock),
            ReadOnly(&'s dyn SystemRef),
        }

        let written: Mask = self.blocks[1..]
            .iter()
            .fold(0, |mask, block| mask | block.write_mask);

        let mut units: Vec<Unit<'_>> = Vec::with_capacity(self.blocks.len());
        let mut deferred: Vec<&dyn SystemRef> = Vec::new();
        for system in &self.blocks[0].systems {
            if system.meta().read_mask & written == 0 {
                units.push(Unit::ReadOnly(system.as_ref()));
            } else {
                deferred.push(system.as_ref());
            }
        }
        for block in &self.blocks[1..] {
            units.push(Unit::Block(block));
        }

        units.par_iter().for_each(|unit| match unit {
            Unit::Block(block) => block.exec(world),
            Unit::ReadOnly(system) => system.invoke(world),
        });

        deferred.par_iter().for_each(|system| system.invoke(world));
    }

    /// Runs every block in order, each system's query sequentially.
    ///
    /// The read-only block runs first, then writer blocks in creation
    /// order; within a block, systems run in insertion order. Used for
    /// deterministic ticks and tests.
    pub fn exec_sequential(&self, world: &World) {
        for block in &self.blocks {
            block.exec_sequential(world);
        }
    }
}

impl fmt::Display for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==== execution blocks ====")?;
        for (index, block) in self.blocks.iter().enumerate() {
            writeln!(
                f,
                "block {} (write mask {:#018x}):",
                index, block.write_mask
            )?;
            for name in block.system_names() {
                writeln!(f, "  {name}")?;
            }
        }
        Ok(())
    }
}
