mod common;

use common::*;
use strata_ecs::prelude::*;
use strata_ecs::Scheduler;

struct WritesVel;
impl System for WritesVel {
    type Data = (Write<Vel>, Read<Pos>);
    fn update(&self, (vel, _pos): QueryItem<'_, Self::Data>) {
        vel.x += 1.0;
    }
}

struct ReadsAll;
impl System for ReadsAll {
    type Data = (Read<Vel>, Read<Pos>);
    fn update(&self, _item: QueryItem<'_, Self::Data>) {}
}

struct WritesBoth;
impl System for WritesBoth {
    type Data = (Write<Vel>, Write<Pos>);
    fn update(&self, _item: QueryItem<'_, Self::Data>) {}
}

struct WritesName;
impl System for WritesName {
    type Data = (Write<Name>,);
    fn update(&self, _item: QueryItem<'_, Self::Data>) {}
}

struct WritesEverything;
impl System for WritesEverything {
    type Data = (Write<Vel>, Write<Name>, Write<Pos>);
    fn update(&self, _item: QueryItem<'_, Self::Data>) {}
}

#[test]
fn block_packing_and_transitive_fusion() {
    let mut scheduler = Scheduler::new();

    scheduler.add_system(WritesVel);
    scheduler.add_system(ReadsAll);
    scheduler.add_system(WritesBoth);
    scheduler.add_system(WritesName);

    // Read-only block plus {WritesVel, WritesBoth} plus {WritesName}.
    assert_eq!(scheduler.block_count(), 3);
    assert_eq!(scheduler.block(0).len(), 1);
    assert_eq!(scheduler.block(1).len(), 2);
    assert_eq!(scheduler.block(2).len(), 1);

    // A system writing vel, name, and pos bridges the two writer blocks.
    scheduler.add_system(WritesEverything);
    assert_eq!(scheduler.block_count(), 2);
    assert_eq!(scheduler.block(0).len(), 1);
    assert_eq!(scheduler.block(1).len(), 4);
    assert_eq!(scheduler.len(), 5);
}

#[test]
fn write_masks_of_distinct_blocks_are_disjoint() {
    let mut scheduler = Scheduler::new();
    scheduler.add_system(WritesVel);
    scheduler.add_system(WritesName);
    scheduler.add_system(WritesBoth);
    scheduler.add_system(ReadsAll);

    for a in 1..scheduler.block_count() {
        for b in (a + 1)..scheduler.block_count() {
            assert_eq!(
                scheduler.block(a).write_mask() & scheduler.block(b).write_mask(),
                0,
                "blocks {a} and {b} share a written component"
            );
        }
    }
    // The read-only block never writes.
    assert_eq!(scheduler.block(0).write_mask(), 0);
}

#[test]
fn block_mask_covers_every_member_system() {
    let mut scheduler = Scheduler::new();
    scheduler.add_system(WritesVel);
    scheduler.add_system(WritesEverything);

    let vel_name_pos = Archetype::of::<(Vel, Name, Pos)>().mask();
    assert_eq!(scheduler.block_count(), 2);
    assert_eq!(scheduler.block(1).write_mask(), vel_name_pos);
}

#[test]
fn read_only_systems_share_block_zero() {
    let mut scheduler = Scheduler::new();
    scheduler.add_system(ReadsAll);
    scheduler.add_system(ReadsAll);
    scheduler.add_system(ReadsAll);

    assert_eq!(scheduler.block_count(), 1);
    assert_eq!(scheduler.block(0).len(), 3);
}

#[test]
fn scheduler_display_lists_blocks_and_systems() {
    let mut scheduler = Scheduler::new();
    scheduler.add_system(WritesVel);
    scheduler.add_system(ReadsAll);

    let plan = scheduler.to_string();
    assert!(plan.contains("block 0"));
    assert!(plan.contains("WritesVel"));
    assert!(plan.contains("ReadsAll"));
}

#[test]
fn exec_runs_every_registered_system() {
    let mut world = World::new();
    let entity = world.create::<(Pos, Vel)>();

    let mut scheduler = Scheduler::new();
    scheduler.add_system(WritesVel);
    scheduler.exec(&world);
    assert_eq!(world.get::<Vel>(entity).unwrap().x, 1.0);

    scheduler.exec_sequential(&world);
    assert_eq!(world.get::<Vel>(entity).unwrap().x, 2.0);
}
