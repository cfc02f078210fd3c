mod common;

use common::*;
use strata_ecs::prelude::*;
use strata_ecs::{EntityLocation, EntityManager};

#[test]
fn generation_recycling() {
    let mut world = World::new();

    let first = world.create::<(Pos,)>();
    assert!(world.exists(first));
    world.destroy(first);
    assert!(!world.exists(first));

    let second = world.create::<(Pos,)>();
    // The index slot is reused with a bumped generation, so the old id
    // stays dead forever.
    assert_eq!(first.index(), second.index());
    assert_eq!(second.generation(), first.generation() + 1);
    assert!(!world.exists(first));
    assert!(world.exists(second));
}

#[test]
fn id_layout_packs_generation_high() {
    let entity = Entity::new(7, 3);
    assert_eq!(entity.index(), 7);
    assert_eq!(entity.generation(), 3);
    assert_eq!(entity.0, (3u64 << 32) | 7);
}

#[test]
fn destroying_one_entity_never_invalidates_others() {
    let mut world = World::new();
    let entities = world.batch::<(Pos, Vel)>(64);

    for &victim in entities.iter().rev() {
        world.destroy(victim);
        for &other in &entities {
            if other == victim || !world.exists(other) {
                continue;
            }
            assert!(world.get::<Pos>(other).is_ok());
        }
    }
    assert_eq!(world.len(), 0);
}

#[test]
fn manager_freelist_reuses_most_recent_slot_first() {
    let mut manager = EntityManager::default();
    let a = manager.create(EntityLocation::default());
    let b = manager.create(EntityLocation::default());
    let c = manager.create(EntityLocation::default());
    assert_eq!(manager.len(), 3);

    manager.remove(b);
    manager.remove(a);
    assert_eq!(manager.len(), 1);

    // Freed indices come back LIFO, each with a bumped generation.
    let d = manager.create(EntityLocation::default());
    assert_eq!(d.index(), a.index());
    assert_eq!(d.generation(), 1);
    let e = manager.create(EntityLocation::default());
    assert_eq!(e.index(), b.index());
    assert_eq!(e.generation(), 1);

    assert!(manager.exists(c));
    assert!(!manager.exists(a));
    assert!(!manager.exists(b));
}

#[test]
fn manager_dense_arrays_survive_interleaved_removal() {
    let mut manager = EntityManager::default();
    let mut entities = Vec::new();
    for i in 0..16u32 {
        entities.push(manager.create(EntityLocation {
            root: 0,
            chunk: 0,
            row: i,
        }));
    }

    // Remove from the middle so the dense tail swap and the handle
    // back-pointer repair both run.
    for &entity in entities.iter().skip(2).step_by(3) {
        manager.remove(entity);
    }

    for (i, &entity) in entities.iter().enumerate() {
        let expected_removed = i >= 2 && (i - 2) % 3 == 0;
        assert_eq!(manager.exists(entity), !expected_removed);
        if !expected_removed {
            assert_eq!(manager.get(entity).unwrap().row, i as u32);
        } else {
            assert!(manager.get(entity).is_none());
        }
    }
}

#[test]
fn manager_update_rewrites_location_in_place() {
    let mut manager = EntityManager::default();
    let entity = manager.create(EntityLocation::default());

    manager.update(
        entity,
        EntityLocation {
            root: 1,
            chunk: 2,
            row: 3,
        },
    );
    let location = manager.get(entity).unwrap();
    assert_eq!((location.root, location.chunk, location.row), (1, 2, 3));

    // Stale handles are ignored.
    manager.remove(entity);
    manager.update(entity, EntityLocation::default());
    assert!(manager.get(entity).is_none());
}

#[test]
fn exists_tracks_the_full_lifecycle() {
    let mut world = World::new();
    let entity = world.create::<(Pos, Vel, Name)>();
    assert!(world.exists(entity));

    world.remove::<(Name,)>(entity).unwrap();
    assert!(world.exists(entity), "migration must not invalidate the id");

    world.destroy(entity);
    assert!(!world.exists(entity));
}
