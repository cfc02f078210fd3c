mod common;

use std::sync::atomic::{AtomicU32, Ordering};

use common::*;
use strata_ecs::prelude::*;

#[test]
fn for_each_visits_every_matching_entity() {
    let mut world = World::new();
    world.batch::<(Pos, Vel)>(10);
    world.batch::<(Pos,)>(5);
    world.batch::<(Vel, Name)>(3);

    let visited = AtomicU32::new(0);
    world.for_each::<(Read<Pos>,)>(|(_pos,)| {
        visited.fetch_add(1, Ordering::Relaxed);
    });
    assert_eq!(visited.load(Ordering::Relaxed), 15);

    let visited = AtomicU32::new(0);
    world.for_each::<(Read<Pos>, Read<Vel>)>(|(_pos, _vel)| {
        visited.fetch_add(1, Ordering::Relaxed);
    });
    assert_eq!(visited.load(Ordering::Relaxed), 10);
}

#[test]
fn for_each_mutations_are_visible_through_get() {
    let mut world = World::new();
    let entities = world.batch::<(Pos, Vel)>(100);
    for &entity in &entities {
        world.set(entity, Vel { x: 2.0, y: 1.0 }).unwrap();
    }

    world.for_each::<(Write<Pos>, Read<Vel>)>(|(pos, vel)| {
        pos.x += vel.x;
        pos.y += vel.y;
    });

    for &entity in &entities {
        assert_eq!(*world.get::<Pos>(entity).unwrap(), Pos { x: 2.0, y: 1.0 });
    }
}

#[test]
fn entity_parameter_yields_the_row_owner() {
    let mut world = World::new();
    let entities = world.batch::<(Pos,)>(25);
    for (i, &entity) in entities.iter().enumerate() {
        world
            .set(
                entity,
                Pos {
                    x: i as f32,
                    y: 0.0,
                },
            )
            .unwrap();
    }

    world.for_each::<(Entity, Read<Pos>)>(|(entity, pos)| {
        let index = entities
            .iter()
            .position(|&candidate| candidate == entity)
            .expect("query yielded an unknown entity");
        assert_eq!(pos.x, index as f32);
    });
}

#[test]
fn sequential_iteration_visits_rows_in_ascending_order() {
    let mut world = World::new();
    let entities = world.batch::<(Pos,)>(50);
    for (i, &entity) in entities.iter().enumerate() {
        world
            .set(
                entity,
                Pos {
                    x: i as f32,
                    y: 0.0,
                },
            )
            .unwrap();
    }

    let mut seen = Vec::new();
    world.for_each_sequential::<(Read<Pos>,)>(|(pos,)| seen.push(pos.x));
    assert_eq!(seen, (0..50).map(|i| i as f32).collect::<Vec<_>>());
}

#[test]
fn view_iteration_mutates_through_the_view() {
    let mut world = World::new();
    let entities = world.batch::<(Pos, Vel)>(10);
    for (i, &entity) in entities.iter().enumerate() {
        world
            .set(
                entity,
                Pos {
                    x: i as f32,
                    y: 0.0,
                },
            )
            .unwrap();
    }

    world.for_each_chunk_sequential::<(Write<Pos>, Read<Vel>)>(|view| {
        for (pos, _vel) in &view {
            pos.x += 20.0;
        }
    });

    for (i, &entity) in entities.iter().enumerate() {
        assert_eq!(world.get::<Pos>(entity).unwrap().x, 20.0 + i as f32);
    }
}

#[test]
fn view_exposes_rows_entities_and_random_access() {
    let mut world = World::new();
    let entities = world.batch::<(Pos, Name)>(8);

    world.for_each_chunk_sequential::<(Read<Pos>,)>(|view| {
        assert_eq!(view.len(), 8);
        for row in 0..view.len() {
            let entity = view.entity(row);
            assert!(entities.contains(&entity));
            let _name: &Name = view.get::<Name>(row);
            let _pos: &Pos = view.get::<Pos>(row);
        }
    });
}

#[test]
fn query_matches_superset_archetypes_only() {
    let mut world = World::new();
    world.batch::<(Pos, Vel, Name)>(4);
    world.batch::<(Pos, Vel)>(4);
    world.batch::<(Name,)>(4);

    let visited = AtomicU32::new(0);
    world.for_each::<(Read<Pos>, Read<Vel>)>(|_| {
        visited.fetch_add(1, Ordering::Relaxed);
    });
    // Both pos+vel archetypes match; the name-only one does not.
    assert_eq!(visited.load(Ordering::Relaxed), 8);

    let visited = AtomicU32::new(0);
    world.for_each::<(Read<Name>,)>(|_| {
        visited.fetch_add(1, Ordering::Relaxed);
    });
    assert_eq!(visited.load(Ordering::Relaxed), 8);
}

#[test]
fn parallel_and_sequential_iteration_agree() {
    let mut world = World::new();
    let archetype = Archetype::of::<(Pos, Vel)>();
    let per_chunk = (strata_ecs::CHUNK_SIZE / archetype.size()) as u32;
    // Enough entities to spread across several chunks.
    let entities = world.batch_from(per_chunk * 3 + 17, &archetype);
    for (i, &entity) in entities.iter().enumerate() {
        world
            .set(
                entity,
                Vel {
                    x: (i % 7) as f32,
                    y: 0.0,
                },
            )
            .unwrap();
    }

    world.for_each::<(Write<Pos>, Read<Vel>)>(|(pos, vel)| {
        pos.x += vel.x;
    });

    let mut expected = std::collections::HashMap::new();
    for (i, &entity) in entities.iter().enumerate() {
        expected.insert(entity, (i % 7) as f32);
    }
    world.for_each_sequential::<(Entity, Read<Pos>)>(|(entity, pos)| {
        assert_eq!(pos.x, expected[&entity]);
    });
}
