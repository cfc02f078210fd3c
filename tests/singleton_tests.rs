mod common;

use common::*;
use strata_ecs::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Runtime {
    dt: f64,
}

impl Default for Runtime {
    fn default() -> Self {
        Self { dt: 1000.0 }
    }
}

#[repr(align(64))]
struct KeyboardMapping {
    keys: [u8; 1024],
}

impl Default for KeyboardMapping {
    fn default() -> Self {
        Self { keys: [b'r'; 1024] }
    }
}

#[test]
fn registration_default_constructs_the_instance() {
    let mut world = World::new();
    world.register_singleton::<Runtime>();
    assert_eq!(world.singleton::<Runtime>().unwrap().dt, 1000.0);

    world.register_singleton::<KeyboardMapping>();
    assert_eq!(world.singleton::<KeyboardMapping>().unwrap().keys[29], b'r');
}

#[test]
fn registration_is_one_shot() {
    let mut world = World::new();
    world.register_singleton::<Runtime>();
    world.singleton_mut::<Runtime>().unwrap().dt = 1.0;

    // A second registration must not reset the instance.
    world.register_singleton::<Runtime>();
    assert_eq!(world.singleton::<Runtime>().unwrap().dt, 1.0);
}

#[test]
fn unregistered_singleton_is_an_error() {
    let world = World::new();
    assert!(matches!(
        world.singleton::<Runtime>(),
        Err(WorldError::SingletonMissing(_))
    ));
}

#[test]
fn queries_resolve_singletons_from_the_world() {
    struct Scale;
    impl System for Scale {
        type Data = (Write<Pos>, Read<Runtime>);
        fn update(&self, (pos, runtime): QueryItem<'_, Self::Data>) {
            pos.x += runtime.dt as f32;
        }
    }

    let mut world = World::new();
    world.register_singleton::<Runtime>();
    world.singleton_mut::<Runtime>().unwrap().dt = 3.0;

    // The entity's archetype carries no Runtime; the singleton satisfies
    // the parameter unconditionally.
    let entity = world.create::<(Pos, Name)>();
    world.register_system(Scale);
    world.update();

    assert_eq!(world.get::<Pos>(entity).unwrap().x, 3.0);
}

#[test]
fn views_resolve_singletons_from_the_world() {
    let mut world = World::new();
    world.register_singleton::<Runtime>();
    world.singleton_mut::<Runtime>().unwrap().dt = 7.0;
    world.batch::<(Pos,)>(4);

    world.for_each_chunk_sequential::<(Read<Pos>,)>(|view| {
        assert_eq!(view.len(), 4);
        let runtime: &Runtime = view.get::<Runtime>(0);
        assert_eq!(runtime.dt, 7.0);
    });
}

#[test]
fn singleton_components_do_not_join_archetypes() {
    let mut world = World::new();
    world.register_singleton::<Runtime>();

    let entity = world.create::<(Pos,)>();
    // The singleton is world state, not entity state.
    assert!(!world.has::<(Runtime,)>(entity).unwrap());
    assert_eq!(world.chunk_roots().len(), 1);
}
