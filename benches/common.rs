#![allow(dead_code)]

use strata_ecs::prelude::*;

pub const AGENTS_SMALL: u32 = 10_000;
pub const AGENTS_MED: u32 = 100_000;
pub const AGENTS_LARGE: u32 = 1_000_000;

#[derive(Clone, Copy, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Default)]
pub struct Wealth {
    pub value: f32,
}

#[derive(Clone, Copy, Default)]
pub struct Productivity {
    pub rate: f32,
}

pub fn populate(world: &mut World, n: u32) -> Vec<Entity> {
    let entities = world.batch::<(Position, Velocity, Wealth, Productivity)>(n);
    for (i, &entity) in entities.iter().enumerate() {
        world
            .set(
                entity,
                Velocity {
                    x: (i % 7) as f32,
                    y: (i % 3) as f32,
                },
            )
            .unwrap();
        world
            .set(
                entity,
                Productivity {
                    rate: 0.01 * (i % 10) as f32,
                },
            )
            .unwrap();
    }
    entities
}
