#![allow(dead_code)]

use strata_ecs::prelude::*;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pos {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vel {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Name(pub String);

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeltaTime {
    pub value: f32,
}

pub fn spawn_moving(world: &mut World, n: u32) -> Vec<Entity> {
    world.batch::<(Pos, Vel, Name)>(n)
}
