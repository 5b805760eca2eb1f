//! The live scene / input pair the simulation steps against

use bevy::prelude::*;

use crate::input::InputSource;
use crate::scene::Scene;

/// Current live scene and input source.
///
/// A scenario run swaps both fields for its replay scene and virtual input and
/// puts the originals back when the run queue drains.
#[derive(Resource)]
pub struct SimulationContext {
    pub scene: Box<dyn Scene>,
    pub input: Box<dyn InputSource>,
}

impl SimulationContext {
    pub fn new(scene: Box<dyn Scene>, input: Box<dyn InputSource>) -> Self {
        Self { scene, input }
    }

    /// Advance input by `dt`, then step the scene with that input
    pub fn step(&mut self, dt: f64) {
        self.input.advance(dt);
        self.scene.step(dt, &*self.input);
    }
}

/// Fixed-step system driving [`SimulationContext::step`]
pub fn step_simulation(time: Res<Time>, mut context: ResMut<SimulationContext>) {
    context.step(time.delta_secs_f64());
}
