//! Input module - the control-query capability shared by live and replayed input
//!
//! Game logic reads controls through [`InputSource`] and never learns whether the
//! state came from a physical device ([`LiveInput`]) or from a recorded timeline
//! ([`VirtualInput`]).

mod virtual_input;

pub use virtual_input::VirtualInput;

use bevy::prelude::*;
use std::any::Any;
use std::collections::BTreeMap;

use crate::context::SimulationContext;
use crate::settings::HarnessSettings;
use crate::timeline::ControlId;

/// Per-step view of a single control
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    /// Went from released to held during the last step
    pub is_pressed: bool,
    /// Went from held to released during the last step
    pub is_released: bool,
    /// Currently held down
    pub is_held: bool,
}

impl ControlState {
    /// Derive edges from the held state before and after a step
    pub fn from_edge(was_held: bool, is_held: bool) -> Self {
        Self {
            is_pressed: !was_held && is_held,
            is_released: was_held && !is_held,
            is_held,
        }
    }
}

/// Control-query capability consumed by game logic and the recorder
pub trait InputSource: Send + Sync {
    /// State of `control` as of the last step (unknown controls read as released)
    fn query(&self, control: &str) -> ControlState;

    /// Every control this source knows about
    fn list_controls(&self) -> Vec<ControlId>;

    /// Move the source forward by one simulation step of `dt` seconds
    fn advance(&mut self, dt: f64);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Held state plus edge detection for a set of named controls
#[derive(Debug, Clone, Default)]
pub struct ControlBank {
    controls: BTreeMap<ControlId, TrackedControl>,
}

#[derive(Debug, Clone, Copy, Default)]
struct TrackedControl {
    /// Held state written since the last latch
    held: bool,
    /// State published at the last latch
    state: ControlState,
}

impl ControlBank {
    pub fn new<I, S>(controls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ControlId>,
    {
        let mut bank = Self::default();
        for control in controls {
            bank.declare(control);
        }
        bank
    }

    /// Register a control in the released state (no-op if already known)
    pub fn declare(&mut self, control: impl Into<ControlId>) {
        self.controls.entry(control.into()).or_default();
    }

    /// Set the held state; edges become visible at the next [`ControlBank::latch`]
    pub fn set_held(&mut self, control: &str, held: bool) {
        match self.controls.get_mut(control) {
            Some(tracked) => tracked.held = held,
            None => {
                self.controls.insert(
                    control.to_string(),
                    TrackedControl {
                        held,
                        state: ControlState::default(),
                    },
                );
            }
        }
    }

    /// Publish this step's state, updating every control's edges exactly once
    pub fn latch(&mut self) {
        for tracked in self.controls.values_mut() {
            tracked.state = ControlState::from_edge(tracked.state.is_held, tracked.held);
        }
    }

    /// Return every control to released with no pending edges
    pub fn reset(&mut self) {
        for tracked in self.controls.values_mut() {
            *tracked = TrackedControl::default();
        }
    }

    pub fn query(&self, control: &str) -> ControlState {
        self.controls
            .get(control)
            .map(|tracked| tracked.state)
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<ControlId> {
        self.controls.keys().cloned().collect()
    }

    pub fn contains(&self, control: &str) -> bool {
        self.controls.contains_key(control)
    }
}

/// Input fed by physical devices
///
/// A device layer writes held state with [`LiveInput::set_held`] during a frame;
/// `advance` publishes it and derives pressed/released edges.
#[derive(Debug, Clone, Default)]
pub struct LiveInput {
    bank: ControlBank,
}

impl LiveInput {
    pub fn new<I, S>(controls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ControlId>,
    {
        Self {
            bank: ControlBank::new(controls),
        }
    }

    pub fn set_held(&mut self, control: &str, held: bool) {
        self.bank.set_held(control, held);
    }
}

impl InputSource for LiveInput {
    fn query(&self, control: &str) -> ControlState {
        self.bank.query(control)
    }

    fn list_controls(&self) -> Vec<ControlId> {
        self.bank.names()
    }

    fn advance(&mut self, _dt: f64) {
        self.bank.latch();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Copies bound keyboard state into the live input.
///
/// Does nothing while a replay input is installed, so physical keys never leak
/// into a scenario run.
pub fn capture_live_input(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    settings: Res<HarnessSettings>,
    mut context: ResMut<SimulationContext>,
) {
    let Some(keyboard) = keyboard else {
        return;
    };
    let Some(live) = context.input.as_any_mut().downcast_mut::<LiveInput>() else {
        return;
    };

    for control in settings.control_names() {
        let held = settings
            .bindings
            .iter()
            .filter(|b| b.control == control)
            .any(|b| keyboard.pressed(b.key));
        live.set_held(&control, held);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_visible_for_one_step() {
        let mut input = LiveInput::new(["Jump"]);
        input.set_held("Jump", true);
        input.advance(0.016);
        assert_eq!(
            input.query("Jump"),
            ControlState {
                is_pressed: true,
                is_released: false,
                is_held: true
            }
        );

        input.advance(0.016);
        let state = input.query("Jump");
        assert!(state.is_held);
        assert!(!state.is_pressed);

        input.set_held("Jump", false);
        input.advance(0.016);
        let state = input.query("Jump");
        assert!(state.is_released);
        assert!(!state.is_held);
    }

    #[test]
    fn test_unknown_control_reads_released() {
        let input = LiveInput::new(["Jump"]);
        assert_eq!(input.query("Crouch"), ControlState::default());
    }

    #[test]
    fn test_set_held_declares_new_controls() {
        let mut input = LiveInput::default();
        input.set_held("Fire", true);
        assert_eq!(input.list_controls(), vec!["Fire".to_string()]);
    }

    #[test]
    fn test_bank_reset_clears_state() {
        let mut bank = ControlBank::new(["Jump"]);
        bank.set_held("Jump", true);
        bank.latch();
        bank.reset();
        assert_eq!(bank.query("Jump"), ControlState::default());
        assert!(bank.contains("Jump"));
    }
}
