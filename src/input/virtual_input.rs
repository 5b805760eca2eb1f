//! Replay-driven input source

use std::any::Any;

use super::{ControlBank, ControlState, InputSource};
use crate::constants::TIME_EPSILON;
use crate::timeline::{ControlId, TimelineEvent};

/// Plays a recorded timeline back against a simulated clock.
///
/// Outcome depends only on cumulative elapsed time: however `advance` calls are
/// chunked, every event whose timestamp has passed is applied in recorded order.
#[derive(Debug, Clone)]
pub struct VirtualInput {
    events: Vec<TimelineEvent>,
    /// Index of the next unconsumed event
    cursor: usize,
    clock: f64,
    active: bool,
    bank: ControlBank,
}

impl VirtualInput {
    /// Build from a timeline and the full control set of the recording.
    ///
    /// Controls that never transition still resolve, as released.
    pub fn new<I, S>(events: Vec<TimelineEvent>, controls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ControlId>,
    {
        let mut bank = ControlBank::new(controls);
        for event in &events {
            bank.declare(event.control.clone());
        }

        Self {
            events,
            cursor: 0,
            clock: 0.0,
            active: false,
            bank,
        }
    }

    /// Reset the clock to `at_time`, rewind to the first event and begin playback
    pub fn start(&mut self, at_time: f64) {
        self.clock = at_time;
        self.cursor = 0;
        self.bank.reset();
        self.active = true;
    }

    /// True once every event has been applied
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.events.len()
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Number of events applied so far
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl InputSource for VirtualInput {
    fn query(&self, control: &str) -> ControlState {
        self.bank.query(control)
    }

    fn list_controls(&self) -> Vec<ControlId> {
        self.bank.names()
    }

    fn advance(&mut self, dt: f64) {
        if !self.active {
            return;
        }

        self.clock += dt;
        while let Some(event) = self.events.get(self.cursor) {
            if event.timestamp > self.clock + TIME_EPSILON {
                break;
            }
            self.bank.set_held(&event.control, event.transition.held());
            self.cursor += 1;
        }

        self.bank.latch();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
