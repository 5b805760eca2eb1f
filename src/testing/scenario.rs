//! Recorded scenario - starting snapshot, input timeline and scheduled assertions

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::assertions::AssertionSet;
use crate::constants::SCENARIO_FORMAT_VERSION;
use crate::timeline::{ControlId, TimelineEvent, is_time_ordered};

fn default_version() -> u32 {
    SCENARIO_FORMAT_VERSION
}

/// Everything needed to replay one recorded session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_version")]
    pub version: u32,
    pub name: String,
    pub duration_seconds: f64,
    /// Serialized starting state (see [`crate::scene::SceneCodec`])
    pub snapshot: String,
    #[serde(default)]
    pub timeline_events: Vec<TimelineEvent>,
    /// Every control that existed while recording, triggered or not
    #[serde(default)]
    pub control_names: BTreeSet<ControlId>,
    #[serde(default)]
    pub assertion_sets: Vec<AssertionSet>,
    #[serde(default)]
    pub recorded_at_unix_millis: i64,
}

impl Scenario {
    pub fn new(name: impl Into<String>, snapshot: impl Into<String>, duration_seconds: f64) -> Self {
        Self {
            version: SCENARIO_FORMAT_VERSION,
            name: name.into(),
            duration_seconds,
            snapshot: snapshot.into(),
            timeline_events: Vec::new(),
            control_names: BTreeSet::new(),
            assertion_sets: Vec::new(),
            recorded_at_unix_millis: 0,
        }
    }

    /// Total number of expected properties across all sets
    pub fn expectation_count(&self) -> usize {
        self.assertion_sets.iter().map(|s| s.expectations.len()).sum()
    }

    /// Whether neither the timeline nor the assertion sets go back in time.
    /// Playback consumes both in stored order.
    pub fn is_time_ordered(&self) -> bool {
        is_time_ordered(&self.timeline_events)
            && self
                .assertion_sets
                .windows(2)
                .all(|w| w[0].timestamp <= w[1].timestamp)
    }
}
