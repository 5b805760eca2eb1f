//! Timeline events - discrete input transitions recorded against a session clock

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Logical input control name (e.g. "Jump"), independent of the physical key
pub type ControlId = String;

/// Direction of a discrete input transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    Pressed,
    Released,
}

impl Transition {
    /// Held state a control is left in after this transition
    pub fn held(self) -> bool {
        matches!(self, Transition::Pressed)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Pressed => write!(f, "Pressed"),
            Transition::Released => write!(f, "Released"),
        }
    }
}

/// One recorded input transition
///
/// `timestamp` is in seconds relative to the start of the recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub control: ControlId,
    pub transition: Transition,
    pub timestamp: f64,
}

impl TimelineEvent {
    pub fn new(control: impl Into<ControlId>, transition: Transition, timestamp: f64) -> Self {
        Self {
            control: control.into(),
            transition,
            timestamp,
        }
    }

    pub fn pressed(control: impl Into<ControlId>, timestamp: f64) -> Self {
        Self::new(control, Transition::Pressed, timestamp)
    }

    pub fn released(control: impl Into<ControlId>, timestamp: f64) -> Self {
        Self::new(control, Transition::Released, timestamp)
    }
}

/// A place where a timeline breaks Pressed/Released alternation for a control
#[derive(Debug, Clone, PartialEq)]
pub struct AlternationIssue {
    /// Index of the offending event in the timeline
    pub index: usize,
    pub control: ControlId,
    /// The transition that repeats the control's current state
    pub transition: Transition,
    pub timestamp: f64,
}

impl fmt::Display for AlternationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "event #{} '{}' {} at {:.3}s repeats the control's current state",
            self.index, self.control, self.transition, self.timestamp
        )
    }
}

/// Report every event that does not alternate with the previous one for its control.
///
/// Controls start released, so a leading `Released` is also reported. Playback
/// tolerates these (a repeated transition leaves the held state unchanged);
/// this is a diagnostic only.
pub fn check_alternation(events: &[TimelineEvent]) -> Vec<AlternationIssue> {
    let mut held: HashMap<&str, bool> = HashMap::new();
    let mut issues = Vec::new();

    for (index, event) in events.iter().enumerate() {
        let current = held.entry(event.control.as_str()).or_insert(false);
        if *current == event.transition.held() {
            issues.push(AlternationIssue {
                index,
                control: event.control.clone(),
                transition: event.transition,
                timestamp: event.timestamp,
            });
        }
        *current = event.transition.held();
    }

    issues
}

/// Whether timestamps never decrease across the timeline
pub fn is_time_ordered(events: &[TimelineEvent]) -> bool {
    events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternating_timeline_has_no_issues() {
        let events = vec![
            TimelineEvent::pressed("Jump", 0.1),
            TimelineEvent::pressed("MoveLeft", 0.2),
            TimelineEvent::released("Jump", 0.3),
            TimelineEvent::released("MoveLeft", 0.4),
            TimelineEvent::pressed("Jump", 0.5),
        ];
        assert!(check_alternation(&events).is_empty());
        assert!(is_time_ordered(&events));
    }

    #[test]
    fn test_double_press_is_reported() {
        let events = vec![
            TimelineEvent::pressed("Jump", 0.1),
            TimelineEvent::pressed("Jump", 0.2),
            TimelineEvent::released("Jump", 0.3),
        ];
        let issues = check_alternation(&events);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].index, 1);
        assert_eq!(issues[0].transition, Transition::Pressed);
    }

    #[test]
    fn test_leading_release_is_reported() {
        let events = vec![TimelineEvent::released("Jump", 0.0)];
        let issues = check_alternation(&events);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].control, "Jump");
    }

    #[test]
    fn test_out_of_order_timestamps() {
        let events = vec![
            TimelineEvent::pressed("Jump", 0.5),
            TimelineEvent::released("Jump", 0.2),
        ];
        assert!(!is_time_ordered(&events));
    }
}
