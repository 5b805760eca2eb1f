//! Scheduled property expectations and their evaluation

use serde::{Deserialize, Serialize};
use std::fmt;

use super::compare::compare;
use super::resolver::resolve;
use super::value::Value;
use crate::constants::DEFAULT_TOLERANCE;
use crate::scene::Scene;

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

/// One expected value at a property path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedProperty {
    pub path: String,
    pub expected_value: Value,
    /// Type tag of the value at capture time (see [`super::ValueKind`])
    pub declared_type: String,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl ExpectedProperty {
    pub fn new(path: impl Into<String>, expected_value: Value) -> Self {
        Self {
            path: path.into(),
            declared_type: expected_value.kind().to_string(),
            expected_value,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Expectations due together at one point on the scenario clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionSet {
    /// Seconds since the scenario started
    pub timestamp: f64,
    #[serde(default)]
    pub description: Option<String>,
    pub expectations: Vec<ExpectedProperty>,
}

impl AssertionSet {
    pub fn new(timestamp: f64, expectations: Vec<ExpectedProperty>) -> Self {
        Self {
            timestamp,
            description: None,
            expectations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Pass,
    Fail,
    /// The property could not be resolved or compared
    Error,
}

/// Result of checking one expected property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionOutcome {
    pub path: String,
    pub expected_value: Value,
    /// Live value, absent when resolution failed
    pub actual_value: Option<Value>,
    pub status: OutcomeStatus,
    pub error_detail: Option<String>,
    /// Scenario clock when the check ran
    pub timestamp: f64,
}

impl AssertionOutcome {
    pub fn error(path: impl Into<String>, expected_value: Value, detail: String, timestamp: f64) -> Self {
        Self {
            path: path.into(),
            expected_value,
            actual_value: None,
            status: OutcomeStatus::Error,
            error_detail: Some(detail),
            timestamp,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == OutcomeStatus::Pass
    }
}

impl fmt::Display for AssertionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {} @ {:.3}s", self.status, self.path, self.timestamp)?;
        match (&self.actual_value, &self.error_detail) {
            (_, Some(detail)) => write!(f, "\n    Error: {}", detail),
            (Some(actual), None) => write!(
                f,
                "\n    Expected: {}\n    Actual: {}",
                self.expected_value, actual
            ),
            (None, None) => Ok(()),
        }
    }
}

/// Resolve and compare a single expectation
pub fn check_property(expected: &ExpectedProperty, scene: &dyn Scene, timestamp: f64) -> AssertionOutcome {
    let actual = match resolve(scene, &expected.path) {
        Ok(actual) => actual,
        Err(e) => {
            return AssertionOutcome::error(
                &expected.path,
                expected.expected_value.clone(),
                e.to_string(),
                timestamp,
            );
        }
    };

    let (status, error_detail) = match compare(&expected.expected_value, &actual, expected.tolerance) {
        Ok(true) => (OutcomeStatus::Pass, None),
        Ok(false) => (OutcomeStatus::Fail, None),
        Err(e) => (OutcomeStatus::Error, Some(e.to_string())),
    };

    AssertionOutcome {
        path: expected.path.clone(),
        expected_value: expected.expected_value.clone(),
        actual_value: Some(actual),
        status,
        error_detail,
        timestamp,
    }
}

/// Check every expectation of a set, in order.
///
/// A failing property never stops the remaining ones from being checked.
pub fn check_set(set: &AssertionSet, scene: &dyn Scene, timestamp: f64) -> Vec<AssertionOutcome> {
    set.expectations
        .iter()
        .map(|expected| check_property(expected, scene, timestamp))
        .collect()
}
