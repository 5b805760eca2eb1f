//! Scenario run orchestration
//!
//! Scenarios run one at a time from a FIFO queue. Starting a scenario swaps the
//! live scene/input in [`SimulationContext`] for the scenario's restored
//! snapshot and a [`VirtualInput`] fed by its timeline; `tick` evaluates due
//! assertion sets against a per-scenario timer. When the queue drains the
//! original live pair is put back.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use thiserror::Error;

use super::assertions::{AssertionOutcome, OutcomeStatus, check_set};
use super::scenario::Scenario;
use super::storage::ScenarioStore;
use super::value::Value;
use crate::constants::*;
use crate::context::SimulationContext;
use crate::input::{InputSource, VirtualInput};
use crate::scene::{Scene, SceneCodec};
use crate::timeline::check_alternation;

/// Summary status of one finished scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioStatus {
    /// Every outcome passed
    Completed,
    /// At least one Fail, no Error
    Failed,
    /// At least one Error
    Error,
}

impl ScenarioStatus {
    pub fn from_outcomes(outcomes: &[AssertionOutcome]) -> Self {
        if outcomes.iter().any(|o| o.status == OutcomeStatus::Error) {
            ScenarioStatus::Error
        } else if outcomes.iter().any(|o| o.status == OutcomeStatus::Fail) {
            ScenarioStatus::Failed
        } else {
            ScenarioStatus::Completed
        }
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStatus::Completed => write!(f, "PASS"),
            ScenarioStatus::Failed => write!(f, "FAIL"),
            ScenarioStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of one finished scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub scenario_name: String,
    pub outcomes: Vec<AssertionOutcome>,
    pub status: ScenarioStatus,
    /// Simulated seconds the scenario ran for
    pub elapsed_seconds: f64,
}

impl RunResult {
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }
}

/// Counts over a result log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub scenarios: usize,
    pub completed: usize,
    pub failed: usize,
    pub errored: usize,
    pub outcomes: usize,
    pub passed_outcomes: usize,
}

impl RunSummary {
    pub fn from_results(results: &[RunResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.scenarios += 1;
            match result.status {
                ScenarioStatus::Completed => summary.completed += 1,
                ScenarioStatus::Failed => summary.failed += 1,
                ScenarioStatus::Error => summary.errored += 1,
            }
            summary.outcomes += result.outcomes.len();
            summary.passed_outcomes += result.passed_count();
        }
        summary
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("a scenario run is already in progress")]
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
}

/// The live scene/input pair held while replays are installed
struct SavedLive {
    scene: Box<dyn Scene>,
    input: Box<dyn InputSource>,
}

/// Queue-driven scenario runner
#[derive(Resource)]
pub struct RunOrchestrator {
    codec: Box<dyn SceneCodec>,
    /// Head is the scenario currently running
    queue: VecDeque<Scenario>,
    state: RunState,
    /// Simulated seconds since the current scenario started
    timer: f64,
    /// Index of the next assertion set to evaluate
    next_set: usize,
    current_outcomes: Vec<AssertionOutcome>,
    /// Every outcome of the current run, across scenarios
    outcome_log: Vec<AssertionOutcome>,
    results: Vec<RunResult>,
    saved: Option<SavedLive>,
}

impl RunOrchestrator {
    pub fn new(codec: Box<dyn SceneCodec>) -> Self {
        Self {
            codec,
            queue: VecDeque::new(),
            state: RunState::Idle,
            timer: 0.0,
            next_set: 0,
            current_outcomes: Vec::new(),
            outcome_log: Vec::new(),
            results: Vec::new(),
            saved: None,
        }
    }

    pub fn codec(&self) -> &dyn SceneCodec {
        self.codec.as_ref()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// True while scenarios remain queued
    pub fn is_running(&self) -> bool {
        self.state == RunState::Running || !self.queue.is_empty()
    }

    /// Name of the scenario currently installed
    pub fn current_scenario(&self) -> Option<&str> {
        match self.state {
            RunState::Running => self.queue.front().map(|s| s.name.as_str()),
            RunState::Idle => None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn timer(&self) -> f64 {
        self.timer
    }

    /// Finished scenarios of the current (or last) run
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }

    /// Every outcome of the current (or last) run, in evaluation order
    pub fn outcome_log(&self) -> &[AssertionOutcome] {
        &self.outcome_log
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_results(&self.results)
    }

    /// Queue every scenario `store` holds and start the first one.
    ///
    /// An empty or unreadable store is logged and leaves the orchestrator idle.
    pub fn enqueue_all(
        &mut self,
        store: &dyn ScenarioStore,
        context: &mut SimulationContext,
    ) -> Result<usize, RunError> {
        if self.is_running() {
            warn!("Scenario run requested while one is in progress");
            return Err(RunError::AlreadyRunning);
        }

        match store.load_all() {
            Ok(scenarios) => self.run_scenarios(scenarios, context),
            Err(e) => {
                warn!("No scenarios loaded: {}", e);
                Ok(0)
            }
        }
    }

    /// Queue `scenarios` and start the first one
    pub fn run_scenarios(
        &mut self,
        scenarios: Vec<Scenario>,
        context: &mut SimulationContext,
    ) -> Result<usize, RunError> {
        if self.is_running() {
            warn!("Scenario run requested while one is in progress");
            return Err(RunError::AlreadyRunning);
        }
        if scenarios.is_empty() {
            info!("No scenarios to run");
            return Ok(0);
        }

        let count = scenarios.len();
        self.results.clear();
        self.outcome_log.clear();
        self.queue = scenarios.into();
        info!("Running {} scenario(s)", count);

        self.start_current(context);
        Ok(count)
    }

    /// Install the head scenario.
    ///
    /// Scenarios whose snapshot cannot be restored finish immediately with an
    /// Error result. Restores the live pair once nothing is left to start.
    fn start_current(&mut self, context: &mut SimulationContext) {
        if self.state == RunState::Running {
            return;
        }

        while let Some(scenario) = self.queue.front() {
            self.timer = 0.0;
            self.next_set = 0;
            self.current_outcomes.clear();

            match self.codec.deserialize(&scenario.snapshot) {
                Ok(scene) => {
                    for issue in check_alternation(&scenario.timeline_events) {
                        warn!("Scenario '{}': {}", scenario.name, issue);
                    }
                    if !scenario.is_time_ordered() {
                        warn!(
                            "Scenario '{}': timestamps are not in order, later entries may fire early",
                            scenario.name
                        );
                    }
                    let mut input = VirtualInput::new(
                        scenario.timeline_events.clone(),
                        scenario.control_names.iter().cloned(),
                    );
                    input.start(0.0);
                    info!(
                        "Scenario '{}' started: {:.2}s, {} events, {} assertion sets",
                        scenario.name,
                        scenario.duration_seconds,
                        scenario.timeline_events.len(),
                        scenario.assertion_sets.len()
                    );

                    self.install(context, scene, Box::new(input));
                    self.state = RunState::Running;
                    return;
                }
                Err(e) => {
                    error!("Scenario '{}': cannot restore snapshot: {}", scenario.name, e);
                    let outcome =
                        AssertionOutcome::error(SNAPSHOT_PATH, Value::Null, e.to_string(), 0.0);
                    self.outcome_log.push(outcome.clone());
                    self.current_outcomes.push(outcome);
                    self.finish_current();
                }
            }
        }

        self.restore(context);
    }

    /// Advance the current scenario by `dt`, evaluating every assertion set that
    /// has come due, then finish the scenario once its duration has elapsed.
    pub fn tick(&mut self, context: &mut SimulationContext, dt: f64) {
        if self.state != RunState::Running {
            return;
        }
        self.timer += dt;

        let Some(scenario) = self.queue.front() else {
            self.state = RunState::Idle;
            return;
        };

        while let Some(set) = scenario.assertion_sets.get(self.next_set) {
            if set.timestamp > self.timer + TIME_EPSILON {
                break;
            }
            for outcome in check_set(set, context.scene.as_ref(), self.timer) {
                match outcome.status {
                    OutcomeStatus::Pass => debug!("{}", outcome),
                    OutcomeStatus::Fail | OutcomeStatus::Error => {
                        warn!("Scenario '{}': {}", scenario.name, outcome)
                    }
                }
                self.outcome_log.push(outcome.clone());
                self.current_outcomes.push(outcome);
            }
            self.next_set += 1;
        }

        if self.timer + TIME_EPSILON >= scenario.duration_seconds {
            self.finish_current();
            self.state = RunState::Idle;
            self.start_current(context);
        }
    }

    /// Abandon the queue and put the live pair back
    pub fn cancel(&mut self, context: &mut SimulationContext) {
        if !self.is_running() {
            return;
        }
        warn!(
            "Scenario run cancelled with {} scenario(s) unfinished",
            self.queue.len()
        );
        self.queue.clear();
        self.current_outcomes.clear();
        self.state = RunState::Idle;
        self.restore(context);
    }

    /// Step `context` and tick until the queue drains, for at most `max_steps`
    /// steps of `dt`. A run that outlasts the budget is cancelled. Returns the
    /// number of steps taken.
    pub fn run_to_completion(&mut self, context: &mut SimulationContext, dt: f64, max_steps: u64) -> u64 {
        let mut steps = 0;
        while self.is_running() && steps < max_steps {
            context.step(dt);
            self.tick(context, dt);
            steps += 1;
        }

        if self.is_running() {
            error!(
                "Scenario '{}' still running after {} steps",
                self.current_scenario().unwrap_or("?"),
                steps
            );
            self.cancel(context);
        }
        steps
    }

    /// Pop the head scenario and record its result
    fn finish_current(&mut self) {
        let Some(scenario) = self.queue.pop_front() else {
            return;
        };
        let outcomes = mem::take(&mut self.current_outcomes);
        let status = ScenarioStatus::from_outcomes(&outcomes);
        let result = RunResult {
            scenario_name: scenario.name,
            status,
            elapsed_seconds: self.timer,
            outcomes,
        };

        match status {
            ScenarioStatus::Completed => info!(
                "Scenario '{}' {}: {}/{} assertions",
                result.scenario_name,
                status,
                result.passed_count(),
                result.outcomes.len()
            ),
            _ => warn!(
                "Scenario '{}' {}: {}/{} assertions",
                result.scenario_name,
                status,
                result.passed_count(),
                result.outcomes.len()
            ),
        }
        self.results.push(result);
    }

    /// Swap a replay pair into `context`, keeping the original live pair on first install
    fn install(&mut self, context: &mut SimulationContext, scene: Box<dyn Scene>, input: Box<dyn InputSource>) {
        let previous_scene = mem::replace(&mut context.scene, scene);
        let previous_input = mem::replace(&mut context.input, input);
        if self.saved.is_none() {
            self.saved = Some(SavedLive {
                scene: previous_scene,
                input: previous_input,
            });
        }
    }

    fn restore(&mut self, context: &mut SimulationContext) {
        self.state = RunState::Idle;
        if let Some(saved) = self.saved.take() {
            context.scene = saved.scene;
            context.input = saved.input;
            let summary = self.summary();
            info!(
                "Scenario run finished ({} passed, {} failed, {} errors); live state restored",
                summary.completed, summary.failed, summary.errored
            );
        }
    }
}
