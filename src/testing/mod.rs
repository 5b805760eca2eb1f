//! Record-and-replay testing
//!
//! Recording captures a scene snapshot, the input timeline and scheduled
//! property expectations into a [`Scenario`]; running replays scenarios
//! against restored snapshots and reports per-property outcomes.

pub mod assertions;
pub mod compare;
pub mod plugin;
pub mod recorder;
pub mod resolver;
pub mod runner;
pub mod scenario;
pub mod storage;
pub mod value;

pub use assertions::{
    AssertionOutcome, AssertionSet, ExpectedProperty, OutcomeStatus, check_property, check_set,
};
pub use compare::{ComparisonError, compare};
pub use plugin::ReplayHarnessPlugin;
pub use recorder::{CaptureError, Recorder, default_capture_paths, unique_session_name};
pub use resolver::{PathError, PropertyPath, RootSelector, resolve};
pub use runner::{RunError, RunOrchestrator, RunResult, RunState, RunSummary, ScenarioStatus};
pub use scenario::Scenario;
pub use storage::{
    JsonScenarioStore, MemoryScenarioStore, ScenarioLibrary, ScenarioStore, StorageError,
};
pub use value::{Value, ValueKind};
