//! Rewind - deterministic record-and-replay testing for fixed-step simulations
//!
//! Record a live session (starting snapshot, input transitions, sampled property
//! expectations) into a scenario, then replay it headless or in-app and check
//! the simulation reproduces the recorded state at the recorded times.

pub mod constants;
pub mod context;
pub mod input;
pub mod scene;
pub mod settings;
pub mod testing;
pub mod timeline;

// Re-export commonly used types for convenience
pub use constants::*;
pub use context::{SimulationContext, step_simulation};
pub use input::{ControlBank, ControlState, InputSource, LiveInput, VirtualInput, capture_live_input};
pub use scene::{
    CodecError, ComponentKind, Inspect, Member, SandboxCodec, SandboxEntity, SandboxScene, Scene,
    SceneCodec, SceneEntity,
};
pub use settings::{HarnessSettings, KeyBinding, SETTINGS_FILE};
pub use testing::{
    AssertionOutcome, AssertionSet, ExpectedProperty, JsonScenarioStore, MemoryScenarioStore,
    OutcomeStatus, Recorder, ReplayHarnessPlugin, RunOrchestrator, RunResult, RunSummary,
    Scenario, ScenarioLibrary, ScenarioStatus, ScenarioStore, Value,
};
pub use timeline::{ControlId, TimelineEvent, Transition, check_alternation};
