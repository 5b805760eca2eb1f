//! Bevy wiring for recording and replay
//!
//! Fixed-step pipeline (in order): capture keys into the live input, step the
//! simulation context, record this step's transitions, tick the scenario run.
//!
//! Hotkeys:
//! - F5: start / stop a recording session
//! - F6: capture an assertion set
//! - F9: run every stored scenario

use bevy::prelude::*;
use chrono::Local;

use super::recorder::{Recorder, unique_session_name};
use super::runner::RunOrchestrator;
use super::storage::{JsonScenarioStore, ScenarioLibrary};
use crate::context::{SimulationContext, step_simulation};
use crate::input::capture_live_input;
use crate::scene::SceneCodec;
use crate::settings::HarnessSettings;

/// Registers the recorder, the run orchestrator and their systems.
///
/// The app must insert a [`SimulationContext`]. [`HarnessSettings`] and
/// [`ScenarioLibrary`] are loaded / created from settings unless already present.
pub struct ReplayHarnessPlugin<C> {
    pub codec: C,
}

impl<C> ReplayHarnessPlugin<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }
}

impl<C: SceneCodec + Clone + 'static> Plugin for ReplayHarnessPlugin<C> {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<HarnessSettings>() {
            app.insert_resource(HarnessSettings::load());
        }
        let settings = app.world().resource::<HarnessSettings>().clone();

        if !app.world().contains_resource::<ScenarioLibrary>() {
            app.insert_resource(ScenarioLibrary(Box::new(JsonScenarioStore::new(
                &settings.scenarios_dir,
            ))));
        }

        app.insert_resource(Recorder::from_settings(&settings))
            .insert_resource(RunOrchestrator::new(Box::new(self.codec.clone())))
            .add_systems(
                FixedUpdate,
                (
                    capture_live_input,
                    step_simulation,
                    record_live_input,
                    drive_scenarios,
                )
                    .chain(),
            )
            .add_systems(Update, recording_hotkeys);
    }
}

/// Record the live input's edges from this step
pub fn record_live_input(
    time: Res<Time<Fixed>>,
    context: Res<SimulationContext>,
    mut recorder: ResMut<Recorder>,
) {
    if !recorder.is_recording() {
        return;
    }
    recorder.record_transitions(context.input.as_ref(), time.elapsed_secs_f64());
}

/// Advance the active scenario run by one fixed step
pub fn drive_scenarios(
    time: Res<Time>,
    mut orchestrator: ResMut<RunOrchestrator>,
    mut context: ResMut<SimulationContext>,
) {
    orchestrator.tick(&mut context, time.delta_secs_f64());
}

/// F5 / F6 / F9 handling
pub fn recording_hotkeys(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    time: Res<Time<Fixed>>,
    library: Res<ScenarioLibrary>,
    mut context: ResMut<SimulationContext>,
    mut recorder: ResMut<Recorder>,
    mut orchestrator: ResMut<RunOrchestrator>,
) {
    let Some(keyboard) = keyboard else {
        return;
    };
    // The fixed clock, so recorded timestamps line up with simulation steps
    let clock = time.elapsed_secs_f64();

    if keyboard.just_pressed(KeyCode::F5) {
        if orchestrator.is_running() {
            warn!("Cannot record while scenarios are running");
        } else if recorder.is_recording() {
            recorder.end_session(clock, context.input.as_ref(), library.0.as_ref());
        } else {
            let base = format!("session_{}", Local::now().format("%Y%m%d_%H%M%S_%3f"));
            let name = unique_session_name(library.0.as_ref(), &base);
            if let Err(e) =
                recorder.begin_session(name, clock, context.scene.as_ref(), orchestrator.codec())
            {
                error!("Failed to start recording: {}", e);
            }
        }
    }

    if keyboard.just_pressed(KeyCode::F6) && recorder.is_recording() {
        recorder.capture_assertion(clock, context.scene.as_ref(), None, None);
    }

    if keyboard.just_pressed(KeyCode::F9) {
        if recorder.is_recording() {
            warn!("Stop recording (F5) before running scenarios");
        } else if let Err(e) = orchestrator.enqueue_all(library.0.as_ref(), &mut context) {
            warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::LiveInput;
    use crate::scene::{SandboxCodec, SandboxScene};
    use crate::testing::MemoryScenarioStore;

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(HarnessSettings::default())
            .insert_resource(ScenarioLibrary(Box::new(MemoryScenarioStore::new())))
            .insert_resource(SimulationContext::new(
                Box::new(SandboxScene::demo()),
                Box::new(LiveInput::default()),
            ))
            .add_plugins(ReplayHarnessPlugin::new(SandboxCodec));
        app
    }

    #[test]
    fn test_plugin_registers_resources() {
        let app = app();
        assert!(app.world().contains_resource::<Recorder>());
        assert!(app.world().contains_resource::<RunOrchestrator>());
        assert!(app.world().contains_resource::<ScenarioLibrary>());
    }

    #[test]
    fn test_update_without_keyboard_is_idle() {
        let mut app = app();
        app.update();
        app.update();
        assert!(!app.world().resource::<Recorder>().is_recording());
        assert!(!app.world().resource::<RunOrchestrator>().is_running());
    }

    #[test]
    fn test_settings_tolerance_reaches_recorder() {
        let mut app = App::new();
        app.insert_resource(HarnessSettings {
            default_tolerance: 0.25,
            capture_paths: vec!["Scene.EntityCount".to_string()],
            ..Default::default()
        })
        .insert_resource(ScenarioLibrary(Box::new(MemoryScenarioStore::new())))
        .add_plugins(ReplayHarnessPlugin::new(SandboxCodec));

        let scene = SandboxScene::demo();
        let mut recorder = app.world_mut().resource_mut::<Recorder>();
        recorder.begin_session("cfg", 0.0, &scene, &SandboxCodec).unwrap();
        recorder.capture_assertion(0.0, &scene, None, None);
        let scenario = recorder
            .finish_session(1.0, &LiveInput::default())
            .unwrap();
        assert_eq!(scenario.assertion_sets[0].expectations[0].tolerance, 0.25);
    }
}
