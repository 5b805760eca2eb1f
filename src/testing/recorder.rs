//! Recording sessions - capture a snapshot, the input timeline and assertion sets
//!
//! A session is `Idle -> Recording -> Idle`. While recording, every timestamp
//! is stored relative to the clock value passed to [`Recorder::begin_session`].

use bevy::prelude::*;
use std::collections::BTreeSet;
use thiserror::Error;

use super::assertions::{AssertionSet, ExpectedProperty};
use super::resolver::{PathError, resolve};
use super::scenario::Scenario;
use super::storage::ScenarioStore;
use crate::constants::*;
use crate::input::InputSource;
use crate::scene::{CodecError, ComponentKind, Scene, SceneCodec};
use crate::settings::HarnessSettings;
use crate::timeline::{ControlId, TimelineEvent, Transition, check_alternation};

/// A single property that could not be captured (the property is skipped)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("skipped '{path}': {source}")]
    Unresolved { path: String, source: PathError },
}

/// In-progress recording
#[derive(Debug, Clone)]
struct RecordingSession {
    name: String,
    /// Clock value all timestamps are measured from
    reference_time: f64,
    snapshot: String,
    events: Vec<TimelineEvent>,
    assertion_sets: Vec<AssertionSet>,
}

impl RecordingSession {
    fn relative(&self, clock_now: f64) -> f64 {
        (clock_now - self.reference_time).max(0.0)
    }
}

/// Records live sessions into scenarios
#[derive(Resource, Debug, Clone)]
pub struct Recorder {
    session: Option<RecordingSession>,
    /// Tolerance attached to every captured property
    default_tolerance: f64,
    /// Capture paths used when the caller supplies none (empty = built-in defaults)
    capture_paths: Vec<String>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            session: None,
            default_tolerance: DEFAULT_TOLERANCE,
            capture_paths: Vec::new(),
        }
    }
}

impl Recorder {
    pub fn from_settings(settings: &HarnessSettings) -> Self {
        Self {
            session: None,
            default_tolerance: settings.default_tolerance,
            capture_paths: settings.capture_paths.clone(),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Name of the active session
    pub fn session_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.name.as_str())
    }

    /// Snapshot `scene` and start recording with `clock_now` as time zero.
    ///
    /// Callers must not begin while a session is active; doing so discards the
    /// active session.
    pub fn begin_session(
        &mut self,
        name: impl Into<String>,
        clock_now: f64,
        scene: &dyn Scene,
        codec: &dyn SceneCodec,
    ) -> Result<(), CodecError> {
        let name = name.into();
        if let Some(active) = &self.session {
            warn!(
                "Recording '{}' started while '{}' was active; the active session is discarded",
                name, active.name
            );
        }

        let snapshot = codec.serialize(scene)?;
        info!(
            "Recording '{}' started ({} entities)",
            name,
            scene.entity_count()
        );
        self.session = Some(RecordingSession {
            name,
            reference_time: clock_now,
            snapshot,
            events: Vec::new(),
            assertion_sets: Vec::new(),
        });
        Ok(())
    }

    /// Append a transition; ignored when not recording
    pub fn record_event(&mut self, control: impl Into<ControlId>, transition: Transition, clock_now: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let timestamp = session.relative(clock_now);
        session
            .events
            .push(TimelineEvent::new(control, transition, timestamp));
    }

    /// Append every press/release edge `input` reported on its last step
    pub fn record_transitions(&mut self, input: &dyn InputSource, clock_now: f64) {
        if self.session.is_none() {
            return;
        }
        for control in input.list_controls() {
            let state = input.query(&control);
            if state.is_pressed {
                self.record_event(control, Transition::Pressed, clock_now);
            } else if state.is_released {
                self.record_event(control, Transition::Released, clock_now);
            }
        }
    }

    /// Capture the current value of each path as one assertion set.
    ///
    /// Paths come from `paths`, else the configured capture paths, else
    /// [`default_capture_paths`]. Paths that fail to resolve are skipped and
    /// returned; the rest are still captured.
    pub fn capture_assertion(
        &mut self,
        clock_now: f64,
        scene: &dyn Scene,
        paths: Option<&[String]>,
        description: Option<String>,
    ) -> Vec<CaptureError> {
        let paths: Vec<String> = match paths {
            Some(paths) => paths.to_vec(),
            None if !self.capture_paths.is_empty() => self.capture_paths.clone(),
            None => default_capture_paths(scene),
        };
        let tolerance = self.default_tolerance;

        let Some(session) = self.session.as_mut() else {
            warn!("Assertion capture requested while not recording");
            return Vec::new();
        };

        let mut expectations = Vec::with_capacity(paths.len());
        let mut skipped = Vec::new();
        for path in paths {
            match resolve(scene, &path) {
                Ok(value) => {
                    expectations.push(ExpectedProperty::new(path, value).with_tolerance(tolerance))
                }
                Err(source) => {
                    let error = CaptureError::Unresolved { path, source };
                    warn!("Capture: {}", error);
                    skipped.push(error);
                }
            }
        }

        let timestamp = session.relative(clock_now);
        debug!(
            "Captured {} properties at {:.3}s ({} skipped)",
            expectations.len(),
            timestamp,
            skipped.len()
        );
        let mut set = AssertionSet::new(timestamp, expectations);
        set.description = description;
        session.assertion_sets.push(set);

        skipped
    }

    /// Stop recording and assemble the scenario.
    ///
    /// `control_names` holds every control `input` knows about plus any control
    /// seen in the timeline. Returns `None` when not recording.
    pub fn finish_session(&mut self, clock_now: f64, input: &dyn InputSource) -> Option<Scenario> {
        let Some(session) = self.session.take() else {
            warn!("End of recording requested while not recording");
            return None;
        };

        let duration = session.relative(clock_now);
        let mut control_names: BTreeSet<ControlId> = input.list_controls().into_iter().collect();
        control_names.extend(session.events.iter().map(|e| e.control.clone()));

        for issue in check_alternation(&session.events) {
            warn!("Recording '{}': {}", session.name, issue);
        }

        let mut scenario = Scenario::new(session.name, session.snapshot, duration);
        scenario.timeline_events = session.events;
        scenario.control_names = control_names;
        scenario.assertion_sets = session.assertion_sets;
        scenario.recorded_at_unix_millis = chrono::Utc::now().timestamp_millis();

        info!(
            "Recording '{}' finished: {:.2}s, {} events, {} assertion sets",
            scenario.name,
            scenario.duration_seconds,
            scenario.timeline_events.len(),
            scenario.assertion_sets.len()
        );
        Some(scenario)
    }

    /// [`Recorder::finish_session`], then persist the scenario under its name.
    ///
    /// A failed save is logged; the scenario is still returned.
    pub fn end_session(
        &mut self,
        clock_now: f64,
        input: &dyn InputSource,
        store: &dyn ScenarioStore,
    ) -> Option<Scenario> {
        let scenario = self.finish_session(clock_now, input)?;
        if let Err(e) = store.save(&scenario) {
            error!("Failed to save scenario '{}': {}", scenario.name, e);
        }
        Some(scenario)
    }
}

/// `base`, or `base_2`, `base_3`, ... if a scenario with that name is already stored
pub fn unique_session_name(store: &dyn ScenarioStore, base: &str) -> String {
    if store.load(base).is_err() {
        return base.to_string();
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{}_{}", base, suffix);
        if store.load(&candidate).is_err() {
            return candidate;
        }
        suffix += 1;
    }
}

/// Built-in capture set: the entity count, then for every named entity its
/// position and, when attached, collider bounds and rigid body state
pub fn default_capture_paths(scene: &dyn Scene) -> Vec<String> {
    let mut paths = vec![format!("{}.{}", SCENE_ROOT, ENTITY_COUNT_SEGMENT)];

    for entity in scene.entities() {
        let name = entity.name();
        // Bracketed selectors cannot address these
        if name.is_empty() || name.contains(']') {
            continue;
        }
        let root = format!("{}{}]", ENTITY_ROOT_PREFIX, name);

        paths.push(format!("{}.Position.X", root));
        paths.push(format!("{}.Position.Y", root));
        if entity.component(ComponentKind::BoxCollider).is_some() {
            paths.push(format!("{}.{}.Size", root, BOX_COLLIDER_SEGMENT));
            paths.push(format!("{}.{}.Offset", root, BOX_COLLIDER_SEGMENT));
        }
        if entity.component(ComponentKind::Rigidbody).is_some() {
            paths.push(format!("{}.{}.Velocity", root, RIGIDBODY_SEGMENT));
            paths.push(format!("{}.{}.IsKinematic", root, RIGIDBODY_SEGMENT));
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::LiveInput;
    use crate::scene::{SandboxCodec, SandboxEntity, SandboxScene};
    use crate::testing::{MemoryScenarioStore, Value};

    const DT: f64 = 1.0 / 60.0;

    fn recording(scene: &SandboxScene, clock: f64) -> Recorder {
        let mut recorder = Recorder::default();
        recorder
            .begin_session("test", clock, scene, &SandboxCodec)
            .unwrap();
        recorder
    }

    #[test]
    fn test_timestamps_are_relative_to_session_start() {
        let scene = SandboxScene::demo();
        let mut recorder = recording(&scene, 10.0);
        recorder.record_event(CONTROL_JUMP, Transition::Pressed, 10.5);
        recorder.record_event(CONTROL_JUMP, Transition::Released, 10.75);
        recorder.capture_assertion(11.0, &scene, None, None);

        let input = LiveInput::new([CONTROL_JUMP, CONTROL_MOVE_LEFT]);
        let scenario = recorder.finish_session(12.0, &input).unwrap();

        assert!(!recorder.is_recording());
        assert_eq!(scenario.name, "test");
        assert_eq!(scenario.duration_seconds, 2.0);
        assert_eq!(
            scenario.timeline_events,
            vec![
                TimelineEvent::pressed(CONTROL_JUMP, 0.5),
                TimelineEvent::released(CONTROL_JUMP, 0.75),
            ]
        );
        assert_eq!(scenario.assertion_sets[0].timestamp, 1.0);
        // Never-triggered controls are still listed
        assert!(scenario.control_names.contains(CONTROL_MOVE_LEFT));
        assert!(scenario.recorded_at_unix_millis > 0);
    }

    #[test]
    fn test_snapshot_taken_at_begin() {
        let mut scene = SandboxScene::demo();
        let mut recorder = recording(&scene, 0.0);
        scene.entities[0].position.x = 50.0;

        let scenario = recorder
            .finish_session(1.0, &LiveInput::default())
            .unwrap();
        let restored = SandboxCodec.deserialize(&scenario.snapshot).unwrap();
        assert_eq!(
            resolve(restored.as_ref(), "Entity[Player].Position.X"),
            Ok(Value::Number(0.0))
        );
    }

    #[test]
    fn test_default_capture_paths() {
        let scene = SandboxScene::demo().with_entity(SandboxEntity::new("", Vec2::ZERO));
        let paths = default_capture_paths(&scene);

        assert_eq!(paths[0], "Scene.EntityCount");
        assert!(paths.contains(&"Entity[Player].Position.X".to_string()));
        assert!(paths.contains(&"Entity[Crate].BoxCollider.Size".to_string()));
        assert!(paths.contains(&"Entity[Crate].Rigidbody.Velocity".to_string()));
        assert!(paths.contains(&"Entity[Marker].Position.Y".to_string()));
        assert!(!paths.contains(&"Entity[Marker].Rigidbody.Velocity".to_string()));
        // count + Player 6 + Crate 6 + Marker 2, unnamed entity skipped
        assert_eq!(paths.len(), 15);
    }

    #[test]
    fn test_capture_skips_unresolvable_paths() {
        let scene = SandboxScene::demo();
        let mut recorder = recording(&scene, 0.0);
        let paths = vec![
            "Entity[Player].Position.X".to_string(),
            "Entity[Ghost].Position.X".to_string(),
            "Scene.EntityCount".to_string(),
        ];
        let skipped = recorder.capture_assertion(0.5, &scene, Some(&paths), Some("ledge".into()));

        assert_eq!(skipped.len(), 1);
        assert!(matches!(
            &skipped[0],
            CaptureError::Unresolved { path, source: PathError::EntityNotFound { .. } }
                if path == "Entity[Ghost].Position.X"
        ));

        let scenario = recorder.finish_session(1.0, &LiveInput::default()).unwrap();
        let set = &scenario.assertion_sets[0];
        assert_eq!(set.description.as_deref(), Some("ledge"));
        assert_eq!(set.expectations.len(), 2);
        assert_eq!(set.expectations[1].expected_value, Value::Number(3.0));
        assert_eq!(set.expectations[1].tolerance, DEFAULT_TOLERANCE);
    }

    #[test]
    fn test_configured_capture_paths_and_tolerance() {
        let settings = HarnessSettings {
            default_tolerance: 0.05,
            capture_paths: vec!["Entity[Crate].Position".to_string()],
            ..Default::default()
        };
        let scene = SandboxScene::demo();
        let mut recorder = Recorder::from_settings(&settings);
        recorder.begin_session("cfg", 0.0, &scene, &SandboxCodec).unwrap();
        recorder.capture_assertion(0.0, &scene, None, None);

        let scenario = recorder.finish_session(0.0, &LiveInput::default()).unwrap();
        let expectations = &scenario.assertion_sets[0].expectations;
        assert_eq!(expectations.len(), 1);
        assert_eq!(expectations[0].declared_type, "Vector2");
        assert_eq!(expectations[0].tolerance, 0.05);
    }

    #[test]
    fn test_record_transitions_from_live_input() {
        let scene = SandboxScene::demo();
        let mut recorder = recording(&scene, 0.0);
        let mut input = LiveInput::new([CONTROL_JUMP, CONTROL_MOVE_RIGHT]);

        let mut clock = 0.0;
        for step in 0..10 {
            input.set_held(CONTROL_MOVE_RIGHT, (2..8).contains(&step));
            input.set_held(CONTROL_JUMP, step == 4);
            input.advance(DT);
            clock += DT;
            recorder.record_transitions(&input, clock);
        }

        let scenario = recorder.finish_session(clock, &input).unwrap();
        let kinds: Vec<(&str, Transition)> = scenario
            .timeline_events
            .iter()
            .map(|e| (e.control.as_str(), e.transition))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (CONTROL_MOVE_RIGHT, Transition::Pressed),
                (CONTROL_JUMP, Transition::Pressed),
                (CONTROL_JUMP, Transition::Released),
                (CONTROL_MOVE_RIGHT, Transition::Released),
            ]
        );
        assert!(check_alternation(&scenario.timeline_events).is_empty());
    }

    #[test]
    fn test_idle_recorder_ignores_input() {
        let scene = SandboxScene::demo();
        let mut recorder = Recorder::default();
        recorder.record_event(CONTROL_JUMP, Transition::Pressed, 1.0);
        assert!(recorder.capture_assertion(1.0, &scene, None, None).is_empty());
        assert!(recorder.finish_session(2.0, &LiveInput::default()).is_none());
    }

    #[test]
    fn test_end_session_persists_by_name() {
        let scene = SandboxScene::demo();
        let store = MemoryScenarioStore::new();
        let mut recorder = Recorder::default();
        recorder.begin_session("saved", 0.0, &scene, &SandboxCodec).unwrap();
        assert_eq!(recorder.session_name(), Some("saved"));

        let scenario = recorder
            .end_session(3.0, &LiveInput::default(), &store)
            .unwrap();
        assert_eq!(store.load("saved").unwrap(), scenario);
    }

    #[test]
    fn test_unique_session_name_skips_stored_names() {
        let store = MemoryScenarioStore::new();
        assert_eq!(unique_session_name(&store, "session"), "session");

        store.save(&Scenario::new("session", "{}", 1.0)).unwrap();
        assert_eq!(unique_session_name(&store, "session"), "session_2");

        store.save(&Scenario::new("session_2", "{}", 1.0)).unwrap();
        assert_eq!(unique_session_name(&store, "session"), "session_3");
        assert_eq!(unique_session_name(&store, "other"), "other");
    }
}
