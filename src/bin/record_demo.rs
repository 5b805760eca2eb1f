//! Record a scripted sandbox session as a scenario
//!
//! Drives the sandbox player with a fixed input script (walk right, jump,
//! walk back) and captures the default property set every half second.
//!
//! Usage:
//!   cargo run --bin record-demo                     # Save as "demo_walk_jump"
//!   cargo run --bin record-demo -- --name my_demo   # Save under another name
//!   cargo run --bin record-demo -- --dir tests/rec  # Save to another directory

use std::env;
use std::path::PathBuf;

use rewind::constants::*;
use rewind::input::LiveInput;
use rewind::scene::{SandboxCodec, SandboxScene};
use rewind::settings::HarnessSettings;
use rewind::testing::{JsonScenarioStore, Recorder, ScenarioStore};
use rewind::SimulationContext;

/// Simulated length of the session
const SESSION_SECONDS: f64 = 3.0;

/// Seconds between captured assertion sets
const CAPTURE_INTERVAL: f64 = 0.5;

/// (control, first held step, first released step)
const SCRIPT: &[(&str, u32, u32)] = &[
    (CONTROL_MOVE_RIGHT, 10, 70),
    (CONTROL_JUMP, 40, 46),
    (CONTROL_MOVE_LEFT, 100, 150),
    (CONTROL_JUMP, 120, 124),
];

fn main() {
    let args: Vec<String> = env::args().collect();
    let settings = HarnessSettings::load();

    let mut name = "demo_walk_jump".to_string();
    let mut dir = PathBuf::from(&settings.scenarios_dir);

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match (arg.as_str(), iter.next()) {
            ("--name", Some(value)) => name = value.clone(),
            ("--dir", Some(value)) => dir = PathBuf::from(value),
            _ => {
                println!("Usage: record-demo [--name <name>] [--dir <path>]");
                std::process::exit(2);
            }
        }
    }

    let dt = settings.fixed_timestep;
    let steps = (SESSION_SECONDS / dt).round() as u32;
    let capture_every = ((CAPTURE_INTERVAL / dt).round() as u32).max(1);

    let mut context = SimulationContext::new(
        Box::new(SandboxScene::demo()),
        Box::new(LiveInput::new(settings.control_names())),
    );
    let mut recorder = Recorder::from_settings(&settings);
    if let Err(e) = recorder.begin_session(name.as_str(), 0.0, context.scene.as_ref(), &SandboxCodec) {
        println!("Failed to snapshot the sandbox scene: {}", e);
        std::process::exit(1);
    }

    let mut clock = 0.0;
    let mut skipped = 0;
    for step in 0..steps {
        if let Some(live) = context.input.as_any_mut().downcast_mut::<LiveInput>() {
            for control in [CONTROL_MOVE_LEFT, CONTROL_MOVE_RIGHT, CONTROL_JUMP] {
                let held = SCRIPT
                    .iter()
                    .any(|(c, from, to)| *c == control && (*from..*to).contains(&step));
                live.set_held(control, held);
            }
        }

        context.step(dt);
        clock += dt;
        recorder.record_transitions(context.input.as_ref(), clock);

        if (step + 1) % capture_every == 0 {
            skipped += recorder
                .capture_assertion(clock, context.scene.as_ref(), None, None)
                .len();
        }
    }

    let Some(scenario) = recorder.finish_session(clock, context.input.as_ref()) else {
        println!("Recording produced no scenario");
        std::process::exit(1);
    };
    let store = JsonScenarioStore::new(&dir);
    if let Err(e) = store.save(&scenario) {
        println!("Failed to save '{}': {}", scenario.name, e);
        std::process::exit(1);
    }

    println!("Recorded '{}'", scenario.name);
    println!("  duration:        {:.2}s", scenario.duration_seconds);
    println!("  input events:    {}", scenario.timeline_events.len());
    println!(
        "  assertion sets:  {} ({} properties, {} skipped)",
        scenario.assertion_sets.len(),
        scenario.expectation_count(),
        skipped
    );
    println!("  saved to:        {}", store.path_for(&scenario.name).display());
}
