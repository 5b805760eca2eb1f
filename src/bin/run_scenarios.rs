//! Scenario runner CLI
//!
//! Replays every stored scenario headless against the sandbox scene.
//!
//! Usage:
//!   cargo run --bin run-scenarios                      # Run all scenarios
//!   cargo run --bin run-scenarios -- jump              # Run scenarios whose name contains "jump"
//!   cargo run --bin run-scenarios -- --dir tests/rec   # Use another scenario directory
//!   cargo run --bin run-scenarios -- --verbose         # Show every failing property

use std::env;
use std::path::PathBuf;

use rewind::input::LiveInput;
use rewind::scene::{SandboxCodec, SandboxScene};
use rewind::settings::HarnessSettings;
use rewind::testing::{
    JsonScenarioStore, OutcomeStatus, RunOrchestrator, RunResult, Scenario, ScenarioStatus,
    StorageError,
};
use rewind::SimulationContext;

fn main() {
    let args: Vec<String> = env::args().collect();
    let settings = HarnessSettings::load();

    let mut verbose = false;
    let mut filter: Option<String> = None;
    let mut dir = PathBuf::from(&settings.scenarios_dir);

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--verbose" || arg == "-v" {
            verbose = true;
        } else if arg == "--dir" {
            match iter.next() {
                Some(path) => dir = PathBuf::from(path),
                None => {
                    println!("--dir needs a path");
                    std::process::exit(2);
                }
            }
        } else if !arg.starts_with('-') {
            filter = Some(arg.clone());
        }
    }

    println!("Replay Scenarios");
    println!("================\n");

    if !dir.is_dir() {
        println!("No scenarios directory found at {}", dir.display());
        println!("Record one with: cargo run --bin record-demo");
        std::process::exit(1);
    }

    let store = JsonScenarioStore::new(&dir);
    let scanned = match store.scan() {
        Ok(scanned) => scanned,
        Err(e) => {
            println!("Failed to load scenarios: {}", e);
            std::process::exit(1);
        }
    };

    // Unreadable files can't be matched by name, so they are always reported
    let (mut scenarios, unreadable_files) = split_scanned(scanned);
    for (label, message) in &unreadable_files {
        print_unreadable(label, message);
    }
    let unreadable = unreadable_files.len();
    if let Some(f) = &filter {
        scenarios.retain(|s| s.name.contains(f.as_str()));
    }

    if scenarios.is_empty() {
        if unreadable > 0 {
            println!("\n================");
            println!("Results: 0 passed, 0 failed, {} errors", unreadable);
            std::process::exit(1);
        }
        println!("No scenarios found.");
        if let Some(f) = filter {
            println!("Filter: {}", f);
        }
        std::process::exit(1);
    }

    let total = scenarios.len();
    let budget = settings.max_steps.saturating_mul(total as u64);

    let mut context = SimulationContext::new(
        Box::new(SandboxScene::demo()),
        Box::new(LiveInput::new(settings.control_names())),
    );
    let mut orchestrator = RunOrchestrator::new(Box::new(SandboxCodec));
    if let Err(e) = orchestrator.run_scenarios(scenarios, &mut context) {
        println!("{}", e);
        std::process::exit(1);
    }
    let steps = orchestrator.run_to_completion(&mut context, settings.fixed_timestep, budget);

    for result in orchestrator.results() {
        print_result(result, verbose);
    }

    let summary = orchestrator.summary();
    let unfinished = total - summary.scenarios;
    if unfinished > 0 {
        println!(
            "\n  {} scenario(s) did not finish within {} steps",
            unfinished, steps
        );
    }

    println!("\n================");
    println!(
        "Results: {} passed, {} failed, {} errors ({}/{} assertions passed)",
        summary.completed,
        summary.failed,
        summary.errored + unfinished + unreadable,
        summary.passed_outcomes,
        summary.outcomes
    );

    if !summary.all_passed() || unfinished > 0 || unreadable > 0 {
        std::process::exit(1);
    }
}

/// Loaded scenarios, plus `(file name, error)` for every file that failed to load
fn split_scanned(
    scanned: Vec<(PathBuf, Result<Scenario, StorageError>)>,
) -> (Vec<Scenario>, Vec<(String, String)>) {
    let mut scenarios = Vec::new();
    let mut unreadable = Vec::new();
    for (path, loaded) in scanned {
        match loaded {
            Ok(scenario) => scenarios.push(scenario),
            Err(e) => {
                let label = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                unreadable.push((label, e.to_string()));
            }
        }
    }
    (scenarios, unreadable)
}

fn dots(name: &str) -> String {
    ".".repeat(40 - name.len().min(39))
}

fn print_unreadable(label: &str, message: &str) {
    println!("  {} {} {}", label, dots(label), ScenarioStatus::Error);
    println!("    {}", message);
}

fn print_result(result: &RunResult, verbose: bool) {
    let name = &result.scenario_name;
    let dots = dots(name);
    println!(
        "  {} {} {} ({}/{} assertions, {:.2}s)",
        name,
        dots,
        result.status,
        result.passed_count(),
        result.outcomes.len(),
        result.elapsed_seconds
    );

    if result.status == ScenarioStatus::Completed {
        return;
    }

    let mut problems = result
        .outcomes
        .iter()
        .filter(|o| o.status != OutcomeStatus::Pass);
    if verbose {
        for outcome in problems {
            println!("    {}", outcome.to_string().replace('\n', "\n    "));
        }
    } else if let Some(first) = problems.next() {
        println!("    {}", first.to_string().replace('\n', "\n    "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind::testing::ScenarioStore;

    #[test]
    fn test_corrupt_files_are_reported() {
        let dir = std::env::temp_dir().join(format!("rewind-cli-{}", uuid::Uuid::new_v4()));
        let store = JsonScenarioStore::new(&dir);
        store.save(&Scenario::new("walk", "{}", 1.0)).unwrap();
        std::fs::write(dir.join("broken.json"), "{ corrupt").unwrap();

        let (scenarios, unreadable) = split_scanned(store.scan().unwrap());
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].name, "walk");
        assert_eq!(unreadable.len(), 1);
        assert_eq!(unreadable[0].0, "broken.json");
        assert!(unreadable[0].1.contains("failed to parse"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
