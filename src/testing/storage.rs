//! Scenario persistence
//!
//! Scenarios are stored as independently loadable, named records. The JSON
//! store writes one pretty-printed file per scenario.

use bevy::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use super::scenario::Scenario;
use crate::constants::SCENARIO_FORMAT_VERSION;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("scenario directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("scenario '{0}' not found")]
    NotFound(String),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode scenario '{name}': {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },

    #[error("{} uses format version {found}, newest supported is {supported}", .path.display())]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },
}

/// Named scenario persistence
pub trait ScenarioStore: Send + Sync {
    fn save(&self, scenario: &Scenario) -> Result<(), StorageError>;

    /// Every readable scenario; unreadable records are logged and skipped
    fn load_all(&self) -> Result<Vec<Scenario>, StorageError>;

    fn load(&self, name: &str) -> Result<Scenario, StorageError>;
}

/// Scenario store resource used by the harness plugin
#[derive(Resource)]
pub struct ScenarioLibrary(pub Box<dyn ScenarioStore>);

/// One JSON file per scenario inside a directory
#[derive(Debug, Clone)]
pub struct JsonScenarioStore {
    dir: PathBuf,
}

impl JsonScenarioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a scenario named `name` is stored in
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(name)))
    }

    /// Load a single scenario file
    pub fn load_file(path: &Path) -> Result<Scenario, StorageError> {
        let content = fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario: Scenario =
            serde_json::from_str(&content).map_err(|source| StorageError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if scenario.version > SCENARIO_FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: scenario.version,
                supported: SCENARIO_FORMAT_VERSION,
            });
        }
        Ok(scenario)
    }

    /// Every `.json` file in the directory, in path order, with its load result.
    ///
    /// Unlike [`ScenarioStore::load_all`], unreadable files are returned rather
    /// than logged, so callers can report them.
    pub fn scan(&self) -> Result<Vec<(PathBuf, Result<Scenario, StorageError>)>, StorageError> {
        if !self.dir.is_dir() {
            return Err(StorageError::MissingDirectory(self.dir.clone()));
        }

        let entries = fs::read_dir(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|path| {
                let loaded = Self::load_file(&path);
                (path, loaded)
            })
            .collect())
    }
}

/// Filesystem-safe stem for a scenario name.
///
/// Percent-encodes every byte outside `[A-Za-z0-9_-]` (including `%` itself),
/// so distinct names always map to distinct files.
fn file_stem(name: &str) -> String {
    if name.is_empty() {
        // Unreachable from any non-empty name: a literal '%' encodes as "%25"
        return "%empty".to_string();
    }

    let mut stem = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{:02X}", byte));
        }
    }
    stem
}

impl ScenarioStore for JsonScenarioStore {
    fn save(&self, scenario: &Scenario) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(scenario).map_err(|source| StorageError::Encode {
            name: scenario.name.clone(),
            source,
        })?;

        fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(&scenario.name);
        fs::write(&path, json).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Scenario saved: {}", path.display());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Scenario>, StorageError> {
        let mut scenarios = Vec::new();
        for (_, loaded) in self.scan()? {
            match loaded {
                Ok(scenario) => scenarios.push(scenario),
                Err(e) => error!("Skipping scenario file: {}", e),
            }
        }

        info!(
            "Loaded {} scenario(s) from {}",
            scenarios.len(),
            self.dir.display()
        );
        Ok(scenarios)
    }

    fn load(&self, name: &str) -> Result<Scenario, StorageError> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        let scenario = Self::load_file(&path)?;
        if scenario.name != name {
            warn!(
                "{} holds scenario '{}', not '{}'",
                path.display(),
                scenario.name,
                name
            );
            return Err(StorageError::NotFound(name.to_string()));
        }
        Ok(scenario)
    }
}

/// Scenarios kept in memory, in save order (re-saving a name replaces it)
#[derive(Debug, Default)]
pub struct MemoryScenarioStore {
    scenarios: Mutex<Vec<Scenario>>,
}

impl MemoryScenarioStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scenarios.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScenarioStore for MemoryScenarioStore {
    fn save(&self, scenario: &Scenario) -> Result<(), StorageError> {
        let mut scenarios = self.scenarios.lock().unwrap_or_else(|e| e.into_inner());
        match scenarios.iter_mut().find(|s| s.name == scenario.name) {
            Some(existing) => *existing = scenario.clone(),
            None => scenarios.push(scenario.clone()),
        }
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Scenario>, StorageError> {
        Ok(self.scenarios.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn load(&self, name: &str) -> Result<Scenario, StorageError> {
        self.scenarios
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AssertionSet, ExpectedProperty, Value};
    use crate::timeline::TimelineEvent;

    fn temp_store() -> JsonScenarioStore {
        let dir = std::env::temp_dir().join(format!("rewind-test-{}", uuid::Uuid::new_v4()));
        JsonScenarioStore::new(dir)
    }

    fn sample(name: &str) -> Scenario {
        let mut scenario = Scenario::new(name, "{}", 2.0);
        scenario.timeline_events = vec![
            TimelineEvent::pressed("Jump", 0.5),
            TimelineEvent::released("Jump", 0.75),
        ];
        scenario.control_names = ["Jump".to_string(), "Crouch".to_string()].into();
        scenario.assertion_sets = vec![AssertionSet::new(
            1.0,
            vec![ExpectedProperty::new("Scene.EntityCount", Value::from(3_usize))],
        )];
        scenario.recorded_at_unix_millis = 1_700_000_000_000;
        scenario
    }

    #[test]
    fn test_save_and_load_by_name() {
        let store = temp_store();
        let scenario = sample("walk right");
        store.save(&scenario).unwrap();

        assert!(store.path_for("walk right").ends_with("walk%20right.json"));
        assert_eq!(store.load("walk right").unwrap(), scenario);
        assert!(matches!(store.load("other"), Err(StorageError::NotFound(_))));

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_load_all_skips_bad_files() {
        let store = temp_store();
        store.save(&sample("a")).unwrap();
        store.save(&sample("b")).unwrap();
        fs::write(store.dir().join("broken.json"), "{ nope").unwrap();
        fs::write(store.dir().join("notes.txt"), "ignored").unwrap();

        let mut future = serde_json::to_value(sample("c")).unwrap();
        future["version"] = serde_json::json!(SCENARIO_FORMAT_VERSION + 1);
        fs::write(store.dir().join("c.json"), future.to_string()).unwrap();

        let loaded = store.load_all().unwrap();
        let names: Vec<&str> = loaded.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(matches!(
            JsonScenarioStore::load_file(&store.dir().join("c.json")),
            Err(StorageError::UnsupportedVersion { .. })
        ));
        assert!(matches!(
            JsonScenarioStore::load_file(&store.dir().join("broken.json")),
            Err(StorageError::Parse { .. })
        ));

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_missing_directory() {
        let store = temp_store();
        assert!(matches!(
            store.load_all(),
            Err(StorageError::MissingDirectory(_))
        ));
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("jump/over crate"), "jump%2Fover%20crate");
        assert_eq!(file_stem("run-01"), "run-01");
        assert_eq!(file_stem("50%"), "50%25");
        assert_eq!(file_stem(""), "%empty");
        assert_ne!(file_stem("jump over"), file_stem("jump_over"));
        assert_ne!(file_stem("a "), file_stem("a"));
    }

    #[test]
    fn test_similar_names_do_not_collide() {
        let store = temp_store();
        let mut spaced = sample("jump over");
        spaced.duration_seconds = 1.0;
        let mut underscored = sample("jump_over");
        underscored.duration_seconds = 2.0;
        store.save(&spaced).unwrap();
        store.save(&underscored).unwrap();

        assert_eq!(store.load("jump over").unwrap(), spaced);
        assert_eq!(store.load("jump_over").unwrap(), underscored);
        assert_eq!(store.load_all().unwrap().len(), 2);

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_load_rejects_file_holding_other_name() {
        let store = temp_store();
        store.save(&sample("a")).unwrap();
        fs::copy(store.path_for("a"), store.path_for("b")).unwrap();

        assert!(matches!(store.load("b"), Err(StorageError::NotFound(_))));
        assert!(store.load("a").is_ok());

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_scan_reports_bad_files() {
        let store = temp_store();
        store.save(&sample("good")).unwrap();
        fs::write(store.dir().join("broken.json"), "{ corrupt").unwrap();

        let scanned = store.scan().unwrap();
        assert_eq!(scanned.len(), 2);
        let (bad_path, bad) = &scanned[0];
        assert!(bad_path.ends_with("broken.json"));
        assert!(matches!(bad, Err(StorageError::Parse { .. })));
        assert_eq!(scanned[1].1.as_ref().unwrap().name, "good");

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_memory_store_replaces_by_name() {
        let store = MemoryScenarioStore::new();
        store.save(&sample("a")).unwrap();
        let mut updated = sample("a");
        updated.duration_seconds = 9.0;
        store.save(&updated).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.load("a").unwrap().duration_seconds, 9.0);
    }
}
