//! Harness settings
//!
//! Loads recording/replay preferences (scenario directory, default tolerance,
//! headless timestep, key bindings) from a TOML file in the config directory.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants::*;

/// Path to the settings file
pub const SETTINGS_FILE: &str = "config/replay_harness.toml";

/// Maps a logical control to a physical key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub control: String,
    pub key: KeyCode,
}

/// Settings for recording sessions and scenario runs
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    /// Directory scenarios are saved to and loaded from
    pub scenarios_dir: String,
    /// Tolerance attached to captured properties
    pub default_tolerance: f64,
    /// Step length (seconds) for headless runs
    pub fixed_timestep: f64,
    /// Step budget for a headless run before it is cancelled
    pub max_steps: u64,
    /// Paths captured by the recorder (empty = built-in default set)
    pub capture_paths: Vec<String>,
    /// Physical keys feeding the live input controls
    pub bindings: Vec<KeyBinding>,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            scenarios_dir: DEFAULT_SCENARIOS_DIR.to_string(),
            default_tolerance: DEFAULT_TOLERANCE,
            fixed_timestep: DEFAULT_FIXED_TIMESTEP,
            max_steps: DEFAULT_MAX_STEPS,
            capture_paths: Vec::new(),
            bindings: vec![
                KeyBinding {
                    control: CONTROL_MOVE_LEFT.to_string(),
                    key: KeyCode::KeyA,
                },
                KeyBinding {
                    control: CONTROL_MOVE_RIGHT.to_string(),
                    key: KeyCode::KeyD,
                },
                KeyBinding {
                    control: CONTROL_JUMP.to_string(),
                    key: KeyCode::Space,
                },
            ],
        }
    }
}

impl HarnessSettings {
    /// Load settings from the default file, or return defaults
    pub fn load() -> Self {
        Self::load_from(Path::new(SETTINGS_FILE))
    }

    /// Load settings from `path`, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No {} found, using default harness settings", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match Self::parse(&content) {
                Ok(settings) => {
                    info!("Loaded harness settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings from TOML text; missing keys take their defaults
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Control names declared by the key bindings, in binding order
    pub fn control_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for binding in &self.bindings {
            if !names.contains(&binding.control) {
                names.push(binding.control.clone());
            }
        }
        names
    }
}
