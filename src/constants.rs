//! Shared constants for recording and replay

// =============================================================================
// COMPARISON
// =============================================================================

/// Tolerance applied to an expected property when none was recorded
pub const DEFAULT_TOLERANCE: f64 = 0.001;

// =============================================================================
// PATHS
// =============================================================================

/// Root selector addressing the scene itself (`Scene.EntityCount`)
pub const SCENE_ROOT: &str = "Scene";

/// Prefix of the root selector addressing a named entity (`Entity[Player]`)
pub const ENTITY_ROOT_PREFIX: &str = "Entity[";

/// Segment on the scene root yielding the live entity count
pub const ENTITY_COUNT_SEGMENT: &str = "EntityCount";

/// Segment on an entity yielding its box collider component
pub const BOX_COLLIDER_SEGMENT: &str = "BoxCollider";

/// Segment on an entity yielding its rigid body component
pub const RIGIDBODY_SEGMENT: &str = "Rigidbody";

/// Path reported on outcomes produced when a snapshot cannot be restored
pub const SNAPSHOT_PATH: &str = "<snapshot>";

// =============================================================================
// TIMING / STORAGE
// =============================================================================

/// Fixed step used by headless runs (60 Hz)
pub const DEFAULT_FIXED_TIMESTEP: f64 = 1.0 / 60.0;

/// Slack applied when deciding whether a timestamp has been reached, so float
/// accumulation of step lengths never delays an event by a whole step
pub const TIME_EPSILON: f64 = 1e-6;

/// Upper bound on steps per headless run before it is cancelled
pub const DEFAULT_MAX_STEPS: u64 = 60 * 60 * 10;

/// Default directory holding persisted scenarios
pub const DEFAULT_SCENARIOS_DIR: &str = "scenarios";

/// Current scenario file format version
pub const SCENARIO_FORMAT_VERSION: u32 = 1;

// =============================================================================
// SANDBOX CONTROLS
// =============================================================================

pub const CONTROL_MOVE_LEFT: &str = "MoveLeft";
pub const CONTROL_MOVE_RIGHT: &str = "MoveRight";
pub const CONTROL_JUMP: &str = "Jump";

/// Horizontal speed of controlled sandbox entities (units/s)
pub const SANDBOX_MOVE_SPEED: f32 = 4.0;

/// Vertical launch speed of a sandbox jump (units/s)
pub const SANDBOX_JUMP_SPEED: f32 = 6.0;

/// Downward acceleration applied to sandbox rigid bodies (units/s^2)
pub const SANDBOX_GRAVITY: f32 = 20.0;

/// Height of the sandbox floor
pub const SANDBOX_FLOOR_Y: f32 = 0.0;
