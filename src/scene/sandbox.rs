//! Sandbox scene - a small deterministic 2D scene used by the CLI tools and tests
//!
//! Entities have a position and optionally a box collider, a rigid body and a
//! controller reading the `MoveLeft` / `MoveRight` / `Jump` controls. Bodies fall
//! under gravity and land on a flat floor.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;

use super::{CodecError, ComponentKind, Inspect, Member, Scene, SceneCodec, SceneEntity};
use crate::constants::*;
use crate::input::InputSource;
use crate::testing::Value;

/// Axis-aligned collision box, relative to the entity position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxCollider {
    pub size: Vec2,
    #[serde(default)]
    pub offset: Vec2,
    #[serde(default)]
    pub is_trigger: bool,
}

impl BoxCollider {
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            offset: Vec2::ZERO,
            is_trigger: false,
        }
    }

    /// Lowest point of the box for an entity at `position`
    fn bottom(&self, position: Vec2) -> f32 {
        position.y + self.offset.y - self.size.y * 0.5
    }
}

/// Simulated body state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rigidbody {
    pub velocity: Vec2,
    #[serde(default = "default_true")]
    pub use_gravity: bool,
    #[serde(default)]
    pub is_kinematic: bool,
    #[serde(default)]
    pub grounded: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Rigidbody {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            use_gravity: true,
            is_kinematic: false,
            grounded: false,
        }
    }
}

/// Drives a rigid body from the movement controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    pub move_speed: f32,
    pub jump_speed: f32,
}

impl Default for Controller {
    fn default() -> Self {
        Self {
            move_speed: SANDBOX_MOVE_SPEED,
            jump_speed: SANDBOX_JUMP_SPEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxEntity {
    pub name: String,
    pub position: Vec2,
    #[serde(default)]
    pub box_collider: Option<BoxCollider>,
    #[serde(default)]
    pub rigidbody: Option<Rigidbody>,
    #[serde(default)]
    pub controller: Option<Controller>,
}

impl SandboxEntity {
    pub fn new(name: impl Into<String>, position: Vec2) -> Self {
        Self {
            name: name.into(),
            position,
            box_collider: None,
            rigidbody: None,
            controller: None,
        }
    }

    pub fn with_collider(mut self, size: Vec2) -> Self {
        self.box_collider = Some(BoxCollider::new(size));
        self
    }

    pub fn with_rigidbody(mut self) -> Self {
        self.rigidbody = Some(Rigidbody::default());
        self
    }

    pub fn with_controller(mut self) -> Self {
        self.controller = Some(Controller::default());
        self
    }

    fn step(&mut self, dt: f32, input: &dyn InputSource) {
        let Some(body) = self.rigidbody.as_mut() else {
            return;
        };
        if body.is_kinematic {
            return;
        }

        if let Some(controller) = &self.controller {
            let mut move_x = 0.0;
            if input.query(CONTROL_MOVE_LEFT).is_held {
                move_x -= 1.0;
            }
            if input.query(CONTROL_MOVE_RIGHT).is_held {
                move_x += 1.0;
            }
            body.velocity.x = move_x * controller.move_speed;

            if body.grounded && input.query(CONTROL_JUMP).is_pressed {
                body.velocity.y = controller.jump_speed;
                body.grounded = false;
            }
        }

        if body.use_gravity {
            body.velocity.y -= SANDBOX_GRAVITY * dt;
        }
        self.position += body.velocity * dt;

        // Floor contact
        let bottom = self
            .box_collider
            .as_ref()
            .map(|c| c.bottom(self.position))
            .unwrap_or(self.position.y);
        if bottom <= SANDBOX_FLOOR_Y && body.velocity.y <= 0.0 {
            self.position.y += SANDBOX_FLOOR_Y - bottom;
            body.velocity.y = 0.0;
            body.grounded = true;
        } else {
            body.grounded = false;
        }
    }
}

/// The sandbox scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SandboxScene {
    pub entities: Vec<SandboxEntity>,
    /// Simulated seconds since the scene was created
    #[serde(default)]
    pub elapsed: f64,
}

impl SandboxScene {
    pub fn with_entity(mut self, entity: SandboxEntity) -> Self {
        self.entities.push(entity);
        self
    }

    /// A controllable player standing on the floor, a resting crate, and a
    /// component-free marker
    pub fn demo() -> Self {
        Self::default()
            .with_entity(
                SandboxEntity::new("Player", Vec2::new(0.0, 1.0))
                    .with_collider(Vec2::new(1.0, 2.0))
                    .with_rigidbody()
                    .with_controller(),
            )
            .with_entity(
                SandboxEntity::new("Crate", Vec2::new(3.0, 0.5))
                    .with_collider(Vec2::new(1.0, 1.0))
                    .with_rigidbody(),
            )
            .with_entity(SandboxEntity::new("Marker", Vec2::new(-2.0, 3.0)))
    }
}

impl Scene for SandboxScene {
    fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn entities(&self) -> Vec<&dyn SceneEntity> {
        self.entities.iter().map(|e| e as &dyn SceneEntity).collect()
    }

    fn step(&mut self, dt: f64, input: &dyn InputSource) {
        for entity in &mut self.entities {
            entity.step(dt as f32, input);
        }
        self.elapsed += dt;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// MEMBER LOOKUP
// =============================================================================

fn optional<T: Inspect>(value: &Option<T>) -> Member<'_> {
    match value {
        Some(inner) => Member::Object(inner),
        None => Member::Null,
    }
}

impl Inspect for SandboxScene {
    fn member(&self, name: &str) -> Option<Member<'_>> {
        match name {
            "Elapsed" => Some(Member::Value(Value::Number(self.elapsed))),
            _ => None,
        }
    }
}

impl Inspect for SandboxEntity {
    fn member(&self, name: &str) -> Option<Member<'_>> {
        match name {
            "Name" => Some(Member::Value(Value::from(self.name.as_str()))),
            "Position" => Some(Member::Object(&self.position)),
            "BoxCollider" => Some(optional(&self.box_collider)),
            "Rigidbody" => Some(optional(&self.rigidbody)),
            "Controller" => Some(optional(&self.controller)),
            _ => None,
        }
    }
}

impl SceneEntity for SandboxEntity {
    fn name(&self) -> &str {
        &self.name
    }

    fn component(&self, kind: ComponentKind) -> Option<&dyn Inspect> {
        match kind {
            ComponentKind::BoxCollider => self.box_collider.as_ref().map(|c| c as &dyn Inspect),
            ComponentKind::Rigidbody => self.rigidbody.as_ref().map(|r| r as &dyn Inspect),
        }
    }
}

impl Inspect for BoxCollider {
    fn member(&self, name: &str) -> Option<Member<'_>> {
        match name {
            "Size" => Some(Member::Object(&self.size)),
            "Offset" => Some(Member::Object(&self.offset)),
            "IsTrigger" => Some(Member::Value(Value::Bool(self.is_trigger))),
            _ => None,
        }
    }
}

impl Inspect for Rigidbody {
    fn member(&self, name: &str) -> Option<Member<'_>> {
        match name {
            "Velocity" => Some(Member::Object(&self.velocity)),
            "UseGravity" => Some(Member::Value(Value::Bool(self.use_gravity))),
            "IsKinematic" => Some(Member::Value(Value::Bool(self.is_kinematic))),
            "Grounded" => Some(Member::Value(Value::Bool(self.grounded))),
            _ => None,
        }
    }
}

impl Inspect for Controller {
    fn member(&self, name: &str) -> Option<Member<'_>> {
        match name {
            "MoveSpeed" => Some(Member::Value(Value::from(self.move_speed))),
            "JumpSpeed" => Some(Member::Value(Value::from(self.jump_speed))),
            _ => None,
        }
    }
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// JSON snapshots of [`SandboxScene`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxCodec;

impl SceneCodec for SandboxCodec {
    fn serialize(&self, scene: &dyn Scene) -> Result<String, CodecError> {
        let sandbox = scene
            .as_any()
            .downcast_ref::<SandboxScene>()
            .ok_or(CodecError::UnsupportedScene)?;
        serde_json::to_string(sandbox).map_err(CodecError::Encode)
    }

    fn deserialize(&self, blob: &str) -> Result<Box<dyn Scene>, CodecError> {
        let sandbox: SandboxScene = serde_json::from_str(blob).map_err(CodecError::Decode)?;
        Ok(Box::new(sandbox))
    }
}
