//! Scene capabilities consumed by the harness
//!
//! The harness never touches a concrete scene graph. It reads state through
//! [`Inspect`] (named member lookup), lists and finds entities through [`Scene`],
//! and snapshots scenes through a [`SceneCodec`].

mod codec;
pub mod sandbox;

pub use codec::{CodecError, SceneCodec};
pub use sandbox::{
    BoxCollider, Controller, Rigidbody, SandboxCodec, SandboxEntity, SandboxScene,
};

use bevy::prelude::*;
use std::any::Any;

use crate::input::InputSource;
use crate::testing::Value;

/// Result of looking up a named member on an object
pub enum Member<'a> {
    /// A plain value (number, bool, string, vector)
    Value(Value),
    /// A nested object that further path segments can walk into
    Object(&'a dyn Inspect),
    /// The member exists but currently holds nothing
    Null,
}

/// Named member lookup, implemented per type.
///
/// Lookups never mutate state.
pub trait Inspect {
    /// Look up `name`; `None` when this type has no such member
    fn member(&self, name: &str) -> Option<Member<'_>>;

    /// Value of this object when a property path ends on it
    fn as_value(&self) -> Option<Value> {
        None
    }
}

/// Component kinds an entity exposes directly to property paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    BoxCollider,
    Rigidbody,
}

/// An entity in a scene
pub trait SceneEntity: Inspect {
    /// Display name (empty for unnamed entities)
    fn name(&self) -> &str;

    /// Attached component of `kind`, if any
    fn component(&self, kind: ComponentKind) -> Option<&dyn Inspect>;
}

/// Entity index plus stepping for a live scene
pub trait Scene: Inspect + Send + Sync {
    fn entity_count(&self) -> usize;

    fn entities(&self) -> Vec<&dyn SceneEntity>;

    /// First entity named `name`
    fn find_by_name(&self, name: &str) -> Option<&dyn SceneEntity> {
        self.entities().into_iter().find(|e| e.name() == name)
    }

    /// Advance the scene by one step of `dt` seconds using `input`
    fn step(&mut self, dt: f64, input: &dyn InputSource);

    fn as_any(&self) -> &dyn Any;
}

impl Inspect for Vec2 {
    fn member(&self, name: &str) -> Option<Member<'_>> {
        match name {
            "X" | "x" => Some(Member::Value(Value::Number(self.x as f64))),
            "Y" | "y" => Some(Member::Value(Value::Number(self.y as f64))),
            _ => None,
        }
    }

    fn as_value(&self) -> Option<Value> {
        Some(Value::from(*self))
    }
}
