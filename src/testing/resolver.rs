//! Property path resolution against a live scene
//!
//! A path is a root selector followed by dot-separated member names:
//! `Scene.EntityCount`, `Entity[Player].Position.X`,
//! `Entity[Player].Rigidbody.Velocity`.

use thiserror::Error;

use super::value::Value;
use crate::constants::*;
use crate::scene::{ComponentKind, Inspect, Member, Scene, SceneEntity};

/// Why a property path could not be resolved
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("empty property path")]
    Empty,

    /// Unknown root selector, or a segment that would be read from an absent value
    #[error("root not found: '{segment}' in path '{path}'")]
    RootNotFound { path: String, segment: String },

    #[error("entity not found: '{name}' in path '{path}'")]
    EntityNotFound { path: String, name: String },

    #[error("segment not found: '{segment}' in path '{path}'")]
    SegmentNotFound { path: String, segment: String },

    #[error("path '{path}' ends on '{segment}', which is not a value")]
    NotAValue { path: String, segment: String },
}

/// First segment of a property path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSelector {
    /// The scene itself
    Scene,
    /// A named entity from the scene's entity index
    Entity(String),
}

/// A parsed property path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    pub root: RootSelector,
    pub segments: Vec<String>,
}

impl PropertyPath {
    pub fn parse(path: &str) -> Result<Self, PathError> {
        if path.trim().is_empty() {
            return Err(PathError::Empty);
        }

        // Entity names may contain dots, so the bracketed selector is split off first
        let (root, rest) = if let Some(after_prefix) = path.strip_prefix(ENTITY_ROOT_PREFIX) {
            let close = after_prefix.find(']').ok_or_else(|| PathError::RootNotFound {
                path: path.to_string(),
                segment: path.to_string(),
            })?;
            let name = &after_prefix[..close];
            let rest = &after_prefix[close + 1..];
            if name.is_empty() || !(rest.is_empty() || rest.starts_with('.')) {
                return Err(PathError::RootNotFound {
                    path: path.to_string(),
                    segment: format!("{}{}]", ENTITY_ROOT_PREFIX, name),
                });
            }
            (RootSelector::Entity(name.to_string()), rest.strip_prefix('.'))
        } else {
            let (first, rest) = match path.split_once('.') {
                Some((first, rest)) => (first, Some(rest)),
                None => (path, None),
            };
            if first != SCENE_ROOT {
                return Err(PathError::RootNotFound {
                    path: path.to_string(),
                    segment: first.to_string(),
                });
            }
            (RootSelector::Scene, rest)
        };

        let mut segments = Vec::new();
        if let Some(rest) = rest {
            for segment in rest.split('.') {
                if segment.is_empty() {
                    return Err(PathError::SegmentNotFound {
                        path: path.to_string(),
                        segment: String::new(),
                    });
                }
                segments.push(segment.to_string());
            }
        }

        Ok(Self { root, segments })
    }
}

/// Where a walk currently stands
enum Cursor<'a> {
    Scene(&'a dyn Scene),
    Entity(&'a dyn SceneEntity),
    Object(&'a dyn Inspect),
    Value(Value),
    Null,
}

impl<'a> From<Member<'a>> for Cursor<'a> {
    fn from(member: Member<'a>) -> Self {
        match member {
            Member::Value(value) => Cursor::Value(value),
            Member::Object(object) => Cursor::Object(object),
            Member::Null => Cursor::Null,
        }
    }
}

/// Resolve `path` against `scene`
pub fn resolve(scene: &dyn Scene, path: &str) -> Result<Value, PathError> {
    let parsed = PropertyPath::parse(path)?;

    let (mut cursor, mut last) = match &parsed.root {
        RootSelector::Scene => (Cursor::Scene(scene), SCENE_ROOT.to_string()),
        RootSelector::Entity(name) => {
            let entity = scene
                .find_by_name(name)
                .ok_or_else(|| PathError::EntityNotFound {
                    path: path.to_string(),
                    name: name.clone(),
                })?;
            (Cursor::Entity(entity), format!("{}{}]", ENTITY_ROOT_PREFIX, name))
        }
    };

    for segment in &parsed.segments {
        let not_found = || PathError::SegmentNotFound {
            path: path.to_string(),
            segment: segment.clone(),
        };

        cursor = match cursor {
            Cursor::Scene(scene) => {
                if segment == ENTITY_COUNT_SEGMENT {
                    Cursor::Value(Value::from(scene.entity_count()))
                } else {
                    scene.member(segment).ok_or_else(not_found)?.into()
                }
            }
            Cursor::Entity(entity) => match component_kind(segment) {
                Some(kind) => entity
                    .component(kind)
                    .map(Cursor::Object)
                    .unwrap_or(Cursor::Null),
                None => entity.member(segment).ok_or_else(not_found)?.into(),
            },
            Cursor::Object(object) => object.member(segment).ok_or_else(not_found)?.into(),
            Cursor::Value(value) => Cursor::Value(value_member(&value, segment).ok_or_else(not_found)?),
            Cursor::Null => {
                return Err(PathError::RootNotFound {
                    path: path.to_string(),
                    segment: segment.clone(),
                });
            }
        };
        last = segment.clone();
    }

    let not_a_value = || PathError::NotAValue {
        path: path.to_string(),
        segment: last.clone(),
    };
    match cursor {
        Cursor::Value(value) => Ok(value),
        Cursor::Null => Ok(Value::Null),
        Cursor::Object(object) => object.as_value().ok_or_else(not_a_value),
        Cursor::Scene(_) | Cursor::Entity(_) => Err(not_a_value()),
    }
}

fn component_kind(segment: &str) -> Option<ComponentKind> {
    match segment {
        BOX_COLLIDER_SEGMENT => Some(ComponentKind::BoxCollider),
        RIGIDBODY_SEGMENT => Some(ComponentKind::Rigidbody),
        _ => None,
    }
}

/// Members of plain values (vector axes)
fn value_member(value: &Value, segment: &str) -> Option<Value> {
    match (value, segment) {
        (Value::Vector2 { x, .. }, "X" | "x") => Some(Value::from(*x)),
        (Value::Vector2 { y, .. }, "Y" | "y") => Some(Value::from(*y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SandboxEntity, SandboxScene};
    use bevy::prelude::Vec2;

    fn scene() -> SandboxScene {
        SandboxScene::demo().with_entity(SandboxEntity::new("Door.Left", Vec2::new(5.0, 0.0)))
    }

    #[test]
    fn test_parse_paths() {
        let path = PropertyPath::parse("Entity[Player].Rigidbody.Velocity.X").unwrap();
        assert_eq!(path.root, RootSelector::Entity("Player".to_string()));
        assert_eq!(path.segments, vec!["Rigidbody", "Velocity", "X"]);

        let path = PropertyPath::parse("Scene.EntityCount").unwrap();
        assert_eq!(path.root, RootSelector::Scene);

        let path = PropertyPath::parse("Entity[Door.Left].Position").unwrap();
        assert_eq!(path.root, RootSelector::Entity("Door.Left".to_string()));
        assert_eq!(path.segments, vec!["Position"]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(PropertyPath::parse(""), Err(PathError::Empty));
        assert!(matches!(
            PropertyPath::parse("World.EntityCount"),
            Err(PathError::RootNotFound { .. })
        ));
        assert!(matches!(
            PropertyPath::parse("Entity[Player.Position"),
            Err(PathError::RootNotFound { .. })
        ));
        assert!(matches!(
            PropertyPath::parse("Entity[Player]Position"),
            Err(PathError::RootNotFound { .. })
        ));
        assert!(matches!(
            PropertyPath::parse("Entity[Player]..X"),
            Err(PathError::SegmentNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_values() {
        let scene = scene();
        assert_eq!(resolve(&scene, "Scene.EntityCount"), Ok(Value::Number(4.0)));
        assert_eq!(resolve(&scene, "Entity[Player].Position.X"), Ok(Value::Number(0.0)));
        assert_eq!(resolve(&scene, "Entity[Player].Position.Y"), Ok(Value::Number(1.0)));
        assert_eq!(
            resolve(&scene, "Entity[Player].Position"),
            Ok(Value::from(Vec2::new(0.0, 1.0)))
        );
        assert_eq!(
            resolve(&scene, "Entity[Crate].BoxCollider.Size"),
            Ok(Value::from(Vec2::new(1.0, 1.0)))
        );
        assert_eq!(
            resolve(&scene, "Entity[Player].Rigidbody.IsKinematic"),
            Ok(Value::Bool(false))
        );
        assert_eq!(resolve(&scene, "Entity[Door.Left].Position.X"), Ok(Value::Number(5.0)));
        assert_eq!(resolve(&scene, "Entity[Player].Name"), Ok(Value::from("Player")));
    }

    #[test]
    fn test_missing_component_is_null_then_root_not_found() {
        let scene = scene();
        assert_eq!(resolve(&scene, "Entity[Marker].Rigidbody"), Ok(Value::Null));
        assert_eq!(
            resolve(&scene, "Entity[Marker].Rigidbody.Velocity"),
            Err(PathError::RootNotFound {
                path: "Entity[Marker].Rigidbody.Velocity".to_string(),
                segment: "Velocity".to_string(),
            })
        );
    }

    #[test]
    fn test_resolution_errors() {
        let scene = scene();
        assert_eq!(
            resolve(&scene, "Entity[Ghost].Position.X"),
            Err(PathError::EntityNotFound {
                path: "Entity[Ghost].Position.X".to_string(),
                name: "Ghost".to_string(),
            })
        );
        assert_eq!(
            resolve(&scene, "Entity[Player].Position.Z"),
            Err(PathError::SegmentNotFound {
                path: "Entity[Player].Position.Z".to_string(),
                segment: "Z".to_string(),
            })
        );
        assert!(matches!(
            resolve(&scene, "Entity[Player].Health"),
            Err(PathError::SegmentNotFound { .. })
        ));
        assert!(matches!(
            resolve(&scene, "Entity[Player].Rigidbody"),
            Err(PathError::NotAValue { .. })
        ));
        assert!(matches!(
            resolve(&scene, "Entity[Player]"),
            Err(PathError::NotAValue { .. })
        ));
    }

    #[test]
    fn test_resolution_does_not_mutate() {
        let scene = scene();
        let before = scene.clone();
        let _ = resolve(&scene, "Entity[Player].Rigidbody.Velocity.Y");
        let _ = resolve(&scene, "Entity[Nobody].Position");
        assert_eq!(scene, before);
    }
}
