//! Scene snapshot serialization capability

use thiserror::Error;

use super::Scene;

/// Errors from serializing or restoring a scene snapshot
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("scene type is not supported by this codec")]
    UnsupportedScene,

    #[error("failed to encode scene: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode scene snapshot: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Turns a live scene into a textual snapshot and back.
///
/// A round trip must preserve every entity name, position and component state
/// that property paths can address.
pub trait SceneCodec: Send + Sync {
    fn serialize(&self, scene: &dyn Scene) -> Result<String, CodecError>;

    fn deserialize(&self, blob: &str) -> Result<Box<dyn Scene>, CodecError>;
}
