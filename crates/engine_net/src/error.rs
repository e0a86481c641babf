//! Serialisation-layer error types.

use engine_component::{ComponentError, RegistryError};

/// Errors that can occur while encoding, decoding or restoring payloads.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Failed to encode a payload to MessagePack.
    #[error("failed to encode payload: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a payload from MessagePack.
    #[error("failed to decode payload: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Failed to encode or decode an editor (JSON) payload.
    #[error("editor payload error: {0}")]
    Editor(#[from] serde_json::Error),

    /// A registry lookup failed outside of component-scoped recovery.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A component operation failed outside of field-scoped recovery.
    #[error(transparent)]
    Component(#[from] ComponentError),
}
