//! Concrete payload codecs.
//!
//! [`WireCodec`] is the binary format used on the network and in save files:
//! MessagePack with structs written as maps keyed by field name, so
//! reordering fields never changes how a blob is read. [`EditorCodec`] is the
//! human-readable form of the same structure, used by inspection tooling.

use engine_component::Codec;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::NetError;

/// Binary MessagePack codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireCodec;

impl Codec for WireCodec {
    type Blob = Vec<u8>;
    type Error = NetError;

    fn name(&self) -> &'static str {
        "wire"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, NetError> {
        encode(value)
    }

    fn decode<T: DeserializeOwned>(&self, blob: &Vec<u8>) -> Result<T, NetError> {
        decode(blob)
    }
}

/// Human-readable JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditorCodec {
    /// Indent output for display.
    pub pretty: bool,
}

impl EditorCodec {
    #[must_use]
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Codec for EditorCodec {
    type Blob = String;
    type Error = NetError;

    fn name(&self) -> &'static str {
        "editor"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, NetError> {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(text)
    }

    fn decode<T: DeserializeOwned>(&self, blob: &String) -> Result<T, NetError> {
        Ok(serde_json::from_str(blob)?)
    }
}

/// Encode a value to name-keyed MessagePack bytes.
///
/// # Errors
///
/// Returns [`NetError::Encode`] if serialisation fails.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, NetError> {
    rmp_serde::to_vec_named(value).map_err(NetError::Encode)
}

/// Decode a value from MessagePack bytes.
///
/// # Errors
///
/// Returns [`NetError::Decode`] if deserialisation fails.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, NetError> {
    rmp_serde::from_slice(bytes).map_err(NetError::Decode)
}
