//! The codec seam and the tagged component blob.
//!
//! Serialisation operations in this crate are written against [`Codec`] so
//! the same property walk drives both the binary wire format and the
//! human-readable editor format. Concrete codecs live in `engine_net`.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A serialisation format for component payloads.
///
/// Implementations must be self-describing: decoding into
/// [`RawValue`](crate::RawValue) relies on `deserialize_any`.
pub trait Codec {
    /// The encoded form (bytes for binary formats, text for readable ones).
    type Blob;

    /// Encode or decode failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short format name for diagnostics.
    fn name(&self) -> &'static str;

    /// Encode a value.
    ///
    /// # Errors
    ///
    /// Returns the codec's error if serialisation fails.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Self::Blob, Self::Error>;

    /// Decode a value.
    ///
    /// # Errors
    ///
    /// Returns the codec's error if the blob is malformed.
    fn decode<T: DeserializeOwned>(&self, blob: &Self::Blob) -> Result<T, Self::Error>;
}

/// A component payload tagged with its canonical type name.
///
/// `V` is [`PropertyValue`](crate::PropertyValue) when encoding and
/// [`RawValue`](crate::RawValue) when decoding. Fields are keyed by name;
/// their order carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedComponent<V> {
    /// Canonical type name from the registry.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Field name to encoded value.
    pub fields: BTreeMap<String, V>,
}

impl<V> TaggedComponent<V> {
    /// Create an empty payload for `type_name`.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }
}
