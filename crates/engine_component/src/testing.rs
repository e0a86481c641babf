//! Shared fixtures for unit tests.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::Codec;
use crate::property::{PropertyDescriptor, PropertyFlags};
use crate::schema::ComponentSchema;
use crate::value::PropertyKind;

#[derive(Debug, thiserror::Error)]
pub enum MsgPackError {
    #[error(transparent)]
    Encode(#[from] rmp_serde::encode::Error),
    #[error(transparent)]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Named-map MessagePack, the same layout the wire codec uses.
#[derive(Debug, Clone, Copy)]
pub struct MsgPack;

impl Codec for MsgPack {
    type Blob = Vec<u8>;
    type Error = MsgPackError;

    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, MsgPackError> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, blob: &Vec<u8>) -> Result<T, MsgPackError> {
        Ok(rmp_serde::from_slice(blob)?)
    }
}

/// `Transform { X, Y, Z: float = 0 [replicate, persist]; Label: string [editor] }`
pub fn transform_schema() -> ComponentSchema {
    let axis = |name: &str| {
        PropertyDescriptor::new(name, PropertyKind::Float)
            .with_flags(PropertyFlags::REPLICATE | PropertyFlags::PERSIST)
            .with_default(0.0f32)
    };
    ComponentSchema::builder("Transform")
        .property(axis("X"))
        .property(axis("Y"))
        .property(axis("Z"))
        .field("Label", PropertyKind::String, PropertyFlags::EDITOR)
        .build()
        .expect("fixture schema is valid")
}

/// `Mesh { Path: string = "" [all] }`, requiring `Transform`.
pub fn mesh_schema() -> ComponentSchema {
    ComponentSchema::builder("Mesh")
        .property(
            PropertyDescriptor::new("Path", PropertyKind::String)
                .with_flags(PropertyFlags::ALL)
                .with_default(""),
        )
        .requires("Transform")
        .build()
        .expect("fixture schema is valid")
}
