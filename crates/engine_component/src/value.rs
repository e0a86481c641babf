//! Semantic property values.
//!
//! A [`PropertyValue`] is the payload of one component field. Every value has
//! exactly one [`PropertyKind`], which is fixed by the field's declaration.
//!
//! ## Wire shape
//!
//! Values serialise as plain serde data so any self-describing format can
//! carry them:
//!
//! | kind     | encoded as                         |
//! |----------|------------------------------------|
//! | `Bool`   | bool                               |
//! | `Int`    | i64                                |
//! | `UInt`   | u64                                |
//! | `Float`  | f32                                |
//! | `String` | string                             |
//! | `Vec3`   | map `{"X", "Y", "Z"}` of f32       |
//! | `Vec4`   | map `{"X", "Y", "Z", "W"}` of f32  |
//! | `Entity` | u64 entity id                      |
//!
//! Decoding goes through [`RawValue`], which captures whatever the codec saw.
//! The owning field's declared kind then decides how the raw value is read,
//! so a shape disagreement is detected per field instead of failing the whole
//! payload.

use std::collections::BTreeMap;
use std::fmt;

use glam::{Vec3, Vec4};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Axis names used for vector values, in component order.
const AXES: [&str; 4] = ["X", "Y", "Z", "W"];

/// The semantic type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    Bool,
    Int,
    UInt,
    Float,
    String,
    Vec3,
    Vec4,
    /// A non-owning reference to another entity.
    Entity,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::String => "string",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Entity => "entity",
        };
        f.write_str(name)
    }
}

/// The value held by one property.
///
/// Equality is exact. Floats (and vector axes) compare by bit pattern, so
/// `NaN` equals an identical `NaN` and `0.0` differs from `-0.0`. Any
/// tolerance belongs to the simulation code that produces the values.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f32),
    String(String),
    Vec3(Vec3),
    Vec4(Vec4),
    Entity(Entity),
}

impl PropertyValue {
    /// Returns the kind of this value.
    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Bool(_) => PropertyKind::Bool,
            Self::Int(_) => PropertyKind::Int,
            Self::UInt(_) => PropertyKind::UInt,
            Self::Float(_) => PropertyKind::Float,
            Self::String(_) => PropertyKind::String,
            Self::Vec3(_) => PropertyKind::Vec3,
            Self::Vec4(_) => PropertyKind::Vec4,
            Self::Entity(_) => PropertyKind::Entity,
        }
    }

    /// Read a decoded [`RawValue`] as a value of `kind`.
    ///
    /// Returns `None` when the raw shape cannot represent `kind`. Integers
    /// are accepted for `Float` fields, and a vector map with a missing axis
    /// reads that axis as `0.0`.
    #[must_use]
    pub fn from_raw(kind: PropertyKind, raw: &RawValue) -> Option<Self> {
        match kind {
            PropertyKind::Bool => match raw {
                RawValue::Bool(v) => Some(Self::Bool(*v)),
                _ => None,
            },
            PropertyKind::Int => match raw {
                RawValue::Int(v) => Some(Self::Int(*v)),
                RawValue::UInt(v) => i64::try_from(*v).ok().map(Self::Int),
                _ => None,
            },
            PropertyKind::UInt => match raw {
                RawValue::UInt(v) => Some(Self::UInt(*v)),
                RawValue::Int(v) => u64::try_from(*v).ok().map(Self::UInt),
                _ => None,
            },
            PropertyKind::Float => raw.as_f32().map(Self::Float),
            PropertyKind::String => match raw {
                RawValue::String(v) => Some(Self::String(v.clone())),
                _ => None,
            },
            PropertyKind::Vec3 => {
                read_axes::<3>(raw).map(|[x, y, z]| Self::Vec3(Vec3::new(x, y, z)))
            }
            PropertyKind::Vec4 => {
                read_axes::<4>(raw).map(|[x, y, z, w]| Self::Vec4(Vec4::new(x, y, z, w)))
            }
            PropertyKind::Entity => match raw {
                RawValue::UInt(v) => Some(Self::Entity(Entity::from_raw(*v))),
                RawValue::Int(v) => u64::try_from(*v).ok().map(|id| Self::Entity(Entity::from_raw(id))),
                _ => None,
            },
        }
    }
}

fn bits_eq(a: &[f32], b: &[f32]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Vec3(a), Self::Vec3(b)) => bits_eq(&a.to_array(), &b.to_array()),
            (Self::Vec4(a), Self::Vec4(b)) => bits_eq(&a.to_array(), &b.to_array()),
            (Self::Entity(a), Self::Entity(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PropertyValue {}

fn serialize_axes<S: Serializer>(serializer: S, axes: &[f32]) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(axes.len()))?;
    for (name, value) in AXES.iter().zip(axes) {
        map.serialize_entry(name, value)?;
    }
    map.end()
}

fn read_axes<const N: usize>(raw: &RawValue) -> Option<[f32; N]> {
    let RawValue::Map(entries) = raw else {
        return None;
    };
    let mut axes = [0.0; N];
    for (slot, name) in axes.iter_mut().zip(AXES) {
        if let Some(value) = entries.get(name) {
            *slot = value.as_f32()?;
        }
    }
    Some(axes)
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::UInt(v) => serializer.serialize_u64(*v),
            Self::Float(v) => serializer.serialize_f32(*v),
            Self::String(v) => serializer.serialize_str(v),
            Self::Vec3(v) => serialize_axes(serializer, &v.to_array()),
            Self::Vec4(v) => serialize_axes(serializer, &v.to_array()),
            Self::Entity(e) => serializer.serialize_u64(e.id()),
        }
    }
}

/// A Rust type that maps onto exactly one [`PropertyKind`].
///
/// Used by typed accessors such as [`PropertySet::get`](crate::PropertySet::get).
pub trait PropertyType: Sized {
    /// The kind a field must be declared with to hold this type.
    const KIND: PropertyKind;

    /// Wrap `self` into a [`PropertyValue`].
    fn into_value(self) -> PropertyValue;

    /// Extract `Self` from a value of the matching kind.
    fn from_value(value: &PropertyValue) -> Option<Self>;
}

macro_rules! copy_property_type {
    ($ty:ty, $variant:ident) => {
        impl PropertyType for $ty {
            const KIND: PropertyKind = PropertyKind::$variant;

            fn into_value(self) -> PropertyValue {
                PropertyValue::$variant(self)
            }

            fn from_value(value: &PropertyValue) -> Option<Self> {
                match value {
                    PropertyValue::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }

        impl From<$ty> for PropertyValue {
            fn from(value: $ty) -> Self {
                PropertyValue::$variant(value)
            }
        }
    };
}

copy_property_type!(bool, Bool);
copy_property_type!(i64, Int);
copy_property_type!(u64, UInt);
copy_property_type!(f32, Float);
copy_property_type!(Vec3, Vec3);
copy_property_type!(Vec4, Vec4);
copy_property_type!(Entity, Entity);

impl PropertyType for String {
    const KIND: PropertyKind = PropertyKind::String;

    fn into_value(self) -> PropertyValue {
        PropertyValue::String(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::String(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_owned())
    }
}

/// A decoded value whose semantic kind is not yet known.
///
/// Produced by any self-describing codec via `deserialize_any`. Convert with
/// [`PropertyValue::from_raw`] once the target field's kind is known.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float32(f32),
    Float(f64),
    String(String),
    Seq(Vec<RawValue>),
    Map(BTreeMap<String, RawValue>),
}

impl RawValue {
    /// A short description of the raw shape, for diagnostics.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float32(_) | Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Seq(_) => "sequence",
            Self::Map(_) => "map",
        }
    }

    fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float32(v) => Some(*v),
            Self::Float(v) => Some(*v as f32),
            Self::Int(v) => Some(*v as f32),
            Self::UInt(v) => Some(*v as f32),
            _ => None,
        }
    }
}

impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Nil => serializer.serialize_unit(),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::UInt(v) => serializer.serialize_u64(*v),
            Self::Float32(v) => serializer.serialize_f32(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::String(v) => serializer.serialize_str(v),
            Self::Seq(items) => items.serialize(serializer),
            Self::Map(entries) => entries.serialize(serializer),
        }
    }
}

struct RawValueVisitor;

impl<'de> Visitor<'de> for RawValueVisitor {
    type Value = RawValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a property value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<RawValue, E> {
        Ok(RawValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawValue, E> {
        Ok(RawValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawValue, E> {
        Ok(RawValue::UInt(v))
    }

    // Overridden so MessagePack float32 values are not widened.
    fn visit_f32<E: de::Error>(self, v: f32) -> Result<RawValue, E> {
        Ok(RawValue::Float32(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RawValue, E> {
        Ok(RawValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RawValue, E> {
        Ok(RawValue::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<RawValue, E> {
        Ok(RawValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<RawValue, E> {
        Ok(RawValue::Nil)
    }

    fn visit_none<E: de::Error>(self) -> Result<RawValue, E> {
        Ok(RawValue::Nil)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<RawValue, D::Error> {
        RawValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(RawValue::Seq(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawValue, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, RawValue>()? {
            entries.insert(key, value);
        }
        Ok(RawValue::Map(entries))
    }
}

impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawValueVisitor)
    }
}
