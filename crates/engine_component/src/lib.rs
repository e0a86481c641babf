//! # engine_component
//!
//! The entity/component core: what a component is, how its fields are
//! described and tracked, and how component types are resolved by name.
//!
//! This crate provides:
//!
//! - [`PropertyDescriptor`] / [`Property`] — field declarations with
//!   participation flags, and per-consumer dirty tracking.
//! - [`Component`] trait and [`PropertySet`] — the capability every component
//!   type implements, and the filtered serialisation walk behind it.
//! - [`EntityRecord`] — the components attached to one [`Entity`].
//! - [`TypeRegistryBuilder`] / [`TypeRegistry`] — name↔type lookup, default
//!   prototypes and participation policies, with a hard freeze point.
//! - [`diff`] — diffs of components against their registered default.
//! - [`Codec`] — the seam concrete wire and editor formats plug into.

pub mod codec;
pub mod component;
pub mod diff;
pub mod entity;
pub mod error;
mod macros;
pub mod properties;
pub mod property;
pub mod record;
pub mod registry;
pub mod schema;
pub mod value;

#[cfg(test)]
mod testing;

pub use codec::{Codec, TaggedComponent};
pub use component::{Component, ComponentFactory, ComponentType, ComponentTypeId, DynamicComponent};
pub use diff::{ComponentDiff, apply_diff, diff_against_default, diff_against_default_filtered};
pub use entity::{Entity, EntityAllocator, EntityRemap};
pub use error::{ComponentError, RegistryError};
pub use properties::{DecodeReport, PropertySet};
pub use property::{Consumer, Field, Property, PropertyDescriptor, PropertyFlags};
pub use record::EntityRecord;
pub use registry::{ParticipationPolicy, Registration, TypeRegistry, TypeRegistryBuilder};
pub use schema::{ComponentSchema, SchemaBuilder};
pub use value::{PropertyKind, PropertyType, PropertyValue, RawValue};
