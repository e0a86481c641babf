//! Core [`Component`] trait and type identity.
//!
//! A component is a typed bundle of properties attached to one entity. The
//! [`Component`] trait is the small closed capability every concrete type
//! implements: expose its [`PropertySet`], clone itself, and react to being
//! attached or removed. Serialisation, diffing and registry dispatch are all
//! written against this trait, so callers never need the concrete type.
//!
//! ## Type Identity
//!
//! [`ComponentTypeId`] is derived from the component's **canonical name**
//! using the FNV-1a 64-bit hash algorithm. This is deterministic and
//! language-neutral, so peers built from other toolchains compute the same
//! id for the same name.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::codec::Codec;
use crate::entity::Entity;
use crate::error::RegistryError;
use crate::properties::{DecodeReport, PropertySet};
use crate::property::{Consumer, PropertyFlags};
use crate::schema::ComponentSchema;

/// A unique identifier for a component type, derived from its canonical name
/// using the FNV-1a 64-bit hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Compute the id for a canonical component name.
    ///
    /// # Algorithm (FNV-1a 64-bit)
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325          (offset basis)
    /// for each byte in name.as_bytes():
    ///     hash = hash XOR byte
    ///     hash = hash * 0x00000100000001b3  (prime)
    /// return hash
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// The id of a concrete component type.
    #[must_use]
    pub const fn of<T: ComponentType>() -> Self {
        Self::from_name(T::NAME)
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:016x}", self.0)
    }
}

/// The capability every component implements.
///
/// Implementations only supply storage access and cloning; everything else
/// is derived from the [`PropertySet`]. Mutation is expected from a single
/// owner at a time (the simulation step holding the entity); there is no
/// internal locking.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
///
/// use engine_component::{
///     ComponentSchema, ComponentType, Field, PropertyFlags, PropertyKind, PropertySet,
///     RegistryError, impl_component,
/// };
///
/// #[derive(Debug, Clone)]
/// struct Health {
///     properties: PropertySet,
/// }
///
/// impl Health {
///     const CURRENT: Field<f32> = Field::new(0, "Current");
/// }
///
/// impl_component!(Health);
///
/// impl ComponentType for Health {
///     const NAME: &'static str = "Health";
///
///     fn schema() -> Result<ComponentSchema, RegistryError> {
///         ComponentSchema::builder(Self::NAME)
///             .field("Current", PropertyKind::Float, PropertyFlags::ALL)
///             .build()
///     }
///
///     fn from_properties(properties: PropertySet) -> Self {
///         Self { properties }
///     }
/// }
///
/// let mut health = Health::from_properties(PropertySet::new(Arc::new(Health::schema().unwrap())));
/// health.properties.set(Health::CURRENT, 80.0).unwrap();
/// ```
pub trait Component: Any + Send + Sync + fmt::Debug {
    /// The component's property table.
    fn properties(&self) -> &PropertySet;

    /// Mutable access to the property table.
    fn properties_mut(&mut self) -> &mut PropertySet;

    /// Clone into a new boxed component, dirty state included.
    fn clone_component(&self) -> Box<dyn Component>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Called after the component is attached to `owner`.
    fn on_added(&mut self, _owner: Entity) {}

    /// Called synchronously when the component leaves `owner`.
    fn on_removed(&mut self, _owner: Entity) {}

    /// The canonical type name.
    fn type_name(&self) -> &str {
        self.properties().type_name()
    }

    /// The type id.
    fn component_type_id(&self) -> ComponentTypeId {
        self.properties().schema().component_type_id()
    }

    /// The owning entity, or [`Entity::INVALID`] while detached.
    fn owner(&self) -> Entity {
        self.properties().owner()
    }

    /// Copy-construct from this instance as a prototype: all values copied,
    /// dirty state cleared, detached.
    fn instantiate(&self) -> Box<dyn Component> {
        let mut copy = self.clone_component();
        *copy.properties_mut() = self.properties().instantiate();
        copy
    }
}

impl dyn Component {
    /// Downcast to a concrete component type.
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Mutable downcast to a concrete component type.
    #[must_use]
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }

    /// Encode the fields flagged `flag`. See [`PropertySet::serialize_filtered`].
    ///
    /// # Errors
    ///
    /// Propagates the codec's encode error.
    pub fn serialize_filtered<C: Codec>(&self, flag: PropertyFlags, codec: &C) -> Result<C::Blob, C::Error> {
        self.properties().serialize_filtered(flag, codec)
    }

    /// Decode and apply the fields flagged `flag`. See
    /// [`PropertySet::deserialize_filtered`].
    ///
    /// # Errors
    ///
    /// Returns the codec's error only if the blob is not a map.
    pub fn deserialize_filtered<C: Codec>(
        &mut self,
        flag: PropertyFlags,
        blob: &C::Blob,
        codec: &C,
    ) -> Result<DecodeReport, C::Error> {
        self.properties_mut().deserialize_filtered(flag, blob, codec)
    }

    /// Encode the fields pending for `consumer` and clear its view.
    ///
    /// # Errors
    ///
    /// Propagates the codec's encode error.
    pub fn serialize_dirty<C: Codec>(&mut self, consumer: Consumer, codec: &C) -> Result<C::Blob, C::Error> {
        self.properties_mut().serialize_dirty(consumer, codec)
    }
}

/// The static side of a concrete component type.
pub trait ComponentType: Component + Sized {
    /// Canonical type name.
    const NAME: &'static str;

    /// Build the type's property table.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidSchema`] for a malformed declaration.
    fn schema() -> Result<ComponentSchema, RegistryError>;

    /// Wrap a property set built from [`ComponentType::schema`].
    fn from_properties(properties: PropertySet) -> Self;
}

/// Builds a boxed component around a property set. Stored by the registry.
pub type ComponentFactory = fn(PropertySet) -> Box<dyn Component>;

/// A component declared only through its schema.
///
/// Used for types that exist in the type table without a dedicated Rust
/// struct; all access goes through the property set by name.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicComponent {
    properties: PropertySet,
}

impl DynamicComponent {
    /// A fresh instance with the schema's defaults.
    #[must_use]
    pub fn new(schema: Arc<ComponentSchema>) -> Self {
        Self {
            properties: PropertySet::new(schema),
        }
    }

    /// The registry factory for schema-only types.
    #[must_use]
    pub fn boxed(properties: PropertySet) -> Box<dyn Component> {
        Box::new(Self { properties })
    }
}

crate::impl_component!(DynamicComponent);
