//! Process-wide component type registry.
//!
//! The registry maps canonical type names to [`ComponentTypeId`]s (and back),
//! and holds one default prototype per type. Prototypes serve both as the
//! source for fresh instances and as the baseline for diffing.
//!
//! ## Lifecycle
//!
//! 1. **Registration.** A single-threaded startup phase fills a
//!    [`TypeRegistryBuilder`], typically from the generated type table.
//! 2. **Freeze.** [`TypeRegistryBuilder::freeze`] validates the table and
//!    returns an immutable [`TypeRegistry`]. There is no way back: a frozen
//!    registry has no registration methods.
//! 3. **Use.** The frozen registry is `Send + Sync` and read-only, so any
//!    number of simulation or network threads may share it by reference or
//!    through an `Arc` without locking.
//! 4. **Teardown.** Dropping the registry drops the prototypes. Components
//!    created from it own their schema handles and outlive it safely.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::codec::Codec;
use crate::component::{Component, ComponentFactory, ComponentType, ComponentTypeId, DynamicComponent};
use crate::error::RegistryError;
use crate::properties::PropertySet;
use crate::property::PropertyFlags;
use crate::schema::ComponentSchema;

/// Type-level gate on whether a component type ever leaves the process.
///
/// Checked before the per-field flags: a field reaches a save blob only if
/// its type persists **and** the field is flagged
/// [`PropertyFlags::PERSIST`] (likewise for replication).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipationPolicy {
    /// Eligible for save files.
    pub persist: bool,
    /// Eligible for network replication.
    pub replicate: bool,
}

impl ParticipationPolicy {
    /// Saved and replicated.
    pub const ALL: Self = Self {
        persist: true,
        replicate: true,
    };

    /// Neither saved nor replicated.
    pub const LOCAL: Self = Self {
        persist: false,
        replicate: false,
    };

    /// Saved only.
    pub const SAVE_ONLY: Self = Self {
        persist: true,
        replicate: false,
    };

    /// Replicated only.
    pub const NETWORK_ONLY: Self = Self {
        persist: false,
        replicate: true,
    };

    /// Returns `true` if the policy admits a pass filtering on `flag`.
    ///
    /// Flags other than replicate and persist (editor visibility) are not
    /// gated at type level.
    #[must_use]
    pub const fn allows(self, flag: PropertyFlags) -> bool {
        if flag.contains(PropertyFlags::REPLICATE) && !self.replicate {
            return false;
        }
        if flag.contains(PropertyFlags::PERSIST) && !self.persist {
            return false;
        }
        true
    }
}

impl Default for ParticipationPolicy {
    fn default() -> Self {
        Self::ALL
    }
}

/// One registered component type.
#[derive(Debug)]
pub struct Registration {
    name: String,
    type_id: ComponentTypeId,
    factory: ComponentFactory,
    prototype: Box<dyn Component>,
    policy: ParticipationPolicy,
}

impl Registration {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn type_id(&self) -> ComponentTypeId {
        self.type_id
    }

    #[must_use]
    pub fn policy(&self) -> ParticipationPolicy {
        self.policy
    }

    /// The default instance.
    #[must_use]
    pub fn prototype(&self) -> &dyn Component {
        self.prototype.as_ref()
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<ComponentSchema> {
        self.prototype.properties().schema()
    }

    /// A fresh instance carrying the prototype's values, built through the
    /// type's factory.
    #[must_use]
    pub fn instantiate(&self) -> Box<dyn Component> {
        (self.factory)(self.prototype.properties().instantiate())
    }
}

#[derive(Debug, Default)]
struct Tables {
    entries: Vec<Registration>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<ComponentTypeId, usize>,
}

/// The open registration phase of the type registry.
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    tables: Tables,
}

impl TypeRegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::DuplicateRegistration`] if `name` or `type_id` is
    ///   already present.
    /// - [`RegistryError::InconsistentRegistration`] if the prototype's own
    ///   name or id disagrees with `name` / `type_id`, since both lookup
    ///   directions must resolve to the same entry.
    pub fn register(
        &mut self,
        name: &str,
        type_id: ComponentTypeId,
        factory: ComponentFactory,
        prototype: Box<dyn Component>,
        policy: ParticipationPolicy,
    ) -> Result<(), RegistryError> {
        let tables = &mut self.tables;
        if tables.by_name.contains_key(name) || tables.by_id.contains_key(&type_id) {
            return Err(RegistryError::DuplicateRegistration {
                name: name.to_owned(),
                type_id,
            });
        }
        if prototype.type_name() != name || prototype.component_type_id() != type_id {
            return Err(RegistryError::InconsistentRegistration {
                name: name.to_owned(),
                type_id,
                prototype: prototype.type_name().to_owned(),
            });
        }

        let index = tables.entries.len();
        tables.by_name.insert(name.to_owned(), index);
        tables.by_id.insert(type_id, index);
        tables.entries.push(Registration {
            name: name.to_owned(),
            type_id,
            factory,
            prototype: prototype.instantiate(),
            policy,
        });
        debug!(name, %type_id, ?policy, "registered component type");
        Ok(())
    }

    /// Register a concrete [`ComponentType`] with its declared defaults as the
    /// prototype.
    ///
    /// # Errors
    ///
    /// See [`TypeRegistryBuilder::register`]; also propagates schema errors.
    pub fn register_type<T: ComponentType>(&mut self, policy: ParticipationPolicy) -> Result<(), RegistryError> {
        let schema = Arc::new(T::schema()?);
        let prototype = T::from_properties(PropertySet::new(schema));
        self.register_prototype(prototype, policy)
    }

    /// Register a concrete [`ComponentType`] with a customised prototype.
    ///
    /// # Errors
    ///
    /// See [`TypeRegistryBuilder::register`].
    pub fn register_prototype<T: ComponentType>(
        &mut self,
        prototype: T,
        policy: ParticipationPolicy,
    ) -> Result<(), RegistryError> {
        fn build<T: ComponentType>(properties: PropertySet) -> Box<dyn Component> {
            Box::new(T::from_properties(properties))
        }
        self.register(
            T::NAME,
            ComponentTypeId::of::<T>(),
            build::<T>,
            Box::new(prototype),
            policy,
        )
    }

    /// Register a schema-only type backed by [`DynamicComponent`].
    ///
    /// # Errors
    ///
    /// See [`TypeRegistryBuilder::register`].
    pub fn register_schema(
        &mut self,
        schema: ComponentSchema,
        policy: ParticipationPolicy,
    ) -> Result<(), RegistryError> {
        let name = schema.name().to_owned();
        let type_id = schema.component_type_id();
        let prototype = DynamicComponent::new(Arc::new(schema));
        self.register(&name, type_id, DynamicComponent::boxed, Box::new(prototype), policy)
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tables.by_name.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.entries.is_empty()
    }

    /// Close registration.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownRequirement`] if a type requires a
    /// co-component that was never registered.
    pub fn freeze(self) -> Result<TypeRegistry, RegistryError> {
        for entry in &self.tables.entries {
            for required in entry.schema().requires() {
                if !self.tables.by_name.contains_key(required) {
                    return Err(RegistryError::UnknownRequirement {
                        component: entry.name.clone(),
                        required: required.clone(),
                    });
                }
            }
        }
        info!(types = self.tables.entries.len(), "type registry frozen");
        Ok(TypeRegistry { tables: self.tables })
    }
}

/// The frozen, read-only type registry.
#[derive(Debug)]
pub struct TypeRegistry {
    tables: Tables,
}

impl TypeRegistry {
    fn entry(&self, type_id: ComponentTypeId) -> Result<&Registration, RegistryError> {
        self.tables
            .by_id
            .get(&type_id)
            .map(|&i| &self.tables.entries[i])
            .ok_or_else(|| RegistryError::UnknownType(type_id.to_string()))
    }

    fn entry_by_name(&self, name: &str) -> Result<&Registration, RegistryError> {
        self.tables
            .by_name
            .get(name)
            .map(|&i| &self.tables.entries[i])
            .ok_or_else(|| RegistryError::UnknownType(name.to_owned()))
    }

    /// The registration for `type_id`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownType`].
    pub fn get(&self, type_id: ComponentTypeId) -> Result<&Registration, RegistryError> {
        self.entry(type_id)
    }

    /// Name to type id.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownType`].
    pub fn type_for(&self, name: &str) -> Result<ComponentTypeId, RegistryError> {
        self.entry_by_name(name).map(|e| e.type_id)
    }

    /// Type id to canonical name.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownType`].
    pub fn name_for(&self, type_id: ComponentTypeId) -> Result<&str, RegistryError> {
        self.entry(type_id).map(|e| e.name.as_str())
    }

    /// Returns `true` if `type_id` is registered.
    #[must_use]
    pub fn contains(&self, type_id: ComponentTypeId) -> bool {
        self.tables.by_id.contains_key(&type_id)
    }

    /// A fresh instance of the type named `name`, cloned from its prototype.
    ///
    /// Callers reconstructing saved or received data should treat
    /// [`RegistryError::UnknownType`] as recoverable and skip the component.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownType`].
    pub fn create_by_name(&self, name: &str) -> Result<Box<dyn Component>, RegistryError> {
        self.entry_by_name(name).map(Registration::instantiate)
    }

    /// A fresh instance of `type_id`, cloned from its prototype.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownType`].
    pub fn create(&self, type_id: ComponentTypeId) -> Result<Box<dyn Component>, RegistryError> {
        self.entry(type_id).map(Registration::instantiate)
    }

    /// A fresh, concretely typed instance cloned from the prototype.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownType`] if `T` is not registered.
    pub fn create_typed<T: ComponentType>(&self) -> Result<T, RegistryError> {
        let entry = self.entry(ComponentTypeId::of::<T>())?;
        Ok(T::from_properties(entry.prototype.properties().instantiate()))
    }

    /// The default instance for `type_id`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownType`].
    pub fn prototype(&self, type_id: ComponentTypeId) -> Result<&dyn Component, RegistryError> {
        self.entry(type_id).map(Registration::prototype)
    }

    /// The schema for `type_id`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownType`].
    pub fn schema(&self, type_id: ComponentTypeId) -> Result<&Arc<ComponentSchema>, RegistryError> {
        self.entry(type_id).map(Registration::schema)
    }

    /// The participation policy for `type_id`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownType`].
    pub fn policy(&self, type_id: ComponentTypeId) -> Result<ParticipationPolicy, RegistryError> {
        self.entry(type_id).map(|e| e.policy)
    }

    /// Whether the type is ever saved. Unknown types are never saved.
    #[must_use]
    pub fn should_persist(&self, type_id: ComponentTypeId) -> bool {
        self.participates(type_id, PropertyFlags::PERSIST)
    }

    /// Whether the type is ever replicated. Unknown types are never
    /// replicated.
    #[must_use]
    pub fn should_replicate(&self, type_id: ComponentTypeId) -> bool {
        self.participates(type_id, PropertyFlags::REPLICATE)
    }

    /// Whether a pass filtering on `flag` may include the type at all.
    #[must_use]
    pub fn participates(&self, type_id: ComponentTypeId, flag: PropertyFlags) -> bool {
        self.entry(type_id).is_ok_and(|e| e.policy.allows(flag))
    }

    /// Apply the type-level gate, then encode the fields flagged `flag`.
    ///
    /// Returns `Ok(None)` when the component's type is excluded from `flag`
    /// passes (or unknown), so no field of it can leak into the blob.
    ///
    /// # Errors
    ///
    /// Propagates the codec's encode error.
    pub fn serialize_component<C: Codec>(
        &self,
        component: &dyn Component,
        flag: PropertyFlags,
        codec: &C,
    ) -> Result<Option<C::Blob>, C::Error> {
        let type_id = component.component_type_id();
        if !self.participates(type_id, flag) {
            if !self.contains(type_id) {
                warn!(component = component.type_name(), "refusing to serialise unregistered component type");
            }
            return Ok(None);
        }
        component.serialize_filtered(flag, codec).map(Some)
    }

    /// Iterate over registrations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.tables.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.entries.is_empty()
    }
}
