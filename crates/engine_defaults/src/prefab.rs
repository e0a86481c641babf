//! Prefab membership.

use engine_component::{
    ComponentError, ComponentSchema, ComponentType, Entity, Field, PropertyFlags, PropertyKind, PropertySet,
    RegistryError, TypeRegistry, impl_component,
};
use uuid::Uuid;

/// Marks an entity as spawned from a prefab.
///
/// None of the fields has a default: a `Prefab` is only meaningful once it
/// names its instance owner, the prefab it came from and its index within
/// that prefab.
#[derive(Debug, Clone, PartialEq)]
pub struct Prefab {
    properties: PropertySet,
}

impl Prefab {
    /// The entity owning this prefab instance.
    pub const INSTANCE_OWNER: Field<Entity> = Field::new(0, "InstanceOwner");
    /// Identifier of the saved prefab, used to find its default components.
    pub const PREFAB_IDENTIFIER: Field<String> = Field::new(1, "PrefabIdentifier");
    /// This entity's position within the prefab.
    pub const ENTITY_INDEX: Field<u64> = Field::new(2, "EntityIndex");

    /// A fresh prefab identifier.
    #[must_use]
    pub fn new_identifier() -> String {
        Uuid::new_v4().to_string()
    }

    /// A fully assigned instance built from the registry's prototype.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownType`] if `Prefab` is not registered.
    pub fn spawned(
        registry: &TypeRegistry,
        owner: Entity,
        identifier: &str,
        entity_index: u64,
    ) -> Result<Self, ComponentError> {
        let mut prefab = registry.create_typed::<Self>()?;
        prefab.properties.set(Self::INSTANCE_OWNER, owner)?;
        prefab
            .properties
            .set(Self::PREFAB_IDENTIFIER, identifier.to_owned())?;
        prefab.properties.set(Self::ENTITY_INDEX, entity_index)?;
        Ok(prefab)
    }

    /// # Errors
    ///
    /// [`ComponentError::MissingRequiredDefault`] if never assigned.
    pub fn instance_owner(&self) -> Result<Entity, ComponentError> {
        self.properties.get(Self::INSTANCE_OWNER)
    }

    /// # Errors
    ///
    /// [`ComponentError::MissingRequiredDefault`] if never assigned.
    pub fn identifier(&self) -> Result<String, ComponentError> {
        self.properties.get(Self::PREFAB_IDENTIFIER)
    }

    /// # Errors
    ///
    /// [`ComponentError::MissingRequiredDefault`] if never assigned.
    pub fn entity_index(&self) -> Result<u64, ComponentError> {
        self.properties.get(Self::ENTITY_INDEX)
    }
}

impl_component!(Prefab);

impl ComponentType for Prefab {
    const NAME: &'static str = "Prefab";

    fn schema() -> Result<ComponentSchema, RegistryError> {
        ComponentSchema::builder(Self::NAME)
            .field("InstanceOwner", PropertyKind::Entity, PropertyFlags::ALL)
            .field("PrefabIdentifier", PropertyKind::String, PropertyFlags::ALL)
            .field("EntityIndex", PropertyKind::UInt, PropertyFlags::ALL)
            .build()
    }

    fn from_properties(properties: PropertySet) -> Self {
        Self { properties }
    }
}
