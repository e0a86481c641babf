//! Scene lighting.

use engine_component::{
    ComponentError, ComponentSchema, ComponentType, Field, PropertyFlags, PropertyKind, PropertySet, RegistryError,
    impl_component,
};
use glam::Vec3;

/// A directional light. Both vectors have no default and must be assigned
/// before they are read.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    properties: PropertySet,
}

impl DirectionalLight {
    pub const POSITION: Field<Vec3> = Field::new(0, "Position");
    pub const DIRECTION: Field<Vec3> = Field::new(1, "Direction");

    /// # Errors
    ///
    /// [`ComponentError::MissingRequiredDefault`] if never assigned.
    pub fn position(&self) -> Result<Vec3, ComponentError> {
        self.properties.get(Self::POSITION)
    }

    /// # Errors
    ///
    /// [`ComponentError::MissingRequiredDefault`] if never assigned.
    pub fn direction(&self) -> Result<Vec3, ComponentError> {
        self.properties.get(Self::DIRECTION)
    }

    /// Place the light and aim it. `direction` is stored normalised.
    ///
    /// # Errors
    ///
    /// Only if the property table was built from a different schema.
    pub fn aim(&mut self, position: Vec3, direction: Vec3) -> Result<(), ComponentError> {
        self.properties.set(Self::POSITION, position)?;
        self.properties
            .set(Self::DIRECTION, direction.normalize_or_zero())?;
        Ok(())
    }
}

impl_component!(DirectionalLight);

impl ComponentType for DirectionalLight {
    const NAME: &'static str = "DirectionalLight";

    fn schema() -> Result<ComponentSchema, RegistryError> {
        let flags = PropertyFlags::REPLICATE | PropertyFlags::PERSIST;
        ComponentSchema::builder(Self::NAME)
            .field("Position", PropertyKind::Vec3, flags)
            .field("Direction", PropertyKind::Vec3, flags)
            .build()
    }

    fn from_properties(properties: PropertySet) -> Self {
        Self { properties }
    }
}
