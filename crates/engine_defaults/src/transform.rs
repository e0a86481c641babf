//! World-space placement.

use engine_component::{
    ComponentError, ComponentSchema, ComponentType, Field, PropertyDescriptor, PropertyFlags, PropertyKind,
    PropertySet, RegistryError, impl_component,
};
use glam::Vec3;

/// Position of an entity in world units.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    properties: PropertySet,
}

impl Transform {
    pub const X: Field<f32> = Field::new(0, "X");
    pub const Y: Field<f32> = Field::new(1, "Y");
    pub const Z: Field<f32> = Field::new(2, "Z");

    /// The position as a vector.
    ///
    /// # Errors
    ///
    /// Only if the property table was built from a different schema.
    pub fn position(&self) -> Result<Vec3, ComponentError> {
        Ok(Vec3::new(
            self.properties.get(Self::X)?,
            self.properties.get(Self::Y)?,
            self.properties.get(Self::Z)?,
        ))
    }

    /// Move to `position`. Returns `true` if any axis changed.
    ///
    /// # Errors
    ///
    /// Only if the property table was built from a different schema.
    pub fn set_position(&mut self, position: Vec3) -> Result<bool, ComponentError> {
        let x = self.properties.set(Self::X, position.x)?;
        let y = self.properties.set(Self::Y, position.y)?;
        let z = self.properties.set(Self::Z, position.z)?;
        Ok(x || y || z)
    }
}

impl_component!(Transform);

impl ComponentType for Transform {
    const NAME: &'static str = "Transform";

    fn schema() -> Result<ComponentSchema, RegistryError> {
        let axis = |name: &str| {
            PropertyDescriptor::new(name, PropertyKind::Float)
                .with_flags(PropertyFlags::REPLICATE | PropertyFlags::PERSIST)
                .with_default(0.0f32)
        };
        ComponentSchema::builder(Self::NAME)
            .property(axis("X"))
            .property(axis("Y"))
            .property(axis("Z"))
            .build()
    }

    fn from_properties(properties: PropertySet) -> Self {
        Self { properties }
    }
}
