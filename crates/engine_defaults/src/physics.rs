//! Collision shapes.

use engine_component::{
    ComponentError, ComponentSchema, ComponentType, Field, PropertyDescriptor, PropertyFlags, PropertyKind,
    PropertySet, RegistryError, impl_component,
};

/// An upright capsule collider, sized for a humanoid by default.
#[derive(Debug, Clone, PartialEq)]
pub struct CapsuleCollider {
    properties: PropertySet,
}

impl CapsuleCollider {
    pub const HEIGHT: Field<f32> = Field::new(0, "Height");
    pub const WIDTH: Field<f32> = Field::new(1, "Width");

    pub const DEFAULT_HEIGHT: f32 = 1.6;
    pub const DEFAULT_WIDTH: f32 = 0.5;

    /// # Errors
    ///
    /// Only if the property table was built from a different schema.
    pub fn height(&self) -> Result<f32, ComponentError> {
        self.properties.get(Self::HEIGHT)
    }

    /// # Errors
    ///
    /// Only if the property table was built from a different schema.
    pub fn width(&self) -> Result<f32, ComponentError> {
        self.properties.get(Self::WIDTH)
    }

    /// Resize the capsule. Returns `true` if either dimension changed.
    ///
    /// # Errors
    ///
    /// Only if the property table was built from a different schema.
    pub fn resize(&mut self, height: f32, width: f32) -> Result<bool, ComponentError> {
        let h = self.properties.set(Self::HEIGHT, height)?;
        let w = self.properties.set(Self::WIDTH, width)?;
        Ok(h || w)
    }
}

impl_component!(CapsuleCollider);

impl ComponentType for CapsuleCollider {
    const NAME: &'static str = "CapsuleCollider";

    fn schema() -> Result<ComponentSchema, RegistryError> {
        let flags = PropertyFlags::REPLICATE | PropertyFlags::PERSIST;
        ComponentSchema::builder(Self::NAME)
            .property(
                PropertyDescriptor::new("Height", PropertyKind::Float)
                    .with_flags(flags)
                    .with_default(Self::DEFAULT_HEIGHT),
            )
            .property(
                PropertyDescriptor::new("Width", PropertyKind::Float)
                    .with_flags(flags)
                    .with_default(Self::DEFAULT_WIDTH),
            )
            .build()
    }

    fn from_properties(properties: PropertySet) -> Self {
        Self { properties }
    }
}
