//! Navigation meshes.

use engine_component::{
    ComponentError, ComponentSchema, ComponentType, Field, PropertyDescriptor, PropertyFlags, PropertyKind,
    PropertySet, RegistryError, impl_component,
};

use crate::transform::Transform;

/// A navigation mesh baked from a stored asset. Requires a [`Transform`]
/// on the same entity.
///
/// Registered as save-only: clients never receive it, even though its
/// fields carry the replicate flag.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigatableMesh {
    properties: PropertySet,
}

impl NavigatableMesh {
    pub const AWS_PATH: Field<String> = Field::new(0, "AwsPath");
    pub const MESH_NAME: Field<String> = Field::new(1, "MeshName");

    /// Storage path of the baked mesh.
    ///
    /// # Errors
    ///
    /// Only if the property table was built from a different schema.
    pub fn aws_path(&self) -> Result<String, ComponentError> {
        self.properties.get(Self::AWS_PATH)
    }

    /// # Errors
    ///
    /// Only if the property table was built from a different schema.
    pub fn mesh_name(&self) -> Result<String, ComponentError> {
        self.properties.get(Self::MESH_NAME)
    }

    /// Point at a stored mesh.
    ///
    /// # Errors
    ///
    /// Only if the property table was built from a different schema.
    pub fn set_source(&mut self, aws_path: &str, mesh_name: &str) -> Result<(), ComponentError> {
        self.properties.set(Self::AWS_PATH, aws_path.to_owned())?;
        self.properties.set(Self::MESH_NAME, mesh_name.to_owned())?;
        Ok(())
    }
}

impl_component!(NavigatableMesh);

impl ComponentType for NavigatableMesh {
    const NAME: &'static str = "NavigatableMesh";

    fn schema() -> Result<ComponentSchema, RegistryError> {
        let text = |name: &str| {
            PropertyDescriptor::new(name, PropertyKind::String)
                .with_flags(PropertyFlags::REPLICATE | PropertyFlags::PERSIST)
                .with_default("")
        };
        ComponentSchema::builder(Self::NAME)
            .property(text("AwsPath"))
            .property(text("MeshName"))
            .requires(Transform::NAME)
            .build()
    }

    fn from_properties(properties: PropertySet) -> Self {
        Self { properties }
    }
}
