//! Per-type property tables.
//!
//! A [`ComponentSchema`] is the explicit table of [`PropertyDescriptor`]s for
//! one component type, built once through [`SchemaBuilder`]. Every instance of
//! the type shares the same schema, so two instances always expose the same
//! descriptors with the same flags.

use crate::component::ComponentTypeId;
use crate::error::RegistryError;
use crate::property::{PropertyDescriptor, PropertyFlags};
use crate::value::PropertyKind;

/// The static shape of a component type.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSchema {
    name: String,
    type_id: ComponentTypeId,
    properties: Vec<PropertyDescriptor>,
    requires: Vec<String>,
}

impl ComponentSchema {
    /// Start declaring a component type. The type id defaults to the FNV-1a
    /// hash of `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        let name = name.into();
        SchemaBuilder {
            type_id: ComponentTypeId::from_name(&name),
            name,
            properties: Vec::new(),
            requires: Vec::new(),
        }
    }

    /// The canonical type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type identifier. Not `type_id`: through an `Arc`, that name
    /// resolves to [`std::any::Any::type_id`].
    #[must_use]
    pub fn component_type_id(&self) -> ComponentTypeId {
        self.type_id
    }

    /// Descriptors in declaration order.
    #[must_use]
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Names of component types that must be present on the same entity.
    #[must_use]
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Position of the descriptor named `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }

    /// The descriptor named `name`.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Iterate over descriptors whose flags include `flag`.
    pub fn flagged(&self, flag: PropertyFlags) -> impl Iterator<Item = (usize, &PropertyDescriptor)> {
        self.properties
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.flags.contains(flag))
    }

    /// Number of declared properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if the type declares no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Builder for [`ComponentSchema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    type_id: ComponentTypeId,
    properties: Vec<PropertyDescriptor>,
    requires: Vec<String>,
}

impl SchemaBuilder {
    /// Override the type id derived from the name.
    #[must_use]
    pub fn type_id(mut self, type_id: ComponentTypeId) -> Self {
        self.type_id = type_id;
        self
    }

    /// Append a descriptor. Declaration order is preserved.
    #[must_use]
    pub fn property(mut self, descriptor: PropertyDescriptor) -> Self {
        self.properties.push(descriptor);
        self
    }

    /// Shorthand for a field with flags and no default.
    #[must_use]
    pub fn field(self, name: &str, kind: PropertyKind, flags: PropertyFlags) -> Self {
        self.property(PropertyDescriptor::new(name, kind).with_flags(flags))
    }

    /// Require `component` on the same entity whenever this type is attached.
    #[must_use]
    pub fn requires(mut self, component: impl Into<String>) -> Self {
        self.requires.push(component.into());
        self
    }

    /// Validate and finish the schema.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidSchema`] if a property name is empty or
    /// repeated, if a default's kind disagrees with its declaration, or if
    /// the type requires itself.
    pub fn build(self) -> Result<ComponentSchema, RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidSchema {
            component: self.name.clone(),
            reason,
        };

        if self.name.is_empty() {
            return Err(invalid("type name is empty".into()));
        }
        for (i, desc) in self.properties.iter().enumerate() {
            if desc.name.is_empty() {
                return Err(invalid(format!("property #{i} has an empty name")));
            }
            if self.properties[..i].iter().any(|p| p.name == desc.name) {
                return Err(invalid(format!("property '{}' is declared twice", desc.name)));
            }
            if let Some(default) = &desc.default
                && default.kind() != desc.kind
            {
                return Err(invalid(format!(
                    "default for '{}' is {}, declared {}",
                    desc.name,
                    default.kind(),
                    desc.kind
                )));
            }
        }
        if self.requires.iter().any(|r| *r == self.name) {
            return Err(invalid("type requires itself".into()));
        }

        Ok(ComponentSchema {
            name: self.name,
            type_id: self.type_id,
            properties: self.properties,
            requires: self.requires,
        })
    }
}
