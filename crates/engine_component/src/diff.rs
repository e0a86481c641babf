//! Diffs of components against their registered default.
//!
//! A diff lists only the fields whose value differs from the type's
//! prototype, tagged with the canonical type name. Prefab-spawned entities
//! store diffs instead of full copies. Applying a diff starts from a fresh
//! registry instance and overwrites the listed fields in declaration order,
//! which reproduces the diffed component exactly.

use tracing::{debug, warn};

use crate::codec::TaggedComponent;
use crate::component::Component;
use crate::error::{ComponentError, RegistryError};
use crate::properties::DecodeReport;
use crate::property::PropertyFlags;
use crate::registry::TypeRegistry;
use crate::value::{PropertyValue, RawValue};

/// The fields of one component that differ from its type's default.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDiff {
    /// Canonical type name.
    pub type_name: String,
    /// Differing fields in declaration order.
    pub fields: Vec<(String, PropertyValue)>,
}

impl ComponentDiff {
    /// Returns `true` if the component matched its default.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// The value recorded for `name`, if it differed.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// The encodable form: `{ "type": name, "fields": { name: value } }`.
    #[must_use]
    pub fn to_tagged(&self) -> TaggedComponent<PropertyValue> {
        let mut tagged = TaggedComponent::new(self.type_name.clone());
        tagged.fields = self.fields.iter().cloned().collect();
        tagged
    }

    /// Read a decoded tagged blob against the registered schema.
    ///
    /// Fields come back in declaration order. Unknown names are reported as
    /// ignored, and values of the wrong shape as field-scoped errors.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownType`] if the tagged type is not registered.
    pub fn from_tagged(
        tagged: &TaggedComponent<RawValue>,
        registry: &TypeRegistry,
    ) -> Result<(Self, DecodeReport), RegistryError> {
        let schema = registry.schema(registry.type_for(&tagged.type_name)?)?;
        let mut report = DecodeReport::default();
        let mut fields = Vec::new();

        for desc in schema.properties() {
            let Some(raw) = tagged.fields.get(&desc.name) else {
                continue;
            };
            match PropertyValue::from_raw(desc.kind, raw) {
                Some(value) => {
                    fields.push((desc.name.clone(), value));
                    report.applied += 1;
                }
                None => report.errors.push(ComponentError::TypeMismatch {
                    property: desc.name.clone(),
                    expected: desc.kind,
                    found: raw.describe().to_owned(),
                }),
            }
        }
        report.ignored = tagged
            .fields
            .keys()
            .filter(|name| schema.index_of(name).is_none())
            .cloned()
            .collect();

        let diff = Self {
            type_name: tagged.type_name.clone(),
            fields,
        };
        Ok((diff, report))
    }

    /// Overwrite `component`'s fields from this diff, in declaration order.
    ///
    /// Names the component does not declare are ignored.
    pub fn apply_to(&self, component: &mut dyn Component) -> DecodeReport {
        let mut report = DecodeReport::default();
        let mut ordered: Vec<(usize, &str, &PropertyValue)> = Vec::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            match component.properties().schema().index_of(name) {
                Some(index) => ordered.push((index, name.as_str(), value)),
                None => {
                    debug!(component = self.type_name.as_str(), property = name.as_str(), "ignoring unknown diff field");
                    report.ignored.push(name.clone());
                }
            }
        }
        ordered.sort_by_key(|(index, _, _)| *index);

        for (_, name, value) in ordered {
            match component.properties_mut().set_value(name, value.clone()) {
                Ok(_) => report.applied += 1,
                Err(err) => {
                    warn!(component = self.type_name.as_str(), property = name, %err, "diff field not applied");
                    report.errors.push(err);
                }
            }
        }
        report
    }
}

/// Diff every field of `component` against the registered default.
///
/// # Errors
///
/// [`RegistryError::UnknownType`] if the component's type is not registered.
pub fn diff_against_default(component: &dyn Component, registry: &TypeRegistry) -> Result<ComponentDiff, RegistryError> {
    diff_against_default_filtered(component, registry, PropertyFlags::NONE)
}

/// Diff only the fields flagged `flag` against the registered default.
///
/// Unassigned fields never appear in a diff.
///
/// # Errors
///
/// [`RegistryError::UnknownType`] if the component's type is not registered.
pub fn diff_against_default_filtered(
    component: &dyn Component,
    registry: &TypeRegistry,
    flag: PropertyFlags,
) -> Result<ComponentDiff, RegistryError> {
    let prototype = registry.prototype(component.component_type_id())?.properties();
    let fields = component
        .properties()
        .iter()
        .filter(|(desc, _)| desc.flags.contains(flag))
        .filter_map(|(desc, slot)| {
            let current = slot.value()?;
            let base = prototype.slot(&desc.name).and_then(|base| base.value());
            (base != Some(current)).then(|| (desc.name.clone(), current.clone()))
        })
        .collect();

    Ok(ComponentDiff {
        type_name: component.type_name().to_owned(),
        fields,
    })
}

/// Rebuild a component from its diff: a fresh default instance with the
/// diff's fields written over it.
///
/// # Errors
///
/// [`RegistryError::UnknownType`] if the diff's type is not registered.
pub fn apply_diff(registry: &TypeRegistry, diff: &ComponentDiff) -> Result<Box<dyn Component>, RegistryError> {
    let mut component = registry.create_by_name(&diff.type_name)?;
    diff.apply_to(component.as_mut());
    Ok(component)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use std::sync::Arc;

    use super::*;
    use crate::component::DynamicComponent;
    use crate::property::{Field, PropertyFlags};
    use crate::registry::{ParticipationPolicy, TypeRegistryBuilder};
    use crate::schema::ComponentSchema;
    use crate::testing::transform_schema;

    const X: Field<f32> = Field::new(0, "X");
    const Z: Field<f32> = Field::new(2, "Z");

    fn registry() -> TypeRegistry {
        let mut builder = TypeRegistryBuilder::new();
        builder
            .register_schema(transform_schema(), ParticipationPolicy::ALL)
            .unwrap();
        builder.freeze().unwrap()
    }

    #[test]
    fn test_default_instance_has_empty_diff() {
        let registry = registry();
        let c = registry.create_by_name("Transform").unwrap();
        let diff = diff_against_default(c.as_ref(), &registry).unwrap();
        assert!(diff.is_empty());
        assert_eq!(diff.type_name, "Transform");
    }

    #[test]
    fn test_diff_pairs_fields_by_name() {
        let registry = registry();
        let mut builder = ComponentSchema::builder("Transform");
        for desc in transform_schema().properties().iter().rev() {
            builder = builder.property(desc.clone());
        }
        let mut reordered = DynamicComponent::new(Arc::new(builder.build().unwrap()));
        assert!(diff_against_default(&reordered, &registry).unwrap().is_empty());

        reordered.properties_mut().set_value("Y", PropertyValue::Float(4.0)).unwrap();
        let diff = diff_against_default(&reordered, &registry).unwrap();
        assert_eq!(diff.fields, [("Y".to_owned(), PropertyValue::Float(4.0))]);
    }

    #[test]
    fn test_diff_lists_changed_fields_in_order() {
        let registry = registry();
        let mut c = registry.create_by_name("Transform").unwrap();
        c.properties_mut().set(Z, -2.0).unwrap();
        c.properties_mut().set(X, 5.0).unwrap();
        c.properties_mut().set_value("Label", "crate".into()).unwrap();

        let diff = diff_against_default(c.as_ref(), &registry).unwrap();
        let names: Vec<_> = diff.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["X", "Z", "Label"]);
        assert_eq!(diff.get("X"), Some(&PropertyValue::Float(5.0)));
    }

    #[test]
    fn test_filtered_diff() {
        let registry = registry();
        let mut c = registry.create_by_name("Transform").unwrap();
        c.properties_mut().set(X, 5.0).unwrap();
        c.properties_mut().set_value("Label", "crate".into()).unwrap();

        let diff = diff_against_default_filtered(c.as_ref(), &registry, PropertyFlags::PERSIST).unwrap();
        assert_eq!(diff.len(), 1);
        assert!(diff.get("Label").is_none());
    }

    #[test]
    fn test_apply_reproduces_component() {
        let registry = registry();
        let mut c = registry.create_by_name("Transform").unwrap();
        c.properties_mut().set(X, f32::NAN).unwrap();
        c.properties_mut().set(Z, -0.0).unwrap();

        let diff = diff_against_default(c.as_ref(), &registry).unwrap();
        let rebuilt = apply_diff(&registry, &diff).unwrap();
        assert_eq!(rebuilt.properties(), c.properties());
        assert_eq!(diff_against_default(rebuilt.as_ref(), &registry).unwrap(), diff);
    }

    #[test]
    fn test_apply_ignores_unknown_fields() {
        let registry = registry();
        let diff = ComponentDiff {
            type_name: "Transform".into(),
            fields: vec![
                ("Spin".into(), PropertyValue::Float(1.0)),
                ("X".into(), PropertyValue::Float(3.0)),
            ],
        };
        let mut c = registry.create_by_name("Transform").unwrap();
        let report = diff.apply_to(c.as_mut());
        assert_eq!(report.ignored, ["Spin"]);
        assert_eq!(c.properties().get(X).unwrap(), 3.0);
    }

    #[test]
    fn test_apply_unknown_type() {
        let registry = registry();
        let diff = ComponentDiff {
            type_name: "Trasnform".into(),
            fields: Vec::new(),
        };
        assert!(matches!(apply_diff(&registry, &diff), Err(RegistryError::UnknownType(_))));
    }

    #[test]
    fn test_from_tagged_orders_and_reports() {
        let registry = registry();
        let mut fields = BTreeMap::new();
        fields.insert("Z".to_owned(), RawValue::Float(1.5));
        fields.insert("X".to_owned(), RawValue::Int(2));
        fields.insert("Label".to_owned(), RawValue::Bool(true));
        fields.insert("Scale".to_owned(), RawValue::Float(1.0));
        let tagged = TaggedComponent {
            type_name: "Transform".to_owned(),
            fields,
        };

        let (diff, report) = ComponentDiff::from_tagged(&tagged, &registry).unwrap();
        assert_eq!(
            diff.fields,
            [
                ("X".to_owned(), PropertyValue::Float(2.0)),
                ("Z".to_owned(), PropertyValue::Float(1.5)),
            ]
        );
        assert_eq!(report.ignored, ["Scale"]);
        assert_eq!(report.errors.len(), 1);
    }
}
