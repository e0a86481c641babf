//! Entity-level envelopes.
//!
//! An [`EntityEnvelope`] carries one entity's components as
//! `type name → { field name → value }`. It is the unit the network layer
//! sends and the editor inspects. Every component is tagged by its
//! canonical name so the receiver can resolve it through the registry.
//!
//! Envelopes are built with `V = PropertyValue` and decoded with
//! `V = RawValue`; restoring reads each raw value against the field's
//! declared kind.

use std::collections::BTreeMap;

use engine_component::{
    Codec, Component, ComponentError, Consumer, DecodeReport, Entity, EntityRecord, PropertyFlags, PropertyValue,
    RawValue, TypeRegistry,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Diagnostics from rebuilding entities out of decoded payloads.
///
/// Nothing here is fatal: every entry names a component or field that was
/// skipped while the rest of the entity was restored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Components that were not attached (unknown type, type excluded from
    /// this pass, or a missing co-component).
    pub dropped: Vec<ComponentError>,
    /// Unrecognised fields, as `Type.Field`.
    pub ignored: Vec<String>,
    /// Field-scoped decode failures.
    pub errors: Vec<ComponentError>,
    /// Saved entities left out because no live id could be allocated.
    pub skipped: Vec<Entity>,
}

impl LoadReport {
    /// Returns `true` if everything in the payload was restored.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.ignored.is_empty() && self.errors.is_empty() && self.skipped.is_empty()
    }

    /// Fold a component's decode report into this one.
    pub fn absorb(&mut self, type_name: &str, report: DecodeReport) {
        self.ignored
            .extend(report.ignored.into_iter().map(|field| format!("{type_name}.{field}")));
        self.errors.extend(report.errors);
    }

    pub fn merge(&mut self, other: LoadReport) {
        self.dropped.extend(other.dropped);
        self.ignored.extend(other.ignored);
        self.errors.extend(other.errors);
        self.skipped.extend(other.skipped);
    }
}

/// One entity's components, keyed by canonical type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEnvelope<V> {
    /// Sender-side entity id.
    pub id: Entity,
    /// Type name to field map.
    pub components: BTreeMap<String, BTreeMap<String, V>>,
}

impl<V> EntityEnvelope<V> {
    #[must_use]
    pub fn new(id: Entity) -> Self {
        Self {
            id,
            components: BTreeMap::new(),
        }
    }

    /// Returns `true` if no component is carried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

fn owned_fields(component: &dyn Component, flag: PropertyFlags) -> BTreeMap<String, PropertyValue> {
    component
        .properties()
        .filtered(flag)
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value.clone()))
        .collect()
}

impl EntityEnvelope<PropertyValue> {
    /// Snapshot the fields flagged `flag` of every component whose type
    /// participates in `flag` passes.
    #[must_use]
    pub fn capture(record: &EntityRecord, registry: &TypeRegistry, flag: PropertyFlags) -> Self {
        let mut envelope = Self::new(record.id());
        for component in record.iter() {
            if !registry.participates(component.component_type_id(), flag) {
                continue;
            }
            envelope
                .components
                .insert(component.type_name().to_owned(), owned_fields(component, flag));
        }
        envelope
    }

    /// Collect the fields pending for `consumer` and clear that consumer's
    /// view. Components with nothing pending are left out.
    #[must_use]
    pub fn capture_dirty(record: &mut EntityRecord, registry: &TypeRegistry, consumer: Consumer) -> Self {
        let mut envelope = Self::new(record.id());
        for component in record.iter_mut() {
            if !registry.participates(component.component_type_id(), consumer.flag()) {
                continue;
            }
            let pending = component.properties_mut().take_dirty(consumer);
            if !pending.is_empty() {
                envelope
                    .components
                    .insert(component.type_name().to_owned(), pending);
            }
        }
        envelope
    }

    /// Encode with `codec`.
    ///
    /// # Errors
    ///
    /// Propagates the codec's encode error.
    pub fn encode<C: Codec>(&self, codec: &C) -> Result<C::Blob, C::Error> {
        codec.encode(self)
    }
}

impl EntityEnvelope<RawValue> {
    /// Decode with `codec`.
    ///
    /// # Errors
    ///
    /// Propagates the codec's decode error.
    pub fn decode<C: Codec>(blob: &C::Blob, codec: &C) -> Result<Self, C::Error> {
        codec.decode(blob)
    }

    /// Rebuild a fresh record with the envelope's id.
    ///
    /// Unknown types and types excluded from `flag` passes are dropped and
    /// reported. The remaining components start from their registered
    /// default and receive the fields flagged `flag`.
    #[must_use]
    pub fn restore(&self, registry: &TypeRegistry, flag: PropertyFlags) -> (EntityRecord, LoadReport) {
        let mut record = EntityRecord::new(self.id);
        let report = self.apply_to(&mut record, registry, flag);
        (record, report)
    }

    /// Merge the envelope into an existing record.
    ///
    /// Components already attached are updated in place; fields the
    /// envelope does not mention keep their current values. Components not
    /// yet attached are created and attached together.
    pub fn apply_to(&self, record: &mut EntityRecord, registry: &TypeRegistry, flag: PropertyFlags) -> LoadReport {
        let mut report = LoadReport::default();
        let mut fresh = Vec::new();

        for (type_name, fields) in &self.components {
            let type_id = match registry.type_for(type_name) {
                Ok(type_id) => type_id,
                Err(err) => {
                    warn!(entity = %self.id, component = type_name.as_str(), "skipping unknown component type");
                    report.dropped.push(err.into());
                    continue;
                }
            };
            if !registry.participates(type_id, flag) {
                warn!(entity = %self.id, component = type_name.as_str(), ?flag, "skipping component excluded from this pass");
                report.dropped.push(ComponentError::NotParticipating {
                    component: type_name.clone(),
                    flag,
                });
                continue;
            }

            if let Some(existing) = record.get_dyn_mut(type_id) {
                let decoded = existing.properties_mut().apply_raw(flag, fields);
                report.absorb(type_name, decoded);
                continue;
            }

            match registry.create(type_id) {
                Ok(mut component) => {
                    let decoded = component.properties_mut().apply_raw(flag, fields);
                    report.absorb(type_name, decoded);
                    fresh.push(component);
                }
                Err(err) => report.dropped.push(err.into()),
            }
        }

        report.dropped.extend(record.attach_all(fresh, registry));
        debug!(entity = %self.id, components = record.len(), "applied entity envelope");
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use engine_component::{
        ComponentSchema, ComponentTypeId, DynamicComponent, Field, ParticipationPolicy, PropertyDescriptor,
        PropertyKind, TypeRegistryBuilder,
    };

    use super::*;
    use crate::codec::{EditorCodec, WireCodec};

    const X: Field<f32> = Field::new(0, "X");

    fn registry() -> TypeRegistry {
        let flags = PropertyFlags::REPLICATE | PropertyFlags::PERSIST;
        let transform = ComponentSchema::builder("Transform")
            .property(PropertyDescriptor::new("X", PropertyKind::Float).with_flags(flags).with_default(0.0f32))
            .property(PropertyDescriptor::new("Y", PropertyKind::Float).with_flags(flags).with_default(0.0f32))
            .field("Label", PropertyKind::String, PropertyFlags::EDITOR)
            .build()
            .unwrap();
        let mesh = ComponentSchema::builder("Mesh")
            .property(
                PropertyDescriptor::new("Path", PropertyKind::String)
                    .with_flags(PropertyFlags::ALL)
                    .with_default(""),
            )
            .requires("Transform")
            .build()
            .unwrap();
        let cache = ComponentSchema::builder("Cache")
            .property(
                PropertyDescriptor::new("Hits", PropertyKind::UInt)
                    .with_flags(PropertyFlags::ALL)
                    .with_default(0u64),
            )
            .build()
            .unwrap();

        let mut builder = TypeRegistryBuilder::new();
        builder.register_schema(transform, ParticipationPolicy::ALL).unwrap();
        builder.register_schema(mesh, ParticipationPolicy::ALL).unwrap();
        builder.register_schema(cache, ParticipationPolicy::SAVE_ONLY).unwrap();
        builder.freeze().unwrap()
    }

    fn entity(registry: &TypeRegistry) -> EntityRecord {
        let mut record = EntityRecord::new(Entity::from_raw(3));
        let mut transform = registry.create_by_name("Transform").unwrap();
        transform.properties_mut().set(X, 5.0).unwrap();
        record.attach(transform, registry).unwrap();
        record
            .attach(registry.create_by_name("Mesh").unwrap(), registry)
            .unwrap();
        record
            .attach(registry.create_by_name("Cache").unwrap(), registry)
            .unwrap();
        record
    }

    #[test]
    fn test_capture_applies_both_gates() {
        let registry = registry();
        let record = entity(&registry);
        let envelope = EntityEnvelope::capture(&record, &registry, PropertyFlags::REPLICATE);

        assert_eq!(envelope.id, Entity::from_raw(3));
        assert_eq!(envelope.components.keys().collect::<Vec<_>>(), ["Mesh", "Transform"]);
        let transform = &envelope.components["Transform"];
        assert_eq!(transform["X"], PropertyValue::Float(5.0));
        assert_eq!(transform["Y"], PropertyValue::Float(0.0));
        assert!(!transform.contains_key("Label"));
    }

    #[test]
    fn test_wire_round_trip_restores_entity() {
        let registry = registry();
        let record = entity(&registry);
        let blob = EntityEnvelope::capture(&record, &registry, PropertyFlags::PERSIST)
            .encode(&WireCodec)
            .unwrap();

        let decoded = EntityEnvelope::decode(&blob, &WireCodec).unwrap();
        let (restored, report) = decoded.restore(&registry, PropertyFlags::PERSIST);
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(restored.id(), record.id());
        assert_eq!(restored.len(), 3);
        let transform = restored.by_name("Transform").unwrap();
        assert_eq!(transform.properties().get(X).unwrap(), 5.0);
        assert_eq!(transform.owner(), Entity::from_raw(3));
    }

    #[test]
    fn test_restore_skips_unknown_and_orphaned_components() {
        let registry = registry();
        let text = r#"{
            "id": 8,
            "components": {
                "Trasnform": { "X": 1.0 },
                "Mesh": { "Path": "crate.mesh", "Lod": 2 }
            }
        }"#;
        let decoded = EntityEnvelope::decode(&text.to_owned(), &EditorCodec::default()).unwrap();
        let (restored, report) = decoded.restore(&registry, PropertyFlags::REPLICATE);

        assert!(restored.is_empty());
        assert_eq!(report.dropped.len(), 2);
        assert_eq!(report.ignored, ["Mesh.Lod"]);
    }

    #[test]
    fn test_restore_rejects_type_excluded_from_pass() {
        let registry = registry();
        let mut envelope = EntityEnvelope::new(Entity::from_raw(1));
        let mut hits = BTreeMap::new();
        hits.insert("Hits".to_owned(), RawValue::UInt(4));
        envelope.components.insert("Cache".to_owned(), hits);

        let (restored, report) = envelope.restore(&registry, PropertyFlags::REPLICATE);
        assert!(restored.is_empty());
        assert_eq!(report.dropped.len(), 1);

        let (restored, report) = envelope.restore(&registry, PropertyFlags::PERSIST);
        assert!(report.is_clean());
        assert_eq!(restored.len(), 1);
    }

    #[test]
    fn test_field_mismatch_keeps_component() {
        let registry = registry();
        let text = r#"{ "id": 2, "components": { "Transform": { "X": "five", "Y": 2 } } }"#;
        let decoded = EntityEnvelope::decode(&text.to_owned(), &EditorCodec::default()).unwrap();
        let (restored, report) = decoded.restore(&registry, PropertyFlags::REPLICATE);

        assert_eq!(report.errors.len(), 1);
        let transform = restored.by_name("Transform").unwrap();
        assert_eq!(transform.properties().get(X).unwrap(), 0.0);
        assert_eq!(
            transform.properties().value("Y").unwrap(),
            &PropertyValue::Float(2.0)
        );
    }

    #[test]
    fn test_capture_dirty_sends_each_change_once() {
        let registry = registry();
        let mut record = entity(&registry);

        let first = EntityEnvelope::capture_dirty(&mut record, &registry, Consumer::Network);
        assert_eq!(first.components.keys().collect::<Vec<_>>(), ["Transform"]);
        assert_eq!(first.components["Transform"].len(), 1);

        let second = EntityEnvelope::capture_dirty(&mut record, &registry, Consumer::Network);
        assert!(second.is_empty());

        let save = EntityEnvelope::capture_dirty(&mut record, &registry, Consumer::Save);
        assert_eq!(save.components["Transform"]["X"], PropertyValue::Float(5.0));
    }

    #[test]
    fn test_apply_to_updates_live_record() {
        let registry = registry();
        let mut record = entity(&registry);
        record.clear_dirty(Consumer::Network);

        let mut envelope = EntityEnvelope::new(record.id());
        let mut fields = BTreeMap::new();
        fields.insert("Y".to_owned(), RawValue::Float32(7.0));
        envelope.components.insert("Transform".to_owned(), fields);

        let report = envelope.apply_to(&mut record, &registry, PropertyFlags::REPLICATE);
        assert!(report.is_clean());
        let transform = record.get_dyn(ComponentTypeId::from_name("Transform")).unwrap();
        assert_eq!(transform.properties().get(X).unwrap(), 5.0);
        assert_eq!(transform.properties().value("Y").unwrap(), &PropertyValue::Float(7.0));
        assert!(!transform.properties().is_dirty(Consumer::Network));
    }

    #[test]
    fn test_unregistered_component_never_captured() {
        let registry = registry();
        let stray = DynamicComponent::new(Arc::new(ComponentSchema::builder("Stray").build().unwrap()));
        let mut record = EntityRecord::new(Entity::from_raw(1));
        assert!(record.attach(Box::new(stray), &registry).is_err());
        assert!(EntityEnvelope::capture(&record, &registry, PropertyFlags::ALL).is_empty());
    }
}
