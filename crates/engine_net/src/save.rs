//! Multi-entity save documents.
//!
//! A [`SaveDocument`] stores the persisted fields of a group of entities
//! that differ from their registered defaults. Field and type names are
//! written once, in the typings table `"T"`; the per-entity data `"C"`
//! refers to them by index, a typing's index being its key position in `T`:
//!
//! ```text
//! T: { "Transform": ["X", "Y", "Z"], ... }
//! C: { <saved entity id>: { <typing index>: { <field index>: value } } }
//! ```
//!
//! Loading never reuses saved ids. Every saved entity gets a fresh id and
//! entity references inside the document are rewritten to match.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use engine_component::{
    Codec, Component, ComponentError, Entity, EntityAllocator, EntityRecord, EntityRemap, PropertyFlags, PropertyValue,
    RawValue, RegistryError, TypeRegistry, diff_against_default_filtered,
};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{info, warn};

use crate::envelope::LoadReport;

/// The persisted field names of one component type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedTyping {
    pub name: String,
    pub fields: Vec<String>,
}

/// The typings table, in first-use order.
///
/// Written as a map from type name to field names; the key order gives each
/// typing its index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedTypings(Vec<SavedTyping>);

impl SavedTypings {
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&SavedTyping> {
        self.0.get(index as usize)
    }

    /// The index of the typing for `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.0
            .iter()
            .position(|t| t.name == name)
            .and_then(|i| u32::try_from(i).ok())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[SavedTyping] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, typing: SavedTyping) -> u32 {
        self.0.push(typing);
        u32::try_from(self.0.len() - 1).unwrap_or(u32::MAX)
    }
}

impl Serialize for SavedTypings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for typing in &self.0 {
            map.serialize_entry(&typing.name, &typing.fields)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SavedTypings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TypingsVisitor;

        impl<'de> Visitor<'de> for TypingsVisitor {
            type Value = SavedTypings;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of component type name to field names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SavedTypings, A::Error> {
                let mut typings = SavedTypings::default();
                while let Some((name, fields)) = access.next_entry::<String, Vec<String>>()? {
                    if typings.index_of(&name).is_some() {
                        return Err(de::Error::custom(format_args!("duplicate typing '{name}'")));
                    }
                    typings.push(SavedTyping { name, fields });
                }
                Ok(typings)
            }
        }

        deserializer.deserialize_map(TypingsVisitor)
    }
}

/// Per-entity saved data: typing index to field index to value.
pub type SavedEntity<V> = BTreeMap<u32, BTreeMap<u32, V>>;

/// A persist-filtered snapshot of a group of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDocument<V> {
    /// Component typings, referenced by position.
    #[serde(rename = "T")]
    pub typings: SavedTypings,
    /// Saved entity id to component data.
    #[serde(rename = "C")]
    pub entities: BTreeMap<u64, SavedEntity<V>>,
}

impl<V> Default for SaveDocument<V> {
    fn default() -> Self {
        Self {
            typings: SavedTypings::default(),
            entities: BTreeMap::new(),
        }
    }
}

impl<V> SaveDocument<V> {
    /// Number of saved entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The typing index for `name`.
    #[must_use]
    pub fn typing_index(&self, name: &str) -> Option<u32> {
        self.typings.index_of(name)
    }
}

impl SaveDocument<PropertyValue> {
    /// Snapshot the persisted state of `records`.
    ///
    /// Only fields that differ from the registered default are written;
    /// restoring starts from that default. Component types excluded from
    /// saving are left out entirely. An entity with nothing to persist is
    /// still recorded, with no components. If two records share an id only
    /// the first is kept.
    #[must_use]
    pub fn capture<'a>(records: impl IntoIterator<Item = &'a EntityRecord>, registry: &TypeRegistry) -> Self {
        let mut document = Self::default();
        for record in records {
            let mut saved = SavedEntity::new();
            for component in record.iter() {
                if !registry.should_persist(component.component_type_id()) {
                    continue;
                }
                let diff = match diff_against_default_filtered(component, registry, PropertyFlags::PERSIST) {
                    Ok(diff) => diff,
                    Err(err) => {
                        warn!(entity = %record.id(), %err, "not saving component");
                        continue;
                    }
                };
                let typing = document.typing_for(component);
                let names = document
                    .typings
                    .get(typing)
                    .map(|t| t.fields.as_slice())
                    .unwrap_or_default();
                let fields = diff
                    .fields
                    .into_iter()
                    .filter_map(|(name, value)| {
                        let index = names.iter().position(|n| *n == name)?;
                        Some((u32::try_from(index).ok()?, value))
                    })
                    .collect();
                saved.insert(typing, fields);
            }

            match document.entities.entry(record.id().id()) {
                Entry::Vacant(slot) => {
                    slot.insert(saved);
                }
                Entry::Occupied(_) => {
                    warn!(entity = %record.id(), "entity id captured twice, keeping the first");
                }
            }
        }
        document
    }

    fn typing_for(&mut self, component: &dyn Component) -> u32 {
        if let Some(index) = self.typing_index(component.type_name()) {
            return index;
        }
        let fields = component
            .properties()
            .schema()
            .flagged(PropertyFlags::PERSIST)
            .map(|(_, desc)| desc.name.clone())
            .collect();
        self.typings.push(SavedTyping {
            name: component.type_name().to_owned(),
            fields,
        })
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

/// The result of loading a [`SaveDocument`].
#[derive(Debug)]
pub struct LoadedEntities {
    /// Restored entities, in saved-id order.
    pub records: Vec<EntityRecord>,
    /// Saved id to live id.
    pub remap: EntityRemap,
    pub report: LoadReport,
}

impl SaveDocument<RawValue> {
    /// Decode with `codec`.
    ///
    /// # Errors
    ///
    /// Propagates the codec's decode error.
    pub fn decode<C: Codec>(blob: &C::Blob, codec: &C) -> Result<Self, C::Error> {
        codec.decode(blob)
    }

    /// Rebuild every saved entity under a fresh id from `allocator`.
    ///
    /// Entities for which the allocator has no id left are skipped and
    /// listed in [`LoadReport::skipped`].
    ///
    /// Components of unknown or non-persisted types are dropped and
    /// reported. Entity references are remapped to the new ids; references
    /// to entities outside the document become [`Entity::INVALID`].
    pub fn restore(&self, registry: &TypeRegistry, allocator: &mut EntityAllocator) -> LoadedEntities {
        let mut remap = EntityRemap::new();
        let mut report = LoadReport::default();
        for &saved in self.entities.keys() {
            match allocator.allocate() {
                Some(id) => remap.insert(Entity::from_raw(saved), id),
                None => {
                    warn!(entity = saved, "entity ids exhausted, not restoring");
                    report.skipped.push(Entity::from_raw(saved));
                }
            }
        }

        let mut records = Vec::with_capacity(self.entities.len());
        for (&saved, components) in &self.entities {
            let Some(id) = remap.get(Entity::from_raw(saved)) else {
                continue;
            };
            let mut batch = Vec::with_capacity(components.len());
            for (&typing, fields) in components {
                match self.rebuild(registry, typing, fields, &mut report) {
                    Ok(mut component) => {
                        component
                            .properties_mut()
                            .remap_entities(|e| remap.resolve(e));
                        batch.push(component);
                    }
                    Err(err) => {
                        warn!(entity = saved, typing, %err, "skipping saved component");
                        report.dropped.push(err);
                    }
                }
            }

            let mut record = EntityRecord::new(id);
            report.dropped.extend(record.attach_all(batch, registry));
            records.push(record);
        }

        info!(
            entities = records.len(),
            dropped = report.dropped.len(),
            "restored save document"
        );
        LoadedEntities {
            records,
            remap,
            report,
        }
    }

    fn rebuild(
        &self,
        registry: &TypeRegistry,
        typing: u32,
        fields: &BTreeMap<u32, RawValue>,
        report: &mut LoadReport,
    ) -> Result<Box<dyn Component>, ComponentError> {
        let typing = self
            .typings
            .get(typing)
            .ok_or_else(|| RegistryError::UnknownType(format!("typing #{typing}")))?;
        let mut component = registry.create_by_name(&typing.name)?;
        if !registry.should_persist(component.component_type_id()) {
            return Err(ComponentError::NotParticipating {
                component: typing.name.clone(),
                flag: PropertyFlags::PERSIST,
            });
        }

        let mut named = BTreeMap::new();
        for (&index, value) in fields {
            match typing.fields.get(index as usize) {
                Some(name) => {
                    named.insert(name.clone(), value.clone());
                }
                None => report.ignored.push(format!("{}.#{index}", typing.name)),
            }
        }
        let decoded = component
            .properties_mut()
            .apply_raw(PropertyFlags::PERSIST, &named);
        report.absorb(&typing.name, decoded);
        Ok(component)
    }
}

#[cfg(test)]
mod tests {
    use engine_component::{
        ComponentSchema, ComponentTypeId, Consumer, Field, ParticipationPolicy, PropertyDescriptor, PropertyKind,
        TypeRegistryBuilder,
    };

    use super::*;
    use crate::codec::{EditorCodec, WireCodec};

    const X: Field<f32> = Field::new(0, "X");
    const TARGET: Field<Entity> = Field::new(0, "Target");

    fn registry() -> TypeRegistry {
        let flags = PropertyFlags::REPLICATE | PropertyFlags::PERSIST;
        let transform = ComponentSchema::builder("Transform")
            .property(PropertyDescriptor::new("X", PropertyKind::Float).with_flags(flags).with_default(0.0f32))
            .field("Label", PropertyKind::String, PropertyFlags::EDITOR)
            .build()
            .unwrap();
        let follow = ComponentSchema::builder("Follow")
            .field("Target", PropertyKind::Entity, PropertyFlags::ALL)
            .build()
            .unwrap();
        let scratch = ComponentSchema::builder("Scratch")
            .property(
                PropertyDescriptor::new("Note", PropertyKind::String)
                    .with_flags(PropertyFlags::ALL)
                    .with_default(""),
            )
            .build()
            .unwrap();

        let mut builder = TypeRegistryBuilder::new();
        builder.register_schema(transform, ParticipationPolicy::ALL).unwrap();
        builder.register_schema(follow, ParticipationPolicy::ALL).unwrap();
        builder.register_schema(scratch, ParticipationPolicy::NETWORK_ONLY).unwrap();
        builder.freeze().unwrap()
    }

    fn world(registry: &TypeRegistry) -> Vec<EntityRecord> {
        let mut leader = EntityRecord::new(Entity::from_raw(10));
        let mut transform = registry.create_by_name("Transform").unwrap();
        transform.properties_mut().set(X, 4.0).unwrap();
        transform.properties_mut().set_value("Label", "leader".into()).unwrap();
        leader.attach(transform, registry).unwrap();
        leader
            .attach(registry.create_by_name("Scratch").unwrap(), registry)
            .unwrap();

        let mut follower = EntityRecord::new(Entity::from_raw(20));
        let mut follow = registry.create_by_name("Follow").unwrap();
        follow.properties_mut().set(TARGET, Entity::from_raw(10)).unwrap();
        follower.attach(follow, registry).unwrap();

        let mut stray = EntityRecord::new(Entity::from_raw(30));
        let mut follow = registry.create_by_name("Follow").unwrap();
        follow.properties_mut().set(TARGET, Entity::from_raw(99)).unwrap();
        stray.attach(follow, registry).unwrap();

        vec![leader, follower, stray]
    }

    #[test]
    fn test_capture_builds_typings() {
        let registry = registry();
        let records = world(&registry);
        let document = SaveDocument::capture(&records, &registry);

        assert_eq!(document.len(), 3);
        assert_eq!(
            document.typings.as_slice(),
            [
                SavedTyping {
                    name: "Transform".into(),
                    fields: vec!["X".into()],
                },
                SavedTyping {
                    name: "Follow".into(),
                    fields: vec!["Target".into()],
                },
            ]
        );
        assert_eq!(document.entities[&10][&0][&0], PropertyValue::Float(4.0));
        assert_eq!(document.entities[&20][&1][&0], PropertyValue::Entity(Entity::from_raw(10)));
    }

    #[test]
    fn test_restore_allocates_fresh_ids_and_remaps_references() {
        let registry = registry();
        let records = world(&registry);
        let blob = SaveDocument::capture(&records, &registry)
            .encode(&WireCodec)
            .unwrap();

        let document = SaveDocument::decode(&blob, &WireCodec).unwrap();
        let mut allocator = EntityAllocator::starting_after(Entity::from_raw(100));
        let loaded = document.restore(&registry, &mut allocator);

        assert!(loaded.report.is_clean(), "{:?}", loaded.report);
        let ids: Vec<_> = loaded.records.iter().map(EntityRecord::id).collect();
        assert_eq!(ids, [Entity::from_raw(101), Entity::from_raw(102), Entity::from_raw(103)]);

        let leader = &loaded.records[0];
        assert_eq!(leader.len(), 1);
        let transform = leader.by_name("Transform").unwrap();
        assert_eq!(transform.properties().get(X).unwrap(), 4.0);
        assert!(transform.properties().value("Label").is_err());

        let follow = loaded.records[1]
            .get_dyn(ComponentTypeId::from_name("Follow"))
            .unwrap();
        assert_eq!(follow.properties().get(TARGET).unwrap(), Entity::from_raw(101));
        assert!(!follow.properties().is_dirty(Consumer::Save));

        let dangling = loaded.records[2].by_name("Follow").unwrap();
        assert_eq!(dangling.properties().get(TARGET).unwrap(), Entity::INVALID);
        assert_eq!(loaded.remap.resolve(Entity::from_raw(20)), Entity::from_raw(102));
    }

    #[test]
    fn test_restore_stops_when_ids_run_out() {
        let registry = registry();
        let records = world(&registry);
        let document = SaveDocument::capture(&records, &registry);
        let mut allocator = EntityAllocator::starting_after(Entity::from_raw(u64::MAX - 1));
        let loaded = document.restore(&registry, &mut allocator);

        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].id(), Entity::from_raw(u64::MAX));
        assert_eq!(loaded.report.skipped, [Entity::from_raw(20), Entity::from_raw(30)]);
        assert!(!loaded.report.is_clean());
    }

    #[test]
    fn test_restore_skips_unknown_typings() {
        let registry = registry();
        let text = r#"{
            "T": { "Trasnform": ["X"], "Transform": ["X", "Scale"] },
            "C": { "5": { "0": { "0": 1.0 }, "1": { "0": 2.5, "1": 3.0 }, "7": {} } }
        }"#;
        let document = SaveDocument::decode(&text.to_owned(), &EditorCodec::default()).unwrap();
        let loaded = document.restore(&registry, &mut EntityAllocator::new());

        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].len(), 1);
        assert_eq!(loaded.report.dropped.len(), 2);
        assert_eq!(loaded.report.ignored, ["Transform.Scale"]);
        let transform = loaded.records[0].by_name("Transform").unwrap();
        assert_eq!(transform.properties().get(X).unwrap(), 2.5);
    }

    #[test]
    fn test_typings_are_keyed_by_name() {
        let registry = registry();
        let records = world(&registry);
        let text = SaveDocument::capture(&records, &registry)
            .encode(&EditorCodec::default())
            .unwrap();
        assert!(text.starts_with(r#"{"T":{"Transform":["X"],"Follow":["Target"]},"C":{"#), "{text}");

        let document = SaveDocument::decode(&text, &EditorCodec::default()).unwrap();
        assert_eq!(document.typing_index("Follow"), Some(1));
    }

    #[test]
    fn test_decode_rejects_duplicate_typings() {
        let text = r#"{ "T": { "Transform": ["X"], "Transform": ["Y"] }, "C": {} }"#.to_owned();
        assert!(SaveDocument::decode(&text, &EditorCodec::default()).is_err());
    }

    #[test]
    fn test_default_fields_are_not_written() {
        let registry = registry();
        let mut record = EntityRecord::new(Entity::from_raw(3));
        record
            .attach(registry.create_by_name("Transform").unwrap(), &registry)
            .unwrap();
        let document = SaveDocument::capture([&record], &registry);
        assert!(document.entities[&3][&0].is_empty());

        let blob = document.encode(&WireCodec).unwrap();
        let loaded = SaveDocument::decode(&blob, &WireCodec)
            .unwrap()
            .restore(&registry, &mut EntityAllocator::new());
        let original = record.by_name("Transform").unwrap();
        let restored = loaded.records[0].by_name("Transform").unwrap();
        assert_eq!(restored.properties(), original.properties());
        assert!(loaded.report.is_clean());
    }

    #[test]
    fn test_duplicate_ids_keep_the_first() {
        let registry = registry();
        let records = world(&registry);
        let twin = EntityRecord::new(Entity::from_raw(10));
        let document = SaveDocument::capture([&records[0], &twin], &registry);
        assert_eq!(document.len(), 1);
        assert_eq!(document.entities[&10].len(), 1);
    }

    #[test]
    fn test_empty_document() {
        let document: SaveDocument<PropertyValue> = SaveDocument::capture(std::iter::empty(), &registry());
        assert!(document.is_empty());
        assert!(document.typings.is_empty());
    }
}
