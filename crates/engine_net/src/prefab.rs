//! Compact storage for prefab-spawned entities.
//!
//! An entity spawned from a prefab is stored as the prefab identifier, its
//! index within the prefab, and one diff per component against the
//! registered default, instead of a full copy of every field.

use engine_component::{
    Codec, ComponentDiff, Entity, EntityRecord, PropertyFlags, PropertyValue, RawValue, TaggedComponent,
    TypeRegistry, apply_diff, diff_against_default_filtered,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::envelope::LoadReport;

/// One entity of a prefab instance, as persisted diffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabInstance<V> {
    /// Identifier of the saved prefab.
    pub prefab: String,
    /// Position of this entity within the prefab.
    pub entity_index: u64,
    /// Per-component diffs, in attach order.
    pub components: Vec<TaggedComponent<V>>,
}

impl PrefabInstance<PropertyValue> {
    /// Diff every persisted component of `record` against its default.
    ///
    /// Components equal to their default are kept with an empty diff so the
    /// component set is preserved.
    #[must_use]
    pub fn capture(record: &EntityRecord, registry: &TypeRegistry, prefab: &str, entity_index: u64) -> Self {
        let components = record
            .iter()
            .filter(|c| registry.should_persist(c.component_type_id()))
            .filter_map(|c| diff_against_default_filtered(c, registry, PropertyFlags::PERSIST).ok())
            .map(|diff| diff.to_tagged())
            .collect();
        Self {
            prefab: prefab.to_owned(),
            entity_index,
            components,
        }
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

impl PrefabInstance<RawValue> {
    /// Decode with `codec`.
    ///
    /// # Errors
    ///
    /// Propagates the codec's decode error.
    pub fn decode<C: Codec>(blob: &C::Blob, codec: &C) -> Result<Self, C::Error> {
        codec.decode(blob)
    }

    /// Spawn the entity as `id`: each component starts from its registered
    /// default and the diff is written over it.
    #[must_use]
    pub fn instantiate(&self, registry: &TypeRegistry, id: Entity) -> (EntityRecord, LoadReport) {
        let mut report = LoadReport::default();
        let mut batch = Vec::with_capacity(self.components.len());

        for tagged in &self.components {
            let diff = match ComponentDiff::from_tagged(tagged, registry) {
                Ok((diff, decoded)) => {
                    report.absorb(&tagged.type_name, decoded);
                    diff
                }
                Err(err) => {
                    warn!(prefab = self.prefab.as_str(), component = tagged.type_name.as_str(), "skipping unknown prefab component");
                    report.dropped.push(err.into());
                    continue;
                }
            };
            match apply_diff(registry, &diff) {
                Ok(component) => batch.push(component),
                Err(err) => report.dropped.push(err.into()),
            }
        }

        let mut record = EntityRecord::new(id);
        report.dropped.extend(record.attach_all(batch, registry));
        (record, report)
    }
}
