//! The per-instance property table of a component.
//!
//! [`PropertySet`] pairs a shared [`ComponentSchema`] with one [`Property`]
//! slot per descriptor. It is the piece every concrete component embeds, and
//! it implements the filtered serialisation walk shared by all codecs.
//!
//! Blobs are maps from field name to value, never positional, so fields can
//! be reordered in a type declaration without breaking older peers. Decoding
//! is tolerant in both directions: unknown names are ignored and missing
//! names leave the current value in place. A field whose encoded value has
//! the wrong shape fails on its own without aborting the rest.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::{Codec, TaggedComponent};
use crate::entity::Entity;
use crate::error::ComponentError;
use crate::property::{Consumer, Field, Property, PropertyDescriptor, PropertyFlags};
use crate::schema::ComponentSchema;
use crate::value::{PropertyKind, PropertyType, PropertyValue, RawValue};

/// Outcome of applying a decoded blob to a component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeReport {
    /// Number of fields read from the blob (changed or not).
    pub applied: usize,
    /// Field names in the blob that the receiving type does not accept.
    pub ignored: Vec<String>,
    /// Field-scoped failures. Each one left its field untouched.
    pub errors: Vec<ComponentError>,
}

impl DecodeReport {
    /// Returns `true` if every field in the blob was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.ignored.is_empty() && self.errors.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: DecodeReport) {
        self.applied += other.applied;
        self.ignored.extend(other.ignored);
        self.errors.extend(other.errors);
    }
}

/// Schema handle, owner back-reference and property slots of one component.
#[derive(Debug, Clone)]
pub struct PropertySet {
    schema: Arc<ComponentSchema>,
    owner: Entity,
    slots: Vec<Property>,
}

impl PropertySet {
    /// A detached, clean set initialised from the schema's defaults.
    #[must_use]
    pub fn new(schema: Arc<ComponentSchema>) -> Self {
        let slots = schema.properties().iter().map(Property::from_descriptor).collect();
        Self {
            schema,
            owner: Entity::INVALID,
            slots,
        }
    }

    /// The shared schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<ComponentSchema> {
        &self.schema
    }

    /// The canonical type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.schema.name()
    }

    /// The entity this component is attached to, or [`Entity::INVALID`].
    #[must_use]
    pub fn owner(&self) -> Entity {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Entity) {
        self.owner = owner;
    }

    /// Copy every value into a detached set with all dirty bits cleared.
    #[must_use]
    pub fn instantiate(&self) -> Self {
        let mut copy = self.clone();
        copy.owner = Entity::INVALID;
        for slot in &mut copy.slots {
            slot.clear_all_dirty();
        }
        copy
    }

    /// Slots in declaration order.
    #[must_use]
    pub fn slots(&self) -> &[Property] {
        &self.slots
    }

    /// The slot for `name`.
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<&Property> {
        self.schema.index_of(name).map(|i| &self.slots[i])
    }

    /// Iterate `(descriptor, slot)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&PropertyDescriptor, &Property)> {
        self.schema.properties().iter().zip(&self.slots)
    }

    // -- Typed access --

    /// Read a field through its typed handle.
    ///
    /// # Errors
    ///
    /// [`ComponentError::MissingRequiredDefault`] if the field was never
    /// assigned, [`ComponentError::TypeMismatch`] if the handle's type does not
    /// match the declaration.
    pub fn get<T: PropertyType>(&self, field: Field<T>) -> Result<T, ComponentError> {
        let index = self.resolve(field)?;
        let value = self.read_at(index)?;
        T::from_value(value).ok_or_else(|| self.mismatch(index, value.kind().to_string()))
    }

    /// Write a field through its typed handle. Returns `true` if the value
    /// changed.
    ///
    /// # Errors
    ///
    /// [`ComponentError::TypeMismatch`] if the handle's type does not match
    /// the declaration.
    pub fn set<T: PropertyType>(&mut self, field: Field<T>, value: T) -> Result<bool, ComponentError> {
        let index = self.resolve(field)?;
        self.write_at(index, value.into_value())
    }

    // -- By-name access --

    /// Read a field by name.
    ///
    /// # Errors
    ///
    /// [`ComponentError::UnknownProperty`] or
    /// [`ComponentError::MissingRequiredDefault`].
    pub fn value(&self, name: &str) -> Result<&PropertyValue, ComponentError> {
        let index = self.index_of(name)?;
        self.read_at(index)
    }

    /// Write a field by name. Returns `true` if the value changed.
    ///
    /// # Errors
    ///
    /// [`ComponentError::UnknownProperty`] or [`ComponentError::TypeMismatch`].
    pub fn set_value(&mut self, name: &str, value: PropertyValue) -> Result<bool, ComponentError> {
        let index = self.index_of(name)?;
        self.write_at(index, value)
    }

    fn index_of(&self, name: &str) -> Result<usize, ComponentError> {
        self.schema
            .index_of(name)
            .ok_or_else(|| ComponentError::UnknownProperty {
                component: self.type_name().to_owned(),
                property: name.to_owned(),
            })
    }

    fn resolve<T: PropertyType>(&self, field: Field<T>) -> Result<usize, ComponentError> {
        let desc = self
            .schema
            .properties()
            .get(field.index())
            .filter(|d| d.name == field.name())
            .ok_or_else(|| ComponentError::UnknownProperty {
                component: self.type_name().to_owned(),
                property: field.name().to_owned(),
            })?;
        if desc.kind != T::KIND {
            return Err(self.mismatch(field.index(), T::KIND.to_string()));
        }
        Ok(field.index())
    }

    fn read_at(&self, index: usize) -> Result<&PropertyValue, ComponentError> {
        self.slots[index]
            .value()
            .ok_or_else(|| ComponentError::MissingRequiredDefault {
                component: self.type_name().to_owned(),
                property: self.schema.properties()[index].name.clone(),
            })
    }

    fn write_at(&mut self, index: usize, value: PropertyValue) -> Result<bool, ComponentError> {
        if value.kind() != self.schema.properties()[index].kind {
            return Err(self.mismatch(index, value.kind().to_string()));
        }
        Ok(self.slots[index].set(value))
    }

    fn mismatch(&self, index: usize, found: String) -> ComponentError {
        let desc = &self.schema.properties()[index];
        ComponentError::TypeMismatch {
            property: desc.name.clone(),
            expected: desc.kind,
            found,
        }
    }

    // -- Dirty tracking --

    /// Returns `true` if a field visible to `consumer` changed since that
    /// consumer last cleared its view.
    #[must_use]
    pub fn is_dirty(&self, consumer: Consumer) -> bool {
        self.iter()
            .any(|(desc, slot)| desc.flags.contains(consumer.flag()) && slot.is_dirty(consumer))
    }

    /// Names of fields pending for `consumer`.
    pub fn dirty_names(&self, consumer: Consumer) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(move |(desc, slot)| desc.flags.contains(consumer.flag()) && slot.is_dirty(consumer))
            .map(|(desc, _)| desc.name.as_str())
    }

    /// Clear `consumer`'s view of every field. Other consumers are unaffected.
    pub fn clear_dirty(&mut self, consumer: Consumer) {
        for slot in &mut self.slots {
            slot.clear_dirty(consumer);
        }
    }

    /// Mark every field dirty for every consumer (forces a full resend).
    pub fn mark_all_dirty(&mut self) {
        for slot in &mut self.slots {
            slot.mark_dirty();
        }
    }

    // -- Serialisation --

    /// Borrow the assigned fields whose flags include `flag`, keyed by name.
    ///
    /// Unassigned fields are left out.
    #[must_use]
    pub fn filtered(&self, flag: PropertyFlags) -> BTreeMap<&str, &PropertyValue> {
        self.iter()
            .filter(|(desc, _)| desc.flags.contains(flag))
            .filter_map(|(desc, slot)| slot.value().map(|v| (desc.name.as_str(), v)))
            .collect()
    }

    /// Owned copy of [`PropertySet::filtered`], tagged with the type name.
    #[must_use]
    pub fn tagged(&self, flag: PropertyFlags) -> TaggedComponent<PropertyValue> {
        let mut tagged = TaggedComponent::new(self.type_name());
        tagged.fields = self
            .filtered(flag)
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value.clone()))
            .collect();
        tagged
    }

    /// Encode the fields flagged `flag` as a name-keyed map.
    ///
    /// # Errors
    ///
    /// Propagates the codec's encode error.
    pub fn serialize_filtered<C: Codec>(&self, flag: PropertyFlags, codec: &C) -> Result<C::Blob, C::Error> {
        codec.encode(&self.filtered(flag))
    }

    /// Collect the fields pending for `consumer` and clear that consumer's
    /// view. Other consumers keep their pending state.
    pub fn take_dirty(&mut self, consumer: Consumer) -> BTreeMap<String, PropertyValue> {
        let pending = self.pending(consumer);
        self.clear_dirty(consumer);
        pending
    }

    fn pending(&self, consumer: Consumer) -> BTreeMap<String, PropertyValue> {
        self.iter()
            .filter(|(desc, slot)| desc.flags.contains(consumer.flag()) && slot.is_dirty(consumer))
            .filter_map(|(desc, slot)| slot.value().map(|v| (desc.name.clone(), v.clone())))
            .collect()
    }

    /// Encode only the fields pending for `consumer`, then clear that
    /// consumer's view. Nothing is cleared if encoding fails.
    ///
    /// # Errors
    ///
    /// Propagates the codec's encode error.
    pub fn serialize_dirty<C: Codec>(&mut self, consumer: Consumer, codec: &C) -> Result<C::Blob, C::Error> {
        let blob = codec.encode(&self.pending(consumer))?;
        self.clear_dirty(consumer);
        Ok(blob)
    }

    /// Decode a name-keyed blob and apply the fields flagged `flag`.
    ///
    /// # Errors
    ///
    /// Returns the codec's error only if the blob is not a map at all.
    /// Field-level problems are collected in the [`DecodeReport`].
    pub fn deserialize_filtered<C: Codec>(
        &mut self,
        flag: PropertyFlags,
        blob: &C::Blob,
        codec: &C,
    ) -> Result<DecodeReport, C::Error> {
        let fields: BTreeMap<String, RawValue> = codec.decode(blob)?;
        Ok(self.apply_raw(flag, &fields))
    }

    /// Apply already-decoded fields, in declaration order.
    ///
    /// A field that changes is dirty for every consumer except the one that
    /// `flag` feeds: a value that arrived from the network does not need to
    /// be sent back, but the save pass still has to see it.
    pub fn apply_raw(&mut self, flag: PropertyFlags, fields: &BTreeMap<String, RawValue>) -> DecodeReport {
        let mut report = DecodeReport::default();
        let source = Consumer::for_flag(flag);

        for index in 0..self.slots.len() {
            let desc = &self.schema.properties()[index];
            if !desc.flags.contains(flag) {
                continue;
            }
            let Some(raw) = fields.get(&desc.name) else {
                continue;
            };
            let Some(value) = PropertyValue::from_raw(desc.kind, raw) else {
                warn!(
                    component = self.schema.name(),
                    property = desc.name.as_str(),
                    expected = %desc.kind,
                    found = raw.describe(),
                    "type mismatch while decoding property"
                );
                report.errors.push(self.mismatch(index, raw.describe().to_owned()));
                continue;
            };
            let slot = &mut self.slots[index];
            if slot.set(value)
                && let Some(consumer) = source
            {
                slot.clear_dirty(consumer);
            }
            report.applied += 1;
        }

        for name in fields.keys() {
            let accepted = self
                .schema
                .descriptor(name)
                .is_some_and(|d| d.flags.contains(flag));
            if !accepted {
                debug!(component = self.schema.name(), property = name.as_str(), "ignoring unknown property");
                report.ignored.push(name.clone());
            }
        }

        report
    }

    /// Rewrite every entity reference through `map`, leaving dirty state
    /// alone. Used when restored entities receive fresh ids.
    pub fn remap_entities(&mut self, mut map: impl FnMut(Entity) -> Entity) {
        for (desc, slot) in self.schema.properties().iter().zip(&mut self.slots) {
            if desc.kind != PropertyKind::Entity {
                continue;
            }
            if let Some(PropertyValue::Entity(old)) = slot.value() {
                let new = map(*old);
                slot.overwrite(PropertyValue::Entity(new));
            }
        }
    }
}

/// Field-for-field equality of values. Owner and dirty state are ignored.
impl PartialEq for PropertySet {
    fn eq(&self, other: &Self) -> bool {
        self.schema.component_type_id() == other.schema.component_type_id()
            && self
                .slots
                .iter()
                .zip(&other.slots)
                .all(|(a, b)| a.value() == b.value())
            && self.slots.len() == other.slots.len()
    }
}
