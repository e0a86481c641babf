//! Read-only editor views.

use engine_component::{Codec, EntityRecord, PropertyFlags, TypeRegistry};

use crate::envelope::EntityEnvelope;

/// Encode the editor-visible fields of every component on `record`.
///
/// # Errors
///
/// Propagates the codec's encode error.
pub fn inspect_entity<C: Codec>(record: &EntityRecord, registry: &TypeRegistry, codec: &C) -> Result<C::Blob, C::Error> {
    EntityEnvelope::capture(record, registry, PropertyFlags::EDITOR).encode(codec)
}

#[cfg(test)]
mod tests {
    use engine_component::{
        ComponentSchema, Entity, Field, ParticipationPolicy, PropertyDescriptor, PropertyKind, TypeRegistryBuilder,
    };

    use super::*;
    use crate::codec::EditorCodec;

    #[test]
    fn test_inspect_shows_editor_fields_only() {
        const HP: Field<i64> = Field::new(0, "Hp");
        let schema = ComponentSchema::builder("Health")
            .property(
                PropertyDescriptor::new("Hp", PropertyKind::Int)
                    .with_flags(PropertyFlags::EDITOR | PropertyFlags::PERSIST)
                    .with_default(10i64),
            )
            .property(
                PropertyDescriptor::new("Regen", PropertyKind::Float)
                    .with_flags(PropertyFlags::REPLICATE)
                    .with_default(0.5f32),
            )
            .build()
            .unwrap();
        let mut builder = TypeRegistryBuilder::new();
        builder.register_schema(schema, ParticipationPolicy::LOCAL).unwrap();
        let registry = builder.freeze().unwrap();

        let mut record = EntityRecord::new(Entity::from_raw(7));
        let mut health = registry.create_by_name("Health").unwrap();
        health.properties_mut().set(HP, 42).unwrap();
        record.attach(health, &registry).unwrap();

        let text = inspect_entity(&record, &registry, &EditorCodec::default()).unwrap();
        assert_eq!(text, r#"{"id":7,"components":{"Health":{"Hp":42}}}"#);
    }
}
