//! Stock gameplay components and the default type table.
//!
//! [`register_defaults`] is the generated registration table: one entry per
//! component type, with its participation policy. Servers call it during
//! startup, add their own types, and freeze the registry before the first
//! tick.

pub mod lighting;
pub mod navigation;
pub mod physics;
pub mod prefab;
pub mod transform;

use engine_component::{ParticipationPolicy, RegistryError, TypeRegistry, TypeRegistryBuilder};
use tracing::debug;

pub use lighting::DirectionalLight;
pub use navigation::NavigatableMesh;
pub use physics::CapsuleCollider;
pub use prefab::Prefab;
pub use transform::Transform;

/// Register every stock component type.
///
/// # Errors
///
/// Fails if any of the types is already registered in `builder`.
pub fn register_defaults(builder: &mut TypeRegistryBuilder) -> Result<(), RegistryError> {
    builder.register_type::<Transform>(ParticipationPolicy::ALL)?;
    builder.register_type::<CapsuleCollider>(ParticipationPolicy::ALL)?;
    builder.register_type::<DirectionalLight>(ParticipationPolicy::ALL)?;
    builder.register_type::<NavigatableMesh>(ParticipationPolicy::SAVE_ONLY)?;
    builder.register_type::<Prefab>(ParticipationPolicy::ALL)?;
    debug!(types = builder.len(), "registered default component types");
    Ok(())
}

/// A frozen registry holding only the stock types.
///
/// # Errors
///
/// Propagates registration errors, which indicate a broken type table.
pub fn default_registry() -> Result<TypeRegistry, RegistryError> {
    let mut builder = TypeRegistryBuilder::new();
    register_defaults(&mut builder)?;
    builder.freeze()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use engine_component::{
        Component, ComponentError, ComponentType, ComponentTypeId, Consumer, Entity, EntityRecord, PropertyFlags,
        PropertyValue, RawValue, diff_against_default,
    };
    use engine_net::{EntityEnvelope, WireCodec};
    use glam::Vec3;

    use super::*;

    fn decode_map(blob: &[u8]) -> BTreeMap<String, RawValue> {
        rmp_serde::from_slice(blob).unwrap()
    }

    #[test]
    fn test_default_table_registers_every_type() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.len(), 5);
        for name in ["Transform", "CapsuleCollider", "DirectionalLight", "NavigatableMesh", "Prefab"] {
            let t = registry.type_for(name).unwrap();
            assert_eq!(registry.name_for(t).unwrap(), name);
        }
    }

    #[test]
    fn test_register_twice_is_rejected() {
        let mut builder = TypeRegistryBuilder::new();
        register_defaults(&mut builder).unwrap();
        assert!(matches!(
            register_defaults(&mut builder),
            Err(RegistryError::DuplicateRegistration { .. })
        ));
    }

    #[test]
    fn test_transform_network_consumption_leaves_save_view() {
        let registry = default_registry().unwrap();
        let mut transform = registry.create_typed::<Transform>().unwrap();
        transform.properties_mut().set(Transform::X, 5.0).unwrap();

        let expected = BTreeMap::from([
            ("X".to_owned(), RawValue::Float32(5.0)),
            ("Y".to_owned(), RawValue::Float32(0.0)),
            ("Z".to_owned(), RawValue::Float32(0.0)),
        ]);
        let net = (&transform as &dyn Component)
            .serialize_filtered(PropertyFlags::REPLICATE, &WireCodec)
            .unwrap();
        assert_eq!(decode_map(&net), expected);

        transform.properties_mut().clear_dirty(Consumer::Network);
        let save = (&transform as &dyn Component)
            .serialize_filtered(PropertyFlags::PERSIST, &WireCodec)
            .unwrap();
        assert_eq!(decode_map(&save), expected);
        assert!(transform.properties().is_dirty(Consumer::Save));
    }

    #[test]
    fn test_misspelled_type_is_skipped() {
        let registry = default_registry().unwrap();
        let mut created = Vec::new();
        for name in ["Trasnform", "CapsuleCollider"] {
            match registry.create_by_name(name) {
                Ok(component) => created.push(component),
                Err(RegistryError::UnknownType(missing)) => assert_eq!(missing, "Trasnform"),
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].type_name(), "CapsuleCollider");
    }

    #[test]
    fn test_capsule_defaults() {
        let registry = default_registry().unwrap();
        let collider = registry.create_typed::<CapsuleCollider>().unwrap();
        assert_eq!(collider.height().unwrap(), 1.6);
        assert_eq!(collider.width().unwrap(), 0.5);
        assert!(diff_against_default(&collider, &registry).unwrap().is_empty());
    }

    #[test]
    fn test_directional_light_requires_assignment() {
        let registry = default_registry().unwrap();
        let mut light = registry.create_typed::<DirectionalLight>().unwrap();
        assert!(matches!(
            light.position(),
            Err(ComponentError::MissingRequiredDefault { .. })
        ));
        light.aim(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -2.0, 0.0)).unwrap();
        assert_eq!(light.direction().unwrap(), Vec3::NEG_Y);

        let blob = (&light as &dyn Component)
            .serialize_filtered(PropertyFlags::PERSIST, &WireCodec)
            .unwrap();
        let fields = decode_map(&blob);
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_unassigned_fields_are_not_serialised() {
        let registry = default_registry().unwrap();
        let light = registry.create_typed::<DirectionalLight>().unwrap();
        let blob = (&light as &dyn Component)
            .serialize_filtered(PropertyFlags::PERSIST, &WireCodec)
            .unwrap();
        assert!(decode_map(&blob).is_empty());
    }

    #[test]
    fn test_navigatable_mesh_requires_transform() {
        let registry = default_registry().unwrap();
        let mut record = EntityRecord::new(Entity::from_raw(1));
        let mut mesh = registry.create_typed::<NavigatableMesh>().unwrap();
        mesh.set_source("maps/arena", "ground").unwrap();

        let err = record.insert(mesh.clone(), &registry).unwrap_err();
        assert!(matches!(err, ComponentError::RequiredComponentMissing { .. }));

        record.insert(registry.create_typed::<Transform>().unwrap(), &registry).unwrap();
        record.insert(mesh, &registry).unwrap();
        assert_eq!(record.get::<NavigatableMesh>().unwrap().mesh_name().unwrap(), "ground");
    }

    #[test]
    fn test_navigatable_mesh_is_never_replicated() {
        let registry = default_registry().unwrap();
        let mut record = EntityRecord::new(Entity::from_raw(1));
        record.insert(registry.create_typed::<Transform>().unwrap(), &registry).unwrap();
        let mut mesh = registry.create_typed::<NavigatableMesh>().unwrap();
        mesh.set_source("maps/arena", "ground").unwrap();
        record.insert(mesh, &registry).unwrap();

        let mesh_id = ComponentTypeId::of::<NavigatableMesh>();
        assert!(!registry.should_replicate(mesh_id));
        assert!(registry.should_persist(mesh_id));

        let net = EntityEnvelope::capture(&record, &registry, PropertyFlags::REPLICATE);
        assert!(!net.components.contains_key(NavigatableMesh::NAME));
        let save = EntityEnvelope::capture(&record, &registry, PropertyFlags::PERSIST);
        assert_eq!(
            save.components[NavigatableMesh::NAME]["AwsPath"],
            PropertyValue::from("maps/arena")
        );

        let mesh = record.get_dyn(mesh_id).unwrap();
        let blob = registry
            .serialize_component(mesh, PropertyFlags::REPLICATE, &WireCodec)
            .unwrap();
        assert!(blob.is_none());
    }

    #[test]
    fn test_prefab_link() {
        let registry = default_registry().unwrap();
        let id = Prefab::new_identifier();
        assert_eq!(id.len(), 36);
        assert_ne!(id, Prefab::new_identifier());

        let prefab = Prefab::spawned(&registry, Entity::from_raw(4), &id, 2).unwrap();
        assert_eq!(prefab.instance_owner().unwrap(), Entity::from_raw(4));
        assert_eq!(prefab.identifier().unwrap(), id);
        assert_eq!(prefab.entity_index().unwrap(), 2);

        let unassigned = registry.create_typed::<Prefab>().unwrap();
        assert!(unassigned.identifier().is_err());
    }

    #[test]
    fn test_transform_position() {
        let registry = default_registry().unwrap();
        let mut transform = registry.create_typed::<Transform>().unwrap();
        assert!(transform.set_position(Vec3::new(1.0, 2.0, 3.0)).unwrap());
        assert!(!transform.set_position(Vec3::new(1.0, 2.0, 3.0)).unwrap());
        assert_eq!(transform.position().unwrap(), Vec3::new(1.0, 2.0, 3.0));
    }
}
