//! Subcommand implementations. Each returns its output instead of printing
//! so the binary stays a thin shell.

use anyhow::{Context, Result};
use engine_component::{
    Component, Consumer, Entity, EntityAllocator, EntityRecord, PropertyFlags, RawValue, TypeRegistry,
};
use engine_defaults::{CapsuleCollider, DirectionalLight, NavigatableMesh, Prefab, Transform};
use engine_net::{EditorCodec, EntityEnvelope, LoadReport, PrefabInstance, SaveDocument, WireCodec, decode};
use glam::Vec3;
use tracing::{info, warn};

use crate::config::{BlobFormat, Pass};

/// One line per registered type: name, id, policy and fields.
#[must_use]
pub fn list_types(registry: &TypeRegistry) -> String {
    let mut out = String::new();
    for registration in registry.iter() {
        let policy = registration.policy();
        let fields: Vec<String> = registration
            .schema()
            .properties()
            .iter()
            .map(|desc| format!("{}:{}", desc.name, desc.kind))
            .collect();
        out.push_str(&format!(
            "{} {} persist={} replicate={} [{}]\n",
            registration.name(),
            registration.type_id(),
            policy.persist,
            policy.replicate,
            fields.join(", ")
        ));
    }
    out
}

/// Decode `blob` as `format`, rebuild its entities and render each one's
/// `filter` fields as JSON, one entity per line.
///
/// Components or fields that could not be restored are logged and left out
/// of the output.
///
/// # Errors
///
/// Fails if the blob does not decode as `format`.
pub fn inspect(
    registry: &TypeRegistry,
    blob: &[u8],
    format: BlobFormat,
    filter: Pass,
    pretty: bool,
) -> Result<String> {
    let (records, report) = match format {
        BlobFormat::Envelope => {
            let envelope: EntityEnvelope<RawValue> = decode(blob).context("decoding entity envelope")?;
            let (record, report) = envelope.restore(registry, PropertyFlags::REPLICATE);
            (vec![record], report)
        }
        BlobFormat::Save => {
            let document: SaveDocument<RawValue> = decode(blob).context("decoding save document")?;
            let loaded = document.restore(registry, &mut EntityAllocator::new());
            (loaded.records, loaded.report)
        }
        BlobFormat::Prefab => {
            let instance: PrefabInstance<RawValue> = decode(blob).context("decoding prefab instance")?;
            info!(prefab = %instance.prefab, index = instance.entity_index, "instantiating prefab entity");
            let (record, report) = instance.instantiate(registry, Entity::from_raw(1));
            (vec![record], report)
        }
    };
    log_report(&report);

    let codec = EditorCodec { pretty };
    let mut out = String::new();
    for record in &records {
        let view = EntityEnvelope::capture(record, registry, filter.flag());
        let text = view.encode(&codec).context("rendering entity")?;
        out.push_str(&text);
        out.push('\n');
    }
    Ok(out)
}

fn log_report(report: &LoadReport) {
    for err in &report.dropped {
        warn!(%err, "component dropped");
    }
    for field in &report.ignored {
        warn!(field, "unknown field ignored");
    }
    for err in &report.errors {
        warn!(%err, "field left at its default");
    }
    for entity in &report.skipped {
        warn!(%entity, "saved entity not restored");
    }
}

/// Build a small scene from the stock components and encode it as
/// `format`.
///
/// # Errors
///
/// Fails if a stock type is missing from `registry` or encoding fails.
pub fn sample(registry: &TypeRegistry, format: BlobFormat) -> Result<Vec<u8>> {
    let records = sample_scene(registry)?;
    let blob = match format {
        BlobFormat::Envelope => EntityEnvelope::capture(&records[0], registry, PropertyFlags::REPLICATE)
            .encode(&WireCodec)?,
        BlobFormat::Save => SaveDocument::capture(&records, registry).encode(&WireCodec)?,
        BlobFormat::Prefab => {
            let prefab = records[1]
                .get::<Prefab>()
                .context("sample prop has no prefab link")?;
            PrefabInstance::capture(&records[1], registry, &prefab.identifier()?, prefab.entity_index()?)
                .encode(&WireCodec)?
        }
    };
    Ok(blob)
}

/// A lit arena floor and a prop spawned from a prefab owned by it.
fn sample_scene(registry: &TypeRegistry) -> Result<Vec<EntityRecord>> {
    let mut floor = EntityRecord::new(Entity::from_raw(1));
    let mut transform = registry.create_typed::<Transform>()?;
    transform.set_position(Vec3::new(0.0, -1.0, 0.0))?;
    floor.insert(transform, registry)?;
    let mut mesh = registry.create_typed::<NavigatableMesh>()?;
    mesh.set_source("maps/arena.glb", "floor")?;
    floor.insert(mesh, registry)?;
    let mut light = registry.create_typed::<DirectionalLight>()?;
    light.aim(Vec3::new(0.0, 20.0, 0.0), Vec3::new(0.2, -1.0, 0.1))?;
    floor.insert(light, registry)?;

    let mut prop = EntityRecord::new(Entity::from_raw(2));
    let mut transform = registry.create_typed::<Transform>()?;
    transform.set_position(Vec3::new(3.0, 0.0, -2.0))?;
    prop.insert(transform, registry)?;
    let mut collider = registry.create_typed::<CapsuleCollider>()?;
    collider.resize(CapsuleCollider::DEFAULT_HEIGHT, 0.75)?;
    prop.insert(collider, registry)?;
    prop.insert(
        Prefab::spawned(registry, floor.id(), &Prefab::new_identifier(), 0)?,
        registry,
    )?;

    for component in floor.iter_mut().chain(prop.iter_mut()) {
        clear_all(component);
    }
    Ok(vec![floor, prop])
}

fn clear_all(component: &mut dyn Component) {
    let properties = component.properties_mut();
    properties.clear_dirty(Consumer::Network);
    properties.clear_dirty(Consumer::Save);
}
