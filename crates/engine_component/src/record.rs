//! Entity records: the components attached to one entity.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::component::{Component, ComponentType, ComponentTypeId};
use crate::entity::Entity;
use crate::error::{ComponentError, RegistryError};
use crate::property::Consumer;
use crate::registry::TypeRegistry;
use crate::schema::ComponentSchema;

/// One entity and its components.
///
/// Holds at most one component per type, in attach order. Every attached
/// type is known to the registry the record was populated from. Components
/// are owned by the record; dropping the record removes them (running
/// [`Component::on_removed`]) synchronously.
#[derive(Debug)]
pub struct EntityRecord {
    id: Entity,
    components: Vec<Box<dyn Component>>,
}

impl EntityRecord {
    #[must_use]
    pub fn new(id: Entity) -> Self {
        Self {
            id,
            components: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Entity {
        self.id
    }

    fn position(&self, type_id: ComponentTypeId) -> Option<usize> {
        self.components
            .iter()
            .position(|c| c.component_type_id() == type_id)
    }

    fn has_name(&self, name: &str) -> bool {
        self.components.iter().any(|c| c.type_name() == name)
    }

    /// Attach a component.
    ///
    /// If a component of the same type is already attached it is replaced,
    /// detached (its `on_removed` runs) and returned.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::UnknownType`] if the type is not registered.
    /// - [`ComponentError::SchemaMismatch`] if the component's descriptor
    ///   table differs from the registered one.
    /// - [`ComponentError::RequiredComponentMissing`] if a co-component the
    ///   type declares is not attached yet.
    pub fn attach(
        &mut self,
        component: Box<dyn Component>,
        registry: &TypeRegistry,
    ) -> Result<Option<Box<dyn Component>>, ComponentError> {
        let schema = registered_schema(component.as_ref(), registry)?;
        if let Some(required) = schema.requires().iter().find(|r| !self.has_name(r)) {
            return Err(ComponentError::RequiredComponentMissing {
                component: component.type_name().to_owned(),
                required: required.clone(),
            });
        }
        Ok(self.attach_unchecked(component))
    }

    /// Attach a concretely typed component. See [`EntityRecord::attach`].
    ///
    /// # Errors
    ///
    /// Same as [`EntityRecord::attach`].
    pub fn insert<T: ComponentType>(
        &mut self,
        component: T,
        registry: &TypeRegistry,
    ) -> Result<Option<Box<dyn Component>>, ComponentError> {
        self.attach(Box::new(component), registry)
    }

    /// Attach a batch of components reconstructed together, e.g. from a
    /// save file or a network envelope.
    ///
    /// Co-component requirements may be satisfied by other members of the
    /// batch, whatever their order. Components of unknown types, and
    /// components whose requirements are met neither by the record nor by
    /// the surviving batch, are skipped. Skipped components are reported
    /// and the rest are attached.
    pub fn attach_all(
        &mut self,
        components: Vec<Box<dyn Component>>,
        registry: &TypeRegistry,
    ) -> Vec<ComponentError> {
        let mut dropped = Vec::new();
        let mut batch = Vec::with_capacity(components.len());
        for component in components {
            match registered_schema(component.as_ref(), registry) {
                Ok(schema) => batch.push((component, schema.requires().to_vec())),
                Err(err) => {
                    warn!(entity = %self.id, component = component.type_name(), %err, "skipping component");
                    dropped.push(err);
                }
            }
        }

        // Drop members whose requirements are unmet until the batch is stable.
        loop {
            let unmet = batch.iter().position(|(_, requires)| {
                requires
                    .iter()
                    .any(|r| !self.has_name(r) && !batch.iter().any(|(c, _)| c.type_name() == r.as_str()))
            });
            let Some(index) = unmet else {
                break;
            };
            let (component, requires) = batch.remove(index);
            let required = requires
                .into_iter()
                .find(|r| !self.has_name(r) && !batch.iter().any(|(c, _)| c.type_name() == r.as_str()))
                .unwrap_or_default();
            warn!(
                entity = %self.id,
                component = component.type_name(),
                required = required.as_str(),
                "skipping component with missing co-component"
            );
            dropped.push(ComponentError::RequiredComponentMissing {
                component: component.type_name().to_owned(),
                required,
            });
        }

        for (component, _) in batch {
            self.attach_unchecked(component);
        }
        dropped
    }

    fn attach_unchecked(&mut self, mut component: Box<dyn Component>) -> Option<Box<dyn Component>> {
        component.properties_mut().set_owner(self.id);
        component.on_added(self.id);
        debug!(entity = %self.id, component = component.type_name(), "attached component");

        match self.position(component.component_type_id()) {
            Some(index) => {
                let mut previous = std::mem::replace(&mut self.components[index], component);
                Self::release(self.id, previous.as_mut());
                Some(previous)
            }
            None => {
                self.components.push(component);
                None
            }
        }
    }

    fn release(owner: Entity, component: &mut dyn Component) {
        component.on_removed(owner);
        component.properties_mut().set_owner(Entity::INVALID);
    }

    /// Remove the component of `type_id`, running its `on_removed` hook
    /// before returning it.
    pub fn detach(&mut self, type_id: ComponentTypeId) -> Option<Box<dyn Component>> {
        let index = self.position(type_id)?;
        let mut component = self.components.remove(index);
        Self::release(self.id, component.as_mut());
        debug!(entity = %self.id, component = component.type_name(), "detached component");
        Some(component)
    }

    /// Remove every component, most recently attached first.
    pub fn clear(&mut self) {
        while let Some(mut component) = self.components.pop() {
            Self::release(self.id, component.as_mut());
        }
    }

    /// Typed access to an attached component.
    #[must_use]
    pub fn get<T: ComponentType>(&self) -> Option<&T> {
        let index = self.position(ComponentTypeId::of::<T>())?;
        self.components[index].as_any().downcast_ref()
    }

    /// Typed mutable access to an attached component.
    #[must_use]
    pub fn get_mut<T: ComponentType>(&mut self) -> Option<&mut T> {
        let index = self.position(ComponentTypeId::of::<T>())?;
        self.components[index].as_any_mut().downcast_mut()
    }

    #[must_use]
    pub fn get_dyn(&self, type_id: ComponentTypeId) -> Option<&dyn Component> {
        self.position(type_id).map(|i| self.components[i].as_ref())
    }

    #[must_use]
    pub fn get_dyn_mut(&mut self, type_id: ComponentTypeId) -> Option<&mut dyn Component> {
        let index = self.position(type_id)?;
        Some(self.components[index].as_mut())
    }

    /// Look a component up by canonical type name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&dyn Component> {
        self.components
            .iter()
            .find(|c| c.type_name() == name)
            .map(AsRef::as_ref)
    }

    #[must_use]
    pub fn contains(&self, type_id: ComponentTypeId) -> bool {
        self.position(type_id).is_some()
    }

    /// Attached components in attach order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Component> {
        self.components.iter().map(AsRef::as_ref)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut dyn Component> {
        self.components.iter_mut().map(AsMut::as_mut)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Components with fields pending for `consumer`.
    pub fn dirty_components(&self, consumer: Consumer) -> impl Iterator<Item = &dyn Component> {
        self.iter().filter(move |c| c.properties().is_dirty(consumer))
    }

    /// Clear `consumer`'s view of every component.
    pub fn clear_dirty(&mut self, consumer: Consumer) {
        for component in &mut self.components {
            component.properties_mut().clear_dirty(consumer);
        }
    }

    /// Rewrite entity references in every component.
    pub fn remap_entities(&mut self, mut map: impl FnMut(Entity) -> Entity) {
        for component in &mut self.components {
            component.properties_mut().remap_entities(&mut map);
        }
    }

    /// Destroy the entity, removing every component synchronously.
    pub fn destroy(mut self) {
        self.clear();
    }
}

/// The registered schema of `component`'s type, provided the component
/// was built from it.
fn registered_schema<'r>(
    component: &dyn Component,
    registry: &'r TypeRegistry,
) -> Result<&'r Arc<ComponentSchema>, ComponentError> {
    let schema = registry
        .schema(component.component_type_id())
        .map_err(|_| RegistryError::UnknownType(component.type_name().to_owned()))?;
    let own = component.properties().schema();
    if !Arc::ptr_eq(own, schema) && **own != **schema {
        return Err(ComponentError::SchemaMismatch {
            component: component.type_name().to_owned(),
        });
    }
    Ok(schema)
}

impl Drop for EntityRecord {
    fn drop(&mut self) {
        self.clear();
    }
}
