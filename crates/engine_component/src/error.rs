//! Component and registry error types.

use crate::component::ComponentTypeId;
use crate::property::PropertyFlags;
use crate::value::PropertyKind;

/// Errors raised while reading, writing or attaching components.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComponentError {
    /// A value's kind disagrees with the field's declared kind. Scoped to
    /// that one field.
    #[error("property '{property}' expects {expected}, found {found}")]
    TypeMismatch {
        property: String,
        expected: PropertyKind,
        found: String,
    },

    /// A field without a default was read before it was assigned.
    #[error("property '{property}' of '{component}' was read before it was assigned")]
    MissingRequiredDefault { component: String, property: String },

    /// The component type has no field with this name.
    #[error("'{component}' has no property named '{property}'")]
    UnknownProperty { component: String, property: String },

    /// A declared co-component was absent when the component was attached.
    #[error("'{component}' requires '{required}' on the same entity")]
    RequiredComponentMissing { component: String, required: String },

    /// The component carries a descriptor table other than the one
    /// registered for its type name.
    #[error("'{component}' does not match its registered schema")]
    SchemaMismatch { component: String },

    /// The component's type is excluded from the pass that produced or is
    /// consuming the payload.
    #[error("'{component}' does not take part in {flag:?} passes")]
    NotParticipating { component: String, flag: PropertyFlags },

    /// A registry lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors raised by the type registry.
///
/// Errors from the registration phase are startup-fatal: the registry must be
/// consistent before the simulation runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The name or type id is already present.
    #[error("component type '{name}' ({type_id}) is already registered")]
    DuplicateRegistration {
        name: String,
        type_id: ComponentTypeId,
    },

    /// No registered type matches the name or id.
    #[error("unknown component type '{0}'")]
    UnknownType(String),

    /// The prototype supplied at registration does not describe the
    /// registered name and id.
    #[error("registration for '{name}' ({type_id}) supplied a prototype of '{prototype}'")]
    InconsistentRegistration {
        name: String,
        type_id: ComponentTypeId,
        prototype: String,
    },

    /// A type declares a co-component that was never registered.
    #[error("'{component}' requires unregistered component type '{required}'")]
    UnknownRequirement { component: String, required: String },

    /// A component schema is malformed.
    #[error("invalid schema for '{component}': {reason}")]
    InvalidSchema { component: String, reason: String },
}
