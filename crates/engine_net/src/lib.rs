//! # engine_net
//!
//! Serialisation layer for the entity framework.
//!
//! This crate provides:
//!
//! - [`codec`] — the binary wire codec (MessagePack) and the editor codec
//!   (JSON), plus MessagePack helpers.
//! - [`envelope`] — entity-level `type name → fields` payloads and the
//!   reconstruction report.
//! - [`save`] — multi-entity save documents with id remapping on load.
//! - [`prefab`] — diff-based storage of prefab-spawned entities.
//! - [`inspect`] — read-only editor views.
//! - [`error`] — serialisation-layer error types.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod inspect;
pub mod prefab;
pub mod save;

pub use codec::{EditorCodec, WireCodec, decode, encode};
pub use envelope::{EntityEnvelope, LoadReport};
pub use error::NetError;
pub use inspect::inspect_entity;
pub use prefab::PrefabInstance;
pub use save::{LoadedEntities, SaveDocument, SavedTyping, SavedTypings};
