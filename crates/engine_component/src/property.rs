//! Property declarations, participation flags and per-consumer dirty state.
//!
//! A [`PropertyDescriptor`] is the static shape of one field: its name, kind,
//! participation flags and optional default. It is shared by every instance
//! of the owning component type. A [`Property`] is the per-instance slot that
//! holds the current value and its dirty bits.
//!
//! ## Dirty tracking
//!
//! Each slot keeps one dirty bit per [`Consumer`]. A change marks every
//! consumer dirty, and each consumer clears only its own bit, so a network
//! sync never hides a change from a pending save pass (or the reverse).

use std::fmt;
use std::marker::PhantomData;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::value::{PropertyKind, PropertyType, PropertyValue};

/// The set of subsystems a property participates in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PropertyFlags(u8);

impl PropertyFlags {
    /// Participates in nothing.
    pub const NONE: Self = Self(0);
    /// Sent to remote peers.
    pub const REPLICATE: Self = Self(1 << 0);
    /// Written to save files.
    pub const PERSIST: Self = Self(1 << 1);
    /// Readable from editor and debug tooling.
    pub const EDITOR: Self = Self(1 << 2);
    /// Every participation class.
    pub const ALL: Self = Self(Self::REPLICATE.0 | Self::PERSIST.0 | Self::EDITOR.0);

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if every flag in `other` is also set in `self`.
    ///
    /// Every set contains [`PropertyFlags::NONE`], so filtering by `NONE`
    /// selects all properties.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if `self` and `other` share at least one flag.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns the union of both sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` if no flag is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PropertyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for PropertyFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Debug for PropertyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let names = [
            (Self::REPLICATE, "REPLICATE"),
            (Self::PERSIST, "PERSIST"),
            (Self::EDITOR, "EDITOR"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A class of reader that consumes property changes independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Consumer {
    /// Network delta encoding. Reads [`PropertyFlags::REPLICATE`] fields.
    Network,
    /// Save-pass encoding. Reads [`PropertyFlags::PERSIST`] fields.
    Save,
}

impl Consumer {
    /// Every consumer class.
    pub const ALL: [Consumer; 2] = [Consumer::Network, Consumer::Save];

    /// The participation flag a field must carry to be seen by this consumer.
    #[must_use]
    pub const fn flag(self) -> PropertyFlags {
        match self {
            Self::Network => PropertyFlags::REPLICATE,
            Self::Save => PropertyFlags::PERSIST,
        }
    }

    /// The consumer whose view is fed by `flag`, if any.
    #[must_use]
    pub fn for_flag(flag: PropertyFlags) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.flag() == flag)
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Network => 1 << 0,
            Self::Save => 1 << 1,
        }
    }

    const ALL_BITS: u8 = Self::Network.bit() | Self::Save.bit();
}

/// Static declaration of one component field.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    /// Stable key, unique within the owning component type.
    pub name: String,
    /// Declared semantic type.
    pub kind: PropertyKind,
    /// Participation flags. Fixed per declaration, never per instance.
    pub flags: PropertyFlags,
    /// Value supplied when nothing else initialises the field. Fields
    /// without a default must be assigned before they are read.
    pub default: Option<PropertyValue>,
}

impl PropertyDescriptor {
    /// Declare a field with no flags and no default.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            flags: PropertyFlags::NONE,
            default: None,
        }
    }

    /// Set the participation flags.
    #[must_use]
    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Supply a default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<PropertyValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Returns `true` if this field has a default.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// The per-instance state of one field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Property {
    value: Option<PropertyValue>,
    dirty: u8,
}

impl Property {
    /// A clean slot initialised from the descriptor's default.
    #[must_use]
    pub fn from_descriptor(descriptor: &PropertyDescriptor) -> Self {
        Self {
            value: descriptor.default.clone(),
            dirty: 0,
        }
    }

    /// The current value, or `None` if the field was never assigned.
    #[must_use]
    pub fn value(&self) -> Option<&PropertyValue> {
        self.value.as_ref()
    }

    /// Returns `true` if the field holds a value.
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.value.is_some()
    }

    /// Store `value`. Returns `true` and marks every consumer dirty if it
    /// differs from the current value.
    pub fn set(&mut self, value: PropertyValue) -> bool {
        if self.value.as_ref() == Some(&value) {
            return false;
        }
        self.value = Some(value);
        self.dirty = Consumer::ALL_BITS;
        true
    }

    /// Replace the value without touching dirty state.
    pub(crate) fn overwrite(&mut self, value: PropertyValue) {
        self.value = Some(value);
    }

    /// Returns `true` if `consumer` has not yet observed the latest change.
    #[must_use]
    pub fn is_dirty(&self, consumer: Consumer) -> bool {
        self.dirty & consumer.bit() != 0
    }

    /// Mark the slot as observed by `consumer`.
    pub fn clear_dirty(&mut self, consumer: Consumer) {
        self.dirty &= !consumer.bit();
    }

    /// Mark the slot as observed by every consumer.
    pub fn clear_all_dirty(&mut self) {
        self.dirty = 0;
    }

    /// Force every consumer to see the slot again.
    pub fn mark_dirty(&mut self) {
        self.dirty = Consumer::ALL_BITS;
    }
}

/// A typed handle to one field of a concrete component type.
///
/// `index` is the field's position in declaration order; `name` must match
/// the descriptor at that position.
pub struct Field<T> {
    index: usize,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Field<T> {
    #[must_use]
    pub const fn new(index: usize, name: &'static str) -> Self {
        Self {
            index,
            name,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl<T: PropertyType> Field<T> {
    /// The kind the field must be declared with.
    #[must_use]
    pub const fn kind(self) -> PropertyKind {
        T::KIND
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Field<T> {}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("index", &self.index)
            .field("name", &self.name)
            .finish()
    }
}
