//! The tri-state container.
//!
//! A [`Presence<T>`] is always in exactly one of three states:
//!
//! | State | `is_set` | value | Meaning |
//! |---|---|---|---|
//! | Unset | false | none | never provided |
//! | Null | true | none | explicitly cleared |
//! | Value | true | some | holds a `T` |
//!
//! The state is kept in a private enum so that an unset container can never
//! carry a value. Each transition replaces the held value wholesale.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::policy::{self, MarshalUnset, Policies, ScanNull};

pub(crate) type Overrides = (Option<MarshalUnset>, Option<ScanNull>);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Slot<T> {
    Unset,
    Null,
    Value(T),
}

/// An optional field that remembers whether it was ever provided.
#[derive(Clone)]
pub struct Presence<T> {
    slot: Slot<T>,
    marshal_unset: Option<MarshalUnset>,
    scan_null: Option<ScanNull>,
}

impl<T> Presence<T> {
    pub fn new_unset() -> Self {
        Self {
            slot: Slot::Unset,
            marshal_unset: None,
            scan_null: None,
        }
    }
    pub fn from_value(value: T) -> Self {
        let mut presence = Self::new_unset();
        presence.set_value(value);
        presence
    }
    pub fn null() -> Self {
        let mut presence = Self::new_unset();
        presence.set_null();
        presence
    }
    /// `None` becomes Null, `Some(v)` becomes Value(v).
    pub fn from_optional(value: Option<T>) -> Self {
        let mut presence = Self::new_unset();
        presence.set_value_from_optional(value);
        presence
    }

    // ------------- Transitions -------------
    pub fn set_value(&mut self, value: T) {
        self.slot = Slot::Value(value);
    }
    pub fn set_value_from_optional(&mut self, value: Option<T>) {
        match value {
            Some(value) => self.set_value(value),
            None => self.set_null(),
        }
    }
    pub fn set_null(&mut self) {
        self.slot = Slot::Null;
    }
    pub fn unset(&mut self) {
        self.slot = Slot::Unset;
    }

    // ------------- Predicates -------------
    pub fn is_unset(&self) -> bool {
        matches!(self.slot, Slot::Unset)
    }
    /// Set, but without a value.
    pub fn is_null(&self) -> bool {
        matches!(self.slot, Slot::Null)
    }
    /// Set, with or without a value.
    pub fn is_set(&self) -> bool {
        !self.is_unset()
    }
    pub fn is_value(&self) -> bool {
        matches!(self.slot, Slot::Value(_))
    }

    // ------------- Accessors -------------
    pub fn get(&self) -> Option<&T> {
        match &self.slot {
            Slot::Value(value) => Some(value),
            _ => None,
        }
    }
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match &mut self.slot {
            Slot::Value(value) => Some(value),
            _ => None,
        }
    }
    /// Same as [`Presence::get`], for call sites that think in pointers.
    pub fn as_pointer(&self) -> Option<&T> {
        self.get()
    }
    pub fn get_owned_or(&self, default: T) -> T
    where
        T: Clone,
    {
        self.get().cloned().unwrap_or(default)
    }
    /// Returns the value together with `true`, or `T::default()` with `false`.
    pub fn get_with_flag(&self) -> (T, bool)
    where
        T: Clone + Default,
    {
        match self.get() {
            Some(value) => (value.clone(), true),
            None => (T::default(), false),
        }
    }
    /// Returns the value, panicking when there is none.
    ///
    /// Reaching for this on an unset or null container is a programming
    /// error, not a data error. Prefer [`Presence::get`].
    ///
    /// # Panics
    /// When the container is Unset or Null.
    pub fn get_or_panic(&self) -> T
    where
        T: Clone,
    {
        match &self.slot {
            Slot::Value(value) => value.clone(),
            Slot::Null => panic!("precondition violated: get_or_panic called on a null value"),
            Slot::Unset => panic!("precondition violated: get_or_panic called on an unset value"),
        }
    }
    /// Consumes the container, leaving Unset and Null both as `None`.
    pub fn into_option(self) -> Option<T> {
        match self.slot {
            Slot::Value(value) => Some(value),
            _ => None,
        }
    }
    /// Consumes the container into a nested option: `None` for Unset,
    /// `Some(None)` for Null and `Some(Some(v))` for Value.
    pub fn into_nested(self) -> Option<Option<T>> {
        match self.slot {
            Slot::Unset => None,
            Slot::Null => Some(None),
            Slot::Value(value) => Some(Some(value)),
        }
    }

    // ------------- Policy overrides -------------
    pub fn set_marshal_unset(&mut self, marshal_unset: MarshalUnset) {
        self.marshal_unset = Some(marshal_unset);
    }
    pub fn clear_marshal_unset(&mut self) {
        self.marshal_unset = None;
    }
    /// The override if one was given, otherwise the current process default.
    pub fn marshal_unset(&self) -> MarshalUnset {
        self.marshal_unset.unwrap_or_else(policy::default_marshal_unset)
    }
    pub fn marshal_unset_with(&self, policies: &Policies) -> MarshalUnset {
        self.marshal_unset.unwrap_or(policies.marshal_unset)
    }
    pub fn set_scan_null(&mut self, scan_null: ScanNull) {
        self.scan_null = Some(scan_null);
    }
    pub fn clear_scan_null(&mut self) {
        self.scan_null = None;
    }
    pub fn scan_null(&self) -> ScanNull {
        self.scan_null.unwrap_or_else(policy::default_scan_null)
    }
    pub fn scan_null_with(&self, policies: &Policies) -> ScanNull {
        self.scan_null.unwrap_or(policies.scan_null)
    }

    pub(crate) fn overrides(&self) -> Overrides {
        (self.marshal_unset, self.scan_null)
    }
    pub(crate) fn with_overrides(mut self, (marshal_unset, scan_null): Overrides) -> Self {
        self.marshal_unset = marshal_unset;
        self.scan_null = scan_null;
        self
    }
}

impl<T> Default for Presence<T> {
    fn default() -> Self {
        Self::new_unset()
    }
}

impl<T> From<T> for Presence<T> {
    fn from(value: T) -> Self {
        Self::from_value(value)
    }
}

// Only the observable state takes part in comparisons.
impl<T: PartialEq> PartialEq for Presence<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}
impl<T: Eq> Eq for Presence<T> {}
impl<T: Hash> Hash for Presence<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
    }
}

impl<T: fmt::Debug> fmt::Debug for Presence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            Slot::Unset => write!(f, "Unset"),
            Slot::Null => write!(f, "Null"),
            Slot::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Presence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            Slot::Unset => write!(f, "unset"),
            Slot::Null => write!(f, "null"),
            Slot::Value(value) => write!(f, "{}", value),
        }
    }
}

/// Read access through a container that may not exist at all.
///
/// A missing container answers every question exactly like an unset one.
pub trait MaybePresence<T> {
    fn is_unset(&self) -> bool;
    fn is_null(&self) -> bool;
    fn is_set(&self) -> bool;
    fn is_value(&self) -> bool;
    fn get(&self) -> Option<&T>;
    fn get_owned_or(&self, default: T) -> T
    where
        T: Clone,
    {
        self.get().cloned().unwrap_or(default)
    }
    fn as_pointer(&self) -> Option<&T> {
        self.get()
    }
    fn get_with_flag(&self) -> (T, bool)
    where
        T: Clone + Default,
    {
        match self.get() {
            Some(value) => (value.clone(), true),
            None => (T::default(), false),
        }
    }
    /// The process default when the container is missing.
    fn marshal_unset(&self) -> MarshalUnset;
    /// The process default when the container is missing.
    fn scan_null(&self) -> ScanNull;
    fn is_zero_for_omission(&self) -> bool;
}

impl<T> MaybePresence<T> for Option<&Presence<T>> {
    fn is_unset(&self) -> bool {
        self.is_none_or(|presence| presence.is_unset())
    }
    fn is_null(&self) -> bool {
        self.is_some_and(|presence| presence.is_null())
    }
    fn is_set(&self) -> bool {
        self.is_some_and(|presence| presence.is_set())
    }
    fn is_value(&self) -> bool {
        self.is_some_and(|presence| presence.is_value())
    }
    fn get(&self) -> Option<&T> {
        self.and_then(|presence| presence.get())
    }
    fn marshal_unset(&self) -> MarshalUnset {
        self.map_or_else(policy::default_marshal_unset, |presence| presence.marshal_unset())
    }
    fn scan_null(&self) -> ScanNull {
        self.map_or_else(policy::default_scan_null, |presence| presence.scan_null())
    }
    fn is_zero_for_omission(&self) -> bool {
        match self {
            Some(presence) => presence.is_zero_for_omission(),
            None => policy::default_marshal_unset() == MarshalUnset::Skip,
        }
    }
}

impl<T> MaybePresence<T> for Option<Presence<T>> {
    fn is_unset(&self) -> bool {
        self.as_ref().is_unset()
    }
    fn is_null(&self) -> bool {
        self.as_ref().is_null()
    }
    fn is_set(&self) -> bool {
        self.as_ref().is_set()
    }
    fn is_value(&self) -> bool {
        self.as_ref().is_value()
    }
    fn get(&self) -> Option<&T> {
        self.as_ref().and_then(|presence| presence.get())
    }
    fn marshal_unset(&self) -> MarshalUnset {
        self.as_ref().marshal_unset()
    }
    fn scan_null(&self) -> ScanNull {
        self.as_ref().scan_null()
    }
    fn is_zero_for_omission(&self) -> bool {
        self.as_ref().is_zero_for_omission()
    }
}
