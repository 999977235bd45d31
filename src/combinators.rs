//! Functional helpers that never skip past the state machine.
//!
//! Unset stays Unset and Null stays Null; only a held value reaches the
//! caller's closure, except that [`Presence::filter`]
//! demotes a rejected value to Null, and [`first_value`] and
//! [`from_pointer`] answer an absence with Null.

use crate::presence::Presence;

impl<T> Presence<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Presence<U> {
        let overrides = self.overrides();
        let mapped = match self.into_nested() {
            None => Presence::new_unset(),
            Some(None) => Presence::null(),
            Some(Some(value)) => Presence::from_value(f(value)),
        };
        mapped.with_overrides(overrides)
    }

    pub fn map_or<U>(self, default: U, f: impl FnOnce(T) -> U) -> U {
        match self.into_option() {
            Some(value) => f(value),
            None => default,
        }
    }

    /// The closure decides the resulting state, so it can reject a value by
    /// returning Null (or Unset).
    pub fn flat_map<U>(self, f: impl FnOnce(T) -> Presence<U>) -> Presence<U> {
        let overrides = self.overrides();
        match self.into_nested() {
            None => Presence::new_unset().with_overrides(overrides),
            Some(None) => Presence::null().with_overrides(overrides),
            Some(Some(value)) => f(value),
        }
    }

    /// Keeps a value that passes `predicate`; a rejected value becomes Null.
    pub fn filter(mut self, predicate: impl FnOnce(&T) -> bool) -> Self {
        if self.get().is_some_and(|value| !predicate(value)) {
            self.set_null();
        }
        self
    }

    /// `self` if it holds a value, else `other` if that does, else Null.
    pub fn or(self, other: Self) -> Self {
        first_value([self, other])
    }
}

/// The first container holding a value, scanning left to right.
/// Null when none does, including when there is nothing to scan.
pub fn first_value<T>(containers: impl IntoIterator<Item = Presence<T>>) -> Presence<T> {
    containers
        .into_iter()
        .find(Presence::is_value)
        .unwrap_or_else(Presence::null)
}

/// `None` is Null here, not Unset: a missing pointer is an empty result.
pub fn from_pointer<T: Clone>(pointer: Option<&T>) -> Presence<T> {
    Presence::from_optional(pointer.cloned())
}

/// Value when `ok`, Null otherwise. Pairs well with `(value, found)` lookups.
pub fn from_condition<T>(value: T, ok: bool) -> Presence<T> {
    if ok { Presence::from_value(value) } else { Presence::null() }
}
