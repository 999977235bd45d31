//! Presence – tri-state optional values for partial updates.
//!
//! A [`Presence<T>`] is either *unset* (never provided), *null* (provided,
//! but empty) or holds a *value*. Plain `Option<T>` collapses the first two,
//! which is exactly the distinction a PATCH style update needs: a field left
//! out of a request must not clear the column it maps to.
//!
//! ## Modules
//! * [`presence`] – The container, its state transitions and accessors.
//! * [`json`] – serde support, standalone `marshal`/`unmarshal` and the
//!   omission predicate used with `skip_serializing_if`.
//! * [`storage`] – The [`storage::Storable`] trait and the rusqlite
//!   `ToSql`/`FromSql` bridge, dispatching on native, self-describing and
//!   opaque (JSON) types.
//! * [`combinators`] – `map`, `flat_map`, `filter`, `first_value` and friends.
//! * [`policy`] – Marshal and scan policies, per process and per value.
//!
//! ## Policies
//! Two knobs alter codec behaviour. [`MarshalUnset`] decides whether an unset
//! field counts as zero when its record is serialized, and [`ScanNull`]
//! decides whether a storage `NULL` becomes Null or Unset. A container may
//! carry its own override; otherwise the process-wide default applies at the
//! time of the call. Codec entry points also accept an explicit [`Policies`]
//! through their `*_with` variants.
//!
//! ## Quick Start
//! ```
//! use presence::{Presence, first_value};
//! use rusqlite::Connection;
//!
//! let mut age: Presence<i16> = Presence::new_unset();
//! assert!(age.is_unset());
//! age.unmarshal(b"42").unwrap();
//! assert_eq!(age.get(), Some(&42));
//!
//! let conn = Connection::open_in_memory().unwrap();
//! let scanned: Presence<i16> = conn.query_row("select null", [], |r| r.get(0)).unwrap();
//! assert!(scanned.is_null());
//!
//! assert_eq!(first_value([Presence::new_unset(), scanned, age]).get(), Some(&42));
//! ```

pub mod combinators;
pub mod error;
pub mod json;
pub mod policy;
pub mod presence;
pub mod storage;

pub use combinators::{first_value, from_condition, from_pointer};
pub use error::{PresenceError, Result};
pub use policy::{MarshalUnset, Policies, ScanNull};
pub use presence::{MaybePresence, Presence};
pub use storage::{Category, Json, Storable};
