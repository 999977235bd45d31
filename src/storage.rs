//! Storage side of the codec layer.
//!
//! Every type a container can persist implements [`Storable`], which also
//! records the type's [`Category`]:
//! * *native* scalars (text, booleans, integers, floats, timestamps, UUIDs)
//!   map straight onto a driver value,
//! * *self-describing* types bring their own conversion, usually through
//!   rusqlite's `ToSql`/`FromSql` (see [`storable_as_sql!`](crate::storable_as_sql)),
//! * *opaque* types travel as JSON text (see [`storable_as_json!`](crate::storable_as_json)).
//!
//! Dispatch happens on the declared type at compile time. A type with no
//! `Storable` implementation simply cannot be stored.
//!
//! The driver's `NULL` is handled once, in [`Presence::handle_scan_null`],
//! before any type specific conversion runs. On the way out Unset and Null
//! both become `NULL`; use [`Presence::storage_write`] when an update must
//! tell "leave the column alone" apart from "clear the column".

use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

pub use rusqlite::types::{Value, ValueRef};

use crate::error::{PresenceError, Result};
use crate::json::Finite;
use crate::policy::{Policies, ScanNull};
use crate::presence::Presence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Native,
    SelfDescribing,
    Opaque,
}

/// Conversion between a value and a single storage scalar.
///
/// `from_storage` never sees `ValueRef::Null`; the container deals with
/// that before dispatching here.
pub trait Storable: Sized {
    const CATEGORY: Category;
    fn to_storage(&self) -> Result<Value>;
    fn from_storage(value: ValueRef<'_>) -> Result<Self>;
}

impl<T: Storable> Presence<T> {
    /// The driver value for this container. Unset and Null are both `NULL`.
    pub fn to_storage_value(&self) -> Result<Value> {
        let Some(value) = self.get() else {
            return Ok(Value::Null);
        };
        value.to_storage().map_err(|e| {
            debug!(error = %e, category = ?T::CATEGORY, "storage value conversion failed");
            match T::CATEGORY {
                Category::SelfDescribing => {
                    e.context(format!("custom value conversion for {}", type_name::<T>()))
                }
                _ => e,
            }
        })
    }
    /// Like [`Presence::to_storage_value`], but `None` for Unset so callers
    /// building an update can leave the column out entirely.
    pub fn storage_write(&self) -> Result<Option<Value>> {
        if self.is_unset() {
            return Ok(None);
        }
        self.to_storage_value().map(Some)
    }

    /// Reads a driver value into the container, using the effective scan
    /// null policy. On error the container keeps its previous state.
    pub fn scan(&mut self, value: ValueRef<'_>) -> Result<()> {
        let policy = self.scan_null();
        self.scan_under(value, policy)
    }
    pub fn scan_with(&mut self, value: ValueRef<'_>, policies: &Policies) -> Result<()> {
        let policy = self.scan_null_with(policies);
        self.scan_under(value, policy)
    }
    /// Same as [`Presence::scan`] for an owned driver value.
    pub fn scan_value(&mut self, value: &Value) -> Result<()> {
        self.scan(ValueRef::from(value))
    }

    fn scan_under(&mut self, value: ValueRef<'_>, policy: ScanNull) -> Result<()> {
        if let ValueRef::Null = value {
            self.apply_scan_null(policy);
            return Ok(());
        }
        let scanned = T::from_storage(value).map_err(|e| {
            debug!(error = %e, category = ?T::CATEGORY, "scan failed");
            match T::CATEGORY {
                Category::SelfDescribing => {
                    e.context(format!("custom scan for {}", type_name::<T>()))
                }
                _ => e,
            }
        })?;
        self.set_value(scanned);
        Ok(())
    }
}

impl<T> Presence<T> {
    /// What a storage `NULL` turns into under the effective policy.
    pub fn handle_scan_null(&mut self) {
        let policy = self.scan_null();
        self.apply_scan_null(policy);
    }

    fn apply_scan_null(&mut self, policy: ScanNull) {
        trace!(?policy, "scanned storage NULL");
        match policy {
            ScanNull::AsUnset => self.unset(),
            ScanNull::AsNull => self.set_null(),
        }
    }
}

// ------------- Driver bridge -------------
impl<T: Storable> ToSql for Presence<T> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.to_storage_value()
            .map(ToSqlOutput::Owned)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
    }
}

// Built fresh, so only the process-wide scan policy applies here.
impl<T: Storable> FromSql for Presence<T> {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let mut presence = Presence::new_unset();
        presence.scan(value).map_err(|e| FromSqlError::Other(Box::new(e)))?;
        Ok(presence)
    }
}

// ------------- Helpers -------------
fn mismatch<T>(value: ValueRef<'_>) -> PresenceError {
    PresenceError::Decoding(format!("cannot scan {} into {}", value.data_type(), type_name::<T>()))
}

fn text<'a, T>(bytes: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|e| {
        PresenceError::Decoding(format!(
            "invalid UTF-8 while scanning {}: {e}",
            type_name::<T>()
        ))
    })
}

fn parse<T, P: FromStr>(bytes: &[u8]) -> Result<P>
where
    P::Err: fmt::Display,
{
    let s = text::<T>(bytes)?;
    s.trim().parse::<P>().map_err(|e| {
        PresenceError::Decoding(format!("cannot parse {s:?} as {}: {e}", type_name::<T>()))
    })
}

/// Serializes `value` to JSON text.
pub fn json_to_storage<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_string(&Finite(value))
        .map(Value::Text)
        .map_err(|e| PresenceError::Encoding(format!("{} to JSON: {e}", type_name::<T>())))
}

/// Decodes JSON carried as text, a blob or a bare number.
pub fn json_from_storage<T: DeserializeOwned>(value: ValueRef<'_>) -> Result<T> {
    let decoded = match value {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => serde_json::from_slice(bytes),
        ValueRef::Integer(i) => serde_json::from_value(serde_json::Value::from(i)),
        ValueRef::Real(f) => serde_json::from_value(serde_json::Value::from(f)),
        ValueRef::Null => return Err(mismatch::<T>(value)),
    };
    decoded.map_err(|e| PresenceError::Decoding(format!("{} from JSON: {e}", type_name::<T>())))
}

/// Converts through the type's own `ToSql`.
pub fn sql_to_storage<T: ToSql + ?Sized>(value: &T) -> Result<Value> {
    match value.to_sql() {
        Ok(ToSqlOutput::Borrowed(borrowed)) => Ok(Value::from(borrowed)),
        Ok(ToSqlOutput::Owned(owned)) => Ok(owned),
        Ok(_) => Err(PresenceError::unsupported::<T>("driver output is not a plain scalar")),
        Err(e) => Err(PresenceError::Encoding(e.to_string())),
    }
}

/// Converts through the type's own `FromSql`.
pub fn sql_from_storage<T: FromSql>(value: ValueRef<'_>) -> Result<T> {
    T::column_result(value).map_err(|e| match e {
        FromSqlError::OutOfRange(i) => PresenceError::Range {
            type_name: type_name::<T>(),
            value: i.to_string(),
        },
        FromSqlError::InvalidType => mismatch::<T>(value),
        other => PresenceError::Decoding(other.to_string()),
    })
}

/// Declares types as opaque: stored as JSON text through serde.
#[macro_export]
macro_rules! storable_as_json {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::storage::Storable for $ty {
            const CATEGORY: $crate::storage::Category = $crate::storage::Category::Opaque;
            fn to_storage(&self) -> $crate::Result<$crate::storage::Value> {
                $crate::storage::json_to_storage(self)
            }
            fn from_storage(value: $crate::storage::ValueRef<'_>) -> $crate::Result<Self> {
                $crate::storage::json_from_storage(value)
            }
        }
    )+};
}

/// Declares types as self-describing through their rusqlite `ToSql`/`FromSql`.
#[macro_export]
macro_rules! storable_as_sql {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::storage::Storable for $ty {
            const CATEGORY: $crate::storage::Category = $crate::storage::Category::SelfDescribing;
            fn to_storage(&self) -> $crate::Result<$crate::storage::Value> {
                $crate::storage::sql_to_storage(self)
            }
            fn from_storage(value: $crate::storage::ValueRef<'_>) -> $crate::Result<Self> {
                $crate::storage::sql_from_storage(value)
            }
        }
    )+};
}

// ------------- Native scalars -------------
macro_rules! native_integer {
    ($($ty:ty),+) => {$(
        impl Storable for $ty {
            const CATEGORY: Category = Category::Native;
            fn to_storage(&self) -> Result<Value> {
                Ok(Value::Integer(i64::from(*self)))
            }
            fn from_storage(value: ValueRef<'_>) -> Result<Self> {
                let wide = match value {
                    ValueRef::Integer(i) => i,
                    ValueRef::Text(bytes) => parse::<Self, i64>(bytes)?,
                    other => return Err(mismatch::<Self>(other)),
                };
                <$ty>::try_from(wide).map_err(|_| PresenceError::Range {
                    type_name: stringify!($ty),
                    value: wide.to_string(),
                })
            }
        }
    )+};
}

native_integer!(i8, i16, i32, i64, u8, u16, u32);

impl Storable for f64 {
    const CATEGORY: Category = Category::Native;
    fn to_storage(&self) -> Result<Value> {
        // SQLite binds NaN as NULL
        if self.is_nan() {
            return Err(PresenceError::Encoding("NaN has no storage representation".into()));
        }
        Ok(Value::Real(*self))
    }
    fn from_storage(value: ValueRef<'_>) -> Result<Self> {
        match value {
            ValueRef::Real(f) => Ok(f),
            ValueRef::Integer(i) => Ok(i as f64),
            ValueRef::Text(bytes) => parse::<Self, f64>(bytes),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl Storable for f32 {
    const CATEGORY: Category = Category::Native;
    fn to_storage(&self) -> Result<Value> {
        f64::from(*self).to_storage()
    }
    fn from_storage(value: ValueRef<'_>) -> Result<Self> {
        let wide = f64::from_storage(value)?;
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return Err(PresenceError::Range {
                type_name: "f32",
                value: wide.to_string(),
            });
        }
        Ok(wide as f32)
    }
}

impl Storable for bool {
    const CATEGORY: Category = Category::Native;
    fn to_storage(&self) -> Result<Value> {
        Ok(Value::Integer(i64::from(*self)))
    }
    fn from_storage(value: ValueRef<'_>) -> Result<Self> {
        match value {
            ValueRef::Integer(1) => Ok(true),
            ValueRef::Integer(0) => Ok(false),
            ValueRef::Text(bytes) => match text::<Self>(bytes)?.trim() {
                "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
                "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
                s => Err(PresenceError::Decoding(format!("cannot parse {s:?} as bool"))),
            },
            ValueRef::Integer(i) => {
                Err(PresenceError::Decoding(format!("{i} is not a valid bool")))
            }
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl Storable for String {
    const CATEGORY: Category = Category::Native;
    fn to_storage(&self) -> Result<Value> {
        Ok(Value::Text(self.clone()))
    }
    fn from_storage(value: ValueRef<'_>) -> Result<Self> {
        match value {
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => text::<Self>(bytes).map(str::to_owned),
            ValueRef::Integer(i) => Ok(i.to_string()),
            ValueRef::Real(f) => Ok(f.to_string()),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl Storable for Uuid {
    const CATEGORY: Category = Category::Native;
    fn to_storage(&self) -> Result<Value> {
        Ok(Value::Text(self.hyphenated().to_string()))
    }
    fn from_storage(value: ValueRef<'_>) -> Result<Self> {
        match value {
            ValueRef::Text(bytes) => {
                let s = text::<Self>(bytes)?;
                Uuid::parse_str(s.trim()).map_err(|e| {
                    PresenceError::Decoding(format!("UUID parsing failed for {s:?}: {e}"))
                })
            }
            ValueRef::Blob(bytes) => Uuid::from_slice(bytes).map_err(|e| {
                PresenceError::Decoding(format!("UUID from {} bytes: {e}", bytes.len()))
            }),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

// ------------- Timestamps -------------
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Ok(parsed.with_timezone(&Utc));
    }
    // SQLite's own datetime() output and friends carry no offset
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| PresenceError::Decoding(format!("cannot parse {s:?} as a timestamp")))
}

fn scan_datetime<T>(value: ValueRef<'_>) -> Result<DateTime<Utc>> {
    match value {
        ValueRef::Text(bytes) => parse_datetime(text::<T>(bytes)?),
        ValueRef::Integer(seconds) => {
            DateTime::from_timestamp(seconds, 0).ok_or_else(|| PresenceError::Range {
                type_name: type_name::<T>(),
                value: seconds.to_string(),
            })
        }
        other => Err(mismatch::<T>(other)),
    }
}

impl Storable for DateTime<Utc> {
    const CATEGORY: Category = Category::Native;
    fn to_storage(&self) -> Result<Value> {
        Ok(Value::Text(self.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
    }
    fn from_storage(value: ValueRef<'_>) -> Result<Self> {
        scan_datetime::<Self>(value)
    }
}

impl Storable for NaiveDateTime {
    const CATEGORY: Category = Category::Native;
    fn to_storage(&self) -> Result<Value> {
        Ok(Value::Text(self.format(DATETIME_FORMATS[0]).to_string()))
    }
    fn from_storage(value: ValueRef<'_>) -> Result<Self> {
        scan_datetime::<Self>(value).map(|moment| moment.naive_utc())
    }
}

impl Storable for NaiveDate {
    const CATEGORY: Category = Category::Native;
    fn to_storage(&self) -> Result<Value> {
        Ok(Value::Text(self.format("%Y-%m-%d").to_string()))
    }
    fn from_storage(value: ValueRef<'_>) -> Result<Self> {
        match value {
            ValueRef::Text(bytes) => {
                let s = text::<Self>(bytes)?.trim();
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .or_else(|_| parse_datetime(s).map(|moment| moment.date_naive()))
                    .map_err(|_| PresenceError::Decoding(format!("cannot parse {s:?} as a date")))
            }
            other => Err(mismatch::<Self>(other)),
        }
    }
}

// ------------- Opaque -------------
storable_as_json!(serde_json::Value);

impl<T: Serialize + DeserializeOwned> Storable for Vec<T> {
    const CATEGORY: Category = Category::Opaque;
    fn to_storage(&self) -> Result<Value> {
        json_to_storage(self)
    }
    fn from_storage(value: ValueRef<'_>) -> Result<Self> {
        json_from_storage(value)
    }
}

impl<V: Serialize + DeserializeOwned> Storable for HashMap<String, V> {
    const CATEGORY: Category = Category::Opaque;
    fn to_storage(&self) -> Result<Value> {
        json_to_storage(self)
    }
    fn from_storage(value: ValueRef<'_>) -> Result<Self> {
        json_from_storage(value)
    }
}

impl<V: Serialize + DeserializeOwned> Storable for BTreeMap<String, V> {
    const CATEGORY: Category = Category::Opaque;
    fn to_storage(&self) -> Result<Value> {
        json_to_storage(self)
    }
    fn from_storage(value: ValueRef<'_>) -> Result<Self> {
        json_from_storage(value)
    }
}

/// Stores any serde type as JSON text without declaring it up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}
impl<T: Serialize + DeserializeOwned> Storable for Json<T> {
    const CATEGORY: Category = Category::Opaque;
    fn to_storage(&self) -> Result<Value> {
        json_to_storage(&self.0)
    }
    fn from_storage(value: ValueRef<'_>) -> Result<Self> {
        json_from_storage(value).map(Json)
    }
}
impl<T> ops::Deref for Json<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<T> ops::DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
