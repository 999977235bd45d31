//! JSON side of the codec layer.
//!
//! A container in Value state serializes exactly like the value it holds.
//! Unset and Null both serialize to `null`; whether an unset field shows up
//! at all is decided by the surrounding record through
//! [`Presence::is_zero_for_omission`]:
//!
//! ```
//! use presence::Presence;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Patch {
//!     #[serde(default, skip_serializing_if = "Presence::is_zero_for_omission")]
//!     name: Presence<String>,
//!     #[serde(default, skip_serializing_if = "Presence::is_zero_for_omission")]
//!     age: Presence<i16>,
//! }
//!
//! let patch: Patch = serde_json::from_str(r#"{"age": null}"#).unwrap();
//! assert!(patch.name.is_unset());
//! assert!(patch.age.is_null());
//! assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"age":null}"#);
//! ```
//!
//! The `default` attribute matters: serde hands a missing field to the
//! deserializer as `none`, which would otherwise come out as Null.

use std::result::Result as StdResult;

use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use serde::ser::{self, Serialize, Serializer};
use tracing::debug;

use crate::error::{PresenceError, Result};
use crate::policy::{MarshalUnset, Policies};
use crate::presence::Presence;

impl<T: Serialize> Serialize for Presence<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> StdResult<S::Ok, S::Error> {
        match self.get() {
            Some(value) => Finite(value).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Presence<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> StdResult<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Presence::from_optional)
    }
}

impl<T> Presence<T> {
    /// True exactly when the container is unset and the effective policy is
    /// [`MarshalUnset::Skip`]. Meant for `skip_serializing_if`.
    pub fn is_zero_for_omission(&self) -> bool {
        self.is_unset() && self.marshal_unset() == MarshalUnset::Skip
    }
    pub fn is_zero_for_omission_with(&self, policies: &Policies) -> bool {
        self.is_unset() && self.marshal_unset_with(policies) == MarshalUnset::Skip
    }
}

impl<T: Serialize> Presence<T> {
    /// Encodes the container on its own. Unset degrades to `null` here.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            debug!(error = %e, "marshal failed");
            PresenceError::Encoding(format!("presence marshal: {e}"))
        })
    }
    pub fn marshal_to_string(&self) -> Result<String> {
        let bytes = self.marshal()?;
        String::from_utf8(bytes).map_err(|e| PresenceError::Encoding(e.to_string()))
    }
}

impl<T: DeserializeOwned> Presence<T> {
    /// Decodes `bytes` into the container.
    ///
    /// `null` and an empty payload become Null. Anything else, whitespace
    /// alone included, has to decode as a `T`; on failure the container is
    /// left untouched.
    pub fn unmarshal(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() || bytes.trim_ascii() == b"null" {
            self.set_null();
            return Ok(());
        }
        match serde_json::from_slice::<T>(bytes) {
            Ok(value) => {
                self.set_value(value);
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, target_type = std::any::type_name::<T>(), "unmarshal failed");
                Err(PresenceError::Decoding(format!("presence unmarshal: {e}")))
            }
        }
    }
    pub fn unmarshal_str(&mut self, text: &str) -> Result<()> {
        self.unmarshal(text.as_bytes())
    }
}

// ------------- Finite float guard -------------
// serde_json writes non-finite floats as `null`, which would silently turn a
// value into a null on the way back in. Everything serialized through a
// container passes this wrapper, which refuses NaN and the infinities at any
// depth.
pub(crate) struct Finite<'a, T: ?Sized>(pub(crate) &'a T);

impl<T: Serialize + ?Sized> Serialize for Finite<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> StdResult<S::Ok, S::Error> {
        self.0.serialize(FiniteSerializer(serializer))
    }
}

struct FiniteSerializer<S>(S);

struct Compound<C>(C);

fn non_finite<E: ser::Error>(value: f64) -> E {
    E::custom(format!("{value} is not a finite number and cannot be encoded"))
}

impl<S: Serializer> Serializer for FiniteSerializer<S> {
    type Ok = S::Ok;
    type Error = S::Error;
    type SerializeSeq = Compound<S::SerializeSeq>;
    type SerializeTuple = Compound<S::SerializeTuple>;
    type SerializeTupleStruct = Compound<S::SerializeTupleStruct>;
    type SerializeTupleVariant = Compound<S::SerializeTupleVariant>;
    type SerializeMap = Compound<S::SerializeMap>;
    type SerializeStruct = Compound<S::SerializeStruct>;
    type SerializeStructVariant = Compound<S::SerializeStructVariant>;

    fn serialize_f32(self, v: f32) -> StdResult<S::Ok, S::Error> {
        if !v.is_finite() {
            return Err(non_finite(f64::from(v)));
        }
        self.0.serialize_f32(v)
    }
    fn serialize_f64(self, v: f64) -> StdResult<S::Ok, S::Error> {
        if !v.is_finite() {
            return Err(non_finite(v));
        }
        self.0.serialize_f64(v)
    }

    fn serialize_bool(self, v: bool) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_bool(v)
    }
    fn serialize_i8(self, v: i8) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_i8(v)
    }
    fn serialize_i16(self, v: i16) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_i16(v)
    }
    fn serialize_i32(self, v: i32) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_i32(v)
    }
    fn serialize_i64(self, v: i64) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_i64(v)
    }
    fn serialize_i128(self, v: i128) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_i128(v)
    }
    fn serialize_u8(self, v: u8) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_u8(v)
    }
    fn serialize_u16(self, v: u16) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_u16(v)
    }
    fn serialize_u32(self, v: u32) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_u32(v)
    }
    fn serialize_u64(self, v: u64) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_u64(v)
    }
    fn serialize_u128(self, v: u128) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_u128(v)
    }
    fn serialize_char(self, v: char) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_char(v)
    }
    fn serialize_str(self, v: &str) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_str(v)
    }
    fn serialize_bytes(self, v: &[u8]) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_bytes(v)
    }
    fn serialize_none(self) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_none()
    }
    fn serialize_unit(self) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_unit()
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_some(&Finite(value))
    }
    fn serialize_unit_struct(self, name: &'static str) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_unit_struct(name)
    }
    fn serialize_unit_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
    ) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_unit_variant(name, variant_index, variant)
    }
    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_newtype_struct(name, &Finite(value))
    }
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> StdResult<S::Ok, S::Error> {
        self.0.serialize_newtype_variant(name, variant_index, variant, &Finite(value))
    }
    fn serialize_seq(self, len: Option<usize>) -> StdResult<Self::SerializeSeq, S::Error> {
        self.0.serialize_seq(len).map(Compound)
    }
    fn serialize_tuple(self, len: usize) -> StdResult<Self::SerializeTuple, S::Error> {
        self.0.serialize_tuple(len).map(Compound)
    }
    fn serialize_tuple_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> StdResult<Self::SerializeTupleStruct, S::Error> {
        self.0.serialize_tuple_struct(name, len).map(Compound)
    }
    fn serialize_tuple_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> StdResult<Self::SerializeTupleVariant, S::Error> {
        self.0.serialize_tuple_variant(name, variant_index, variant, len).map(Compound)
    }
    fn serialize_map(self, len: Option<usize>) -> StdResult<Self::SerializeMap, S::Error> {
        self.0.serialize_map(len).map(Compound)
    }
    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> StdResult<Self::SerializeStruct, S::Error> {
        self.0.serialize_struct(name, len).map(Compound)
    }
    fn serialize_struct_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> StdResult<Self::SerializeStructVariant, S::Error> {
        self.0.serialize_struct_variant(name, variant_index, variant, len).map(Compound)
    }
    fn is_human_readable(&self) -> bool {
        self.0.is_human_readable()
    }
}

impl<C: ser::SerializeSeq> ser::SerializeSeq for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;
    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> StdResult<(), C::Error> {
        self.0.serialize_element(&Finite(value))
    }
    fn end(self) -> StdResult<C::Ok, C::Error> {
        self.0.end()
    }
}

impl<C: ser::SerializeTuple> ser::SerializeTuple for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;
    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> StdResult<(), C::Error> {
        self.0.serialize_element(&Finite(value))
    }
    fn end(self) -> StdResult<C::Ok, C::Error> {
        self.0.end()
    }
}

impl<C: ser::SerializeTupleStruct> ser::SerializeTupleStruct for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> StdResult<(), C::Error> {
        self.0.serialize_field(&Finite(value))
    }
    fn end(self) -> StdResult<C::Ok, C::Error> {
        self.0.end()
    }
}

impl<C: ser::SerializeTupleVariant> ser::SerializeTupleVariant for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> StdResult<(), C::Error> {
        self.0.serialize_field(&Finite(value))
    }
    fn end(self) -> StdResult<C::Ok, C::Error> {
        self.0.end()
    }
}

impl<C: ser::SerializeMap> ser::SerializeMap for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;
    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> StdResult<(), C::Error> {
        self.0.serialize_key(&Finite(key))
    }
    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> StdResult<(), C::Error> {
        self.0.serialize_value(&Finite(value))
    }
    fn end(self) -> StdResult<C::Ok, C::Error> {
        self.0.end()
    }
}

impl<C: ser::SerializeStruct> ser::SerializeStruct for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;
    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> StdResult<(), C::Error> {
        self.0.serialize_field(key, &Finite(value))
    }
    fn skip_field(&mut self, key: &'static str) -> StdResult<(), C::Error> {
        self.0.skip_field(key)
    }
    fn end(self) -> StdResult<C::Ok, C::Error> {
        self.0.end()
    }
}

impl<C: ser::SerializeStructVariant> ser::SerializeStructVariant for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;
    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> StdResult<(), C::Error> {
        self.0.serialize_field(key, &Finite(value))
    }
    fn skip_field(&mut self, key: &'static str) -> StdResult<(), C::Error> {
        self.0.skip_field(key)
    }
    fn end(self) -> StdResult<C::Ok, C::Error> {
        self.0.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_rejects_nested_non_finite() {
        let err = serde_json::to_string(&Finite(&vec![1.0, f64::NAN])).unwrap_err();
        assert!(err.to_string().contains("not a finite number"));
        let ok = serde_json::to_string(&Finite(&vec![1.5f32, 2.0])).expect("finite floats");
        assert_eq!(ok, "[1.5,2.0]");
    }
}
