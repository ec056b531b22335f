//! The value tree the codec encodes from and decodes to.
use serde::{de, ser};

use crate::integer::Integer;
use crate::number::Number;

/// An ordered sequence of (key, value) pairs, preserving insertion order.
///
/// Unlike a `BTreeMap`, `Object` never silently reorders its entries: the
/// wire format's key-interning table is built in the order keys are first
/// seen, so losing that order would desynchronize encode and decode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Object(Vec<(String, Value)>);

impl Object {
    pub fn new() -> Self {
        Object(Vec::new())
    }

    pub fn with_capacity(cap: usize) -> Self {
        Object(Vec::with_capacity(cap))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Insert `key`/`value`. If `key` is already present, its value is
    /// overwritten in place (its original position is kept), matching how a
    /// plain dictionary behaves when a key is assigned twice.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut obj = Object::new();
        for (k, v) in iter {
            obj.insert(k, v);
        }
        obj
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// The PBJSON value domain: everything the codec can encode and decode.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(Integer),
    Float(Number),
    Text(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(Object),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<&Integer> {
        match self {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<&Number> {
        match self {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(Integer::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(Number::from_f64(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// Implemented by Rust types that project themselves into an encodable
/// [`Value`] instead of going through `serde`.
///
/// This folds two capabilities the original dynamically-typed dispatch order
/// keeps separate — a `for_json`-style projection hook, and a named-tuple's
/// "present yourself as an ordered mapping" hook — into one seam. Once a
/// type resolves to a `Value`, the Array/Object distinction is already made
/// by the enum variant the implementation chose to return, so there is
/// nothing left to probe for at encode time.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ser::Serialize for Value {
    fn serialize<S: ser::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => s.serialize_none(),
            Value::Bool(v) => s.serialize_bool(*v),
            Value::Int(v) => v.serialize(s),
            Value::Float(v) => v.serialize(s),
            Value::Text(v) => s.serialize_str(v),
            Value::Bytes(v) => serde_bytes::Bytes::new(v).serialize(s),
            Value::Array(v) => v.serialize(s),
            Value::Object(v) => {
                use ser::SerializeMap;
                let mut map = s.serialize_map(Some(v.len()))?;
                for (k, val) in v.iter() {
                    map.serialize_entry(k, val)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> de::Deserialize<'de> for Value {
    fn deserialize<D: de::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct Visitor;
        impl<'de> de::Visitor<'de> for Visitor {
            type Value = Value;
            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("any pbjson value")
            }
            fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
                Ok(Value::Bool(v))
            }
            fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
                Ok(Value::Int(Integer::from(v)))
            }
            fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
                Ok(Value::Int(Integer::from(v)))
            }
            fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
                Ok(Value::Float(Number::from_f64(v)))
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
                Ok(Value::Text(v.to_string()))
            }
            fn visit_string<E>(self, v: String) -> Result<Value, E> {
                Ok(Value::Text(v))
            }
            fn visit_bytes<E>(self, v: &[u8]) -> Result<Value, E> {
                Ok(Value::Bytes(v.to_vec()))
            }
            fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Value, E> {
                Ok(Value::Bytes(v))
            }
            fn visit_none<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }
            fn visit_unit<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }
            fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
                let mut out = Vec::new();
                while let Some(v) = seq.next_element()? {
                    out.push(v);
                }
                Ok(Value::Array(out))
            }
            fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
                let mut out = Object::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((k, v)) = map.next_entry::<String, Value>()? {
                    out.insert(k, v);
                }
                Ok(Value::Object(out))
            }
        }
        d.deserialize_any(Visitor)
    }
}

/// A runtime-registered encode/decode pair for the opaque custom-type wire
/// channel (lead byte `0x0E`). `matches`/`convert` operate on already
/// resolved [`Value`]s, since by the time the core encoder sees a value it
/// has already gone through [`ToValue`].
///
/// `convert`'s output is itself run back through the full encode dispatch
/// (including every registered `matches` predicate), so it must not match
/// its own predicate again, or encoding recurses forever.
pub struct CustomCodec {
    pub matches: Box<dyn Fn(&Value) -> bool>,
    pub convert: Box<dyn Fn(&Value) -> Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_preserves_insertion_order() {
        let mut obj = Object::new();
        obj.insert("z", Value::Int(1i64.into()));
        obj.insert("a", Value::Int(2i64.into()));
        let keys: Vec<_> = obj.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn repeated_key_overwrites_in_place() {
        let mut obj = Object::new();
        obj.insert("a", Value::Int(1i64.into()));
        obj.insert("b", Value::Int(2i64.into()));
        obj.insert("a", Value::Int(3i64.into()));
        let keys: Vec<_> = obj.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(obj.get("a"), Some(&Value::Int(3i64.into())));
    }
}
