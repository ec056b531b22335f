//! Packed binary encoding for the JSON data model.
//!
//! The wire format is a tagged, variable-width binary encoding of the usual
//! JSON value set (null, bool, number, string, array, object) plus a
//! separate byte-string type, arbitrary-precision integers, and an
//! in-document key-interning table that lets repeated object keys collapse
//! to a single back-reference byte. See [`encoder`]/[`decoder`] for the
//! format itself.
#![allow(dead_code)]

mod decoder;
mod depth_tracking;
mod encoder;
pub mod error;
mod integer;
mod number;
mod tag;
mod value;

/// Maximum nesting depth the encoder and decoder will follow before failing
/// with [`error::Error::DepthExceeded`].
const MAX_DEPTH: usize = 512;

pub use decoder::{decode, decode_from_reader, DecodeOptions, UnicodeErrors};
pub use encoder::{encode, encode_array_stream, iter_encode, EncodeOptions, SortKeys};
pub use error::{Error, Result};
pub use integer::Integer;
pub use number::Number;
pub use value::{CustomCodec, Object, ToValue, Value};

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: Vec<(&str, Value)>) -> Value {
        let mut o = Object::new();
        for (k, v) in pairs {
            o.insert(k, v);
        }
        Value::Object(o)
    }

    #[test]
    fn round_trips_nested_document() {
        let doc = obj(vec![
            ("name", Value::Text("the best".into())),
            ("burned", Value::Bool(false)),
            ("toast", Value::Bool(true)),
            (
                "toppings",
                Value::Array(vec![
                    Value::Text("jelly".into()),
                    Value::Text("jam".into()),
                    Value::Text("butter".into()),
                ]),
            ),
            (
                "dimensions",
                obj(vec![
                    ("width", Value::Float(Number::from_f64(4.5))),
                    ("thickness", Value::Float(Number::from_f64(0.7))),
                ]),
            ),
        ]);

        let bytes = encode(&doc, &EncodeOptions::new()).unwrap();
        let decoded = decode(&bytes, &DecodeOptions::new()).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn terminated_and_length_prefixed_arrays_decode_equal() {
        let items = vec![
            Value::Int(Integer::from(0i64)),
            Value::Int(Integer::from(1i64)),
            Value::Int(Integer::from(2i64)),
        ];
        let prefixed = encode(&Value::Array(items.clone()), &EncodeOptions::new()).unwrap();
        let terminated = encode_array_stream(items.clone(), &EncodeOptions::new()).unwrap();
        assert_eq!(
            decode(&prefixed, &DecodeOptions::new()).unwrap(),
            decode(&terminated, &DecodeOptions::new()).unwrap()
        );
    }

    #[test]
    fn sort_keys_natural_orders_object_pairs() {
        let doc = obj(vec![
            ("zeak", Value::Text("oh".into())),
            ("a", Value::Int(Integer::from(1i64))),
            ("crate", Value::Text("dog".into())),
        ]);
        let bytes = encode(
            &doc,
            &EncodeOptions::new().sort_keys(SortKeys::Natural),
        )
        .unwrap();
        // "a" sorts first; its key is a single inline byte 0x01 'a'.
        assert_eq!(bytes[1], 0x01);
        assert_eq!(bytes[2], b'a');
    }

    #[test]
    fn deeply_nested_array_round_trips() {
        let mut doc = Value::Array(vec![Value::Text("Not too deep".into())]);
        for _ in 0..18 {
            doc = Value::Array(vec![doc]);
        }
        let bytes = encode(&doc, &EncodeOptions::new()).unwrap();
        let decoded = decode(&bytes, &DecodeOptions::new()).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn custom_codec_round_trips_through_value_tree() {
        // Stand-in for a non-Value Rust type (e.g. a date) that wants to ride
        // the opaque 0x0E channel: the predicate matches the pre-conversion
        // shape (Text starting with "2000"), and `convert` moves it to Bytes
        // so the predicate won't re-match during the recursive encode of the
        // converted payload, same as the original format's datetime example
        // (`0x0e` prefix + a tagged payload).
        let payload = Value::Text("2000-03-17 11:21:45".into());
        let opts = EncodeOptions::new().custom(CustomCodec {
            matches: Box::new(|v| matches!(v, Value::Text(s) if s.starts_with("2000"))),
            convert: Box::new(|v| match v {
                Value::Text(s) => Value::Bytes(s.clone().into_bytes()),
                other => other.clone(),
            }),
        });
        let bytes = encode(&payload, &opts).unwrap();
        assert_eq!(bytes[0], 0x0e);

        let decode_opts = DecodeOptions::new().custom(|v| match v {
            Value::Bytes(b) => Value::Text(String::from_utf8(b).unwrap()),
            other => other,
        });
        let decoded = decode(&bytes, &decode_opts).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn float_special_values_round_trip() {
        for v in [f64::INFINITY, f64::NEG_INFINITY] {
            let bytes = encode(&Value::Float(Number::from_f64(v)), &EncodeOptions::new()).unwrap();
            let decoded = decode(&bytes, &DecodeOptions::new()).unwrap();
            assert_eq!(decoded.as_float().unwrap().to_f64(), v);
        }
        let bytes = encode(&Value::Float(Number::Nan), &EncodeOptions::new()).unwrap();
        let decoded = decode(&bytes, &DecodeOptions::new()).unwrap();
        assert!(decoded.as_float().unwrap().to_f64().is_nan());
    }
}
