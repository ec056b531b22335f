//! Walks a [`Value`] tree and emits the packed binary encoding.
use std::collections::HashSet;

use crate::depth_tracking::DepthTracker;
use crate::error::{Error, Result};
use crate::tag::{encode_tag, MajorType, Token};
use crate::value::{CustomCodec, Object, ToValue, Value};

const MAX_INTERNED_KEYS: usize = 128;

/// How `Object` pairs should be ordered on the wire.
pub enum SortKeys {
    /// Keep the `Object`'s own insertion order.
    Unsorted,
    /// Sort pairs by key using byte-wise ordering.
    Natural,
    /// Sort pairs using a caller-supplied key function over `(key, value)`.
    By(Box<dyn Fn(&str, &Value) -> String>),
}

impl Default for SortKeys {
    fn default() -> Self {
        SortKeys::Unsorted
    }
}

/// Encoder configuration. Construct with [`EncodeOptions::default`] and
/// chain setters.
#[derive(Default)]
pub struct EncodeOptions {
    skip_illegal_keys: bool,
    check_circular: bool,
    sort_keys: SortKeys,
    custom: Vec<CustomCodec>,
}

impl EncodeOptions {
    pub fn new() -> Self {
        EncodeOptions {
            check_circular: true,
            ..Default::default()
        }
    }

    pub fn skip_illegal_keys(mut self, v: bool) -> Self {
        self.skip_illegal_keys = v;
        self
    }

    pub fn check_circular(mut self, v: bool) -> Self {
        self.check_circular = v;
        self
    }

    pub fn sort_keys(mut self, v: SortKeys) -> Self {
        self.sort_keys = v;
        self
    }

    pub fn custom(mut self, codec: CustomCodec) -> Self {
        self.custom.push(codec);
        self
    }
}

/// Per-document key intern table, order-preserving and capped at 128
/// entries (§4.2 Object encoding with key interning).
#[derive(Default)]
struct InternTable {
    keys: Vec<String>,
}

impl InternTable {
    fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    fn try_intern(&mut self, key: &str) {
        if self.keys.len() < MAX_INTERNED_KEYS {
            self.keys.push(key.to_string());
        }
    }
}

struct Encoder<'a> {
    buf: Vec<u8>,
    opts: &'a EncodeOptions,
    interned: InternTable,
    on_stack: HashSet<usize>,
    depth: DepthTracker,
}

/// Encode `value` to a single byte buffer.
pub fn encode<T: ToValue>(value: &T, opts: &EncodeOptions) -> Result<Vec<u8>> {
    let value = value.to_value();
    let mut enc = Encoder {
        buf: Vec::new(),
        opts,
        interned: InternTable::default(),
        on_stack: HashSet::new(),
        depth: DepthTracker::new(),
    };
    enc.encode_value(&value)?;
    Ok(enc.buf)
}

/// Encode a sequence whose length isn't known up front, using the
/// length-terminated array form (`0x0C` ... `0x0F`).
pub fn encode_array_stream<T, I>(items: I, opts: &EncodeOptions) -> Result<Vec<u8>>
where
    T: ToValue,
    I: IntoIterator<Item = T>,
{
    let mut enc = Encoder {
        buf: Vec::new(),
        opts,
        interned: InternTable::default(),
        on_stack: HashSet::new(),
        depth: DepthTracker::new(),
    };
    enc.buf.push(Token::TerminatedArrayStart.into_u8());
    enc.depth.enter(u32::MAX)?;
    for item in items {
        enc.encode_value(&item.to_value())?;
    }
    enc.depth.early_end();
    enc.buf.push(Token::Terminator.into_u8());
    Ok(enc.buf)
}

/// Encode `value` as a sequence of chunks suitable for streaming to a sink;
/// concatenating the chunks equals [`encode`]'s output.
pub fn iter_encode<T: ToValue>(
    value: &T,
    opts: &EncodeOptions,
) -> Result<impl Iterator<Item = Result<Vec<u8>>>> {
    encode(value, opts).map(|bytes| std::iter::once(Ok(bytes)))
}

impl<'a> Encoder<'a> {
    fn encode_value(&mut self, value: &Value) -> Result<()> {
        for codec in &self.opts.custom {
            if (codec.matches)(value) {
                self.buf.push(Token::Custom.into_u8());
                let converted = (codec.convert)(value);
                return self.encode_value(&converted);
            }
        }

        match value {
            Value::Null => self.buf.push(Token::Null.into_u8()),
            Value::Bool(false) => self.buf.push(Token::False.into_u8()),
            Value::Bool(true) => self.buf.push(Token::True.into_u8()),
            Value::Int(n) => {
                let major = if n.is_negative() {
                    MajorType::NegInt
                } else {
                    MajorType::PosInt
                };
                encode_tag(&mut self.buf, major, n.magnitude_bytes().len());
                self.buf.extend_from_slice(n.magnitude_bytes());
            }
            Value::Float(n) => match n {
                crate::number::Number::PosInfinity => self.buf.push(Token::PosInfinity.into_u8()),
                crate::number::Number::NegInfinity => self.buf.push(Token::NegInfinity.into_u8()),
                crate::number::Number::Nan => self.buf.push(Token::Nan.into_u8()),
                _ => {
                    let payload = n.encode_payload();
                    encode_tag(&mut self.buf, MajorType::Float, payload.len());
                    self.buf.extend_from_slice(&payload);
                }
            },
            Value::Text(s) => {
                encode_tag(&mut self.buf, MajorType::Text, s.len());
                self.buf.extend_from_slice(s.as_bytes());
            }
            Value::Bytes(b) => {
                encode_tag(&mut self.buf, MajorType::Bytes, b.len());
                self.buf.extend_from_slice(b);
            }
            Value::Array(items) => {
                self.encode_array(items)?;
                return Ok(());
            }
            Value::Object(obj) => {
                self.encode_object(obj)?;
                return Ok(());
            }
        }
        self.depth.advance();
        Ok(())
    }

    fn guard_cycle<F: FnOnce(&mut Self) -> Result<()>>(
        &mut self,
        identity: usize,
        body: F,
    ) -> Result<()> {
        if self.opts.check_circular {
            if !self.on_stack.insert(identity) {
                return Err(Error::CircularReference);
            }
        }
        let result = body(self);
        if self.opts.check_circular {
            self.on_stack.remove(&identity);
        }
        result
    }

    fn encode_array(&mut self, items: &[Value]) -> Result<()> {
        let identity = items.as_ptr() as usize;
        self.guard_cycle(identity, |this| {
            encode_tag(&mut this.buf, MajorType::Array, items.len());
            this.depth.enter(items.len() as u32)?;
            for item in items {
                this.encode_value(item)?;
            }
            Ok(())
        })
    }

    fn encode_object(&mut self, obj: &Object) -> Result<()> {
        let identity = obj as *const Object as usize;
        self.guard_cycle(identity, |this| {
            let mut pairs: Vec<(&str, &Value)> = obj.iter().collect();
            if this.opts.skip_illegal_keys {
                pairs.retain(|(k, _)| k.len() <= 127);
            } else if let Some((bad, _)) = pairs.iter().find(|(k, _)| k.len() > 127) {
                return Err(Error::IllegalKey {
                    key: bad.to_string(),
                });
            }
            match &this.opts.sort_keys {
                SortKeys::Unsorted => {}
                SortKeys::Natural => pairs.sort_by(|a, b| a.0.cmp(b.0)),
                SortKeys::By(key_fn) => {
                    pairs.sort_by_key(|(k, v)| key_fn(k, v));
                }
            }

            encode_tag(&mut this.buf, MajorType::Object, pairs.len());
            this.depth.enter(2 * pairs.len() as u32)?;
            for (key, value) in pairs {
                this.encode_key(key)?;
                this.depth.advance();
                this.encode_value(value)?;
            }
            Ok(())
        })
    }

    fn encode_key(&mut self, key: &str) -> Result<()> {
        if let Some(index) = self.interned.index_of(key) {
            self.buf.push(0x80 | index as u8);
        } else {
            self.buf.push(key.len() as u8);
            self.buf.extend_from_slice(key.as_bytes());
            self.interned.try_intern(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integer::Integer;
    use crate::number::Number;

    fn opts() -> EncodeOptions {
        EncodeOptions::new()
    }

    #[test]
    fn singletons() {
        assert_eq!(encode(&Value::Bool(false), &opts()).unwrap(), vec![0x00]);
        assert_eq!(encode(&Value::Bool(true), &opts()).unwrap(), vec![0x01]);
        assert_eq!(encode(&Value::Null, &opts()).unwrap(), vec![0x02]);
        assert_eq!(
            encode(&Value::Float(Number::PosInfinity), &opts()).unwrap(),
            vec![0x03]
        );
        assert_eq!(
            encode(&Value::Float(Number::NegInfinity), &opts()).unwrap(),
            vec![0x04]
        );
        assert_eq!(
            encode(&Value::Float(Number::Nan), &opts()).unwrap(),
            vec![0x05]
        );
    }

    #[test]
    fn strings_and_bytes() {
        assert_eq!(
            encode(&Value::Text("test".into()), &opts()).unwrap(),
            vec![0x84, 0x74, 0x65, 0x73, 0x74]
        );
        assert_eq!(
            encode(&Value::Bytes(b"test".to_vec()), &opts()).unwrap(),
            vec![0xa4, 0x74, 0x65, 0x73, 0x74]
        );
    }

    #[test]
    fn integers() {
        assert_eq!(
            encode(&Value::Int(Integer::from(4i64)), &opts()).unwrap(),
            vec![0x21, 0x04]
        );
        assert_eq!(
            encode(&Value::Int(Integer::from(-4i64)), &opts()).unwrap(),
            vec![0x41, 0x04]
        );
        assert_eq!(
            encode(&Value::Int(Integer::from(0x400i64)), &opts()).unwrap(),
            vec![0x22, 0x04, 0x00]
        );
    }

    #[test]
    fn array_of_strings() {
        let arr = Value::Array(vec![
            Value::Text("jelly".into()),
            Value::Text("jam".into()),
            Value::Text("butter".into()),
        ]);
        let expected = vec![
            0xc3, 0x85, b'j', b'e', b'l', b'l', b'y', 0x83, b'j', b'a', b'm', 0x86, b'b', b'u',
            b't', b't', b'e', b'r',
        ];
        assert_eq!(encode(&arr, &opts()).unwrap(), expected);
    }

    #[test]
    fn terminated_array_form() {
        let items = vec![
            Value::Int(Integer::from(0i64)),
            Value::Int(Integer::from(1i64)),
            Value::Int(Integer::from(2i64)),
        ];
        let out = encode_array_stream(items, &opts()).unwrap();
        assert_eq!(
            out,
            vec![0x0c, 0x21, 0x00, 0x21, 0x01, 0x21, 0x02, 0x0f]
        );
    }

    #[test]
    fn key_interning_back_reference() {
        let mut outer = Object::new();
        let mut a = Object::new();
        a.insert("code", Value::Text("us".into()));
        let mut b = Object::new();
        b.insert("code", Value::Text("ca".into()));
        outer.insert(
            "list",
            Value::Array(vec![Value::Object(a), Value::Object(b)]),
        );
        let out = encode(&Value::Object(outer), &opts()).unwrap();
        // "list" interns as key index 0, "code" as key index 1; the second
        // object's "code" key must appear as the one-byte back-reference
        // 0x81 rather than re-encoding the 4-byte key text.
        assert!(out.contains(&0x81));
    }

    #[test]
    fn cycle_detection_on_pointer_identity() {
        let items: Vec<Value> = Vec::new();
        let ptr = items.as_ptr() as usize;
        let mut enc = Encoder {
            buf: Vec::new(),
            opts: &EncodeOptions::new(),
            interned: InternTable::default(),
            on_stack: HashSet::new(),
            depth: DepthTracker::new(),
        };
        enc.on_stack.insert(ptr);
        let result = enc.guard_cycle(ptr, |_| Ok(()));
        assert!(matches!(result, Err(Error::CircularReference)));
    }
}
