//! Recursive-descent parser rebuilding a [`Value`] tree from the packed
//! binary encoding.
use crate::depth_tracking::DepthTracker;
use crate::error::{Error, Result};
use crate::integer::Integer;
use crate::number::Number;
use crate::tag::{decode_lead, extend_len, finish_len, LeadByte, MajorType, Token};
use crate::value::{Object, Value};

const MAX_INTERNED_KEYS: usize = 128;

/// How invalid UTF-8 inside a decoded Text value should be handled.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub enum UnicodeErrors {
    #[default]
    Strict,
    Replace,
    Ignore,
}

/// Decoder configuration. Construct with [`DecodeOptions::default`] and
/// chain setters.
#[derive(Default)]
pub struct DecodeOptions {
    custom: Option<Box<dyn Fn(Value) -> Value>>,
    unicode_errors: UnicodeErrors,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn custom(mut self, f: impl Fn(Value) -> Value + 'static) -> Self {
        self.custom = Some(Box::new(f));
        self
    }

    pub fn unicode_errors(mut self, policy: UnicodeErrors) -> Self {
        self.unicode_errors = policy;
        self
    }
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    opts: &'a DecodeOptions,
    interned: Vec<String>,
    depth: DepthTracker,
}

/// Decode a single value from `data`. The entire slice must be one document;
/// trailing bytes after the value are ignored.
pub fn decode(data: &[u8], opts: &DecodeOptions) -> Result<Value> {
    let mut dec = Decoder {
        data,
        pos: 0,
        opts,
        interned: Vec::new(),
        depth: DepthTracker::new(),
    };
    dec.parse_value()
}

/// Read all of `reader` into memory, then decode it as a single document.
pub fn decode_from_reader<R: std::io::Read>(
    mut reader: R,
    opts: &DecodeOptions,
) -> Result<Value> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    decode(&buf, opts)
}

impl<'a> Decoder<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let remaining = self.data.len() - self.pos;
        if len > remaining {
            return Err(Error::Overflow {
                max: remaining,
                actual: len,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn next_byte(&mut self) -> Result<u8> {
        let b = *self.data.get(self.pos).ok_or(Error::Malformed {
            offset: self.pos,
            reason: "unexpected end of input",
        })?;
        self.pos += 1;
        Ok(b)
    }

    fn parse_value(&mut self) -> Result<Value> {
        let offset = self.pos;
        let lead = self.next_byte()?;
        match decode_lead(lead, offset)? {
            LeadByte::Token(Token::TerminatedArrayStart) => self.parse_terminated_array(),
            LeadByte::Token(Token::Custom) => {
                // The inner value's own recursive `parse_value` call already
                // performs the one decrement this slot is owed; the 0x0E
                // wrapper byte itself isn't a separate slot.
                let inner = self.parse_value()?;
                Ok(match &self.opts.custom {
                    Some(f) => f(inner),
                    None => inner,
                })
            }
            LeadByte::Token(token) => {
                let value = self.parse_token(token, offset)?;
                self.depth.advance();
                Ok(value)
            }
            LeadByte::Tagged {
                major: major @ (MajorType::Array | MajorType::Object),
                len_hint,
            } => {
                let ext_len = extend_len(&len_hint);
                let ext = self.take(ext_len)?;
                let len = finish_len(len_hint, ext);
                // Array/Object push their own depth level via `enter`, which
                // already performs the decrement for the slot they occupy;
                // no further `advance` is needed here.
                self.parse_tagged(major, len, offset)
            }
            LeadByte::Tagged { major, len_hint } => {
                let ext_len = extend_len(&len_hint);
                let ext = self.take(ext_len)?;
                let len = finish_len(len_hint, ext);
                let value = self.parse_tagged(major, len, offset)?;
                self.depth.advance();
                Ok(value)
            }
        }
    }

    /// Handles the remaining immediate tokens. `Custom` and
    /// `TerminatedArrayStart` are intercepted earlier in `parse_value` since
    /// they need special depth-tracking treatment.
    fn parse_token(&mut self, token: Token, offset: usize) -> Result<Value> {
        Ok(match token {
            Token::False => Value::Bool(false),
            Token::True => Value::Bool(true),
            Token::Null => Value::Null,
            Token::PosInfinity => Value::Float(Number::PosInfinity),
            Token::NegInfinity => Value::Float(Number::NegInfinity),
            Token::Nan => Value::Float(Number::Nan),
            Token::Custom | Token::TerminatedArrayStart => {
                unreachable!("intercepted in parse_value")
            }
            Token::Terminator => {
                return Err(Error::Malformed {
                    offset,
                    reason: "unexpected array terminator",
                })
            }
        })
    }

    fn parse_tagged(&mut self, major: MajorType, len: usize, offset: usize) -> Result<Value> {
        Ok(match major {
            MajorType::PosInt => Value::Int(self.parse_integer(len, false)?),
            MajorType::NegInt => Value::Int(self.parse_integer(len, true)?),
            MajorType::Float => {
                let bytes = self.take(len)?;
                Value::Float(Number::decode_payload(bytes, offset)?)
            }
            MajorType::Text => {
                let bytes = self.take(len)?;
                Value::Text(self.decode_text(bytes, offset)?)
            }
            MajorType::Bytes => Value::Bytes(self.take(len)?.to_vec()),
            MajorType::Array => self.parse_array(len)?,
            MajorType::Object => self.parse_object(len)?,
        })
    }

    fn parse_integer(&mut self, len: usize, negative: bool) -> Result<Integer> {
        let bytes = self.take(len)?;
        Ok(Integer::from_parts(negative, bytes.to_vec()))
    }

    fn decode_text(&mut self, bytes: &[u8], offset: usize) -> Result<String> {
        match self.opts.unicode_errors {
            UnicodeErrors::Strict => Ok(std::str::from_utf8(bytes)
                .map_err(|e| Error::Malformed {
                    offset: offset + e.valid_up_to(),
                    reason: "invalid UTF-8",
                })?
                .to_string()),
            UnicodeErrors::Replace => Ok(String::from_utf8_lossy(bytes).into_owned()),
            UnicodeErrors::Ignore => {
                let mut out = String::with_capacity(bytes.len());
                let mut rest = bytes;
                loop {
                    match std::str::from_utf8(rest) {
                        Ok(valid) => {
                            out.push_str(valid);
                            break;
                        }
                        Err(e) => {
                            let valid_up_to = e.valid_up_to();
                            out.push_str(std::str::from_utf8(&rest[..valid_up_to]).unwrap());
                            let invalid_len = e.error_len().unwrap_or(rest.len() - valid_up_to);
                            rest = &rest[valid_up_to + invalid_len..];
                            if rest.is_empty() {
                                break;
                            }
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    fn parse_array(&mut self, len: usize) -> Result<Value> {
        self.depth.enter(len as u32)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.parse_value()?);
        }
        Ok(Value::Array(items))
    }

    fn parse_terminated_array(&mut self) -> Result<Value> {
        self.depth.enter(u32::MAX)?;
        let mut items = Vec::new();
        loop {
            let offset = self.pos;
            let lead = self.next_byte()?;
            if let LeadByte::Token(Token::Terminator) = decode_lead(lead, offset)? {
                break;
            }
            self.pos = offset;
            items.push(self.parse_value()?);
        }
        self.depth.early_end();
        Ok(Value::Array(items))
    }

    fn parse_object(&mut self, len: usize) -> Result<Value> {
        self.depth.enter(2 * len as u32)?;
        let mut obj = Object::with_capacity(len);
        for _ in 0..len {
            let key = self.parse_key()?;
            self.depth.advance();
            let value = self.parse_value()?;
            obj.insert(key, value);
        }
        Ok(Value::Object(obj))
    }

    fn parse_key(&mut self) -> Result<String> {
        let offset = self.pos;
        let prefix = self.next_byte()?;
        if prefix & 0x80 != 0 {
            let index = (prefix & 0x7f) as usize;
            return self
                .interned
                .get(index)
                .cloned()
                .ok_or(Error::Malformed {
                    offset,
                    reason: "key back-reference out of range",
                });
        }
        let bytes = self.take(prefix as usize)?;
        let key = self.decode_text(bytes, offset)?;
        if self.interned.len() < MAX_INTERNED_KEYS {
            self.interned.push(key.clone());
        }
        Ok(key)
    }
}
