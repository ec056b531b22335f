//! Floating-point values and the nibble-packed decimal wire encoding for
//! them (§4.1/§4.2 Float encoding).
use std::fmt;

use serde::{de, ser};

use crate::error::{Error, Result};
use crate::tag::{char_to_nibble, nibble_to_char};

/// A floating-point value: either a native `f64`, or an arbitrary-precision
/// decimal digit string for producers that need more precision than `f64`
/// carries.
#[derive(Clone, Debug, PartialEq)]
pub enum Number {
    Finite(f64),
    PosInfinity,
    NegInfinity,
    Nan,
    /// A pre-rendered decimal digit string, e.g. `"152.79823"` or `"-0.5"`,
    /// for producers that have more precision than `f64` can hold.
    Decimal(String),
}

impl Number {
    pub fn from_f64(v: f64) -> Self {
        if v.is_nan() {
            Number::Nan
        } else if v == f64::INFINITY {
            Number::PosInfinity
        } else if v == f64::NEG_INFINITY {
            Number::NegInfinity
        } else {
            Number::Finite(v)
        }
    }

    pub fn decimal(digits: impl Into<String>) -> Self {
        Number::Decimal(digits.into())
    }

    /// Best-effort conversion to `f64`. Loses precision for a [`Number::Decimal`]
    /// beyond what `f64` can represent.
    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Finite(v) => *v,
            Number::PosInfinity => f64::INFINITY,
            Number::NegInfinity => f64::NEG_INFINITY,
            Number::Nan => f64::NAN,
            Number::Decimal(s) => s.parse().unwrap_or(f64::NAN),
        }
    }

    /// The canonical decimal text this value would render to, absent any
    /// special-cased token (infinities/NaN are handled separately by the
    /// caller).
    fn canonical_text(&self) -> String {
        match self {
            Number::Finite(v) => format!("{}", v),
            Number::Decimal(s) => s.clone(),
            _ => unreachable!("special values never reach canonical_text"),
        }
    }

    /// Encode the nibble payload for a finite/decimal value (not including
    /// the tag/length prefix, which the caller adds once the byte count is
    /// known).
    pub(crate) fn encode_payload(&self) -> Vec<u8> {
        let text = self.canonical_text();
        let mut chars = text.chars().peekable();
        let negative = chars.peek() == Some(&'-');
        if negative {
            chars.next();
        }
        let mut rest: String = chars.collect();
        if let Some(stripped) = rest.strip_prefix("0.") {
            rest = format!(".{}", stripped);
        }
        if let Some(stripped) = rest.strip_suffix(".0") {
            rest = stripped.to_string();
        }
        // A bare "0" carries no information beyond the sign already captured
        // above, so it collapses to an empty digit run either way; for a
        // negative value the pending minus nibble still needs to flush (see
        // the padding step below), so this can't be a direct early return.
        if rest == "0" {
            rest = String::new();
        }
        let mut nibbles: Vec<u8> = Vec::with_capacity(rest.len() + 1);
        if negative {
            nibbles.push(0xb);
        }
        for c in rest.chars() {
            nibbles.push(char_to_nibble(c).expect("canonical float text is nibble-encodable"));
        }
        if nibbles.len() % 2 != 0 {
            nibbles.push(0xd);
        }
        let mut bytes = Vec::with_capacity(nibbles.len() / 2);
        for pair in nibbles.chunks(2) {
            bytes.push((pair[0] << 4) | pair[1]);
        }
        bytes
    }

    /// Decode a nibble payload back into a `Number`. Empty payload is zero.
    pub(crate) fn decode_payload(bytes: &[u8], offset: usize) -> Result<Number> {
        if bytes.is_empty() {
            return Ok(Number::Finite(0.0));
        }
        let mut s = String::with_capacity(bytes.len() * 2);
        for &b in bytes {
            s.push(nibble_to_char(b >> 4).ok_or(Error::Malformed {
                offset,
                reason: "invalid float nibble",
            })?);
            s.push(nibble_to_char(b & 0x0f).ok_or(Error::Malformed {
                offset,
                reason: "invalid float nibble",
            })?);
        }
        if s.ends_with('.') {
            s.pop();
        }
        // Reinstate a leading "0" before a bare decimal point, and a leading
        // zero magnitude if the producer elided it (e.g. ".5" -> "0.5").
        let (sign, digits) = if let Some(rest) = s.strip_prefix('-') {
            ("-", rest)
        } else {
            ("", s.as_str())
        };
        let digits = if digits.is_empty() {
            // A bare sign with no digits (e.g. the negative-zero payload
            // 0xbd -> "-.") means the magnitude is zero.
            "0".to_string()
        } else if digits.starts_with('.') {
            format!("0{}", digits)
        } else {
            digits.to_string()
        };
        let text = format!("{}{}", sign, digits);
        text.parse::<f64>()
            .map(Number::Finite)
            .map_err(|_| Error::Malformed {
                offset,
                reason: "float payload did not parse as a decimal number",
            })
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Number::Finite(v) => write!(f, "{}", v),
            Number::PosInfinity => write!(f, "inf"),
            Number::NegInfinity => write!(f, "-inf"),
            Number::Nan => write!(f, "NaN"),
            Number::Decimal(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::from_f64(v)
    }
}

impl ser::Serialize for Number {
    fn serialize<S: ser::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(self.to_f64())
    }
}

impl<'de> de::Deserialize<'de> for Number {
    fn deserialize<D: de::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        f64::deserialize(d).map(Number::from_f64)
    }
}
