//! Arbitrary-precision signed integers, matching the wire format's
//! "mathematically unbounded" integer domain.
use std::fmt;

use serde::{de, ser};

/// A signed integer of unbounded magnitude: a sign plus a minimal big-endian
/// magnitude byte string.
///
/// Unlike a fixed-width `i64`/`u64` pair, `Integer` stores exactly the bytes
/// the wire format itself carries, so encoding never needs a second
/// minimization pass and decoding never needs to pick a native width.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Integer {
    negative: bool,
    // Big-endian, no leading zero bytes. Empty means zero.
    magnitude: Vec<u8>,
}

impl Integer {
    /// The integer zero.
    pub fn zero() -> Self {
        Integer {
            negative: false,
            magnitude: Vec::new(),
        }
    }

    /// Build an `Integer` directly from its sign and minimal big-endian
    /// magnitude. `magnitude` must not have a leading zero byte, and `negative`
    /// must be `false` when `magnitude` is empty; both are enforced here
    /// rather than trusted from the caller.
    pub fn from_parts(negative: bool, mut magnitude: Vec<u8>) -> Self {
        while magnitude.first() == Some(&0) {
            magnitude.remove(0);
        }
        let negative = negative && !magnitude.is_empty();
        Integer {
            negative,
            magnitude,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Minimal big-endian magnitude bytes (no sign, no leading zero byte).
    pub fn magnitude_bytes(&self) -> &[u8] {
        &self.magnitude
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_empty()
    }

    /// Returns the value as an `i64` if it fits, else `None`.
    pub fn to_i64(&self) -> Option<i64> {
        if self.magnitude.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf[8 - self.magnitude.len()..].copy_from_slice(&self.magnitude);
        let mag = u64::from_be_bytes(buf);
        if self.negative {
            if mag > (i64::MAX as u64) + 1 {
                None
            } else {
                Some((mag as i128 * -1) as i64)
            }
        } else if mag > i64::MAX as u64 {
            None
        } else {
            Some(mag as i64)
        }
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Integer {
                fn from(v: $t) -> Self {
                    let negative = v < 0;
                    let mag = (v as i128).unsigned_abs();
                    Integer::from_parts(negative, trim_be(&mag.to_be_bytes()))
                }
            }
        )*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Integer {
                fn from(v: $t) -> Self {
                    Integer::from_parts(false, trim_be(&(v as u128).to_be_bytes()))
                }
            }
        )*
    };
}

from_signed!(i8, i16, i32, i64, i128);
from_unsigned!(u8, u16, u32, u64, u128);

fn trim_be(bytes: &[u8]) -> Vec<u8> {
    let first_nonzero = bytes.iter().position(|&b| b != 0);
    match first_nonzero {
        Some(i) => bytes[i..].to_vec(),
        None => Vec::new(),
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        if self.magnitude.is_empty() {
            return write!(f, "0");
        }
        // Render via repeated division by 10 on the big-endian byte string.
        let mut digits = Vec::new();
        let mut work = self.magnitude.clone();
        while work.iter().any(|&b| b != 0) {
            let mut rem: u32 = 0;
            for byte in work.iter_mut() {
                let cur = (rem << 8) | *byte as u32;
                *byte = (cur / 10) as u8;
                rem = cur % 10;
            }
            digits.push(b'0' + rem as u8);
            while work.first() == Some(&0) && work.len() > 1 {
                work.remove(0);
            }
        }
        digits.reverse();
        f.write_str(std::str::from_utf8(&digits).unwrap())
    }
}

impl ser::Serialize for Integer {
    fn serialize<S: ser::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if let Some(v) = self.to_i64() {
            s.serialize_i64(v)
        } else {
            s.serialize_str(&self.to_string())
        }
    }
}

impl<'de> de::Deserialize<'de> for Integer {
    fn deserialize<D: de::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct Visitor;
        impl<'de> de::Visitor<'de> for Visitor {
            type Value = Integer;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer")
            }
            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Integer, E> {
                Ok(Integer::from(v))
            }
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Integer, E> {
                Ok(Integer::from(v))
            }
        }
        d.deserialize_i64(Visitor)
    }
}
