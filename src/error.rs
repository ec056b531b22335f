//! Library error types.
use std::fmt;

use serde::{de, ser};

/// A pbjson Result, normally returning a pbjson [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A pbjson error. Encompasses any issues that can happen during encoding or
/// decoding.
#[derive(Clone, Debug)]
pub enum Error {
    /// A value couldn't be turned into an encodable [`Value`](crate::value::Value) and no
    /// custom codec matched it either.
    UnsupportedType(String),
    /// A container referenced itself while encoding.
    CircularReference,
    /// An object key was longer than 127 bytes once encoded as UTF-8, and
    /// `skip_illegal_keys` was not set.
    IllegalKey {
        /// The offending key.
        key: String,
    },
    /// The byte stream didn't parse as valid pbjson.
    Malformed {
        /// Byte offset into the stream where the failure was detected.
        offset: usize,
        /// What went wrong.
        reason: &'static str,
    },
    /// A declared length (string, bytes, array, object, or intern index) ran
    /// past the end of the available data.
    Overflow {
        /// How many bytes remained.
        max: usize,
        /// How many bytes the declared length asked for.
        actual: usize,
    },
    /// Encoding or decoding nested containers beyond the configured depth
    /// limit.
    DepthExceeded,
    /// Occurs when serde serialization or deserialization fails.
    SerdeFail(String),
    /// I/O failure while reading from a `decode_from_reader` source.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnsupportedType(ref ty) => write!(f, "unsupported type: {}", ty),
            Error::CircularReference => write!(f, "circular reference detected while encoding"),
            Error::IllegalKey { ref key } => {
                write!(f, "object key too long to encode: {:?}", key)
            }
            Error::Malformed { offset, reason } => {
                write!(f, "malformed data at offset {}: {}", offset, reason)
            }
            Error::Overflow { max, actual } => write!(
                f,
                "declared length {} exceeds {} remaining bytes",
                actual, max
            ),
            Error::DepthExceeded => write!(f, "hit nesting depth limit"),
            Error::SerdeFail(ref msg) => f.write_str(msg),
            Error::Io(ref msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl std::convert::From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl std::convert::From<std::str::Utf8Error> for Error {
    fn from(e: std::str::Utf8Error) -> Self {
        Error::Malformed {
            offset: e.valid_up_to(),
            reason: "invalid UTF-8",
        }
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}
