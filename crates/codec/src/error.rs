use core::fmt;
use core::ops::Range;

use crate::{Codec, Value};

/// Value does not satisfy the shape of a codec
pub struct AssertError {
    /// Codec, which rejected the value
    pub codec: Codec,
    /// The rejected value
    pub value: Value,
    /// Location of the rejected value within the root value, e.g. `.next.val` or `[3]`
    pub path: String,
    pub message: String,
}

/// Encode-time contract violation
pub struct EncodeError {
    pub codec: Codec,
    pub value: Value,
    pub message: String,
}

/// Decode-time contract violation
pub struct DecodeError {
    pub codec: Codec,
    /// Cursor position at which decoding failed
    pub position: usize,
    /// Total length of the input
    pub len: usize,
    pub message: String,
    eof: bool,
}

/// Illegal combinator arguments, reported when the codec is constructed
pub struct ConstructError {
    pub message: String,
}

/// Error type returned by all codec operations
pub enum Error {
    Assert(Box<AssertError>),
    Encode(Box<EncodeError>),
    Decode(Box<DecodeError>),
    Construct(ConstructError),
    /// A user-supplied callback or an async leaf failed
    Custom(anyhow::Error),
}

impl Error {
    pub(crate) fn assert(codec: &Codec, value: &Value, message: impl Into<String>) -> Self {
        Self::Assert(Box::new(AssertError {
            codec: codec.clone(),
            value: value.clone(),
            path: String::default(),
            message: message.into(),
        }))
    }

    pub(crate) fn encode(codec: &Codec, value: &Value, message: impl Into<String>) -> Self {
        Self::Encode(Box::new(EncodeError {
            codec: codec.clone(),
            value: value.clone(),
            message: message.into(),
        }))
    }

    pub(crate) fn decode(
        codec: &Codec,
        position: usize,
        len: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Decode(Box::new(DecodeError {
            codec: codec.clone(),
            position,
            len,
            message: message.into(),
            eof: false,
        }))
    }

    pub(crate) fn out_of_bounds(codec: &Codec, requested: Range<usize>, len: usize) -> Self {
        Self::Decode(Box::new(DecodeError {
            codec: codec.clone(),
            position: requested.start,
            len,
            message: format!(
                "attempted to read bytes {}..{} beyond the end of input",
                requested.start, requested.end
            ),
            eof: true,
        }))
    }

    pub(crate) fn construct(message: impl Into<String>) -> Self {
        Self::Construct(ConstructError {
            message: message.into(),
        })
    }

    /// Prefixes the path of an [AssertError] with object field `key`
    #[must_use]
    pub fn in_field(self, key: &str) -> Self {
        self.prefix_path(|path| format!(".{key}{path}"))
    }

    /// Prefixes the path of an [AssertError] with array index `i`
    #[must_use]
    pub fn in_index(self, i: usize) -> Self {
        self.prefix_path(|path| format!("[{i}]{path}"))
    }

    fn prefix_path(self, f: impl FnOnce(&str) -> String) -> Self {
        match self {
            Self::Assert(mut err) => {
                err.path = f(&err.path);
                Self::Assert(err)
            }
            err => err,
        }
    }

    #[must_use]
    pub fn is_assert(&self) -> bool {
        matches!(self, Self::Assert(..))
    }

    #[must_use]
    pub fn is_encode(&self) -> bool {
        matches!(self, Self::Encode(..))
    }

    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(..))
    }

    #[must_use]
    pub fn is_construct(&self) -> bool {
        matches!(self, Self::Construct(..))
    }
}

impl DecodeError {
    /// Returns `true` if decoding failed only because the input ended early
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.eof
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Custom(err)
    }
}

impl fmt::Display for AssertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid value{}: {} (got {:?}, codec {})",
            self.path, self.message, self.value, self.codec
        )
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to encode {:?}: {} (codec {})", self.value, self.message, self.codec)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to decode at byte {} of {}: {} (codec {})",
            self.position, self.len, self.message, self.codec
        )
    }
}

impl fmt::Display for ConstructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Assert(error) => fmt::Display::fmt(error, f),
            Error::Encode(error) => fmt::Display::fmt(error, f),
            Error::Decode(error) => fmt::Display::fmt(error, f),
            Error::Construct(error) => fmt::Display::fmt(error, f),
            Error::Custom(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Assert(error) => write!(f, "AssertError: {error}"),
            Error::Encode(error) => write!(f, "EncodeError: {error}"),
            Error::Decode(error) => write!(f, "DecodeError: {error}"),
            Error::Construct(error) => write!(f, "ConstructError: {error}"),
            Error::Custom(error) => fmt::Debug::fmt(error, f),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Error::Custom(error) => Some(&**error),
            _ => None,
        }
    }
}
