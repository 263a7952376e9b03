use core::fmt::{self, Debug, Write as _};
use core::future::Future;

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt as _;
use num_bigint::BigInt;

/// Outcome of a settled [Promise]
pub type Settled = Result<Value, Arc<anyhow::Error>>;

/// Dynamically-typed value, which codecs encode, decode and validate
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value, the default `none` sentinel of `option`
    #[default]
    Undefined,
    Null,
    Bool(bool),
    /// Integer of any width, including the 128- and 256-bit ones
    Int(BigInt),
    Str(String),
    Bytes(Bytes),
    /// Arrays and tuples
    Array(Vec<Value>),
    /// Records, keyed by field name
    Object(BTreeMap<String, Value>),
    /// Error-kind value, the `err` branch of `result`
    Error(Box<Value>),
    /// Asynchronously produced value
    Promise(Promise),
}

impl Value {
    /// Constructs a [Value::Object] from `(key, value)` pairs
    pub fn object<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Constructs a [Value::Array]
    pub fn array<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }

    /// Wraps `payload` as an error-kind value
    pub fn error(payload: impl Into<Value>) -> Self {
        Self::Error(Box::new(payload.into()))
    }

    /// Wraps a future as an async leaf
    pub fn promise<F>(fut: F) -> Self
    where
        F: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self::Promise(Promise::new(fut))
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(..))
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&BigInt> {
        if let Self::Int(v) = self {
            Some(v)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        if let Self::Str(v) = self {
            Some(v)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        if let Self::Object(v) = self {
            Some(v)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        if let Self::Array(v) = self {
            Some(v)
        } else {
            None
        }
    }

    /// Looks up field `key` of an object, [Value::Undefined] is returned for missing fields
    /// and non-object values
    #[must_use]
    pub fn get(&self, key: &str) -> &Value {
        static UNDEFINED: Value = Value::Undefined;
        self.as_object()
            .and_then(|fields| fields.get(key))
            .unwrap_or(&UNDEFINED)
    }

    /// Short name of the value kind, used in error messages
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(..) => "bool",
            Self::Int(..) => "int",
            Self::Str(..) => "string",
            Self::Bytes(..) => "bytes",
            Self::Array(..) => "array",
            Self::Object(..) => "object",
            Self::Error(..) => "error",
            Self::Promise(..) => "promise",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => a == b,
            (Self::Promise(a), Self::Promise(b)) => a == b,
            _ => false,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => {
                f.write_str("0x")?;
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::Array(items) => f.debug_list().entries(items).finish(),
            Self::Object(fields) => {
                f.write_char('{')?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, " {k}: {v:?}")?;
                }
                if !fields.is_empty() {
                    f.write_char(' ')?;
                }
                f.write_char('}')
            }
            Self::Error(payload) => write!(f, "Error({payload:?})"),
            Self::Promise(p) => p.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),+) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::Int(v.into())
                }
            }
        )+
    };
}

impl_from_int!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, usize, isize);

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Self::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

impl From<Promise> for Value {
    fn from(v: Promise) -> Self {
        Self::Promise(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Undefined, Into::into)
    }
}

/// Shared handle to an asynchronously produced [Value]
///
/// Clones observe the same outcome, the underlying future is polled at most once to completion.
#[derive(Clone)]
pub struct Promise(Shared<BoxFuture<'static, Settled>>);

impl Promise {
    /// Constructs a new promise, which settles once `fut` completes
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self(fut.map(|res| res.map_err(Arc::new)).boxed().shared())
    }

    /// Constructs an already-settled promise
    #[must_use]
    pub fn resolved(v: Value) -> Self {
        let fut = futures::future::ready(Ok(v)).boxed().shared();
        // poll once, so that the outcome is observable via `peek`
        let _ = fut.clone().now_or_never();
        Self(fut)
    }

    /// Returns the outcome, if the promise has already settled
    #[must_use]
    pub fn peek(&self) -> Option<&Settled> {
        self.0.peek()
    }

    /// Waits for the promise to settle
    pub async fn settle(&self) -> Settled {
        self.0.clone().await
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.0.ptr_eq(&other.0)
    }
}

impl PartialEq for Promise {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.peek(), other.peek()) {
            (Some(Ok(a)), Some(Ok(b))) => a == b,
            _ => false,
        }
    }
}

impl Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            None => f.write_str("Promise { <pending> }"),
            Some(Ok(v)) => write!(f, "Promise {{ {v:?} }}"),
            Some(Err(err)) => write!(f, "Promise {{ <rejected> {err} }}"),
        }
    }
}
