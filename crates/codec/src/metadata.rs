//! Provenance descriptors attached to every codec and cycle-safe codec printing

use core::fmt;

use std::borrow::Cow;
use std::collections::HashMap;

use bytes::Bytes;

use crate::deferred::LazyCodec;
use crate::{Codec, Value};

/// Identity of a codec combinator
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct FactoryId(&'static str);

impl FactoryId {
    pub const INT: Self = Self("int");
    pub const COMPACT: Self = Self("compact");
    pub const OPTION: Self = Self("option");
    pub const RESULT: Self = Self("result");
    pub const OBJECT: Self = Self("object");
    pub const FIELD: Self = Self("field");
    pub const OPTIONAL_FIELD: Self = Self("optionalField");
    pub const SPREAD: Self = Self("spread");
    pub const INSTANCE: Self = Self("instance");
    pub const TUPLE: Self = Self("tuple");
    pub const ARRAY: Self = Self("array");
    pub const ITERABLE: Self = Self("iterable");
    pub const SIZED_ARRAY: Self = Self("sizedArray");
    pub const SIZED_UINT8_ARRAY: Self = Self("sizedUint8Array");
    pub const TAGGED_UNION: Self = Self("taggedUnion");
    pub const VARIANT: Self = Self("variant");
    pub const LITERAL_UNION: Self = Self("literalUnion");
    pub const KEY_LITERAL_UNION: Self = Self("keyLiteralUnion");
    pub const CONSTANT_PATTERN: Self = Self("constantPattern");
    pub const DEFERRED: Self = Self("deferred");
    pub const PROMISE: Self = Self("promise");
    pub const TRANSFORM: Self = Self("transform");
    pub const DUMMY: Self = Self("dummy");

    /// Constructs an identity for a combinator defined outside of this crate
    #[must_use]
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Single entry of a codec's metadata
#[derive(Clone, Debug, PartialEq)]
pub enum Metadata {
    /// Leaf codec
    Atomic { name: Cow<'static, str> },
    /// Codec built by a combinator from `args`
    Factory {
        name: Cow<'static, str>,
        factory: FactoryId,
        args: Vec<Arg>,
    },
    /// Documentation only
    Docs { text: Cow<'static, str> },
}

impl Metadata {
    pub fn atomic(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Atomic { name: name.into() }
    }

    pub fn factory(
        name: impl Into<Cow<'static, str>>,
        factory: FactoryId,
        args: impl IntoIterator<Item = Arg>,
    ) -> Self {
        Self::Factory {
            name: name.into(),
            factory,
            args: args.into_iter().collect(),
        }
    }

    pub fn docs(text: impl Into<Cow<'static, str>>) -> Self {
        Self::Docs { text: text.into() }
    }

    /// Returns the arguments of this entry, if it was produced by `factory`
    #[must_use]
    pub fn factory_args(&self, factory: FactoryId) -> Option<&[Arg]> {
        match self {
            Self::Factory {
                factory: id, args, ..
            } if *id == factory => Some(args),
            _ => None,
        }
    }
}

/// Argument recorded in a [Metadata::Factory] entry
///
/// Codecs compare by identity, everything else structurally.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Codec(Codec),
    Value(Value),
    Str(Cow<'static, str>),
    Bytes(Bytes),
    Usize(usize),
    Bool(bool),
    List(Vec<Arg>),
    /// Nested construction, e.g. an object field or a union variant
    Call(Box<Metadata>),
    /// Lazily-resolved codec reference
    Lazy(LazyCodec),
    /// Argument with no useful printable form, e.g. a closure
    Opaque(&'static str),
}

impl From<Codec> for Arg {
    fn from(codec: Codec) -> Self {
        Self::Codec(codec)
    }
}

impl From<&Codec> for Arg {
    fn from(codec: &Codec) -> Self {
        Self::Codec(codec.clone())
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<&'static str> for Arg {
    fn from(v: &'static str) -> Self {
        Self::Str(v.into())
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Self::Str(v.into())
    }
}

impl From<usize> for Arg {
    fn from(v: usize) -> Self {
        Self::Usize(v)
    }
}

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Metadata> for Arg {
    fn from(v: Metadata) -> Self {
        Self::Call(Box::new(v))
    }
}

/// Printing context owned by a single top-level print
///
/// Codecs currently being printed are tracked by identity; a codec reached again while it is
/// still being printed is rendered as a `$N` back-reference and its outermost rendering is
/// labeled `$N = ...`.
#[derive(Debug, Default)]
pub struct Inspector {
    in_progress: HashMap<usize, Option<usize>>,
    next_id: usize,
}

impl Inspector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders `codec`
    pub fn codec(&mut self, codec: &Codec) -> String {
        let key = codec.id();
        if let Some(id) = self.in_progress.get_mut(&key) {
            let id = *id.get_or_insert_with(|| {
                let id = self.next_id;
                self.next_id += 1;
                id
            });
            return format!("${id}");
        }
        self.in_progress.insert(key, None);
        let content = codec
            .metadata()
            .iter()
            .find_map(|entry| match entry {
                Metadata::Docs { .. } => None,
                Metadata::Atomic { name } => Some(name.to_string()),
                Metadata::Factory { name, args, .. } => Some(self.call(name, args)),
            })
            .unwrap_or_else(|| "?".into());
        match self.in_progress.remove(&key).flatten() {
            Some(id) => format!("${id} = {content}"),
            None => content,
        }
    }

    /// Renders a single metadata argument
    pub fn arg(&mut self, arg: &Arg) -> String {
        match arg {
            Arg::Codec(codec) => self.codec(codec),
            Arg::Value(v) => format!("{v:?}"),
            Arg::Str(s) => format!("{s:?}"),
            Arg::Bytes(b) => format!("{:?}", Value::Bytes(b.clone())),
            Arg::Usize(n) => n.to_string(),
            Arg::Bool(b) => b.to_string(),
            Arg::List(args) => format!("[{}]", self.args(args)),
            Arg::Call(entry) => match &**entry {
                Metadata::Factory { name, args, .. } => self.call(name, args),
                Metadata::Atomic { name } => name.to_string(),
                Metadata::Docs { text } => format!("{text:?}"),
            },
            Arg::Lazy(lazy) => self.codec(lazy.get()),
            Arg::Opaque(s) => (*s).to_string(),
        }
    }

    fn args(&mut self, args: &[Arg]) -> String {
        let args: Vec<_> = args.iter().map(|arg| self.arg(arg)).collect();
        args.join(", ")
    }

    fn call(&mut self, name: &str, args: &[Arg]) -> String {
        format!("{name}({})", self.args(args))
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Inspector::new().codec(self))
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Codec({self})")
    }
}
