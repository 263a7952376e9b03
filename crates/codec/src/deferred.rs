use core::fmt;

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::{
    create_codec, Arg, Codec, DecodeBuffer, EncodeBuffer, Error, FactoryId, Metadata, RawCodec,
    Value,
};

struct Lazy {
    target: OnceLock<Codec>,
    thunk: Box<dyn Fn() -> Codec + Send + Sync>,
}

/// Memoized reference to a codec, resolved on first access
#[derive(Clone)]
pub struct LazyCodec(Arc<Lazy>);

impl LazyCodec {
    pub fn new(thunk: impl Fn() -> Codec + Send + Sync + 'static) -> Self {
        Self(Arc::new(Lazy {
            target: OnceLock::new(),
            thunk: Box::new(thunk),
        }))
    }

    /// Returns the target codec, invoking the thunk if this is the first access
    pub fn get(&self) -> &Codec {
        self.0.target.get_or_init(|| (self.0.thunk)())
    }

    /// Returns `true` if the target has already been resolved
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.0.target.get().is_some()
    }
}

impl PartialEq for LazyCodec {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for LazyCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_resolved() {
            f.write_str("LazyCodec { <resolved> }")
        } else {
            f.write_str("LazyCodec { <unresolved> }")
        }
    }
}

struct Deferred(LazyCodec);

impl RawCodec for Deferred {
    fn static_size(&self) -> usize {
        0
    }

    fn encode(&self, _: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        self.0.get().encode_into(dst, value)
    }

    fn decode(&self, _: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        self.0.get().decode_from(src)
    }

    fn assert(&self, _: &Codec, value: &Value) -> Result<(), Error> {
        self.0.get().assert(value)
    }

    fn decode_fields(
        &self,
        _: &Codec,
        src: &mut DecodeBuffer<'_>,
        fields: &mut BTreeMap<String, Value>,
    ) -> Result<(), Error> {
        self.0.get().decode_fields_into(src, fields)
    }
}

/// Returns a codec, which delegates to the codec returned by `thunk`
///
/// `thunk` is invoked at most once, on first encode, decode, assert or print. This is the way to
/// construct self-referential codecs:
///
/// ```
/// use std::sync::LazyLock;
///
/// use subscale_codec::{deferred, field, object, option, u8, Codec};
///
/// static LIST: LazyLock<Codec> = LazyLock::new(|| {
///     option(&object([
///         field("val", u8()),
///         field("next", deferred(|| LIST.clone())),
///     ]))
///     .expect("object is not an option")
/// });
/// assert_eq!(
///     LIST.to_string(),
///     r#"$0 = $.option($.object($.field("val", $.u8), $.field("next", $.deferred($0))))"#,
/// );
/// ```
///
/// Once resolved, the deferred codec holds a strong reference to its target. A codec, which
/// refers to itself through `deferred` is therefore a reference cycle and is never freed.
/// Recursive codecs should be constructed once, e.g. in a `static`, rather than per use.
pub fn deferred(thunk: impl Fn() -> Codec + Send + Sync + 'static) -> Codec {
    let lazy = LazyCodec::new(thunk);
    create_codec(
        [Metadata::factory(
            "$.deferred",
            FactoryId::DEFERRED,
            [Arg::Lazy(lazy.clone())],
        )],
        Deferred(lazy),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::u8;

    #[test]
    fn thunk_is_invoked_once_and_lazily() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let codec = deferred(|| {
            CALLS.fetch_add(1, Ordering::Relaxed);
            u8()
        });
        assert_eq!(CALLS.load(Ordering::Relaxed), 0);
        assert_eq!(codec.static_size(), 0);

        assert_eq!(codec.encode(&Value::from(3u8)).expect("encode").as_ref(), [3]);
        assert_eq!(codec.decode(&[4]).expect("decode"), Value::from(4u8));
        codec.assert(&Value::from(5u8)).expect("assert");
        assert_eq!(codec.to_string(), "$.deferred($.u8)");
        assert_eq!(CALLS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn errors_are_attributed_to_the_target() {
        let codec = deferred(u8);
        let Err(Error::Assert(err)) = codec.assert(&Value::from("x")) else {
            panic!("assertion should fail")
        };
        assert!(err.codec.ptr_eq(&u8()));
    }
}
