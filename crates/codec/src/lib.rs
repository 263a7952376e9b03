//! Composable SCALE codecs
//!
//! A [Codec] encodes, decodes and validates dynamically-typed [Value]s. Codecs are built once,
//! by composing primitive codecs ([u32], [str], [compact], ...) with structural ([object],
//! [tuple], [array], ...) and sum-type ([option], [result], [tagged_union], ...) combinators, and
//! may then be shared freely across threads and tasks.
//!
//! ```
//! use subscale_codec::{field, object, option, str, u8, Value};
//!
//! let person = object([field("name", str()), field("age", option(&u8())?)]);
//! let value = Value::object([("name", Value::from("ab")), ("age", Value::from(3u8))]);
//! let buf = person.encode(&value)?;
//! assert_eq!(buf.as_ref(), [0x08, 0x61, 0x62, 0x01, 0x03]);
//! assert_eq!(person.decode(&buf)?, value);
//! # Ok::<(), subscale_codec::Error>(())
//! ```

mod buffer;
mod codec;
mod compact;
mod constant;
mod deferred;
mod error;
#[cfg(feature = "framed")]
mod framed;
mod int;
mod metadata;
mod object;
mod option;
mod promise;
mod result;
mod sequence;
mod string;
mod transform;
mod union;
mod value;

pub use buffer::{DecodeBuffer, EncodeBuffer};
pub use codec::{create_codec, documented, with_metadata, Codec, RawCodec};
pub use compact::compact;
pub use constant::{constant_pattern, constant_pattern_of, dummy, never};
pub use deferred::{deferred, LazyCodec};
pub use error::{AssertError, ConstructError, DecodeError, EncodeError, Error};
pub use int::{
    bool, i128, i16, i256, i32, i64, i8, int, option_bool, u128, u16, u256, u32, u64, u8,
};
pub use metadata::{Arg, FactoryId, Inspector, Metadata};
pub use object::{field, instance, object, optional_field, spread, Constructor, Extractor};
pub use option::{option, option_with};
pub use promise::promise;
pub use result::result;
pub use sequence::{
    array, iterable, sized_array, sized_uint8_array, tuple, uint8_array, ItemsFn, LengthFn,
    RehydrateFn,
};
pub use string::str;
pub use transform::transform;
pub use union::{
    key_literal_union, literal_union, literal_union_indexed, tagged_union, variant, Variant,
};
pub use value::{Promise, Settled, Value};

pub use bytes;
pub use num_bigint;

use bytes::Bytes;

/// Encodes `value` using `codec`, see [Codec::encode]
pub fn encode(codec: &Codec, value: &Value) -> Result<Bytes, Error> {
    codec.encode(value)
}

/// Encodes `value` using `codec`, waiting for all async leaves, see [Codec::encode_async]
pub async fn encode_async(codec: &Codec, value: &Value) -> Result<Bytes, Error> {
    codec.encode_async(value).await
}

/// Decodes a value from `buf` using `codec`, see [Codec::decode]
pub fn decode(codec: &Codec, buf: &[u8]) -> Result<Value, Error> {
    codec.decode(buf)
}

/// Checks that `value` conforms to `codec`, see [Codec::assert]
pub fn assert(codec: &Codec, value: &Value) -> Result<(), Error> {
    codec.assert(value)
}

/// Returns `false` if `value` does not conform to `codec`, see [Codec::is]
pub fn is(codec: &Codec, value: &Value) -> Result<bool, Error> {
    codec.is(value)
}
