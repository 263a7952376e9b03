use std::sync::LazyLock;

use bytes::Bytes;

use crate::compact::{compact_u32, put_len, read_len};
use crate::{
    create_codec, Arg, Codec, DecodeBuffer, EncodeBuffer, Error, FactoryId, Metadata, RawCodec,
    Value,
};

fn assert_items(codec: &Codec, items: &[Value]) -> Result<(), Error> {
    for (i, item) in items.iter().enumerate() {
        codec.assert(item).map_err(|err| err.in_index(i))?;
    }
    Ok(())
}

fn decode_items(codec: &Codec, src: &mut DecodeBuffer<'_>, n: usize) -> Result<Vec<Value>, Error> {
    // never trust the declared length for preallocation
    let mut items = Vec::with_capacity(n.min(src.remaining()));
    for _ in 0..n {
        items.push(codec.decode_from(src)?);
    }
    Ok(items)
}

struct Tuple(Vec<Codec>);

impl RawCodec for Tuple {
    fn static_size(&self) -> usize {
        self.0.iter().map(Codec::static_size).sum()
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        match value.as_array() {
            Some(items) if items.len() == self.0.len() => {
                for (codec, item) in self.0.iter().zip(items) {
                    codec.encode_into(dst, item)?;
                }
                Ok(())
            }
            _ => Err(Error::encode(
                this,
                value,
                format!("expected an array of length {}", self.0.len()),
            )),
        }
    }

    fn decode(&self, _: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        self.0
            .iter()
            .map(|codec| codec.decode_from(src))
            .collect::<Result<_, _>>()
            .map(Value::Array)
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        match value.as_array() {
            Some(items) if items.len() == self.0.len() => {
                for (i, (codec, item)) in self.0.iter().zip(items).enumerate() {
                    codec.assert(item).map_err(|err| err.in_index(i))?;
                }
                Ok(())
            }
            _ => Err(Error::assert(
                this,
                value,
                format!("expected an array of length {}", self.0.len()),
            )),
        }
    }
}

/// Fixed-length heterogeneous sequence, elements are encoded in order without a length prefix
pub fn tuple(codecs: impl IntoIterator<Item = Codec>) -> Codec {
    let codecs: Vec<_> = codecs.into_iter().collect();
    create_codec(
        [Metadata::factory(
            "$.tuple",
            FactoryId::TUPLE,
            codecs.iter().map(Arg::from),
        )],
        Tuple(codecs),
    )
}

struct Array(Codec);

impl RawCodec for Array {
    fn static_size(&self) -> usize {
        compact_u32().static_size()
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        let Some(items) = value.as_array() else {
            return Err(Error::encode(this, value, "expected an array"));
        };
        put_len(this, dst, value, items.len())?;
        for item in items {
            self.0.encode_into(dst, item)?;
        }
        Ok(())
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let n = read_len(this, src)?;
        decode_items(&self.0, src, n).map(Value::Array)
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        let Some(items) = value.as_array() else {
            return Err(Error::assert(this, value, "expected an array"));
        };
        assert_items(&self.0, items)
    }
}

/// Variable-length homogeneous sequence, prefixed by its compact-encoded length
pub fn array(codec: &Codec) -> Codec {
    create_codec(
        [Metadata::factory("$.array", FactoryId::ARRAY, [Arg::from(codec)])],
        Array(codec.clone()),
    )
}

/// Computes the number of elements of a collection
pub type LengthFn = dyn Fn(&Value) -> anyhow::Result<usize> + Send + Sync;

/// Produces the elements of a collection, in encoding order
pub type ItemsFn = dyn Fn(&Value) -> anyhow::Result<Vec<Value>> + Send + Sync;

/// Builds a collection from its decoded elements
pub type RehydrateFn = dyn Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync;

struct Iterable {
    codec: Codec,
    len: Box<LengthFn>,
    items: Box<ItemsFn>,
    rehydrate: Box<RehydrateFn>,
}

impl Iterable {
    fn items(&self, value: &Value) -> anyhow::Result<Vec<Value>> {
        let n = (self.len)(value)?;
        let items = (self.items)(value)?;
        anyhow::ensure!(
            items.len() == n,
            "collection yielded {} elements, expected {n}",
            items.len()
        );
        Ok(items)
    }
}

impl RawCodec for Iterable {
    fn static_size(&self) -> usize {
        compact_u32().static_size()
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        let items = self
            .items(value)
            .map_err(|err| Error::encode(this, value, format!("{err:#}")))?;
        put_len(this, dst, value, items.len())?;
        for item in &items {
            self.codec.encode_into(dst, item)?;
        }
        Ok(())
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let n = read_len(this, src)?;
        let items = decode_items(&self.codec, src, n)?;
        let value = (self.rehydrate)(items)?;
        Ok(value)
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        let items = self
            .items(value)
            .map_err(|err| Error::assert(this, value, format!("{err:#}")))?;
        assert_items(&self.codec, &items)
    }
}

/// Variable-length collection of `codec` elements, prefixed by its compact-encoded length
///
/// `len` computes the length written to the prefix, `items` produces the elements to encode,
/// which must agree with `len`, and `rehydrate` builds the collection from the decoded elements.
pub fn iterable<L, I, R>(codec: &Codec, len: L, items: I, rehydrate: R) -> Codec
where
    L: Fn(&Value) -> anyhow::Result<usize> + Send + Sync + 'static,
    I: Fn(&Value) -> anyhow::Result<Vec<Value>> + Send + Sync + 'static,
    R: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    create_codec(
        [Metadata::factory(
            "$.iterable",
            FactoryId::ITERABLE,
            [Arg::from(codec)],
        )],
        Iterable {
            codec: codec.clone(),
            len: Box::new(len),
            items: Box::new(items),
            rehydrate: Box::new(rehydrate),
        },
    )
}

struct SizedArray {
    codec: Codec,
    len: usize,
}

impl RawCodec for SizedArray {
    fn static_size(&self) -> usize {
        self.codec.static_size().saturating_mul(self.len)
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        match value.as_array() {
            Some(items) if items.len() == self.len => {
                for item in items {
                    self.codec.encode_into(dst, item)?;
                }
                Ok(())
            }
            _ => Err(Error::encode(
                this,
                value,
                format!("expected an array of length {}", self.len),
            )),
        }
    }

    fn decode(&self, _: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        decode_items(&self.codec, src, self.len).map(Value::Array)
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        match value.as_array() {
            Some(items) if items.len() == self.len => assert_items(&self.codec, items),
            _ => Err(Error::assert(
                this,
                value,
                format!("expected an array of length {}", self.len),
            )),
        }
    }
}

/// Homogeneous sequence of exactly `len` elements, without a length prefix
pub fn sized_array(codec: &Codec, len: usize) -> Codec {
    create_codec(
        [Metadata::factory(
            "$.sizedArray",
            FactoryId::SIZED_ARRAY,
            [Arg::from(codec), Arg::from(len)],
        )],
        SizedArray {
            codec: codec.clone(),
            len,
        },
    )
}

struct Uint8Array;

impl RawCodec for Uint8Array {
    fn static_size(&self) -> usize {
        compact_u32().static_size()
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        let Value::Bytes(buf) = value else {
            return Err(Error::encode(this, value, "expected bytes"));
        };
        put_len(this, dst, value, buf.len())?;
        dst.insert_array(buf);
        Ok(())
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let n = read_len(this, src)?;
        let buf = src.read_slice(this, n)?;
        Ok(Value::Bytes(Bytes::copy_from_slice(buf)))
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        if let Value::Bytes(..) = value {
            Ok(())
        } else {
            Err(Error::assert(this, value, "expected bytes"))
        }
    }
}

/// Byte string, prefixed by its compact-encoded length
#[must_use]
pub fn uint8_array() -> Codec {
    static CODEC: LazyLock<Codec> =
        LazyLock::new(|| create_codec([Metadata::atomic("$.uint8Array")], Uint8Array));
    CODEC.clone()
}

struct SizedUint8Array(usize);

impl SizedUint8Array {
    fn check(&self, value: &Value) -> Result<(), String> {
        match value {
            Value::Bytes(buf) if buf.len() == self.0 => Ok(()),
            Value::Bytes(buf) => Err(format!("expected {} bytes, got {}", self.0, buf.len())),
            _ => Err("expected bytes".into()),
        }
    }
}

impl RawCodec for SizedUint8Array {
    fn static_size(&self) -> usize {
        self.0
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        self.check(value)
            .map_err(|message| Error::encode(this, value, message))?;
        if let Value::Bytes(buf) = value {
            dst.insert_array(buf);
        }
        Ok(())
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let buf = src.read_slice(this, self.0)?;
        Ok(Value::Bytes(Bytes::copy_from_slice(buf)))
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        self.check(value)
            .map_err(|message| Error::assert(this, value, message))
    }
}

/// Byte string of exactly `len` bytes, without a length prefix
#[must_use]
pub fn sized_uint8_array(len: usize) -> Codec {
    create_codec(
        [Metadata::factory(
            "$.sizedUint8Array",
            FactoryId::SIZED_UINT8_ARRAY,
            [Arg::from(len)],
        )],
        SizedUint8Array(len),
    )
}
