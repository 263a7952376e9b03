use core::fmt::Write as _;

use std::sync::LazyLock;

use bytes::Bytes;

use crate::{
    create_codec, Arg, Codec, DecodeBuffer, EncodeBuffer, Error, FactoryId, Metadata, RawCodec,
    Value,
};

fn hex(buf: &[u8]) -> String {
    buf.iter().fold(String::from("0x"), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

struct ConstantPattern {
    value: Value,
    pattern: Bytes,
}

impl RawCodec for ConstantPattern {
    fn static_size(&self) -> usize {
        0
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        if *value != self.value {
            return Err(Error::encode(
                this,
                value,
                format!("expected {:?}", self.value),
            ));
        }
        dst.insert_array(&self.pattern);
        Ok(())
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let start = src.position();
        let got = src.read_slice(this, self.pattern.len())?;
        if got != &self.pattern[..] {
            return Err(Error::decode(
                this,
                start,
                src.len(),
                format!(
                    "invalid pattern; expected {}, got {}",
                    hex(&self.pattern),
                    hex(got)
                ),
            ));
        }
        Ok(self.value.clone())
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        if *value == self.value {
            Ok(())
        } else {
            Err(Error::assert(
                this,
                value,
                format!("invalid value; expected {:?}", self.value),
            ))
        }
    }
}

/// Codec of the single value `value`, which is represented on the wire by `pattern` verbatim,
/// e.g. a magic number
pub fn constant_pattern(value: impl Into<Value>, pattern: impl Into<Bytes>) -> Codec {
    let value = value.into();
    let pattern = pattern.into();
    create_codec(
        [Metadata::factory(
            "$.constantPattern",
            FactoryId::CONSTANT_PATTERN,
            [Arg::Value(value.clone()), Arg::Bytes(pattern.clone())],
        )],
        ConstantPattern { value, pattern },
    )
}

/// Same as [constant_pattern], but the pattern is `value` encoded with `codec`
pub fn constant_pattern_of(value: impl Into<Value>, codec: &Codec) -> Result<Codec, Error> {
    let value = value.into();
    let pattern = codec.encode(&value)?;
    Ok(constant_pattern(value, pattern))
}

struct Dummy(Value);

impl RawCodec for Dummy {
    fn static_size(&self) -> usize {
        0
    }

    fn encode(&self, _: &Codec, _: &mut EncodeBuffer, _: &Value) -> Result<(), Error> {
        Ok(())
    }

    fn decode(&self, _: &Codec, _: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        Ok(self.0.clone())
    }

    fn assert(&self, _: &Codec, _: &Value) -> Result<(), Error> {
        Ok(())
    }
}

/// Zero-byte codec, which accepts any value and always decodes to `value`
pub fn dummy(value: impl Into<Value>) -> Codec {
    let value = value.into();
    create_codec(
        [Metadata::factory(
            "$.dummy",
            FactoryId::DUMMY,
            [Arg::Value(value.clone())],
        )],
        Dummy(value),
    )
}

struct Never;

impl RawCodec for Never {
    fn static_size(&self) -> usize {
        0
    }

    fn encode(&self, this: &Codec, _: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        Err(Error::encode(this, value, "cannot encode $.never"))
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        Err(src.error(this, "cannot decode $.never"))
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        Err(Error::assert(this, value, "$.never accepts no values"))
    }
}

/// Codec of the empty type, every operation fails
#[must_use]
pub fn never() -> Codec {
    static CODEC: LazyLock<Codec> = LazyLock::new(|| create_codec([Metadata::atomic("$.never")], Never));
    CODEC.clone()
}
