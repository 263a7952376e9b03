use crate::{
    create_codec, Arg, Codec, DecodeBuffer, EncodeBuffer, Error, FactoryId, Metadata, RawCodec,
    Value,
};

type EncodeFn = dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync;
type DecodeFn = dyn Fn(Value) -> anyhow::Result<Value> + Send + Sync;

struct Transform {
    base: Codec,
    encode: Box<EncodeFn>,
    decode: Box<DecodeFn>,
}

impl RawCodec for Transform {
    fn static_size(&self) -> usize {
        self.base.static_size()
    }

    fn encode(&self, _: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        let value = (self.encode)(value)?;
        self.base.encode_into(dst, &value)
    }

    fn decode(&self, _: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let value = self.base.decode_from(src)?;
        let value = (self.decode)(value)?;
        Ok(value)
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        let value = (self.encode)(value)
            .map_err(|err| Error::assert(this, value, format!("{err:#}")))?;
        self.base.assert(&value)
    }
}

/// Codec, which maps values with `encode` before encoding them with `base` and with `decode`
/// after decoding them with `base`
///
/// Values are asserted by mapping them with `encode` and asserting the result with `base`.
pub fn transform<E, D>(base: &Codec, encode: E, decode: D) -> Codec
where
    E: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    D: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    create_codec(
        [Metadata::factory(
            "$.transform",
            FactoryId::TRANSFORM,
            [Arg::from(base)],
        )],
        Transform {
            base: base.clone(),
            encode: Box::new(encode),
            decode: Box::new(decode),
        },
    )
}
