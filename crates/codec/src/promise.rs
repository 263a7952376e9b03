use anyhow::anyhow;

use crate::{
    create_codec, Arg, Codec, DecodeBuffer, EncodeBuffer, Error, FactoryId, Metadata, Promise,
    RawCodec, Value,
};

struct PromiseCodec(Codec);

impl RawCodec for PromiseCodec {
    fn static_size(&self) -> usize {
        self.0.static_size()
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        let Value::Promise(p) = value else {
            return Err(Error::encode(this, value, "expected a promise"));
        };
        let p = p.clone();
        let inner = self.0.clone();
        dst.write_async(async move {
            let value = p
                .settle()
                .await
                .map_err(|err| anyhow!("promise rejected: {err:#}"))?;
            let mut buf = EncodeBuffer::with_capacity(inner.static_size());
            inner.encode_into(&mut buf, &value)?;
            buf.finish_async().await
        });
        Ok(())
    }

    fn decode(&self, _: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let value = self.0.decode_from(src)?;
        Ok(Value::Promise(Promise::resolved(value)))
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        if let Value::Promise(..) = value {
            Ok(())
        } else {
            Err(Error::assert(this, value, "expected a promise"))
        }
    }
}

/// Codec of an asynchronously produced value, encoded with `inner` once it settles
///
/// Values of this codec can only be encoded by [Codec::encode_async], the bytes are placed at the
/// position at which the promise was encountered. Decoding produces an already-resolved promise.
#[must_use]
pub fn promise(inner: &Codec) -> Codec {
    create_codec(
        [Metadata::factory(
            "$.promise",
            FactoryId::PROMISE,
            [Arg::from(inner)],
        )],
        PromiseCodec(inner.clone()),
    )
}
