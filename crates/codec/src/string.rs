use std::sync::LazyLock;

use crate::compact::{compact_u32, put_len, read_len};
use crate::{create_codec, Codec, DecodeBuffer, EncodeBuffer, Error, Metadata, RawCodec, Value};

struct Str;

impl RawCodec for Str {
    fn static_size(&self) -> usize {
        compact_u32().static_size()
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        let Value::Str(s) = value else {
            return Err(Error::encode(this, value, "expected a string"));
        };
        put_len(this, dst, value, s.len())?;
        dst.insert_array(s.as_bytes());
        Ok(())
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let len = read_len(this, src)?;
        let start = src.position();
        let buf = src.read_slice(this, len)?;
        let s = core::str::from_utf8(buf).map_err(|err| {
            Error::decode(this, start, src.len(), format!("invalid UTF-8: {err}"))
        })?;
        Ok(Value::Str(s.into()))
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        if let Value::Str(..) = value {
            Ok(())
        } else {
            Err(Error::assert(this, value, "expected a string"))
        }
    }
}

/// UTF-8 string prefixed by its compact-encoded byte length
#[must_use]
pub fn str() -> Codec {
    static CODEC: LazyLock<Codec> = LazyLock::new(|| create_codec([Metadata::atomic("$.str")], Str));
    CODEC.clone()
}
