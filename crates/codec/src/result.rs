use crate::{
    create_codec, Arg, Codec, DecodeBuffer, EncodeBuffer, Error, FactoryId, Metadata, RawCodec,
    Value,
};

struct Res {
    ok: Codec,
    err: Codec,
}

impl RawCodec for Res {
    fn static_size(&self) -> usize {
        1 + self.ok.static_size().max(self.err.static_size())
    }

    fn encode(&self, _: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        if let Value::Error(payload) = value {
            dst.put_u8(1);
            self.err.encode_into(dst, payload)
        } else {
            dst.put_u8(0);
            self.ok.encode_into(dst, value)
        }
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        match src.read_u8(this)? {
            0 => {
                let value = self.ok.decode_from(src)?;
                if value.is_error() {
                    return Err(src.error(
                        this,
                        "an ok value that is an error will not roundtrip correctly",
                    ));
                }
                Ok(value)
            }
            1 => {
                let payload = self.err.decode_from(src)?;
                Ok(Value::error(payload))
            }
            b => Err(src.error(this, format!("result discriminant `{b}` is neither 0 nor 1"))),
        }
    }

    fn assert(&self, _: &Codec, value: &Value) -> Result<(), Error> {
        if let Value::Error(payload) = value {
            self.err.assert(payload)
        } else {
            self.ok.assert(value)
        }
    }
}

/// Either an ok value encoded with `ok` (discriminant `0`) or a [Value::Error], whose payload is
/// encoded with `err` (discriminant `1`)
///
/// `ok` may not itself be a result codec.
pub fn result(ok: &Codec, err: &Codec) -> Result<Codec, Error> {
    if ok
        .metadata()
        .iter()
        .any(|entry| entry.factory_args(FactoryId::RESULT).is_some())
    {
        return Err(Error::construct(
            "nested result codec will not roundtrip correctly",
        ));
    }
    Ok(create_codec(
        [Metadata::factory(
            "$.result",
            FactoryId::RESULT,
            [Arg::from(ok), Arg::from(err)],
        )],
        Res {
            ok: ok.clone(),
            err: err.clone(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dummy, str, u32, u8};

    #[test]
    fn ok_and_err_branches() -> anyhow::Result<()> {
        let codec = result(&u8(), &str())?;
        assert_eq!(codec.encode(&Value::from(3u8))?.as_ref(), [0, 3]);
        let err = Value::error("ab");
        assert_eq!(codec.encode(&err)?.as_ref(), [1, 0x08, 0x61, 0x62]);
        assert_eq!(codec.decode(&[1, 0x08, 0x61, 0x62])?, err);
        assert!(codec.decode(&[2]).is_err_and(|err| err.is_decode()));
        assert_eq!(codec.static_size(), 6);
        assert!(!codec.is(&Value::error(1u8))?);
        Ok(())
    }

    #[test]
    fn nesting_is_rejected() -> anyhow::Result<()> {
        let inner = result(&u8(), &str())?;
        assert!(result(&inner, &str()).is_err_and(|err| err.is_construct()));
        assert!(result(&u32(), &inner).is_ok());
        Ok(())
    }

    #[test]
    fn ok_error_value_is_ambiguous() -> anyhow::Result<()> {
        let codec = result(&dummy(Value::error(Value::Null)), &str())?;
        assert!(codec.decode(&[0]).is_err_and(|err| err.is_decode()));
        Ok(())
    }
}
