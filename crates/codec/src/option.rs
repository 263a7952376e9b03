use crate::{
    create_codec, Arg, Codec, DecodeBuffer, EncodeBuffer, Error, FactoryId, Metadata, RawCodec,
    Value,
};

#[cold]
fn ambiguous(this: &Codec, src: &DecodeBuffer<'_>) -> Error {
    src.error(this, "Some(None) will not roundtrip correctly")
}

#[cold]
fn invalid_discriminant(this: &Codec, src: &DecodeBuffer<'_>, b: u8) -> Error {
    src.error(this, format!("option discriminant `{b}` is neither 0 nor 1"))
}

struct Opt {
    some: Codec,
    none: Value,
}

impl RawCodec for Opt {
    fn static_size(&self) -> usize {
        1 + self.some.static_size()
    }

    fn encode(&self, _: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        if *value == self.none {
            dst.put_u8(0);
            return Ok(());
        }
        dst.put_u8(1);
        self.some.encode_into(dst, value)
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        match src.read_u8(this)? {
            0 => Ok(self.none.clone()),
            1 => {
                let value = self.some.decode_from(src)?;
                if value == self.none {
                    return Err(ambiguous(this, src));
                }
                Ok(value)
            }
            b => Err(invalid_discriminant(this, src, b)),
        }
    }

    fn assert(&self, _: &Codec, value: &Value) -> Result<(), Error> {
        if *value == self.none {
            return Ok(());
        }
        self.some.assert(value)
    }
}

/// Returns `true` if `codec` was directly constructed by `option` with `none` as the sentinel
fn is_option_of(codec: &Codec, none: &Value) -> bool {
    codec.metadata().iter().any(|entry| {
        let Some(args) = entry.factory_args(FactoryId::OPTION) else {
            return false;
        };
        match args.get(1) {
            Some(Arg::Value(v)) => v == none,
            _ => none.is_undefined(),
        }
    })
}

/// Same as [option_with], using [Value::Undefined] as the `none` sentinel
pub fn option(some: &Codec) -> Result<Codec, Error> {
    option_with(some, Value::Undefined)
}

/// Either `none` (discriminant `0`) or a value encoded with `some` (discriminant `1`)
///
/// Nesting options with the same `none` sentinel is rejected, since such a codec could not
/// distinguish `None` from `Some(None)`.
pub fn option_with(some: &Codec, none: impl Into<Value>) -> Result<Codec, Error> {
    let none = none.into();
    if is_option_of(some, &none) {
        return Err(Error::construct(
            "nested option codec will not roundtrip correctly",
        ));
    }
    let mut args = vec![Arg::from(some)];
    if !none.is_undefined() {
        args.push(Arg::Value(none.clone()));
    }
    Ok(create_codec(
        [Metadata::factory("$.option", FactoryId::OPTION, args)],
        Opt {
            some: some.clone(),
            none,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{documented, u8};

    #[test]
    fn discriminant() -> anyhow::Result<()> {
        let codec = option(&u8())?;
        assert_eq!(codec.encode(&Value::Undefined)?.as_ref(), [0]);
        assert_eq!(codec.encode(&Value::from(7u8))?.as_ref(), [1, 7]);
        assert_eq!(codec.decode(&[1, 7])?, Value::from(7u8));
        assert_eq!(codec.decode(&[0])?, Value::Undefined);
        assert!(codec.decode(&[2, 7]).is_err_and(|err| err.is_decode()));
        assert!(codec.decode(&[1]).is_err_and(|err| err.is_decode()));
        assert_eq!(codec.static_size(), 2);
        assert_eq!(codec.to_string(), "$.option($.u8)");
        Ok(())
    }

    #[test]
    fn nesting_with_the_same_sentinel_is_rejected() -> anyhow::Result<()> {
        let inner = option(&u8())?;
        assert!(option(&inner).is_err_and(|err| err.is_construct()));
        assert!(option(&documented("inner", &inner)).is_err_and(|err| err.is_construct()));

        let inner = option_with(&u8(), Value::Null)?;
        assert!(option_with(&inner, Value::Null).is_err_and(|err| err.is_construct()));
        let outer = option(&inner)?;
        assert_eq!(outer.encode(&Value::Null)?.as_ref(), [1, 0]);
        assert_eq!(outer.decode(&[1, 0])?, Value::Null);
        Ok(())
    }

    #[test]
    fn some_none_is_rejected() -> anyhow::Result<()> {
        let codec = option_with(&u8(), 0u8)?;
        assert_eq!(codec.encode(&Value::from(0u8))?.as_ref(), [0]);
        let Err(Error::Decode(err)) = codec.decode(&[1, 0]) else {
            panic!("decode should fail")
        };
        assert!(!err.is_eof());
        assert_eq!(err.position, 2);
        assert_eq!(codec.to_string(), "$.option($.u8, 0)");
        Ok(())
    }

    #[test]
    fn assert() -> anyhow::Result<()> {
        let codec = option(&u8())?;
        assert!(codec.is(&Value::Undefined)?);
        assert!(codec.is(&Value::from(1u8))?);
        assert!(!codec.is(&Value::Null)?);
        Ok(())
    }
}
