use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    create_codec, Arg, Codec, DecodeBuffer, EncodeBuffer, Error, FactoryId, Metadata, RawCodec,
    Value,
};

fn expect_object<'a>(this: &Codec, value: &'a Value) -> Result<&'a BTreeMap<String, Value>, Error> {
    value
        .as_object()
        .ok_or_else(|| Error::encode(this, value, "expected an object"))
}

fn assert_object<'a>(this: &Codec, value: &'a Value) -> Result<&'a BTreeMap<String, Value>, Error> {
    value
        .as_object()
        .ok_or_else(|| Error::assert(this, value, "expected an object"))
}

#[cold]
fn invalid_discriminant(this: &Codec, src: &DecodeBuffer<'_>, b: u8) -> Error {
    src.error(
        this,
        format!("optional field discriminant `{b}` is neither 0 nor 1"),
    )
}

struct Field {
    key: Arc<str>,
    codec: Codec,
}

impl RawCodec for Field {
    fn static_size(&self) -> usize {
        self.codec.static_size()
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        expect_object(this, value)?;
        self.codec.encode_into(dst, value.get(&self.key))
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let mut fields = BTreeMap::default();
        self.decode_fields(this, src, &mut fields)?;
        Ok(Value::Object(fields))
    }

    fn decode_fields(
        &self,
        _: &Codec,
        src: &mut DecodeBuffer<'_>,
        fields: &mut BTreeMap<String, Value>,
    ) -> Result<(), Error> {
        let v = self.codec.decode_from(src)?;
        fields.insert(self.key.to_string(), v);
        Ok(())
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        assert_object(this, value)?;
        self.codec
            .assert(value.get(&self.key))
            .map_err(|err| err.in_field(&self.key))
    }
}

fn field_metadata(factory: FactoryId, key: &str, codec: &Codec) -> Metadata {
    let name = if factory == FactoryId::FIELD {
        "$.field"
    } else {
        "$.optionalField"
    };
    Metadata::factory(name, factory, [Arg::from(key.to_string()), Arg::from(codec)])
}

/// Object with the single field `key` encoded with `codec`
///
/// A missing field is encoded as [Value::Undefined].
pub fn field(key: impl Into<String>, codec: Codec) -> Codec {
    let key = key.into();
    create_codec(
        [field_metadata(FactoryId::FIELD, &key, &codec)],
        Field {
            key: key.into(),
            codec,
        },
    )
}

struct OptionalField {
    key: Arc<str>,
    codec: Codec,
}

impl RawCodec for OptionalField {
    fn static_size(&self) -> usize {
        1 + self.codec.static_size()
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        let fields = expect_object(this, value)?;
        match fields.get(&*self.key) {
            None | Some(Value::Undefined) => {
                dst.put_u8(0);
                Ok(())
            }
            Some(v) => {
                dst.put_u8(1);
                self.codec.encode_into(dst, v)
            }
        }
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let mut fields = BTreeMap::default();
        self.decode_fields(this, src, &mut fields)?;
        Ok(Value::Object(fields))
    }

    fn decode_fields(
        &self,
        this: &Codec,
        src: &mut DecodeBuffer<'_>,
        fields: &mut BTreeMap<String, Value>,
    ) -> Result<(), Error> {
        match src.read_u8(this)? {
            0 => Ok(()),
            1 => {
                let v = self.codec.decode_from(src)?;
                if v.is_undefined() {
                    return Err(src.error(this, "Some(None) will not roundtrip correctly"));
                }
                fields.insert(self.key.to_string(), v);
                Ok(())
            }
            b => Err(invalid_discriminant(this, src, b)),
        }
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        let fields = assert_object(this, value)?;
        match fields.get(&*self.key) {
            None | Some(Value::Undefined) => Ok(()),
            Some(v) => self.codec.assert(v).map_err(|err| err.in_field(&self.key)),
        }
    }
}

/// Object with the field `key`, which may be absent, encoded option-style
pub fn optional_field(key: impl Into<String>, codec: Codec) -> Codec {
    let key = key.into();
    create_codec(
        [field_metadata(FactoryId::OPTIONAL_FIELD, &key, &codec)],
        OptionalField {
            key: key.into(),
            codec,
        },
    )
}

/// Concatenation of object codecs, decoded fields are merged into a single object
struct Merge(Vec<Codec>);

impl RawCodec for Merge {
    fn static_size(&self) -> usize {
        self.0.iter().map(Codec::static_size).sum()
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        expect_object(this, value)?;
        for codec in &self.0 {
            codec.encode_into(dst, value)?;
        }
        Ok(())
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let mut fields = BTreeMap::default();
        self.decode_fields(this, src, &mut fields)?;
        Ok(Value::Object(fields))
    }

    fn decode_fields(
        &self,
        _: &Codec,
        src: &mut DecodeBuffer<'_>,
        fields: &mut BTreeMap<String, Value>,
    ) -> Result<(), Error> {
        for codec in &self.0 {
            codec.decode_fields_into(src, fields)?;
        }
        Ok(())
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        assert_object(this, value)?;
        for codec in &self.0 {
            codec.assert(value)?;
        }
        Ok(())
    }
}

/// Object composed of `fields`, which are encoded in order
///
/// Any codec of objects may be used as a field, e.g. [field], [optional_field], another
/// [object] or a tagged union.
pub fn object(fields: impl IntoIterator<Item = Codec>) -> Codec {
    let fields: Vec<_> = fields.into_iter().collect();
    create_codec(
        [Metadata::factory(
            "$.object",
            FactoryId::OBJECT,
            fields.iter().map(Arg::from),
        )],
        Merge(fields),
    )
}

/// Object with the fields of `a` followed by the fields of `b`
pub fn spread(a: &Codec, b: &Codec) -> Codec {
    create_codec(
        [Metadata::factory(
            "$.spread",
            FactoryId::SPREAD,
            [Arg::from(a), Arg::from(b)],
        )],
        Merge(vec![a.clone(), b.clone()]),
    )
}

/// Constructs a value from the decoded fields, in declaration order
pub type Constructor = dyn Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync;

/// Extracts the fields to encode, in declaration order, from a value
pub type Extractor = dyn Fn(&Value) -> anyhow::Result<Vec<Value>> + Send + Sync;

struct Instance {
    fields: Vec<(String, Codec)>,
    ctor: Box<Constructor>,
    extract: Box<Extractor>,
}

impl Instance {
    fn extract(&self, value: &Value) -> anyhow::Result<Vec<Value>> {
        let args = (self.extract)(value)?;
        anyhow::ensure!(
            args.len() == self.fields.len(),
            "extracted {} fields, expected {}",
            args.len(),
            self.fields.len()
        );
        Ok(args)
    }
}

impl RawCodec for Instance {
    fn static_size(&self) -> usize {
        self.fields.iter().map(|(_, codec)| codec.static_size()).sum()
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        let args = self
            .extract(value)
            .map_err(|err| Error::encode(this, value, format!("{err:#}")))?;
        for ((_, codec), arg) in self.fields.iter().zip(&args) {
            codec.encode_into(dst, arg)?;
        }
        Ok(())
    }

    fn decode(&self, _: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let args = self
            .fields
            .iter()
            .map(|(_, codec)| codec.decode_from(src))
            .collect::<Result<Vec<_>, _>>()?;
        let value = (self.ctor)(args)?;
        Ok(value)
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        let args = self
            .extract(value)
            .map_err(|err| Error::assert(this, value, format!("{err:#}")))?;
        for ((key, codec), arg) in self.fields.iter().zip(&args) {
            codec.assert(arg).map_err(|err| err.in_field(key))?;
        }
        Ok(())
    }
}

/// Codec of values, which are not plain objects
///
/// `fields` are decoded in order and passed to `ctor`, conversely `extract` produces the field
/// values to encode from an existing value.
pub fn instance<F, E>(
    name: &'static str,
    fields: impl IntoIterator<Item = (impl Into<String>, Codec)>,
    ctor: F,
    extract: E,
) -> Codec
where
    F: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    E: Fn(&Value) -> anyhow::Result<Vec<Value>> + Send + Sync + 'static,
{
    let fields: Vec<_> = fields
        .into_iter()
        .map(|(key, codec)| (key.into(), codec))
        .collect();
    let args = [Arg::from(name)].into_iter().chain(
        fields
            .iter()
            .map(|(key, codec)| Arg::from(field_metadata(FactoryId::FIELD, key, codec))),
    );
    create_codec(
        [Metadata::factory("$.instance", FactoryId::INSTANCE, args)],
        Instance {
            fields,
            ctor: Box::new(ctor),
            extract: Box::new(extract),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dummy, str, u16, u32, u8};

    fn person() -> Codec {
        object([
            field("name", str()),
            field("age", u8()),
            optional_field("nickname", str()),
        ])
    }

    #[test]
    fn fields_are_encoded_in_order() -> anyhow::Result<()> {
        let codec = person();
        let value = Value::object([("name", Value::from("ab")), ("age", Value::from(3u8))]);
        assert_eq!(codec.encode(&value)?.as_ref(), [0x08, 0x61, 0x62, 3, 0]);
        assert_eq!(codec.decode(&[0x08, 0x61, 0x62, 3, 0])?, value);

        let value = Value::object([
            ("name", Value::from("")),
            ("age", Value::from(1u8)),
            ("nickname", Value::from("c")),
        ]);
        let buf = codec.encode(&value)?;
        assert_eq!(buf.as_ref(), [0, 1, 1, 0x04, 0x63]);
        assert_eq!(codec.decode(&buf)?, value);
        Ok(())
    }

    #[test]
    fn assert_reports_field_path() {
        let codec = object([field("inner", person())]);
        let value = Value::object([(
            "inner",
            Value::object([("name", Value::from("ab")), ("age", Value::from(-1i8))]),
        )]);
        let Err(Error::Assert(err)) = codec.assert(&value) else {
            panic!("assertion should fail")
        };
        assert_eq!(err.path, ".inner.age");
        assert!(err.codec.ptr_eq(&u8()));
        assert!(!codec.is(&Value::Null).is_ok_and(|ok| ok));
    }

    #[test]
    fn spread_merges_fields() -> anyhow::Result<()> {
        let a = object([field("a", u8())]);
        let b = object([field("b", u16())]);
        let codec = spread(&a, &b);
        let value = Value::object([("a", Value::from(1u8)), ("b", Value::from(2u16))]);
        assert_eq!(codec.encode(&value)?.as_ref(), [1, 2, 0]);
        assert_eq!(codec.decode(&[1, 2, 0])?, value);
        assert_eq!(codec.static_size(), 3);
        assert_eq!(
            codec.to_string(),
            r#"$.spread($.object($.field("a", $.u8)), $.object($.field("b", $.u16)))"#
        );
        Ok(())
    }

    #[test]
    fn members_without_fields_are_merged() -> anyhow::Result<()> {
        let codec = object([field("a", u8()), dummy(Value::object([("b", 2u8)]))]);
        assert_eq!(
            codec.decode(&[1])?,
            Value::object([("a", Value::from(1u8)), ("b", Value::from(2u8))])
        );

        let Err(Error::Decode(err)) = object([u8()]).decode(&[1]) else {
            panic!("decode should fail")
        };
        assert!(err.message.contains("expected an object"), "{}", err.message);
        assert!(!err.is_eof());
        Ok(())
    }

    #[test]
    fn instance_uses_constructor() -> anyhow::Result<()> {
        let codec = instance(
            "Point",
            [("x", u32()), ("y", u32())],
            |args| {
                let [x, y] = <[Value; 2]>::try_from(args)
                    .map_err(|_| anyhow::anyhow!("expected 2 arguments"))?;
                Ok(Value::error(Value::array([x, y])))
            },
            |value| match value {
                Value::Error(payload) => Ok(payload
                    .as_array()
                    .ok_or_else(|| anyhow::anyhow!("expected a point"))?
                    .to_vec()),
                _ => anyhow::bail!("expected a point"),
            },
        );
        let value = Value::error(Value::array([1u32, 2]));
        let buf = codec.encode(&value)?;
        assert_eq!(buf.as_ref(), [1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(codec.decode(&buf)?, value);
        assert!(!codec.is(&Value::Null)?);
        assert_eq!(
            codec.to_string(),
            r#"$.instance("Point", $.field("x", $.u32), $.field("y", $.u32))"#
        );
        Ok(())
    }
}
