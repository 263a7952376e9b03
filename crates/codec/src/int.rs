use std::sync::LazyLock;

use num_bigint::{BigInt, Sign};

use crate::{
    create_codec, Arg, Codec, DecodeBuffer, EncodeBuffer, Error, FactoryId, Metadata, RawCodec,
    Value,
};

/// Fixed-width little-endian two's complement integer
struct Int {
    signed: bool,
    size: usize,
    min: BigInt,
    max: BigInt,
}

impl Int {
    fn new(signed: bool, bits: usize) -> Self {
        let (min, max) = if signed {
            let half = BigInt::from(1) << (bits - 1);
            (-half.clone(), half - 1)
        } else {
            (BigInt::ZERO, (BigInt::from(1) << bits) - 1)
        };
        Self {
            signed,
            size: bits / 8,
            min,
            max,
        }
    }

    fn check<'a>(&self, value: &'a Value) -> Result<&'a BigInt, String> {
        let Value::Int(v) = value else {
            return Err(format!("expected an integer, got {}", value.kind()));
        };
        if *v < self.min || *v > self.max {
            return Err(format!(
                "integer out of range {}..={}",
                self.min, self.max
            ));
        }
        Ok(v)
    }
}

impl RawCodec for Int {
    fn static_size(&self) -> usize {
        self.size
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        let v = self
            .check(value)
            .map_err(|message| Error::encode(this, value, message))?;
        let mut buf = v.to_signed_bytes_le();
        let pad = if v.sign() == Sign::Minus { 0xff } else { 0 };
        // the range check guarantees that only redundant sign bytes are truncated
        buf.resize(self.size, pad);
        dst.insert_array(&buf);
        Ok(())
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let buf = src.read_slice(this, self.size)?;
        let v = if self.signed {
            BigInt::from_signed_bytes_le(buf)
        } else {
            BigInt::from_bytes_le(Sign::Plus, buf)
        };
        Ok(Value::Int(v))
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        self.check(value)
            .map(|_| ())
            .map_err(|message| Error::assert(this, value, message))
    }
}

fn int_codec(signed: bool, bits: usize) -> Codec {
    let name = format!("$.{}{bits}", if signed { "i" } else { "u" });
    create_codec(
        [
            Metadata::atomic(name),
            Metadata::factory(
                "$.int",
                FactoryId::INT,
                [Arg::Bool(signed), Arg::Usize(bits)],
            ),
        ],
        Int::new(signed, bits),
    )
}

macro_rules! int_codecs {
    ($($name:ident: $signed:literal $bits:literal $kind:literal),+ $(,)?) => {
        $(
            #[doc = concat!("Fixed-width ", stringify!($bits), "-bit ", $kind, " integer")]
            #[must_use]
            pub fn $name() -> Codec {
                static CODEC: LazyLock<Codec> = LazyLock::new(|| int_codec($signed, $bits));
                CODEC.clone()
            }
        )+
    };
}

int_codecs! {
    u8: false 8 "unsigned",
    i8: true 8 "signed",
    u16: false 16 "unsigned",
    i16: true 16 "signed",
    u32: false 32 "unsigned",
    i32: true 32 "signed",
    u64: false 64 "unsigned",
    i64: true 64 "signed",
    u128: false 128 "unsigned",
    i128: true 128 "signed",
    u256: false 256 "unsigned",
    i256: true 256 "signed",
}

/// Looks up the shared fixed-width integer codec by signedness and width in bits
pub fn int(signed: bool, bits: usize) -> Result<Codec, Error> {
    match (signed, bits) {
        (false, 8) => Ok(u8()),
        (true, 8) => Ok(i8()),
        (false, 16) => Ok(u16()),
        (true, 16) => Ok(i16()),
        (false, 32) => Ok(u32()),
        (true, 32) => Ok(i32()),
        (false, 64) => Ok(u64()),
        (true, 64) => Ok(i64()),
        (false, 128) => Ok(u128()),
        (true, 128) => Ok(i128()),
        (false, 256) => Ok(u256()),
        (true, 256) => Ok(i256()),
        _ => Err(Error::construct(format!(
            "unsupported integer width `{bits}`"
        ))),
    }
}

struct Bool;

impl RawCodec for Bool {
    fn static_size(&self) -> usize {
        1
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        let Value::Bool(v) = value else {
            return Err(Error::encode(this, value, "expected a bool"));
        };
        dst.put_u8((*v).into());
        Ok(())
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let b = src.read_u8(this)?;
        Ok(Value::Bool(b != 0))
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        if let Value::Bool(..) = value {
            Ok(())
        } else {
            Err(Error::assert(this, value, "expected a bool"))
        }
    }
}

/// One-byte boolean, any nonzero byte decodes as `true`
#[must_use]
pub fn bool() -> Codec {
    static CODEC: LazyLock<Codec> = LazyLock::new(|| create_codec([Metadata::atomic("$.bool")], Bool));
    CODEC.clone()
}

struct OptionBool;

impl RawCodec for OptionBool {
    fn static_size(&self) -> usize {
        1
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        match value {
            Value::Undefined => dst.put_u8(0),
            Value::Bool(true) => dst.put_u8(1),
            Value::Bool(false) => dst.put_u8(2),
            _ => return Err(Error::encode(this, value, "expected a bool or undefined")),
        }
        Ok(())
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        match src.read_u8(this)? {
            0 => Ok(Value::Undefined),
            1 => Ok(Value::Bool(true)),
            2 => Ok(Value::Bool(false)),
            b => Err(src.error(this, format!("optional bool discriminant `{b}` is not one of 0, 1 or 2"))),
        }
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        match value {
            Value::Undefined | Value::Bool(..) => Ok(()),
            _ => Err(Error::assert(this, value, "expected a bool or undefined")),
        }
    }
}

/// One-byte optional boolean: `0` is undefined, `1` is `true`, `2` is `false`
#[must_use]
pub fn option_bool() -> Codec {
    static CODEC: LazyLock<Codec> =
        LazyLock::new(|| create_codec([Metadata::atomic("$.optionBool")], OptionBool));
    CODEC.clone()
}
