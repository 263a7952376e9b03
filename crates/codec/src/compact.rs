//! SCALE compact integers
//!
//! The two least significant bits of the first byte select the mode:
//!
//! - `0b00`: single byte, upper six bits hold the value
//! - `0b01`: two bytes, value < 2^14
//! - `0b10`: four bytes, value < 2^30
//! - `0b11`: upper six bits hold `n - 4`, followed by `n` little-endian bytes of the value

use std::sync::LazyLock;

use num_bigint::{BigInt, Sign};

use crate::{
    create_codec, u32, Arg, Codec, DecodeBuffer, EncodeBuffer, Error, FactoryId, Metadata,
    RawCodec, Value,
};

/// Largest `n` representable in the big-integer mode
const MAX_BIG_BYTES: usize = 67;

pub(crate) fn put_compact(dst: &mut EncodeBuffer, v: &BigInt) {
    match u64::try_from(v) {
        Ok(v @ 0..=0x3f) => dst.put_u8((v as u8) << 2),
        Ok(v @ 0x40..=0x3fff) => dst.insert_array(&(((v as u16) << 2) | 0b01).to_le_bytes()),
        Ok(v @ 0x4000..=0x3fff_ffff) => {
            dst.insert_array(&(((v as u32) << 2) | 0b10).to_le_bytes());
        }
        _ => {
            let (_, buf) = v.to_bytes_le();
            dst.put_u8((((buf.len() - 4) << 2) | 0b11) as u8);
            dst.insert_array(&buf);
        }
    }
}

pub(crate) fn read_compact(this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<BigInt, Error> {
    let start = src.position();
    let b0 = src.read_u8(this)?;
    let (v, min) = match b0 & 0b11 {
        0b00 => return Ok(BigInt::from(b0 >> 2)),
        0b01 => {
            let [b1] = src.read_array(this)?;
            (BigInt::from(u16::from_le_bytes([b0, b1]) >> 2), 0x40u32)
        }
        0b10 => {
            let [b1, b2, b3] = src.read_array(this)?;
            (
                BigInt::from(u32::from_le_bytes([b0, b1, b2, b3]) >> 2),
                0x4000,
            )
        }
        _ => {
            let n = usize::from(b0 >> 2) + 4;
            let buf = src.read_slice(this, n)?;
            if buf.last() == Some(&0) {
                return Err(Error::decode(
                    this,
                    start,
                    src.len(),
                    "compact integer is not in canonical form",
                ));
            }
            (BigInt::from_bytes_le(Sign::Plus, buf), 0x4000_0000)
        }
    };
    if v < BigInt::from(min) {
        return Err(Error::decode(
            this,
            start,
            src.len(),
            "compact integer is not in canonical form",
        ));
    }
    Ok(v)
}

/// Writes a compact-encoded length prefix
pub(crate) fn put_len(this: &Codec, dst: &mut EncodeBuffer, value: &Value, len: usize) -> Result<(), Error> {
    if u32::try_from(len).is_err() {
        return Err(Error::encode(this, value, format!("length `{len}` does not fit in a u32")));
    }
    put_compact(dst, &BigInt::from(len));
    Ok(())
}

/// Reads a compact-encoded length prefix
pub(crate) fn read_len(this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<usize, Error> {
    let start = src.position();
    let v = read_compact(this, src)?;
    u32::try_from(&v)
        .ok()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| Error::decode(this, start, src.len(), format!("length `{v}` does not fit in a u32")))
}

struct Compact {
    inner: Codec,
    max: BigInt,
}

impl Compact {
    fn check<'a>(&self, value: &'a Value) -> Result<&'a BigInt, String> {
        let Value::Int(v) = value else {
            return Err(format!("expected an integer, got {}", value.kind()));
        };
        if v.sign() == Sign::Minus || *v > self.max {
            return Err(format!("integer out of range 0..={}", self.max));
        }
        Ok(v)
    }
}

impl RawCodec for Compact {
    fn static_size(&self) -> usize {
        (self.max.bits() as usize).div_ceil(8).clamp(1, MAX_BIG_BYTES) + 1
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        let v = self
            .check(value)
            .map_err(|message| Error::encode(this, value, message))?;
        self.inner.assert(value).map_err(|err| match err {
            Error::Assert(err) => Error::encode(this, value, err.message),
            err => err,
        })?;
        put_compact(dst, v);
        Ok(())
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let start = src.position();
        let v = read_compact(this, src)?;
        if v > self.max {
            return Err(Error::decode(
                this,
                start,
                src.len(),
                format!("compact integer exceeds the bounds of {}", self.inner),
            ));
        }
        Ok(Value::Int(v))
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        self.check(value)
            .map_err(|message| Error::assert(this, value, message))?;
        self.inner.assert(value)
    }
}

/// Compact encoding of the integer codec `inner`
///
/// Values are non-negative and bounded by the positive range of `inner`, if it is not an integer
/// codec, the bound is the largest value representable by the encoding. Values are also checked
/// against `inner` on encode.
#[must_use]
pub fn compact(inner: &Codec) -> Codec {
    let bits = inner
        .metadata()
        .iter()
        .find_map(|entry| match entry.factory_args(FactoryId::INT)? {
            [Arg::Bool(false), Arg::Usize(bits)] => Some(*bits),
            [Arg::Bool(true), Arg::Usize(bits)] => Some(bits.saturating_sub(1)),
            _ => None,
        })
        .unwrap_or(MAX_BIG_BYTES * 8);
    create_codec(
        [Metadata::factory("$.compact", FactoryId::COMPACT, [Arg::from(inner)])],
        Compact {
            inner: inner.clone(),
            max: (BigInt::from(1) << bits) - 1,
        },
    )
}

/// Compact-encoded `u32`, the length prefix of strings and arrays
pub(crate) fn compact_u32() -> Codec {
    static CODEC: LazyLock<Codec> = LazyLock::new(|| compact(&u32()));
    CODEC.clone()
}
