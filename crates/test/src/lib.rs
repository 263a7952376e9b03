use anyhow::{bail, ensure, Context as _};
use subscale_codec::{Codec, DecodeError, Error, Value};
use tracing::debug;

/// Asserts that each of `values` is accepted by `codec` and survives an encode-decode round
/// trip, returning the encoded bytes
pub fn assert_roundtrip<'a>(
    codec: &Codec,
    values: impl IntoIterator<Item = &'a Value>,
) -> anyhow::Result<Vec<Vec<u8>>> {
    values
        .into_iter()
        .map(|value| {
            codec
                .assert(value)
                .with_context(|| format!("{codec} rejected {value:?}"))?;
            let buf = codec
                .encode(value)
                .with_context(|| format!("failed to encode {value:?} with {codec}"))?;
            debug!(?value, ?buf, "encoded value");
            check_decode(codec, value, &buf)?;
            Ok(buf.to_vec())
        })
        .collect()
}

/// Same as [assert_roundtrip], but encodes asynchronously, which allows values to contain
/// promises
pub async fn assert_roundtrip_async<'a>(
    codec: &Codec,
    values: impl IntoIterator<Item = &'a Value>,
) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut bufs = Vec::default();
    for value in values {
        codec
            .assert(value)
            .with_context(|| format!("{codec} rejected {value:?}"))?;
        let buf = codec
            .encode_async(value)
            .await
            .with_context(|| format!("failed to encode {value:?} with {codec}"))?;
        debug!(?buf, "encoded value asynchronously");
        check_decode(codec, value, &buf)?;
        bufs.push(buf.to_vec());
    }
    Ok(bufs)
}

fn check_decode(codec: &Codec, value: &Value, buf: &[u8]) -> anyhow::Result<()> {
    let decoded = codec
        .decode(buf)
        .with_context(|| format!("failed to decode {buf:02x?} with {codec}"))?;
    ensure!(
        decoded == *value,
        "{codec} decoded {decoded:?} from {buf:02x?}, expected {value:?}"
    );
    Ok(())
}

/// Asserts that each of `values` is rejected by `codec`
pub fn assert_invalid<'a>(
    codec: &Codec,
    values: impl IntoIterator<Item = &'a Value>,
) -> anyhow::Result<()> {
    for value in values {
        match codec.assert(value) {
            Ok(()) => bail!("{codec} accepted {value:?}"),
            Err(Error::Assert(err)) => debug!(%err, "value rejected"),
            Err(err) => {
                return Err(anyhow::Error::new(err))
                    .with_context(|| format!("{codec} failed to assert {value:?}"))
            }
        }
    }
    Ok(())
}

/// Asserts that decoding `buf` with `codec` fails and returns the error
pub fn assert_decode_fails(codec: &Codec, buf: &[u8]) -> anyhow::Result<Box<DecodeError>> {
    match codec.decode(buf) {
        Ok(value) => bail!("{codec} decoded {value:?} from {buf:02x?}"),
        Err(Error::Decode(err)) => {
            debug!(%err, "decoding failed");
            Ok(err)
        }
        Err(err) => Err(anyhow::Error::new(err)).context("expected a decoding error"),
    }
}
