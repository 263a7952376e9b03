//! [tokio_util::codec] integration, which allows any [Codec] to drive a framed stream

use bytes::{Buf as _, BytesMut};
use tracing::{instrument, trace};

use crate::{Codec, DecodeBuffer, Error, Value};

fn invalid_data(err: Error) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, err)
}

impl tokio_util::codec::Encoder<&Value> for Codec {
    type Error = std::io::Error;

    #[instrument(level = "trace", skip_all)]
    fn encode(&mut self, value: &Value, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let buf = Codec::encode(self, value).map_err(invalid_data)?;
        trace!(len = buf.len(), "encoded value");
        dst.extend_from_slice(&buf);
        Ok(())
    }
}

impl tokio_util::codec::Encoder<Value> for Codec {
    type Error = std::io::Error;

    #[instrument(level = "trace", skip_all)]
    fn encode(&mut self, value: Value, dst: &mut BytesMut) -> Result<(), Self::Error> {
        tokio_util::codec::Encoder::<&Value>::encode(self, &value, dst)
    }
}

impl tokio_util::codec::Decoder for Codec {
    type Item = Value;
    type Error = std::io::Error;

    #[instrument(level = "trace", skip_all)]
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let mut buf = DecodeBuffer::new(&src[..]);
        match self.decode_from(&mut buf) {
            Ok(value) => {
                let n = buf.position();
                trace!(n, "decoded value");
                src.advance(n);
                Ok(Some(value))
            }
            Err(Error::Decode(err)) if err.is_eof() => {
                trace!(len = src.len(), "incomplete value, awaiting more bytes");
                Ok(None)
            }
            Err(err) => Err(invalid_data(err)),
        }
    }
}
