use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, instrument};

use crate::{DecodeBuffer, EncodeBuffer, Error, Metadata, Value};

/// The four primitive operations every codec is assembled from, see [create_codec]
///
/// `this` is the [Codec] the operation is invoked on, it is used to attribute errors.
pub trait RawCodec: Send + Sync + 'static {
    /// Estimated encoded size, which may be an under- or over-estimate
    fn static_size(&self) -> usize;

    /// Writes `value` at the cursor of `dst`
    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error>;

    /// Reads a value starting at the cursor of `src`
    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error>;

    /// Checks that `value` conforms to the codec shape
    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error>;

    /// Reads an object starting at the cursor of `src` and inserts its fields into `fields`
    ///
    /// Object combinators override this to avoid materializing intermediate objects.
    fn decode_fields(
        &self,
        this: &Codec,
        src: &mut DecodeBuffer<'_>,
        fields: &mut BTreeMap<String, Value>,
    ) -> Result<(), Error> {
        match self.decode(this, src)? {
            Value::Object(decoded) => {
                fields.extend(decoded);
                Ok(())
            }
            value => Err(not_an_object(this, src, &value)),
        }
    }
}

#[cold]
fn not_an_object(this: &Codec, src: &DecodeBuffer<'_>, value: &Value) -> Error {
    src.error(this, format!("decoded to {}, expected an object", value.kind()))
}

struct Inner {
    raw: Arc<dyn RawCodec>,
    static_size: usize,
    metadata: Vec<Metadata>,
}

/// Immutable, cheaply cloneable codec handle
///
/// Clones share identity, which is used by metadata comparisons and by printing.
#[derive(Clone)]
pub struct Codec(Arc<Inner>);

/// Assembles a [Codec] from its primitive operations and metadata
pub fn create_codec(metadata: impl IntoIterator<Item = Metadata>, raw: impl RawCodec) -> Codec {
    let static_size = raw.static_size();
    Codec(Arc::new(Inner {
        raw: Arc::new(raw),
        static_size,
        metadata: metadata.into_iter().collect(),
    }))
}

/// Returns a new codec with `metadata` prepended to the metadata of `codec`, the behavior is
/// unchanged
pub fn with_metadata(metadata: impl IntoIterator<Item = Metadata>, codec: &Codec) -> Codec {
    let Inner {
        raw,
        static_size,
        metadata: tail,
    } = &*codec.0;
    let mut entries: Vec<_> = metadata.into_iter().collect();
    entries.extend(tail.iter().cloned());
    Codec(Arc::new(Inner {
        raw: Arc::clone(raw),
        static_size: *static_size,
        metadata: entries,
    }))
}

/// Attaches documentation to `codec`
pub fn documented(text: &'static str, codec: &Codec) -> Codec {
    with_metadata([Metadata::docs(text)], codec)
}

impl Codec {
    #[must_use]
    pub fn static_size(&self) -> usize {
        self.0.static_size
    }

    #[must_use]
    pub fn metadata(&self) -> &[Metadata] {
        &self.0.metadata
    }

    /// Returns `true` if both handles refer to the same codec
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Writes `value` into `dst`
    #[inline]
    pub fn encode_into(&self, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        self.0.raw.encode(self, dst, value)
    }

    /// Reads a value from `src`
    #[inline]
    pub fn decode_from(&self, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        self.0.raw.decode(self, src)
    }

    /// Reads an object from `src`, inserting its fields into `fields`
    #[inline]
    pub fn decode_fields_into(
        &self,
        src: &mut DecodeBuffer<'_>,
        fields: &mut BTreeMap<String, Value>,
    ) -> Result<(), Error> {
        self.0.raw.decode_fields(self, src, fields)
    }

    /// Checks that `value` conforms to this codec
    pub fn assert(&self, value: &Value) -> Result<(), Error> {
        self.0.raw.assert(self, value)
    }

    /// Returns `false` if `value` does not conform to this codec, errors other than
    /// [Error::Assert] are propagated
    pub fn is(&self, value: &Value) -> Result<bool, Error> {
        match self.assert(value) {
            Ok(()) => Ok(true),
            Err(Error::Assert(..)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Encodes `value` into a new buffer, fails if the value contains async leaves
    #[instrument(level = "trace", skip_all, fields(size = self.static_size()))]
    pub fn encode(&self, value: &Value) -> Result<Bytes, Error> {
        let mut buf = EncodeBuffer::with_capacity(self.static_size());
        self.encode_into(&mut buf, value)?;
        buf.finish()
            .map_err(|err| Error::encode(self, value, err.to_string()))
    }

    /// Encodes `value` into a new buffer, waiting for all async leaves to settle
    #[instrument(level = "trace", skip_all, fields(size = self.static_size()))]
    pub async fn encode_async(&self, value: &Value) -> Result<Bytes, Error> {
        let mut buf = EncodeBuffer::with_capacity(self.static_size());
        self.encode_into(&mut buf, value)?;
        let pending = buf.async_count();
        let buf = buf.finish_async().await?;
        debug!(pending, len = buf.len(), "finished async encoding");
        Ok(buf)
    }

    /// Decodes a value from the start of `buf`, trailing bytes are ignored
    #[instrument(level = "trace", skip_all, fields(len = buf.len()))]
    pub fn decode(&self, buf: &[u8]) -> Result<Value, Error> {
        let mut src = DecodeBuffer::new(buf);
        self.decode_from(&mut src)
    }
}

impl PartialEq for Codec {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}
