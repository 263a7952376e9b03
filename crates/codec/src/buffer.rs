use core::future::Future;

use bytes::{BufMut as _, Bytes, BytesMut};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt as _;
use tracing::{instrument, trace};

use crate::{Codec, Error};

/// Bytes of an async leaf, spliced into the output at `offset` once produced
struct AsyncSlot {
    offset: usize,
    bytes: BoxFuture<'static, Result<Bytes, Error>>,
}

/// Growable output buffer driving a single encode call
///
/// Async leaves do not write into the buffer directly. Instead, they reserve a zero-length slot
/// at the current cursor, which is filled in by [EncodeBuffer::finish_async]. Slots are spliced in
/// the order in which they were reserved, so the final byte layout does not depend on the order
/// in which the leaves settle.
pub struct EncodeBuffer {
    buf: BytesMut,
    slots: Vec<AsyncSlot>,
}

impl EncodeBuffer {
    /// Constructs a new buffer with `capacity` bytes preallocated
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            slots: Vec::default(),
        }
    }

    /// Current cursor position, async slots not included
    #[must_use]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Number of async slots awaiting their bytes
    #[must_use]
    pub fn async_count(&self) -> usize {
        self.slots.len()
    }

    /// Ensures that at least `additional` bytes can be written without reallocation
    ///
    /// Capacity at least doubles on growth, previously written bytes are preserved.
    pub fn reserve(&mut self, additional: usize) {
        let len = self.buf.len();
        let cap = self.buf.capacity();
        if cap - len >= additional {
            return;
        }
        let target = (len + additional).max(cap.saturating_mul(2));
        trace!(len, cap, target, "growing encode buffer");
        self.buf.reserve(target - len);
    }

    pub fn put_u8(&mut self, b: u8) {
        self.reserve(1);
        self.buf.put_u8(b);
    }

    /// Appends `bytes` at the cursor as a single write
    pub fn insert_array(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.buf.put_slice(bytes);
    }

    /// Reserves an async slot at the current cursor, which will be filled by the bytes `fut`
    /// resolves to
    pub fn write_async<F>(&mut self, fut: F)
    where
        F: Future<Output = Result<Bytes, Error>> + Send + 'static,
    {
        let offset = self.buf.len();
        trace!(offset, pending = self.slots.len() + 1, "reserving async slot");
        self.slots.push(AsyncSlot {
            offset,
            bytes: fut.boxed(),
        });
    }

    /// Returns the encoded bytes, fails if any async slots remain unfilled
    pub fn finish(self) -> std::io::Result<Bytes> {
        if !self.slots.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "value contains pending asynchronous values and cannot be finished synchronously",
            ));
        }
        Ok(self.buf.freeze())
    }

    /// Waits for all async slots, regardless of completion order, and returns the encoded bytes
    ///
    /// If any async leaf fails, the whole buffer is discarded.
    #[instrument(level = "trace", skip_all, fields(len = self.buf.len(), pending = self.slots.len()))]
    pub async fn finish_async(self) -> Result<Bytes, Error> {
        let Self { buf, slots } = self;
        if slots.is_empty() {
            return Ok(buf.freeze());
        }
        let (offsets, futs): (Vec<_>, Vec<_>) = slots
            .into_iter()
            .map(|AsyncSlot { offset, bytes }| (offset, bytes))
            .unzip();
        let chunks = try_join_all(futs).await?;
        let len = buf.len() + chunks.iter().map(Bytes::len).sum::<usize>();
        let mut out = BytesMut::with_capacity(len);
        let mut prev = 0;
        for (offset, chunk) in offsets.into_iter().zip(chunks) {
            trace!(offset, len = chunk.len(), "splicing async slot");
            out.put_slice(&buf[prev..offset]);
            out.put_slice(&chunk);
            prev = offset;
        }
        out.put_slice(&buf[prev..]);
        Ok(out.freeze())
    }
}

/// Bounds-checked read cursor over an input byte slice
#[derive(Clone, Copy, Debug)]
pub struct DecodeBuffer<'a> {
    buf: &'a [u8],
    index: usize,
}

impl<'a> DecodeBuffer<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, index: 0 }
    }

    /// Current cursor position
    #[must_use]
    pub fn position(&self) -> usize {
        self.index
    }

    /// Total length of the input
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of bytes left to read
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.index)
    }

    /// Reads exactly `n` bytes, failing on behalf of `codec` if the input ends early
    pub fn read_slice(&mut self, codec: &Codec, n: usize) -> Result<&'a [u8], Error> {
        let start = self.index;
        let end = start
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| Error::out_of_bounds(codec, start..start.saturating_add(n), self.buf.len()))?;
        self.index = end;
        Ok(&self.buf[start..end])
    }

    /// Reads a fixed-size byte array
    pub fn read_array<const N: usize>(&mut self, codec: &Codec) -> Result<[u8; N], Error> {
        let bytes = self.read_slice(codec, N)?;
        let mut out = [0; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self, codec: &Codec) -> Result<u8, Error> {
        let [b] = self.read_array(codec)?;
        Ok(b)
    }

    /// Constructs a [Error::Decode] at the current cursor position
    pub fn error(&self, codec: &Codec, message: impl Into<String>) -> Error {
        Error::decode(codec, self.index, self.buf.len(), message)
    }
}
