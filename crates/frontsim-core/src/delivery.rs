//! Delivery Pipeline
//!
//! Applies simulated loss, coalesces accepted records into a bounded buffer
//! and writes it to the transport. Records are never split across writes:
//! a record that would overflow the buffer forces a flush first, and a record
//! larger than the whole buffer bypasses it.

use crate::distribution::chance;
use crate::error::DeliveryError;
use crate::sample::Sample;
use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Default OutputBuffer capacity in bytes.
pub const OUT_BUFFER_SIZE: usize = 8192;

/// Fixed-capacity byte accumulator.
#[derive(Debug)]
pub struct OutputBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl OutputBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `n` more bytes fit without exceeding capacity.
    pub fn fits(&self, n: usize) -> bool {
        self.buf.len() + n <= self.capacity
    }

    pub fn append(&mut self, record: &[u8]) {
        self.buf.put_slice(record);
    }

    /// Detach the buffered bytes, leaving the buffer empty.
    pub fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

/// Result of offering one sample to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    Sent,
    Dropped,
}

/// Serializes, drops, buffers and writes records to a single peer.
pub struct DeliveryPipeline<W> {
    writer: W,
    buffer: OutputBuffer,
    drop_rate: f64,
    scratch: BytesMut,
    bytes_written: u64,
}

impl<W: AsyncWrite + Unpin> DeliveryPipeline<W> {
    pub fn new(writer: W, drop_rate: f64) -> Self {
        Self::with_capacity(writer, drop_rate, OUT_BUFFER_SIZE)
    }

    pub fn with_capacity(writer: W, drop_rate: f64, capacity: usize) -> Self {
        Self {
            writer,
            buffer: OutputBuffer::new(capacity),
            drop_rate: drop_rate.clamp(0.0, 1.0),
            scratch: BytesMut::with_capacity(256),
            bytes_written: 0,
        }
    }

    /// Bytes currently waiting in the buffer.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes acknowledged by the transport so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Decide loss (one uniform draw), then serialize and queue the record.
    pub async fn emit<R: Rng + ?Sized>(
        &mut self,
        sample: &Sample,
        rng: &mut R,
    ) -> Result<EmitOutcome, DeliveryError> {
        if chance(rng, self.drop_rate) {
            return Ok(EmitOutcome::Dropped);
        }
        self.scratch.clear();
        sample.write_line((&mut self.scratch).writer())?;
        let record = self.scratch.split().freeze();
        self.push_record(&record).await?;
        Ok(EmitOutcome::Sent)
    }

    /// Queue one complete record, flushing as needed to keep it whole.
    pub async fn push_record(&mut self, record: &[u8]) -> Result<(), DeliveryError> {
        if record.len() > self.buffer.capacity() {
            self.flush().await?;
            self.write_through(record).await?;
        } else {
            if !self.buffer.fits(record.len()) {
                self.flush().await?;
            }
            self.buffer.append(record);
        }
        Ok(())
    }

    /// Write everything buffered and wait for the transport to accept it.
    ///
    /// The buffer is emptied even when the write fails.
    pub async fn flush(&mut self) -> Result<(), DeliveryError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = self.buffer.take();
        self.write_through(&chunk).await
    }

    async fn write_through(&mut self, bytes: &[u8]) -> Result<(), DeliveryError> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Records each write call separately.
    #[derive(Default)]
    struct ChunkWriter {
        chunks: Vec<Vec<u8>>,
    }

    impl AsyncWrite for ChunkWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.chunks.push(buf.to_vec());
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn record(tag: usize, len: usize) -> Vec<u8> {
        let mut r = format!("{}:", tag).into_bytes();
        r.resize(len - 1, b'x');
        r.push(b'\n');
        r
    }

    #[tokio::test]
    async fn test_buffer_coalesces_until_full() {
        let mut pipeline = DeliveryPipeline::with_capacity(ChunkWriter::default(), 0.0, 100);
        for i in 0..3 {
            pipeline.push_record(&record(i, 30)).await.unwrap();
        }
        assert_eq!(pipeline.pending(), 90);
        assert!(pipeline.get_ref().chunks.is_empty());

        // 90 + 30 > 100: flush first, then buffer.
        pipeline.push_record(&record(3, 30)).await.unwrap();
        assert_eq!(pipeline.get_ref().chunks.len(), 1);
        assert_eq!(pipeline.get_ref().chunks[0].len(), 90);
        assert_eq!(pipeline.pending(), 30);
    }

    #[tokio::test]
    async fn test_oversized_record_bypasses_buffer() {
        let mut pipeline = DeliveryPipeline::with_capacity(ChunkWriter::default(), 0.0, 50);
        let small = record(0, 20);
        let big = record(1, 120);
        pipeline.push_record(&small).await.unwrap();
        pipeline.push_record(&big).await.unwrap();
        let chunks = &pipeline.get_ref().chunks;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], small);
        assert_eq!(chunks[1], big);
        assert_eq!(pipeline.pending(), 0);
    }

    #[tokio::test]
    async fn test_concatenation_preserves_records_in_order() {
        let sizes = [10, 45, 3, 80, 50, 7, 120, 64, 50, 33, 200, 2, 99, 100];
        let mut pipeline = DeliveryPipeline::with_capacity(ChunkWriter::default(), 0.0, 100);
        let mut expected = Vec::new();
        for (i, &len) in sizes.iter().enumerate() {
            let r = record(i, len.max(4));
            expected.extend_from_slice(&r);
            pipeline.push_record(&r).await.unwrap();
        }
        pipeline.flush().await.unwrap();

        let writer = pipeline.into_inner();
        for chunk in &writer.chunks {
            assert_eq!(chunk.last(), Some(&b'\n'), "chunk split a record");
        }
        let joined: Vec<u8> = writer.chunks.concat();
        assert_eq!(joined, expected);
    }

    #[tokio::test]
    async fn test_drop_rate_one_sends_nothing() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut pipeline = DeliveryPipeline::new(Vec::new(), 1.0);
        let sample = Sample {
            timestamp_us: 0,
            channel: 0,
            adc_x: 1,
            adc_gtop: 2,
            adc_gbot: 3,
            trg_x: false,
            trg_g: false,
            no_data: false,
            is_g_event: false,
        };
        for _ in 0..100 {
            assert_eq!(
                pipeline.emit(&sample, &mut rng).await.unwrap(),
                EmitOutcome::Dropped
            );
        }
        pipeline.flush().await.unwrap();
        assert!(pipeline.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_emit_writes_wire_record_on_flush() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut pipeline = DeliveryPipeline::new(Vec::new(), 0.0);
        let sample = Sample {
            timestamp_us: 5_000,
            channel: 1,
            adc_x: 10,
            adc_gtop: 20,
            adc_gbot: 30,
            trg_x: true,
            trg_g: false,
            no_data: false,
            is_g_event: true,
        };
        assert_eq!(pipeline.emit(&sample, &mut rng).await.unwrap(), EmitOutcome::Sent);
        assert!(pipeline.get_ref().is_empty());
        pipeline.flush().await.unwrap();
        assert_eq!(pipeline.bytes_written(), sample.to_line().unwrap().len() as u64);
        assert_eq!(pipeline.into_inner(), sample.to_line().unwrap());
    }

    #[tokio::test]
    async fn test_transport_error_surfaces_and_clears_buffer() {
        let mut pipeline = DeliveryPipeline::with_capacity(BrokenWriter, 0.0, 64);
        pipeline.push_record(&record(0, 40)).await.unwrap();
        let err = pipeline.push_record(&record(1, 40)).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
        assert_eq!(pipeline.pending(), 0);
        assert!(pipeline.flush().await.is_ok());
    }
}
