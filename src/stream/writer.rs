// In: src/stream/writer.rs

use log::trace;

use crate::error::{PackedIntsError, Result};
use crate::format::{Format, VERSION_CURRENT};
use crate::kernels::bulk::BulkOperation;
use crate::storage::Header;
use crate::store::DataOutput;

/// Buffers values and writes them to a byte stream one iteration batch at a
/// time through the bulk kernel for its format and width.
///
/// The value count may be left open (`None`), in which case `finish` writes
/// whatever was added, padded to a whole byte.
#[derive(Debug)]
pub struct PackedWriter<W> {
    out: W,
    format: Format,
    value_count: Option<usize>,
    bits_per_value: u32,
    operation: &'static BulkOperation,
    next_blocks: Vec<u8>,
    next_values: Vec<u64>,
    iterations: usize,
    off: usize,
    written: usize,
    finished: bool,
}

impl<W: DataOutput> PackedWriter<W> {
    pub fn new(
        out: W,
        format: Format,
        value_count: Option<usize>,
        bits_per_value: u32,
        buffer_size_bytes: usize,
    ) -> Result<Self> {
        let operation = BulkOperation::of(format, bits_per_value)?;
        let iterations = operation.compute_iterations(value_count.unwrap_or(usize::MAX), buffer_size_bytes);
        Ok(PackedWriter {
            out,
            format,
            value_count,
            bits_per_value,
            operation,
            next_blocks: vec![0; iterations * operation.byte_block_count()],
            next_values: vec![0; iterations * operation.byte_value_count()],
            iterations,
            off: 0,
            written: 0,
            finished: false,
        })
    }

    /// Writes the header describing this stream. Only valid for writers with a
    /// declared value count, before any value is added.
    pub fn write_header(&mut self) -> Result<()> {
        let value_count = self
            .value_count
            .ok_or_else(|| PackedIntsError::InvalidConfig("cannot write a header without a value count".into()))?;
        debug_assert_eq!(self.written, 0);
        Header {
            format: self.format,
            value_count,
            bits_per_value: self.bits_per_value,
            version: VERSION_CURRENT,
        }
        .write(&mut self.out)
    }

    pub fn add(&mut self, value: u64) -> Result<()> {
        assert!(!self.finished, "add called after finish");
        debug_assert!(
            self.bits_per_value == 64 || value >> self.bits_per_value == 0,
            "value {} does not fit in {} bits",
            value,
            self.bits_per_value
        );
        if let Some(value_count) = self.value_count {
            if self.written >= value_count {
                return Err(PackedIntsError::WritePastEnd { value_count });
            }
        }
        self.next_values[self.off] = value;
        self.off += 1;
        if self.off == self.next_values.len() {
            self.flush()?;
        }
        self.written += 1;
        Ok(())
    }

    /// Pads with zeros up to the declared value count and flushes.
    pub fn finish(&mut self) -> Result<()> {
        assert!(!self.finished, "finish called twice");
        if let Some(value_count) = self.value_count {
            while self.written < value_count {
                self.add(0)?;
            }
        }
        self.flush()?;
        self.finished = true;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.operation
            .encode_bytes(&self.next_values, &mut self.next_blocks, self.iterations);
        let block_count = self
            .format
            .byte_count(VERSION_CURRENT, self.off as u64, self.bits_per_value) as usize;
        trace!("packed writer flush: values={} bytes={}", self.off, block_count);
        // Reset before writing so a failed write drops the batch instead of
        // leaving `off` past the end of the buffer.
        self.next_values.fill(0);
        self.off = 0;
        self.out.write_bytes(&self.next_blocks[..block_count])?;
        Ok(())
    }

    /// Index of the last value added, or `None` before the first one.
    pub fn ord(&self) -> Option<usize> {
        self.written.checked_sub(1)
    }

    pub fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
