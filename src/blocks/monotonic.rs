// In: src/blocks/monotonic.rs

//! Block compression for sequences that grow roughly linearly, such as file
//! offsets or cumulative lengths.
//!
//! Each block fits the line through its first and last value, then stores the
//! zigzag-encoded distance of every value to that line. The slope is an `f32`
//! and every product `slope * i` is computed in `f32` and truncated; readers
//! must repeat exactly that arithmetic to reproduce the values.

use std::cell::RefCell;

use log::debug;

use super::{read_monotonic_header, BlockBuffer, BlockLayout, BlockSpan};
use crate::direct::read_packed_at;
use crate::error::{PackedIntsError, Result};
use crate::format::{bits_required, Format};
use crate::kernels::zigzag;
use crate::storage::{get_reader_no_header, NullReader};
use crate::store::{DataInput, DataOutput, IndexInput};
use crate::traits::Reader;

/// Expected value at offset `index` of a block with intercept `min` and slope `avg`.
#[inline]
fn trend(min: i64, avg: f32, index: usize) -> i64 {
    min.wrapping_add((index as f32 * avg) as i64)
}

//==================================================================================
// 1. Writer
//==================================================================================

/// Writes non-negative values in blocks of `(intercept, slope, residuals)`.
#[derive(Debug)]
pub struct MonotonicBlockPackedWriter<W> {
    buffer: BlockBuffer<W>,
    deltas: Vec<i64>,
}

impl<W: DataOutput> MonotonicBlockPackedWriter<W> {
    /// `block_size` must be a power of two in `64..=1 << 27`.
    pub fn new(out: W, block_size: usize) -> Result<Self> {
        Ok(MonotonicBlockPackedWriter {
            buffer: BlockBuffer::new(out, block_size)?,
            deltas: Vec::with_capacity(block_size),
        })
    }

    /// Appends `value`, which must be non-negative.
    pub fn add(&mut self, value: i64) -> Result<()> {
        assert!(value >= 0, "monotonic values must be non-negative, got {}", value);
        self.buffer.check_not_finished();
        if self.buffer.is_full() {
            self.flush()?;
        }
        self.buffer.push(value);
        Ok(())
    }

    /// Flushes the pending partial block. No value may be added afterwards.
    pub fn finish(&mut self) -> Result<()> {
        self.buffer.check_not_finished();
        if self.buffer.off > 0 {
            self.flush()?;
        }
        self.buffer.finished = true;
        Ok(())
    }

    /// Number of values added so far.
    pub fn ord(&self) -> u64 {
        self.buffer.ord
    }

    pub fn into_inner(self) -> W {
        self.buffer.out
    }

    fn flush(&mut self) -> Result<()> {
        let values = self.buffer.pending();
        let off = values.len();
        debug_assert!(off > 0);
        let min = values[0];
        let avg = if off == 1 {
            0.0f32
        } else {
            (values[off - 1] - min) as f32 / (off - 1) as f32
        };

        self.deltas.clear();
        self.deltas.extend(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| v.wrapping_sub(trend(min, avg, i))),
        );
        zigzag::encode_into(&self.deltas, &mut self.buffer.residuals);
        let max_zigzag = self.buffer.residuals.iter().copied().max().unwrap_or(0);

        self.buffer.out.write_vlong(min as u64)?;
        self.buffer.out.write_int(avg.to_bits())?;
        if max_zigzag == 0 {
            self.buffer.out.write_vint(0)?;
        } else {
            let bits = bits_required(max_zigzag);
            self.buffer.out.write_vint(bits)?;
            self.buffer.write_residuals(bits)?;
        }
        self.buffer.reset();
        Ok(())
    }
}

//==================================================================================
// 2. Memory-Resident Reader
//==================================================================================

/// Random access over a monotonic block-packed stream, fully loaded in memory.
pub struct MonotonicBlockPackedReader {
    layout: BlockLayout,
    min_values: Vec<i64>,
    averages: Vec<f32>,
    sub_readers: Vec<Box<dyn Reader>>,
}

impl MonotonicBlockPackedReader {
    pub fn new<R: DataInput + ?Sized>(
        input: &mut R,
        packed_ints_version: u32,
        block_size: usize,
        value_count: u64,
    ) -> Result<Self> {
        let layout = BlockLayout::new(block_size, value_count)?;
        let num_blocks = layout.num_blocks()?;
        let mut min_values = Vec::with_capacity(num_blocks);
        let mut averages = Vec::with_capacity(num_blocks);
        let mut sub_readers: Vec<Box<dyn Reader>> = Vec::with_capacity(num_blocks);
        for block in 0..num_blocks {
            let (min, avg, bits_per_value) = read_monotonic_header(input)?;
            min_values.push(min);
            averages.push(avg);
            let size = layout.block_len(block);
            if bits_per_value == 0 {
                sub_readers.push(Box::new(NullReader::new(size)));
            } else {
                let reader = get_reader_no_header(input, Format::Packed, packed_ints_version, size, bits_per_value)?;
                sub_readers.push(Box::new(reader));
            }
        }
        debug!("monotonic block reader: values={} blocks={}", value_count, num_blocks);
        Ok(MonotonicBlockPackedReader {
            layout,
            min_values,
            averages,
            sub_readers,
        })
    }

    pub fn get(&self, index: u64) -> i64 {
        let (block, idx) = self.layout.locate(index);
        let residual: i64 = zigzag::decode_val(self.sub_readers[block].get(idx));
        trend(self.min_values[block], self.averages[block], idx).wrapping_add(residual)
    }

    pub fn size(&self) -> u64 {
        self.layout.value_count
    }

    pub fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>()
            + std::mem::size_of_val(self.min_values.as_slice())
            + std::mem::size_of_val(self.averages.as_slice())
            + self.sub_readers.iter().map(|r| r.ram_bytes_used()).sum::<usize>()
    }
}

//==================================================================================
// 3. Storage-Backed Reader
//==================================================================================

/// Monotonic reader that keeps only block headers resident and reads every
/// residual from storage.
#[derive(Debug)]
pub struct DirectMonotonicBlockPackedReader<R> {
    input: RefCell<R>,
    layout: BlockLayout,
    min_values: Vec<i64>,
    averages: Vec<f32>,
    spans: Vec<BlockSpan>,
}

impl<R: IndexInput> DirectMonotonicBlockPackedReader<R> {
    pub fn new(mut input: R, packed_ints_version: u32, block_size: usize, value_count: u64) -> Result<Self> {
        let layout = BlockLayout::new(block_size, value_count)?;
        let num_blocks = layout.num_blocks()?;
        let mut min_values = Vec::with_capacity(num_blocks);
        let mut averages = Vec::with_capacity(num_blocks);
        let mut spans = Vec::with_capacity(num_blocks);
        for block in 0..num_blocks {
            let (min, avg, bits_per_value) = read_monotonic_header(&mut input)?;
            min_values.push(min);
            averages.push(avg);
            let start = input.file_pointer()?;
            if bits_per_value > 0 {
                let size = layout.block_len(block) as u64;
                input.skip_bytes(Format::Packed.byte_count(packed_ints_version, size, bits_per_value))?;
            }
            spans.push(BlockSpan { start, bits_per_value });
        }
        debug!("direct monotonic block reader: values={} blocks={}", value_count, num_blocks);
        Ok(DirectMonotonicBlockPackedReader {
            input: RefCell::new(input),
            layout,
            min_values,
            averages,
            spans,
        })
    }

    pub fn get(&self, index: u64) -> Result<i64> {
        let (block, idx) = self.layout.locate(index);
        let span = self.spans[block];
        let expected = trend(self.min_values[block], self.averages[block], idx);
        if span.bits_per_value == 0 {
            return Ok(expected);
        }
        let mut input = self.input.borrow_mut();
        let raw = read_packed_at(&mut *input, span.start, span.bits_per_value, idx as u64)
            .map_err(PackedIntsError::state)?;
        let residual: i64 = zigzag::decode_val(raw);
        Ok(expected.wrapping_add(residual))
    }

    pub fn size(&self) -> u64 {
        self.layout.value_count
    }

    pub fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>()
            + std::mem::size_of_val(self.min_values.as_slice())
            + std::mem::size_of_val(self.averages.as_slice())
            + std::mem::size_of_val(self.spans.as_slice())
    }

    pub fn into_inner(self) -> R {
        self.input.into_inner()
    }
}
