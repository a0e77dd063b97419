// In: src/blocks/plain.rs

use std::cell::RefCell;

use log::debug;

use super::{read_block_header, BlockBuffer, BlockLayout, BlockSpan, BPV_SHIFT, MIN_VALUE_EQUALS_0};
use crate::direct::read_packed_at;
use crate::error::{PackedIntsError, Result};
use crate::format::{max_value, unsigned_bits_required, Format};
use crate::kernels::zigzag;
use crate::storage::{get_reader_no_header, NullReader};
use crate::store::{DataInput, DataOutput, IndexInput};
use crate::traits::Reader;

//==================================================================================
// 1. Writer
//==================================================================================

/// Writes blocks of values, each stored as its minimum plus the packed
/// distance of every value to that minimum.
///
/// Values may be any `i64`; a block spanning more than `i64::MAX` is stored
/// at 64 bits with a zero minimum.
#[derive(Debug)]
pub struct BlockPackedWriter<W> {
    buffer: BlockBuffer<W>,
}

impl<W: DataOutput> BlockPackedWriter<W> {
    /// `block_size` must be a power of two in `64..=1 << 27`.
    pub fn new(out: W, block_size: usize) -> Result<Self> {
        Ok(BlockPackedWriter {
            buffer: BlockBuffer::new(out, block_size)?,
        })
    }

    pub fn add(&mut self, value: i64) -> Result<()> {
        self.buffer.check_not_finished();
        if self.buffer.is_full() {
            self.flush()?;
        }
        self.buffer.push(value);
        Ok(())
    }

    /// Appends a whole block of zeros. Only valid at a block boundary.
    pub fn add_block_of_zeros(&mut self) -> Result<()> {
        self.buffer.check_not_finished();
        assert!(
            self.buffer.off == 0 || self.buffer.is_full(),
            "add_block_of_zeros called mid-block (off={})",
            self.buffer.off
        );
        if self.buffer.is_full() {
            self.flush()?;
        }
        let block_size = self.buffer.values.len();
        self.buffer.values.fill(0);
        self.buffer.off = block_size;
        self.buffer.ord += block_size as u64;
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
        debug_assert!(!values.is_empty());
        let (mut min, max) = values
            .iter()
            .fold((i64::MAX, i64::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        let delta = max.wrapping_sub(min);
        let bits_required = match delta {
            d if d < 0 => 64,
            0 => 0,
            d => unsigned_bits_required(d),
        };
        if bits_required == 64 {
            min = 0;
        } else if min > 0 {
            // Move the minimum towards zero while the residuals still fit.
            min = 0i64.max(max - max_value(bits_required) as i64);
        }

        let token = ((bits_required as u8) << BPV_SHIFT) | if min == 0 { MIN_VALUE_EQUALS_0 } else { 0 };
        self.buffer.out.write_byte(token)?;
        if min != 0 {
            self.buffer.out.write_block_vlong(zigzag::encode_val(min) - 1)?;
        }

        if bits_required > 0 {
            let buffer = &mut self.buffer;
            buffer.residuals.clear();
            buffer
                .residuals
                .extend(buffer.values[..buffer.off].iter().map(|&v| v.wrapping_sub(min) as u64));
            buffer.write_residuals(bits_required)?;
        }
        self.buffer.reset();
        Ok(())
    }
}

//==================================================================================
// 2. Memory-Resident Reader
//==================================================================================

/// Random access over a plain block-packed stream, fully loaded in memory.
pub struct BlockPackedReader {
    layout: BlockLayout,
    /// `None` when every block minimum is zero.
    min_values: Option<Vec<i64>>,
    sub_readers: Vec<Box<dyn Reader>>,
}

impl BlockPackedReader {
    /// Loads `value_count` values written with `block_size`. Leaves `input`
    /// after the last block.
    pub fn new<R: DataInput + ?Sized>(
        input: &mut R,
        packed_ints_version: u32,
        block_size: usize,
        value_count: u64,
    ) -> Result<Self> {
        let layout = BlockLayout::new(block_size, value_count)?;
        let num_blocks = layout.num_blocks()?;
        let mut min_values: Option<Vec<i64>> = None;
        let mut sub_readers: Vec<Box<dyn Reader>> = Vec::with_capacity(num_blocks);
        for block in 0..num_blocks {
            let (bits_per_value, min) = read_block_header(input)?;
            if min != 0 {
                min_values.get_or_insert_with(|| vec![0; num_blocks])[block] = min;
            }
            let size = layout.block_len(block);
            if bits_per_value == 0 {
                sub_readers.push(Box::new(NullReader::new(size)));
            } else {
                let reader = get_reader_no_header(input, Format::Packed, packed_ints_version, size, bits_per_value)?;
                sub_readers.push(Box::new(reader));
            }
        }
        debug!(
            "block packed reader: values={} blocks={} block_size={}",
            value_count, num_blocks, block_size
        );
        Ok(BlockPackedReader { layout, min_values, sub_readers })
    }

    pub fn get(&self, index: u64) -> i64 {
        let (block, idx) = self.layout.locate(index);
        let min = self.min_values.as_ref().map_or(0, |mins| mins[block]);
        min.wrapping_add(self.sub_readers[block].get(idx) as i64)
    }

    pub fn size(&self) -> u64 {
        self.layout.value_count
    }

    pub fn ram_bytes_used(&self) -> usize {
        let mins = self.min_values.as_ref().map_or(0, |m| std::mem::size_of_val(m.as_slice()));
        std::mem::size_of::<Self>() + mins + self.sub_readers.iter().map(|r| r.ram_bytes_used()).sum::<usize>()
    }
}

//==================================================================================
// 3. Storage-Backed Reader
//==================================================================================

/// Random access over a plain block-packed stream that keeps only the block
/// headers in memory and reads each residual from storage.
#[derive(Debug)]
pub struct DirectBlockPackedReader<R> {
    input: RefCell<R>,
    layout: BlockLayout,
    min_values: Vec<i64>,
    spans: Vec<BlockSpan>,
}

impl<R: IndexInput> DirectBlockPackedReader<R> {
    /// Reads the block headers of `value_count` values starting at the current
    /// position of `input`, skipping over the residual bytes.
    pub fn new(mut input: R, packed_ints_version: u32, block_size: usize, value_count: u64) -> Result<Self> {
        let layout = BlockLayout::new(block_size, value_count)?;
        let num_blocks = layout.num_blocks()?;
        let mut min_values = Vec::with_capacity(num_blocks);
        let mut spans = Vec::with_capacity(num_blocks);
        for block in 0..num_blocks {
            let (bits_per_value, min) = read_block_header(&mut input)?;
            min_values.push(min);
            let start = input.file_pointer()?;
            if bits_per_value > 0 {
                let size = layout.block_len(block) as u64;
                input.skip_bytes(Format::Packed.byte_count(packed_ints_version, size, bits_per_value))?;
            }
            spans.push(BlockSpan { start, bits_per_value });
        }
        debug!(
            "direct block packed reader: values={} blocks={} block_size={}",
            value_count, num_blocks, block_size
        );
        Ok(DirectBlockPackedReader {
            input: RefCell::new(input),
            layout,
            min_values,
            spans,
        })
    }

    pub fn get(&self, index: u64) -> Result<i64> {
        let (block, idx) = self.layout.locate(index);
        let span = self.spans[block];
        if span.bits_per_value == 0 {
            return Ok(self.min_values[block]);
        }
        let mut input = self.input.borrow_mut();
        let residual = read_packed_at(&mut *input, span.start, span.bits_per_value, idx as u64)
            .map_err(PackedIntsError::state)?;
        Ok(self.min_values[block].wrapping_add(residual as i64))
    }

    pub fn size(&self) -> u64 {
        self.layout.value_count
    }

    /// Only the per-block headers are resident.
    pub fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>()
            + std::mem::size_of_val(self.min_values.as_slice())
            + std::mem::size_of_val(self.spans.as_slice())
    }

    pub fn into_inner(self) -> R {
        self.input.into_inner()
    }
}
