// In: src/blocks/iterator.rs

use log::trace;

use super::{check_bits, read_block_header, BPV_SHIFT, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, MIN_VALUE_EQUALS_0};
use crate::error::{PackedIntsError, Result};
use crate::format::{check_block_size, Format};
use crate::kernels::bulk::BulkOperation;
use crate::store::DataInput;

/// Sequential decoder for plain block-packed streams.
///
/// Decodes one block at a time into an internal buffer. [`skip`] jumps over
/// whole blocks by reading only their headers.
///
/// [`skip`]: BlockPackedReaderIterator::skip
#[derive(Debug)]
pub struct BlockPackedReaderIterator<R> {
    input: R,
    packed_ints_version: u32,
    value_count: u64,
    block_size: usize,
    values: Vec<i64>,
    residuals: Vec<u64>,
    blocks: Vec<u8>,
    off: usize,
    ord: u64,
}

impl<R: DataInput> BlockPackedReaderIterator<R> {
    pub fn new(input: R, packed_ints_version: u32, block_size: usize, value_count: u64) -> Result<Self> {
        check_block_size(block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE)?;
        Ok(BlockPackedReaderIterator {
            input,
            packed_ints_version,
            value_count,
            block_size,
            values: vec![0; block_size],
            residuals: vec![0; block_size],
            blocks: Vec::new(),
            off: block_size,
            ord: 0,
        })
    }

    /// Points the iterator at a new stream of `value_count` values and returns
    /// the previous one.
    pub fn reset(&mut self, input: R, value_count: u64) -> R {
        self.value_count = value_count;
        self.off = self.block_size;
        self.ord = 0;
        std::mem::replace(&mut self.input, input)
    }

    /// Skips `count` values. Whole blocks are skipped without decoding.
    pub fn skip(&mut self, mut count: u64) -> Result<()> {
        match self.ord.checked_add(count) {
            Some(end) if end <= self.value_count => {}
            _ => return Err(PackedIntsError::EndOfStream),
        }

        // 1. Values already decoded.
        let skip_buffer = count.min((self.block_size - self.off) as u64);
        self.off += skip_buffer as usize;
        self.ord += skip_buffer;
        count -= skip_buffer;
        if count == 0 {
            return Ok(());
        }

        // 2. Whole blocks.
        debug_assert_eq!(self.off, self.block_size);
        while count >= self.block_size as u64 {
            let token = self.input.read_byte()?;
            let bits_per_value = check_bits(u32::from(token) >> BPV_SHIFT)?;
            if token & MIN_VALUE_EQUALS_0 == 0 {
                self.input.read_block_vlong()?;
            }
            let block_bytes =
                Format::Packed.byte_count(self.packed_ints_version, self.block_size as u64, bits_per_value);
            self.input.skip_bytes(block_bytes)?;
            self.ord += self.block_size as u64;
            count -= self.block_size as u64;
        }
        if count == 0 {
            return Ok(());
        }

        // 3. Into the next block.
        debug_assert!(count < self.block_size as u64);
        self.refill()?;
        self.ord += count;
        self.off += count as usize;
        Ok(())
    }

    pub fn next_value(&mut self) -> Result<i64> {
        if self.ord == self.value_count {
            return Err(PackedIntsError::EndOfStream);
        }
        if self.off == self.block_size {
            self.refill()?;
        }
        let value = self.values[self.off];
        self.off += 1;
        self.ord += 1;
        Ok(value)
    }

    /// Returns at most `count` values, never crossing a block boundary.
    pub fn next_batch(&mut self, count: usize) -> Result<&[i64]> {
        assert!(count > 0, "count must be > 0");
        if self.ord == self.value_count {
            return Err(PackedIntsError::EndOfStream);
        }
        if self.off == self.block_size {
            self.refill()?;
        }
        let count = count
            .min(self.block_size - self.off)
            .min((self.value_count - self.ord) as usize);
        let start = self.off;
        self.off += count;
        self.ord += count as u64;
        Ok(&self.values[start..start + count])
    }

    /// Number of values consumed so far.
    pub fn ord(&self) -> u64 {
        self.ord
    }

    pub fn into_inner(self) -> R {
        self.input
    }

    fn refill(&mut self) -> Result<()> {
        let (bits_per_value, min) = read_block_header(&mut self.input)?;
        if bits_per_value == 0 {
            self.values.fill(min);
        } else {
            let decoder = BulkOperation::of(Format::Packed, bits_per_value)?;
            let iterations = self.block_size / decoder.byte_value_count();
            let blocks_size = iterations * decoder.byte_block_count();
            self.blocks.resize(blocks_size, 0);
            let value_count = (self.value_count - self.ord).min(self.block_size as u64);
            let blocks_count =
                Format::Packed.byte_count(self.packed_ints_version, value_count, bits_per_value) as usize;
            self.input.read_bytes(&mut self.blocks[..blocks_count])?;
            self.blocks[blocks_count..].fill(0);
            decoder.decode_bytes(&self.blocks, &mut self.residuals, iterations);
            for (value, &residual) in self.values.iter_mut().zip(&self.residuals) {
                *value = min.wrapping_add(residual as i64);
            }
        }
        trace!("block iterator refill: ord={} bits={} min={}", self.ord, bits_per_value, min);
        self.off = 0;
        Ok(())
    }
}
