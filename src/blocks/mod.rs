// In: src/blocks/mod.rs

//! Block-structured compression for long sequences of 64-bit values.
//!
//! Values are cut into blocks of a fixed power-of-two size. Each block stores a
//! small baseline (the block minimum, or an intercept and slope for monotonic
//! sequences) followed by the residuals packed at the narrowest width that
//! holds them. A block whose residuals are all zero stores no residual bytes.
//!
//! Plain block layout:
//!
//! ```text
//! [token: u8 = (bits << 1) | min_is_zero][block vlong zigzag(min) - 1]?[residuals]
//! ```
//!
//! Monotonic block layout:
//!
//! ```text
//! [vlong min][int f32 bits of avg][vint bits][residuals]
//! ```

use log::trace;

use crate::error::{PackedIntsError, Result};
use crate::format::{check_block_size, Format, VERSION_CURRENT};
use crate::kernels::bulk::BulkOperation;
use crate::kernels::zigzag;
use crate::store::{DataInput, DataOutput, IndexInput};

mod iterator;
mod monotonic;
mod plain;

pub use iterator::BlockPackedReaderIterator;
pub use monotonic::{DirectMonotonicBlockPackedReader, MonotonicBlockPackedReader, MonotonicBlockPackedWriter};
pub use plain::{BlockPackedReader, BlockPackedWriter, DirectBlockPackedReader};

pub const MIN_BLOCK_SIZE: usize = 64;
pub const MAX_BLOCK_SIZE: usize = 1 << 27;

const MIN_VALUE_EQUALS_0: u8 = 1;
const BPV_SHIFT: u32 = 1;

//==================================================================================
// 1. Block Headers
//==================================================================================

fn check_bits(bits_per_value: u32) -> Result<u32> {
    if bits_per_value > 64 {
        return Err(PackedIntsError::Corrupted(format!(
            "block declares {} bits per value",
            bits_per_value
        )));
    }
    Ok(bits_per_value)
}

/// Reads a plain block's token and minimum, returning `(bits_per_value, min)`.
fn read_block_header<R: DataInput + ?Sized>(input: &mut R) -> Result<(u32, i64)> {
    let token = input.read_byte()?;
    let bits_per_value = check_bits(u32::from(token) >> BPV_SHIFT)?;
    let min = if token & MIN_VALUE_EQUALS_0 == 0 {
        zigzag::decode_val(input.read_block_vlong()?.wrapping_add(1))
    } else {
        0
    };
    Ok((bits_per_value, min))
}

/// Reads a monotonic block's header, returning `(min, avg, bits_per_value)`.
fn read_monotonic_header<R: DataInput + ?Sized>(input: &mut R) -> Result<(i64, f32, u32)> {
    let min = input.read_vlong()? as i64;
    let avg = f32::from_bits(input.read_int()?);
    let bits_per_value = check_bits(input.read_vint()?)?;
    Ok((min, avg, bits_per_value))
}

/// Shape shared by the block readers: how a global index splits into a block
/// number and an offset inside that block.
#[derive(Debug, Clone, Copy)]
struct BlockLayout {
    block_shift: u32,
    block_mask: u64,
    block_size: usize,
    value_count: u64,
}

impl BlockLayout {
    fn new(block_size: usize, value_count: u64) -> Result<Self> {
        let block_shift = check_block_size(block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE)?;
        Ok(BlockLayout {
            block_shift,
            block_mask: block_size as u64 - 1,
            block_size,
            value_count,
        })
    }

    fn num_blocks(&self) -> Result<usize> {
        crate::format::num_blocks(self.value_count, self.block_size)
    }

    /// Number of values held by block `block`; only the last one may be short.
    fn block_len(&self, block: usize) -> usize {
        let start = block as u64 * self.block_size as u64;
        (self.value_count - start).min(self.block_size as u64) as usize
    }

    #[inline]
    fn locate(&self, index: u64) -> (usize, usize) {
        assert!(index < self.value_count, "index out of bounds: {} >= {}", index, self.value_count);
        ((index >> self.block_shift) as usize, (index & self.block_mask) as usize)
    }
}

/// Where a block's residuals start on the stream and how wide they are.
#[derive(Debug, Clone, Copy)]
struct BlockSpan {
    start: u64,
    bits_per_value: u32,
}

//==================================================================================
// 2. Writer Buffering
//==================================================================================

/// Buffers one block of values for the block writers and packs its residuals.
#[derive(Debug)]
struct BlockBuffer<W> {
    out: W,
    values: Vec<i64>,
    residuals: Vec<u64>,
    blocks: Vec<u8>,
    off: usize,
    ord: u64,
    finished: bool,
}

impl<W: DataOutput> BlockBuffer<W> {
    fn new(out: W, block_size: usize) -> Result<Self> {
        check_block_size(block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE)?;
        Ok(BlockBuffer {
            out,
            values: vec![0; block_size],
            residuals: Vec::with_capacity(block_size),
            blocks: Vec::new(),
            off: 0,
            ord: 0,
            finished: false,
        })
    }

    fn check_not_finished(&self) {
        assert!(!self.finished, "already finished");
    }

    fn is_full(&self) -> bool {
        self.off == self.values.len()
    }

    fn push(&mut self, value: i64) {
        self.values[self.off] = value;
        self.off += 1;
        self.ord += 1;
    }

    fn pending(&self) -> &[i64] {
        &self.values[..self.off]
    }

    /// Packs `residuals` (one per pending value) at `bits_per_value` bits and
    /// writes only the bytes the pending values need.
    fn write_residuals(&mut self, bits_per_value: u32) -> Result<()> {
        debug_assert_eq!(self.residuals.len(), self.off);
        let operation = BulkOperation::of(Format::Packed, bits_per_value)?;
        let block_size = self.values.len();
        self.residuals.resize(block_size, 0);
        let iterations = block_size / operation.byte_value_count();
        self.blocks.resize(iterations * operation.byte_block_count(), 0);
        operation.encode_bytes(&self.residuals, &mut self.blocks, iterations);
        let byte_count = Format::Packed.byte_count(VERSION_CURRENT, self.off as u64, bits_per_value) as usize;
        trace!(
            "block flush: values={} bits={} bytes={}",
            self.off,
            bits_per_value,
            byte_count
        );
        self.out.write_bytes(&self.blocks[..byte_count])?;
        Ok(())
    }

    fn reset(&mut self) {
        self.off = 0;
        self.residuals.clear();
    }
}

//==================================================================================
// 3. Reader Selection
//==================================================================================

/// A plain block reader that is either fully resident or storage-backed.
pub enum BlockReader<R> {
    Resident(BlockPackedReader),
    Direct(DirectBlockPackedReader<R>),
}

impl<R: IndexInput> BlockReader<R> {
    /// Opens `value_count` values at the current position of `input`. With
    /// `direct`, only block headers are loaded and `input` is kept for reads.
    pub fn open(
        mut input: R,
        packed_ints_version: u32,
        block_size: usize,
        value_count: u64,
        direct: bool,
    ) -> Result<Self> {
        if direct {
            DirectBlockPackedReader::new(input, packed_ints_version, block_size, value_count).map(BlockReader::Direct)
        } else {
            BlockPackedReader::new(&mut input, packed_ints_version, block_size, value_count).map(BlockReader::Resident)
        }
    }

    pub fn get(&self, index: u64) -> Result<i64> {
        match self {
            BlockReader::Resident(reader) => Ok(reader.get(index)),
            BlockReader::Direct(reader) => reader.get(index),
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            BlockReader::Resident(reader) => reader.size(),
            BlockReader::Direct(reader) => reader.size(),
        }
    }

    pub fn ram_bytes_used(&self) -> usize {
        match self {
            BlockReader::Resident(reader) => reader.ram_bytes_used(),
            BlockReader::Direct(reader) => reader.ram_bytes_used(),
        }
    }
}

/// A monotonic block reader that is either fully resident or storage-backed.
pub enum MonotonicReader<R> {
    Resident(MonotonicBlockPackedReader),
    Direct(DirectMonotonicBlockPackedReader<R>),
}

impl<R: IndexInput> MonotonicReader<R> {
    pub fn open(
        mut input: R,
        packed_ints_version: u32,
        block_size: usize,
        value_count: u64,
        direct: bool,
    ) -> Result<Self> {
        if direct {
            DirectMonotonicBlockPackedReader::new(input, packed_ints_version, block_size, value_count)
                .map(MonotonicReader::Direct)
        } else {
            MonotonicBlockPackedReader::new(&mut input, packed_ints_version, block_size, value_count)
                .map(MonotonicReader::Resident)
        }
    }

    pub fn get(&self, index: u64) -> Result<i64> {
        match self {
            MonotonicReader::Resident(reader) => Ok(reader.get(index)),
            MonotonicReader::Direct(reader) => reader.get(index),
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            MonotonicReader::Resident(reader) => reader.size(),
            MonotonicReader::Direct(reader) => reader.size(),
        }
    }
}

#[cfg(test)]
mod blocks_tests;
