//! Storage where every 64-bit word holds `64 / b` whole values.
//!
//! Wastes `64 % b` bits per word but never splits a value, so `get` is a single
//! shift and mask. Only widths in [`SINGLE_BLOCK_BITS`] are accepted.

use crate::error::{PackedIntsError, Result};
use crate::format::{max_value, Format, SINGLE_BLOCK_BITS, VERSION_CURRENT};
use crate::kernels::bulk::{BulkOperation, SingleBlockKernel};
use crate::store::DataInput;
use crate::traits::{Mutable, Reader};
use crate::utils::ram_bytes_with;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed64SingleBlock {
    blocks: Vec<u64>,
    value_count: usize,
    bits_per_value: u32,
    values_per_block: usize,
    mask: u64,
    operation: BulkOperation,
}

impl Packed64SingleBlock {
    pub fn is_supported(bits_per_value: u32) -> bool {
        SINGLE_BLOCK_BITS.contains(&bits_per_value)
    }

    pub fn new(value_count: usize, bits_per_value: u32) -> Result<Self> {
        if !Self::is_supported(bits_per_value) {
            return Err(PackedIntsError::UnsupportedBitsPerValue {
                format: Format::PackedSingleBlock,
                bits_per_value,
            });
        }
        Ok(Self::with_supported_width(value_count, bits_per_value))
    }

    /// Same as [`Packed64SingleBlock::new`] for a width already known to be supported.
    pub(crate) fn with_supported_width(value_count: usize, bits_per_value: u32) -> Self {
        debug_assert!(Self::is_supported(bits_per_value));
        let long_count =
            Format::PackedSingleBlock.long_count(VERSION_CURRENT, value_count as u64, bits_per_value) as usize;
        Packed64SingleBlock {
            blocks: vec![0; long_count],
            value_count,
            bits_per_value,
            values_per_block: (64 / bits_per_value) as usize,
            mask: max_value(bits_per_value),
            operation: BulkOperation::PackedSingleBlock(SingleBlockKernel::new(bits_per_value)),
        }
    }

    /// Reads the big-endian words of a single-block stream. The layout has
    /// the same size in every version.
    pub fn from_stream<R: DataInput + ?Sized>(
        input: &mut R,
        value_count: usize,
        bits_per_value: u32,
    ) -> Result<Self> {
        let mut array = Self::new(value_count, bits_per_value)?;
        for block in array.blocks.iter_mut() {
            *block = input.read_long()?;
        }
        Ok(array)
    }

    #[inline]
    fn locate(&self, index: usize) -> (usize, u32) {
        let o = index / self.values_per_block;
        let b = index % self.values_per_block;
        (o, b as u32 * self.bits_per_value)
    }
}

impl Reader for Packed64SingleBlock {
    #[inline]
    fn get(&self, index: usize) -> u64 {
        debug_assert!(index < self.value_count);
        let (o, shift) = self.locate(index);
        (self.blocks[o] >> shift) & self.mask
    }

    fn get_bulk(&self, index: usize, buf: &mut [u64]) -> usize {
        assert!(!buf.is_empty(), "len must be > 0 (got {})", buf.len());
        assert!(index < self.value_count);
        let mut len = buf.len().min(self.value_count - index);
        let original_index = index;
        let mut index = index;
        let mut off = 0;

        // Go to the next block boundary.
        let offset_in_block = index % self.values_per_block;
        if offset_in_block != 0 {
            for _ in offset_in_block..self.values_per_block {
                if len == 0 {
                    break;
                }
                buf[off] = self.get(index);
                off += 1;
                index += 1;
                len -= 1;
            }
            if len == 0 {
                return index - original_index;
            }
        }

        debug_assert_eq!(index % self.values_per_block, 0);
        let block_index = index / self.values_per_block;
        let iterations = len / self.values_per_block;
        self.operation
            .decode_longs(&self.blocks[block_index..], &mut buf[off..], iterations);
        index += iterations * self.values_per_block;

        if index > original_index {
            index - original_index
        } else {
            for (i, slot) in buf[..len].iter_mut().enumerate() {
                *slot = self.get(original_index + i);
            }
            len
        }
    }

    fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    fn size(&self) -> usize {
        self.value_count
    }

    fn ram_bytes_used(&self) -> usize {
        ram_bytes_with::<Self, _>(&self.blocks)
    }
}

impl Mutable for Packed64SingleBlock {
    #[inline]
    fn set(&mut self, index: usize, value: u64) {
        debug_assert!(index < self.value_count);
        debug_assert!(value <= self.mask);
        let (o, shift) = self.locate(index);
        self.blocks[o] = (self.blocks[o] & !(self.mask << shift)) | (value << shift);
    }

    fn set_bulk(&mut self, index: usize, values: &[u64]) -> usize {
        assert!(!values.is_empty(), "len must be > 0 (got {})", values.len());
        assert!(index < self.value_count);
        let mut len = values.len().min(self.value_count - index);
        let original_index = index;
        let mut index = index;
        let mut off = 0;

        let offset_in_block = index % self.values_per_block;
        if offset_in_block != 0 {
            for _ in offset_in_block..self.values_per_block {
                if len == 0 {
                    break;
                }
                self.set(index, values[off]);
                off += 1;
                index += 1;
                len -= 1;
            }
            if len == 0 {
                return index - original_index;
            }
        }

        debug_assert_eq!(index % self.values_per_block, 0);
        let block_index = index / self.values_per_block;
        let iterations = len / self.values_per_block;
        self.operation
            .encode_longs(&values[off..], &mut self.blocks[block_index..], iterations);
        index += iterations * self.values_per_block;

        if index > original_index {
            index - original_index
        } else {
            for (i, &value) in values[..len].iter().enumerate() {
                self.set(original_index + i, value);
            }
            len
        }
    }

    fn fill(&mut self, from: usize, to: usize, value: u64) {
        assert!(value <= self.mask);
        assert!(from <= to);
        let values_per_block = self.values_per_block;
        if to - from <= values_per_block << 1 {
            for index in from..to {
                self.set(index, value);
            }
            return;
        }

        let mut from = from;
        let from_offset_in_block = from % values_per_block;
        if from_offset_in_block != 0 {
            for _ in from_offset_in_block..values_per_block {
                self.set(from, value);
                from += 1;
            }
        }
        debug_assert_eq!(from % values_per_block, 0);

        let from_block = from / values_per_block;
        let to_block = to / values_per_block;
        let block_value = (0..values_per_block as u32)
            .fold(0u64, |block, i| block | (value << (i * self.bits_per_value)));
        self.blocks[from_block..to_block].fill(block_value);

        for index in values_per_block * to_block..to {
            self.set(index, value);
        }
    }

    fn clear(&mut self) {
        self.blocks.fill(0);
    }

    fn format(&self) -> Format {
        Format::PackedSingleBlock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_rejects_unsupported_width() {
        assert!(matches!(
            Packed64SingleBlock::new(10, 11),
            Err(PackedIntsError::UnsupportedBitsPerValue { bits_per_value: 11, .. })
        ));
    }

    #[test]
    fn test_every_supported_width() {
        let mut rng = StdRng::seed_from_u64(21);
        for bits in SINGLE_BLOCK_BITS {
            let mut array = Packed64SingleBlock::new(300, bits).unwrap();
            let values: Vec<u64> = (0..300).map(|_| rng.random::<u64>() & max_value(bits)).collect();
            let written = array.set_bulk(0, &values);
            for i in written..300 {
                array.set(i, values[i]);
            }
            let mut buf = vec![0u64; 300];
            let mut index = 3;
            while index < 300 {
                let got = array.get_bulk(index, &mut buf[..97]);
                assert_eq!(&buf[..got], &values[index..index + got], "bits={}", bits);
                index += got;
            }
            assert_eq!(array.format(), Format::PackedSingleBlock);
        }
    }

    #[test]
    fn test_fill_spans_blocks() {
        let mut array = Packed64SingleBlock::new(100, 21).unwrap();
        array.fill(4, 95, 0x1F_FFFF);
        for i in 0..100 {
            let expected = if (4..95).contains(&i) { 0x1F_FFFF } else { 0 };
            assert_eq!(array.get(i), expected, "index={}", i);
        }
        // The wasted high bit of each word stays clear.
        assert!(array.blocks.iter().all(|b| b >> 63 == 0));
    }
}
