//! Space-optimal storage for any width from 1 to 64 bits.
//!
//! Values are laid out back to back in a `Vec<u64>`, most significant bits
//! first, and may straddle two words. Random access costs at most two word
//! reads; aligned bulk transfers go through the bulk kernels.

use crate::error::Result;
use crate::format::{max_value, Format, VERSION_CURRENT};
use crate::kernels::bulk::{BulkOperation, PackedKernel};
use crate::store::DataInput;
use crate::traits::{Mutable, Reader};
use crate::utils::{gcd, ram_bytes_with};

const BLOCK_SIZE: u32 = 64;
const BLOCK_BITS: u32 = 6;
const MOD_MASK: u64 = (BLOCK_SIZE - 1) as u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed64 {
    blocks: Vec<u64>,
    value_count: usize,
    bits_per_value: u32,
    /// Mask with the low `bits_per_value` bits set.
    mask_right: u64,
    /// `bits_per_value - 64`, the end-bit offset of a value starting at bit 0.
    bpv_minus_block_size: i32,
    operation: BulkOperation,
}

impl Packed64 {
    pub fn new(value_count: usize, bits_per_value: u32) -> Self {
        assert!((1..=64).contains(&bits_per_value), "bitsPerValue={}", bits_per_value);
        let long_count = Format::Packed.long_count(VERSION_CURRENT, value_count as u64, bits_per_value) as usize;
        Self::with_blocks(vec![0; long_count], value_count, bits_per_value)
    }

    fn with_blocks(blocks: Vec<u64>, value_count: usize, bits_per_value: u32) -> Self {
        let operation = BulkOperation::Packed(PackedKernel::new(bits_per_value));
        Packed64 {
            blocks,
            value_count,
            bits_per_value,
            mask_right: max_value(bits_per_value),
            bpv_minus_block_size: bits_per_value as i32 - BLOCK_SIZE as i32,
            operation,
        }
    }

    /// Reads values written by a `Packed` writer of the given version. The
    /// byte-aligned layout may end in a partial word, which is loaded into the
    /// high bytes of the last block.
    pub fn from_stream<R: DataInput + ?Sized>(
        version: u32,
        input: &mut R,
        value_count: usize,
        bits_per_value: u32,
    ) -> Result<Self> {
        let mut array = Self::new(value_count, bits_per_value);
        let byte_count = Format::Packed.byte_count(version, value_count as u64, bits_per_value);
        let full_longs = (byte_count / 8) as usize;
        for block in array.blocks[..full_longs].iter_mut() {
            *block = input.read_long()?;
        }
        let remaining = (byte_count % 8) as u32;
        if remaining != 0 {
            let mut last = 0u64;
            for i in 0..remaining {
                last |= u64::from(input.read_byte()?) << (56 - i * 8);
            }
            if let Some(block) = array.blocks.last_mut() {
                *block = last;
            }
        }
        Ok(array)
    }

    #[inline]
    fn locate(&self, index: usize) -> (usize, i32) {
        let major_bit_pos = index as u64 * u64::from(self.bits_per_value);
        let element_pos = (major_bit_pos >> BLOCK_BITS) as usize;
        let end_bits = (major_bit_pos & MOD_MASK) as i32 + self.bpv_minus_block_size;
        (element_pos, end_bits)
    }
}

impl Reader for Packed64 {
    #[inline]
    fn get(&self, index: usize) -> u64 {
        debug_assert!(index < self.value_count);
        let (element_pos, end_bits) = self.locate(index);
        if end_bits <= 0 {
            // Single block.
            (self.blocks[element_pos] >> -end_bits) & self.mask_right
        } else {
            // Two blocks.
            ((self.blocks[element_pos] << end_bits) | (self.blocks[element_pos + 1] >> (64 - end_bits)))
                & self.mask_right
        }
    }

    fn get_bulk(&self, index: usize, buf: &mut [u64]) -> usize {
        assert!(!buf.is_empty(), "len must be > 0 (got {})", buf.len());
        assert!(index < self.value_count);
        let mut len = buf.len().min(self.value_count - index);
        let original_index = index;
        let mut index = index;
        let mut off = 0;
        let long_value_count = self.operation.long_value_count();

        // Walk to the next index where a value starts on a word boundary.
        let offset_in_blocks = index % long_value_count;
        if offset_in_blocks != 0 {
            for _ in offset_in_blocks..long_value_count {
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

        debug_assert_eq!(index % long_value_count, 0);
        let block_index = ((index as u64 * u64::from(self.bits_per_value)) >> BLOCK_BITS) as usize;
        let iterations = len / long_value_count;
        self.operation
            .decode_longs(&self.blocks[block_index..], &mut buf[off..], iterations);
        index += iterations * long_value_count;

        if index > original_index {
            index - original_index
        } else {
            // Fewer values than one iteration and no alignment step: decode one by one.
            let gets = len;
            for (i, slot) in buf[..gets].iter_mut().enumerate() {
                *slot = self.get(original_index + i);
            }
            gets
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

impl Mutable for Packed64 {
    #[inline]
    fn set(&mut self, index: usize, value: u64) {
        debug_assert!(index < self.value_count);
        debug_assert!(value <= self.mask_right);
        let (element_pos, end_bits) = self.locate(index);
        if end_bits <= 0 {
            let shift = -end_bits;
            self.blocks[element_pos] = (self.blocks[element_pos] & !(self.mask_right << shift)) | (value << shift);
        } else {
            self.blocks[element_pos] =
                (self.blocks[element_pos] & !(self.mask_right >> end_bits)) | (value >> end_bits);
            self.blocks[element_pos + 1] =
                (self.blocks[element_pos + 1] & (u64::MAX >> end_bits)) | (value << (64 - end_bits));
        }
    }

    fn set_bulk(&mut self, index: usize, values: &[u64]) -> usize {
        assert!(!values.is_empty(), "len must be > 0 (got {})", values.len());
        assert!(index < self.value_count);
        let mut len = values.len().min(self.value_count - index);
        let original_index = index;
        let mut index = index;
        let mut off = 0;
        let long_value_count = self.operation.long_value_count();

        let offset_in_blocks = index % long_value_count;
        if offset_in_blocks != 0 {
            for _ in offset_in_blocks..long_value_count {
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

        debug_assert_eq!(index % long_value_count, 0);
        let block_index = ((index as u64 * u64::from(self.bits_per_value)) >> BLOCK_BITS) as usize;
        let iterations = len / long_value_count;
        self.operation
            .encode_longs(&values[off..], &mut self.blocks[block_index..], iterations);
        index += iterations * long_value_count;

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
        assert!(value <= max_value(self.bits_per_value));
        assert!(from <= to);

        // Number of values after which the bit pattern repeats on a word boundary.
        let n_aligned_values = (64 / gcd(64, u64::from(self.bits_per_value))) as usize;
        let span = to - from;
        if span <= 3 * n_aligned_values {
            for index in from..to {
                self.set(index, value);
            }
            return;
        }

        let mut from = from;
        let from_index_mod = from % n_aligned_values;
        if from_index_mod != 0 {
            for _ in from_index_mod..n_aligned_values {
                self.set(from, value);
                from += 1;
            }
        }
        debug_assert_eq!(from % n_aligned_values, 0);

        // Encode one repetition of the pattern and stamp it over whole words.
        let n_aligned_blocks = (n_aligned_values * self.bits_per_value as usize) >> BLOCK_BITS;
        let mut pattern = Packed64::new(n_aligned_values, self.bits_per_value);
        for i in 0..n_aligned_values {
            pattern.set(i, value);
        }
        debug_assert!(n_aligned_blocks <= pattern.blocks.len());

        let bpv = self.bits_per_value as u64;
        let start_block = ((from as u64 * bpv) >> BLOCK_BITS) as usize;
        let end_block = ((to as u64 * bpv) >> BLOCK_BITS) as usize;
        for block in start_block..end_block {
            self.blocks[block] = pattern.blocks[block % n_aligned_blocks];
        }

        // Values sharing the last, partially covered word.
        let gap_start = (((end_block as u64) << BLOCK_BITS) / bpv) as usize;
        for index in gap_start..to {
            self.set(index, value);
        }
    }

    fn clear(&mut self) {
        self.blocks.fill(0);
    }
}
