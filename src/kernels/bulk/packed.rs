//! Kernels for the contiguous `Packed` layout: values are written MSB-first and
//! may straddle 64-bit words and bytes.
//!
//! Byte-aligned widths (8, 16, 24, 32, 48, 64) get dedicated paths; every other
//! width goes through the generic bit-shuffling loops.

use super::PackedValue;

/// Per-width constants for the `Packed` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedKernel {
    bits_per_value: u32,
    long_block_count: usize,
    long_value_count: usize,
    byte_block_count: usize,
    byte_value_count: usize,
    mask: u64,
}

impl PackedKernel {
    pub const fn new(bits_per_value: u32) -> Self {
        assert!(bits_per_value > 0 && bits_per_value <= 64);
        let mut blocks = bits_per_value;
        while blocks & 1 == 0 {
            blocks >>= 1;
        }
        let long_block_count = blocks as usize;
        let long_value_count = 64 * long_block_count / bits_per_value as usize;
        let mut byte_block_count = 8 * long_block_count;
        let mut byte_value_count = long_value_count;
        while byte_block_count & 1 == 0 && byte_value_count & 1 == 0 {
            byte_block_count >>= 1;
            byte_value_count >>= 1;
        }
        let mask = if bits_per_value == 64 {
            u64::MAX
        } else {
            (1u64 << bits_per_value) - 1
        };
        PackedKernel {
            bits_per_value,
            long_block_count,
            long_value_count,
            byte_block_count,
            byte_value_count,
            mask,
        }
    }

    pub fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }
    pub fn long_block_count(&self) -> usize {
        self.long_block_count
    }
    pub fn long_value_count(&self) -> usize {
        self.long_value_count
    }
    pub fn byte_block_count(&self) -> usize {
        self.byte_block_count
    }
    pub fn byte_value_count(&self) -> usize {
        self.byte_value_count
    }

    fn is_byte_aligned(&self) -> bool {
        self.bits_per_value % 8 == 0
    }

    //==============================================================================
    // Decoding
    //==============================================================================

    pub fn decode_longs<V: PackedValue>(&self, blocks: &[u64], values: &mut [V], iterations: usize) {
        let value_count = self.long_value_count * iterations;
        let block_count = self.long_block_count * iterations;
        let blocks = &blocks[..block_count];
        let values = &mut values[..value_count];
        match self.bits_per_value {
            8 | 16 | 32 | 64 => self.decode_longs_aligned(blocks, values),
            24 | 48 => self.decode_longs_three_words(blocks, values),
            _ => self.decode_longs_generic(blocks, values),
        }
    }

    /// Widths dividing 64: every word holds a whole number of values.
    fn decode_longs_aligned<V: PackedValue>(&self, blocks: &[u64], values: &mut [V]) {
        let bpv = self.bits_per_value;
        let per_word = (64 / bpv) as usize;
        for (&block, out) in blocks.iter().zip(values.chunks_exact_mut(per_word)) {
            let mut shift = 64 - bpv;
            for slot in out.iter_mut() {
                *slot = V::from_u64((block >> shift) & self.mask);
                shift = shift.wrapping_sub(bpv);
            }
        }
    }

    /// 24 and 48 bits: three words hold 8 (resp. 4) values.
    fn decode_longs_three_words<V: PackedValue>(&self, blocks: &[u64], values: &mut [V]) {
        let bpv = self.bits_per_value;
        for (words, out) in blocks.chunks_exact(3).zip(values.chunks_exact_mut(self.long_value_count)) {
            // Treat the three words as one 192-bit big-endian integer.
            let mut bit = 0u32;
            for slot in out.iter_mut() {
                *slot = V::from_u64(read_bits_192(words, bit, bpv));
                bit += bpv;
            }
        }
    }

    fn decode_longs_generic<V: PackedValue>(&self, blocks: &[u64], values: &mut [V]) {
        let bpv = self.bits_per_value as i32;
        let mut block_index = 0;
        let mut bits_left = 64i32;
        for slot in values.iter_mut() {
            bits_left -= bpv;
            let value = if bits_left < 0 {
                let high = (blocks[block_index] & ((1u64 << (bpv + bits_left)) - 1)) << -bits_left;
                block_index += 1;
                bits_left += 64;
                high | (blocks[block_index] >> bits_left)
            } else {
                (blocks[block_index] >> bits_left) & self.mask
            };
            *slot = V::from_u64(value);
        }
    }

    pub fn decode_bytes<V: PackedValue>(&self, blocks: &[u8], values: &mut [V], iterations: usize) {
        let value_count = self.byte_value_count * iterations;
        let block_count = self.byte_block_count * iterations;
        let blocks = &blocks[..block_count];
        let values = &mut values[..value_count];
        if self.is_byte_aligned() {
            let width = (self.bits_per_value / 8) as usize;
            for (bytes, slot) in blocks.chunks_exact(width).zip(values.iter_mut()) {
                let value = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
                *slot = V::from_u64(value);
            }
            return;
        }

        let bpv = self.bits_per_value;
        let mut value_index = 0;
        let mut next_value = 0u64;
        let mut bits_left = bpv;
        for &byte in blocks {
            let byte = u64::from(byte);
            if bits_left > 8 {
                bits_left -= 8;
                next_value |= byte << bits_left;
            } else {
                let mut bits = 8 - bits_left;
                values[value_index] = V::from_u64(next_value | (byte >> bits));
                value_index += 1;
                while bits >= bpv {
                    bits -= bpv;
                    values[value_index] = V::from_u64((byte >> bits) & self.mask);
                    value_index += 1;
                }
                bits_left = bpv - bits;
                next_value = (byte & ((1u64 << bits) - 1)) << bits_left;
            }
        }
        debug_assert_eq!(value_index, values.len());
    }

    //==============================================================================
    // Encoding
    //==============================================================================

    pub fn encode_longs<V: PackedValue>(&self, values: &[V], blocks: &mut [u64], iterations: usize) {
        let value_count = self.long_value_count * iterations;
        let block_count = self.long_block_count * iterations;
        let values = &values[..value_count];
        let blocks = &mut blocks[..block_count];

        let bpv = self.bits_per_value as i32;
        let mut block_index = 0;
        let mut next_block = 0u64;
        let mut bits_left = 64i32;
        for value in values.iter().map(|v| v.widen()) {
            debug_assert!(value & !self.mask == 0, "value {} wider than {} bits", value, bpv);
            bits_left -= bpv;
            if bits_left > 0 {
                next_block |= value << bits_left;
            } else if bits_left == 0 {
                blocks[block_index] = next_block | value;
                block_index += 1;
                next_block = 0;
                bits_left = 64;
            } else {
                blocks[block_index] = next_block | (value >> -bits_left);
                block_index += 1;
                next_block = (value & ((1u64 << -bits_left) - 1)) << (64 + bits_left);
                bits_left += 64;
            }
        }
        debug_assert_eq!(block_index, blocks.len());
    }

    pub fn encode_bytes<V: PackedValue>(&self, values: &[V], blocks: &mut [u8], iterations: usize) {
        let value_count = self.byte_value_count * iterations;
        let block_count = self.byte_block_count * iterations;
        let values = &values[..value_count];
        let blocks = &mut blocks[..block_count];
        if self.is_byte_aligned() {
            let width = (self.bits_per_value / 8) as usize;
            for (out, value) in blocks.chunks_exact_mut(width).zip(values.iter().map(|v| v.widen())) {
                let bytes = value.to_be_bytes();
                out.copy_from_slice(&bytes[8 - width..]);
            }
            return;
        }

        let bpv = self.bits_per_value;
        let mut block_index = 0;
        let mut next_block = 0u64;
        let mut bits_left = 8u32;
        for value in values.iter().map(|v| v.widen()) {
            if bpv < bits_left {
                next_block |= value << (bits_left - bpv);
                bits_left -= bpv;
            } else {
                let mut bits = bpv - bits_left;
                blocks[block_index] = (next_block | (value >> bits)) as u8;
                block_index += 1;
                while bits >= 8 {
                    bits -= 8;
                    blocks[block_index] = (value >> bits) as u8;
                    block_index += 1;
                }
                bits_left = 8 - bits;
                next_block = (value & ((1u64 << bits) - 1)) << bits_left;
            }
        }
        debug_assert_eq!(block_index, blocks.len());
    }
}

/// Reads `bits` bits starting at bit offset `bit` (MSB-first) from three words.
#[inline]
fn read_bits_192(words: &[u64], bit: u32, bits: u32) -> u64 {
    let word = (bit / 64) as usize;
    let offset = bit % 64;
    let mask = (1u64 << bits) - 1;
    if offset + bits <= 64 {
        (words[word] >> (64 - offset - bits)) & mask
    } else {
        let spill = offset + bits - 64;
        ((words[word] << spill) | (words[word + 1] >> (64 - spill))) & mask
    }
}
