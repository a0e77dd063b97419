//! Kernels for the `PackedSingleBlock` layout: each 64-bit word holds
//! `64 / b` values, least significant value first, and no value crosses a word.
//! On the byte stream each word is stored big-endian.

use super::PackedValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleBlockKernel {
    bits_per_value: u32,
    value_count: usize,
    mask: u64,
}

impl SingleBlockKernel {
    pub const fn new(bits_per_value: u32) -> Self {
        assert!(bits_per_value > 0 && bits_per_value <= 32);
        SingleBlockKernel {
            bits_per_value,
            value_count: (64 / bits_per_value) as usize,
            mask: (1u64 << bits_per_value) - 1,
        }
    }

    pub fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }
    pub fn long_block_count(&self) -> usize {
        1
    }
    pub fn long_value_count(&self) -> usize {
        self.value_count
    }
    pub fn byte_block_count(&self) -> usize {
        8
    }
    pub fn byte_value_count(&self) -> usize {
        self.value_count
    }

    #[inline]
    fn unpack_word<V: PackedValue>(&self, mut block: u64, out: &mut [V]) {
        for slot in out.iter_mut() {
            *slot = V::from_u64(block & self.mask);
            block >>= self.bits_per_value;
        }
    }

    #[inline]
    fn pack_word<V: PackedValue>(&self, values: &[V]) -> u64 {
        values.iter().enumerate().fold(0u64, |block, (j, v)| {
            let value = v.widen();
            debug_assert!(value & !self.mask == 0);
            block | (value << (j as u32 * self.bits_per_value))
        })
    }

    pub fn decode_longs<V: PackedValue>(&self, blocks: &[u64], values: &mut [V], iterations: usize) {
        for (&block, out) in blocks[..iterations]
            .iter()
            .zip(values[..iterations * self.value_count].chunks_exact_mut(self.value_count))
        {
            self.unpack_word(block, out);
        }
    }

    pub fn decode_bytes<V: PackedValue>(&self, blocks: &[u8], values: &mut [V], iterations: usize) {
        for (bytes, out) in blocks[..8 * iterations]
            .chunks_exact(8)
            .zip(values[..iterations * self.value_count].chunks_exact_mut(self.value_count))
        {
            let mut word = [0u8; 8];
            word.copy_from_slice(bytes);
            self.unpack_word(u64::from_be_bytes(word), out);
        }
    }

    pub fn encode_longs<V: PackedValue>(&self, values: &[V], blocks: &mut [u64], iterations: usize) {
        for (block, chunk) in blocks[..iterations]
            .iter_mut()
            .zip(values[..iterations * self.value_count].chunks_exact(self.value_count))
        {
            *block = self.pack_word(chunk);
        }
    }

    pub fn encode_bytes<V: PackedValue>(&self, values: &[V], blocks: &mut [u8], iterations: usize) {
        for (bytes, chunk) in blocks[..8 * iterations]
            .chunks_exact_mut(8)
            .zip(values[..iterations * self.value_count].chunks_exact(self.value_count))
        {
            bytes.copy_from_slice(&self.pack_word(chunk).to_be_bytes());
        }
    }
}
