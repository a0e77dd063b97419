//! 24 and 48 bit arrays stored as three native blocks per value.
//!
//! Each value is split into three big-endian parts so no shifting across words
//! is needed on access. Value counts are capped at [`THREE_BLOCKS_MAX_SIZE`]
//! because the backing vector holds three entries per value.

use crate::error::Result;
use crate::format::{max_value, Format, THREE_BLOCKS_MAX_SIZE};
use crate::store::DataInput;
use crate::traits::{Mutable, Reader};
use crate::utils::ram_bytes_with;

macro_rules! three_blocks_array {
    ($(#[$doc:meta])* $name:ident, $native:ty, $part_bits:expr, $read:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            blocks: Vec<$native>,
            value_count: usize,
        }

        impl $name {
            pub const BITS_PER_VALUE: u32 = 3 * $part_bits;

            pub fn new(value_count: usize) -> Self {
                assert!(
                    value_count <= THREE_BLOCKS_MAX_SIZE,
                    "MAX_SIZE exceeded: {}",
                    value_count
                );
                $name { blocks: vec![0; 3 * value_count], value_count }
            }

            pub fn from_stream<R: DataInput + ?Sized>(
                version: u32,
                input: &mut R,
                value_count: usize,
            ) -> Result<Self> {
                let mut array = Self::new(value_count);
                for block in array.blocks.iter_mut() {
                    *block = input.$read()?;
                }
                let byte_count = Format::Packed.byte_count(version, value_count as u64, Self::BITS_PER_VALUE);
                let read = 3 * value_count as u64 * std::mem::size_of::<$native>() as u64;
                let padding = byte_count - read;
                if padding != 0 {
                    input.skip_bytes(padding)?;
                }
                Ok(array)
            }

            #[inline]
            fn split(value: u64) -> [$native; 3] {
                let part_mask = max_value($part_bits);
                [
                    (value >> (2 * $part_bits)) as $native,
                    ((value >> $part_bits) & part_mask) as $native,
                    (value & part_mask) as $native,
                ]
            }
        }

        impl Reader for $name {
            #[inline]
            fn get(&self, index: usize) -> u64 {
                let o = index * 3;
                (u64::from(self.blocks[o]) << (2 * $part_bits))
                    | (u64::from(self.blocks[o + 1]) << $part_bits)
                    | u64::from(self.blocks[o + 2])
            }

            fn bits_per_value(&self) -> u32 {
                Self::BITS_PER_VALUE
            }

            fn size(&self) -> usize {
                self.value_count
            }

            fn ram_bytes_used(&self) -> usize {
                ram_bytes_with::<Self, _>(&self.blocks)
            }
        }

        impl Mutable for $name {
            #[inline]
            fn set(&mut self, index: usize, value: u64) {
                debug_assert!(value <= max_value(Self::BITS_PER_VALUE));
                let o = index * 3;
                self.blocks[o..o + 3].copy_from_slice(&Self::split(value));
            }

            fn fill(&mut self, from: usize, to: usize, value: u64) {
                assert!(value <= max_value(Self::BITS_PER_VALUE));
                assert!(from <= to);
                let parts = Self::split(value);
                for chunk in self.blocks[3 * from..3 * to].chunks_exact_mut(3) {
                    chunk.copy_from_slice(&parts);
                }
            }

            fn clear(&mut self) {
                self.blocks.fill(0);
            }
        }
    };
}

three_blocks_array!(
    /// 24-bit values as three bytes.
    Packed8ThreeBlocks, u8, 8, read_byte
);
three_blocks_array!(
    /// 48-bit values as three 16-bit shorts.
    Packed16ThreeBlocks, u16, 16, read_short
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::VERSION_CURRENT;
    use std::io::Cursor;

    #[test]
    fn test_three_blocks_are_big_endian() {
        let mut array = Packed8ThreeBlocks::new(2);
        array.set(1, 0x0A0B0C);
        assert_eq!(array.get(1), 0x0A0B0C);
        assert_eq!(&array.blocks[3..], &[0x0A, 0x0B, 0x0C]);

        let bytes: Vec<u8> = vec![0x12, 0x34, 0x56, 0xAB, 0xCD, 0xEF];
        let array = Packed8ThreeBlocks::from_stream(VERSION_CURRENT, &mut Cursor::new(bytes), 2).unwrap();
        assert_eq!(array.get(0), 0x123456);
        assert_eq!(array.get(1), 0xABCDEF);
    }

    #[test]
    fn test_fill_48_bits() {
        let mut array = Packed16ThreeBlocks::new(10);
        let value = max_value(48) - 7;
        array.fill(2, 9, value);
        assert_eq!(array.get(1), 0);
        assert!((2..9).all(|i| array.get(i) == value));
        assert_eq!(array.get(9), 0);
        let mut buf = [0u64; 4];
        assert_eq!(array.get_bulk(8, &mut buf), 2);
        assert_eq!(&buf[..2], &[value, 0]);
    }
}
