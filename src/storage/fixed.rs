//! Arrays backed by a native integer per value: 8, 16, 32 and 64 bits.
//!
//! These are the fastest random-access layouts and also the largest; the
//! format selector only picks them when the caller accepts the overhead.

use crate::error::Result;
use crate::format::{max_value, Format};
use crate::store::DataInput;
use crate::traits::{Mutable, Reader};
use crate::utils::ram_bytes_with;

macro_rules! fixed_width_array {
    ($(#[$doc:meta])* $name:ident, $native:ty, $bits:expr, $read:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            values: Vec<$native>,
        }

        impl $name {
            pub const BITS_PER_VALUE: u32 = $bits;

            pub fn new(value_count: usize) -> Self {
                $name { values: vec![0; value_count] }
            }

            /// Reads `value_count` big-endian values, then skips whatever
            /// padding `version` put after them.
            pub fn from_stream<R: DataInput + ?Sized>(
                version: u32,
                input: &mut R,
                value_count: usize,
            ) -> Result<Self> {
                let mut values = Vec::with_capacity(value_count);
                for _ in 0..value_count {
                    values.push(input.$read()?);
                }
                let byte_count = Format::Packed.byte_count(version, value_count as u64, $bits);
                let read = value_count as u64 * std::mem::size_of::<$native>() as u64;
                let padding = byte_count - read;
                if padding != 0 {
                    input.skip_bytes(padding)?;
                }
                Ok($name { values })
            }
        }

        impl Reader for $name {
            #[inline]
            fn get(&self, index: usize) -> u64 {
                u64::from(self.values[index])
            }

            fn get_bulk(&self, index: usize, buf: &mut [u64]) -> usize {
                assert!(!buf.is_empty(), "len must be > 0 (got {})", buf.len());
                assert!(index < self.values.len());
                let gets = buf.len().min(self.values.len() - index);
                for (slot, &value) in buf.iter_mut().zip(&self.values[index..index + gets]) {
                    *slot = u64::from(value);
                }
                gets
            }

            fn bits_per_value(&self) -> u32 {
                $bits
            }

            fn size(&self) -> usize {
                self.values.len()
            }

            fn ram_bytes_used(&self) -> usize {
                ram_bytes_with::<Self, _>(&self.values)
            }
        }

        impl Mutable for $name {
            #[inline]
            fn set(&mut self, index: usize, value: u64) {
                debug_assert!(value <= max_value($bits));
                self.values[index] = value as $native;
            }

            fn set_bulk(&mut self, index: usize, values: &[u64]) -> usize {
                assert!(!values.is_empty(), "len must be > 0 (got {})", values.len());
                assert!(index < self.values.len());
                let sets = values.len().min(self.values.len() - index);
                for (slot, &value) in self.values[index..index + sets].iter_mut().zip(values) {
                    *slot = value as $native;
                }
                sets
            }

            fn fill(&mut self, from: usize, to: usize, value: u64) {
                assert!(value <= max_value($bits));
                assert!(from <= to);
                self.values[from..to].fill(value as $native);
            }

            fn clear(&mut self) {
                self.values.fill(0);
            }
        }
    };
}

fixed_width_array!(
    /// One byte per value.
    Direct8, u8, 8, read_byte
);
fixed_width_array!(
    /// Two bytes per value.
    Direct16, u16, 16, read_short
);
fixed_width_array!(
    /// Four bytes per value.
    Direct32, u32, 32, read_int
);
fixed_width_array!(
    /// Eight bytes per value; any `u64` fits.
    Direct64, u64, 64, read_long
);
