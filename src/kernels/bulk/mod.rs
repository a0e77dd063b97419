//! This module contains the pure, stateless bulk codec: per bit-width kernels
//! that turn runs of N-bit values into 64-bit words or bytes and back.
//!
//! Every kernel works in *iterations*. One iteration consumes exactly
//! `*_block_count()` blocks and produces exactly `*_value_count()` values, so
//! callers size their buffers as multiples of those counts and never deal with
//! a value that straddles a buffer boundary.
//!
//! Kernels are looked up through [`BulkOperation::of`], which indexes two
//! tables built at compile time.

use num_traits::{PrimInt, Unsigned};

use crate::error::{PackedIntsError, Result};
use crate::format::{Format, SINGLE_BLOCK_BITS};

pub mod packed;
pub mod single_block;

pub use packed::PackedKernel;
pub use single_block::SingleBlockKernel;

//==================================================================================
// 1. Value Types
//==================================================================================

/// An unsigned integer type the kernels can decode into or encode from.
pub trait PackedValue: PrimInt + Unsigned + Default + Send + Sync + 'static {
    const BITS: u32;

    /// Truncating conversion; callers guarantee the value fits.
    fn from_u64(value: u64) -> Self;

    fn widen(self) -> u64;
}

macro_rules! impl_packed_value {
    ($t:ty) => {
        impl PackedValue for $t {
            const BITS: u32 = <$t>::BITS;
            #[inline(always)]
            fn from_u64(value: u64) -> Self {
                value as $t
            }
            #[inline(always)]
            fn widen(self) -> u64 {
                u64::from(self)
            }
        }
    };
}

impl_packed_value!(u32);
impl_packed_value!(u64);

//==================================================================================
// 2. Dispatch
//==================================================================================

/// A bulk encoder/decoder for one `(format, bits_per_value)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperation {
    Packed(PackedKernel),
    PackedSingleBlock(SingleBlockKernel),
}

macro_rules! dispatch {
    ($self:ident, $kernel:ident => $body:expr) => {
        match $self {
            BulkOperation::Packed($kernel) => $body,
            BulkOperation::PackedSingleBlock($kernel) => $body,
        }
    };
}

const fn build_packed_table() -> [BulkOperation; 64] {
    let mut table = [BulkOperation::Packed(PackedKernel::new(1)); 64];
    let mut i = 0;
    while i < 64 {
        table[i] = BulkOperation::Packed(PackedKernel::new(i as u32 + 1));
        i += 1;
    }
    table
}

const fn build_single_block_table() -> [Option<BulkOperation>; 32] {
    let mut table = [None; 32];
    let mut i = 0;
    while i < SINGLE_BLOCK_BITS.len() {
        let bits = SINGLE_BLOCK_BITS[i];
        table[bits as usize - 1] = Some(BulkOperation::PackedSingleBlock(SingleBlockKernel::new(bits)));
        i += 1;
    }
    table
}

static PACKED_OPERATIONS: [BulkOperation; 64] = build_packed_table();
static SINGLE_BLOCK_OPERATIONS: [Option<BulkOperation>; 32] = build_single_block_table();

impl BulkOperation {
    /// Looks up the kernel for `format` and `bits_per_value`.
    ///
    /// A width above 64 can only come from a damaged stream and is reported as
    /// [`PackedIntsError::Corrupted`]; a valid width the format does not
    /// support is [`PackedIntsError::UnsupportedBitsPerValue`].
    pub fn of(format: Format, bits_per_value: u32) -> Result<&'static BulkOperation> {
        if bits_per_value > 64 {
            return Err(PackedIntsError::Corrupted(format!("{} bits per value", bits_per_value)));
        }
        let slot = (bits_per_value as usize).checked_sub(1);
        let operation = match format {
            Format::Packed => slot.and_then(|i| PACKED_OPERATIONS.get(i)),
            Format::PackedSingleBlock => slot
                .and_then(|i| SINGLE_BLOCK_OPERATIONS.get(i))
                .and_then(Option::as_ref),
        };
        operation.ok_or(PackedIntsError::UnsupportedBitsPerValue { format, bits_per_value })
    }

    pub fn format(&self) -> Format {
        match self {
            BulkOperation::Packed(_) => Format::Packed,
            BulkOperation::PackedSingleBlock(_) => Format::PackedSingleBlock,
        }
    }

    pub fn bits_per_value(&self) -> u32 {
        dispatch!(self, k => k.bits_per_value())
    }

    /// Number of 64-bit blocks consumed by one iteration.
    pub fn long_block_count(&self) -> usize {
        dispatch!(self, k => k.long_block_count())
    }

    /// Number of values produced by one iteration over 64-bit blocks.
    pub fn long_value_count(&self) -> usize {
        dispatch!(self, k => k.long_value_count())
    }

    /// Number of bytes consumed by one iteration.
    pub fn byte_block_count(&self) -> usize {
        dispatch!(self, k => k.byte_block_count())
    }

    /// Number of values produced by one iteration over bytes.
    pub fn byte_value_count(&self) -> usize {
        dispatch!(self, k => k.byte_value_count())
    }

    /// Decodes `iterations * long_value_count()` values from the head of `blocks`.
    pub fn decode_longs<V: PackedValue>(&self, blocks: &[u64], values: &mut [V], iterations: usize) {
        debug_assert!(V::BITS >= self.bits_per_value());
        dispatch!(self, k => k.decode_longs(blocks, values, iterations))
    }

    /// Decodes `iterations * byte_value_count()` values from the head of `blocks`.
    pub fn decode_bytes<V: PackedValue>(&self, blocks: &[u8], values: &mut [V], iterations: usize) {
        debug_assert!(V::BITS >= self.bits_per_value());
        dispatch!(self, k => k.decode_bytes(blocks, values, iterations))
    }

    /// Encodes `iterations * long_value_count()` values into the head of `blocks`.
    pub fn encode_longs<V: PackedValue>(&self, values: &[V], blocks: &mut [u64], iterations: usize) {
        dispatch!(self, k => k.encode_longs(values, blocks, iterations))
    }

    /// Encodes `iterations * byte_value_count()` values into the head of `blocks`.
    pub fn encode_bytes<V: PackedValue>(&self, values: &[V], blocks: &mut [u8], iterations: usize) {
        dispatch!(self, k => k.encode_bytes(values, blocks, iterations))
    }

    /// Number of byte iterations that fit a buffer of `ram_budget` bytes
    /// (blocks plus decoded `u64` values), capped to what `value_count`
    /// values need. Always at least one.
    pub fn compute_iterations(&self, value_count: usize, ram_budget: usize) -> usize {
        let byte_value_count = self.byte_value_count();
        let iterations = ram_budget / (self.byte_block_count() + 8 * byte_value_count);
        if iterations == 0 {
            1
        } else if (iterations - 1) * byte_value_count >= value_count {
            value_count.div_ceil(byte_value_count).max(1)
        } else {
            iterations
        }
    }
}
