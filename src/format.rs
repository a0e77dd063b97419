// In: src/format.rs

//! On-disk layout identifiers and the arithmetic that goes with them.
//!
//! A [`Format`] decides two things: which bulk kernel encodes and decodes the
//! values, and how many bytes `n` values of `b` bits occupy on the stream.
//! The latter is what lets readers seek past a packed run without decoding it,
//! so the formulas here are part of the wire format and must not change.

use serde::{Deserialize, Serialize};

use crate::error::{PackedIntsError, Result};

//==================================================================================
// 0. Constants
//==================================================================================

/// Packed runs were padded to a whole number of 64-bit words.
pub const VERSION_START: u32 = 0;
/// Packed runs only occupy the bytes they need.
pub const VERSION_BYTE_ALIGNED: u32 = 1;
pub const VERSION_CURRENT: u32 = VERSION_BYTE_ALIGNED;

/// Default amount of memory (in bytes) used for bulk operation buffers.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Bit widths a single 64-bit word can hold without wasting more than it must.
pub const SINGLE_BLOCK_BITS: [u32; 14] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 16, 21, 32];

/// Largest value count the three-block layouts accept.
pub const THREE_BLOCKS_MAX_SIZE: usize = (i32::MAX / 3) as usize;

/// Named acceptable-overhead ratios for [`fastest_format_and_bits`].
pub struct OverheadRatio;

impl OverheadRatio {
    /// No memory overhead at all, but the returned implementation may be slow.
    pub const COMPACT: f32 = 0.0;
    /// At most 20% memory overhead.
    pub const DEFAULT: f32 = 0.2;
    /// At most 50% memory overhead, always select a reasonably fast implementation.
    pub const FAST: f32 = 0.5;
    /// At most 700% memory overhead, always select a direct implementation.
    pub const FASTEST: f32 = 7.0;
}

/// Fails unless `version` is one this crate can read.
pub fn check_version(version: u32) -> Result<()> {
    if !(VERSION_START..=VERSION_CURRENT).contains(&version) {
        return Err(PackedIntsError::UnsupportedVersion {
            version,
            min: VERSION_START,
            max: VERSION_CURRENT,
        });
    }
    Ok(())
}

//==================================================================================
// 1. Format
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// All bits are written contiguously, values may straddle word boundaries.
    Packed,
    /// Each 64-bit word holds `64 / b` values and the remaining high bits are
    /// padding. Only the widths in [`SINGLE_BLOCK_BITS`] are supported.
    PackedSingleBlock,
}

impl Format {
    pub const ALL: [Format; 2] = [Format::Packed, Format::PackedSingleBlock];

    /// The identifier written to stream headers.
    pub fn id(self) -> u32 {
        match self {
            Format::Packed => 0,
            Format::PackedSingleBlock => 1,
        }
    }

    pub fn by_id(id: u32) -> Result<Format> {
        Format::ALL
            .into_iter()
            .find(|format| format.id() == id)
            .ok_or(PackedIntsError::UnknownFormat(id))
    }

    /// Number of bytes needed to store `value_count` values of `bits_per_value`
    /// bits with the given packed ints version.
    pub fn byte_count(self, version: u32, value_count: u64, bits_per_value: u32) -> u64 {
        debug_assert!(bits_per_value <= 64, "bitsPerValue={}", bits_per_value);
        match self {
            Format::Packed => {
                let total_bits = value_count * u64::from(bits_per_value);
                if version < VERSION_BYTE_ALIGNED {
                    8 * total_bits.div_ceil(64)
                } else {
                    total_bits.div_ceil(8)
                }
            }
            Format::PackedSingleBlock => 8 * self.long_count(version, value_count, bits_per_value),
        }
    }

    /// Number of 64-bit words needed to store `value_count` values.
    pub fn long_count(self, version: u32, value_count: u64, bits_per_value: u32) -> u64 {
        match self {
            Format::Packed => self.byte_count(version, value_count, bits_per_value).div_ceil(8),
            Format::PackedSingleBlock => {
                debug_assert!(self.is_supported(bits_per_value));
                let values_per_block = u64::from(64 / bits_per_value);
                value_count.div_ceil(values_per_block)
            }
        }
    }

    pub fn is_supported(self, bits_per_value: u32) -> bool {
        match self {
            Format::Packed => (1..=64).contains(&bits_per_value),
            Format::PackedSingleBlock => SINGLE_BLOCK_BITS.contains(&bits_per_value),
        }
    }

    /// Wasted bits per stored value.
    pub fn overhead_per_value(self, bits_per_value: u32) -> f32 {
        debug_assert!(self.is_supported(bits_per_value));
        match self {
            Format::Packed => 0.0,
            Format::PackedSingleBlock => {
                let values_per_block = 64 / bits_per_value;
                let overhead = 64 % bits_per_value;
                overhead as f32 / values_per_block as f32
            }
        }
    }

    pub fn overhead_ratio(self, bits_per_value: u32) -> f32 {
        self.overhead_per_value(bits_per_value) / bits_per_value as f32
    }
}

//==================================================================================
// 2. Format Selection
//==================================================================================

/// A format together with the (possibly widened) number of bits per value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatAndBits {
    pub format: Format,
    pub bits_per_value: u32,
}

/// Finds the format and width that give the fastest random-access reader
/// whose memory overhead stays below `acceptable_overhead_ratio`.
///
/// Pass `usize::MAX` as `value_count` when the number of values is unknown.
pub fn fastest_format_and_bits(
    value_count: usize,
    bits_per_value: u32,
    acceptable_overhead_ratio: f32,
) -> FormatAndBits {
    let ratio = acceptable_overhead_ratio.clamp(OverheadRatio::COMPACT, OverheadRatio::FASTEST);
    let acceptable_overhead_per_value = ratio * bits_per_value as f32;
    let max_bits_per_value = bits_per_value + acceptable_overhead_per_value as u32;

    let fits = |width: u32| bits_per_value <= width && max_bits_per_value >= width;

    let packed = |bits| FormatAndBits { format: Format::Packed, bits_per_value: bits };
    if fits(8) {
        return packed(8);
    }
    if fits(16) {
        return packed(16);
    }
    if fits(32) {
        return packed(32);
    }
    if fits(64) {
        return packed(64);
    }
    if value_count <= THREE_BLOCKS_MAX_SIZE && fits(24) {
        return packed(24);
    }
    if value_count <= THREE_BLOCKS_MAX_SIZE && fits(48) {
        return packed(48);
    }

    for bpv in bits_per_value..=max_bits_per_value {
        if Format::PackedSingleBlock.is_supported(bpv) {
            let overhead = Format::PackedSingleBlock.overhead_per_value(bpv);
            let acceptable = acceptable_overhead_per_value + bits_per_value as f32 - bpv as f32;
            if overhead <= acceptable {
                return FormatAndBits { format: Format::PackedSingleBlock, bits_per_value: bpv };
            }
        }
    }
    packed(bits_per_value)
}

//==================================================================================
// 3. Bit Arithmetic Helpers
//==================================================================================

/// Number of bits needed to store `max_value`, never less than one.
pub fn bits_required(max_value: u64) -> u32 {
    (64 - max_value.leading_zeros()).max(1)
}

/// Like [`bits_required`], but reads a signed value as its raw 64-bit pattern,
/// so any negative input needs all 64 bits.
pub fn unsigned_bits_required(bits: i64) -> u32 {
    bits_required(bits as u64)
}

/// Largest value representable with `bits_per_value` bits.
///
/// Values live in the unsigned domain, so 64 bits maps to `u64::MAX`.
pub fn max_value(bits_per_value: u32) -> u64 {
    debug_assert!(bits_per_value <= 64);
    if bits_per_value == 64 {
        u64::MAX
    } else {
        !(u64::MAX << bits_per_value)
    }
}

/// Validates a power-of-two block size and returns its base-2 logarithm.
pub fn check_block_size(block_size: usize, min_block_size: usize, max_block_size: usize) -> Result<u32> {
    if block_size < min_block_size || block_size > max_block_size {
        return Err(PackedIntsError::InvalidBlockSize(format!(
            "blockSize must be >= {} and <= {}, got {}",
            min_block_size, max_block_size, block_size
        )));
    }
    if !block_size.is_power_of_two() {
        return Err(PackedIntsError::InvalidBlockSize(format!(
            "blockSize must be a power of two, got {}",
            block_size
        )));
    }
    Ok(block_size.trailing_zeros())
}

/// Number of blocks of `block_size` values needed to hold `size` values.
pub fn num_blocks(size: u64, block_size: usize) -> Result<usize> {
    let num_blocks = size.div_ceil(block_size as u64);
    usize::try_from(num_blocks).map_err(|_| {
        PackedIntsError::InvalidBlockSize(format!(
            "size {} is too large for block size {}",
            size, block_size
        ))
    })
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_byte_count_bounds() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..16 {
            let value_count = rng.random_range(1..=i32::MAX as u64);
            for format in Format::ALL {
                for bpv in (1..=64).filter(|&b| format.is_supported(b)) {
                    let byte_count = format.byte_count(VERSION_CURRENT, value_count, bpv);
                    assert!(byte_count * 8 >= value_count * u64::from(bpv));
                    if format == Format::Packed {
                        assert!((byte_count - 1) * 8 < value_count * u64::from(bpv));
                    }
                }
            }
        }
    }

    #[test]
    fn test_legacy_byte_count_is_long_aligned() {
        assert_eq!(Format::Packed.byte_count(VERSION_START, 3, 7), 8);
        assert_eq!(Format::Packed.byte_count(VERSION_CURRENT, 3, 7), 3);
        assert_eq!(Format::Packed.byte_count(VERSION_START, 10, 13), 24);
        assert_eq!(Format::Packed.byte_count(VERSION_CURRENT, 10, 13), 17);
        assert_eq!(Format::Packed.byte_count(VERSION_CURRENT, 0, 13), 0);
    }

    #[test]
    fn test_single_block_counts() {
        // 21 bits: three values per word, one wasted bit.
        assert_eq!(Format::PackedSingleBlock.long_count(VERSION_CURRENT, 7, 21), 3);
        assert_eq!(Format::PackedSingleBlock.byte_count(VERSION_CURRENT, 7, 21), 24);
        assert!((Format::PackedSingleBlock.overhead_per_value(21) - 1.0 / 3.0).abs() < 1e-6);
        assert!(!Format::PackedSingleBlock.is_supported(11));
    }

    #[test]
    fn test_bits_required() {
        assert_eq!(bits_required(0), 1);
        assert_eq!(bits_required(1), 1);
        assert_eq!(bits_required((1 << 61) - 1), 61);
        assert_eq!(bits_required(0x1FFF_FFFF_FFFF_FFFF), 61);
        assert_eq!(bits_required(0x3FFF_FFFF_FFFF_FFFF), 62);
        assert_eq!(bits_required(0x7FFF_FFFF_FFFF_FFFF), 63);
        assert_eq!(bits_required(u64::MAX), 64);
        assert_eq!(unsigned_bits_required(-1), 64);
        assert_eq!(unsigned_bits_required(5), 3);
    }

    #[test]
    fn test_max_values() {
        assert_eq!(max_value(1), 1);
        assert_eq!(max_value(2), 3);
        assert_eq!(max_value(8), 255);
        assert_eq!(max_value(63), i64::MAX as u64);
        assert_eq!(max_value(64), u64::MAX);
    }

    #[test]
    fn test_format_ids() {
        for format in Format::ALL {
            assert_eq!(Format::by_id(format.id()).unwrap(), format);
        }
        assert!(matches!(Format::by_id(7), Err(PackedIntsError::UnknownFormat(7))));
    }

    #[test]
    fn test_fastest_format_and_bits() {
        let fab = fastest_format_and_bits(1000, 7, OverheadRatio::FASTEST);
        assert_eq!(fab, FormatAndBits { format: Format::Packed, bits_per_value: 8 });

        let fab = fastest_format_and_bits(1000, 7, OverheadRatio::COMPACT);
        assert_eq!(fab.bits_per_value, 7);

        // 20 bits with 20% slack may widen to 24 (three blocks).
        let fab = fastest_format_and_bits(1000, 20, OverheadRatio::DEFAULT);
        assert_eq!(fab, FormatAndBits { format: Format::Packed, bits_per_value: 24 });

        // Too many values for three blocks: fall back to a single-block width.
        let fab = fastest_format_and_bits(usize::MAX, 20, OverheadRatio::DEFAULT);
        assert_eq!(fab, FormatAndBits { format: Format::PackedSingleBlock, bits_per_value: 21 });
    }

    #[test]
    fn test_check_block_size() {
        assert_eq!(check_block_size(1024, 64, 1 << 27).unwrap(), 10);
        assert!(check_block_size(1000, 64, 1 << 27).is_err());
        assert!(check_block_size(32, 64, 1 << 27).is_err());
        assert_eq!(num_blocks(1025, 1024).unwrap(), 2);
        assert_eq!(num_blocks(0, 1024).unwrap(), 0);
    }

    #[test]
    fn test_check_version() {
        assert!(check_version(VERSION_START).is_ok());
        assert!(check_version(VERSION_CURRENT).is_ok());
        assert!(matches!(
            check_version(VERSION_CURRENT + 1),
            Err(PackedIntsError::UnsupportedVersion { .. })
        ));
    }
}
