// In: src/direct.rs

//! Readers that decode a single value straight from a seekable stream.
//!
//! Nothing is buffered: every `get` seeks to the bytes holding the value and
//! reads just those. Each reader owns its stream handle behind a `RefCell`, so
//! a reader can be moved to another thread but not shared; open one handle per
//! concurrent reader. I/O failures surface as [`PackedIntsError::State`].

use std::cell::RefCell;
use std::io;

use log::debug;

use crate::error::{PackedIntsError, Result};
use crate::format::{max_value, Format};
use crate::store::IndexInput;
use crate::traits::DirectReader;

//==================================================================================
// 1. Byte-Granular Decoding
//==================================================================================

/// Decodes the `index`-th value of a `Packed` run of `bits_per_value`-bit values
/// that starts at byte offset `start`.
///
/// Reads the 1 to 9 bytes covering the value with big-endian fixed-width reads.
pub(crate) fn read_packed_at<I: IndexInput + ?Sized>(
    input: &mut I,
    start: u64,
    bits_per_value: u32,
    index: u64,
) -> io::Result<u64> {
    debug_assert!((1..=64).contains(&bits_per_value));
    let major_bit_pos = index * u64::from(bits_per_value);
    let element_pos = major_bit_pos >> 3;
    input.seek_to(start + element_pos)?;

    let bit_pos = (major_bit_pos & 7) as u32;
    // Round the bits up to whole bytes.
    let rounded_bits = (bit_pos + bits_per_value + 7) & !7;
    // Trailing bits read past the value.
    let mut shift_right_bits = rounded_bits - bit_pos - bits_per_value;

    let raw_value = match rounded_bits >> 3 {
        1 => u64::from(input.read_byte()?),
        2 => u64::from(input.read_short()?),
        3 => (u64::from(input.read_short()?) << 8) | u64::from(input.read_byte()?),
        4 => u64::from(input.read_int()?),
        5 => (u64::from(input.read_int()?) << 8) | u64::from(input.read_byte()?),
        6 => (u64::from(input.read_int()?) << 16) | u64::from(input.read_short()?),
        7 => {
            (u64::from(input.read_int()?) << 24)
                | (u64::from(input.read_short()?) << 8)
                | u64::from(input.read_byte()?)
        }
        8 => input.read_long()?,
        9 => {
            // Shift the leading bits out before they overflow, then skip the final shift.
            let high = input.read_long()? << (8 - shift_right_bits);
            let low = u64::from(input.read_byte()?) >> shift_right_bits;
            shift_right_bits = 0;
            high | low
        }
        bytes => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("bitsPerValue too large: {} ({} bytes)", bits_per_value, bytes),
            ))
        }
    };
    Ok((raw_value >> shift_right_bits) & max_value(bits_per_value))
}

//==================================================================================
// 2. Packed Layout
//==================================================================================

/// Storage-backed reader for the `Packed` layout.
#[derive(Debug)]
pub struct DirectPackedReader<R> {
    input: RefCell<R>,
    start_pointer: u64,
    bits_per_value: u32,
    value_count: usize,
    /// Where to leave the stream after reading the last value, for legacy
    /// long-aligned runs whose padding must also be consumed.
    end_pointer: Option<u64>,
}

impl<R: IndexInput> DirectPackedReader<R> {
    /// Wraps `input`, whose current position is the first byte of the run.
    pub fn new(mut input: R, bits_per_value: u32, value_count: usize) -> Result<Self> {
        assert!((1..=64).contains(&bits_per_value), "bitsPerValue={}", bits_per_value);
        let start_pointer = input.file_pointer()?;
        debug!(
            "direct packed reader: start={} bits={} values={}",
            start_pointer, bits_per_value, value_count
        );
        Ok(DirectPackedReader {
            input: RefCell::new(input),
            start_pointer,
            bits_per_value,
            value_count,
            end_pointer: None,
        })
    }

    /// Makes reading the last value leave the stream at `end_pointer`.
    pub fn with_end_pointer(mut self, end_pointer: u64) -> Self {
        self.end_pointer = Some(end_pointer);
        self
    }

    pub fn start_pointer(&self) -> u64 {
        self.start_pointer
    }

    pub fn into_inner(self) -> R {
        self.input.into_inner()
    }
}

impl<R: IndexInput> DirectReader for DirectPackedReader<R> {
    fn get(&self, index: usize) -> Result<u64> {
        assert!(index < self.value_count, "index out of bounds: {} >= {}", index, self.value_count);
        let mut input = self.input.borrow_mut();
        let value = read_packed_at(&mut *input, self.start_pointer, self.bits_per_value, index as u64)
            .map_err(PackedIntsError::state)?;
        if let Some(end_pointer) = self.end_pointer {
            if index == self.value_count - 1 {
                input.seek_to(end_pointer).map_err(PackedIntsError::state)?;
            }
        }
        Ok(value)
    }

    fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    fn size(&self) -> usize {
        self.value_count
    }
}

//==================================================================================
// 3. Single-Block Layout
//==================================================================================

/// Storage-backed reader for the `PackedSingleBlock` layout: one aligned
/// 8-byte read per value.
#[derive(Debug)]
pub struct DirectPacked64SingleBlockReader<R> {
    input: RefCell<R>,
    start_pointer: u64,
    bits_per_value: u32,
    value_count: usize,
    values_per_block: usize,
    mask: u64,
}

impl<R: IndexInput> DirectPacked64SingleBlockReader<R> {
    pub fn new(mut input: R, bits_per_value: u32, value_count: usize) -> Result<Self> {
        assert!(
            Format::PackedSingleBlock.is_supported(bits_per_value),
            "bitsPerValue={}",
            bits_per_value
        );
        let start_pointer = input.file_pointer()?;
        Ok(DirectPacked64SingleBlockReader {
            input: RefCell::new(input),
            start_pointer,
            bits_per_value,
            value_count,
            values_per_block: (64 / bits_per_value) as usize,
            mask: max_value(bits_per_value),
        })
    }

    pub fn into_inner(self) -> R {
        self.input.into_inner()
    }

    fn read(&self, index: usize) -> io::Result<u64> {
        let block_offset = (index / self.values_per_block) as u64;
        let mut input = self.input.borrow_mut();
        input.seek_to(self.start_pointer + (block_offset << 3))?;
        let block = input.read_long()?;
        let offset_in_block = (index % self.values_per_block) as u32;
        Ok((block >> (offset_in_block * self.bits_per_value)) & self.mask)
    }
}

impl<R: IndexInput> DirectReader for DirectPacked64SingleBlockReader<R> {
    fn get(&self, index: usize) -> Result<u64> {
        assert!(index < self.value_count, "index out of bounds: {} >= {}", index, self.value_count);
        self.read(index).map_err(PackedIntsError::state)
    }

    fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    fn size(&self) -> usize {
        self.value_count
    }
}
