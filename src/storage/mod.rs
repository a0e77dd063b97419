// In: src/storage/mod.rs

//! In-memory packed arrays and the factories that pick between them.
//!
//! The factories are the intended entry point: given a bit width and an
//! acceptable memory overhead they return the fastest layout that fits, and
//! given a stream (with or without a header) they return the matching reader,
//! iterator, storage-backed reader or writer.

use log::debug;

use crate::direct::{DirectPacked64SingleBlockReader, DirectPackedReader};
use crate::error::{PackedIntsError, Result};
use crate::format::{
    check_version, fastest_format_and_bits, Format, THREE_BLOCKS_MAX_SIZE, VERSION_CURRENT, VERSION_START,
};
use crate::store::{DataInput, DataOutput, IndexInput};
use crate::stream::{PackedReaderIterator, PackedWriter};
use crate::traits::{DirectReader, Mutable, Reader};

mod fixed;
mod null;
mod packed64;
mod single_block;
mod three_blocks;

pub use fixed::{Direct16, Direct32, Direct64, Direct8};
pub use null::NullReader;
pub use packed64::Packed64;
pub use single_block::Packed64SingleBlock;
pub use three_blocks::{Packed16ThreeBlocks, Packed8ThreeBlocks};

//==================================================================================
// 1. Stream Header
//==================================================================================

/// Metadata written in front of a self-describing packed stream:
/// `[vint version][vint bits][vint count][vint format id]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub format: Format,
    pub value_count: usize,
    pub bits_per_value: u32,
    pub version: u32,
}

impl Header {
    pub fn write<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
        let value_count = u32::try_from(self.value_count).map_err(|_| {
            PackedIntsError::InvalidConfig(format!("value count {} does not fit a header", self.value_count))
        })?;
        out.write_vint(self.version)?;
        out.write_vint(self.bits_per_value)?;
        out.write_vint(value_count)?;
        out.write_vint(self.format.id())?;
        Ok(())
    }

    pub fn read<R: DataInput + ?Sized>(input: &mut R) -> Result<Header> {
        let version = input.read_vint()?;
        check_version(version)?;
        let bits_per_value = input.read_vint()?;
        if !(1..=64).contains(&bits_per_value) {
            return Err(PackedIntsError::Corrupted(format!("bitsPerValue={}", bits_per_value)));
        }
        let value_count = input.read_vint()? as usize;
        let format = Format::by_id(input.read_vint()?)?;
        if !format.is_supported(bits_per_value) {
            return Err(PackedIntsError::UnsupportedBitsPerValue { format, bits_per_value });
        }
        Ok(Header { format, value_count, bits_per_value, version })
    }
}

//==================================================================================
// 2. Mutable Factories
//==================================================================================

/// Creates a zeroed array of `value_count` values able to hold
/// `bits_per_value` bits each, trading up to `acceptable_overhead_ratio`
/// extra memory for speed.
pub fn get_mutable(value_count: usize, bits_per_value: u32, acceptable_overhead_ratio: f32) -> Box<dyn Mutable> {
    let fab = fastest_format_and_bits(value_count, bits_per_value, acceptable_overhead_ratio);
    get_mutable_with_format(value_count, fab.bits_per_value, fab.format)
}

/// Creates a zeroed array with an explicit layout. `bits_per_value` must be
/// supported by `format`.
pub fn get_mutable_with_format(value_count: usize, bits_per_value: u32, format: Format) -> Box<dyn Mutable> {
    assert!(
        format.is_supported(bits_per_value),
        "{:?} does not support {} bits per value",
        format,
        bits_per_value
    );
    match format {
        Format::PackedSingleBlock => Box::new(Packed64SingleBlock::with_supported_width(value_count, bits_per_value)),
        Format::Packed => match bits_per_value {
            8 => Box::new(Direct8::new(value_count)),
            16 => Box::new(Direct16::new(value_count)),
            32 => Box::new(Direct32::new(value_count)),
            64 => Box::new(Direct64::new(value_count)),
            24 if value_count <= THREE_BLOCKS_MAX_SIZE => Box::new(Packed8ThreeBlocks::new(value_count)),
            48 if value_count <= THREE_BLOCKS_MAX_SIZE => Box::new(Packed16ThreeBlocks::new(value_count)),
            _ => Box::new(Packed64::new(value_count, bits_per_value)),
        },
    }
}

//==================================================================================
// 3. Reader Factories
//==================================================================================

/// Loads an in-memory reader for a stream whose metadata is known.
pub fn get_reader_no_header<R: DataInput + ?Sized>(
    input: &mut R,
    format: Format,
    version: u32,
    value_count: usize,
    bits_per_value: u32,
) -> Result<Box<dyn Mutable>> {
    check_version(version)?;
    if !format.is_supported(bits_per_value) {
        return Err(PackedIntsError::UnsupportedBitsPerValue { format, bits_per_value });
    }
    let reader: Box<dyn Mutable> = match format {
        Format::PackedSingleBlock => Box::new(Packed64SingleBlock::from_stream(input, value_count, bits_per_value)?),
        Format::Packed => match bits_per_value {
            8 => Box::new(Direct8::from_stream(version, input, value_count)?),
            16 => Box::new(Direct16::from_stream(version, input, value_count)?),
            32 => Box::new(Direct32::from_stream(version, input, value_count)?),
            64 => Box::new(Direct64::from_stream(version, input, value_count)?),
            24 if value_count <= THREE_BLOCKS_MAX_SIZE => {
                Box::new(Packed8ThreeBlocks::from_stream(version, input, value_count)?)
            }
            48 if value_count <= THREE_BLOCKS_MAX_SIZE => {
                Box::new(Packed16ThreeBlocks::from_stream(version, input, value_count)?)
            }
            _ => Box::new(Packed64::from_stream(version, input, value_count, bits_per_value)?),
        },
    };
    Ok(reader)
}

/// Reads a header, then loads the values it describes.
pub fn get_reader<R: DataInput + ?Sized>(input: &mut R) -> Result<Box<dyn Mutable>> {
    let header = Header::read(input)?;
    debug!("loading packed reader: {:?}", header);
    get_reader_no_header(input, header.format, header.version, header.value_count, header.bits_per_value)
}

/// Wraps `input` (positioned at the first byte of the values) in a reader
/// that decodes each value from storage on demand.
pub fn get_direct_reader_no_header<'r, R: IndexInput + 'r>(
    mut input: R,
    format: Format,
    version: u32,
    value_count: usize,
    bits_per_value: u32,
) -> Result<Box<dyn DirectReader + 'r>> {
    check_version(version)?;
    if !format.is_supported(bits_per_value) {
        return Err(PackedIntsError::UnsupportedBitsPerValue { format, bits_per_value });
    }
    match format {
        Format::PackedSingleBlock => Ok(Box::new(DirectPacked64SingleBlockReader::new(
            input,
            bits_per_value,
            value_count,
        )?)),
        Format::Packed => {
            let byte_count = format.byte_count(version, value_count as u64, bits_per_value);
            if byte_count != format.byte_count(VERSION_CURRENT, value_count as u64, bits_per_value) {
                debug_assert_eq!(version, VERSION_START);
                // Long-aligned data: reading the last value must also move past the padding.
                let end_pointer = input.file_pointer()? + byte_count;
                let reader = DirectPackedReader::new(input, bits_per_value, value_count)?;
                Ok(Box::new(reader.with_end_pointer(end_pointer)))
            } else {
                Ok(Box::new(DirectPackedReader::new(input, bits_per_value, value_count)?))
            }
        }
    }
}

/// Reads a header, then wraps the rest of `input` in a storage-backed reader.
pub fn get_direct_reader<'r, R: IndexInput + 'r>(mut input: R) -> Result<Box<dyn DirectReader + 'r>> {
    let header = Header::read(&mut input)?;
    get_direct_reader_no_header(input, header.format, header.version, header.value_count, header.bits_per_value)
}

/// Sequential iterator over a stream whose metadata is known.
pub fn get_reader_iterator_no_header<R: DataInput>(
    input: R,
    format: Format,
    version: u32,
    value_count: usize,
    bits_per_value: u32,
    buffer_size_bytes: usize,
) -> Result<PackedReaderIterator<R>> {
    PackedReaderIterator::new(input, format, version, value_count, bits_per_value, buffer_size_bytes)
}

/// Reads a header, then iterates over the values it describes.
pub fn get_reader_iterator<R: DataInput>(mut input: R, buffer_size_bytes: usize) -> Result<PackedReaderIterator<R>> {
    let header = Header::read(&mut input)?;
    get_reader_iterator_no_header(
        input,
        header.format,
        header.version,
        header.value_count,
        header.bits_per_value,
        buffer_size_bytes,
    )
}

//==================================================================================
// 4. Writer Factories
//==================================================================================

/// A writer for an explicit layout that emits no header.
pub fn get_writer_no_header<W: DataOutput>(
    out: W,
    format: Format,
    value_count: Option<usize>,
    bits_per_value: u32,
    buffer_size_bytes: usize,
) -> Result<PackedWriter<W>> {
    PackedWriter::new(out, format, value_count, bits_per_value, buffer_size_bytes)
}

/// Picks the fastest layout for `bits_required` within the overhead budget,
/// writes a header and returns the writer for the values.
pub fn get_writer<W: DataOutput>(
    out: W,
    value_count: usize,
    bits_required: u32,
    acceptable_overhead_ratio: f32,
) -> Result<PackedWriter<W>> {
    let fab = fastest_format_and_bits(value_count, bits_required, acceptable_overhead_ratio);
    let mut writer = get_writer_no_header(
        out,
        fab.format,
        Some(value_count),
        fab.bits_per_value,
        crate::format::DEFAULT_BUFFER_SIZE,
    )?;
    writer.write_header()?;
    Ok(writer)
}

//==================================================================================
// 5. Copy
//==================================================================================

/// Copies `len` values from `src[src_pos..]` to `dest[dest_pos..]` through a
/// buffer of at most `mem` bytes.
pub fn copy<S, D>(src: &S, src_pos: usize, dest: &mut D, dest_pos: usize, len: usize, mem: usize)
where
    S: Reader + ?Sized,
    D: Mutable + ?Sized,
{
    assert!(src_pos + len <= src.size());
    assert!(dest_pos + len <= dest.size());
    let capacity = mem >> 3;
    if capacity == 0 {
        for i in 0..len {
            dest.set(dest_pos + i, src.get(src_pos + i));
        }
    } else if len > 0 {
        let mut buf = vec![0u64; capacity.min(len)];
        copy_with_buffer(src, src_pos, dest, dest_pos, len, &mut buf);
    }
}

/// Same as [`copy`] with a caller-provided buffer.
pub fn copy_with_buffer<S, D>(
    src: &S,
    mut src_pos: usize,
    dest: &mut D,
    mut dest_pos: usize,
    mut len: usize,
    buf: &mut [u64],
) where
    S: Reader + ?Sized,
    D: Mutable + ?Sized,
{
    assert!(!buf.is_empty());
    let capacity = buf.len();
    // `remaining` values sit at the head of `buf` waiting to be written.
    let mut remaining = 0;
    while len > 0 {
        let chunk = len.min(capacity - remaining);
        let read = src.get_bulk(src_pos, &mut buf[remaining..remaining + chunk]);
        debug_assert!(read > 0);
        src_pos += read;
        len -= read;
        remaining += read;
        let written = dest.set_bulk(dest_pos, &buf[..remaining]);
        debug_assert!(written > 0);
        dest_pos += written;
        if written < remaining {
            buf.copy_within(written..remaining, 0);
        }
        remaining -= written;
    }
    while remaining > 0 {
        let written = dest.set_bulk(dest_pos, &buf[..remaining]);
        dest_pos += written;
        remaining -= written;
        buf.copy_within(written..written + remaining, 0);
    }
}
