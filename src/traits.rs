//! This module defines shared traits used across the kernels and the storage types.

use std::io::Write;

use crate::error::Result;
use crate::format::Format;

//==================================================================================
// 1. Signed/Unsigned Type Mapping
//==================================================================================

/// A trait that maps a signed integer type to its unsigned counterpart.
pub trait HasUnsigned {
    type Unsigned;

    /// Reinterprets the two's complement bit pattern as the unsigned type.
    fn to_unsigned_bits(self) -> Self::Unsigned;
}

/// A trait that maps an unsigned integer type to its signed counterpart.
pub trait HasSigned {
    type Signed;

    /// Reinterprets the bit pattern as the signed two's complement type.
    fn to_signed_bits(self) -> Self::Signed;
}

// Implement the traits for all primitive integer types.
macro_rules! impl_signed_unsigned_pair {
    ($S:ty, $U:ty) => {
        impl HasUnsigned for $S {
            type Unsigned = $U;
            #[inline]
            fn to_unsigned_bits(self) -> $U {
                self as $U
            }
        }
        impl HasSigned for $U {
            type Signed = $S;
            #[inline]
            fn to_signed_bits(self) -> $S {
                self as $S
            }
        }
    };
}

impl_signed_unsigned_pair!(i8, u8);
impl_signed_unsigned_pair!(i16, u16);
impl_signed_unsigned_pair!(i32, u32);
impl_signed_unsigned_pair!(i64, u64);

//==================================================================================
// 2. Random-Access Integer Arrays
//==================================================================================

/// Read-only random access to a fixed number of unsigned values.
///
/// Memory-resident implementations are immutable once built and may be shared
/// across threads.
pub trait Reader: Send + Sync {
    /// Returns the value at `index`. Panics if `index >= size()`.
    fn get(&self, index: usize) -> u64;

    /// Copies up to `buf.len()` values starting at `index` into `buf` and
    /// returns how many were copied. At least one value is copied.
    fn get_bulk(&self, index: usize, buf: &mut [u64]) -> usize {
        assert!(!buf.is_empty(), "len must be > 0 (got {})", buf.len());
        assert!(index < self.size(), "index out of bounds: {} >= {}", index, self.size());
        let gets = buf.len().min(self.size() - index);
        for (i, slot) in buf[..gets].iter_mut().enumerate() {
            *slot = self.get(index + i);
        }
        gets
    }

    fn bits_per_value(&self) -> u32;

    /// The number of values.
    fn size(&self) -> usize;

    /// Approximate heap footprint in bytes.
    fn ram_bytes_used(&self) -> usize;
}

/// A [`Reader`] whose values can be modified in place.
pub trait Mutable: Reader {
    /// Sets the value at `index`. The value must fit in `bits_per_value()` bits.
    fn set(&mut self, index: usize, value: u64);

    /// Copies up to `values.len()` values into the array starting at `index`
    /// and returns how many were written.
    fn set_bulk(&mut self, index: usize, values: &[u64]) -> usize {
        assert!(!values.is_empty(), "len must be > 0 (got {})", values.len());
        assert!(index < self.size(), "index out of bounds: {} >= {}", index, self.size());
        let sets = values.len().min(self.size() - index);
        for (i, &value) in values[..sets].iter().enumerate() {
            self.set(index + i, value);
        }
        sets
    }

    /// Sets every value in `from..to` to `value`.
    fn fill(&mut self, from: usize, to: usize, value: u64) {
        assert!(value <= crate::format::max_value(self.bits_per_value()));
        assert!(from <= to);
        for index in from..to {
            self.set(index, value);
        }
    }

    /// Sets all values to zero.
    fn clear(&mut self) {
        let size = self.size();
        self.fill(0, size, 0);
    }

    /// The layout this array serializes with.
    fn format(&self) -> Format {
        Format::Packed
    }

    /// Writes a header followed by every value, readable back with
    /// [`crate::storage::get_reader`].
    fn save(&self, out: &mut dyn Write) -> Result<()> {
        let mut writer = crate::storage::get_writer_no_header(
            out,
            self.format(),
            Some(self.size()),
            self.bits_per_value(),
            crate::format::DEFAULT_BUFFER_SIZE,
        )?;
        writer.write_header()?;
        for index in 0..self.size() {
            writer.add(self.get(index))?;
        }
        writer.finish()
    }
}

impl<T: Reader + ?Sized> Reader for Box<T> {
    fn get(&self, index: usize) -> u64 {
        (**self).get(index)
    }
    fn get_bulk(&self, index: usize, buf: &mut [u64]) -> usize {
        (**self).get_bulk(index, buf)
    }
    fn bits_per_value(&self) -> u32 {
        (**self).bits_per_value()
    }
    fn size(&self) -> usize {
        (**self).size()
    }
    fn ram_bytes_used(&self) -> usize {
        (**self).ram_bytes_used()
    }
}

impl<T: Mutable + ?Sized> Mutable for Box<T> {
    fn set(&mut self, index: usize, value: u64) {
        (**self).set(index, value)
    }
    fn set_bulk(&mut self, index: usize, values: &[u64]) -> usize {
        (**self).set_bulk(index, values)
    }
    fn fill(&mut self, from: usize, to: usize, value: u64) {
        (**self).fill(from, to, value)
    }
    fn clear(&mut self) {
        (**self).clear()
    }
    fn format(&self) -> Format {
        (**self).format()
    }
    fn save(&self, out: &mut dyn Write) -> Result<()> {
        (**self).save(out)
    }
}

//==================================================================================
// 3. Storage-Backed Access
//==================================================================================

/// Random access that decodes each value straight from a seekable stream.
///
/// Implementations own their stream handle and are not `Sync`; give each
/// thread its own reader.
pub trait DirectReader {
    /// Seeks to and decodes the value at `index`.
    fn get(&self, index: usize) -> Result<u64>;

    fn bits_per_value(&self) -> u32;

    fn size(&self) -> usize;

    /// Storage-backed readers hold no decoded values.
    fn ram_bytes_used(&self) -> usize {
        0
    }
}
