// In: src/bitstream.rs

//! Arbitrary bit-width reader and writer over a byte stream.
//!
//! Values are written most significant bit first. Unlike the bulk kernels the
//! width may change from one call to the next, which makes these types handy
//! for small heterogeneous headers. A partially filled trailing byte is padded
//! with zero bits on `flush`.

use crate::error::Result;
use crate::format::max_value;
use crate::store::{DataInput, DataOutput};

//==================================================================================
// 1. Writer
//==================================================================================

#[derive(Debug)]
pub struct BitWriter<W> {
    out: W,
    current: u64,
    remaining_bits: u32,
}

impl<W: DataOutput> BitWriter<W> {
    pub fn new(out: W) -> Self {
        BitWriter { out, current: 0, remaining_bits: 8 }
    }

    /// Appends the low `bits_per_value` bits of `value`.
    pub fn write_long(&mut self, value: u64, bits_per_value: u32) -> Result<()> {
        assert!(bits_per_value <= 64, "bitsPerValue={}", bits_per_value);
        assert!(
            bits_per_value == 64 || value <= max_value(bits_per_value),
            "value {} does not fit in {} bits",
            value,
            bits_per_value
        );
        let mut pending = bits_per_value;
        while pending > 0 {
            if self.remaining_bits == 0 {
                self.out.write_byte(self.current as u8)?;
                self.current = 0;
                self.remaining_bits = 8;
            }
            let bits = self.remaining_bits.min(pending);
            let chunk = (value >> (pending - bits)) & ((1u64 << bits) - 1);
            self.current |= chunk << (self.remaining_bits - bits);
            pending -= bits;
            self.remaining_bits -= bits;
        }
        Ok(())
    }

    /// Writes the pending byte (zero padded) if any bits are buffered.
    pub fn flush(&mut self) -> Result<()> {
        if self.remaining_bits < 8 {
            self.out.write_byte(self.current as u8)?;
        }
        self.remaining_bits = 8;
        self.current = 0;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Returns the underlying stream. Call [`BitWriter::flush`] first.
    pub fn into_inner(self) -> W {
        self.out
    }
}

//==================================================================================
// 2. Reader
//==================================================================================

#[derive(Debug)]
pub struct BitReader<R> {
    input: R,
    current: u64,
    remaining_bits: u32,
}

impl<R: DataInput> BitReader<R> {
    pub fn new(input: R) -> Self {
        BitReader { input, current: 0, remaining_bits: 0 }
    }

    /// Reads the next `bits_per_value` bits as an unsigned value.
    pub fn read_long(&mut self, bits_per_value: u32) -> Result<u64> {
        assert!(bits_per_value <= 64, "bitsPerValue={}", bits_per_value);
        let mut pending = bits_per_value;
        let mut result = 0u64;
        while pending > 0 {
            if self.remaining_bits == 0 {
                self.current = u64::from(self.input.read_byte()?);
                self.remaining_bits = 8;
            }
            let bits = pending.min(self.remaining_bits);
            let chunk = (self.current >> (self.remaining_bits - bits)) & ((1u64 << bits) - 1);
            result = (result << bits) | chunk;
            pending -= bits;
            self.remaining_bits -= bits;
        }
        Ok(result)
    }

    /// Drops the rest of the current byte so the next read starts aligned.
    pub fn skip_to_next_byte(&mut self) {
        self.remaining_bits = 0;
    }

    pub fn into_inner(self) -> R {
        self.input
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PackedIntsError;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::io::Cursor;

    #[test]
    fn test_mixed_widths_roundtrip() {
        let mut rng = StdRng::seed_from_u64(0xB175);
        let entries: Vec<(u64, u32)> = (0..500)
            .map(|_| {
                let bits = rng.random_range(1..=64);
                (rng.random::<u64>() & max_value(bits), bits)
            })
            .collect();

        let mut writer = BitWriter::new(Vec::new());
        for &(value, bits) in &entries {
            writer.write_long(value, bits).unwrap();
        }
        writer.flush().unwrap();
        let bytes = writer.into_inner();
        let total_bits: u64 = entries.iter().map(|&(_, b)| u64::from(b)).sum();
        assert_eq!(bytes.len() as u64, total_bits.div_ceil(8));

        let mut reader = BitReader::new(Cursor::new(bytes));
        for &(value, bits) in &entries {
            assert_eq!(reader.read_long(bits).unwrap(), value);
        }
    }

    #[test]
    fn test_flush_pads_with_zero_bits() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_long(0b101, 3).unwrap();
        writer.flush().unwrap();
        writer.write_long(0xFFF, 12).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.get_ref(), &vec![0b1010_0000, 0xFF, 0xF0]);
    }

    #[test]
    fn test_skip_to_next_byte() {
        let mut reader = BitReader::new(Cursor::new(vec![0b1110_0000, 0xAB]));
        assert_eq!(reader.read_long(3).unwrap(), 0b111);
        reader.skip_to_next_byte();
        assert_eq!(reader.read_long(8).unwrap(), 0xAB);
        assert!(matches!(reader.read_long(1), Err(PackedIntsError::Io(_))));
    }

    #[test]
    #[should_panic]
    fn test_value_wider_than_bits_panics() {
        let mut writer = BitWriter::new(Vec::new());
        let _ = writer.write_long(8, 3);
    }
}
