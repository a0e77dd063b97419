// In: src/store.rs

//! Byte-stream primitives the codecs read from and write to.
//!
//! Fixed-width integers are big-endian. Variable-length integers are LEB128.
//! The traits are blanket-implemented for every `std::io` reader and writer,
//! so a `File`, a `Cursor<Vec<u8>>` or a `&mut dyn Write` all work directly.

use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::kernels::leb128;

//==================================================================================
// 1. Input
//==================================================================================

pub trait DataInput {
    fn read_byte(&mut self) -> io::Result<u8>;
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<()>;
    fn read_short(&mut self) -> io::Result<u16>;
    fn read_int(&mut self) -> io::Result<u32>;
    fn read_long(&mut self) -> io::Result<u64>;
    fn read_vint(&mut self) -> io::Result<u32>;
    fn read_vlong(&mut self) -> io::Result<u64>;
    /// Reads the nine-byte bounded variable-length long of block headers.
    fn read_block_vlong(&mut self) -> io::Result<u64>;
    /// Advances past `count` bytes, failing if the stream ends first.
    fn skip_bytes(&mut self, count: u64) -> io::Result<()>;
}

impl<R: Read + ?Sized> DataInput for R {
    fn read_byte(&mut self) -> io::Result<u8> {
        self.read_u8()
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.read_exact(buf)
    }

    fn read_short(&mut self) -> io::Result<u16> {
        self.read_u16::<BigEndian>()
    }

    fn read_int(&mut self) -> io::Result<u32> {
        self.read_u32::<BigEndian>()
    }

    fn read_long(&mut self) -> io::Result<u64> {
        self.read_u64::<BigEndian>()
    }

    fn read_vint(&mut self) -> io::Result<u32> {
        leb128::decode_one(self)
    }

    fn read_vlong(&mut self) -> io::Result<u64> {
        leb128::decode_one(self)
    }

    fn read_block_vlong(&mut self) -> io::Result<u64> {
        leb128::decode_block_vlong(self)
    }

    fn skip_bytes(&mut self, count: u64) -> io::Result<()> {
        let skipped = io::copy(&mut <&mut R as Read>::take(self, count), &mut io::sink())?;
        if skipped != count {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("tried to skip {} bytes but the stream ended after {}", count, skipped),
            ));
        }
        Ok(())
    }
}

/// A [`DataInput`] with random access.
pub trait IndexInput: DataInput {
    /// Current absolute offset in the stream.
    fn file_pointer(&mut self) -> io::Result<u64>;

    /// Moves to absolute offset `pos`.
    fn seek_to(&mut self, pos: u64) -> io::Result<()>;
}

impl<R: Read + Seek + ?Sized> IndexInput for R {
    fn file_pointer(&mut self) -> io::Result<u64> {
        self.stream_position()
    }

    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(pos)).map(|_| ())
    }
}

//==================================================================================
// 2. Output
//==================================================================================

pub trait DataOutput {
    fn write_byte(&mut self, b: u8) -> io::Result<()>;
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<()>;
    fn write_short(&mut self, v: u16) -> io::Result<()>;
    fn write_int(&mut self, v: u32) -> io::Result<()>;
    fn write_long(&mut self, v: u64) -> io::Result<()>;
    fn write_vint(&mut self, v: u32) -> io::Result<()>;
    fn write_vlong(&mut self, v: u64) -> io::Result<()>;
    fn write_block_vlong(&mut self, v: u64) -> io::Result<()>;
}

impl<W: Write + ?Sized> DataOutput for W {
    fn write_byte(&mut self, b: u8) -> io::Result<()> {
        self.write_u8(b)
    }

    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write_all(buf)
    }

    fn write_short(&mut self, v: u16) -> io::Result<()> {
        self.write_u16::<BigEndian>(v)
    }

    fn write_int(&mut self, v: u32) -> io::Result<()> {
        self.write_u32::<BigEndian>(v)
    }

    fn write_long(&mut self, v: u64) -> io::Result<()> {
        self.write_u64::<BigEndian>(v)
    }

    fn write_vint(&mut self, v: u32) -> io::Result<()> {
        leb128::encode_one(v, self)
    }

    fn write_vlong(&mut self, v: u64) -> io::Result<()> {
        leb128::encode_one(v, self)
    }

    fn write_block_vlong(&mut self, v: u64) -> io::Result<()> {
        leb128::encode_block_vlong(v, self)
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    // Only the stream traits: byteorder's extension traits have their own
    // `read_int`/`write_int` with a different arity.
    use super::{DataInput, DataOutput, IndexInput};
    use std::io::{self, Cursor};

    #[test]
    fn test_fixed_width_is_big_endian() {
        let mut out = Vec::new();
        out.write_short(0x0102).unwrap();
        out.write_int(0x0304_0506).unwrap();
        out.write_long(0x0708_090A_0B0C_0D0E).unwrap();
        assert_eq!(out, (1u8..=14).collect::<Vec<_>>());

        let mut input = Cursor::new(out);
        assert_eq!(input.read_short().unwrap(), 0x0102);
        assert_eq!(input.read_int().unwrap(), 0x0304_0506);
        assert_eq!(input.read_long().unwrap(), 0x0708_090A_0B0C_0D0E);
    }

    #[test]
    fn test_varints_and_positioning() {
        let mut out = Vec::new();
        out.write_vint(300).unwrap();
        out.write_vlong(1 << 40).unwrap();
        out.write_byte(0xAB).unwrap();

        let mut input = Cursor::new(out);
        assert_eq!(input.read_vint().unwrap(), 300);
        assert_eq!(input.file_pointer().unwrap(), 2);
        assert_eq!(input.read_vlong().unwrap(), 1 << 40);
        let end = input.file_pointer().unwrap();
        input.seek_to(0).unwrap();
        input.skip_bytes(end).unwrap();
        assert_eq!(input.read_byte().unwrap(), 0xAB);
    }

    #[test]
    fn test_block_vlong_caps_at_nine_bytes() {
        let mut out = Vec::new();
        out.write_block_vlong(u64::MAX).unwrap();
        out.write_block_vlong(5).unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(out[8], 0xFF);

        let mut input = Cursor::new(out);
        assert_eq!(input.read_block_vlong().unwrap(), u64::MAX);
        assert_eq!(input.read_block_vlong().unwrap(), 5);
    }

    #[test]
    fn test_skip_past_end_fails() {
        let mut input = Cursor::new(vec![0u8; 4]);
        let err = input.skip_bytes(5).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
