//! This module contains the pure, stateless kernels for LEB128 (Little-Endian
//! Base 128) variable-length integer encoding and decoding over byte streams.
//!
//! Two flavours are provided. The standard one (`encode_one`/`decode_one`) is
//! what `write_vint`/`write_vlong` put on the wire. The block flavour
//! (`encode_block_vlong`/`decode_block_vlong`) caps the encoding at nine bytes
//! by letting the ninth byte carry a full eight bits, which lets block headers
//! store any 64-bit pattern.

use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};
use num_traits::{PrimInt, Unsigned};

fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

//==================================================================================
// 1. Standard LEB128
//==================================================================================

/// Encodes a single unsigned integer as LEB128 onto `out`.
pub fn encode_one<T, W>(value: T, out: &mut W) -> io::Result<()>
where
    T: PrimInt + Unsigned,
    W: Write + ?Sized,
{
    let seven_bit_mask = T::from(0x7F).ok_or_else(|| invalid_data("7-bit mask does not fit type"))?;

    let mut current = value;
    while current & !seven_bit_mask != T::zero() {
        let low = (current & seven_bit_mask)
            .to_u8()
            .ok_or_else(|| invalid_data("Failed to convert generic integer to u8"))?;
        out.write_u8(low | 0x80)?;
        current = current >> 7;
    }
    let last = current
        .to_u8()
        .ok_or_else(|| invalid_data("Failed to convert generic integer to u8"))?;
    out.write_u8(last)
}

/// Decodes a single unsigned integer from a LEB128 byte stream.
pub fn decode_one<T, R>(input: &mut R) -> io::Result<T>
where
    T: PrimInt + Unsigned,
    R: Read + ?Sized,
{
    let total_bits = std::mem::size_of::<T>() * 8;
    let mut result = T::zero();
    let mut shift = 0usize;

    loop {
        if shift >= total_bits {
            return Err(invalid_data("Integer overflow during LEB128 decoding"));
        }
        let byte = input.read_u8()?;
        let payload = byte & 0x7F;
        if shift + 7 > total_bits && (payload >> (total_bits - shift)) != 0 {
            return Err(invalid_data("Integer overflow during LEB128 decoding"));
        }
        let payload = T::from(payload).ok_or_else(|| invalid_data("7-bit payload does not fit type"))?;
        result = result | (payload << shift);

        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

//==================================================================================
// 2. Nine-Byte Block Variant
//==================================================================================

/// Writes `value` using at most nine bytes: eight 7-bit groups with
/// continuation bits, then (if still needed) one byte holding the top 8 bits.
pub fn encode_block_vlong<W: Write + ?Sized>(value: u64, out: &mut W) -> io::Result<()> {
    let mut current = value;
    let mut groups = 0;
    while current & !0x7F != 0 && groups < 8 {
        out.write_u8(((current & 0x7F) as u8) | 0x80)?;
        current >>= 7;
        groups += 1;
    }
    out.write_u8(current as u8)
}

/// Inverse of [`encode_block_vlong`].
pub fn decode_block_vlong<R: Read + ?Sized>(input: &mut R) -> io::Result<u64> {
    let mut result = 0u64;
    for group in 0..8 {
        let byte = input.read_u8()?;
        result |= u64::from(byte & 0x7F) << (7 * group);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    let last = input.read_u8()?;
    Ok(result | (u64::from(last) << 56))
}
