//! This module contains the pure, stateless kernels for Zig-zag encoding and
//! decoding.
//!
//! Zig-zag is a lossless bitwise mapping of signed integers to unsigned ones
//! that keeps small magnitudes small: 0, -1, 1, -2, 2 map to 0, 1, 2, 3, 4.
//! Block headers use it for minimums and the monotonic compressor uses it for
//! residuals around its linear trend.

use num_traits::{PrimInt, Signed, Unsigned};
use std::ops::Neg;

use crate::traits::{HasSigned, HasUnsigned};

//==================================================================================
// 1. Generic Core Logic
//==================================================================================

/// Encodes a single signed integer using the Zig-zag algorithm.
#[inline]
pub fn encode_val<T>(n: T) -> T::Unsigned
where
    T: PrimInt + Signed + HasUnsigned,
{
    let bits = std::mem::size_of::<T>() * 8;
    // The right shift on a signed PrimInt is arithmetic.
    ((n << 1) ^ (n >> (bits - 1))).to_unsigned_bits()
}

/// Decodes a single unsigned integer back to its signed representation.
#[inline]
pub fn decode_val<U>(n: U) -> U::Signed
where
    U: PrimInt + Unsigned + HasSigned,
    U::Signed: PrimInt + Neg<Output = U::Signed>,
{
    let shifted = (n >> 1).to_signed_bits();
    let lsb = (n & U::one()).to_signed_bits();
    shifted ^ -lsb
}

//==================================================================================
// 2. Slice Helpers
//==================================================================================

/// Zig-zag encodes every value of `input` into `output`.
pub fn encode_into<T>(input: &[T], output: &mut Vec<T::Unsigned>)
where
    T: PrimInt + Signed + HasUnsigned,
{
    output.clear();
    output.extend(input.iter().map(|&v| encode_val(v)));
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
