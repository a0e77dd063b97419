//! This module groups the pure, stateless kernels the storage types are built on.
//!
//! Nothing in here owns state across calls: every function takes its inputs and
//! output buffers explicitly.

/// Bit-packing of N-bit values into 64-bit words or bytes.
pub mod bulk;

/// Variable-length integers for stream headers.
pub mod leb128;

/// Signed to unsigned mapping for block minimums and residuals.
pub mod zigzag;
