// In: src/error.rs

//! This module defines the single, unified error type for the packed integer codec.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Only recoverable conditions live here. Contract violations by the caller
//! (out-of-range indices, values wider than the declared bit width, calling
//! `add` after `finish`) are programming errors and are reported through
//! `assert!`/`debug_assert!` at the call site instead.

use thiserror::Error;

use crate::format::Format;

#[derive(Error, Debug)]
pub enum PackedIntsError {
    // =========================================================================
    // === Data Integrity Errors (never retried)
    // =========================================================================
    #[error("Corrupted packed stream: {0}")]
    Corrupted(String),

    #[error("Unknown packed ints format id: {0}")]
    UnknownFormat(u32),

    #[error("Unsupported packed ints version {version} (supported: {min}..={max})")]
    UnsupportedVersion { version: u32, min: u32, max: u32 },

    #[error("Format {format:?} does not support {bits_per_value} bits per value")]
    UnsupportedBitsPerValue { format: Format, bits_per_value: u32 },

    // =========================================================================
    // === Stream Lifecycle Errors
    // =========================================================================
    #[error("Read past the end of the packed stream")]
    EndOfStream,

    #[error("Writing past end of stream (declared value count: {value_count})")]
    WritePastEnd { value_count: usize },

    #[error("Invalid block size: {0}")]
    InvalidBlockSize(String),

    // =========================================================================
    // === External Error Wrappers
    // =========================================================================
    /// A storage-backed reader failed to seek or read. The reader is left in an
    /// undefined position; the caller must reopen or reseek the stream.
    #[error("Storage-backed read failed: {source}")]
    State {
        #[source]
        source: std::io::Error,
    },

    /// An error originating from the underlying byte stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration document could not be parsed.
    #[error("Configuration parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PackedIntsError {
    /// Wraps an I/O failure raised while serving a storage-backed `get`.
    pub(crate) fn state(source: std::io::Error) -> Self {
        PackedIntsError::State { source }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PackedIntsError>;
