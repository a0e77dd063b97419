//! This file is the root of the `tambak_packed` Rust crate.
//!
//! The crate stores sequences of non-negative integers using only as many bits
//! per value as the largest value needs. It provides:
//! 1.  In-memory packed arrays (`storage`) with a factory that trades memory
//!     for speed under an explicit overhead budget.
//! 2.  Sequential stream writers and readers (`stream`), and readers that seek
//!     straight to one value on storage (`direct`).
//! 3.  Block-delta compressors for signed and monotonic sequences (`blocks`).
//! 4.  Growable and paged arrays for more than `2^31` values (`paged`).

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod bitstream;
pub mod blocks;
pub mod config;
pub mod direct;
pub mod error;
pub mod format;
pub mod kernels;
pub mod observability;
pub mod paged;
pub mod storage;
pub mod store;
pub mod stream;
pub mod traits;

mod utils;

//==================================================================================
// 2. Public Surface
//==================================================================================
pub use blocks::{
    BlockPackedReader, BlockPackedReaderIterator, BlockPackedWriter, BlockReader, DirectBlockPackedReader,
    DirectMonotonicBlockPackedReader, MonotonicBlockPackedReader, MonotonicBlockPackedWriter, MonotonicReader,
};
pub use config::PackedIntsConfig;
pub use error::{PackedIntsError, Result};
pub use format::{bits_required, max_value, unsigned_bits_required, Format, FormatAndBits, OverheadRatio};
pub use paged::{GrowableWriter, PagedGrowableWriter, PagedMutable};
pub use storage::{
    copy, get_direct_reader, get_direct_reader_no_header, get_mutable, get_mutable_with_format, get_reader,
    get_reader_iterator, get_reader_iterator_no_header, get_reader_no_header, get_writer, get_writer_no_header,
};
pub use stream::{PackedReaderIterator, PackedWriter};
pub use traits::{DirectReader, Mutable, Reader};
