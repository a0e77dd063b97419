//! Sequential packed streams: a buffered writer and a batch-decoding iterator.
//!
//! Both sides move data through the bulk kernels in whole iterations; the
//! writer trims the final batch to the bytes actually needed and the iterator
//! zero-fills whatever it could not read.

mod iterator;
mod writer;

pub use iterator::PackedReaderIterator;
pub use writer::PackedWriter;
