// In: src/stream/iterator.rs

use log::debug;

use crate::error::{PackedIntsError, Result};
use crate::format::{check_version, Format, VERSION_BYTE_ALIGNED};
use crate::kernels::bulk::BulkOperation;
use crate::store::DataInput;

/// Sequentially decodes a packed stream, one buffered batch at a time.
#[derive(Debug)]
pub struct PackedReaderIterator<R> {
    input: R,
    format: Format,
    version: u32,
    value_count: usize,
    bits_per_value: u32,
    operation: &'static BulkOperation,
    next_blocks: Vec<u8>,
    next_values: Vec<u64>,
    iterations: usize,
    /// Start of the values returned by the last batch.
    offset: usize,
    /// Length of the last batch.
    length: usize,
    /// Index of the last value returned, `None` before the first read.
    position: Option<usize>,
}

impl<R: DataInput> PackedReaderIterator<R> {
    pub fn new(
        input: R,
        format: Format,
        version: u32,
        value_count: usize,
        bits_per_value: u32,
        buffer_size_bytes: usize,
    ) -> Result<Self> {
        check_version(version)?;
        let operation = BulkOperation::of(format, bits_per_value)?;
        let mut iterations = operation.compute_iterations(value_count, buffer_size_bytes);
        if version < VERSION_BYTE_ALIGNED {
            // Long-aligned streams are consumed in whole 8-byte words.
            iterations = (iterations + 7) & !7;
        }
        let next_values = vec![0; iterations * operation.byte_value_count()];
        debug!(
            "packed iterator: format={:?} version={} values={} bits={} iterations={}",
            format, version, value_count, bits_per_value, iterations
        );
        Ok(PackedReaderIterator {
            input,
            format,
            version,
            value_count,
            bits_per_value,
            operation,
            next_blocks: vec![0; iterations * operation.byte_block_count()],
            offset: next_values.len(),
            next_values,
            iterations,
            length: 0,
            position: None,
        })
    }

    /// Returns at least one and at most `count` of the following values.
    pub fn next_batch(&mut self, count: usize) -> Result<&[u64]> {
        assert!(count > 0);
        self.offset += self.length;

        let consumed = self.position.map_or(0, |p| p + 1);
        let remaining = self.value_count - consumed;
        if remaining == 0 {
            return Err(PackedIntsError::EndOfStream);
        }
        let count = count.min(remaining);

        if self.offset == self.next_values.len() {
            let remaining_blocks = self
                .format
                .byte_count(self.version, remaining as u64, self.bits_per_value);
            let blocks_to_read = (remaining_blocks as usize).min(self.next_blocks.len());
            self.input.read_bytes(&mut self.next_blocks[..blocks_to_read])?;
            self.next_blocks[blocks_to_read..].fill(0);
            self.operation
                .decode_bytes(&self.next_blocks, &mut self.next_values, self.iterations);
            self.offset = 0;
        }

        self.length = count.min(self.next_values.len() - self.offset);
        self.position = Some(consumed + self.length - 1);
        Ok(&self.next_values[self.offset..self.offset + self.length])
    }

    pub fn next_value(&mut self) -> Result<u64> {
        let batch = self.next_batch(1)?;
        Ok(batch[0])
    }

    /// Index of the last value returned, `None` before the first read.
    pub fn ord(&self) -> Option<usize> {
        self.position
    }

    pub fn size(&self) -> usize {
        self.value_count
    }

    pub fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    pub fn into_inner(self) -> R {
        self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{VERSION_CURRENT, VERSION_START};
    use crate::stream::PackedWriter;
    use std::io::Cursor;

    fn write_values(format: Format, bits: u32, values: &[u64]) -> Vec<u8> {
        let mut writer = PackedWriter::new(Vec::new(), format, Some(values.len()), bits, 128).unwrap();
        for &v in values {
            writer.add(v).unwrap();
        }
        writer.finish().unwrap();
        writer.into_inner()
    }

    #[test]
    fn test_iterator_reads_back_in_batches_and_hits_eof() {
        let values: Vec<u64> = (0..1000).map(|i| (i * 7) % 8192).collect();
        let bytes = write_values(Format::Packed, 13, &values);
        let mut it =
            PackedReaderIterator::new(Cursor::new(bytes), Format::Packed, VERSION_CURRENT, 1000, 13, 256).unwrap();

        let mut decoded = Vec::new();
        let mut step = 1;
        while decoded.len() < 1000 {
            let batch = it.next_batch(step).unwrap();
            assert!(!batch.is_empty() && batch.len() <= step);
            decoded.extend_from_slice(batch);
            assert_eq!(it.ord(), Some(decoded.len() - 1));
            step = step % 37 + 1;
        }
        assert_eq!(decoded, values);
        assert!(matches!(it.next_value(), Err(PackedIntsError::EndOfStream)));
    }

    #[test]
    fn test_legacy_stream_is_consumed_to_word_boundary() {
        // Five 7-bit values: 35 bits, 5 bytes today and 8 bytes in the legacy layout.
        let values = [1u64, 2, 3, 4, 127];
        let mut bytes = write_values(Format::Packed, 7, &values);
        assert_eq!(bytes.len(), 5);
        bytes.extend_from_slice(&[0, 0, 0, 0xAA]);

        let mut it =
            PackedReaderIterator::new(Cursor::new(bytes), Format::Packed, VERSION_START, 5, 7, 64).unwrap();
        for &v in &values {
            assert_eq!(it.next_value().unwrap(), v);
        }
        let mut input = it.into_inner();
        assert_eq!(input.position(), 8);
        assert_eq!(input.read_byte().unwrap(), 0xAA);
    }

    #[test]
    fn test_single_block_stream() {
        let values: Vec<u64> = (0..50).map(|i| i % 1024).collect();
        let bytes = write_values(Format::PackedSingleBlock, 10, &values);
        let mut it = PackedReaderIterator::new(
            Cursor::new(bytes),
            Format::PackedSingleBlock,
            VERSION_CURRENT,
            50,
            10,
            64,
        )
        .unwrap();
        let decoded: Vec<u64> = (0..50).map(|_| it.next_value().unwrap()).collect();
        assert_eq!(decoded, values);
    }
}
