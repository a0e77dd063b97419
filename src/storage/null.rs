//! The zero-width reader: every value is zero and nothing is stored.

use crate::traits::Reader;

/// A reader whose values are all zero. Stands in for blocks that store no bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullReader {
    value_count: usize,
}

impl NullReader {
    pub fn new(value_count: usize) -> Self {
        NullReader { value_count }
    }
}

impl Reader for NullReader {
    fn get(&self, _index: usize) -> u64 {
        0
    }

    fn get_bulk(&self, index: usize, buf: &mut [u64]) -> usize {
        assert!(!buf.is_empty(), "len must be > 0 (got {})", buf.len());
        assert!(index < self.value_count);
        let gets = buf.len().min(self.value_count - index);
        buf[..gets].fill(0);
        gets
    }

    fn bits_per_value(&self) -> u32 {
        0
    }

    fn size(&self) -> usize {
        self.value_count
    }

    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_reader_is_all_zero() {
        let reader = NullReader::new(5);
        let mut buf = [7u64; 8];
        assert_eq!(reader.get_bulk(2, &mut buf), 3);
        assert_eq!(&buf[..4], &[0, 0, 0, 7]);
        assert_eq!(reader.get(4), 0);
        assert_eq!(reader.bits_per_value(), 0);
    }
}
