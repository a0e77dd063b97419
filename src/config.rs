// In: src/config.rs

//! Tunables for building packed structures.
//!
//! `PackedIntsConfig` is meant to be built once at the application boundary
//! (from defaults or a JSON document) and passed by reference to whatever
//! creates writers, readers and paged arrays. Every field has a serde default,
//! so a document only needs to name what it changes.

use serde::{Deserialize, Serialize};

use crate::blocks::{
    BlockPackedWriter, BlockReader, MonotonicBlockPackedWriter, MonotonicReader, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE,
};
use crate::error::{PackedIntsError, Result};
use crate::format::{check_block_size, OverheadRatio, VERSION_CURRENT};
use crate::paged::{PagedGrowableWriter, PagedMutable, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::storage::get_mutable;
use crate::store::{DataInput, DataOutput, IndexInput};
use crate::stream::PackedReaderIterator;
use crate::traits::Mutable;

//==================================================================================
// I. The Unified Config
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct PackedIntsConfig {
    /// Extra memory, as a fraction of the minimal size, that format selection
    /// may spend for faster access. See [`OverheadRatio`] for named values.
    #[serde(default = "default_acceptable_overhead_ratio")]
    pub acceptable_overhead_ratio: f32,

    /// Memory budget in bytes for sequential reader and writer batches.
    #[serde(default = "default_buffer_size_bytes")]
    pub buffer_size_bytes: usize,

    /// Values per compression block. A power of two in `64..=1 << 27`.
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Values per page of paged arrays. A power of two in `64..=1 << 30`.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Read block residuals from storage instead of loading them.
    #[serde(default)]
    pub direct: bool,
}

impl Default for PackedIntsConfig {
    fn default() -> Self {
        Self {
            acceptable_overhead_ratio: default_acceptable_overhead_ratio(),
            buffer_size_bytes: default_buffer_size_bytes(),
            block_size: default_block_size(),
            page_size: default_page_size(),
            direct: false,
        }
    }
}

fn default_acceptable_overhead_ratio() -> f32 {
    OverheadRatio::DEFAULT
}

fn default_buffer_size_bytes() -> usize {
    crate::format::DEFAULT_BUFFER_SIZE
}

fn default_block_size() -> usize {
    1024
}

fn default_page_size() -> usize {
    1 << 15
}

//==================================================================================
// II. Parsing & Validation
//==================================================================================

impl PackedIntsConfig {
    /// Parses a JSON document and validates the result.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PackedIntsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.acceptable_overhead_ratio.is_finite() || self.acceptable_overhead_ratio < 0.0 {
            return Err(PackedIntsError::InvalidConfig(format!(
                "acceptable_overhead_ratio must be a non-negative number, got {}",
                self.acceptable_overhead_ratio
            )));
        }
        if self.buffer_size_bytes == 0 {
            return Err(PackedIntsError::InvalidConfig("buffer_size_bytes must be > 0".into()));
        }
        check_block_size(self.block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE)?;
        check_block_size(self.page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE)?;
        Ok(())
    }
}

//==================================================================================
// III. Builders
//==================================================================================

impl PackedIntsConfig {
    pub fn mutable(&self, value_count: usize, bits_per_value: u32) -> Box<dyn Mutable> {
        get_mutable(value_count, bits_per_value, self.acceptable_overhead_ratio)
    }

    /// Iterates over a self-describing packed stream.
    pub fn reader_iterator<R: DataInput>(&self, input: R) -> Result<PackedReaderIterator<R>> {
        crate::storage::get_reader_iterator(input, self.buffer_size_bytes)
    }

    pub fn block_writer<W: DataOutput>(&self, out: W) -> Result<BlockPackedWriter<W>> {
        BlockPackedWriter::new(out, self.block_size)
    }

    pub fn monotonic_writer<W: DataOutput>(&self, out: W) -> Result<MonotonicBlockPackedWriter<W>> {
        MonotonicBlockPackedWriter::new(out, self.block_size)
    }

    /// Opens plain blocks written by [`PackedIntsConfig::block_writer`],
    /// resident or storage-backed depending on `direct`.
    pub fn block_reader<R: IndexInput>(&self, input: R, value_count: u64) -> Result<BlockReader<R>> {
        BlockReader::open(input, VERSION_CURRENT, self.block_size, value_count, self.direct)
    }

    pub fn monotonic_reader<R: IndexInput>(&self, input: R, value_count: u64) -> Result<MonotonicReader<R>> {
        MonotonicReader::open(input, VERSION_CURRENT, self.block_size, value_count, self.direct)
    }

    pub fn paged_mutable(&self, size: u64, bits_per_value: u32) -> Result<PagedMutable> {
        PagedMutable::new(size, self.page_size, bits_per_value, self.acceptable_overhead_ratio)
    }

    pub fn paged_growable_writer(&self, size: u64, start_bits_per_value: u32) -> Result<PagedGrowableWriter> {
        PagedGrowableWriter::new(size, self.page_size, start_bits_per_value, self.acceptable_overhead_ratio)
    }
}

//==================================================================================
// IV. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = PackedIntsConfig::from_json(r#"{ "block_size": 128, "direct": true }"#).unwrap();
        assert_eq!(config.block_size, 128);
        assert!(config.direct);
        assert_eq!(config.acceptable_overhead_ratio, OverheadRatio::DEFAULT);
        assert_eq!(config.buffer_size_bytes, 1024);
        assert_eq!(config.page_size, 1 << 15);

        let empty = PackedIntsConfig::from_json("{}").unwrap();
        assert_eq!(empty, PackedIntsConfig::default());
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            PackedIntsConfig::from_json(r#"{ "block_size": "big" }"#),
            Err(PackedIntsError::Config(_))
        ));
        assert!(matches!(
            PackedIntsConfig::from_json(r#"{ "block_size": 1000 }"#),
            Err(PackedIntsError::InvalidBlockSize(_))
        ));
        assert!(matches!(
            PackedIntsConfig::from_json(r#"{ "page_size": 32 }"#),
            Err(PackedIntsError::InvalidBlockSize(_))
        ));
        assert!(matches!(
            PackedIntsConfig::from_json(r#"{ "acceptable_overhead_ratio": -1.0 }"#),
            Err(PackedIntsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_serialized_form_round_trips() {
        let config = PackedIntsConfig {
            acceptable_overhead_ratio: OverheadRatio::FAST,
            page_size: 1 << 10,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"page_size\":1024"));
        assert_eq!(PackedIntsConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_direct_flag_selects_reader() {
        let values: Vec<i64> = (0..500).map(|i| (i % 17) * 1000 - 3).collect();
        for direct in [false, true] {
            let config = PackedIntsConfig { block_size: 64, direct, ..Default::default() };
            let mut writer = config.block_writer(Vec::new()).unwrap();
            for &v in &values {
                writer.add(v).unwrap();
            }
            writer.finish().unwrap();
            let reader = config.block_reader(Cursor::new(writer.into_inner()), 500).unwrap();
            assert_eq!(matches!(reader, BlockReader::Direct(_)), direct);
            assert_eq!(reader.size(), 500);
            for (i, &v) in values.iter().enumerate() {
                assert_eq!(reader.get(i as u64).unwrap(), v);
            }
        }
    }

    #[test]
    fn test_builders_use_configured_sizes() {
        let config = PackedIntsConfig { page_size: 128, ..Default::default() };
        let paged = config.paged_mutable(1000, 5).unwrap();
        assert_eq!(paged.page_size(), 128);
        let growable = config.paged_growable_writer(1000, 1).unwrap();
        assert_eq!(growable.pages().len(), 8);

        let mut array = config.mutable(10, 7);
        array.set(9, 100);
        let mut out = Vec::new();
        array.save(&mut out).unwrap();
        let mut it = config.reader_iterator(Cursor::new(out)).unwrap();
        assert_eq!(it.size(), 10);
        for _ in 0..9 {
            assert_eq!(it.next_value().unwrap(), 0);
        }
        assert_eq!(it.next_value().unwrap(), 100);
    }
}
