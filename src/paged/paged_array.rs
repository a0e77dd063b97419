// In: src/paged/paged_array.rs

use log::debug;

use super::{GrowableWriter, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::error::Result;
use crate::format::{check_block_size, fastest_format_and_bits, num_blocks, Format};
use crate::storage::{copy_with_buffer, get_mutable_with_format};
use crate::traits::{Mutable, Reader};

//==================================================================================
// 1. Page Allocation
//==================================================================================

/// Allocates the pages of a [`PagedArray`].
pub trait PageFactory {
    type Page: Mutable;

    /// Creates a zeroed page of `value_count` values at `bits_per_value` bits.
    fn new_page(&self, value_count: usize, bits_per_value: u32) -> Self::Page;
}

/// Pages that all share one layout, chosen when the array is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPages {
    format: Format,
}

impl PageFactory for FixedPages {
    type Page = Box<dyn Mutable>;

    fn new_page(&self, value_count: usize, bits_per_value: u32) -> Self::Page {
        get_mutable_with_format(value_count, bits_per_value, self.format)
    }
}

/// Pages that each widen independently as larger values arrive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowablePages {
    acceptable_overhead_ratio: f32,
}

impl PageFactory for GrowablePages {
    type Page = GrowableWriter;

    fn new_page(&self, value_count: usize, bits_per_value: u32) -> Self::Page {
        GrowableWriter::new(bits_per_value, value_count, self.acceptable_overhead_ratio)
    }
}

//==================================================================================
// 2. Paged Array
//==================================================================================

/// A mutable array of up to `u64` values split into power-of-two pages.
///
/// Every page but the last holds exactly `page_size` values. Index `i` lives
/// in page `i >> page_shift` at offset `i & page_mask`.
pub struct PagedArray<F: PageFactory> {
    factory: F,
    pages: Vec<F::Page>,
    size: u64,
    page_shift: u32,
    page_mask: u64,
    bits_per_value: u32,
}

/// Pages with one fixed layout.
pub type PagedMutable = PagedArray<FixedPages>;

/// Pages that are each a [`GrowableWriter`].
pub type PagedGrowableWriter = PagedArray<GrowablePages>;

impl PagedMutable {
    /// Picks the fastest layout for `bits_per_value` within the overhead
    /// budget once, and uses it for every page.
    pub fn new(size: u64, page_size: usize, bits_per_value: u32, acceptable_overhead_ratio: f32) -> Result<Self> {
        let fab = fastest_format_and_bits(page_size, bits_per_value, acceptable_overhead_ratio);
        PagedArray::with_factory(FixedPages { format: fab.format }, size, page_size, fab.bits_per_value)
    }

    pub fn format(&self) -> Format {
        self.factory.format
    }
}

impl PagedGrowableWriter {
    pub fn new(
        size: u64,
        page_size: usize,
        start_bits_per_value: u32,
        acceptable_overhead_ratio: f32,
    ) -> Result<Self> {
        PagedArray::with_factory(
            GrowablePages { acceptable_overhead_ratio },
            size,
            page_size,
            start_bits_per_value,
        )
    }
}

impl<F: PageFactory> PagedArray<F> {
    fn with_factory(factory: F, size: u64, page_size: usize, bits_per_value: u32) -> Result<Self> {
        let page_shift = check_block_size(page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE)?;
        let page_mask = page_size as u64 - 1;
        let pages = Self::allocate(&factory, size, page_size, page_mask, bits_per_value)?;
        Ok(PagedArray {
            factory,
            pages,
            size,
            page_shift,
            page_mask,
            bits_per_value,
        })
    }

    fn allocate(
        factory: &F,
        size: u64,
        page_size: usize,
        page_mask: u64,
        bits_per_value: u32,
    ) -> Result<Vec<F::Page>> {
        let num_pages = num_blocks(size, page_size)?;
        Ok((0..num_pages)
            .map(|page| {
                let value_count = if page == num_pages - 1 {
                    last_page_size(size, page_size, page_mask)
                } else {
                    page_size
                };
                factory.new_page(value_count, bits_per_value)
            })
            .collect())
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn page_size(&self) -> usize {
        (self.page_mask + 1) as usize
    }

    /// Width new pages are created with.
    pub fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    pub fn pages(&self) -> &[F::Page] {
        &self.pages
    }

    #[inline]
    fn locate(&self, index: u64) -> (usize, usize) {
        assert!(index < self.size, "index out of bounds: {} >= {}", index, self.size);
        ((index >> self.page_shift) as usize, (index & self.page_mask) as usize)
    }

    pub fn get(&self, index: u64) -> u64 {
        let (page, offset) = self.locate(index);
        self.pages[page].get(offset)
    }

    pub fn set(&mut self, index: u64, value: u64) {
        let (page, offset) = self.locate(index);
        self.pages[page].set(offset, value);
    }

    pub fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.pages.capacity() * std::mem::size_of::<F::Page>()
            + self.pages.iter().map(|p| p.ram_bytes_used()).sum::<usize>()
    }
}

impl<F: PageFactory + Clone> PagedArray<F> {
    /// Returns a copy holding `new_size` values. Pages shared with `self` keep
    /// their width; values past the old size are zero.
    pub fn resize(&self, new_size: u64) -> Result<Self> {
        let page_size = self.page_size();
        let num_pages = num_blocks(new_size, page_size)?;
        let num_common_pages = num_pages.min(self.pages.len());
        let mut buffer = vec![0u64; 1024];
        let mut pages = Vec::with_capacity(num_pages);
        for i in 0..num_pages {
            let value_count = if i == num_pages - 1 {
                last_page_size(new_size, page_size, self.page_mask)
            } else {
                page_size
            };
            let bits_per_value = if i < num_common_pages {
                self.pages[i].bits_per_value()
            } else {
                self.bits_per_value
            };
            let mut page = self.factory.new_page(value_count, bits_per_value);
            if i < num_common_pages {
                let copy_length = value_count.min(self.pages[i].size());
                copy_with_buffer(&self.pages[i], 0, &mut page, 0, copy_length, &mut buffer);
            }
            pages.push(page);
        }
        debug!(
            "paged array resized: {} -> {} values ({} pages)",
            self.size, new_size, num_pages
        );
        Ok(PagedArray {
            factory: self.factory.clone(),
            pages,
            size: new_size,
            page_shift: self.page_shift,
            page_mask: self.page_mask,
            bits_per_value: self.bits_per_value,
        })
    }

    /// Makes room for at least `min_size` values, over-allocating by an
    /// eighth (at least 3 values). Returns `self` if it is already big enough.
    pub fn grow(self, min_size: u64) -> Result<Self> {
        if min_size <= self.size {
            return Ok(self);
        }
        let extra = (min_size >> 3).max(3);
        self.resize(min_size + extra)
    }
}

fn last_page_size(size: u64, page_size: usize, page_mask: u64) -> usize {
    match (size & page_mask) as usize {
        0 => page_size,
        partial => partial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PackedIntsError;
    use crate::format::{max_value, OverheadRatio};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_three_pages_with_partial_last_page() {
        let mut array = PagedMutable::new(3 * 64 - 5, 64, 9, OverheadRatio::COMPACT).unwrap();
        assert_eq!(array.pages().len(), 3);
        assert_eq!(array.pages()[2].size(), 59);
        assert_eq!(array.page_size(), 64);

        let edges = [0u64, 63, 64, 127, 128, 186];
        for (n, &index) in edges.iter().enumerate() {
            array.set(index, 500 + n as u64);
        }
        for (n, &index) in edges.iter().enumerate() {
            assert_eq!(array.get(index), 500 + n as u64, "index={}", index);
        }
        assert_eq!(array.get(1), 0);
        assert_eq!(array.get(65), 0);
        assert_eq!(array.pages()[1].get(0), 502);
        assert_eq!(array.pages()[2].get(58), 505);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn test_get_past_size_panics() {
        let array = PagedMutable::new(100, 64, 4, OverheadRatio::DEFAULT).unwrap();
        array.get(100);
    }

    #[test]
    fn test_empty_and_invalid_page_sizes() {
        let array = PagedGrowableWriter::new(0, 1 << 10, 8, OverheadRatio::FAST).unwrap();
        assert_eq!(array.size(), 0);
        assert!(array.pages().is_empty());

        for page_size in [32, 100, (1 << 30) * 2] {
            assert!(matches!(
                PagedMutable::new(10, page_size, 8, OverheadRatio::DEFAULT),
                Err(PackedIntsError::InvalidBlockSize(_))
            ));
        }
    }

    #[test]
    fn test_paged_mutable_matches_vec() {
        let mut rng = StdRng::seed_from_u64(0x9A6E);
        for bits in [1, 7, 24, 33, 64] {
            let size = rng.random_range(1000..20_000u64);
            let mut array = PagedMutable::new(size, 256, bits, rng.random::<f32>()).unwrap();
            let expected: Vec<u64> = (0..size).map(|_| rng.random::<u64>() & max_value(bits)).collect();
            for i in (0..size).rev() {
                array.set(i, expected[i as usize]);
            }
            for i in 0..size {
                assert_eq!(array.get(i), expected[i as usize], "bits={} i={}", bits, i);
            }
            assert!(array.ram_bytes_used() as u64 >= size * u64::from(bits) / 8);

            let new_size = rng.random_range(size / 2..size * 3 / 2);
            let copy = array.resize(new_size).unwrap();
            assert_eq!(copy.size(), new_size);
            assert_eq!(copy.format(), array.format());
            for i in 0..new_size {
                let want = if i < size { expected[i as usize] } else { 0 };
                assert_eq!(copy.get(i), want);
            }
        }
    }

    #[test]
    fn test_grow_adds_slack() {
        let mut array = PagedMutable::new(100, 64, 8, OverheadRatio::FASTEST).unwrap();
        array.set(99, 255);
        let array = array.grow(50).unwrap();
        assert_eq!(array.size(), 100);
        let array = array.grow(101).unwrap();
        assert_eq!(array.size(), 101 + 12);
        let array = array.grow(800).unwrap();
        assert_eq!(array.size(), 900);
        assert_eq!(array.get(99), 255);
        assert_eq!(array.get(899), 0);
    }

    #[test]
    fn test_growable_pages_widen_independently() {
        let mut array = PagedGrowableWriter::new(200, 64, 1, OverheadRatio::COMPACT).unwrap();
        array.set(70, 1 << 40);
        array.set(150, 3);
        let widths: Vec<u32> = array.pages().iter().map(|p| p.bits_per_value()).collect();
        assert_eq!(widths, vec![1, 41, 2, 1]);

        // Resizing keeps each common page's width; new pages start narrow.
        let bigger = array.resize(300).unwrap();
        let widths: Vec<u32> = bigger.pages().iter().map(|p| p.bits_per_value()).collect();
        assert_eq!(widths, vec![1, 41, 2, 1, 1]);
        assert_eq!(bigger.get(70), 1 << 40);
        assert_eq!(bigger.get(150), 3);
        assert_eq!(bigger.get(299), 0);
    }

    #[test]
    fn test_paged_growable_writer_matches_vec() {
        let mut rng = StdRng::seed_from_u64(0x6A0B);
        let size = 50_000u64;
        let mut expected = Vec::with_capacity(size as usize);
        let mut max = 5u64;
        for _ in 0..size {
            expected.push(rng.random_range(0..=max));
            if rng.random_bool(0.001) {
                max = max_value(rng.random_range(1..=63));
            }
        }
        let start_bits = rng.random_range(1..=64);
        let mut array = PagedGrowableWriter::new(size, 1 << 12, start_bits, rng.random::<f32>()).unwrap();
        for i in (0..size).rev() {
            array.set(i, expected[i as usize]);
        }
        for i in 0..size {
            assert_eq!(array.get(i), expected[i as usize]);
        }

        let grown = array.grow(size + 1).unwrap();
        assert_eq!(grown.size(), size + 1 + ((size + 1) >> 3));
        for i in 0..size {
            assert_eq!(grown.get(i), expected[i as usize]);
        }
        assert_eq!(grown.get(grown.size() - 1), 0);
    }
}
