// In: src/paged/growable.rs

use std::io::Write;

use log::debug;

use crate::error::Result;
use crate::format::{bits_required, max_value, Format, DEFAULT_BUFFER_SIZE};
use crate::storage::{copy, get_mutable};
use crate::traits::{Mutable, Reader};

/// A packed array that starts narrow and widens itself whenever a value does
/// not fit the current width.
///
/// Widening allocates a new array through [`get_mutable`] with the same
/// overhead budget and copies every value across, so it costs `O(size)`.
pub struct GrowableWriter {
    current: Box<dyn Mutable>,
    current_mask: u64,
    acceptable_overhead_ratio: f32,
}

impl GrowableWriter {
    pub fn new(start_bits_per_value: u32, value_count: usize, acceptable_overhead_ratio: f32) -> Self {
        assert!(
            (1..=64).contains(&start_bits_per_value),
            "bitsPerValue={}",
            start_bits_per_value
        );
        let current = get_mutable(value_count, start_bits_per_value, acceptable_overhead_ratio);
        let current_mask = max_value(current.bits_per_value());
        GrowableWriter {
            current,
            current_mask,
            acceptable_overhead_ratio,
        }
    }

    /// The array currently holding the values.
    pub fn mutable(&self) -> &dyn Mutable {
        self.current.as_ref()
    }

    /// Returns a copy holding `new_size` values at the current width. Values
    /// past the old size are zero.
    pub fn resize(&self, new_size: usize) -> GrowableWriter {
        let mut next = GrowableWriter::new(self.bits_per_value(), new_size, self.acceptable_overhead_ratio);
        let limit = self.size().min(new_size);
        copy(self.current.as_ref(), 0, next.current.as_mut(), 0, limit, DEFAULT_BUFFER_SIZE);
        next
    }

    fn ensure_capacity(&mut self, value: u64) {
        if value & self.current_mask == value {
            return;
        }
        let bits_per_value = bits_required(value);
        debug_assert!(bits_per_value > self.current.bits_per_value());
        let value_count = self.size();
        let mut next = get_mutable(value_count, bits_per_value, self.acceptable_overhead_ratio);
        copy(self.current.as_ref(), 0, next.as_mut(), 0, value_count, DEFAULT_BUFFER_SIZE);
        debug!(
            "growable writer widened: {} -> {} bits ({} values)",
            self.current.bits_per_value(),
            next.bits_per_value(),
            value_count
        );
        self.current = next;
        self.current_mask = max_value(self.current.bits_per_value());
    }
}

impl Reader for GrowableWriter {
    fn get(&self, index: usize) -> u64 {
        self.current.get(index)
    }

    fn get_bulk(&self, index: usize, buf: &mut [u64]) -> usize {
        self.current.get_bulk(index, buf)
    }

    fn bits_per_value(&self) -> u32 {
        self.current.bits_per_value()
    }

    fn size(&self) -> usize {
        self.current.size()
    }

    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>() + self.current.ram_bytes_used()
    }
}

impl Mutable for GrowableWriter {
    fn set(&mut self, index: usize, value: u64) {
        self.ensure_capacity(value);
        self.current.set(index, value);
    }

    fn set_bulk(&mut self, index: usize, values: &[u64]) -> usize {
        let len = values.len().min(self.size().saturating_sub(index));
        let max = values[..len].iter().fold(0, |acc, &v| acc | v);
        self.ensure_capacity(max);
        self.current.set_bulk(index, values)
    }

    fn fill(&mut self, from: usize, to: usize, value: u64) {
        self.ensure_capacity(value);
        self.current.fill(from, to, value);
    }

    fn clear(&mut self) {
        self.current.clear();
    }

    fn format(&self) -> Format {
        self.current.format()
    }

    fn save(&self, out: &mut dyn Write) -> Result<()> {
        self.current.save(out)
    }
}
