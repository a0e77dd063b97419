//! Arrays built from fixed-size packed pages.
//!
//! A [`PagedArray`] addresses up to `u64` values by splitting the index space
//! into power-of-two pages, each an independent [`crate::traits::Mutable`].
//! Resizing allocates a new set of pages and copies the common prefix.

mod growable;
mod paged_array;

pub use growable::GrowableWriter;
pub use paged_array::{FixedPages, GrowablePages, PageFactory, PagedArray, PagedGrowableWriter, PagedMutable};

/// Smallest page size accepted by [`PagedArray`].
pub const MIN_PAGE_SIZE: usize = 1 << 6;
/// Largest page size accepted by [`PagedArray`].
pub const MAX_PAGE_SIZE: usize = 1 << 30;
