//! Small shared helpers used throughout the crate.

use std::mem::size_of;

/// Greatest common divisor.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Approximate heap plus inline footprint of a struct owning `buffer`.
pub fn ram_bytes_with<S, T>(buffer: &[T]) -> usize {
    size_of::<S>() + std::mem::size_of_val(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(64, 24), 8);
        assert_eq!(gcd(64, 13), 1);
        assert_eq!(gcd(64, 64), 64);
        assert_eq!(gcd(0, 5), 5);
    }

    #[test]
    fn test_ram_bytes_with() {
        struct Holder;
        let values = vec![0u64; 10];
        assert_eq!(ram_bytes_with::<Holder, _>(&values), 80);
    }
}
