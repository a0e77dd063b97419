use super::*;
use crate::format::VERSION_CURRENT;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Cursor;

fn write_plain(values: &[i64], block_size: usize) -> Vec<u8> {
    let mut writer = BlockPackedWriter::new(Vec::new(), block_size).unwrap();
    for &v in values {
        writer.add(v).unwrap();
    }
    writer.finish().unwrap();
    assert_eq!(writer.ord(), values.len() as u64);
    writer.into_inner()
}

fn write_monotonic(values: &[i64], block_size: usize) -> Vec<u8> {
    let mut writer = MonotonicBlockPackedWriter::new(Vec::new(), block_size).unwrap();
    for &v in values {
        writer.add(v).unwrap();
    }
    writer.finish().unwrap();
    writer.into_inner()
}

/// Runs of random width, so blocks see a mix of narrow and wide residuals.
fn random_values(rng: &mut StdRng, len: usize) -> Vec<i64> {
    let mut values = Vec::with_capacity(len);
    while values.len() < len {
        let run = rng.random_range(1..=200).min(len - values.len());
        let bits = rng.random_range(0..=64u32);
        let base: i64 = rng.random_range(-1000..=1000);
        for _ in 0..run {
            let noise = if bits == 0 { 0 } else { (rng.random::<u64>() >> (64 - bits)) as i64 };
            values.push(base.wrapping_add(noise));
        }
    }
    values
}

//==================================================================================
// Plain blocks
//==================================================================================

#[test]
fn test_constant_block_stores_no_residuals() {
    let bytes = write_plain(&[7; 64], 64);
    // token with zero bits and a non-zero minimum, then zigzag(7) - 1.
    assert_eq!(bytes, vec![0x00, 13]);

    let bytes = write_plain(&[0; 100], 64);
    assert_eq!(bytes, vec![0x01, 0x01]);

    let reader = BlockPackedReader::new(&mut Cursor::new(write_plain(&[7; 64], 64)), VERSION_CURRENT, 64, 64).unwrap();
    assert!((0..64).all(|i| reader.get(i) == 7));
}

#[test]
fn test_small_positive_block_drops_its_minimum() {
    // min 1, max 3: two bits suffice for the raw values, so the minimum is zero.
    let bytes = write_plain(&[1, 2, 3], 64);
    assert_eq!(bytes, vec![(2 << 1) | 1, 0b0110_1100]);
}

#[test]
fn test_extreme_values_use_64_bits() {
    let values = [i64::MIN, i64::MAX, -1, 0, 1];
    let bytes = write_plain(&values, 64);
    assert_eq!(bytes[0], (64 << 1) | 1);
    assert_eq!(bytes.len(), 1 + 5 * 8);

    let reader = BlockPackedReader::new(&mut Cursor::new(bytes), VERSION_CURRENT, 64, 5).unwrap();
    for (i, &v) in values.iter().enumerate() {
        assert_eq!(reader.get(i as u64), v);
    }
}

#[test]
fn test_plain_readers_agree() {
    let mut rng = StdRng::seed_from_u64(0xB10C);
    for block_size in [64, 128, 1024] {
        let values = random_values(&mut rng, 3000);
        let bytes = write_plain(&values, block_size);
        let n = values.len() as u64;

        let mut input = Cursor::new(bytes.clone());
        let reader = BlockPackedReader::new(&mut input, VERSION_CURRENT, block_size, n).unwrap();
        assert_eq!(input.position() as usize, bytes.len());
        assert_eq!(reader.size(), n);

        let direct = DirectBlockPackedReader::new(Cursor::new(bytes.clone()), VERSION_CURRENT, block_size, n).unwrap();
        for _ in 0..2000 {
            let i = rng.random_range(0..n);
            assert_eq!(reader.get(i), values[i as usize], "block_size={} i={}", block_size, i);
            assert_eq!(direct.get(i).unwrap(), values[i as usize]);
        }
        assert!(direct.ram_bytes_used() < reader.ram_bytes_used());

        let mut it = BlockPackedReaderIterator::new(Cursor::new(bytes), VERSION_CURRENT, block_size, n).unwrap();
        for &v in &values {
            assert_eq!(it.next_value().unwrap(), v);
        }
        assert!(matches!(it.next_value(), Err(PackedIntsError::EndOfStream)));
    }
}

#[test]
fn test_block_of_zeros() {
    let mut writer = BlockPackedWriter::new(Vec::new(), 64).unwrap();
    for i in 0..64 {
        writer.add(i * 3).unwrap();
    }
    writer.add_block_of_zeros().unwrap();
    assert_eq!(writer.ord(), 128);
    writer.add_block_of_zeros().unwrap();
    for i in 0..10 {
        writer.add(-i).unwrap();
    }
    writer.finish().unwrap();
    let bytes = writer.into_inner();

    let reader = BlockPackedReader::new(&mut Cursor::new(bytes), VERSION_CURRENT, 64, 202).unwrap();
    assert_eq!(reader.get(63), 189);
    assert!((64..192).all(|i| reader.get(i) == 0));
    assert_eq!(reader.get(201), -9);
}

#[test]
#[should_panic(expected = "mid-block")]
fn test_block_of_zeros_mid_block_panics() {
    let mut writer = BlockPackedWriter::new(Vec::new(), 64).unwrap();
    writer.add(1).unwrap();
    let _ = writer.add_block_of_zeros();
}

#[test]
#[should_panic(expected = "already finished")]
fn test_add_after_finish_panics() {
    let mut writer = BlockPackedWriter::new(Vec::new(), 64).unwrap();
    writer.add(1).unwrap();
    writer.finish().unwrap();
    let _ = writer.add(2);
}

#[test]
fn test_invalid_block_sizes() {
    for block_size in [0, 32, 100, MAX_BLOCK_SIZE * 2] {
        assert!(matches!(
            BlockPackedWriter::new(Vec::new(), block_size),
            Err(PackedIntsError::InvalidBlockSize(_))
        ));
        assert!(matches!(
            BlockPackedReaderIterator::new(Cursor::new(Vec::new()), VERSION_CURRENT, block_size, 1),
            Err(PackedIntsError::InvalidBlockSize(_))
        ));
    }
}

#[test]
fn test_token_wider_than_64_bits_is_corruption() {
    let bad_token = vec![65u8 << 1 | 1, 0, 0, 0];
    assert!(matches!(
        BlockPackedReader::new(&mut Cursor::new(bad_token.clone()), VERSION_CURRENT, 64, 10),
        Err(PackedIntsError::Corrupted(_))
    ));
    assert!(matches!(
        DirectBlockPackedReader::new(Cursor::new(bad_token.clone()), VERSION_CURRENT, 64, 10),
        Err(PackedIntsError::Corrupted(_))
    ));
    let mut it = BlockPackedReaderIterator::new(Cursor::new(bad_token), VERSION_CURRENT, 64, 10).unwrap();
    assert!(matches!(it.next_value(), Err(PackedIntsError::Corrupted(_))));

    // vlong min, f32 slope, then a width of 65.
    let bad_monotonic = vec![0u8, 0, 0, 0, 0, 65];
    assert!(matches!(
        MonotonicBlockPackedReader::new(&mut Cursor::new(bad_monotonic), VERSION_CURRENT, 64, 10),
        Err(PackedIntsError::Corrupted(_))
    ));
}

#[test]
fn test_truncated_stream_is_io_error() {
    let bytes = write_plain(&(0..100).collect::<Vec<_>>(), 64);
    let truncated = bytes[..bytes.len() - 3].to_vec();
    assert!(matches!(
        BlockPackedReader::new(&mut Cursor::new(truncated), VERSION_CURRENT, 64, 100),
        Err(PackedIntsError::Io(_))
    ));
}

//==================================================================================
// Iterator
//==================================================================================

#[test]
fn test_iterator_batches_stop_at_block_boundaries() {
    let values: Vec<i64> = (0..300).map(|i| i * i - 500).collect();
    let bytes = write_plain(&values, 128);
    let mut it = BlockPackedReaderIterator::new(Cursor::new(bytes), VERSION_CURRENT, 128, 300).unwrap();

    assert_eq!(it.next_batch(100).unwrap(), &values[..100]);
    assert_eq!(it.next_batch(100).unwrap(), &values[100..128]);
    assert_eq!(it.ord(), 128);
    assert_eq!(it.next_batch(1000).unwrap(), &values[128..256]);
    assert_eq!(it.next_batch(1000).unwrap(), &values[256..300]);
    assert!(matches!(it.next_batch(1), Err(PackedIntsError::EndOfStream)));
}

#[test]
fn test_iterator_skip_and_reset() {
    let mut rng = StdRng::seed_from_u64(99);
    let values = random_values(&mut rng, 1000);
    let bytes = write_plain(&values, 64);
    let mut it = BlockPackedReaderIterator::new(Cursor::new(bytes.clone()), VERSION_CURRENT, 64, 1000).unwrap();

    assert_eq!(it.next_value().unwrap(), values[0]);
    // Rest of the buffered block, then whole blocks, then into a block.
    it.skip(10).unwrap();
    assert_eq!(it.next_value().unwrap(), values[11]);
    it.skip(300).unwrap();
    assert_eq!(it.ord(), 312);
    assert_eq!(it.next_value().unwrap(), values[312]);
    it.skip(1000 - 313).unwrap();
    assert_eq!(it.ord(), 1000);
    assert!(matches!(it.skip(1), Err(PackedIntsError::EndOfStream)));

    let old = it.reset(Cursor::new(bytes), 1000);
    assert_eq!(old.position() as usize, old.get_ref().len());
    assert_eq!(it.ord(), 0);
    it.skip(128).unwrap();
    assert_eq!(it.next_value().unwrap(), values[128]);
}

//==================================================================================
// Monotonic blocks
//==================================================================================

#[test]
fn test_arithmetic_sequence_needs_no_residuals() {
    let values: Vec<i64> = (0..256).map(|i| 1000 + 7 * i).collect();
    let bytes = write_monotonic(&values, 64);
    // Per block: two-byte vlong minimum, four-byte slope, zero width.
    assert_eq!(bytes.len(), 4 * (2 + 4 + 1));
    assert_eq!(&bytes[2..6], &7.0f32.to_bits().to_be_bytes());

    let reader = MonotonicBlockPackedReader::new(&mut Cursor::new(bytes), VERSION_CURRENT, 64, 256).unwrap();
    for (i, &v) in values.iter().enumerate() {
        assert_eq!(reader.get(i as u64), v);
    }
}

#[test]
fn test_slope_precision_loss_is_absorbed_by_residuals() {
    // 63 * (2^24 + 1) rounds up to 63 * 2^24 + 64 as an f32 (spacing 64 in
    // [2^29, 2^30)), and dividing by 63 then rounds to 2^24 + 2 (spacing 2).
    // The stored slope overshoots the true step, so the residuals are
    // non-zero and must carry the difference.
    let step = (1i64 << 24) + 1;
    let values: Vec<i64> = (0..64).map(|i| i * step).collect();
    let avg = (63 * step) as f32 / 63.0f32;
    assert_eq!(avg, 16_777_218.0f32);

    let residuals: Vec<i64> = values.iter().enumerate().map(|(i, &v)| v - (i as f32 * avg) as i64).collect();
    assert_eq!(residuals[0], 0);
    assert_eq!(residuals[1], -1);
    let max_zigzag = residuals.iter().map(|&r| zigzag::encode_val(r)).max().unwrap();
    let bits = crate::format::bits_required(max_zigzag);
    assert_eq!(bits, 8);

    let bytes = write_monotonic(&values, 64);
    assert_eq!(bytes[0], 0);
    assert_eq!(&bytes[1..5], &avg.to_bits().to_be_bytes());
    assert_eq!(u32::from(bytes[5]), bits);
    assert_eq!(bytes.len(), 1 + 4 + 1 + 64 * 8 / 8);

    let reader = MonotonicBlockPackedReader::new(&mut Cursor::new(bytes.clone()), VERSION_CURRENT, 64, 64).unwrap();
    let direct = DirectMonotonicBlockPackedReader::new(Cursor::new(bytes), VERSION_CURRENT, 64, 64).unwrap();
    for (i, &v) in values.iter().enumerate() {
        assert_eq!(reader.get(i as u64), v);
        assert_eq!(direct.get(i as u64).unwrap(), v);
    }
}

#[test]
fn test_single_value_block_has_zero_slope() {
    let bytes = write_monotonic(&[42], 64);
    assert_eq!(bytes, vec![42, 0, 0, 0, 0, 0]);
}

#[test]
fn test_monotonic_readers_agree() {
    let mut rng = StdRng::seed_from_u64(0x0D0C);
    let mut values = Vec::with_capacity(5000);
    let mut current = 0i64;
    for _ in 0..5000 {
        let shift = rng.random_range(1..20);
        current += rng.random_range(0..1i64 << shift);
        values.push(current);
    }
    for block_size in [64, 256, 4096] {
        let bytes = write_monotonic(&values, block_size);
        let n = values.len() as u64;
        let mut input = Cursor::new(bytes.clone());
        let reader = MonotonicBlockPackedReader::new(&mut input, VERSION_CURRENT, block_size, n).unwrap();
        assert_eq!(input.position() as usize, bytes.len());
        let direct = DirectMonotonicBlockPackedReader::new(Cursor::new(bytes), VERSION_CURRENT, block_size, n).unwrap();
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(reader.get(i as u64), v, "block_size={} i={}", block_size, i);
            assert_eq!(direct.get(i as u64).unwrap(), v);
        }
        assert_eq!(reader.size(), n);
        assert_eq!(direct.size(), n);
    }
}

#[test]
#[should_panic(expected = "non-negative")]
fn test_monotonic_rejects_negative_values() {
    let mut writer = MonotonicBlockPackedWriter::new(Vec::new(), 64).unwrap();
    let _ = writer.add(-1);
}

#[test]
fn test_reader_selection_serves_same_values() {
    let values: Vec<i64> = (0..300).map(|i| i * i).collect();
    let bytes = write_monotonic(&values, 128);
    let resident = MonotonicReader::open(Cursor::new(bytes.clone()), VERSION_CURRENT, 128, 300, false).unwrap();
    let direct = MonotonicReader::open(Cursor::new(bytes), VERSION_CURRENT, 128, 300, true).unwrap();
    assert!(matches!(resident, MonotonicReader::Resident(_)));
    assert!(matches!(direct, MonotonicReader::Direct(_)));
    for (i, &v) in values.iter().enumerate() {
        assert_eq!(resident.get(i as u64).unwrap(), v);
        assert_eq!(direct.get(i as u64).unwrap(), v);
    }
    assert_eq!(direct.size(), 300);

    let plain = BlockReader::open(Cursor::new(write_plain(&[5, -5, 9], 64)), VERSION_CURRENT, 64, 3, true).unwrap();
    assert_eq!(plain.get(1).unwrap(), -5);
    assert!(plain.ram_bytes_used() > 0);
}
