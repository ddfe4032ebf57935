//! Placement of blobs within a square.
//!
//! A blob is committed to as a merkle mountain range over its shares. To make that commitment
//! verifiable against the row roots of the square without any sibling outside of the blob, every
//! blob must start at an index that is a multiple of its subtree width. These rules are
//! "non-interactive": anyone can derive a blob's position from its length and the cursor alone.

use std::num::NonZeroU64;

/// Returns the smallest power of two greater than or equal to `n` (`1` for zero).
pub fn round_up_power_of_two(n: usize) -> usize {
    let mut result = 1;
    while result < n {
        result <<= 1;
    }
    result
}

/// Returns the largest power of two less than or equal to `n`.
pub fn round_down_power_of_two(n: NonZeroU64) -> u64 {
    1 << (u64::BITS - 1 - n.leading_zeros())
}

/// Returns the smallest multiple of `v` greater than or equal to `cursor`.
///
/// # Panics
///
/// Panics if `v` is zero.
pub fn round_up_by_multiple_of(cursor: usize, v: usize) -> usize {
    cursor.div_ceil(v) * v
}

/// Returns the width of the smallest square (a power of two) with at least `share_count`
/// shares.
pub fn blob_min_square_size(share_count: usize) -> usize {
    let mut size = 1usize;
    while size * size < share_count {
        size <<= 1;
    }
    size
}

/// Returns the largest power-of-two run of shares that the commitment of a blob spanning
/// `share_count` shares may treat as one subtree.
///
/// # Panics
///
/// Panics if `subtree_root_threshold` is zero.
pub fn subtree_width(share_count: usize, subtree_root_threshold: usize) -> usize {
    let width = round_up_power_of_two(share_count.div_ceil(subtree_root_threshold));
    width.min(blob_min_square_size(share_count))
}

/// Returns the first index at or after `cursor` where a blob spanning `blob_share_len` shares
/// may start.
pub fn next_share_index(
    cursor: usize,
    blob_share_len: usize,
    subtree_root_threshold: usize,
) -> usize {
    let width = subtree_width(blob_share_len, subtree_root_threshold);
    round_up_by_multiple_of(cursor, width)
}

/// Place blobs of the given share lengths one after another, starting at `cursor`.
///
/// Returns the number of shares used (including the padding inserted before each blob) and the
/// start index of every blob.
pub fn blob_shares_used_non_interactive_defaults(
    cursor: usize,
    subtree_root_threshold: usize,
    blob_share_lens: &[usize],
) -> (usize, Vec<usize>) {
    let start = cursor;
    let mut cursor = cursor;
    let mut indexes = Vec::with_capacity(blob_share_lens.len());
    for len in blob_share_lens {
        cursor = next_share_index(cursor, *len, subtree_root_threshold);
        indexes.push(cursor);
        cursor += len;
    }
    (cursor - start, indexes)
}

/// Returns the sizes of the trees of a merkle mountain range over `total` leaves, where no
/// tree may exceed `max_tree_size` leaves.
pub fn merkle_mountain_range_sizes(total: u64, max_tree_size: NonZeroU64) -> Vec<u64> {
    let mut sizes = Vec::new();
    let mut remaining = total;
    while let Some(left) = NonZeroU64::new(remaining) {
        let size = if left >= max_tree_size {
            max_tree_size.get()
        } else {
            round_down_power_of_two(left)
        };
        sizes.push(size);
        remaining -= size;
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use test_case::test_case;

    #[test_case(0, 1)]
    #[test_case(1, 1)]
    #[test_case(2, 2)]
    #[test_case(3, 4)]
    #[test_case(64, 64)]
    #[test_case(65, 128)]
    fn test_round_up_power_of_two(n: usize, expected: usize) {
        assert_eq!(round_up_power_of_two(n), expected);
    }

    #[test_case(1, 1)]
    #[test_case(3, 2)]
    #[test_case(8, 8)]
    #[test_case(1_000, 512)]
    fn test_round_down_power_of_two(n: u64, expected: u64) {
        assert_eq!(round_down_power_of_two(NonZeroU64::new(n).unwrap()), expected);
    }

    #[test_case(0, 1)]
    #[test_case(1, 1)]
    #[test_case(2, 2)]
    #[test_case(4, 2)]
    #[test_case(5, 4)]
    #[test_case(16, 4)]
    #[test_case(17, 8)]
    #[test_case(16_384, 128)]
    #[test_case(16_385, 256)]
    fn test_blob_min_square_size(shares: usize, expected: usize) {
        assert_eq!(blob_min_square_size(shares), expected);
    }

    #[test_case(0, 64, 1)]
    #[test_case(1, 64, 1)]
    #[test_case(64, 64, 1)]
    #[test_case(65, 64, 2)]
    #[test_case(128, 64, 2)]
    #[test_case(129, 64, 4)]
    #[test_case(1_000, 64, 16)]
    #[test_case(1_000, 1, 32)]
    #[test_case(5, 1, 4)]
    fn test_subtree_width(shares: usize, threshold: usize, expected: usize) {
        assert_eq!(subtree_width(shares, threshold), expected);
    }

    #[test_case(0, 10, 64, 0)]
    #[test_case(3, 10, 64, 3)]
    #[test_case(3, 100, 64, 4)]
    #[test_case(5, 1_000, 64, 16)]
    #[test_case(16, 1_000, 64, 16)]
    #[test_case(17, 1_000, 64, 32)]
    fn test_next_share_index(cursor: usize, len: usize, threshold: usize, expected: usize) {
        assert_eq!(next_share_index(cursor, len, threshold), expected);
    }

    #[test]
    fn test_placement_properties() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..10_000 {
            let cursor = rng.gen_range(0..100_000);
            let len = rng.gen_range(0..100_000);
            let threshold = rng.gen_range(1..256);

            let width = subtree_width(len, threshold);
            assert!(width.is_power_of_two());
            assert!(width <= blob_min_square_size(len));

            let index = next_share_index(cursor, len, threshold);
            assert_eq!(index, next_share_index(cursor, len, threshold));
            assert!(index >= cursor);
            assert!(index - cursor < width);
            assert_eq!(index % width, 0);
        }
    }

    #[test]
    fn test_blob_shares_used() {
        let (used, indexes) = blob_shares_used_non_interactive_defaults(3, 64, &[1, 100, 10]);
        // 3 -> 3 (width 1), 4 -> 4 (width 2), 104 -> 104 (width 1)
        assert_eq!(indexes, vec![3, 4, 104]);
        assert_eq!(used, 114 - 3);

        let (used, indexes) = blob_shares_used_non_interactive_defaults(0, 64, &[]);
        assert_eq!(used, 0);
        assert!(indexes.is_empty());
    }

    #[test_case(11, 4, vec![4, 4, 2, 1])]
    #[test_case(2, 64, vec![2])]
    #[test_case(64, 8, vec![8; 8])]
    #[test_case(0, 8, vec![])]
    fn test_merkle_mountain_range_sizes(total: u64, max: u64, expected: Vec<u64>) {
        assert_eq!(
            merkle_mountain_range_sizes(total, NonZeroU64::new(max).unwrap()),
            expected
        );
    }
}
