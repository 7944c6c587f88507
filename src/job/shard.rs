//! Contiguous shard partitioning.
//!
//! Item `j` of `n` belongs to shard `i` of `s` when
//! `floor(n*i/s) <= j < floor(n*(i+1)/s)`. Shards differ in size by at most
//! one and together cover every item exactly once.

use std::ops::Range;

/// Index range of shard `index` out of `count` over `len` items.
///
/// `count` must be non-zero and `index < count`.
pub fn shard_range(len: usize, index: usize, count: usize) -> Range<usize> {
    debug_assert!(count > 0 && index < count);
    let bound = |i: usize| ((len as u128 * i as u128) / count as u128) as usize;
    bound(index)..bound(index + 1)
}

/// Shard that item `item` of `len` falls in, out of `count`.
///
/// Inverse of [`shard_range`]: `item < len` and `count` must be non-zero.
pub fn shard_of(len: usize, item: usize, count: usize) -> usize {
    debug_assert!(count > 0 && item < len);
    let (len, item, count) = (len as u128, item as u128, count as u128);
    ((item + 1) * count).div_ceil(len) as usize - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_items_four_shards() {
        let ranges: Vec<_> = (0..4).map(|i| shard_range(10, i, 4)).collect();
        assert_eq!(ranges, vec![0..2, 2..5, 5..7, 7..10]);
    }

    #[test]
    fn shards_cover_every_item_once() {
        for len in 0..40 {
            for count in 1..9 {
                let flat: Vec<_> = (0..count).flat_map(|i| shard_range(len, i, count)).collect();
                assert_eq!(flat, (0..len).collect::<Vec<_>>(), "len={len} count={count}");
            }
        }
    }

    #[test]
    fn shard_of_inverts_shard_range() {
        for len in 1..40 {
            for count in 1..9 {
                for shard in 0..count {
                    for item in shard_range(len, shard, count) {
                        assert_eq!(shard_of(len, item, count), shard, "len={len} item={item}");
                    }
                }
            }
        }
        assert_eq!(
            (0..10).map(|j| shard_of(10, j, 4)).collect::<Vec<_>>(),
            vec![0, 0, 1, 1, 1, 2, 2, 3, 3, 3]
        );
    }

    #[test]
    fn more_shards_than_items_leaves_empty_shards() {
        let empty = (0..4).filter(|&i| shard_range(2, i, 4).is_empty()).count();
        assert_eq!(empty, 2);
        assert_eq!((shard_of(2, 0, 4), shard_of(2, 1, 4)), (1, 3));
    }

    #[test]
    fn single_shard_is_everything() {
        assert_eq!(shard_range(7, 0, 1), 0..7);
    }
}
