//! Stable routing hash for primary keys.
//!
//! Partition and worker assignment both reduce the same FNV-1a hash, so the
//! value must never change across builds or restarts:
//! - Jobs are routed to shards by `hash(primary_key) % shard_count`
//! - Jobs are routed to workers by `hash(primary_key) % worker_count`

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// FNV-1a 32-bit hash over raw bytes.
#[inline]
pub fn fnv1a32(data: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in data {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Hashes a primary key over its UTF-8 bytes.
#[inline]
pub fn hash_key(primary_key: &str) -> u32 {
    fnv1a32(primary_key.as_bytes())
}

/// Computes which shard owns a primary key.
///
/// A shard count of zero is rejected by configuration validation; here it is
/// treated as a single shard.
#[inline]
pub fn partition_for(primary_key: &str, shard_count: u32) -> u32 {
    hash_key(primary_key) % shard_count.max(1)
}

/// Computes which worker of a pool processes a primary key.
#[inline]
pub fn select_worker(primary_key: &str, worker_count: usize) -> usize {
    // u32 -> usize is lossless on every supported target
    hash_key(primary_key) as usize % worker_count.max(1)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn fnv1a32_matches_reference_vectors() {
        assert_eq!(fnv1a32(b""), 2_166_136_261);
        assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn same_key_selects_same_worker() {
        let first = select_worker("alpha", 4);
        let second = select_worker("alpha", 4);
        assert_eq!(first, second);
        assert!(first < 4);
    }

    #[test]
    fn zero_counts_collapse_to_one_bucket() {
        assert_eq!(partition_for("anything", 0), 0);
        assert_eq!(select_worker("anything", 0), 0);
    }

    #[test]
    fn keys_spread_across_workers() {
        let worker_count = 8;
        let mut counts = vec![0u32; worker_count];
        for i in 0..1000 {
            counts[select_worker(&format!("customer-{i}"), worker_count)] += 1;
        }
        for count in &counts {
            assert!(*count >= 50, "distribution should be reasonably even: {counts:?}");
        }
    }

    proptest! {
        #[test]
        fn hash_is_deterministic(key in ".*") {
            prop_assert_eq!(hash_key(&key), hash_key(&key.clone()));
        }

        #[test]
        fn routing_stays_in_range(key in ".{0,64}", shards in 1u32..64, workers in 1usize..=99) {
            prop_assert!(partition_for(&key, shards) < shards);
            prop_assert!(select_worker(&key, workers) < workers);
            prop_assert_eq!(select_worker(&key, workers), select_worker(&key, workers));
        }
    }
}
