use xxhash_rust::xxh64::xxh64;

use crate::types::Uprn;

/// Seeded xxHash64 of the little-endian uprn bytes.
///
/// The algorithm is fixed, so bucket assignment does not move between
/// toolchains or platforms.
pub fn stable_hash_uprn(seed: u64, uprn: Uprn) -> u64 {
    xxh64(&uprn.to_le_bytes(), seed)
}
