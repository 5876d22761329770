use crate::clustering::domain::hash_distance::are_similar;
use crate::features::domain::photo_record::PhotoRecord;

/// Default maximum Hamming distance for near-duplicates.
pub const DEFAULT_HASH_THRESHOLD: u32 = 10;

/// Greedy single pass over `records` in order.
///
/// Each unclaimed record seeds a cluster and claims every later unclaimed
/// record whose pHash or dHash is within `threshold` of the seed. Members
/// are compared with the seed only, never with each other, so this is not
/// single-linkage clustering. Seeds that claim nothing are dropped.
pub fn cluster_near_duplicates(records: &[PhotoRecord], threshold: u32) -> Vec<Vec<String>> {
    let mut claimed = vec![false; records.len()];
    let mut clusters = Vec::new();

    for (i, seed) in records.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        claimed[i] = true;
        let mut members = vec![seed.filename.clone()];

        for (j, candidate) in records.iter().enumerate().skip(i + 1) {
            if claimed[j] {
                continue;
            }
            if is_near_duplicate(seed, candidate, threshold) {
                claimed[j] = true;
                members.push(candidate.filename.clone());
            }
        }

        if members.len() > 1 {
            clusters.push(members);
        }
    }
    clusters
}

fn is_near_duplicate(a: &PhotoRecord, b: &PhotoRecord, threshold: u32) -> bool {
    are_similar(&a.hashes.phash, &b.hashes.phash, threshold)
        || are_similar(&a.hashes.dhash, &b.hashes.dhash, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::domain::photo_ledger::tests::record;

    fn hashed(path: &str, phash: &str, dhash: &str) -> PhotoRecord {
        let mut r = record(path);
        r.hashes.phash = phash.to_string();
        r.hashes.dhash = dhash.to_string();
        r
    }

    #[test]
    fn test_two_near_identical_one_distinct() {
        let records = vec![
            hashed("/a.jpg", "0000000000000000", "ffffffffffffffff"),
            hashed("/b.jpg", "0000000000000003", "fffffffffffffffc"),
            hashed("/c.jpg", "000000ffffffffff", "ffffff0000000000"),
        ];

        let clusters = cluster_near_duplicates(&records, DEFAULT_HASH_THRESHOLD);

        assert_eq!(clusters, vec![vec!["a.jpg".to_string(), "b.jpg".to_string()]]);
    }

    #[test]
    fn test_either_hash_suffices() {
        let records = vec![
            hashed("/a.jpg", "0000000000000000", "0000000000000000"),
            hashed("/b.jpg", "ffffffffffffffff", "0000000000000001"),
        ];
        assert_eq!(cluster_near_duplicates(&records, 10).len(), 1);
    }

    #[test]
    fn test_seed_only_comparison_is_not_transitive() {
        // b is 8 bits from a, c is 8 bits from b but 16 from a.
        let records = vec![
            hashed("/a.jpg", "0000000000000000", "0000000000000000"),
            hashed("/b.jpg", "00000000000000ff", "00000000000000ff"),
            hashed("/c.jpg", "000000000000ffff", "000000000000ffff"),
        ];

        let clusters = cluster_near_duplicates(&records, 10);

        assert_eq!(clusters, vec![vec!["a.jpg".to_string(), "b.jpg".to_string()]]);
    }

    #[test]
    fn test_claimed_records_do_not_seed() {
        let records = vec![
            hashed("/a.jpg", "0000000000000000", "0000000000000000"),
            hashed("/b.jpg", "0000000000000001", "0000000000000001"),
            hashed("/c.jpg", "0000000000000001", "0000000000000001"),
        ];

        let clusters = cluster_near_duplicates(&records, 10);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn test_invalid_hashes_never_cluster() {
        let records = vec![hashed("/a.jpg", "", ""), hashed("/b.jpg", "", "")];
        assert!(cluster_near_duplicates(&records, 64).is_empty());
    }

    #[test]
    fn test_empty() {
        assert!(cluster_near_duplicates(&[], 10).is_empty());
    }
}
