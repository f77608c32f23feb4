// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Pattern-index key enumeration.
use weft_hash::{expression_hash, Handle, WILDCARD_HASH};

/// Enumerates the pattern-index keys for a link.
///
/// `hashes[0]` is the link's type hash and the rest are its target handles.
/// Every combination of concrete-vs-wildcard positions is emitted except the
/// all-wildcard row: each emitted key is the expression hash of the sequence
/// with non-selected slots replaced by [`WILDCARD_HASH`]. Key order carries
/// no meaning.
pub fn pattern_keys(hashes: &[Handle]) -> Vec<Handle> {
    let arity = hashes.len();
    if arity == 0 {
        return Vec::new();
    }
    debug_assert!(arity < 128, "pattern arity exceeds enumeration width");
    let rows = 1u128 << arity;
    let mut keys = Vec::new();
    // Bit i of the mask keeps position i concrete. Mask 0 would wildcard
    // every slot; that row is never indexed.
    for mask in 1..rows {
        let row: Vec<&str> = hashes
            .iter()
            .enumerate()
            .map(|(i, hash)| {
                if mask & (1u128 << i) == 0 {
                    WILDCARD_HASH.as_str()
                } else {
                    hash.as_str()
                }
            })
            .collect();
        keys.push(expression_hash(row[0], &row[1..]));
    }
    keys
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use weft_hash::{named_type_hash, terminal_hash};

    use super::*;

    fn sample() -> Vec<Handle> {
        vec![
            named_type_hash("Similarity"),
            terminal_hash("Concept", "human").unwrap(),
            terminal_hash("Concept", "monkey").unwrap(),
        ]
    }

    #[test]
    fn emits_every_row_except_all_wildcard() {
        let hashes = sample();
        let keys = pattern_keys(&hashes);
        assert_eq!(keys.len(), 7);

        let w = WILDCARD_HASH.as_str();
        let all_wild = expression_hash(w, &[w, w]);
        assert!(!keys.contains(&all_wild));
    }

    #[test]
    fn includes_fully_concrete_row() {
        let hashes = sample();
        let keys = pattern_keys(&hashes);
        let concrete = expression_hash(&hashes[0], &[hashes[1].as_str(), hashes[2].as_str()]);
        assert!(keys.contains(&concrete));
    }

    #[test]
    fn includes_single_slot_rows() {
        let hashes = sample();
        let keys = pattern_keys(&hashes);
        let w = WILDCARD_HASH.as_str();
        // Type selected, both targets wildcarded.
        assert!(keys.contains(&expression_hash(&hashes[0], &[w, w])));
        // Second target selected only.
        assert!(keys.contains(&expression_hash(w, &[w, hashes[2].as_str()])));
    }

    #[test]
    fn keys_are_distinct() {
        let keys = pattern_keys(&sample());
        let mut deduped = keys.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), keys.len());
    }

    #[test]
    fn empty_input_emits_nothing() {
        assert!(pattern_keys(&[]).is_empty());
    }
}
