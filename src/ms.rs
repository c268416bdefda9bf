// samspec: Sample-specific strings from BWT-based matching statistics
//
// Copyright 2024 Tommi Mäklin [tommi@maklin.fi].

// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.

// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//
//! The matching statistics kernel and the per-read passes derived from
//! its output.
use std::collections::{BTreeSet, HashMap};

use crate::slp::RandomAccess;

/// A maximal exact match between a read and the reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mem {
    /// Position in the reference.
    pub pos: usize,
    /// Position in the read.
    pub idx: usize,
    /// Length of the match.
    pub len: usize,
}

/// A sample-specific string found in a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSpecific {
    pub seq: Vec<u8>,
    pub read_pos: usize,
    pub ref_pos: usize,
}

/// Aggregated occurrences of one distinct sample-specific string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsOccurrences {
    pub count: u64,
    pub ref_positions: BTreeSet<u64>,
}

/// Worker-local aggregation table, keyed by the string itself.
pub type SsMap = HashMap<Vec<u8>, SsOccurrences>;

/// Extends the seed positions `pointers` into the matching statistics
/// lengths of `seq` against `text`.
///
/// Returns the lengths together with the read's longest maximal exact
/// match. The extension length carries over from one position to the
/// next, dropping by one, so each character of the read is compared to
/// the reference at most twice. A candidate only becomes the longest
/// MEM if the trailing run of its extension contains a character other
/// than 'N'; the run counter is deliberately not reset between
/// positions so an all-N region stays disqualified until a real match
/// restarts it.
///
/// # Examples
/// ```rust
/// use samspec::ms::matching_statistics;
///
/// let text: Vec<u8> = b"ACGTACGTNN".to_vec();
/// let (lengths, mem) = matching_statistics(b"ACGT", &[0, 1, 2, 3], &text);
///
/// assert_eq!(lengths, vec![4, 3, 2, 1]);
/// assert_eq!((mem.pos, mem.idx, mem.len), (0, 0, 4));
/// ```
///
pub fn matching_statistics(
    seq: &[u8],
    pointers: &[usize],
    text: &(impl RandomAccess + ?Sized),
) -> (Vec<usize>, Mem) {
    assert_eq!(seq.len(), pointers.len());

    let m = seq.len();
    let n = text.len();
    let mut lengths: Vec<usize> = vec![0; m];
    let mut mem = Mem::default();

    let mut l = 0;
    let mut n_ns = 0;
    for i in 0..m {
        let pos = pointers[i];
        while i + l < m && pos + l < n && seq[i + l] == text.char_at(pos + l) {
            if seq[i + l] == b'N' {
                n_ns += 1;
            } else {
                n_ns = 0;
            }
            l += 1;
        }
        lengths[i] = l;

        if lengths[i] > mem.len && n_ns < lengths[i] {
            mem = Mem {
                pos,
                idx: i,
                len: lengths[i],
            };
        }

        l = l.saturating_sub(1);
    }

    (lengths, mem)
}

/// Extracts the sample-specific strings of a read from its matching
/// statistics.
///
/// A position `i` where `lengths[i] >= lengths[i - 1]` is a local
/// ascent in the length profile; the match starting at `i - 1` cannot
/// be extended without leaving the reference. Each ascent emits the
/// substring of length `lengths[i - 1] + 2` anchored at `i - 1`, which
/// widens the previous match by one character on both sides. The
/// window is clamped to the end of the read.
///
/// Returns the emissions in scan order.
pub fn sample_specific_strings(
    seq: &[u8],
    pointers: &[usize],
    lengths: &[usize],
) -> Vec<SampleSpecific> {
    assert_eq!(lengths.len(), pointers.len());

    let mut found: Vec<SampleSpecific> = Vec::new();
    for i in 1..lengths.len() {
        if lengths[i] >= lengths[i - 1] {
            let end = (i + lengths[i - 1] + 1).min(seq.len());
            let substring = &seq[(i - 1)..end];
            if !substring.is_empty() {
                found.push(SampleSpecific {
                    seq: substring.to_vec(),
                    read_pos: i - 1,
                    ref_pos: pointers[i - 1],
                });
            }
        }
    }
    found
}

/// Folds one read's sample-specific strings into a worker's table.
pub fn aggregate(table: &mut SsMap, found: &[SampleSpecific]) {
    for ss in found {
        let entry = table.entry(ss.seq.clone()).or_default();
        entry.count += 1;
        entry.ref_positions.insert(ss.ref_pos as u64);
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
//
#[cfg(test)]
mod tests {
    use super::{aggregate, matching_statistics, sample_specific_strings, SsMap};

    const TEXT: &[u8] = b"ACGTACGTNN";

    // Seed positions the pointers index would return: for each suffix
    // of `seq`, a reference position with a maximal common prefix.
    fn exact_pointers(seq: &[u8]) -> Vec<usize> {
        (0..seq.len())
            .map(|i| {
                (0..TEXT.len())
                    .max_by_key(|&pos| {
                        TEXT[pos..]
                            .iter()
                            .zip(&seq[i..])
                            .take_while(|(a, b)| a == b)
                            .count()
                    })
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn full_match_decreases_by_one() {
        let text = TEXT.to_vec();
        let pointers = exact_pointers(b"ACGT");
        let (lengths, mem) = matching_statistics(b"ACGT", &pointers, &text);
        assert_eq!(lengths, vec![4, 3, 2, 1]);
        assert_eq!((mem.idx, mem.len), (0, 4));
        assert!(sample_specific_strings(b"ACGT", &pointers, &lengths).is_empty());
    }

    #[test]
    fn lengths_respect_read_and_text_bounds() {
        let text = TEXT.to_vec();
        let seq = b"ACGTACGTACGT";
        let pointers = exact_pointers(seq);
        let (lengths, _) = matching_statistics(seq, &pointers, &text);
        for (i, &len) in lengths.iter().enumerate() {
            assert!(len <= seq.len() - i);
            assert!(len <= TEXT.len() - pointers[i]);
        }
        for pair in lengths.windows(2) {
            assert!(pair[1] + 1 >= pair[0]);
        }
    }

    #[test]
    fn all_n_extension_never_becomes_the_mem() {
        let text = TEXT.to_vec();
        let seq = b"NNAC";
        let pointers = exact_pointers(seq);
        let (lengths, mem) = matching_statistics(seq, &pointers, &text);

        // The leading NN run matches the reference tail but is
        // disqualified; the AC match at read position 2 wins.
        assert_eq!(lengths[0], 2);
        assert_eq!((mem.idx, mem.len), (2, 2));
        assert_eq!(TEXT[mem.pos], b'A');
    }

    #[test]
    fn read_of_all_ns_leaves_the_mem_empty() {
        let text = TEXT.to_vec();
        let seq = b"NN";
        let pointers = exact_pointers(seq);
        let (lengths, mem) = matching_statistics(seq, &pointers, &text);
        assert!(lengths[0] > 0);
        assert_eq!(mem.len, 0);
    }

    #[test]
    fn empty_and_single_character_reads() {
        let text = TEXT.to_vec();

        let (lengths, mem) = matching_statistics(b"", &[], &text);
        assert!(lengths.is_empty());
        assert_eq!(mem.len, 0);
        assert!(sample_specific_strings(b"", &[], &lengths).is_empty());

        let (lengths, _) = matching_statistics(b"G", &[2], &text);
        assert_eq!(lengths, vec![1]);
        assert!(sample_specific_strings(b"G", &[2], &lengths).is_empty());
    }

    #[test]
    fn ascent_emits_the_widened_previous_match() {
        // Mismatch at the last character: the length profile ends in
        // an ascent and the final match is widened left by one.
        let text = TEXT.to_vec();
        let seq = b"ACGA";
        let pointers = exact_pointers(seq);
        let (lengths, _) = matching_statistics(seq, &pointers, &text);
        assert_eq!(lengths, vec![3, 2, 1, 1]);

        let found = sample_specific_strings(seq, &pointers, &lengths);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].seq, b"GA");
        assert_eq!(found[0].read_pos, 2);
        assert_eq!(found[0].ref_pos, pointers[2]);
    }

    #[test]
    fn window_is_clamped_to_the_read_end() {
        // lengths[4] = 1 >= lengths[3] = 1 emits at read position 3;
        // the nominal window of length 3 pokes one past the read.
        let seq = b"ACGTA";
        let pointers = vec![0, 1, 2, 3, 0];
        let lengths = vec![5, 3, 2, 1, 1];
        let found = sample_specific_strings(seq, &pointers, &lengths);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].seq, b"TA");
        assert_eq!(found[0].read_pos, 3);
        assert_eq!(found[0].ref_pos, 3);
    }

    #[test]
    fn aggregation_counts_and_deduplicates_positions() {
        let mut table = SsMap::new();
        let seq = b"ACGA";
        let text = TEXT.to_vec();
        let pointers = exact_pointers(seq);
        let (lengths, _) = matching_statistics(seq, &pointers, &text);
        let found = sample_specific_strings(seq, &pointers, &lengths);

        aggregate(&mut table, &found);
        aggregate(&mut table, &found);

        let entry = &table[&b"GA".to_vec()];
        assert_eq!(entry.count, 2);
        assert_eq!(entry.ref_positions.len(), 1);
    }
}
