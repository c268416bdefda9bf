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
//! Loading and querying the serialized matching statistics indexes.
//!
//! Queries go through [MsIndex], which pairs the pointers index with a
//! random access text oracle. Both artifacts are built by an upstream
//! tool and are only deserialized here; the pair is loaded once and
//! shared read-only across all query workers.
use std::cmp::Ordering;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::Error;
use crate::slp::{PlainSlp, RandomAccess, ShapedSlp};

/// The pointers index: positions of the reference in lexicographic
/// suffix order.
///
/// Layout: entry count (u64), then one u64 position per suffix.
pub struct PointersIndex {
    suffixes: Vec<u64>,
}

impl PointersIndex {
    /// Loads a prebuilt pointers index from `path`.
    ///
    /// Returns an [Error] if the file cannot be read or an entry is out
    /// of range.
    pub fn load(path: &Path) -> Result<PointersIndex, Error> {
        let conn = File::open(path).map_err(|e| Error::io(e, path))?;
        let mut reader = BufReader::new(conn);

        let count = reader
            .read_u64::<LittleEndian>()
            .map_err(|e| Error::io(e, path))?;
        let count = usize::try_from(count)
            .map_err(|_| Error::load(path, "entry count does not fit in usize"))?;

        let mut suffixes: Vec<u64> = Vec::with_capacity(count);
        for _ in 0..count {
            let pos = reader
                .read_u64::<LittleEndian>()
                .map_err(|e| Error::io(e, path))?;
            if pos >= count as u64 {
                return Err(Error::load(path, format!("position {} out of range", pos)));
            }
            suffixes.push(pos);
        }

        Ok(PointersIndex { suffixes })
    }

    pub fn len(&self) -> usize {
        self.suffixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }
}

/// The two preloaded artifacts behind the matching statistics queries.
pub struct MsIndex {
    pointers: PointersIndex,
    text: Box<dyn RandomAccess>,
}

impl MsIndex {
    /// Loads the index pair stored at the base name `infile`.
    ///
    /// Reads the pointers index from `infile + ".ptr"` and the random
    /// access text from `infile + ".slp"` when `shaped_slp` is set, or
    /// `infile + ".plain.slp"` otherwise.
    ///
    /// Returns an [Error] if either artifact is unreadable or the two
    /// disagree on the text length.
    pub fn load(infile: &str, shaped_slp: bool) -> Result<MsIndex, Error> {
        let ptr_file = format!("{}.ptr", infile);
        let pointers = PointersIndex::load(Path::new(&ptr_file))?;

        let text: Box<dyn RandomAccess> = if shaped_slp {
            let slp_file = format!("{}.slp", infile);
            Box::new(ShapedSlp::load(Path::new(&slp_file))?)
        } else {
            let slp_file = format!("{}.plain.slp", infile);
            Box::new(PlainSlp::load(Path::new(&slp_file))?)
        };

        if pointers.len() != text.len() {
            return Err(Error::load(
                ptr_file,
                format!(
                    "pointers index covers {} positions but the text has {}",
                    pointers.len(),
                    text.len()
                ),
            ));
        }

        Ok(MsIndex { pointers, text })
    }

    /// Character of the reference text at `pos`. Total on
    /// `0..self.text_length()`.
    pub fn text_at(&self, pos: usize) -> u8 {
        self.text.char_at(pos)
    }

    /// Length of the reference text.
    pub fn text_length(&self) -> usize {
        self.text.len()
    }

    /// Matching statistics seed positions for every suffix of `query`.
    ///
    /// Element `i` of the return value is a position of the reference
    /// whose suffix has a maximal longest common prefix with
    /// `query[i..]`. The kernel extends these seeds into the matching
    /// statistics lengths without reverifying them.
    pub fn pointers_query(&self, query: &[u8]) -> Vec<usize> {
        (0..query.len())
            .map(|i| self.best_match(&query[i..]))
            .collect()
    }

    // Position of the reference suffix with a maximal LCP against
    // `pattern`. The best suffix neighbors the insertion point of
    // `pattern` in suffix order; ties prefer the right neighbor.
    fn best_match(&self, pattern: &[u8]) -> usize {
        let suffixes = &self.pointers.suffixes;
        let at = suffixes.partition_point(|&pos| self.suffix_cmp(pos as usize, pattern).is_lt());

        let before = at.checked_sub(1).map(|k| suffixes[k] as usize);
        let after = suffixes.get(at).map(|&pos| pos as usize);
        match (before, after) {
            (None, Some(pos)) => pos,
            (Some(pos), None) => pos,
            (Some(lo), Some(hi)) => {
                if self.lcp(lo, pattern) > self.lcp(hi, pattern) {
                    lo
                } else {
                    hi
                }
            }
            (None, None) => 0,
        }
    }

    // Lexicographic order of the suffix starting at `pos` relative to
    // `pattern`. A proper prefix sorts before the longer string.
    fn suffix_cmp(&self, pos: usize, pattern: &[u8]) -> Ordering {
        let n = self.text.len();
        for (k, c) in pattern.iter().enumerate() {
            if pos + k >= n {
                return Ordering::Less;
            }
            let got = self.text.char_at(pos + k);
            if got != *c {
                return got.cmp(c);
            }
        }
        if pos + pattern.len() == n {
            Ordering::Equal
        } else {
            Ordering::Greater
        }
    }

    fn lcp(&self, pos: usize, pattern: &[u8]) -> usize {
        let n = self.text.len();
        let mut len = 0;
        while len < pattern.len() && pos + len < n && self.text.char_at(pos + len) == pattern[len] {
            len += 1;
        }
        len
    }
}

impl RandomAccess for MsIndex {
    fn char_at(&self, pos: usize) -> u8 {
        self.text_at(pos)
    }

    fn len(&self) -> usize {
        self.text_length()
    }
}
