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
//! Random access to the reference text through a straight-line program.
//!
//! The reference is never materialized in memory. Both SLP variants
//! decode single characters on demand by descending a grammar whose
//! terminals are the byte values `0..256` and whose rules are pairs of
//! earlier symbols. The variants differ only in how the rule pairs are
//! serialized: fixed-width 32-bit integers (`.plain.slp`) or bit-packed
//! ids at the minimal width (`.slp`).
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::Error;

/// Symbol ids below this value are terminals encoding the byte itself.
const FIRST_RULE: u32 = 256;

/// Random access to a text.
///
/// Implementations must be shareable across the query worker threads.
pub trait RandomAccess: Send + Sync {
    /// Character of the text at `pos`. Total on `0..self.len()`.
    fn char_at(&self, pos: usize) -> u8;

    /// Length of the text.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Plain in-memory text; used by small references and the test suites.
impl RandomAccess for Vec<u8> {
    fn char_at(&self, pos: usize) -> u8 {
        self[pos]
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

// Grammar core shared by both serialized variants. Rule j has symbol id
// FIRST_RULE + j and may only reference smaller ids.
struct Grammar {
    left: Vec<u32>,
    right: Vec<u32>,
    expansion: Vec<u64>,
    root: u32,
    len: usize,
}

impl Grammar {
    fn new(left: Vec<u32>, right: Vec<u32>, root: u32, path: &Path) -> Result<Grammar, Error> {
        assert_eq!(left.len(), right.len());

        let mut expansion: Vec<u64> = Vec::with_capacity(left.len());
        for rule in 0..left.len() {
            let limit = FIRST_RULE + rule as u32;
            if left[rule] >= limit || right[rule] >= limit {
                return Err(Error::load(
                    path,
                    format!("rule {} references a later symbol", rule),
                ));
            }
            let len = symbol_len(&expansion, left[rule])
                .checked_add(symbol_len(&expansion, right[rule]))
                .ok_or_else(|| Error::load(path, "expansion length overflows u64"))?;
            expansion.push(len);
        }

        if root >= FIRST_RULE + left.len() as u32 {
            return Err(Error::load(path, "root symbol out of range"));
        }
        let len = symbol_len(&expansion, root) as usize;

        Ok(Grammar {
            left,
            right,
            expansion,
            root,
            len,
        })
    }

    fn char_at(&self, pos: usize) -> u8 {
        let mut sym = self.root;
        let mut pos = pos as u64;
        while sym >= FIRST_RULE {
            let rule = (sym - FIRST_RULE) as usize;
            let left_len = symbol_len(&self.expansion, self.left[rule]);
            if pos < left_len {
                sym = self.left[rule];
            } else {
                pos -= left_len;
                sym = self.right[rule];
            }
        }
        sym as u8
    }
}

fn symbol_len(expansion: &[u64], sym: u32) -> u64 {
    if sym < FIRST_RULE {
        1
    } else {
        expansion[(sym - FIRST_RULE) as usize]
    }
}

/// SLP with rule pairs stored as fixed-width 32-bit integers.
///
/// Layout: rule count (u64), root symbol (u64), then one `(left, right)`
/// pair of u32 per rule in topological order.
pub struct PlainSlp {
    grammar: Grammar,
}

impl PlainSlp {
    /// Loads a plain SLP from `path`.
    ///
    /// Returns an [Error] if the file cannot be read or the grammar
    /// fails validation.
    pub fn load(path: &Path) -> Result<PlainSlp, Error> {
        let conn = File::open(path).map_err(|e| Error::io(e, path))?;
        let mut reader = BufReader::new(conn);

        let rule_count = read_header(&mut reader, path)?;
        let root = read_root(&mut reader, path)?;

        let mut left: Vec<u32> = Vec::with_capacity(rule_count);
        let mut right: Vec<u32> = Vec::with_capacity(rule_count);
        for _ in 0..rule_count {
            left.push(
                reader
                    .read_u32::<LittleEndian>()
                    .map_err(|e| Error::io(e, path))?,
            );
            right.push(
                reader
                    .read_u32::<LittleEndian>()
                    .map_err(|e| Error::io(e, path))?,
            );
        }

        Ok(PlainSlp {
            grammar: Grammar::new(left, right, root, path)?,
        })
    }
}

impl RandomAccess for PlainSlp {
    fn char_at(&self, pos: usize) -> u8 {
        self.grammar.char_at(pos)
    }

    fn len(&self) -> usize {
        self.grammar.len
    }
}

/// SLP with rule pairs bit-packed at the minimal symbol width.
///
/// Layout: rule count (u64), root symbol (u64), bits per symbol id (u8),
/// then `2 * rule_count` ids packed LSB-first.
pub struct ShapedSlp {
    grammar: Grammar,
}

impl ShapedSlp {
    /// Loads a shaped SLP from `path`.
    ///
    /// Returns an [Error] if the file cannot be read or the grammar
    /// fails validation.
    pub fn load(path: &Path) -> Result<ShapedSlp, Error> {
        let conn = File::open(path).map_err(|e| Error::io(e, path))?;
        let mut reader = BufReader::new(conn);

        let rule_count = read_header(&mut reader, path)?;
        let root = read_root(&mut reader, path)?;
        let width = reader.read_u8().map_err(|e| Error::io(e, path))?;
        if width == 0 || width > 32 {
            return Err(Error::load(path, format!("invalid symbol width {}", width)));
        }

        let n_bits = 2 * rule_count * width as usize;
        let mut data = vec![0u8; n_bits.div_ceil(8)];
        reader
            .read_exact(&mut data)
            .map_err(|e| Error::io(e, path))?;

        let mut left: Vec<u32> = Vec::with_capacity(rule_count);
        let mut right: Vec<u32> = Vec::with_capacity(rule_count);
        for rule in 0..rule_count {
            left.push(unpack(&data, 2 * rule, width));
            right.push(unpack(&data, 2 * rule + 1, width));
        }

        Ok(ShapedSlp {
            grammar: Grammar::new(left, right, root, path)?,
        })
    }
}

impl RandomAccess for ShapedSlp {
    fn char_at(&self, pos: usize) -> u8 {
        self.grammar.char_at(pos)
    }

    fn len(&self) -> usize {
        self.grammar.len
    }
}

fn read_header(reader: &mut impl Read, path: &Path) -> Result<usize, Error> {
    let rule_count = reader
        .read_u64::<LittleEndian>()
        .map_err(|e| Error::io(e, path))?;
    usize::try_from(rule_count).map_err(|_| Error::load(path, "rule count does not fit in usize"))
}

fn read_root(reader: &mut impl Read, path: &Path) -> Result<u32, Error> {
    let root = reader
        .read_u64::<LittleEndian>()
        .map_err(|e| Error::io(e, path))?;
    u32::try_from(root).map_err(|_| Error::load(path, "root symbol out of range"))
}

// Extract the `index`th `width`-bit id from an LSB-first packed buffer.
fn unpack(data: &[u8], index: usize, width: u8) -> u32 {
    let bit = index * width as usize;
    let byte = bit / 8;
    let shift = bit % 8;

    let mut word = 0u64;
    for k in 0..8 {
        word |= (data.get(byte + k).copied().unwrap_or(0) as u64) << (8 * k);
    }
    ((word >> shift) & ((1u64 << width) - 1)) as u32
}

////////////////////////////////////////////////////////////////////////////////
// Tests
//
#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;

    use byteorder::{LittleEndian, WriteBytesExt};

    use super::{Grammar, PlainSlp, RandomAccess, ShapedSlp};

    // "ACAC": 256 = (A, C), 257 = (256, 256)
    fn acac() -> Grammar {
        let left = vec![b'A' as u32, 256];
        let right = vec![b'C' as u32, 256];
        Grammar::new(left, right, 257, Path::new("test")).unwrap()
    }

    #[test]
    fn grammar_char_at() {
        let grammar = acac();
        assert_eq!(grammar.len, 4);
        let expected = b"ACAC";
        for (pos, c) in expected.iter().enumerate() {
            assert_eq!(grammar.char_at(pos), *c);
        }
    }

    #[test]
    fn grammar_single_terminal() {
        let grammar = Grammar::new(vec![], vec![], b'G' as u32, Path::new("test")).unwrap();
        assert_eq!(grammar.len, 1);
        assert_eq!(grammar.char_at(0), b'G');
    }

    #[test]
    fn grammar_rejects_forward_reference() {
        let left = vec![257];
        let right = vec![b'C' as u32];
        let got = Grammar::new(left, right, 256, Path::new("test"));
        assert!(got.is_err());
    }

    #[test]
    fn grammar_rejects_root_out_of_range() {
        let got = Grammar::new(vec![], vec![], 256, Path::new("test"));
        assert!(got.is_err());
    }

    #[test]
    fn load_plain_slp() {
        let mut contents: Vec<u8> = Vec::new();
        contents.write_u64::<LittleEndian>(2).unwrap();
        contents.write_u64::<LittleEndian>(257).unwrap();
        for (left, right) in [(b'A' as u32, b'C' as u32), (256, 256)] {
            contents.write_u32::<LittleEndian>(left).unwrap();
            contents.write_u32::<LittleEndian>(right).unwrap();
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&contents).unwrap();
        file.flush().unwrap();

        let slp = PlainSlp::load(file.path()).unwrap();
        assert_eq!(slp.len(), 4);
        assert_eq!(
            (0..4).map(|pos| slp.char_at(pos)).collect::<Vec<u8>>(),
            b"ACAC"
        );
    }

    #[test]
    fn load_shaped_slp() {
        // Same grammar as load_plain_slp at width 9.
        let width: u8 = 9;
        let symbols: [u32; 4] = [b'A' as u32, b'C' as u32, 256, 256];
        let mut packed = vec![0u8; (4 * width as usize).div_ceil(8)];
        for (index, sym) in symbols.iter().enumerate() {
            let bit = index * width as usize;
            for k in 0..width as usize {
                if sym & (1 << k) != 0 {
                    packed[(bit + k) / 8] |= 1 << ((bit + k) % 8);
                }
            }
        }

        let mut contents: Vec<u8> = Vec::new();
        contents.write_u64::<LittleEndian>(2).unwrap();
        contents.write_u64::<LittleEndian>(257).unwrap();
        contents.push(width);
        contents.extend_from_slice(&packed);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&contents).unwrap();
        file.flush().unwrap();

        let slp = ShapedSlp::load(file.path()).unwrap();
        assert_eq!(slp.len(), 4);
        assert_eq!(
            (0..4).map(|pos| slp.char_at(pos)).collect::<Vec<u8>>(),
            b"ACAC"
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(PlainSlp::load(Path::new("/does/not/exist.plain.slp")).is_err());
    }
}
