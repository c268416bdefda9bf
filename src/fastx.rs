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
//! Reading the patterns file: gzip detection, splitting an uncompressed
//! FASTQ into byte ranges, and a record reader that reports where each
//! record starts.
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Checks `path` for the gzip magic bytes.
///
/// Gzipped patterns cannot be split into byte ranges, so the query
/// driver forces a single worker when this returns true.
pub fn is_gzipped(path: &Path) -> Result<bool, Error> {
    let mut conn = File::open(path).map_err(|e| Error::io(e, path))?;
    let mut magic = [0u8; 2];
    match conn.read_exact(&mut magic) {
        Ok(()) => Ok(magic == GZIP_MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(Error::io(e, path)),
    }
}

/// Splits an uncompressed FASTQ file into `n_shards` byte ranges.
///
/// Returns `n_shards + 1` offsets starting with 0 and ending with the
/// file size. Every interior offset is moved forward from the even
/// split point to the start of a FASTQ record, so each record is owned
/// by exactly one shard.
pub fn split_fastq(path: &Path, n_shards: usize) -> Result<Vec<u64>, Error> {
    assert!(n_shards > 0);

    let conn = File::open(path).map_err(|e| Error::io(e, path))?;
    let size = conn.metadata().map_err(|e| Error::io(e, path))?.len();
    let mut reader = BufReader::new(conn);

    let mut starts: Vec<u64> = Vec::with_capacity(n_shards + 1);
    starts.push(0);
    for shard in 1..n_shards {
        let target = (size as u128 * shard as u128 / n_shards as u128) as u64;
        let start = next_record_start(&mut reader, target, size).map_err(|e| Error::io(e, path))?;
        starts.push(start);
    }
    starts.push(size);
    Ok(starts)
}

// Offset of the first FASTQ record at or after `target`.
//
// Scans forward from `target - 1` and collects the first character
// after each of the next four line breaks. FASTQ headers alternate
// with separator lines every other line, so a window pair ('@', '+')
// or ('+', '@') two lines apart pins down a record start. Falls back
// to the current offset when the window matches neither pair.
fn next_record_start(reader: &mut BufReader<File>, target: u64, size: u64) -> io::Result<u64> {
    if target == 0 {
        reader.seek(SeekFrom::Start(0))?;
        if read_byte(reader)? == Some(b'@') {
            return Ok(0);
        }
    }

    let scan_from = target.saturating_sub(1);
    reader.seek(SeekFrom::Start(scan_from))?;
    let mut offset = scan_from;

    let mut window: Vec<(u8, u64)> = Vec::with_capacity(4);
    for _ in 0..4 {
        loop {
            match read_byte(reader)? {
                None => return Ok(size),
                Some(c) => {
                    offset += 1;
                    if c == b'\n' {
                        break;
                    }
                }
            }
        }
        match read_byte(reader)? {
            None => return Ok(size),
            Some(c) => {
                offset += 1;
                window.push((c, offset - 1));
            }
        }
    }

    for k in 0..2 {
        if window[k].0 == b'@' && window[k + 2].0 == b'+' {
            return Ok(window[k].1);
        }
        if window[k].0 == b'+' && window[k + 2].0 == b'@' {
            return Ok(window[k + 2].1);
        }
    }

    Ok(offset)
}

fn read_byte(reader: &mut impl Read) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    if reader.read(&mut buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(buf[0]))
}

/// A FASTQ/FASTA record. Base qualities are not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: Vec<u8>,
    pub seq: Vec<u8>,
}

/// Streaming FASTQ/FASTA reader over any byte source.
///
/// Tracks the absolute offset of every consumed byte so that a worker
/// assigned the byte range `[start, end)` can stop at the first record
/// whose header begins at or after `end`. Construct with the offset the
/// underlying reader was positioned at.
pub struct FastxReader<R> {
    reader: R,
    offset: u64,
    // Header byte consumed while scanning the previous record, with
    // its offset.
    pending_header: Option<(u8, u64)>,
}

impl<R: BufRead> FastxReader<R> {
    pub fn new(reader: R, offset: u64) -> FastxReader<R> {
        FastxReader {
            reader,
            offset,
            pending_header: None,
        }
    }

    /// Reads the next record.
    ///
    /// Returns the byte offset of the record's header line together
    /// with the record, or `None` at the end of the input. Bytes before
    /// the next header and truncated trailing records are skipped.
    pub fn next_record(&mut self) -> io::Result<Option<(u64, Record)>> {
        let start = match self.pending_header.take() {
            Some((_, at)) => at,
            None => loop {
                match self.getc()? {
                    None => return Ok(None),
                    Some(b'@') | Some(b'>') => break self.offset - 1,
                    Some(_) => {}
                }
            },
        };

        // Name runs to the first whitespace; the rest of the line is a
        // comment and is dropped.
        let mut name: Vec<u8> = Vec::new();
        let mut line_done = false;
        loop {
            match self.getc()? {
                None => return Ok(None),
                Some(b'\n') => {
                    line_done = true;
                    break;
                }
                Some(c) if c.is_ascii_whitespace() => break,
                Some(c) => name.push(c),
            }
        }
        if !line_done {
            loop {
                match self.getc()? {
                    None => return Ok(None),
                    Some(b'\n') => break,
                    Some(_) => {}
                }
            }
        }

        // Sequence lines run until a quality separator or the next
        // header. The markers only count at the start of a line.
        let mut seq: Vec<u8> = Vec::new();
        let mut at_line_start = true;
        loop {
            match self.getc()? {
                None => return Ok(Some((start, Record { name, seq }))),
                Some(c @ b'@') | Some(c @ b'>') if at_line_start => {
                    self.pending_header = Some((c, self.offset - 1));
                    return Ok(Some((start, Record { name, seq })));
                }
                Some(b'+') if at_line_start => break,
                Some(b'\n') => at_line_start = true,
                Some(b'\r') => {}
                Some(c) => {
                    at_line_start = false;
                    seq.push(c);
                }
            }
        }

        // Skip the separator line, then as many quality characters as
        // there are sequence characters. A record cut off inside its
        // quality string is dropped.
        loop {
            match self.getc()? {
                None => return Ok(None),
                Some(b'\n') => break,
                Some(_) => {}
            }
        }
        let mut quality_len = 0;
        while quality_len < seq.len() {
            match self.getc()? {
                None => return Ok(None),
                Some(b'\n') | Some(b'\r') => {}
                Some(_) => quality_len += 1,
            }
        }

        Ok(Some((start, Record { name, seq })))
    }

    fn getc(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        if self.reader.read(&mut buf)? == 0 {
            return Ok(None);
        }
        self.offset += 1;
        Ok(Some(buf[0]))
    }
}
