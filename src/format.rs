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
//! On-disk record formats for the intermediate and aggregated outputs.
//!
//! All integers are native-endian unsigned 64-bit values. Records are
//! concatenated without headers or separators; consumers know the file
//! class from its name.
use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

use crate::ms::{Mem, SampleSpecific, SsOccurrences};

/// Appends one read's record to a `.ms.tmp` stream.
///
/// Record layout: read length `m`, then `m` pointers, then `m` lengths.
pub fn write_ms_record(
    out: &mut impl Write,
    pointers: &[usize],
    lengths: &[usize],
) -> io::Result<()> {
    assert_eq!(pointers.len(), lengths.len());

    out.write_u64::<NativeEndian>(pointers.len() as u64)?;
    for pos in pointers {
        out.write_u64::<NativeEndian>(*pos as u64)?;
    }
    for len in lengths {
        out.write_u64::<NativeEndian>(*len as u64)?;
    }
    Ok(())
}

/// Decodes one `.ms.tmp` record into the reused buffers.
///
/// Returns `Ok(None)` at the end of the stream. A stream that ends in
/// the middle of a record is a hard error.
pub fn read_ms_record(
    input: &mut impl Read,
    pointers: &mut Vec<u64>,
    lengths: &mut Vec<u64>,
) -> io::Result<Option<()>> {
    let m = match input.read_u64::<NativeEndian>() {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };

    pointers.clear();
    lengths.clear();
    for _ in 0..m {
        pointers.push(input.read_u64::<NativeEndian>()?);
    }
    for _ in 0..m {
        lengths.push(input.read_u64::<NativeEndian>()?);
    }
    Ok(Some(()))
}

/// Appends one read's record to a `.ss.tmp` stream.
///
/// Record layout: name length and bytes, the longest MEM as its
/// reference position, read position, and length, then the count of
/// sample-specific strings followed by each one as string length,
/// string bytes, read position, and reference position.
pub fn write_ss_record(
    out: &mut impl Write,
    name: &[u8],
    longest_mem: &Mem,
    found: &[SampleSpecific],
) -> io::Result<()> {
    out.write_u64::<NativeEndian>(name.len() as u64)?;
    out.write_all(name)?;
    out.write_u64::<NativeEndian>(longest_mem.pos as u64)?;
    out.write_u64::<NativeEndian>(longest_mem.idx as u64)?;
    out.write_u64::<NativeEndian>(longest_mem.len as u64)?;
    out.write_u64::<NativeEndian>(found.len() as u64)?;
    for ss in found {
        out.write_u64::<NativeEndian>(ss.seq.len() as u64)?;
        out.write_all(&ss.seq)?;
        out.write_u64::<NativeEndian>(ss.read_pos as u64)?;
        out.write_u64::<NativeEndian>(ss.ref_pos as u64)?;
    }
    Ok(())
}

/// Writes the merged aggregation table as a `.sss` stream.
///
/// Record layout per distinct string: string length and bytes, total
/// occurrence count, then the count of distinct reference positions
/// followed by the positions in ascending order.
pub fn write_sss_table(
    out: &mut impl Write,
    table: &BTreeMap<Vec<u8>, SsOccurrences>,
) -> io::Result<()> {
    for (seq, occurrences) in table {
        out.write_u64::<NativeEndian>(seq.len() as u64)?;
        out.write_all(seq)?;
        out.write_u64::<NativeEndian>(occurrences.count)?;
        out.write_u64::<NativeEndian>(occurrences.ref_positions.len() as u64)?;
        for pos in &occurrences.ref_positions {
            out.write_u64::<NativeEndian>(*pos)?;
        }
    }
    Ok(())
}
