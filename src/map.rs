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
//! Sharded execution of the matching statistics queries.
//!
//! The patterns file is split into one byte range per worker thread.
//! Workers share the loaded index read-only, own their output files and
//! a private aggregation table, and never synchronize during the scan;
//! the tables are merged on the main thread after all workers join.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::thread;

use flate2::read::MultiGzDecoder;
use log::{debug, info};

use crate::error::Error;
use crate::fastx::{self, FastxReader};
use crate::format;
use crate::index::MsIndex;
use crate::ms::{self, SsMap, SsOccurrences};

fn ms_tmp_file(out_prefix: &str, shard: usize) -> String {
    format!("{}_{}.ms.tmp", out_prefix, shard)
}

fn ss_tmp_file(out_prefix: &str, shard: usize) -> String {
    format!("{}_{}.ss.tmp", out_prefix, shard)
}

/// Runs the matching statistics queries for every read in `patterns`.
///
/// Splits the patterns file into `n_threads` byte ranges and processes
/// each range in its own worker thread, writing the per-shard `.ms.tmp`
/// and `.ss.tmp` files under `out_prefix`. Gzipped patterns cannot be
/// split and are processed by a single worker. After the workers join,
/// the per-shard aggregation tables are merged and written to
/// `out_prefix + ".sss"`.
///
/// Returns the number of shards that were written.
pub fn run_patterns(
    index: &MsIndex,
    patterns: &Path,
    out_prefix: &str,
    n_threads: usize,
) -> Result<usize, Error> {
    let gzipped = fastx::is_gzipped(patterns)?;
    let n_shards = if gzipped {
        if n_threads > 1 {
            info!("The input is gzipped - forcing single threaded matching statistics");
        }
        1
    } else {
        n_threads.max(1)
    };

    let tables: Vec<SsMap> = if gzipped {
        let conn = File::open(patterns).map_err(|e| Error::io(e, patterns))?;
        let reader = FastxReader::new(BufReader::new(MultiGzDecoder::new(conn)), 0);
        vec![process_shard(
            index,
            reader,
            u64::MAX,
            &ms_tmp_file(out_prefix, 0),
            &ss_tmp_file(out_prefix, 0),
        )?]
    } else {
        let starts = fastx::split_fastq(patterns, n_shards)?;
        thread::scope(|scope| {
            let workers: Vec<_> = (0..n_shards)
                .map(|shard| {
                    let starts = &starts;
                    let ms_file = ms_tmp_file(out_prefix, shard);
                    let ss_file = ss_tmp_file(out_prefix, shard);
                    scope.spawn(move || -> Result<SsMap, Error> {
                        let mut conn = File::open(patterns).map_err(|e| Error::io(e, patterns))?;
                        conn.seek(SeekFrom::Start(starts[shard]))
                            .map_err(|e| Error::io(e, patterns))?;
                        let reader = FastxReader::new(BufReader::new(conn), starts[shard]);
                        process_shard(index, reader, starts[shard + 1], &ms_file, &ss_file)
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().expect("worker thread panicked"))
                .collect::<Result<Vec<SsMap>, Error>>()
        })?
    };

    let merged = merge_tables(tables);
    let sss_file = format!("{}.sss", out_prefix);
    let conn = File::create(&sss_file).map_err(|e| Error::io(e, &sss_file))?;
    let mut out = BufWriter::new(conn);
    format::write_sss_table(&mut out, &merged).map_err(|e| Error::io(e, &sss_file))?;
    out.flush().map_err(|e| Error::io(e, &sss_file))?;

    Ok(n_shards)
}

// One worker: iterate the records whose header starts before `end`,
// run the kernel, and stream the results to the shard's output files.
fn process_shard<R: BufRead>(
    index: &MsIndex,
    mut reader: FastxReader<R>,
    end: u64,
    ms_file: &str,
    ss_file: &str,
) -> Result<SsMap, Error> {
    let mut ms_out =
        BufWriter::new(File::create(ms_file).map_err(|e| Error::io(e, ms_file))?);
    let mut ss_out =
        BufWriter::new(File::create(ss_file).map_err(|e| Error::io(e, ss_file))?);
    let mut table = SsMap::new();

    while let Some((start, record)) = reader.next_record()? {
        if start >= end {
            break;
        }

        let pointers = index.pointers_query(&record.seq);
        let (lengths, longest_mem) = ms::matching_statistics(&record.seq, &pointers, index);
        let found = ms::sample_specific_strings(&record.seq, &pointers, &lengths);
        debug!("{} {}", String::from_utf8_lossy(&record.name), found.len());

        format::write_ms_record(&mut ms_out, &pointers, &lengths)
            .map_err(|e| Error::io(e, ms_file))?;
        format::write_ss_record(&mut ss_out, &record.name, &longest_mem, &found)
            .map_err(|e| Error::io(e, ss_file))?;
        ms::aggregate(&mut table, &found);
    }

    ms_out.flush().map_err(|e| Error::io(e, ms_file))?;
    ss_out.flush().map_err(|e| Error::io(e, ss_file))?;
    Ok(table)
}

/// Folds the per-shard aggregation tables into one table.
///
/// Counts add up and reference position sets union, so the result does
/// not depend on how the reads were partitioned into shards.
pub fn merge_tables(tables: Vec<SsMap>) -> BTreeMap<Vec<u8>, SsOccurrences> {
    let mut merged: BTreeMap<Vec<u8>, SsOccurrences> = BTreeMap::new();
    for table in tables {
        for (seq, occurrences) in table {
            let entry = merged.entry(seq).or_default();
            entry.count += occurrences.count;
            entry.ref_positions.extend(occurrences.ref_positions);
        }
    }
    merged
}

/// Decodes every shard's `.ms.tmp` file in shard order and prints the
/// matching statistics as text.
///
/// Writes `out_prefix + ".pointers"` and `out_prefix + ".lengths"` with
/// one `>{seq_index}` header per read followed by the space-separated
/// values; `seq_index` counts reads across all shards.
pub fn write_plain_output(out_prefix: &str, n_shards: usize) -> Result<(), Error> {
    let pointers_file = format!("{}.pointers", out_prefix);
    let lengths_file = format!("{}.lengths", out_prefix);
    let mut pointers_out = BufWriter::new(
        File::create(&pointers_file).map_err(|e| Error::io(e, &pointers_file))?,
    );
    let mut lengths_out =
        BufWriter::new(File::create(&lengths_file).map_err(|e| Error::io(e, &lengths_file))?);

    let mut n_seq: u64 = 0;
    let mut pointers: Vec<u64> = Vec::new();
    let mut lengths: Vec<u64> = Vec::new();
    for shard in 0..n_shards {
        let tmp_file = ms_tmp_file(out_prefix, shard);
        let conn = File::open(&tmp_file).map_err(|e| Error::io(e, &tmp_file))?;
        let mut input = BufReader::new(conn);

        while format::read_ms_record(&mut input, &mut pointers, &mut lengths)
            .map_err(|e| Error::io(e, &tmp_file))?
            .is_some()
        {
            write_values(&mut pointers_out, n_seq, &pointers)
                .map_err(|e| Error::io(e, &pointers_file))?;
            write_values(&mut lengths_out, n_seq, &lengths)
                .map_err(|e| Error::io(e, &lengths_file))?;
            n_seq += 1;
        }
    }

    pointers_out
        .flush()
        .map_err(|e| Error::io(e, &pointers_file))?;
    lengths_out.flush().map_err(|e| Error::io(e, &lengths_file))?;
    Ok(())
}

fn write_values(out: &mut impl Write, n_seq: u64, values: &[u64]) -> std::io::Result<()> {
    writeln!(out, ">{}", n_seq)?;
    for value in values {
        write!(out, "{} ", value)?;
    }
    writeln!(out)?;
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// Tests
//
#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::merge_tables;
    use crate::ms::{SsMap, SsOccurrences};

    fn table(entries: &[(&[u8], u64, &[u64])]) -> SsMap {
        let mut out = SsMap::new();
        for (seq, count, positions) in entries {
            out.insert(
                seq.to_vec(),
                SsOccurrences {
                    count: *count,
                    ref_positions: positions.iter().copied().collect::<BTreeSet<u64>>(),
                },
            );
        }
        out
    }

    #[test]
    fn merge_is_partition_invariant() {
        let whole = merge_tables(vec![table(&[
            (b"ACG", 3, &[4, 7]),
            (b"GA", 1, &[2]),
        ])]);

        let split = merge_tables(vec![
            table(&[(b"ACG", 2, &[4])]),
            table(&[(b"ACG", 1, &[4, 7]), (b"GA", 1, &[2])]),
        ]);

        assert_eq!(whole, split);
        assert_eq!(split[&b"ACG".to_vec()].count, 3);
        assert_eq!(
            split[&b"ACG".to_vec()].ref_positions,
            [4, 7].into_iter().collect::<BTreeSet<u64>>()
        );
    }

    #[test]
    fn merge_deduplicates_positions() {
        let merged = merge_tables(vec![
            table(&[(b"ACG", 1, &[4])]),
            table(&[(b"ACG", 1, &[4])]),
        ]);
        let entry = &merged[&b"ACG".to_vec()];
        assert_eq!(entry.count, 2);
        assert_eq!(entry.ref_positions.len(), 1);
    }
}
