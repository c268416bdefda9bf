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
use clap::Parser;

/// Compute matching statistics and sample-specific strings for a set of
/// reads against a prebuilt index.
#[derive(Parser)]
#[command(version)]
pub struct Cli {
    /// Base name of the serialized index files
    pub infile: String,

    /// Path to the patterns fasta or fastq file
    #[arg(short = 'p', long = "patterns", required = true)]
    pub patterns: String,

    /// Number of worker threads
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    pub n_threads: usize,

    /// Load the shaped SLP variant of the random access index
    #[arg(short = 'q', long = "shaped-slp", default_value_t = false)]
    pub shaped_slp: bool,

    // Construction front end options, accepted for compatibility but
    // not consumed by the queries.
    /// Sliding window size used during construction (unused)
    #[arg(short = 'w', long = "wsize", default_value_t = 10)]
    pub wsize: usize,

    /// Minimum MEM length (unused)
    #[arg(short = 'l', long = "len", default_value_t = 25)]
    pub min_mem_len: usize,

    /// Store the data structures (unused)
    #[arg(short = 's', long = "store", default_value_t = false)]
    pub store: bool,

    /// Print the memory usage (unused)
    #[arg(short = 'm', long = "memo", default_value_t = false)]
    pub memo: bool,

    /// Print the stats in csv form on stderr (unused)
    #[arg(short = 'c', long = "csv", default_value_t = false)]
    pub csv: bool,

    /// The input file is a fasta file (unused)
    #[arg(short = 'f', long = "fasta", default_value_t = false)]
    pub is_fasta: bool,

    /// Output the run length encoded BWT (unused)
    #[arg(short = 'r', long = "rle", default_value_t = false)]
    pub rle: bool,
}
