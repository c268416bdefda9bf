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
use log::{debug, error};

// Command-line interface
mod cli;

fn init_log(log_max_level: usize) {
    stderrlog::new()
        .module(module_path!())
        .quiet(false)
        .verbosity(log_max_level)
        .timestamp(stderrlog::Timestamp::Off)
        .init()
        .unwrap();
}

fn main() {
    let cli = cli::Cli::parse();
    init_log(2);

    debug!(
        "compatibility options: w={} l={} s={} m={} c={} f={} r={}",
        cli.wsize, cli.min_mem_len, cli.store, cli.memo, cli.csv, cli.is_fasta, cli.rle
    );

    if let Err(e) = samspec::run(&cli.infile, &cli.patterns, cli.shaped_slp, cli.n_threads) {
        error!("{}", e);
        std::process::exit(1);
    }
}
