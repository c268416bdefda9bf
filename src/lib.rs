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
use std::path::Path;
use std::time::Instant;

use log::info;

pub mod error;
pub mod fastx;
pub mod format;
pub mod index;
pub mod map;
pub mod ms;
pub mod slp;

pub use crate::error::Error;

/// Loads the indexes stored at the base name `infile` and computes the
/// matching statistics and sample-specific strings for every read in
/// `patterns`, writing the outputs next to the patterns file.
pub fn run(infile: &str, patterns: &str, shaped_slp: bool, n_threads: usize) -> Result<(), Error> {
    info!("Loading the matching statistics index");
    let now = Instant::now();
    let ms_index = index::MsIndex::load(infile, shaped_slp)?;
    info!(
        "Matching statistics index loading complete ({:.2} s)",
        now.elapsed().as_secs_f64()
    );

    let base_name = Path::new(infile)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| infile.to_string());
    let out_prefix = format!("{}_{}", patterns, base_name);

    info!("Processing patterns");
    let now = Instant::now();
    let n_shards = map::run_patterns(&ms_index, Path::new(patterns), &out_prefix, n_threads)?;
    info!(
        "Pattern processing complete ({:.2} s)",
        now.elapsed().as_secs_f64()
    );

    info!("Printing plain output");
    let now = Instant::now();
    map::write_plain_output(&out_prefix, n_shards)?;
    info!(
        "Plain output complete ({:.2} s)",
        now.elapsed().as_secs_f64()
    );

    Ok(())
}
