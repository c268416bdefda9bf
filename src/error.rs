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
//! Errors reported while loading the indexes or running queries.
use std::path::PathBuf;

/// Errors that can occur in samspec.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {source} ({})", .path.display())]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("loading {} failed: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },
}

impl Error {
    /// Convenience for wrapping an `io::Error` with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    /// A deserialization failure in one of the index artifacts.
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            source: err,
            path: PathBuf::from("<unknown>"),
        }
    }
}
