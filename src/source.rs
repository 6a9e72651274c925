// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Source text acquisition
//!
//! The loader never touches storage directly; it asks a [`SourceReader`]
//! for the text behind a canonical URL. [`FsSourceReader`] is the stock
//! filesystem-backed implementation.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while acquiring module source text
#[derive(Debug, Error)]
pub enum SourceError {
    /// No source exists at the location
    #[error("source '{0}' was not found")]
    NotFound(String),

    /// The source exists but could not be read
    #[error("failed to read source '{path}'")]
    Io {
        /// Location that failed to read
        path: String,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },
}

/// Provider of module source text
pub trait SourceReader {
    /// Read the text at `location`
    ///
    /// A missing source is reported as [`SourceError::NotFound`], any
    /// other failure as [`SourceError::Io`]; the loader treats the two
    /// differently when surfacing the session error.
    fn read_text(&self, location: &str) -> std::result::Result<String, SourceError>;

    /// Whether a source exists at `location`
    fn exists(&self, location: &str) -> bool;
}

/// Filesystem-backed source reader
///
/// Canonical URLs are rooted at a base directory: the leading root
/// separator is stripped and the remainder joined onto the base, so
/// `/app/main.js` under base `.` reads `./app/main.js`.
#[derive(Debug, Clone)]
pub struct FsSourceReader {
    root: PathBuf,
}

impl FsSourceReader {
    /// Create a reader rooted at the current directory
    pub fn new() -> Self {
        Self::with_root(".")
    }

    /// Create a reader rooted at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, location: &str) -> PathBuf {
        self.root.join(location.trim_start_matches('/'))
    }
}

impl Default for FsSourceReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceReader for FsSourceReader {
    fn read_text(&self, location: &str) -> std::result::Result<String, SourceError> {
        let path = self.locate(location);
        std::fs::read_to_string(&path).map_err(|error| match error.kind() {
            io::ErrorKind::NotFound => SourceError::NotFound(location.to_owned()),
            _ => SourceError::Io {
                path: location.to_owned(),
                source: error,
            },
        })
    }

    fn exists(&self, location: &str) -> bool {
        self.locate(location).is_file()
    }
}
