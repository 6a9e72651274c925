// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module loader

use crate::engine::{EngineError, ScriptDiagnostics};
use thiserror::Error;

/// Result type for module loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can occur while loading and evaluating a module tree
#[derive(Debug, Error)]
pub enum LoaderError {
    /// An argument to the public surface was invalid; raised before any
    /// engine interaction
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Name of the offending parameter
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The file passed to `evaluate_file` does not exist
    #[error("file '{0}' does not exist")]
    FileNotFound(String),

    /// Source for a module in the graph could not be found; aborts the
    /// whole session
    #[error("module '{0}' was not found")]
    ModuleNotFound(String),

    /// Source for a module in the graph exists but could not be read
    #[error("module '{path}' could not be loaded")]
    ModuleNotLoaded {
        /// Canonical URL of the module
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The engine reported a parse, instantiation or evaluation failure
    #[error("script error: {0}")]
    Script(ScriptDiagnostics),

    /// An engine-level operation failed
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The manager was used after `dispose`
    #[error("module manager has been disposed")]
    Disposed,
}

impl LoaderError {
    /// Create a new argument-validation error
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}
