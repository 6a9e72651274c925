// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # esm-host
//!
//! A host-side ES module loader for external JavaScript engines.
//!
//! The crate resolves module specifiers to canonical URLs, deduplicates
//! module records across the import graph, and drives an engine through
//! the parse → instantiate → evaluate lifecycle of every module in
//! dependency order. The engine itself is a collaborator behind the
//! [`ModuleEngine`] trait; the engine calls back into the loader
//! mid-parse to request dependencies and to signal that a module's
//! subtree is ready to run.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use esm_host::{EsModuleManager, FsSourceReader};
//!
//! let manager = EsModuleManager::with_reader(engine, FsSourceReader::with_root("scripts"));
//! let outcome = manager.evaluate_code(
//!     "import * as geometry from './geometry/geometry.js';\n\
//!      export default new geometry.Square(20).area;",
//!     "/main.js",
//! )?;
//! // Read the value back off the root namespace's `default` export.
//! ```
//!
//! ## Guarantees
//!
//! - Each distinct module is fetched and parsed exactly once, even under
//!   diamond-shaped dependency graphs.
//! - A module is evaluated only after its whole dependency subtree
//!   finished instantiation, and at most once.
//! - A fetch or parse failure anywhere in the graph fails the whole
//!   session; the partially built graph is abandoned, never partially
//!   evaluated further.
//! - Every engine record the loader retains is released exactly once at
//!   session teardown.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod module_system;
pub mod source;

// Re-exports
pub use engine::{
    BufferFinalizer, EngineError, EngineResult, ModuleEngine, ModuleHost, ScriptDiagnostics,
    SourceContext, SourceContexts, default_buffer_finalizer,
};
pub use error::{LoaderError, Result};
pub use module_system::{EsModuleManager, JobQueue, ModuleCache, ModuleEvaluation, ModuleJob};
pub use source::{FsSourceReader, SourceError, SourceReader};

/// Version of the esm-host crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
