// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Engine adapter seam
//!
//! The script engine is an external collaborator: it owns the module
//! records, performs the actual parsing, instantiation and evaluation, and
//! calls back into the host mid-parse to request dependencies. This module
//! defines the traits an engine adapter implements ([`ModuleEngine`]) and
//! the callback surface the loader exposes to it ([`ModuleHost`]).
//!
//! Callbacks are synchronous and re-entrant: the engine invokes them while
//! the driver's own call frame is still on the stack. That is modeled here
//! by passing `&mut dyn ModuleHost` into [`ModuleEngine::parse_source`] and
//! [`ModuleEngine::evaluate`] rather than registering function pointers.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for engine adapter operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// An engine-level operation failure
///
/// Distinct from a script error: this is the adapter reporting that an
/// operation on the engine itself went wrong (invalid handle, out of
/// memory, FFI failure), not that the script under evaluation threw.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    /// Human-readable description of the failure
    pub message: String,
}

impl EngineError {
    /// Create a new engine error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A cookie identifying one parsed script, usable by debuggable contexts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SourceContext(pub u64);

/// Generator of monotonically increasing source contexts
///
/// One per manager; the counter survives across load sessions so a context
/// value is never reused within a manager's lifetime.
#[derive(Debug, Default)]
pub struct SourceContexts {
    next: u64,
}

impl SourceContexts {
    /// Create a generator starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next source context
    pub fn advance(&mut self) -> SourceContext {
        let context = SourceContext(self.next);
        self.next += 1;
        context
    }
}

/// Diagnostic metadata for a script failure
///
/// Extracted from the engine's exception object so the error can outlive
/// the load session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDiagnostics {
    /// The error message
    pub message: String,
    /// Stack trace, when the engine captured one
    pub stack: Option<String>,
    /// Rendering of the thrown value, when it was not an error object
    pub value: Option<String>,
}

impl fmt::Display for ScriptDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(stack) = &self.stack {
            write!(f, "\n{stack}")?;
        }
        Ok(())
    }
}

/// Reclamation strategy for source buffers handed across the engine
/// boundary
///
/// Adapters that copy script text into engine-owned buffers run the
/// finalizer once the engine is done with a buffer. Injected at adapter
/// construction; there is no process-wide default slot.
pub type BufferFinalizer = Arc<dyn Fn(Box<[u8]>) + Send + Sync>;

/// The default finalizer: free the buffer
pub fn default_buffer_finalizer() -> BufferFinalizer {
    Arc::new(|buffer: Box<[u8]>| drop(buffer))
}

/// Host callbacks the engine invokes during module processing
///
/// Implemented by the driver. `fetch_imported_module` is the "import" step
/// before HostResolveImportedModule: the engine has encountered a
/// dependency specifier and needs a module record back, either an existing
/// one or a freshly created one whose parse the host schedules.
/// `notify_module_ready` fires when a module and its whole dependency
/// subtree have finished instantiation and the host may schedule its
/// evaluation.
pub trait ModuleHost<E: ModuleEngine> {
    /// Resolve a dependency specifier to a module record
    ///
    /// `referencing` is the importing module, or `None` for a dynamic
    /// `import()` issued from non-module script code; such requests
    /// resolve against the root base.
    fn fetch_imported_module(
        &mut self,
        engine: &mut E,
        referencing: Option<&E::Record>,
        specifier: &str,
    ) -> EngineResult<E::Record>;

    /// A module's dependency subtree finished instantiation
    ///
    /// When `exception` is `None` the host schedules the module's
    /// evaluation; otherwise the module is terminal and nothing is
    /// scheduled. The return value is ignored by engines, so there is
    /// none.
    fn notify_module_ready(&mut self, engine: &mut E, module: &E::Record, exception: Option<E::Value>);
}

/// Adapter over an external script engine's module API
///
/// `Record` is an opaque reference-counted handle to an engine-resident
/// module record; `Value` is an engine value (exception objects,
/// evaluation results, namespace objects). Every `retain` must be matched
/// by exactly one `release`; a record becomes invalid once its count
/// reaches zero.
pub trait ModuleEngine: Sized {
    /// Opaque handle to an engine-resident module record
    type Record: Clone + fmt::Debug;
    /// An engine value
    type Value: Clone + fmt::Debug;

    /// Initialize a new module record
    ///
    /// `parent` is the referencing module, or `None` for a root module.
    /// The adapter records both the originating `specifier` and the
    /// canonical `url` as host info on the new record. The host must not
    /// create two records for the same canonical URL.
    fn create_module(
        &mut self,
        parent: Option<&Self::Record>,
        specifier: &str,
        url: &str,
    ) -> EngineResult<Self::Record>;

    /// Parse the source for a module record
    ///
    /// The engine may call `host.fetch_imported_module` once per distinct
    /// specifier, and `host.notify_module_ready` for every module whose
    /// subtree completes instantiation, strictly before this returns.
    /// Returns the parse exception, if any; the adapter also records it on
    /// the module.
    fn parse_source(
        &mut self,
        module: &Self::Record,
        source: &str,
        source_context: SourceContext,
        host: &mut dyn ModuleHost<Self>,
    ) -> EngineResult<Option<Self::Value>>;

    /// Execute a module that was notified ready
    ///
    /// A record may be evaluated only once; a second call fails. Dynamic
    /// `import()` encountered during execution reaches the host through
    /// `fetch_imported_module`.
    fn evaluate(
        &mut self,
        module: &Self::Record,
        host: &mut dyn ModuleHost<Self>,
    ) -> EngineResult<Self::Value>;

    /// Get the module's namespace object
    fn module_namespace(&mut self, module: &Self::Record) -> EngineResult<Self::Value>;

    /// Increment the record's reference count, returning the new count
    fn retain(&mut self, module: &Self::Record) -> EngineResult<u32>;

    /// Decrement the record's reference count, returning the new count
    fn release(&mut self, module: &Self::Record) -> EngineResult<u32>;

    /// Canonical URL host info of a record
    fn url(&mut self, module: &Self::Record) -> EngineResult<Option<String>>;

    /// Originating specifier host info of a record
    fn specifier(&mut self, module: &Self::Record) -> EngineResult<Option<String>>;

    /// The record's exception, if one was set
    fn exception(&mut self, module: &Self::Record) -> EngineResult<Option<Self::Value>>;

    /// Mark the record terminal by attaching an exception
    ///
    /// Write-once: the first exception on a record is authoritative.
    fn set_exception(&mut self, module: &Self::Record, exception: Self::Value) -> EngineResult<()>;

    /// Create an error value carrying `message`
    fn create_error(&mut self, message: &str) -> EngineResult<Self::Value>;

    /// Extract diagnostic metadata from an exception value
    fn diagnostics(&mut self, exception: &Self::Value) -> EngineResult<ScriptDiagnostics>;
}
