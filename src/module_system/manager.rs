// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! ES module manager
//!
//! Public entry point of the crate. One manager owns an engine adapter,
//! a source reader and the per-session module cache, job queue and
//! source-context counter; a mutex around that state serializes
//! concurrent load requests, so at most one root evaluation runs at a
//! time per manager.

use crate::engine::{ModuleEngine, SourceContexts};
use crate::error::{LoaderError, Result};
use crate::module_system::cache::ModuleCache;
use crate::module_system::driver::{Driver, ROOT_BASE};
use crate::module_system::job::{JobQueue, ModuleJob};
use crate::module_system::resolver;
use crate::source::{FsSourceReader, SourceReader};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of a successful root module evaluation
#[derive(Debug, Clone)]
pub struct ModuleEvaluation<V> {
    /// The last evaluation result produced while draining the queue
    ///
    /// What a module body evaluates to is engine-defined; reading an
    /// export off [`namespace`](Self::namespace) is the reliable way to
    /// get a value out of a module.
    pub result: Option<V>,
    /// The root module's namespace object
    pub namespace: V,
}

/// State guarded by the session mutex
struct SessionState<E: ModuleEngine> {
    engine: E,
    cache: ModuleCache<E::Record>,
    queue: JobQueue<E::Record>,
    source_contexts: SourceContexts,
}

/// ES module manager
///
/// Drives an external script engine through the parse → instantiate →
/// evaluate lifecycle of a module graph rooted at one module, and
/// surfaces the evaluation outcome or the first failure.
pub struct EsModuleManager<E: ModuleEngine, S: SourceReader = FsSourceReader> {
    session: Mutex<SessionState<E>>,
    reader: S,
    disposed: AtomicBool,
}

impl<E: ModuleEngine> EsModuleManager<E> {
    /// Create a manager reading module sources from the current directory
    pub fn new(engine: E) -> Self {
        Self::with_reader(engine, FsSourceReader::new())
    }
}

impl<E: ModuleEngine, S: SourceReader> EsModuleManager<E, S> {
    /// Create a manager with a custom source reader
    pub fn with_reader(engine: E, reader: S) -> Self {
        Self {
            session: Mutex::new(SessionState {
                engine,
                cache: ModuleCache::new(),
                queue: JobQueue::new(),
                source_contexts: SourceContexts::new(),
            }),
            reader,
            disposed: AtomicBool::new(false),
        }
    }

    /// Evaluate module code
    ///
    /// `path` locates the module for resolving its relative imports and
    /// for diagnostics; the text itself is taken from `code`.
    pub fn evaluate_code(&self, code: &str, path: &str) -> Result<ModuleEvaluation<E::Value>> {
        if code.trim().is_empty() {
            return Err(LoaderError::invalid_argument("code", "must not be empty or whitespace"));
        }
        if path.trim().is_empty() {
            return Err(LoaderError::invalid_argument("path", "must not be empty or whitespace"));
        }

        self.evaluate_root(Some(code.to_owned()), path)
    }

    /// Evaluate a module file
    pub fn evaluate_file(&self, path: &str) -> Result<ModuleEvaluation<E::Value>> {
        if path.trim().is_empty() {
            return Err(LoaderError::invalid_argument("path", "must not be empty or whitespace"));
        }
        if !self.reader.exists(path) {
            return Err(LoaderError::FileNotFound(path.to_owned()));
        }

        self.evaluate_root(None, path)
    }

    /// Run one root-to-completion load session
    fn evaluate_root(&self, source: Option<String>, path: &str) -> Result<ModuleEvaluation<E::Value>> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(LoaderError::Disposed);
        }

        // Serializes concurrent callers: a second evaluation blocks here
        // until the first session's queue drains and its cache is torn
        // down.
        let mut session = self.session.lock();

        let outcome = Self::run_session(&mut session, &self.reader, source, path);
        Self::teardown(&mut session);

        outcome
    }

    fn run_session(
        session: &mut SessionState<E>,
        reader: &S,
        source: Option<String>,
        path: &str,
    ) -> Result<ModuleEvaluation<E::Value>> {
        let root_url = resolver::resolve(ROOT_BASE, path);
        tracing::debug!(url = %root_url, "module load session started");

        let root = match session.cache.get(&root_url) {
            Some(module) => module.clone(),
            None => {
                let module = session.engine.create_module(None, path, &root_url)?;
                session.engine.retain(&module)?;
                session.cache.insert(root_url.clone(), module.clone());
                module
            }
        };

        session.queue.enqueue(ModuleJob::Parse {
            module: root.clone(),
            source,
            source_url: root_url,
        });

        let result = Driver::new(
            &mut session.cache,
            &mut session.queue,
            reader,
            &mut session.source_contexts,
        )
        .run(&mut session.engine)?;

        if let Some(exception) = session.engine.exception(&root)? {
            let diagnostics = session.engine.diagnostics(&exception)?;
            return Err(LoaderError::Script(diagnostics));
        }

        let namespace = session.engine.module_namespace(&root)?;
        Ok(ModuleEvaluation { result, namespace })
    }

    /// Discard the session's pending jobs and release every record it
    /// holds
    ///
    /// Release failures are swallowed: teardown runs on the error path
    /// too, and a secondary failure must not mask the session's result.
    fn teardown(session: &mut SessionState<E>) {
        session.queue.clear();
        for (url, module) in session.cache.drain() {
            tracing::trace!(url = %url, "releasing module record");
            let _ = session.engine.release(&module);
        }
    }

    /// Tear down the manager
    ///
    /// Idempotent: a second call is a no-op and releases nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut session = self.session.lock();
        Self::teardown(&mut session);
    }
}

impl<E: ModuleEngine, S: SourceReader> Drop for EsModuleManager<E, S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
