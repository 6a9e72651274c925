// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Driver loop for one load session
//!
//! Pumps the job queue to completion. Parsing a module may re-entrantly
//! call back into the driver (the engine requests dependencies and signals
//! readiness while the parse call frame is still on the stack); those
//! callbacks only ever append jobs at the tail, and the loop pops each job
//! before processing it, so the queue is never mutated while iterated.

use crate::engine::{EngineResult, ModuleEngine, ModuleHost, SourceContexts};
use crate::error::{LoaderError, Result};
use crate::module_system::cache::ModuleCache;
use crate::module_system::job::{JobQueue, ModuleJob};
use crate::module_system::resolver;
use crate::source::{SourceError, SourceReader};

/// Base that root modules and referencing-module-less dependency requests
/// resolve against
pub(crate) const ROOT_BASE: &str = "/";

/// Pumps one session's job queue, fielding engine callbacks
pub(crate) struct Driver<'s, E: ModuleEngine, S: SourceReader> {
    cache: &'s mut ModuleCache<E::Record>,
    queue: &'s mut JobQueue<E::Record>,
    reader: &'s S,
    source_contexts: &'s mut SourceContexts,
    last_result: Option<E::Value>,
}

impl<'s, E: ModuleEngine, S: SourceReader> Driver<'s, E, S> {
    pub(crate) fn new(
        cache: &'s mut ModuleCache<E::Record>,
        queue: &'s mut JobQueue<E::Record>,
        reader: &'s S,
        source_contexts: &'s mut SourceContexts,
    ) -> Self {
        Self {
            cache,
            queue,
            reader,
            source_contexts,
            last_result: None,
        }
    }

    /// Process jobs until the queue drains or a fetch/parse failure
    /// short-circuits the session
    ///
    /// Returns the last evaluation result. On failure the remaining jobs
    /// are abandoned, not processed: a dead module anywhere in the graph
    /// aborts the whole evaluation.
    pub(crate) fn run(&mut self, engine: &mut E) -> Result<Option<E::Value>> {
        while let Some(job) = self.queue.dequeue() {
            match job {
                ModuleJob::Evaluate { module } => {
                    tracing::trace!(module = ?module, "evaluating module");
                    let value = engine.evaluate(&module, self)?;
                    self.last_result = Some(value);
                }
                ModuleJob::Parse {
                    module,
                    source,
                    source_url,
                } => {
                    let source = match source {
                        Some(source) => source,
                        None => self.fetch_source(engine, &module, &source_url)?,
                    };

                    let context = self.source_contexts.advance();
                    tracing::trace!(url = %source_url, context = ?context, "parsing module source");

                    if let Some(exception) = engine.parse_source(&module, &source, context, self)? {
                        let diagnostics = engine.diagnostics(&exception)?;
                        if engine.exception(&module)?.is_none() {
                            engine.set_exception(&module, exception)?;
                        }
                        return Err(LoaderError::Script(diagnostics));
                    }
                }
            }
        }

        Ok(self.last_result.take())
    }

    /// Fetch source text for a parse job that carries none
    ///
    /// A failure marks the module's record terminal and aborts the
    /// session.
    fn fetch_source(&mut self, engine: &mut E, module: &E::Record, source_url: &str) -> Result<String> {
        self.reader.read_text(source_url).map_err(|error| {
            if let Ok(value) = engine.create_error(&error.to_string()) {
                let _ = engine.set_exception(module, value);
            }
            match error {
                SourceError::NotFound(_) => LoaderError::ModuleNotFound(source_url.to_owned()),
                SourceError::Io { source, .. } => LoaderError::ModuleNotLoaded {
                    path: source_url.to_owned(),
                    source,
                },
            }
        })
    }
}

impl<E: ModuleEngine, S: SourceReader> ModuleHost<E> for Driver<'_, E, S> {
    fn fetch_imported_module(
        &mut self,
        engine: &mut E,
        referencing: Option<&E::Record>,
        specifier: &str,
    ) -> EngineResult<E::Record> {
        let base = match referencing {
            Some(module) => engine.url(module)?.unwrap_or_default(),
            None => ROOT_BASE.to_owned(),
        };
        let url = resolver::resolve(&base, specifier);

        let (module, created) = self.cache.get_or_create(&url, || {
            let module = engine.create_module(referencing, specifier, &url)?;
            engine.retain(&module)?;
            Ok(module)
        })?;

        if created {
            tracing::debug!(specifier, url = %url, "module requested, parse scheduled");
            self.queue.enqueue(ModuleJob::Parse {
                module: module.clone(),
                source: None,
                source_url: url,
            });
        } else {
            tracing::trace!(url = %url, "module cache hit");
        }

        Ok(module)
    }

    fn notify_module_ready(&mut self, _engine: &mut E, module: &E::Record, exception: Option<E::Value>) {
        if exception.is_none() {
            self.queue.enqueue(ModuleJob::Evaluate {
                module: module.clone(),
            });
        } else {
            // terminal; the engine propagates the failure to dependents
            tracing::debug!(module = ?module, "module readied with exception, evaluation skipped");
        }
    }
}
