// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Test doubles for the loader: a fake script engine speaking the module
//! protocol, and an in-memory source reader.
//!
//! The fake engine understands just enough module syntax (scanned with
//! regexes, like a very small cousin of a real parser) to exercise the
//! loader: static `import ... from` declarations, dynamic `import()`
//! calls, `export default` of a literal or an imported binding, and
//! `export let name = <number>`. Any source containing the phrase
//! `syntax error` fails to parse; a top-level `throw new Error('...')`
//! throws during evaluation.

#![allow(dead_code)]

use esm_host::{
    BufferFinalizer, EngineError, EngineResult, EsModuleManager, ModuleEngine, ModuleHost,
    ScriptDiagnostics, SourceContext, SourceError, SourceReader, default_buffer_finalizer,
};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

static DEFAULT_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"import\s+(\w+)\s+from\s+['"]([^'"]+)['"]"#).unwrap());
static NAMESPACE_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"import\s*\*\s*as\s+(\w+)\s+from\s+['"]([^'"]+)['"]"#).unwrap());
static BARE_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"import\s+['"]([^'"]+)['"]"#).unwrap());
static DYNAMIC_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"import\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static DEFAULT_EXPORT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s+default\s+([0-9]+(?:\.[0-9]+)?)\s*;").unwrap());
static DEFAULT_EXPORT_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s+default\s+'([^']*)'\s*;").unwrap());
static DEFAULT_EXPORT_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s+default\s+([A-Za-z_]\w*)\s*;").unwrap());
static NAMED_EXPORT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s+let\s+(\w+)\s*=\s*([0-9]+(?:\.[0-9]+)?)\s*;").unwrap());
static THROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"throw\s+new\s+Error\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

/// A value in the fake engine
#[derive(Debug, Clone, PartialEq)]
pub enum FakeValue {
    Undefined,
    Number(f64),
    Str(String),
    Error(String),
    Namespace(HashMap<String, FakeValue>),
}

impl FakeValue {
    /// Read a property off a namespace value
    pub fn property(&self, name: &str) -> FakeValue {
        match self {
            FakeValue::Namespace(properties) => {
                properties.get(name).cloned().unwrap_or(FakeValue::Undefined)
            }
            _ => FakeValue::Undefined,
        }
    }
}

/// Opaque handle to a fake module record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeRecord(usize);

/// One entry in the fake engine's event log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Parse(String),
    Ready(String),
    Evaluate(String),
}

/// How an import statement binds its module
enum ImportBinding {
    Default(String),
    Namespace(String),
    None,
}

#[derive(Debug, Default)]
struct RecordState {
    specifier: String,
    url: String,
    refcount: i32,
    exception: Option<FakeValue>,
    source: Option<String>,
    deps: Vec<usize>,
    dependents: Vec<usize>,
    default_bindings: Vec<(String, usize)>,
    parsed: bool,
    instantiated: bool,
    evaluated: bool,
    namespace: HashMap<String, FakeValue>,
}

#[derive(Debug, Default)]
struct EngineState {
    records: Vec<RecordState>,
    events: Vec<EngineEvent>,
    contexts: Vec<SourceContext>,
}

/// Fake script engine
///
/// Clone the engine before handing it to a manager to keep an inspection
/// probe: all clones share one state.
#[derive(Clone)]
pub struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
    finalizer: BufferFinalizer,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::with_finalizer(default_buffer_finalizer())
    }

    pub fn with_finalizer(finalizer: BufferFinalizer) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState::default())),
            finalizer,
        }
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.state.lock().events.clone()
    }

    /// URLs in the order their evaluate calls happened
    pub fn evaluation_order(&self) -> Vec<String> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Evaluate(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn parse_count(&self, url: &str) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|event| matches!(event, EngineEvent::Parse(parsed) if parsed == url))
            .count()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn records_with_url(&self, url: &str) -> usize {
        self.state
            .lock()
            .records
            .iter()
            .filter(|record| record.url == url)
            .count()
    }

    pub fn refcounts(&self) -> Vec<i32> {
        self.state.lock().records.iter().map(|record| record.refcount).collect()
    }

    pub fn source_contexts(&self) -> Vec<SourceContext> {
        self.state.lock().contexts.clone()
    }

    pub fn is_evaluated(&self, url: &str) -> bool {
        self.state
            .lock()
            .records
            .iter()
            .any(|record| record.url == url && record.evaluated)
    }

    pub fn stored_specifier(&self, url: &str) -> Option<String> {
        self.state
            .lock()
            .records
            .iter()
            .find(|record| record.url == url)
            .map(|record| record.specifier.clone())
    }

    /// Static and bare imports in source order
    fn scan_imports(source: &str) -> Vec<(ImportBinding, String)> {
        let mut imports: Vec<(usize, ImportBinding, String)> = Vec::new();

        for capture in NAMESPACE_IMPORT.captures_iter(source) {
            let m = capture.get(0).unwrap();
            imports.push((
                m.start(),
                ImportBinding::Namespace(capture[1].to_string()),
                capture[2].to_string(),
            ));
        }
        for capture in DEFAULT_IMPORT.captures_iter(source) {
            let m = capture.get(0).unwrap();
            imports.push((
                m.start(),
                ImportBinding::Default(capture[1].to_string()),
                capture[2].to_string(),
            ));
        }
        for capture in BARE_IMPORT.captures_iter(source) {
            let m = capture.get(0).unwrap();
            imports.push((m.start(), ImportBinding::None, capture[1].to_string()));
        }

        imports.sort_by_key(|(offset, _, _)| *offset);
        imports
            .into_iter()
            .map(|(_, binding, specifier)| (binding, specifier))
            .collect()
    }

    /// Notify every module whose dependency subtree is fully instantiated
    fn drive_instantiation(&mut self, host: &mut dyn ModuleHost<Self>) -> EngineResult<()> {
        loop {
            let next = {
                let state = self.state.lock();
                state.records.iter().position(|record| {
                    record.parsed
                        && !record.instantiated
                        && record.exception.is_none()
                        && record.deps.iter().all(|&dep| state.records[dep].instantiated)
                })
            };

            let Some(index) = next else {
                return Ok(());
            };

            let exception = {
                let mut state = self.state.lock();
                let state = &mut *state;
                state.records[index].instantiated = true;
                let url = state.records[index].url.clone();
                state.events.push(EngineEvent::Ready(url));
                state.records[index].exception.clone()
            };
            host.notify_module_ready(self, &FakeRecord(index), exception);
        }
    }

    /// Run a module body's exports, producing its namespace
    fn execute_exports(&self, index: usize, source: &str) -> FakeValue {
        let mut namespace: HashMap<String, FakeValue> = HashMap::new();

        if let Some(capture) = DEFAULT_EXPORT_NUMBER.captures(source) {
            namespace.insert("default".to_string(), FakeValue::Number(capture[1].parse().unwrap()));
        } else if let Some(capture) = DEFAULT_EXPORT_STRING.captures(source) {
            namespace.insert("default".to_string(), FakeValue::Str(capture[1].to_string()));
        } else if let Some(capture) = DEFAULT_EXPORT_IDENT.captures(source) {
            let name = capture[1].to_string();
            let state = self.state.lock();
            let value = state.records[index]
                .default_bindings
                .iter()
                .find(|(binding, _)| *binding == name)
                .and_then(|(_, dep)| state.records[*dep].namespace.get("default").cloned())
                .unwrap_or(FakeValue::Undefined);
            drop(state);
            namespace.insert("default".to_string(), value);
        }

        for capture in NAMED_EXPORT_NUMBER.captures_iter(source) {
            namespace.insert(capture[1].to_string(), FakeValue::Number(capture[2].parse().unwrap()));
        }

        let result = namespace.get("default").cloned().unwrap_or(FakeValue::Undefined);
        self.state.lock().records[index].namespace = namespace;
        result
    }

    /// Attach an exception to a record and all its transitive dependents,
    /// first writer wins
    fn poison(&self, start: usize, exception: &FakeValue) {
        let mut state = self.state.lock();
        let mut seen = vec![false; state.records.len()];
        let mut pending = vec![start];

        while let Some(index) = pending.pop() {
            if seen[index] {
                continue;
            }
            seen[index] = true;
            if state.records[index].exception.is_none() {
                state.records[index].exception = Some(exception.clone());
            }
            let dependents = state.records[index].dependents.clone();
            pending.extend(dependents);
        }
    }
}

impl ModuleEngine for FakeEngine {
    type Record = FakeRecord;
    type Value = FakeValue;

    fn create_module(
        &mut self,
        _parent: Option<&FakeRecord>,
        specifier: &str,
        url: &str,
    ) -> EngineResult<FakeRecord> {
        let mut state = self.state.lock();
        let index = state.records.len();
        state.records.push(RecordState {
            specifier: specifier.to_owned(),
            url: url.to_owned(),
            ..RecordState::default()
        });
        Ok(FakeRecord(index))
    }

    fn parse_source(
        &mut self,
        module: &FakeRecord,
        source: &str,
        source_context: SourceContext,
        host: &mut dyn ModuleHost<Self>,
    ) -> EngineResult<Option<FakeValue>> {
        {
            let mut state = self.state.lock();
            let state = &mut *state;
            state.contexts.push(source_context);
            state.records[module.0].source = Some(source.to_owned());
            let url = state.records[module.0].url.clone();
            state.events.push(EngineEvent::Parse(url));
        }

        // A real adapter copies the text into an engine-owned buffer and
        // reclaims its own copy through the configured strategy.
        (*self.finalizer)(source.as_bytes().to_vec().into_boxed_slice());

        if source.contains("syntax error") {
            let exception = FakeValue::Error("SyntaxError: unexpected token".to_string());
            let mut state = self.state.lock();
            if state.records[module.0].exception.is_none() {
                state.records[module.0].exception = Some(exception.clone());
            }
            return Ok(Some(exception));
        }

        for (binding, specifier) in Self::scan_imports(source) {
            let dep = host.fetch_imported_module(self, Some(module), &specifier)?;

            let mut state = self.state.lock();
            {
                let record = &mut state.records[module.0];
                if !record.deps.contains(&dep.0) {
                    record.deps.push(dep.0);
                }
                match binding {
                    ImportBinding::Default(name) => record.default_bindings.push((name, dep.0)),
                    ImportBinding::Namespace(_) | ImportBinding::None => {}
                }
            }
            if !state.records[dep.0].dependents.contains(&module.0) {
                state.records[dep.0].dependents.push(module.0);
            }
        }

        self.state.lock().records[module.0].parsed = true;
        self.drive_instantiation(host)?;

        Ok(None)
    }

    fn evaluate(
        &mut self,
        module: &FakeRecord,
        host: &mut dyn ModuleHost<Self>,
    ) -> EngineResult<FakeValue> {
        let (source, exception) = {
            let mut state = self.state.lock();
            let state = &mut *state;
            let record = &mut state.records[module.0];
            if !record.instantiated {
                return Err(EngineError::new(format!(
                    "module '{}' evaluated before it was ready",
                    record.url
                )));
            }
            if record.evaluated {
                return Err(EngineError::new(format!(
                    "module '{}' has already been evaluated",
                    record.url
                )));
            }
            record.evaluated = true;
            let url = record.url.clone();
            let source = record.source.clone().unwrap_or_default();
            let exception = record.exception.clone();
            state.events.push(EngineEvent::Evaluate(url));
            (source, exception)
        };

        if exception.is_some() {
            return Ok(FakeValue::Undefined);
        }

        for capture in DYNAMIC_IMPORT.captures_iter(&source) {
            let specifier = capture[1].to_string();
            host.fetch_imported_module(self, Some(module), &specifier)?;
        }

        if let Some(capture) = THROW.captures(&source) {
            let thrown = FakeValue::Error(format!("Error: {}", &capture[1]));
            self.poison(module.0, &thrown);
            return Ok(FakeValue::Undefined);
        }

        Ok(self.execute_exports(module.0, &source))
    }

    fn module_namespace(&mut self, module: &FakeRecord) -> EngineResult<FakeValue> {
        let state = self.state.lock();
        Ok(FakeValue::Namespace(state.records[module.0].namespace.clone()))
    }

    fn retain(&mut self, module: &FakeRecord) -> EngineResult<u32> {
        let mut state = self.state.lock();
        let record = &mut state.records[module.0];
        record.refcount += 1;
        Ok(record.refcount.max(0) as u32)
    }

    fn release(&mut self, module: &FakeRecord) -> EngineResult<u32> {
        let mut state = self.state.lock();
        let record = &mut state.records[module.0];
        record.refcount -= 1;
        Ok(record.refcount.max(0) as u32)
    }

    fn url(&mut self, module: &FakeRecord) -> EngineResult<Option<String>> {
        Ok(Some(self.state.lock().records[module.0].url.clone()))
    }

    fn specifier(&mut self, module: &FakeRecord) -> EngineResult<Option<String>> {
        Ok(Some(self.state.lock().records[module.0].specifier.clone()))
    }

    fn exception(&mut self, module: &FakeRecord) -> EngineResult<Option<FakeValue>> {
        Ok(self.state.lock().records[module.0].exception.clone())
    }

    fn set_exception(&mut self, module: &FakeRecord, exception: FakeValue) -> EngineResult<()> {
        let mut state = self.state.lock();
        let record = &mut state.records[module.0];
        if record.exception.is_none() {
            record.exception = Some(exception);
        }
        Ok(())
    }

    fn create_error(&mut self, message: &str) -> EngineResult<FakeValue> {
        Ok(FakeValue::Error(message.to_owned()))
    }

    fn diagnostics(&mut self, exception: &FakeValue) -> EngineResult<ScriptDiagnostics> {
        Ok(match exception {
            FakeValue::Error(message) => ScriptDiagnostics {
                message: message.clone(),
                stack: Some(format!("{message}\n    at <module>")),
                value: None,
            },
            other => ScriptDiagnostics {
                message: "uncaught value".to_string(),
                stack: None,
                value: Some(format!("{other:?}")),
            },
        })
    }
}

/// In-memory source reader keyed by canonical URL
#[derive(Debug, Default)]
pub struct MemorySourceReader {
    sources: HashMap<String, String>,
}

impl MemorySourceReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, source: &str) {
        self.sources.insert(url.to_owned(), source.to_owned());
    }
}

impl SourceReader for MemorySourceReader {
    fn read_text(&self, location: &str) -> Result<String, SourceError> {
        self.sources
            .get(location)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(location.to_owned()))
    }

    fn exists(&self, location: &str) -> bool {
        self.sources.contains_key(location)
    }
}

/// A manager over the fake engine plus an inspection probe into it
pub fn manager_with_sources(
    sources: &[(&str, &str)],
) -> (EsModuleManager<FakeEngine, MemorySourceReader>, FakeEngine) {
    let engine = FakeEngine::new();
    let probe = engine.clone();

    let mut reader = MemorySourceReader::new();
    for (url, source) in sources {
        reader.insert(url, source);
    }

    (EsModuleManager::with_reader(engine, reader), probe)
}
