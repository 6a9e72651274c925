// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module cache keyed by canonical URL

use rustc_hash::FxHashMap;

/// Cache of module records for one load session
///
/// Keys are canonical URLs, so two specifiers that denote the same
/// resource share one entry. All access happens on the session's single
/// logical thread of control; there is no internal locking.
#[derive(Debug)]
pub struct ModuleCache<R> {
    modules: FxHashMap<String, R>,
}

impl<R: Clone> ModuleCache<R> {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            modules: FxHashMap::default(),
        }
    }

    /// Get the cached record for `url`, or create and cache one
    ///
    /// Returns the record and whether it was newly created. The factory
    /// is fallible because it performs engine-side module creation; on
    /// failure nothing is inserted.
    pub fn get_or_create<E>(
        &mut self,
        url: &str,
        factory: impl FnOnce() -> std::result::Result<R, E>,
    ) -> std::result::Result<(R, bool), E> {
        if let Some(module) = self.modules.get(url) {
            return Ok((module.clone(), false));
        }

        let module = factory()?;
        self.modules.insert(url.to_owned(), module.clone());
        Ok((module, true))
    }

    /// Get a cached record by canonical URL
    pub fn get(&self, url: &str) -> Option<&R> {
        self.modules.get(url)
    }

    /// Check if a record is cached
    pub fn contains(&self, url: &str) -> bool {
        self.modules.contains_key(url)
    }

    /// Add a record to the cache
    pub fn insert(&mut self, url: impl Into<String>, module: R) {
        self.modules.insert(url.into(), module);
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Empty the cache, yielding every entry
    ///
    /// Used at session teardown so each record can be released exactly
    /// once.
    pub fn drain(&mut self) -> impl Iterator<Item = (String, R)> + '_ {
        self.modules.drain()
    }

    /// Empty the cache, dropping the entries
    pub fn clear(&mut self) {
        self.modules.clear();
    }
}

impl<R: Clone> Default for ModuleCache<R> {
    fn default() -> Self {
        Self::new()
    }
}
