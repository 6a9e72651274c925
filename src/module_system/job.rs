// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module jobs and the job queue

use std::collections::VecDeque;

/// A unit of pending module work
///
/// Immutable once enqueued.
#[derive(Debug, Clone)]
pub enum ModuleJob<R> {
    /// Parse the module's source
    Parse {
        /// The record to parse into
        module: R,
        /// Source text, or `None` when it still has to be fetched from
        /// the job's location
        source: Option<String>,
        /// Canonical URL the source comes from
        source_url: String,
    },
    /// Execute a module whose subtree finished instantiation
    Evaluate {
        /// The record to evaluate
        module: R,
    },
}

/// Strictly ordered queue of module jobs
///
/// FIFO: insertion order is processing order. The driver pops a job
/// before processing it, so callbacks that enqueue new jobs mid-step
/// never mutate a queue that is being iterated.
#[derive(Debug)]
pub struct JobQueue<R> {
    jobs: VecDeque<ModuleJob<R>>,
}

impl<R> JobQueue<R> {
    /// Create a new empty queue
    pub fn new() -> Self {
        Self {
            jobs: VecDeque::new(),
        }
    }

    /// Add a job at the tail
    pub fn enqueue(&mut self, job: ModuleJob<R>) {
        self.jobs.push_back(job);
    }

    /// Remove and return the head job
    pub fn dequeue(&mut self) -> Option<ModuleJob<R>> {
        self.jobs.pop_front()
    }

    /// Number of pending jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Drop all pending jobs
    pub fn clear(&mut self) {
        self.jobs.clear();
    }
}

impl<R> Default for JobQueue<R> {
    fn default() -> Self {
        Self::new()
    }
}
