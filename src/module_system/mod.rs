// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module resolution and scheduling
//!
//! The pieces that turn one root module into a fully evaluated graph:
//!
//! - [`resolver`]: lexical specifier-to-canonical-URL resolution
//! - [`ModuleCache`]: one record per canonical URL
//! - [`ModuleJob`] / [`JobQueue`]: FIFO parse and evaluate work
//! - the driver loop (crate-private): pumps the queue and fields the
//!   engine's re-entrant callbacks
//! - [`EsModuleManager`]: the public façade owning one session at a time

mod cache;
mod driver;
mod job;
mod manager;
pub mod resolver;

pub use cache::ModuleCache;
pub use job::{JobQueue, ModuleJob};
pub use manager::{EsModuleManager, ModuleEvaluation};
