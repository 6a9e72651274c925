// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution
//!
//! Purely lexical: specifiers are resolved against the referencing
//! module's canonical URL without consulting the filesystem, so the same
//! inputs always produce the same canonical URL. Canonical URLs are the
//! module cache keys, which makes [`normalize`] idempotence a hard
//! contract.

use regex::Regex;
use std::sync::LazyLock;

/// Matches a URI scheme or a drive letter, e.g. `file:` or `C:`
static SCHEME_OR_DRIVE_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]+:").unwrap());

/// Normalize a path
///
/// Splits on `/` and `\`, drops `.` segments, folds `..` against the
/// preceding segment and rejoins with `/`. A `..` that cannot be resolved
/// (nothing before it, or only another `..`) is preserved rather than
/// rejected. Empty segments are kept as-is, which is what preserves a
/// leading root separator. Not filesystem-aware.
pub fn normalize(path: &str) -> String {
    if path.trim().is_empty() {
        return path.to_owned();
    }

    let mut result: Vec<&str> = Vec::new();

    for segment in path.split(['/', '\\']) {
        match segment {
            "." => {}
            ".." => match result.last() {
                None | Some(&"..") => result.push(segment),
                Some(_) => {
                    result.pop();
                }
            },
            _ => result.push(segment),
        }
    }

    result.join("/")
}

/// Whether `path` is absolute: a leading separator, or a scheme/drive
/// letter prefix
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('\\') || SCHEME_OR_DRIVE_LETTER.is_match(path)
}

/// Resolve a specifier against the referencing module's canonical URL
///
/// Absolute specifiers and specifiers with a blank base are normalized
/// as-is; anything else is joined onto the directory portion of `base`
/// first.
pub fn resolve(base: &str, specifier: &str) -> String {
    if base.trim().is_empty() || is_absolute(specifier) {
        return normalize(specifier);
    }

    normalize(&format!("{}/{}", directory_of(base), specifier))
}

/// The text before the last separator; empty when there is none
fn directory_of(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(index) => &path[..index],
        None => "",
    }
}
