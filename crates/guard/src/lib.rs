/*
  ____                 __               __   _ __
 / __ \__ _____ ____  / /___ ____ _    / /  (_) /
/ /_/ / // / _ `/ _ \/ __/ // /  ' \  / /__/ / _ \
\___\_\_,_/\_,_/_//_/\__/\_,_/_/_/_/ /____/_/_.__/
    Part of the Quantum OS Project

Copyright 2025 Gavin Kellam

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute,
sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial
portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT
OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
*/

//! # Guard
//! Include-guard naming for C headers. Every header gets a guard derived from
//! its path under the include root, `sys/io.h` becomes `__SYS_IO_H`, and the
//! `#if !defined(..)` / `#define ..` / `#endif // ..` trio is rewritten to
//! use it.

use thiserror::Error;

mod matcher;

pub use matcher::{GuardMatch, find_endif_comment, find_guard};

pub const GUARD_PREFIX: &str = "__";

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum GuardError {
    #[error("Path not begin with base! ('{path}' is not under '{base}')")]
    PathNotUnderBase { path: String, base: String },
}

/// Build a guard from a path relative to the include root.
///
/// Uppercased, every run of characters other than ASCII letters and digits
/// collapses into one `_`.
pub fn guard_from_relative(relative: &str) -> String {
    let mut guard = String::from(GUARD_PREFIX);
    let mut in_separator_run = false;

    for c in relative.to_uppercase().chars() {
        if c.is_ascii_alphanumeric() {
            guard.push(c);
            in_separator_run = false;
        } else if !in_separator_run {
            guard.push('_');
            in_separator_run = true;
        }
    }

    guard
}

/// The guard `path` should carry, given the include root `base`.
pub fn canonical_guard(base: &str, path: &str) -> Result<String, GuardError> {
    let relative = path
        .strip_prefix(base)
        .ok_or_else(|| GuardError::PathNotUnderBase {
            path: path.to_string(),
            base: base.to_string(),
        })?;
    let relative = relative
        .strip_prefix(std::path::is_separator)
        .unwrap_or(relative);

    Ok(guard_from_relative(relative))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// No `#if !defined(..)` guard in the file.
    NotMatched,
    /// The guard already has the right name.
    Unchanged { guard: String },
    Renamed { old: String, new: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardFix {
    pub content: String,
    pub outcome: GuardOutcome,
}

/// Rename the include guard of `content` to `new_guard`.
///
/// Inside the `#if .. #define` region every occurrence of the old name is
/// replaced, then the first `#endif // <old>` comment is rewritten on its
/// own. That comment search is independent of the region, so a header
/// with several such comments only gets the first one updated.
pub fn fix_guard(content: &str, new_guard: &str) -> GuardFix {
    let Some(found) = find_guard(content) else {
        return GuardFix {
            content: content.to_string(),
            outcome: GuardOutcome::NotMatched,
        };
    };

    let old_guard = &content[found.guard.clone()];
    if old_guard == new_guard {
        return GuardFix {
            content: content.to_string(),
            outcome: GuardOutcome::Unchanged {
                guard: old_guard.to_string(),
            },
        };
    }

    let region = &content[found.region.clone()];
    let mut fixed = String::with_capacity(content.len());
    fixed.push_str(&content[..found.region.start]);
    fixed.push_str(&region.replace(old_guard, new_guard));
    fixed.push_str(&content[found.region.end..]);

    if let Some(comment) = find_endif_comment(&fixed, old_guard) {
        fixed.replace_range(comment, &format!("#endif // {}", new_guard));
    }

    GuardFix {
        content: fixed,
        outcome: GuardOutcome::Renamed {
            old: old_guard.to_string(),
            new: new_guard.to_string(),
        },
    }
}
