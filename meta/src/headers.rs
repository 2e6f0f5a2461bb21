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

use anyhow::{Context, anyhow};
use guard::{GuardOutcome, canonical_guard, fix_guard};
use owo_colors::OwoColorize;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::status_println;

const HEADER_EXTENSION: &str = ".h";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GuardFixOptions {
    /// Also report headers whose guard was already right.
    pub verbose: bool,
    /// Drop one trailing '/' from the base path before walking it.
    pub normalize_base: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixSummary {
    pub renamed: usize,
    pub unchanged: usize,
    pub not_matched: usize,
}

impl FixSummary {
    fn record(&mut self, outcome: &GuardOutcome) {
        match outcome {
            GuardOutcome::NotMatched => self.not_matched += 1,
            GuardOutcome::Unchanged { .. } => self.unchanged += 1,
            GuardOutcome::Renamed { .. } => self.renamed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.renamed + self.unchanged + self.not_matched
    }
}

pub fn normalize_base(base: &str, options: GuardFixOptions) -> &str {
    if !options.normalize_base || base.len() <= 1 {
        return base;
    }

    base.strip_suffix('/').unwrap_or(base)
}

/// Fix the guard of one header under `base`.
///
/// The file is always written back, even when its content did not change.
pub fn fix_header_file(
    base: &str,
    path: &Path,
    options: GuardFixOptions,
) -> anyhow::Result<GuardOutcome> {
    let display_path = path.to_string_lossy();
    let new_guard = canonical_guard(base, &display_path)?;

    let content = fs::read_to_string(path)
        .with_context(|| anyhow!("Could not read header '{}'", display_path))?;
    let fix = fix_guard(&content, &new_guard);

    match &fix.outcome {
        GuardOutcome::NotMatched => {
            status_println!("{}: {}", display_path, "Not matched".yellow());
        }
        GuardOutcome::Unchanged { .. } if options.verbose => {
            status_println!("{}: Not changed", display_path);
        }
        GuardOutcome::Unchanged { .. } => {}
        GuardOutcome::Renamed { old, new } => {
            status_println!("{}: {} --> {}", display_path, old, new.green());
        }
    }

    fs::write(path, &fix.content)
        .with_context(|| anyhow!("Could not write header '{}'", display_path))?;

    Ok(fix.outcome)
}

/// Walk `base` children first and fix every `.h` file found.
///
/// A header outside of `base` stops the whole walk, a header without a
/// guard does not.
pub fn fix_headers(base: &str, options: GuardFixOptions) -> anyhow::Result<FixSummary> {
    let base = normalize_base(base, options);
    let mut summary = FixSummary::default();

    for entry in WalkDir::new(base).contents_first(true) {
        let entry = entry.context(anyhow!("Could not open DirEntry"))?;

        if entry.file_type().is_dir()
            || !entry.file_name().to_string_lossy().ends_with(HEADER_EXTENSION)
        {
            continue;
        }

        let outcome = fix_header_file(base, entry.path(), options)?;
        summary.record(&outcome);
    }

    if options.verbose {
        status_println!(
            "{} headers: {} renamed, {} unchanged, {} not matched",
            summary.total(),
            summary.renamed,
            summary.unchanged,
            summary.not_matched
        );
    }

    Ok(summary)
}
