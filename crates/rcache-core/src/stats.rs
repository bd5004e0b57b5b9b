//! Statistics counters.
//!
//! Each first-level cache directory carries a `stats` file: one decimal
//! counter per line, indexed by [`Counter`]. The indices are an on-disk
//! interface shared with every other wrapper process writing to the same
//! cache, so they are stable; new counters append.
//!
//! Updates are read-modify-write through a temporary sibling plus rename.
//! Two wrappers racing can lose one increment, which is the same tolerance
//! the manifest accepts, and statistics are advisory anyway.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Counter {
    CacheHitDirect = 0,
    CacheHitPreprocessed = 1,
    CacheMiss = 2,
    CalledForLink = 3,
    CalledForPreprocessing = 4,
    MultipleSourceFiles = 5,
    CompilerProducedStdout = 6,
    CompilerProducedNoOutput = 7,
    CompilerProducedEmptyOutput = 8,
    CompileFailed = 9,
    InternalError = 10,
    PreprocessorError = 11,
    CouldNotFindCompiler = 12,
    MissingCacheFile = 13,
    BadCompilerArguments = 14,
    UnsupportedSourceLanguage = 15,
    AutoconfTest = 16,
    UnsupportedCompilerOption = 17,
    UnsupportedCodeDirective = 18,
    OutputToStdout = 19,
    BadOutputFile = 20,
    NoInputFile = 21,
    ErrorHashingExtraFile = 22,
    CouldNotUsePrecompiledHeader = 23,
}

pub const NUM_COUNTERS: usize = 24;

const ALL_COUNTERS: [Counter; NUM_COUNTERS] = [
    Counter::CacheHitDirect,
    Counter::CacheHitPreprocessed,
    Counter::CacheMiss,
    Counter::CalledForLink,
    Counter::CalledForPreprocessing,
    Counter::MultipleSourceFiles,
    Counter::CompilerProducedStdout,
    Counter::CompilerProducedNoOutput,
    Counter::CompilerProducedEmptyOutput,
    Counter::CompileFailed,
    Counter::InternalError,
    Counter::PreprocessorError,
    Counter::CouldNotFindCompiler,
    Counter::MissingCacheFile,
    Counter::BadCompilerArguments,
    Counter::UnsupportedSourceLanguage,
    Counter::AutoconfTest,
    Counter::UnsupportedCompilerOption,
    Counter::UnsupportedCodeDirective,
    Counter::OutputToStdout,
    Counter::BadOutputFile,
    Counter::NoInputFile,
    Counter::ErrorHashingExtraFile,
    Counter::CouldNotUsePrecompiledHeader,
];

impl Counter {
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::CacheHitDirect => "cache hit (direct)",
            Self::CacheHitPreprocessed => "cache hit (preprocessed)",
            Self::CacheMiss => "cache miss",
            Self::CalledForLink => "called for link",
            Self::CalledForPreprocessing => "called for preprocessing",
            Self::MultipleSourceFiles => "multiple source files",
            Self::CompilerProducedStdout => "compiler produced stdout",
            Self::CompilerProducedNoOutput => "compiler produced no output",
            Self::CompilerProducedEmptyOutput => "compiler produced empty output",
            Self::CompileFailed => "compile failed",
            Self::InternalError => "internal error",
            Self::PreprocessorError => "preprocessor error",
            Self::CouldNotFindCompiler => "couldn't find the compiler",
            Self::MissingCacheFile => "cache file missing",
            Self::BadCompilerArguments => "bad compiler arguments",
            Self::UnsupportedSourceLanguage => "unsupported source language",
            Self::AutoconfTest => "autoconf compile/link",
            Self::UnsupportedCompilerOption => "unsupported compiler option",
            Self::UnsupportedCodeDirective => "unsupported code directive",
            Self::OutputToStdout => "output to stdout",
            Self::BadOutputFile => "could not write to output file",
            Self::NoInputFile => "no input file",
            Self::ErrorHashingExtraFile => "error hashing extra file",
            Self::CouldNotUsePrecompiledHeader => "couldn't use precompiled header",
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

fn read_counters(path: &Path) -> [u64; NUM_COUNTERS] {
    let mut counters = [0u64; NUM_COUNTERS];
    if let Ok(content) = fs::read_to_string(path) {
        for (slot, line) in counters.iter_mut().zip(content.lines()) {
            *slot = line.trim().parse().unwrap_or(0);
        }
    }
    counters
}

fn write_counters(path: &Path, counters: &[u64; NUM_COUNTERS]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut body = String::with_capacity(NUM_COUNTERS * 8);
    for value in counters {
        body.push_str(&value.to_string());
        body.push('\n');
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, body).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename {} into place", tmp.display()))?;
    Ok(())
}

/// Bump one counter in the stats file, creating it if needed.
pub fn bump(stats_file: &Path, counter: Counter) {
    let mut counters = read_counters(stats_file);
    counters[counter as usize] += 1;
    if let Err(err) = write_counters(stats_file, &counters) {
        tracing::warn!(path = %stats_file.display(), %err, "failed to update statistics");
    }
}

/// The stats file covering a result/manifest stored under `<hex0>/`.
#[must_use]
pub fn stats_file_for(cache_dir: &Path, first_hex: char) -> PathBuf {
    cache_dir.join(first_hex.to_string()).join("stats")
}

/// Aggregated counters across all sixteen first-level directories.
#[derive(Debug, Default, Serialize)]
pub struct StatsReport {
    pub counters: Vec<(String, u64)>,
}

impl StatsReport {
    #[must_use]
    pub fn collect(cache_dir: &Path) -> Self {
        let mut total = [0u64; NUM_COUNTERS];
        for hex in "0123456789abcdef".chars() {
            let file = stats_file_for(cache_dir, hex);
            let counters = read_counters(&file);
            for (acc, value) in total.iter_mut().zip(counters) {
                *acc += value;
            }
        }
        Self {
            counters: ALL_COUNTERS
                .iter()
                .map(|c| (c.describe().to_string(), total[*c as usize]))
                .collect(),
        }
    }

    /// Remove every per-directory stats file.
    pub fn zero(cache_dir: &Path) {
        for hex in "0123456789abcdef".chars() {
            let file = stats_file_for(cache_dir, hex);
            let _ = fs::remove_file(file);
        }
    }
}
