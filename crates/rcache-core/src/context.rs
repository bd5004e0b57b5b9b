//! Per-compilation state, threaded explicitly through the pipeline.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context as _, Result};
use rcache_hash::Digest;

use crate::args::{CompileIntent, ModeState, ProcessedArgs};
use crate::compiler::GuessedCompiler;
use crate::config::{Config, EnvSnapshot};
use crate::error::Reject;
use crate::paths::make_relative_path;

/// Everything one compilation accumulates between analysis and exit.
pub struct Compilation<'a> {
    pub config: &'a Config,
    pub env: &'a EnvSnapshot,
    /// Canonical working directory.
    pub cwd: PathBuf,
    pub cwd_str: String,
    pub guessed: GuessedCompiler,
    /// Seconds since the epoch when this compilation started; include
    /// files at least this new cannot be trusted (1-second stat
    /// granularity).
    pub time_of_compilation: i64,
    pub modes: ModeState,
    pub intent: CompileIntent,
    pub args: ProcessedArgs,
    /// Include path -> content digest, for the manifest. Idempotent by key.
    pub included_files: HashMap<String, Digest>,
    /// Whether any absolute include survived relativization; decides
    /// whether the dependency file needs rewriting afterwards.
    pub has_absolute_include_headers: bool,
    /// Direct hashing found `__TIME__`/`__DATE__`; nothing may be stored.
    pub temporal_macro_seen: bool,
    /// Preprocessed source retained for the compile step when the second
    /// preprocessor pass is disabled.
    pub i_tmpfile: Option<PathBuf>,
    /// Preprocessor stderr retained for replay before the compiler's own.
    pub cpp_stderr: Option<PathBuf>,
}

static TMP_SEQ: AtomicU32 = AtomicU32::new(0);

impl Compilation<'_> {
    pub fn rel(&self, path: &str) -> String {
        make_relative_path(&self.config.base_dir, &self.cwd, path)
    }

    /// A fresh path under the cache's temp directory. The caller registers
    /// it with [`crate::tmpfiles`] once the file exists.
    ///
    /// # Errors
    ///
    /// Returns an error when the temp directory cannot be created.
    pub fn tmp_path(&self, label: &str) -> Result<PathBuf> {
        let dir = &self.config.temporary_dir;
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        Ok(dir.join(format!("tmp.{label}.{}.{seq}", std::process::id())))
    }

    /// Map any error into the fall-through `Reject::Io`.
    pub fn io_reject(err: impl std::fmt::Display) -> Reject {
        Reject::Io(err.to_string())
    }
}

/// Whether a path names a precompiled (or pretokenized) header.
#[must_use]
pub fn is_precompiled_header(path: &str) -> bool {
    let ext = crate::paths::extension_of(path);
    if matches!(ext, ".gch" | ".pch" | ".pth") {
        return true;
    }
    // GCC also accepts a directory named foo.h.gch containing candidates.
    Path::new(path)
        .parent()
        .and_then(|dir| dir.to_str())
        .is_some_and(|dir| dir.ends_with(".gch"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_precompiled_headers() {
        assert!(is_precompiled_header("pre.h.gch"));
        assert!(is_precompiled_header("pre.h.pch"));
        assert!(is_precompiled_header("pre.h.pth"));
        assert!(is_precompiled_header("dir.gch/inner"));
        assert!(!is_precompiled_header("normal.h"));
        assert!(!is_precompiled_header("x.o"));
    }
}
