//! Depend mode: derive the result key from the compiler-emitted dependency
//! file instead of running the preprocessor.
//!
//! The real compiler has already run by the time this executes; the `.d`
//! file it wrote names every header the compilation consumed. Each one is
//! fingerprinted into the direct hash, which then doubles as the result
//! key.

use std::fs;
use std::path::Path;

use rcache_hash::{Digest, Hasher};
use tracing::debug;

use crate::context::Compilation;
use crate::error::Reject;
use crate::paths::is_absolute;
use crate::preprocessor::remember_include_file;
use crate::tmpfiles;

/// Parse the dependency file and fold every named include into `hasher`,
/// returning the final result key.
///
/// Depfile grammar as emitted by compilers: whitespace-separated tokens,
/// where tokens ending in `:` are targets and lone backslashes are line
/// continuations; everything else is a dependency.
pub fn result_key_from_depfile(
    ctx: &mut Compilation<'_>,
    hasher: &mut Hasher,
) -> Result<Digest, Reject> {
    let depfile = ctx
        .intent
        .output_dep
        .clone()
        .ok_or_else(|| Reject::Io("depend mode without a dependency file".to_string()))?;
    let content = fs::read_to_string(&depfile)
        .map_err(|err| Reject::Io(format!("cannot open dependency file {depfile}: {err}")))?;

    for token in content.split_whitespace() {
        if token.ends_with(':') || token == "\\" {
            continue;
        }
        if !ctx.has_absolute_include_headers {
            ctx.has_absolute_include_headers = is_absolute(token);
        }
        let path = ctx.rel(token);
        remember_include_file(ctx, path, hasher, false, true);
    }

    // The precompiled header may not appear among the dependencies.
    if let Some(pch) = ctx.intent.included_pch_file.clone() {
        let pch_path = ctx.rel(&pch);
        hasher.update_str(&pch_path);
        remember_include_file(ctx, pch_path, hasher, false, false);
    }

    Ok(hasher.digest())
}

/// Rewrite absolute paths under `base_dir` to relative form inside the
/// dependency file, so the `.d` the build system sees matches what a
/// relocated checkout would produce.
pub fn use_relative_paths_in_depfile(ctx: &Compilation<'_>) {
    if ctx.config.base_dir.is_empty() {
        debug!("base dir not set; skip using relative paths");
        return;
    }
    if !ctx.has_absolute_include_headers {
        debug!("no absolute include paths found; skip using relative paths");
        return;
    }
    let Some(depfile) = ctx.intent.output_dep.as_deref() else {
        return;
    };

    let Ok(content) = fs::read_to_string(depfile) else {
        debug!(depfile, "cannot open dependency file");
        return;
    };

    let mut changed = false;
    let mut rewritten = String::with_capacity(content.len());
    for (line_index, line) in content.lines().enumerate() {
        if line_index > 0 {
            rewritten.push('\n');
        }
        let mut first = true;
        for token in line.split_whitespace() {
            if !first {
                rewritten.push(' ');
            }
            first = false;
            if is_absolute(token) && token.starts_with(&ctx.config.base_dir) {
                rewritten.push_str(&ctx.rel(token));
                changed = true;
            } else {
                rewritten.push_str(token);
            }
        }
    }
    if content.ends_with('\n') {
        rewritten.push('\n');
    }

    if !changed {
        debug!(depfile, "no paths to make relative");
        return;
    }

    let tmp = Path::new(depfile).with_extension("d.tmp");
    tmpfiles::register(&tmp);
    if fs::write(&tmp, rewritten).is_err() {
        debug!(depfile, "failed writing temporary dependency file");
        let _ = fs::remove_file(&tmp);
        return;
    }
    if fs::rename(&tmp, depfile).is_err() {
        debug!(depfile, "failed renaming dependency file");
        let _ = fs::remove_file(&tmp);
    }
    tmpfiles::unregister(&tmp);
}
