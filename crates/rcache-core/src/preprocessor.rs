//! The preprocessor lookup tier.
//!
//! Runs the real compiler in `-E` mode and hashes the preprocessed text
//! while parsing `#` linemarkers, which is how the wrapper discovers the
//! headers a compilation actually read. Anything that makes the text
//! untrustworthy (`.incbin`, a failing preprocessor) aborts caching.

use std::fs;
use std::path::{Path, PathBuf};

use rcache_hash::{hash_source, Digest, Hasher};
use tracing::debug;

use crate::compiler::GuessedCompiler;
use crate::context::{is_precompiled_header, Compilation};
use crate::error::Reject;
use crate::paths::{ctime_of, is_absolute, mtime_of, strip_dot_slash};
use crate::{execute, tmpfiles};

/// Compute the result key by preprocessing the input and hashing the
/// output. `extra_args` is appended to the preprocessor command line (used
/// for per-`-arch` passes).
///
/// On success the preprocessed text is left in `ctx.i_tmpfile` for the
/// compile step, and the preprocessor's stderr is retained in
/// `ctx.cpp_stderr` when the compiler will consume the preprocessed text.
pub fn result_key_from_cpp(
    ctx: &mut Compilation<'_>,
    hasher: &mut Hasher,
    extra_args: &[String],
) -> Result<Digest, Reject> {
    let input = ctx.intent.input_file.clone();

    let (path_stdout, path_stderr) = if ctx.intent.direct_i_file {
        // Already-preprocessed input: skip the cpp stage entirely.
        (PathBuf::from(&input), None)
    } else {
        // Keep the stem short; some filesystems have tight name limits.
        let base = crate::compiler::basename(&input);
        let mut stem: String = base.split('.').next().unwrap_or(base).to_string();
        stem.truncate(10);

        let path_stdout = ctx.tmp_path(&stem).map_err(Compilation::io_reject)?;
        let path_stderr = ctx.tmp_path("cpp_stderr").map_err(Compilation::io_reject)?;

        let mut argv = ctx.args.preprocessor_args.clone();
        argv.extend(extra_args.iter().cloned());
        argv.push("-E".to_string());
        if ctx.config.keep_comments_cpp {
            argv.push("-C".to_string());
        }
        argv.push(input.clone());

        debug!("running preprocessor");
        tmpfiles::register(&path_stdout);
        tmpfiles::register(&path_stderr);
        let status = execute::execute_to_files(&argv, &path_stdout, &path_stderr, false)
            .map_err(Compilation::io_reject)?;
        if status != 0 {
            debug!(status, "preprocessor failed");
            forward_file_to_stderr(&path_stderr);
            return Err(Reject::PreprocessorFailed(status));
        }
        (path_stdout, Some(path_stderr))
    };

    hasher.delimiter("cpp");
    process_preprocessed_file(ctx, hasher, &path_stdout)?;

    hasher.delimiter("cppstderr");
    if let Some(stderr_path) = &path_stderr {
        hasher
            .update_file(stderr_path)
            .map_err(Compilation::io_reject)?;
    }

    if ctx.intent.direct_i_file {
        ctx.i_tmpfile = Some(PathBuf::from(&input));
    } else {
        // The compiler needs the right extension to pick the language.
        let with_ext = PathBuf::from(format!(
            "{}.{}",
            path_stdout.display(),
            ctx.intent.cpp_extension
        ));
        fs::rename(&path_stdout, &with_ext).map_err(Compilation::io_reject)?;
        tmpfiles::unregister(&path_stdout);
        tmpfiles::register(&with_ext);
        ctx.i_tmpfile = Some(with_ext);
    }

    if let Some(stderr_path) = path_stderr {
        if ctx.modes.run_second_cpp {
            let _ = fs::remove_file(&stderr_path);
            tmpfiles::unregister(&stderr_path);
        } else {
            // The cpp warnings will not be reproduced by the compile over
            // preprocessed text; replay them later and key on that choice.
            ctx.cpp_stderr = Some(stderr_path);
            hasher.delimiter("runsecondcpp");
            hasher.update_str("false");
        }
    }

    Ok(hasher.digest())
}

fn forward_file_to_stderr(path: &Path) {
    if let Ok(content) = fs::read(path) {
        use std::io::Write;
        let _ = std::io::stderr().write_all(&content);
    }
}

/// Hash a preprocessed file while extracting the include paths named by
/// its linemarkers.
#[allow(clippy::too_many_lines)]
fn process_preprocessed_file(
    ctx: &mut Compilation<'_>,
    hasher: &mut Hasher,
    path: &Path,
) -> Result<(), Reject> {
    let data = fs::read(path)
        .map_err(|err| Reject::Io(format!("failed to read {}: {err}", path.display())))?;
    let pump = ctx.guessed == GuessedCompiler::Pump;
    let len = data.len();

    // Bytes in data[pending..q] are waiting to be hashed.
    let mut pending = 0usize;
    let mut q = 0usize;

    // A linemarker needs at least `# 1 "x"` to name an include.
    while q + 7 < len {
        let at_line_start = q == 0 || data[q - 1] == b'\n';
        let is_marker = data[q] == b'#'
            && at_line_start
            && ((data[q + 1] == b' ' && data[q + 2].is_ascii_digit())
                || (data[q + 1] == b'p' && data[q + 2..].starts_with(b"ragma GCC pch_preprocess "))
                || data[q + 1..].starts_with(b"line "));

        if is_marker {
            // GCC 6 linemarker bugs: a stray `# 31 "<command-line>"` line
            // after the regular `# 1`, or `# 32 "<command-line>" 2` in
            // place of it.
            if data[q + 2] == b'3' {
                if data[q..].starts_with(b"# 31 \"<command-line>\"\n") {
                    hasher.update(&data[pending..q]);
                    while q < len && data[q] != b'\n' {
                        q += 1;
                    }
                    q = (q + 1).min(len);
                    pending = q;
                    continue;
                }
                if data[q..].starts_with(b"# 32 \"<command-line>\" 2\n") {
                    hasher.update(&data[pending..q]);
                    hasher.update(b"# 1");
                    q += 4;
                    pending = q;
                    continue;
                }
            }

            while q < len && data[q] != b'"' && data[q] != b'\n' {
                q += 1;
            }
            if q < len && data[q] == b'\n' {
                // Newline before the quotation mark: not a file marker.
                continue;
            }
            q += 1;
            if q >= len {
                return Err(Reject::Io("failed to parse included file path".to_string()));
            }
            // q is at the start of the include path.
            hasher.update(&data[pending..q]);
            let path_start = q;
            while q < len && data[q] != b'"' {
                q += 1;
            }
            // Linemarker flags sit after the closing quote; flag 3 marks a
            // system header.
            let mut system = false;
            let mut r = q + 1;
            while r < len && data[r] != b'\n' {
                if data[r] == b'3' {
                    system = true;
                }
                r += 1;
            }

            let inc_raw = String::from_utf8_lossy(&data[path_start..q]).into_owned();
            if !ctx.has_absolute_include_headers {
                ctx.has_absolute_include_headers = is_absolute(&inc_raw);
            }
            let inc_path = ctx.rel(&inc_raw);

            // With -g, GCC emits the cwd as `# 1 "CWD//"`. When the user
            // opted out of hashing the cwd, leave it out here too.
            let hash_inc_path = ctx.config.hash_dir
                || !(inc_path.starts_with(&ctx.cwd_str) && inc_path.ends_with("//"));
            if hash_inc_path {
                hasher.update(inc_path.as_bytes());
            }

            remember_include_file(ctx, inc_path, hasher, system, false);
            pending = q;
        } else if data[q..q + 7] == *b".incbin" {
            // Inline assembly can pull in a file the wrapper has no way to
            // discover, let alone fingerprint.
            debug!("found unsupported .incbin directive in preprocessed source");
            return Err(Reject::UnsupportedDirective);
        } else if pump && data[q..].starts_with(b"_________") {
            // distcc-pump writes banner lines into standard output.
            while q < len && data[q] != b'\n' {
                q += 1;
            }
            q = (q + 1).min(len);
            pending = q;
        } else {
            q += 1;
        }
    }

    hasher.update(&data[pending..]);

    // Clang does not mention the precompiled header in its preprocessed
    // output; account for it explicitly.
    if let Some(pch) = ctx.intent.included_pch_file.clone() {
        let pch_path = ctx.rel(&pch);
        hasher.update_str(&pch_path);
        remember_include_file(ctx, pch_path, hasher, false, false);
    }

    Ok(())
}

/// Fingerprint one include file and record it for the manifest.
///
/// Any problem (unreadable, non-regular, too new, temporal macro) silently
/// disables the direct tier for this compilation rather than risking a
/// manifest entry that could go stale undetected. The preprocessor key is
/// unaffected: the file's effect is already in the preprocessed text.
pub(crate) fn remember_include_file(
    ctx: &mut Compilation<'_>,
    path: String,
    hasher: &mut Hasher,
    system: bool,
    depend_mode: bool,
) {
    // Typically <built-in> or <command-line>.
    if path.len() >= 2 && path.starts_with('<') && path.ends_with('>') {
        return;
    }
    if path == ctx.intent.input_file {
        return;
    }
    if system && ctx.config.sloppiness.system_headers {
        return;
    }
    if ctx.included_files.contains_key(&path) {
        return;
    }

    let Ok(meta) = fs::metadata(&path) else {
        return disable_direct(ctx, &path, "cannot stat include");
    };
    if meta.is_dir() {
        // Typically $PWD from the CWD// marker.
        return;
    }
    if !meta.is_file() {
        return disable_direct(ctx, &path, "non-regular include file");
    }

    // Clang spells local headers ./header.h.
    let canonical = strip_dot_slash(&path);
    for ignore in &ctx.config.ignore_headers_in_manifest {
        let dir_match = canonical
            .strip_prefix(ignore.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            || (ignore.ends_with('/') && canonical.starts_with(ignore.as_str()));
        if dir_match {
            return;
        }
    }

    // >= is deliberate: with 1-second stat granularity a file written in
    // the same second as the compilation started may be mid-update.
    if !ctx.config.sloppiness.include_file_mtime && mtime_of(&meta) >= ctx.time_of_compilation {
        return disable_direct(ctx, &path, "include file too new");
    }
    if !ctx.config.sloppiness.include_file_ctime && ctime_of(&meta) >= ctx.time_of_compilation {
        return disable_direct(ctx, &path, "include file ctime too new");
    }

    let is_pch = is_precompiled_header(&path);
    let mut pch_digest = None;
    if is_pch {
        if ctx.intent.included_pch_file.is_none() {
            debug!(%path, "detected use of precompiled header");
        }
        let mut file_hasher = Hasher::new();
        if file_hasher.update_file(Path::new(&path)).is_err() {
            return disable_direct(ctx, &path, "failed hashing precompiled header");
        }
        let digest = file_hasher.digest();
        hasher.delimiter("pch_hash");
        hasher.update_str(&digest.to_hex());
        pch_digest = Some(digest);
    }

    if ctx.modes.direct_mode {
        let digest = match pch_digest {
            Some(digest) => digest,
            None => {
                let Ok(content) = fs::read(&path) else {
                    return disable_direct(ctx, &path, "failed reading include");
                };
                let outcome = hash_source(&content, !ctx.config.sloppiness.time_macros);
                if outcome.is_temporal() {
                    return disable_direct(ctx, &path, "temporal macro in include");
                }
                outcome.digest()
            }
        };
        if depend_mode {
            hasher.delimiter("include");
            hasher.update_str(&digest.to_hex());
        }
        ctx.included_files.insert(path, digest);
    }
}

fn disable_direct(ctx: &mut Compilation<'_>, path: &str, why: &str) {
    if ctx.modes.direct_mode {
        debug!(path, why, "disabling direct mode");
        ctx.modes.direct_mode = false;
    }
}
