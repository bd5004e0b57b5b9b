//! The per-invocation driver: direct lookup, preprocessor lookup, real
//! compile with result capture, and the fall-through escape hatch.
//!
//! Flow per invocation:
//!
//! ```text
//! analyze -> common hash -> direct? -> manifest lookup -> hit? serve
//!                        -> depend?  -> compile, key from depfile
//!                        -> else     -> cpp hash -> result lookup -> hit? serve
//!                        -> compile -> capture -> store -> update manifest
//! ```
//!
//! Every rejection takes the same exit: hand the untouched command line to
//! the real compiler. A broken build is never an acceptable price for a
//! cache hit.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use rcache_hash::{Digest, Hasher};
use tracing::debug;

use crate::args::{analyze_arguments, ModeState};
use crate::compiler::{find_compiler, GuessedCompiler};
use crate::config::{Config, EnvSnapshot};
use crate::context::Compilation;
use crate::error::Reject;
use crate::hashing::{self, HashMode};
use crate::result::{cache_object_path, create_cachedir_tag, ResultFiles, STDERR_NAME};
use crate::stats::{self, Counter};
use crate::{depend, execute, manifest, preprocessor, tmpfiles};

/// Entry point for a compilation invocation. `orig_argv[0]` is the
/// compiler as the caller named it.
///
/// Returns the process exit code. On Unix, uncacheable invocations replace
/// the process with the real compiler and do not return.
///
/// # Errors
///
/// Only configuration problems and a missing compiler are fatal; every
/// other obstacle falls through to the real compiler.
pub fn run_compilation(orig_argv: Vec<String>) -> Result<i32> {
    anyhow::ensure!(!orig_argv.is_empty(), "empty command line");
    let env_snapshot = EnvSnapshot::capture();
    let config = Config::from_snapshot(&env_snapshot)?;
    tmpfiles::install_handlers();

    if config.disable {
        debug!("cache is disabled");
        return execute::exec_fallthrough(&orig_argv);
    }

    let mut argv = orig_argv.clone();
    if let Some(compiler) = &config.compiler {
        argv[0] = compiler.clone();
    }
    let compiler_path = match find_compiler(&argv[0]) {
        Ok(path) => path,
        Err(err) => {
            bump_without_key(&config, Counter::CouldNotFindCompiler);
            return Err(err);
        }
    };
    argv[0] = compiler_path.to_string_lossy().into_owned();

    execute::export_uncached_err_fd()?;

    match compile_inner(&config, &env_snapshot, &orig_argv, argv) {
        Ok(code) => {
            tmpfiles::cleanup_pending();
            Ok(code)
        }
        Err(reject) => {
            debug!(%reject, "not caching; running the real compiler");
            bump_without_key(&config, reject.counter());
            tmpfiles::cleanup_pending();
            execute::exec_fallthrough(&orig_argv)
        }
    }
}

#[allow(clippy::too_many_lines)]
fn compile_inner(
    config: &Config,
    env: &EnvSnapshot,
    orig_argv: &[String],
    argv: Vec<String>,
) -> Result<i32, Reject> {
    let guessed = GuessedCompiler::from_path(&argv[0]);
    let cwd = env::current_dir()
        .and_then(|d| d.canonicalize())
        .map_err(|err| Reject::Io(format!("cannot determine working directory: {err}")))?;
    let cwd_str = cwd.to_string_lossy().into_owned();

    let mut modes = ModeState::from_config(config);
    let color = execute::color_output_possible(env.var("TERM"));
    let (args, intent) =
        analyze_arguments(&argv, config, &cwd, guessed, color, env, &mut modes)?;

    if modes.depend_mode
        && (!intent.generating_dependencies
            || intent.output_dep.as_deref() == Some("/dev/null")
            || !modes.run_second_cpp)
    {
        debug!("disabling depend mode");
        modes.depend_mode = false;
    }
    if intent.arch_args.len() > 1 {
        // Depend mode cannot attribute the dependency file to a single
        // architecture pass.
        modes.depend_mode = false;
    }

    if let Some((var, value)) = &intent.rewritten_dep_env {
        env::set_var(var, value);
    }

    debug!(source = %intent.input_file, object = %intent.output_obj, "analyzed compilation");

    let mut ctx = Compilation {
        config,
        env,
        cwd,
        cwd_str: cwd_str.clone(),
        guessed,
        time_of_compilation: now_secs(),
        modes,
        intent,
        args,
        included_files: HashMap::new(),
        has_absolute_include_headers: false,
        temporal_macro_seen: false,
        i_tmpfile: None,
        cpp_stderr: None,
    };

    let compiler_path = ctx.args.preprocessor_args[0].clone();
    let mut common = Hasher::new();
    hashing::hash_common_info(
        &mut common,
        config,
        env,
        &ctx.intent,
        guessed,
        &compiler_path,
        &cwd_str,
    )?;

    let mut args_to_hash = ctx.args.preprocessor_args.clone();
    args_to_hash.extend(ctx.args.extra_args_to_hash.iter().cloned());

    let mut manifest_path: Option<PathBuf> = None;
    let mut result_from_manifest: Option<Digest> = None;
    let mut put_result_in_manifest = false;
    let mut direct_hasher: Option<Hasher> = None;

    if ctx.modes.direct_mode {
        debug!("trying direct lookup");
        let mut direct = common.clone();
        hashing::hash_result_version(&mut direct);
        hashing::hash_arguments(
            &mut direct,
            config,
            &ctx.intent,
            guessed,
            &args_to_hash,
            HashMode::Direct,
        )?;
        match hashing::hash_direct_extras(&mut direct, config, env, &ctx.intent)? {
            Some(manifest_key) => {
                let m_path = cache_object_path(&config.cache_dir, &manifest_key, ".manifest");
                debug!(path = %m_path.display(), "looking for result name in manifest");
                let verify = manifest::VerifyContext {
                    config,
                    treat_as_clang: guessed.treat_as_clang(),
                    output_is_pch: ctx.intent.output_is_pch,
                };
                if let Some(name) = manifest::lookup(&m_path, &verify) {
                    debug!("got result name from manifest");
                    if !config.recache {
                        if let Some(code) = try_serve(&mut ctx, config, &name, true) {
                            bump_for_key(config, &name, Counter::CacheHitDirect);
                            return Ok(code);
                        }
                        // The result vanished under us (cleanup race);
                        // recompute via the preprocessor tier. The manifest
                        // already holds this entry, so don't re-add it.
                    }
                    result_from_manifest = Some(name);
                } else {
                    debug!("did not find result name in manifest");
                    put_result_in_manifest = true;
                }
                manifest_path = Some(m_path);
                direct_hasher = Some(direct);
            }
            None => {
                ctx.temporal_macro_seen = true;
                ctx.modes.direct_mode = false;
            }
        }
    }

    if config.read_only_direct {
        debug!("read-only direct mode; running the real compiler");
        return Err(Reject::ReadOnlyDirect);
    }

    if ctx.modes.depend_mode && direct_hasher.is_none() {
        // Depend mode extends the direct hash; without one (temporal macro
        // or a direct-hostile option) the preprocessor tier takes over.
        debug!("no direct hash available; disabling depend mode");
        ctx.modes.depend_mode = false;
    }

    let mut result_key: Option<Digest> = None;
    if !ctx.modes.depend_mode {
        let mut cpp = common.clone();
        hashing::hash_result_version(&mut cpp);
        hashing::hash_arguments(
            &mut cpp,
            config,
            &ctx.intent,
            guessed,
            &args_to_hash,
            HashMode::Preprocessor,
        )?;

        let key = if ctx.intent.arch_args.is_empty() {
            preprocessor::result_key_from_cpp(&mut ctx, &mut cpp, &[])?
        } else {
            let mut last = None;
            for arch in ctx.intent.arch_args.clone() {
                let extra = vec!["-arch".to_string(), arch.clone()];
                debug!(arch = %arch, "preprocessing for architecture");
                last = Some(preprocessor::result_key_from_cpp(&mut ctx, &mut cpp, &extra)?);
            }
            last.ok_or_else(|| Reject::Io("no architectures to preprocess".to_string()))?
        };
        debug!(key = %key, "got result key from preprocessor");

        if let (Some(from_manifest), Some(m_path)) = (&result_from_manifest, &manifest_path) {
            if *from_manifest != key {
                // Most likely two base_dir settings produced the same
                // direct key but different relativized contents. Drop the
                // whole manifest rather than serve anything doubtful.
                debug!("manifest result differs from preprocessor output; removing manifest");
                let _ = fs::remove_file(m_path);
                put_result_in_manifest = true;
            }
        }

        // A clang PCH can't be trusted from the cpp tier: clang pins the
        // mtimes of everything the header included.
        let clang_pch = guessed.treat_as_clang() && ctx.intent.output_is_pch;
        if !config.recache && !clang_pch {
            if let Some(code) = try_serve(&mut ctx, config, &key, false) {
                if put_result_in_manifest {
                    update_manifest(&ctx, config, manifest_path.as_deref(), &key);
                }
                bump_for_key(config, &key, Counter::CacheHitPreprocessed);
                return Ok(code);
            }
        }
        result_key = Some(key);
    }

    if config.read_only {
        debug!("read-only mode; running the real compiler");
        return Err(Reject::ReadOnly);
    }

    to_cache(
        &mut ctx,
        config,
        orig_argv,
        result_key,
        direct_hasher,
        manifest_path.as_deref(),
    )
}

/// Run the real compiler and record its outputs (spec: COMPILE ->
/// CAPTURE_OUTPUTS -> STORE -> UPDATE_MANIFEST).
#[allow(clippy::too_many_lines)]
fn to_cache(
    ctx: &mut Compilation<'_>,
    config: &Config,
    orig_argv: &[String],
    result_key: Option<Digest>,
    direct_hasher: Option<Hasher>,
    manifest_path: Option<&Path>,
) -> Result<i32, Reject> {
    let intent = ctx.intent.clone();

    let argv = if ctx.modes.depend_mode {
        // Depend mode runs the original command line (minus wrapper-private
        // tokens) so the compiler itself produces the dependency file.
        ctx.time_of_compilation = now_secs();
        execute::strip_wrapper_args(orig_argv)
    } else {
        let mut argv = ctx.args.compiler_args.clone();
        argv.push("-o".to_string());
        argv.push(intent.output_obj.clone());
        if intent.generating_diagnostics {
            argv.push("--serialize-diagnostics".to_string());
            argv.push(intent.output_dia.clone().unwrap_or_default());
        }
        if ctx.modes.run_second_cpp {
            argv.push(intent.input_file.clone());
        } else {
            let i_tmpfile = ctx
                .i_tmpfile
                .clone()
                .ok_or_else(|| Reject::Io("no preprocessed input available".to_string()))?;
            argv.push(i_tmpfile.to_string_lossy().into_owned());
        }
        argv
    };

    if intent.seen_split_dwarf {
        if let Some(dwo) = &intent.output_dwo {
            // A stale .dwo must not masquerade as compiler output.
            if let Err(err) = fs::remove_file(dwo) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    debug!(path = %dwo, %err, "failed to remove stale split-dwarf file");
                }
            }
        }
    }

    debug!("running real compiler");
    let tmp_stdout = ctx.tmp_path("stdout").map_err(Compilation::io_reject)?;
    let tmp_stderr = ctx.tmp_path("stderr").map_err(Compilation::io_reject)?;
    tmpfiles::register(&tmp_stdout);
    tmpfiles::register(&tmp_stderr);
    let status = execute::execute_to_files(&argv, &tmp_stdout, &tmp_stderr, true)
        .map_err(Compilation::io_reject)?;

    let stdout_size = fs::metadata(&tmp_stdout).map(|m| m.len()).unwrap_or(0);
    if stdout_size != 0 && ctx.guessed != GuessedCompiler::Pump {
        debug!("compiler produced stdout");
        return Err(Reject::CompilerProducedStdout);
    }

    // Warnings from the preprocessor pass belong in front of the
    // compiler's own stderr, both now and on later hits.
    let mut stderr_data = Vec::new();
    if let Some(cpp_stderr) = &ctx.cpp_stderr {
        stderr_data.extend(fs::read(cpp_stderr).unwrap_or_default());
    }
    stderr_data.extend(fs::read(&tmp_stderr).unwrap_or_default());
    fs::write(&tmp_stderr, &stderr_data).map_err(Compilation::io_reject)?;

    if status != 0 {
        debug!(status, "compiler gave non-zero exit status");
        let _ = std::io::stderr().write_all(&stderr_data);
        bump_without_key(config, Counter::CompileFailed);
        return Ok(status);
    }

    let result_key = if ctx.modes.depend_mode {
        let mut hasher = direct_hasher
            .ok_or_else(|| Reject::Io("depend mode without a direct hash".to_string()))?;
        let key = depend::result_key_from_depfile(ctx, &mut hasher)?;
        debug!(key = %key, "got result key from dependency file");
        key
    } else {
        result_key.ok_or_else(|| Reject::Io("missing result key".to_string()))?
    };

    let produce_dep_file =
        intent.generating_dependencies && intent.output_dep.as_deref() != Some("/dev/null");
    if produce_dep_file {
        depend::use_relative_paths_in_depfile(ctx);
    }

    match fs::metadata(&intent.output_obj) {
        Err(_) => {
            debug!("compiler didn't produce an object file");
            return Err(Reject::CompilerProducedNoOutput);
        }
        Ok(meta) if meta.len() == 0 => {
            debug!("compiler produced an empty object file");
            return Err(Reject::CompilerProducedEmptyOutput);
        }
        Ok(_) => {}
    }

    if ctx.temporal_macro_seen {
        // The source reads the clock; a stored result would be wrong the
        // next second. Serve this compile and cache nothing.
        debug!("source uses a temporal macro; not storing result");
        let _ = std::io::stderr().write_all(&stderr_data);
        cleanup_compile_temps(ctx, &tmp_stdout, &tmp_stderr);
        return Ok(0);
    }

    let mut files = ResultFiles::new();
    if !stderr_data.is_empty() {
        files.add(STDERR_NAME, &tmp_stderr);
    }
    files.add(".o", &intent.output_obj);
    if intent.generating_dependencies {
        if let Some(dep) = &intent.output_dep {
            files.add(".d", dep);
        }
    }
    if let Some(cov) = &intent.output_cov {
        files.add(".gcno", cov);
    }
    if let Some(su) = &intent.output_su {
        files.add(".su", su);
    }
    if let Some(dia) = &intent.output_dia {
        files.add(".dia", dia);
    }
    if let Some(dwo) = &intent.output_dwo {
        // Only store the .dwo the compiler actually produced; GCC and
        // Clang differ for combinations like -gsplit-dwarf -g1.
        if Path::new(dwo).exists() {
            files.add(".dwo", dwo);
        }
    }

    let result_path = cache_object_path(&config.cache_dir, &result_key, ".result");
    crate::result::put(&result_path, &files, config)
        .map_err(|err| Reject::Io(err.to_string()))?;
    debug!(path = %result_path.display(), "stored result in cache");

    if let Some(first_level) = result_path.parent() {
        create_cachedir_tag(first_level);
    }

    let _ = std::io::stderr().write_all(&stderr_data);
    cleanup_compile_temps(ctx, &tmp_stdout, &tmp_stderr);

    update_manifest(ctx, config, manifest_path, &result_key);

    bump_for_key(config, &result_key, Counter::CacheMiss);
    Ok(0)
}

fn cleanup_compile_temps(ctx: &Compilation<'_>, tmp_stdout: &Path, tmp_stderr: &Path) {
    for path in [tmp_stdout, tmp_stderr] {
        let _ = fs::remove_file(path);
        tmpfiles::unregister(path);
    }
    if let Some(cpp_stderr) = &ctx.cpp_stderr {
        let _ = fs::remove_file(cpp_stderr);
        tmpfiles::unregister(cpp_stderr);
    }
}

/// Create or extend the manifest behind the direct key.
fn update_manifest(
    ctx: &Compilation<'_>,
    config: &Config,
    manifest_path: Option<&Path>,
    result_key: &Digest,
) {
    if !ctx.modes.direct_mode || config.read_only || config.read_only_direct {
        return;
    }
    let Some(path) = manifest_path else {
        return;
    };
    debug!(path = %path.display(), "adding result name to manifest");
    if let Err(err) = manifest::put(
        path,
        *result_key,
        &ctx.included_files,
        ctx.time_of_compilation,
        config,
    ) {
        debug!(path = %path.display(), %err, "failed to update manifest");
    }
}

/// Re-materialize a cached result. Returns the exit code on success, or
/// `None` when the result is unusable (treated as a miss).
fn try_serve(
    ctx: &mut Compilation<'_>,
    config: &Config,
    name: &Digest,
    direct_mode: bool,
) -> Option<i32> {
    let result_path = cache_object_path(&config.cache_dir, name, ".result");
    let tmp_stderr = ctx.tmp_path("hit_stderr").ok()?;
    tmpfiles::register(&tmp_stderr);

    let intent = &ctx.intent;
    let mut files = ResultFiles::new();
    if intent.output_obj != "/dev/null" {
        files.add(".o", &intent.output_obj);
        if intent.seen_split_dwarf {
            if let Some(dwo) = &intent.output_dwo {
                files.add(".dwo", dwo);
            }
        }
    }
    files.add(STDERR_NAME, &tmp_stderr);
    // In preprocessor mode the compiler never reran, but the preprocessor
    // did, and it already wrote the dependency file.
    if direct_mode && intent.generating_dependencies {
        if let Some(dep) = &intent.output_dep {
            if dep != "/dev/null" {
                files.add(".d", dep);
            }
        }
    }
    if let Some(cov) = &intent.output_cov {
        files.add(".gcno", cov);
    }
    if let Some(su) = &intent.output_su {
        files.add(".su", su);
    }
    if let Some(dia) = &intent.output_dia {
        files.add(".dia", dia);
    }

    let got = crate::result::get(&result_path, &files)?;
    if intent.output_obj != "/dev/null" && !got.iter().any(|n| n == ".o") {
        debug!("cached result has no object file");
        return None;
    }

    if let Ok(stderr_data) = fs::read(&tmp_stderr) {
        let _ = std::io::stderr().write_all(&stderr_data);
    }
    let _ = fs::remove_file(&tmp_stderr);
    tmpfiles::unregister(&tmp_stderr);

    debug!("succeeded getting cached result");
    Some(0)
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn bump_for_key(config: &Config, key: &Digest, counter: Counter) {
    let hex = key.to_hex();
    let first = hex.chars().next().unwrap_or('0');
    stats::bump(&stats::stats_file_for(&config.cache_dir, first), counter);
}

fn bump_without_key(config: &Config, counter: Counter) {
    // No key yet; spread the accounting across the sixteen stat files the
    // same way results do.
    let first = char::from_digit(std::process::id() % 16, 16).unwrap_or('0');
    stats::bump(&stats::stats_file_for(&config.cache_dir, first), counter);
}
