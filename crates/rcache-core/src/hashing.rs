//! Seeding the cache keys: everything both lookup tiers must agree on, plus
//! the per-argument contribution rules shared by the direct and preprocessor
//! hashers.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rcache_hash::{hash_source_into, Digest, Hasher};
use tracing::debug;

use crate::args::{self, CompileIntent};
use crate::compiler::{basename, GuessedCompiler};
use crate::config::{CompilerCheck, Config, EnvSnapshot};
use crate::error::Reject;
use crate::execute;
use crate::paths::{mtime_of, without_extension};

/// Version tag folded into every key. Bumping it invalidates all caches.
const HASH_PREFIX: &str = "rch1";

/// On-disk result format version, hashed so format changes miss cleanly.
pub const RESULT_VERSION: u8 = 1;

/// Env vars that change how compiler messages are localized.
const LOCALE_VARS: [&str; 4] = ["LANG", "LC_ALL", "LC_CTYPE", "LC_MESSAGES"];

/// Env vars that extend the include search path behind the analyzer's back.
const INCLUDE_PATH_VARS: [&str; 5] = [
    "CPATH",
    "C_INCLUDE_PATH",
    "CPLUS_INCLUDE_PATH",
    "OBJC_INCLUDE_PATH",
    "OBJCPLUS_INCLUDE_PATH",
];

/// Which tier the per-argument rules are hashing for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMode {
    Direct,
    Preprocessor,
}

/// Hash the compiler binary per the `compiler_check` policy.
///
/// `allow_command` is false when hashing auxiliary binaries (specs files,
/// plugins, NVCC host compilers): a user-provided check command only makes
/// sense for the compiler itself, so those fall back to content hashing.
pub fn hash_compiler(
    hasher: &mut Hasher,
    config: &Config,
    path: &str,
    allow_command: bool,
) -> Result<()> {
    match &config.compiler_check {
        CompilerCheck::None => {}
        CompilerCheck::Mtime => {
            let meta = fs::metadata(path)
                .with_context(|| format!("failed to stat compiler {path}"))?;
            hasher.delimiter("cc_mtime");
            hasher.update_i64(i64::try_from(meta.len()).unwrap_or(i64::MAX));
            hasher.update_i64(mtime_of(&meta));
        }
        CompilerCheck::String(s) => {
            hasher.delimiter("cc_hash");
            hasher.update_str(s);
        }
        CompilerCheck::Content => {
            hasher.delimiter("cc_content");
            hasher
                .update_file(Path::new(path))
                .with_context(|| format!("failed to hash compiler {path}"))?;
        }
        CompilerCheck::Command(cmd) => {
            if allow_command {
                hash_multicommand_output(hasher, cmd, path)?;
            } else {
                hasher.delimiter("cc_content");
                hasher
                    .update_file(Path::new(path))
                    .with_context(|| format!("failed to hash {path}"))?;
            }
        }
    }
    Ok(())
}

/// Run each `;`-separated command with `%compiler%` substituted and hash
/// its output.
pub fn hash_multicommand_output(hasher: &mut Hasher, commands: &str, compiler: &str) -> Result<()> {
    for command in commands.split(';') {
        hash_command_output(hasher, command, compiler)?;
    }
    Ok(())
}

fn hash_command_output(hasher: &mut Hasher, command: &str, compiler: &str) -> Result<()> {
    let words: Vec<String> = command
        .split_whitespace()
        .map(|w| {
            if w == "%compiler%" {
                compiler.to_string()
            } else {
                w.to_string()
            }
        })
        .collect();
    let Some((program, rest)) = words.split_first() else {
        return Err(anyhow!("empty compiler check command"));
    };
    let output = execute::capture_output(program, rest)
        .with_context(|| format!("failure running compiler check command: {command}"))?;
    if !output.status.success() {
        return Err(anyhow!(
            "compiler check command exited with {}: {command}",
            output.status
        ));
    }
    hasher.delimiter("cc_program_output");
    hasher.update(&output.stdout);
    hasher.update(&output.stderr);
    Ok(())
}

/// Hash the host compiler(s) nvcc will invoke.
///
/// With `-ccbin` naming a directory (or absent), the platform's default
/// host compilers are looked up there or on PATH; an explicit binary is
/// hashed directly.
pub fn hash_nvcc_host_compiler(
    hasher: &mut Hasher,
    config: &Config,
    ccbin: Option<&str>,
) -> Result<()> {
    let is_dir = ccbin.is_some_and(|p| Path::new(p).is_dir());
    if ccbin.is_none() || is_dir {
        #[cfg(target_os = "macos")]
        const DEFAULTS: &[&str] = &["clang", "clang++"];
        #[cfg(target_os = "windows")]
        const DEFAULTS: &[&str] = &["cl.exe"];
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        const DEFAULTS: &[&str] = &["gcc", "g++"];

        for name in DEFAULTS {
            let candidate = match ccbin {
                Some(dir) => {
                    let path = format!("{dir}/{name}");
                    Path::new(&path).is_file().then_some(path)
                }
                None => which::which(name)
                    .ok()
                    .map(|p| p.to_string_lossy().into_owned()),
            };
            if let Some(path) = candidate {
                hash_compiler(hasher, config, &path, false)?;
            }
        }
    } else if let Some(path) = ccbin {
        hash_compiler(hasher, config, path, false)?;
    }
    Ok(())
}

/// Seed the digest shared by both lookup tiers (spec: the common hasher).
///
/// # Errors
///
/// Fails with a typed [`Reject`] when a referenced file (compiler, sanitizer
/// blacklist, extra file) cannot be hashed.
#[allow(clippy::too_many_lines)]
pub fn hash_common_info(
    hasher: &mut Hasher,
    config: &Config,
    env: &EnvSnapshot,
    intent: &CompileIntent,
    guessed: GuessedCompiler,
    compiler_path: &str,
    cwd: &str,
) -> Result<(), Reject> {
    hasher.update_str(HASH_PREFIX);

    // A .i file is not treated the same as a .ii file.
    hasher.delimiter("ext");
    hasher.update_str(&intent.cpp_extension);

    if fs::metadata(compiler_path).is_err() {
        return Err(Reject::Io(format!("cannot stat compiler {compiler_path}")));
    }
    hash_compiler(hasher, config, compiler_path, true)
        .map_err(|err| Reject::Io(err.to_string()))?;

    // Compilers behind hard links behave differently depending on the name
    // they were invoked under.
    hasher.delimiter("cc_name");
    hasher.update_str(basename(compiler_path));

    if !config.sloppiness.locale {
        for var in LOCALE_VARS {
            if let Some(value) = env.var(var) {
                hasher.delimiter(var);
                hasher.update_str(value);
            }
        }
    }

    if intent.generating_debuginfo && config.hash_dir {
        // The cwd ends up in the debug info; apply -fdebug-prefix-map
        // substitutions first so mapped builds still share results.
        let mut dir = cwd.to_string();
        for map in &intent.debug_prefix_maps {
            if let Some((old, new)) = map.split_once('=') {
                if let Some(rest) = dir.strip_prefix(old) {
                    dir = format!("{new}{rest}");
                }
            }
        }
        debug!(cwd = %dir, "hashing working directory");
        hasher.delimiter("cwd");
        hasher.update_str(&dir);
    }

    if intent.seen_split_dwarf {
        // Object files carry a link to the .dwo named after the target, so
        // results are only interchangeable for the same output basename.
        hasher.delimiter("filename");
        hasher.update_str(basename(&intent.output_obj));
    }

    if intent.generating_coverage && intent.profile_arcs {
        // The object embeds the path where the runtime writes the .gcda.
        let dir = match &intent.profile_dir {
            Some(dir) => dir.clone(),
            None => {
                let parent = Path::new(&intent.output_obj)
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_default();
                parent
                    .canonicalize()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_else(|_| parent.to_string_lossy().into_owned())
            }
        };
        let stem = without_extension(basename(&intent.output_obj));
        hasher.delimiter("gcda");
        hasher.update_str(&format!("{dir}/{stem}.gcda"));
    }

    for blacklist in &intent.sanitize_blacklists {
        debug!(path = %blacklist, "hashing sanitize blacklist");
        hasher.delimiter("sanitizeblacklist");
        if hasher.update_file(Path::new(blacklist)).is_err() {
            return Err(Reject::BadExtraFile(blacklist.clone()));
        }
    }

    for extra in &config.extra_files_to_hash {
        debug!(path = %extra.display(), "hashing extra file");
        hasher.delimiter("extrafile");
        if hasher.update_file(extra).is_err() {
            return Err(Reject::BadExtraFile(extra.display().to_string()));
        }
    }

    if guessed == GuessedCompiler::Gcc {
        if let Some(colors) = env.var("GCC_COLORS") {
            hasher.delimiter("gcccolors");
            hasher.update_str(colors);
        }
    }

    Ok(())
}

/// Per-argument contributions common to the direct and preprocessor keys
/// (spec: direct hasher §4.3). `args_to_hash` starts with the compiler path,
/// which is skipped; it was hashed as compiler identity already.
#[allow(clippy::too_many_lines)]
pub fn hash_arguments(
    hasher: &mut Hasher,
    config: &Config,
    intent: &CompileIntent,
    guessed: GuessedCompiler,
    args_to_hash: &[String],
    mode: HashMode,
) -> Result<bool, Reject> {
    let is_clang = guessed.treat_as_clang();
    let mut found_ccbin = false;

    let argv = args_to_hash;
    let mut i = 1;
    while i < argv.len() {
        let arg = &argv[i];

        // -L and -Wl, don't affect compilation, except that clang warns
        // about unused linker flags.
        if !is_clang {
            if arg == "-L" && i + 1 < argv.len() {
                i += 2;
                continue;
            }
            if arg.starts_with("-L") || arg.starts_with("-Wl,") {
                i += 1;
                continue;
            }
        }

        // Prefix maps exist precisely so different build roots can share
        // results; hash the option's presence, never its value.
        if let Some(stem) = prefix_map_stem(arg) {
            hasher.delimiter("arg");
            hasher.update_str(stem);
            i += 1;
            continue;
        }

        // When hashing preprocessed output, options that only steer the
        // preprocessor are already reflected in that output. Precompiled
        // headers weaken that assumption, so they disable the shortcut.
        if mode == HashMode::Preprocessor && !intent.output_is_pch && !intent.using_pch {
            if args::affects_cpp(arg) {
                if args::takes_arg(arg) {
                    i += 1;
                }
                i += 1;
                continue;
            }
            if args::prefix_affects_cpp(arg) {
                i += 1;
                continue;
            }
        }

        // The dependency file name doesn't change the object.
        if intent.generating_dependencies {
            if let Some(rest) = arg.strip_prefix("-Wp,-MD,") {
                if !rest.contains(',') {
                    hasher.update(&arg.as_bytes()[..8]);
                    i += 1;
                    continue;
                }
            }
            if let Some(rest) = arg.strip_prefix("-Wp,-MMD,") {
                if !rest.contains(',') {
                    hasher.update(&arg.as_bytes()[..9]);
                    i += 1;
                    continue;
                }
            }
            if arg.starts_with("-MF") {
                hasher.delimiter("arg");
                hasher.update_str("-MF");
                if intent.output_dep.as_deref() != Some("/dev/null") && arg.len() == 3 {
                    // Separate operand carries the file name; skip it.
                    i += 1;
                }
                i += 1;
                continue;
            }
        }

        // An explicit specs file changes code generation; hash its content
        // but not its location.
        let specs = arg
            .strip_prefix("-specs=")
            .or_else(|| arg.strip_prefix("--specs="));
        if let Some(path) = specs {
            if Path::new(path).is_file() {
                hasher.delimiter("specs");
                hash_compiler(hasher, config, path, false)
                    .map_err(|err| Reject::Io(err.to_string()))?;
                i += 1;
                continue;
            }
        }

        if let Some(path) = arg.strip_prefix("-fplugin=") {
            if Path::new(path).is_file() {
                hasher.delimiter("plugin");
                hash_compiler(hasher, config, path, false)
                    .map_err(|err| Reject::Io(err.to_string()))?;
                i += 1;
                continue;
            }
        }

        if arg == "-Xclang"
            && i + 3 < argv.len()
            && argv[i + 1] == "-load"
            && argv[i + 2] == "-Xclang"
            && Path::new(&argv[i + 3]).is_file()
        {
            hasher.delimiter("plugin");
            hash_compiler(hasher, config, &argv[i + 3], false)
                .map_err(|err| Reject::Io(err.to_string()))?;
            i += 4;
            continue;
        }

        if (arg == "-ccbin" || arg == "--compiler-bindir")
            && i + 1 < argv.len()
            && Path::new(&argv[i + 1]).exists()
        {
            found_ccbin = true;
            hasher.delimiter("ccbin");
            hash_nvcc_host_compiler(hasher, config, Some(&argv[i + 1]))
                .map_err(|err| Reject::Io(err.to_string()))?;
            i += 2;
            continue;
        }

        hasher.delimiter("arg");
        hasher.update_str(arg);
        if i + 1 < argv.len() && args::takes_arg(arg) {
            i += 1;
            hasher.delimiter("arg");
            hasher.update_str(&argv[i]);
        }
        i += 1;
    }

    // A /dev/null dependency file still changes what the compiler writes.
    if intent.generating_dependencies && intent.output_dep.as_deref() == Some("/dev/null") {
        hasher.delimiter("/dev/null dependency file");
    }

    if !found_ccbin && intent.actual_language == "cu" {
        hash_nvcc_host_compiler(hasher, config, None)
            .map_err(|err| Reject::Io(err.to_string()))?;
    }

    if intent.profile_generate {
        let dir = intent
            .profile_dir
            .clone()
            .unwrap_or_else(|| current_dir_string());
        debug!(dir = %dir, "hashing profile directory");
        hasher.delimiter("-fprofile-dir");
        hasher.update_str(&dir);
    }

    if intent.profile_use {
        let dir = intent
            .profile_dir
            .clone()
            .unwrap_or_else(|| current_dir_string());
        let gcda = format!("{dir}/{}.gcda", without_extension(&intent.output_obj));
        debug!(path = %gcda, "hashing profile data");
        hasher.delimiter("-fprofile-use");
        let _ = hasher.update_file(Path::new(&gcda));
    }

    // cpp output changes per architecture.
    for arch in &intent.arch_args {
        hasher.delimiter("-arch");
        hasher.update_str(arch);
    }

    Ok(found_ccbin)
}

/// What the direct tier hashes on top of the argument contributions: the
/// include-search environment and the source file itself.
///
/// Returns the manifest key, or `None` when the source uses a temporal
/// macro and the direct tier must stand down for this compilation.
pub fn hash_direct_extras(
    hasher: &mut Hasher,
    config: &Config,
    env: &EnvSnapshot,
    intent: &CompileIntent,
) -> Result<Option<Digest>, Reject> {
    hasher.delimiter("manifest version");
    hasher.update_i64(i64::from(crate::manifest::MANIFEST_VERSION));

    for var in INCLUDE_PATH_VARS {
        if let Some(value) = env.var(var) {
            hasher.delimiter(var);
            hasher.update_str(value);
        }
    }

    if !config.sloppiness.file_macro {
        // The source may expand __FILE__; keep the key unique per name.
        hasher.delimiter("inputfile");
        hasher.update_str(&intent.input_file);
    }

    hasher.delimiter("sourcecode");
    let content = fs::read(&intent.input_file)
        .map_err(|err| Reject::Io(format!("failed to read {}: {err}", intent.input_file)))?;
    let temporal = hash_source_into(hasher, &content, !config.sloppiness.time_macros);
    if temporal {
        debug!(input = %intent.input_file, "temporal macro in source; disabling direct mode");
        return Ok(None);
    }
    Ok(Some(hasher.digest()))
}

/// Shared prologue for both tiers' argument hashing.
pub fn hash_result_version(hasher: &mut Hasher) {
    hasher.delimiter("result version");
    hasher.update_i64(i64::from(RESULT_VERSION));
}

fn prefix_map_stem(arg: &str) -> Option<&'static str> {
    if arg.starts_with("-fdebug-prefix-map=") {
        Some("-fdebug-prefix-map=")
    } else if arg.starts_with("-ffile-prefix-map=") {
        Some("-ffile-prefix-map=")
    } else if arg.starts_with("-fmacro-prefix-map=") {
        Some("-fmacro-prefix-map=")
    } else {
        None
    }
}

fn current_dir_string() -> String {
    std::env::current_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvSnapshot;
    use std::io::Write;

    fn test_config(dir: &Path) -> Config {
        let env = EnvSnapshot::testing(&[(
            "CCACHE_DIR",
            dir.join("cache").to_str().unwrap(),
        )]);
        Config::from_snapshot(&env).unwrap()
    }

    fn intent_for(language: &str) -> CompileIntent {
        CompileIntent {
            actual_language: language.to_string(),
            cpp_extension: "i".to_string(),
            output_obj: "a.o".to_string(),
            ..CompileIntent::default()
        }
    }

    fn digest_of_args(
        config: &Config,
        intent: &CompileIntent,
        guessed: GuessedCompiler,
        argv: &[&str],
        mode: HashMode,
    ) -> Digest {
        let argv: Vec<String> = argv.iter().map(ToString::to_string).collect();
        let mut hasher = Hasher::new();
        hash_arguments(&mut hasher, config, intent, guessed, &argv, mode).unwrap();
        hasher.digest()
    }

    #[test]
    fn linker_flags_are_neutral_for_gcc_but_not_clang() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let intent = intent_for("c");

        let plain = ["cc", "-O2"];
        let linker = ["cc", "-O2", "-Wl,-rpath,/x", "-L/lib"];
        assert_eq!(
            digest_of_args(&config, &intent, GuessedCompiler::Gcc, &plain, HashMode::Direct),
            digest_of_args(&config, &intent, GuessedCompiler::Gcc, &linker, HashMode::Direct),
        );
        assert_ne!(
            digest_of_args(&config, &intent, GuessedCompiler::Clang, &plain, HashMode::Direct),
            digest_of_args(&config, &intent, GuessedCompiler::Clang, &linker, HashMode::Direct),
        );
    }

    #[test]
    fn prefix_map_values_are_neutral_but_presence_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let intent = intent_for("c");
        let g = GuessedCompiler::Gcc;

        let a = digest_of_args(
            &config,
            &intent,
            g,
            &["cc", "-fdebug-prefix-map=/a=/b"],
            HashMode::Direct,
        );
        let b = digest_of_args(
            &config,
            &intent,
            g,
            &["cc", "-fdebug-prefix-map=/c=/d"],
            HashMode::Direct,
        );
        let without = digest_of_args(&config, &intent, g, &["cc"], HashMode::Direct);
        assert_eq!(a, b);
        assert_ne!(a, without);

        let macro_a = digest_of_args(
            &config,
            &intent,
            g,
            &["cc", "-fmacro-prefix-map=/a=/b"],
            HashMode::Direct,
        );
        let macro_b = digest_of_args(
            &config,
            &intent,
            g,
            &["cc", "-fmacro-prefix-map=/x=/y"],
            HashMode::Direct,
        );
        assert_eq!(macro_a, macro_b);
        assert_ne!(macro_a, a);
    }

    #[test]
    fn cpp_only_options_drop_out_of_preprocessor_mode_hash() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let intent = intent_for("c");
        let g = GuessedCompiler::Gcc;

        let plain = digest_of_args(&config, &intent, g, &["cc", "-O2"], HashMode::Preprocessor);
        let with_define = digest_of_args(
            &config,
            &intent,
            g,
            &["cc", "-O2", "-DFOO=1", "-I", "include"],
            HashMode::Preprocessor,
        );
        assert_eq!(plain, with_define);

        // In direct mode the same options must count.
        let direct_plain = digest_of_args(&config, &intent, g, &["cc", "-O2"], HashMode::Direct);
        let direct_with = digest_of_args(
            &config,
            &intent,
            g,
            &["cc", "-O2", "-DFOO=1"],
            HashMode::Direct,
        );
        assert_ne!(direct_plain, direct_with);
    }

    #[test]
    fn mf_filename_is_neutral_in_dependency_mode() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut intent = intent_for("c");
        intent.generating_dependencies = true;
        intent.output_dep = Some("x.d".to_string());
        let g = GuessedCompiler::Gcc;

        let a = digest_of_args(&config, &intent, g, &["cc", "-MF", "one.d"], HashMode::Direct);
        let b = digest_of_args(&config, &intent, g, &["cc", "-MF", "two.d"], HashMode::Direct);
        assert_eq!(a, b);
    }

    #[test]
    fn specs_file_content_is_hashed_not_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let intent = intent_for("c");
        let g = GuessedCompiler::Gcc;

        let one = dir.path().join("one.specs");
        let two = dir.path().join("two.specs");
        let mut f = fs::File::create(&one).unwrap();
        f.write_all(b"*link: same\n").unwrap();
        let mut f = fs::File::create(&two).unwrap();
        f.write_all(b"*link: same\n").unwrap();

        let spec_one = format!("-specs={}", one.display());
        let spec_two = format!("-specs={}", two.display());
        let mut config = config;
        config.compiler_check = CompilerCheck::Content;
        let a = digest_of_args(&config, &intent, g, &["cc", &spec_one], HashMode::Direct);
        let b = digest_of_args(&config, &intent, g, &["cc", &spec_two], HashMode::Direct);
        assert_eq!(a, b);

        fs::write(&two, b"*link: different\n").unwrap();
        let c = digest_of_args(&config, &intent, g, &["cc", &spec_two], HashMode::Direct);
        assert_ne!(a, c);
    }

    #[test]
    fn arch_args_contribute_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut intent = intent_for("c");
        let g = GuessedCompiler::Clang;

        let plain = digest_of_args(&config, &intent, g, &["cc"], HashMode::Direct);
        intent.arch_args = vec!["x86_64".into(), "arm64".into()];
        let two = digest_of_args(&config, &intent, g, &["cc"], HashMode::Direct);
        intent.arch_args = vec!["arm64".into(), "x86_64".into()];
        let swapped = digest_of_args(&config, &intent, g, &["cc"], HashMode::Direct);
        assert_ne!(plain, two);
        assert_ne!(two, swapped);
    }

    #[test]
    fn direct_extras_detect_temporal_macros() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let env = EnvSnapshot::testing(&[]);

        let clean = dir.path().join("clean.c");
        fs::write(&clean, "int x;\n").unwrap();
        let tainted = dir.path().join("tainted.c");
        fs::write(&tainted, "const char* t = __TIME__;\n").unwrap();

        let mut intent = intent_for("c");
        intent.input_file = clean.to_string_lossy().into_owned();
        let mut hasher = Hasher::new();
        assert!(hash_direct_extras(&mut hasher, &config, &env, &intent)
            .unwrap()
            .is_some());

        intent.input_file = tainted.to_string_lossy().into_owned();
        let mut hasher = Hasher::new();
        assert!(hash_direct_extras(&mut hasher, &config, &env, &intent)
            .unwrap()
            .is_none());

        // time_macros sloppiness re-enables the direct tier.
        let mut sloppy = test_config(dir.path());
        sloppy.sloppiness.time_macros = true;
        let mut hasher = Hasher::new();
        assert!(hash_direct_extras(&mut hasher, &sloppy, &env, &intent)
            .unwrap()
            .is_some());
    }

    #[test]
    fn include_env_vars_change_the_direct_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let source = dir.path().join("a.c");
        fs::write(&source, "int x;\n").unwrap();
        let mut intent = intent_for("c");
        intent.input_file = source.to_string_lossy().into_owned();

        let empty = EnvSnapshot::testing(&[]);
        let with_cpath = EnvSnapshot::testing(&[("CPATH", "/opt/include")]);

        let mut h1 = Hasher::new();
        let k1 = hash_direct_extras(&mut h1, &config, &empty, &intent).unwrap();
        let mut h2 = Hasher::new();
        let k2 = hash_direct_extras(&mut h2, &config, &with_cpath, &intent).unwrap();
        assert_ne!(k1, k2);
    }
}
