//! Classification and rewriting of the compiler command line.
//!
//! One pass over the (response-file-expanded) argv sorts every token into
//! one of four buckets — common, preprocessor-only, compiler-only,
//! dependency-generation — while collecting the flags and output paths the
//! rest of the pipeline works from. Tokens the wrapper cannot reason about
//! reject the whole invocation; the orchestrator then execs the real
//! compiler untouched.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{options, parse_response_file};
use crate::compiler::{
    language_for_file, language_is_preprocessed, language_is_supported, p_language_for_language,
    GuessedCompiler,
};
use crate::config::{Config, EnvSnapshot};
use crate::error::Reject;
use crate::paths::{extension_of, make_relative_path, without_extension};

pub const MAX_ARCH_ARGS: usize = 10;

/// Mutable mode bits the analyzer may retract for this compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeState {
    pub direct_mode: bool,
    pub run_second_cpp: bool,
    pub depend_mode: bool,
}

impl ModeState {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            direct_mode: config.direct_mode,
            run_second_cpp: config.run_second_cpp,
            depend_mode: config.depend_mode,
        }
    }
}

/// The three derived command lines. Each starts with the compiler path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedArgs {
    /// Sent to the preprocessor (`-E` added separately).
    pub preprocessor_args: Vec<String>,
    /// Not sent to the preprocessor but part of the hash.
    pub extra_args_to_hash: Vec<String>,
    /// Sent to the real compiler.
    pub compiler_args: Vec<String>,
}

/// Everything the analyzer learned about the compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileIntent {
    pub input_file: String,
    pub output_obj: String,
    pub output_dep: Option<String>,
    pub output_cov: Option<String>,
    pub output_su: Option<String>,
    pub output_dia: Option<String>,
    pub output_dwo: Option<String>,
    pub actual_language: String,
    /// Extension (no dot) for preprocessed output of this language.
    pub cpp_extension: String,
    pub arch_args: Vec<String>,

    pub found_c: bool,
    pub found_dc: bool,
    pub found_s: bool,
    pub generating_dependencies: bool,
    pub generating_coverage: bool,
    pub generating_stackusage: bool,
    pub generating_diagnostics: bool,
    pub generating_debuginfo: bool,
    pub generating_debuginfo_level_3: bool,
    pub profile_use: bool,
    pub profile_generate: bool,
    pub profile_arcs: bool,
    pub profile_dir: Option<String>,
    pub seen_split_dwarf: bool,
    pub direct_i_file: bool,
    pub using_pch: bool,
    pub output_is_pch: bool,
    pub included_pch_file: Option<String>,

    pub debug_prefix_maps: Vec<String>,
    pub sanitize_blacklists: Vec<String>,
    /// `DEPENDENCIES_OUTPUT`/`SUNPRO_DEPENDENCIES` rewritten to relative
    /// paths; the orchestrator re-exports it before running the compiler.
    pub rewritten_dep_env: Option<(&'static str, String)>,
}

struct Analyzer<'a> {
    config: &'a Config,
    cwd: &'a Path,
    guessed: GuessedCompiler,
    color_possible: bool,
    env: &'a EnvSnapshot,

    common: Vec<String>,
    cpp: Vec<String>,
    dep: Vec<String>,
    compiler_only: Vec<String>,

    intent: CompileIntent,
    explicit_language: Option<String>,
    input_charset: Option<String>,
    dependency_filename_specified: bool,
    dependency_target_specified: bool,
    dependency_implicit_target_specified: bool,
    found_pch: bool,
    found_fpch_preprocess: bool,
    found_color_diagnostics: bool,
    found_directives_only: bool,
    found_rewrite_includes: bool,
}

/// Analyze `argv` (compiler at index 0) into the derived command lines and
/// the compile intent, updating `modes` where the invocation demands it.
///
/// # Errors
///
/// Returns the typed reason when the invocation must not be cached.
pub fn analyze_arguments(
    argv: &[String],
    config: &Config,
    cwd: &Path,
    guessed: GuessedCompiler,
    color_possible: bool,
    env: &EnvSnapshot,
    modes: &mut ModeState,
) -> Result<(ProcessedArgs, CompileIntent), Reject> {
    let analyzer = Analyzer {
        config,
        cwd,
        guessed,
        color_possible,
        env,
        common: Vec::new(),
        cpp: Vec::new(),
        dep: Vec::new(),
        compiler_only: Vec::new(),
        intent: CompileIntent::default(),
        explicit_language: None,
        input_charset: None,
        dependency_filename_specified: false,
        dependency_target_specified: false,
        dependency_implicit_target_specified: false,
        found_pch: false,
        found_fpch_preprocess: false,
        found_color_diagnostics: false,
        found_directives_only: false,
        found_rewrite_includes: false,
    };
    analyzer.run(argv, modes)
}

impl Analyzer<'_> {
    fn rel(&self, path: &str) -> String {
        make_relative_path(&self.config.base_dir, self.cwd, path)
    }

    fn run(
        mut self,
        argv: &[String],
        modes: &mut ModeState,
    ) -> Result<(ProcessedArgs, CompileIntent), Reject> {
        let mut expanded: Vec<String> = argv.to_vec();
        self.classify(&mut expanded, modes)?;
        self.finish(&expanded[0], modes)
    }

    #[allow(clippy::too_many_lines)]
    fn classify(&mut self, expanded: &mut Vec<String>, modes: &mut ModeState) -> Result<(), Reject> {
        let mut i = 1;
        while i < expanded.len() {
            let arg = expanded[i].clone();

            // The user knows best: just swallow the next token.
            if arg == "--ccache-skip" {
                let operand = expanded
                    .get(i + 1)
                    .ok_or_else(|| Reject::MissingArgument(arg.clone()))?;
                self.common.push(operand.clone());
                i += 2;
                continue;
            }

            if arg == "-E" {
                return Err(Reject::CalledForPreprocessing);
            }

            // Response files expand in place and are re-examined.
            if let Some(path) = arg.strip_prefix("-@").or_else(|| arg.strip_prefix('@')) {
                let file_args = parse_response_file(Path::new(path))
                    .map_err(|_| Reject::BadResponseFile(path.to_string()))?;
                expanded.splice(i..=i, file_args);
                continue;
            }

            // NVCC option files are comma-separated response file lists.
            if self.guessed == GuessedCompiler::Nvcc
                && (arg == "-optf" || arg == "--options-file")
            {
                let list = expanded
                    .get(i + 1)
                    .ok_or_else(|| Reject::MissingArgument(arg.clone()))?
                    .clone();
                let mut file_args = Vec::new();
                for path in list.split(',') {
                    let parsed = parse_response_file(Path::new(path))
                        .map_err(|_| Reject::BadResponseFile(path.to_string()))?;
                    file_args.extend(parsed);
                }
                expanded.splice(i..=i + 1, file_args);
                continue;
            }

            if options::too_hard(&arg) || arg.starts_with("-fdump-") {
                return Err(Reject::UnsupportedOption(arg));
            }

            if modes.direct_mode && options::too_hard_for_direct(&arg) {
                debug!(option = %arg, "option unsupported in direct mode");
                modes.direct_mode = false;
            }

            if arg.starts_with("-Xarch_") {
                return Err(Reject::UnsupportedOption(arg));
            }

            if arg == "-arch" {
                if self.intent.arch_args.len() >= MAX_ARCH_ARGS {
                    return Err(Reject::TooManyArchArgs);
                }
                let operand = expanded
                    .get(i + 1)
                    .ok_or_else(|| Reject::MissingArgument(arg.clone()))?;
                self.intent.arch_args.push(operand.clone());
                if self.intent.arch_args.len() == 2 {
                    modes.run_second_cpp = true;
                }
                i += 2;
                continue;
            }

            // Options the preprocessor must not see.
            if options::affects_comp(&arg) {
                self.compiler_only.push(arg.clone());
                if options::takes_arg(&arg) {
                    let operand = expanded
                        .get(i + 1)
                        .ok_or_else(|| Reject::MissingArgument(arg.clone()))?;
                    self.compiler_only.push(operand.clone());
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }
            if options::prefix_affects_comp(&arg) {
                self.compiler_only.push(arg);
                i += 1;
                continue;
            }

            if arg == "-fpch-preprocess" || arg == "-emit-pch" || arg == "-emit-pth" {
                self.found_fpch_preprocess = true;
            }

            if arg == "-c" {
                self.intent.found_c = true;
                i += 1;
                continue;
            }

            // nvcc separable compilation implies -c.
            if (arg == "-dc" || arg == "--device-c") && self.guessed == GuessedCompiler::Nvcc {
                self.intent.found_dc = true;
                i += 1;
                continue;
            }

            if arg == "-S" {
                self.common.push(arg);
                self.intent.found_s = true;
                i += 1;
                continue;
            }

            // The last -x before the input file wins; all forms are
            // stripped here and re-added where each stage needs them.
            if arg == "-x" {
                let operand = expanded
                    .get(i + 1)
                    .ok_or_else(|| Reject::MissingArgument(arg.clone()))?;
                if self.intent.input_file.is_empty() {
                    self.explicit_language = Some(operand.clone());
                }
                i += 2;
                continue;
            }
            if let Some(lang) = arg.strip_prefix("-x") {
                if self.intent.input_file.is_empty() {
                    self.explicit_language = Some(lang.to_string());
                }
                i += 1;
                continue;
            }

            if arg == "-o" {
                let operand = expanded
                    .get(i + 1)
                    .ok_or_else(|| Reject::MissingArgument(arg.clone()))?;
                self.intent.output_obj = self.rel(operand);
                i += 2;
                continue;
            }
            if let Some(path) = arg.strip_prefix("-o") {
                if self.guessed != GuessedCompiler::Nvcc {
                    self.intent.output_obj = self.rel(path);
                    i += 1;
                    continue;
                }
            }

            if let Some(map) = arg
                .strip_prefix("-fdebug-prefix-map=")
                .or_else(|| arg.strip_prefix("-ffile-prefix-map="))
            {
                self.intent.debug_prefix_maps.push(map.to_string());
                self.common.push(arg);
                i += 1;
                continue;
            }

            // Debug level decides whether line info can be stripped and
            // whether the working directory lands in the object file.
            if arg.starts_with("-g") {
                self.common.push(arg.clone());
                if arg.starts_with("-gdwarf") {
                    self.intent.generating_debuginfo = true;
                } else if !arg.starts_with("-gz") {
                    match arg.as_bytes()[arg.len() - 1] {
                        b'0' => {
                            self.intent.generating_debuginfo = false;
                            self.intent.generating_debuginfo_level_3 = false;
                        }
                        last => {
                            self.intent.generating_debuginfo = true;
                            if last == b'3' {
                                self.intent.generating_debuginfo_level_3 = true;
                            }
                            if arg == "-gsplit-dwarf" {
                                self.intent.seen_split_dwarf = true;
                            }
                        }
                    }
                }
                i += 1;
                continue;
            }

            if arg == "-MD" || arg == "-MMD" {
                self.intent.generating_dependencies = true;
                self.dep.push(arg);
                i += 1;
                continue;
            }
            if let Some(rest) = arg.strip_prefix("-MF") {
                self.dependency_filename_specified = true;
                let (operand, consumed) = if rest.is_empty() {
                    let operand = expanded
                        .get(i + 1)
                        .ok_or_else(|| Reject::MissingArgument(arg.clone()))?;
                    (operand.clone(), 2)
                } else {
                    (rest.to_string(), 1)
                };
                let rel = self.rel(&operand);
                if consumed == 2 {
                    self.dep.push("-MF".to_string());
                    self.dep.push(rel.clone());
                } else {
                    self.dep.push(format!("-MF{rel}"));
                }
                self.intent.output_dep = Some(rel);
                i += consumed;
                continue;
            }
            let target_option = arg
                .strip_prefix("-MQ")
                .map(|rest| ("-MQ", rest))
                .or_else(|| arg.strip_prefix("-MT").map(|rest| ("-MT", rest)));
            if let Some((option, rest)) = target_option {
                self.dependency_target_specified = true;
                if rest.is_empty() {
                    let operand = expanded
                        .get(i + 1)
                        .ok_or_else(|| Reject::MissingArgument(arg.clone()))?;
                    let rel = self.rel(operand);
                    self.dep.push(option.to_string());
                    self.dep.push(rel);
                    i += 2;
                } else {
                    let rel = self.rel(rest);
                    self.dep.push(format!("{option}{rel}"));
                    i += 1;
                }
                continue;
            }

            if arg == "-fprofile-arcs" {
                self.intent.profile_arcs = true;
                self.common.push(arg);
                i += 1;
                continue;
            }
            if arg == "-ftest-coverage" {
                self.intent.generating_coverage = true;
                self.common.push(arg);
                i += 1;
                continue;
            }
            if arg == "-fstack-usage" {
                self.intent.generating_stackusage = true;
                self.common.push(arg);
                i += 1;
                continue;
            }
            if arg == "--coverage" || arg == "-coverage" {
                self.intent.profile_arcs = true;
                self.intent.generating_coverage = true;
                self.common.push(arg);
                i += 1;
                continue;
            }

            if let Some(value) = arg.strip_prefix("-fsanitize-blacklist=") {
                self.intent.sanitize_blacklists.push(value.to_string());
                self.common.push(arg);
                i += 1;
                continue;
            }

            if let Some(value) = arg.strip_prefix("--sysroot=") {
                let rel = self.rel(value);
                self.common.push(format!("--sysroot={rel}"));
                i += 1;
                continue;
            }
            if arg == "--sysroot" {
                let operand = expanded
                    .get(i + 1)
                    .ok_or_else(|| Reject::MissingArgument(arg.clone()))?;
                self.common.push(arg.clone());
                self.common.push(self.rel(operand));
                i += 2;
                continue;
            }
            if arg == "-target" {
                let operand = expanded
                    .get(i + 1)
                    .ok_or_else(|| Reject::MissingArgument(arg.clone()))?;
                self.common.push(arg.clone());
                self.common.push(operand.clone());
                i += 2;
                continue;
            }

            if arg.starts_with("-Wp,") {
                if arg == "-Wp,-P" || arg.contains(",-P,") || arg.ends_with(",-P") {
                    // -P strips linemarkers, so an object built from the
                    // preprocessed text would differ from a clean compile.
                    return Err(Reject::UnsupportedOption(arg));
                }
                if let Some(path) = arg
                    .strip_prefix("-Wp,-MD,")
                    .filter(|rest| !rest.contains(','))
                {
                    self.intent.generating_dependencies = true;
                    self.dependency_filename_specified = true;
                    self.intent.output_dep = Some(self.rel(path));
                    self.dep.push(arg.clone());
                    i += 1;
                    continue;
                }
                if let Some(path) = arg
                    .strip_prefix("-Wp,-MMD,")
                    .filter(|rest| !rest.contains(','))
                {
                    self.intent.generating_dependencies = true;
                    self.dependency_filename_specified = true;
                    self.intent.output_dep = Some(self.rel(path));
                    self.dep.push(arg.clone());
                    i += 1;
                    continue;
                }
                if let Some(rest) = arg.strip_prefix("-Wp,-D") {
                    if !rest.contains(',') {
                        // Treat it like a plain -D.
                        self.cpp.push(format!("-D{rest}"));
                        i += 1;
                        continue;
                    }
                }
                let is_dep_flag = arg == "-Wp,-MP"
                    || (arg.len() > 8
                        && arg.starts_with("-Wp,-M")
                        && arg.as_bytes()[7] == b','
                        && matches!(arg.as_bytes()[6], b'F' | b'Q' | b'T')
                        && !arg[8..].contains(','));
                if is_dep_flag {
                    self.dep.push(arg.clone());
                    i += 1;
                    continue;
                }
                if modes.direct_mode {
                    // -Wp, can smuggle arbitrary preprocessor options past
                    // the analyzer, so the direct tier cannot be trusted.
                    debug!(option = %arg, "option unsupported in direct mode");
                    modes.direct_mode = false;
                }
                self.cpp.push(arg);
                i += 1;
                continue;
            }
            if arg == "-MP" {
                self.dep.push(arg);
                i += 1;
                continue;
            }

            if arg.starts_with("-finput-charset=") {
                self.input_charset = Some(arg);
                i += 1;
                continue;
            }

            if arg == "--serialize-diagnostics" {
                let operand = expanded
                    .get(i + 1)
                    .ok_or_else(|| Reject::MissingArgument(arg.clone()))?;
                self.intent.generating_diagnostics = true;
                self.intent.output_dia = Some(self.rel(operand));
                i += 2;
                continue;
            }

            if arg.starts_with("-fprofile-") {
                if self.handle_profile_option(&arg)? {
                    i += 1;
                    continue;
                }
            }

            if matches!(
                arg.as_str(),
                "-fcolor-diagnostics"
                    | "-fno-color-diagnostics"
                    | "-fdiagnostics-color"
                    | "-fdiagnostics-color=always"
                    | "-fno-diagnostics-color"
                    | "-fdiagnostics-color=never"
            ) {
                self.common.push(arg);
                self.found_color_diagnostics = true;
                i += 1;
                continue;
            }
            if arg == "-fdiagnostics-color=auto" {
                if self.color_possible {
                    // Output is redirected through the cache, so auto would
                    // silently turn colors off.
                    self.common.push("-fdiagnostics-color=always".to_string());
                } else {
                    self.common.push(arg);
                }
                self.found_color_diagnostics = true;
                i += 1;
                continue;
            }

            if arg == "-fdirectives-only" {
                self.found_directives_only = true;
                i += 1;
                continue;
            }
            if arg == "-frewrite-includes" {
                self.found_rewrite_includes = true;
                i += 1;
                continue;
            }

            if self.config.sloppiness.clang_index_store && arg == "-index-store-path" {
                // Xcode passes a UUID-bearing path here; hashing it would
                // sink the hit rate for shared caches.
                if let Some(skipped) = expanded.get(i + 1) {
                    debug!(path = %skipped, "skipping -index-store-path");
                }
                i += 2;
                continue;
            }

            // Table-driven: options with a path operand worth normalizing.
            if options::takes_path(&arg) {
                let operand = expanded
                    .get(i + 1)
                    .ok_or_else(|| Reject::MissingArgument(arg.clone()))?
                    .clone();
                self.detect_pch(&arg, &operand)?;
                let rel = self.rel(&operand);
                if options::affects_cpp(&arg) {
                    self.cpp.push(arg);
                    self.cpp.push(rel);
                } else {
                    self.common.push(arg);
                    self.common.push(rel);
                }
                i += 2;
                continue;
            }

            // Same, with the operand concatenated after the option.
            if arg.starts_with('-') {
                if let Some(slash) = arg.find('/') {
                    let option = &arg[..slash];
                    if options::takes_concat_arg(option) && options::takes_path(option) {
                        let rel = self.rel(&arg[slash..]);
                        let rebuilt = format!("{option}{rel}");
                        if options::affects_cpp(option) {
                            self.cpp.push(rebuilt);
                        } else {
                            self.common.push(rebuilt);
                        }
                        i += 1;
                        continue;
                    }
                }
            }

            if options::takes_arg(&arg) {
                let operand = expanded
                    .get(i + 1)
                    .ok_or_else(|| Reject::MissingArgument(arg.clone()))?
                    .clone();
                if options::affects_cpp(&arg) {
                    self.cpp.push(arg);
                    self.cpp.push(operand);
                } else {
                    self.common.push(arg);
                    self.common.push(operand);
                }
                i += 2;
                continue;
            }

            if arg.starts_with('-') {
                if options::affects_cpp(&arg) || options::prefix_affects_cpp(&arg) {
                    self.cpp.push(arg);
                } else {
                    self.common.push(arg);
                }
                i += 1;
                continue;
            }

            // Not an option. Anything that isn't a plain file is assumed to
            // be some exotic option rather than an input; /dev/null is the
            // one non-regular input compilers legitimately get fed.
            let looks_like_input = arg == "/dev/null"
                || fs::metadata(&arg)
                    .map(|m| m.is_file())
                    .unwrap_or(false);
            if !looks_like_input {
                debug!(token = %arg, "not a regular file; treating as option");
                self.common.push(arg);
                i += 1;
                continue;
            }

            if !self.intent.input_file.is_empty() {
                return Err(if language_for_file(&arg).is_some() {
                    Reject::MultipleSourceFiles
                } else if !self.intent.found_c && !self.intent.found_dc {
                    if arg.contains("conftest.") {
                        Reject::AutoconfTest
                    } else {
                        Reject::CalledForLink
                    }
                } else {
                    Reject::UnsupportedSourceLanguage(arg)
                });
            }

            self.intent.input_file = if self.intent.generating_coverage {
                // The source path lands in the coverage notes verbatim.
                arg
            } else if fs::symlink_metadata(&arg)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false)
            {
                // Resolving a symlinked source would re-anchor relative
                // includes at the wrong directory.
                arg
            } else {
                self.rel(&arg)
            };
            i += 1;
        }
        Ok(())
    }

    /// Returns whether the option was consumed.
    fn handle_profile_option(&mut self, arg: &str) -> Result<bool, Reject> {
        let (stem, value) = match arg.find('=') {
            Some(eq) => (&arg[..eq], Some(&arg[eq + 1..])),
            None => (arg, None),
        };
        let supported = stem.starts_with("-fprofile-generate")
            || stem.starts_with("-fprofile-use")
            || stem == "-fprofile-dir";
        if !supported {
            debug!(option = %arg, "unknown profile option");
            return Ok(false);
        }

        // The real path gives a better hit rate when builds point at the
        // same profile directory through different spellings.
        let resolved = value.map(|v| {
            Path::new(v)
                .canonicalize()
                .map_or_else(|_| v.to_string(), |p| p.to_string_lossy().into_owned())
        });

        if stem.starts_with("-fprofile-generate") {
            self.intent.profile_generate = true;
        } else if stem.starts_with("-fprofile-use") {
            self.intent.profile_use = true;
        }

        match &resolved {
            Some(dir) => self.common.push(format!("{stem}={dir}")),
            None => self.common.push(arg.to_string()),
        }

        if let Some(dir) = resolved {
            if self.intent.profile_dir.is_some() {
                return Err(Reject::ProfileDirConflict);
            }
            self.intent.profile_dir = Some(dir);
        }
        Ok(true)
    }

    fn detect_pch(&mut self, option: &str, operand: &str) -> Result<(), Reject> {
        let pch_file = if option == "-include-pch" || option == "-include-pth" {
            Path::new(operand).is_file().then(|| operand.to_string())
        } else {
            [".gch", ".pch", ".pth"]
                .iter()
                .map(|ext| format!("{operand}{ext}"))
                .find(|candidate| Path::new(candidate).is_file())
        };

        if let Some(pch) = pch_file {
            debug!(path = %pch, "detected use of precompiled header");
            if let Some(existing) = &self.intent.included_pch_file {
                return Err(Reject::MultiplePrecompiledHeaders(existing.clone(), pch));
            }
            self.intent.included_pch_file = Some(pch);
            self.found_pch = true;
        }
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn finish(
        mut self,
        argv0: &str,
        modes: &mut ModeState,
    ) -> Result<(ProcessedArgs, CompileIntent), Reject> {
        if self.intent.generating_debuginfo_level_3 && !modes.run_second_cpp {
            debug!("generating debug info level 3; not compiling preprocessed code");
            modes.run_second_cpp = true;
        }

        // These env vars act like -MD/-MMD on GCC; rewrite their paths so
        // the compiler emits relative names too.
        self.absorb_dependency_env_vars();

        if self.intent.input_file.is_empty() {
            return Err(Reject::NoInputFile);
        }

        if self.found_pch || self.found_fpch_preprocess {
            self.intent.using_pch = true;
            if !self.config.sloppiness.time_macros {
                debug!("using a precompiled header requires time_macros sloppiness");
                return Err(Reject::PrecompiledHeaderSloppiness);
            }
        }

        if self.explicit_language.as_deref() == Some("none") {
            self.explicit_language = None;
        }
        let file_language = language_for_file(&self.intent.input_file);
        let actual_language = match &self.explicit_language {
            Some(lang) => {
                if !language_is_supported(lang) {
                    return Err(Reject::UnsupportedSourceLanguage(lang.clone()));
                }
                lang.clone()
            }
            None => match file_language {
                Some(lang) => lang.to_string(),
                None => {
                    return Err(Reject::UnsupportedSourceLanguage(
                        self.intent.input_file.clone(),
                    ))
                }
            },
        };

        self.intent.output_is_pch = actual_language.contains("-header");
        if self.intent.output_is_pch && !self.config.sloppiness.pch_defines {
            debug!("creating a precompiled header requires pch_defines,time_macros sloppiness");
            return Err(Reject::PrecompiledHeaderSloppiness);
        }

        if !self.intent.found_c && !self.intent.found_dc && !self.intent.found_s {
            if self.intent.output_is_pch {
                self.common.push("-c".to_string());
            } else if self.intent.input_file.contains("conftest.") {
                return Err(Reject::AutoconfTest);
            } else {
                return Err(Reject::CalledForLink);
            }
        }

        if !modes.run_second_cpp && actual_language == "cu" {
            debug!("CUDA compilation; not compiling preprocessed code");
            modes.run_second_cpp = true;
        }

        self.intent.direct_i_file = language_is_preprocessed(&actual_language);

        if self.intent.output_is_pch && !modes.run_second_cpp {
            // A .gch cannot be created from already-preprocessed source.
            modes.run_second_cpp = true;
        }

        let p_language = p_language_for_language(&actual_language)
            .ok_or_else(|| Reject::UnsupportedSourceLanguage(actual_language.clone()))?;
        self.intent.cpp_extension =
            crate::compiler::extension_for_p_language(p_language).to_string();
        self.intent.actual_language = actual_language;

        if self.intent.output_obj == "-" {
            return Err(Reject::OutputToStdout);
        }
        if self.intent.output_obj.is_empty() {
            self.intent.output_obj = if self.intent.output_is_pch {
                format!("{}.gch", self.intent.input_file)
            } else {
                let base = crate::compiler::basename(&self.intent.input_file);
                let ext = if self.intent.found_s { "s" } else { "o" };
                format!("{}.{ext}", without_extension(base))
            };
        }

        if self.intent.seen_split_dwarf {
            if extension_of(&self.intent.output_obj).len() < 2 {
                return Err(Reject::MalformedObjectName(self.intent.output_obj.clone()));
            }
            self.intent.output_dwo =
                Some(format!("{}.dwo", without_extension(&self.intent.output_obj)));
        }

        // Cope with -o /dev/null; otherwise the output must be a regular
        // file (or absent) inside an existing directory.
        if self.intent.output_obj != "/dev/null" {
            if let Ok(meta) = fs::metadata(&self.intent.output_obj) {
                if !meta.is_file() {
                    return Err(Reject::BadOutputFile(self.intent.output_obj.clone()));
                }
            }
            let dir = Path::new(&self.intent.output_obj)
                .parent()
                .map(|p| {
                    if p.as_os_str().is_empty() {
                        PathBuf::from(".")
                    } else {
                        p.to_path_buf()
                    }
                })
                .unwrap_or_else(|| PathBuf::from("."));
            if !dir.is_dir() {
                return Err(Reject::BadOutputFile(self.intent.output_obj.clone()));
            }
        }

        // Some options must not reach the compiler when it consumes
        // already-preprocessed code: charset conversion would run twice and
        // -x would select the wrong language.
        if let Some(charset) = self.input_charset.take() {
            self.cpp.push(charset);
        }
        if self.found_pch {
            self.cpp.push("-fpch-preprocess".to_string());
        }
        if let Some(lang) = &self.explicit_language {
            self.cpp.push("-x".to_string());
            self.cpp.push(lang.clone());
        }

        // Output is redirected, so compilers won't color on their own.
        if !self.found_color_diagnostics && self.color_possible {
            match self.guessed {
                GuessedCompiler::Clang => {
                    if self.intent.actual_language != "assembler" {
                        self.common.push("-fcolor-diagnostics".to_string());
                    }
                }
                GuessedCompiler::Gcc => {
                    if self
                        .env
                        .var("GCC_COLORS")
                        .is_some_and(|v| !v.is_empty())
                    {
                        self.common.push("-fdiagnostics-color".to_string());
                    }
                }
                _ => {}
            }
        }

        if self.intent.generating_dependencies {
            if !self.dependency_filename_specified {
                let default_dep = format!("{}.d", without_extension(&self.intent.output_obj));
                self.dep.push("-MF".to_string());
                self.dep.push(default_dep.clone());
                self.intent.output_dep = Some(self.rel(&default_dep));
            }
            let dep_ext = self
                .intent
                .output_dep
                .as_deref()
                .map(extension_of)
                .unwrap_or("");
            if !self.dependency_target_specified
                && !self.dependency_implicit_target_specified
                && dep_ext != ".o"
            {
                self.dep.push("-MQ".to_string());
                self.dep.push(self.intent.output_obj.clone());
            }
        }
        if self.intent.generating_coverage {
            let name = format!("{}.gcno", without_extension(&self.intent.output_obj));
            self.intent.output_cov = Some(self.rel(&name));
        }
        if self.intent.generating_stackusage {
            let name = format!("{}.su", without_extension(&self.intent.output_obj));
            self.intent.output_su = Some(self.rel(&name));
        }

        // Assemble the three derived command lines.
        let mut compiler_args = Vec::with_capacity(self.common.len() + 8);
        compiler_args.push(argv0.to_string());
        compiler_args.extend(self.common.iter().cloned());
        compiler_args.extend(self.compiler_only.iter().cloned());

        if modes.run_second_cpp {
            compiler_args.extend(self.cpp.iter().cloned());
        } else if self.found_directives_only || self.found_rewrite_includes {
            // The "preprocessed" source still carries directives that need
            // a second expansion pass.
            compiler_args.extend(self.cpp.iter().cloned());
            if self.found_directives_only {
                self.cpp.push("-fdirectives-only".to_string());
                compiler_args.push("-fpreprocessed".to_string());
                compiler_args.push("-fdirectives-only".to_string());
            }
            if self.found_rewrite_includes {
                self.cpp.push("-frewrite-includes".to_string());
                compiler_args.push("-x".to_string());
                compiler_args.push(self.intent.actual_language.clone());
            }
        } else if let Some(lang) = &self.explicit_language {
            // Distcc's patched driver does not reset -x, so spell out the
            // preprocessed language when one was given explicitly.
            if let Some(p) = p_language_for_language(lang) {
                compiler_args.push("-x".to_string());
                compiler_args.push(p.to_string());
            }
        }

        if self.intent.found_c {
            compiler_args.push("-c".to_string());
        }
        if self.intent.found_dc {
            compiler_args.push("-dc".to_string());
        }
        for arch in &self.intent.arch_args {
            compiler_args.push("-arch".to_string());
            compiler_args.push(arch.clone());
        }

        // Dependency options go only to the preprocessor line; some
        // compilers emit broken .d files when fed preprocessed source.
        let mut cpp_with_dep = self.cpp.clone();
        cpp_with_dep.extend(self.dep.iter().cloned());

        let mut preprocessor_args = Vec::with_capacity(self.common.len() + cpp_with_dep.len() + 1);
        preprocessor_args.push(argv0.to_string());
        preprocessor_args.extend(self.common.iter().cloned());
        preprocessor_args.extend(cpp_with_dep);

        Ok((
            ProcessedArgs {
                preprocessor_args,
                extra_args_to_hash: self.compiler_only,
                compiler_args,
            },
            self.intent,
        ))
    }

    fn absorb_dependency_env_vars(&mut self) {
        let (value, var_name) = match self.env.var("DEPENDENCIES_OUTPUT") {
            Some(v) => (v.to_string(), "DEPENDENCIES_OUTPUT"),
            None => match self.env.var("SUNPRO_DEPENDENCIES") {
                Some(v) => (v.to_string(), "SUNPRO_DEPENDENCIES"),
                None => return,
            },
        };
        self.intent.generating_dependencies = true;
        self.dependency_filename_specified = true;

        let mut parts = value.split_whitespace();
        let Some(file) = parts.next() else { return };
        let rel_file = self.rel(file);
        self.intent.output_dep = Some(rel_file.clone());

        let rewritten = if let Some(target) = parts.next() {
            self.dependency_target_specified = true;
            let rel_target = self.rel(target);
            format!("{rel_file} {rel_target}")
        } else {
            self.dependency_implicit_target_specified = true;
            rel_file
        };
        self.intent.rewritten_dep_env = Some((var_name, rewritten));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        config: Config,
        env: EnvSnapshot,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().canonicalize().unwrap();
            fs::write(root.join("a.c"), "int x;\n").unwrap();
            let env = EnvSnapshot::testing(&[("HOME", "/h")]);
            let config = Config::from_snapshot(&env).unwrap();
            Self {
                _dir: dir,
                root,
                config,
                env,
            }
        }

        fn path(&self, name: &str) -> String {
            self.root.join(name).to_string_lossy().into_owned()
        }

        fn analyze(
            &self,
            argv: &[&str],
        ) -> Result<(ProcessedArgs, CompileIntent, ModeState), Reject> {
            let argv: Vec<String> = argv.iter().map(ToString::to_string).collect();
            let mut modes = ModeState::from_config(&self.config);
            analyze_arguments(
                &argv,
                &self.config,
                &self.root,
                GuessedCompiler::Gcc,
                false,
                &self.env,
                &mut modes,
            )
            .map(|(args, intent)| (args, intent, modes))
        }
    }

    #[test]
    fn plain_compile_is_accepted() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        let output = fx.path("a.o");
        let (args, intent, _) = fx.analyze(&["gcc", "-c", &input, "-o", &output]).unwrap();

        assert!(intent.found_c);
        assert_eq!(intent.input_file, input);
        assert_eq!(intent.output_obj, output);
        assert_eq!(intent.actual_language, "c");
        assert_eq!(intent.cpp_extension, "i");
        assert_eq!(args.preprocessor_args, vec!["gcc".to_string()]);
        assert_eq!(args.compiler_args, vec!["gcc".to_string(), "-c".to_string()]);
        assert!(args.extra_args_to_hash.is_empty());
    }

    #[test]
    fn preprocessing_invocations_are_rejected() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        assert_eq!(
            fx.analyze(&["gcc", "-E", &input]),
            Err(Reject::CalledForPreprocessing)
        );
    }

    #[test]
    fn link_and_multiple_inputs_are_rejected() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        assert_eq!(
            fx.analyze(&["gcc", &input, "-o", &fx.path("a.out")]),
            Err(Reject::CalledForLink)
        );

        fs::write(fx.root.join("b.c"), "int y;\n").unwrap();
        let b = fx.path("b.c");
        assert_eq!(
            fx.analyze(&["gcc", "-c", &input, &b]),
            Err(Reject::MultipleSourceFiles)
        );
    }

    #[test]
    fn missing_input_and_stdout_output_are_rejected() {
        let fx = Fixture::new();
        assert_eq!(fx.analyze(&["gcc", "-c"]), Err(Reject::NoInputFile));

        let input = fx.path("a.c");
        assert_eq!(
            fx.analyze(&["gcc", "-c", &input, "-o", "-"]),
            Err(Reject::OutputToStdout)
        );
    }

    #[test]
    fn too_hard_options_are_rejected() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        assert!(matches!(
            fx.analyze(&["gcc", "-c", "-save-temps", &input]),
            Err(Reject::UnsupportedOption(_))
        ));
        assert!(matches!(
            fx.analyze(&["gcc", "-c", "-fdump-tree-all", &input]),
            Err(Reject::UnsupportedOption(_))
        ));
        assert!(matches!(
            fx.analyze(&["gcc", "-c", "-Xarch_x86_64", "-O2", &input]),
            Err(Reject::UnsupportedOption(_))
        ));
        assert!(matches!(
            fx.analyze(&["gcc", "-c", "-Wp,-P", &input]),
            Err(Reject::UnsupportedOption(_))
        ));
    }

    #[test]
    fn explicit_language_wins_over_extension() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        let (args, intent, _) = fx
            .analyze(&["gcc", "-c", "-x", "c++", &input, "-o", &fx.path("a.o")])
            .unwrap();
        assert_eq!(intent.actual_language, "c++");
        assert_eq!(intent.cpp_extension, "ii");
        // -x is re-added for the preprocessor command line.
        let cpp = &args.preprocessor_args;
        assert!(cpp.windows(2).any(|w| w[0] == "-x" && w[1] == "c++"));
    }

    #[test]
    fn unsupported_language_is_rejected() {
        let fx = Fixture::new();
        fs::write(fx.root.join("a.zig"), "x\n").unwrap();
        let input = fx.path("a.zig");
        assert!(matches!(
            fx.analyze(&["gcc", "-c", &input]),
            Err(Reject::UnsupportedSourceLanguage(_))
        ));
    }

    #[test]
    fn default_output_is_derived_from_input_stem() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        let (_, intent, _) = fx.analyze(&["gcc", "-c", &input]).unwrap();
        assert_eq!(intent.output_obj, "a.o");

        let (_, intent, _) = fx.analyze(&["gcc", "-S", &input]).unwrap();
        assert!(intent.found_s);
        assert_eq!(intent.output_obj, "a.s");
    }

    #[test]
    fn include_options_land_in_preprocessor_args_only_when_cpp2_off() {
        let fx = Fixture::new();
        let mut config = fx.config.clone();
        config.run_second_cpp = false;
        let input = fx.path("a.c");
        let argv: Vec<String> = ["gcc", "-c", "-I", "include", "-DX=1", &input]
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut modes = ModeState::from_config(&config);
        let (args, _) = analyze_arguments(
            &argv,
            &config,
            &fx.root,
            GuessedCompiler::Gcc,
            false,
            &fx.env,
            &mut modes,
        )
        .unwrap();

        assert!(args.preprocessor_args.contains(&"-I".to_string()));
        assert!(args.preprocessor_args.contains(&"-DX=1".to_string()));
        assert!(!args.compiler_args.contains(&"-I".to_string()));
        assert!(!args.compiler_args.contains(&"-DX=1".to_string()));
    }

    #[test]
    fn dependency_flags_stay_off_the_compiler_line() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        let output = fx.path("a.o");
        let (args, intent, _) = fx
            .analyze(&["gcc", "-c", "-MD", &input, "-o", &output])
            .unwrap();

        assert!(intent.generating_dependencies);
        let dep = intent.output_dep.unwrap();
        assert!(dep.ends_with("a.d"), "{dep}");
        assert!(args.preprocessor_args.contains(&"-MD".to_string()));
        assert!(!args.compiler_args.contains(&"-MD".to_string()));
        // No -MT/-MQ given and the depfile isn't *.o, so a -MQ is added.
        assert!(args.preprocessor_args.contains(&"-MQ".to_string()));
    }

    #[test]
    fn mf_operand_is_recorded_in_both_forms() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        let output = fx.path("a.o");
        let dep = fx.path("deps/x.d");
        fs::create_dir_all(fx.root.join("deps")).unwrap();

        let (_, intent, _) = fx
            .analyze(&["gcc", "-c", "-MD", "-MF", &dep, &input, "-o", &output])
            .unwrap();
        assert_eq!(intent.output_dep.as_deref(), Some(dep.as_str()));

        let concat = format!("-MF{dep}");
        let (_, intent, _) = fx
            .analyze(&["gcc", "-c", "-MD", &concat, &input, "-o", &output])
            .unwrap();
        assert_eq!(intent.output_dep.as_deref(), Some(dep.as_str()));
    }

    #[test]
    fn arch_args_are_capped_and_force_second_cpp() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        let output = fx.path("a.o");

        let mut config = fx.config.clone();
        config.run_second_cpp = false;
        let argv: Vec<String> = [
            "clang", "-c", "-arch", "x86_64", "-arch", "arm64", &input, "-o", &output,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        let mut modes = ModeState::from_config(&config);
        let (_, intent) = analyze_arguments(
            &argv,
            &config,
            &fx.root,
            GuessedCompiler::Clang,
            false,
            &fx.env,
            &mut modes,
        )
        .unwrap();
        assert_eq!(intent.arch_args, vec!["x86_64", "arm64"]);
        assert!(modes.run_second_cpp, "two -arch must force a second cpp");

        let mut argv = vec!["clang".to_string(), "-c".to_string()];
        for _ in 0..=MAX_ARCH_ARGS {
            argv.push("-arch".to_string());
            argv.push("x86_64".to_string());
        }
        argv.push(input.clone());
        let mut modes = ModeState::from_config(&fx.config);
        let result = analyze_arguments(
            &argv,
            &fx.config,
            &fx.root,
            GuessedCompiler::Clang,
            false,
            &fx.env,
            &mut modes,
        );
        assert_eq!(result.unwrap_err(), Reject::TooManyArchArgs);
    }

    #[test]
    fn response_files_expand_in_place() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        let output = fx.path("a.o");
        fs::write(fx.root.join("args.rsp"), format!("-c {input}")).unwrap();
        let rsp = format!("@{}", fx.path("args.rsp"));

        let (_, intent, _) = fx.analyze(&["gcc", &rsp, "-o", &output]).unwrap();
        assert!(intent.found_c);
        assert_eq!(intent.input_file, input);

        assert!(matches!(
            fx.analyze(&["gcc", "@/definitely/not/there.rsp", "-c", &input]),
            Err(Reject::BadResponseFile(_))
        ));
    }

    #[test]
    fn ccache_skip_swallows_exactly_one_token() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        let output = fx.path("a.o");
        let (args, _, _) = fx
            .analyze(&[
                "gcc",
                "--ccache-skip",
                "-unsupported-option",
                "-c",
                &input,
                "-o",
                &output,
            ])
            .unwrap();
        assert!(args
            .compiler_args
            .contains(&"-unsupported-option".to_string()));

        assert!(matches!(
            fx.analyze(&["gcc", "-c", &input, "--ccache-skip"]),
            Err(Reject::MissingArgument(_))
        ));
    }

    #[test]
    fn debug_flags_set_debuginfo_and_split_dwarf() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        let output = fx.path("a.o");

        let (_, intent, _) = fx
            .analyze(&["gcc", "-c", "-g", &input, "-o", &output])
            .unwrap();
        assert!(intent.generating_debuginfo);
        assert!(!intent.generating_debuginfo_level_3);

        let (_, intent, _) = fx
            .analyze(&["gcc", "-c", "-g3", &input, "-o", &output])
            .unwrap();
        assert!(intent.generating_debuginfo_level_3);

        let (_, intent, _) = fx
            .analyze(&["gcc", "-c", "-g0", &input, "-o", &output])
            .unwrap();
        assert!(!intent.generating_debuginfo);

        let (_, intent, _) = fx
            .analyze(&["gcc", "-c", "-gsplit-dwarf", &input, "-o", &output])
            .unwrap();
        assert!(intent.seen_split_dwarf);
        let dwo = intent.output_dwo.unwrap();
        assert!(dwo.ends_with("a.dwo"), "{dwo}");
    }

    #[test]
    fn pch_use_requires_time_macros_sloppiness() {
        let fx = Fixture::new();
        fs::write(fx.root.join("pre.h"), "#define P 1\n").unwrap();
        File::create(fx.root.join("pre.h.gch")).unwrap();
        let header = fx.path("pre.h");
        let input = fx.path("a.c");
        let output = fx.path("a.o");

        assert_eq!(
            fx.analyze(&["gcc", "-c", "-include", &header, &input, "-o", &output]),
            Err(Reject::PrecompiledHeaderSloppiness)
        );

        let mut config = fx.config.clone();
        config.sloppiness.time_macros = true;
        let argv: Vec<String> = ["gcc", "-c", "-include", &header, &input, "-o", &output]
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut modes = ModeState::from_config(&config);
        let (_, intent) = analyze_arguments(
            &argv,
            &config,
            &fx.root,
            GuessedCompiler::Gcc,
            false,
            &fx.env,
            &mut modes,
        )
        .unwrap();
        assert!(intent.using_pch);
        assert_eq!(
            intent.included_pch_file.as_deref(),
            Some(format!("{header}.gch").as_str())
        );
    }

    #[test]
    fn output_in_missing_directory_is_rejected() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        let output = fx.path("no/such/dir/a.o");
        assert!(matches!(
            fx.analyze(&["gcc", "-c", &input, "-o", &output]),
            Err(Reject::BadOutputFile(_))
        ));
    }

    #[test]
    fn base_dir_relativizes_input_and_include_paths() {
        let fx = Fixture::new();
        let mut config = fx.config.clone();
        config.base_dir = fx.root.to_string_lossy().into_owned();
        fs::create_dir_all(fx.root.join("include")).unwrap();
        let input = fx.path("a.c");
        let include = fx.path("include");
        let output = fx.path("a.o");

        let argv: Vec<String> = ["gcc", "-c", "-I", &include, &input, "-o", &output]
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut modes = ModeState::from_config(&config);
        let (args, intent) = analyze_arguments(
            &argv,
            &config,
            &fx.root,
            GuessedCompiler::Gcc,
            false,
            &fx.env,
            &mut modes,
        )
        .unwrap();
        assert_eq!(intent.input_file, "a.c");
        assert_eq!(intent.output_obj, "a.o");
        let cpp = &args.preprocessor_args;
        assert!(cpp.windows(2).any(|w| w[0] == "-I" && w[1] == "include"));
    }

    #[test]
    fn dependency_env_var_is_absorbed_and_rewritten() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        let output = fx.path("a.o");
        let env = EnvSnapshot::testing(&[("HOME", "/h"), ("DEPENDENCIES_OUTPUT", "deps.d")]);
        let argv: Vec<String> = ["gcc", "-c", &input, "-o", &output]
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut modes = ModeState::from_config(&fx.config);
        let (_, intent) = analyze_arguments(
            &argv,
            &fx.config,
            &fx.root,
            GuessedCompiler::Gcc,
            false,
            &env,
            &mut modes,
        )
        .unwrap();
        assert!(intent.generating_dependencies);
        assert_eq!(intent.output_dep.as_deref(), Some("deps.d"));
        let (var, value) = intent.rewritten_dep_env.unwrap();
        assert_eq!(var, "DEPENDENCIES_OUTPUT");
        assert_eq!(value, "deps.d");
    }

    #[test]
    fn wp_md_forms_set_dependency_output() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        let output = fx.path("a.o");
        let (args, intent, _) = fx
            .analyze(&["gcc", "-c", "-Wp,-MD,x.d", &input, "-o", &output])
            .unwrap();
        assert!(intent.generating_dependencies);
        assert_eq!(intent.output_dep.as_deref(), Some("x.d"));
        assert!(args.preprocessor_args.contains(&"-Wp,-MD,x.d".to_string()));
    }

    #[test]
    fn wp_passthrough_disables_direct_mode() {
        let fx = Fixture::new();
        let input = fx.path("a.c");
        let output = fx.path("a.o");
        let argv: Vec<String> = ["gcc", "-c", "-Wp,-ansi", &input, "-o", &output]
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut modes = ModeState::from_config(&fx.config);
        assert!(modes.direct_mode);
        analyze_arguments(
            &argv,
            &fx.config,
            &fx.root,
            GuessedCompiler::Gcc,
            false,
            &fx.env,
            &mut modes,
        )
        .unwrap();
        assert!(!modes.direct_mode);
    }

    #[test]
    fn preprocessed_input_sets_direct_i_file() {
        let fx = Fixture::new();
        fs::write(fx.root.join("a.i"), "int x;\n").unwrap();
        let input = fx.path("a.i");
        let output = fx.path("a.o");
        let (_, intent, _) = fx.analyze(&["gcc", "-c", &input, "-o", &output]).unwrap();
        assert!(intent.direct_i_file);
        assert_eq!(intent.actual_language, "cpp-output");
    }
}
