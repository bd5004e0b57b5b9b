//! Environment-driven configuration.
//!
//! The wrapper reads its knobs once at startup into an immutable [`Config`].
//! Mode bits that the pipeline may retract mid-compilation (direct mode,
//! second preprocessor pass, depend mode) are copied into the per-compilation
//! context instead of being mutated here.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Snapshot of the process environment taken at startup.
#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    #[must_use]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Boolean knob: set and not one of `0`, `false`, `""`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        match self.vars.get(key).map(String::as_str) {
            None | Some("" | "0" | "false") => false,
            Some(_) => true,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// The "be less strict" toggles the user opts into to trade safety for hit
/// rate. Parsed from the comma-separated `CCACHE_SLOPPINESS` list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sloppiness {
    pub include_file_mtime: bool,
    pub include_file_ctime: bool,
    pub time_macros: bool,
    pub pch_defines: bool,
    pub file_stat_matches: bool,
    pub file_stat_matches_ctime: bool,
    pub system_headers: bool,
    pub clang_index_store: bool,
    pub locale: bool,
    pub file_macro: bool,
}

impl Sloppiness {
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        let mut out = Self::default();
        for word in spec.split([',', ' ']).filter(|w| !w.is_empty()) {
            match word {
                "include_file_mtime" => out.include_file_mtime = true,
                "include_file_ctime" => out.include_file_ctime = true,
                "time_macros" => out.time_macros = true,
                "pch_defines" => out.pch_defines = true,
                "file_stat_matches" => out.file_stat_matches = true,
                "file_stat_matches_ctime" => out.file_stat_matches_ctime = true,
                "system_headers" | "no_system_headers" => out.system_headers = true,
                "clang_index_store" => out.clang_index_store = true,
                "locale" => out.locale = true,
                "file_macro" => out.file_macro = true,
                _ => tracing::warn!(sloppiness = word, "ignoring unknown sloppiness"),
            }
        }
        out
    }
}

/// How the compiler binary itself contributes to the hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerCheck {
    /// Trust the compiler blindly.
    None,
    /// Hash the binary's size and mtime.
    Mtime,
    /// Hash the binary's content.
    Content,
    /// Hash a fixed, user-provided string.
    String(String),
    /// Hash the output of running this command, `%compiler%` substituted.
    Command(String),
}

impl CompilerCheck {
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        match spec {
            "none" => Self::None,
            "mtime" => Self::Mtime,
            "content" => Self::Content,
            _ => match spec.strip_prefix("string:") {
                Some(s) => Self::String(s.to_string()),
                None => Self::Command(spec.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    /// Absolute prefix under which paths are rewritten relative to the
    /// working directory; empty disables the rewrite.
    pub base_dir: String,
    /// Explicit compiler override (`CCACHE_CC`).
    pub compiler: Option<String>,
    pub compiler_check: CompilerCheck,
    pub sloppiness: Sloppiness,
    pub disable: bool,
    pub read_only: bool,
    pub read_only_direct: bool,
    pub recache: bool,
    pub depend_mode: bool,
    pub direct_mode: bool,
    pub run_second_cpp: bool,
    pub keep_comments_cpp: bool,
    pub hash_dir: bool,
    pub compression: bool,
    pub compression_level: i32,
    pub extra_files_to_hash: Vec<PathBuf>,
    pub ignore_headers_in_manifest: Vec<String>,
    pub debug: bool,
    pub temporary_dir: PathBuf,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when no cache directory can be determined.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(env: &EnvSnapshot) -> anyhow::Result<Self> {
        let cache_dir = match env.var("CCACHE_DIR") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                let home = env
                    .var("HOME")
                    .ok_or_else(|| anyhow::anyhow!("neither CCACHE_DIR nor HOME is set"))?;
                PathBuf::from(home).join(".rcache")
            }
        };

        let base_dir = env.var("CCACHE_BASEDIR").unwrap_or("").to_string();
        if !base_dir.is_empty() && !base_dir.starts_with('/') {
            anyhow::bail!("CCACHE_BASEDIR must be an absolute path: {base_dir}");
        }

        let temporary_dir = match env.var("CCACHE_TEMPDIR") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => cache_dir.join("tmp"),
        };

        let compression_level = env
            .var("CCACHE_COMPRESSLEVEL")
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(1);

        Ok(Self {
            cache_dir,
            base_dir,
            compiler: env
                .var("CCACHE_CC")
                .filter(|v| !v.is_empty())
                .map(ToOwned::to_owned),
            compiler_check: CompilerCheck::parse(env.var("CCACHE_COMPILERCHECK").unwrap_or("mtime")),
            sloppiness: Sloppiness::parse(env.var("CCACHE_SLOPPINESS").unwrap_or("")),
            disable: env.flag("CCACHE_DISABLE"),
            read_only: env.flag("CCACHE_READONLY"),
            read_only_direct: env.flag("CCACHE_READONLY_DIRECT"),
            recache: env.flag("CCACHE_RECACHE"),
            depend_mode: env.flag("CCACHE_DEPEND"),
            direct_mode: !env.flag("CCACHE_NODIRECT"),
            run_second_cpp: !env.flag("CCACHE_NOCPP2") || env.flag("CCACHE_CPP2"),
            keep_comments_cpp: env.flag("CCACHE_COMMENTS"),
            hash_dir: !env.flag("CCACHE_NOHASHDIR") || env.flag("CCACHE_HASHDIR"),
            compression: !env.flag("CCACHE_NOCOMPRESS") || env.flag("CCACHE_COMPRESS"),
            compression_level,
            extra_files_to_hash: env
                .var("CCACHE_EXTRAFILES")
                .unwrap_or("")
                .split(':')
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect(),
            ignore_headers_in_manifest: env
                .var("CCACHE_IGNOREHEADERS")
                .unwrap_or("")
                .split(':')
                .filter(|p| !p.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
            debug: env.flag("CCACHE_DEBUG"),
            temporary_dir,
        })
    }
}
