//! Compiler identity and source-language tables.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

/// What kind of compiler the wrapper believes it is fronting, derived from
/// the executable basename. The few behavioral differences (linker-flag
/// hashing, CUDA option files, distcc-pump banners) key off this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessedCompiler {
    Gcc,
    Clang,
    Nvcc,
    Pump,
    Unknown,
}

impl GuessedCompiler {
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let base = basename(path);
        if base.contains("clang") {
            Self::Clang
        } else if base.contains("gcc") || base.contains("g++") {
            Self::Gcc
        } else if base.contains("nvcc") {
            Self::Nvcc
        } else if base == "pump" || base == "distcc-pump" {
            Self::Pump
        } else {
            Self::Unknown
        }
    }

    /// Clang warns about unused linker flags, so `-L`/`-Wl,` must stay in
    /// the hash for it; an unidentified compiler gets the same caution.
    #[must_use]
    pub fn treat_as_clang(self) -> bool {
        matches!(self, Self::Clang | Self::Unknown)
    }
}

#[must_use]
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Resolve the real compiler on PATH, refusing to resolve back to the
/// wrapper itself (which would recurse forever).
///
/// # Errors
///
/// Fails when nothing but the wrapper matches the name.
pub fn find_compiler(name: &str) -> Result<PathBuf> {
    if name.contains('/') {
        return Ok(PathBuf::from(name));
    }
    let own = env::current_exe().ok().and_then(|p| p.canonicalize().ok());
    for candidate in which::which_all(name)
        .map_err(|err| anyhow!("could not find compiler \"{name}\" in PATH: {err}"))?
    {
        let resolved = candidate.canonicalize().unwrap_or_else(|_| candidate.clone());
        if own.as_deref() == Some(resolved.as_path()) {
            continue;
        }
        return Ok(candidate);
    }
    Err(anyhow!(
        "recursive invocation: \"{name}\" resolves back to the wrapper"
    ))
}

/// Language deduced from a file extension, or `None` for extensions the
/// wrapper does not understand.
#[must_use]
pub fn language_for_file(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?;
    let lang = match ext {
        "c" => "c",
        "C" | "cc" | "CC" | "cp" | "CP" | "cpp" | "CPP" | "cxx" | "CXX" | "c++" | "C++" => "c++",
        "m" => "objective-c",
        "M" | "mm" => "objective-c++",
        "cu" => "cu",
        "sx" | "S" => "assembler-with-cpp",
        "s" => "assembler",
        "i" => "cpp-output",
        "ii" => "c++-cpp-output",
        "mi" => "objective-c-cpp-output",
        "mii" => "objective-c++-cpp-output",
        "h" => "c-header",
        "H" | "hh" | "HH" | "h++" | "H++" | "hp" | "HP" | "hpp" | "HPP" | "hxx" | "HXX"
        | "tcc" | "TCC" => "c++-header",
        _ => return None,
    };
    Some(lang)
}

#[must_use]
pub fn language_is_supported(language: &str) -> bool {
    p_language_for_language(language).is_some()
}

/// Whether sources in this language are already preprocessed, letting the
/// wrapper skip the `-E` pass and hash the input directly.
#[must_use]
pub fn language_is_preprocessed(language: &str) -> bool {
    language == "assembler" || language.ends_with("cpp-output")
}

/// The language the preprocessor's output is in.
#[must_use]
pub fn p_language_for_language(language: &str) -> Option<&'static str> {
    let p = match language {
        "c" | "c-header" | "cpp-output" => "cpp-output",
        "c++" | "c++-header" | "c++-cpp-output" => "c++-cpp-output",
        "objective-c" | "objective-c-header" | "objective-c-cpp-output" => {
            "objective-c-cpp-output"
        }
        "objective-c++" | "objective-c++-header" | "objective-c++-cpp-output" => {
            "objective-c++-cpp-output"
        }
        "cu" => "cpp-output",
        "assembler-with-cpp" | "assembler" => "assembler",
        _ => return None,
    };
    Some(p)
}

/// Extension (without the dot) used for preprocessed output files.
#[must_use]
pub fn extension_for_p_language(p_language: &str) -> &'static str {
    match p_language {
        "c++-cpp-output" => "ii",
        "objective-c-cpp-output" => "mi",
        "objective-c++-cpp-output" => "mii",
        "assembler" => "s",
        _ => "i",
    }
}
