//! Reasons the wrapper declines to cache an invocation.
//!
//! None of these is fatal: the orchestrator records the matching statistics
//! counter and hands the command to the real compiler unchanged. The one
//! principle that outranks every optimization here is that a caching
//! decision must never break a build.

use crate::stats::Counter;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Reject {
    #[error("called for preprocessing (-E)")]
    CalledForPreprocessing,
    #[error("unsupported compiler option {0}")]
    UnsupportedOption(String),
    #[error("multiple source files")]
    MultipleSourceFiles,
    #[error("called for link")]
    CalledForLink,
    #[error("autoconf compile/link test")]
    AutoconfTest,
    #[error("no input file")]
    NoInputFile,
    #[error("unsupported source language for {0}")]
    UnsupportedSourceLanguage(String),
    #[error("missing argument to {0}")]
    MissingArgument(String),
    #[error("couldn't read response file {0}")]
    BadResponseFile(String),
    #[error("too many -arch options")]
    TooManyArchArgs,
    #[error("output to stdout")]
    OutputToStdout,
    #[error("bad output file {0}")]
    BadOutputFile(String),
    #[error("badly formed object filename {0}")]
    MalformedObjectName(String),
    #[error("multiple precompiled headers: {0} and {1}")]
    MultiplePrecompiledHeaders(String, String),
    #[error("precompiled header used without the required sloppiness")]
    PrecompiledHeaderSloppiness,
    #[error("profile directory specified twice")]
    ProfileDirConflict,
    #[error("unsupported .incbin assembler directive")]
    UnsupportedDirective,
    #[error("preprocessor gave exit status {0}")]
    PreprocessorFailed(i32),
    #[error("compiler produced stdout")]
    CompilerProducedStdout,
    #[error("compiler produced no object file")]
    CompilerProducedNoOutput,
    #[error("compiler produced an empty object file")]
    CompilerProducedEmptyOutput,
    #[error("read-only mode")]
    ReadOnly,
    #[error("cache miss in read-only direct mode")]
    ReadOnlyDirect,
    #[error("cached result unusable: {0}")]
    MissingCacheFile(String),
    #[error("error hashing extra file {0}")]
    BadExtraFile(String),
    #[error("caching disabled")]
    Disabled,
    #[error("transient I/O failure: {0}")]
    Io(String),
}

impl Reject {
    /// The statistics counter this fall-through is accounted under.
    #[must_use]
    pub fn counter(&self) -> Counter {
        match self {
            Self::CalledForPreprocessing => Counter::CalledForPreprocessing,
            Self::UnsupportedOption(_) | Self::TooManyArchArgs => {
                Counter::UnsupportedCompilerOption
            }
            Self::MultipleSourceFiles => Counter::MultipleSourceFiles,
            Self::CalledForLink => Counter::CalledForLink,
            Self::AutoconfTest => Counter::AutoconfTest,
            Self::NoInputFile => Counter::NoInputFile,
            Self::UnsupportedSourceLanguage(_) => Counter::UnsupportedSourceLanguage,
            Self::MissingArgument(_)
            | Self::BadResponseFile(_)
            | Self::MultiplePrecompiledHeaders(_, _)
            | Self::MalformedObjectName(_)
            | Self::ProfileDirConflict => Counter::BadCompilerArguments,
            Self::OutputToStdout => Counter::OutputToStdout,
            Self::BadOutputFile(_) => Counter::BadOutputFile,
            Self::PrecompiledHeaderSloppiness => Counter::CouldNotUsePrecompiledHeader,
            Self::UnsupportedDirective => Counter::UnsupportedCodeDirective,
            Self::PreprocessorFailed(_) => Counter::PreprocessorError,
            Self::CompilerProducedStdout => Counter::CompilerProducedStdout,
            Self::CompilerProducedNoOutput => Counter::CompilerProducedNoOutput,
            Self::CompilerProducedEmptyOutput => Counter::CompilerProducedEmptyOutput,
            Self::ReadOnly | Self::ReadOnlyDirect | Self::Disabled => Counter::CacheMiss,
            Self::MissingCacheFile(_) => Counter::MissingCacheFile,
            Self::BadExtraFile(_) => Counter::ErrorHashingExtraFile,
            Self::Io(_) => Counter::InternalError,
        }
    }
}
