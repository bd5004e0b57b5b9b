//! Spawning the preprocessor and the real compiler.
//!
//! Child output is redirected to files rather than pipes: stdout and stderr
//! become cacheable artifacts, and the wrapper itself must never interleave
//! with them. The child's pid is published for the fatal-signal handler.

use std::fs::File;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result};

use crate::tmpfiles;

/// Run `argv`, sending stdout/stderr to the given files. Returns the exit
/// code (-1 when the child died to a signal).
///
/// `strip_dep_env` removes `DEPENDENCIES_OUTPUT`/`SUNPRO_DEPENDENCIES` for
/// this child: the real compile consumes preprocessed text from the cache's
/// temp directory and would otherwise record a dependency on it. The
/// preprocessor child keeps the vars so env-driven dependency files are
/// still produced.
///
/// # Errors
///
/// Returns an error when the child cannot be spawned or the redirect files
/// cannot be created.
pub fn execute_to_files(
    argv: &[String],
    stdout_path: &Path,
    stderr_path: &Path,
    strip_dep_env: bool,
) -> Result<i32> {
    let (program, args) = argv
        .split_first()
        .context("empty command line")?;
    let stdout = File::create(stdout_path)
        .with_context(|| format!("failed to create {}", stdout_path.display()))?;
    let stderr = File::create(stderr_path)
        .with_context(|| format!("failed to create {}", stderr_path.display()))?;

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    if strip_dep_env {
        command
            .env_remove("DEPENDENCIES_OUTPUT")
            .env_remove("SUNPRO_DEPENDENCIES");
    }
    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;

    tmpfiles::set_child_pid(child.id());
    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;
    tmpfiles::clear_child_pid();
    Ok(status.code().unwrap_or(-1))
}

/// Capture a helper command's output (compiler check commands).
///
/// # Errors
///
/// Returns an error when the program cannot be spawned.
pub fn capture_output(program: &str, args: &[String]) -> Result<Output> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to start {program}"))
}

/// Strip wrapper-private tokens before handing argv to the real compiler.
#[must_use]
pub fn strip_wrapper_args(argv: &[String]) -> Vec<String> {
    argv.iter()
        .filter(|arg| !arg.starts_with("--ccache-"))
        .cloned()
        .collect()
}

/// Replace this process with the real compiler (the fallthrough path).
/// On Unix this does not return on success.
///
/// # Errors
///
/// Returns an error when `exec` fails (e.g. the compiler is missing).
#[cfg(unix)]
pub fn exec_fallthrough(argv: &[String]) -> Result<i32> {
    use std::os::unix::process::CommandExt;
    let argv = strip_wrapper_args(argv);
    let (program, args) = argv
        .split_first()
        .context("empty command line")?;
    let err = Command::new(program).args(args).exec();
    Err(err).with_context(|| format!("failed to exec {program}"))
}

#[cfg(not(unix))]
pub fn exec_fallthrough(argv: &[String]) -> Result<i32> {
    let argv = strip_wrapper_args(argv);
    let (program, args) = argv
        .split_first()
        .context("empty command line")?;
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("failed to start {program}"))?;
    Ok(status.code().unwrap_or(-1))
}

/// Duplicate stderr and export `UNCACHED_ERR_FD` so child processes can
/// emit diagnostics that must bypass the cache.
#[cfg(unix)]
pub fn export_uncached_err_fd() -> Result<()> {
    // Safety: dup(2) on a known-valid descriptor. The descriptor is
    // intentionally inherited by children for the rest of the process
    // lifetime.
    let fd = unsafe { libc::dup(2) };
    if fd == -1 {
        return Err(std::io::Error::last_os_error()).context("dup(2) failed");
    }
    std::env::set_var("UNCACHED_ERR_FD", fd.to_string());
    Ok(())
}

#[cfg(not(unix))]
pub fn export_uncached_err_fd() -> Result<()> {
    Ok(())
}

/// Whether stderr is a terminal that supports color.
#[must_use]
pub fn color_output_possible(term: Option<&str>) -> bool {
    stderr_is_tty() && term.is_some_and(|t| !t.eq_ignore_ascii_case("dumb"))
}

#[cfg(unix)]
fn stderr_is_tty() -> bool {
    // Safety: isatty is async-signal-safe and has no preconditions.
    unsafe { libc::isatty(2) == 1 }
}

#[cfg(not(unix))]
fn stderr_is_tty() -> bool {
    false
}
