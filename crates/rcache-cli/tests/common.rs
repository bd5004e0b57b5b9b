#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use tempfile::TempDir;

/// A build tree with a fake compiler, a cache directory, and an invocation
/// log the fake compiler appends to.
pub struct Lab {
    _dir: TempDir,
    pub root: PathBuf,
    pub cache: PathBuf,
    pub cc: PathBuf,
    pub log: PathBuf,
}

impl Lab {
    /// Creates the lab with the fake compiler installed.
    ///
    /// # Panics
    /// Panics when the temporary tree cannot be set up.
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("rcache-test")
            .tempdir()
            .expect("tempdir");
        let root = dir.path().canonicalize().expect("canonicalize");
        let cache = root.join("cache");
        let cc = root.join("fakecc");
        let log = root.join("cc.log");
        fs::write(&cc, FAKE_CC).expect("write fake compiler");
        make_executable(&cc);
        Self {
            _dir: dir,
            root,
            cache,
            cc,
            log,
        }
    }

    /// The wrapper, pre-wired to this lab's cache and compiler log.
    #[must_use]
    pub fn wrapper(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("rcache");
        cmd.env_clear()
            .env("PATH", std::env::var("PATH").unwrap_or_default())
            .env("CCACHE_DIR", &self.cache)
            .env("FAKECC_LOG", &self.log)
            .current_dir(&self.root);
        cmd
    }

    #[must_use]
    pub fn cc_str(&self) -> String {
        self.cc.to_string_lossy().into_owned()
    }

    pub fn write_source(&self, name: &str, content: &str) {
        fs::write(self.root.join(name), content).expect("write source");
    }

    /// How many real compiles / preprocessor runs the fake compiler saw.
    #[must_use]
    pub fn log_count(&self, marker: &str) -> usize {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .filter(|line| *line == marker)
            .count()
    }

    /// Every cache file with the given extension.
    #[must_use]
    pub fn cache_files(&self, extension: &str) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let Ok(entries) = fs::read_dir(&self.cache) else {
            return found;
        };
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            if let Ok(inner) = fs::read_dir(entry.path()) {
                for file in inner.flatten() {
                    let path = file.path();
                    if path.extension().is_some_and(|e| e == extension) {
                        found.push(path);
                    }
                }
            }
        }
        found
    }

    /// Pushes a file's mtime into the past so it doesn't look like it was
    /// written mid-compilation (stat has 1-second granularity).
    pub fn age(&self, name: &str) {
        let file = fs::File::options()
            .write(true)
            .open(self.root.join(name))
            .expect("open for aging");
        file.set_modified(SystemTime::now() - Duration::from_secs(30))
            .expect("set mtime");
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

/// Just enough of a C compiler for the wrapper to drive: `-E` expands
/// `#include "..."` one level and emits GCC-style linemarkers, `-c` writes
/// a deterministic object file (and a `.d` file under `-MD`), anything
/// else links. Controlled through FAKECC_* environment variables.
const FAKE_CC: &str = r##"#!/bin/sh
mode=""
out=""
src=""
md=""
dep=""
expect_out=""
expect_dep=""
skip=""
for a in "$@"; do
  if [ -n "$expect_out" ]; then out="$a"; expect_out=""; continue; fi
  if [ -n "$expect_dep" ]; then dep="$a"; expect_dep=""; continue; fi
  if [ -n "$skip" ]; then skip=""; continue; fi
  case "$a" in
    -E) mode="E";;
    -c) mode="c";;
    -o) expect_out=1;;
    -MD) md=1;;
    -MF) expect_dep=1;;
    -MF*) dep="${a#-MF}";;
    -MQ|-MT|-I|-include|-arch|-x) skip=1;;
    -*) ;;
    *) src="$a";;
  esac
done

log() {
  if [ -n "$FAKECC_LOG" ]; then echo "$1" >> "$FAKECC_LOG"; fi
}

write_depfile() {
  if [ -z "$md" ]; then return; fi
  if [ -z "$dep" ]; then dep="${src%.*}.d"; fi
  deps="$src"
  for h in $(sed -n 's/#include "\(.*\)"/\1/p' "$src"); do
    deps="$deps $h"
  done
  echo "${src%.*}.o: $deps" > "$dep"
}

if [ "$mode" = "E" ]; then
  log cpp
  write_depfile
  echo "# 1 \"$src\""
  while IFS= read -r line; do
    case "$line" in
      "#include \""*"\"")
        h="${line#\#include \"}"
        h="${h%\"}"
        echo "# 1 \"$h\" 1"
        cat "$h"
        echo "# 2 \"$src\" 2"
        ;;
      *) printf '%s\n' "$line" ;;
    esac
  done < "$src"
  exit 0
fi

if [ "$mode" = "c" ]; then
  log compile
  if [ -n "$FAKECC_FAIL" ]; then
    echo "fakecc: error: induced failure" >&2
    exit "$FAKECC_FAIL"
  fi
  if [ -n "$FAKECC_WARN" ]; then
    echo "fakecc: warning: $FAKECC_WARN" >&2
  fi
  if [ -z "$out" ]; then out="${src%.*}.o"; fi
  {
    echo "OBJ"
    cat "$src"
  } > "$out"
  write_depfile
  exit 0
fi

log link
if [ -z "$out" ]; then out="a.out"; fi
echo "LINKED" > "$out"
exit 0
"##;
