//! The result store: one container file per result key, holding the named
//! artifacts of a compilation (`.o`, `.d`, `.gcno`, `.su`, `.dia`, `.dwo`,
//! captured stderr).
//!
//! Same envelope discipline as the manifest: big-endian integers, magic
//! `cCrS`, version byte, compression byte, total uncompressed length, and
//! an xxh64 epilogue over header+body. Writes land in a temporary sibling
//! and are renamed into place; concurrent writers race benignly (last
//! writer wins, both wrote identical content).
//!
//! ```text
//! header : magic "cCrS" (4B) | version (1B) | compr_type (1B)
//!          | compr_level (1B) | content_len (8B)
//! body   : n_entries (4B)
//!          { name_len (2B) | name | data_len (8B) | data } * n_entries
//! epilogue: xxh64 of header+body (8B)
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rcache_hash::Digest;
use tracing::debug;
use xxhash_rust::xxh64::Xxh64;

use crate::config::Config;

pub const RESULT_MAGIC: [u8; 4] = *b"cCrS";
pub const RESULT_FORMAT_VERSION: u8 = 1;

/// Entry name for the captured compiler stderr.
pub const STDERR_NAME: &str = "<stderr>";

const COMPR_NONE: u8 = 0;
const COMPR_ZSTD: u8 = 1;
const HEADER_LEN: usize = 15;

/// Artifacts to store or fetch: container entry name -> path on disk.
#[derive(Debug, Default)]
pub struct ResultFiles {
    entries: Vec<(String, PathBuf)>,
}

impl ResultFiles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, path: impl Into<PathBuf>) {
        self.entries.push((name.to_string(), path.into()));
    }

    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, (String, PathBuf)> {
        self.entries.iter()
    }
}

/// Path of a cache object: `<cache_dir>/<first hex>/<rest><suffix>`.
#[must_use]
pub fn cache_object_path(cache_dir: &Path, key: &Digest, suffix: &str) -> PathBuf {
    let hex = key.to_hex();
    cache_dir
        .join(&hex[..1])
        .join(format!("{}{suffix}", &hex[1..]))
}

/// Store the given files under `path`, atomically.
///
/// # Errors
///
/// Returns an error when a source file cannot be read or the container
/// cannot be written.
pub fn put(path: &Path, files: &ResultFiles, config: &Config) -> Result<()> {
    let mut body = Vec::with_capacity(64 * 1024);
    body.extend_from_slice(
        &u32::try_from(files.entries.len())
            .unwrap_or(u32::MAX)
            .to_be_bytes(),
    );
    for (name, source) in files.iter() {
        let data = fs::read(source)
            .with_context(|| format!("failed to read result file {}", source.display()))?;
        body.extend_from_slice(&u16::try_from(name.len()).unwrap_or(u16::MAX).to_be_bytes());
        body.extend_from_slice(name.as_bytes());
        body.extend_from_slice(&(data.len() as u64).to_be_bytes());
        body.extend_from_slice(&data);
    }

    let content_len = (HEADER_LEN + body.len() + 8) as u64;
    let (compr_type, compr_level) = if config.compression {
        (COMPR_ZSTD, config.compression_level.clamp(-128, 127) as i8)
    } else {
        (COMPR_NONE, 0)
    };

    let mut header = [0u8; HEADER_LEN];
    header[..4].copy_from_slice(&RESULT_MAGIC);
    header[4] = RESULT_FORMAT_VERSION;
    header[5] = compr_type;
    header[6] = compr_level as u8;
    header[7..15].copy_from_slice(&content_len.to_be_bytes());

    let mut xxh = Xxh64::new(0);
    xxh.update(&header);
    xxh.update(&body);
    let checksum = xxh.digest();

    let mut tail = body;
    tail.extend_from_slice(&checksum.to_be_bytes());
    let payload = if compr_type == COMPR_ZSTD {
        zstd::encode_all(tail.as_slice(), i32::from(compr_level))
            .context("failed to compress result")?
    } else {
        tail
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp = path.with_extension("result.tmp");
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(&payload);
    fs::write(&tmp, out).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename {} into place", tmp.display()))?;
    Ok(())
}

/// Fetch artifacts from the container into the paths given by `files`.
///
/// Returns the names actually materialized. Requested names absent from
/// the container are skipped (an entry was optional for that compilation,
/// e.g. no stderr was produced). Returns `None` when the container is
/// missing or fails validation; the caller treats that as a cache miss.
#[must_use]
pub fn get(path: &Path, files: &ResultFiles) -> Option<Vec<String>> {
    let entries = match read_container(path) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(path = %path.display(), %err, "failed to read result container");
            return None;
        }
    };

    let mut materialized = Vec::new();
    for (name, dest) in files.iter() {
        let Some(data) = entries.get(name) else {
            continue;
        };
        if let Err(err) = fs::write(dest, data) {
            debug!(dest = %dest.display(), %err, "failed to materialize result file");
            return None;
        }
        materialized.push(name.clone());
    }

    // Keep a hit-producing result away from LRU eviction.
    if let Ok(file) = fs::File::options().write(true).open(path) {
        let _ = file.set_modified(std::time::SystemTime::now());
    }
    Some(materialized)
}

fn read_container(path: &Path) -> Result<HashMap<String, Vec<u8>>> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    anyhow::ensure!(raw.len() >= HEADER_LEN, "truncated result container");
    let header = &raw[..HEADER_LEN];
    anyhow::ensure!(header[..4] == RESULT_MAGIC, "bad magic");
    anyhow::ensure!(
        header[4] == RESULT_FORMAT_VERSION,
        "unsupported version {}",
        header[4]
    );
    let content_len = u64::from_be_bytes(header[7..15].try_into().unwrap());

    let tail = match header[5] {
        COMPR_NONE => raw[HEADER_LEN..].to_vec(),
        COMPR_ZSTD => zstd::decode_all(&raw[HEADER_LEN..]).context("failed to decompress")?,
        other => anyhow::bail!("unsupported compression type {other}"),
    };
    anyhow::ensure!(tail.len() >= 8, "truncated result container");
    anyhow::ensure!(
        content_len == (HEADER_LEN + tail.len()) as u64,
        "content length mismatch"
    );
    let (body, checksum_bytes) = tail.split_at(tail.len() - 8);
    let expected = u64::from_be_bytes(checksum_bytes.try_into().unwrap());
    let mut xxh = Xxh64::new(0);
    xxh.update(header);
    xxh.update(body);
    anyhow::ensure!(xxh.digest() == expected, "incorrect checksum");

    let mut entries = HashMap::new();
    let mut pos = 0usize;
    let n_entries = read_u32(body, &mut pos)?;
    for _ in 0..n_entries {
        let name_len = read_u16(body, &mut pos)? as usize;
        let name_bytes = read_bytes(body, &mut pos, name_len)?;
        let name = std::str::from_utf8(name_bytes)
            .context("non-utf8 entry name")?
            .to_string();
        let data_len = usize::try_from(read_u64(body, &mut pos)?).context("oversized entry")?;
        let data = read_bytes(body, &mut pos, data_len)?.to_vec();
        entries.insert(name, data);
    }
    anyhow::ensure!(pos == body.len(), "trailing bytes");
    Ok(entries)
}

fn read_bytes<'a>(data: &'a [u8], pos: &mut usize, n: usize) -> Result<&'a [u8]> {
    let end = pos.checked_add(n).context("truncated result container")?;
    anyhow::ensure!(end <= data.len(), "truncated result container");
    let slice = &data[*pos..end];
    *pos = end;
    Ok(slice)
}

fn read_u16(data: &[u8], pos: &mut usize) -> Result<u16> {
    Ok(u16::from_be_bytes(read_bytes(data, pos, 2)?.try_into().unwrap()))
}

fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32> {
    Ok(u32::from_be_bytes(read_bytes(data, pos, 4)?.try_into().unwrap()))
}

fn read_u64(data: &[u8], pos: &mut usize) -> Result<u64> {
    Ok(u64::from_be_bytes(read_bytes(data, pos, 8)?.try_into().unwrap()))
}

/// Ensure a `CACHEDIR.TAG` exists next to the first-level cache entries so
/// backup tools skip the cache.
pub fn create_cachedir_tag(dir: &Path) {
    const TAG: &str = "Signature: 8a477f597d28d172789f06886806bc55\n\
        # This file is a cache directory tag created by rcache.\n\
        # For information about cache directory tags, see:\n\
        #\thttp://www.brynosaurus.com/cachedir/\n";
    let path = dir.join("CACHEDIR.TAG");
    if path.exists() {
        return;
    }
    if let Err(err) = fs::write(&path, TAG) {
        debug!(path = %path.display(), %err, "failed to create CACHEDIR.TAG");
    }
}
