//! The manifest: the cross-check record behind the direct lookup tier.
//!
//! A manifest maps one direct-mode key to the results previously produced
//! under it, each justified by the fingerprints of the include files that
//! compilation actually read. Lookup re-verifies those fingerprints against
//! the live filesystem; the newest entry that still holds wins.
//!
//! On-disk format (integers big-endian):
//!
//! ```text
//! header    : magic "cCmF" (4B) | version (1B) | compr_type (1B)
//!             | compr_level (1B) | content_len (8B)
//! body      : n_paths (4B)
//!             { path_len (2B) | path } * n_paths
//!             n_file_infos (4B)
//!             { path_index (4B) | digest (20B) | fsize (8B)
//!               | mtime (8B) | ctime (8B) } * n_file_infos
//!             n_results (4B)
//!             { n_indexes (4B) | index (4B) * n_indexes
//!               | name (20B) } * n_results
//! epilogue  : xxh64 of header+body bytes (8B)
//! ```
//!
//! The body and epilogue are zstd-compressed when `compr_type` is 1.
//! `content_len` is the total uncompressed size. No locking: a race between
//! two writers costs at most one entry, which a later compile re-adds.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};
use rcache_hash::{hash_source, Digest, DIGEST_LEN};
use tracing::debug;
use xxhash_rust::xxh64::Xxh64;

use crate::config::Config;
use crate::paths::{ctime_of, mtime_of};

pub const MANIFEST_MAGIC: [u8; 4] = *b"cCmF";
pub const MANIFEST_VERSION: u8 = 2;

const COMPR_NONE: u8 = 0;
const COMPR_ZSTD: u8 = 1;
const HEADER_LEN: usize = 15;

/// Above these sizes the manifest is discarded wholesale; a crude but
/// bounded stand-in for per-entry LRU.
pub const MAX_MANIFEST_ENTRIES: usize = 100;
pub const MAX_MANIFEST_FILE_INFO_ENTRIES: usize = 10_000;

/// `mtime`/`ctime` sentinel: the stat data was too fresh to trust at the
/// time the entry was written.
pub const UNTRUSTED_TIME: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FileInfo {
    path_index: u32,
    digest: Digest,
    fsize: u64,
    mtime: i64,
    ctime: i64,
}

#[derive(Debug, Clone)]
struct ResultEntry {
    file_info_indexes: Vec<u32>,
    name: Digest,
}

#[derive(Debug, Default)]
struct Manifest {
    paths: Vec<String>,
    file_infos: Vec<FileInfo>,
    results: Vec<ResultEntry>,
}

#[derive(Debug, thiserror::Error)]
enum ManifestError {
    #[error("no such manifest file")]
    Missing,
    #[error("truncated manifest")]
    Truncated,
    #[error("bad magic")]
    WrongMagic,
    #[error("unsupported version {0}")]
    WrongVersion(u8),
    #[error("unsupported compression type {0}")]
    UnsupportedCompression(u8),
    #[error("incorrect checksum (actual {actual:016x}, expected {expected:016x})")]
    BadChecksum { actual: u64, expected: u64 },
    #[error("corrupt manifest: {0}")]
    Corrupt(&'static str),
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ManifestError> {
        let end = self.pos.checked_add(n).ok_or(ManifestError::Truncated)?;
        if end > self.data.len() {
            return Err(ManifestError::Truncated);
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, ManifestError> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, ManifestError> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, ManifestError> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn i64(&mut self) -> Result<i64, ManifestError> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn digest(&mut self) -> Result<Digest, ManifestError> {
        let bytes: [u8; DIGEST_LEN] = self.take(DIGEST_LEN)?.try_into().unwrap();
        Ok(Digest::from_bytes(bytes))
    }
}

fn read_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let raw = fs::read(path).map_err(|_| ManifestError::Missing)?;
    if raw.len() < HEADER_LEN {
        return Err(ManifestError::Truncated);
    }
    let header = &raw[..HEADER_LEN];
    if header[..4] != MANIFEST_MAGIC {
        return Err(ManifestError::WrongMagic);
    }
    if header[4] != MANIFEST_VERSION {
        return Err(ManifestError::WrongVersion(header[4]));
    }
    let content_len = u64::from_be_bytes(header[7..15].try_into().unwrap());

    let tail = match header[5] {
        COMPR_NONE => raw[HEADER_LEN..].to_vec(),
        COMPR_ZSTD => {
            zstd::decode_all(&raw[HEADER_LEN..]).map_err(|_| ManifestError::Truncated)?
        }
        other => return Err(ManifestError::UnsupportedCompression(other)),
    };
    if tail.len() < 8 {
        return Err(ManifestError::Truncated);
    }
    if content_len != (HEADER_LEN + tail.len()) as u64 {
        return Err(ManifestError::Corrupt("content length mismatch"));
    }
    let (body, checksum_bytes) = tail.split_at(tail.len() - 8);
    let expected = u64::from_be_bytes(checksum_bytes.try_into().unwrap());
    let mut xxh = Xxh64::new(0);
    xxh.update(header);
    xxh.update(body);
    let actual = xxh.digest();
    if actual != expected {
        return Err(ManifestError::BadChecksum { actual, expected });
    }

    let mut r = Reader { data: body, pos: 0 };
    let mut manifest = Manifest::default();

    let n_paths = r.u32()?;
    for _ in 0..n_paths {
        let len = r.u16()? as usize;
        let bytes = r.take(len)?;
        let path = std::str::from_utf8(bytes)
            .map_err(|_| ManifestError::Corrupt("non-utf8 path"))?
            .to_string();
        manifest.paths.push(path);
    }

    let n_file_infos = r.u32()?;
    for _ in 0..n_file_infos {
        let info = FileInfo {
            path_index: r.u32()?,
            digest: r.digest()?,
            fsize: r.u64()?,
            mtime: r.i64()?,
            ctime: r.i64()?,
        };
        if info.path_index as usize >= manifest.paths.len() {
            return Err(ManifestError::Corrupt("path index out of range"));
        }
        manifest.file_infos.push(info);
    }

    let n_results = r.u32()?;
    for _ in 0..n_results {
        let n_indexes = r.u32()?;
        let mut indexes = Vec::with_capacity(n_indexes.min(1024) as usize);
        for _ in 0..n_indexes {
            let index = r.u32()?;
            if index as usize >= manifest.file_infos.len() {
                return Err(ManifestError::Corrupt("file info index out of range"));
            }
            indexes.push(index);
        }
        manifest.results.push(ResultEntry {
            file_info_indexes: indexes,
            name: r.digest()?,
        });
    }

    if r.pos != body.len() {
        return Err(ManifestError::Corrupt("trailing bytes"));
    }
    Ok(manifest)
}

fn serialize_body(manifest: &Manifest) -> Vec<u8> {
    let mut out = Vec::with_capacity(4096);
    out.extend_from_slice(&u32::try_from(manifest.paths.len()).unwrap_or(u32::MAX).to_be_bytes());
    for path in &manifest.paths {
        out.extend_from_slice(&u16::try_from(path.len()).unwrap_or(u16::MAX).to_be_bytes());
        out.extend_from_slice(path.as_bytes());
    }
    out.extend_from_slice(
        &u32::try_from(manifest.file_infos.len())
            .unwrap_or(u32::MAX)
            .to_be_bytes(),
    );
    for info in &manifest.file_infos {
        out.extend_from_slice(&info.path_index.to_be_bytes());
        out.extend_from_slice(info.digest.as_bytes());
        out.extend_from_slice(&info.fsize.to_be_bytes());
        out.extend_from_slice(&info.mtime.to_be_bytes());
        out.extend_from_slice(&info.ctime.to_be_bytes());
    }
    out.extend_from_slice(
        &u32::try_from(manifest.results.len())
            .unwrap_or(u32::MAX)
            .to_be_bytes(),
    );
    for result in &manifest.results {
        out.extend_from_slice(
            &u32::try_from(result.file_info_indexes.len())
                .unwrap_or(u32::MAX)
                .to_be_bytes(),
        );
        for index in &result.file_info_indexes {
            out.extend_from_slice(&index.to_be_bytes());
        }
        out.extend_from_slice(result.name.as_bytes());
    }
    out
}

fn write_manifest(path: &Path, manifest: &Manifest, config: &Config) -> Result<()> {
    let body = serialize_body(manifest);
    let content_len = (HEADER_LEN + body.len() + 8) as u64;

    let (compr_type, compr_level) = if config.compression {
        (COMPR_ZSTD, config.compression_level.clamp(-128, 127) as i8)
    } else {
        (COMPR_NONE, 0)
    };

    let mut header = [0u8; HEADER_LEN];
    header[..4].copy_from_slice(&MANIFEST_MAGIC);
    header[4] = MANIFEST_VERSION;
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
            .context("failed to compress manifest")?
    } else {
        tail
    };

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(&payload);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp = path.with_extension("manifest.tmp");
    fs::write(&tmp, out).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename {} into place", tmp.display()))?;
    Ok(())
}

#[derive(Clone, Copy)]
struct FileStats {
    size: u64,
    mtime: i64,
    ctime: i64,
}

fn stat_file(path: &str) -> Option<FileStats> {
    let meta = fs::metadata(path).ok()?;
    Some(FileStats {
        size: meta.len(),
        mtime: mtime_of(&meta),
        ctime: ctime_of(&meta),
    })
}

/// Inputs the verifier needs beyond the manifest itself.
pub struct VerifyContext<'a> {
    pub config: &'a Config,
    /// Clang embeds include mtimes in precompiled headers and errors out on
    /// mismatch, so PCH results additionally pin mtimes.
    pub treat_as_clang: bool,
    pub output_is_pch: bool,
}

/// Look up a result name, scanning entries newest-first and verifying each
/// referenced include fingerprint against the current filesystem.
///
/// Any unreadable or corrupt manifest behaves exactly like an absent one.
#[must_use]
pub fn lookup(path: &Path, ctx: &VerifyContext<'_>) -> Option<Digest> {
    let manifest = match read_manifest(path) {
        Ok(manifest) => manifest,
        Err(ManifestError::Missing) => return None,
        Err(err) => {
            debug!(path = %path.display(), %err, "discarding unreadable manifest");
            return None;
        }
    };

    let mut stated: HashMap<u32, Option<FileStats>> = HashMap::new();
    let mut hashed: HashMap<u32, Option<Digest>> = HashMap::new();

    for result in manifest.results.iter().rev() {
        if verify_result(&manifest, result, ctx, &mut stated, &mut hashed) {
            // Refresh the mtime so LRU cleanup keeps a manifest that still
            // produces hits.
            if let Ok(file) = fs::File::options().write(true).open(path) {
                let _ = file.set_modified(SystemTime::now());
            }
            return Some(result.name);
        }
    }
    None
}

fn verify_result(
    manifest: &Manifest,
    result: &ResultEntry,
    ctx: &VerifyContext<'_>,
    stated: &mut HashMap<u32, Option<FileStats>>,
    hashed: &mut HashMap<u32, Option<Digest>>,
) -> bool {
    let sloppy = &ctx.config.sloppiness;
    for &index in &result.file_info_indexes {
        let fi = &manifest.file_infos[index as usize];
        let path = &manifest.paths[fi.path_index as usize];

        let Some(st) = *stated
            .entry(fi.path_index)
            .or_insert_with(|| stat_file(path))
        else {
            return false;
        };

        if fi.fsize != st.size {
            return false;
        }

        if ctx.treat_as_clang && ctx.output_is_pch && fi.mtime != st.mtime {
            debug!(%path, "precompiled header include has a new mtime");
            return false;
        }

        if sloppy.file_stat_matches {
            let mtime_ok = fi.mtime == st.mtime;
            let ctime_ok = sloppy.file_stat_matches_ctime || fi.ctime == st.ctime;
            if mtime_ok && ctime_ok {
                debug!(%path, "stat match; skipping content hash");
                continue;
            }
        }

        let computed = hashed.entry(index).or_insert_with(|| {
            let content = fs::read(path).ok()?;
            let outcome = hash_source(&content, !sloppy.time_macros);
            if outcome.is_temporal() {
                return None;
            }
            Some(outcome.digest())
        });
        match computed {
            Some(digest) if *digest == fi.digest => {}
            _ => return false,
        }
    }
    true
}

fn file_info_for(
    path: &str,
    digest: Digest,
    path_index: u32,
    time_of_compilation: i64,
) -> FileInfo {
    // stat times have one-second resolution, so only trust them when the
    // file is strictly older than the compilation. ctime may be 0, hence
    // the comparison against the max of both.
    match stat_file(path) {
        Some(st) if time_of_compilation > st.mtime.max(st.ctime) => FileInfo {
            path_index,
            digest,
            fsize: st.size,
            mtime: st.mtime,
            ctime: st.ctime,
        },
        Some(st) => FileInfo {
            path_index,
            digest,
            fsize: st.size,
            mtime: UNTRUSTED_TIME,
            ctime: UNTRUSTED_TIME,
        },
        None => FileInfo {
            path_index,
            digest,
            fsize: 0,
            mtime: UNTRUSTED_TIME,
            ctime: UNTRUSTED_TIME,
        },
    }
}

/// Append a result entry, deduplicating paths and file infos into the
/// shared tables and replacing the file atomically.
///
/// A missing or corrupt manifest starts empty; tables past their maxima are
/// discarded outright.
///
/// # Errors
///
/// Returns an error only when the new manifest cannot be written.
pub fn put(
    path: &Path,
    result_name: Digest,
    included_files: &HashMap<String, Digest>,
    time_of_compilation: i64,
    config: &Config,
) -> Result<()> {
    let mut manifest = match read_manifest(path) {
        Ok(manifest) => manifest,
        Err(ManifestError::Missing) => Manifest::default(),
        Err(err) => {
            debug!(path = %path.display(), %err, "replacing unreadable manifest");
            Manifest::default()
        }
    };

    if manifest.results.len() >= MAX_MANIFEST_ENTRIES {
        // Entries accumulate only when headers change but the source does
        // not; a generated header bumped every build can still grow this
        // without bound, so cap it by starting over.
        debug!(path = %path.display(), "too many result entries; discarding manifest");
        manifest = Manifest::default();
    } else if manifest.file_infos.len() >= MAX_MANIFEST_FILE_INFO_ENTRIES {
        debug!(path = %path.display(), "too many file info entries; discarding manifest");
        manifest = Manifest::default();
    }

    let mut path_indexes: HashMap<String, u32> = manifest
        .paths
        .iter()
        .enumerate()
        .map(|(i, p)| (p.clone(), i as u32))
        .collect();
    let mut file_info_indexes: HashMap<FileInfo, u32> = manifest
        .file_infos
        .iter()
        .enumerate()
        .map(|(i, fi)| (*fi, i as u32))
        .collect();

    // Sorted iteration keeps the serialized form deterministic.
    let mut files: Vec<(&String, &Digest)> = included_files.iter().collect();
    files.sort_by(|a, b| a.0.cmp(b.0));

    let mut indexes = Vec::with_capacity(files.len());
    for (file_path, digest) in files {
        let path_index = match path_indexes.get(file_path) {
            Some(index) => *index,
            None => {
                let index = manifest.paths.len() as u32;
                manifest.paths.push(file_path.clone());
                path_indexes.insert(file_path.clone(), index);
                index
            }
        };
        let info = file_info_for(file_path, *digest, path_index, time_of_compilation);
        let index = match file_info_indexes.get(&info) {
            Some(index) => *index,
            None => {
                let index = manifest.file_infos.len() as u32;
                manifest.file_infos.push(info);
                file_info_indexes.insert(info, index);
                index
            }
        };
        indexes.push(index);
    }

    manifest.results.push(ResultEntry {
        file_info_indexes: indexes,
        name: result_name,
    });

    write_manifest(path, &manifest, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvSnapshot;
    use rcache_hash::Hasher;

    fn test_config(compression: bool) -> Config {
        let env = EnvSnapshot::testing(&[("HOME", "/h")]);
        let mut config = Config::from_snapshot(&env).unwrap();
        config.compression = compression;
        config
    }

    fn digest_of(text: &str) -> Digest {
        let mut hasher = Hasher::new();
        hasher.update(text.as_bytes());
        hasher.digest()
    }

    fn content_digest(bytes: &[u8]) -> Digest {
        hash_source(bytes, true).digest()
    }

    fn ctx(config: &Config) -> VerifyContext<'_> {
        VerifyContext {
            config,
            treat_as_clang: false,
            output_is_pch: false,
        }
    }

    // All include mtimes predate this by a wide margin in the tests below.
    const FUTURE: i64 = i64::MAX / 2;

    #[test]
    fn round_trip_returns_inserted_name() {
        for compression in [false, true] {
            let dir = tempfile::tempdir().unwrap();
            let config = test_config(compression);
            let header = dir.path().join("x.h");
            fs::write(&header, "#define X 1\n").unwrap();

            let mut included = HashMap::new();
            included.insert(
                header.to_string_lossy().into_owned(),
                content_digest(b"#define X 1\n"),
            );

            let manifest_path = dir.path().join("k.manifest");
            let name = digest_of("result-one");
            put(&manifest_path, name, &included, FUTURE, &config).unwrap();

            assert_eq!(lookup(&manifest_path, &ctx(&config)), Some(name));
        }
    }

    #[test]
    fn newest_entry_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(false);
        let header = dir.path().join("x.h");
        fs::write(&header, "one\n").unwrap();

        let mut included = HashMap::new();
        included.insert(header.to_string_lossy().into_owned(), content_digest(b"one\n"));

        let manifest_path = dir.path().join("k.manifest");
        put(&manifest_path, digest_of("old"), &included, FUTURE, &config).unwrap();
        put(&manifest_path, digest_of("new"), &included, FUTURE, &config).unwrap();

        assert_eq!(lookup(&manifest_path, &ctx(&config)), Some(digest_of("new")));
    }

    #[test]
    fn changed_content_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(false);
        let header = dir.path().join("x.h");
        fs::write(&header, "one\n").unwrap();

        let mut included = HashMap::new();
        included.insert(header.to_string_lossy().into_owned(), content_digest(b"one\n"));
        let manifest_path = dir.path().join("k.manifest");
        put(&manifest_path, digest_of("r"), &included, FUTURE, &config).unwrap();

        // Same size, different content: only the hash can tell.
        fs::write(&header, "two\n").unwrap();
        assert_eq!(lookup(&manifest_path, &ctx(&config)), None);

        // Different size fails before hashing.
        fs::write(&header, "three three\n").unwrap();
        assert_eq!(lookup(&manifest_path, &ctx(&config)), None);

        // Deleted file fails too.
        fs::remove_file(&header).unwrap();
        assert_eq!(lookup(&manifest_path, &ctx(&config)), None);
    }

    #[test]
    fn corrupted_checksum_behaves_like_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(false);
        let header = dir.path().join("x.h");
        fs::write(&header, "one\n").unwrap();
        let mut included = HashMap::new();
        included.insert(header.to_string_lossy().into_owned(), content_digest(b"one\n"));

        let manifest_path = dir.path().join("k.manifest");
        put(&manifest_path, digest_of("r"), &included, FUTURE, &config).unwrap();

        // Flip a bit in the last 8 bytes (the stored checksum).
        let mut raw = fs::read(&manifest_path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        fs::write(&manifest_path, &raw).unwrap();

        assert_eq!(lookup(&manifest_path, &ctx(&config)), None);

        // put() must recover by starting empty.
        put(&manifest_path, digest_of("r2"), &included, FUTURE, &config).unwrap();
        assert_eq!(lookup(&manifest_path, &ctx(&config)), Some(digest_of("r2")));
    }

    #[test]
    fn truncation_behaves_like_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(true);
        let header = dir.path().join("x.h");
        fs::write(&header, "one\n").unwrap();
        let mut included = HashMap::new();
        included.insert(header.to_string_lossy().into_owned(), content_digest(b"one\n"));

        let manifest_path = dir.path().join("k.manifest");
        put(&manifest_path, digest_of("r"), &included, FUTURE, &config).unwrap();
        let raw = fs::read(&manifest_path).unwrap();
        fs::write(&manifest_path, &raw[..raw.len() - 1]).unwrap();

        assert_eq!(lookup(&manifest_path, &ctx(&config)), None);
    }

    #[test]
    fn wrong_magic_and_version_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(false);
        let manifest_path = dir.path().join("k.manifest");

        fs::write(&manifest_path, b"nope").unwrap();
        assert_eq!(lookup(&manifest_path, &ctx(&config)), None);

        let mut included = HashMap::new();
        let header = dir.path().join("x.h");
        fs::write(&header, "one\n").unwrap();
        included.insert(header.to_string_lossy().into_owned(), content_digest(b"one\n"));
        put(&manifest_path, digest_of("r"), &included, FUTURE, &config).unwrap();

        let mut raw = fs::read(&manifest_path).unwrap();
        raw[4] = MANIFEST_VERSION + 1;
        fs::write(&manifest_path, &raw).unwrap();
        assert_eq!(lookup(&manifest_path, &ctx(&config)), None);
    }

    #[test]
    fn result_entries_stay_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(false);
        let header = dir.path().join("x.h");
        fs::write(&header, "one\n").unwrap();
        let mut included = HashMap::new();
        included.insert(header.to_string_lossy().into_owned(), content_digest(b"one\n"));

        let manifest_path = dir.path().join("k.manifest");
        for i in 0..=MAX_MANIFEST_ENTRIES {
            put(
                &manifest_path,
                digest_of(&format!("r{i}")),
                &included,
                FUTURE,
                &config,
            )
            .unwrap();
        }
        let manifest = read_manifest(&manifest_path).unwrap();
        assert!(manifest.results.len() <= MAX_MANIFEST_ENTRIES);
        // The discard also drops the shared tables.
        assert_eq!(manifest.paths.len(), 1);
        assert_eq!(manifest.file_infos.len(), 1);
    }

    #[test]
    fn fresh_files_get_untrusted_time_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(false);
        let header = dir.path().join("x.h");
        fs::write(&header, "one\n").unwrap();
        let mut included = HashMap::new();
        included.insert(header.to_string_lossy().into_owned(), content_digest(b"one\n"));

        // Compilation "started" before the file was written.
        let manifest_path = dir.path().join("k.manifest");
        put(&manifest_path, digest_of("r"), &included, 0, &config).unwrap();

        let manifest = read_manifest(&manifest_path).unwrap();
        assert_eq!(manifest.file_infos[0].mtime, UNTRUSTED_TIME);
        assert_eq!(manifest.file_infos[0].ctime, UNTRUSTED_TIME);

        // Content verification still succeeds; only the stat shortcut is
        // barred.
        let mut sloppy_config = test_config(false);
        sloppy_config.sloppiness.file_stat_matches = true;
        assert_eq!(
            lookup(&manifest_path, &ctx(&sloppy_config)),
            Some(digest_of("r"))
        );
    }

    #[test]
    fn stat_match_shortcut_skips_hashing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(false);
        config.sloppiness.file_stat_matches = true;

        let header = dir.path().join("x.h");
        fs::write(&header, "one\n").unwrap();
        let key = header.to_string_lossy().into_owned();

        // Store a digest that does NOT match the content; only the stat
        // shortcut can produce a hit.
        let mut included = HashMap::new();
        included.insert(key, digest_of("bogus-digest"));
        let manifest_path = dir.path().join("k.manifest");
        put(&manifest_path, digest_of("r"), &included, FUTURE, &config).unwrap();

        assert_eq!(
            lookup(&manifest_path, &ctx(&config)),
            Some(digest_of("r")),
            "mtime/ctime match should bypass content hashing"
        );

        // Without the sloppiness the bogus digest is caught.
        config.sloppiness.file_stat_matches = false;
        assert_eq!(lookup(&manifest_path, &ctx(&config)), None);
    }

    #[test]
    fn temporal_macro_in_include_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(false);
        let header = dir.path().join("x.h");
        fs::write(&header, "#define T __TIME__\n").unwrap();
        let mut included = HashMap::new();
        included.insert(
            header.to_string_lossy().into_owned(),
            content_digest(b"#define T __TIME__\n"),
        );
        let manifest_path = dir.path().join("k.manifest");
        put(&manifest_path, digest_of("r"), &included, FUTURE, &config).unwrap();

        assert_eq!(lookup(&manifest_path, &ctx(&config)), None);
    }
}
