use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use blake2::digest::consts::U20;
use blake2::{Blake2b, Digest as _};

use crate::digest::{Digest, DIGEST_LEN};

type Blake2b160 = Blake2b<U20>;

/// Incremental digest builder.
///
/// Fields are framed as `delimiter(label)` followed by the payload bytes.
/// The delimiter feeds the label plus a NUL, which cannot occur inside a
/// label, so `("ab", "c")` and `("a", "bc")` hash differently.
#[derive(Clone)]
pub struct Hasher {
    inner: Blake2b160,
}

impl Hasher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Blake2b160::new(),
        }
    }

    pub fn delimiter(&mut self, label: &str) {
        debug_assert!(!label.as_bytes().contains(&0));
        self.inner.update(label.as_bytes());
        self.inner.update([0u8]);
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn update_str(&mut self, s: &str) {
        self.inner.update(s.as_bytes());
    }

    pub fn update_i64(&mut self, value: i64) {
        self.inner.update(value.to_be_bytes());
    }

    /// Stream a file's content into the digest.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be opened or read.
    pub fn update_file(&mut self, path: &Path) -> io::Result<()> {
        let mut file = File::open(path)?;
        let mut buf = [0u8; 32 * 1024];
        loop {
            let read = file.read(&mut buf)?;
            if read == 0 {
                break;
            }
            self.inner.update(&buf[..read]);
        }
        Ok(())
    }

    /// Current digest value. The hasher can keep accumulating afterwards;
    /// both lookup tiers branch off one shared prefix this way.
    #[must_use]
    pub fn digest(&self) -> Digest {
        let out = self.inner.clone().finalize();
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&out);
        Digest::from_bytes(bytes)
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn deterministic() {
        let mut a = Hasher::new();
        let mut b = Hasher::new();
        a.delimiter("arg");
        a.update_str("-O2");
        b.delimiter("arg");
        b.update_str("-O2");
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn delimiter_prevents_field_concatenation_collisions() {
        let mut a = Hasher::new();
        a.delimiter("ab");
        a.update_str("c");
        let mut b = Hasher::new();
        b.delimiter("a");
        b.update_str("bc");
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn digest_does_not_consume_state() {
        let mut h = Hasher::new();
        h.update_str("common");
        let common = h.digest();
        h.update_str("more");
        assert_ne!(common, h.digest());
        // A clone taken at the fork point must agree with the original prefix.
        let mut again = Hasher::new();
        again.update_str("common");
        assert_eq!(common, again.digest());
    }

    #[test]
    fn file_hash_matches_buffer_hash() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"int main(void) { return 0; }\n").unwrap();

        let mut from_file = Hasher::new();
        from_file.update_file(file.path()).unwrap();
        let mut from_bytes = Hasher::new();
        from_bytes.update(b"int main(void) { return 0; }\n");
        assert_eq!(from_file.digest(), from_bytes.digest());
    }
}
