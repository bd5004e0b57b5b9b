use crate::digest::Digest;
use crate::hasher::Hasher;

/// Outcome of hashing a source file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceHash {
    /// Content hashed without surprises.
    Clean(Digest),
    /// The content references `__TIME__` or `__DATE__`. The digest still
    /// covers the full content, but a key derived from it would go stale the
    /// moment the clock ticks, so callers disable the direct tier.
    TemporalMacro(Digest),
}

impl SourceHash {
    #[must_use]
    pub fn digest(&self) -> Digest {
        match self {
            Self::Clean(d) | Self::TemporalMacro(d) => *d,
        }
    }

    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::TemporalMacro(_))
    }
}

/// Hash source text, reporting whether it uses a temporal macro.
///
/// `check_temporal` is off when the user opted into `time_macros`
/// sloppiness; the scan is then skipped entirely.
#[must_use]
pub fn hash_source(content: &[u8], check_temporal: bool) -> SourceHash {
    let mut hasher = Hasher::new();
    hasher.update(content);
    let digest = hasher.digest();
    if check_temporal && scan_for_temporal_macros(content) {
        SourceHash::TemporalMacro(digest)
    } else {
        SourceHash::Clean(digest)
    }
}

/// Extend an existing hasher with source text, reporting temporal macros.
#[must_use]
pub fn hash_source_into(hasher: &mut Hasher, content: &[u8], check_temporal: bool) -> bool {
    hasher.update(content);
    check_temporal && scan_for_temporal_macros(content)
}

const TIME_MACRO: &[u8; 8] = b"__TIME__";
const DATE_MACRO: &[u8; 8] = b"__DATE__";

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whether `content` contains an unescaped `__TIME__` or `__DATE__` token.
///
/// A hit requires the eight macro characters bounded by non-identifier
/// characters (or the start/end of the buffer): `a__DATE__`, `__DATE__0` and
/// friends do not count, a token split by whitespace does not count.
#[must_use]
pub fn scan_for_temporal_macros(content: &[u8]) -> bool {
    if content.len() < 8 {
        return false;
    }
    let mut i = 0;
    while i + 8 <= content.len() {
        // Both macros start with "__"; skip cheaply otherwise.
        if content[i] != b'_' || content[i + 1] != b'_' {
            i += 1;
            continue;
        }
        let token = &content[i..i + 8];
        if token != TIME_MACRO && token != DATE_MACRO {
            i += 1;
            continue;
        }
        let open = i == 0 || !is_ident_byte(content[i - 1]);
        let close = i + 8 == content.len() || !is_ident_byte(content[i + 8]);
        if open && close {
            return true;
        }
        i += 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_macro_at_buffer_start() {
        let time_start = b"__TIME__\nint a;\n\0";
        assert!(scan_for_temporal_macros(time_start));
        assert!(!scan_for_temporal_macros(&time_start[1..]));

        let date_start = b"__DATE__\nint ab;\n\0";
        assert!(scan_for_temporal_macros(date_start));
        assert!(!scan_for_temporal_macros(&date_start[1..]));
    }

    #[test]
    fn finds_macro_mid_buffer_from_any_offset() {
        let time_middle = b"#define a __TIME__\nint a;\n\0";
        for offset in 0..8 {
            assert!(
                scan_for_temporal_macros(&time_middle[offset..]),
                "offset {offset}"
            );
        }
        let date_middle = b"#define ab __DATE__\nint ab;\n\0";
        for offset in 0..8 {
            assert!(
                scan_for_temporal_macros(&date_middle[offset..]),
                "offset {offset}"
            );
        }
    }

    #[test]
    fn finds_macro_at_buffer_end() {
        let time_end = b"#define a __TIME__";
        assert!(scan_for_temporal_macros(time_end));
        let tail = &time_end[time_end.len() - 8..];
        assert!(scan_for_temporal_macros(tail));
        assert!(!scan_for_temporal_macros(&time_end[time_end.len() - 7..]));
    }

    #[test]
    fn ignores_identifier_adjacent_and_broken_tokens() {
        let no_temporal: &[&[u8]] = &[
            b"#define ab a__DATE__\n",
            b"#define ab __DATE__a\n",
            b"#define ab A__DATE__\n",
            b"#define ab __DATE__A\n",
            b"#define ab 0__DATE__\n",
            b"#define ab __DATE__0\n",
            b"#define ab _ _DATE__\n",
            b"#define ab __ DATE__\n",
            b"#define ab __D ATE__\n",
            b"#define ab __DATE __\n",
            b"#define ab __DATE_ _\n",
            b"#define ab _ _TIME__\n",
            b"#define ab __TIM E__\n",
            b"#define ab __TIME_ _\n",
        ];
        for line in no_temporal {
            assert!(!scan_for_temporal_macros(line), "{:?}", line);
        }
    }

    #[test]
    fn hash_source_reports_temporal_and_still_hashes() {
        let clean = hash_source(b"int x;\n", true);
        assert!(!clean.is_temporal());

        let tainted = hash_source(b"const char* t = __TIME__;\n", true);
        assert!(tainted.is_temporal());
        assert_ne!(clean.digest(), tainted.digest());

        // Sloppiness turns the scan off.
        let sloppy = hash_source(b"const char* t = __TIME__;\n", false);
        assert!(!sloppy.is_temporal());
        assert_eq!(sloppy.digest(), tainted.digest());
    }
}
