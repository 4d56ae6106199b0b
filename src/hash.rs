//! Content hashes used as file names in the fixture directories.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Digest length of SHA-1 in hexadecimal characters.
pub const SHA1_HEX_LEN: usize = 40;

/// Digest length of SHA-256 and BLAKE3 in hexadecimal characters.
pub const SHA256_HEX_LEN: usize = 64;

/// A hexadecimal content hash of a fixed length.
///
/// Equality, ordering and hashing ignore letter case. The spelling the hash
/// was parsed from is kept because it is also a file name on disk.
#[derive(Clone, Debug)]
pub struct ContentHash {
    canonical: String,
    spelling: String,
}

impl ContentHash {
    /// Parses `text` as a hash of exactly `len` hex digits.
    ///
    /// Returns `None` for any other length or any non-hex character.
    #[must_use]
    pub fn parse(text: &str, len: usize) -> Option<Self> {
        let valid = text.len() == len && text.bytes().all(|byte| byte.is_ascii_hexdigit());
        valid.then(|| Self {
            canonical: text.to_ascii_lowercase(),
            spelling: text.to_owned(),
        })
    }

    /// Lowercase form used for comparisons.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// The spelling this hash was parsed from, suitable as a file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.spelling
    }
}

impl PartialEq for ContentHash {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for ContentHash {}

impl PartialOrd for ContentHash {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ContentHash {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl Hash for ContentHash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SAMPLE: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

    #[rstest]
    #[case(SAMPLE, SHA1_HEX_LEN, true)]
    #[case("DA39A3EE5E6B4B0D3255BFEF95601890AFD80709", SHA1_HEX_LEN, true)]
    #[case(SAMPLE, SHA256_HEX_LEN, false)]
    #[case("da39a3ee5e6b4b0d3255bfef95601890afd8070", SHA1_HEX_LEN, false)]
    #[case("za39a3ee5e6b4b0d3255bfef95601890afd80709", SHA1_HEX_LEN, false)]
    #[case("", SHA1_HEX_LEN, false)]
    fn parse_checks_length_and_digits(#[case] text: &str, #[case] len: usize, #[case] ok: bool) {
        assert_eq!(ContentHash::parse(text, len).is_some(), ok, "input: {text}");
    }

    #[test]
    fn comparison_ignores_case_but_keeps_spelling() {
        let lower = ContentHash::parse(SAMPLE, SHA1_HEX_LEN).expect("valid hash");
        let upper = ContentHash::parse(&SAMPLE.to_ascii_uppercase(), SHA1_HEX_LEN)
            .expect("valid hash");

        assert_eq!(lower, upper);
        assert_eq!(upper.as_str(), SAMPLE);
        assert_eq!(upper.file_name(), SAMPLE.to_ascii_uppercase());
        assert_eq!(upper.to_string(), SAMPLE);
    }
}
