//! Content fingerprints for output file names.
//!
//! A fingerprint is a truncated blake3 digest rendered as lowercase hex.
//! It names files, it does not identify them: two contents may share a
//! fingerprint, so callers compare bytes before reusing a file.
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let fp = hash::fingerprint("body{color:red}", 7); // -> "3f1c2ab"
//! ```

/// Default fingerprint length in hex characters.
pub const DEFAULT_LEN: usize = 7;

/// Longest fingerprint available (full blake3 digest).
pub const MAX_LEN: usize = 64;

/// Compute a `len`-char hex fingerprint of the given bytes.
///
/// `len` is clamped to `1..=MAX_LEN`.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(data: &T, len: usize) -> String {
    let digest = hex::encode(blake3::hash(data.as_ref()).as_bytes());
    digest[..len.clamp(1, MAX_LEN)].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = fingerprint("console.log(1)", DEFAULT_LEN);
        let b = fingerprint("console.log(1)", DEFAULT_LEN);
        assert_eq!(a, b);
        assert_eq!(a.len(), 7);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_differs_by_content() {
        assert_ne!(fingerprint("a", 16), fingerprint("b", 16));
    }

    #[test]
    fn test_fingerprint_prefix_of_longer() {
        let short = fingerprint("x", 7);
        let long = fingerprint("x", MAX_LEN);
        assert!(long.starts_with(&short));
    }

    #[test]
    fn test_fingerprint_len_clamped() {
        assert_eq!(fingerprint("x", 0).len(), 1);
        assert_eq!(fingerprint("x", 1000).len(), MAX_LEN);
    }
}
