use chrono::Utc;
use sha2::{Digest, Sha256};

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Collapses CR/LF/NBSP and runs of whitespace into single spaces so the
/// field patterns see one predictable shape regardless of the source layout.
pub fn normalize_whitespace(text: &str) -> String {
    let replaced = text.replace(['\r', '\n', '\u{00a0}'], " ");
    let mut out = String::with_capacity(replaced.len());
    let mut last_space = false;
    for ch in replaced.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(
            normalize_whitespace("a\r\n b\u{00a0}\u{00a0}c   d"),
            "a b c d"
        );
    }

    #[test]
    fn normalization_trims_edges() {
        assert_eq!(normalize_whitespace("  x  "), "x");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn sha256_is_stable() {
        assert_eq!(sha256_bytes(b"abc"), sha256_bytes(b"abc"));
        assert_ne!(sha256_bytes(b"abc"), sha256_bytes(b"abd"));
    }
}
