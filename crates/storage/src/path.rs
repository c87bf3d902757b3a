//! Key validation and security utilities.
//!
//! Keys are `/`-separated, relative, and are joined onto filesystem roots or
//! object-store prefixes by the backends. This module makes sure a key can
//! never escape the store it belongs to.

use crate::error::{ErrorKind, Result};

/// Validates a store key for security and correctness.
/// Ensures that keys don't escape the store root (no `..` traversal).
///
/// > **Note:** Backslashes are rejected rather than normalized, so a key means
/// >           the same thing on every platform. Null bytes are also rejected.
///
/// # Returns
/// Returns the normalized key if valid, or [`InvalidKey`](crate::error::ErrorKind::InvalidKey)
/// if invalid.
///
/// # Examples
///
/// ```
/// use imgbatch_storage::validate_key;
/// // Valid keys
/// assert!(validate_key("image_0_1700000000").is_ok());
/// assert!(validate_key("thumbs/small/cat.webp").is_ok());
/// assert!(validate_key("a/../cat.webp").is_ok()); // (never leaves store root)
/// // Invalid keys
/// assert!(validate_key("../secrets").is_err());
/// assert!(validate_key("a/../../b").is_err()); // (leaves store root)
/// assert!(validate_key("a\0b").is_err());
/// assert!(validate_key("a\\b").is_err());
/// // Keys get resolved
/// assert_eq!(
///     validate_key("wrong/../still-wrong/.././correct//./key.png/").unwrap(),
///     "correct/key.png"
/// );
/// ```
pub fn validate(key: impl AsRef<str>) -> Result<String> {
    let key = key.as_ref();
    let invalid = || ErrorKind::InvalidKey(key.to_string());
    let mut segments: Vec<&str> = Vec::new();
    for segment in key.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
            // Null bytes cause truncation in C-based syscalls, and backslashes
            // are separators on Windows; reject both explicitly.
            s if s.contains(['\0', '\\']) => exn::bail!(invalid()),
            s => segments.push(s),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(invalid()),
        false => Ok(segments.join("/")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert_eq!(validate("image_0_1").unwrap(), "image_0_1");
        assert_eq!(validate("a/b/c/file.png").unwrap(), "a/b/c/file.png");
        assert_eq!(validate("OUTPUT").unwrap(), "OUTPUT");
    }

    #[test]
    fn test_key_normalization() {
        // Double slashes are normalized
        assert_eq!(validate("a//b//c").unwrap(), "a/b/c");
        // Current directory references removed
        assert_eq!(validate("a/./b/./c").unwrap(), "a/b/c");
        // Leading slash is dropped, keys are always relative
        assert_eq!(validate("/a/b").unwrap(), "a/b");
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate("../etc/passwd").is_err());
        assert!(validate("a/../../b").is_err());
        assert!(validate("..").is_err());
        assert!(validate("../..").is_err());
    }

    #[test]
    fn test_reverse_attempts() {
        // Traversal remains within store root
        assert_eq!(validate("a/b/..").unwrap(), "a");
    }

    #[test]
    fn test_invalid_characters() {
        assert!(validate("a\0b").is_err());
        assert!(validate("\0").is_err());
        assert!(validate("a\\b").is_err());
    }

    #[test]
    fn test_empty_keys() {
        assert!(validate("").is_err());
        assert!(validate(".").is_err());
        assert!(validate("./").is_err());
        assert!(validate("./.").is_err());
        assert!(validate("//").is_err());
    }

    #[test]
    fn test_trailing_slashes() {
        assert_eq!(validate("store/").unwrap(), "store");
        assert_eq!(validate("a/b/c///").unwrap(), "a/b/c");
    }
}
