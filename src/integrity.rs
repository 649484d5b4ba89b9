//! Integrity tags for persisted credentials.
//!
//! A tag is the djb2 hash of the stored string: seed 5381, then
//! `h = h * 33 + byte` for every byte, wrapping at 32 bits. Tags written by
//! earlier firmware use the same recurrence, so stored credentials stay
//! readable across versions.
//!
//! The tag only detects truncated or partially written values. It is not a
//! MAC and offers no protection against deliberate modification.

/// Initial hash value.
const SEED: u32 = 5381;

/// Compute the integrity tag of a stored string.
///
/// # Example
///
/// ```
/// use cardputer_wifi_setup::integrity_tag;
///
/// assert_eq!(integrity_tag(""), 5381);
/// assert_eq!(integrity_tag("a"), 5381 * 33 + 97);
/// ```
pub fn integrity_tag(value: &str) -> u32 {
    value.bytes().fold(SEED, |hash, byte| {
        (hash << 5).wrapping_add(hash).wrapping_add(u32::from(byte))
    })
}

/// Check a stored string against its stored tag.
pub fn verify(value: &str, tag: u32) -> bool {
    integrity_tag(value) == tag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_is_seed() {
        assert_eq!(integrity_tag(""), 5381);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(integrity_tag("a"), 177_670);
        assert_eq!(integrity_tag("ab"), 5_863_208);
    }

    #[test]
    fn test_wraps_instead_of_overflowing() {
        let long = "z".repeat(64);
        let expected = long
            .bytes()
            .fold(5381u32, |h, b| h.wrapping_mul(33).wrapping_add(b as u32));
        assert_eq!(integrity_tag(&long), expected);
    }

    #[test]
    fn test_verify() {
        let tag = integrity_tag("HomeNet");
        assert!(verify("HomeNet", tag));
        assert!(!verify("HomeNe", tag));
        assert!(!verify("HomeNet", tag ^ 1));
    }

    #[test]
    fn test_non_ascii_uses_utf8_bytes() {
        let expected = "é"
            .bytes()
            .fold(5381u32, |h, b| h.wrapping_mul(33).wrapping_add(b as u32));
        assert_eq!(integrity_tag("é"), expected);
    }
}

#[cfg(feature = "tap-tests")]
mod tap_tests {
    use super::*;
    use cardputer_wifi_setup_macros::tap_test;

    #[tap_test]
    fn tag_of_empty_string_is_seed() {
        assert_eq!(integrity_tag(""), 5381);
    }

    #[tap_test]
    fn tag_changes_with_truncation() {
        assert_ne!(integrity_tag("pass1234"), integrity_tag("pass123"));
    }
}
