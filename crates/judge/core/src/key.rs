//! Deterministic property keys.
//!
//! Every attribute in the store is addressed by a [`PropertyKey`] derived from
//! the property's human-readable name. The derivation must be identical across
//! processes and builds, so it is a truncated SHA-256 digest rather than
//! `std::hash`, whose output is randomized per process.

use core::fmt;

use sha2::{Digest, Sha256};

/// Fixed-width key derived from a property name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyKey(pub u64);

impl PropertyKey {
    /// Derives the key for `name`.
    ///
    /// The first eight bytes of the SHA-256 digest of the UTF-8 name,
    /// interpreted little endian.
    pub fn of(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self(u64::from_le_bytes(bytes))
    }

    /// Returns the raw integer value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Shorthand for [`PropertyKey::of`].
#[inline]
pub fn key(name: &str) -> PropertyKey {
    PropertyKey::of(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_across_calls() {
        assert_eq!(key("health"), key("health"));
        assert_ne!(key("health"), key("heat"));
    }

    #[test]
    fn key_matches_known_digest() {
        // Pinned values guard against accidental changes to the derivation,
        // which would silently re-key every stored attribute.
        assert_eq!(key("health").raw(), 0xe1ad_a5a6_224e_4862);
        assert_eq!(key("ammo").raw(), 0xcaf7_2837_18a6_d824);
        assert_eq!(key("heat").raw(), 0xd8b7_3aaa_d90e_2a5a);
    }

    #[test]
    fn display_is_zero_padded_hex() {
        assert_eq!(PropertyKey(0x2a).to_string(), "0x000000000000002a");
    }
}
