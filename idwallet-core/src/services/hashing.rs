//! Salted PIN hashing
//!
//! SHA-256 over the UTF-8 bytes of `"{salt}:{pin}"`, lowercase hex. The same
//! construction is used on-device and by the remote account PIN check, so a
//! hash computed on either side can be compared with the other.

use constant_time_eq::constant_time_eq;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Salt size in bytes (hex-encoded to 32 characters)
pub const SALT_LEN: usize = 16;

/// Hex length of a SHA-256 digest
pub const HASH_HEX_LEN: usize = 64;

/// Hash a PIN with its salt
pub fn hash_pin(pin: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(pin.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a fresh random salt from the OS RNG
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    hex::encode(salt)
}

/// Check a PIN against a stored hash/salt pair
///
/// Returns `false` without hashing when either the salt or the expected hash
/// is empty: there is nothing to verify against.
pub fn matches(pin: &str, salt: &str, expected_hash: &str) -> bool {
    if salt.is_empty() || expected_hash.is_empty() {
        return false;
    }
    constant_time_eq(hash_pin(pin, salt).as_bytes(), expected_hash.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let salt = "00112233445566778899aabbccddeeff";
        assert_eq!(hash_pin("482917", salt), hash_pin("482917", salt));
    }

    #[test]
    fn test_hash_format() {
        let hash = hash_pin("4821", &generate_salt());
        assert_eq!(hash.len(), HASH_HEX_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_known_vector() {
        // sha256("salt:1234"), matches `printf 'salt:1234' | sha256sum`
        assert_eq!(
            hash_pin("1234", "salt"),
            "35c56314f89066056408d6d269daf9e69217b9953215f286eec86cec3076271a"
        );
        assert_eq!(
            hash_pin("482917", "00112233445566778899aabbccddeeff"),
            "5891cea06a90c11d0291c9505435eccacf137316afdd7690d739bbe5b72b6ce1"
        );
    }

    #[test]
    fn test_changing_either_input_changes_hash() {
        let salt_a = generate_salt();
        let salt_b = generate_salt();
        assert_ne!(salt_a, salt_b);
        assert_ne!(hash_pin("4821", &salt_a), hash_pin("4821", &salt_b));
        assert_ne!(hash_pin("4821", &salt_a), hash_pin("4822", &salt_a));
    }

    #[test]
    fn test_separator_prevents_ambiguity() {
        // "ab" + "1234" must differ from "a" + "b1234"
        assert_ne!(hash_pin("1234", "ab"), hash_pin("b1234", "a"));
    }

    #[test]
    fn test_salt_format() {
        let salt = generate_salt();
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert!(hex::decode(&salt).is_ok());
    }

    #[test]
    fn test_matches() {
        let salt = generate_salt();
        let hash = hash_pin("193746", &salt);
        assert!(matches("193746", &salt, &hash));
        assert!(!matches("193747", &salt, &hash));
    }

    #[test]
    fn test_empty_salt_or_hash_never_matches() {
        let hash = hash_pin("4821", "");
        assert!(!matches("4821", "", &hash));
        assert!(!matches("4821", "abcd", ""));
    }

    #[test]
    fn test_matches_rejects_prefix_and_case_variants() {
        let salt = generate_salt();
        let hash = hash_pin("193746", &salt);
        assert!(!matches("193746", &salt, &hash[..63]));
        assert!(!matches("193746", &salt, &hash.to_uppercase()));
        assert!(!matches("193746", &salt, &format!("{hash}0")));
    }
}
