//! OTP code generation and hashing.
//!
//! Codes are generated from the OS RNG and only a salted HMAC-SHA256 digest
//! is ever stored; the plaintext code exists in memory just long enough to
//! hand to a delivery provider.

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SALT_BYTES: usize = 16;

/// Generator for numeric OTP codes.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    length: usize,
}

impl CodeGenerator {
    /// Creates a generator for codes of the given length.
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    /// Generates a new numeric code with leading zeros preserved.
    pub fn generate(&self) -> String {
        let mut rng = OsRng;
        (0..self.length)
            .map(|_| char::from(b'0' + (rng.next_u32() % 10) as u8))
            .collect()
    }

    /// Generates a fresh opaque request ID.
    pub fn generate_request_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(6)
    }
}

/// Salted one-way hashing for OTP codes.
///
/// Each record carries its own random salt, so identical codes sent to
/// different phones never share a digest.
#[derive(Debug, Clone, Default)]
pub struct CodeHasher;

impl CodeHasher {
    /// Generates a fresh random salt, hex-encoded.
    pub fn generate_salt() -> String {
        let mut salt = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut salt);
        hex::encode(salt)
    }

    /// Hashes a code with the given hex-encoded salt.
    pub fn hash(&self, code: &str, salt: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(salt.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(code.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verifies a code against a stored digest in constant time.
    pub fn verify(&self, code: &str, salt: &str, stored_hash: &str) -> bool {
        let computed = self.hash(code, salt);
        constant_time_compare(&computed, stored_hash)
    }
}

/// Constant-time string comparison to avoid timing side channels.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_length_and_digits() {
        let generator = CodeGenerator::new(6);
        let code = generator.generate();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_codes_vary() {
        let generator = CodeGenerator::default();
        let codes: std::collections::HashSet<String> =
            (0..100).map(|_| generator.generate()).collect();
        assert!(codes.len() > 90);
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = CodeHasher;
        let salt = CodeHasher::generate_salt();
        let digest = hasher.hash("123456", &salt);

        assert_ne!(digest, "123456");
        assert!(hasher.verify("123456", &salt, &digest));
        assert!(!hasher.verify("654321", &salt, &digest));
    }

    #[test]
    fn test_salt_changes_digest() {
        let hasher = CodeHasher;
        let a = hasher.hash("123456", &CodeHasher::generate_salt());
        let b = hasher.hash("123456", &CodeHasher::generate_salt());
        assert_ne!(a, b);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
