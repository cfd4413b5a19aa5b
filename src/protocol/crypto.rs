//! Cryptographic functions for password digest authentication.
//!
//! The password never crosses the wire. The client proves knowledge of it with
//! a digest bound to the server scramble, and the server proves knowledge of the
//! stored verifier by returning a signing key the client recomputes.

use crate::protocol::constants::{
    CLIENT_KEY_LEN, DIGEST_CLIENT_KEY_LABEL, DIGEST_SERVER_KEY_LABEL,
};
use hmac::{Hmac, Mac};
use md5::Md5;
use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Size of every derived key and of the digest sent as the password.
pub const DIGEST_LEN: usize = 32;

/// Compute MD5 hash.
pub fn md5_hash(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 hash.
pub fn sha256_hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute HMAC-SHA256.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Generate cryptographically secure random bytes.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    use rand::RngCore;
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Compare two byte strings without short-circuiting on the first difference.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Keys derived from the password for one login.
#[derive(Clone)]
pub struct PasswordDigest {
    /// Digest sent in place of the password.
    pub proof: [u8; DIGEST_LEN],
    /// Signing key the server must return.
    pub server_signature: [u8; DIGEST_LEN],
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordDigest").finish_non_exhaustive()
    }
}

impl PasswordDigest {
    /// Derive the login digest from the password and the server scramble.
    ///
    /// The salt is seeded with MD5 over the server part of the scramble (the
    /// bytes after the echoed client key), then stretched with
    /// PBKDF2-HMAC-SHA256 for `iterations` rounds.
    pub fn derive(password: &[u8], scramble: &[u8], iterations: u32) -> Self {
        let server_part = scramble.get(CLIENT_KEY_LEN..).unwrap_or(&[]);
        let salt = md5_hash(server_part);

        let mut salted = [0u8; DIGEST_LEN];
        pbkdf2_hmac::<Sha256>(password, &salt, iterations.max(1), &mut salted);

        let client_key = hmac_sha256(&salted, DIGEST_CLIENT_KEY_LABEL);
        let stored_key = sha256_hash(&client_key);
        let client_signature = hmac_sha256(&stored_key, scramble);

        let mut proof = [0u8; DIGEST_LEN];
        for (i, byte) in proof.iter_mut().enumerate() {
            *byte = client_key[i] ^ client_signature[i];
        }

        let server_key = hmac_sha256(&salted, DIGEST_SERVER_KEY_LABEL);
        let server_signature = hmac_sha256(&server_key, scramble);

        Self {
            proof,
            server_signature,
        }
    }

    /// Check the signing key returned in the login response.
    pub fn verify_server(&self, signing_key: &[u8]) -> bool {
        constant_time_eq(&self.server_signature, signing_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        let scramble = [7u8; 64];
        let a = PasswordDigest::derive(b"secret", &scramble, 16);
        let b = PasswordDigest::derive(b"secret", &scramble, 16);
        assert_eq!(a.proof, b.proof);
        assert_eq!(a.server_signature, b.server_signature);
        assert_ne!(a.proof.as_slice(), b"secret".as_slice());
    }

    #[test]
    fn test_digest_depends_on_inputs() {
        let scramble = [7u8; 64];
        let base = PasswordDigest::derive(b"secret", &scramble, 16);
        assert_ne!(base.proof, PasswordDigest::derive(b"secret2", &scramble, 16).proof);
        assert_ne!(base.proof, PasswordDigest::derive(b"secret", &scramble, 17).proof);

        let mut other = scramble;
        other[40] ^= 1;
        assert_ne!(base.proof, PasswordDigest::derive(b"secret", &other, 16).proof);
    }

    #[test]
    fn test_short_scramble_is_accepted() {
        let digest = PasswordDigest::derive(b"pw", &[0u8; 32], 1);
        assert_eq!(digest.proof.len(), DIGEST_LEN);
    }

    #[test]
    fn test_verify_server() {
        let digest = PasswordDigest::derive(b"pw", &[1u8; 48], 4);
        let expected = digest.server_signature;
        assert!(digest.verify_server(&expected));

        let mut wrong = expected;
        wrong[0] ^= 0xFF;
        assert!(!digest.verify_server(&wrong));
        assert!(!digest.verify_server(&expected[..31]));
    }

    #[test]
    fn test_known_hashes() {
        assert_eq!(
            md5_hash(b""),
            [
                0xd4, 0x1d, 0x8c, 0xd9, 0x8f, 0x00, 0xb2, 0x04, 0xe9, 0x80, 0x09, 0x98, 0xec,
                0xf8, 0x42, 0x7e
            ]
        );
        assert_eq!(sha256_hash(b"abc")[0..4], [0xba, 0x78, 0x16, 0xbf]);
    }
}
