//! Salted, iterated SHA-256 password hashes.
//!
//! Stored format: `sha256$<iterations>$<salt hex>$<digest hex>`.

use rand::RngCore;
use sha2::{Digest, Sha256};

const ALGORITHM: &str = "sha256";
pub const DEFAULT_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let mut digest: [u8; 32] = hasher.finalize().into();

    for _ in 1..iterations {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(password.as_bytes());
        digest = hasher.finalize().into();
    }
    digest
}

/// Hashes `password` with a random salt
pub fn hash_password(password: &str) -> String {
    hash_with_iterations(password, DEFAULT_ITERATIONS)
}

pub(crate) fn hash_with_iterations(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = derive(password, &salt, iterations.max(1));
    format!(
        "{}${}${}${}",
        ALGORITHM,
        iterations.max(1),
        hex::encode(salt),
        hex::encode(digest)
    )
}

/// Checks `password` against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(ALGORITHM), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    let (Ok(iterations), Ok(salt), Ok(expected)) =
        (iterations.parse::<u32>(), hex::decode(salt), hex::decode(expected))
    else {
        return false;
    };
    if iterations == 0 {
        return false;
    }

    let actual = derive(password, &salt, iterations);
    constant_time_eq(&actual, &expected)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
