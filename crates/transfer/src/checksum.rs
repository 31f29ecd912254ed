use sha2::{Digest, Sha256};

/// Error returned when a payload does not hash to the advertised value.
#[derive(Debug, thiserror::Error)]
#[error("checksum mismatch: expected {expected}, got {actual}")]
pub struct ChecksumError {
    pub expected: String,
    pub actual: String,
}

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Returns `true` if `s` looks like a hex-encoded SHA-256 digest.
pub fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Verifies `data` against a hex SHA-256 digest (case-insensitive).
pub fn verify_sha256(data: &[u8], expected: &str) -> Result<(), ChecksumError> {
    let actual = checksum_bytes(data);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ChecksumError {
            expected: expected.to_string(),
            actual,
        })
    }
}
