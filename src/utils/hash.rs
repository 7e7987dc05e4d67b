use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of a byte buffer as lowercase hex.
///
/// Used to derive content-addressed names for uploaded files, so re-uploading
/// the same image maps to the same stored name.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        // sha256("abc")
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_hex_is_deterministic() {
        assert_eq!(sha256_hex(b"atelier"), sha256_hex(b"atelier"));
        assert_ne!(sha256_hex(b"atelier"), sha256_hex(b"ateliers"));
    }
}
