use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 digest of a bundle's content.
///
/// Depends on the bytes alone, never on file metadata, so identical output
/// always produces the same hash and can be used for cache busting.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash32([u8; 32]);

impl Hash32 {
    pub fn hash(buffer: impl AsRef<[u8]>) -> Self {
        let digest = Sha256::digest(buffer.as_ref());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Hash32(bytes)
    }

    pub async fn hash_file(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let buffer = tokio::fs::read(path).await?;
        Ok(Self::hash(buffer))
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            Hash32::hash("abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(Hash32::hash("").to_hex().len(), 64);
    }

    #[test]
    fn test_single_byte_change() {
        let a = Hash32::hash(b"export const x = 1;");
        let b = Hash32::hash(b"export const x = 2;");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_hash_file_matches_content() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.js");
        let two = dir.path().join("two.js");
        std::fs::write(&one, "console.log(1)").unwrap();
        std::fs::write(&two, "console.log(1)").unwrap();

        let a = Hash32::hash_file(&one).await.unwrap();
        let b = Hash32::hash_file(&two).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a, Hash32::hash("console.log(1)"));
    }
}
