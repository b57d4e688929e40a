use sha2::{Digest, Sha256, Sha512};

/// Minimal incremental-hashing trait: update as bytes stream through,
/// finalize once at the end. Lets [`crate::checksum::verify_checksum`] stay
/// generic over the algorithm.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Vec<u8>;
}

#[derive(Default)]
pub struct Sha256Hasher(Sha256);

impl Sha256Hasher {
    pub fn new() -> Self { Self(Sha256::new()) }
    pub fn digest(data: &[u8]) -> Vec<u8> { Sha256::digest(data).to_vec() }
}

impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

#[derive(Default)]
pub struct Sha512Hasher(Sha512);

impl Sha512Hasher {
    pub fn new() -> Self { Self(Sha512::new()) }
    pub fn digest(data: &[u8]) -> Vec<u8> { Sha512::digest(data).to_vec() }
}

impl Hasher for Sha512Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        let digest = Sha256Hasher::digest(b"hello world");
        assert_eq!(hex::encode(digest), "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde");
    }

    #[test]
    fn incremental_update_matches_one_shot_digest() {
        let mut hasher = Sha256Hasher::new();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.finalize(), Sha256Hasher::digest(b"hello world"));
    }
}
