use sha2::{Digest, Sha256};

const HASH_BLOCK_U64_COUNT: usize = 4;

pub type HashBlock = [u64; HASH_BLOCK_U64_COUNT];

pub const HASH_ZERO_BLOCK: HashBlock = [0; HASH_BLOCK_U64_COUNT];

/// SHA-256 over the little-endian bytes of `input`, read back as four little-endian words.
pub fn hash(input: &[u64]) -> HashBlock {
    let mut hasher = Sha256::new();
    for word in input {
        hasher.update(word.to_le_bytes());
    }
    let digest = hasher.finalize();
    let mut destination = HASH_ZERO_BLOCK;
    for (word, bytes) in destination.iter_mut().zip(digest.chunks_exact(8)) {
        let mut buffer = [0u8; 8];
        buffer.copy_from_slice(bytes);
        *word = u64::from_le_bytes(buffer);
    }
    destination
}
