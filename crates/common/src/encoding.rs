//! 32-byte word encoding shared by the commitment hash and the attestation
//! signing digest. Every field occupies one big-endian, left-padded word so
//! the byte layout is independent of field widths.

use crate::{Identity, U256};
use sha2::{Digest, Sha256};

pub type Word = [u8; 32];

pub fn word_u64(v: u64) -> Word {
    U256::from(v).to_be_bytes()
}

pub fn word_bool(v: bool) -> Word {
    U256::from(v).to_be_bytes()
}

pub fn word_u256(v: &U256) -> Word {
    v.to_be_bytes()
}

pub fn word_identity(v: &Identity) -> Word {
    *v.as_bytes()
}

/// SHA-256 over a sequence of words
pub fn hash_words(words: &[Word]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for w in words {
        hasher.update(w);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// SHA-256 of arbitrary bytes
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(bytes));
    out
}
