//! Keccak-256 Fiat–Shamir transcript.
//!
//! The [`Transcript`] type accumulates big-endian scalar and uncompressed G1
//! encodings, and each call to [`Transcript::challenge`] hashes the pending
//! bytes with Keccak-256, reduces the digest modulo the scalar order and
//! starts a fresh round.  Nothing is carried between rounds implicitly;
//! callers chain rounds by appending the previous challenge explicitly.

use ark_bn254::G1Affine;
use ark_ff::PrimeField;
use sha3::{Digest, Keccak256};

use crate::curve::g1_to_uncompressed;
use crate::field::{to_bytes_be, Fr};

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// Byte transcript that derives scalar-field challenges.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pending: Vec<u8>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scalar as 32 big-endian bytes.
    pub fn append_scalar(&mut self, value: &Fr) {
        self.pending.extend_from_slice(&to_bytes_be(value));
    }

    /// Appends a G1 point in its 64-byte uncompressed form.
    pub fn append_point(&mut self, point: &G1Affine) {
        self.pending.extend_from_slice(&g1_to_uncompressed(point));
    }

    /// Returns the bytes absorbed since the last challenge.
    pub fn snapshot(&self) -> &[u8] {
        &self.pending
    }

    /// Hashes the pending bytes into a challenge and resets the round.
    pub fn challenge(&mut self) -> Fr {
        let digest = keccak256(&self.pending);
        self.pending.clear();
        Fr::from_be_bytes_mod_order(&digest)
    }
}
