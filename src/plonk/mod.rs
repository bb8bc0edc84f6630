//! PLONK verification over BN254.
//!
//! [`keys`] holds the decoded key, proof and public-signal types together
//! with their snarkjs JSON documents; [`verifier`] runs the pipeline.

pub mod keys;
pub mod verifier;

#[cfg(test)]
pub(crate) mod fixtures;

pub use keys::{
    Proof, ProofError, ProofJson, PublicSignals, VerificationKey, VerificationKeyJson,
};
pub use verifier::{verify, Challenges};
