//! Error taxonomy for the voting state machine.
//!
//! Every rejection that can leave `check_tx` or `deliver_tx` is a
//! [`VoteError`].  Each variant maps to a stable numeric response code so
//! hosts and clients can branch on the failure class without parsing the
//! accompanying log text.

use crate::field::FieldError;
use crate::plonk::ProofError;
use crate::tree::TreeError;
use thiserror::Error;

/// Response code reported for accepted transactions.
pub const CODE_OK: u32 = 0;

/// Reasons a transaction is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("malformed transaction: {0}")]
    /// The envelope or one of its payloads failed structural decoding.
    MalformedTransaction(String),
    #[error("unknown transaction type: {0}")]
    /// The envelope `type` was not one of `register`, `vote`, `admin`.
    UnknownTransactionType(String),
    #[error("{kind} at {now} outside window [{start}, {end}]")]
    /// The block time lies outside the relevant election window.
    OutOfWindow {
        /// Transaction kind that was attempted.
        kind: &'static str,
        /// Block time supplied by the host.
        now: i64,
        /// Inclusive window start.
        start: i64,
        /// Inclusive window end.
        end: i64,
    },
    #[error("chip authentication failed: {0}")]
    /// The document chip failed passive or active authentication.
    ChipAuthenticationFailed(&'static str),
    #[error("proof verification failed: {0}")]
    /// The vote proof was rejected by the verifier or could not be checked.
    ProofVerificationFailed(String),
    #[error("unknown candidate: {0:?}")]
    /// The decoded candidate name is not in the registry.
    UnknownCandidate(String),
    #[error("identity already registered")]
    /// The chip identity was already used in this election.
    AlreadyRegistered,
    #[error("nullifier {0} has already voted")]
    /// The nullifier hash was already spent in this election.
    AlreadyVoted(String),
    #[error("admin verification failed")]
    /// The admin payload does not match the pinned administrator key.
    AdminAuthFailed,
    #[error("identity tree is full ({capacity} leaves)")]
    /// The identity tree has no free leaf slots.
    TreeFull {
        /// Leaf capacity of the tree.
        capacity: u64,
    },
    #[error("arithmetic decode error: {0}")]
    /// A numeral or encoded element could not be decoded into the field.
    ArithmeticDecodeError(String),
}

impl VoteError {
    /// Stable response code for this rejection class.
    pub fn code(&self) -> u32 {
        match self {
            Self::MalformedTransaction(_) => 1,
            Self::UnknownTransactionType(_) => 2,
            Self::OutOfWindow { .. } => 3,
            Self::ChipAuthenticationFailed(_) => 4,
            Self::ProofVerificationFailed(_) => 5,
            Self::UnknownCandidate(_) => 6,
            Self::AlreadyRegistered => 7,
            Self::AlreadyVoted(_) => 8,
            Self::AdminAuthFailed => 9,
            Self::TreeFull { .. } => 10,
            Self::ArithmeticDecodeError(_) => 11,
        }
    }
}

impl From<FieldError> for VoteError {
    fn from(err: FieldError) -> Self {
        Self::ArithmeticDecodeError(err.to_string())
    }
}

impl From<TreeError> for VoteError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::Full { capacity } => Self::TreeFull { capacity },
            other => Self::MalformedTransaction(other.to_string()),
        }
    }
}

impl From<ProofError> for VoteError {
    fn from(err: ProofError) -> Self {
        match err {
            ProofError::Field(inner) => Self::ArithmeticDecodeError(inner.to_string()),
            other => Self::MalformedTransaction(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct_and_nonzero() {
        let errors = [
            VoteError::MalformedTransaction(String::new()),
            VoteError::UnknownTransactionType(String::new()),
            VoteError::OutOfWindow {
                kind: "vote",
                now: 0,
                start: 1,
                end: 2,
            },
            VoteError::ChipAuthenticationFailed("tampered chip"),
            VoteError::ProofVerificationFailed(String::new()),
            VoteError::UnknownCandidate(String::new()),
            VoteError::AlreadyRegistered,
            VoteError::AlreadyVoted(String::new()),
            VoteError::AdminAuthFailed,
            VoteError::TreeFull { capacity: 4 },
            VoteError::ArithmeticDecodeError(String::new()),
        ];
        let mut codes: Vec<u32> = errors.iter().map(VoteError::code).collect();
        assert!(codes.iter().all(|&c| c != CODE_OK));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn tree_full_maps_to_tree_full() {
        let err: VoteError = TreeError::Full { capacity: 8 }.into();
        assert_eq!(err, VoteError::TreeFull { capacity: 8 });
        assert_eq!(err.code(), 10);
    }
}
