//! Election-scoped state.
//!
//! Everything an admin transaction replaces lives in one [`Election`]
//! value: the verification key, the candidate registry, the windows, the
//! identity tree, the used-identity and nullifier sets, the leaf log and
//! the voter counter.  An admin update builds a fresh value and the
//! application swaps it in, so a reset is never partial.
//!
//! `register` and `vote` run every check before their first mutation.  The
//! only fallible mutation is the tree insert, which is atomic and happens
//! first, so a rejected transaction leaves the election untouched.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::chip::ChipAuthenticator;
use crate::error::VoteError;
use crate::field::to_decimal;
use crate::plonk::{self, VerificationKey};
use crate::tree::{IdentityTree, TreeError};
use crate::tx::{AdminUpdate, Ballot, CandidateName, Registration};

/// Window bound that keeps a window closed before the first admin update.
pub const SENTINEL_START: i64 = 9_999_999_999_999;

/// Inclusive registration and voting windows, in block-time seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectionWindow {
    /// First second registration is accepted.
    pub reg_start: i64,
    /// Last second registration is accepted.
    pub reg_end: i64,
    /// First second votes are accepted.
    pub vote_start: i64,
    /// Last second votes are accepted.
    pub vote_end: i64,
}

impl ElectionWindow {
    /// Windows that admit nothing.
    pub const fn closed() -> Self {
        Self {
            reg_start: SENTINEL_START,
            reg_end: 0,
            vote_start: SENTINEL_START,
            vote_end: 0,
        }
    }

    /// Fails unless each window has `start <= end`.
    pub fn check_ordered(&self) -> Result<(), String> {
        if self.reg_start > self.reg_end {
            return Err(format!(
                "registration window [{}, {}] is inverted",
                self.reg_start, self.reg_end
            ));
        }
        if self.vote_start > self.vote_end {
            return Err(format!(
                "voting window [{}, {}] is inverted",
                self.vote_start, self.vote_end
            ));
        }
        Ok(())
    }

    /// Admits `now` into the registration window.
    pub fn check_registration(&self, now: i64) -> Result<(), VoteError> {
        within("register", now, self.reg_start, self.reg_end)
    }

    /// Admits `now` into the voting window.
    pub fn check_voting(&self, now: i64) -> Result<(), VoteError> {
        within("vote", now, self.vote_start, self.vote_end)
    }
}

fn within(kind: &'static str, now: i64, start: i64, end: i64) -> Result<(), VoteError> {
    if now < start || now > end {
        return Err(VoteError::OutOfWindow {
            kind,
            now,
            start,
            end,
        });
    }
    Ok(())
}

/// State of one election.
#[derive(Debug, Clone)]
pub struct Election {
    key: Option<VerificationKey>,
    candidates: BTreeMap<String, i64>,
    window: ElectionWindow,
    tree: IdentityTree,
    used_identities: BTreeSet<String>,
    voted_nullifiers: BTreeSet<String>,
    leaf_log: Vec<String>,
    voter_count: u64,
}

impl Election {
    /// State before any admin update: no key, no candidates, closed windows.
    pub fn genesis(depth: usize) -> Result<Self, TreeError> {
        Ok(Self {
            key: None,
            candidates: BTreeMap::new(),
            window: ElectionWindow::closed(),
            tree: IdentityTree::new(depth)?,
            used_identities: BTreeSet::new(),
            voted_nullifiers: BTreeSet::new(),
            leaf_log: Vec::new(),
            voter_count: 0,
        })
    }

    /// Fresh election configured by an admin update.
    pub fn from_update(update: &AdminUpdate, depth: usize) -> Result<Self, TreeError> {
        Ok(Self {
            key: Some(update.key.clone()),
            candidates: update.candidates.clone(),
            window: update.window,
            ..Self::genesis(depth)?
        })
    }

    /// Registers a chip and returns the assigned leaf index.
    pub fn register(
        &mut self,
        reg: &Registration,
        now: i64,
        chip: &dyn ChipAuthenticator,
    ) -> Result<usize, VoteError> {
        self.window.check_registration(now)?;
        if !chip.verify_passive(&reg.data.dg15, &reg.data.sod) {
            return Err(VoteError::ChipAuthenticationFailed("tampered chip"));
        }
        if !chip.verify_active(&reg.data.h, &reg.data.aa_sig, &reg.data.dg15) {
            return Err(VoteError::ChipAuthenticationFailed("cloned chip"));
        }
        if self.used_identities.contains(&reg.identity) {
            return Err(VoteError::AlreadyRegistered);
        }
        let index = self.tree.insert(reg.leaf)?;
        self.used_identities.insert(reg.identity.clone());
        self.leaf_log.push(to_decimal(&reg.leaf));
        self.voter_count += 1;
        Ok(index)
    }

    /// Counts a ballot and returns the candidate it was cast for.
    pub fn vote(&mut self, ballot: &Ballot, now: i64) -> Result<String, VoteError> {
        self.window.check_voting(now)?;
        let name = match &ballot.candidate {
            CandidateName::Text(name) if self.candidates.contains_key(name) => name.clone(),
            CandidateName::Text(name) => return Err(VoteError::UnknownCandidate(name.clone())),
            CandidateName::Invalid(raw) => return Err(VoteError::UnknownCandidate(raw.clone())),
        };
        let key = self.key.as_ref().ok_or_else(|| {
            VoteError::ProofVerificationFailed("no verification key installed".into())
        })?;
        match plonk::verify(key, &ballot.proof, &ballot.public) {
            Ok(true) => {}
            Ok(false) => {
                return Err(VoteError::ProofVerificationFailed(
                    "pairing check failed".into(),
                ))
            }
            Err(err) => return Err(VoteError::ProofVerificationFailed(err.to_string())),
        }
        if self.voted_nullifiers.contains(&ballot.nullifier) {
            return Err(VoteError::AlreadyVoted(ballot.nullifier.clone()));
        }
        let tally = self.candidates.get(&name).copied().unwrap_or_default();
        let next = tally.checked_add(1).ok_or_else(|| {
            VoteError::MalformedTransaction(format!("tally for {name:?} would overflow"))
        })?;
        self.voted_nullifiers.insert(ballot.nullifier.clone());
        self.candidates.insert(name.clone(), next);
        debug!(candidate = %name, tally = next, "tally updated");
        Ok(name)
    }

    /// Installed verification key.
    pub fn key(&self) -> Option<&VerificationKey> {
        self.key.as_ref()
    }

    /// Candidate registry in name order.
    pub fn candidates(&self) -> &BTreeMap<String, i64> {
        &self.candidates
    }

    /// Tally of one candidate.
    pub fn tally(&self, name: &str) -> Option<i64> {
        self.candidates.get(name).copied()
    }

    /// Sum of all tallies, exact for any signed seeds.
    pub fn total_votes(&self) -> i128 {
        self.candidates.values().map(|v| i128::from(*v)).sum()
    }

    /// Current windows.
    pub fn window(&self) -> &ElectionWindow {
        &self.window
    }

    /// Identity tree.
    pub fn tree(&self) -> &IdentityTree {
        &self.tree
    }

    /// Decimal leaves in insertion order.
    pub fn leaf_log(&self) -> &[String] {
        &self.leaf_log
    }

    /// Number of registered voters.
    pub fn voter_count(&self) -> u64 {
        self.voter_count
    }

    /// Number of spent nullifiers.
    pub fn nullifier_count(&self) -> usize {
        self.voted_nullifiers.len()
    }

    /// Whether `nullifier` (canonical decimal) has voted.
    pub fn has_voted(&self, nullifier: &str) -> bool {
        self.voted_nullifiers.contains(nullifier)
    }
}
