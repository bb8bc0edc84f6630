//! Transaction envelopes and validate-phase decoding.
//!
//! [`Transaction::decode`] is the whole validate phase: it parses the JSON
//! envelope, dispatches on `type` and decodes the matching payload into
//! field elements, curve points and keys.  It never looks at election
//! state, so `check_tx` and `deliver_tx` run the same function.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chip::RegistrationData;
use crate::election::ElectionWindow;
use crate::error::VoteError;
use crate::field::{from_hex_mod_order, to_decimal, to_minimal_bytes, Fr};
use crate::plonk::{Proof, ProofJson, PublicSignals, VerificationKey, VerificationKeyJson};

/// Number of public signals a ballot proof carries.
pub const BALLOT_SIGNALS: usize = 2;

/// Vote payload (`pdata`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePayload {
    /// PLONK proof of eligibility.
    pub proof: ProofJson,
    /// Public signals: candidate identifier, then nullifier hash.
    pub public: Vec<String>,
}

/// Candidate names and their starting tallies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CandidateList {
    /// Candidate names.
    pub name: Vec<String>,
    /// Starting tally per name.
    pub vote: Vec<i64>,
}

/// Admin payload (`adata`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPayload {
    /// Verification key for the new election.
    pub vkey: VerificationKeyJson,
    /// Candidate registry.
    pub cand: CandidateList,
    /// Registration window start.
    pub regstart: i64,
    /// Registration window end.
    pub regend: i64,
    /// Voting window start.
    pub votestart: i64,
    /// Voting window end.
    pub voteend: i64,
}

/// Wire envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// `register`, `vote` or `admin`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Registration payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vdata: Option<RegistrationData>,
    /// Vote payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdata: Option<VotePayload>,
    /// Admin payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adata: Option<AdminPayload>,
}

/// Decoded registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Raw chip data handed to the authenticator.
    pub data: RegistrationData,
    /// Leaf value, `h` reduced into the scalar field.
    pub leaf: Fr,
    /// Used-identity key.
    pub identity: String,
}

/// Decoded ballot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    /// Eligibility proof.
    pub proof: Proof,
    /// Public signals in circuit order.
    pub public: PublicSignals,
    /// Candidate name carried by the first signal.
    pub candidate: CandidateName,
    /// Canonical decimal of the nullifier hash.
    pub nullifier: String,
}

/// Candidate identifier decoded from a field element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateName {
    /// The minimal big-endian bytes were valid UTF-8.
    Text(String),
    /// The bytes were not UTF-8; hex kept for diagnostics.
    Invalid(String),
}

impl CandidateName {
    /// Decodes the name carried by `value`.
    pub fn from_field(value: &Fr) -> Self {
        let bytes = to_minimal_bytes(value);
        match String::from_utf8(bytes) {
            Ok(text) => Self::Text(text),
            Err(err) => Self::Invalid(hex::encode(err.into_bytes())),
        }
    }
}

/// Decoded admin update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUpdate {
    /// Key document as received; its digest authenticates the update.
    pub vkey_json: VerificationKeyJson,
    /// Decoded verification key.
    pub key: VerificationKey,
    /// New candidate registry.
    pub candidates: BTreeMap<String, i64>,
    /// New election windows.
    pub window: ElectionWindow,
}

/// A validated transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// Voter registration.
    Register(Registration),
    /// Anonymous vote.
    Vote(Box<Ballot>),
    /// Election reset by the administrator.
    Admin(Box<AdminUpdate>),
}

impl Transaction {
    /// Short name of the transaction kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Register(_) => "register",
            Self::Vote(_) => "vote",
            Self::Admin(_) => "admin",
        }
    }

    /// Parses and structurally validates raw transaction bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, VoteError> {
        let envelope: Envelope = serde_json::from_slice(bytes)
            .map_err(|err| VoteError::MalformedTransaction(err.to_string()))?;
        match envelope.kind.as_str() {
            "register" => {
                let data = envelope
                    .vdata
                    .ok_or_else(|| missing("vdata"))?;
                decode_registration(data).map(Self::Register)
            }
            "vote" => {
                let payload = envelope.pdata.ok_or_else(|| missing("pdata"))?;
                decode_ballot(&payload).map(|b| Self::Vote(Box::new(b)))
            }
            "admin" => {
                let payload = envelope.adata.ok_or_else(|| missing("adata"))?;
                decode_admin(payload).map(|a| Self::Admin(Box::new(a)))
            }
            other => Err(VoteError::UnknownTransactionType(other.to_string())),
        }
    }
}

fn missing(field: &str) -> VoteError {
    VoteError::MalformedTransaction(format!("missing {field}"))
}

fn decode_registration(data: RegistrationData) -> Result<Registration, VoteError> {
    data.check_encoding()
        .map_err(VoteError::MalformedTransaction)?;
    let leaf = from_hex_mod_order(&data.h)?;
    let identity = data.identity_key();
    Ok(Registration {
        data,
        leaf,
        identity,
    })
}

fn decode_ballot(payload: &VotePayload) -> Result<Ballot, VoteError> {
    if payload.public.len() != BALLOT_SIGNALS {
        return Err(VoteError::MalformedTransaction(format!(
            "expected {BALLOT_SIGNALS} public signals, found {}",
            payload.public.len()
        )));
    }
    let proof = Proof::try_from(&payload.proof)?;
    let public = PublicSignals::parse(&payload.public)?;
    let candidate = CandidateName::from_field(&public.as_slice()[0]);
    let nullifier = to_decimal(&public.as_slice()[1]);
    Ok(Ballot {
        proof,
        public,
        candidate,
        nullifier,
    })
}

fn decode_admin(payload: AdminPayload) -> Result<AdminUpdate, VoteError> {
    let key = VerificationKey::try_from(&payload.vkey)?;
    let CandidateList { name, vote } = payload.cand;
    if name.len() != vote.len() {
        return Err(VoteError::MalformedTransaction(format!(
            "{} candidate names but {} tallies",
            name.len(),
            vote.len()
        )));
    }
    let mut candidates = BTreeMap::new();
    for (name, tally) in name.into_iter().zip(vote) {
        if candidates.insert(name.clone(), tally).is_some() {
            return Err(VoteError::MalformedTransaction(format!(
                "duplicate candidate {name:?}"
            )));
        }
    }
    let window = ElectionWindow {
        reg_start: payload.regstart,
        reg_end: payload.regend,
        vote_start: payload.votestart,
        vote_end: payload.voteend,
    };
    window
        .check_ordered()
        .map_err(VoteError::MalformedTransaction)?;
    Ok(AdminUpdate {
        vkey_json: payload.vkey,
        key,
        candidates,
        window,
    })
}
