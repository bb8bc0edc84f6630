#![deny(missing_docs)]

//! # zkvote
//!
//! **zkvote** is the deterministic core of an anonymous voting chain.  A
//! registered voter proves membership in an identity tree with a PLONK proof
//! over BN254 and reveals only a nullifier hash, so one chip gets one vote
//! and the ballot cannot be traced back to the chip that registered it.
//!
//! ## Pieces
//!
//! * **Field and curve interface**: [`field`] decodes canonical decimal and
//!   hex numerals into the BN254 scalar and base fields; [`curve`] decodes
//!   G1/G2 points from snarkjs coordinate vectors and checks pairings.
//! * **Transcript**: [`transcript`] derives Fiat–Shamir challenges with
//!   Keccak-256.
//! * **MiMC sponge**: [`mimc`] is the 220-round compression hash shared with
//!   the eligibility circuit.
//! * **Identity tree**: [`tree`] is the depth-20 incremental Merkle tree of
//!   registered chips, with root history and membership paths.
//! * **PLONK verifier**: [`plonk`] parses snarkjs key and proof documents and
//!   runs the single-pairing verification.
//! * **State machine**: [`app`] drives [`election`] state through the
//!   [`abci`] callbacks, decoding transactions with [`tx`] and rejecting them
//!   with the codes in [`error`].
//!
//! ## Usage
//!
//! ```rust
//! use zkvote::abci::{Application, RequestQuery};
//! use zkvote::chip::TrustAll;
//! use zkvote::VotingApp;
//!
//! let mut app = VotingApp::new([0u8; 32], Box::new(TrustAll), 20).unwrap();
//! // Nothing is open until an administrator configures an election.
//! let res = app.deliver_tx(
//!     br#"{"type":"register","vdata":{"h":"01","aaSig":"aa","dg15":"bb","sod":"cc"}}"#,
//!     1_700_000_000,
//! );
//! assert_eq!(res.code, 3);
//! app.commit();
//! let total = app.query(&RequestQuery::new("total", Vec::new()));
//! assert_eq!(total.value, b"0");
//! ```

pub mod abci;
pub mod app;
pub mod chip;
pub mod config;
pub mod curve;
pub mod election;
pub mod error;
pub mod field;
pub mod mimc;
pub mod plonk;
pub mod transcript;
pub mod tree;
pub mod tx;

pub use app::VotingApp;
pub use chip::{ChipAuthenticator, RegistrationData, TrustAll};
pub use config::{AppConfig, ConfigError};
pub use election::{Election, ElectionWindow};
pub use error::{VoteError, CODE_OK};
pub use field::{FieldError, Fq, Fr};
pub use mimc::MimcSponge;
pub use plonk::{verify, Proof, ProofError, PublicSignals, VerificationKey};
pub use transcript::Transcript;
pub use tree::{IdentityTree, MerklePath, TreeError};
pub use tx::Transaction;
