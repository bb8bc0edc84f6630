//! The voting state machine.
//!
//! [`VotingApp`] owns all replicated state.  The host calls `deliver_tx`
//! for each transaction of a block in order, then `commit`; ordering inside
//! a block is what decides between two votes that share a nullifier.
//! Rejections never escape as panics: every failure becomes a
//! [`VoteError`] mapped to a response code on that one transaction.

use serde_json::json;
use tracing::{debug, info, warn};

use crate::abci::{
    Application, Event, RequestQuery, ResponseCheckTx, ResponseCommit, ResponseDeliverTx,
    ResponseInfo, ResponseQuery,
};
use crate::chip::ChipAuthenticator;
use crate::config::{AppConfig, ConfigError};
use crate::election::Election;
use crate::error::{VoteError, CODE_OK};
use crate::field::{from_hex_mod_order, to_hex};
use crate::tree::TreeError;
use crate::tx::{AdminUpdate, Ballot, Registration, Transaction};

/// Name reported by `info`.
pub const APP_NAME: &str = "Zkvoting";

/// Application protocol version.
pub const APP_VERSION: u64 = 1;

/// Replicated election state machine.
pub struct VotingApp {
    admin_digest: [u8; 32],
    chip: Box<dyn ChipAuthenticator>,
    depth: usize,
    election: Election,
    election_id: u64,
    height: i64,
    app_hash: Option<String>,
}

impl std::fmt::Debug for VotingApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VotingApp")
            .field("admin_digest", &hex::encode(self.admin_digest))
            .field("depth", &self.depth)
            .field("election_id", &self.election_id)
            .field("height", &self.height)
            .field("app_hash", &self.app_hash)
            .finish_non_exhaustive()
    }
}

impl VotingApp {
    /// Creates the genesis state pinned to `admin_digest`.
    pub fn new(
        admin_digest: [u8; 32],
        chip: Box<dyn ChipAuthenticator>,
        depth: usize,
    ) -> Result<Self, TreeError> {
        Ok(Self {
            admin_digest,
            chip,
            depth,
            election: Election::genesis(depth)?,
            election_id: 0,
            height: 0,
            app_hash: None,
        })
    }

    /// Creates the genesis state described by `config`.
    pub fn from_config(
        config: &AppConfig,
        chip: Box<dyn ChipAuthenticator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let digest = config.admin_digest()?;
        Self::new(digest, chip, config.tree_depth)
            .map_err(|_| ConfigError::InvalidDepth(config.tree_depth))
    }

    /// Current election.
    pub fn election(&self) -> &Election {
        &self.election
    }

    /// Number of admin updates applied so far.
    pub fn election_id(&self) -> u64 {
        self.election_id
    }

    /// Last committed height.
    pub fn height(&self) -> i64 {
        self.height
    }

    /// Last committed application hash, `None` until the first commit after
    /// an admin update.
    pub fn app_hash(&self) -> Option<&str> {
        self.app_hash.as_deref()
    }

    fn apply(&mut self, tx: Transaction, time: i64) -> Result<Event, VoteError> {
        match tx {
            Transaction::Register(reg) => self.apply_register(&reg, time),
            Transaction::Vote(ballot) => self.apply_vote(&ballot, time),
            Transaction::Admin(update) => self.apply_admin(*update, time),
        }
    }

    fn apply_register(&mut self, reg: &Registration, time: i64) -> Result<Event, VoteError> {
        let index = self.election.register(reg, time, self.chip.as_ref())?;
        info!(kind = "register", index, identity = %reg.identity, "voter registered");
        Ok(Event::new("register")
            .attr("voter id", index, true)
            .attr("hash", &reg.data.h, false)
            .attr("time", time, false))
    }

    fn apply_vote(&mut self, ballot: &Ballot, time: i64) -> Result<Event, VoteError> {
        let candidate = self.election.vote(ballot, time)?;
        info!(kind = "vote", candidate = %candidate, nullifier = %ballot.nullifier, "vote counted");
        Ok(Event::new("vote")
            .attr("candidate", &candidate, false)
            .attr("nullifier hash", &ballot.nullifier, false)
            .attr("time", time, true))
    }

    fn apply_admin(&mut self, update: AdminUpdate, time: i64) -> Result<Event, VoteError> {
        let digest = update
            .vkey_json
            .digest()
            .map_err(|err| VoteError::MalformedTransaction(err.to_string()))?;
        if digest != self.admin_digest {
            return Err(VoteError::AdminAuthFailed);
        }
        let election = Election::from_update(&update, self.depth)?;
        self.election = election;
        // Event ids are zero-based; the counter tracks completed updates.
        let vote_id = self.election_id;
        self.election_id += 1;
        // The committed root belongs to the replaced election.
        self.app_hash = None;
        let w = update.window;
        info!(
            kind = "admin",
            election = vote_id,
            candidates = update.candidates.len(),
            "election reset"
        );
        Ok(Event::new("admin")
            .attr("vote id", vote_id, true)
            .attr("regstart", w.reg_start, false)
            .attr("regend", w.reg_end, false)
            .attr("votestart", w.vote_start, false)
            .attr("voteend", w.vote_end, false)
            .attr("time", time, false))
    }

    fn path_query(&self, data: &[u8], resp: &mut ResponseQuery) {
        let text = String::from_utf8_lossy(data);
        let leaf = match from_hex_mod_order(text.trim()) {
            Ok(leaf) => leaf,
            Err(err) => {
                let err = VoteError::from(err);
                resp.code = err.code();
                resp.log = err.to_string();
                return;
            }
        };
        let tree = self.election.tree();
        match tree.index_of(&leaf).map(|index| tree.path(index)) {
            Some(Ok(path)) => {
                resp.key = b"Path".to_vec();
                resp.value = path.to_json().to_string().into_bytes();
            }
            Some(Err(err)) => resp.log = err.to_string(),
            None => resp.log = "Leaf not found".to_string(),
        }
    }
}

impl Application for VotingApp {
    fn info(&self) -> ResponseInfo {
        ResponseInfo {
            data: APP_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            app_version: APP_VERSION,
            last_block_height: self.height,
            last_block_app_hash: self.app_hash.as_ref().map(|h| h.as_bytes().to_vec()),
        }
    }

    fn check_tx(&self, tx: &[u8]) -> ResponseCheckTx {
        match Transaction::decode(tx) {
            Ok(_) => ResponseCheckTx {
                code: CODE_OK,
                log: String::new(),
                gas_wanted: 1,
            },
            Err(err) => {
                debug!(code = err.code(), reason = %err, "check_tx rejected");
                ResponseCheckTx {
                    code: err.code(),
                    log: err.to_string(),
                    gas_wanted: 1,
                }
            }
        }
    }

    fn deliver_tx(&mut self, tx: &[u8], time: i64) -> ResponseDeliverTx {
        let decoded = match Transaction::decode(tx) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!(code = err.code(), reason = %err, "deliver_tx failed validation");
                return ResponseDeliverTx {
                    code: err.code(),
                    log: err.to_string(),
                    events: Vec::new(),
                };
            }
        };
        let kind = decoded.kind();
        match self.apply(decoded, time) {
            Ok(event) => ResponseDeliverTx {
                code: CODE_OK,
                log: String::new(),
                events: vec![event],
            },
            Err(err) => {
                warn!(kind, code = err.code(), reason = %err, "transaction rejected");
                ResponseDeliverTx {
                    code: err.code(),
                    log: err.to_string(),
                    events: Vec::new(),
                }
            }
        }
    }

    fn commit(&mut self) -> ResponseCommit {
        self.height += 1;
        if self.election_id > 0 {
            self.app_hash = Some(to_hex(&self.election.tree().current_root()));
        }
        info!(height = self.height, root = ?self.app_hash, "block committed");
        ResponseCommit {
            data: self
                .app_hash
                .as_ref()
                .map(|h| h.as_bytes().to_vec())
                .unwrap_or_default(),
            retain_height: 0,
        }
    }

    fn query(&self, req: &RequestQuery) -> ResponseQuery {
        let mut resp = ResponseQuery {
            height: self.height,
            ..ResponseQuery::default()
        };
        let election = &self.election;
        match req.path.as_str() {
            "root" => {
                resp.key = b"Root".to_vec();
                resp.value = to_hex(&election.tree().current_root()).into_bytes();
            }
            "total" => {
                resp.key = b"Total vote".to_vec();
                resp.value = election.total_votes().to_string().into_bytes();
            }
            "candidate1" => {
                let tally = std::str::from_utf8(&req.data)
                    .ok()
                    .and_then(|name| election.tally(name));
                match tally {
                    Some(count) => {
                        resp.key = b"Vote count".to_vec();
                        resp.value = count.to_string().into_bytes();
                        resp.log = "Candidate found".to_string();
                    }
                    None => resp.log = "Candidate not found".to_string(),
                }
            }
            "candidates" => {
                let names: Vec<&String> = election.candidates().keys().collect();
                resp.value = json!({ "candidates": names }).to_string().into_bytes();
            }
            "getResult" => {
                let (names, counts): (Vec<&String>, Vec<i64>) =
                    election.candidates().iter().map(|(n, c)| (n, *c)).unzip();
                resp.value = json!({ "candidates": names, "voteCounts": counts })
                    .to_string()
                    .into_bytes();
            }
            "getMerkleTree" => {
                resp.value = json!({ "merkleTree": election.leaf_log() })
                    .to_string()
                    .into_bytes();
            }
            "path" => self.path_query(&req.data, &mut resp),
            other => resp.log = format!("unknown query path {other:?}"),
        }
        resp
    }
}
