//! Host-facing request, response and event types.
//!
//! These mirror the block-execution callbacks of a BFT consensus host.  The
//! [`Application`] trait carries the semantic callbacks without defaults;
//! block and snapshot lifecycle hooks default to no-ops.

use serde::Serialize;

use crate::error::CODE_OK;

/// Key/value attribute attached to an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventAttribute {
    /// Attribute name.
    pub key: String,
    /// Attribute value.
    pub value: String,
    /// Whether the host should index this attribute.
    pub index: bool,
}

/// Structured event emitted by an accepted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Event type, the transaction kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Ordered attributes.
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    /// Creates an event with no attributes.
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            attributes: Vec::new(),
        }
    }

    /// Appends an attribute.
    pub fn attr(mut self, key: &str, value: impl ToString, index: bool) -> Self {
        self.attributes.push(EventAttribute {
            key: key.to_string(),
            value: value.to_string(),
            index,
        });
        self
    }

    /// Value of the first attribute named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// Result of `check_tx`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResponseCheckTx {
    /// Response code, `0` when accepted.
    pub code: u32,
    /// Rejection reason.
    pub log: String,
    /// Gas requested by the transaction.
    pub gas_wanted: i64,
}

/// Result of `deliver_tx`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResponseDeliverTx {
    /// Response code, `0` when accepted.
    pub code: u32,
    /// Rejection reason.
    pub log: String,
    /// Events emitted on acceptance.
    pub events: Vec<Event>,
}

impl ResponseDeliverTx {
    /// Whether the transaction was applied.
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

/// Result of `commit`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResponseCommit {
    /// Application hash after the block, empty before the first election.
    pub data: Vec<u8>,
    /// Height below which blocks may be pruned.
    pub retain_height: i64,
}

/// Query request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestQuery {
    /// Query path such as `root` or `total`.
    pub path: String,
    /// Raw payload.
    pub data: Vec<u8>,
}

impl RequestQuery {
    /// Creates a query for `path` with `data` as payload.
    pub fn new(path: &str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.to_string(),
            data: data.into(),
        }
    }
}

/// Query response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResponseQuery {
    /// Response code.
    pub code: u32,
    /// Result key.
    pub key: Vec<u8>,
    /// Result value.
    pub value: Vec<u8>,
    /// Human-readable note.
    pub log: String,
    /// Height the answer reflects.
    pub height: i64,
}

/// Result of `info`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResponseInfo {
    /// Application name.
    pub data: String,
    /// Software version.
    pub version: String,
    /// Application protocol version.
    pub app_version: u64,
    /// Last committed height.
    pub last_block_height: i64,
    /// Last committed application hash.
    pub last_block_app_hash: Option<Vec<u8>>,
}

/// Block header fields the application sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestBeginBlock {
    /// Block height.
    pub height: i64,
    /// Block time in Unix seconds.
    pub time: i64,
}

/// State-sync snapshot descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Snapshot {
    /// Height of the snapshot.
    pub height: u64,
    /// Format version.
    pub format: u32,
    /// Number of chunks.
    pub chunks: u32,
    /// Snapshot hash.
    pub hash: Vec<u8>,
}

/// Outcome of offering or applying a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SnapshotResult {
    /// The application did not handle the request.
    #[default]
    Unknown,
    /// Accepted.
    Accept,
    /// Rejected.
    Reject,
}

/// Callbacks a consensus host drives.
pub trait Application {
    /// Application metadata and last committed state.
    fn info(&self) -> ResponseInfo;

    /// Validate phase; never mutates state.
    fn check_tx(&self, tx: &[u8]) -> ResponseCheckTx;

    /// Validate and apply one transaction at block time `time`.
    fn deliver_tx(&mut self, tx: &[u8], time: i64) -> ResponseDeliverTx;

    /// Seals the block.
    fn commit(&mut self) -> ResponseCommit;

    /// Read-only query.
    fn query(&self, req: &RequestQuery) -> ResponseQuery;

    /// Chain genesis.
    fn init_chain(&mut self) {}

    /// Start of a block.
    fn begin_block(&mut self, _req: RequestBeginBlock) {}

    /// End of a block.
    fn end_block(&mut self, _height: i64) {}

    /// Snapshots available for state sync.
    fn list_snapshots(&self) -> Vec<Snapshot> {
        Vec::new()
    }

    /// Offers a snapshot for restoration.
    fn offer_snapshot(&mut self, _snapshot: &Snapshot, _app_hash: &[u8]) -> SnapshotResult {
        SnapshotResult::Unknown
    }

    /// Loads one chunk of a local snapshot.
    fn load_snapshot_chunk(&self, _height: u64, _format: u32, _chunk: u32) -> Vec<u8> {
        Vec::new()
    }

    /// Applies one chunk of a snapshot being restored.
    fn apply_snapshot_chunk(&mut self, _index: u32, _chunk: &[u8]) -> SnapshotResult {
        SnapshotResult::Unknown
    }
}
