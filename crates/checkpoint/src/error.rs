//! Checkpoint module errors

use checkpoint_types::{AccountRootError, Address, Hash, RootChainType, StoreError};
use thiserror::Error;

/// Why an ack was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadAckReason {
    NoBufferedCheckpoint(RootChainType),
    StartBlockMismatch { expected: u64, actual: u64 },
    RootHashMismatch { expected: Hash, actual: Hash },
}

impl std::fmt::Display for BadAckReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BadAckReason::NoBufferedCheckpoint(root) => {
                write!(f, "no checkpoint buffered for {}", root)
            }
            BadAckReason::StartBlockMismatch { expected, actual } => {
                write!(f, "start block {} does not match buffered {}", actual, expected)
            }
            BadAckReason::RootHashMismatch { expected, actual } => {
                write!(f, "root hash {} does not match buffered {}", actual, expected)
            }
        }
    }
}

/// Checkpoint handler errors
///
/// All of these are validation failures returned to the submitter; none leave
/// partial state behind.
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint already exists in buffer, expires at {expiry}")]
    BufferOccupied { expiry: u64 },

    #[error("Checkpoint already exists: start block {start_block} is behind tip {tip}")]
    StaleOrOverlappingRange { tip: u64, start_block: u64 },

    #[error("Checkpoint not in continuity: tip {tip}, start block {start_block}")]
    DiscontinuousRange { tip: u64, start_block: u64 },

    #[error("First checkpoint must start from block 0, got {start_block}")]
    InvalidFirstRange { start_block: u64 },

    #[error("Checkpoint covers {length} blocks, max is {max}")]
    RangeTooLong { length: u64, max: u64 },

    #[error("Account root hash mismatch: computed {expected}, got {actual}")]
    AccountRootMismatch { expected: Hash, actual: Hash },

    #[error("Unable to compute account root hash: {0}")]
    AccountRootUnavailable(#[from] AccountRootError),

    #[error("No proposer in stored validator set")]
    NoProposerConfigured,

    #[error("Invalid proposer in msg: expected {expected}, got {actual}")]
    ProposerMismatch { expected: Address, actual: Address },

    #[error("Epoch mismatch: expected {expected}, got {actual}")]
    EpochMismatch { expected: u64, actual: u64 },

    #[error("Bad ack: {0}")]
    BadAck(BadAckReason),

    #[error("Invalid no-ack: waiting for last checkpoint ack")]
    PrematureNoAck,

    #[error("Too many no-ack")]
    TooFrequentNoAck,

    #[error("Invalid msg: {0}")]
    InvalidMsg(String),

    #[error("Unknown message: {0}")]
    UnknownMessage(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CheckpointError {
    /// Stable code within the checkpoint codespace
    pub fn code(&self) -> u32 {
        match self {
            CheckpointError::InvalidMsg(_) => 1400,
            CheckpointError::UnknownMessage(_) => 1401,
            CheckpointError::NoProposerConfigured => 1402,
            CheckpointError::ProposerMismatch { .. } => 1403,
            CheckpointError::EpochMismatch { .. } => 1404,
            CheckpointError::InvalidFirstRange { .. } => 1501,
            CheckpointError::StaleOrOverlappingRange { .. } => 1502,
            CheckpointError::DiscontinuousRange { .. } => 1503,
            CheckpointError::AccountRootMismatch { .. } => 1504,
            CheckpointError::AccountRootUnavailable(_) => 1505,
            CheckpointError::BadAck(_) => 1506,
            CheckpointError::BufferOccupied { .. } => 1507,
            CheckpointError::PrematureNoAck => 1508,
            CheckpointError::TooFrequentNoAck => 1509,
            CheckpointError::RangeTooLong { .. } => 1510,
            CheckpointError::Store(_) => 1600,
        }
    }

    /// Retry time for errors caused by an occupied buffer
    pub fn expiry(&self) -> Option<u64> {
        match self {
            CheckpointError::BufferOccupied { expiry } => Some(*expiry),
            _ => None,
        }
    }
}

/// Query errors
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown request: {0}")]
    UnknownRequest(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    pub fn code(&self) -> u32 {
        match self {
            QueryError::NotFound(_) => 1700,
            QueryError::UnknownRequest(_) => 1701,
            QueryError::InvalidParams(_) => 1702,
            QueryError::Internal(_) => 1703,
            QueryError::Store(_) => 1600,
        }
    }
}
