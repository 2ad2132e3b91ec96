//! Keeper traits the checkpoint state machine reads and writes through
//!
//! The state machine never owns storage. Every handler call receives these
//! capabilities explicitly, so tests can back them with an in-memory store.

use crate::checkpoint::{Checkpoint, CheckpointSync, RootChainType};
use crate::dividend::DividendAccount;
use crate::params::Params;
use crate::validator::ValidatorSet;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),
    #[error("Store codec error: {0}")]
    Codec(String),
}

/// Checkpoint module state
pub trait CheckpointStore {
    fn params(&self) -> Result<Params, StoreError>;

    /// Unconfirmed checkpoint waiting for an ack on `root`
    fn checkpoint_buffer(&self, root: RootChainType) -> Result<Option<Checkpoint>, StoreError>;
    fn set_checkpoint_buffer(&mut self, checkpoint: Checkpoint) -> Result<(), StoreError>;
    fn flush_checkpoint_buffer(&mut self, root: RootChainType) -> Result<(), StoreError>;

    fn sync_buffer(&self, root: RootChainType) -> Result<Option<CheckpointSync>, StoreError>;
    fn set_sync_buffer(&mut self, sync: CheckpointSync) -> Result<(), StoreError>;
    fn flush_sync_buffer(&mut self, root: RootChainType) -> Result<(), StoreError>;

    /// Most recent confirmed checkpoint on `root`
    fn last_checkpoint(&self, root: RootChainType) -> Result<Option<Checkpoint>, StoreError>;

    /// Store a confirmed checkpoint under `number` and make it the tip of its root chain
    fn add_checkpoint(&mut self, number: u64, checkpoint: Checkpoint) -> Result<(), StoreError>;
    fn checkpoint_by_number(&self, number: u64) -> Result<Option<Checkpoint>, StoreError>;

    /// Confirmed checkpoints ordered by number, `page` is 1-based
    fn checkpoint_list(&self, page: u64, limit: u64) -> Result<Vec<Checkpoint>, StoreError>;

    fn ack_count(&self) -> Result<u64, StoreError>;
    fn set_ack_count(&mut self, count: u64) -> Result<(), StoreError>;

    fn last_no_ack(&self) -> Result<u64, StoreError>;
    fn set_last_no_ack(&mut self, timestamp: u64) -> Result<(), StoreError>;
}

/// Validator set and reward accounting owned by the staking module
pub trait StakingStore {
    fn validator_set(&self) -> Result<ValidatorSet, StoreError>;

    /// Advance proposer selection by `times` rounds
    fn increment_accum(&mut self, times: u32) -> Result<(), StoreError>;

    fn dividend_accounts(&self) -> Result<Vec<DividendAccount>, StoreError>;
}
