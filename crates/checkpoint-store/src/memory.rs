//! In-memory keeper for checkpoint and staking state
//!
//! All collections are ordered maps so iteration, and therefore every query
//! result, is identical on every node.

use checkpoint_types::{
    Checkpoint, CheckpointStore, CheckpointSync, DividendAccount, Params, RootChainType,
    StakingStore, StoreError, ValidatorSet,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub(crate) params: Params,
    /// Confirmed checkpoints by number
    pub(crate) checkpoints: BTreeMap<u64, Checkpoint>,
    /// Tip of each root chain
    pub(crate) last_checkpoints: BTreeMap<RootChainType, Checkpoint>,
    pub(crate) checkpoint_buffers: BTreeMap<RootChainType, Checkpoint>,
    pub(crate) sync_buffers: BTreeMap<RootChainType, CheckpointSync>,
    pub(crate) ack_count: u64,
    pub(crate) last_no_ack: u64,
    pub(crate) validator_set: ValidatorSet,
    pub(crate) dividend_accounts: Vec<DividendAccount>,
}

impl MemoryStore {
    /// Create an empty store with the given params
    pub fn new(params: Params) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn with_validator_set(mut self, validator_set: ValidatorSet) -> Self {
        self.validator_set = validator_set;
        self
    }

    pub fn with_dividend_accounts(mut self, accounts: Vec<DividendAccount>) -> Self {
        self.dividend_accounts = accounts;
        self
    }

    /// Move the staking state out into its own store
    ///
    /// Lets a handler borrow the checkpoint and staking halves mutably at once.
    /// Pair with `restore_staking`.
    pub fn take_staking(&mut self) -> MemoryStore {
        MemoryStore::default()
            .with_validator_set(std::mem::take(&mut self.validator_set))
            .with_dividend_accounts(std::mem::take(&mut self.dividend_accounts))
    }

    pub fn restore_staking(&mut self, staking: MemoryStore) {
        self.validator_set = staking.validator_set;
        self.dividend_accounts = staking.dividend_accounts;
    }
}

impl CheckpointStore for MemoryStore {
    fn params(&self) -> Result<Params, StoreError> {
        Ok(self.params)
    }

    fn checkpoint_buffer(&self, root: RootChainType) -> Result<Option<Checkpoint>, StoreError> {
        Ok(self.checkpoint_buffers.get(&root).cloned())
    }

    fn set_checkpoint_buffer(&mut self, checkpoint: Checkpoint) -> Result<(), StoreError> {
        self.checkpoint_buffers.insert(checkpoint.root_chain_type, checkpoint);
        Ok(())
    }

    fn flush_checkpoint_buffer(&mut self, root: RootChainType) -> Result<(), StoreError> {
        self.checkpoint_buffers.remove(&root);
        Ok(())
    }

    fn sync_buffer(&self, root: RootChainType) -> Result<Option<CheckpointSync>, StoreError> {
        Ok(self.sync_buffers.get(&root).cloned())
    }

    fn set_sync_buffer(&mut self, sync: CheckpointSync) -> Result<(), StoreError> {
        self.sync_buffers.insert(sync.root_chain_type, sync);
        Ok(())
    }

    fn flush_sync_buffer(&mut self, root: RootChainType) -> Result<(), StoreError> {
        self.sync_buffers.remove(&root);
        Ok(())
    }

    fn last_checkpoint(&self, root: RootChainType) -> Result<Option<Checkpoint>, StoreError> {
        Ok(self.last_checkpoints.get(&root).cloned())
    }

    fn add_checkpoint(&mut self, number: u64, checkpoint: Checkpoint) -> Result<(), StoreError> {
        self.last_checkpoints
            .insert(checkpoint.root_chain_type, checkpoint.clone());
        self.checkpoints.insert(number, checkpoint);
        Ok(())
    }

    fn checkpoint_by_number(&self, number: u64) -> Result<Option<Checkpoint>, StoreError> {
        Ok(self.checkpoints.get(&number).cloned())
    }

    fn checkpoint_list(&self, page: u64, limit: u64) -> Result<Vec<Checkpoint>, StoreError> {
        let skip = page.saturating_sub(1).saturating_mul(limit);
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self.checkpoints.values().skip(skip).take(take).cloned().collect())
    }

    fn ack_count(&self) -> Result<u64, StoreError> {
        Ok(self.ack_count)
    }

    fn set_ack_count(&mut self, count: u64) -> Result<(), StoreError> {
        self.ack_count = count;
        Ok(())
    }

    fn last_no_ack(&self) -> Result<u64, StoreError> {
        Ok(self.last_no_ack)
    }

    fn set_last_no_ack(&mut self, timestamp: u64) -> Result<(), StoreError> {
        self.last_no_ack = timestamp;
        Ok(())
    }
}

impl StakingStore for MemoryStore {
    fn validator_set(&self) -> Result<ValidatorSet, StoreError> {
        Ok(self.validator_set.clone())
    }

    fn increment_accum(&mut self, times: u32) -> Result<(), StoreError> {
        self.validator_set.increment_proposer_priority(times);
        Ok(())
    }

    fn dividend_accounts(&self) -> Result<Vec<DividendAccount>, StoreError> {
        Ok(self.dividend_accounts.clone())
    }
}
