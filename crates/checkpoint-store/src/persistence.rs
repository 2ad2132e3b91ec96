//! Persistence Layer for checkpoint state
//!
//! Uses sled embedded database to persist the working keeper across restarts.
//! State is saved periodically at block boundaries and on shutdown.

use crate::memory::MemoryStore;
use checkpoint_types::{
    Checkpoint, CheckpointSync, DividendAccount, Params, RootChainType, ValidatorSet,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional};
use std::path::Path;

const KEY_CHAIN: &str = "chain";
const KEY_PARAMS: &str = "params";
const KEY_ACK_COUNT: &str = "ack_count";
const KEY_LAST_NO_ACK: &str = "last_no_ack";
const KEY_VALIDATOR_SET: &str = "validator_set";
const KEY_DIVIDEND_ACCOUNTS: &str = "dividend_accounts";

/// Metadata about the last saved block
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainMetadata {
    /// Height of the last applied block
    pub height: u64,
    /// Block time (unix seconds) of the last applied block
    pub block_time: u64,
    /// Ack count at save time
    pub ack_count: u64,
    /// Last no-ack time at save time
    pub last_no_ack: u64,
    /// Wall clock timestamp of the save
    pub saved_at: i64,
}

/// Persistent storage for checkpoint state
pub struct PersistentStore {
    /// Sled database instance
    db: Db,
    /// Confirmed checkpoints keyed by big-endian number
    checkpoints: sled::Tree,
    /// Checkpoint and sync buffers
    buffers: sled::Tree,
    /// Root chain tips
    tips: sled::Tree,
    /// Counters, params and chain metadata
    metadata: sled::Tree,
    /// Validator set and dividend accounts
    staking: sled::Tree,
}

fn encode<T: Serialize>(value: &T) -> anyhow::Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> anyhow::Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

fn checkpoint_buffer_key(root: RootChainType) -> String {
    format!("checkpoint/{}", root)
}

fn sync_buffer_key(root: RootChainType) -> String {
    format!("sync/{}", root)
}

impl PersistentStore {
    /// Open or create a persistent store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let db = sled::open(&path)?;
        let checkpoints = db.open_tree("checkpoints")?;
        let buffers = db.open_tree("buffers")?;
        let tips = db.open_tree("tips")?;
        let metadata = db.open_tree("metadata")?;
        let staking = db.open_tree("staking")?;

        tracing::info!("Opened persistent store at {:?}", path.as_ref());

        Ok(Self {
            db,
            checkpoints,
            buffers,
            tips,
            metadata,
            staking,
        })
    }

    /// Get all confirmed checkpoints in number order
    pub fn get_all_checkpoints(&self) -> anyhow::Result<Vec<(u64, Checkpoint)>> {
        let mut checkpoints = Vec::new();

        for result in self.checkpoints.iter() {
            let (key, value) = result?;
            let number_bytes: [u8; 8] = key
                .as_ref()
                .try_into()
                .map_err(|_| anyhow::anyhow!("Invalid checkpoint key length"))?;
            checkpoints.push((u64::from_be_bytes(number_bytes), decode(&value)?));
        }

        Ok(checkpoints)
    }

    fn get_value<T: DeserializeOwned>(&self, tree: &sled::Tree, key: &str) -> anyhow::Result<Option<T>> {
        match tree.get(key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load chain metadata
    pub fn load_metadata(&self) -> anyhow::Result<Option<ChainMetadata>> {
        self.get_value(&self.metadata, KEY_CHAIN)
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> anyhow::Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// Encoded writes of one save, applied in a single transaction
#[derive(Default)]
struct SaveBatch {
    checkpoints: Vec<([u8; 8], Vec<u8>)>,
    buffers: Vec<(String, Vec<u8>)>,
    tips: Vec<(&'static str, Vec<u8>)>,
    metadata: Vec<(&'static str, Vec<u8>)>,
    staking: Vec<(&'static str, Vec<u8>)>,
}

impl SaveBatch {
    fn encode(state: &MemoryStore, chain: &ChainMetadata) -> anyhow::Result<Self> {
        let mut batch = SaveBatch::default();
        for (number, checkpoint) in &state.checkpoints {
            batch.checkpoints.push((number.to_be_bytes(), encode(checkpoint)?));
        }
        for (root, checkpoint) in &state.checkpoint_buffers {
            batch.buffers.push((checkpoint_buffer_key(*root), encode(checkpoint)?));
        }
        for (root, sync) in &state.sync_buffers {
            batch.buffers.push((sync_buffer_key(*root), encode(sync)?));
        }
        for (root, checkpoint) in &state.last_checkpoints {
            batch.tips.push((root.as_str(), encode(checkpoint)?));
        }
        batch.metadata.push((KEY_PARAMS, encode(&state.params)?));
        batch.metadata.push((KEY_ACK_COUNT, encode(&state.ack_count)?));
        batch.metadata.push((KEY_LAST_NO_ACK, encode(&state.last_no_ack)?));
        batch.metadata.push((KEY_CHAIN, encode(chain)?));
        batch.staking.push((KEY_VALIDATOR_SET, encode(&state.validator_set)?));
        batch.staking.push((KEY_DIVIDEND_ACCOUNTS, encode(&state.dividend_accounts)?));
        Ok(batch)
    }
}

/// Extension trait to add persistence to MemoryStore
pub trait StorePersistence {
    /// Save the full state and the chain metadata it belongs to, returns checkpoints written
    ///
    /// All writes land in one transaction. A save whose height is below the
    /// stored height is refused and leaves the disk untouched.
    fn save_to_disk(&self, store: &PersistentStore, chain: &ChainMetadata) -> anyhow::Result<usize>;

    /// Replace the state with what persistent storage holds, returns checkpoints loaded
    fn load_from_disk(&mut self, store: &PersistentStore) -> anyhow::Result<usize>;
}

impl StorePersistence for MemoryStore {
    fn save_to_disk(&self, store: &PersistentStore, chain: &ChainMetadata) -> anyhow::Result<usize> {
        let batch = SaveBatch::encode(self, chain)?;
        let count = batch.checkpoints.len();

        let trees = (
            &store.checkpoints,
            &store.buffers,
            &store.tips,
            &store.metadata,
            &store.staking,
        );
        trees
            .transaction(|(checkpoints, buffers, tips, metadata, staking)| {
                if let Some(bytes) = metadata.get(KEY_CHAIN)? {
                    let saved = decode::<ChainMetadata>(&bytes)
                        .map_err(|e| ConflictableTransactionError::Abort(e.to_string()))?;
                    if saved.height > chain.height {
                        return Err(ConflictableTransactionError::Abort(format!(
                            "stored height {} is above save height {}",
                            saved.height, chain.height
                        )));
                    }
                }

                // buffers and tips are rewritten wholesale since flushes remove entries
                for root in RootChainType::ALL {
                    buffers.remove(checkpoint_buffer_key(root).as_bytes())?;
                    buffers.remove(sync_buffer_key(root).as_bytes())?;
                    tips.remove(root.as_str())?;
                }

                for (key, value) in &batch.checkpoints {
                    checkpoints.insert(&key[..], value.as_slice())?;
                }
                for (key, value) in &batch.buffers {
                    buffers.insert(key.as_bytes(), value.as_slice())?;
                }
                for (key, value) in &batch.tips {
                    tips.insert(*key, value.as_slice())?;
                }
                for (key, value) in &batch.staking {
                    staking.insert(*key, value.as_slice())?;
                }
                for (key, value) in &batch.metadata {
                    metadata.insert(*key, value.as_slice())?;
                }
                Ok(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(reason) => anyhow::anyhow!("save aborted: {}", reason),
                TransactionError::Storage(e) => anyhow::Error::from(e),
            })?;

        store.flush()?;
        tracing::info!(height = chain.height, "Saved {} checkpoints to disk", count);

        Ok(count)
    }

    fn load_from_disk(&mut self, store: &PersistentStore) -> anyhow::Result<usize> {
        let checkpoints = store.get_all_checkpoints()?;
        let count = checkpoints.len();
        self.checkpoints = checkpoints.into_iter().collect();

        self.checkpoint_buffers.clear();
        self.sync_buffers.clear();
        for root in RootChainType::ALL {
            if let Some(checkpoint) =
                store.get_value::<Checkpoint>(&store.buffers, &checkpoint_buffer_key(root))?
            {
                self.checkpoint_buffers.insert(root, checkpoint);
            }
            if let Some(sync) = store.get_value::<CheckpointSync>(&store.buffers, &sync_buffer_key(root))? {
                self.sync_buffers.insert(root, sync);
            }
        }

        self.last_checkpoints.clear();
        for root in RootChainType::ALL {
            if let Some(checkpoint) = store.get_value::<Checkpoint>(&store.tips, root.as_str())? {
                self.last_checkpoints.insert(root, checkpoint);
            }
        }

        self.params = store
            .get_value::<Params>(&store.metadata, KEY_PARAMS)?
            .unwrap_or_default();
        self.ack_count = store
            .get_value(&store.metadata, KEY_ACK_COUNT)?
            .unwrap_or(0);
        self.last_no_ack = store
            .get_value(&store.metadata, KEY_LAST_NO_ACK)?
            .unwrap_or(0);
        self.validator_set = store
            .get_value::<ValidatorSet>(&store.staking, KEY_VALIDATOR_SET)?
            .unwrap_or_default();
        self.dividend_accounts = store
            .get_value::<Vec<DividendAccount>>(&store.staking, KEY_DIVIDEND_ACCOUNTS)?
            .unwrap_or_default();

        tracing::info!("Loaded {} checkpoints from disk", count);

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint_types::{
        Address, CheckpointStore, Hash, StakingStore, Validator,
    };
    use tempfile::tempdir;

    fn checkpoint(root: RootChainType, start: u64, end: u64) -> Checkpoint {
        Checkpoint {
            proposer: Address::new([1; 20]),
            start_block: start,
            end_block: end,
            root_hash: Hash::new([2; 32]),
            account_root_hash: Hash::new([3; 32]),
            root_chain_type: root,
            timestamp: 1000,
        }
    }

    #[test]
    fn test_save_and_load_state() {
        let dir = tempdir().unwrap();
        let disk = PersistentStore::open(dir.path()).unwrap();

        let mut store = MemoryStore::new(Params {
            checkpoint_buffer_time: 60,
            max_checkpoint_length: 256,
        })
        .with_validator_set(ValidatorSet::new(vec![Validator {
            id: 1,
            signer: Address::new([9; 20]),
            voting_power: 10,
            proposer_priority: 0,
        }]))
        .with_dividend_accounts(vec![DividendAccount {
            user: Address::new([9; 20]),
            fee_amount: 42,
        }]);
        store.add_checkpoint(1, checkpoint(RootChainType::Eth, 0, 9)).unwrap();
        store.set_ack_count(1).unwrap();
        store.set_last_no_ack(1200).unwrap();
        store
            .set_checkpoint_buffer(checkpoint(RootChainType::Bsc, 0, 3))
            .unwrap();
        store
            .set_sync_buffer(CheckpointSync {
                proposer: Address::new([1; 20]),
                start_block: 0,
                end_block: 9,
                number: 1,
                root_chain_type: RootChainType::Tron,
                timestamp: 1100,
            })
            .unwrap();

        let chain = ChainMetadata {
            height: 120,
            block_time: 5000,
            ack_count: 1,
            last_no_ack: 1200,
            saved_at: 12345,
        };
        assert_eq!(store.save_to_disk(&disk, &chain).unwrap(), 1);
        assert_eq!(disk.load_metadata().unwrap(), Some(chain));

        let mut loaded = MemoryStore::default();
        assert_eq!(loaded.load_from_disk(&disk).unwrap(), 1);
        assert_eq!(loaded.params().unwrap().checkpoint_buffer_time, 60);
        assert_eq!(loaded.params().unwrap().max_checkpoint_length, 256);
        assert_eq!(loaded.ack_count().unwrap(), 1);
        assert_eq!(loaded.last_no_ack().unwrap(), 1200);
        assert_eq!(
            loaded.last_checkpoint(RootChainType::Eth).unwrap(),
            Some(checkpoint(RootChainType::Eth, 0, 9))
        );
        assert!(loaded.checkpoint_buffer(RootChainType::Eth).unwrap().is_none());
        assert_eq!(
            loaded.checkpoint_buffer(RootChainType::Bsc).unwrap().unwrap().end_block,
            3
        );
        assert_eq!(loaded.sync_buffer(RootChainType::Tron).unwrap().unwrap().number, 1);
        assert_eq!(loaded.validator_set().unwrap(), store.validator_set().unwrap());
        assert_eq!(loaded.dividend_accounts().unwrap()[0].fee_amount, 42);
    }

    #[test]
    fn test_flushed_buffer_not_resurrected() {
        let dir = tempdir().unwrap();
        let disk = PersistentStore::open(dir.path()).unwrap();

        let mut store = MemoryStore::default();
        store
            .set_checkpoint_buffer(checkpoint(RootChainType::Eth, 0, 9))
            .unwrap();
        store.save_to_disk(&disk, &ChainMetadata::default()).unwrap();

        store.flush_checkpoint_buffer(RootChainType::Eth).unwrap();
        store.save_to_disk(&disk, &ChainMetadata::default()).unwrap();

        let mut loaded = MemoryStore::default();
        loaded.load_from_disk(&disk).unwrap();
        assert!(loaded.checkpoint_buffer(RootChainType::Eth).unwrap().is_none());
    }

    #[test]
    fn test_lower_height_save_leaves_disk_untouched() {
        let dir = tempdir().unwrap();
        let disk = PersistentStore::open(dir.path()).unwrap();
        assert!(disk.load_metadata().unwrap().is_none());

        let mut store = MemoryStore::default();
        store.add_checkpoint(1, checkpoint(RootChainType::Eth, 0, 9)).unwrap();
        store.set_ack_count(1).unwrap();
        store
            .set_checkpoint_buffer(checkpoint(RootChainType::Eth, 10, 19))
            .unwrap();
        let at_five = ChainMetadata {
            height: 5,
            block_time: 500,
            ack_count: 1,
            ..Default::default()
        };
        store.save_to_disk(&disk, &at_five).unwrap();

        let mut behind = MemoryStore::default();
        behind.add_checkpoint(1, checkpoint(RootChainType::Eth, 0, 9)).unwrap();
        behind.add_checkpoint(2, checkpoint(RootChainType::Eth, 10, 19)).unwrap();
        behind.set_ack_count(2).unwrap();
        let at_three = ChainMetadata {
            height: 3,
            block_time: 300,
            ack_count: 2,
            ..Default::default()
        };
        assert!(behind.save_to_disk(&disk, &at_three).is_err());

        assert_eq!(disk.load_metadata().unwrap(), Some(at_five));
        let mut loaded = MemoryStore::default();
        assert_eq!(loaded.load_from_disk(&disk).unwrap(), 1);
        assert_eq!(loaded.ack_count().unwrap(), 1);
        assert_eq!(
            loaded.checkpoint_buffer(RootChainType::Eth).unwrap().unwrap().start_block,
            10
        );
    }
}
