//! Block range continuity, epoch sequencing and checkpoint confirmation

use crate::error::{BadAckReason, CheckpointError};
use checkpoint_types::{Checkpoint, CheckpointStore, Hash, RootChainType};

/// Check that a new range starting at `start_block` extends `last`
///
/// The first checkpoint of a root chain must start at block 0, every later one
/// must start right after the confirmed tip. A start at or before the tip is stale.
pub fn check_continuity(
    root: RootChainType,
    last: Option<&Checkpoint>,
    start_block: u64,
) -> Result<(), CheckpointError> {
    match last {
        None => {
            if start_block != 0 {
                tracing::error!(%root, start_block, "First checkpoint to start from block 0");
                return Err(CheckpointError::InvalidFirstRange { start_block });
            }
        }
        Some(last) => {
            if start_block <= last.end_block {
                tracing::error!(%root, current_tip = last.end_block, start_block, "Checkpoint already exists");
                return Err(CheckpointError::StaleOrOverlappingRange {
                    tip: last.end_block,
                    start_block,
                });
            }

            if last.end_block.checked_add(1) != Some(start_block) {
                tracing::error!(%root, current_tip = last.end_block, start_block, "Checkpoint not in continuity");
                return Err(CheckpointError::DiscontinuousRange {
                    tip: last.end_block,
                    start_block,
                });
            }
        }
    }
    Ok(())
}

/// Epoch the next checkpoint submission must carry
pub fn next_epoch<S: CheckpointStore>(store: &S) -> Result<u64, CheckpointError> {
    Ok(store.ack_count()?.saturating_add(1))
}

/// Range and hash the root chain actually recorded for a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedCheckpoint {
    pub end_block: u64,
    pub root_hash: Hash,
}

/// Promote the buffered checkpoint of `root` to confirmed
///
/// The checkpoint takes the observed end block and root hash when given, is
/// stamped with `block_time`, stored under the incremented ack count and
/// becomes the tip of its root chain. The buffer is cleared. Returns the
/// checkpoint number and the confirmed checkpoint.
pub fn confirm<S: CheckpointStore>(
    store: &mut S,
    root: RootChainType,
    block_time: u64,
    observed: Option<ObservedCheckpoint>,
) -> Result<(u64, Checkpoint), CheckpointError> {
    let mut checkpoint = store
        .checkpoint_buffer(root)?
        .ok_or(CheckpointError::BadAck(BadAckReason::NoBufferedCheckpoint(root)))?;

    if let Some(observed) = observed {
        checkpoint.end_block = observed.end_block;
        checkpoint.root_hash = observed.root_hash;
    }
    checkpoint.timestamp = block_time;

    let number = next_epoch(store)?;
    store.add_checkpoint(number, checkpoint.clone())?;
    store.set_ack_count(number)?;
    store.flush_checkpoint_buffer(root)?;

    tracing::debug!(
        %root,
        number,
        start_block = checkpoint.start_block,
        end_block = checkpoint.end_block,
        "Checkpoint confirmed"
    );

    Ok((number, checkpoint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint_store::MemoryStore;
    use checkpoint_types::Address;

    fn checkpoint(root: RootChainType, start: u64, end: u64) -> Checkpoint {
        Checkpoint {
            proposer: Address::new([1; 20]),
            start_block: start,
            end_block: end,
            root_hash: Hash::new([2; 32]),
            account_root_hash: Hash::new([3; 32]),
            root_chain_type: root,
            timestamp: 500,
        }
    }

    #[test]
    fn test_first_checkpoint_starts_at_zero() {
        assert!(check_continuity(RootChainType::Eth, None, 0).is_ok());
        assert!(matches!(
            check_continuity(RootChainType::Eth, None, 5),
            Err(CheckpointError::InvalidFirstRange { start_block: 5 })
        ));
    }

    #[test]
    fn test_continuity_against_tip() {
        let tip = checkpoint(RootChainType::Eth, 0, 99);
        assert!(matches!(
            check_continuity(RootChainType::Eth, Some(&tip), 99),
            Err(CheckpointError::StaleOrOverlappingRange { tip: 99, start_block: 99 })
        ));
        assert!(matches!(
            check_continuity(RootChainType::Eth, Some(&tip), 50),
            Err(CheckpointError::StaleOrOverlappingRange { .. })
        ));
        assert!(matches!(
            check_continuity(RootChainType::Eth, Some(&tip), 101),
            Err(CheckpointError::DiscontinuousRange { tip: 99, start_block: 101 })
        ));
        assert!(check_continuity(RootChainType::Eth, Some(&tip), 100).is_ok());
    }

    #[test]
    fn test_confirm_promotes_buffer() {
        let mut store = MemoryStore::default();
        store.set_checkpoint_buffer(checkpoint(RootChainType::Bsc, 0, 99)).unwrap();

        let (number, confirmed) = confirm(&mut store, RootChainType::Bsc, 1000, None).unwrap();
        assert_eq!(number, 1);
        assert_eq!(confirmed.timestamp, 1000);
        assert_eq!(store.ack_count().unwrap(), 1);
        assert!(store.checkpoint_buffer(RootChainType::Bsc).unwrap().is_none());
        assert_eq!(store.last_checkpoint(RootChainType::Bsc).unwrap(), Some(confirmed.clone()));
        assert_eq!(store.checkpoint_by_number(1).unwrap(), Some(confirmed));
        assert_eq!(next_epoch(&store).unwrap(), 2);
    }

    #[test]
    fn test_confirm_applies_observed_range() {
        let mut store = MemoryStore::default();
        store.set_checkpoint_buffer(checkpoint(RootChainType::Eth, 0, 99)).unwrap();

        let observed = ObservedCheckpoint {
            end_block: 120,
            root_hash: Hash::new([7; 32]),
        };
        let (_, confirmed) = confirm(&mut store, RootChainType::Eth, 1000, Some(observed)).unwrap();
        assert_eq!(confirmed.end_block, 120);
        assert_eq!(confirmed.root_hash, Hash::new([7; 32]));
    }

    #[test]
    fn test_confirm_without_buffer() {
        let mut store = MemoryStore::default();
        assert!(matches!(
            confirm(&mut store, RootChainType::Eth, 1000, None),
            Err(CheckpointError::BadAck(BadAckReason::NoBufferedCheckpoint(RootChainType::Eth)))
        ));
        assert_eq!(store.ack_count().unwrap(), 0);
    }
}
