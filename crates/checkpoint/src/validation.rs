//! Checks a checkpoint proposal against staking and sequencing state

use crate::error::CheckpointError;
use crate::sequencer;
use checkpoint_types::{account_root_hash, Address, CheckpointStore, Hash, Params, StakingStore};

/// Recompute the account root from current dividend accounts and compare
pub fn validate_account_root<V: StakingStore>(staking: &V, submitted: &Hash) -> Result<(), CheckpointError> {
    let accounts = staking.dividend_accounts()?;
    tracing::debug!(count = accounts.len(), "Dividend accounts of all validators");

    let computed = account_root_hash(&accounts).map_err(|e| {
        tracing::error!(error = %e, "Error while computing account root hash");
        CheckpointError::from(e)
    })?;

    if computed != *submitted {
        tracing::error!(
            hash = %computed,
            msg_hash = %submitted,
            "Account root hash of current state doesn't match msg"
        );
        return Err(CheckpointError::AccountRootMismatch {
            expected: computed,
            actual: *submitted,
        });
    }
    Ok(())
}

/// A checkpoint may cover at most `max_checkpoint_length` blocks
pub fn validate_length(params: &Params, length: u64) -> Result<(), CheckpointError> {
    if length > params.max_checkpoint_length {
        tracing::error!(
            length,
            max = params.max_checkpoint_length,
            "Checkpoint range exceeds max checkpoint length"
        );
        return Err(CheckpointError::RangeTooLong {
            length,
            max: params.max_checkpoint_length,
        });
    }
    Ok(())
}

/// The submitter must be the validator set's current proposer
pub fn validate_proposer<V: StakingStore>(staking: &V, proposer: &Address) -> Result<(), CheckpointError> {
    let validator_set = staking.validator_set()?;
    let current = validator_set.proposer().ok_or_else(|| {
        tracing::error!(msg_proposer = %proposer, "No proposer in validator set");
        CheckpointError::NoProposerConfigured
    })?;

    if current.signer != *proposer {
        tracing::error!(proposer = %current.signer, msg_proposer = %proposer, "Invalid proposer in msg");
        return Err(CheckpointError::ProposerMismatch {
            expected: current.signer,
            actual: *proposer,
        });
    }
    Ok(())
}

/// The submitted epoch must be ack count + 1
pub fn validate_epoch<S: CheckpointStore>(store: &S, epoch: u64) -> Result<(), CheckpointError> {
    let expected = sequencer::next_epoch(store)?;
    if epoch != expected {
        tracing::error!(msg_epoch = epoch, current = expected, "Current epoch does not match msg");
        return Err(CheckpointError::EpochMismatch {
            expected,
            actual: epoch,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint_store::MemoryStore;
    use checkpoint_types::{DividendAccount, Validator, ValidatorSet};

    fn staking() -> MemoryStore {
        MemoryStore::default()
            .with_validator_set(ValidatorSet::new(vec![Validator {
                id: 1,
                signer: Address::new([1; 20]),
                voting_power: 10,
                proposer_priority: 0,
            }]))
            .with_dividend_accounts(vec![DividendAccount {
                user: Address::new([1; 20]),
                fee_amount: 100,
            }])
    }

    #[test]
    fn test_account_root() {
        let store = staking();
        let expected = account_root_hash(&store.dividend_accounts().unwrap()).unwrap();
        assert!(validate_account_root(&store, &expected).is_ok());
        assert!(matches!(
            validate_account_root(&store, &Hash::new([9; 32])),
            Err(CheckpointError::AccountRootMismatch { .. })
        ));

        let empty = MemoryStore::default();
        assert!(matches!(
            validate_account_root(&empty, &expected),
            Err(CheckpointError::AccountRootUnavailable(_))
        ));
    }

    #[test]
    fn test_proposer() {
        let store = staking();
        assert!(validate_proposer(&store, &Address::new([1; 20])).is_ok());
        assert!(matches!(
            validate_proposer(&store, &Address::new([2; 20])),
            Err(CheckpointError::ProposerMismatch { .. })
        ));
        assert!(matches!(
            validate_proposer(&MemoryStore::default(), &Address::new([1; 20])),
            Err(CheckpointError::NoProposerConfigured)
        ));
    }

    #[test]
    fn test_length() {
        let params = Params {
            max_checkpoint_length: 256,
            ..Default::default()
        };
        assert!(validate_length(&params, 256).is_ok());
        assert!(matches!(
            validate_length(&params, 257),
            Err(CheckpointError::RangeTooLong { length: 257, max: 256 })
        ));
    }

    #[test]
    fn test_epoch() {
        let mut store = MemoryStore::default();
        assert!(validate_epoch(&store, 1).is_ok());
        store.set_ack_count(4).unwrap();
        assert!(validate_epoch(&store, 5).is_ok());
        assert!(matches!(
            validate_epoch(&store, 4),
            Err(CheckpointError::EpochMismatch { expected: 5, actual: 4 })
        ));
    }
}
