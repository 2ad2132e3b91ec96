//! Genesis state for a fresh data directory

use anyhow::Context;
use checkpoint_store::MemoryStore;
use checkpoint_types::{DividendAccount, Params, Validator, ValidatorSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Initial checkpoint params and staking state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Genesis {
    #[serde(default)]
    pub params: Params,
    pub validators: Vec<Validator>,
    #[serde(default)]
    pub dividend_accounts: Vec<DividendAccount>,
}

impl Genesis {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read genesis {:?}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("invalid genesis {:?}", path))
    }

    /// Validate and build the initial keeper
    pub fn into_store(self) -> anyhow::Result<MemoryStore> {
        self.params.validate()?;
        if self.validators.is_empty() {
            anyhow::bail!("genesis has no validators");
        }
        if let Some(v) = self.validators.iter().find(|v| v.voting_power <= 0) {
            anyhow::bail!("validator {} has non-positive voting power", v.id);
        }

        let validator_set = ValidatorSet::new(self.validators);
        if let Some(proposer) = validator_set.proposer() {
            tracing::info!(validator = proposer.id, signer = %proposer.signer, "Genesis proposer");
        }

        Ok(MemoryStore::new(self.params)
            .with_validator_set(validator_set)
            .with_dividend_accounts(self.dividend_accounts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint_types::{CheckpointStore, StakingStore};

    const GENESIS: &str = r#"{
        "params": { "checkpoint_buffer_time": 300 },
        "validators": [
            { "id": 2, "signer": "0x0202020202020202020202020202020202020202", "voting_power": 10 },
            { "id": 1, "signer": "0x0101010101010101010101010101010101010101", "voting_power": 10 }
        ],
        "dividend_accounts": [
            { "user": "0x0101010101010101010101010101010101010101", "fee_amount": 1000 }
        ]
    }"#;

    #[test]
    fn test_genesis_store() {
        let genesis: Genesis = serde_json::from_str(GENESIS).unwrap();
        let store = genesis.into_store().unwrap();

        assert_eq!(store.params().unwrap().checkpoint_buffer_time, 300);
        let set = store.validator_set().unwrap();
        assert_eq!(set.validators.len(), 2);
        assert_eq!(set.proposer().unwrap().id, 1);
        assert_eq!(store.dividend_accounts().unwrap().len(), 1);
        assert_eq!(store.ack_count().unwrap(), 0);
    }

    #[test]
    fn test_invalid_genesis() {
        let mut genesis: Genesis = serde_json::from_str(GENESIS).unwrap();
        genesis.params.checkpoint_buffer_time = 0;
        assert!(genesis.into_store().is_err());

        let empty = Genesis::default();
        assert!(empty.into_store().is_err());
    }
}
