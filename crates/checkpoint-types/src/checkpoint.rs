//! Checkpoint records and root chain identifiers

use crate::bytes::{Address, Hash};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root chain a checkpoint is anchored on
///
/// Buffers and continuity state are partitioned per root chain type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(rename_all = "lowercase")]
#[borsh(use_discriminant = true)]
pub enum RootChainType {
    /// Primary root chain
    Eth = 0,
    Bsc = 1,
    Tron = 2,
}

impl RootChainType {
    pub const PRIMARY: RootChainType = RootChainType::Eth;

    pub const ALL: [RootChainType; 3] = [RootChainType::Eth, RootChainType::Bsc, RootChainType::Tron];

    pub fn as_str(&self) -> &'static str {
        match self {
            RootChainType::Eth => "eth",
            RootChainType::Bsc => "bsc",
            RootChainType::Tron => "tron",
        }
    }
}

impl Default for RootChainType {
    fn default() -> Self {
        Self::PRIMARY
    }
}

impl fmt::Display for RootChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown root chain type: {0}")]
pub struct UnknownRootChain(pub String);

impl FromStr for RootChainType {
    type Err = UnknownRootChain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|root| root.as_str() == s)
            .ok_or_else(|| UnknownRootChain(s.to_string()))
    }
}

/// A hash-committed range of sidechain blocks destined for one root chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Checkpoint {
    /// Validator that proposed the checkpoint
    pub proposer: Address,
    /// First block in the range (inclusive)
    pub start_block: u64,
    /// Last block in the range (inclusive)
    pub end_block: u64,
    /// Root hash of the block range
    pub root_hash: Hash,
    /// Hash over validator dividend accounts
    pub account_root_hash: Hash,
    /// Root chain this checkpoint targets
    pub root_chain_type: RootChainType,
    /// Block time (unix seconds) the checkpoint was buffered or confirmed at
    pub timestamp: u64,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Checkpoint{{{} [{}..={}] root={} proposer={} ts={}}}",
            self.root_chain_type,
            self.start_block,
            self.end_block,
            self.root_hash,
            self.proposer,
            self.timestamp
        )
    }
}

/// Pending entry of the checkpoint sync handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CheckpointSync {
    pub proposer: Address,
    pub start_block: u64,
    pub end_block: u64,
    /// Submission index on the root chain
    pub number: u64,
    pub root_chain_type: RootChainType,
    /// Block time (unix seconds) the sync was buffered at
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_chain_names() {
        for root in RootChainType::ALL {
            assert_eq!(root.to_string().parse::<RootChainType>().unwrap(), root);
        }
        assert!("polygon".parse::<RootChainType>().is_err());
        assert_eq!(serde_json::to_string(&RootChainType::Tron).unwrap(), "\"tron\"");
        assert_eq!(RootChainType::default(), RootChainType::PRIMARY);
    }
}
