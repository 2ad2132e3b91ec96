//! Checkpoint module messages

use crate::error::CheckpointError;
use borsh::{BorshDeserialize, BorshSerialize};
use checkpoint_types::{Address, Hash, RootChainType};
use serde::{Deserialize, Serialize};

/// Checkpoint proposal for a block range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MsgCheckpoint {
    pub proposer: Address,
    pub start_block: u64,
    pub end_block: u64,
    pub root_hash: Hash,
    pub account_root_hash: Hash,
    #[serde(default)]
    pub root_chain_type: RootChainType,
    /// Must be ack count + 1
    pub epoch: u64,
}

impl MsgCheckpoint {
    /// Number of blocks in the inclusive range
    pub fn block_count(&self) -> u64 {
        self.end_block
            .saturating_sub(self.start_block)
            .saturating_add(1)
    }
}

/// Root chain observed the buffered checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MsgCheckpointAck {
    pub from: Address,
    /// Header index on the root chain
    pub number: u64,
    pub proposer: Address,
    pub start_block: u64,
    pub end_block: u64,
    pub root_hash: Hash,
    #[serde(default)]
    pub root_chain_type: RootChainType,
}

/// Buffered checkpoint was never acknowledged in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MsgCheckpointNoAck {
    pub from: Address,
}

/// Start of the checkpoint sync handshake with a root chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MsgCheckpointSync {
    pub from: Address,
    pub number: u64,
    pub proposer: Address,
    pub start_block: u64,
    pub end_block: u64,
    #[serde(default)]
    pub root_chain_type: RootChainType,
}

/// Root chain observed a checkpoint sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MsgCheckpointSyncAck {
    pub from: Address,
    pub number: u64,
    pub proposer: Address,
    pub start_block: u64,
    pub end_block: u64,
    #[serde(default)]
    pub root_chain_type: RootChainType,
}

/// Every message the checkpoint module accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CheckpointMsg {
    Checkpoint(MsgCheckpoint),
    CheckpointAck(MsgCheckpointAck),
    #[serde(rename = "checkpoint-noack")]
    CheckpointNoAck(MsgCheckpointNoAck),
    CheckpointSync(MsgCheckpointSync),
    CheckpointSyncAck(MsgCheckpointSyncAck),
}

fn check_range(start_block: u64, end_block: u64) -> Result<(), CheckpointError> {
    if start_block > end_block {
        return Err(CheckpointError::InvalidMsg(format!(
            "start block {} is after end block {}",
            start_block, end_block
        )));
    }
    Ok(())
}

fn check_nonzero_address(field: &str, address: &Address) -> Result<(), CheckpointError> {
    if address.is_zero() {
        return Err(CheckpointError::InvalidMsg(format!("missing {}", field)));
    }
    Ok(())
}

fn check_nonzero_hash(field: &str, hash: &Hash) -> Result<(), CheckpointError> {
    if hash.is_zero() {
        return Err(CheckpointError::InvalidMsg(format!("missing {}", field)));
    }
    Ok(())
}

impl CheckpointMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            CheckpointMsg::Checkpoint(_) => "checkpoint",
            CheckpointMsg::CheckpointAck(_) => "checkpoint-ack",
            CheckpointMsg::CheckpointNoAck(_) => "checkpoint-noack",
            CheckpointMsg::CheckpointSync(_) => "checkpoint-sync",
            CheckpointMsg::CheckpointSyncAck(_) => "checkpoint-sync-ack",
        }
    }

    /// Stateless checks run before dispatch
    pub fn validate_basic(&self) -> Result<(), CheckpointError> {
        match self {
            CheckpointMsg::Checkpoint(msg) => {
                check_nonzero_address("proposer", &msg.proposer)?;
                check_nonzero_hash("root hash", &msg.root_hash)?;
                check_range(msg.start_block, msg.end_block)
            }
            CheckpointMsg::CheckpointAck(msg) => {
                check_nonzero_hash("root hash", &msg.root_hash)?;
                check_range(msg.start_block, msg.end_block)
            }
            CheckpointMsg::CheckpointNoAck(msg) => check_nonzero_address("sender", &msg.from),
            CheckpointMsg::CheckpointSync(msg) => {
                check_nonzero_address("proposer", &msg.proposer)?;
                check_range(msg.start_block, msg.end_block)
            }
            CheckpointMsg::CheckpointSyncAck(msg) => {
                check_nonzero_address("proposer", &msg.proposer)?;
                check_range(msg.start_block, msg.end_block)
            }
        }
    }

    /// Serialize for transaction payloads
    pub fn to_bytes(&self) -> Result<Vec<u8>, borsh::io::Error> {
        borsh::to_vec(self)
    }

    /// Deserialize from a transaction payload
    pub fn from_bytes(data: &[u8]) -> Result<Self, borsh::io::Error> {
        borsh::from_slice(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint_msg() -> MsgCheckpoint {
        MsgCheckpoint {
            proposer: Address::new([1; 20]),
            start_block: 0,
            end_block: 255,
            root_hash: Hash::new([2; 32]),
            account_root_hash: Hash::new([3; 32]),
            root_chain_type: RootChainType::Eth,
            epoch: 1,
        }
    }

    #[test]
    fn test_validate_basic() {
        assert!(CheckpointMsg::Checkpoint(checkpoint_msg()).validate_basic().is_ok());

        let mut inverted = checkpoint_msg();
        inverted.start_block = 300;
        assert!(matches!(
            CheckpointMsg::Checkpoint(inverted).validate_basic(),
            Err(CheckpointError::InvalidMsg(_))
        ));

        let mut no_proposer = checkpoint_msg();
        no_proposer.proposer = Address::default();
        assert!(CheckpointMsg::Checkpoint(no_proposer).validate_basic().is_err());

        let no_ack = CheckpointMsg::CheckpointNoAck(MsgCheckpointNoAck {
            from: Address::default(),
        });
        assert!(no_ack.validate_basic().is_err());
    }

    #[test]
    fn test_json_tagging() {
        let json = r#"{
            "type": "checkpoint-noack",
            "from": "0x0101010101010101010101010101010101010101"
        }"#;
        let msg: CheckpointMsg = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind(), "checkpoint-noack");

        let json = r#"{
            "type": "checkpoint-sync",
            "from": "0x0101010101010101010101010101010101010101",
            "number": 4,
            "proposer": "0x0101010101010101010101010101010101010101",
            "start_block": 0,
            "end_block": 9,
            "root_chain_type": "bsc"
        }"#;
        match serde_json::from_str::<CheckpointMsg>(json).unwrap() {
            CheckpointMsg::CheckpointSync(sync) => assert_eq!(sync.root_chain_type, RootChainType::Bsc),
            other => panic!("unexpected msg {:?}", other),
        }
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let mut bytes = CheckpointMsg::Checkpoint(checkpoint_msg()).to_bytes().unwrap();
        bytes[0] = 42;
        assert!(CheckpointMsg::from_bytes(&bytes).is_err());
    }
}
