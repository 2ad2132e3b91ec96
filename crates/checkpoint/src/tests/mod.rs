//! Handler and query tests over an in-memory keeper


use crate::{
    handle, BlockContext, CheckpointError, CheckpointMsg, Context, MsgCheckpoint, MsgCheckpointAck,
    MsgCheckpointNoAck, MsgCheckpointSync, MsgCheckpointSyncAck, Response,
};
use checkpoint_store::MemoryStore;
use checkpoint_types::{
    account_root_hash, Address, DividendAccount, Hash, Params, RootChainType, StakingStore,
    Validator, ValidatorSet,
};

pub(crate) const VALIDATOR_A: Address = Address::new([0x0a; 20]);
pub(crate) const VALIDATOR_B: Address = Address::new([0x0b; 20]);
pub(crate) const SUBMITTER: Address = Address::new([0x0c; 20]);
pub(crate) const MAX_CHECKPOINT_LENGTH: u64 = 1024;

/// Checkpoint store and staking store driven by explicit block times
pub(crate) struct TestChain {
    pub store: MemoryStore,
    pub staking: MemoryStore,
    height: u64,
}

impl TestChain {
    /// Two validators of equal power, A proposes first
    pub fn new(buffer_time: u64) -> Self {
        let validators = vec![
            Validator {
                id: 1,
                signer: VALIDATOR_A,
                voting_power: 10,
                proposer_priority: 0,
            },
            Validator {
                id: 2,
                signer: VALIDATOR_B,
                voting_power: 10,
                proposer_priority: 0,
            },
        ];
        let dividends = vec![
            DividendAccount {
                user: VALIDATOR_A,
                fee_amount: 1_000,
            },
            DividendAccount {
                user: VALIDATOR_B,
                fee_amount: 2_500,
            },
        ];

        Self {
            store: MemoryStore::new(Params {
                checkpoint_buffer_time: buffer_time,
                max_checkpoint_length: MAX_CHECKPOINT_LENGTH,
            }),
            staking: MemoryStore::default()
                .with_validator_set(ValidatorSet::new(validators))
                .with_dividend_accounts(dividends),
            height: 0,
        }
    }

    /// Apply one message in a new block at `time`
    pub fn apply(&mut self, time: u64, msg: CheckpointMsg) -> Result<Response, CheckpointError> {
        self.height += 1;
        let block = BlockContext {
            height: self.height,
            time,
        };
        let mut ctx = Context::new(block, &mut self.store, &mut self.staking);
        handle(&mut ctx, &msg)
    }

    pub fn proposer(&self) -> Address {
        self.staking
            .validator_set()
            .unwrap()
            .proposer()
            .map(|v| v.signer)
            .unwrap()
    }

    pub fn account_root(&self) -> Hash {
        account_root_hash(&self.staking.dividend_accounts().unwrap()).unwrap()
    }

    /// Checkpoint from the current proposer with a correct account root
    pub fn checkpoint(&self, root: RootChainType, start: u64, end: u64, epoch: u64) -> CheckpointMsg {
        CheckpointMsg::Checkpoint(MsgCheckpoint {
            proposer: self.proposer(),
            start_block: start,
            end_block: end,
            root_hash: range_hash(start, end),
            account_root_hash: self.account_root(),
            root_chain_type: root,
            epoch,
        })
    }

    /// Submit a checkpoint at `time` and ack it at `ack_time`
    pub fn submit_and_ack(&mut self, root: RootChainType, start: u64, end: u64, time: u64, ack_time: u64) {
        let epoch = crate::sequencer::next_epoch(&self.store).unwrap();
        let msg = self.checkpoint(root, start, end, epoch);
        self.apply(time, msg).unwrap();
        self.apply(ack_time, ack(root, start, end, range_hash(start, end), epoch))
            .unwrap();
    }
}

/// Deterministic non-zero root hash for a block range
pub(crate) fn range_hash(start: u64, end: u64) -> Hash {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&start.to_be_bytes());
    bytes[8..16].copy_from_slice(&end.to_be_bytes());
    bytes[31] = 1;
    Hash::new(bytes)
}

pub(crate) fn ack(root: RootChainType, start: u64, end: u64, root_hash: Hash, number: u64) -> CheckpointMsg {
    CheckpointMsg::CheckpointAck(MsgCheckpointAck {
        from: SUBMITTER,
        number,
        proposer: VALIDATOR_A,
        start_block: start,
        end_block: end,
        root_hash,
        root_chain_type: root,
    })
}

pub(crate) fn no_ack() -> CheckpointMsg {
    CheckpointMsg::CheckpointNoAck(MsgCheckpointNoAck { from: SUBMITTER })
}

pub(crate) fn sync(root: RootChainType, start: u64, end: u64, number: u64) -> CheckpointMsg {
    CheckpointMsg::CheckpointSync(MsgCheckpointSync {
        from: SUBMITTER,
        number,
        proposer: VALIDATOR_A,
        start_block: start,
        end_block: end,
        root_chain_type: root,
    })
}

pub(crate) fn sync_ack(root: RootChainType, start: u64, end: u64, number: u64) -> CheckpointMsg {
    CheckpointMsg::CheckpointSyncAck(MsgCheckpointSyncAck {
        from: SUBMITTER,
        number,
        proposer: VALIDATOR_A,
        start_block: start,
        end_block: end,
        root_chain_type: root,
    })
}
