//! Block replay
//!
//! Feeds blocks of checkpoint messages through the router in order. Each
//! message runs on a copy of the working keeper that replaces it only on
//! success, and a committed view is published at the end of every block.
//! Queries and saves only read the committed view.

use anyhow::Context as _;
use checkpoint::{handle_cached, BlockContext, CheckpointMsg, Context, Response};
use checkpoint_store::{ChainMetadata, CommittedState, MemoryStore, PersistentStore, StorePersistence};
use checkpoint_types::CheckpointStore;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One block of checkpoint transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    /// Block time in unix seconds
    pub time: u64,
    #[serde(default)]
    pub txs: Vec<CheckpointMsg>,
}

/// Read a JSON-lines block file, blank lines are skipped
pub fn read_blocks(path: &Path) -> anyhow::Result<Vec<Block>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read blocks {:?}", path))?;

    let mut blocks = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let block: Block = serde_json::from_str(line)
            .with_context(|| format!("invalid block on line {}", idx + 1))?;
        blocks.push(block);
    }

    Ok(blocks)
}

/// Per-block transaction counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockOutcome {
    pub applied: usize,
    pub rejected: usize,
}

pub struct Replayer {
    working: MemoryStore,
    committed: CommittedState,
    height: u64,
    block_time: u64,
}

impl Replayer {
    /// Resume from a loaded keeper at the position recorded in `metadata`
    pub fn new(store: MemoryStore, metadata: &ChainMetadata) -> Self {
        Self {
            committed: CommittedState::new(metadata.height, store.clone()),
            working: store,
            height: metadata.height,
            block_time: metadata.block_time,
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn committed(&self) -> &CommittedState {
        &self.committed
    }

    /// Apply every transaction of `block` and commit the result
    ///
    /// Rejected transactions are logged and counted, they never abort the block.
    pub fn apply_block(&mut self, block: &Block) -> anyhow::Result<BlockOutcome> {
        if block.height <= self.height {
            anyhow::bail!(
                "block {} is not above current height {}",
                block.height,
                self.height
            );
        }
        if block.time < self.block_time {
            anyhow::bail!(
                "block {} time {} is before previous block time {}",
                block.height,
                block.time,
                self.block_time
            );
        }

        let ctx_block = BlockContext {
            height: block.height,
            time: block.time,
        };
        let mut staking = self.working.take_staking();
        let mut outcome = BlockOutcome::default();

        for (index, tx) in block.txs.iter().enumerate() {
            let mut ctx = Context::new(ctx_block, &mut self.working, &mut staking);
            match handle_cached(&mut ctx, tx) {
                Ok(response) => {
                    outcome.applied += 1;
                    log_events(block.height, &response);
                }
                Err(e) => {
                    outcome.rejected += 1;
                    tracing::warn!(
                        height = block.height,
                        index,
                        kind = tx.kind(),
                        code = e.code(),
                        "Rejected: {}",
                        e
                    );
                }
            }
        }

        self.working.restore_staking(staking);
        self.height = block.height;
        self.block_time = block.time;
        self.committed.commit(block.height, &self.working);

        Ok(outcome)
    }

    /// Save the committed state together with its metadata
    pub fn save(&self, disk: &PersistentStore) -> anyhow::Result<usize> {
        self.committed.read(|store| {
            let metadata = ChainMetadata {
                height: self.height,
                block_time: self.block_time,
                ack_count: store.ack_count()?,
                last_no_ack: store.last_no_ack()?,
                saved_at: chrono::Utc::now().timestamp(),
            };
            store.save_to_disk(disk, &metadata)
        })
    }
}

fn log_events(height: u64, response: &Response) {
    for event in &response.events {
        let attributes = event
            .attributes
            .iter()
            .map(|attr| format!("{}={}", attr.key, attr.value))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(height, kind = event.kind.as_str(), "{}", attributes);
    }
}
