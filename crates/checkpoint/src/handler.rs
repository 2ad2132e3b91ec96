//! Checkpoint Handler
//!
//! Routes decoded messages to their handler. Each handler validates fully
//! before touching state, so a rejected message leaves the keeper unchanged.

use crate::buffer::{CheckpointBuffer, SlotState, SyncBuffer, TtlSlot};
use crate::error::{BadAckReason, CheckpointError};
use crate::event::*;
use crate::msg::{
    CheckpointMsg, MsgCheckpoint, MsgCheckpointAck, MsgCheckpointNoAck, MsgCheckpointSync,
    MsgCheckpointSyncAck,
};
use crate::{rotation, sequencer, validation};
use checkpoint_types::{Checkpoint, CheckpointStore, CheckpointSync, StakingStore};
use serde::{Deserialize, Serialize};

/// Deterministic execution position supplied by the block executor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub height: u64,
    /// Block time in unix seconds
    pub time: u64,
}

/// Everything a handler may read or write for one message
pub struct Context<'a, S, V> {
    pub block: BlockContext,
    pub store: &'a mut S,
    pub staking: &'a mut V,
}

impl<'a, S: CheckpointStore, V: StakingStore> Context<'a, S, V> {
    pub fn new(block: BlockContext, store: &'a mut S, staking: &'a mut V) -> Self {
        Self { block, store, staking }
    }

    fn buffer_time(&self) -> Result<u64, CheckpointError> {
        Ok(self.store.params()?.checkpoint_buffer_time)
    }
}

/// Result of a successful handler call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub events: Vec<Event>,
}

impl Response {
    fn with_event(event: Event) -> Self {
        Self { events: vec![event] }
    }
}

/// Process a raw message payload
pub fn handle_raw<S: CheckpointStore, V: StakingStore>(
    ctx: &mut Context<'_, S, V>,
    data: &[u8],
) -> Result<Response, CheckpointError> {
    let msg = CheckpointMsg::from_bytes(data)
        .map_err(|e| CheckpointError::UnknownMessage(e.to_string()))?;
    handle(ctx, &msg)
}

/// Process a decoded message
pub fn handle<S: CheckpointStore, V: StakingStore>(
    ctx: &mut Context<'_, S, V>,
    msg: &CheckpointMsg,
) -> Result<Response, CheckpointError> {
    msg.validate_basic()?;

    match msg {
        CheckpointMsg::Checkpoint(msg) => handle_msg_checkpoint(ctx, msg),
        CheckpointMsg::CheckpointAck(msg) => handle_msg_checkpoint_ack(ctx, msg),
        CheckpointMsg::CheckpointNoAck(msg) => handle_msg_checkpoint_no_ack(ctx, msg),
        CheckpointMsg::CheckpointSync(msg) => handle_msg_checkpoint_sync(ctx, msg),
        CheckpointMsg::CheckpointSyncAck(msg) => handle_msg_checkpoint_sync_ack(ctx, msg),
    }
}

/// Process a message against copies of both keepers, writing them back only on success
///
/// A store failure part way through a handler then leaves the keepers unchanged.
pub fn handle_cached<S, V>(
    ctx: &mut Context<'_, S, V>,
    msg: &CheckpointMsg,
) -> Result<Response, CheckpointError>
where
    S: CheckpointStore + Clone,
    V: StakingStore + Clone,
{
    let mut store = ctx.store.clone();
    let mut staking = ctx.staking.clone();
    let response = handle(&mut Context::new(ctx.block, &mut store, &mut staking), msg)?;

    *ctx.store = store;
    *ctx.staking = staking;
    Ok(response)
}

/// Validate a checkpoint proposal and buffer it until the root chain acks it
fn handle_msg_checkpoint<S: CheckpointStore, V: StakingStore>(
    ctx: &mut Context<'_, S, V>,
    msg: &MsgCheckpoint,
) -> Result<Response, CheckpointError> {
    let now = ctx.block.time;
    let root = msg.root_chain_type;
    let params = ctx.store.params()?;

    let buffer = TtlSlot::<CheckpointBuffer>::new(root, params.checkpoint_buffer_time);
    let vacancy = buffer.ensure_vacant(ctx.store, now)?;

    let last = ctx.store.last_checkpoint(root)?;
    sequencer::check_continuity(root, last.as_ref(), msg.start_block)?;
    validation::validate_length(&params, msg.block_count())?;

    validation::validate_account_root(ctx.staking, &msg.account_root_hash)?;
    validation::validate_proposer(ctx.staking, &msg.proposer)?;
    validation::validate_epoch(ctx.store, msg.epoch)?;

    buffer.release(ctx.store, vacancy, now)?;
    buffer.put(
        ctx.store,
        Checkpoint {
            proposer: msg.proposer,
            start_block: msg.start_block,
            end_block: msg.end_block,
            root_hash: msg.root_hash,
            account_root_hash: msg.account_root_hash,
            root_chain_type: root,
            timestamp: now,
        },
    )?;

    tracing::debug!(
        %root,
        start_block = msg.start_block,
        end_block = msg.end_block,
        epoch = msg.epoch,
        "Checkpoint added to buffer"
    );

    Ok(Response::with_event(
        Event::new(EventKind::Checkpoint)
            .attr(ATTRIBUTE_KEY_PROPOSER, msg.proposer)
            .attr(ATTRIBUTE_KEY_START_BLOCK, msg.start_block)
            .attr(ATTRIBUTE_KEY_END_BLOCK, msg.end_block)
            .attr(ATTRIBUTE_KEY_ROOT_HASH, msg.root_hash)
            .attr(ATTRIBUTE_KEY_ACCOUNT_HASH, msg.account_root_hash),
    ))
}

/// Match an ack against the buffered checkpoint and confirm it
fn handle_msg_checkpoint_ack<S: CheckpointStore, V: StakingStore>(
    ctx: &mut Context<'_, S, V>,
    msg: &MsgCheckpointAck,
) -> Result<Response, CheckpointError> {
    let root = msg.root_chain_type;

    let buffered = ctx.store.checkpoint_buffer(root)?.ok_or_else(|| {
        tracing::error!(%root, "Unable to get checkpoint from buffer");
        CheckpointError::BadAck(BadAckReason::NoBufferedCheckpoint(root))
    })?;

    if msg.start_block != buffered.start_block {
        tracing::error!(
            start_expected = buffered.start_block,
            start_received = msg.start_block,
            "Invalid start block"
        );
        return Err(CheckpointError::BadAck(BadAckReason::StartBlockMismatch {
            expected: buffered.start_block,
            actual: msg.start_block,
        }));
    }

    // same range with a different root means the root chain saw other content
    if msg.end_block == buffered.end_block && msg.root_hash != buffered.root_hash {
        tracing::error!(
            %root,
            start = msg.start_block,
            end = msg.end_block,
            root_expected = %buffered.root_hash,
            root_received = %msg.root_hash,
            "Invalid ack"
        );
        return Err(CheckpointError::BadAck(BadAckReason::RootHashMismatch {
            expected: buffered.root_hash,
            actual: msg.root_hash,
        }));
    }

    let (number, _) = sequencer::confirm(
        ctx.store,
        root,
        ctx.block.time,
        Some(sequencer::ObservedCheckpoint {
            end_block: msg.end_block,
            root_hash: msg.root_hash,
        }),
    )?;

    tracing::debug!(%root, header_index = msg.number, ack_count = number, "Checkpoint ack processed");

    Ok(Response::with_event(
        Event::new(EventKind::CheckpointAck).attr(ATTRIBUTE_KEY_HEADER_INDEX, msg.number),
    ))
}

/// Rotate away from a proposer whose checkpoint never got acked
fn handle_msg_checkpoint_no_ack<S: CheckpointStore, V: StakingStore>(
    ctx: &mut Context<'_, S, V>,
    msg: &MsgCheckpointNoAck,
) -> Result<Response, CheckpointError> {
    let now = ctx.block.time;
    let buffer_time = ctx.buffer_time()?;

    rotation::ensure_no_ack_allowed(ctx.store, now, buffer_time)?;
    let proposer = rotation::rotate_proposer(ctx.store, ctx.staking, now)?;

    tracing::debug!(from = %msg.from, new_proposer = %proposer.signer, "No-ack processed");

    Ok(Response::with_event(
        Event::new(EventKind::CheckpointNoAck).attr(ATTRIBUTE_KEY_NEW_PROPOSER, proposer.signer),
    ))
}

/// Open a sync handshake, one per root chain at a time
fn handle_msg_checkpoint_sync<S: CheckpointStore, V: StakingStore>(
    ctx: &mut Context<'_, S, V>,
    msg: &MsgCheckpointSync,
) -> Result<Response, CheckpointError> {
    let now = ctx.block.time;
    let root = msg.root_chain_type;
    tracing::debug!(%root, number = msg.number, "Validating checkpoint sync msg");

    let buffer = TtlSlot::<SyncBuffer>::new(root, ctx.buffer_time()?);
    let vacancy = buffer.ensure_vacant(ctx.store, now)?;

    buffer.release(ctx.store, vacancy, now)?;
    buffer.put(
        ctx.store,
        CheckpointSync {
            proposer: msg.proposer,
            start_block: msg.start_block,
            end_block: msg.end_block,
            number: msg.number,
            root_chain_type: root,
            timestamp: now,
        },
    )?;

    Ok(Response::with_event(
        Event::new(EventKind::CheckpointSync)
            .attr(ATTRIBUTE_KEY_PROPOSER, msg.proposer)
            .attr(ATTRIBUTE_KEY_START_BLOCK, msg.start_block)
            .attr(ATTRIBUTE_KEY_END_BLOCK, msg.end_block),
    ))
}

/// Close a sync handshake; never rejected for buffer occupancy
fn handle_msg_checkpoint_sync_ack<S: CheckpointStore, V: StakingStore>(
    ctx: &mut Context<'_, S, V>,
    msg: &MsgCheckpointSyncAck,
) -> Result<Response, CheckpointError> {
    let now = ctx.block.time;
    let root = msg.root_chain_type;
    tracing::debug!(%root, number = msg.number, "Validating checkpoint sync ack msg");

    let buffer = TtlSlot::<SyncBuffer>::new(root, ctx.buffer_time()?);
    match buffer.state(ctx.store, now)? {
        SlotState::Expired(entry) => {
            tracing::debug!(%root, now, buffered_at = entry.timestamp, "Checkpoint sync has been timed out, flushing buffer");
            buffer.flush(ctx.store)?;
        }
        SlotState::Live { entry, .. }
            if entry.start_block == msg.start_block && entry.end_block == msg.end_block =>
        {
            tracing::debug!(%root, number = msg.number, "Checkpoint sync acknowledged, flushing buffer");
            buffer.flush(ctx.store)?;
        }
        SlotState::Live { .. } | SlotState::Empty => {}
    }

    Ok(Response::with_event(
        Event::new(EventKind::CheckpointSyncAck)
            .attr(ATTRIBUTE_KEY_PROPOSER, msg.proposer)
            .attr(ATTRIBUTE_KEY_START_BLOCK, msg.start_block)
            .attr(ATTRIBUTE_KEY_END_BLOCK, msg.end_block)
            .attr(ATTRIBUTE_KEY_HEADER_INDEX, msg.number),
    ))
}
