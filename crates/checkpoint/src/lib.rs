//! Checkpoint consensus state machine
//!
//! Validates, sequences, buffers, acknowledges and times out checkpoints of
//! the sidechain across independent root chains:
//! - Single-slot buffers with expiry per root chain
//! - Block range continuity and epoch sequencing
//! - Proposer and account root checks
//! - No-ack driven proposer rotation
//! - Read-only queries over committed state
//!
//! Handlers run one message at a time against keeper traits from
//! `checkpoint-types` and must give the same result on every validator.
//! `handle_cached` runs a message on copies of the keepers so a store
//! failure mid-message cannot leave partial writes behind.

pub mod buffer;
pub mod error;
pub mod event;
pub mod handler;
pub mod msg;
pub mod querier;
pub mod rotation;
pub mod sequencer;
pub mod validation;

#[cfg(test)]
mod tests;

pub use error::{BadAckReason, CheckpointError, QueryError};
pub use event::{Event, EventKind};
pub use handler::{handle, handle_cached, handle_raw, BlockContext, Context, Response};
pub use msg::{
    CheckpointMsg, MsgCheckpoint, MsgCheckpointAck, MsgCheckpointNoAck, MsgCheckpointSync,
    MsgCheckpointSyncAck,
};
pub use querier::query;
