//! Single-slot buffers with a time-to-live
//!
//! Each root chain has one checkpoint slot and one sync slot. A slot holds at
//! most one unconfirmed entry. An entry is live until `timestamp + buffer_time`
//! and blocks new submissions while live; once expired it is flushed by the
//! next submission. The same policy serves every slot kind, only the keeper
//! accessors differ.

use crate::error::CheckpointError;
use checkpoint_types::{Checkpoint, CheckpointStore, CheckpointSync, RootChainType, StoreError};
use std::marker::PhantomData;

/// Entries carry the block time they were buffered at
pub trait Timestamped {
    fn timestamp(&self) -> u64;
}

impl Timestamped for Checkpoint {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl Timestamped for CheckpointSync {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// Keeper accessors for one kind of slot
pub trait BufferKind {
    type Entry: Timestamped + Clone + std::fmt::Debug;

    /// Name used in logs
    const NAME: &'static str;

    fn load<S: CheckpointStore>(store: &S, root: RootChainType) -> Result<Option<Self::Entry>, StoreError>;
    fn save<S: CheckpointStore>(store: &mut S, entry: Self::Entry) -> Result<(), StoreError>;
    fn clear<S: CheckpointStore>(store: &mut S, root: RootChainType) -> Result<(), StoreError>;
}

/// Checkpoint proposals awaiting an ack
pub struct CheckpointBuffer;

impl BufferKind for CheckpointBuffer {
    type Entry = Checkpoint;
    const NAME: &'static str = "checkpoint";

    fn load<S: CheckpointStore>(store: &S, root: RootChainType) -> Result<Option<Checkpoint>, StoreError> {
        store.checkpoint_buffer(root)
    }

    fn save<S: CheckpointStore>(store: &mut S, entry: Checkpoint) -> Result<(), StoreError> {
        store.set_checkpoint_buffer(entry)
    }

    fn clear<S: CheckpointStore>(store: &mut S, root: RootChainType) -> Result<(), StoreError> {
        store.flush_checkpoint_buffer(root)
    }
}

/// Checkpoint syncs awaiting a sync ack
pub struct SyncBuffer;

impl BufferKind for SyncBuffer {
    type Entry = CheckpointSync;
    const NAME: &'static str = "checkpoint sync";

    fn load<S: CheckpointStore>(store: &S, root: RootChainType) -> Result<Option<CheckpointSync>, StoreError> {
        store.sync_buffer(root)
    }

    fn save<S: CheckpointStore>(store: &mut S, entry: CheckpointSync) -> Result<(), StoreError> {
        store.set_sync_buffer(entry)
    }

    fn clear<S: CheckpointStore>(store: &mut S, root: RootChainType) -> Result<(), StoreError> {
        store.flush_sync_buffer(root)
    }
}

/// Occupancy of a slot at a given block time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState<T> {
    Empty,
    Expired(T),
    Live { entry: T, expiry: u64 },
}

/// Classify an entry against block time `now`
///
/// An entry with a zero timestamp is treated as expired.
pub fn slot_state<T: Timestamped>(entry: Option<T>, now: u64, buffer_time: u64) -> SlotState<T> {
    match entry {
        None => SlotState::Empty,
        Some(entry) => {
            let buffered_at = entry.timestamp();
            if buffered_at == 0 || (now > buffered_at && now - buffered_at >= buffer_time) {
                SlotState::Expired(entry)
            } else {
                SlotState::Live {
                    entry,
                    expiry: buffered_at.saturating_add(buffer_time),
                }
            }
        }
    }
}

/// A slot that accepts a new entry, possibly after flushing an expired one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Vacancy {
    Empty,
    Expired,
}

/// One root chain's slot of kind `K`
pub struct TtlSlot<K: BufferKind> {
    root: RootChainType,
    buffer_time: u64,
    _kind: PhantomData<K>,
}

impl<K: BufferKind> TtlSlot<K> {
    pub fn new(root: RootChainType, buffer_time: u64) -> Self {
        Self {
            root,
            buffer_time,
            _kind: PhantomData,
        }
    }

    pub fn state<S: CheckpointStore>(&self, store: &S, now: u64) -> Result<SlotState<K::Entry>, StoreError> {
        Ok(slot_state(K::load(store, self.root)?, now, self.buffer_time))
    }

    /// Reject while a live entry occupies the slot
    ///
    /// Does not mutate; pass the returned vacancy to [`TtlSlot::release`] once
    /// every other check has passed.
    pub fn ensure_vacant<S: CheckpointStore>(&self, store: &S, now: u64) -> Result<Vacancy, CheckpointError> {
        match self.state(store, now)? {
            SlotState::Empty => Ok(Vacancy::Empty),
            SlotState::Expired(_) => Ok(Vacancy::Expired),
            SlotState::Live { entry, expiry } => {
                tracing::error!(
                    root = %self.root,
                    entry = ?entry,
                    expires = expiry,
                    "{} already exists in buffer",
                    K::NAME
                );
                Err(CheckpointError::BufferOccupied { expiry })
            }
        }
    }

    /// Flush an expired entry found by [`TtlSlot::ensure_vacant`]
    pub fn release<S: CheckpointStore>(&self, store: &mut S, vacancy: Vacancy, now: u64) -> Result<(), StoreError> {
        if vacancy == Vacancy::Expired {
            tracing::debug!(root = %self.root, now, "{} has been timed out, flushing buffer", K::NAME);
            K::clear(store, self.root)?;
        }
        Ok(())
    }

    pub fn put<S: CheckpointStore>(&self, store: &mut S, entry: K::Entry) -> Result<(), StoreError> {
        K::save(store, entry)
    }

    pub fn flush<S: CheckpointStore>(&self, store: &mut S) -> Result<(), StoreError> {
        K::clear(store, self.root)
    }
}
