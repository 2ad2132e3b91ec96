//! Checkpoint state storage
//!
//! - `MemoryStore`: working keeper that handlers mutate during a block
//! - `CommittedState`: snapshot of the last committed block, read by queries
//! - `PersistentStore`: sled database the working keeper is saved to and loaded from

pub mod memory;
pub mod persistence;
pub mod snapshot;

pub use memory::MemoryStore;
pub use persistence::{ChainMetadata, PersistentStore, StorePersistence};
pub use snapshot::CommittedState;
