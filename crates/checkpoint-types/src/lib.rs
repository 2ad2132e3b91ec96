//! Shared types for root chain checkpointing
//!
//! This crate contains the data model consumed by the checkpoint state machine:
//! - Root chain identifiers and checkpoint records
//! - Fixed-size addresses and hashes
//! - Validator set with proposer rotation
//! - Dividend accounts and the account root hash
//! - Keeper traits the state machine reads and writes through

pub mod bytes;
pub mod checkpoint;
pub mod dividend;
pub mod params;
pub mod store;
pub mod validator;

pub use bytes::{Address, Hash, ParseBytesError};
pub use checkpoint::{Checkpoint, CheckpointSync, RootChainType, UnknownRootChain};
pub use dividend::{account_root_hash, AccountRootError, DividendAccount};
pub use params::{Params, ParamsError};
pub use store::{CheckpointStore, StakingStore, StoreError};
pub use validator::{Validator, ValidatorSet};

/// Module name attached to every emitted event and error codespace
pub const MODULE_NAME: &str = "checkpoint";
