//! Read-only queries over committed checkpoint state
//!
//! Queries take shared references only, so they cannot mutate the keeper.
//! Responses are pretty-printed JSON.

use crate::error::QueryError;
use checkpoint_types::{account_root_hash, CheckpointStore, RootChainType, StakingStore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub const QUERY_ACK_COUNT: &str = "ack-count";
pub const QUERY_INITIAL_ACCOUNT_ROOT: &str = "initial-account-root";
pub const QUERY_CHECKPOINT: &str = "checkpoint";
pub const QUERY_CHECKPOINT_BUFFER: &str = "checkpoint-buffer";
pub const QUERY_LAST_NO_ACK: &str = "last-no-ack";
pub const QUERY_CHECKPOINT_LIST: &str = "checkpoint-list";

/// Upper bound on `limit` for checkpoint lists
pub const MAX_CHECKPOINT_LIST_LIMIT: u64 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryCheckpointParams {
    pub number: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryCheckpointBufferParams {
    #[serde(default)]
    pub root_chain_type: RootChainType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryCheckpointListParams {
    /// 1-based page
    pub page: u64,
    pub limit: u64,
}

fn parse_params<T: DeserializeOwned>(data: &[u8]) -> Result<T, QueryError> {
    serde_json::from_slice(data).map_err(|e| QueryError::InvalidParams(format!("failed to parse params: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, QueryError> {
    serde_json::to_vec_pretty(value)
        .map_err(|e| QueryError::Internal(format!("could not marshal result to JSON: {}", e)))
}

/// Dispatch a query by path
pub fn query<S: CheckpointStore, V: StakingStore>(
    store: &S,
    staking: &V,
    path: &str,
    data: &[u8],
) -> Result<Vec<u8>, QueryError> {
    match path {
        QUERY_ACK_COUNT => query_ack_count(store),
        QUERY_INITIAL_ACCOUNT_ROOT => query_initial_account_root(staking),
        QUERY_CHECKPOINT => query_checkpoint(store, data),
        QUERY_CHECKPOINT_BUFFER => query_checkpoint_buffer(store, data),
        QUERY_LAST_NO_ACK => query_last_no_ack(store),
        QUERY_CHECKPOINT_LIST => query_checkpoint_list(store, data),
        _ => Err(QueryError::UnknownRequest(format!(
            "unknown checkpoint query endpoint: {}",
            path
        ))),
    }
}

fn query_ack_count<S: CheckpointStore>(store: &S) -> Result<Vec<u8>, QueryError> {
    to_json(&store.ack_count()?)
}

/// Recomputed on every call, never cached
fn query_initial_account_root<V: StakingStore>(staking: &V) -> Result<Vec<u8>, QueryError> {
    let accounts = staking.dividend_accounts()?;
    let root = account_root_hash(&accounts)
        .map_err(|e| QueryError::Internal(format!("could not compute account root hash: {}", e)))?;
    to_json(&root)
}

fn query_checkpoint<S: CheckpointStore>(store: &S, data: &[u8]) -> Result<Vec<u8>, QueryError> {
    let params: QueryCheckpointParams = parse_params(data)?;
    let checkpoint = store
        .checkpoint_by_number(params.number)?
        .ok_or_else(|| QueryError::NotFound(format!("checkpoint {}", params.number)))?;
    to_json(&checkpoint)
}

/// Returns the buffered entry even if it has expired
fn query_checkpoint_buffer<S: CheckpointStore>(store: &S, data: &[u8]) -> Result<Vec<u8>, QueryError> {
    let params: QueryCheckpointBufferParams = if data.is_empty() {
        QueryCheckpointBufferParams::default()
    } else {
        parse_params(data)?
    };

    let checkpoint = store
        .checkpoint_buffer(params.root_chain_type)?
        .ok_or_else(|| QueryError::NotFound(format!("checkpoint buffer for {}", params.root_chain_type)))?;
    to_json(&checkpoint)
}

fn query_last_no_ack<S: CheckpointStore>(store: &S) -> Result<Vec<u8>, QueryError> {
    to_json(&store.last_no_ack()?)
}

fn query_checkpoint_list<S: CheckpointStore>(store: &S, data: &[u8]) -> Result<Vec<u8>, QueryError> {
    let params: QueryCheckpointListParams = parse_params(data)?;
    if params.page == 0 || params.limit == 0 {
        return Err(QueryError::InvalidParams(
            "page and limit must be positive".to_string(),
        ));
    }

    let limit = params.limit.min(MAX_CHECKPOINT_LIST_LIMIT);
    to_json(&store.checkpoint_list(params.page, limit)?)
}
