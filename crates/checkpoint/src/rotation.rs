//! No-ack cooldowns and proposer rotation

use crate::error::CheckpointError;
use checkpoint_types::{CheckpointStore, RootChainType, StakingStore, Validator};

/// Whether `buffer_time` has passed since `since`
///
/// A `since` in the future (clock skew) never counts as elapsed.
pub fn cooldown_elapsed(since: u64, now: u64, buffer_time: u64) -> bool {
    since <= now && now - since >= buffer_time
}

/// Reject a no-ack arriving before either cooldown has passed
///
/// The first cooldown runs from the last confirmed checkpoint on the primary
/// root chain, the second from the last recorded no-ack.
pub fn ensure_no_ack_allowed<S: CheckpointStore>(
    store: &S,
    now: u64,
    buffer_time: u64,
) -> Result<(), CheckpointError> {
    let last_checkpoint_time = store
        .last_checkpoint(RootChainType::PRIMARY)?
        .map(|checkpoint| checkpoint.timestamp)
        .unwrap_or(0);

    if !cooldown_elapsed(last_checkpoint_time, now, buffer_time) {
        tracing::debug!(last_checkpoint_time, now, "Invalid no-ack, waiting for last checkpoint ack");
        return Err(CheckpointError::PrematureNoAck);
    }

    let last_no_ack = store.last_no_ack()?;
    if !cooldown_elapsed(last_no_ack, now, buffer_time) {
        tracing::debug!(last_no_ack, now, "Too many no-ack");
        return Err(CheckpointError::TooFrequentNoAck);
    }

    Ok(())
}

/// Record the no-ack at `now` and advance proposer selection by one round
///
/// Returns the new proposer.
pub fn rotate_proposer<S: CheckpointStore, V: StakingStore>(
    store: &mut S,
    staking: &mut V,
    now: u64,
) -> Result<Validator, CheckpointError> {
    if staking.validator_set()?.is_empty() {
        return Err(CheckpointError::NoProposerConfigured);
    }

    store.set_last_no_ack(now)?;
    tracing::debug!(last_no_ack = now, "Last no-ack time set");

    staking.increment_accum(1)?;

    let validator_set = staking.validator_set()?;
    let proposer = validator_set
        .proposer()
        .cloned()
        .ok_or(CheckpointError::NoProposerConfigured)?;

    tracing::debug!(
        validator = proposer.id,
        signer = %proposer.signer,
        power = proposer.voting_power,
        "New proposer selected"
    );

    Ok(proposer)
}
