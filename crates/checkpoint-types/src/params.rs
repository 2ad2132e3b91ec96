//! Checkpoint module parameters

use serde::{Deserialize, Serialize};

/// Default buffer time in seconds
pub const DEFAULT_CHECKPOINT_BUFFER_TIME: u64 = 1000;

/// Default upper bound on blocks covered by one checkpoint
pub const DEFAULT_MAX_CHECKPOINT_LENGTH: u64 = 1024;

fn default_max_checkpoint_length() -> u64 {
    DEFAULT_MAX_CHECKPOINT_LENGTH
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamsError {
    #[error("checkpoint buffer time must be positive")]
    ZeroBufferTime,

    #[error("max checkpoint length must be positive")]
    ZeroMaxCheckpointLength,
}

/// Parameters read by every handler from the keeper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Seconds a buffered, unconfirmed entry stays live. Also the no-ack cooldown.
    pub checkpoint_buffer_time: u64,
    /// Most blocks a single checkpoint may cover
    #[serde(default = "default_max_checkpoint_length")]
    pub max_checkpoint_length: u64,
}

impl Params {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.checkpoint_buffer_time == 0 {
            return Err(ParamsError::ZeroBufferTime);
        }
        if self.max_checkpoint_length == 0 {
            return Err(ParamsError::ZeroMaxCheckpointLength);
        }
        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            checkpoint_buffer_time: DEFAULT_CHECKPOINT_BUFFER_TIME,
            max_checkpoint_length: DEFAULT_MAX_CHECKPOINT_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(Params::default().validate().is_ok());

        let zero_buffer = Params {
            checkpoint_buffer_time: 0,
            ..Default::default()
        };
        assert_eq!(zero_buffer.validate(), Err(ParamsError::ZeroBufferTime));

        let zero_length = Params {
            max_checkpoint_length: 0,
            ..Default::default()
        };
        assert_eq!(zero_length.validate(), Err(ParamsError::ZeroMaxCheckpointLength));
    }

    #[test]
    fn test_missing_length_takes_default() {
        let params: Params = serde_json::from_str(r#"{ "checkpoint_buffer_time": 300 }"#).unwrap();
        assert_eq!(params.checkpoint_buffer_time, 300);
        assert_eq!(params.max_checkpoint_length, DEFAULT_MAX_CHECKPOINT_LENGTH);
    }
}
