//! Events emitted by successful handler calls, consumed by indexers and relayers

use checkpoint_types::MODULE_NAME;
use serde::{Deserialize, Serialize};

pub const ATTRIBUTE_KEY_MODULE: &str = "module";
pub const ATTRIBUTE_KEY_PROPOSER: &str = "proposer";
pub const ATTRIBUTE_KEY_START_BLOCK: &str = "start-block";
pub const ATTRIBUTE_KEY_END_BLOCK: &str = "end-block";
pub const ATTRIBUTE_KEY_ROOT_HASH: &str = "root-hash";
pub const ATTRIBUTE_KEY_ACCOUNT_HASH: &str = "account-hash";
pub const ATTRIBUTE_KEY_HEADER_INDEX: &str = "header-index";
pub const ATTRIBUTE_KEY_NEW_PROPOSER: &str = "new-proposer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Checkpoint,
    CheckpointAck,
    #[serde(rename = "checkpoint-noack")]
    CheckpointNoAck,
    CheckpointSync,
    CheckpointSyncAck,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Checkpoint => "checkpoint",
            EventKind::CheckpointAck => "checkpoint-ack",
            EventKind::CheckpointNoAck => "checkpoint-noack",
            EventKind::CheckpointSync => "checkpoint-sync",
            EventKind::CheckpointSyncAck => "checkpoint-sync-ack",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub attributes: Vec<Attribute>,
}

impl Event {
    /// New event tagged with the module attribute
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            attributes: vec![Attribute {
                key: ATTRIBUTE_KEY_MODULE.to_string(),
                value: MODULE_NAME.to_string(),
            }],
        }
    }

    pub fn attr(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.push(Attribute {
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}
