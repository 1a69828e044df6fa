use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Message;

/// Channel name to message list, in insertion order.
///
/// Serializes as a single JSON object whose keys appear in the order the
/// channels were inserted. Inserting a name that is already present replaces
/// its messages without moving it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct WorkspaceSnapshot(Map<String, Value>);

impl WorkspaceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, channel_name: impl Into<String>, messages: Vec<Message>) {
        self.0.insert(channel_name.into(), Value::Array(messages));
    }

    pub fn get(&self, channel_name: &str) -> Option<&[Message]> {
        self.0.get(channel_name).map(messages_of)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Message])> {
        self.0
            .iter()
            .map(|(name, messages)| (name.as_str(), messages_of(messages)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn message_count(&self) -> usize {
        self.0.values().map(|messages| messages_of(messages).len()).sum()
    }

    /// Two-space indented JSON document.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl TryFrom<Map<String, Value>> for WorkspaceSnapshot {
    type Error = String;

    fn try_from(channels: Map<String, Value>) -> Result<Self, Self::Error> {
        match channels.iter().find(|(_, messages)| !messages.is_array()) {
            Some((name, _)) => Err(format!("channel {name:?} does not hold a message array")),
            None => Ok(Self(channels)),
        }
    }
}

// Every value is an array: `insert` only stores arrays and `try_from` rejects anything else.
fn messages_of(value: &Value) -> &[Message] {
    value.as_array().map(Vec::as_slice).unwrap_or_default()
}
