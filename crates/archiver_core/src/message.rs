use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A platform message record, kept exactly as the API returned it.
pub type Message = Value;

/// Four-field projection of a platform message.
///
/// Missing `user` and `ts` become `null`; missing `text` and `type` become
/// empty strings. Fields of the wrong JSON type count as missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub user: Option<String>,
    pub text: String,
    pub ts: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl NormalizedMessage {
    pub fn from_raw(raw: &Message) -> Self {
        let field = |name: &str| raw.get(name).and_then(Value::as_str).map(str::to_owned);
        Self {
            user: field("user"),
            text: field("text").unwrap_or_default(),
            ts: field("ts"),
            kind: field("type").unwrap_or_default(),
        }
    }

    pub fn into_value(self) -> Message {
        json!({
            "user": self.user,
            "text": self.text,
            "ts": self.ts,
            "type": self.kind,
        })
    }
}
