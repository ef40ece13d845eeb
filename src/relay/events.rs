use serde::{Deserialize, Serialize};

/// One event on the server → client channel.
///
/// Serialized as `{"type": "text" | "error" | "done", "content"?: "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireEvent", into = "WireEvent")]
pub enum RelayEvent {
    Text(String),
    Error(String),
    Done,
}

impl RelayEvent {
    /// `Done` and `Error` end a stream; exactly one of them is ever sent.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RelayEvent::Text(_))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"error"}"#.to_string())
    }
}

#[derive(Serialize, Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

/// Message used when an error event arrives without content.
pub const DEFAULT_ERROR_MESSAGE: &str = "Stream failed";

impl TryFrom<WireEvent> for RelayEvent {
    type Error = String;

    fn try_from(wire: WireEvent) -> Result<Self, String> {
        match wire.kind.as_str() {
            "text" => Ok(RelayEvent::Text(wire.content.unwrap_or_default())),
            "error" => Ok(RelayEvent::Error(
                wire.content
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            )),
            "done" => Ok(RelayEvent::Done),
            other => Err(format!("unknown event type '{other}'")),
        }
    }
}

impl From<RelayEvent> for WireEvent {
    fn from(event: RelayEvent) -> Self {
        let (kind, content) = match event {
            RelayEvent::Text(text) => ("text", Some(text)),
            RelayEvent::Error(message) => ("error", Some(message)),
            RelayEvent::Done => ("done", None),
        };
        WireEvent {
            kind: kind.to_string(),
            content,
        }
    }
}
