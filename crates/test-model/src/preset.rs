use planbook_model::MessageId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// The events in a preset exchange.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "token")]
    Token(String),
    #[serde(rename = "tool_call")]
    ToolCall {
        name: String,
        args: Map<String, Value>,
    },
    #[serde(rename = "tool_result")]
    ToolResult { name: String, result: String },
    #[serde(rename = "done")]
    Done {
        message_id: Option<MessageId>,
        conversation_name: Option<String>,
    },
    #[serde(rename = "error")]
    Error(String),
    /// Written to the body verbatim, for malformed or unknown frames.
    #[serde(rename = "raw")]
    Raw(String),
}

impl PresetEvent {
    /// Renders the event as it appears on the wire.
    pub fn to_wire(&self) -> String {
        let (name, data) = match self {
            PresetEvent::Token(content) => {
                ("token", json!({ "content": content }))
            }
            PresetEvent::ToolCall { name, args } => {
                ("tool_call", json!({ "name": name, "args": args }))
            }
            PresetEvent::ToolResult { name, result } => {
                ("tool_result", json!({ "name": name, "result": result }))
            }
            PresetEvent::Done {
                message_id,
                conversation_name,
            } => (
                "done",
                json!({
                    "message_id": message_id,
                    "conversation_name": conversation_name,
                }),
            ),
            PresetEvent::Error(detail) => ("error", json!({ "detail": detail })),
            PresetEvent::Raw(raw) => return raw.clone(),
        };
        format!("event: {name}\ndata: {data}\n\n")
    }
}

/// The preset for one streamed exchange.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this exchange.
    pub events: Vec<PresetEvent>,
    /// If set, the exchange is refused with this status code.
    pub status: Option<u16>,
    /// If set, the body is delivered in chunks of this many bytes.
    pub chunk_size: Option<usize>,
    /// If set, the connection drops after the last event.
    pub broken: bool,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            status: None,
            chunk_size: None,
            broken: false,
        }
    }

    /// Creates a `PresetResponse` that is refused with `status`.
    #[inline]
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::with_events(Vec::new())
        }
    }

    /// Splits the body into chunks of `size` bytes.
    #[inline]
    pub fn chunked(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    /// Drops the connection after the last event.
    #[inline]
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    /// Renders the whole body.
    pub fn to_wire(&self) -> String {
        self.events.iter().map(PresetEvent::to_wire).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let mut args = Map::new();
        args.insert("query".to_owned(), json!("groceries"));
        let response = PresetResponse::with_events([
            PresetEvent::Token("Let me look.".to_owned()),
            PresetEvent::ToolCall {
                name: "search".to_owned(),
                args,
            },
        ])
        .chunked(4);

        let serialized = serde_json::to_string(&response).unwrap();
        let deserialized: PresetResponse =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(response, deserialized);
    }

    #[test]
    fn test_to_wire() {
        let response = PresetResponse::with_events([
            PresetEvent::Token("Hi".to_owned()),
            PresetEvent::Done {
                message_id: Some(9),
                conversation_name: None,
            },
        ]);
        let wire = response.to_wire();
        let (token, done) = wire
            .split_once("\n\n")
            .expect("two frames");
        assert_eq!(token, "event: token\ndata: {\"content\":\"Hi\"}");

        let data = done
            .strip_prefix("event: done\ndata: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .unwrap();
        let data: Value = serde_json::from_str(data).unwrap();
        assert_eq!(data, json!({ "message_id": 9, "conversation_name": null }));
    }
}
