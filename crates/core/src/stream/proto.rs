use planbook_model::MessageId;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Token {
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ToolResult {
    pub name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub result: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Done {
    #[serde(default)]
    pub message_id: Option<MessageId>,
    #[serde(default)]
    pub conversation_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Error {
    pub detail: String,
}

/// Accepts any JSON value, keeping strings as they are and rendering
/// everything else as JSON text.
fn lenient_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tool_result_text() {
        let result: ToolResult =
            serde_json::from_value(json!({ "name": "a", "result": "3 hits" }))
                .unwrap();
        assert_eq!(result.result, "3 hits");

        let result: ToolResult =
            serde_json::from_value(json!({ "name": "a", "result": { "n": 3 } }))
                .unwrap();
        assert_eq!(result.result, "{\"n\":3}");
    }

    #[test]
    fn test_done_defaults() {
        let done: Done = serde_json::from_str("{}").unwrap();
        assert_eq!(done.message_id, None);
        assert_eq!(done.conversation_name, None);

        let done: Done = serde_json::from_str(
            "{\"message_id\":null,\"conversation_name\":\"Trip\"}",
        )
        .unwrap();
        assert_eq!(done.conversation_name.as_deref(), Some("Trip"));
    }
}
