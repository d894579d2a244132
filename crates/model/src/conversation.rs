use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a conversation, assigned by the backend.
pub type ConversationId = i64;

/// Identifier of a persisted message, assigned by the backend.
pub type MessageId = i64;

/// A conversation with the assistant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// The backend identifier.
    pub id: ConversationId,
    /// The display name. The server may assign one after the first
    /// exchange.
    #[serde(default)]
    pub name: String,
    /// When the conversation was created.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    /// When the conversation was last updated.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
    /// Number of messages persisted by the backend.
    #[serde(default)]
    pub message_count: u32,
}

/// Serde helper for backend timestamps. A timestamp without an offset is
/// read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, de};

    pub(super) fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(time) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(time.with_timezone(&Utc));
        }
        raw.parse::<NaiveDateTime>()
            .or_else(|_| {
                NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f")
            })
            .map(|naive| naive.and_utc())
            .map_err(|err| {
                de::Error::custom(format!("invalid timestamp '{raw}': {err}"))
            })
    }
}

/// A conversation together with its persisted messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationDetail {
    /// The conversation itself.
    #[serde(flatten)]
    pub conversation: Conversation,
    /// Messages in chronological order.
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The user.
    Human,
    /// The assistant.
    Assistant,
}

/// A message in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The backend identifier, absent until the exchange completes.
    #[serde(default)]
    pub id: Option<MessageId>,
    /// The author of this message.
    pub role: Role,
    /// The text content.
    #[serde(default)]
    pub content: String,
    /// Tools the assistant invoked while producing this message, in the
    /// order they were requested.
    #[serde(default)]
    pub tool_calls: Vec<ToolInvocation>,
    /// Whether the message is still being streamed.
    #[serde(skip)]
    pub streaming: bool,
}

impl Message {
    /// Creates a message authored by the user.
    #[inline]
    pub fn human<S: Into<String>>(content: S) -> Self {
        Self {
            id: None,
            role: Role::Human,
            content: content.into(),
            tool_calls: vec![],
            streaming: false,
        }
    }

    /// Creates an empty assistant message that is still streaming.
    #[inline]
    pub fn placeholder() -> Self {
        Self {
            id: None,
            role: Role::Assistant,
            content: String::new(),
            tool_calls: vec![],
            streaming: true,
        }
    }
}

/// A tool the assistant requested while answering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Name of the tool.
    pub name: String,
    /// The arguments passed to the tool.
    #[serde(default)]
    pub args: Map<String, Value>,
    /// The result, absent until the call has finished.
    #[serde(default)]
    pub result: Option<String>,
}

impl ToolInvocation {
    /// Creates an invocation that has not finished yet.
    #[inline]
    pub fn pending<S: Into<String>>(name: S, args: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            args,
            result: None,
        }
    }

    /// Returns `true` if the result has not arrived yet.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }
}
