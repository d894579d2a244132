//! Client-side state of the conversations.

use chrono::{DateTime, Utc};
use planbook_model::{Conversation, ConversationId, Message};

/// The ordered message list of the active conversation, plus the known
/// conversations.
///
/// Only the [`crate::ChatSession`] that owns the store mutates it. Views
/// read it through the update callback or [`crate::ChatSession::store`].
#[derive(Clone, Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active: Option<ConversationId>,
    messages: Vec<Message>,
}

impl ConversationStore {
    /// Returns the known conversations.
    #[inline]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Returns the identifier of the active conversation.
    #[inline]
    pub fn active_id(&self) -> Option<ConversationId> {
        self.active
    }

    /// Returns the active conversation, if it is known.
    #[inline]
    pub fn active_conversation(&self) -> Option<&Conversation> {
        let id = self.active?;
        self.conversation(id)
    }

    /// Returns the conversation with `id`.
    #[inline]
    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Returns the messages of the active conversation.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns `true` while an assistant message is being streamed.
    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.messages.last().is_some_and(|m| m.streaming)
    }

    pub(crate) fn set_conversations(
        &mut self,
        conversations: Vec<Conversation>,
    ) {
        self.conversations = conversations;
        let active_gone =
            self.active.is_some_and(|id| self.conversation(id).is_none());
        if active_gone {
            self.active = None;
            self.messages.clear();
        }
    }

    /// Inserts a conversation at the top, replacing an entry with the same
    /// identifier.
    pub(crate) fn upsert_conversation(&mut self, conversation: Conversation) {
        self.conversations.retain(|c| c.id != conversation.id);
        self.conversations.insert(0, conversation);
    }

    pub(crate) fn select(
        &mut self,
        id: ConversationId,
        messages: Vec<Message>,
    ) {
        self.active = Some(id);
        self.messages = messages;
    }

    /// Forgets a conversation. The message cache is cleared if it was the
    /// active one.
    pub(crate) fn remove_conversation(&mut self, id: ConversationId) {
        self.conversations.retain(|c| c.id != id);
        if self.active == Some(id) {
            self.active = None;
            self.messages.clear();
        }
    }

    pub(crate) fn rename_conversation(
        &mut self,
        id: ConversationId,
        name: String,
        now: DateTime<Utc>,
    ) {
        let Some(conversation) =
            self.conversations.iter_mut().find(|c| c.id == id)
        else {
            warn!("renaming an unknown conversation: {id}");
            return;
        };
        conversation.name = name;
        conversation.updated_at = now;
    }

    /// Appends a message and returns its index.
    pub(crate) fn push_message(&mut self, message: Message) -> usize {
        debug_assert!(!self.is_streaming(), "a message is still streaming");
        self.messages.push(message);
        self.messages.len() - 1
    }

    #[inline]
    pub(crate) fn message_mut(&mut self, idx: usize) -> Option<&mut Message> {
        self.messages.get_mut(idx)
    }
}
