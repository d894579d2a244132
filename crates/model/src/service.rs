use crate::conversation::{Conversation, ConversationDetail, ConversationId};
use crate::error::ServiceError;

/// The ordinary REST operations on conversations.
///
/// Like [`crate::ChatTransport`], the returned futures must be fully
/// independent of `self`.
pub trait ConversationService: Send + Sync {
    /// The error type that may be returned by the service.
    type Error: ServiceError;

    /// Creates a conversation, optionally with a display name.
    fn create(
        &self,
        name: Option<&str>,
    ) -> impl Future<Output = Result<Conversation, Self::Error>> + Send + 'static;

    /// Lists all conversations, most recent first.
    fn list(
        &self,
    ) -> impl Future<Output = Result<Vec<Conversation>, Self::Error>>
    + Send
    + 'static;

    /// Fetches a conversation with its persisted messages.
    fn get(
        &self,
        id: ConversationId,
    ) -> impl Future<Output = Result<ConversationDetail, Self::Error>>
    + Send
    + 'static;

    /// Deletes a conversation.
    fn delete(
        &self,
        id: ConversationId,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static;
}
