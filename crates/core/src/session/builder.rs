use planbook_model::{ChatTransport, ConversationService};

use super::{ChatSession, UpdateFn};
use crate::store::ConversationStore;

/// [`ChatSession`] builder.
pub struct ChatSessionBuilder<T, C> {
    pub(crate) transport: T,
    pub(crate) conversations: C,
    pub(crate) on_update: Option<Box<UpdateFn>>,
}

impl<T, C> ChatSessionBuilder<T, C>
where
    T: ChatTransport,
    C: ConversationService,
{
    /// Creates a new builder with the backend collaborators.
    #[inline]
    pub fn with_backend(transport: T, conversations: C) -> Self {
        Self {
            transport,
            conversations,
            on_update: None,
        }
    }

    /// Attaches a callback to be invoked after every change of the store.
    #[inline]
    pub fn on_update(
        mut self,
        on_update: impl Fn(&ConversationStore) + Send + Sync + 'static,
    ) -> Self {
        self.on_update = Some(Box::new(on_update));
        self
    }

    /// Builds the session.
    #[inline]
    pub fn build(self) -> ChatSession<T, C> {
        ChatSession::from_builder(self)
    }
}
