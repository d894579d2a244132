mod builder;
mod error;
mod exchange;
#[cfg(test)]
mod tests;

use planbook_model::{
    ByteStream, ChatTransport, ConversationId, ConversationService, Message,
};
use tracing::Instrument;

pub use builder::ChatSessionBuilder;
pub use error::{Error, ErrorKind};
use exchange::{Exchange, TRUNCATED_DETAIL};

use crate::store::ConversationStore;
use crate::stream::{Sse, dispatch};

/// The callback invoked after every mutation of the store.
pub type UpdateFn = dyn Fn(&ConversationStore) + Send + Sync;

/// A conversational session with the assistant backend.
///
/// The session owns the [`ConversationStore`] and is the only writer of it.
/// At most one exchange is in flight at a time, which `send` enforces by
/// taking `&mut self`.
pub struct ChatSession<T, C> {
    transport: T,
    conversations: C,
    store: ConversationStore,
    on_update: Option<Box<UpdateFn>>,
}

impl<T, C> ChatSession<T, C>
where
    T: ChatTransport,
    C: ConversationService,
{
    /// Returns the current state of the conversations.
    #[inline]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Sends `content` to a conversation and streams the reply into the
    /// store.
    ///
    /// The target is `conversation_id`, else the active conversation, else a
    /// newly created one. Once the human message is appended, failures of
    /// the exchange are rendered into the assistant message rather than
    /// returned.
    pub async fn send(
        &mut self,
        conversation_id: Option<ConversationId>,
        content: &str,
    ) -> Result<(), Error> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::invalid_input().with_reason("message is empty"));
        }

        let target = match conversation_id.or(self.store.active_id()) {
            Some(id) => {
                if self.store.active_id() != Some(id) {
                    debug!("switching to conversation {id} before sending");
                    self.store.select(id, vec![]);
                }
                id
            }
            None => self.create_conversation().await?,
        };

        self.store.push_message(Message::human(content));
        let placeholder = self.store.push_message(Message::placeholder());
        self.notify();

        let span = debug_span!("exchange", conversation = target);
        let opened = self.transport.open_exchange(target, content);
        let mut exchange = Exchange::new(
            &mut self.store,
            self.on_update.as_deref(),
            target,
            placeholder,
        );
        match opened.instrument(span.clone()).await {
            Ok(body) => {
                stream_into(Sse::new(body), &mut exchange)
                    .instrument(span)
                    .await
            }
            Err(err) => {
                warn!("failed to open exchange: {err}");
                exchange.fail(&format!("Request failed: {err}"));
            }
        }
        Ok(())
    }

    /// Creates a conversation and makes it active.
    pub async fn new_conversation(&mut self) -> Result<ConversationId, Error> {
        self.create_conversation().await
    }

    /// Reloads the list of conversations.
    ///
    /// The active conversation stays selected only if it is still listed.
    pub async fn refresh_conversations(&mut self) -> Result<(), Error> {
        let conversations =
            self.conversations.list().await.map_err(Error::service)?;
        trace!("listed {} conversations", conversations.len());
        self.store.set_conversations(conversations);
        self.notify();
        Ok(())
    }

    /// Makes a conversation active and loads its persisted messages.
    pub async fn select_conversation(
        &mut self,
        id: ConversationId,
    ) -> Result<(), Error> {
        let detail =
            self.conversations.get(id).await.map_err(Error::service)?;
        if self.store.conversation(id).is_none() {
            self.store.upsert_conversation(detail.conversation);
        }
        self.store.select(id, detail.messages);
        self.notify();
        Ok(())
    }

    /// Deletes a conversation on the backend and forgets it locally.
    pub async fn delete_conversation(
        &mut self,
        id: ConversationId,
    ) -> Result<(), Error> {
        self.conversations
            .delete(id)
            .await
            .map_err(Error::service)?;
        self.store.remove_conversation(id);
        self.notify();
        Ok(())
    }
}

impl<T, C> ChatSession<T, C>
where
    T: ChatTransport,
    C: ConversationService,
{
    fn from_builder(builder: ChatSessionBuilder<T, C>) -> Self {
        let ChatSessionBuilder {
            transport,
            conversations,
            on_update,
        } = builder;

        Self {
            transport,
            conversations,
            store: Default::default(),
            on_update,
        }
    }

    async fn create_conversation(&mut self) -> Result<ConversationId, Error> {
        let conversation =
            self.conversations.create(None).await.map_err(|err| {
                warn!("failed to create conversation: {err}");
                Error::service(err)
            })?;
        let id = conversation.id;
        debug!("created conversation {id}");
        self.store.upsert_conversation(conversation);
        self.store.select(id, vec![]);
        self.notify();
        Ok(id)
    }

    #[inline]
    fn notify(&self) {
        if let Some(on_update) = &self.on_update {
            on_update(&self.store);
        }
    }
}

/// Feeds the events of `sse` into `exchange` until it finishes.
async fn stream_into<S: ByteStream>(
    mut sse: Sse<S>,
    exchange: &mut Exchange<'_>,
) {
    loop {
        match sse.next_event().await {
            Ok(Some(event)) => {
                trace!("received `{}` event", event.name);
                dispatch(&event, exchange);
                if exchange.is_finished() {
                    return;
                }
            }
            Ok(None) => {
                warn!("stream ended without a terminal event");
                exchange.fail(TRUNCATED_DETAIL);
                return;
            }
            Err(err) => {
                warn!("stream failed: {err}");
                exchange.fail(&format!("Connection lost: {err}"));
                return;
            }
        }
    }
}
