use planbook_core::{ChatSession, ChatSessionBuilder, ConversationStore};
use planbook_http::{ApiConfig, HttpTransport, RestConversations};

/// A session talking to the planbook API over HTTP.
pub type Session = ChatSession<HttpTransport, RestConversations>;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    inner: ChatSessionBuilder<HttpTransport, RestConversations>,
}

impl SessionBuilder {
    /// Creates a session builder for the API described by `config`.
    pub fn with_config(config: ApiConfig) -> Self {
        debug!("using API at {}", config.base_url());
        let transport = HttpTransport::new(config.clone());
        let conversations = RestConversations::new(config);
        Self {
            inner: ChatSessionBuilder::with_backend(transport, conversations),
        }
    }

    /// Attaches a callback to be invoked after every change of the
    /// conversation state.
    #[inline]
    pub fn on_update(
        mut self,
        on_update: impl Fn(&ConversationStore) + Send + Sync + 'static,
    ) -> Self {
        self.inner = self.inner.on_update(on_update);
        self
    }

    /// Builds a new session.
    #[inline]
    pub fn build(self) -> Session {
        self.inner.build()
    }
}
