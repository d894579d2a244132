//! Local fakes of the backend collaborators for testing purpose.

mod preset;
mod speech;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use planbook_model::{
    ByteStream, ChatTransport, Conversation, ConversationDetail,
    ConversationId, ConversationService, ErrorKind, ServiceError,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;
pub use speech::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub fn new(message: &'static str, kind: ErrorKind) -> Self {
        Self { message, kind }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ServiceError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A body that replays preset chunks.
#[derive(Debug)]
pub struct ScriptedBody {
    chunks: VecDeque<Bytes>,
    failure: Option<ErrorKind>,
    delay: Option<Duration>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ScriptedBody {
    #[inline]
    pub fn from_chunks(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
            failure: None,
            delay: None,
            sleep: None,
        }
    }

    /// Fails with `kind` once all chunks are delivered.
    #[inline]
    pub fn with_failure(mut self, kind: ErrorKind) -> Self {
        self.failure = Some(kind);
        self
    }

    /// Waits `delay` before each chunk.
    #[inline]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn from_preset(preset: &PresetResponse) -> Self {
        let wire = preset.to_wire().into_bytes();
        let chunks: Vec<Bytes> = match preset.chunk_size {
            Some(size) => wire.chunks(size).map(Bytes::copy_from_slice).collect(),
            None if wire.is_empty() => vec![],
            None => vec![Bytes::from(wire)],
        };
        let body = Self::from_chunks(chunks);
        if preset.broken {
            body.with_failure(ErrorKind::Network)
        } else {
            body
        }
    }
}

impl ByteStream for ScriptedBody {
    type Error = crate::Error;

    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Bytes>, Self::Error>> {
        let this = self.get_mut();
        if let Some(delay) = this.delay {
            let sleep = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;
        }

        if let Some(chunk) = this.chunks.pop_front() {
            return Poll::Ready(Ok(Some(chunk)));
        }
        if let Some(kind) = this.failure.take() {
            return Poll::Ready(Err(Error::new("connection reset", kind)));
        }
        Poll::Ready(Ok(None))
    }
}

#[derive(Default)]
struct TransportScript {
    responses: VecDeque<PresetResponse>,
    requests: Vec<(ConversationId, String)>,
}

/// A transport that answers exchanges from a script.
///
/// Each call to `open_exchange` consumes the next preset response, in the
/// order they were added. Running out of presets is an error.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<TransportScript>>,
}

impl ScriptedTransport {
    #[inline]
    pub fn add_response(&self, preset: PresetResponse) {
        lock(&self.script).responses.push_back(preset);
    }

    /// Returns the `(conversation, content)` pairs received so far.
    #[inline]
    pub fn requests(&self) -> Vec<(ConversationId, String)> {
        lock(&self.script).requests.clone()
    }
}

impl ChatTransport for ScriptedTransport {
    type Error = crate::Error;
    type Body = ScriptedBody;

    fn open_exchange(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> impl Future<Output = Result<Self::Body, Self::Error>> + Send + 'static
    {
        let mut script = lock(&self.script);
        script.requests.push((conversation_id, content.to_owned()));
        let result = match script.responses.pop_front() {
            None => Err(Error::new("no enough presets", ErrorKind::Other)),
            Some(PresetResponse {
                status: Some(code), ..
            }) => Err(Error::new("refused", ErrorKind::Status(code))),
            Some(preset) => Ok(ScriptedBody::from_preset(&preset)),
        };
        ready(result)
    }
}

#[derive(Default)]
struct ConversationTable {
    next_id: ConversationId,
    details: Vec<ConversationDetail>,
    failure: Option<ErrorKind>,
}

/// An in-memory conversation backend.
#[derive(Clone, Default)]
pub struct InMemoryConversations {
    table: Arc<Mutex<ConversationTable>>,
}

impl InMemoryConversations {
    /// Adds a conversation with persisted messages.
    pub fn insert(&self, detail: ConversationDetail) {
        let mut table = lock(&self.table);
        table.next_id = table.next_id.max(detail.conversation.id);
        table.details.push(detail);
    }

    /// Makes the next call fail with `kind`.
    #[inline]
    pub fn fail_next(&self, kind: ErrorKind) {
        lock(&self.table).failure = Some(kind);
    }

    #[inline]
    pub fn ids(&self) -> Vec<ConversationId> {
        lock(&self.table)
            .details
            .iter()
            .map(|d| d.conversation.id)
            .collect()
    }

    fn with_table<T>(
        &self,
        f: impl FnOnce(&mut ConversationTable) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut table = lock(&self.table);
        if let Some(kind) = table.failure.take() {
            return Err(Error::new("injected failure", kind));
        }
        f(&mut table)
    }
}

impl ConversationService for InMemoryConversations {
    type Error = crate::Error;

    fn create(
        &self,
        name: Option<&str>,
    ) -> impl Future<Output = Result<Conversation, Self::Error>> + Send + 'static
    {
        let name = name.unwrap_or("New conversation").to_owned();
        ready(self.with_table(|table| {
            table.next_id += 1;
            let now = Utc::now();
            let conversation = Conversation {
                id: table.next_id,
                name,
                created_at: now,
                updated_at: now,
                message_count: 0,
            };
            table.details.push(ConversationDetail {
                conversation: conversation.clone(),
                messages: vec![],
            });
            Ok(conversation)
        }))
    }

    fn list(
        &self,
    ) -> impl Future<Output = Result<Vec<Conversation>, Self::Error>>
    + Send
    + 'static {
        ready(self.with_table(|table| {
            Ok(table
                .details
                .iter()
                .rev()
                .map(|d| d.conversation.clone())
                .collect())
        }))
    }

    fn get(
        &self,
        id: ConversationId,
    ) -> impl Future<Output = Result<ConversationDetail, Self::Error>>
    + Send
    + 'static {
        ready(self.with_table(|table| {
            table
                .details
                .iter()
                .find(|d| d.conversation.id == id)
                .cloned()
                .ok_or(Error::new("not found", ErrorKind::Status(404)))
        }))
    }

    fn delete(
        &self,
        id: ConversationId,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        ready(self.with_table(|table| {
            let before = table.details.len();
            table.details.retain(|d| d.conversation.id != id);
            if table.details.len() == before {
                return Err(Error::new("not found", ErrorKind::Status(404)));
            }
            Ok(())
        }))
    }
}
