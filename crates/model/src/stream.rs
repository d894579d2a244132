use std::pin::Pin;
use std::task::{self, Poll};

use bytes::Bytes;

use crate::conversation::ConversationId;
use crate::error::ServiceError;

/// The raw body of a streamed exchange.
pub trait ByteStream: Send + 'static {
    /// The error type that may be returned while reading the body.
    type Error: ServiceError;

    /// Attempts to pull out the next chunk of the body.
    ///
    /// # Return value
    ///
    /// - `Poll::Pending` means that the next chunk has not arrived yet.
    ///   Implementations will ensure that the current task will be
    ///   notified when it may be ready.
    /// - `Poll::Ready(Ok(Some(chunk)))` delivers a chunk. Chunks carry no
    ///   alignment guarantee: they may split lines and even multi-byte
    ///   characters.
    /// - `Poll::Ready(Ok(None))` means the body has ended.
    /// - `Poll::Ready(Err(error))` means the connection failed.
    ///
    /// Calling this method after the end should always return `None`.
    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<Bytes>, Self::Error>>;
}

/// A type that opens streamed exchanges with the assistant backend.
///
/// Once the transport is created, it should behave like a stateless
/// object. The returned futures must not borrow from the transport.
pub trait ChatTransport: Send + Sync {
    /// The error type that may be returned by the transport.
    type Error: ServiceError;

    /// The body type of an established exchange.
    type Body: ByteStream<Error = Self::Error>;

    /// Posts `content` to the conversation and returns the streamed body.
    ///
    /// Failures to establish the exchange (unreachable server, non-success
    /// status) are reported through the returned `Result`, not the body.
    fn open_exchange(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> impl Future<Output = Result<Self::Body, Self::Error>> + Send + 'static;
}
