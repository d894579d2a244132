use std::collections::VecDeque;
use std::fmt::{self, Debug, Display};
use std::future::poll_fn;
use std::mem;
use std::pin::Pin;

use planbook_model::ByteStream;

use super::utf8::Utf8Decoder;

#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    ChunksError(E),
}

impl<E: Display> Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ChunksError(err) => write!(f, "{err}"),
        }
    }
}

/// A named server-sent event with its raw payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SseEvent {
    pub name: String,
    pub data: String,
}

/// The push side of the event-stream parser.
///
/// Chunks may split lines and characters anywhere. Only complete lines are
/// interpreted, the trailing fragment waits for the next chunk.
#[derive(Debug, Default)]
pub struct SseParser {
    decoder: Utf8Decoder,
    buf: String,
    event_name: String,
    event_data: String,
    ready: VecDeque<SseEvent>,
}

impl SseParser {
    pub fn feed(&mut self, bytes: &[u8]) {
        let text = self.decoder.decode(bytes);
        self.buf.push_str(&text);

        let Some(last_eol) = self.buf.rfind('\n') else {
            return;
        };
        let rest = self.buf.split_off(last_eol + 1);
        let complete = mem::replace(&mut self.buf, rest);
        for line in complete[..last_eol].split('\n') {
            self.process_line(line);
        }
    }

    /// Flushes the parser at the end of the stream.
    ///
    /// Some servers omit the blank line after the last frame, so a pending
    /// event with both fields set is emitted here.
    pub fn finish(&mut self) {
        if let Some(c) = self.decoder.finish() {
            self.buf.push(c);
        }
        let rest = mem::take(&mut self.buf);
        if !rest.is_empty() {
            self.process_line(&rest);
        }
        self.emit_pending();
    }

    #[inline]
    pub fn pop(&mut self) -> Option<SseEvent> {
        self.ready.pop_front()
    }

    fn process_line(&mut self, line: &str) {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            self.emit_pending();
        } else if let Some(value) = line.strip_prefix("event:") {
            self.event_name = value.trim().to_owned();
        } else if let Some(value) = line.strip_prefix("data:") {
            self.event_data = value.trim().to_owned();
        } else {
            // Comments, `id:` and `retry:` fields.
            trace!("skipped line: {line:?}");
        }
    }

    fn emit_pending(&mut self) {
        let name = mem::take(&mut self.event_name);
        let data = mem::take(&mut self.event_data);
        // An empty `data:` line is a keep-alive, not an event.
        if name.is_empty() || data.is_empty() {
            return;
        }
        self.ready.push_back(SseEvent { name, data });
    }
}

/// A type for reading server-sent events from a byte stream.
pub struct Sse<S> {
    body: Pin<Box<S>>,
    parser: SseParser,
    finished: bool,
}

impl<S: ByteStream> Sse<S> {
    #[inline]
    pub fn new(body: S) -> Self {
        Self {
            body: Box::pin(body),
            parser: SseParser::default(),
            finished: false,
        }
    }

    pub async fn next_event(
        &mut self,
    ) -> Result<Option<SseEvent>, Error<S::Error>> {
        loop {
            if let Some(event) = self.parser.pop() {
                return Ok(Some(event));
            }
            if self.finished {
                return Ok(None);
            }

            let chunk =
                poll_fn(|cx| self.body.as_mut().poll_next_chunk(cx)).await;
            match chunk {
                Ok(Some(bytes)) => self.parser.feed(&bytes),
                Ok(None) => {
                    self.finished = true;
                    self.parser.finish();
                }
                Err(err) => {
                    self.finished = true;
                    return Err(Error::ChunksError(err));
                }
            }
        }
    }
}

impl<S> Debug for Sse<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sse")
            .field("parser", &self.parser)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
