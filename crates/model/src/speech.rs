use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

/// Options for a recognition session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecognitionOptions {
    /// Keep listening across pauses instead of stopping after the first
    /// utterance.
    pub continuous: bool,
    /// Deliver unstable results before they are finalized.
    pub interim_results: bool,
    /// BCP 47 language tag, or `None` for the provider default.
    pub language: Option<String>,
}

impl Default for RecognitionOptions {
    #[inline]
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
            language: None,
        }
    }
}

/// One recognized segment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpeechResult {
    /// The recognized text.
    pub transcript: String,
    /// Whether the provider will no longer revise this segment.
    pub is_final: bool,
}

impl SpeechResult {
    /// Creates a finalized segment.
    #[inline]
    pub fn final_text<S: Into<String>>(transcript: S) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }

    /// Creates an interim segment.
    #[inline]
    pub fn interim<S: Into<String>>(transcript: S) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }
}

/// Error codes reported by a running recognition session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpeechErrorCode {
    /// Nothing was said for a while. The session ends after this.
    NoSpeech,
    /// The session was aborted.
    Aborted,
    /// The audio input could not be captured.
    AudioCapture,
    /// The user or the platform denied microphone access.
    NotAllowed,
    /// Recognition requires the network and it failed.
    Network,
    /// Any other errors.
    Other(String),
}

impl Display for SpeechErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SpeechErrorCode::NoSpeech => write!(f, "no speech detected"),
            SpeechErrorCode::Aborted => write!(f, "aborted"),
            SpeechErrorCode::AudioCapture => write!(f, "audio capture failed"),
            SpeechErrorCode::NotAllowed => write!(f, "not allowed"),
            SpeechErrorCode::Network => write!(f, "network error"),
            SpeechErrorCode::Other(message) => write!(f, "{message}"),
        }
    }
}

/// Events emitted by a recognition session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpeechEvent {
    /// The full list of results of the running session.
    Results(Vec<SpeechResult>),
    /// The session reported an error.
    Error(SpeechErrorCode),
    /// The session has ended, either on request or on its own.
    End,
}

/// Error returned when a session cannot be started.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpeechStartError {
    /// The session is already running or still starting.
    AlreadyStarted,
    /// Recognition is not available.
    Unavailable(String),
}

impl Display for SpeechStartError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SpeechStartError::AlreadyStarted => write!(f, "already started"),
            SpeechStartError::Unavailable(reason) => {
                write!(f, "recognition unavailable: {reason}")
            }
        }
    }
}

impl Error for SpeechStartError {}

/// The receiving end of a recognition session's events.
///
/// Providers may clone the sink and call it from any thread.
#[derive(Clone)]
pub struct SpeechSink(Arc<dyn Fn(SpeechEvent) + Send + Sync>);

impl SpeechSink {
    /// Creates a sink that forwards every event to `f`.
    #[inline]
    pub fn new(f: impl Fn(SpeechEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Delivers an event.
    #[inline]
    pub fn emit(&self, event: SpeechEvent) {
        (self.0)(event)
    }
}

impl Debug for SpeechSink {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechSink").finish_non_exhaustive()
    }
}

/// A speech recognition provider.
pub trait SpeechProvider: Send + Sync {
    /// The session type of this provider.
    type Session: SpeechSession;

    /// Creates a session that reports to `sink`. The session is not
    /// started yet.
    fn create_session(
        &self,
        options: &RecognitionOptions,
        sink: SpeechSink,
    ) -> Result<Self::Session, SpeechStartError>;
}

/// A recognition session.
///
/// A session can be started again after it has ended, and keeps
/// reporting to the same sink.
pub trait SpeechSession: Send {
    /// Starts listening.
    fn start(&mut self) -> Result<(), SpeechStartError>;

    /// Stops listening. The session emits [`SpeechEvent::End`] afterwards,
    /// possibly asynchronously.
    fn stop(&mut self);
}
