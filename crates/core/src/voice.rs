
use planbook_model::{
    RecognitionOptions, SpeechErrorCode, SpeechEvent, SpeechProvider,
    SpeechResult, SpeechSession, SpeechSink, SpeechStartError,
};
use tokio::sync::mpsc;

use crate::input::InputBuffer;

/// Configuration of a [`VoiceCapture`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceConfig {
    /// Options of every recognition session.
    pub options: RecognitionOptions,
    /// How many times in a row an ended session is restarted before capture
    /// gives up. Arriving results reset the count, and a session that ended
    /// after detecting no speech is not counted.
    pub max_restarts: u32,
}

impl VoiceConfig {
    /// Sets the recognition language.
    #[inline]
    pub fn with_language<S: Into<String>>(mut self, language: S) -> Self {
        self.options.language = Some(language.into());
        self
    }

    /// Sets the restart budget.
    #[inline]
    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts;
        self
    }
}

impl Default for VoiceConfig {
    #[inline]
    fn default() -> Self {
        Self {
            options: RecognitionOptions {
                continuous: true,
                interim_results: true,
                language: None,
            },
            max_restarts: 5,
        }
    }
}

/// The state of a [`VoiceCapture`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoiceState {
    /// Not capturing.
    Idle,
    /// A recognition session writes the input buffer.
    Capturing,
    /// Capture stopped on its own. The buffer keeps what was recognized.
    Failed,
}

/// An event of a recognition session, tagged with the session it came
/// from.
#[derive(Clone, Debug)]
pub struct VoiceSignal {
    generation: u64,
    event: SpeechEvent,
}

impl VoiceSignal {
    /// Returns the carried event.
    #[inline]
    pub fn event(&self) -> &SpeechEvent {
        &self.event
    }
}

/// The receiving end of the provider events, drained by the host and fed
/// back through [`VoiceCapture::handle_signal`].
#[derive(Debug)]
pub struct VoiceSignals {
    rx: mpsc::UnboundedReceiver<VoiceSignal>,
}

impl VoiceSignals {
    /// Waits for the next signal.
    #[inline]
    pub async fn recv(&mut self) -> Option<VoiceSignal> {
        self.rx.recv().await
    }

    /// Returns a signal if one is already queued.
    #[inline]
    pub fn try_recv(&mut self) -> Option<VoiceSignal> {
        self.rx.try_recv().ok()
    }
}

#[derive(Debug, Default)]
struct Transcript {
    pre_capture: String,
    // Text of the sessions before the last restart.
    committed: String,
    final_text: String,
    interim: String,
}

impl Transcript {
    fn update(&mut self, results: &[SpeechResult]) {
        self.final_text.clear();
        self.interim.clear();
        for result in results {
            if result.is_final {
                self.final_text.push_str(&result.transcript);
            } else {
                self.interim.push_str(&result.transcript);
            }
        }
    }

    /// Keeps the text of an ended session. Its interim text is never
    /// finalized, so it is kept as spoken.
    fn commit(&mut self) {
        self.committed = join_spaced(&self.committed, &self.current());
        self.final_text.clear();
        self.interim.clear();
    }

    fn current(&self) -> String {
        format!("{}{}", self.final_text, self.interim)
    }

    fn merged(&self) -> String {
        let spoken = join_spaced(&self.committed, &self.current());
        if self.pre_capture.is_empty() {
            spoken
        } else {
            format!("{} {spoken}", self.pre_capture)
        }
    }
}

fn join_spaced(head: &str, tail: &str) -> String {
    let needs_space = !head.is_empty()
        && !tail.is_empty()
        && !head.ends_with(char::is_whitespace)
        && !tail.starts_with(char::is_whitespace);
    if needs_space {
        format!("{head} {tail}")
    } else {
        format!("{head}{tail}")
    }
}

/// Continuous speech capture into an [`InputBuffer`].
///
/// Providers end sessions on their own after a pause. While capturing, such
/// an end restarts the same session, so the user sees one uninterrupted
/// capture until they confirm or cancel.
pub struct VoiceCapture<P: SpeechProvider> {
    provider: P,
    config: VoiceConfig,
    tx: mpsc::UnboundedSender<VoiceSignal>,
    state: VoiceState,
    session: Option<P::Session>,
    generation: u64,
    transcript: Transcript,
    restarts: u32,
    // The current session reported no speech since it last started.
    silent: bool,
}

impl<P: SpeechProvider> VoiceCapture<P> {
    /// Creates an idle controller and the channel its sessions report to.
    pub fn new(provider: P, config: VoiceConfig) -> (Self, VoiceSignals) {
        let (tx, rx) = mpsc::unbounded_channel();
        let capture = Self {
            provider,
            config,
            tx,
            state: VoiceState::Idle,
            session: None,
            generation: 0,
            transcript: Transcript::default(),
            restarts: 0,
            silent: false,
        };
        (capture, VoiceSignals { rx })
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Starts capturing into `input`.
    ///
    /// The current text is kept as a prefix of the transcript and restored
    /// by [`VoiceCapture::cancel`].
    pub fn start(
        &mut self,
        input: &mut InputBuffer,
    ) -> Result<(), SpeechStartError> {
        if self.state == VoiceState::Capturing {
            return Err(SpeechStartError::AlreadyStarted);
        }

        self.generation += 1;
        let sink = self.sink(self.generation);
        let started = self
            .provider
            .create_session(&self.config.options, sink)
            .and_then(|mut session| session.start().map(|()| session));
        let session = match started {
            Ok(session) => session,
            Err(err) => {
                warn!("failed to start recognition: {err}");
                self.state = VoiceState::Idle;
                return Err(err);
            }
        };

        debug!("voice capture started");
        self.session = Some(session);
        self.transcript = Transcript {
            pre_capture: input.text().to_owned(),
            ..Default::default()
        };
        self.restarts = 0;
        self.silent = false;
        self.state = VoiceState::Capturing;
        input.set_read_only(true);
        Ok(())
    }

    /// Applies a provider event. Events of sessions that are no longer
    /// current are dropped.
    pub fn handle_signal(
        &mut self,
        signal: VoiceSignal,
        input: &mut InputBuffer,
    ) {
        if signal.generation != self.generation
            || self.state != VoiceState::Capturing
        {
            trace!("dropped stale speech event: {:?}", signal.event);
            return;
        }

        match signal.event {
            SpeechEvent::Results(results) => {
                self.restarts = 0;
                self.silent = false;
                self.transcript.update(&results);
                input.replace(self.transcript.merged());
            }
            SpeechEvent::Error(SpeechErrorCode::NoSpeech) => {
                trace!("no speech detected");
                self.silent = true;
            }
            SpeechEvent::Error(code) => {
                warn!("speech recognition error: {code}");
                self.silent = false;
            }
            SpeechEvent::End => self.restart(input),
        }
    }

    /// Stops capturing and keeps the transcript in `input`.
    pub fn confirm(&mut self, input: &mut InputBuffer) {
        if self.state != VoiceState::Capturing {
            return;
        }
        self.teardown();
        self.transcript = Transcript::default();
        self.state = VoiceState::Idle;
        input.set_read_only(false);
    }

    /// Stops capturing and restores `input` to what it held before.
    pub fn cancel(&mut self, input: &mut InputBuffer) {
        if self.state != VoiceState::Capturing {
            return;
        }
        self.teardown();
        let transcript = std::mem::take(&mut self.transcript);
        self.state = VoiceState::Idle;
        input.replace(transcript.pre_capture);
        input.set_read_only(false);
    }

    /// Acknowledges a failed capture.
    #[inline]
    pub fn dismiss(&mut self) {
        if self.state == VoiceState::Failed {
            self.state = VoiceState::Idle;
        }
    }

    fn restart(&mut self, input: &mut InputBuffer) {
        if std::mem::take(&mut self.silent) {
            trace!("recognition paused in silence");
        } else if self.restarts >= self.config.max_restarts {
            warn!(
                "recognition ended {} times without results, giving up",
                self.restarts + 1
            );
            self.fail(input);
            return;
        } else {
            self.restarts += 1;
        }
        self.transcript.commit();

        let Some(session) = self.session.as_mut() else {
            error!("capturing without a session");
            self.fail(input);
            return;
        };
        debug!("recognition paused, restarting ({})", self.restarts);
        match session.start() {
            Ok(()) => {}
            Err(SpeechStartError::AlreadyStarted) => {
                trace!("recognition is already running");
            }
            Err(err) => {
                warn!("failed to restart recognition: {err}");
                self.fail(input);
            }
        }
    }

    fn fail(&mut self, input: &mut InputBuffer) {
        self.teardown();
        self.transcript = Transcript::default();
        self.state = VoiceState::Failed;
        input.set_read_only(false);
    }

    /// Detaches the session before stopping it, so its late events are
    /// stale.
    fn teardown(&mut self) {
        self.generation += 1;
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
    }

    fn sink(&self, generation: u64) -> SpeechSink {
        let tx = self.tx.clone();
        SpeechSink::new(move |event| {
            if tx.send(VoiceSignal { generation, event }).is_err() {
                trace!("voice capture has gone, event dropped");
            }
        })
    }
}

impl<P: SpeechProvider> Drop for VoiceCapture<P> {
    fn drop(&mut self) {
        if self.session.is_some() {
            debug!("voice capture dropped while capturing");
            self.teardown();
        }
    }
}
