use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use planbook_model::{
    RecognitionOptions, SpeechEvent, SpeechProvider, SpeechSession,
    SpeechSink, SpeechStartError,
};

use crate::lock;

#[derive(Default)]
struct SpeechLog {
    sinks: Vec<SpeechSink>,
    options: Option<RecognitionOptions>,
    start_results: VecDeque<Result<(), SpeechStartError>>,
    starts: usize,
    stops: usize,
}

/// A speech provider driven by the test.
///
/// Sessions never produce events on their own; call [`ScriptedSpeech::emit`]
/// to play the provider's part.
#[derive(Clone, Default)]
pub struct ScriptedSpeech {
    log: Arc<Mutex<SpeechLog>>,
}

impl ScriptedSpeech {
    /// Queues the result of the next `start` call. Unqueued starts succeed.
    #[inline]
    pub fn push_start_result(&self, result: Result<(), SpeechStartError>) {
        lock(&self.log).start_results.push_back(result);
    }

    /// Delivers an event through the most recently created session.
    #[inline]
    pub fn emit(&self, event: SpeechEvent) {
        let sink = lock(&self.log).sinks.last().cloned();
        if let Some(sink) = sink {
            sink.emit(event);
        }
    }

    /// Delivers an event through the `index`-th created session.
    #[inline]
    pub fn emit_from(&self, index: usize, event: SpeechEvent) {
        let sink = lock(&self.log).sinks.get(index).cloned();
        if let Some(sink) = sink {
            sink.emit(event);
        }
    }

    #[inline]
    pub fn sessions(&self) -> usize {
        lock(&self.log).sinks.len()
    }

    #[inline]
    pub fn starts(&self) -> usize {
        lock(&self.log).starts
    }

    #[inline]
    pub fn stops(&self) -> usize {
        lock(&self.log).stops
    }

    /// Returns the options of the most recently created session.
    #[inline]
    pub fn options(&self) -> Option<RecognitionOptions> {
        lock(&self.log).options.clone()
    }
}

impl SpeechProvider for ScriptedSpeech {
    type Session = ScriptedSpeechSession;

    fn create_session(
        &self,
        options: &RecognitionOptions,
        sink: SpeechSink,
    ) -> Result<Self::Session, SpeechStartError> {
        let mut log = lock(&self.log);
        log.sinks.push(sink);
        log.options = Some(options.clone());
        Ok(ScriptedSpeechSession {
            log: Arc::clone(&self.log),
        })
    }
}

pub struct ScriptedSpeechSession {
    log: Arc<Mutex<SpeechLog>>,
}

impl SpeechSession for ScriptedSpeechSession {
    fn start(&mut self) -> Result<(), SpeechStartError> {
        let mut log = lock(&self.log);
        log.starts += 1;
        log.start_results.pop_front().unwrap_or(Ok(()))
    }

    fn stop(&mut self) {
        lock(&self.log).stops += 1;
    }
}
