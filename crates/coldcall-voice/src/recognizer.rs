//! Speech recognition seam.
//!
//! A recognizer is started with a [`RecognizerSink`] and pushes results, errors
//! and session-end notifications into the controller's event channel.

use crate::error::{VoiceError, VoiceResult};
use crate::events::{CallEvent, RecognitionErrorCode, RecognizerEvent};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RecognizerSink {
    events: mpsc::UnboundedSender<CallEvent>,
}

impl RecognizerSink {
    pub fn new(events: mpsc::UnboundedSender<CallEvent>) -> Self {
        Self { events }
    }

    pub fn result(&self, text: &str, confidence: f32, is_final: bool) -> VoiceResult<()> {
        self.emit(RecognizerEvent::Result {
            text: text.to_string(),
            confidence,
            is_final,
        })
    }

    pub fn error(&self, code: RecognitionErrorCode) -> VoiceResult<()> {
        self.emit(RecognizerEvent::Error(code))
    }

    pub fn ended(&self) -> VoiceResult<()> {
        self.emit(RecognizerEvent::Ended)
    }

    fn emit(&self, event: RecognizerEvent) -> VoiceResult<()> {
        self.events
            .send(CallEvent::Recognizer(event))
            .map_err(|e| VoiceError::ChannelSend(e.to_string()))
    }
}

pub trait SpeechRecognizer: Send {
    fn start(&mut self, sink: RecognizerSink) -> VoiceResult<()>;
    fn stop(&mut self) -> VoiceResult<()>;
    fn is_active(&self) -> bool;
}

type SharedSink = Arc<Mutex<Option<RecognizerSink>>>;

/// Recognizer fed from outside the controller (terminal input, tests).
///
/// Input pushed through the [`RecognizerHandle`] is only delivered while the
/// controller is listening.
#[derive(Debug, Default)]
pub struct ChannelRecognizer {
    sink: SharedSink,
}

/// Feeding side of a [`ChannelRecognizer`].
#[derive(Debug, Clone)]
pub struct RecognizerHandle {
    sink: SharedSink,
}

impl ChannelRecognizer {
    pub fn new() -> (Self, RecognizerHandle) {
        let sink = SharedSink::default();
        (
            Self { sink: sink.clone() },
            RecognizerHandle { sink },
        )
    }
}

impl SpeechRecognizer for ChannelRecognizer {
    fn start(&mut self, sink: RecognizerSink) -> VoiceResult<()> {
        let mut guard = self
            .sink
            .lock()
            .map_err(|e| VoiceError::Recognizer(e.to_string()))?;
        *guard = Some(sink);
        debug!("channel recognizer started");
        Ok(())
    }

    fn stop(&mut self) -> VoiceResult<()> {
        let mut guard = self
            .sink
            .lock()
            .map_err(|e| VoiceError::Recognizer(e.to_string()))?;
        guard.take();
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.sink.lock().map(|g| g.is_some()).unwrap_or(false)
    }
}

impl RecognizerHandle {
    pub fn is_listening(&self) -> bool {
        self.sink.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Deliver a final transcript. False when the recognizer is not listening.
    pub fn say(&self, text: &str, confidence: f32) -> bool {
        self.with_sink(|sink| sink.result(text, confidence, true))
    }

    pub fn fail(&self, code: RecognitionErrorCode) -> bool {
        self.with_sink(|sink| sink.error(code))
    }

    pub fn end_session(&self) -> bool {
        self.with_sink(|sink| sink.ended())
    }

    fn with_sink(&self, f: impl FnOnce(&RecognizerSink) -> VoiceResult<()>) -> bool {
        let Ok(guard) = self.sink.lock() else {
            return false;
        };
        match guard.as_ref() {
            Some(sink) => f(sink).is_ok(),
            None => false,
        }
    }
}
