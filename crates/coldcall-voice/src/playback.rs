//! Audio playback.
//!
//! Players report completion through a [`PlaybackNotifier`], which posts
//! [`CallEvent::PlaybackFinished`] to the controller. Players need not be `Send`:
//! the rodio output stream is tied to the thread that opened it.

use crate::error::VoiceResult;
use crate::events::CallEvent;
use tokio::sync::mpsc;

/// One-shot completion signal for a single utterance.
#[derive(Debug)]
pub struct PlaybackNotifier {
    events: mpsc::UnboundedSender<CallEvent>,
    generation: u64,
}

impl PlaybackNotifier {
    pub fn new(events: mpsc::UnboundedSender<CallEvent>, generation: u64) -> Self {
        Self { events, generation }
    }

    pub fn notify(self) {
        // Receiver gone means the controller is gone.
        let _ = self.events.send(CallEvent::PlaybackFinished {
            generation: self.generation,
        });
    }
}

pub trait AudioPlayer {
    /// Start playing `audio`; `done` fires when playback ends or is stopped.
    fn play(&mut self, audio: Vec<u8>, done: PlaybackNotifier) -> VoiceResult<()>;
    fn stop(&mut self) -> VoiceResult<()>;
    fn is_playing(&self) -> bool;
}

/// Completes every utterance immediately. Used for text-only sessions and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPlayer;

impl AudioPlayer for SilentPlayer {
    fn play(&mut self, _audio: Vec<u8>, done: PlaybackNotifier) -> VoiceResult<()> {
        done.notify();
        Ok(())
    }

    fn stop(&mut self) -> VoiceResult<()> {
        Ok(())
    }

    fn is_playing(&self) -> bool {
        false
    }
}

#[cfg(feature = "playback")]
pub use self::rodio_player::RodioPlayer;

#[cfg(feature = "playback")]
mod rodio_player {
    use super::{AudioPlayer, PlaybackNotifier};
    use crate::error::{VoiceError, VoiceResult};
    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
    use std::io::Cursor;
    use std::sync::Arc;
    use tracing::info;

    /// Plays through the default output device with a `rodio::Sink`.
    pub struct RodioPlayer {
        _stream: OutputStream,
        stream_handle: OutputStreamHandle,
        sink: Arc<Sink>,
    }

    impl RodioPlayer {
        pub fn new() -> VoiceResult<Self> {
            let (stream, stream_handle) =
                OutputStream::try_default().map_err(|e| VoiceError::Playback(e.to_string()))?;
            let sink = Sink::try_new(&stream_handle).map_err(|e| VoiceError::Playback(e.to_string()))?;
            info!("RodioPlayer: sink ready");
            Ok(Self {
                _stream: stream,
                stream_handle,
                sink: Arc::new(sink),
            })
        }
    }

    impl AudioPlayer for RodioPlayer {
        fn play(&mut self, audio: Vec<u8>, done: PlaybackNotifier) -> VoiceResult<()> {
            if audio.is_empty() {
                done.notify();
                return Ok(());
            }
            let source = rodio::Decoder::new(Cursor::new(audio))
                .map_err(|e| VoiceError::Playback(format!("Decode failed: {}", e)))?;
            // A stopped sink stays stopped; start each utterance on a fresh one.
            let sink = Arc::new(
                Sink::try_new(&self.stream_handle).map_err(|e| VoiceError::Playback(e.to_string()))?,
            );
            sink.append(source.convert_samples::<f32>());
            self.sink = sink.clone();
            tokio::task::spawn_blocking(move || {
                sink.sleep_until_end();
                done.notify();
            });
            Ok(())
        }

        fn stop(&mut self) -> VoiceResult<()> {
            self.sink.stop();
            Ok(())
        }

        fn is_playing(&self) -> bool {
            !self.sink.empty()
        }
    }
}
