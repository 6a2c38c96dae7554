//! Turn-taking gate.
//!
//! Tracks whose turn it is so the controller never listens while the prospect is
//! speaking and never speaks over a user result that is still being processed.

use crate::error::{VoiceError, VoiceResult};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Idle,
    /// Prospect audio in flight; the generation identifies the utterance.
    Speaking(u64),
    Listening,
    /// User result received, reply not yet started.
    Processing,
}

#[derive(Debug)]
pub struct TurnGate {
    state: GateState,
    generation: u64,
}

impl Default for TurnGate {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Idle,
            generation: 0,
        }
    }

    /// Start a prospect utterance. Refused while a user result is pending.
    pub fn begin_speaking(&mut self) -> VoiceResult<u64> {
        if self.state == GateState::Processing {
            return Err(VoiceError::TurnConflict(
                "cannot speak over an unprocessed result".to_string(),
            ));
        }
        self.generation += 1;
        self.state = GateState::Speaking(self.generation);
        Ok(self.generation)
    }

    /// True when `generation` is the live utterance; the gate returns to idle.
    pub fn finish_speaking(&mut self, generation: u64) -> bool {
        if self.state == GateState::Speaking(generation) {
            self.state = GateState::Idle;
            true
        } else {
            debug!(generation, state = self.state(), "stale playback completion");
            false
        }
    }

    pub fn start_listening(&mut self) -> VoiceResult<()> {
        match self.state {
            GateState::Idle | GateState::Listening => {
                self.state = GateState::Listening;
                Ok(())
            }
            _ => Err(VoiceError::TurnConflict(format!(
                "cannot listen while {}",
                self.state()
            ))),
        }
    }

    pub fn stop_listening(&mut self) {
        if self.state == GateState::Listening {
            self.state = GateState::Idle;
        }
    }

    pub fn begin_processing(&mut self) -> VoiceResult<()> {
        match self.state {
            GateState::Idle | GateState::Listening => {
                self.state = GateState::Processing;
                Ok(())
            }
            _ => Err(VoiceError::TurnConflict(format!(
                "user turn arrived while {}",
                self.state()
            ))),
        }
    }

    pub fn finish_processing(&mut self) {
        if self.state == GateState::Processing {
            self.state = GateState::Idle;
        }
    }

    pub fn reset(&mut self) {
        self.state = GateState::Idle;
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self.state, GateState::Speaking(_))
    }

    pub fn is_listening(&self) -> bool {
        self.state == GateState::Listening
    }

    /// Get the current state (for logging/testing)
    pub fn state(&self) -> &'static str {
        match self.state {
            GateState::Idle => "idle",
            GateState::Speaking(_) => "speaking",
            GateState::Listening => "listening",
            GateState::Processing => "processing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_listens_while_speaking() {
        let mut gate = TurnGate::new();
        let generation = gate.begin_speaking().unwrap();
        assert!(gate.start_listening().is_err());
        assert_eq!(gate.state(), "speaking");

        assert!(gate.finish_speaking(generation));
        gate.start_listening().unwrap();
        assert!(gate.is_listening());
    }

    #[test]
    fn pending_result_blocks_speech() {
        let mut gate = TurnGate::new();
        gate.start_listening().unwrap();
        gate.begin_processing().unwrap();
        assert_eq!(gate.state(), "processing");
        assert!(gate.begin_speaking().is_err());

        gate.finish_processing();
        assert!(gate.begin_speaking().is_ok());
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut gate = TurnGate::new();
        let first = gate.begin_speaking().unwrap();
        let second = gate.begin_speaking().unwrap();
        assert!(!gate.finish_speaking(first));
        assert!(gate.is_speaking());
        assert!(gate.finish_speaking(second));
    }
}
