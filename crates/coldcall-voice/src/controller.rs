//! Call Controller - the turn-taking orchestrator
//!
//! Owns the single active call. Every suspension point (playback completion,
//! recognizer output, timer fires, ring interception, hang up) arrives as a
//! [`CallEvent`] on one channel and is handled to completion before the next.
//!
//! ```text
//! Idle → Dialing → Ringing → Connected → Conversing → Ended
//!                    ↑  │ no answer (once)
//!                    └──┘
//! ```

use crate::dialogue::DialogueService;
use crate::error::{VoiceError, VoiceResult};
use crate::events::{CallEvent, CallPhase, CallUpdate, RecognizerEvent};
use crate::playback::{AudioPlayer, PlaybackNotifier};
use crate::recognizer::{RecognizerSink, SpeechRecognizer};
use crate::timers::{TimerKind, TimerSet};
use crate::tts::SpeechSynthesizer;
use crate::turn::TurnGate;
use coldcall_core::{
    build_messages, find_module, split_feedback, AccessControl, CallMode, CallSession, CallSummary,
    EndReason, FallbackGenerator, FeedbackKind, ModuleKind, ProgressStore, Progression, Speaker,
    TimingConfig, TrainerConfig, TurnOutcome,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Collaborators injected into the controller.
pub struct CallServices {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Used when the primary synthesizer fails.
    pub on_device_synthesizer: Arc<dyn SpeechSynthesizer>,
    pub player: Box<dyn AudioPlayer>,
    pub recognizer: Box<dyn SpeechRecognizer>,
    pub dialogue: Arc<dyn DialogueService>,
    pub progress: Arc<dyn ProgressStore>,
    pub access: Arc<dyn AccessControl>,
}

/// What happens once the current prospect line finishes playing.
#[derive(Debug, Clone, Copy)]
enum PendingEnd {
    Hangup(EndReason),
    /// Closing line: wait the closing delay, then end as success.
    Closing,
}

struct ActiveCall {
    session: CallSession,
    progression: Progression,
    fallback: FallbackGenerator,
    rng: StdRng,
    no_answer: bool,
    redialed: bool,
    silence_warned: bool,
    pending_end: Option<PendingEnd>,
}

pub struct CallController {
    config: TrainerConfig,
    services: CallServices,
    phase: CallPhase,
    call: Option<ActiveCall>,
    last_summary: Option<CallSummary>,
    timers: TimerSet,
    gate: TurnGate,
    seed: Option<u64>,
    calls_started: u64,
    events_tx: mpsc::UnboundedSender<CallEvent>,
    events_rx: mpsc::UnboundedReceiver<CallEvent>,
    updates_tx: mpsc::UnboundedSender<CallUpdate>,
    updates_rx: Option<mpsc::UnboundedReceiver<CallUpdate>>,
}

fn ring_duration(rng: &mut StdRng, timing: &TimingConfig) -> Duration {
    Duration::from_millis(rng.random_range(timing.ring_min_ms..=timing.ring_max_ms))
}

impl CallController {
    /// Fails when `config` does not pass [`TrainerConfig::validate`].
    pub fn new(config: TrainerConfig, services: CallServices) -> VoiceResult<Self> {
        config.validate()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Ok(Self {
            config,
            services,
            phase: CallPhase::Idle,
            call: None,
            last_summary: None,
            timers: TimerSet::new(events_tx.clone()),
            gate: TurnGate::new(),
            seed: None,
            calls_started: 0,
            events_tx,
            events_rx,
            updates_tx,
            updates_rx: Some(updates_rx),
        })
    }

    /// Deterministic per-call randomness (ring length, hangup, fallback lines).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Take the update receiver (can only be called once)
    pub fn take_update_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<CallUpdate>> {
        self.updates_rx.take()
    }

    /// Sender for external events (ring interception, hang up button).
    pub fn event_sender(&self) -> mpsc::UnboundedSender<CallEvent> {
        self.events_tx.clone()
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&CallSession> {
        self.call.as_ref().map(|c| &c.session)
    }

    pub fn last_summary(&self) -> Option<&CallSummary> {
        self.last_summary.as_ref()
    }

    pub fn is_speaking(&self) -> bool {
        self.gate.is_speaking()
    }

    pub fn is_listening(&self) -> bool {
        self.gate.is_listening()
    }

    pub fn is_timer_armed(&self, kind: TimerKind) -> bool {
        self.timers.is_armed(kind)
    }

    pub fn armed_timers(&self) -> usize {
        self.timers.armed_count()
    }

    /// Current rapid-fire question, if any.
    pub fn current_prompt(&self) -> Option<&'static str> {
        self.call
            .as_ref()
            .and_then(|c| c.progression.current_prompt(&c.session))
    }

    pub fn start_call(&mut self, user_id: &str, module_id: &str, mode: CallMode) -> VoiceResult<Uuid> {
        if self.call.is_some() {
            return Err(VoiceError::CallActive);
        }
        let module = find_module(module_id).ok_or_else(|| VoiceError::UnknownModule(module_id.to_string()))?;
        if !self.services.access.has_access(user_id, module_id) {
            return Err(VoiceError::AccessDenied {
                user_id: user_id.to_string(),
                module_id: module_id.to_string(),
            });
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.calls_started)),
            None => StdRng::from_os_rng(),
        };
        self.calls_started += 1;

        let session_cfg = &self.config.session;
        let hangup_probability = rng
            .random_range(session_cfg.hangup_probability_min..=session_cfg.hangup_probability_max);
        let hangup_after_opener = rng.random_bool(hangup_probability);
        let no_answer = rng.random_bool(session_cfg.no_answer_probability);
        let max_progress = mode.max_progress(module, session_cfg.marathon_target);

        let progression = Progression::new(module, mode, self.config.rubric.clone(), hangup_after_opener);
        let session = CallSession::new(user_id, module, mode, max_progress);
        let call_id = session.call_id;
        let ring = ring_duration(&mut rng, &self.config.timing);
        let fallback = FallbackGenerator::new(StdRng::seed_from_u64(rng.random()));

        info!(
            %call_id,
            user_id,
            module = module.id,
            mode = mode.as_str(),
            hangup_after_opener = progression.hangs_up_after_opener(),
            no_answer,
            "call started"
        );

        self.call = Some(ActiveCall {
            session,
            progression,
            fallback,
            rng,
            no_answer,
            redialed: false,
            silence_warned: false,
            pending_end: None,
        });
        self.last_summary = None;
        self.gate.reset();
        self.set_phase(CallPhase::Dialing);
        self.set_phase(CallPhase::Ringing);
        self.timers.arm(TimerKind::Ring, ring);
        Ok(call_id)
    }

    /// Pick up: manual interception of the ring, or the ring timer expiring.
    pub async fn answer(&mut self) -> VoiceResult<()> {
        if !matches!(self.phase, CallPhase::Dialing | CallPhase::Ringing) {
            return Err(VoiceError::InvalidPhase(format!(
                "cannot answer while {}",
                self.phase.as_str()
            )));
        }
        let greeting = {
            let call = self.call.as_mut().ok_or(VoiceError::NoActiveCall)?;
            let module = call.progression.module();
            match module.kind {
                ModuleKind::Scripted => call.fallback.pickup_line().to_string(),
                ModuleKind::RapidFire => {
                    let pickup = call.fallback.pickup_line();
                    match call.progression.current_prompt(&call.session) {
                        Some(prompt) => format!("{} {}", pickup, prompt),
                        None => pickup.to_string(),
                    }
                }
                ModuleKind::Repetition => call
                    .fallback
                    .opening_line(call.session.stage(), module.id)
                    .to_string(),
            }
        };
        self.timers.cancel(TimerKind::Ring);
        self.set_phase(CallPhase::Connected);
        self.set_phase(CallPhase::Conversing);
        self.speak(&greeting).await
    }

    /// Speak a prospect line. Refused while a user result is still being processed.
    pub async fn deliver_ai_turn(&mut self, text: &str) -> VoiceResult<()> {
        if self.call.is_none() {
            return Err(VoiceError::NoActiveCall);
        }
        if !matches!(self.phase, CallPhase::Connected | CallPhase::Conversing) {
            return Err(VoiceError::InvalidPhase(format!(
                "cannot speak while {}",
                self.phase.as_str()
            )));
        }
        self.speak(text).await
    }

    /// Open the microphone. Runs automatically after playback when listening is continuous.
    pub fn start_listening(&mut self) -> VoiceResult<()> {
        let (kind, warned) = {
            let call = self.call.as_ref().ok_or(VoiceError::NoActiveCall)?;
            (call.progression.kind(), call.silence_warned)
        };
        if self.phase != CallPhase::Conversing {
            return Err(VoiceError::InvalidPhase(format!(
                "cannot listen while {}",
                self.phase.as_str()
            )));
        }
        self.gate.start_listening()?;

        let sink = RecognizerSink::new(self.events_tx.clone());
        if let Err(e) = self.services.recognizer.start(sink) {
            warn!(error = %e, "recognizer failed to start");
            self.gate.stop_listening();
            self.schedule_recognizer_retry();
            return Ok(());
        }
        self.emit(CallUpdate::Listening(true));

        let timing = &self.config.timing;
        match kind {
            ModuleKind::RapidFire => {
                if !self.timers.is_armed(TimerKind::Response) {
                    self.timers.arm(TimerKind::Response, timing.response_timeout());
                }
            }
            ModuleKind::Scripted | ModuleKind::Repetition => {
                if !self.timers.is_armed(TimerKind::Silence) {
                    let after = if warned {
                        timing.silence_grace()
                    } else {
                        timing.silence_warning()
                    };
                    self.timers.arm(TimerKind::Silence, after);
                }
            }
        }
        Ok(())
    }

    /// Evaluate one user utterance and respond.
    pub async fn receive_user_turn(&mut self, text: &str, confidence: f32) -> VoiceResult<()> {
        if self.call.is_none() {
            return Err(VoiceError::NoActiveCall);
        }
        if self.phase != CallPhase::Conversing {
            return Err(VoiceError::InvalidPhase(format!(
                "user turn while {}",
                self.phase.as_str()
            )));
        }
        let text = text.trim();
        if text.is_empty() {
            debug!("empty transcript ignored");
            return Ok(());
        }

        self.gate.begin_processing()?;
        self.timers.cancel(TimerKind::Response);
        self.timers.cancel(TimerKind::Silence);
        if let Err(e) = self.services.recognizer.stop() {
            warn!(error = %e, "failed to stop recognizer");
        }
        self.emit(CallUpdate::Listening(false));
        self.emit(CallUpdate::UserLine {
            text: text.to_string(),
        });

        let min_confidence = self.config.session.min_confidence;
        let call = self.call.as_mut().ok_or(VoiceError::NoActiveCall)?;
        call.silence_warned = false;
        call.session.push_turn(Speaker::User, text);

        if confidence < min_confidence {
            debug!(confidence, min_confidence, "low-confidence transcript, asking to repeat");
            let line = call.fallback.unclear_line();
            self.gate.finish_processing();
            return self.speak(line).await;
        }

        let stage = call.session.stage();
        let (result, outcome) = call.progression.on_user_turn(&mut call.session, text);
        let (count, max) = (call.session.progress_count, call.session.max_progress);
        info!(
            call_id = %call.session.call_id,
            %stage,
            pass = result.pass,
            fail_reason = result.fail_reason.map(|r| r.code()),
            progress = count,
            max_progress = max,
            "user turn evaluated"
        );

        let closing = match outcome {
            TurnOutcome::Continue { .. } => None,
            TurnOutcome::Rejected { stage, reason } => {
                call.pending_end = Some(PendingEnd::Hangup(EndReason::EvaluationFailed { stage, reason }));
                Some(call.fallback.rejection_line(stage))
            }
            TurnOutcome::ProspectHangup => {
                call.pending_end = Some(PendingEnd::Hangup(EndReason::ProspectHungUp));
                Some(call.fallback.hangup_line())
            }
            TurnOutcome::Completed => {
                call.pending_end = Some(PendingEnd::Closing);
                Some(call.fallback.closing_line())
            }
        };

        self.emit(CallUpdate::Evaluation(result));
        self.emit(CallUpdate::Progress { count, max });

        let line = match (closing, outcome) {
            (Some(line), _) => line.to_string(),
            (None, TurnOutcome::Continue { feedback }) => self.next_prospect_line(feedback).await,
            (None, _) => String::new(),
        };
        self.gate.finish_processing();
        self.speak(&line).await
    }

    /// End the call. Idempotent: later calls return the same summary.
    pub fn end_call(&mut self, reason: EndReason) -> VoiceResult<CallSummary> {
        let Some(mut call) = self.call.take() else {
            return self.last_summary.clone().ok_or(VoiceError::NoActiveCall);
        };

        if self.services.recognizer.is_active() {
            if let Err(e) = self.services.recognizer.stop() {
                warn!(error = %e, "failed to stop recognizer during hangup");
            }
        }
        if self.services.player.is_playing() {
            if let Err(e) = self.services.player.stop() {
                warn!(error = %e, "failed to stop audio during hangup");
            }
        }
        self.timers.cancel_all();
        self.gate.reset();

        call.session.is_active = false;
        let summary = call.session.summary(reason);
        match self.services.progress.load_progress(&summary.user_id) {
            Ok(mut state) => {
                state.record_call(&summary);
                if let Err(e) = self.services.progress.save_progress(&summary.user_id, &state) {
                    warn!(error = %e, "failed to persist progress");
                }
            }
            Err(e) => warn!(error = %e, "failed to load progress"),
        }

        info!(
            call_id = %summary.call_id,
            reason = reason.code(),
            stage = %summary.stage_reached,
            progress = summary.progress_count,
            elapsed_secs = summary.elapsed_secs,
            "call ended"
        );
        self.set_phase(CallPhase::Ended);
        self.emit(CallUpdate::Ended(summary.clone()));
        self.last_summary = Some(summary.clone());
        Ok(summary)
    }

    /// Handle one event. Events without an active call (including after `Ended`) are ignored.
    pub async fn handle_event(&mut self, event: CallEvent) -> VoiceResult<()> {
        if self.call.is_none() {
            debug!(?event, phase = self.phase.as_str(), "event ignored, no active call");
            return Ok(());
        }
        match event {
            CallEvent::Answer => {
                if matches!(self.phase, CallPhase::Dialing | CallPhase::Ringing) {
                    self.answer().await
                } else {
                    Ok(())
                }
            }
            CallEvent::Hangup => self.end_call(EndReason::UserHangup).map(|_| ()),
            CallEvent::PlaybackFinished { generation } => self.on_playback_finished(generation),
            CallEvent::Recognizer(event) => self.on_recognizer_event(event).await,
            CallEvent::TimerFired { kind, generation } => {
                if !self.timers.accept_fire(kind, generation) {
                    debug!(timer = kind.as_str(), generation, "stale timer ignored");
                    return Ok(());
                }
                self.on_timer(kind).await
            }
        }
    }

    /// Wait for the next event without handling it.
    ///
    /// Cancel-safe, so it can race other futures in `select!`. `handle_event`
    /// is not: drive it to completion outside the race.
    pub async fn next_event(&mut self) -> VoiceResult<CallEvent> {
        self.events_rx
            .recv()
            .await
            .ok_or_else(|| VoiceError::ChannelReceive("event channel closed".to_string()))
    }

    /// Wait for and handle the next event.
    pub async fn step(&mut self) -> VoiceResult<()> {
        let event = self.next_event().await?;
        self.handle_event(event).await
    }

    /// Drive the active call until it ends.
    pub async fn run(&mut self) -> VoiceResult<CallSummary> {
        while self.call.is_some() {
            match self.step().await {
                Ok(()) => {}
                Err(e @ VoiceError::ChannelReceive(_)) => return Err(e),
                Err(e) => warn!(error = %e, "event handling failed"),
            }
        }
        self.last_summary.clone().ok_or(VoiceError::NoActiveCall)
    }

    async fn speak(&mut self, text: &str) -> VoiceResult<()> {
        let was_listening = self.gate.is_listening();
        let generation = self.gate.begin_speaking()?;
        if let Err(e) = self.services.recognizer.stop() {
            warn!(error = %e, "failed to stop recognizer before speaking");
        }
        self.timers.cancel(TimerKind::Settle);
        self.timers.cancel(TimerKind::Response);
        self.timers.cancel(TimerKind::RecognizerRetry);
        if was_listening {
            self.emit(CallUpdate::Listening(false));
        }

        let stage = {
            let call = self.call.as_mut().ok_or(VoiceError::NoActiveCall)?;
            call.session.push_turn(Speaker::Ai, text);
            call.session.stage()
        };
        self.emit(CallUpdate::AiLine {
            text: text.to_string(),
            stage,
        });

        let voice = self.config.tts.voice.clone();
        let audio = match self.services.synthesizer.synthesize(text, &voice).await {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!(error = %e, "primary synthesizer failed, using on-device voice");
                match self.services.on_device_synthesizer.synthesize(text, &voice).await {
                    Ok(audio) => Some(audio),
                    Err(e) => {
                        warn!(error = %e, "on-device synthesizer failed");
                        None
                    }
                }
            }
        };

        let played = match audio {
            Some(audio) => {
                let done = PlaybackNotifier::new(self.events_tx.clone(), generation);
                match self.services.player.play(audio, done) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "playback failed");
                        false
                    }
                }
            }
            None => false,
        };
        if !played {
            self.emit(CallUpdate::Status("Audio unavailable, showing text only".to_string()));
            PlaybackNotifier::new(self.events_tx.clone(), generation).notify();
        }
        Ok(())
    }

    fn on_playback_finished(&mut self, generation: u64) -> VoiceResult<()> {
        if !self.gate.finish_speaking(generation) {
            return Ok(());
        }
        let pending = self.call.as_mut().and_then(|c| c.pending_end.take());
        match pending {
            Some(PendingEnd::Hangup(reason)) => {
                self.end_call(reason)?;
            }
            Some(PendingEnd::Closing) => {
                self.timers.arm(TimerKind::Closing, self.config.timing.closing_delay());
            }
            None if self.config.session.continuous_listening => {
                self.timers.arm(TimerKind::Settle, self.config.timing.settle());
            }
            None => {}
        }
        Ok(())
    }

    async fn on_recognizer_event(&mut self, event: RecognizerEvent) -> VoiceResult<()> {
        match event {
            RecognizerEvent::Result {
                text,
                confidence,
                is_final,
            } => {
                if !is_final {
                    return Ok(());
                }
                if !self.gate.is_listening() {
                    debug!(state = self.gate.state(), "transcript outside listening window dropped");
                    return Ok(());
                }
                self.receive_user_turn(&text, confidence).await
            }
            RecognizerEvent::Error(code) => {
                warn!(code = code.as_str(), "recognition error");
                if self.gate.is_listening() {
                    if let Err(e) = self.services.recognizer.stop() {
                        warn!(error = %e, "failed to stop recognizer after error");
                    }
                    self.gate.stop_listening();
                    self.emit(CallUpdate::Listening(false));
                    self.schedule_recognizer_retry();
                }
                Ok(())
            }
            RecognizerEvent::Ended => {
                if self.gate.is_listening() {
                    debug!("recognition session ended, restarting");
                    self.gate.stop_listening();
                    self.timers
                        .arm(TimerKind::RecognizerRetry, self.config.timing.recognizer_retry());
                }
                Ok(())
            }
        }
    }

    async fn on_timer(&mut self, kind: TimerKind) -> VoiceResult<()> {
        debug!(timer = kind.as_str(), "timer fired");
        match kind {
            TimerKind::Ring => self.on_ring_timeout().await,
            TimerKind::Silence => self.on_silence_timeout().await,
            TimerKind::Response => self.on_response_timeout().await,
            TimerKind::Settle | TimerKind::RecognizerRetry => self.start_listening(),
            TimerKind::Closing => self.end_call(EndReason::Success).map(|_| ()),
        }
    }

    async fn on_ring_timeout(&mut self) -> VoiceResult<()> {
        let redial = {
            let call = self.call.as_mut().ok_or(VoiceError::NoActiveCall)?;
            if call.no_answer && !call.redialed {
                call.redialed = true;
                Some(ring_duration(&mut call.rng, &self.config.timing))
            } else {
                None
            }
        };
        match redial {
            Some(ring) => {
                info!("no answer, redialing once");
                self.emit(CallUpdate::Status("No answer. Redialing...".to_string()));
                self.set_phase(CallPhase::Dialing);
                self.set_phase(CallPhase::Ringing);
                self.timers.arm(TimerKind::Ring, ring);
                Ok(())
            }
            None => self.answer().await,
        }
    }

    async fn on_silence_timeout(&mut self) -> VoiceResult<()> {
        let line = {
            let call = self.call.as_mut().ok_or(VoiceError::NoActiveCall)?;
            if call.silence_warned {
                None
            } else {
                call.silence_warned = true;
                Some(call.fallback.impatience_line())
            }
        };
        match line {
            // The grace tier is armed by `start_listening` once the warning has played.
            Some(line) => {
                debug!("silence warning");
                self.speak(line).await
            }
            None => self.end_call(EndReason::SilenceTimeout).map(|_| ()),
        }
    }

    async fn on_response_timeout(&mut self) -> VoiceResult<()> {
        if let Err(e) = self.services.recognizer.stop() {
            warn!(error = %e, "failed to stop recognizer after response timeout");
        }
        self.gate.stop_listening();

        let call = self.call.as_mut().ok_or(VoiceError::NoActiveCall)?;
        let outcome = call.progression.on_response_timeout(&mut call.session);
        let (count, max) = (call.session.progress_count, call.session.max_progress);
        let line = match outcome {
            TurnOutcome::Completed => {
                call.pending_end = Some(PendingEnd::Closing);
                call.fallback.closing_line()
            }
            _ => call
                .progression
                .current_prompt(&call.session)
                .unwrap_or_else(|| call.fallback.retry_line()),
        };

        self.emit(CallUpdate::Listening(false));
        self.emit(CallUpdate::Status("Time's up. Next question.".to_string()));
        self.emit(CallUpdate::Progress { count, max });
        self.speak(line).await
    }

    /// Prospect reply for a turn that keeps the call going.
    async fn next_prospect_line(&mut self, feedback: FeedbackKind) -> String {
        let Some(call) = self.call.as_mut() else {
            return String::new();
        };
        let module = call.progression.module();
        let stage = call.session.stage();
        match module.kind {
            ModuleKind::RapidFire => {
                return call
                    .progression
                    .current_prompt(&call.session)
                    .unwrap_or_default()
                    .to_string();
            }
            ModuleKind::Repetition if feedback == FeedbackKind::Retry => {
                return call.fallback.retry_line().to_string();
            }
            _ => {}
        }

        let messages = build_messages(module, stage, &call.session.history);
        let remote = match tokio::time::timeout(
            self.config.timing.dialogue_timeout(),
            self.services.dialogue.complete(&messages),
        )
        .await
        {
            Ok(Ok(Some(text))) => Some(text),
            Ok(Ok(None)) => {
                debug!("dialogue service returned nothing, using fallback");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "dialogue service failed, using fallback");
                None
            }
            Err(_) => {
                warn!("dialogue service timed out, using fallback");
                None
            }
        };

        let Some(call) = self.call.as_mut() else {
            return String::new();
        };
        let raw = remote.unwrap_or_else(|| call.fallback.next_line(stage, module.id, feedback));
        let (line, annotation) = split_feedback(&raw);
        let line = if line.is_empty() {
            call.fallback.opening_line(stage, module.id).to_string()
        } else {
            line
        };
        if let Some(annotation) = annotation {
            self.emit(CallUpdate::Feedback(annotation));
        }
        line
    }

    fn schedule_recognizer_retry(&mut self) {
        self.emit(CallUpdate::Status("Reconnecting microphone...".to_string()));
        self.timers
            .arm(TimerKind::RecognizerRetry, self.config.timing.recognizer_retry());
    }

    fn set_phase(&mut self, phase: CallPhase) {
        debug!(from = self.phase.as_str(), to = phase.as_str(), "call phase");
        self.phase = phase;
        self.emit(CallUpdate::Phase(phase));
    }

    fn emit(&self, update: CallUpdate) {
        if self.updates_tx.send(update).is_err() {
            debug!("update receiver dropped");
        }
    }
}
