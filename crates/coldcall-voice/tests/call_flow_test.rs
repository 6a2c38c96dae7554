//! Integration tests for the call controller
//!
//! Runs whole calls on a paused tokio clock with text-only collaborators:
//! placeholder synthesis, a silent player and a channel-fed recognizer.

use async_trait::async_trait;
use coldcall_core::{
    AccessControl, AllowAll, CallMode, CallOutcome, ChatMessage, EndReason, FailReason,
    FallbackGenerator, FeedbackKind, InMemoryProgressStore, ProgressGatedAccess, ProgressStore, Speaker,
    Stage, TrainerConfig,
};
use coldcall_voice::{
    CallController, CallEvent, CallPhase, CallServices, CallUpdate, ChannelRecognizer, DialogueService,
    OfflineDialogue, PlaceholderTts, RecognitionErrorCode, RecognizerHandle, SilentPlayer,
    SpeechSynthesizer, TimerKind, VoiceError, VoiceResult,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const PASSING_SCRIPT: [&str; 4] = [
    "Hi, this is Alex from Acme. I know this is out of the blue, can I take 20 seconds?",
    "I hear you, totally fair. Out of curiosity, what are you using today?",
    "We help teams like yours cut onboarding time by 30 percent. Would that be relevant?",
    "What does your process look like today? Could we grab 15 minutes Thursday afternoon?",
];

struct FailingDialogue;

#[async_trait]
impl DialogueService for FailingDialogue {
    async fn complete(&self, _messages: &[ChatMessage]) -> VoiceResult<Option<String>> {
        Err(VoiceError::Dialogue("service unavailable".to_string()))
    }
}

struct CannedDialogue(&'static str);

#[async_trait]
impl DialogueService for CannedDialogue {
    async fn complete(&self, _messages: &[ChatMessage]) -> VoiceResult<Option<String>> {
        Ok(Some(self.0.to_string()))
    }
}

/// Never answers; only the controller's dialogue timeout ends the wait.
struct HangingDialogue;

#[async_trait]
impl DialogueService for HangingDialogue {
    async fn complete(&self, _messages: &[ChatMessage]) -> VoiceResult<Option<String>> {
        std::future::pending().await
    }
}

/// Synthesis that takes a while, like a remote voice.
struct SlowTts(Duration);

#[async_trait]
impl SpeechSynthesizer for SlowTts {
    async fn synthesize(&self, _text: &str, _voice_id: &str) -> VoiceResult<Vec<u8>> {
        tokio::time::sleep(self.0).await;
        Ok(Vec::new())
    }
}

struct FailingTts;

#[async_trait]
impl SpeechSynthesizer for FailingTts {
    async fn synthesize(&self, _text: &str, _voice_id: &str) -> VoiceResult<Vec<u8>> {
        Err(VoiceError::Tts("no voice".to_string()))
    }
}

struct Harness {
    controller: CallController,
    handle: RecognizerHandle,
    store: Arc<InMemoryProgressStore>,
    updates: mpsc::UnboundedReceiver<CallUpdate>,
}

struct Setup {
    config: TrainerConfig,
    dialogue: Arc<dyn DialogueService>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    gated: bool,
}

impl Default for Setup {
    fn default() -> Self {
        let mut config = TrainerConfig::default();
        config.session.hangup_probability_min = 0.0;
        config.session.hangup_probability_max = 0.0;
        config.session.no_answer_probability = 0.0;
        Self {
            config,
            dialogue: Arc::new(FailingDialogue),
            synthesizer: Arc::new(PlaceholderTts),
            gated: false,
        }
    }
}

impl Setup {
    fn build(self) -> Harness {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let store = Arc::new(InMemoryProgressStore::new());
        let access: Arc<dyn AccessControl> = if self.gated {
            Arc::new(ProgressGatedAccess::new(store.clone()))
        } else {
            Arc::new(AllowAll)
        };
        let (recognizer, handle) = ChannelRecognizer::new();
        let services = CallServices {
            synthesizer: self.synthesizer.clone(),
            on_device_synthesizer: self.synthesizer,
            player: Box::new(SilentPlayer),
            recognizer: Box::new(recognizer),
            dialogue: self.dialogue,
            progress: store.clone(),
            access,
        };
        let mut controller = CallController::new(self.config, services)
            .unwrap()
            .with_seed(11);
        let updates = controller.take_update_receiver().expect("update receiver");
        Harness {
            controller,
            handle,
            store,
            updates,
        }
    }
}

impl Harness {
    async fn connect(&mut self, module_id: &str, mode: CallMode) {
        self.controller.start_call("u1", module_id, mode).unwrap();
        self.controller.answer().await.unwrap();
        self.pump_until_listening().await;
    }

    /// Process playback completion and the settle pause until the mic is open.
    async fn pump_until_listening(&mut self) {
        for _ in 0..10 {
            if self.controller.is_listening() {
                return;
            }
            assert_eq!(self.controller.phase(), CallPhase::Conversing);
            self.controller.step().await.unwrap();
        }
        panic!("controller never started listening");
    }

    async fn say(&mut self, text: &str) {
        assert!(self.handle.say(text, 0.95), "recognizer not listening for {text:?}");
        self.controller.step().await.unwrap();
    }

    fn drain_updates(&mut self) -> Vec<CallUpdate> {
        let mut out = Vec::new();
        while let Ok(update) = self.updates.try_recv() {
            out.push(update);
        }
        out
    }
}

fn ai_lines(updates: &[CallUpdate]) -> Vec<(String, Stage)> {
    updates
        .iter()
        .filter_map(|u| match u {
            CallUpdate::AiLine { text, stage } => Some((text.clone(), *stage)),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn scripted_call_passes_with_fallback_dialogue() {
    let mut h = Setup::default().build();
    h.connect("opener", CallMode::Practice).await;

    for (i, line) in PASSING_SCRIPT.iter().enumerate() {
        h.say(line).await;
        if i + 1 < PASSING_SCRIPT.len() {
            h.pump_until_listening().await;
        }
    }
    let summary = h.controller.run().await.unwrap();

    assert_eq!(summary.reason, EndReason::Success);
    assert_eq!(summary.outcome, CallOutcome::Passed);
    assert_eq!(summary.stage_reached, Stage::Complete);
    assert_eq!(summary.progress_count, 4);
    assert_eq!(h.controller.phase(), CallPhase::Ended);
    assert_eq!(h.controller.armed_timers(), 0);

    // Dialogue failed every turn: the objection reply came from the fallback table.
    let updates = h.drain_updates();
    let lines = ai_lines(&updates);
    let (objection_reply, stage) = &lines[1];
    assert_eq!(*stage, Stage::Objection);
    assert!(FallbackGenerator::candidates(Stage::Objection, "opener").contains(&objection_reply.as_str()));
    assert!(updates
        .iter()
        .any(|u| matches!(u, CallUpdate::Feedback(f) if f.kind == FeedbackKind::Success)));

    let progress = h.store.load_progress("u1").unwrap();
    assert_eq!(progress.modules["opener"].passes, 1);
}

#[tokio::test(start_paused = true)]
async fn pushy_opener_ends_call_with_rejection() {
    let mut h = Setup::default().build();
    h.connect("opener", CallMode::Practice).await;

    h.say("You need to buy our product now.").await;
    let summary = h.controller.run().await.unwrap();

    assert_eq!(
        summary.reason,
        EndReason::EvaluationFailed {
            stage: Stage::Opener,
            reason: FailReason::PushyPhrasing
        }
    );
    assert_eq!(summary.outcome, CallOutcome::Failed);
    assert_eq!(summary.stage_reached, Stage::Opener);
}

#[tokio::test(start_paused = true)]
async fn remote_reply_feedback_is_split_from_spoken_line() {
    let mut h = Setup {
        dialogue: Arc::new(CannedDialogue("Okay, I'm listening. [[FEEDBACK:SUCCESS|Great opener]]")),
        ..Setup::default()
    }
    .build();
    h.connect("opener", CallMode::Practice).await;
    h.say(PASSING_SCRIPT[0]).await;

    let updates = h.drain_updates();
    let lines = ai_lines(&updates);
    assert_eq!(lines.last().map(|(t, _)| t.as_str()), Some("Okay, I'm listening."));
    assert!(updates
        .iter()
        .any(|u| matches!(u, CallUpdate::Feedback(f) if f.tip == "Great opener")));
}

#[tokio::test(start_paused = true)]
async fn end_call_is_idempotent_and_clears_timers() {
    let mut h = Setup::default().build();
    h.connect("opener", CallMode::Practice).await;
    assert!(h.controller.is_timer_armed(TimerKind::Silence));

    let first = h.controller.end_call(EndReason::UserHangup).unwrap();
    let second = h.controller.end_call(EndReason::Success).unwrap();

    assert_eq!(first, second);
    assert_eq!(h.controller.armed_timers(), 0);
    assert!(!h.handle.is_listening());
    assert_eq!(h.controller.phase(), CallPhase::Ended);
    assert_eq!(h.store.load_progress("u1").unwrap().modules["opener"].attempts, 1);

    // Late events are ignored once ended.
    h.controller.handle_event(CallEvent::Answer).await.unwrap();
    h.controller.handle_event(CallEvent::Hangup).await.unwrap();
    assert_eq!(h.controller.phase(), CallPhase::Ended);
    assert_eq!(h.store.load_progress("u1").unwrap().modules["opener"].attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn user_hangup_event_ends_call() {
    let mut h = Setup::default().build();
    h.connect("opener", CallMode::Practice).await;

    h.controller.event_sender().send(CallEvent::Hangup).unwrap();
    let summary = h.controller.run().await.unwrap();
    assert_eq!(summary.reason, EndReason::UserHangup);
}

#[tokio::test(start_paused = true)]
async fn silence_warns_then_hangs_up() {
    let mut h = Setup::default().build();
    h.connect("opener", CallMode::Practice).await;

    let summary = h.controller.run().await.unwrap();

    assert_eq!(summary.reason, EndReason::SilenceTimeout);
    // Pickup line plus one impatience line.
    assert_eq!(summary.turns, 2);
    let lines = ai_lines(&h.drain_updates());
    assert_eq!(lines.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn rapid_fire_timeout_skips_to_next_question() {
    let mut h = Setup::default().build();
    h.connect("warmup", CallMode::Practice).await;
    assert_eq!(h.controller.current_prompt(), Some("I'm not interested."));
    assert!(h.controller.is_timer_armed(TimerKind::Response));
    assert!(!h.controller.is_timer_armed(TimerKind::Silence));

    h.controller.step().await.unwrap();

    let session = h.controller.session().unwrap();
    assert_eq!(session.timeout_skips, 1);
    assert_eq!(session.progress_count, 1);
    let last = session.history.last().unwrap();
    assert_eq!(last.speaker, Speaker::Ai);
    assert_eq!(last.text, "Just send me an email.");
    assert_eq!(h.controller.current_prompt(), Some("Just send me an email."));
}

#[tokio::test(start_paused = true)]
async fn repetition_module_completes_after_consecutive_passes() {
    let mut h = Setup::default().build();
    h.connect("pitch", CallMode::Practice).await;
    let good = "We help finance teams close their books two days faster every month";

    h.say(good).await;
    h.pump_until_listening().await;
    h.say("um, so, yeah").await;
    h.pump_until_listening().await;
    assert_eq!(h.controller.session().unwrap().progress_count, 0);

    for _ in 0..2 {
        h.say(good).await;
        h.pump_until_listening().await;
    }
    h.say(good).await;
    let summary = h.controller.run().await.unwrap();
    assert_eq!(summary.reason, EndReason::Success);
    assert_eq!(summary.progress_count, 3);
}

#[tokio::test(start_paused = true)]
async fn recognizer_error_reconnects_after_delay() {
    let mut h = Setup::default().build();
    h.connect("opener", CallMode::Practice).await;

    assert!(h.handle.fail(RecognitionErrorCode::Network));
    h.controller.step().await.unwrap();
    assert!(!h.controller.is_listening());
    assert!(h.controller.is_timer_armed(TimerKind::RecognizerRetry));
    assert!(h
        .drain_updates()
        .iter()
        .any(|u| matches!(u, CallUpdate::Status(s) if s.contains("Reconnecting"))));

    h.controller.step().await.unwrap();
    assert!(h.controller.is_listening());
    assert!(h.handle.is_listening());
}

#[tokio::test(start_paused = true)]
async fn stale_timer_fire_is_ignored() {
    let mut h = Setup::default().build();
    h.controller.start_call("u1", "opener", CallMode::Practice).unwrap();

    h.controller
        .handle_event(CallEvent::TimerFired {
            kind: TimerKind::Ring,
            generation: 9_999,
        })
        .await
        .unwrap();
    assert_eq!(h.controller.phase(), CallPhase::Ringing);
    assert!(h.controller.is_timer_armed(TimerKind::Ring));

    // The real ring timer auto-answers.
    h.controller.step().await.unwrap();
    assert_eq!(h.controller.phase(), CallPhase::Conversing);
}

#[tokio::test(start_paused = true)]
async fn no_answer_redials_once_then_connects() {
    let mut setup = Setup::default();
    setup.config.session.no_answer_probability = 1.0;
    let mut h = setup.build();
    h.controller.start_call("u1", "opener", CallMode::Practice).unwrap();

    h.controller.step().await.unwrap();
    assert_eq!(h.controller.phase(), CallPhase::Ringing);
    assert!(h.controller.is_timer_armed(TimerKind::Ring));

    h.controller.step().await.unwrap();
    assert_eq!(h.controller.phase(), CallPhase::Conversing);
}

#[tokio::test(start_paused = true)]
async fn unprompted_hangup_after_passing_opener() {
    let mut setup = Setup::default();
    setup.config.session.hangup_probability_min = 1.0;
    setup.config.session.hangup_probability_max = 1.0;
    let mut h = setup.build();
    h.connect("opener", CallMode::Practice).await;

    h.say(PASSING_SCRIPT[0]).await;
    let summary = h.controller.run().await.unwrap();
    assert_eq!(summary.reason, EndReason::ProspectHungUp);
    assert_eq!(summary.stage_reached, Stage::Objection);
}

#[tokio::test(start_paused = true)]
async fn low_confidence_transcript_is_not_evaluated() {
    let mut h = Setup::default().build();
    h.connect("opener", CallMode::Practice).await;

    assert!(h.handle.say("you need to buy now", 0.1));
    h.controller.step().await.unwrap();

    let session = h.controller.session().unwrap();
    assert_eq!(session.stage(), Stage::Opener);
    assert_eq!(session.history.len(), 3);
    assert_eq!(h.controller.phase(), CallPhase::Conversing);
}

#[tokio::test(start_paused = true)]
async fn synthesis_failure_degrades_to_text_only() {
    let mut h = Setup {
        synthesizer: Arc::new(FailingTts),
        ..Setup::default()
    }
    .build();
    h.connect("opener", CallMode::Practice).await;

    let updates = h.drain_updates();
    assert!(updates
        .iter()
        .any(|u| matches!(u, CallUpdate::Status(s) if s.contains("text only"))));
    assert_eq!(ai_lines(&updates).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn locked_module_and_second_call_are_refused() {
    let mut h = Setup {
        gated: true,
        ..Setup::default()
    }
    .build();

    let err = h.controller.start_call("u1", "warmup", CallMode::Practice).unwrap_err();
    assert!(matches!(err, VoiceError::AccessDenied { .. }));
    assert_eq!(h.controller.phase(), CallPhase::Idle);

    h.controller.start_call("u1", "opener", CallMode::Practice).unwrap();
    assert!(matches!(
        h.controller.start_call("u1", "opener", CallMode::Practice),
        Err(VoiceError::CallActive)
    ));
}

#[tokio::test(start_paused = true)]
async fn offline_dialogue_still_reaches_discovery() {
    let mut h = Setup {
        dialogue: Arc::new(OfflineDialogue),
        ..Setup::default()
    }
    .build();
    h.connect("opener", CallMode::Practice).await;
    for line in &PASSING_SCRIPT[..3] {
        h.say(line).await;
        h.pump_until_listening().await;
    }
    assert_eq!(h.controller.session().unwrap().stage(), Stage::Discovery);
}

#[tokio::test(start_paused = true)]
async fn dialogue_timeout_falls_back_and_call_continues() {
    let mut h = Setup {
        dialogue: Arc::new(HangingDialogue),
        ..Setup::default()
    }
    .build();
    h.connect("opener", CallMode::Practice).await;

    h.say(PASSING_SCRIPT[0]).await;

    let session = h.controller.session().unwrap();
    assert_eq!(session.stage(), Stage::Objection);
    assert_eq!(h.controller.phase(), CallPhase::Conversing);
    let lines = ai_lines(&h.drain_updates());
    let (reply, stage) = lines.last().unwrap();
    assert_eq!(*stage, Stage::Objection);
    assert!(FallbackGenerator::candidates(Stage::Objection, "opener").contains(&reply.as_str()));

    h.pump_until_listening().await;
}

#[tokio::test(start_paused = true)]
async fn select_loop_with_slow_synthesis_reaches_listening() {
    let mut h = Setup {
        synthesizer: Arc::new(SlowTts(Duration::from_millis(300))),
        ..Setup::default()
    }
    .build();
    h.controller.start_call("u1", "opener", CallMode::Practice).unwrap();

    // Race event arrival against update printing, handle events outside the race.
    let mut printed = 0usize;
    let opened = tokio::time::timeout(Duration::from_secs(60), async {
        while !h.controller.is_listening() {
            let event = tokio::select! {
                event = h.controller.next_event() => event.unwrap(),
                Some(_) = h.updates.recv() => {
                    printed += 1;
                    continue;
                }
            };
            h.controller.handle_event(event).await.unwrap();
        }
    })
    .await;

    assert!(opened.is_ok(), "microphone never opened after the pickup line");
    assert!(printed > 0);
    assert!(h.handle.is_listening());
    assert!(h.controller.is_timer_armed(TimerKind::Silence));
}

#[tokio::test(start_paused = true)]
async fn silence_grace_starts_after_warning_is_spoken() {
    let mut h = Setup {
        synthesizer: Arc::new(SlowTts(Duration::from_secs(6))),
        ..Setup::default()
    }
    .build();
    h.connect("opener", CallMode::Practice).await;

    // Warning tier: the impatience line takes longer to voice than the grace period.
    h.controller.step().await.unwrap();
    assert_eq!(h.controller.phase(), CallPhase::Conversing);
    assert!(!h.controller.is_timer_armed(TimerKind::Silence));

    h.pump_until_listening().await;
    assert!(h.controller.is_timer_armed(TimerKind::Silence));

    let summary = h.controller.run().await.unwrap();
    assert_eq!(summary.reason, EndReason::SilenceTimeout);
    assert_eq!(summary.turns, 2);
}
