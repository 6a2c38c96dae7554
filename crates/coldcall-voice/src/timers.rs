//! Call timers.
//!
//! Each timer is a spawned sleep that posts [`CallEvent::TimerFired`] back to the
//! controller. At most one timer per kind is live; re-arming aborts the previous
//! task. Every arm takes a fresh generation so a fire queued before cancellation
//! is recognised as stale by [`TimerSet::accept_fire`].

use crate::events::CallEvent;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Ring duration before the prospect picks up.
    Ring,
    /// User silence while listening (two tiers: warning, then hangup).
    Silence,
    /// Rapid-fire answer window.
    Response,
    /// Pause between end of playback and listening.
    Settle,
    /// Delay between the closing line and ending the call.
    Closing,
    RecognizerRetry,
}

impl TimerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerKind::Ring => "ring",
            TimerKind::Silence => "silence",
            TimerKind::Response => "response",
            TimerKind::Settle => "settle",
            TimerKind::Closing => "closing",
            TimerKind::RecognizerRetry => "recognizer_retry",
        }
    }
}

struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

pub struct TimerSet {
    events: mpsc::UnboundedSender<CallEvent>,
    armed: HashMap<TimerKind, ArmedTimer>,
    generation: u64,
}

impl TimerSet {
    pub fn new(events: mpsc::UnboundedSender<CallEvent>) -> Self {
        Self {
            events,
            armed: HashMap::new(),
            generation: 0,
        }
    }

    /// Arm `kind`, replacing any live timer of the same kind. Returns the generation.
    pub fn arm(&mut self, kind: TimerKind, after: Duration) -> u64 {
        self.cancel(kind);
        self.generation += 1;
        let generation = self.generation;
        let tx = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // Receiver gone means the controller is gone.
            let _ = tx.send(CallEvent::TimerFired { kind, generation });
        });
        debug!(timer = kind.as_str(), generation, ?after, "timer armed");
        self.armed.insert(kind, ArmedTimer { generation, handle });
        generation
    }

    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.armed.remove(&kind) {
            Some(timer) => {
                timer.handle.abort();
                debug!(timer = kind.as_str(), generation = timer.generation, "timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, timer) in self.armed.drain() {
            timer.handle.abort();
        }
    }

    /// Consume a fire event. False when the fire belongs to a cancelled or replaced timer.
    pub fn accept_fire(&mut self, kind: TimerKind, generation: u64) -> bool {
        match self.armed.get(&kind) {
            Some(timer) if timer.generation == generation => {
                self.armed.remove(&kind);
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.contains_key(&kind)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer_set() -> (TimerSet, mpsc::UnboundedReceiver<CallEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (TimerSet::new(tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn fired_timer_is_accepted_once() {
        let (mut timers, mut rx) = timer_set();
        let generation = timers.arm(TimerKind::Settle, Duration::from_millis(500));

        let Some(CallEvent::TimerFired { kind, generation: fired }) = rx.recv().await else {
            panic!("expected timer event");
        };
        assert_eq!(kind, TimerKind::Settle);
        assert_eq!(fired, generation);
        assert!(timers.accept_fire(kind, fired));
        assert!(!timers.accept_fire(kind, fired));
        assert_eq!(timers.armed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_previous_timer() {
        let (mut timers, mut rx) = timer_set();
        let first = timers.arm(TimerKind::Silence, Duration::from_secs(10));
        let second = timers.arm(TimerKind::Silence, Duration::from_secs(15));
        assert_ne!(first, second);
        assert_eq!(timers.armed_count(), 1);

        let Some(CallEvent::TimerFired { generation, .. }) = rx.recv().await else {
            panic!("expected timer event");
        };
        assert_eq!(generation, second);
        assert!(!timers.accept_fire(TimerKind::Silence, first));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_clears_every_kind() {
        let (mut timers, mut rx) = timer_set();
        timers.arm(TimerKind::Ring, Duration::from_secs(3));
        timers.arm(TimerKind::Response, Duration::from_secs(5));
        timers.cancel_all();
        assert_eq!(timers.armed_count(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_fire_is_rejected_after_cancel() {
        let (mut timers, mut rx) = timer_set();
        let generation = timers.arm(TimerKind::Response, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(20)).await;
        // Fire already queued when the cancel lands.
        assert!(timers.cancel(TimerKind::Response));
        let Some(CallEvent::TimerFired { kind, generation: fired }) = rx.recv().await else {
            panic!("expected queued fire");
        };
        assert_eq!(fired, generation);
        assert!(!timers.accept_fire(kind, fired));
    }
}
