//! Per-user training progress: sled for durable storage, DashMap for tests and offline runs.

use crate::access::AccessLevel;
use crate::error::CoreResult;
use crate::session::{CallOutcome, CallSummary};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_PROGRESS_PATH: &str = "./data/coldcall_progress";

fn progress_key(user_id: &str) -> String {
    format!("progress/{}", user_id)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleProgress {
    pub attempts: u32,
    pub passes: u32,
    /// Highest `progress_count` reached in a single call.
    pub best_progress: u32,
    pub last_outcome: Option<CallOutcome>,
    pub last_reason: Option<String>,
}

/// Derived summary persisted after every call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressState {
    pub total_practice_secs: u64,
    pub modules: BTreeMap<String, ModuleProgress>,
    pub access_level: AccessLevel,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressState {
    pub fn record_call(&mut self, summary: &CallSummary) {
        self.total_practice_secs += summary.elapsed_secs;
        let entry = self.modules.entry(summary.module_id.clone()).or_default();
        entry.attempts += 1;
        if summary.outcome == CallOutcome::Passed {
            entry.passes += 1;
        }
        entry.best_progress = entry.best_progress.max(summary.progress_count);
        entry.last_outcome = Some(summary.outcome);
        entry.last_reason = Some(summary.reason.code().to_string());
        self.updated_at = Some(summary.ended_at);
    }

    pub fn has_passed(&self, module_id: &str) -> bool {
        self.modules.get(module_id).is_some_and(|m| m.passes > 0)
    }
}

/// Load/save of per-user progress. Last write wins.
pub trait ProgressStore: Send + Sync {
    /// Missing users load as the default state.
    fn load_progress(&self, user_id: &str) -> CoreResult<ProgressState>;
    fn save_progress(&self, user_id: &str, state: &ProgressState) -> CoreResult<()>;
}

/// Sled-backed store; one JSON document per user.
pub struct SledProgressStore {
    db: Db,
}

impl SledProgressStore {
    pub fn new() -> CoreResult<Self> {
        Self::open_path(DEFAULT_PROGRESS_PATH)
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }
}

impl ProgressStore for SledProgressStore {
    fn load_progress(&self, user_id: &str) -> CoreResult<ProgressState> {
        match self.db.get(progress_key(user_id).as_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(ProgressState::default()),
        }
    }

    fn save_progress(&self, user_id: &str, state: &ProgressState) -> CoreResult<()> {
        let bytes = serde_json::to_vec(state)?;
        self.db.insert(progress_key(user_id).as_bytes(), bytes)?;
        self.db.flush()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    states: DashMap<String, ProgressState>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for InMemoryProgressStore {
    fn load_progress(&self, user_id: &str) -> CoreResult<ProgressState> {
        Ok(self
            .states
            .get(user_id)
            .map(|s| s.clone())
            .unwrap_or_default())
    }

    fn save_progress(&self, user_id: &str, state: &ProgressState) -> CoreResult<()> {
        self.states.insert(user_id.to_string(), state.clone());
        Ok(())
    }
}
