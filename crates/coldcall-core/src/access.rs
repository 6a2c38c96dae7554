//! Module gating.

use crate::modules::{module_index, prerequisite};
use crate::progress::ProgressStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    #[default]
    Standard,
    /// Every module unlocked.
    Unlimited,
}

pub trait AccessControl: Send + Sync {
    fn has_access(&self, user_id: &str, module_id: &str) -> bool;
}

/// Grants everything; used by the CLI's `--unlock-all` and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessControl for AllowAll {
    fn has_access(&self, _user_id: &str, _module_id: &str) -> bool {
        true
    }
}

/// A module unlocks once the previous catalogue module has a passing call.
pub struct ProgressGatedAccess {
    store: Arc<dyn ProgressStore>,
}

impl ProgressGatedAccess {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }
}

impl AccessControl for ProgressGatedAccess {
    fn has_access(&self, user_id: &str, module_id: &str) -> bool {
        if module_index(module_id).is_none() {
            return false;
        }
        let Some(required) = prerequisite(module_id) else {
            return true;
        };
        match self.store.load_progress(user_id) {
            Ok(state) => state.access_level == AccessLevel::Unlimited || state.has_passed(required.id),
            Err(e) => {
                warn!(user_id, module_id, error = %e, "progress unavailable, denying access");
                false
            }
        }
    }
}
