//! Permission synchronization between the host platform and the voice
//! server.

mod engine;
mod names;

use anyhow::Result;
use async_trait::async_trait;
pub use engine::SyncEngine;
pub use names::desired_display_name;
use serde::Serialize;

use crate::permissions::Role;

/// Persistence for the host-account to remote-registration mapping.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Record a remote registration id learned during a sync pass.
    async fn set_remote_id(&self, user_id: i64, murmur_user_id: i32) -> Result<()>;
}

/// Whether a pass writes to the voice server or only reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Apply,
    DryRun,
}

impl SyncMode {
    #[must_use]
    pub const fn is_dry_run(self) -> bool {
        matches!(self, Self::DryRun)
    }
}

/// What happened to one identity during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum SyncOutcome {
    /// Permissions were written to the voice server.
    Updated,
    /// Dry run: this is what an apply pass would have written.
    Planned,
    /// The identity was skipped; the pass continued.
    Failed(String),
}

/// Per-identity result of a pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub user_id: i64,
    pub name: String,
    pub role: Role,
    pub channel_id: i32,
    pub outcome: SyncOutcome,
}

/// Aggregate counters for a pass. One identity failing never aborts the
/// pass; it lands in `errors` and the loop moves on.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub updated: u32,
    pub planned: u32,
    pub errors: u32,
    pub results: Vec<SyncResult>,
}

impl SyncReport {
    pub(crate) fn push(&mut self, result: SyncResult) {
        match &result.outcome {
            SyncOutcome::Updated => self.updated += 1,
            SyncOutcome::Planned => self.planned += 1,
            SyncOutcome::Failed(_) => self.errors += 1,
        }
        self.results.push(result);
    }
}
