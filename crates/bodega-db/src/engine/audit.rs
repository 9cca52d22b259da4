//! # Audit Engine
//!
//! Drives a branch stocktake: the live in-memory session, its debounced
//! persistence, the variance report and the commit loop.
//!
//! ## Debounced Checkpoints
//! Counting is keystroke-shaped: dozens of `record_count` calls in quick
//! succession. Writing the snapshot on every call would hammer the store
//! for no benefit, so writes are coalesced: a count marks the session
//! dirty and the snapshot is flushed once the operator has been quiet
//! for [`QUIET_WINDOW`]. Report building and commit always read the
//! in-memory session, never the (possibly stale) snapshot, and both
//! flush eagerly first so the stored row cannot end up newer than what
//! was acted on.
//!
//! The checkpoint is polled, not timer-driven: the owner calls
//! [`AuditEngine::maybe_flush`] from its tick (or lets the eager flushes
//! in report/commit pick the write up). A snapshot write failure leaves
//! the session dirty and is retried on the next poll; only an explicit
//! flush surfaces the error.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use bodega_core::{
    build_report, AuditOutcome, AuditReport, AuditSession, AuditStatus, BatchFailure, BatchOutcome,
    BranchScope, CoreError,
};

use crate::engine::EngineResult;
use crate::pool::Database;

/// How long the operator must be quiet before the session snapshot is
/// written.
pub const QUIET_WINDOW: Duration = Duration::from_secs(3);

// =============================================================================
// Checkpoint
// =============================================================================

/// Dirty-flag + quiet-window tracker for snapshot writes.
///
/// Time comes in as an argument so tests can drive the clock instead of
/// sleeping.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    quiet: Duration,
    last_write: Option<Instant>,
}

impl Checkpoint {
    /// Creates a clean checkpoint with the given quiet window.
    pub fn new(quiet: Duration) -> Self {
        Checkpoint {
            quiet,
            last_write: None,
        }
    }

    /// Marks a mutation at `now`, restarting the quiet window.
    pub fn mark(&mut self, now: Instant) {
        self.last_write = Some(now);
    }

    /// True when there is a pending write whose quiet window has elapsed.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_write {
            Some(last) => now.duration_since(last) >= self.quiet,
            None => false,
        }
    }

    /// True when a mutation has not been persisted yet.
    pub fn is_dirty(&self) -> bool {
        self.last_write.is_some()
    }

    /// Clears the dirty flag after a successful write.
    pub fn settle(&mut self) {
        self.last_write = None;
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Checkpoint::new(QUIET_WINDOW)
    }
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug)]
struct ActiveCount {
    session: AuditSession,
    checkpoint: Checkpoint,
}

/// Engine for branch count sessions.
///
/// Holds at most one live session. The branch is the session key in the
/// store as well, so a crashed count can be resumed on restart.
#[derive(Debug)]
pub struct AuditEngine {
    db: Database,
    active: Mutex<Option<ActiveCount>>,
}

impl AuditEngine {
    /// Creates a new audit engine over a database handle.
    pub fn new(db: Database) -> Self {
        AuditEngine {
            db,
            active: Mutex::new(None),
        }
    }

    /// Starts (or resumes) the count for a branch.
    ///
    /// If an in-progress snapshot exists for the branch it is resumed
    /// with its counted entries intact; starting is never destructive.
    pub async fn start_count(&self, branch: &str, reported_by: &str) -> EngineResult<usize> {
        let session = match self.db.audits().get(branch).await? {
            Some(stored) if stored.is_in_progress() => {
                info!(
                    branch = %branch,
                    items = stored.items.len(),
                    "Resuming interrupted count session"
                );
                stored
            }
            _ => {
                info!(branch = %branch, reported_by = %reported_by, "Starting count session");
                AuditSession::new(branch, reported_by)
            }
        };

        let resumed_items = session.items.len();
        let mut active = self.active.lock().await;
        *active = Some(ActiveCount {
            session,
            checkpoint: Checkpoint::default(),
        });
        Ok(resumed_items)
    }

    /// Records one counted quantity into the live session.
    ///
    /// Idempotent per product (re-entry overwrites). Marks the session
    /// dirty; persistence happens on the next due poll or eager flush.
    pub async fn record_count(&self, product_id: &str, counted: i64) -> EngineResult<()> {
        let mut active = self.active.lock().await;
        let count = active.as_mut().ok_or(CoreError::NoActiveCount)?;

        count.session.record_count(product_id, counted)?;
        count.checkpoint.mark(Instant::now());
        Ok(())
    }

    /// Polls the checkpoint: writes the snapshot if the quiet window has
    /// elapsed. Returns whether a write happened.
    ///
    /// A failed write is logged and left dirty for the next poll; the
    /// count keeps running on the in-memory session.
    pub async fn maybe_flush(&self, now: Instant) -> bool {
        let mut active = self.active.lock().await;
        let Some(count) = active.as_mut() else {
            return false;
        };
        if !count.checkpoint.is_due(now) {
            return false;
        }

        match self.db.audits().save(&count.session).await {
            Ok(()) => {
                count.checkpoint.settle();
                debug!(branch = %count.session.branch, "Count snapshot flushed");
                true
            }
            Err(err) => {
                warn!(
                    branch = %count.session.branch,
                    error = %err,
                    "Count snapshot write failed, will retry"
                );
                false
            }
        }
    }

    /// Eagerly writes the snapshot if the session is dirty, surfacing
    /// any store error.
    pub async fn flush(&self) -> EngineResult<()> {
        let mut active = self.active.lock().await;
        if let Some(count) = active.as_mut() {
            if count.checkpoint.is_dirty() {
                self.db.audits().save(&count.session).await?;
                count.checkpoint.settle();
            }
        }
        Ok(())
    }

    /// Builds the variance report from the live session.
    ///
    /// Flushes first so the stored snapshot matches what the operator is
    /// about to review. All-matching counts yield the explicit
    /// [`AuditOutcome::NoVariance`] outcome.
    pub async fn build_report(&self) -> EngineResult<AuditOutcome> {
        self.flush().await?;

        let active = self.active.lock().await;
        let count = active.as_ref().ok_or(CoreError::NoActiveCount)?;

        let products = self
            .db
            .products()
            .list(&BranchScope::Branch(count.session.branch.clone()))
            .await?;

        Ok(build_report(&count.session, &products))
    }

    /// Commits a confirmed variance report: each line's stock becomes
    /// the counted quantity.
    ///
    /// Lines fail independently; committed lines stay committed and the
    /// outcome names the rest for retry. The session completes (and its
    /// snapshot is removed) only when every line landed.
    pub async fn commit_report(
        &self,
        report: &AuditReport,
    ) -> EngineResult<BatchOutcome<String>> {
        let mut active = self.active.lock().await;
        let count = active.as_mut().ok_or(CoreError::NoActiveCount)?;

        let products = self.db.products();
        let mut outcome = BatchOutcome::new();

        for line in &report.lines {
            match products.set_stock(&line.product_id, line.counted).await {
                Ok(true) => outcome.succeeded.push(line.product_id.clone()),
                Ok(false) => outcome.failed.push(BatchFailure {
                    product_id: line.product_id.clone(),
                    product_name: line.product_name.clone(),
                    reason: "Product no longer exists".to_string(),
                }),
                Err(err) => outcome.failed.push(BatchFailure {
                    product_id: line.product_id.clone(),
                    product_name: line.product_name.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        if outcome.is_clean() {
            count.session.status = AuditStatus::Completed;
            self.db.audits().delete(&count.session.branch).await?;
            info!(
                branch = %count.session.branch,
                corrected = outcome.succeeded_count(),
                "Count committed, session completed"
            );
            *active = None;
        } else {
            // Keep the session open so the failed lines can be retried
            self.db.audits().save(&count.session).await?;
            warn!(
                branch = %count.session.branch,
                corrected = outcome.succeeded_count(),
                failed = outcome.failed_count(),
                "Count committed partially"
            );
        }

        Ok(outcome)
    }

    /// Discards the live session and its stored snapshot.
    pub async fn discard(&self) -> EngineResult<()> {
        let mut active = self.active.lock().await;
        if let Some(count) = active.take() {
            self.db.audits().delete(&count.session.branch).await?;
            info!(branch = %count.session.branch, "Count session discarded");
        }
        Ok(())
    }

    /// Branch of the live session, if a count is running.
    pub async fn active_branch(&self) -> Option<String> {
        let active = self.active.lock().await;
        active.as_ref().map(|c| c.session.branch.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
