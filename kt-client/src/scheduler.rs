//! 自审计调度器
//!
//! Each tick reads the feature mode, then either purges local blobs
//! (disabled), does nothing (flag unknown) or compares the last audit time
//! with the audit interval. An overdue audit is spawned in the background and
//! its shared handle published through [`KeyTransparencyState`]; the timer
//! then sleeps until the next audit is due.
//!
//! The loop started by [`AuditScheduler::start`] never waits for an audit to
//! finish, and [`AuditScheduler::stop`] only cancels the sleep.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use shared::error::ErrorCode;
use shared::models::{AuditResult, KtMode};
use shared::util::format_millis;

use crate::context::KtContext;
use crate::error::{KtError, KtResult};
use crate::storage::UserStorage;
use crate::telemetry::Report;

const REPORT_CONTEXT: &str = "selfAudit";

/// Sentinel for "no wake scheduled"
const NO_WAKE: i64 = i64::MIN;

// ============================================================================
// State
// ============================================================================

/// Final status of a self-audit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    /// Initial handle; no audit has run in this process
    Idle,
    /// Audit finished and its result was persisted at `at` (unix millis)
    Completed { at: i64 },
    /// Audit failed or panicked; already reported
    Failed,
}

type AuditHandle = Shared<BoxFuture<'static, AuditStatus>>;

/// Snapshot of the engine state
///
/// Never mutated: the scheduler publishes a new snapshot each time it starts
/// an audit.
#[derive(Clone)]
pub struct KeyTransparencyState {
    self_audit: AuditHandle,
    storage: UserStorage,
}

impl KeyTransparencyState {
    fn idle(storage: UserStorage) -> Self {
        let self_audit = futures::future::ready(AuditStatus::Idle).boxed().shared();
        // Resolve the handle so `peek` sees it as finished
        let _ = self_audit.clone().now_or_never();
        Self {
            self_audit,
            storage,
        }
    }

    fn with_audit(storage: UserStorage, self_audit: AuditHandle) -> Self {
        Self {
            self_audit,
            storage,
        }
    }

    /// Whether the published audit has not resolved yet
    pub fn is_audit_running(&self) -> bool {
        self.self_audit.peek().is_none()
    }

    /// Wait for the published audit to resolve
    pub async fn wait_self_audit(&self) -> AuditStatus {
        self.self_audit.clone().await
    }

    pub fn storage(&self) -> &UserStorage {
        &self.storage
    }
}

impl std::fmt::Debug for KeyTransparencyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyTransparencyState")
            .field("self_audit", &self.self_audit.peek())
            .field("storage", &self.storage)
            .finish()
    }
}

// ============================================================================
// Tick
// ============================================================================

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Mode disabled; `purged` local records removed
    Deactivated { purged: usize },
    /// Mode not loaded; nothing done
    Inactive,
    /// Audit was overdue and has been started
    AuditStarted { next_wake: Duration },
    /// Audit was overdue but the previous one is still running
    AuditInProgress { next_wake: Duration },
    /// Audit not due yet
    Waiting { next_wake: Duration },
}

impl TickOutcome {
    /// Delay until the next tick; `None` stops the loop
    pub fn next_wake(&self) -> Option<Duration> {
        match self {
            Self::Deactivated { .. } | Self::Inactive => None,
            Self::AuditStarted { next_wake }
            | Self::AuditInProgress { next_wake }
            | Self::Waiting { next_wake } => Some(*next_wake),
        }
    }
}

/// Decide whether an audit is due and how long to wait (millis)
///
/// A missing last run counts as "never". Clock skew that puts the last run in
/// the future is treated as zero elapsed time.
fn plan(now: i64, last_run: Option<i64>, interval: i64) -> (bool, i64) {
    let elapsed = now.saturating_sub(last_run.unwrap_or(0)).max(0);
    if elapsed > interval {
        (true, interval)
    } else {
        (false, interval - elapsed)
    }
}

fn millis_to_duration(millis: i64) -> Duration {
    Duration::from_millis(u64::try_from(millis).unwrap_or(0))
}

// ============================================================================
// Scheduler
// ============================================================================

struct SchedulerInner {
    ctx: Arc<KtContext>,
    state: RwLock<Arc<KeyTransparencyState>>,
    next_wake: AtomicI64,
}

struct Runner {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

/// Recurring self-audit driver
pub struct AuditScheduler {
    inner: Arc<SchedulerInner>,
    runner: Mutex<Option<Runner>>,
}

impl AuditScheduler {
    pub fn new(ctx: Arc<KtContext>) -> Self {
        let state = Arc::new(KeyTransparencyState::idle(ctx.storage.clone()));
        Self {
            inner: Arc::new(SchedulerInner {
                ctx,
                state: RwLock::new(state),
                next_wake: AtomicI64::new(NO_WAKE),
            }),
            runner: Mutex::new(None),
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> Arc<KeyTransparencyState> {
        self.inner.state()
    }

    /// Instant of the next scheduled tick (unix millis), if the loop is waiting
    pub fn next_wake(&self) -> Option<i64> {
        match self.inner.next_wake.load(Ordering::Acquire) {
            NO_WAKE => None,
            at => Some(at),
        }
    }

    /// Run one scheduling step without touching the loop
    pub async fn tick(&self) -> KtResult<TickOutcome> {
        self.inner.tick().await
    }

    /// Whether the recurring loop is running
    pub fn is_running(&self) -> bool {
        self.runner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|runner| !runner.handle.is_finished())
    }

    /// Spawn the recurring loop; no-op if it is already running
    pub fn start(&self) {
        let mut runner = self.runner.lock().unwrap_or_else(|e| e.into_inner());
        if runner
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
        {
            tracing::debug!("Audit scheduler already running");
            return;
        }

        let shutdown = CancellationToken::new();
        let inner = self.inner.clone();
        let handle = tokio::spawn(inner.run(shutdown.clone()));
        *runner = Some(Runner { shutdown, handle });
    }

    /// Cancel the loop and wait for it to exit
    ///
    /// A tick in progress is abandoned at its next await point. An audit
    /// already in flight keeps running.
    pub async fn stop(&self) {
        let runner = self.runner.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(Runner { shutdown, handle }) = runner {
            shutdown.cancel();
            if let Err(e) = handle.await {
                tracing::error!("Audit scheduler loop terminated abnormally: {}", e);
            }
        }
        self.inner.next_wake.store(NO_WAKE, Ordering::Release);
    }
}

impl std::fmt::Debug for AuditScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditScheduler")
            .field("running", &self.is_running())
            .field("next_wake", &self.next_wake())
            .finish()
    }
}

impl SchedulerInner {
    fn state(&self) -> Arc<KeyTransparencyState> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn publish(&self, state: KeyTransparencyState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(state);
    }

    async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!(user_id = %self.ctx.user_id, "Audit scheduler started");

        loop {
            let ticked = tokio::select! {
                ticked = self.tick() => ticked,
                _ = shutdown.cancelled() => {
                    tracing::info!("Audit scheduler received shutdown signal during tick");
                    break;
                }
            };

            let wait = match ticked {
                Ok(outcome) => outcome.next_wake(),
                Err(e) => {
                    tracing::error!("Audit scheduler tick failed: {}", e);
                    self.ctx.reporter.report(Report::from_error(&e, REPORT_CONTEXT));
                    Some(self.ctx.config.audit_interval)
                }
            };

            let Some(wait) = wait else {
                tracing::info!("Key transparency inactive, audit scheduler exiting");
                break;
            };

            let wake_at = self
                .ctx
                .clock
                .now_millis()
                .saturating_add(i64::try_from(wait.as_millis()).unwrap_or(i64::MAX));
            self.next_wake.store(wake_at, Ordering::Release);
            tracing::debug!(
                next_wake_ms = wake_at,
                next_wake = %format_millis(wake_at),
                "Next self-audit check scheduled"
            );

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.cancelled() => {
                    tracing::info!("Audit scheduler received shutdown signal");
                    break;
                }
            }
        }

        self.next_wake.store(NO_WAKE, Ordering::Release);
        tracing::info!("Audit scheduler stopped");
    }

    async fn tick(&self) -> KtResult<TickOutcome> {
        let ctx = &self.ctx;

        match ctx.feature_gate.mode().await {
            KtMode::Disabled => {
                let purged = self.purge_all().await;
                tracing::info!(purged, "Key transparency disabled, local blobs removed");
                return Ok(TickOutcome::Deactivated { purged });
            }
            mode if !mode.is_active() => {
                tracing::debug!(?mode, "Key transparency not active, skipping tick");
                return Ok(TickOutcome::Inactive);
            }
            _ => {}
        }

        let last_run = match ctx.storage.audit_result().await {
            Ok(result) => result.map(|r| r.last_run_timestamp),
            Err(e) => {
                ctx.reporter.report(Report::from_error(&e, REPORT_CONTEXT));
                None
            }
        };

        let now = ctx.clock.now_millis();
        let (due, wait) = plan(now, last_run, ctx.config.audit_interval_millis());
        let next_wake = millis_to_duration(wait);

        if !due {
            tracing::debug!(last_run = ?last_run, wait_ms = wait, "Self-audit not due");
            return Ok(TickOutcome::Waiting { next_wake });
        }

        if self.state().is_audit_running() {
            tracing::warn!("Self-audit overdue but previous run still in flight");
            return Ok(TickOutcome::AuditInProgress { next_wake });
        }

        let handle = run_self_audit(ctx.clone()).boxed().shared();
        tokio::spawn(handle.clone());
        self.publish(KeyTransparencyState::with_audit(
            ctx.storage.clone(),
            handle,
        ));
        tracing::info!(last_run = ?last_run, "Self-audit started");

        Ok(TickOutcome::AuditStarted { next_wake })
    }

    /// Remove every blob keyed by one of the user's own addresses
    ///
    /// Failures are reported once and never retried; the count covers the
    /// records that were removed.
    async fn purge_all(&self) -> usize {
        let ctx = &self.ctx;
        let addresses = match ctx.account.addresses().await {
            Ok(addresses) => addresses,
            Err(e) => {
                self.report_purge_failure(&e, 0);
                return 0;
            }
        };

        let mut purged = 0;
        let mut first_error = None;
        for address in &addresses {
            let mut identifiers = vec![address.id.clone()];
            match ctx.stash.email_identifier(&ctx.user_id, &address.email).await {
                Ok(identifier) => identifiers.push(identifier),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
            for identifier in &identifiers {
                match ctx
                    .stash
                    .purge(&ctx.storage, std::slice::from_ref(identifier))
                    .await
                {
                    Ok(removed) => purged += removed,
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            self.report_purge_failure(&e, purged);
        }
        purged
    }

    fn report_purge_failure(&self, err: &KtError, purged: usize) {
        tracing::warn!(purged, "Failed to purge local blobs: {}", err);
        self.ctx.reporter.report(
            Report::new(ErrorCode::StashPurgeFailed, REPORT_CONTEXT)
                .with_detail("errorMessage", err.to_string())
                .with_detail("purged", purged),
        );
    }
}

// ============================================================================
// Self-audit task
// ============================================================================

/// Run a self-audit, turning errors and panics into reports
async fn run_self_audit(ctx: Arc<KtContext>) -> AuditStatus {
    let result = AssertUnwindSafe(self_audit(&ctx)).catch_unwind().await;
    match result {
        Ok(Ok(at)) => {
            tracing::info!(at = %format_millis(at), "Self-audit completed");
            AuditStatus::Completed { at }
        }
        Ok(Err(e)) => {
            tracing::warn!("Self-audit failed: {}", e);
            ctx.reporter.report(
                Report::new(ErrorCode::SelfAuditFailed, REPORT_CONTEXT)
                    .with_detail("errorCode", e.code().code())
                    .with_detail("errorMessage", e.to_string()),
            );
            AuditStatus::Failed
        }
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            tracing::error!(panic = %panic_msg, "Self-audit panicked");
            ctx.reporter.report(
                Report::new(ErrorCode::SelfAuditPanicked, REPORT_CONTEXT)
                    .with_detail("panic", panic_msg),
            );
            AuditStatus::Failed
        }
    }
}

async fn self_audit(ctx: &KtContext) -> KtResult<i64> {
    let addresses = ctx.account.addresses().await?;
    let user_keys = ctx.account.user_keys().await?;

    ctx.log
        .audit_addresses(&ctx.user_id, &addresses, &user_keys, &ctx.storage)
        .await?;

    let now = ctx.clock.now_millis();
    ctx.storage
        .set_audit_result(&AuditResult {
            last_run_timestamp: now,
        })
        .await?;
    Ok(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 60 * 60 * 1000;

    #[test]
    fn test_plan_overdue_audit() {
        let now = 100 * HOUR;
        assert_eq!(plan(now, Some(now - 5 * HOUR), 4 * HOUR), (true, 4 * HOUR));
    }

    #[test]
    fn test_plan_waits_until_due() {
        let now = 100 * HOUR;
        assert_eq!(plan(now, Some(now - HOUR), 4 * HOUR), (false, 3 * HOUR));
    }

    #[test]
    fn test_plan_boundary_is_not_due() {
        let now = 100 * HOUR;
        assert_eq!(plan(now, Some(now - 4 * HOUR), 4 * HOUR), (false, 0));
    }

    #[test]
    fn test_plan_never_run_and_skew() {
        assert_eq!(plan(100 * HOUR, None, 4 * HOUR), (true, 4 * HOUR));
        assert_eq!(plan(100 * HOUR, Some(0), 4 * HOUR), (true, 4 * HOUR));
        // last run in the future
        assert_eq!(plan(HOUR, Some(2 * HOUR), 4 * HOUR), (false, 4 * HOUR));
    }

    #[test]
    fn test_tick_outcome_next_wake() {
        assert_eq!(TickOutcome::Inactive.next_wake(), None);
        assert_eq!(TickOutcome::Deactivated { purged: 3 }.next_wake(), None);
        let wait = Duration::from_secs(10);
        assert_eq!(
            TickOutcome::Waiting { next_wake: wait }.next_wake(),
            Some(wait)
        );
    }

    #[tokio::test]
    async fn test_idle_state_is_resolved() {
        let store = Arc::new(crate::storage::MemoryBlobStore::new());
        let state = KeyTransparencyState::idle(UserStorage::new(store, "u1"));
        assert!(!state.is_audit_running());
        assert_eq!(state.wait_self_audit().await, AuditStatus::Idle);
    }
}
