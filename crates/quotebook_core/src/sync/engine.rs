//! Reconciliation cycle coordinator.
//!
//! # Responsibility
//! - Run `Idle -> Fetching -> Merging -> Idle` cycles against the remote.
//! - Debounce overlapping triggers from the timer and manual sync.
//! - Drive the periodic sync task.
//!
//! # Invariants
//! - At most one cycle runs at a time; a trigger during `Fetching` or
//!   `Merging` is skipped, not queued.
//! - The repository lock is never held across the network fetch.
//! - The local snapshot is taken after the fetch, under the lock, so adds
//!   that land while a fetch is in flight survive the merge.
//! - A cycle always returns the state to `Idle`, including on error.

use crate::repo::quote_repo::{QuoteRepository, RepoResult};
use crate::store::KeyValueStore;
use crate::sync::reconcile::reconcile;
use crate::sync::remote::{FetchOutcome, RemoteSource};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const STATE_IDLE: u8 = 0;
const STATE_FETCHING: u8 = 1;
const STATE_MERGING: u8 = 2;

/// Reconciliation cycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Fetching,
    Merging,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// `false` when the fetch degraded; counts are then all zero.
    pub remote_available: bool,
    pub fetched: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// `true` when new quotes were merged and written through.
    pub changed: bool,
    pub unavailable_reason: Option<String>,
}

/// Result of a sync trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle was already in flight.
    Skipped,
}

/// Shared handle to the session repository.
pub type SharedRepository<S> = Arc<Mutex<QuoteRepository<S>>>;

/// Non-reentrant fetch + merge + persist coordinator.
pub struct SyncEngine<S: KeyValueStore> {
    repo: SharedRepository<S>,
    remote: Arc<dyn RemoteSource>,
    state: AtomicU8,
}

impl<S: KeyValueStore + 'static> SyncEngine<S> {
    pub fn new(repo: SharedRepository<S>, remote: Arc<dyn RemoteSource>) -> Self {
        Self {
            repo,
            remote,
            state: AtomicU8::new(STATE_IDLE),
        }
    }

    /// Returns the current cycle state.
    pub fn state(&self) -> CycleState {
        match self.state.load(Ordering::Acquire) {
            STATE_FETCHING => CycleState::Fetching,
            STATE_MERGING => CycleState::Merging,
            _ => CycleState::Idle,
        }
    }

    /// Runs one reconciliation cycle unless one is already running.
    ///
    /// # Errors
    /// Only a failed write-through of merged content is reported; an
    /// unreachable remote yields a completed report with
    /// `remote_available = false`.
    pub async fn run_cycle(&self) -> RepoResult<CycleOutcome> {
        if self
            .state
            .compare_exchange(
                STATE_IDLE,
                STATE_FETCHING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            debug!("event=sync_cycle module=sync status=skipped reason=in_flight");
            return Ok(CycleOutcome::Skipped);
        }
        let _reset = ResetToIdle(&self.state);

        let outcome = self.remote.fetch_candidates().await;
        let candidates = match &outcome {
            FetchOutcome::Available(quotes) => quotes.as_slice(),
            FetchOutcome::Unavailable { reason } => {
                warn!("event=sync_cycle module=sync status=unavailable reason={reason}");
                return Ok(CycleOutcome::Completed(CycleReport {
                    remote_available: false,
                    fetched: 0,
                    accepted: 0,
                    rejected: 0,
                    changed: false,
                    unavailable_reason: Some(reason.clone()),
                }));
            }
        };

        self.state.store(STATE_MERGING, Ordering::Release);
        let mut repo = self.repo.lock().await;
        let result = reconcile(repo.all(), candidates);
        let report = CycleReport {
            remote_available: true,
            fetched: candidates.len(),
            accepted: result.accepted_count,
            rejected: result.rejected_count,
            changed: result.changed,
            unavailable_reason: None,
        };
        repo.apply_merge(result)?;

        info!(
            "event=sync_cycle module=sync status=ok fetched={} accepted={} rejected={} total={}",
            report.fetched,
            report.accepted,
            report.rejected,
            repo.len()
        );
        Ok(CycleOutcome::Completed(report))
    }

    /// Starts a task that runs a cycle every `period`, first tick immediately.
    ///
    /// Abort the returned handle to stop it.
    pub fn spawn_periodic(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                "event=sync_timer module=sync status=start period_ms={}",
                period.as_millis()
            );
            loop {
                ticker.tick().await;
                if let Err(err) = self.run_cycle().await {
                    error!("event=sync_cycle module=sync status=error error={err}");
                }
            }
        })
    }
}

struct ResetToIdle<'a>(&'a AtomicU8);

impl Drop for ResetToIdle<'_> {
    fn drop(&mut self) {
        self.0.store(STATE_IDLE, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::{CycleOutcome, CycleState, SyncEngine};
    use crate::model::quote::Quote;
    use crate::repo::quote_repo::QuoteRepository;
    use crate::store::{MemoryKeyValueStore, QUOTES_KEY};
    use crate::sync::remote::{FetchOutcome, RemoteError, RemoteSource};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{Mutex, Notify};

    struct GatedRemote {
        gate: Arc<Notify>,
        quotes: Vec<Quote>,
    }

    #[async_trait]
    impl RemoteSource for GatedRemote {
        async fn fetch_candidates(&self) -> FetchOutcome {
            self.gate.notified().await;
            FetchOutcome::Available(self.quotes.clone())
        }

        async fn publish(&self, _record: &Quote) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    struct CountingRemote {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteSource for CountingRemote {
        async fn fetch_candidates(&self) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            FetchOutcome::Available(vec![])
        }

        async fn publish(&self, _record: &Quote) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    fn shared_repo(raw: &str) -> Arc<Mutex<QuoteRepository<MemoryKeyValueStore>>> {
        let store = MemoryKeyValueStore::new().with_durable(QUOTES_KEY, raw);
        Arc::new(Mutex::new(QuoteRepository::load(store).unwrap()))
    }

    async fn wait_for_state(engine: &SyncEngine<MemoryKeyValueStore>, state: CycleState) {
        while engine.state() != state {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn overlapping_trigger_is_skipped() {
        let gate = Arc::new(Notify::new());
        let repo = shared_repo(r#"[{"text":"Hi","category":"A"}]"#);
        let engine = Arc::new(SyncEngine::new(
            repo.clone(),
            Arc::new(GatedRemote {
                gate: gate.clone(),
                quotes: vec![Quote::unchecked("Bye", "Server")],
            }),
        ));

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.run_cycle().await }
        });
        wait_for_state(&engine, CycleState::Fetching).await;

        let second = engine.run_cycle().await.unwrap();
        assert_eq!(second, CycleOutcome::Skipped);

        gate.notify_one();
        let first = first.await.unwrap().unwrap();
        match first {
            CycleOutcome::Completed(report) => {
                assert!(report.changed);
                assert_eq!(report.accepted, 1);
            }
            CycleOutcome::Skipped => panic!("first cycle should complete"),
        }
        assert_eq!(engine.state(), CycleState::Idle);
        assert_eq!(repo.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn add_during_fetch_survives_merge() {
        let gate = Arc::new(Notify::new());
        let repo = shared_repo("[]");
        let engine = Arc::new(SyncEngine::new(
            repo.clone(),
            Arc::new(GatedRemote {
                gate: gate.clone(),
                quotes: vec![Quote::unchecked("Remote", "Server")],
            }),
        ));

        let cycle = tokio::spawn({
            let engine = engine.clone();
            async move { engine.run_cycle().await }
        });
        wait_for_state(&engine, CycleState::Fetching).await;

        repo.lock().await.add("Local", "Mine").unwrap();
        gate.notify_one();
        cycle.await.unwrap().unwrap();

        let texts: Vec<String> = repo
            .lock()
            .await
            .all()
            .iter()
            .map(|quote| quote.text.clone())
            .collect();
        assert_eq!(texts, vec!["Local".to_string(), "Remote".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_task_runs_cycles_on_each_tick() {
        let remote = Arc::new(CountingRemote {
            calls: AtomicUsize::new(0),
        });
        let engine = Arc::new(SyncEngine::new(shared_repo("[]"), remote.clone()));

        let handle = engine.clone().spawn_periodic(Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(61)).await;
        handle.abort();

        assert_eq!(remote.calls.load(Ordering::SeqCst), 3);
    }
}
