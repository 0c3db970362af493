//! Quote use-case service.
//!
//! # Responsibility
//! - Wire the repository, remote source and sync engine into the use-cases
//!   the front end calls: add, show random, filter, sync, import, export.
//! - Keep presentation layers free of storage and network details.
//!
//! # Invariants
//! - Publishing a new quote is fire-and-forget and never fails `add_quote`;
//!   pending publishes are tracked until `drain_publishes` settles them.
//! - Import applies either every parsed record or none.
//! - The repository lock is released before any network or file I/O.

use crate::model::quote::{CategoryFilter, Quote};
use crate::repo::quote_repo::{QuoteRepository, RepoError};
use crate::store::KeyValueStore;
use crate::sync::engine::{CycleOutcome, SharedRepository, SyncEngine};
use crate::sync::remote::{publish_in_background, RemoteSource};
use crate::transfer::{read_import_file, write_export_file, ImportError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Service error for quote use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Repository or validation failure.
    Repo(RepoError),
    /// Import file could not be read or parsed; nothing was applied.
    Import(ImportError),
    /// Export file could not be written.
    Export(std::io::Error),
}

impl ServiceError {
    /// Returns whether this error is a rejected user input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Repo(RepoError::Validation(_)))
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Import(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "failed to write export file: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Import(err) => Some(err),
            Self::Export(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ImportError> for ServiceError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

/// Quote service facade.
pub struct QuoteService<S: KeyValueStore + 'static> {
    repo: SharedRepository<S>,
    remote: Arc<dyn RemoteSource>,
    engine: Arc<SyncEngine<S>>,
    publishes: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: KeyValueStore + 'static> QuoteService<S> {
    /// Creates a service owning `repo` and talking to `remote`.
    pub fn new(repo: QuoteRepository<S>, remote: Arc<dyn RemoteSource>) -> Self {
        let repo = Arc::new(Mutex::new(repo));
        let engine = Arc::new(SyncEngine::new(repo.clone(), remote.clone()));
        Self {
            repo,
            remote,
            engine,
            publishes: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of every quote in insertion order.
    pub async fn quotes(&self) -> Vec<Quote> {
        self.repo.lock().await.all().to_vec()
    }

    /// Distinct categories in first-seen order.
    pub async fn categories(&self) -> Vec<String> {
        self.repo.lock().await.categories()
    }

    /// Validates and appends a quote, then publishes it in the background.
    pub async fn add_quote(&self, text: &str, category: &str) -> Result<Quote, ServiceError> {
        let quote = self.repo.lock().await.add(text, category)?;
        let handle = publish_in_background(self.remote.clone(), quote.clone());
        let mut publishes = self.publishes.lock().await;
        publishes.retain(|pending| !pending.is_finished());
        publishes.push(handle);
        Ok(quote)
    }

    /// Waits up to `bound` for background publishes to settle.
    ///
    /// Returns the number still in flight when the bound elapsed; those keep
    /// running until the runtime shuts down.
    pub async fn drain_publishes(&self, bound: Duration) -> usize {
        let mut pending = std::mem::take(&mut *self.publishes.lock().await);
        let settled = tokio::time::timeout(bound, async {
            while let Some(handle) = pending.last_mut() {
                if let Err(err) = handle.await {
                    warn!("event=remote_publish module=service status=aborted error={err}");
                }
                pending.pop();
            }
        })
        .await;

        if settled.is_err() {
            warn!(
                "event=publish_drain module=service status=timeout pending={}",
                pending.len()
            );
        }
        pending.len()
    }

    /// Picks a random quote and records it as last viewed.
    ///
    /// `None` for `filter` uses the persisted category selection.
    pub async fn show_random(
        &self,
        filter: Option<CategoryFilter>,
    ) -> Result<Option<Quote>, ServiceError> {
        let mut repo = self.repo.lock().await;
        let filter = match filter {
            Some(filter) => filter,
            None => repo.selected_category()?,
        };
        let picked = repo.pick_random(&filter);
        if let Some(quote) = picked.as_ref() {
            repo.remember_viewed(quote)?;
        }
        Ok(picked)
    }

    /// Persists `filter` as the selected category, then shows a random quote.
    pub async fn select_category(
        &self,
        filter: CategoryFilter,
    ) -> Result<Option<Quote>, ServiceError> {
        self.repo.lock().await.set_selected_category(&filter)?;
        self.show_random(Some(filter)).await
    }

    pub async fn selected_category(&self) -> Result<CategoryFilter, ServiceError> {
        Ok(self.repo.lock().await.selected_category()?)
    }

    /// Last quote shown in this session.
    pub async fn last_viewed(&self) -> Result<Option<Quote>, ServiceError> {
        Ok(self.repo.lock().await.last_viewed()?)
    }

    /// Ends the session, dropping session-scoped values.
    pub async fn end_session(&self) -> Result<(), ServiceError> {
        self.repo.lock().await.end_session()?;
        Ok(())
    }

    /// Runs one reconciliation cycle now.
    pub async fn sync_now(&self) -> Result<CycleOutcome, ServiceError> {
        Ok(self.engine.run_cycle().await?)
    }

    /// Starts periodic reconciliation; abort the handle to stop.
    pub fn start_periodic_sync(&self, period: Duration) -> JoinHandle<()> {
        self.engine.clone().spawn_periodic(period)
    }

    /// Appends every record of a JSON import file.
    ///
    /// Returns the number of records appended.
    pub async fn import_file(&self, path: impl AsRef<Path>) -> Result<usize, ServiceError> {
        let records = read_import_file(path).await.map_err(|err| {
            error!("event=quote_import module=service status=error error={err}");
            err
        })?;
        let added = self.repo.lock().await.extend(records)?;
        info!("event=quote_import module=service status=ok count={added}");
        Ok(added)
    }

    /// Writes every quote to `path` as pretty JSON.
    ///
    /// Returns the number of records written.
    pub async fn export_file(&self, path: impl AsRef<Path>) -> Result<usize, ServiceError> {
        let snapshot = self.quotes().await;
        write_export_file(path, &snapshot)
            .await
            .map_err(ServiceError::Export)?;
        info!(
            "event=quote_export module=service status=ok count={}",
            snapshot.len()
        );
        Ok(snapshot.len())
    }
}
