//! Synchronized store session state machine.
//!
//! # Responsibility
//! - Drive one fetch → read → mutate → publish cycle per session.
//! - Keep the remote branch authoritative over local working copies.
//!
//! # Invariants
//! - Operations run in machine order; out-of-order calls are errors, not
//!   silent no-ops.
//! - A rejected non-fast-forward push never overwrites remote state; it is
//!   surfaced so the caller can re-fetch and re-validate.
//! - The working copy is session-owned and disposable; a fresh fetch
//!   discards it entirely.

use crate::model::role::RoleCatalog;
use crate::model::snapshot::RegistrationSnapshot;
use crate::repo::snapshot_repo::{FileSnapshotRepository, RepoError, SnapshotRepository};
use crate::sync::git::{GitError, GitWorkspace};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Instant;

/// Fixed message used for every publish commit.
pub const PUBLISH_COMMIT_MESSAGE: &str = "Update reading group registration";

pub type SyncResult<T> = Result<T, SyncError>;

/// Failures of the synchronized store cycle.
#[derive(Debug)]
pub enum SyncError {
    /// Remote unreachable, auth failure or branch missing during fetch.
    Fetch(GitError),
    /// Staging/commit/push failure after a successful local mutation.
    Publish(GitError),
    /// The remote advanced since the last fetch; caller should re-fetch,
    /// re-validate and retry.
    PublishRejected(String),
    /// Snapshot files could not be read or written.
    Repo(RepoError),
    /// A store operation was invoked out of machine order.
    OutOfOrder {
        operation: &'static str,
        state: &'static str,
    },
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(err) => write!(f, "failed to fetch remote state: {err}"),
            Self::Publish(err) => write!(f, "failed to publish registration: {err}"),
            Self::PublishRejected(detail) => {
                write!(f, "remote moved ahead during this session: {detail}")
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::OutOfOrder { operation, state } => {
                write!(f, "store operation `{operation}` not allowed in state `{state}`")
            }
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fetch(err) | Self::Publish(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Session lifecycle of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreState {
    Fresh,
    Loaded,
    Ready,
    Dirty,
    Published,
}

impl StoreState {
    fn name(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Loaded => "loaded",
            Self::Ready => "ready",
            Self::Dirty => "dirty",
            Self::Published => "published",
        }
    }
}

/// Durable, remote-backed persistence for the registration snapshot.
///
/// The remote URL may carry a spliced access token and is therefore never
/// logged; log lines identify the store by branch only.
pub struct SyncedStore {
    remote_url: String,
    branch: String,
    data_subpath: String,
    workspace: GitWorkspace,
    state: StoreState,
}

impl SyncedStore {
    pub fn new(
        remote_url: impl Into<String>,
        branch: impl Into<String>,
        workdir: impl Into<PathBuf>,
        data_subpath: impl Into<String>,
    ) -> Self {
        Self {
            remote_url: remote_url.into(),
            branch: branch.into(),
            data_subpath: data_subpath.into(),
            workspace: GitWorkspace::new(workdir),
            state: StoreState::Fresh,
        }
    }

    /// Discards any stale working copy and clones the remote branch.
    ///
    /// Allowed from any state: a retry after a rejected publish starts the
    /// machine over from a fresh remote truth.
    pub fn fetch(&mut self) -> SyncResult<()> {
        let started_at = Instant::now();
        GitWorkspace::ensure_available().map_err(SyncError::Fetch)?;

        match self.workspace.fresh_clone(&self.remote_url, &self.branch) {
            Ok(()) => {
                self.state = StoreState::Loaded;
                info!(
                    "event=sync_fetch module=sync status=ok branch={} duration_ms={}",
                    self.branch,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=sync_fetch module=sync status=error branch={} duration_ms={} error={err}",
                    self.branch,
                    started_at.elapsed().as_millis()
                );
                Err(SyncError::Fetch(err))
            }
        }
    }

    /// Deserializes the snapshot from the fetched working copy.
    pub fn read(&mut self, catalog: &RoleCatalog) -> SyncResult<RegistrationSnapshot> {
        if self.state != StoreState::Loaded {
            return Err(self.out_of_order("read"));
        }
        let snapshot = self.repository().load(catalog)?;
        self.state = StoreState::Ready;
        Ok(snapshot)
    }

    /// Writes the mutated snapshot back to the working tree.
    pub fn write(&mut self, snapshot: &RegistrationSnapshot) -> SyncResult<()> {
        if self.state != StoreState::Ready {
            return Err(self.out_of_order("write"));
        }
        self.repository().save(snapshot)?;
        self.state = StoreState::Dirty;
        Ok(())
    }

    /// Stages, commits and pushes the changed snapshot files.
    ///
    /// # Errors
    /// - `PublishRejected` when the remote refuses a non-fast-forward push.
    /// - `Publish` for every other staging/commit/push failure.
    pub fn publish(&mut self) -> SyncResult<()> {
        if self.state != StoreState::Dirty {
            return Err(self.out_of_order("publish"));
        }

        let started_at = Instant::now();
        let ledger = format!("{}/ledger.json", self.data_subpath);
        let roster = format!("{}/participants.json", self.data_subpath);

        let result = self
            .workspace
            .add(&[ledger.as_str(), roster.as_str()])
            .and_then(|()| self.workspace.commit(PUBLISH_COMMIT_MESSAGE))
            .and_then(|()| self.workspace.push(&self.branch));

        match result {
            Ok(()) => {
                self.state = StoreState::Published;
                info!(
                    "event=sync_publish module=sync status=ok branch={} duration_ms={}",
                    self.branch,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(GitError::RejectedPush(detail)) => {
                info!(
                    "event=sync_publish module=sync status=rejected branch={} duration_ms={}",
                    self.branch,
                    started_at.elapsed().as_millis()
                );
                Err(SyncError::PublishRejected(detail))
            }
            Err(err) => {
                error!(
                    "event=sync_publish module=sync status=error branch={} duration_ms={} error={err}",
                    self.branch,
                    started_at.elapsed().as_millis()
                );
                Err(SyncError::Publish(err))
            }
        }
    }

    /// Returns the HEAD commit of the current working copy.
    pub fn head_commit(&self) -> SyncResult<String> {
        self.workspace.head_commit().map_err(SyncError::Fetch)
    }

    fn repository(&self) -> FileSnapshotRepository {
        FileSnapshotRepository::new(self.workspace.workdir().join(&self.data_subpath))
    }

    fn out_of_order(&self, operation: &'static str) -> SyncError {
        SyncError::OutOfOrder {
            operation,
            state: self.state.name(),
        }
    }
}
