//! The planting session.
//!
//! A [`Locker`] wraps one local working copy of the evidence locker for
//! the duration of one planting run. Metadata indexing is a pluggable
//! [`Indexer`] strategy rather than an override point, and the session
//! is driven through [`Locker::run`], which checks in on every exit
//! path and pushes only when a remote-with-credentials URL is
//! configured.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, SecondsFormat, Utc};
use tracing::error;
use url::Url;

use crate::config::GitSettings;
use crate::error::{PlantError, PlantResult};
use crate::evidence::Evidence;
use crate::fsutil::{atomic_write, ensure_parent};
use crate::git::LockerRepo;
use crate::index::{CategoryIndex, IndexEntry};
use crate::lock::SessionLock;

/// How long `add_evidence` waits for the session lock.
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything an [`Indexer`] may read about the current session.
pub struct IndexContext<'a> {
    /// Root of the local working copy.
    pub root: &'a Path,
    /// Committer email, recorded as `planted_by`.
    pub committer: &'a str,
    /// Session commit timestamp, recorded as `last_update`.
    pub commit_date: &'a str,
}

/// What one indexing step produced.
pub struct IndexOutcome {
    /// Locker-relative paths to stage for the session commit.
    pub staged: Vec<PathBuf>,
    /// Locker-relative path recorded in the planted list.
    pub planted: String,
}

/// Pluggable metadata indexing strategy.
pub trait Indexer {
    /// Record metadata for one evidence item and name the paths to
    /// stage alongside it.
    fn index(&self, ctx: &IndexContext<'_>, evidence: &Evidence) -> PlantResult<IndexOutcome>;
}

/// Default indexer: one flat JSON index per category at
/// `external/<category>/index.json`, upserted last-plant-wins.
pub struct ExternalIndexer;

impl Indexer for ExternalIndexer {
    fn index(&self, ctx: &IndexContext<'_>, evidence: &Evidence) -> PlantResult<IndexOutcome> {
        let index_path = ctx.root.join(evidence.index_rel_path());
        let mut index = CategoryIndex::load(&index_path)?;
        index.upsert(
            evidence.name(),
            IndexEntry {
                last_update: ctx.commit_date.to_string(),
                ttl: evidence.ttl(),
                planted_by: ctx.committer.to_string(),
                description: evidence.description().to_string(),
            },
        );
        index.save(&index_path)?;

        Ok(IndexOutcome {
            staged: vec![evidence.index_rel_path(), evidence.rel_path()],
            planted: evidence.rel_path().display().to_string(),
        })
    }
}

/// Session lifecycle. No operations are valid once `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Finalizing,
    Closed,
}

/// How a session reaches the locker repository.
pub struct LockerOptions {
    /// Locker name; names the clone directory under the system temp dir.
    pub name: String,
    /// Public URL of the locker repository.
    pub repo_url: Url,
    /// Remote URL with embedded credentials. `None` in dry-run mode,
    /// which disables pushing entirely.
    pub push_url: Option<Url>,
    /// Git configuration applied to the working copy at open.
    pub git_settings: Option<GitSettings>,
    /// Existing local clone to reuse instead of cloning fresh.
    pub repo_path: Option<PathBuf>,
}

/// One planting session against a local locker clone.
pub struct Locker {
    repo: LockerRepo,
    indexer: Box<dyn Indexer>,
    push_url: Option<Url>,
    planted: Vec<String>,
    commit_date: String,
    state: SessionState,
}

impl Locker {
    /// Open a session with the default [`ExternalIndexer`].
    ///
    /// Reuses `repo_path` when given; otherwise clones the locker into
    /// `<temp dir>/<name>`, with credentials when a push URL is set.
    pub fn open(options: LockerOptions) -> PlantResult<Self> {
        Self::with_indexer(options, Box::new(ExternalIndexer))
    }

    /// Open a session with a custom indexing strategy.
    pub fn with_indexer(options: LockerOptions, indexer: Box<dyn Indexer>) -> PlantResult<Self> {
        let repo = match options.repo_path {
            Some(ref path) => LockerRepo::open(path)?,
            None => {
                let clone_url = options.push_url.as_ref().unwrap_or(&options.repo_url);
                LockerRepo::clone(clone_url, &env::temp_dir().join(&options.name))?
            }
        };

        if let Some(ref settings) = options.git_settings {
            repo.apply_settings(settings)?;
        }

        Ok(Self {
            repo,
            indexer,
            push_url: options.push_url,
            planted: Vec::new(),
            commit_date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            state: SessionState::Open,
        })
    }

    /// Root of the local working copy.
    pub fn local_path(&self) -> &Path {
        self.repo.root()
    }

    /// Paths planted so far this session, in planting order.
    pub fn planted(&self) -> &[String] {
        &self.planted
    }

    /// Plant one evidence item: write its content into the working
    /// copy, index its metadata, and stage both for the session commit.
    ///
    /// The whole sequence runs under the session lock; two sessions
    /// against the same clone would otherwise race on the category
    /// index and the git index.
    pub fn add_evidence(&mut self, evidence: &Evidence) -> PlantResult<()> {
        if self.state != SessionState::Open {
            return Err(PlantError::SessionClosed);
        }
        let _lock = SessionLock::acquire(self.repo.git_dir(), LOCK_TIMEOUT)?;

        let dest = self.repo.root().join(evidence.rel_path());
        ensure_parent(&dest)?;
        atomic_write(&dest, evidence.content())?;

        let committer = self.repo.committer_email()?;
        let ctx = IndexContext {
            root: self.repo.root(),
            committer: &committer,
            commit_date: &self.commit_date,
        };
        let outcome = self.indexer.index(&ctx, evidence)?;

        self.repo.stage(&outcome.staged)?;
        self.planted.push(outcome.planted);
        Ok(())
    }

    /// Drive a planting closure, then finalize on every exit path.
    ///
    /// Whatever the closure managed to plant is always checked in; the
    /// push follows only when a remote-with-credentials URL is
    /// configured. A failure from the closure is logged, the partial
    /// progress still committed, and the failure returned to the caller
    /// afterward. A finalize failure surfaces only when the closure
    /// itself succeeded.
    pub fn run<T>(mut self, op: impl FnOnce(&mut Self) -> PlantResult<T>) -> PlantResult<T> {
        let outcome = op(&mut self);
        if let Err(ref err) = outcome {
            error!("planting failed: {err}");
        }

        let finalized = self.finalize();
        match (outcome, finalized) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(finalize_err)) => {
                error!("finalize failed after planting failure: {finalize_err}");
                Err(err)
            }
        }
    }

    /// Check the session in and push if configured.
    fn finalize(&mut self) -> PlantResult<()> {
        self.state = SessionState::Finalizing;
        let message = self.commit_message();
        self.repo.checkin(&message)?;
        if let Some(ref url) = self.push_url {
            self.repo.push(url)?;
        }
        self.state = SessionState::Closed;
        Ok(())
    }

    /// Header with the local exit time, a blank line, then the planted
    /// paths newline-joined in planting order.
    fn commit_message(&self) -> String {
        format!(
            "Planted external evidence at local time {}\n\n{}",
            Local::now().format("%a %b %e %H:%M:%S %Y"),
            self.planted.join("\n"),
        )
    }
}
