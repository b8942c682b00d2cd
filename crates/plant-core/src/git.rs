//! Git collaborator for the evidence locker.
//!
//! A thin wrapper over libgit2 covering exactly the operations one
//! planting session needs: clone or open a local working copy, read and
//! write repository configuration, stage files, check in, and push.
//! There is no retry logic and no protocol code of our own.

use std::path::{Path, PathBuf};

use git2::build::RepoBuilder;
use git2::{Cred, ErrorCode, FetchOptions, PushOptions, RemoteCallbacks, Repository};
use tracing::{debug, info};
use url::Url;

use crate::config::GitSettings;
use crate::error::{PlantError, PlantResult};

/// An open local working copy of the evidence locker.
pub struct LockerRepo {
    repo: Repository,
    root: PathBuf,
}

impl LockerRepo {
    /// Clone the locker repository into `path`.
    ///
    /// Credentials embedded in the URL are honored; without them the
    /// clone is anonymous.
    pub fn clone(url: &Url, path: &Path) -> PlantResult<Self> {
        info!(url = %without_password(url), path = %path.display(), "cloning evidence locker");
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(auth_callbacks(url));
        let repo = RepoBuilder::new()
            .fetch_options(fetch)
            .clone(url.as_str(), path)?;
        Self::from_repo(repo)
    }

    /// Open an existing local clone of the locker.
    pub fn open(path: &Path) -> PlantResult<Self> {
        let repo = Repository::open(path)?;
        Self::from_repo(repo)
    }

    fn from_repo(repo: Repository) -> PlantResult<Self> {
        let root = repo
            .workdir()
            .ok_or(PlantError::NoWorkTree)?
            .to_path_buf();
        Ok(Self { repo, root })
    }

    /// Root of the working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.git` directory of the working copy.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Committer identity from the repository configuration.
    pub fn committer_email(&self) -> PlantResult<String> {
        let config = self.repo.config()?.snapshot()?;
        match config.get_str("user.email") {
            Ok(email) => Ok(email.to_string()),
            Err(e) if e.code() == ErrorCode::NotFound => Err(PlantError::MissingIdentity),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply nested git settings (commit signing and the like) to this
    /// clone's configuration.
    pub fn apply_settings(&self, settings: &GitSettings) -> PlantResult<()> {
        let mut config = self.repo.config()?;
        for (key, value) in settings.entries()? {
            debug!(%key, "applying git config");
            config.set_str(&key, &value)?;
        }
        Ok(())
    }

    /// Stage locker-relative paths into the git index.
    pub fn stage(&self, rel_paths: &[PathBuf]) -> PlantResult<()> {
        let mut index = self.repo.index()?;
        for rel in rel_paths {
            index.add_path(rel)?;
        }
        index.write()?;
        Ok(())
    }

    /// Commit the staged index to HEAD.
    ///
    /// The commit is created even when nothing is staged; a planting
    /// session records its exit unconditionally.
    pub fn checkin(&self, message: &str) -> PlantResult<()> {
        let mut index = self.repo.index()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        let sig = self.repo.signature().map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                PlantError::MissingIdentity
            } else {
                PlantError::Git(e)
            }
        })?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                None
            }
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        info!(commit = %oid, "checked in");
        Ok(())
    }

    /// Push the current branch to the remote-with-credentials URL.
    pub fn push(&self, url: &Url) -> PlantResult<()> {
        let head = self.repo.head()?;
        let branch = head
            .shorthand()
            .ok_or_else(|| PlantError::Git(git2::Error::from_str("HEAD is not a branch")))?;
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");

        let mut remote = self.repo.remote_anonymous(url.as_str())?;
        let mut options = PushOptions::new();
        options.remote_callbacks(auth_callbacks(url));
        remote.push(&[refspec.as_str()], Some(&mut options))?;
        info!(%branch, "pushed to remote locker");
        Ok(())
    }
}

/// Remote callbacks answering credential challenges from the URL's
/// embedded userinfo, falling back to libgit2's defaults.
fn auth_callbacks(url: &Url) -> RemoteCallbacks<'static> {
    let username = url.username().to_string();
    let password = url.password().map(str::to_string);

    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, username_from_url, _allowed| {
        match (password.as_deref(), username_from_url) {
            (Some(pass), _) if !username.is_empty() => Cred::userpass_plaintext(&username, pass),
            (Some(pass), Some(user)) => Cred::userpass_plaintext(user, pass),
            _ => Cred::default(),
        }
    });
    callbacks
}

/// Copy of the URL safe for log output.
fn without_password(url: &Url) -> Url {
    let mut clean = url.clone();
    let _ = clean.set_password(None);
    clean
}
