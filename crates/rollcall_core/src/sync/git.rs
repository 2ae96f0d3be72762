//! Subprocess wrapper over the `git` binary.
//!
//! # Responsibility
//! - Run the clone/add/commit/push plumbing for the synchronized store.
//! - Carry the failing subcommand and stderr in every error.
//!
//! # Invariants
//! - The access token never appears in logs or error text.
//! - A rejected non-fast-forward push is distinguished from other push
//!   failures so the caller can re-fetch and retry.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::Command;

const COMMIT_AUTHOR_NAME: &str = "rollcall";
const COMMIT_AUTHOR_EMAIL: &str = "rollcall@noreply.local";

pub type GitResult<T> = Result<T, GitError>;

/// Errors from git subprocess invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitError {
    /// `git` is not available on PATH.
    GitUnavailable,
    /// A subcommand failed for a reason other than a rejected push.
    Command { action: &'static str, detail: String },
    /// The remote advanced since the last fetch and refused the push.
    RejectedPush(String),
}

impl Display for GitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GitUnavailable => write!(f, "git is not available on PATH"),
            Self::Command { action, detail } => write!(f, "git {action} failed: {detail}"),
            Self::RejectedPush(detail) => {
                write!(f, "push rejected as non-fast-forward: {detail}")
            }
        }
    }
}

impl Error for GitError {}

/// One session-owned git working copy of the remote branch.
pub struct GitWorkspace {
    workdir: PathBuf,
}

impl GitWorkspace {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Checks that the `git` binary can be invoked at all.
    pub fn ensure_available() -> GitResult<()> {
        Command::new("git")
            .arg("--version")
            .output()
            .map_err(|_| GitError::GitUnavailable)?;
        Ok(())
    }

    /// Discards any stale working copy and clones the designated branch.
    pub fn fresh_clone(&self, remote_url: &str, branch: &str) -> GitResult<()> {
        if self.workdir.exists() {
            std::fs::remove_dir_all(&self.workdir).map_err(|err| GitError::Command {
                action: "clone",
                detail: format!("failed to discard stale working copy: {err}"),
            })?;
        }

        let workdir = self.workdir.to_str().ok_or_else(|| GitError::Command {
            action: "clone",
            detail: "working copy path is not valid UTF-8".to_string(),
        })?;

        run_git(
            "clone",
            None,
            &[
                "clone",
                "--branch",
                branch,
                "--single-branch",
                remote_url,
                workdir,
            ],
        )
    }

    /// Stages the given paths (relative to the working copy).
    pub fn add(&self, paths: &[&str]) -> GitResult<()> {
        let mut args = vec!["add", "--"];
        args.extend_from_slice(paths);
        run_git("add", Some(&self.workdir), &args)
    }

    /// Commits staged changes with a fixed author identity.
    pub fn commit(&self, message: &str) -> GitResult<()> {
        let author_name = format!("user.name={COMMIT_AUTHOR_NAME}");
        let author_email = format!("user.email={COMMIT_AUTHOR_EMAIL}");
        run_git(
            "commit",
            Some(&self.workdir),
            &[
                "-c",
                &author_name,
                "-c",
                &author_email,
                "commit",
                "-m",
                message,
            ],
        )
    }

    /// Pushes the local branch to the remote.
    ///
    /// # Errors
    /// - `RejectedPush` when the remote refuses a non-fast-forward update.
    /// - `Command` for every other failure.
    pub fn push(&self, branch: &str) -> GitResult<()> {
        match run_git("push", Some(&self.workdir), &["push", "origin", branch]) {
            Err(GitError::Command { detail, .. }) if is_non_fast_forward(&detail) => {
                Err(GitError::RejectedPush(detail))
            }
            other => other,
        }
    }

    /// Returns the current HEAD commit id of the working copy.
    pub fn head_commit(&self) -> GitResult<String> {
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(&self.workdir)
            .output()
            .map_err(|err| GitError::Command {
                action: "rev-parse",
                detail: err.to_string(),
            })?;
        if !output.status.success() {
            return Err(GitError::Command {
                action: "rev-parse",
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Splices an access token into an `https://` remote URL.
///
/// A `None` token leaves the URL untouched (anonymous access). Non-https
/// remotes (ssh, `file://`, local paths) are also left untouched.
pub fn authenticated_url(remote_url: &str, token: Option<&str>) -> String {
    match token {
        Some(token) if !token.is_empty() => match remote_url.strip_prefix("https://") {
            Some(rest) => format!("https://{token}@{rest}"),
            None => remote_url.to_string(),
        },
        _ => remote_url.to_string(),
    }
}

fn run_git(action: &'static str, cwd: Option<&Path>, args: &[&str]) -> GitResult<()> {
    let mut command = Command::new("git");
    command.args(args);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let output = command.output().map_err(|err| GitError::Command {
        action,
        detail: err.to_string(),
    })?;

    if !output.status.success() {
        return Err(GitError::Command {
            action,
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

fn is_non_fast_forward(stderr: &str) -> bool {
    stderr.contains("non-fast-forward")
        || stderr.contains("fetch first")
        || stderr.contains("[rejected]")
}
