// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version control collaborator.
//!
//! The store is synchronized with a remote through an external version
//! control binary. Dots never speaks the protocol itself. It only hands the
//! binary an argument list and a working directory, then branches on exit
//! status or captured output.
//!
//! # Interactive vs Non-Interactive Calls
//!
//! Calls that talk to a remote (push, pull, clone) inherit the standard
//! streams of the current process, so the user sees progress and can answer
//! credential prompts. Everything else is captured. Captured output is needed
//! to make decisions, e.g., an empty `status --porcelain` means there is
//! nothing to commit.

use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::{Command, Stdio},
};
use tracing::{debug, instrument};

/// Name of remote that dots pushes to and pulls from.
pub const REMOTE: &str = "origin";

/// Operations dots needs from a version control system.
///
/// Every method receives the repository to operate on explicitly. The only
/// exception is [`VersionControl::clone_repo`] whose destination does not
/// exist yet.
pub trait VersionControl {
    /// Initialize new repository.
    fn init(&self, repo: &Path) -> Result<()>;

    /// Stage every change, including deletions.
    fn stage_all(&self, repo: &Path) -> Result<()>;

    /// Commit staged changes.
    fn commit(&self, repo: &Path, message: &str) -> Result<()>;

    /// Push current branch to remote.
    fn push(&self, repo: &Path) -> Result<()>;

    /// Pull current branch from remote.
    fn pull(&self, repo: &Path) -> Result<()>;

    /// Stash uncommitted changes.
    fn stash_push(&self, repo: &Path, message: &str) -> Result<()>;

    /// Restore most recently stashed changes.
    fn stash_pop(&self, repo: &Path) -> Result<()>;

    /// URL of configured remote, if any.
    fn remote_url(&self, repo: &Path) -> Result<Option<String>>;

    /// Machine readable status. Empty means the work tree is clean.
    fn status_porcelain(&self, repo: &Path) -> Result<String>;

    /// Clone remote repository into destination.
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Version control through the Git binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: OsString,
}

impl GitCli {
    /// Use Git binary found through `$PATH`.
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Use a specific binary.
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn gitcall_interactive(
        &self,
        repo: Option<&Path>,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> Result<()> {
        syscall_interactive(&self.program, repo, args)
    }

    fn gitcall_non_interactive(
        &self,
        repo: Option<&Path>,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> Result<String> {
        syscall_non_interactive(&self.program, repo, args)
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionControl for GitCli {
    fn init(&self, repo: &Path) -> Result<()> {
        self.gitcall_non_interactive(Some(repo), ["init"]).map(drop)
    }

    fn stage_all(&self, repo: &Path) -> Result<()> {
        self.gitcall_non_interactive(Some(repo), ["add", "-A"]).map(drop)
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<()> {
        self.gitcall_non_interactive(Some(repo), ["commit", "-m", message])
            .map(drop)
    }

    fn push(&self, repo: &Path) -> Result<()> {
        self.gitcall_interactive(Some(repo), ["push"])
    }

    fn pull(&self, repo: &Path) -> Result<()> {
        self.gitcall_interactive(Some(repo), ["pull"])
    }

    fn stash_push(&self, repo: &Path, message: &str) -> Result<()> {
        self.gitcall_non_interactive(Some(repo), ["stash", "push", "-m", message])
            .map(drop)
    }

    fn stash_pop(&self, repo: &Path) -> Result<()> {
        self.gitcall_non_interactive(Some(repo), ["stash", "pop"])
            .map(drop)
    }

    #[instrument(skip(self), level = "debug")]
    fn remote_url(&self, repo: &Path) -> Result<Option<String>> {
        match self.gitcall_non_interactive(Some(repo), ["remote", "get-url", REMOTE]) {
            Ok(url) if url.trim().is_empty() => Ok(None),
            Ok(url) => Ok(Some(url.trim().to_string())),
            // INVARIANT: Git exits non-zero when the remote does not exist.
            Err(VcsError::Failed { message, .. }) => {
                debug!("no remote {REMOTE:?}: {message}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn status_porcelain(&self, repo: &Path) -> Result<String> {
        self.gitcall_non_interactive(Some(repo), ["status", "--porcelain"])
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        self.gitcall_interactive(None, [OsStr::new("clone"), OsStr::new(url), dest.as_os_str()])
    }
}

fn syscall_interactive(
    cmd: impl AsRef<OsStr>,
    cwd: Option<&Path>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<()> {
    let mut command = Command::new(cmd.as_ref());
    command.args(args);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    debug!("run interactive {command:?}");
    let status = command
        .status()
        .map_err(|err| VcsError::Spawn {
            source: err,
            program: cmd.as_ref().to_string_lossy().into_owned(),
        })?;

    if !status.success() {
        return Err(VcsError::Failed {
            command: format!("{command:?}"),
            message: status.to_string(),
        });
    }

    Ok(())
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    cwd: Option<&Path>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let mut command = Command::new(cmd.as_ref());
    command.args(args).stdin(Stdio::null());
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    debug!("run non-interactive {command:?}");
    let output = command.output().map_err(|err| VcsError::Spawn {
        source: err,
        program: cmd.as_ref().to_string_lossy().into_owned(),
    })?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();

    if !output.status.success() {
        let mut message = format!("{}", output.status);
        if !stdout.is_empty() {
            message.push_str(format!("\nstdout: {stdout}").as_str());
        }

        if !stderr.is_empty() {
            message.push_str(format!("\nstderr: {stderr}").as_str());
        }

        // INVARIANT: Chomp trailing newlines.
        let message = message.trim_end().to_string();

        return Err(VcsError::Failed {
            command: format!("{command:?}"),
            message,
        });
    }

    Ok(stdout)
}

/// Version control error types.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// Binary could not be started at all.
    #[error("failed to run {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: String,
    },

    /// Binary ran but reported failure.
    #[error("command {command} failed: {message}")]
    Failed { command: String, message: String },
}

/// Friendly result alias :3
pub type Result<T, E = VcsError> = std::result::Result<T, E>;
