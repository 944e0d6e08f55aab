// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Store management and manipulation.
//!
//! Dots keeps every tracked dotfile in one place called the __store__. A
//! tracked entry is moved into the store, and its original location is
//! replaced with a symlink pointing back at it. The store itself is a Git
//! repository, so it can be synchronized with a remote.
//!
//! # Store Layout
//!
//! The store always lives at `$HOME/.config/dots`. Tracked entries inside it
//! mirror their position relative to the home directory, e.g.,
//! `~/.config/nvim` is stored at `$HOME/.config/dots/.config/nvim`. Entries
//! that came from outside the home directory are stored flat by base name.
//!
//! Besides tracked entries the store contains the `.git` metadata directory,
//! an ignore pattern file `.gitignore`, a `README.md`, and an optional
//! preference file `dots.toml`. None of these are ever treated as tracked
//! entries.
//!
//! # Pipeline
//!
//! Every command follows the same shape: resolve a name into a
//! [`Resolution`], act on it through the [`Transplanter`] or [`Auditor`], and
//! report back. None of these components call each other.
//!
//! # See Also
//!
//! 1. [`resolve`]
//! 2. [`transplant`]
//! 3. [`audit`]

pub mod audit;
pub mod resolve;
pub mod transplant;
pub mod walk;

pub use audit::{AuditRecord, AuditReport, Auditor, LinkStatus};
pub use resolve::{Resolution, Resolver};
pub use transplant::{Commit, LinkOutcome, Revert, Transplanter};
pub use walk::{EntryKind, StoreEntry, StoreWalk};

use crate::{
    config::{ConfigError, Layout, IGNORE_FILE, README_FILE},
    editor::{Editor, EditorError},
    path::{legacy_store_dir_in, NoWayHome},
    vcs::{GitCli, VcsError, VersionControl},
};

use chrono::Local;
use std::{
    fs::{symlink_metadata, write, OpenOptions},
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Commit message of the first commit in a fresh store.
pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit: dots setup";

/// Stash message used to park uncommitted changes during pull.
pub const AUTO_STASH_MESSAGE: &str = "Auto-stash before pull";

const DEFAULT_IGNORE: &str = "\
# Backup files
*.backup
*.bak
*.swp
*.tmp

# OS files
.DS_Store
Thumbs.db

# Editor files
.vscode/
.idea/
*.sublime-*
";

const DEFAULT_README: &str = "\
# Dotfiles

Personal dotfiles managed with dots.

## Setup

Clone this repository on a new machine and link what you need:

```sh
dots clone <repository-url>
dots link .bashrc
dots link nvim
```

Or link everything at once with `dots link --all`.

## Tracked Files

Everything in this directory except `.git`, `.gitignore`, `README.md`, and
`dots.toml` is a tracked dotfile.
";

/// The store of tracked dotfiles.
///
/// Binds a [`Layout`] to a [`VersionControl`] collaborator. All filesystem
/// work is delegated to [`Resolver`], [`Transplanter`], and [`Auditor`].
#[derive(Debug)]
pub struct Store<V = GitCli>
where
    V: VersionControl,
{
    layout: Layout,
    vcs: V,
}

impl Store<GitCli> {
    /// Open store of given layout through the Git binary.
    pub fn open(layout: Layout) -> Self {
        Self::new(layout, GitCli::new())
    }

    /// Open store of current user through the Git binary.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NoWayHome`] if home directory path cannot be
    ///   determined.
    pub fn open_default() -> Result<Self> {
        Ok(Self::open(Layout::try_default()?))
    }
}

impl<V> Store<V>
where
    V: VersionControl,
{
    /// Construct new store handle.
    ///
    /// Does not touch the filesystem, except to warn about a leftover store
    /// at the old hidden location.
    pub fn new(layout: Layout, vcs: V) -> Self {
        let legacy = legacy_store_dir_in(layout.home());
        if legacy.exists() {
            warn!(
                "ignoring old store location {:?}, dots only uses {:?}",
                legacy.display(),
                layout.store_root().display()
            );
        }

        Self { layout, vcs }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.layout)
    }

    pub fn transplanter(&self) -> Transplanter<'_> {
        Transplanter::new(&self.layout)
    }

    pub fn auditor(&self) -> Auditor<'_> {
        Auditor::new(&self.layout)
    }

    /// Check if store directory exists.
    pub fn is_initialized(&self) -> bool {
        self.layout.store_root().is_dir()
    }

    /// Initialize new store.
    ///
    /// Creates the store directory, writes default ignore file and readme,
    /// initializes a repository, and commits everything as the initial
    /// commit.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::AlreadyExists`] if the store already exists.
    /// - Return [`StoreError::Filesystem`] if files cannot be written.
    /// - Return [`StoreError::Vcs`] if version control calls fail.
    #[instrument(skip(self), level = "debug")]
    pub fn init(&self) -> Result<()> {
        let root = self.layout.store_root();
        if symlink_metadata(root).is_ok() {
            return Err(StoreError::AlreadyExists {
                path: root.to_path_buf(),
            });
        }

        mkdirp::mkdirp(root).map_err(fs_err("create directory", root))?;
        info!("created store at {:?}", root.display());

        for (name, content) in [(IGNORE_FILE, DEFAULT_IGNORE), (README_FILE, DEFAULT_README)] {
            let path = root.join(name);
            write(&path, content).map_err(fs_err("write", &path))?;
            info!("wrote {name}");
        }

        self.vcs.init(root)?;
        self.vcs.stage_all(root)?;
        self.vcs.commit(root, INITIAL_COMMIT_MESSAGE)?;
        info!("initialized repository with initial commit");

        Ok(())
    }

    /// Start tracking a file or directory.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotInitialized`] if the store does not exist.
    /// - Return any error of [`Resolver::placement`] or
    ///   [`Transplanter::commit`].
    #[instrument(skip(self, source), level = "debug")]
    pub fn add(&self, source: impl AsRef<Path>) -> Result<Commit> {
        self.require_initialized()?;
        let resolution = self.resolver().placement(source)?;
        self.transplanter().commit(&resolution)
    }

    /// Stop tracking an entry and restore it to its original location.
    ///
    /// # Errors
    ///
    /// - Return any error of [`Resolver::resolve`] or
    ///   [`Transplanter::revert`].
    #[instrument(skip(self, name), level = "debug")]
    pub fn remove(&self, name: impl AsRef<Path>) -> Result<Revert> {
        let resolution = self.resolver().resolve(name)?;
        self.transplanter().revert(&resolution)
    }

    /// Link tracked entry back to its original location.
    ///
    /// # Errors
    ///
    /// - Return any error of [`Resolver::resolve`] or
    ///   [`Transplanter::link`].
    #[instrument(skip(self, name), level = "debug")]
    pub fn link(&self, name: impl AsRef<Path>) -> Result<LinkOutcome> {
        let resolution = self.resolver().resolve(name)?;
        self.transplanter().link(&resolution)
    }

    /// Link every tracked entry whose link is missing.
    ///
    /// # Errors
    ///
    /// - Return any error of [`Auditor::audit`] or [`Transplanter::link`].
    #[instrument(skip(self), level = "debug")]
    pub fn link_all(&self) -> Result<Vec<(Resolution, LinkOutcome)>> {
        let report = self.auditor().audit()?;
        let transplanter = self.transplanter();
        let mut outcomes = Vec::new();
        for record in report.records {
            if record.status != LinkStatus::Missing {
                continue;
            }

            let resolution = Resolution {
                store_path: record.store_path,
                original_path: record.original_path,
            };
            let outcome = transplanter.link(&resolution)?;
            outcomes.push((resolution, outcome));
        }

        if outcomes.is_empty() {
            info!("nothing to link");
        }

        Ok(outcomes)
    }

    /// Locate tracked entry inside the store.
    ///
    /// # Errors
    ///
    /// - Return any error of [`Resolver::resolve`].
    pub fn locate(&self, name: impl AsRef<Path>) -> Result<PathBuf> {
        Ok(self.resolver().resolve(name)?.store_path)
    }

    /// Open tracked entry in editor.
    ///
    /// # Errors
    ///
    /// - Return any error of [`Resolver::resolve`].
    /// - Return [`StoreError::Editor`] if the editor fails.
    #[instrument(skip(self, name, editor), level = "debug")]
    pub fn edit(&self, name: impl AsRef<Path>, editor: &Editor) -> Result<()> {
        let path = self.locate(name)?;
        editor.open(&path)?;
        Ok(())
    }

    /// Audit the symlink of every tracked entry.
    ///
    /// # Errors
    ///
    /// - Return any error of [`Auditor::audit`].
    pub fn status(&self) -> Result<AuditReport> {
        self.auditor().audit()
    }

    /// Scaffold nested directory under the `.config` subtree of the store.
    ///
    /// Leading separators of the relative path are ignored. Returns the full
    /// path and whether it had to be created.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::InvalidPath`] if the path is empty or tries to
    ///   climb out with `..`.
    /// - Return [`StoreError::NotInitialized`] if the store does not exist.
    /// - Return [`StoreError::Filesystem`] if directories cannot be created.
    #[instrument(skip(self, relative), level = "debug")]
    pub fn setup(&self, relative: impl AsRef<Path>) -> Result<(PathBuf, bool)> {
        let cleaned = store_relative(relative.as_ref())?;

        self.require_initialized()?;
        let path = self.layout.store_root().join(".config").join(cleaned);
        let created = mkdirp::mkdirp(&path)
            .map_err(fs_err("create directory", &path))?
            .is_some();

        if created {
            info!("set up {:?}", path.display());
        } else {
            info!("directory already exists: {:?}", path.display());
        }

        Ok((path, created))
    }

    /// Create new empty dotfile inside the store.
    ///
    /// The name is taken relative to the store root, missing parent
    /// directories are created. Nothing is linked, use [`Store::link`] for
    /// that once the file has content.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::InvalidPath`] if the name is empty or tries to
    ///   climb out with `..`.
    /// - Return [`StoreError::SelfReference`] if the name points at store
    ///   metadata.
    /// - Return [`StoreError::NotInitialized`] if the store does not exist.
    /// - Return [`StoreError::AlreadyExists`] if the file already exists.
    /// - Return [`StoreError::Filesystem`] if the file cannot be created.
    #[instrument(skip(self, name), level = "debug")]
    pub fn create(&self, name: impl AsRef<Path>) -> Result<PathBuf> {
        let relative = store_relative(name.as_ref())?;
        let path = self.layout.store_root().join(&relative);
        if walk::is_excluded(&relative) {
            return Err(StoreError::SelfReference { path });
        }

        self.require_initialized()?;
        if let Some(parent) = path.parent() {
            mkdirp::mkdirp(parent).map_err(fs_err("create directory", parent))?;
        }

        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| match err.kind() {
                ErrorKind::AlreadyExists => StoreError::AlreadyExists { path: path.clone() },
                _ => fs_err("create", &path)(err),
            })?;
        info!("created file {:?}", path.display());

        Ok(path)
    }

    /// List tracked entries at the top-level of the store.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotInitialized`] if the store does not exist.
    /// - Return [`StoreError::Filesystem`] if the store cannot be read.
    pub fn list_entries(&self) -> Result<Vec<StoreEntry>> {
        self.require_initialized()?;
        let mut walk = StoreWalk::new(self.layout.store_root());
        let mut entries = Vec::new();
        while let Some(entry) = walk.next() {
            walk.skip_current_dir();
            entries.push(entry?);
        }

        Ok(entries)
    }

    /// Commit every change in the store and push it.
    ///
    /// Without a message, the `commit_message` preference is used, and
    /// without that a timestamped message is generated. If no remote is
    /// configured the changes are only committed locally.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotInitialized`] or
    ///   [`StoreError::NotRepository`] if the store is not ready.
    /// - Return [`StoreError::Config`] if the preference file is malformed.
    /// - Return [`StoreError::Vcs`] if version control calls fail.
    #[instrument(skip(self), level = "debug")]
    pub fn sync(&self, message: Option<String>) -> Result<SyncOutcome> {
        self.require_repository()?;
        let root = self.layout.store_root();

        if !self.is_dirty()? {
            info!("no changes to sync");
            return Ok(SyncOutcome::UpToDate);
        }

        self.vcs.stage_all(root)?;
        let message = match message.filter(|message| !message.trim().is_empty()) {
            Some(message) => message,
            None => self
                .layout
                .load_config()?
                .settings
                .commit_message
                .unwrap_or_else(default_commit_message),
        };
        info!("commit with message {message:?}");
        self.vcs.commit(root, &message)?;

        let Some(url) = self.vcs.remote_url(root)? else {
            warn!(
                "no remote repository configured, changes were committed locally only. Add one with `git -C {:?} remote add origin <url>`",
                root.display()
            );
            return Ok(SyncOutcome::Committed);
        };

        info!("push to {url}");
        self.vcs.push(root)?;

        Ok(SyncOutcome::Pushed { url })
    }

    /// Push already committed changes.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotInitialized`] or
    ///   [`StoreError::NotRepository`] if the store is not ready.
    /// - Return [`StoreError::NoRemoteConfigured`] if there is no remote.
    /// - Return [`StoreError::UncommittedChanges`] if the store is dirty.
    /// - Return [`StoreError::Vcs`] if version control calls fail.
    #[instrument(skip(self), level = "debug")]
    pub fn push(&self) -> Result<()> {
        self.require_repository()?;
        let url = self.require_remote()?;
        if self.is_dirty()? {
            return Err(StoreError::UncommittedChanges {
                store_root: self.layout.store_root().to_path_buf(),
            });
        }

        info!("push to {url}");
        self.vcs.push(self.layout.store_root())?;

        Ok(())
    }

    /// Pull latest changes from remote.
    ///
    /// Uncommitted changes are stashed before the pull and restored after it,
    /// even when the pull itself fails. Failing to restore them is only
    /// reported as a warning.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotInitialized`] or
    ///   [`StoreError::NotRepository`] if the store is not ready.
    /// - Return [`StoreError::NoRemoteConfigured`] if there is no remote.
    /// - Return [`StoreError::Vcs`] if stash or pull fail.
    #[instrument(skip(self), level = "debug")]
    pub fn pull(&self) -> Result<()> {
        self.require_repository()?;
        let url = self.require_remote()?;
        let root = self.layout.store_root();

        let stashed = if self.is_dirty()? {
            warn!("stash uncommitted changes before pull");
            self.vcs.stash_push(root, AUTO_STASH_MESSAGE)?;
            true
        } else {
            false
        };

        info!("pull from {url}");
        let pulled = self.vcs.pull(root);

        if stashed {
            match self.vcs.stash_pop(root) {
                Ok(()) => info!("applied stashed changes"),
                Err(error) => warn!(
                    "failed to apply stashed changes, apply them manually with `git -C {:?} stash pop`: {error}",
                    root.display()
                ),
            }
        }

        pulled?;

        Ok(())
    }

    /// Clone existing store from remote.
    ///
    /// Returns the top-level entries that are available for linking.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::AlreadyExists`] if the store already exists.
    /// - Return [`StoreError::Vcs`] if the clone fails.
    #[instrument(skip(self), level = "debug")]
    pub fn clone_from(&self, url: &str) -> Result<Vec<StoreEntry>> {
        let root = self.layout.store_root();
        if symlink_metadata(root).is_ok() {
            return Err(StoreError::AlreadyExists {
                path: root.to_path_buf(),
            });
        }

        if let Some(parent) = root.parent() {
            mkdirp::mkdirp(parent).map_err(fs_err("create directory", parent))?;
        }

        info!("clone {url} into {:?}", root.display());
        self.vcs.clone_repo(url, root)?;

        self.list_entries()
    }

    fn require_initialized(&self) -> Result<()> {
        if !self.is_initialized() {
            return Err(StoreError::NotInitialized {
                store_root: self.layout.store_root().to_path_buf(),
            });
        }

        Ok(())
    }

    fn require_repository(&self) -> Result<()> {
        self.require_initialized()?;
        if !self.layout.vcs_dir().exists() {
            return Err(StoreError::NotRepository {
                store_root: self.layout.store_root().to_path_buf(),
            });
        }

        Ok(())
    }

    fn require_remote(&self) -> Result<String> {
        self.vcs
            .remote_url(self.layout.store_root())?
            .ok_or_else(|| StoreError::NoRemoteConfigured {
                store_root: self.layout.store_root().to_path_buf(),
            })
    }

    fn is_dirty(&self) -> Result<bool> {
        let status = self.vcs.status_porcelain(self.layout.store_root())?;
        Ok(!status.trim().is_empty())
    }
}

/// Result of synchronizing the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing changed, nothing was committed.
    UpToDate,

    /// Changes were committed, but there is no remote to push to.
    Committed,

    /// Changes were committed and pushed.
    Pushed { url: String },
}

fn default_commit_message() -> String {
    format!("Update dotfiles - {}", Local::now().format("%Y-%m-%d %H:%M:%S"))
}

/// Map I/O error into [`StoreError::Filesystem`] for given operation and path.
pub(crate) fn fs_err(
    op: &'static str,
    path: impl AsRef<Path>,
) -> impl FnOnce(std::io::Error) -> StoreError {
    let path = path.as_ref().to_path_buf();
    move |source| StoreError::Filesystem { source, op, path }
}

/// All possible error types for store interaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Home directory cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] NoWayHome),

    /// Store directory does not exist.
    #[error("store is not initialized at {:?}, run `dots init` first", store_root.display())]
    NotInitialized { store_root: PathBuf },

    /// Store directory has no version control metadata.
    #[error("store at {:?} is not a git repository, run `dots init` to initialize it", store_root.display())]
    NotRepository { store_root: PathBuf },

    /// Source path does not exist.
    #[error("{:?} does not exist", path.display())]
    NotFound { path: PathBuf },

    /// Destination is already occupied.
    #[error("{:?} already exists", path.display())]
    AlreadyExists { path: PathBuf },

    /// Name does not resolve to any tracked entry.
    #[error("{name:?} is not tracked by dots")]
    NotTracked { name: String },

    /// Path is inside the store, or the store is inside it.
    #[error("cannot operate on {:?}, it overlaps with the store", path.display())]
    SelfReference { path: PathBuf },

    /// Source is a symlink.
    #[error("{:?} is already a symlink", path.display())]
    AlreadySymlink { path: PathBuf },

    /// Symlink exists but points somewhere else.
    #[error(
        "symlink at {:?} points to {:?}, not {:?}, manual intervention required",
        link.display(),
        target.display(),
        expected.display()
    )]
    TargetMismatch {
        link: PathBuf,
        target: PathBuf,
        expected: PathBuf,
    },

    /// Something that is not a symlink sits where a symlink is expected.
    #[error("{:?} exists but is not a symlink, manual intervention required", path.display())]
    NotSymlink { path: PathBuf },

    /// Path cannot be used for the requested operation.
    #[error("invalid path {:?}", path.display())]
    InvalidPath { path: PathBuf },

    /// Store has no remote to push to or pull from.
    #[error(
        "no remote repository configured, add one with `git -C {:?} remote add origin <url>`",
        store_root.display()
    )]
    NoRemoteConfigured { store_root: PathBuf },

    /// Store has changes that are not committed.
    #[error(
        "uncommitted changes in {:?}, use `dots sync` to commit and push them",
        store_root.display()
    )]
    UncommittedChanges { store_root: PathBuf },

    /// Filesystem operation fails.
    #[error("failed to {op} {:?}", path.display())]
    Filesystem {
        #[source]
        source: std::io::Error,
        op: &'static str,
        path: PathBuf,
    },

    /// Version control call fails.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Editor call fails.
    #[error(transparent)]
    Editor(#[from] EditorError),

    /// Preference file cannot be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Clean user supplied path meant relative to the store.
///
/// Leading separators and `.` are dropped, `..` is refused.
fn store_relative(relative: &Path) -> Result<PathBuf> {
    let mut cleaned = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => cleaned.push(part),
            Component::ParentDir => {
                return Err(StoreError::InvalidPath {
                    path: relative.to_path_buf(),
                })
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => continue,
        }
    }

    if cleaned.as_os_str().is_empty() {
        return Err(StoreError::InvalidPath {
            path: relative.to_path_buf(),
        });
    }

    Ok(cleaned)
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::create_dir_all;

    #[derive(Debug, Default)]
    struct NullVcs;

    impl VersionControl for NullVcs {
        fn init(&self, _: &Path) -> crate::vcs::Result<()> {
            Ok(())
        }

        fn stage_all(&self, _: &Path) -> crate::vcs::Result<()> {
            Ok(())
        }

        fn commit(&self, _: &Path, _: &str) -> crate::vcs::Result<()> {
            Ok(())
        }

        fn push(&self, _: &Path) -> crate::vcs::Result<()> {
            Ok(())
        }

        fn pull(&self, _: &Path) -> crate::vcs::Result<()> {
            Ok(())
        }

        fn stash_push(&self, _: &Path, _: &str) -> crate::vcs::Result<()> {
            Ok(())
        }

        fn stash_pop(&self, _: &Path) -> crate::vcs::Result<()> {
            Ok(())
        }

        fn remote_url(&self, _: &Path) -> crate::vcs::Result<Option<String>> {
            Ok(None)
        }

        fn status_porcelain(&self, _: &Path) -> crate::vcs::Result<String> {
            Ok(String::new())
        }

        fn clone_repo(&self, _: &str, _: &Path) -> crate::vcs::Result<()> {
            Ok(())
        }
    }

    fn store() -> anyhow::Result<(tempfile::TempDir, Store<NullVcs>)> {
        let home = tempfile::tempdir()?;
        let store = Store::new(Layout::new(home.path()), NullVcs);
        Ok((home, store))
    }

    #[test]
    fn init_writes_meta_files() -> anyhow::Result<()> {
        let (_home, store) = store()?;
        store.init()?;

        let root = store.layout().store_root();
        assert!(root.join(IGNORE_FILE).is_file());
        assert!(root.join(README_FILE).is_file());
        assert!(store.list_entries()?.is_empty());

        Ok(())
    }

    #[test]
    fn init_twice_fails() -> anyhow::Result<()> {
        let (_home, store) = store()?;
        store.init()?;
        assert!(matches!(store.init(), Err(StoreError::AlreadyExists { .. })));

        Ok(())
    }

    #[test]
    fn setup_scaffolds_under_config_subtree() -> anyhow::Result<()> {
        let (_home, store) = store()?;
        store.init()?;

        let (path, created) = store.setup("/nvim/lua/plugins")?;
        assert_eq!(
            path,
            store.layout().store_root().join(".config/nvim/lua/plugins")
        );
        assert!(created);
        assert!(path.is_dir());

        let (_, created) = store.setup("nvim/lua/plugins")?;
        assert!(!created);

        Ok(())
    }

    #[test]
    fn setup_rejects_climbing_out() -> anyhow::Result<()> {
        let (_home, store) = store()?;
        store.init()?;
        assert!(matches!(
            store.setup("../../escape"),
            Err(StoreError::InvalidPath { .. })
        ));
        assert!(matches!(store.setup("/"), Err(StoreError::InvalidPath { .. })));

        Ok(())
    }

    #[test]
    fn setup_requires_store() -> anyhow::Result<()> {
        let (_home, store) = store()?;
        assert!(matches!(
            store.setup("nvim"),
            Err(StoreError::NotInitialized { .. })
        ));

        Ok(())
    }

    #[test]
    fn create_makes_empty_file() -> anyhow::Result<()> {
        let (_home, store) = store()?;
        store.init()?;

        let path = store.create(".config/foot/foot.ini")?;
        assert_eq!(
            path,
            store.layout().store_root().join(".config/foot/foot.ini")
        );
        assert_eq!(std::fs::read_to_string(&path)?, "");
        assert_eq!(store.locate("foot.ini")?, path);

        Ok(())
    }

    #[test]
    fn create_never_overwrites() -> anyhow::Result<()> {
        let (_home, store) = store()?;
        store.init()?;
        let path = store.create(".tmux.conf")?;
        write(&path, "set -g mouse on")?;

        assert!(matches!(
            store.create(".tmux.conf"),
            Err(StoreError::AlreadyExists { .. })
        ));
        assert_eq!(std::fs::read_to_string(&path)?, "set -g mouse on");

        Ok(())
    }

    #[test]
    fn create_refuses_bad_names() -> anyhow::Result<()> {
        let (_home, store) = store()?;
        assert!(matches!(
            store.create(".bashrc"),
            Err(StoreError::NotInitialized { .. })
        ));

        store.init()?;
        assert!(matches!(
            store.create("../.bashrc"),
            Err(StoreError::InvalidPath { .. })
        ));
        assert!(matches!(
            store.create(".git/hooks/pre-commit"),
            Err(StoreError::SelfReference { .. })
        ));
        assert!(matches!(
            store.create(README_FILE),
            Err(StoreError::SelfReference { .. })
        ));

        Ok(())
    }

    #[test]
    fn list_entries_is_top_level_only() -> anyhow::Result<()> {
        let (_home, store) = store()?;
        store.init()?;
        let root = store.layout().store_root();
        create_dir_all(root.join(".config/nvim"))?;
        write(root.join(".config/nvim/init.lua"), "-- init")?;
        write(root.join(".bashrc"), "# bashrc")?;

        let result = store
            .list_entries()?
            .into_iter()
            .map(|entry| (entry.relative, entry.kind))
            .collect::<Vec<_>>();
        let expect = vec![
            (PathBuf::from(".bashrc"), EntryKind::File),
            (PathBuf::from(".config"), EntryKind::Directory),
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn sync_requires_repository() -> anyhow::Result<()> {
        let (_home, store) = store()?;
        assert!(matches!(
            store.sync(None),
            Err(StoreError::NotInitialized { .. })
        ));

        // NullVcs does not create metadata directory on init.
        store.init()?;
        assert!(matches!(
            store.sync(None),
            Err(StoreError::NotRepository { .. })
        ));

        Ok(())
    }

    #[test]
    fn default_commit_message_is_timestamped() {
        let message = default_commit_message();
        assert!(message.starts_with("Update dotfiles - "));
        assert_eq!(message.len(), "Update dotfiles - 2025-01-01 00:00:00".len());
    }
}
