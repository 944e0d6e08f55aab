// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Deterministic store traversal.
//!
//! Both the resolver's fallback search and the auditor need to look at every
//! tracked entry in the store. They do so through [`StoreWalk`], a thin layer
//! over [`walkdir`] that visits entries depth-first in pre-order with siblings
//! sorted by file name. Thus, when two entries share a base name, the one that
//! sorts first along the walk always wins.
//!
//! The walk never yields the version control metadata directory, never
//! descends into it, and never yields the meta files at the top-level of the
//! store. Symlinks inside the store are not tracked entries, so they are
//! skipped too.

use crate::{
    config::{META_FILES, VCS_DIR},
    store::{fs_err, Result, StoreError},
};

use std::{
    ffi::OsStr,
    fs::symlink_metadata,
    path::{Path, PathBuf},
};
use tracing::debug;
use walkdir::WalkDir;

/// Kind of tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// Entry found inside the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    /// Absolute path inside store.
    pub path: PathBuf,

    /// Path relative to store root.
    pub relative: PathBuf,

    /// File or directory.
    pub kind: EntryKind,
}

/// Check if relative store path names something that is never tracked.
///
/// The metadata directory is excluded at any depth, meta files only at the
/// top-level.
pub fn is_excluded(relative: impl AsRef<Path>) -> bool {
    let relative = relative.as_ref();
    if relative
        .components()
        .any(|component| component.as_os_str() == OsStr::new(VCS_DIR))
    {
        return true;
    }

    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(first), None) => META_FILES
            .iter()
            .any(|meta| first.as_os_str() == OsStr::new(meta)),
        _ => false,
    }
}

/// Classify path without following symlinks.
///
/// Returns `None` for symlinks and anything that is neither file nor
/// directory.
pub(crate) fn entry_kind(path: &Path) -> Result<Option<EntryKind>> {
    let metadata = symlink_metadata(path).map_err(fs_err("inspect", path))?;
    let file_type = metadata.file_type();

    if file_type.is_dir() {
        Ok(Some(EntryKind::Directory))
    } else if file_type.is_file() {
        Ok(Some(EntryKind::File))
    } else {
        Ok(None)
    }
}

/// Map directory walk error into [`StoreError::Filesystem`].
///
/// Falls back to `root` when the error carries no path.
pub(crate) fn walk_err(root: impl AsRef<Path>) -> impl FnOnce(walkdir::Error) -> StoreError {
    let root = root.as_ref().to_path_buf();
    move |source| StoreError::Filesystem {
        op: "walk",
        path: source.path().map(Path::to_path_buf).unwrap_or(root),
        source: source.into(),
    }
}

/// Depth-first pre-order walk over tracked entries of a store.
#[derive(Debug)]
pub struct StoreWalk {
    root: PathBuf,
    inner: walkdir::IntoIter,
    yielded_dir: bool,
}

impl StoreWalk {
    /// Walk store rooted at given path.
    ///
    /// The root itself is not yielded.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let inner = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        Self {
            root,
            inner,
            yielded_dir: false,
        }
    }

    /// Do not descend into the directory yielded last.
    ///
    /// Does nothing if the last yielded entry was a file.
    pub fn skip_current_dir(&mut self) {
        // INVARIANT: walkdir pops the parent of a file, so only forward dirs.
        if self.yielded_dir {
            self.inner.skip_current_dir();
            self.yielded_dir = false;
        }
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

impl Iterator for StoreWalk {
    type Item = Result<StoreEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.yielded_dir = false;

        while let Some(entry) = self.inner.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => return Some(Err(walk_err(&self.root)(err))),
            };

            let file_type = entry.file_type();
            let relative = self.relative(entry.path());
            if is_excluded(&relative) {
                if file_type.is_dir() {
                    self.inner.skip_current_dir();
                }
                continue;
            }

            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                debug!("skip non-regular store entry {:?}", entry.path().display());
                continue;
            };

            self.yielded_dir = kind.is_dir();
            return Some(Ok(StoreEntry {
                path: entry.into_path(),
                relative,
                kind,
            }));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;
    use std::fs::{create_dir_all, write};

    fn fixture() -> anyhow::Result<tempfile::TempDir> {
        let root = tempfile::tempdir()?;
        let path = root.path();
        create_dir_all(path.join(".git/objects"))?;
        create_dir_all(path.join(".config/nvim/lua"))?;
        create_dir_all(path.join(".config/kitty"))?;
        write(path.join(".git/HEAD"), "ref: refs/heads/main")?;
        write(path.join(".gitignore"), "*.swp")?;
        write(path.join("README.md"), "# blah")?;
        write(path.join(".bashrc"), "# bashrc")?;
        write(path.join(".config/nvim/init.lua"), "-- init")?;
        write(path.join(".config/nvim/lua/plugins.lua"), "-- plugins")?;
        write(path.join(".config/kitty/kitty.conf"), "# kitty")?;
        write(path.join(".config/kitty/README.md"), "# nested readme")?;
        Ok(root)
    }

    fn relatives(walk: StoreWalk) -> anyhow::Result<Vec<PathBuf>> {
        Ok(walk
            .map(|entry| entry.map(|entry| entry.relative))
            .collect::<Result<Vec<_>>>()?)
    }

    #[test]
    fn walk_is_sorted_pre_order() -> anyhow::Result<()> {
        let root = fixture()?;
        let result = relatives(StoreWalk::new(root.path()))?;
        let expect: Vec<PathBuf> = [
            ".bashrc",
            ".config",
            ".config/kitty",
            ".config/kitty/README.md",
            ".config/kitty/kitty.conf",
            ".config/nvim",
            ".config/nvim/init.lua",
            ".config/nvim/lua",
            ".config/nvim/lua/plugins.lua",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn walk_can_skip_subtree() -> anyhow::Result<()> {
        let root = fixture()?;
        let mut walk = StoreWalk::new(root.path());
        let mut seen = Vec::new();
        while let Some(entry) = walk.next() {
            let entry = entry?;
            if entry.relative == Path::new(".config/kitty") {
                walk.skip_current_dir();
            }
            seen.push(entry.relative);
        }

        assert!(seen.contains(&PathBuf::from(".config/kitty")));
        assert!(!seen.contains(&PathBuf::from(".config/kitty/kitty.conf")));
        assert!(seen.contains(&PathBuf::from(".config/nvim/init.lua")));

        Ok(())
    }

    #[test]
    fn skip_after_file_keeps_siblings() -> anyhow::Result<()> {
        let root = fixture()?;
        let mut walk = StoreWalk::new(root.path());
        let mut seen = Vec::new();
        while let Some(entry) = walk.next() {
            let entry = entry?;
            walk.skip_current_dir();
            seen.push(entry.relative);
        }

        let expect: Vec<PathBuf> = [".bashrc", ".config"]
            .into_iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(seen, expect);

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn walk_skips_symlinks() -> anyhow::Result<()> {
        let root = fixture()?;
        std::os::unix::fs::symlink(
            root.path().join(".bashrc"),
            root.path().join(".bash_profile"),
        )?;
        let result = relatives(StoreWalk::new(root.path()))?;
        assert!(!result.contains(&PathBuf::from(".bash_profile")));

        Ok(())
    }

    #[test]
    fn walk_of_missing_root_fails() {
        let mut walk = StoreWalk::new("/dots/no/such/store");
        assert!(matches!(
            walk.next(),
            Some(Err(StoreError::Filesystem { .. }))
        ));
    }

    #[test_case(".git", true; "metadata dir")]
    #[test_case(".config/nvim/.git/HEAD", true; "nested metadata dir")]
    #[test_case(".gitignore", true; "ignore file")]
    #[test_case("README.md", true; "readme")]
    #[test_case("dots.toml", true; "preference file")]
    #[test_case(".config/kitty/README.md", false; "nested readme")]
    #[test_case(".bashrc", false; "plain dotfile")]
    #[test]
    fn exclusion(relative: &str, expect: bool) {
        assert_eq!(is_excluded(relative), expect);
    }
}
