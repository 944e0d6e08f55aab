// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Moving entries in and out of the store.
//!
//! The [`Transplanter`] performs the three filesystem mutations dots knows:
//!
//! 1. __Commit__: copy an entry into the store, remove the original, and
//!    replace it with a symlink.
//! 2. __Revert__: remove the symlink, copy the entry back, and remove it from
//!    the store.
//! 3. __Link__: create the symlink for an entry that is already in the store.
//!
//! Copies always finish before the source is removed, so a failed copy never
//! loses data. A failed copy may leave a partial copy at the destination.

use crate::{
    config::Layout,
    path::{clean, resolve_link_target},
    store::{fs_err, walk::walk_err, Resolution, Result, StoreError},
};

use ignore::gitignore::GitignoreBuilder;
use std::{
    fs::{
        copy, create_dir, read_dir, read_link, remove_dir, remove_dir_all, remove_file,
        set_permissions, symlink_metadata,
    },
    io::ErrorKind,
    path::Path,
};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Result of committing an entry into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub resolution: Resolution,

    /// Whether the symlink at the original location could be created.
    pub linked: bool,
}

/// Result of reverting an entry out of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revert {
    pub resolution: Resolution,

    /// Whether a symlink had to be removed first.
    pub unlinked: bool,
}

/// Result of linking an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Symlink was created.
    Linked,

    /// Something already exists at the original location.
    Skipped,
}

/// Filesystem mutations between store and home.
#[derive(Debug, Clone, Copy)]
pub struct Transplanter<'a> {
    layout: &'a Layout,
}

impl<'a> Transplanter<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Move entry into store and link it back.
    ///
    /// Failing to create the symlink is not fatal, because the entry is
    /// already safe inside the store by then. It is reported through
    /// [`Commit::linked`] instead.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::AlreadyExists`] if the store path is occupied.
    /// - Return [`StoreError::Filesystem`] if copying or removal fails.
    #[instrument(skip(self), level = "debug")]
    pub fn commit(&self, resolution: &Resolution) -> Result<Commit> {
        let Resolution {
            store_path,
            original_path,
        } = resolution;

        if symlink_metadata(store_path).is_ok() {
            return Err(StoreError::AlreadyExists {
                path: store_path.clone(),
            });
        }

        let ignored = self.is_ignored(store_path, original_path.is_dir());

        create_parents(store_path)?;
        copy_entry(original_path, store_path).inspect_err(|_| {
            warn!(
                "partial copy may remain at {:?}, original is untouched",
                store_path.display()
            )
        })?;
        info!(
            "copied {:?} to {:?}",
            original_path.display(),
            store_path.display()
        );

        remove_entry(original_path)?;

        let linked = match make_symlink(store_path, original_path) {
            Ok(()) => {
                info!(
                    "linked {:?} -> {:?}",
                    original_path.display(),
                    store_path.display()
                );
                true
            }
            Err(err) => {
                warn!(
                    "failed to link {:?}, entry is safe in store at {:?}: {err}",
                    original_path.display(),
                    store_path.display()
                );
                false
            }
        };

        if ignored {
            warn!(
                "{:?} matches a pattern in {:?}, it will not be synced",
                store_path.display(),
                self.layout.ignore_path().display()
            );
        }

        Ok(Commit {
            resolution: resolution.clone(),
            linked,
        })
    }

    /// Move entry out of store back to its original location.
    ///
    /// A missing symlink is tolerated, the entry is restored anyway. Empty
    /// directories left behind inside the store are pruned.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotSymlink`] if something that is not a symlink
    ///   occupies the original location.
    /// - Return [`StoreError::TargetMismatch`] if the symlink does not point
    ///   into the store entry.
    /// - Return [`StoreError::Filesystem`] if copying or removal fails.
    #[instrument(skip(self), level = "debug")]
    pub fn revert(&self, resolution: &Resolution) -> Result<Revert> {
        let Resolution {
            store_path,
            original_path,
        } = resolution;

        let unlinked = match symlink_metadata(original_path) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                let target = read_link(original_path).map_err(fs_err("read link", original_path))?;
                let target = resolve_link_target(original_path, target);
                let expected = clean(store_path);
                if target != expected {
                    return Err(StoreError::TargetMismatch {
                        link: original_path.clone(),
                        target,
                        expected,
                    });
                }

                remove_file(original_path).map_err(fs_err("remove symlink", original_path))?;
                info!("removed symlink {:?}", original_path.display());
                true
            }
            Ok(_) => {
                return Err(StoreError::NotSymlink {
                    path: original_path.clone(),
                })
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(
                    "no symlink at {:?}, restoring anyway",
                    original_path.display()
                );
                false
            }
            Err(err) => return Err(fs_err("inspect", original_path)(err)),
        };

        create_parents(original_path)?;
        copy_entry(store_path, original_path)?;
        info!(
            "restored {:?} from {:?}",
            original_path.display(),
            store_path.display()
        );

        remove_entry(store_path)?;
        self.prune_empty_parents(store_path)?;

        Ok(Revert {
            resolution: resolution.clone(),
            unlinked,
        })
    }

    /// Create symlink at original location pointing into the store.
    ///
    /// Never overwrites anything. An occupied original location is skipped
    /// with a warning.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Filesystem`] if the symlink cannot be created.
    #[instrument(skip(self), level = "debug")]
    pub fn link(&self, resolution: &Resolution) -> Result<LinkOutcome> {
        let Resolution {
            store_path,
            original_path,
        } = resolution;

        if symlink_metadata(original_path).is_ok() {
            warn!(
                "{:?} already exists, skipping",
                original_path.display()
            );
            return Ok(LinkOutcome::Skipped);
        }

        create_parents(original_path)?;
        make_symlink(store_path, original_path).map_err(fs_err("create symlink", original_path))?;
        info!(
            "linked {:?} -> {:?}",
            original_path.display(),
            store_path.display()
        );

        Ok(LinkOutcome::Linked)
    }

    /// Check if store's ignore file excludes given store path.
    ///
    /// An unreadable or malformed ignore file only produces a warning.
    fn is_ignored(&self, store_path: &Path, is_dir: bool) -> bool {
        let ignore_path = self.layout.ignore_path();
        if !ignore_path.is_file() || !store_path.starts_with(self.layout.store_root()) {
            return false;
        }

        let mut builder = GitignoreBuilder::new(self.layout.store_root());
        if let Some(err) = builder.add(&ignore_path) {
            warn!("problem with {:?}: {err}", ignore_path.display());
        }

        match builder.build() {
            Ok(matcher) => matcher
                .matched_path_or_any_parents(store_path, is_dir)
                .is_ignore(),
            Err(err) => {
                warn!("failed to parse {:?}: {err}", ignore_path.display());
                false
            }
        }
    }

    /// Remove empty directories between a removed store entry and the root.
    fn prune_empty_parents(&self, store_path: &Path) -> Result<()> {
        let store_root = self.layout.store_root();
        let mut current = store_path.parent();
        while let Some(dir) = current {
            if dir == store_root || !dir.starts_with(store_root) {
                break;
            }

            let mut entries = read_dir(dir).map_err(fs_err("read directory", dir))?;
            if entries.next().is_some() {
                break;
            }

            remove_dir(dir).map_err(fs_err("remove directory", dir))?;
            debug!("pruned empty directory {:?}", dir.display());
            current = dir.parent();
        }

        Ok(())
    }
}

/// Copy file or directory tree, preserving permissions.
///
/// Symlinks inside a directory tree are recreated with the same target.
/// Directory permissions are applied only after their content is copied, so
/// read-only directories can still be filled.
///
/// # Errors
///
/// - Return [`StoreError::Filesystem`] if anything cannot be copied,
///   including when the destination already exists.
pub fn copy_entry(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    let mut directories = Vec::new();

    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(walk_err(src))?;
        let from = entry.path();
        let to = if entry.depth() == 0 {
            dst.to_path_buf()
        } else {
            let relative = from
                .strip_prefix(src)
                .map_err(|_| StoreError::InvalidPath {
                    path: from.to_path_buf(),
                })?;
            dst.join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            let metadata = entry.metadata().map_err(walk_err(src))?;
            create_dir(&to).map_err(fs_err("create directory", &to))?;
            directories.push((to, metadata.permissions()));
        } else if file_type.is_symlink() {
            let target = read_link(from).map_err(fs_err("read link", from))?;
            make_symlink(&target, &to).map_err(fs_err("create symlink", &to))?;
        } else {
            if symlink_metadata(&to).is_ok() {
                return Err(fs_err("copy", &to)(ErrorKind::AlreadyExists.into()));
            }
            copy(from, &to).map_err(fs_err("copy", from))?;
        }
    }

    // INVARIANT: Pre-order walk, so reversing puts deepest directories first.
    for (dir, permissions) in directories.into_iter().rev() {
        set_permissions(&dir, permissions).map_err(fs_err("set permissions of", &dir))?;
    }

    Ok(())
}

/// Remove file, symlink, or whole directory tree.
fn remove_entry(path: &Path) -> Result<()> {
    let metadata = symlink_metadata(path).map_err(fs_err("inspect", path))?;
    if metadata.is_dir() {
        remove_dir_all(path).map_err(fs_err("remove", path))
    } else {
        remove_file(path).map_err(fs_err("remove", path))
    }
}

fn create_parents(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        mkdirp::mkdirp(parent).map_err(fs_err("create directory", parent))?;
    }

    Ok(())
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}
