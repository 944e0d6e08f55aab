// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way. Everything here is lexical, so
//! no function in this module ever follows a symlink.

use std::path::{Component, Path, PathBuf};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to the store directory.
///
/// Uses `$HOME/.config/dots`. Does not check if the path returned actually
/// exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_store_dir() -> Result<PathBuf> {
    home_dir().map(store_dir_in)
}

/// Store directory for a given home directory.
pub fn store_dir_in(home: impl AsRef<Path>) -> PathBuf {
    home.as_ref().join(".config").join("dots")
}

/// Older hidden store location that is no longer honored.
pub fn legacy_store_dir_in(home: impl AsRef<Path>) -> PathBuf {
    home.as_ref().join(".config").join(".dots")
}

/// Lexically clean a path.
///
/// Drops `.` components, folds `..` into its parent where possible, and
/// collapses redundant separators. A `..` directly under the root is dropped,
/// a leading `..` of a relative path is kept.
pub fn clean(path: impl AsRef<Path>) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => continue,
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => continue,
                _ => cleaned.push(".."),
            },
            other => cleaned.push(other.as_os_str()),
        }
    }

    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }

    cleaned
}

/// Make path absolute against the current directory, then clean it.
///
/// # Errors
///
/// - Return [`std::io::Error`] if the current directory cannot be determined.
pub fn absolutize(path: impl AsRef<Path>) -> std::io::Result<PathBuf> {
    std::path::absolute(path.as_ref()).map(clean)
}

/// Resolve the target of a symlink into an absolute, cleaned path.
///
/// Relative targets are interpreted against the directory containing the
/// link itself, exactly like the kernel would.
pub fn resolve_link_target(link: impl AsRef<Path>, target: impl AsRef<Path>) -> PathBuf {
    let target = target.as_ref();
    if target.is_absolute() {
        return clean(target);
    }

    let parent = link.as_ref().parent().unwrap_or_else(|| Path::new("/"));
    clean(parent.join(target))
}

/// Check if `path` is `root` itself or lives somewhere below it.
pub fn is_within(path: impl AsRef<Path>, root: impl AsRef<Path>) -> bool {
    clean(path).starts_with(clean(root))
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
