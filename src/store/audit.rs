// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Link auditing.
//!
//! Compares every tracked entry against its original location and classifies
//! the state of the link there. Auditing never modifies anything.
//!
//! A directory in the store is either a tracked entry in its own right, or
//! just the parent of tracked entries, e.g., `.config` usually only holds
//! `.config/nvim`. The auditor tells the two apart by looking at the original
//! location. Only a symlink there makes the store directory a link unit whose
//! content is not audited separately. A real directory or nothing at all
//! means the store directory is only a parent, so the auditor descends into
//! it, and files below it get their own records. Hence a freshly cloned store
//! reports its deepest files as missing rather than whole top-level trees.

use crate::{
    config::Layout,
    path::{clean, resolve_link_target},
    store::{walk::StoreWalk, Result, StoreError},
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_link, symlink_metadata},
    io::ErrorKind,
    path::PathBuf,
};
use tracing::{debug, instrument};

/// State of the link at an entry's original location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// Symlink exists and points into the store entry.
    Ok,

    /// Nothing exists at the original location.
    Missing,

    /// Something that is not a symlink exists at the original location.
    NotSymlink,

    /// Symlink exists but points elsewhere.
    WrongTarget { target: PathBuf },
}

impl LinkStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl Display for LinkStatus {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Ok => fmt.write_str("ok"),
            Self::Missing => fmt.write_str("missing"),
            Self::NotSymlink => fmt.write_str("not a symlink"),
            Self::WrongTarget { target } => write!(fmt, "wrong target {:?}", target.display()),
        }
    }
}

/// Audit result of a single tracked entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// Path relative to store root and home.
    pub relative: PathBuf,
    pub store_path: PathBuf,
    pub original_path: PathBuf,
    pub status: LinkStatus,
}

impl Display for AuditRecord {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let marker = if self.status.is_ok() { "✓" } else { "✗" };
        write!(
            fmt,
            "{marker} {} -> {} ({})",
            self.original_path.display(),
            self.store_path.display(),
            self.status
        )
    }
}

/// Audit results of the whole store in walk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub records: Vec<AuditRecord>,
}

impl AuditReport {
    /// Check if every tracked entry is properly linked.
    pub fn is_consistent(&self) -> bool {
        self.records.iter().all(|record| record.status.is_ok())
    }

    /// Records whose link is not ok.
    pub fn problems(&self) -> impl Iterator<Item = &AuditRecord> + '_ {
        self.records.iter().filter(|record| !record.status.is_ok())
    }
}

impl Display for AuditReport {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        if self.records.is_empty() {
            return fmt.write_str("no tracked entries");
        }

        for record in &self.records {
            writeln!(fmt, "{record}")?;
        }

        let problems = self.problems().count();
        if problems == 0 {
            write!(fmt, "all {} entries linked", self.records.len())
        } else {
            write!(fmt, "{problems} of {} entries need attention", self.records.len())
        }
    }
}

/// Read-only link auditor.
#[derive(Debug, Clone, Copy)]
pub struct Auditor<'a> {
    layout: &'a Layout,
}

impl<'a> Auditor<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Audit every tracked entry of the store.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotInitialized`] if the store does not exist.
    /// - Return [`StoreError::Filesystem`] if the store cannot be walked.
    #[instrument(skip(self), level = "debug")]
    pub fn audit(&self) -> Result<AuditReport> {
        let store_root = self.layout.store_root();
        if !store_root.is_dir() {
            return Err(StoreError::NotInitialized {
                store_root: store_root.to_path_buf(),
            });
        }

        let mut report = AuditReport::default();
        let mut walk = StoreWalk::new(store_root);
        while let Some(entry) = walk.next() {
            let entry = entry?;
            let original_path = self.layout.home().join(&entry.relative);

            let status = match symlink_metadata(&original_path) {
                Err(err) if err.kind() == ErrorKind::NotFound && entry.kind.is_dir() => {
                    debug!("descend into unlinked directory {:?}", entry.relative.display());
                    continue;
                }
                Err(err) if err.kind() == ErrorKind::NotFound => LinkStatus::Missing,
                Err(_) => LinkStatus::NotSymlink,
                Ok(metadata) if metadata.file_type().is_symlink() => {
                    match read_link(&original_path) {
                        Ok(target) => {
                            let target = resolve_link_target(&original_path, target);
                            if target == clean(&entry.path) {
                                LinkStatus::Ok
                            } else {
                                LinkStatus::WrongTarget { target }
                            }
                        }
                        Err(_) => LinkStatus::NotSymlink,
                    }
                }
                Ok(metadata) if metadata.is_dir() && entry.kind.is_dir() => {
                    debug!("descend into parent directory {:?}", entry.relative.display());
                    continue;
                }
                Ok(_) => LinkStatus::NotSymlink,
            };

            walk.skip_current_dir();
            report.records.push(AuditRecord {
                relative: entry.relative,
                store_path: entry.path,
                original_path,
                status,
            });
        }

        Ok(report)
    }
}
