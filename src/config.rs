// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Two things configure dots. The [`Layout`] is the explicit value naming the
//! user's home directory and the store root derived from it. Every component
//! receives a layout at construction instead of consulting the environment on
//! its own. The [`DotsConfig`] is an optional preference file that lives at
//! the top-level of the store as `dots.toml`, so it follows the dotfiles to
//! every machine they are synced to.

use crate::path::{clean, home_dir, store_dir_in, NoWayHome};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Name of version control metadata directory.
pub const VCS_DIR: &str = ".git";

/// Name of ignore pattern file at top-level of store.
pub const IGNORE_FILE: &str = ".gitignore";

/// Name of readme at top-level of store.
pub const README_FILE: &str = "README.md";

/// Name of preference file at top-level of store.
pub const CONFIG_FILE: &str = "dots.toml";

/// Files at the top-level of the store that are never tracked entries.
pub const META_FILES: [&str; 3] = [IGNORE_FILE, README_FILE, CONFIG_FILE];

/// Location of the user's home directory and store.
///
/// # Invariant
///
/// - Store root is always `<home>/.config/dots`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    home: PathBuf,
    store_root: PathBuf,
}

impl Layout {
    /// Construct new layout rooted at given home directory.
    ///
    /// The home directory path is cleaned lexically.
    pub fn new(home: impl AsRef<Path>) -> Self {
        let home = clean(home);
        let store_root = store_dir_in(&home);
        Self { home, store_root }
    }

    /// Construct layout for current user.
    ///
    /// # Errors
    ///
    /// - Return [`NoWayHome`] if home directory path cannot be determined.
    pub fn try_default() -> Result<Self, NoWayHome> {
        home_dir().map(Self::new)
    }

    pub fn home(&self) -> &Path {
        self.home.as_path()
    }

    pub fn store_root(&self) -> &Path {
        self.store_root.as_path()
    }

    pub fn vcs_dir(&self) -> PathBuf {
        self.store_root.join(VCS_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.store_root.join(CONFIG_FILE)
    }

    pub fn ignore_path(&self) -> PathBuf {
        self.store_root.join(IGNORE_FILE)
    }

    /// Expand leading tilde of user supplied path against layout's home.
    ///
    /// Paths that are not valid UTF-8 are returned untouched.
    pub fn expand(&self, input: impl AsRef<Path>) -> PathBuf {
        match input.as_ref().to_str() {
            Some(raw) => PathBuf::from(
                shellexpand::tilde_with_context(raw, || self.home.to_str()).into_owned(),
            ),
            None => input.as_ref().to_path_buf(),
        }
    }

    /// Load preference file from store.
    ///
    /// A missing preference file yields the default preferences.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if the file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if the file is malformed.
    pub fn load_config(&self) -> Result<DotsConfig> {
        let path = self.config_path();
        match read_to_string(&path) {
            Ok(content) => content.parse(),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(DotsConfig::default()),
            Err(err) => Err(ConfigError::Read { source: err, path }),
        }
    }
}

/// Preference file layout.
///
/// # General Layout
///
/// All preferences sit in a single `[settings]` table. Every field is
/// optional, and an empty file is a valid preference file.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DotsConfig {
    /// General settings.
    #[serde(default)]
    pub settings: DotsSettings,
}

impl FromStr for DotsConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: DotsConfig = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on editor field.
        if let Some(editor) = config.settings.editor.take() {
            config.settings.editor = Some(
                shellexpand::full(editor.as_str())
                    .map_err(ConfigError::ShellExpansion)?
                    .into_owned(),
            );
        }

        Ok(config)
    }
}

impl Display for DotsConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// General settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DotsSettings {
    /// Editor to fall back on when `$EDITOR` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,

    /// Commit message to use for sync when none is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read preference file.
    #[error("failed to read preference file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
