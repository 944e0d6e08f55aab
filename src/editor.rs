// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Editor collaborator.
//!
//! Opens a tracked entry inside the store with the user's editor. The editor
//! takes over the terminal until it exits.

use crate::config::DotsConfig;

use std::{path::Path, process::Command};
use tracing::{debug, instrument};

/// Environment variable naming the user's editor.
pub const EDITOR_VAR: &str = "EDITOR";

/// Editor used when neither `$EDITOR` nor the preference file name one.
pub const FALLBACK_EDITOR: &str = "nano";

/// External editor program plus any leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    program: String,
    args: Vec<String>,
}

impl Editor {
    /// Construct editor from a command line such as `"code --wait"`.
    ///
    /// Words are split with shell quoting rules, so `"'/opt/My Editor/bin/ed' -w"`
    /// keeps the quoted program path intact. The first word is the program.
    /// An empty command line selects [`FALLBACK_EDITOR`].
    ///
    /// # Errors
    ///
    /// - Return [`EditorError::Parse`] if quotes are left unbalanced.
    pub fn new(command_line: impl AsRef<str>) -> Result<Self> {
        let command_line = command_line.as_ref();
        let mut words = shell_words::split(command_line)
            .map_err(|err| EditorError::Parse {
                source: err,
                command_line: command_line.into(),
            })?
            .into_iter();
        let program = words.next().unwrap_or_else(|| FALLBACK_EDITOR.into());

        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    /// Select editor from environment.
    ///
    /// Prefers `$EDITOR`, then the `editor` preference, then [`FALLBACK_EDITOR`].
    /// An empty `$EDITOR` counts as unset.
    ///
    /// # Errors
    ///
    /// - Return [`EditorError::Parse`] if the selected command line is
    ///   malformed.
    pub fn from_env(config: &DotsConfig) -> Result<Self> {
        let from_var = std::env::var(EDITOR_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty());

        match from_var.or_else(|| config.settings.editor.clone()) {
            Some(command_line) => Self::new(command_line),
            None => Self::new(FALLBACK_EDITOR),
        }
    }

    pub fn program(&self) -> &str {
        self.program.as_str()
    }

    /// Open path in editor, blocking until the editor exits.
    ///
    /// # Errors
    ///
    /// - Return [`EditorError::Spawn`] if the editor cannot be started.
    /// - Return [`EditorError::Failed`] if the editor exits unsuccessfully.
    #[instrument(skip(self), level = "debug")]
    pub fn open(&self, path: &Path) -> Result<()> {
        debug!("open {:?} with {:?}", path.display(), self.program);
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .status()
            .map_err(|err| EditorError::Spawn {
                source: err,
                program: self.program.clone(),
            })?;

        if !status.success() {
            return Err(EditorError::Failed {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }

        Ok(())
    }
}

/// Editor error types.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// Editor could not be started.
    #[error("failed to open editor {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: String,
    },

    /// Editor command line cannot be split into words.
    #[error("malformed editor command line {command_line:?}")]
    Parse {
        #[source]
        source: shell_words::ParseError,
        command_line: String,
    },

    /// Editor exited unsuccessfully.
    #[error("editor {program:?} failed: {status}")]
    Failed { program: String, status: String },
}

/// Friendly result alias :3
pub type Result<T, E = EditorError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DotsSettings;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    fn config_with_editor(editor: Option<&str>) -> DotsConfig {
        DotsConfig {
            settings: DotsSettings {
                editor: editor.map(Into::into),
                commit_message: None,
            },
        }
    }

    #[test]
    fn split_command_line() -> anyhow::Result<()> {
        let editor = Editor::new("code --wait --new-window")?;
        assert_eq!(editor.program(), "code");
        assert_eq!(editor.args, vec!["--wait".to_string(), "--new-window".into()]);

        Ok(())
    }

    #[test]
    fn split_keeps_quoted_words() -> anyhow::Result<()> {
        let editor = Editor::new(r#"'/opt/My Editor/bin/ed' --title "dots edit""#)?;
        assert_eq!(editor.program(), "/opt/My Editor/bin/ed");
        assert_eq!(editor.args, vec!["--title".to_string(), "dots edit".into()]);

        Ok(())
    }

    #[test]
    fn empty_command_line_falls_back() -> anyhow::Result<()> {
        assert_eq!(Editor::new("  ")?.program(), FALLBACK_EDITOR);

        Ok(())
    }

    #[test]
    fn unbalanced_quote_is_rejected() {
        assert!(matches!(
            Editor::new("'code --wait"),
            Err(EditorError::Parse { .. })
        ));
    }

    #[sealed_test(env = [("EDITOR", "hx")])]
    fn editor_var_wins() -> anyhow::Result<()> {
        let editor = Editor::from_env(&config_with_editor(Some("vim")))?;
        assert_eq!(editor.program(), "hx");

        Ok(())
    }

    #[sealed_test(env = [("EDITOR", "")])]
    fn empty_editor_var_uses_preference() -> anyhow::Result<()> {
        let editor = Editor::from_env(&config_with_editor(Some("vim")))?;
        assert_eq!(editor.program(), "vim");

        Ok(())
    }

    #[sealed_test(env = [("EDITOR", "")])]
    fn fallback_editor() -> anyhow::Result<()> {
        let editor = Editor::from_env(&config_with_editor(None))?;
        assert_eq!(editor.program(), FALLBACK_EDITOR);

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn open_reports_exit_status() -> anyhow::Result<()> {
        assert!(Editor::new("true")?.open(Path::new("/dev/null")).is_ok());
        assert!(matches!(
            Editor::new("false")?.open(Path::new("/dev/null")),
            Err(EditorError::Failed { .. })
        ));
        assert!(matches!(
            Editor::new("dots-no-such-editor")?.open(Path::new("/dev/null")),
            Err(EditorError::Spawn { .. })
        ));

        Ok(())
    }
}
