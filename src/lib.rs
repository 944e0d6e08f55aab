// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfile management through a symlinked store.
//!
//! Dots moves configuration files and directories out of the home directory
//! into a single Git-backed __store__ at `$HOME/.config/dots`, and leaves a
//! symlink at every original location. The store can then be synchronized
//! with a remote, and cloned onto other machines where entries are linked
//! back into place.
//!
//! # See Also
//!
//! 1. [`store::Store`]
//! 2. [`config::Layout`]

pub mod config;
pub mod editor;
pub mod path;
pub mod store;
pub mod vcs;
