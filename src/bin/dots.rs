// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dots::{
    editor::Editor,
    store::{LinkOutcome, Store, SyncOutcome},
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "dots [options] <dots-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let store = Store::open_default()?;
        match self.command {
            Command::Init => run_init(&store),
            Command::Add(opts) => run_add(&store, opts),
            Command::Remove(opts) => run_remove(&store, opts),
            Command::Create(opts) => run_create(&store, opts),
            Command::Link(opts) => run_link(&store, opts),
            Command::Edit(opts) => run_edit(&store, opts),
            Command::Status => run_status(&store),
            Command::Sync(opts) => run_sync(&store, opts),
            Command::Push => run_push(&store),
            Command::Pull => run_pull(&store),
            Command::Clone(opts) => run_clone(&store, opts),
            Command::Setup(opts) => run_setup(&store, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Initialize new store.
    #[command(override_usage = "dots init")]
    Init,

    /// Move file or directory into store and link it back.
    #[command(override_usage = "dots add <path>")]
    Add(AddOptions),

    /// Restore tracked entry and stop tracking it.
    #[command(override_usage = "dots remove <name>")]
    Remove(RemoveOptions),

    /// Create new empty dotfile inside the store.
    #[command(override_usage = "dots create <name>")]
    Create(CreateOptions),

    /// Link tracked entries back to their original location.
    #[command(override_usage = "dots link [options] <name>")]
    Link(LinkOptions),

    /// Open tracked entry in editor.
    #[command(override_usage = "dots edit <name>")]
    Edit(EditOptions),

    /// Show link status of every tracked entry.
    #[command(override_usage = "dots status")]
    Status,

    /// Commit all changes and push them to remote.
    #[command(override_usage = "dots sync [options]")]
    Sync(SyncOptions),

    /// Push committed changes to remote.
    #[command(override_usage = "dots push")]
    Push,

    /// Pull latest changes from remote.
    #[command(override_usage = "dots pull")]
    Pull,

    /// Clone existing store from remote.
    #[command(override_usage = "dots clone <url>")]
    Clone(CloneOptions),

    /// Create nested directory under the store's `.config` subtree.
    #[command(override_usage = "dots setup <path>")]
    Setup(SetupOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AddOptions {
    /// Path of file or directory to track.
    #[arg(required = true, value_name = "path")]
    pub path: PathBuf,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RemoveOptions {
    /// Name or path of tracked entry.
    #[arg(required = true, value_name = "name")]
    pub name: PathBuf,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CreateOptions {
    /// Path of new file relative to the store.
    #[arg(required = true, value_name = "name")]
    pub name: PathBuf,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct LinkOptions {
    /// Name or path of tracked entry.
    #[arg(group = "target", value_name = "name")]
    pub name: Option<PathBuf>,

    /// Link every tracked entry whose link is missing.
    #[arg(group = "target", short, long)]
    pub all: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct EditOptions {
    /// Name or path of tracked entry.
    #[arg(required = true, value_name = "name")]
    pub name: PathBuf,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SyncOptions {
    /// Commit message to use instead of the default one.
    #[arg(short, long, value_name = "text")]
    pub message: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CloneOptions {
    /// URL of remote to clone from.
    #[arg(required = true, value_name = "url")]
    pub url: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SetupOptions {
    /// Path relative to the store's `.config` directory.
    #[arg(required = true, value_name = "path")]
    pub path: PathBuf,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_init(store: &Store) -> Result<()> {
    store.init()?;
    info!(
        "store ready at {:?}, track something with `dots add <path>`",
        store.layout().store_root().display()
    );

    Ok(())
}

fn run_add(store: &Store, opts: AddOptions) -> Result<()> {
    let commit = store.add(opts.path)?;
    if commit.linked {
        info!("tracking {:?}", commit.resolution.original_path.display());
    } else {
        warn!(
            "tracking {:?}, but it is not linked yet, fix it with `dots link`",
            commit.resolution.original_path.display()
        );
    }

    Ok(())
}

fn run_remove(store: &Store, opts: RemoveOptions) -> Result<()> {
    let revert = store.remove(opts.name)?;
    info!(
        "no longer tracking {:?}",
        revert.resolution.original_path.display()
    );

    Ok(())
}

fn run_create(store: &Store, opts: CreateOptions) -> Result<()> {
    let path = store.create(&opts.name)?;
    info!(
        "created {:?}, link it with `dots link {}`",
        path.display(),
        opts.name.display()
    );

    Ok(())
}

fn run_link(store: &Store, opts: LinkOptions) -> Result<()> {
    if opts.all {
        let outcomes = store.link_all()?;
        let linked = outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == LinkOutcome::Linked)
            .count();
        info!("linked {linked} of {} missing entries", outcomes.len());
        return Ok(());
    }

    let Some(name) = opts.name else {
        anyhow::bail!("nothing to link, give a name or use `--all`");
    };

    store.link(name)?;

    Ok(())
}

fn run_edit(store: &Store, opts: EditOptions) -> Result<()> {
    let config = store.layout().load_config()?;
    let editor = Editor::from_env(&config)?;
    store.edit(opts.name, &editor)?;

    Ok(())
}

fn run_status(store: &Store) -> Result<()> {
    let report = store.status()?;
    println!("{report}");

    Ok(())
}

fn run_sync(store: &Store, opts: SyncOptions) -> Result<()> {
    match store.sync(opts.message)? {
        SyncOutcome::UpToDate => info!("everything up to date"),
        SyncOutcome::Committed => info!("changes committed locally"),
        SyncOutcome::Pushed { url } => info!("changes synced to {url}"),
    }

    Ok(())
}

fn run_push(store: &Store) -> Result<()> {
    store.push()?;
    info!("pushed committed changes");

    Ok(())
}

fn run_pull(store: &Store) -> Result<()> {
    store.pull()?;
    info!("pulled latest changes");

    Ok(())
}

fn run_clone(store: &Store, opts: CloneOptions) -> Result<()> {
    let entries = store.clone_from(&opts.url)?;
    if entries.is_empty() {
        info!("cloned store has no tracked entries");
        return Ok(());
    }

    println!("available entries:");
    for entry in entries {
        println!("  {}", entry.relative.display());
    }
    info!("link them with `dots link <name>` or `dots link --all`");

    Ok(())
}

fn run_setup(store: &Store, opts: SetupOptions) -> Result<()> {
    store.setup(opts.path)?;

    Ok(())
}
