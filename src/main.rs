mod build;
mod config;
mod deps;
mod error;
mod fetch;
mod index;
mod launcher;
mod lifecycle;
mod manifest;
mod progress;
mod self_update;
mod store;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use config::Settings;
use lifecycle::Lifecycle;
use lifecycle::prompt;
use ui::prelude::*;

/// wam - web application package manager
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit machine-readable JSON events instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install a package by name or repository URL
    Install {
        /// Package name from the index, or a direct git URL
        target: String,
    },

    /// Remove an installed package
    #[command(alias = "uninstall")]
    Remove { name: String },

    /// Update an installed package to the latest source
    #[command(alias = "upgrade")]
    Update { name: String },

    /// List installed packages
    #[command(alias = "ls")]
    List,

    /// Search the package index
    Search { query: String },

    /// Show details about a package
    Info { name: String },

    /// Update wam itself to the latest release
    SelfUpdate,
}

fn main() {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, true);
    ui::set_debug_mode(cli.debug);

    if let Err(e) = run(cli) {
        for (i, cause) in e.chain().enumerate() {
            let message = if i == 0 {
                format!("{} {cause}", char::from(NerdFont::Cross))
            } else {
                format!("  Caused by: {cause}")
            };
            emit(Level::Error, "error", &message, None);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let settings = Settings::load()?;
    if ui::is_debug_enabled() {
        emit(
            Level::Debug,
            "config.loaded",
            &format!(
                "install_root={} state_root={}",
                settings.install_root.display(),
                settings.state_root.display()
            ),
            None,
        );
    }

    let lifecycle = Lifecycle::new(&settings);

    match command {
        Commands::Install { target } => {
            lifecycle.install(&target, prompt::default_prompter().as_ref())
        }
        Commands::Remove { name } => lifecycle.remove(&name),
        Commands::Update { name } => lifecycle.update(&name),
        Commands::List => lifecycle.list(),
        Commands::Search { query } => lifecycle.search(&query),
        Commands::Info { name } => lifecycle.info(&name),
        Commands::SelfUpdate => self_update::self_update(prompt::default_prompter().as_ref()),
    }
}
