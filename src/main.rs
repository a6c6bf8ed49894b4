use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::app::App;
use cli::commands;

/// The main CLI command line interface.
#[derive(Parser)]
#[command(name = "studydeck")]
#[command(version)]
#[command(about = "Study documents, summaries and assistant chats in one local store")]
#[command(long_about = "studydeck keeps exam papers, lectures, study material and project\n\
    briefs in a local versioned database, together with their summaries\n\
    and your study-assistant conversations.")]
#[command(after_help = "EXAMPLES:\n    \
    studydeck docs add \"Calculus Final 2022\" --type exam-paper\n    \
    studydeck docs list --status ready\n    \
    studydeck chat new --title \"Exam prep\"\n    \
    studydeck chat send 1a2b \"Explain eigenvalues\"\n    \
    studydeck sync                 Import documents from the cloud\n\n\
    For more information about a command, run 'studydeck <command> --help'.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this database file instead of the configured one
    #[arg(long, global = true, env = "STUDYDECK_DB", value_name = "PATH")]
    db: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Show store status and recent documents
    Status,

    /// Add, list, update and delete study documents
    Docs(commands::docs::Args),

    /// Study-assistant chat sessions
    Chat(commands::chat::Args),

    /// Inspect and maintain the database
    #[command(long_about = "Shows schema version and open details, or reclaims\n\
        unused space with VACUUM.")]
    Db(commands::db::Args),

    /// Import document metadata from the cloud
    #[command(long_about = "Lists documents in the remote store and mirrors their metadata\n\
        locally. Requires 'cloud_token' to be set in the configuration.")]
    Sync,

    /// View and manage configuration settings
    #[command(long_about = "Provides subcommands to show, get, and set configuration values.\n\
        Configuration is stored in ~/.studydeck/config.yaml.")]
    Config(commands::config::Args),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "studydeck=debug"
    } else {
        "studydeck=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    let app = App::new(cli.db)?;

    let result = match cli.command {
        Commands::Status => commands::status::run(&app),
        Commands::Docs(args) => commands::docs::run(args, &app),
        Commands::Chat(args) => commands::chat::run(args, &app),
        Commands::Db(args) => commands::db::run(args, &app),
        Commands::Sync => commands::sync::run(&app),
        Commands::Config(args) => commands::config::run(args),
    };

    app.shutdown();
    result
}
