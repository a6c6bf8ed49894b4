//! Database management command - info and vacuum.

use anyhow::Result;
use colored::Colorize;

use studydeck::storage::migrations::{all_migrations, CURRENT_VERSION};

use crate::cli::app::App;

/// Arguments for the db command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    studydeck db info               Show schema version and file details\n    \
    studydeck db vacuum             Reclaim unused space")]
pub struct Args {
    /// Database subcommand to run
    #[command(subcommand)]
    pub command: DbCommand,
}

/// Database management subcommands.
#[derive(clap::Subcommand)]
pub enum DbCommand {
    /// Show schema version, migrations and file details
    Info,

    /// Reclaim unused disk space by running SQLite VACUUM
    Vacuum,
}

/// Executes the db command.
pub fn run(args: Args, app: &App) -> Result<()> {
    match args.command {
        DbCommand::Info => run_info(app),
        DbCommand::Vacuum => run_vacuum(app),
    }
}

fn run_info(app: &App) -> Result<()> {
    let db = app.database()?;
    let report = db.report();
    let (version, size) = app.store(|db| Ok((db.schema_version()?, db.file_size()?)))?;

    println!("{}", "Database".bold());
    if let Some(path) = db.path() {
        println!("  {}      {}", "Path:".dimmed(), path.display());
    }
    println!("  {}      {}", "Size:".dimmed(), format_size(size.unwrap_or(0)));
    println!(
        "  {}    {} (this build reads {})",
        "Schema:".dimmed(),
        version,
        CURRENT_VERSION
    );

    let opened = if report.reset {
        "rebuilt empty by destructive fallback".red().to_string()
    } else if report.created {
        "created".green().to_string()
    } else if report.from_version != report.version {
        format!("migrated from version {}", report.from_version)
    } else {
        "up to date".to_string()
    };
    println!("  {}    {}", "Opened:".dimmed(), opened);

    println!();
    println!("{}", "Migrations:".bold());
    for migration in all_migrations() {
        let marker = if migration.to <= version {
            "✓".green()
        } else {
            "○".dimmed()
        };
        println!(
            "  {} {} -> {}  {}",
            marker, migration.from, migration.to, migration.name
        );
    }

    Ok(())
}

/// Runs the vacuum subcommand.
fn run_vacuum(app: &App) -> Result<()> {
    let size_before = app.store(|db| db.file_size())?.unwrap_or(0);

    println!("{}", "Running VACUUM...".dimmed());
    app.store(|db| db.vacuum())?;

    let size_after = app.store(|db| db.file_size())?.unwrap_or(0);
    let saved = size_before.saturating_sub(size_after);

    println!("{} Database vacuumed successfully", "Done.".green().bold());
    println!("  {} {}", "Before:".dimmed(), format_size(size_before));
    println!("  {}  {}", "After:".dimmed(), format_size(size_after));
    if saved > 0 {
        println!("  {}  {}", "Saved:".dimmed(), format_size(saved).green());
    }

    Ok(())
}

/// Formats a byte count for display.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
