//! Config command - manage configuration

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use studydeck::config::{Config, CONFIG_KEYS};

#[derive(clap::Args)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value (empty string clears it)
    Set { key: String, value: String },
}

pub fn run(args: Args) -> Result<()> {
    match args.command {
        Some(ConfigCommand::Show) | None => show_config(),
        Some(ConfigCommand::Get { key }) => get_config(&key),
        Some(ConfigCommand::Set { key, value }) => set_config(&key, &value),
    }
}

fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "studydeck Configuration".bold());
    println!();
    println!("  {}  {}", "File:".dimmed(), Config::config_path()?.display());
    println!("  {}  {}", "Store:".dimmed(), config.store_path()?.display());
    println!();

    for key in CONFIG_KEYS {
        let value = config.get(key)?.unwrap_or_else(|| "-".to_string());
        println!("  {:22} {}", key.cyan(), value);
    }

    if config.destructive_fallback {
        println!();
        println!(
            "{}",
            "destructive_fallback is ON: a failed migration will erase all stored data.".red()
        );
    }
    Ok(())
}

fn get_config(key: &str) -> Result<()> {
    let config = Config::load()?;
    match config.get(key)? {
        Some(value) => println!("{value}"),
        None => println!("{}", format!("Config key '{key}' is not set").yellow()),
    }
    Ok(())
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;
    println!("{} {} = {}", "Set".green(), key, value);
    Ok(())
}
