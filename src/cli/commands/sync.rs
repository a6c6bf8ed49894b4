//! Sync command - import document metadata from the cloud.

use anyhow::Result;
use colored::Colorize;

use studydeck::cloud::{import_remote, CloudClient, CloudError, DEFAULT_CLOUD_URL};

use crate::cli::app::App;

/// Executes the sync command.
pub fn run(app: &App) -> Result<()> {
    let config = app.config();
    let token = config.cloud_token.clone().ok_or(CloudError::NotLoggedIn)?;
    let url = config
        .cloud_url
        .clone()
        .unwrap_or_else(|| DEFAULT_CLOUD_URL.to_string());
    let db = app.database()?;

    println!("{}", format!("Importing from {url}...").dimmed());

    // reqwest's blocking client must stay off the async workers.
    let report = app.blocking(move || {
        let client = CloudClient::with_url(&url).with_token(&token);
        import_remote(&db, &client)
    })?;

    println!(
        "{} {} new, {} refreshed",
        "Synced.".green().bold(),
        report.created,
        report.updated
    );
    Ok(())
}
