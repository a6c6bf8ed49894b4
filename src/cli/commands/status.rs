//! Status command - show current studydeck state.

use anyhow::Result;
use colored::Colorize;

use crate::cli::app::App;
use crate::cli::format::short_id;

/// Executes the status command.
///
/// Shows store location, content counts and the most recent documents.
pub fn run(app: &App) -> Result<()> {
    println!("{}", "studydeck".bold().cyan());
    println!("{}", "Study documents, summaries and chats".dimmed());
    println!();

    let path = app.store_path()?;
    let (documents, summaries, messages, sessions, recent) = app.store(|db| {
        let recent: Vec<_> = db.documents().list_all()?.into_iter().take(5).collect();
        Ok((
            db.documents().count()?,
            db.document_queries().count_summaries()?,
            db.chat().count_messages()?,
            db.chat().list_sessions()?.len(),
            recent,
        ))
    })?;

    println!("{}", "Database:".bold());
    println!("  {}  {}", "Location:".dimmed(), path.display());
    println!("  Documents:      {documents}");
    println!("  Summaries:      {summaries}");
    println!("  Chat sessions:  {sessions}");
    println!("  Chat messages:  {messages}");

    if documents == 0 {
        println!();
        println!(
            "{}",
            "Hint: Run 'studydeck docs add' or 'studydeck sync' to add documents".yellow()
        );
    }

    if !recent.is_empty() {
        println!();
        println!("{}", "Recent documents:".bold());
        for doc in recent {
            println!(
                "  {}  {:14}  {:10}  {}",
                short_id(&doc.id).cyan(),
                doc.doc_type.to_string(),
                doc.status.to_string().yellow(),
                doc.title
            );
        }
    }

    Ok(())
}
