//! Docs command - manage study documents and their summaries.

use std::io::{self, Write};

use anyhow::{bail, Result};
use chrono::Utc;
use clap::Subcommand;
use colored::Colorize;

use studydeck::storage::{
    Database, Document, DocumentStatus, DocumentSummary, DocumentType, DocumentWithSummary,
    StoreResult,
};

use crate::cli::app::App;
use crate::cli::format::{short_id, OutputFormat};

/// Arguments for the docs command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    studydeck docs add \"Operating Systems Lecture 4\" --type lecture --tag week-4\n    \
    studydeck docs list --type exam-paper\n    \
    studydeck docs status 1a2b ready\n    \
    studydeck docs summarize 1a2b \"Paging and TLBs\"\n    \
    studydeck docs delete 1a2b --force")]
pub struct Args {
    #[command(subcommand)]
    pub command: DocsCommand,
}

#[derive(Subcommand)]
pub enum DocsCommand {
    /// Add a document
    Add {
        /// Document title
        title: String,

        /// Kind of document
        #[arg(long = "type", value_enum, default_value = "study-material")]
        doc_type: DocumentType,

        /// Course or subject
        #[arg(long)]
        subject: Option<String>,

        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List documents
    List {
        /// Only documents with this status
        #[arg(long, value_enum)]
        status: Option<DocumentStatus>,

        /// Only documents of this type
        #[arg(long = "type", value_enum)]
        doc_type: Option<DocumentType>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show a document with its summary
    Show {
        /// Document ID prefix
        id: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Change a document's status
    Status {
        /// Document ID prefix
        id: String,

        /// New status
        #[arg(value_enum)]
        status: DocumentStatus,
    },

    /// Store a summary for a document
    Summarize {
        /// Document ID prefix
        id: String,

        /// Summary text
        summary: String,

        /// Mark the summary as incomplete
        #[arg(long)]
        partial: bool,
    },

    /// Delete a document and its summary
    Delete {
        /// Document ID prefix
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

/// Executes the docs command.
pub fn run(args: Args, app: &App) -> Result<()> {
    match args.command {
        DocsCommand::Add {
            title,
            doc_type,
            subject,
            tags,
        } => run_add(app, title, doc_type, subject, tags),
        DocsCommand::List {
            status,
            doc_type,
            format,
        } => run_list(app, status, doc_type, format),
        DocsCommand::Show { id, format } => run_show(app, &id, format),
        DocsCommand::Status { id, status } => run_status(app, &id, status),
        DocsCommand::Summarize {
            id,
            summary,
            partial,
        } => run_summarize(app, &id, summary, !partial),
        DocsCommand::Delete { id, force } => run_delete(app, &id, force),
    }
}

fn run_add(
    app: &App,
    title: String,
    doc_type: DocumentType,
    subject: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    let mut doc = Document::new(title, doc_type);
    doc.subject = subject;
    doc.tags = tags;

    let stored = doc.clone();
    app.store(move |db| db.documents().insert(&stored))?;

    println!(
        "{} {} {}",
        "Added".green(),
        doc.id.to_string().cyan(),
        doc.title
    );
    Ok(())
}

fn run_list(
    app: &App,
    status: Option<DocumentStatus>,
    doc_type: Option<DocumentType>,
    format: OutputFormat,
) -> Result<()> {
    let docs = app.store(move |db| select_documents(db, status, doc_type))?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&docs)?);
        return Ok(());
    }

    if docs.is_empty() {
        println!("{}", "No documents found.".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!("{:8}  {:14}  {:10}  {:16}  {}", "ID", "TYPE", "STATUS", "ADDED", "TITLE").bold()
    );
    for doc in &docs {
        println!(
            "{}  {:14}  {:10}  {:16}  {}",
            short_id(&doc.id).cyan(),
            doc.doc_type.to_string(),
            doc.status.to_string(),
            doc.created_at.format("%Y-%m-%d %H:%M").to_string(),
            doc.title
        );
    }
    Ok(())
}

/// Loads documents matching the optional status and type filters.
fn select_documents(
    db: &Database,
    status: Option<DocumentStatus>,
    doc_type: Option<DocumentType>,
) -> StoreResult<Vec<Document>> {
    match (status, doc_type) {
        (Some(status), Some(doc_type)) => Ok(db
            .documents()
            .list_by_status(status)?
            .into_iter()
            .filter(|d| d.doc_type == doc_type)
            .collect()),
        (Some(status), None) => db.documents().list_by_status(status),
        (None, Some(doc_type)) => db.documents().list_by_type(doc_type),
        (None, None) => db.documents().list_all(),
    }
}

fn run_show(app: &App, prefix: &str, format: OutputFormat) -> Result<()> {
    let doc = resolve_document(app, prefix)?;
    let id = doc.id;
    let item = app
        .store(move |db| db.document_queries().get_with_summary(&id))?
        .ok_or_else(|| anyhow::anyhow!("Document {id} disappeared"))?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&item)?);
        return Ok(());
    }

    print_document(&item);
    Ok(())
}

fn print_document(item: &DocumentWithSummary) {
    let doc = &item.document;
    println!("{} {}", "Document".bold(), doc.id.to_string().cyan());
    println!("  {}    {}", "Title:".dimmed(), doc.title);
    println!("  {}     {}", "Type:".dimmed(), doc.doc_type);
    println!("  {}   {}", "Status:".dimmed(), doc.status);
    if let Some(ref subject) = doc.subject {
        println!("  {}  {}", "Subject:".dimmed(), subject);
    }
    if !doc.tags.is_empty() {
        println!("  {}     {}", "Tags:".dimmed(), doc.tags.join(", "));
    }
    if let Some(ref remote_id) = doc.remote_id {
        println!("  {}   {}", "Remote:".dimmed(), remote_id);
    }
    println!(
        "  {}    {}",
        "Added:".dimmed(),
        doc.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    println!();
    match &item.summary {
        Some(summary) => {
            let state = if summary.is_complete {
                "complete".green()
            } else {
                "partial".yellow()
            };
            println!(
                "{} ({}, {})",
                "Summary".bold(),
                state,
                summary.generated_at.format("%Y-%m-%d %H:%M")
            );
            println!("{}", summary.summary);
        }
        None => println!("{}", "No summary yet.".dimmed()),
    }
}

fn run_status(app: &App, prefix: &str, status: DocumentStatus) -> Result<()> {
    let doc = resolve_document(app, prefix)?;
    let id = doc.id;
    app.store(move |db| db.documents().update_status(&id, status))?;

    println!(
        "{} {} is now {}",
        "Updated".green(),
        short_id(&id).cyan(),
        status
    );
    Ok(())
}

fn run_summarize(app: &App, prefix: &str, text: String, is_complete: bool) -> Result<()> {
    let doc = resolve_document(app, prefix)?;
    let summary = DocumentSummary {
        document_id: doc.id,
        summary: text,
        generated_at: Utc::now(),
        is_complete,
    };
    app.store(move |db| db.document_queries().upsert_summary(&summary))?;

    println!("{} summary for {}", "Saved".green(), short_id(&doc.id).cyan());
    Ok(())
}

fn run_delete(app: &App, prefix: &str, force: bool) -> Result<()> {
    let doc = resolve_document(app, prefix)?;
    let id = doc.id;
    let has_summary = app
        .store(move |db| db.document_queries().get_summary(&id))?
        .is_some();

    println!();
    println!("{} {}", "Document".bold(), doc.id.to_string().cyan());
    println!("  {}  {}", "Title:".dimmed(), doc.title);
    if has_summary {
        println!("{}", "Its summary will be deleted too.".yellow());
    }

    // Confirm unless --force
    if !force {
        print!("Delete document {}? [y/N] ", short_id(&id).cyan());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("{}", "Cancelled".dimmed());
            return Ok(());
        }
    }

    app.store(move |db| db.documents().delete(&id))?;
    println!("{} document {}", "Deleted".green(), short_id(&id).cyan());
    Ok(())
}

/// Finds the single document whose ID starts with `prefix`.
fn resolve_document(app: &App, prefix: &str) -> Result<Document> {
    let all = app.store(|db| db.documents().list_all())?;
    let mut matching: Vec<_> = all
        .into_iter()
        .filter(|d| d.id.to_string().starts_with(prefix))
        .collect();

    if matching.len() > 1 {
        println!("{}", "Multiple documents match that prefix:".yellow());
        for d in &matching {
            println!("  {} - {}", short_id(&d.id).cyan(), d.title);
        }
        bail!("Multiple documents match '{prefix}'. Please use a more specific prefix.");
    }

    match matching.pop() {
        Some(doc) => Ok(doc),
        None => bail!(
            "No document found matching '{prefix}'. \
             Run 'studydeck docs list' to see available documents."
        ),
    }
}
