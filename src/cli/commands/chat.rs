//! Chat command - study-assistant conversations.

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;

use studydeck::storage::{ChatSession, MessageRole};

use crate::cli::app::App;
use crate::cli::format::{short_id, OutputFormat};

/// Arguments for the chat command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    studydeck chat new --title \"Exam prep\"\n    \
    studydeck chat send 1a2b \"What is a monad?\"\n    \
    studydeck chat send 1a2b --role assistant \"A monoid in the category...\"\n    \
    studydeck chat show 1a2b")]
pub struct Args {
    #[command(subcommand)]
    pub command: ChatCommand,
}

#[derive(Subcommand)]
pub enum ChatCommand {
    /// Start a new session
    New {
        /// Session title
        #[arg(long)]
        title: Option<String>,
    },

    /// List sessions
    List,

    /// Append a message to a session
    Send {
        /// Session ID prefix
        session: String,

        /// Message text
        content: String,

        /// Who is speaking
        #[arg(long, value_enum, default_value = "user")]
        role: MessageRole,
    },

    /// Show a session's messages in order
    Show {
        /// Session ID prefix
        session: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Delete a session and its messages
    Delete {
        /// Session ID prefix
        session: String,
    },
}

/// Executes the chat command.
pub fn run(args: Args, app: &App) -> Result<()> {
    match args.command {
        ChatCommand::New { title } => {
            let session = ChatSession::new(title);
            let stored = session.clone();
            app.store(move |db| db.chat().create_session(&stored))?;
            println!("{} session {}", "Started".green(), session.id.to_string().cyan());
            Ok(())
        }
        ChatCommand::List => run_list(app),
        ChatCommand::Send {
            session,
            content,
            role,
        } => {
            let session = resolve_session(app, &session)?;
            let id = session.id;
            let message = app.store(move |db| db.chat().append_message(&id, role, &content))?;
            println!(
                "{} message #{} to {}",
                "Appended".green(),
                message.index,
                short_id(&id).cyan()
            );
            Ok(())
        }
        ChatCommand::Show { session, format } => run_show(app, &session, format),
        ChatCommand::Delete { session } => {
            let session = resolve_session(app, &session)?;
            let id = session.id;
            let removed = app.store(move |db| db.chat().delete_session(&id))?;
            println!(
                "{} session {} ({} messages)",
                "Deleted".green(),
                short_id(&id).cyan(),
                removed
            );
            Ok(())
        }
    }
}

fn run_list(app: &App) -> Result<()> {
    let sessions = app.store(|db| db.chat().list_sessions())?;
    if sessions.is_empty() {
        println!("{}", "No chat sessions yet.".dimmed());
        return Ok(());
    }

    for session in &sessions {
        println!(
            "  {}  {}  {}",
            short_id(&session.id).cyan(),
            session.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            session.title.as_deref().unwrap_or("(untitled)")
        );
    }
    Ok(())
}

fn run_show(app: &App, prefix: &str, format: OutputFormat) -> Result<()> {
    let session = resolve_session(app, prefix)?;
    let id = session.id;
    let messages = app.store(move |db| db.chat().get_messages(&id))?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    println!(
        "{} {}  {}",
        "Session".bold(),
        session.id.to_string().cyan(),
        session.title.as_deref().unwrap_or("")
    );
    println!();
    for message in &messages {
        let role = match message.role {
            MessageRole::User => "user".blue().bold(),
            MessageRole::Assistant => "assistant".green().bold(),
            MessageRole::System => "system".dimmed(),
        };
        println!(
            "{} {}",
            role,
            message.timestamp.format("%H:%M:%S").to_string().dimmed()
        );
        println!("{}", message.content);
        println!();
    }
    Ok(())
}

/// Finds the single session whose ID starts with `prefix`.
fn resolve_session(app: &App, prefix: &str) -> Result<ChatSession> {
    let all = app.store(|db| db.chat().list_sessions())?;
    let mut matching: Vec<_> = all
        .into_iter()
        .filter(|s| s.id.to_string().starts_with(prefix))
        .collect();

    if matching.len() > 1 {
        bail!("Multiple sessions match '{prefix}'. Please use a more specific prefix.");
    }
    match matching.pop() {
        Some(session) => Ok(session),
        None => bail!(
            "No session found matching '{prefix}'. \
             Run 'studydeck chat list' to see available sessions."
        ),
    }
}
