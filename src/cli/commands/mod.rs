//! CLI commands for studydeck.
//!
//! Each submodule implements a single CLI command with its argument
//! parsing and execution logic.

/// Study-assistant chat sessions.
pub mod chat;

/// Configuration viewing and management.
pub mod config;

/// Database inspection and maintenance.
pub mod db;

/// Study document management.
pub mod docs;

/// Show store status and recent documents.
pub mod status;

/// Import document metadata from the cloud.
pub mod sync;
