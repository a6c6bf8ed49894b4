//! Command-line interface for studydeck.
//!
//! The CLI is the presentation layer: it reaches the store only through
//! the access objects handed out by [`app::App`].

pub mod app;

/// Individual CLI command implementations.
pub mod commands;

pub mod format;
