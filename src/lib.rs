//! studydeck - local store for study documents and assistant chats
//!
//! A versioned SQLite store of exam papers, lectures, study material and
//! projects, their generated summaries, and study-assistant conversations,
//! with metadata import from a remote document store.

pub mod cloud;
pub mod config;
pub mod storage;
