//! Remote document store.
//!
//! The remote store is a black box that lists study documents. The local
//! store mirrors their metadata; retry and authentication semantics belong
//! to the remote service.
//!
//! # Submodules
//!
//! - `client` - HTTP client for the document API
//! - `import` - Copies remote document metadata into the local store

pub mod client;
pub mod import;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::models::DocumentType;

pub use client::CloudClient;
pub use import::{import_remote, ImportReport};

/// Default cloud service URL.
pub const DEFAULT_CLOUD_URL: &str = "https://api.studydeck.app";

/// Custom error type for cloud operations.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// No access token configured.
    #[error("Not logged in. Set 'cloud_token' with 'studydeck config set'.")]
    NotLoggedIn,

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },
}

/// Metadata of a document held by the remote store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    /// Identifier in the remote store.
    pub id: String,

    /// Document title.
    pub title: String,

    /// Kind of document.
    pub doc_type: DocumentType,

    /// Course or subject, if the remote store knows it.
    #[serde(default)]
    pub subject: Option<String>,

    /// Labels attached remotely.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Last modification time on the remote side.
    pub modified_at: DateTime<Utc>,
}

/// Anything that can list remote documents.
pub trait RemoteStore {
    fn list_documents(&self) -> Result<Vec<RemoteDocument>, CloudError>;
}
