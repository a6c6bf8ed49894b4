//! Core data models for studydeck
//!
//! Each struct maps one-to-one onto a table created by the schema in
//! [`super::migrations`]. Column order in the `SELECT` lists of the access
//! objects follows field order here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A study document: an exam paper, lecture, piece of study material or
/// project brief that has been imported into the local store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for this document
    pub id: Uuid,

    /// What kind of document this is
    pub doc_type: DocumentType,

    /// Processing status
    pub status: DocumentStatus,

    /// Display title
    pub title: String,

    /// Course or subject the document belongs to
    pub subject: Option<String>,

    /// Identifier of the document in the remote store, if it came from there
    pub remote_id: Option<String>,

    /// Free-form tags (persisted as a JSON array)
    pub tags: Vec<String>,

    /// When the document was imported
    pub created_at: DateTime<Utc>,

    /// When the document was last modified
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a freshly imported document with a new ID.
    pub fn new(title: impl Into<String>, doc_type: DocumentType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            doc_type,
            status: DocumentStatus::Imported,
            title: title.into(),
            subject: None,
            remote_id: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// The kind of study document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// A past or mock exam paper.
    ExamPaper,
    /// Lecture slides or notes.
    Lecture,
    /// General study material.
    StudyMaterial,
    /// A project brief or report.
    Project,
}

impl DocumentType {
    /// The value stored in the `doc_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::ExamPaper => "exam_paper",
            DocumentType::Lecture => "lecture",
            DocumentType::StudyMaterial => "study_material",
            DocumentType::Project => "project",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exam_paper" => Ok(DocumentType::ExamPaper),
            "lecture" => Ok(DocumentType::Lecture),
            "study_material" => Ok(DocumentType::StudyMaterial),
            "project" => Ok(DocumentType::Project),
            other => Err(format!("unknown document type '{other}'")),
        }
    }
}

/// Where a document is in its processing lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Metadata is stored but nothing has been done with it yet.
    Imported,
    /// Content is being fetched or summarized.
    Processing,
    /// Ready to study.
    Ready,
    /// Processing failed.
    Failed,
}

impl DocumentStatus {
    /// The value stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Imported => "imported",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "imported" => Ok(DocumentStatus::Imported),
            "processing" => Ok(DocumentStatus::Processing),
            "ready" => Ok(DocumentStatus::Ready),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status '{other}'")),
        }
    }
}

/// A generated summary of a document. At most one exists per document and
/// it is removed together with the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    /// Document this summary belongs to
    pub document_id: Uuid,

    /// Summary text
    pub summary: String,

    /// When the summary was generated
    pub generated_at: DateTime<Utc>,

    /// Whether generation finished (false for partial summaries)
    pub is_complete: bool,
}

/// A document together with its summary, if one has been generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentWithSummary {
    /// The document row
    pub document: Document,
    /// Its summary, if one has been generated
    pub summary: Option<DocumentSummary>,
}

/// A study-assistant conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSession {
    /// Unique identifier for this session
    pub id: Uuid,

    /// Optional title shown in session lists
    pub title: Option<String>,

    /// When the session was started
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    /// Creates a new, empty session.
    pub fn new(title: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            created_at: Utc::now(),
        }
    }
}

/// A single message in a chat session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Unique identifier for this message
    pub id: Uuid,

    /// Session this message belongs to
    pub session_id: Uuid,

    /// Position in the session (0-indexed, assigned on append)
    pub index: i64,

    /// Who sent this message
    pub role: MessageRole,

    /// Message text
    pub content: String,

    /// When this message was sent
    pub timestamp: DateTime<Utc>,
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The student.
    User,
    /// The study assistant.
    Assistant,
    /// A system prompt or instruction.
    System,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(format!("unknown message role '{other}'")),
        }
    }
}
