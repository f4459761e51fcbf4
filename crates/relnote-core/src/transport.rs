//! Seams to the external chat and document-store services.
//!
//! Every call returns the uniform [`TransportError`] on failure; adapters are
//! responsible for mapping provider codes to a [`TransportErrorKind`] and for
//! bounding each request with a timeout.
//!
//! [`TransportErrorKind`]: crate::error::TransportErrorKind

use crate::channel::ChannelRef;
use crate::error::TransportError;
use crate::formatter::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type TransportResult<T> = std::result::Result<T, TransportError>;

// ---------------------------------------------------------------------------
// Data shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    /// Id of the document embedded in the channel, when the provider exposes it.
    #[serde(default)]
    pub embedded_document_id: Option<String>,
    /// The channel advertises an embedded document, whether or not its id
    /// is visible.
    #[serde(default)]
    pub has_embedded_document: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    Channel(String),
    Workspace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub title: String,
    /// Unix seconds.
    pub created_at: i64,
    #[serde(default)]
    pub associated_channels: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentPlacement {
    /// The channel's own embedded document; at most one per channel.
    ChannelEmbedded,
    /// A free-standing document shared into the channel.
    Standalone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDocument {
    pub channel_id: String,
    pub title: String,
    pub markdown: String,
    pub placement: DocumentPlacement,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post_message(&self, channel: &str, message: &ChatMessage) -> TransportResult<()>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Canonical channel id, or `None` when nothing matches.
    async fn resolve_channel(&self, channel: &ChannelRef) -> TransportResult<Option<String>>;

    async fn channel_info(&self, channel_id: &str) -> TransportResult<ChannelInfo>;

    /// Returns the new document id.
    async fn create_document(&self, request: &CreateDocument) -> TransportResult<String>;

    /// Full-content replace.
    async fn edit_document(&self, document_id: &str, markdown: &str) -> TransportResult<()>;

    async fn list_documents(&self, scope: &ListScope) -> TransportResult<Vec<DocumentSummary>>;

    /// Plain-text content of a document.
    async fn read_document(&self, document_id: &str) -> TransportResult<String>;
}
