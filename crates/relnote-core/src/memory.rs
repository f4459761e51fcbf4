//! In-process chat and document-store fakes.
//!
//! They follow the provider's observable rules (one embedded document per
//! channel, `already_exists` on a second create, `not_found` for unknown
//! ids) and add knobs for the failure modes discovery has to survive:
//! propagation lag, hidden embedded ids and failing listings. The CLI's
//! `--dry-run` runs the full pipeline against them.

use crate::channel::ChannelRef;
use crate::error::{TransportError, TransportErrorKind};
use crate::formatter::ChatMessage;
use crate::transport::{
    ChannelInfo, ChatTransport, CreateDocument, DocumentPlacement, DocumentStore,
    DocumentSummary, ListScope, TransportResult,
};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// InMemoryChat
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryChat {
    sent: Mutex<Vec<(String, ChatMessage)>>,
    failure: Mutex<Option<TransportError>>,
}

impl InMemoryChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent post with `error`.
    pub fn fail_with(&self, error: TransportError) {
        *lock(&self.failure) = Some(error);
    }

    /// `(channel, message)` pairs in posting order.
    pub fn sent(&self) -> Vec<(String, ChatMessage)> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl ChatTransport for InMemoryChat {
    async fn post_message(&self, channel: &str, message: &ChatMessage) -> TransportResult<()> {
        if let Some(err) = lock(&self.failure).clone() {
            return Err(err);
        }
        lock(&self.sent).push((channel.to_string(), message.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InMemoryDocumentStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StoredChannel {
    id: String,
    name: String,
    embedded: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    summary: DocumentSummary,
    content: String,
}

#[derive(Debug)]
struct State {
    channels: Vec<StoredChannel>,
    documents: Vec<StoredDocument>,
    next_id: u64,
    clock: i64,
    /// Remaining discovery queries that see no documents.
    discovery_lag: usize,
    expose_embedded_ids: bool,
    fail_listings: bool,
    create_failure: Option<TransportError>,
    calls: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            documents: Vec::new(),
            next_id: 1,
            clock: 1_700_000_000,
            discovery_lag: 0,
            expose_embedded_ids: true,
            fail_listings: false,
            create_failure: None,
            calls: Vec::new(),
        }
    }
}

impl State {
    fn channel(&self, id: &str) -> Option<&StoredChannel> {
        self.channels.iter().find(|c| c.id == id)
    }

    fn insert_document(&mut self, channel_id: &str, title: &str, content: &str) -> String {
        let id = format!("F{:09}", self.next_id);
        self.next_id += 1;
        self.clock += 1;
        self.documents.push(StoredDocument {
            summary: DocumentSummary {
                id: id.clone(),
                name: title.to_string(),
                title: title.to_string(),
                created_at: self.clock,
                associated_channels: vec![channel_id.to_string()],
            },
            content: content.to_string(),
        });
        id
    }

    /// True while propagation lag hides documents from this query.
    fn lagging(&mut self) -> bool {
        if self.discovery_lag > 0 {
            self.discovery_lag -= 1;
            true
        } else {
            false
        }
    }
}

fn not_found(code: &str, what: &str) -> TransportError {
    TransportError::new(TransportErrorKind::NotFound, code, format!("{what} not found"))
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    state: Mutex<State>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_channel(&self, id: &str, name: &str) {
        lock(&self.state).channels.push(StoredChannel {
            id: id.to_string(),
            name: name.to_string(),
            embedded: None,
        });
    }

    /// Create the channel's embedded document directly, bypassing call
    /// bookkeeping.
    pub fn seed_embedded_document(&self, channel_id: &str, content: &str) -> String {
        let mut state = lock(&self.state);
        let id = state.insert_document(channel_id, "Canvas", content);
        if let Some(channel) = state.channels.iter_mut().find(|c| c.id == channel_id) {
            channel.embedded = Some(id.clone());
        }
        id
    }

    pub fn seed_standalone_document(&self, channel_id: &str, title: &str, content: &str) -> String {
        lock(&self.state).insert_document(channel_id, title, content)
    }

    /// Hide documents from the next `queries` channel-info and listing calls.
    pub fn set_discovery_lag(&self, queries: usize) {
        lock(&self.state).discovery_lag = queries;
    }

    /// Report embedded documents as present without exposing their ids.
    pub fn hide_embedded_ids(&self, hide: bool) {
        lock(&self.state).expose_embedded_ids = !hide;
    }

    pub fn fail_listings(&self, fail: bool) {
        lock(&self.state).fail_listings = fail;
    }

    pub fn fail_next_create(&self, error: TransportError) {
        lock(&self.state).create_failure = Some(error);
    }

    /// Drop a document as if deleted out-of-band.
    pub fn delete_document(&self, document_id: &str) {
        let mut state = lock(&self.state);
        state.documents.retain(|d| d.summary.id != document_id);
        for channel in &mut state.channels {
            if channel.embedded.as_deref() == Some(document_id) {
                channel.embedded = None;
            }
        }
    }

    pub fn content(&self, document_id: &str) -> Option<String> {
        lock(&self.state)
            .documents
            .iter()
            .find(|d| d.summary.id == document_id)
            .map(|d| d.content.clone())
    }

    pub fn document_count(&self) -> usize {
        lock(&self.state).documents.len()
    }

    /// Mutating calls made so far (`create:<id>`, `edit:<id>`).
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn resolve_channel(&self, channel: &ChannelRef) -> TransportResult<Option<String>> {
        let state = lock(&self.state);
        let found = state.channels.iter().find(|c| match channel {
            ChannelRef::Id(id) => c.id == *id,
            ChannelRef::Name(name) => c.name == *name,
        });
        Ok(found.map(|c| c.id.clone()))
    }

    async fn channel_info(&self, channel_id: &str) -> TransportResult<ChannelInfo> {
        let mut state = lock(&self.state);
        let lagging = state.lagging();
        let expose = state.expose_embedded_ids;
        let channel = state
            .channel(channel_id)
            .ok_or_else(|| not_found("channel_not_found", "channel"))?;
        let embedded = if lagging { None } else { channel.embedded.clone() };
        Ok(ChannelInfo {
            id: channel.id.clone(),
            name: channel.name.clone(),
            has_embedded_document: embedded.is_some(),
            embedded_document_id: embedded.filter(|_| expose),
        })
    }

    async fn create_document(&self, request: &CreateDocument) -> TransportResult<String> {
        let mut state = lock(&self.state);
        if let Some(err) = state.create_failure.take() {
            return Err(err);
        }
        let channel = state
            .channel(&request.channel_id)
            .ok_or_else(|| not_found("channel_not_found", "channel"))?;
        if request.placement == DocumentPlacement::ChannelEmbedded && channel.embedded.is_some() {
            return Err(TransportError::new(
                TransportErrorKind::AlreadyExists,
                "channel_canvas_already_exists",
                "channel already has a canvas",
            ));
        }
        let id = state.insert_document(&request.channel_id, &request.title, &request.markdown);
        if request.placement == DocumentPlacement::ChannelEmbedded {
            if let Some(channel) = state.channels.iter_mut().find(|c| c.id == request.channel_id) {
                channel.embedded = Some(id.clone());
            }
        }
        state.calls.push(format!("create:{id}"));
        Ok(id)
    }

    async fn edit_document(&self, document_id: &str, markdown: &str) -> TransportResult<()> {
        let mut state = lock(&self.state);
        let doc = state
            .documents
            .iter_mut()
            .find(|d| d.summary.id == document_id)
            .ok_or_else(|| not_found("canvas_not_found", "canvas"))?;
        doc.content = markdown.to_string();
        state.calls.push(format!("edit:{document_id}"));
        Ok(())
    }

    async fn list_documents(&self, scope: &ListScope) -> TransportResult<Vec<DocumentSummary>> {
        let mut state = lock(&self.state);
        if state.fail_listings {
            return Err(TransportError::new(
                TransportErrorKind::Other,
                "internal_error",
                "listing unavailable",
            ));
        }
        if state.lagging() {
            return Ok(Vec::new());
        }
        let docs = state
            .documents
            .iter()
            .filter(|d| match scope {
                ListScope::Channel(id) => d.summary.associated_channels.contains(id),
                ListScope::Workspace => true,
            })
            .map(|d| d.summary.clone())
            .collect();
        Ok(docs)
    }

    async fn read_document(&self, document_id: &str) -> TransportResult<String> {
        self.content(document_id)
            .ok_or_else(|| not_found("file_not_found", "canvas"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(channel: &str, placement: DocumentPlacement) -> CreateDocument {
        CreateDocument {
            channel_id: channel.to_string(),
            title: "releases Releases".to_string(),
            markdown: "# hi".to_string(),
            placement,
        }
    }

    #[tokio::test]
    async fn second_embedded_create_is_already_exists() {
        let store = InMemoryDocumentStore::new();
        store.add_channel("C1", "releases");
        store
            .create_document(&create("C1", DocumentPlacement::ChannelEmbedded))
            .await
            .unwrap();
        let err = store
            .create_document(&create("C1", DocumentPlacement::ChannelEmbedded))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        store
            .create_document(&create("C1", DocumentPlacement::Standalone))
            .await
            .unwrap();
        assert_eq!(store.document_count(), 2);
    }

    #[tokio::test]
    async fn lag_hides_then_reveals() {
        let store = InMemoryDocumentStore::new();
        store.add_channel("C1", "releases");
        let id = store.seed_embedded_document("C1", "x");
        store.set_discovery_lag(1);
        assert!(store.channel_info("C1").await.unwrap().embedded_document_id.is_none());
        assert_eq!(
            store.channel_info("C1").await.unwrap().embedded_document_id,
            Some(id)
        );
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = InMemoryDocumentStore::new();
        let err = store.edit_document("F404", "x").await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::NotFound);
        assert!(store.resolve_channel(&ChannelRef::Name("nope".into())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn chat_records_and_fails_on_demand() {
        let chat = InMemoryChat::new();
        let msg = ChatMessage {
            title: "t".into(),
            color: "#36a64f".into(),
            body: "b".into(),
        };
        chat.post_message("C1", &msg).await.unwrap();
        chat.fail_with(TransportError::new(
            TransportErrorKind::NotInChannel,
            "not_in_channel",
            "nope",
        ));
        assert!(chat.post_message("C1", &msg).await.is_err());
        assert_eq!(chat.sent().len(), 1);
    }
}
