//! Canvas-backed [`DocumentStore`].

use crate::client::SlackClient;
use crate::types::{CanvasCreated, ConversationInfo, ConversationList, File, FileInfo, FileList};
use async_trait::async_trait;
use relnote_core::channel::ChannelRef;
use relnote_core::transport::{
    ChannelInfo, CreateDocument, DocumentPlacement, DocumentStore, DocumentSummary, ListScope,
    TransportResult,
};
use serde::Deserialize;
use serde_json::json;

/// Upper bound on pages walked by one listing call.
const MAX_PAGES: u32 = 10;
const PAGE_SIZE: u32 = 200;

#[derive(Debug, Deserialize)]
struct Empty {}

fn markdown_content(markdown: &str) -> serde_json::Value {
    json!({ "type": "markdown", "markdown": markdown })
}

fn summary(file: File) -> DocumentSummary {
    let mut associated_channels = file.channels;
    associated_channels.extend(file.groups);
    DocumentSummary {
        id: file.id,
        name: file.name,
        title: file.title,
        created_at: file.created,
        associated_channels,
    }
}

impl SlackClient {
    async fn find_channel_by_name(&self, name: &str) -> TransportResult<Option<String>> {
        let wanted = name.to_lowercase();
        let mut cursor = String::new();
        for _ in 0..MAX_PAGES {
            let mut params = vec![
                ("types", "public_channel,private_channel".to_string()),
                ("exclude_archived", "true".to_string()),
                ("limit", PAGE_SIZE.to_string()),
            ];
            if !cursor.is_empty() {
                params.push(("cursor", cursor.clone()));
            }
            let page: ConversationList = self.post_form("conversations.list", &params).await?;
            if let Some(channel) = page.channels.iter().find(|c| c.name.to_lowercase() == wanted) {
                return Ok(Some(channel.id.clone()));
            }
            cursor = page
                .response_metadata
                .map(|m| m.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                return Ok(None);
            }
        }
        tracing::warn!(name, "channel lookup stopped after {MAX_PAGES} pages");
        Ok(None)
    }
}

#[async_trait]
impl DocumentStore for SlackClient {
    async fn resolve_channel(&self, channel: &ChannelRef) -> TransportResult<Option<String>> {
        match channel {
            ChannelRef::Id(id) => Ok(Some(id.clone())),
            ChannelRef::Name(name) => self.find_channel_by_name(name).await,
        }
    }

    async fn channel_info(&self, channel_id: &str) -> TransportResult<ChannelInfo> {
        let info: ConversationInfo = self
            .post_form("conversations.info", &[("channel", channel_id.to_string())])
            .await?;
        let channel = info.channel;
        Ok(ChannelInfo {
            embedded_document_id: channel.canvas_id(),
            has_embedded_document: channel.has_canvas(),
            id: channel.id,
            name: channel.name,
        })
    }

    async fn create_document(&self, request: &CreateDocument) -> TransportResult<String> {
        let created: CanvasCreated = match request.placement {
            DocumentPlacement::ChannelEmbedded => {
                self.post_json(
                    "conversations.canvases.create",
                    &json!({
                        "channel_id": request.channel_id,
                        "title": request.title,
                        "document_content": markdown_content(&request.markdown),
                    }),
                )
                .await?
            }
            DocumentPlacement::Standalone => {
                self.post_json(
                    "canvases.create",
                    &json!({
                        "title": request.title,
                        "channel_id": request.channel_id,
                        "document_content": markdown_content(&request.markdown),
                    }),
                )
                .await?
            }
        };
        Ok(created.canvas_id)
    }

    async fn edit_document(&self, document_id: &str, markdown: &str) -> TransportResult<()> {
        let _: Empty = self
            .post_json(
                "canvases.edit",
                &json!({
                    "canvas_id": document_id,
                    "changes": [{
                        "operation": "replace",
                        "document_content": markdown_content(markdown),
                    }],
                }),
            )
            .await?;
        Ok(())
    }

    async fn list_documents(&self, scope: &ListScope) -> TransportResult<Vec<DocumentSummary>> {
        let mut docs = Vec::new();
        let mut page = 1;
        loop {
            let mut params = vec![
                ("types", "canvas".to_string()),
                ("count", PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ];
            if let ListScope::Channel(id) = scope {
                params.push(("channel", id.clone()));
            }
            let listing: FileList = self.post_form("files.list", &params).await?;
            docs.extend(listing.files.into_iter().map(summary));

            let pages = listing.paging.map(|p| p.pages).unwrap_or(1);
            if page >= pages || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }
        Ok(docs)
    }

    async fn read_document(&self, document_id: &str) -> TransportResult<String> {
        let info: FileInfo = self
            .post_form("files.info", &[("file", document_id.to_string())])
            .await?;
        Ok(info
            .content
            .or(info.file.plain_text)
            .or(info.file.preview)
            .unwrap_or_default())
    }
}
