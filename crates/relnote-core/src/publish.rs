//! One release event end to end: analyze, notify the channel, then record
//! the release in the channel's history document.

use crate::analysis::ReleaseAnalysis;
use crate::document::ReleaseEntry;
use crate::error::{RelnoteError, Result};
use crate::formatter::{self, ChatMessage};
use crate::metadata::MetadataStore;
use crate::reconcile::{ReconcileAction, ReconcileSettings, Reconciler};
use crate::transport::{ChatTransport, DocumentStore};
use crate::types::{Classification, ReleaseEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChatStatus {
    Sent,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HistoryStatus {
    Disabled,
    Created { document_id: String, entries: usize },
    Edited { document_id: String, entries: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub classification: Classification,
    pub message: ChatMessage,
    pub chat: ChatStatus,
    pub history: HistoryStatus,
}

impl PublishReport {
    /// The chat notification is the primary output; history failures only
    /// warn.
    pub fn is_success(&self) -> bool {
        self.chat == ChatStatus::Sent
    }
}

/// Where the history goes; absent means history is disabled.
pub struct History<'a> {
    pub store: &'a dyn DocumentStore,
    pub metadata: Option<&'a dyn MetadataStore>,
    pub settings: &'a ReconcileSettings,
}

pub struct Publisher<'a> {
    chat: &'a dyn ChatTransport,
    history: Option<History<'a>>,
}

impl<'a> Publisher<'a> {
    pub fn new(chat: &'a dyn ChatTransport) -> Self {
        Self { chat, history: None }
    }

    pub fn with_history(mut self, history: History<'a>) -> Self {
        self.history = Some(history);
        self
    }

    /// Fails only on missing input. Transport failures are captured in the
    /// report so both outcomes are always visible.
    pub async fn publish(&self, channel: &str, event: &ReleaseEvent, now: DateTime<Utc>) -> Result<PublishReport> {
        if channel.trim().is_empty() {
            return Err(RelnoteError::MissingInput("channel"));
        }
        if event.version.trim().is_empty() {
            return Err(RelnoteError::MissingInput("version"));
        }

        let analysis = ReleaseAnalysis::of(event.notes());
        let classification = analysis.classification();
        let message = formatter::render_chat_message(event, classification, &analysis, now);

        let chat = match self.chat.post_message(channel.trim(), &message).await {
            Ok(()) => {
                tracing::info!(channel = %channel, classification = %classification, "release notification sent");
                ChatStatus::Sent
            }
            Err(e) => {
                tracing::error!(channel = %channel, error = %e, "release notification failed");
                ChatStatus::Failed {
                    reason: RelnoteError::from(e).to_string(),
                }
            }
        };

        let history = match &self.history {
            None => HistoryStatus::Disabled,
            Some(h) => {
                let mut reconciler = Reconciler::new(h.store, h.settings);
                if let Some(metadata) = h.metadata {
                    reconciler = reconciler.with_metadata(metadata);
                }
                let entry = ReleaseEntry::from_event(event, &analysis, now);
                match reconciler.try_reconcile(channel, entry).await {
                    Ok(outcome) => match outcome.action {
                        ReconcileAction::Created => HistoryStatus::Created {
                            document_id: outcome.document_id,
                            entries: outcome.entry_count,
                        },
                        ReconcileAction::Edited => HistoryStatus::Edited {
                            document_id: outcome.document_id,
                            entries: outcome.entry_count,
                        },
                    },
                    Err(e) => {
                        tracing::warn!(channel = %channel, error = %e, "release history update failed");
                        HistoryStatus::Failed { reason: e.to_string() }
                    }
                }
            }
        };

        Ok(PublishReport {
            classification,
            message,
            chat,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{DiscoveryPlan, DiscoveryStrategy};
    use crate::error::{TransportError, TransportErrorKind};
    use crate::memory::{InMemoryChat, InMemoryDocumentStore};
    use crate::metadata::{InMemoryMetadataStore, MetadataKey};
    use crate::types::DocumentScope;
    use chrono::TimeZone;
    use std::time::Duration;

    const CHANNEL: &str = "C0000000001";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap()
    }

    fn settings() -> ReconcileSettings {
        ReconcileSettings {
            plan: DiscoveryPlan::new(DiscoveryStrategy::all().to_vec(), Duration::ZERO),
            ..ReconcileSettings::default()
        }
    }

    #[tokio::test]
    async fn missing_inputs_fail_without_side_effects() {
        let chat = InMemoryChat::new();
        let publisher = Publisher::new(&chat);
        let event = ReleaseEvent::new("", "api");
        let err = publisher.publish(CHANNEL, &event, now()).await.unwrap_err();
        assert!(matches!(err, RelnoteError::MissingInput("version")));
        let err = publisher
            .publish("  ", &ReleaseEvent::new("v1", "api"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, RelnoteError::MissingInput("channel")));
        assert!(chat.sent().is_empty());
    }

    #[tokio::test]
    async fn first_release_posts_and_creates_history() {
        let chat = InMemoryChat::new();
        let store = InMemoryDocumentStore::new();
        store.add_channel(CHANNEL, "releases");
        let meta = InMemoryMetadataStore::new();
        let settings = settings();
        let publisher = Publisher::new(&chat).with_history(History {
            store: &store,
            metadata: Some(&meta),
            settings: &settings,
        });

        let event = ReleaseEvent::new("v1.4.0", "api").with_notes("## Breaking Changes\n- Removed /v1 endpoints");
        let report = publisher.publish(CHANNEL, &event, now()).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.classification, Classification::Breaking);
        assert_eq!(chat.sent()[0].1.title, "[api] ⚠️🚀 BREAKING RELEASE: v1.4.0");

        let HistoryStatus::Created { document_id, entries } = report.history else {
            panic!("expected created, got {:?}", report.history);
        };
        assert_eq!(entries, 1);
        let parsed = crate::document::parse_entries(&store.content(&document_id).unwrap());
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].version, "v1.4.0");
        assert_eq!(parsed[0].release_date, "2026-10-17");
        let key = MetadataKey::new(DocumentScope::Channel, CHANNEL, None);
        assert_eq!(meta.get(&key).await.unwrap().unwrap().document_id, document_id);
    }

    #[tokio::test]
    async fn history_failure_does_not_fail_publish() {
        let chat = InMemoryChat::new();
        let store = InMemoryDocumentStore::new();
        let settings = settings();
        let publisher = Publisher::new(&chat).with_history(History {
            store: &store,
            metadata: None,
            settings: &settings,
        });
        let report = publisher
            .publish("#unknown", &ReleaseEvent::new("v1", "api"), now())
            .await
            .unwrap();
        assert!(report.is_success());
        assert!(matches!(report.history, HistoryStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn chat_failure_is_reported_and_history_still_runs() {
        let chat = InMemoryChat::new();
        chat.fail_with(TransportError::new(
            TransportErrorKind::NotInChannel,
            "not_in_channel",
            "chat.postMessage failed",
        ));
        let store = InMemoryDocumentStore::new();
        store.add_channel(CHANNEL, "releases");
        let settings = settings();
        let publisher = Publisher::new(&chat).with_history(History {
            store: &store,
            metadata: None,
            settings: &settings,
        });
        let report = publisher
            .publish(CHANNEL, &ReleaseEvent::new("v1", "api"), now())
            .await
            .unwrap();
        assert!(!report.is_success());
        let ChatStatus::Failed { reason } = &report.chat else {
            panic!("chat should have failed");
        };
        assert!(reason.contains("/invite"));
        assert!(matches!(report.history, HistoryStatus::Created { .. }));
    }

    #[tokio::test]
    async fn disabled_history_touches_no_store() {
        let chat = InMemoryChat::new();
        let report = Publisher::new(&chat)
            .publish(CHANNEL, &ReleaseEvent::new("v1", ""), now())
            .await
            .unwrap();
        assert_eq!(report.history, HistoryStatus::Disabled);
        assert_eq!(report.classification, Classification::Normal);
    }
}
