//! Create-or-update of the persistent release history document.
//!
//! One reconcile resolves the channel, discovers the existing document,
//! loads prior entries, prepends the new entry, and writes the whole
//! document back. Runs are not serialized against each other: two
//! concurrent reconciles for the same channel can each read the same prior
//! entries and the later edit wins.

use crate::channel::ChannelRef;
use crate::discovery::{Discoverer, Discovery, DiscoveryPlan, DiscoveryStrategy, DiscoveryTarget, DocumentHit};
use crate::document::{self, ReleaseEntry, ReleasesDocument, DEFAULT_RECENT_COUNT, DEFAULT_RETENTION};
use crate::error::{RelnoteError, Result, TransportErrorKind};
use crate::metadata::{CanvasMetadata, MetadataKey, MetadataStore};
use crate::transport::{ChannelInfo, CreateDocument, DocumentPlacement, DocumentStore};
use crate::types::DocumentScope;
use chrono::Utc;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Settings and outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub scope: DocumentScope,
    pub retention: usize,
    pub recent_count: usize,
    pub plan: DiscoveryPlan,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            scope: DocumentScope::Channel,
            retention: DEFAULT_RETENTION,
            recent_count: DEFAULT_RECENT_COUNT,
            plan: DiscoveryPlan::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    Created,
    Edited,
}

/// Where the prior entries came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    EntryLog,
    Scraped,
    Empty,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub channel_id: String,
    pub document_id: String,
    pub action: ReconcileAction,
    pub entry_count: usize,
    pub entries_from: EntrySource,
}

/// Everything one reconcile needs to know about where it is writing.
struct Target {
    channel: ChannelInfo,
    key: MetadataKey,
    /// Heading name: the channel name, or the repository in repository scope.
    name: String,
    repository: Option<String>,
}

impl Target {
    fn discovery(&self, scope: DocumentScope) -> DiscoveryTarget<'_> {
        DiscoveryTarget {
            channel: &self.channel,
            scope,
            repository: self.repository.as_deref(),
            key: &self.key,
        }
    }

    fn ambiguous(&self, reason: String) -> RelnoteError {
        RelnoteError::DiscoveryAmbiguous {
            key: self.key.to_string(),
            reason,
        }
    }

    fn incomplete(&self, reason: String) -> RelnoteError {
        RelnoteError::DiscoveryIncomplete {
            key: self.key.to_string(),
            reason,
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler<'a> {
    store: &'a dyn DocumentStore,
    metadata: Option<&'a dyn MetadataStore>,
    settings: &'a ReconcileSettings,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn DocumentStore, settings: &'a ReconcileSettings) -> Self {
        Self {
            store,
            metadata: None,
            settings,
        }
    }

    pub fn with_metadata(mut self, metadata: &'a dyn MetadataStore) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Record `entry` in the channel's history. Failures are logged and
    /// reported as `false`; nothing propagates to the caller.
    pub async fn reconcile(&self, channel: &str, entry: ReleaseEntry) -> bool {
        match self.try_reconcile(channel, entry).await {
            Ok(outcome) => {
                tracing::info!(
                    channel_id = %outcome.channel_id,
                    document_id = %outcome.document_id,
                    action = ?outcome.action,
                    entries = outcome.entry_count,
                    "release history updated"
                );
                true
            }
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "release history update failed");
                false
            }
        }
    }

    pub async fn try_reconcile(&self, channel: &str, entry: ReleaseEntry) -> Result<ReconcileOutcome> {
        let target = self.resolve_target(channel, &entry).await?;
        let discoverer = Discoverer::new(self.store, self.metadata, &self.settings.plan);

        match discoverer.discover(&target.discovery(self.settings.scope)).await {
            Discovery::Found(hit) => match self.edit_existing(&target, &hit, entry.clone()).await {
                Err(RelnoteError::Transport(e))
                    if e.kind == TransportErrorKind::NotFound && hit.via == DiscoveryStrategy::MetadataCache =>
                {
                    tracing::warn!(
                        document_id = %hit.document_id,
                        key = %target.key,
                        "cached document is gone; rediscovering"
                    );
                    self.rediscover_or_create(&target, entry).await
                }
                other => other,
            },
            Discovery::NotFound { suspected: None } => self.create_new(&target, entry).await,
            Discovery::NotFound { suspected: Some(reason) } => Err(target.ambiguous(reason)),
            Discovery::Incomplete { reason } => Err(target.incomplete(reason)),
        }
    }

    async fn resolve_target(&self, raw: &str, entry: &ReleaseEntry) -> Result<Target> {
        let channel_ref = ChannelRef::parse(raw).ok_or(RelnoteError::MissingInput("channel"))?;
        let channel_id = self
            .store
            .resolve_channel(&channel_ref)
            .await?
            .ok_or_else(|| RelnoteError::ChannelNotFound(channel_ref.to_string()))?;
        let channel = self.store.channel_info(&channel_id).await?;

        let repository = entry
            .repository_name
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        let name = match self.settings.scope {
            DocumentScope::Channel => channel.name.clone(),
            DocumentScope::Repository => repository
                .clone()
                .ok_or(RelnoteError::MissingInput("repository"))?,
        };
        let key = MetadataKey::new(self.settings.scope, &channel.id, repository.as_deref());
        Ok(Target {
            channel,
            key,
            name,
            repository,
        })
    }

    /// Discovery without the metadata cache; create only if that also misses.
    async fn rediscover_or_create(&self, target: &Target, entry: ReleaseEntry) -> Result<ReconcileOutcome> {
        let plan = self.settings.plan.without(DiscoveryStrategy::MetadataCache);
        let discoverer = Discoverer::new(self.store, None, &plan);
        match discoverer.discover(&target.discovery(self.settings.scope)).await {
            Discovery::Found(hit) => self.edit_existing(target, &hit, entry).await,
            Discovery::NotFound { suspected: None } => self.create_new(target, entry).await,
            Discovery::NotFound { suspected: Some(reason) } => Err(target.ambiguous(reason)),
            Discovery::Incomplete { reason } => Err(target.incomplete(reason)),
        }
    }

    async fn edit_existing(&self, target: &Target, hit: &DocumentHit, entry: ReleaseEntry) -> Result<ReconcileOutcome> {
        let (prior, entries_from) = self.load_prior_entries(&target.key, &hit.document_id).await;
        let mut doc = ReleasesDocument::new(&target.channel.id, prior);
        doc.document_id = Some(hit.document_id.clone());
        doc.record(entry, self.settings.retention);

        let markdown = document::render(&target.name, &doc.entries, self.settings.recent_count);
        self.store.edit_document(&hit.document_id, &markdown).await?;
        self.persist(target, &hit.document_id, &doc.entries).await;

        Ok(ReconcileOutcome {
            channel_id: target.channel.id.clone(),
            document_id: hit.document_id.clone(),
            action: ReconcileAction::Edited,
            entry_count: doc.entries.len(),
            entries_from,
        })
    }

    async fn create_new(&self, target: &Target, entry: ReleaseEntry) -> Result<ReconcileOutcome> {
        // A fresh document starts from whatever the entry log still holds, so
        // history survives the old document being deleted.
        let (prior, entries_from) = match self.logged_entries(&target.key).await {
            Some(entries) if !entries.is_empty() => (entries, EntrySource::EntryLog),
            _ => (Vec::new(), EntrySource::Empty),
        };
        let mut doc = ReleasesDocument::new(&target.channel.id, prior);
        doc.record(entry.clone(), self.settings.retention);

        let request = CreateDocument {
            channel_id: target.channel.id.clone(),
            title: document::document_title(&target.name),
            markdown: document::render(&target.name, &doc.entries, self.settings.recent_count),
            placement: match self.settings.scope {
                DocumentScope::Channel => DocumentPlacement::ChannelEmbedded,
                DocumentScope::Repository => DocumentPlacement::Standalone,
            },
        };

        let document_id = match self.store.create_document(&request).await {
            Ok(id) => id,
            Err(e) if e.is_already_exists() => {
                tracing::warn!(
                    channel_id = %target.channel.id,
                    "document already exists; running one more discovery pass"
                );
                let plan = self.settings.plan.without(DiscoveryStrategy::MetadataCache);
                let discoverer = Discoverer::new(self.store, None, &plan);
                return match discoverer.discover(&target.discovery(self.settings.scope)).await {
                    Discovery::Found(hit) => self.edit_existing(target, &hit, entry).await,
                    Discovery::NotFound { suspected: None } => Err(target.ambiguous(e.diagnostic())),
                    Discovery::NotFound { suspected: Some(reason) } => Err(target.ambiguous(reason)),
                    Discovery::Incomplete { reason } => Err(target.incomplete(reason)),
                };
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(document_id = %document_id, title = %request.title, "release document created");
        self.persist(target, &document_id, &doc.entries).await;
        Ok(ReconcileOutcome {
            channel_id: target.channel.id.clone(),
            document_id,
            action: ReconcileAction::Created,
            entry_count: doc.entries.len(),
            entries_from,
        })
    }

    async fn logged_entries(&self, key: &MetadataKey) -> Option<Vec<ReleaseEntry>> {
        let metadata = self.metadata?;
        match metadata.load_entries(key).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "entry log unreadable");
                None
            }
        }
    }

    /// Prefer the entry log when it belongs to `document_id`; otherwise
    /// recover entries from the document itself.
    async fn load_prior_entries(&self, key: &MetadataKey, document_id: &str) -> (Vec<ReleaseEntry>, EntrySource) {
        if let Some(metadata) = self.metadata {
            let same_document = match metadata.get(key).await {
                Ok(record) => record.is_some_and(|r| r.document_id == document_id),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "metadata lookup failed");
                    false
                }
            };
            if same_document {
                if let Some(entries) = self.logged_entries(key).await {
                    return (entries, EntrySource::EntryLog);
                }
            }
        }

        match self.store.read_document(document_id).await {
            Ok(content) => {
                let entries = document::parse_entries(&content);
                if entries.is_empty() {
                    if !content.trim().is_empty() {
                        tracing::warn!(document_id = %document_id, "no release entries recovered from existing document");
                    }
                    (entries, EntrySource::Empty)
                } else {
                    (entries, EntrySource::Scraped)
                }
            }
            Err(e) => {
                tracing::warn!(document_id = %document_id, error = %e, "could not read existing document; starting fresh");
                (Vec::new(), EntrySource::Empty)
            }
        }
    }

    async fn persist(&self, target: &Target, document_id: &str, entries: &[ReleaseEntry]) {
        let Some(metadata) = self.metadata else {
            return;
        };
        let record = CanvasMetadata {
            document_id: document_id.to_string(),
            channel_id: target.channel.id.clone(),
            channel_name: target.channel.name.clone(),
            last_updated: Utc::now(),
            entry_count: entries.len(),
        };
        if let Err(e) = metadata.put(&target.key, &record).await {
            tracing::warn!(key = %target.key, error = %e, "failed to record document metadata");
        }
        if let Err(e) = metadata.save_entries(&target.key, entries).await {
            tracing::warn!(key = %target.key, error = %e, "failed to save entry log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::memory::InMemoryDocumentStore;
    use crate::metadata::InMemoryMetadataStore;
    use crate::types::Classification;
    use std::time::Duration;

    const CHANNEL: &str = "C0000000001";

    fn settings(scope: DocumentScope) -> ReconcileSettings {
        ReconcileSettings {
            scope,
            plan: DiscoveryPlan::new(DiscoveryStrategy::all().to_vec(), Duration::ZERO),
            ..ReconcileSettings::default()
        }
    }

    fn entry(version: &str) -> ReleaseEntry {
        ReleaseEntry {
            version: version.to_string(),
            release_date: "2026-10-17".to_string(),
            classification: Classification::Normal,
            has_breaking: false,
            has_config: false,
            has_e2e: false,
            release_url: None,
            repository_name: Some("web".to_string()),
        }
    }

    fn store() -> InMemoryDocumentStore {
        let store = InMemoryDocumentStore::new();
        store.add_channel(CHANNEL, "releases");
        store
    }

    #[tokio::test]
    async fn first_run_creates_then_edits_same_document() {
        let store = store();
        let meta = InMemoryMetadataStore::new();
        let settings = settings(DocumentScope::Channel);
        let rec = Reconciler::new(&store, &settings).with_metadata(&meta);

        let first = rec.try_reconcile("#releases", entry("v1.0.0")).await.unwrap();
        assert_eq!(first.action, ReconcileAction::Created);
        let second = rec.try_reconcile(CHANNEL, entry("v1.1.0")).await.unwrap();
        assert_eq!(second.action, ReconcileAction::Edited);
        assert_eq!(second.document_id, first.document_id);
        assert_eq!(second.entries_from, EntrySource::EntryLog);
        assert_eq!(store.document_count(), 1);

        let md = store.content(&first.document_id).unwrap();
        assert!(md.starts_with("# 📦 releases Releases"));
        assert!(md.find("v1.1.0").unwrap() < md.find("v1.0.0").unwrap());
    }

    #[tokio::test]
    async fn history_is_capped_at_retention() {
        let store = store();
        let settings = settings(DocumentScope::Channel);
        let rec = Reconciler::new(&store, &settings);
        for i in 0..51 {
            assert!(rec.reconcile(CHANNEL, entry(&format!("v1.0.{i}"))).await);
        }
        let id = store.calls()[0].trim_start_matches("create:").to_string();
        let entries = document::parse_entries(&store.content(&id).unwrap());
        assert_eq!(entries.len(), 50);
        assert_eq!(entries[0].version, "v1.0.50");
        assert!(!entries.iter().any(|e| e.version == "v1.0.0"));
    }

    #[tokio::test]
    async fn without_metadata_entries_are_scraped() {
        let store = store();
        let id = store.seed_embedded_document(
            CHANNEL,
            "• 🚀 v0.9.0 | 2026-09-01\n• ⚠🚀 v0.8.0 | 2026-08-01 | ⚠ Breaking",
        );
        let settings = settings(DocumentScope::Channel);
        let outcome = Reconciler::new(&store, &settings)
            .try_reconcile(CHANNEL, entry("v1.0.0"))
            .await
            .unwrap();
        assert_eq!(outcome.document_id, id);
        assert_eq!(outcome.entries_from, EntrySource::Scraped);
        assert_eq!(outcome.entry_count, 3);
        assert!(store.content(&id).unwrap().contains("- Breaking changes: 1"));
    }

    #[tokio::test]
    async fn stale_cache_recovers_by_rediscovery() {
        let store = store();
        let meta = InMemoryMetadataStore::new();
        let settings = settings(DocumentScope::Channel);
        let rec = Reconciler::new(&store, &settings).with_metadata(&meta);

        let first = rec.try_reconcile(CHANNEL, entry("v1.0.0")).await.unwrap();
        store.delete_document(&first.document_id);

        let second = rec.try_reconcile(CHANNEL, entry("v1.1.0")).await.unwrap();
        assert_eq!(second.action, ReconcileAction::Created);
        assert_ne!(second.document_id, first.document_id);
        // Seeded from the entry log, so the old release survives.
        assert_eq!(second.entry_count, 2);
        let cached = meta
            .get(&MetadataKey::new(DocumentScope::Channel, CHANNEL, None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.document_id, second.document_id);
    }

    #[tokio::test]
    async fn already_exists_race_edits_after_rediscovery() {
        let store = store();
        let id = store.seed_embedded_document(CHANNEL, "");
        // Initial channel info plus three first-pass queries miss the document.
        store.set_discovery_lag(4);
        let settings = settings(DocumentScope::Channel);
        let outcome = Reconciler::new(&store, &settings)
            .try_reconcile(CHANNEL, entry("v1.0.0"))
            .await
            .unwrap();
        assert_eq!(outcome.action, ReconcileAction::Edited);
        assert_eq!(outcome.document_id, id);
        assert_eq!(store.document_count(), 1);
    }

    #[tokio::test]
    async fn already_exists_with_no_document_found_is_ambiguous() {
        let store = store();
        store.seed_embedded_document(CHANNEL, "");
        store.set_discovery_lag(usize::MAX);
        let settings = settings(DocumentScope::Channel);
        let rec = Reconciler::new(&store, &settings);
        let err = rec.try_reconcile(CHANNEL, entry("v1.0.0")).await.unwrap_err();
        assert!(matches!(err, RelnoteError::DiscoveryAmbiguous { .. }));
        assert!(!rec.reconcile(CHANNEL, entry("v1.0.0")).await);
        assert_eq!(store.document_count(), 1);
    }

    #[tokio::test]
    async fn hidden_embedded_id_is_not_duplicated() {
        let store = store();
        store.seed_embedded_document(CHANNEL, "");
        store.hide_embedded_ids(true);
        store.fail_listings(true);
        let settings = settings(DocumentScope::Channel);
        let err = Reconciler::new(&store, &settings)
            .try_reconcile(CHANNEL, entry("v1.0.0"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelnoteError::DiscoveryAmbiguous { .. }));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn repository_scope_keeps_one_document_per_repository() {
        let store = store();
        let meta = InMemoryMetadataStore::new();
        let settings = settings(DocumentScope::Repository);
        let rec = Reconciler::new(&store, &settings).with_metadata(&meta);

        let mut api = entry("v1.0.0");
        api.repository_name = Some("api".into());
        let web = rec.try_reconcile(CHANNEL, entry("v2.0.0")).await.unwrap();
        let api = rec.try_reconcile(CHANNEL, api).await.unwrap();
        assert_ne!(web.document_id, api.document_id);

        let again = rec.try_reconcile(CHANNEL, entry("v2.1.0")).await.unwrap();
        assert_eq!(again.document_id, web.document_id);
        assert!(store.content(&web.document_id).unwrap().starts_with("# 📦 web Releases"));
    }

    #[tokio::test]
    async fn failed_listing_never_duplicates_repository_document() {
        let store = store();
        let existing = store.seed_standalone_document(CHANNEL, "web Releases", "# 📦 web Releases");
        store.fail_listings(true);
        let settings = settings(DocumentScope::Repository);
        let rec = Reconciler::new(&store, &settings);

        let err = rec.try_reconcile(CHANNEL, entry("v2.0.0")).await.unwrap_err();
        assert!(matches!(err, RelnoteError::DiscoveryIncomplete { .. }), "{err}");
        assert!(err.to_string().contains("did not complete"));
        assert_eq!(store.document_count(), 1);
        assert!(store.calls().is_empty());

        store.fail_listings(false);
        let outcome = rec.try_reconcile(CHANNEL, entry("v2.0.0")).await.unwrap();
        assert_eq!(outcome.action, ReconcileAction::Edited);
        assert_eq!(outcome.document_id, existing);
    }

    #[tokio::test]
    async fn same_entry_twice_is_recorded_twice() {
        let store = store();
        let meta = InMemoryMetadataStore::new();
        let settings = settings(DocumentScope::Channel);
        let rec = Reconciler::new(&store, &settings).with_metadata(&meta);

        rec.try_reconcile(CHANNEL, entry("v1.0.0")).await.unwrap();
        let second = rec.try_reconcile(CHANNEL, entry("v1.0.0")).await.unwrap();
        assert_eq!(second.entry_count, 2);

        let entries = document::parse_entries(&store.content(&second.document_id).unwrap());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].version, "v1.0.0");
        assert_eq!(entries[1].version, "v1.0.0");

        let key = MetadataKey::new(DocumentScope::Channel, CHANNEL, None);
        let logged = meta.load_entries(&key).await.unwrap().unwrap();
        assert_eq!(logged.len(), 2);
        assert_eq!(logged[0], logged[1]);
    }

    #[tokio::test]
    async fn repository_scope_requires_repository() {
        let store = store();
        let settings = settings(DocumentScope::Repository);
        let mut e = entry("v1");
        e.repository_name = None;
        let err = Reconciler::new(&store, &settings)
            .try_reconcile(CHANNEL, e)
            .await
            .unwrap_err();
        assert!(matches!(err, RelnoteError::MissingInput("repository")));
    }

    #[tokio::test]
    async fn unresolvable_channel_fails_without_side_effects() {
        let store = store();
        let settings = settings(DocumentScope::Channel);
        let rec = Reconciler::new(&store, &settings);
        let err = rec.try_reconcile("#nowhere", entry("v1")).await.unwrap_err();
        assert!(matches!(err, RelnoteError::ChannelNotFound(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn create_failure_is_reported() {
        let store = store();
        store.fail_next_create(TransportError::new(
            TransportErrorKind::TierUnsupported,
            "free_team_not_allowed",
            "not on this plan",
        ));
        let settings = settings(DocumentScope::Channel);
        let err = Reconciler::new(&store, &settings)
            .try_reconcile(CHANNEL, entry("v1"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("free_team_not_allowed"));
    }
}
