//! Locating the existing history document for a channel (or a repository
//! within a channel).
//!
//! Discovery is an explicit, ordered chain of named strategies. Each
//! strategy is tried in turn; the first hit wins. A miss from every strategy
//! is `NotFound`, unless some strategy saw a signal that a document exists
//! but could not produce its id, in which case the caller is told the result
//! is ambiguous rather than invited to create a duplicate. A provider call
//! that fails inside a strategy rules nothing out: when no later strategy
//! hits, the result is `Incomplete` and nothing may be created.
//!
//! The metadata cache is local bookkeeping, so a failed cache read is only a
//! miss.

use crate::document::document_title;
use crate::error::RelnoteError;
use crate::metadata::{MetadataKey, MetadataStore};
use crate::transport::{ChannelInfo, DocumentStore, DocumentSummary, ListScope};
use crate::types::DocumentScope;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;

// ---------------------------------------------------------------------------
// DiscoveryStrategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStrategy {
    /// Document id recorded by a previous successful run.
    MetadataCache,
    /// The channel's advertised embedded document.
    ChannelProperties,
    /// Same as `ChannelProperties`, after waiting out propagation delay.
    DelayedChannelProperties,
    /// Documents listed for the channel, matched by name.
    ChannelListing,
    /// Workspace-wide listing, filtered by channel association.
    WorkspaceListing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    None,
    Low,
    Medium,
    High,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::None => "none",
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DiscoveryStrategy {
    pub fn all() -> &'static [DiscoveryStrategy] {
        &[
            DiscoveryStrategy::MetadataCache,
            DiscoveryStrategy::ChannelProperties,
            DiscoveryStrategy::DelayedChannelProperties,
            DiscoveryStrategy::ChannelListing,
            DiscoveryStrategy::WorkspaceListing,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DiscoveryStrategy::MetadataCache => "metadata_cache",
            DiscoveryStrategy::ChannelProperties => "channel_properties",
            DiscoveryStrategy::DelayedChannelProperties => "delayed_channel_properties",
            DiscoveryStrategy::ChannelListing => "channel_listing",
            DiscoveryStrategy::WorkspaceListing => "workspace_listing",
        }
    }

    /// Rough price of one attempt (round trips, waiting, page walking).
    pub fn cost(self) -> Level {
        match self {
            DiscoveryStrategy::MetadataCache => Level::None,
            DiscoveryStrategy::ChannelProperties => Level::Low,
            DiscoveryStrategy::DelayedChannelProperties => Level::Medium,
            DiscoveryStrategy::ChannelListing => Level::Medium,
            DiscoveryStrategy::WorkspaceListing => Level::High,
        }
    }

    /// How likely the strategy misses a document that does exist.
    pub fn false_negative_risk(self) -> Level {
        match self {
            DiscoveryStrategy::MetadataCache => Level::High,
            DiscoveryStrategy::ChannelProperties => Level::Medium,
            DiscoveryStrategy::DelayedChannelProperties => Level::Low,
            DiscoveryStrategy::ChannelListing => Level::Medium,
            DiscoveryStrategy::WorkspaceListing => Level::Low,
        }
    }

    /// Channel properties only ever describe the channel's own embedded
    /// document, which is never a per-repository document.
    pub fn applies_to(self, scope: DocumentScope) -> bool {
        match self {
            DiscoveryStrategy::ChannelProperties | DiscoveryStrategy::DelayedChannelProperties => {
                scope == DocumentScope::Channel
            }
            _ => true,
        }
    }
}

impl fmt::Display for DiscoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiscoveryStrategy {
    type Err = RelnoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiscoveryStrategy::all()
            .iter()
            .copied()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| RelnoteError::InvalidStrategy(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// DiscoveryPlan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryPlan {
    strategies: Vec<DiscoveryStrategy>,
    retry_delay: Duration,
}

impl Default for DiscoveryPlan {
    fn default() -> Self {
        Self {
            strategies: DiscoveryStrategy::all().to_vec(),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl DiscoveryPlan {
    pub fn new(strategies: Vec<DiscoveryStrategy>, retry_delay: Duration) -> Self {
        Self {
            strategies,
            retry_delay,
        }
    }

    pub fn strategies(&self) -> &[DiscoveryStrategy] {
        &self.strategies
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Same plan with `strategy` removed.
    pub fn without(&self, strategy: DiscoveryStrategy) -> Self {
        Self {
            strategies: self
                .strategies
                .iter()
                .copied()
                .filter(|s| *s != strategy)
                .collect(),
            retry_delay: self.retry_delay,
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// What discovery is looking for.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryTarget<'a> {
    pub channel: &'a ChannelInfo,
    pub scope: DocumentScope,
    pub repository: Option<&'a str>,
    pub key: &'a MetadataKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHit {
    pub document_id: String,
    pub via: DiscoveryStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Found(DocumentHit),
    /// Nothing located. `suspected` carries evidence that a document exists
    /// anyway.
    NotFound { suspected: Option<String> },
    /// Nothing located, and at least one strategy failed before it could
    /// rule a document out.
    Incomplete { reason: String },
}

enum Attempt {
    Hit(String),
    Miss,
    /// Miss, but the provider hinted a document exists.
    Suspect(String),
    /// The provider call failed; the strategy could not answer.
    Errored(String),
}

pub struct Discoverer<'a> {
    store: &'a dyn DocumentStore,
    metadata: Option<&'a dyn MetadataStore>,
    plan: &'a DiscoveryPlan,
}

impl<'a> Discoverer<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        metadata: Option<&'a dyn MetadataStore>,
        plan: &'a DiscoveryPlan,
    ) -> Self {
        Self {
            store,
            metadata,
            plan,
        }
    }

    pub async fn discover(&self, target: &DiscoveryTarget<'_>) -> Discovery {
        let mut suspected = None;
        let mut errored = None;
        for &strategy in self.plan.strategies() {
            if !strategy.applies_to(target.scope) {
                tracing::debug!(strategy = %strategy, scope = %target.scope, "strategy skipped for scope");
                continue;
            }
            tracing::debug!(
                strategy = %strategy,
                cost = %strategy.cost(),
                false_negative_risk = %strategy.false_negative_risk(),
                key = %target.key,
                "trying discovery strategy"
            );
            match self.attempt(strategy, target).await {
                Attempt::Hit(document_id) => {
                    tracing::info!(strategy = %strategy, document_id = %document_id, "existing release document found");
                    return Discovery::Found(DocumentHit {
                        document_id,
                        via: strategy,
                    });
                }
                Attempt::Miss => {
                    tracing::debug!(strategy = %strategy, "no document found");
                }
                Attempt::Suspect(reason) => {
                    tracing::warn!(strategy = %strategy, reason = %reason, "document appears to exist but its id is unavailable");
                    suspected.get_or_insert(reason);
                }
                Attempt::Errored(reason) => {
                    tracing::warn!(strategy = %strategy, reason = %reason, "discovery strategy failed");
                    errored.get_or_insert(format!("{strategy} failed: {reason}"));
                }
            }
        }
        match (suspected, errored) {
            (None, Some(reason)) => Discovery::Incomplete { reason },
            (suspected, _) => Discovery::NotFound { suspected },
        }
    }

    async fn attempt(&self, strategy: DiscoveryStrategy, target: &DiscoveryTarget<'_>) -> Attempt {
        match strategy {
            DiscoveryStrategy::MetadataCache => self.from_metadata(target).await,
            DiscoveryStrategy::ChannelProperties => {
                from_channel_info(target.channel, "channel properties")
            }
            DiscoveryStrategy::DelayedChannelProperties => {
                tokio::time::sleep(self.plan.retry_delay()).await;
                match self.store.channel_info(&target.channel.id).await {
                    Ok(info) => from_channel_info(&info, "delayed channel properties"),
                    Err(e) => Attempt::Errored(e.to_string()),
                }
            }
            DiscoveryStrategy::ChannelListing => {
                let scope = ListScope::Channel(target.channel.id.clone());
                match self.store.list_documents(&scope).await {
                    Ok(docs) => pick_document(&docs, target),
                    Err(e) => Attempt::Errored(e.to_string()),
                }
            }
            DiscoveryStrategy::WorkspaceListing => {
                match self.store.list_documents(&ListScope::Workspace).await {
                    Ok(docs) => {
                        let associated: Vec<DocumentSummary> = docs
                            .into_iter()
                            .filter(|d| d.associated_channels.iter().any(|c| *c == target.channel.id))
                            .collect();
                        pick_document(&associated, target)
                    }
                    Err(e) => Attempt::Errored(e.to_string()),
                }
            }
        }
    }

    async fn from_metadata(&self, target: &DiscoveryTarget<'_>) -> Attempt {
        let Some(metadata) = self.metadata else {
            return Attempt::Miss;
        };
        match metadata.get(target.key).await {
            Ok(Some(record)) if !record.document_id.trim().is_empty() => Attempt::Hit(record.document_id),
            Ok(_) => Attempt::Miss,
            Err(e) => {
                tracing::warn!(error = %e, key = %target.key, "metadata lookup failed");
                Attempt::Miss
            }
        }
    }
}

fn from_channel_info(info: &ChannelInfo, source: &str) -> Attempt {
    match info.embedded_document_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => Attempt::Hit(id.to_string()),
        _ if info.has_embedded_document => Attempt::Suspect(format!(
            "{source} report an embedded document for {} without an id",
            info.id
        )),
        _ => Attempt::Miss,
    }
}

fn matches_name(doc: &DocumentSummary, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    doc.title.to_lowercase().contains(&needle) || doc.name.to_lowercase().contains(&needle)
}

/// Choose a document from a listing by naming convention.
///
/// Channel scope accepts anything named like a releases document, or the
/// repository, and otherwise falls back to the most recently created
/// document. Repository scope requires the repository's own document title;
/// guessing would attach one repository's history to another.
fn pick_document(docs: &[DocumentSummary], target: &DiscoveryTarget<'_>) -> Attempt {
    let mut sorted: Vec<&DocumentSummary> = docs.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let found = match (target.scope, target.repository) {
        (DocumentScope::Repository, Some(repo)) => {
            let title = document_title(repo);
            sorted.iter().find(|d| matches_name(d, &title)).copied()
        }
        (DocumentScope::Repository, None) => None,
        (DocumentScope::Channel, repo) => sorted
            .iter()
            .find(|d| matches_name(d, "releases") || repo.is_some_and(|r| matches_name(d, r)))
            .or_else(|| sorted.first())
            .copied(),
    };
    match found {
        Some(doc) => Attempt::Hit(doc.id.clone()),
        None => Attempt::Miss,
    }
}
