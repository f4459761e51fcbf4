//! Local record of where each history document lives, plus the authoritative
//! entry log used instead of re-parsing rendered markdown.

use crate::document::ReleaseEntry;
use crate::error::Result;
use crate::io;
use crate::paths;
use crate::types::DocumentScope;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// MetadataKey
// ---------------------------------------------------------------------------

/// The channel id, or `channel_id:repository` for per-repository documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataKey(String);

impl MetadataKey {
    pub fn new(scope: DocumentScope, channel_id: &str, repository: Option<&str>) -> Self {
        match (scope, repository.map(str::trim).filter(|r| !r.is_empty())) {
            (DocumentScope::Repository, Some(repo)) => Self(format!("{channel_id}:{repo}")),
            _ => Self(channel_id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// CanvasMetadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasMetadata {
    pub document_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub last_updated: DateTime<Utc>,
    pub entry_count: usize,
}

// ---------------------------------------------------------------------------
// MetadataStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, key: &MetadataKey) -> Result<Option<CanvasMetadata>>;

    async fn put(&self, key: &MetadataKey, metadata: &CanvasMetadata) -> Result<()>;

    /// Authoritative entry log, newest first. Stores that keep none return
    /// `None` and callers fall back to parsing the document.
    async fn load_entries(&self, _key: &MetadataKey) -> Result<Option<Vec<ReleaseEntry>>> {
        Ok(None)
    }

    async fn save_entries(&self, _key: &MetadataKey, _entries: &[ReleaseEntry]) -> Result<()> {
        Ok(())
    }
}

/// On-disk shape of one key's record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CanvasMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<ReleaseEntry>>,
}

// ---------------------------------------------------------------------------
// FileMetadataStore
// ---------------------------------------------------------------------------

/// One YAML file per key, written atomically.
#[derive(Debug, Clone)]
pub struct FileMetadataStore {
    dir: PathBuf,
}

impl FileMetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the configured (or default) directory under `root`.
    pub fn for_root(root: &Path, configured_dir: Option<&str>) -> Self {
        Self::new(paths::metadata_dir(root, configured_dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &MetadataKey) -> PathBuf {
        self.dir
            .join(format!("{}.yaml", paths::key_file_stem(key.as_str())))
    }

    fn read_record(&self, key: &MetadataKey) -> Result<MetadataRecord> {
        match io::read_optional(&self.record_path(key))? {
            Some(data) => Ok(serde_yaml::from_str(&data)?),
            None => Ok(MetadataRecord {
                key: key.to_string(),
                ..MetadataRecord::default()
            }),
        }
    }

    fn write_record(&self, key: &MetadataKey, record: &MetadataRecord) -> Result<()> {
        let data = serde_yaml::to_string(record)?;
        io::atomic_write(&self.record_path(key), data.as_bytes())
    }

    /// Every stored record, sorted by key.
    pub fn list(&self) -> Result<Vec<MetadataRecord>> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::new();
        for dir_entry in read_dir {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let data = std::fs::read_to_string(&path)?;
            match serde_yaml::from_str::<MetadataRecord>(&data) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable metadata file"),
            }
        }
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }
}

#[async_trait]
impl MetadataStore for FileMetadataStore {
    async fn get(&self, key: &MetadataKey) -> Result<Option<CanvasMetadata>> {
        Ok(self.read_record(key)?.metadata)
    }

    async fn put(&self, key: &MetadataKey, metadata: &CanvasMetadata) -> Result<()> {
        let mut record = self.read_record(key)?;
        record.metadata = Some(metadata.clone());
        self.write_record(key, &record)
    }

    async fn load_entries(&self, key: &MetadataKey) -> Result<Option<Vec<ReleaseEntry>>> {
        Ok(self.read_record(key)?.entries)
    }

    async fn save_entries(&self, key: &MetadataKey, entries: &[ReleaseEntry]) -> Result<()> {
        let mut record = self.read_record(key)?;
        record.entries = Some(entries.to_vec());
        self.write_record(key, &record)
    }
}

// ---------------------------------------------------------------------------
// InMemoryMetadataStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    records: Mutex<HashMap<MetadataKey, MetadataRecord>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_record<T>(&self, key: &MetadataKey, f: impl FnOnce(&mut MetadataRecord) -> T) -> T {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let record = records.entry(key.clone()).or_insert_with(|| MetadataRecord {
            key: key.to_string(),
            ..MetadataRecord::default()
        });
        f(record)
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn get(&self, key: &MetadataKey) -> Result<Option<CanvasMetadata>> {
        Ok(self.with_record(key, |r| r.metadata.clone()))
    }

    async fn put(&self, key: &MetadataKey, metadata: &CanvasMetadata) -> Result<()> {
        self.with_record(key, |r| r.metadata = Some(metadata.clone()));
        Ok(())
    }

    async fn load_entries(&self, key: &MetadataKey) -> Result<Option<Vec<ReleaseEntry>>> {
        Ok(self.with_record(key, |r| r.entries.clone()))
    }

    async fn save_entries(&self, key: &MetadataKey, entries: &[ReleaseEntry]) -> Result<()> {
        self.with_record(key, |r| r.entries = Some(entries.to_vec()));
        Ok(())
    }
}
