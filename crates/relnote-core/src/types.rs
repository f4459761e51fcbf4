use crate::error::RelnoteError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Single label for a release, chosen by strict priority
/// breaking > config > e2e > normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    #[default]
    Normal,
    Breaking,
    Config,
    E2e,
}

impl Classification {
    pub fn all() -> &'static [Classification] {
        &[
            Classification::Normal,
            Classification::Breaking,
            Classification::Config,
            Classification::E2e,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Normal => "normal",
            Classification::Breaking => "breaking",
            Classification::Config => "config",
            Classification::E2e => "e2e",
        }
    }

    /// Emoji prefix used in chat titles and document entry lines.
    pub fn emoji(self) -> &'static str {
        match self {
            Classification::Normal => "🚀",
            Classification::Breaking => "⚠️🚀",
            Classification::Config => "⚙️🚀",
            Classification::E2e => "🧪🚀",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Classification::Normal => "New Release",
            Classification::Breaking => "BREAKING RELEASE",
            Classification::Config => "CONFIG UPDATE",
            Classification::E2e => "E2E WORKFLOW RELEASE",
        }
    }

    /// Attachment side-bar color.
    pub fn color(self) -> &'static str {
        match self {
            Classification::Normal => "#36a64f",
            Classification::Breaking => "#e01e5a",
            Classification::Config => "#ecb22e",
            Classification::E2e => "#1d9bd1",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Classification {
    type Err = RelnoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Classification::Normal),
            "breaking" => Ok(Classification::Breaking),
            "config" => Ok(Classification::Config),
            "e2e" => Ok(Classification::E2e),
            _ => Err(RelnoteError::InvalidClassification(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentScope
// ---------------------------------------------------------------------------

/// Whether one history document is kept per channel or per repository
/// within a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentScope {
    #[default]
    Channel,
    Repository,
}

impl DocumentScope {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentScope::Channel => "channel",
            DocumentScope::Repository => "repository",
        }
    }
}

impl fmt::Display for DocumentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentScope {
    type Err = RelnoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "channel" => Ok(DocumentScope::Channel),
            "repository" | "repo" => Ok(DocumentScope::Repository),
            _ => Err(RelnoteError::InvalidScope(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ReleaseEvent
// ---------------------------------------------------------------------------

/// One release announcement, as supplied by the caller. Read-only input to
/// every analyzer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseEvent {
    pub version: String,
    pub repository_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_url: Option<String>,
    #[serde(default)]
    pub raw_notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_message: Option<String>,
}

impl ReleaseEvent {
    pub fn new(version: impl Into<String>, repository_name: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            repository_name: repository_name.into(),
            ..Default::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.raw_notes = notes.into();
        self
    }

    pub fn with_release_url(mut self, url: impl Into<String>) -> Self {
        self.release_url = Some(url.into());
        self
    }

    pub fn with_custom_message(mut self, message: impl Into<String>) -> Self {
        self.custom_message = Some(message.into());
        self
    }

    pub fn notes(&self) -> Option<&str> {
        if self.raw_notes.trim().is_empty() {
            None
        } else {
            Some(&self.raw_notes)
        }
    }
}
