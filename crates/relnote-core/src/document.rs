//! Persistent release history: entries, retention, and the markdown
//! projection written to the document store.
//!
//! Rendering is a pure function of the entry list. The reverse parser
//! recovers entries from either the rendered markdown or the plain text the
//! document store hands back, and is only used when no authoritative entry
//! log is available.

use crate::analysis::ReleaseAnalysis;
use crate::types::{Classification, ReleaseEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RETENTION: usize = 50;
pub const DEFAULT_RECENT_COUNT: usize = 10;

pub const BADGE_BREAKING: &str = "⚠️ Breaking";
pub const BADGE_CONFIG: &str = "⚙️ Config";
pub const BADGE_E2E: &str = "🧪 E2E Workflows";

const FIELD_SEPARATOR: &str = " | ";
const VARIATION_SELECTOR: char = '\u{FE0F}';

static_regex!(linked_version_re, r"^\[([^\]]+)\]\(([^)\s]+)\)$");
static_regex!(repository_tail_re, r"^(.*?)\s*`([^`]+)`$");

// ---------------------------------------------------------------------------
// ReleaseEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    pub version: String,
    /// Display date, `YYYY-MM-DD`.
    pub release_date: String,
    pub classification: Classification,
    #[serde(default)]
    pub has_breaking: bool,
    #[serde(default)]
    pub has_config: bool,
    #[serde(default)]
    pub has_e2e: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_name: Option<String>,
}

impl ReleaseEntry {
    pub fn from_event(event: &ReleaseEvent, analysis: &ReleaseAnalysis, now: DateTime<Utc>) -> Self {
        Self {
            version: event.version.clone(),
            release_date: now.format("%Y-%m-%d").to_string(),
            classification: analysis.classification(),
            has_breaking: analysis.breaking.has_breaking_changes,
            has_config: analysis.config.has_config_changes,
            has_e2e: analysis.e2e.has_e2e_tests,
            release_url: event.release_url.clone().filter(|u| !u.is_empty()),
            repository_name: Some(event.repository_name.clone()).filter(|r| !r.is_empty()),
        }
    }

    pub fn badges(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.has_breaking {
            out.push(BADGE_BREAKING);
        }
        if self.has_config {
            out.push(BADGE_CONFIG);
        }
        if self.has_e2e {
            out.push(BADGE_E2E);
        }
        out
    }

    /// One bullet line. `emphasize` bolds the version (recent section).
    pub fn render_line(&self, emphasize: bool) -> String {
        let version = match &self.release_url {
            Some(url) => format!("[{}]({url})", self.version),
            None => self.version.clone(),
        };
        let version = if emphasize {
            format!("**{version}**")
        } else {
            version
        };
        let mut head = format!("- {} {version}", self.classification.emoji());
        if let Some(repo) = &self.repository_name {
            head.push_str(&format!(" `{repo}`"));
        }
        let mut fields = vec![head, self.release_date.clone()];
        fields.extend(self.badges().into_iter().map(str::to_string));
        fields.join(FIELD_SEPARATOR)
    }
}

/// Insert at the head and drop from the tail beyond `retention`.
pub fn prepend_entry(entries: &mut Vec<ReleaseEntry>, entry: ReleaseEntry, retention: usize) {
    entries.insert(0, entry);
    entries.truncate(retention.max(1));
}

// ---------------------------------------------------------------------------
// ReleasesDocument
// ---------------------------------------------------------------------------

/// In-memory view of one channel's (or repository's) history document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasesDocument {
    pub owner_channel_id: String,
    pub document_id: Option<String>,
    /// Newest first.
    pub entries: Vec<ReleaseEntry>,
    pub last_updated: DateTime<Utc>,
}

impl ReleasesDocument {
    pub fn new(owner_channel_id: impl Into<String>, entries: Vec<ReleaseEntry>) -> Self {
        Self {
            owner_channel_id: owner_channel_id.into(),
            document_id: None,
            entries,
            last_updated: Utc::now(),
        }
    }

    pub fn record(&mut self, entry: ReleaseEntry, retention: usize) {
        prepend_entry(&mut self.entries, entry, retention);
        self.last_updated = Utc::now();
    }

    pub fn stats(&self) -> DocumentStats {
        DocumentStats::of(&self.entries)
    }
}

// ---------------------------------------------------------------------------
// DocumentStats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub total: usize,
    pub breaking: usize,
    pub config: usize,
    pub e2e: usize,
    pub normal: usize,
}

impl DocumentStats {
    pub fn of(entries: &[ReleaseEntry]) -> Self {
        let count = |f: fn(&ReleaseEntry) -> bool| entries.iter().filter(|e| f(e)).count();
        Self {
            total: entries.len(),
            breaking: count(|e| e.has_breaking),
            config: count(|e| e.has_config),
            e2e: count(|e| e.has_e2e),
            normal: count(|e| e.classification == Classification::Normal),
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn document_title(name: &str) -> String {
    format!("{name} Releases")
}

/// Full document markdown for `entries` (newest first). Deterministic for a
/// fixed entry list.
pub fn render(name: &str, entries: &[ReleaseEntry], recent_count: usize) -> String {
    let recent_count = recent_count.max(1);
    let mut out = format!("# 📦 {}\n\n## Recent Releases\n\n", document_title(name));

    if entries.is_empty() {
        out.push_str("_No releases recorded yet._\n");
    }
    for entry in entries.iter().take(recent_count) {
        out.push_str(&entry.render_line(true));
        out.push('\n');
    }

    if entries.len() > recent_count {
        out.push_str("\n## All Releases\n\n");
        for entry in &entries[recent_count..] {
            out.push_str(&entry.render_line(false));
            out.push('\n');
        }
    }

    let stats = DocumentStats::of(entries);
    out.push_str("\n## Statistics\n\n");
    out.push_str(&format!("- Total releases tracked: {}\n", stats.total));
    out.push_str(&format!("- Breaking changes: {}\n", stats.breaking));
    out.push_str(&format!("- Configuration updates: {}\n", stats.config));
    out.push_str(&format!("- E2E workflows: {}\n", stats.e2e));
    out.push_str(&format!("- Normal releases: {}\n", stats.normal));
    out
}

// ---------------------------------------------------------------------------
// Reverse parsing
// ---------------------------------------------------------------------------

/// Emoji prefixes, longest first so `⚠🚀` is not read as `🚀`.
const PREFIXES: &[(&str, Classification)] = &[
    ("⚠🚀", Classification::Breaking),
    ("⚙🚀", Classification::Config),
    ("🧪🚀", Classification::E2e),
    ("🚀", Classification::Normal),
];

fn parse_line(line: &str) -> Option<ReleaseEntry> {
    let line: String = line.chars().filter(|c| *c != VARIATION_SELECTOR).collect();
    let line = line.trim();
    let line = ["- ", "* ", "• "]
        .iter()
        .find_map(|m| line.strip_prefix(m))
        .unwrap_or(line)
        .trim_start();

    let (rest, classification) = PREFIXES
        .iter()
        .find_map(|(p, c)| line.strip_prefix(p).map(|rest| (rest, *c)))?;

    let mut fields = rest.split(FIELD_SEPARATOR.trim()).map(str::trim);
    let head = fields.next()?.replace("**", "");
    let release_date = fields.next()?.to_string();
    let badges: Vec<&str> = fields.collect();

    let head = head.trim();
    // Only a backtick-quoted tail names the repository; versions may contain spaces.
    let (head, repository_name) = match repository_tail_re().captures(head) {
        Some(caps) => (
            caps.get(1).map_or("", |m| m.as_str()),
            Some(caps[2].trim().to_string()).filter(|r| !r.is_empty()),
        ),
        None => (head, None),
    };
    let (version, release_url) = match linked_version_re().captures(head) {
        Some(caps) => (caps[1].to_string(), Some(caps[2].to_string())),
        None => (head.to_string(), None),
    };
    if version.is_empty() || release_date.is_empty() {
        return None;
    }
    let has_badge = |needle: &str| badges.iter().any(|b| b.contains(needle));

    Some(ReleaseEntry {
        version,
        release_date,
        classification,
        has_breaking: classification == Classification::Breaking || has_badge("Breaking"),
        has_config: classification == Classification::Config || has_badge("Config"),
        has_e2e: classification == Classification::E2e || has_badge("E2E"),
        release_url,
        repository_name,
    })
}

/// Recover entries, newest first, from document content. Lines that do not
/// look like entries are skipped; malformed content yields an empty list.
pub fn parse_entries(content: &str) -> Vec<ReleaseEntry> {
    content.lines().filter_map(parse_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(version: &str, classification: Classification) -> ReleaseEntry {
        ReleaseEntry {
            version: version.to_string(),
            release_date: "2026-10-17".to_string(),
            classification,
            has_breaking: classification == Classification::Breaking,
            has_config: classification == Classification::Config,
            has_e2e: classification == Classification::E2e,
            release_url: None,
            repository_name: None,
        }
    }

    #[test]
    fn prepend_caps_at_retention() {
        let mut entries = Vec::new();
        for i in 0..51 {
            prepend_entry(&mut entries, entry(&format!("v1.0.{i}"), Classification::Normal), 50);
        }
        assert_eq!(entries.len(), 50);
        assert_eq!(entries[0].version, "v1.0.50");
        assert_eq!(entries[49].version, "v1.0.1");
    }

    #[test]
    fn render_has_sections_and_exact_stats() {
        let mut entries: Vec<_> = (0..12)
            .map(|i| entry(&format!("v0.{i}.0"), Classification::Normal))
            .collect();
        entries[0] = entry("v1.0.0", Classification::Breaking);
        entries[1].has_config = true;

        let md = render("api", &entries, 10);
        assert!(md.starts_with("# 📦 api Releases\n"));
        assert!(md.contains("## Recent Releases"));
        assert!(md.contains("## All Releases"));
        assert!(md.contains("- ⚠️🚀 **v1.0.0** | 2026-10-17 | ⚠️ Breaking"));
        assert!(md.contains("- Total releases tracked: 12"));
        assert!(md.contains("- Breaking changes: 1"));
        assert!(md.contains("- Configuration updates: 1"));
        assert!(md.contains("- E2E workflows: 0"));
        assert!(md.contains("- Normal releases: 11"));
    }

    #[test]
    fn render_is_deterministic() {
        let entries = vec![entry("v1", Classification::E2e)];
        assert_eq!(render("x", &entries, 10), render("x", &entries, 10));
    }

    #[test]
    fn short_history_has_no_all_releases_section() {
        let md = render("x", &[entry("v1", Classification::Normal)], 10);
        assert!(!md.contains("## All Releases"));
    }

    #[test]
    fn rendered_markdown_roundtrips() {
        let mut entries: Vec<_> = Classification::all()
            .iter()
            .enumerate()
            .map(|(i, c)| entry(&format!("v{i}.0.0"), *c))
            .collect();
        entries[0].release_url = Some("https://example.com/r/1".into());
        entries[1].repository_name = Some("web-app".into());
        entries[2].has_e2e = true;
        let md = render("api", &entries, 2);
        assert_eq!(parse_entries(&md), entries);
    }

    #[test]
    fn plain_text_projection_parses() {
        let text = "\
📦 api Releases
Recent Releases
• ⚠🚀 v2.0.0 `web` | 2026-10-01 | ⚠ Breaking | ⚙ Config
• 🚀 v1.9.0 | 2026-09-30
Statistics
• Total releases tracked: 2";
        let parsed = parse_entries(text);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].version, "v2.0.0");
        assert_eq!(parsed[0].repository_name.as_deref(), Some("web"));
        assert_eq!(parsed[0].classification, Classification::Breaking);
        assert!(parsed[0].has_config);
        assert_eq!(parsed[1].classification, Classification::Normal);
        assert!(!parsed[1].has_breaking);
    }

    #[test]
    fn versions_with_spaces_keep_their_words() {
        let mut bare = entry("Release 2024.1", Classification::Normal);
        let mut linked = entry("Release 2024.2", Classification::Config);
        linked.release_url = Some("https://example.com/r/2".into());
        linked.repository_name = Some("web app".into());
        let mut with_repo = entry("Release 2024.3", Classification::Normal);
        with_repo.repository_name = Some("api".into());
        bare.has_e2e = true;
        let entries = vec![with_repo, linked, bare];
        let md = render("api", &entries, 10);
        let parsed = parse_entries(&md);
        assert_eq!(parsed, entries);
        assert_eq!(parsed[2].version, "Release 2024.1");
        assert_eq!(parsed[2].repository_name, None);
    }

    #[test]
    fn garbage_parses_to_nothing() {
        assert!(parse_entries("🚀 launch day!\nrandom | text").is_empty());
        assert!(parse_entries("").is_empty());
    }
}
