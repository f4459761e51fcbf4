use crate::analysis::ReleaseAnalysis;
use crate::config_changes::DiffKind;
use crate::document::{self, ReleaseEntry};
use crate::types::{Classification, ReleaseEvent};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Longest code excerpt quoted in a chat message.
const MAX_SNIPPET_CHARS: usize = 600;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Strict priority: breaking > config > e2e > normal.
pub fn classify(breaking: bool, config: bool, e2e: bool) -> Classification {
    if breaking {
        Classification::Breaking
    } else if config {
        Classification::Config
    } else if e2e {
        Classification::E2e
    } else {
        Classification::Normal
    }
}

// ---------------------------------------------------------------------------
// ChatMessage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub title: String,
    pub color: String,
    pub body: String,
}

impl ChatMessage {
    /// Plain-text fallback for clients that do not render attachments.
    pub fn fallback_text(&self) -> String {
        self.title.clone()
    }
}

pub fn render_title(event: &ReleaseEvent, classification: Classification) -> String {
    let repo = event.repository_name.trim();
    if repo.is_empty() {
        format!("{} {}: {}", classification.emoji(), classification.label(), event.version)
    } else {
        format!(
            "[{repo}] {} {}: {}",
            classification.emoji(),
            classification.label(),
            event.version
        )
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}\n…", &text[..cut]),
        None => text.to_string(),
    }
}

fn breaking_section(analysis: &ReleaseAnalysis) -> String {
    let breaking = &analysis.breaking;
    if !breaking.has_breaking_changes {
        return String::new();
    }
    let items = breaking.items();
    let lines: Vec<String> = if items.is_empty() {
        breaking.markers.iter().map(|m| format!("• {m}")).collect()
    } else {
        items.iter().map(|i| format!("• {i}")).collect()
    };
    format!("*⚠️ Breaking Changes*\n{}", lines.join("\n"))
}

fn config_section(analysis: &ReleaseAnalysis) -> String {
    let config = &analysis.config;
    if !config.has_config_changes {
        return String::new();
    }
    let mut lines = Vec::new();
    for link in &config.links {
        lines.push(format!("• <{}|{}>", link.url, link.filename));
    }
    for diff in &config.diffs {
        match diff.kind {
            DiffKind::Mention => lines.push(format!("• {}", diff.content)),
            DiffKind::Diff | DiffKind::BeforeAfter => lines.push(format!(
                "• `{}` ({})\n```\n{}\n```",
                diff.filename,
                diff.kind,
                truncate_chars(diff.content.trim_end(), MAX_SNIPPET_CHARS)
            )),
        }
    }
    format!("*⚙️ Configuration Changes*\n{}", lines.join("\n"))
}

fn e2e_section(analysis: &ReleaseAnalysis) -> String {
    let e2e = &analysis.e2e;
    if !e2e.has_e2e_tests {
        return String::new();
    }
    let lines: Vec<String> = e2e
        .links
        .iter()
        .map(|l| {
            format!(
                "• {} <{}|{}> ({}, {})",
                l.status.emoji(),
                l.url,
                l.workflow_name,
                l.repository,
                l.status
            )
        })
        .collect();
    format!("*🧪 E2E Workflows*\n{}", lines.join("\n"))
}

/// Collapse runs of blank lines in free-form text and trim the ends.
fn tidy(body: &str) -> String {
    let mut out = Vec::new();
    let mut blank = true;
    for line in body.lines() {
        let is_blank = line.trim().is_empty();
        if is_blank && blank {
            continue;
        }
        blank = is_blank;
        out.push(line);
    }
    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    out.join("\n")
}

pub fn render_chat_message(
    event: &ReleaseEvent,
    classification: Classification,
    analysis: &ReleaseAnalysis,
    now: DateTime<Utc>,
) -> ChatMessage {
    let custom = event.custom_message.as_deref().map(tidy).unwrap_or_default();
    let release_link = event
        .release_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .map(|u| format!("🔗 <{u}|View release notes>"))
        .unwrap_or_default();
    let timestamp = format!(
        "🕒 Released at {}",
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    );

    let sections = [
        custom,
        breaking_section(analysis),
        config_section(analysis),
        e2e_section(analysis),
        release_link,
        timestamp,
    ];
    let body = sections
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    ChatMessage {
        title: render_title(event, classification),
        color: classification.color().to_string(),
        body,
    }
}

/// Document markdown for a channel or repository history.
pub fn render_document_snapshot(name: &str, entries: &[ReleaseEntry], recent_count: usize) -> String {
    document::render(name, entries, recent_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    #[test]
    fn classify_priority() {
        assert_eq!(classify(true, true, true), Classification::Breaking);
        assert_eq!(classify(false, true, true), Classification::Config);
        assert_eq!(classify(false, false, true), Classification::E2e);
        assert_eq!(classify(false, false, false), Classification::Normal);
    }

    #[test]
    fn title_per_classification() {
        let event = ReleaseEvent::new("v1.2.3", "");
        assert_eq!(render_title(&event, Classification::Normal), "🚀 New Release: v1.2.3");
        assert_eq!(
            render_title(&event, Classification::Breaking),
            "⚠️🚀 BREAKING RELEASE: v1.2.3"
        );
        assert_eq!(
            render_title(&event, Classification::Config),
            "⚙️🚀 CONFIG UPDATE: v1.2.3"
        );
        assert_eq!(
            render_title(&event, Classification::E2e),
            "🧪🚀 E2E WORKFLOW RELEASE: v1.2.3"
        );
        let event = ReleaseEvent::new("v1.2.3", "api");
        assert_eq!(render_title(&event, Classification::Normal), "[api] 🚀 New Release: v1.2.3");
    }

    #[test]
    fn all_sections_render_under_breaking_label() {
        let notes = "\
feat!: drop v1 API

```yaml
retries: 3
```

E2E tests passed https://github.com/o/r/actions/runs/11";
        let event = ReleaseEvent::new("v2.0.0", "api")
            .with_notes(notes)
            .with_custom_message("Deploy window tonight")
            .with_release_url("https://github.com/o/r/releases/v2.0.0");
        let analysis = ReleaseAnalysis::of(event.notes());
        let classification = analysis.classification();
        assert_eq!(classification, Classification::Breaking);

        let msg = render_chat_message(&event, classification, &analysis, now());
        assert_eq!(msg.color, Classification::Breaking.color());
        assert!(msg.body.starts_with("Deploy window tonight\n\n*⚠️ Breaking Changes*"));
        assert!(msg.body.contains("• feat!: drop v1 API"));
        assert!(msg.body.contains("*⚙️ Configuration Changes*"));
        assert!(msg.body.contains("*🧪 E2E Workflows*"));
        assert!(msg.body.contains("<https://github.com/o/r/releases/v2.0.0|View release notes>"));
        assert!(msg.body.ends_with("🕒 Released at 2026-10-17T12:00:00Z"));

        let order: Vec<usize> = ["Deploy", "Breaking", "Configuration", "E2E Workflows", "🔗", "🕒"]
            .iter()
            .map(|needle| msg.body.find(needle).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn body_never_has_double_or_leading_blank_lines() {
        let event = ReleaseEvent::new("v1", "").with_custom_message("\n\nhello\n\n\n\nworld\n");
        let analysis = ReleaseAnalysis::default();
        let msg = render_chat_message(&event, Classification::Normal, &analysis, now());
        assert!(!msg.body.starts_with('\n'));
        assert!(!msg.body.contains("\n\n\n"));
        assert_eq!(msg.body, "hello\n\nworld\n\n🕒 Released at 2026-10-17T12:00:00Z");
    }

    #[test]
    fn blank_lines_inside_config_snippets_survive() {
        let notes = "```yaml\nserver:\n  port: 8080\n\n\ncache:\n  ttl: 60\n```";
        let event = ReleaseEvent::new("v1", "").with_notes(notes);
        let analysis = ReleaseAnalysis::of(event.notes());
        assert_eq!(analysis.classification(), Classification::Config);
        let msg = render_chat_message(&event, analysis.classification(), &analysis, now());
        assert!(msg
            .body
            .contains("```\nserver:\n  port: 8080\n\n\ncache:\n  ttl: 60\n```"));
    }

    #[test]
    fn marker_only_breaking_lists_markers() {
        let event = ReleaseEvent::new("v3.0.0", "").with_notes("Release v3.0.0 is out");
        let analysis = ReleaseAnalysis::of(event.notes());
        let msg = render_chat_message(&event, analysis.classification(), &analysis, now());
        assert!(msg.body.contains("• Major version bump detected"));
    }

    #[test]
    fn long_snippets_are_truncated() {
        let block = format!("```env\n{}\n```", "A=1\n".repeat(400));
        let event = ReleaseEvent::new("v1", "").with_notes(block);
        let analysis = ReleaseAnalysis::of(event.notes());
        let msg = render_chat_message(&event, analysis.classification(), &analysis, now());
        assert!(msg.body.contains('…'));
        assert!(msg.body.len() < 1200);
    }
}
