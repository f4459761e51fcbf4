use crate::markdown::{self, Notes};
use crate::rules::{rule, RuleSet};
use serde::{Deserialize, Serialize};

pub const MARKER_SECTION: &str = "BREAKING CHANGE section found";
pub const MARKER_KEYWORD: &str = "Breaking change keyword detected";
pub const MARKER_MAJOR_VERSION: &str = "Major version bump detected";

static_regex!(
    conventional_re,
    r"^\s*(?:[-*•+]\s+)?([A-Za-z]+)(?:\([^)\n]*\))?!(?:\([^)\n]*\))?:\s*(\S.*?)\s*$"
);
static_regex!(
    keyword_re,
    r"(?i)\b(?:removed|incompatible)\b|major change|api change|no longer supports?\b"
);
static_regex!(
    major_version_re,
    r"(?i)\b(?:version|release|tag)\s*:?\s*v(\d+)\.0\.0\b"
);

// ---------------------------------------------------------------------------
// BreakingAnalysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakingAnalysis {
    pub has_breaking_changes: bool,
    pub markers: Vec<String>,
    /// `type!: description` for each conventional-commit breaking line.
    pub conventional_breaks: Vec<String>,
    /// Free-text breaking items from an explicit section or keyword bullets.
    pub note_breaks: Vec<String>,
    #[serde(skip)]
    section_found: bool,
}

impl BreakingAnalysis {
    /// Everything worth listing under a "Breaking Changes" heading.
    pub fn items(&self) -> Vec<&str> {
        self.conventional_breaks
            .iter()
            .chain(self.note_breaks.iter())
            .map(String::as_str)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn conventional_commits(notes: &Notes, out: &mut BreakingAnalysis) {
    for line in notes.prose_lines() {
        let Some(caps) = conventional_re().captures(line.text) else {
            continue;
        };
        let kind = &caps[1];
        out.conventional_breaks.push(format!("{kind}!: {}", &caps[2]));
        out.markers
            .push(format!("Conventional commit breaking change: {kind}!"));
    }
}

fn is_breaking_heading(title: &str) -> bool {
    title == "breaking change" || title == "breaking changes"
}

fn explicit_section(notes: &Notes, out: &mut BreakingAnalysis) {
    let Some(items) = notes.section(is_breaking_heading) else {
        return;
    };
    if items.is_empty() {
        return;
    }
    out.section_found = true;
    out.note_breaks.extend(items);
    out.markers.push(MARKER_SECTION.to_string());
}

fn keyword_bullets(notes: &Notes, out: &mut BreakingAnalysis) {
    for item in notes.prose_bullets() {
        if keyword_re().is_match(item) {
            out.note_breaks.push(item.to_string());
            out.markers.push(MARKER_KEYWORD.to_string());
        }
    }
}

fn major_version(notes: &Notes, out: &mut BreakingAnalysis) {
    let bumped = major_version_re()
        .captures_iter(notes.text())
        .filter_map(|c| c[1].parse::<u64>().ok())
        .any(|major| major >= 2);
    if bumped {
        out.markers.push(MARKER_MAJOR_VERSION.to_string());
    }
}

pub fn default_rules() -> RuleSet<BreakingAnalysis> {
    RuleSet::new(vec![
        rule! { id: "conventional_commit", apply: conventional_commits },
        rule! { id: "explicit_section", apply: explicit_section },
        // An explicit section is authoritative; keyword matches elsewhere are
        // treated as noise.
        rule! {
            id: "keyword_bullets",
            apply: keyword_bullets,
            when: |a: &BreakingAnalysis| !a.section_found
        },
        rule! { id: "major_version", apply: major_version },
    ])
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn analyze(text: Option<&str>) -> BreakingAnalysis {
    let mut out = BreakingAnalysis::default();
    let Some(text) = text else {
        return out;
    };
    let notes = Notes::parse(text);
    if notes.is_empty() {
        return out;
    }

    default_rules().run(&notes, &mut out);

    markdown::dedup_preserving_order(&mut out.note_breaks);
    out.has_breaking_changes = !out.conventional_breaks.is_empty()
        || !out.note_breaks.is_empty()
        || !out.markers.is_empty();
    out
}
