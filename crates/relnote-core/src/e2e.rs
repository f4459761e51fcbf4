use crate::markdown::{self, Notes};
use crate::rules::{rule, RuleSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters of surrounding text inspected for each run link.
pub const CONTEXT_RADIUS: usize = 100;

static_regex!(
    run_link_re,
    r"https?://(?:www\.)?github\.com/([\w.-]+)/([\w.-]+)/actions/runs/(\d+)(?:/[\w/-]*)?"
);
static_regex!(
    file_link_re,
    r"https?://(?:www\.)?github\.com/([\w.-]+)/([\w.-]+)/(?:(?:blob|tree)/[^/\s)]+/\.github/workflows|actions/workflows)/([\w.-]+\.ya?ml)"
);
static_regex!(
    e2e_context_re,
    r"(?i)\be2e\b|end[- ]to[- ]end|integration[- ]tests?"
);
static_regex!(e2e_filename_re, r"(?i)e2e|end[-_]?to[-_]?end|integration");
static_regex!(
    positive_re,
    r"(?i)\b(?:passed|passing|success|successful|succeeded|green)\b|completed successfully|✅"
);
static_regex!(
    negative_re,
    r"(?i)\b(?:failed|failing|failure|error|errors|red)\b|❌"
);
static_regex!(
    labeled_name_re,
    r#"(?i)workflow(?:\s+name)?\s*:\s*(?:"([^"\n]+)"|'([^'\n]+)'|`([^`\n]+)`|\*\*([^*\n]+)\*\*|([A-Za-z0-9][\w.-]*(?: [A-Za-z0-9][\w.-]*){0,3}))"#
);

const GENERIC_LINK_TEXT: &[&str] = &["here", "link", "run", "view", "details", "logs"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Passed,
    Failed,
    Unknown,
}

impl WorkflowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Passed => "passed",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::Unknown => "unknown",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            WorkflowStatus::Passed => "✅",
            WorkflowStatus::Failed => "❌",
            WorkflowStatus::Unknown => "❔",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowLinkKind {
    WorkflowRun,
    WorkflowFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowLink {
    pub url: String,
    pub workflow_name: String,
    /// `owner/repo`
    pub repository: String,
    pub status: WorkflowStatus,
    pub kind: WorkflowLinkKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct E2eAnalysis {
    pub has_e2e_tests: bool,
    pub links: Vec<WorkflowLink>,
    /// Byte offset of each hit, for ordering once all rules ran.
    #[serde(skip)]
    hits: Vec<(usize, WorkflowLink)>,
}

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

/// Text around a match with the match itself blanked out, so words inside
/// the URL do not count as context.
fn context(text: &str, start: usize, end: usize) -> String {
    let (from, to) = markdown::window_bounds(text, start, end, CONTEXT_RADIUS);
    format!("{} {}", &text[from..start], &text[end..to])
}

/// Status from positive/negative vocabulary; both or neither is unknown.
pub fn infer_status(context: &str) -> WorkflowStatus {
    match (positive_re().is_match(context), negative_re().is_match(context)) {
        (true, false) => WorkflowStatus::Passed,
        (false, true) => WorkflowStatus::Failed,
        _ => WorkflowStatus::Unknown,
    }
}

fn labeled_name(context: &str) -> Option<String> {
    let caps = labeled_name_re().captures(context)?;
    let raw = (1..=5).find_map(|i| caps.get(i))?.as_str();
    // Unquoted names stop at the first status word or URL.
    let words: Vec<&str> = raw
        .split_whitespace()
        .take_while(|w| {
            !w.starts_with("http") && !positive_re().is_match(w) && !negative_re().is_match(w)
        })
        .collect();
    let name = words.join(" ");
    let name = name.trim_matches(|c: char| c == '-' || c == '.').trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn link_text_name(notes: &Notes, url: &str) -> Option<String> {
    notes
        .links()
        .into_iter()
        .find(|l| l.url == url)
        .map(|l| l.text)
        .filter(|t| !t.starts_with("http") && !GENERIC_LINK_TEXT.contains(&t.to_lowercase().as_str()))
}

/// `e2e-smoke_tests.yml` becomes `E2e Smoke Tests`.
pub fn humanize_filename(filename: &str) -> String {
    let stem = filename
        .strip_suffix(".yml")
        .or_else(|| filename.strip_suffix(".yaml"))
        .unwrap_or(filename);
    stem.split(['-', '_', '.', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn already_seen(out: &E2eAnalysis, url: &str) -> bool {
    out.hits.iter().any(|(_, l)| l.url == url)
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn run_link(notes: &Notes, caps: &regex::Captures, ctx: &str, status: WorkflowStatus) -> WorkflowLink {
    let url = caps.get(0).map_or("", |m| m.as_str());
    let workflow_name = link_text_name(notes, url)
        .or_else(|| labeled_name(ctx))
        .unwrap_or_else(|| format!("E2E Run #{}", &caps[3]));
    WorkflowLink {
        url: url.to_string(),
        workflow_name,
        repository: format!("{}/{}", &caps[1], &caps[2]),
        status,
        kind: WorkflowLinkKind::WorkflowRun,
    }
}

fn is_e2e_heading(title: &str) -> bool {
    e2e_context_re().is_match(title)
}

/// Every run link under an E2E heading counts, however far it sits from the
/// heading. Status comes from the link's own surroundings, then from the
/// section as a whole.
fn e2e_section(notes: &Notes, out: &mut E2eAnalysis) {
    let text = notes.text();
    for (start, end) in notes.section_spans(is_e2e_heading) {
        let body = &text[start..end];
        for caps in run_link_re().captures_iter(body) {
            let Some(m) = caps.get(0) else { continue };
            if already_seen(out, m.as_str()) {
                continue;
            }
            let ctx = context(text, start + m.start(), start + m.end());
            let status = match infer_status(&ctx) {
                WorkflowStatus::Unknown => infer_status(&run_link_re().replace_all(body, " ")),
                known => known,
            };
            out.hits.push((start + m.start(), run_link(notes, &caps, &ctx, status)));
        }
    }
}

fn workflow_runs(notes: &Notes, out: &mut E2eAnalysis) {
    let text = notes.text();
    for caps in run_link_re().captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let url = m.as_str();
        if already_seen(out, url) {
            continue;
        }
        let ctx = context(text, m.start(), m.end());
        if !e2e_context_re().is_match(&ctx) {
            tracing::debug!(url, "workflow run link without e2e context");
            continue;
        }
        out.hits.push((m.start(), run_link(notes, &caps, &ctx, infer_status(&ctx))));
    }
}

fn workflow_files(notes: &Notes, out: &mut E2eAnalysis) {
    let text = notes.text();
    for caps in file_link_re().captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let url = m.as_str();
        let filename = &caps[3];
        if already_seen(out, url) || !e2e_filename_re().is_match(filename) {
            continue;
        }
        out.hits.push((
            m.start(),
            WorkflowLink {
                url: url.to_string(),
                workflow_name: humanize_filename(filename),
                repository: format!("{}/{}", &caps[1], &caps[2]),
                status: WorkflowStatus::Unknown,
                kind: WorkflowLinkKind::WorkflowFile,
            },
        ));
    }
}

pub fn default_rules() -> RuleSet<E2eAnalysis> {
    RuleSet::new(vec![
        rule! { id: "e2e_section", apply: e2e_section },
        rule! { id: "workflow_runs", apply: workflow_runs },
        rule! { id: "workflow_files", apply: workflow_files },
    ])
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn analyze(text: Option<&str>) -> E2eAnalysis {
    let mut out = E2eAnalysis::default();
    let Some(text) = text else {
        return out;
    };
    let notes = Notes::parse(text);
    if notes.is_empty() {
        return out;
    }

    default_rules().run(&notes, &mut out);

    let mut hits = std::mem::take(&mut out.hits);
    hits.sort_by_key(|(offset, _)| *offset);
    out.links = hits.into_iter().map(|(_, link)| link).collect();
    out.has_e2e_tests = !out.links.is_empty();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_plain_prose() {
        assert_eq!(analyze(None), E2eAnalysis::default());
        assert!(!analyze(Some("Nothing about tests here.")).has_e2e_tests);
    }

    #[test]
    fn run_link_without_context_is_ignored() {
        let a = analyze(Some("https://github.com/o/r/actions/runs/123"));
        assert!(!a.has_e2e_tests);
        assert!(a.links.is_empty());
    }

    #[test]
    fn run_link_with_context_and_status() {
        let a = analyze(Some(
            "E2E tests passed: https://github.com/acme/web/actions/runs/987654",
        ));
        assert!(a.has_e2e_tests);
        let link = &a.links[0];
        assert_eq!(link.kind, WorkflowLinkKind::WorkflowRun);
        assert_eq!(link.status, WorkflowStatus::Passed);
        assert_eq!(link.repository, "acme/web");
        assert_eq!(link.workflow_name, "E2E Run #987654");
    }

    #[test]
    fn failing_and_ambiguous_status() {
        let failed = analyze(Some(
            "end-to-end suite failed https://github.com/o/r/actions/runs/1",
        ));
        assert_eq!(failed.links[0].status, WorkflowStatus::Failed);

        let mixed = analyze(Some(
            "integration tests passed with 2 errors https://github.com/o/r/actions/runs/2",
        ));
        assert_eq!(mixed.links[0].status, WorkflowStatus::Unknown);

        let neither = analyze(Some("e2e run: https://github.com/o/r/actions/runs/3"));
        assert_eq!(neither.links[0].status, WorkflowStatus::Unknown);
    }

    #[test]
    fn repo_name_in_url_is_not_context() {
        let a = analyze(Some("https://github.com/o/e2e-suite/actions/runs/5"));
        assert!(!a.has_e2e_tests);
    }

    #[test]
    fn name_from_markdown_link_text() {
        let a = analyze(Some(
            "- [Nightly E2E](https://github.com/o/r/actions/runs/77) ✅",
        ));
        assert_eq!(a.links[0].workflow_name, "Nightly E2E");
        assert_eq!(a.links[0].status, WorkflowStatus::Passed);
    }

    #[test]
    fn name_from_labeled_context() {
        let a = analyze(Some(
            "E2E workflow: \"Checkout Flow\" https://github.com/o/r/actions/runs/8",
        ));
        assert_eq!(a.links[0].workflow_name, "Checkout Flow");
    }

    #[test]
    fn workflow_file_links_need_e2e_filename() {
        let text = "\
Workflows: https://github.com/o/r/blob/main/.github/workflows/e2e-smoke_tests.yml
and https://github.com/o/r/blob/main/.github/workflows/lint.yml";
        let a = analyze(Some(text));
        assert_eq!(a.links.len(), 1);
        let link = &a.links[0];
        assert_eq!(link.kind, WorkflowLinkKind::WorkflowFile);
        assert_eq!(link.workflow_name, "E2e Smoke Tests");
        assert_eq!(link.status, WorkflowStatus::Unknown);
    }

    #[test]
    fn mixed_links_keep_text_order() {
        let text = "\
Definition: https://github.com/o/r/actions/workflows/integration.yaml
E2E run passed: https://github.com/o/r/actions/runs/42";
        let a = analyze(Some(text));
        assert_eq!(a.links.len(), 2);
        assert_eq!(a.links[0].kind, WorkflowLinkKind::WorkflowFile);
        assert_eq!(a.links[1].kind, WorkflowLinkKind::WorkflowRun);
    }

    #[test]
    fn run_links_under_e2e_heading_need_no_nearby_keyword() {
        let text = "\
## E2E Test Results

The full browser suite ran against staging after the deploy window closed, covering checkout, \
search and the account pages. All green.

- Run: https://github.com/o/r/actions/runs/555

## Other
- Run: https://github.com/o/r/actions/runs/556";
        let a = analyze(Some(text));
        assert!(a.has_e2e_tests);
        assert_eq!(a.links.len(), 1);
        let link = &a.links[0];
        assert_eq!(link.url, "https://github.com/o/r/actions/runs/555");
        assert_eq!(link.workflow_name, "E2E Run #555");
        assert_eq!(link.status, WorkflowStatus::Passed);
    }

    #[test]
    fn section_wording_decides_status_when_link_context_is_silent() {
        let text = "\
### End-to-end
Nightly suite failed on Safari; see the run below.

The run below covers the checkout, search, cart and profile flows on Chrome, Firefox and Safari in three regions.
- https://github.com/o/r/actions/runs/2";
        let a = analyze(Some(text));
        assert_eq!(a.links.len(), 1);
        assert_eq!(a.links[0].status, WorkflowStatus::Failed);
    }

    #[test]
    fn humanize() {
        assert_eq!(humanize_filename("end_to_end.yaml"), "End To End");
        assert_eq!(humanize_filename("e2e.yml"), "E2e");
    }
}
