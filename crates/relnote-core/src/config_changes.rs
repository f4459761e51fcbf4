use crate::markdown::{CodeBlock, Notes};
use crate::rules::{rule, RuleSet};
use serde::{Deserialize, Serialize};
use std::fmt;

static_regex!(
    config_token_re,
    r"(?i)config|settings|\.(?:env|json|ya?ml|toml|ini|conf)\b"
);
static_regex!(
    filename_re,
    r"(?i)([\w.-]*\.(?:env|json|ya?ml|toml|ini|conf))\b"
);
static_regex!(json_object_re, r#"(?s)^\s*\{.*"[^"\n]+"\s*:"#);
static_regex!(yaml_pair_re, r"(?m)^\s*[A-Za-z_][\w.-]*:\s+\S");
static_regex!(env_var_re, r"(?m)^\s*(?:export\s+)?[A-Z][A-Z0-9_]*=");
static_regex!(ini_section_re, r"(?m)^\s*\[[^\]\n]+\]\s*$");
static_regex!(key_value_re, r"(?m)^\s*[\w.-]+\s*=\s*\S");
static_regex!(before_re, r"(?i)\b(?:before|old|previous)\b");
static_regex!(after_re, r"(?i)\b(?:after|new|updated)\b");
static_regex!(
    mention_subject_re,
    r"(?i)\b(?:config|configuration|settings)\b|\.env\b"
);
static_regex!(
    change_verb_re,
    r"(?i)\b(?:changed|updated|modified|added|removed)\b"
);

const CONFIG_LANGS: &[&str] = &[
    "json", "yaml", "yml", "toml", "ini", "env", "dotenv", "conf", "cfg", "properties",
];

const DEFAULT_FILENAME: &str = "configuration";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLink {
    pub text: String,
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffKind {
    Diff,
    BeforeAfter,
    Mention,
}

impl DiffKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiffKind::Diff => "diff",
            DiffKind::BeforeAfter => "before-after",
            DiffKind::Mention => "mention",
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDiff {
    pub filename: String,
    pub content: String,
    pub kind: DiffKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigAnalysis {
    pub has_config_changes: bool,
    pub links: Vec<ConfigLink>,
    pub diffs: Vec<ConfigDiff>,
    #[serde(skip)]
    section_found: bool,
}

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

fn filename_in(text: &str) -> Option<String> {
    filename_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// True when a fenced block plausibly holds configuration.
pub fn is_config_like(block: &CodeBlock) -> bool {
    if block
        .lang
        .as_deref()
        .is_some_and(|l| CONFIG_LANGS.contains(&l))
    {
        return true;
    }
    let c = block.content.as_str();
    filename_re().is_match(c)
        || json_object_re().is_match(c)
        || yaml_pair_re().is_match(c)
        || env_var_re().is_match(c)
        || ini_section_re().is_match(c)
        || key_value_re().is_match(c)
}

/// Index pairs of consecutive blocks introduced as before/after.
fn before_after_pairs(notes: &Notes) -> Vec<(usize, usize)> {
    let blocks = notes.code_blocks();
    let mut pairs = Vec::new();
    let mut i = 0;
    while i + 1 < blocks.len() {
        let (a, b) = (&blocks[i], &blocks[i + 1]);
        let intro_a = notes.lines_before(a.open_line, 2).join(" ");
        let intro_b = notes.lines_before(b.open_line, 2).join(" ");
        if before_re().is_match(&intro_a)
            && after_re().is_match(&intro_b)
            && (is_config_like(a) || is_config_like(b))
        {
            pairs.push((i, i + 1));
            i += 2;
        } else {
            i += 1;
        }
    }
    pairs
}

fn block_filename(notes: &Notes, block: &CodeBlock) -> String {
    notes
        .lines_before(block.open_line, 2)
        .into_iter()
        .find_map(filename_in)
        .or_else(|| filename_in(&block.content))
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

fn push_mention(out: &mut ConfigAnalysis, text: &str) {
    let diff = ConfigDiff {
        filename: filename_in(text).unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
        content: text.to_string(),
        kind: DiffKind::Mention,
    };
    if !out.diffs.contains(&diff) {
        out.diffs.push(diff);
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn is_config_heading(title: &str) -> bool {
    matches!(
        title,
        "configuration update"
            | "configuration updates"
            | "configuration change"
            | "configuration changes"
            | "config update"
            | "config updates"
            | "config change"
            | "config changes"
    )
}

fn dedicated_section(notes: &Notes, out: &mut ConfigAnalysis) {
    let Some(items) = notes.section(is_config_heading) else {
        return;
    };
    out.section_found = !items.is_empty();
    for item in &items {
        push_mention(out, item);
    }
}

fn config_links(notes: &Notes, out: &mut ConfigAnalysis) {
    for link in notes.links() {
        if !config_token_re().is_match(&link.text) && !config_token_re().is_match(&link.url) {
            continue;
        }
        if out.links.iter().any(|l| l.url == link.url) {
            continue;
        }
        let path = link.url.split(['?', '#']).next().unwrap_or(&link.url);
        let filename = filename_in(&link.text)
            .or_else(|| path.rsplit('/').next().and_then(filename_in))
            .unwrap_or_else(|| link.text.clone());
        out.links.push(ConfigLink {
            text: link.text,
            url: link.url,
            filename,
        });
    }
}

fn fenced_blocks(notes: &Notes, out: &mut ConfigAnalysis) {
    let paired: Vec<usize> = before_after_pairs(notes)
        .into_iter()
        .flat_map(|(a, b)| [a, b])
        .collect();
    for (i, block) in notes.code_blocks().iter().enumerate() {
        if paired.contains(&i) || block.content.trim().is_empty() || !is_config_like(block) {
            continue;
        }
        out.diffs.push(ConfigDiff {
            filename: block_filename(notes, block),
            content: block.content.clone(),
            kind: DiffKind::Diff,
        });
    }
}

fn before_after_blocks(notes: &Notes, out: &mut ConfigAnalysis) {
    let blocks = notes.code_blocks();
    for (a, b) in before_after_pairs(notes) {
        let (before, after) = (&blocks[a], &blocks[b]);
        let filename = [before, after]
            .iter()
            .map(|blk| block_filename(notes, blk))
            .find(|f| f != DEFAULT_FILENAME)
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
        out.diffs.push(ConfigDiff {
            filename,
            content: format!("Before:\n{}\n\nAfter:\n{}", before.content, after.content),
            kind: DiffKind::BeforeAfter,
        });
    }
}

fn bullet_mentions(notes: &Notes, out: &mut ConfigAnalysis) {
    for item in notes.prose_bullets() {
        if mention_subject_re().is_match(item) && change_verb_re().is_match(item) {
            push_mention(out, item);
        }
    }
}

pub fn default_rules() -> RuleSet<ConfigAnalysis> {
    RuleSet::new(vec![
        rule! { id: "dedicated_section", apply: dedicated_section },
        rule! { id: "config_links", apply: config_links },
        rule! { id: "fenced_blocks", apply: fenced_blocks },
        rule! { id: "before_after_blocks", apply: before_after_blocks },
        rule! {
            id: "bullet_mentions",
            apply: bullet_mentions,
            when: |a: &ConfigAnalysis| !a.section_found
        },
    ])
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn analyze(text: Option<&str>) -> ConfigAnalysis {
    let mut out = ConfigAnalysis::default();
    let Some(text) = text else {
        return out;
    };
    let notes = Notes::parse(text);
    if notes.is_empty() {
        return out;
    }

    default_rules().run(&notes, &mut out);

    out.has_config_changes = !out.links.is_empty() || !out.diffs.is_empty();
    out
}
