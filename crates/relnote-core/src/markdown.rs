//! Line-level markdown scanning shared by the analyzers.
//!
//! This is not a markdown parser. It knows exactly four things: fenced code
//! blocks, ATX headings, bullet lines, and markdown links. Everything else is
//! prose.

static_regex!(heading_re, r"^\s{0,3}(#{1,6})\s+(.+?)\s*#*\s*$");
static_regex!(bullet_re, r"^\s*[-*•+]\s+(.*\S)\s*$");
static_regex!(link_re, r"\[([^\]\n]+)\]\(([^)\s]+)\)");

// ---------------------------------------------------------------------------
// Line / CodeBlock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    /// Zero-based line index.
    pub index: usize,
    pub text: &'a str,
    /// True for fence lines and everything between them.
    pub in_code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub lang: Option<String>,
    pub content: String,
    /// Line index of the opening fence.
    pub open_line: usize,
    /// Line index of the closing fence (last line if the fence never closes).
    pub close_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub url: String,
    /// Byte offset of the opening `[`.
    pub offset: usize,
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

/// Release notes split into classified lines, scanned once and shared by
/// every analyzer rule.
#[derive(Debug)]
pub struct Notes<'a> {
    text: &'a str,
    lines: Vec<Line<'a>>,
    blocks: Vec<CodeBlock>,
}

impl<'a> Notes<'a> {
    pub fn parse(text: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut blocks = Vec::new();
        let mut open: Option<(usize, Option<String>, Vec<&'a str>)> = None;

        for (index, raw) in text.lines().enumerate() {
            let trimmed = raw.trim_start();
            let is_fence = trimmed.starts_with("```") || trimmed.starts_with("~~~");
            if is_fence {
                match open.take() {
                    None => {
                        let lang = trimmed
                            .trim_start_matches(['`', '~'])
                            .trim()
                            .to_lowercase();
                        let lang = if lang.is_empty() { None } else { Some(lang) };
                        open = Some((index, lang, Vec::new()));
                    }
                    Some((open_line, lang, body)) => blocks.push(CodeBlock {
                        lang,
                        content: body.join("\n"),
                        open_line,
                        close_line: index,
                    }),
                }
                lines.push(Line { index, text: raw, in_code: true });
            } else if let Some((_, _, body)) = open.as_mut() {
                body.push(raw);
                lines.push(Line { index, text: raw, in_code: true });
            } else {
                lines.push(Line { index, text: raw, in_code: false });
            }
        }

        if let Some((open_line, lang, body)) = open {
            blocks.push(CodeBlock {
                lang,
                content: body.join("\n"),
                open_line,
                close_line: lines.len().saturating_sub(1),
            });
        }

        Self { text, lines, blocks }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn lines(&self) -> &[Line<'a>] {
        &self.lines
    }

    /// Lines outside fenced code blocks.
    pub fn prose_lines(&self) -> impl Iterator<Item = &Line<'a>> {
        self.lines.iter().filter(|l| !l.in_code)
    }

    /// Bullet item text for every prose bullet line, headings excluded.
    pub fn prose_bullets(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.prose_lines().filter_map(|l| bullet(l.text))
    }

    pub fn code_blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    /// Up to `n` non-blank prose lines immediately preceding `line`, nearest
    /// first. Stops at the previous code block.
    pub fn lines_before(&self, line: usize, n: usize) -> Vec<&'a str> {
        let mut out = Vec::new();
        for l in self.lines[..line.min(self.lines.len())].iter().rev() {
            if l.in_code || out.len() == n {
                break;
            }
            if !l.text.trim().is_empty() {
                out.push(l.text);
            }
        }
        out
    }

    /// Collect bullet items under every heading (levels 1-4) whose normalized
    /// text satisfies `matches`, up to the next heading of any level.
    ///
    /// Returns `None` when no matching heading exists. Items containing the
    /// inline separator ` • ` are split into independent entries.
    pub fn section(&self, matches: fn(&str) -> bool) -> Option<Vec<String>> {
        let mut found = false;
        let mut inside = false;
        let mut items = Vec::new();

        for line in self.prose_lines() {
            if let Some((level, title)) = heading(line.text) {
                inside = level <= 4 && matches(&normalize_heading(title));
                found |= inside;
                continue;
            }
            if inside {
                if let Some(item) = bullet(line.text) {
                    items.extend(split_items(item));
                }
            }
        }

        found.then_some(items)
    }

    /// Byte ranges of the body under every heading (levels 1-4) whose
    /// normalized text satisfies `matches`. A body runs to the next heading
    /// of any level, or to the end of the text.
    pub fn section_spans(&self, matches: fn(&str) -> bool) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut open: Option<usize> = None;

        for line in self.prose_lines() {
            let Some((level, title)) = heading(line.text) else {
                continue;
            };
            let start = self.offset_of(line);
            if let Some(body) = open.take() {
                spans.push((body, start));
            }
            if level <= 4 && matches(&normalize_heading(title)) {
                open = Some(start + line.text.len());
            }
        }
        if let Some(body) = open {
            spans.push((body, self.text.len()));
        }
        spans
    }

    /// Byte offset of `line` within the full text.
    fn offset_of(&self, line: &Line<'a>) -> usize {
        line.text.as_ptr() as usize - self.text.as_ptr() as usize
    }

    /// Markdown links outside code blocks, in order of appearance.
    pub fn links(&self) -> Vec<Link> {
        let mut offset = 0;
        let mut out = Vec::new();
        for line in &self.lines {
            if !line.in_code {
                for caps in link_re().captures_iter(line.text) {
                    let whole = caps.get(0).map(|m| m.start()).unwrap_or(0);
                    out.push(Link {
                        text: caps[1].trim().to_string(),
                        url: caps[2].to_string(),
                        offset: offset + whole,
                    });
                }
            }
            offset += line.text.len() + 1;
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Free helpers
// ---------------------------------------------------------------------------

/// `(level, title)` for an ATX heading line.
pub fn heading(line: &str) -> Option<(usize, &str)> {
    let caps = heading_re().captures(line)?;
    let level = caps.get(1)?.as_str().len();
    let title = caps.get(2)?.as_str();
    Some((level, title))
}

/// Item text of a `-`, `*`, `+` or `•` bullet line.
pub fn bullet(line: &str) -> Option<&str> {
    bullet_re().captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Lowercase, drop emoji and punctuation, collapse whitespace.
///
/// `"⚠️ BREAKING CHANGES:"` becomes `"breaking changes"`.
pub fn normalize_heading(title: &str) -> String {
    let kept: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { ' ' })
        .collect();
    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Split an item on the inline ` • ` separator.
pub fn split_items(item: &str) -> Vec<String> {
    item.split(" • ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Byte bounds covering up to `radius` characters either side of the byte
/// range `start..end`, snapped to char boundaries.
pub fn window_bounds(text: &str, start: usize, end: usize, radius: usize) -> (usize, usize) {
    let before = if radius == 0 {
        start
    } else {
        text[..start]
            .char_indices()
            .rev()
            .nth(radius - 1)
            .map(|(i, _)| i)
            .unwrap_or(0)
    };
    let after = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    (before, after)
}

/// Slice of `text` covering up to `radius` characters either side of
/// `start..end`.
pub fn window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let (from, to) = window_bounds(text, start, end, radius);
    &text[from..to]
}

/// Stable de-duplication by exact equality.
pub fn dedup_preserving_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|s| seen.insert(s.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_levels() {
        assert_eq!(heading("## Breaking Changes"), Some((2, "Breaking Changes")));
        assert_eq!(heading("#### Notes ##"), Some((4, "Notes")));
        assert_eq!(heading("#no-space"), None);
        assert_eq!(heading("plain"), None);
    }

    #[test]
    fn bullets_accept_all_markers() {
        assert_eq!(bullet("- one"), Some("one"));
        assert_eq!(bullet("  * two "), Some("two"));
        assert_eq!(bullet("• three"), Some("three"));
        assert_eq!(bullet("**bold** text"), None);
    }

    #[test]
    fn normalize_strips_emoji_and_case() {
        assert_eq!(normalize_heading("⚠️ BREAKING CHANGES ⚠️"), "breaking changes");
        assert_eq!(normalize_heading("Configuration Updates:"), "configuration updates");
    }

    #[test]
    fn code_blocks_are_captured_with_language() {
        let notes = Notes::parse("intro\n```json\n{\"a\": 1}\n```\n- after");
        assert_eq!(notes.code_blocks().len(), 1);
        let block = &notes.code_blocks()[0];
        assert_eq!(block.lang.as_deref(), Some("json"));
        assert_eq!(block.content, "{\"a\": 1}");
        assert_eq!(block.open_line, 1);
        assert_eq!(block.close_line, 3);
        assert_eq!(notes.prose_bullets().collect::<Vec<_>>(), vec!["after"]);
    }

    #[test]
    fn unclosed_fence_runs_to_end() {
        let notes = Notes::parse("```\nA=1\nB=2");
        assert_eq!(notes.code_blocks()[0].content, "A=1\nB=2");
    }

    #[test]
    fn section_stops_at_next_heading_and_splits_items() {
        let text = "## Breaking Changes\n- a • b\n- c\n## Other\n- d";
        let notes = Notes::parse(text);
        let items = notes.section(|h| h == "breaking changes").unwrap();
        assert_eq!(items, vec!["a", "b", "c"]);
        assert!(notes.section(|h| h == "missing").is_none());
    }

    #[test]
    fn section_spans_cover_whole_bodies() {
        let text = "# Notes\r\n## QA\r\nprose line\r\n- item\r\n## Other\r\nrest\r\n### qa again\r\ntail";
        let notes = Notes::parse(text);
        let spans = notes.section_spans(|t| t.starts_with("qa"));
        assert_eq!(spans.len(), 2);
        assert_eq!(&text[spans[0].0..spans[0].1], "\r\nprose line\r\n- item\r\n");
        assert_eq!(&text[spans[1].0..spans[1].1], "\r\ntail");
        assert!(notes.section_spans(|t| t == "missing").is_empty());
    }

    #[test]
    fn links_skip_code_blocks() {
        let notes = Notes::parse("[a](http://x)\n```\n[b](http://y)\n```");
        let links = notes.links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "http://x");
    }

    #[test]
    fn window_respects_char_boundaries() {
        let text = "ééééé target ééééé";
        let start = text.find("target").unwrap();
        let w = window(text, start, start + 6, 3);
        assert!(w.contains("target"));
        assert_eq!(w.chars().count(), 12);
    }
}
