use serde::{Deserialize, Serialize};
use std::fmt;

static_regex!(channel_id_re, r"^[CGD][A-Z0-9]{8,}$");

/// A caller-supplied channel reference: a literal id (`C0123ABCD`), a
/// `#name`, or a bare name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ChannelRef {
    Id(String),
    Name(String),
}

impl ChannelRef {
    /// `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(name) = raw.strip_prefix('#') {
            let name = name.trim();
            return (!name.is_empty()).then(|| ChannelRef::Name(name.to_string()));
        }
        if channel_id_re().is_match(raw) {
            Some(ChannelRef::Id(raw.to_string()))
        } else {
            Some(ChannelRef::Name(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChannelRef::Id(s) | ChannelRef::Name(s) => s,
        }
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRef::Id(id) => f.write_str(id),
            ChannelRef::Name(name) => write!(f, "#{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_forms() {
        assert_eq!(ChannelRef::parse("C0123ABCDE"), Some(ChannelRef::Id("C0123ABCDE".into())));
        assert_eq!(ChannelRef::parse("#releases"), Some(ChannelRef::Name("releases".into())));
        assert_eq!(ChannelRef::parse(" releases "), Some(ChannelRef::Name("releases".into())));
        assert_eq!(ChannelRef::parse("#"), None);
        assert_eq!(ChannelRef::parse("   "), None);
    }

    #[test]
    fn lowercase_lookalike_is_a_name() {
        assert_eq!(ChannelRef::parse("c0123abcde"), Some(ChannelRef::Name("c0123abcde".into())));
    }
}
