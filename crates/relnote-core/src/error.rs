use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// TransportErrorKind
// ---------------------------------------------------------------------------

/// Typed classification of a failed chat or document-store call.
///
/// Populated by the transport adapter, which is the only place that knows
/// the provider's raw error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    NotInChannel,
    MissingScope,
    FeatureDisabled,
    TierUnsupported,
    AlreadyExists,
    NotFound,
    RateLimited,
    Timeout,
    Other,
}

impl TransportErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportErrorKind::NotInChannel => "not_in_channel",
            TransportErrorKind::MissingScope => "missing_scope",
            TransportErrorKind::FeatureDisabled => "feature_disabled",
            TransportErrorKind::TierUnsupported => "tier_unsupported",
            TransportErrorKind::AlreadyExists => "already_exists",
            TransportErrorKind::NotFound => "not_found",
            TransportErrorKind::RateLimited => "rate_limited",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Other => "other",
        }
    }

    /// Human-readable next step for a recognised failure. `None` for `Other`,
    /// where the raw code and payload are the only useful diagnostics.
    pub fn remediation(self) -> Option<&'static str> {
        match self {
            TransportErrorKind::NotInChannel => Some(
                "The bot is not a member of the target channel. Invite it with /invite @<bot-name> and retry.",
            ),
            TransportErrorKind::MissingScope => Some(
                "The bot token is missing a required OAuth scope (chat:write, channels:read, canvases:write, canvases:read, files:read). Add the scope and reinstall the app.",
            ),
            TransportErrorKind::FeatureDisabled => Some(
                "Canvases are disabled for this workspace. Ask a workspace admin to enable them, or disable release history.",
            ),
            TransportErrorKind::TierUnsupported => Some(
                "The workspace plan does not support channel canvases. Use repository scope (standalone canvases) or upgrade the plan.",
            ),
            TransportErrorKind::AlreadyExists => Some(
                "A release canvas already exists for this channel but could not be located. Check the channel's canvas tab and record its id in the metadata store, or remove the stale canvas.",
            ),
            TransportErrorKind::NotFound => Some(
                "The channel or canvas no longer exists or is not visible to the bot. Verify the channel reference and the bot's access.",
            ),
            TransportErrorKind::RateLimited => Some(
                "The provider rate-limited this request. Retry the release notification later.",
            ),
            TransportErrorKind::Timeout => Some(
                "The request timed out. Check network connectivity or raise slack.timeout_secs.",
            ),
            TransportErrorKind::Other => None,
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Uniform `{code, message}` failure shape returned by every adapter call.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    /// Raw provider error code, preserved verbatim.
    pub code: String,
    pub message: String,
    /// Full provider payload for unrecognised codes.
    pub detail: Option<serde_json::Value>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind == TransportErrorKind::AlreadyExists
    }

    /// One-line diagnostic: raw code, message and either the remediation or
    /// the full payload.
    pub fn diagnostic(&self) -> String {
        match (self.kind.remediation(), &self.detail) {
            (Some(fix), _) => format!("{} ({}): {}", self.message, self.code, fix),
            (None, Some(detail)) => format!("{} ({}); payload: {}", self.message, self.code, detail),
            (None, None) => format!("{} ({})", self.message, self.code),
        }
    }
}

// ---------------------------------------------------------------------------
// RelnoteError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RelnoteError {
    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    #[error("channel could not be resolved: {0}")]
    ChannelNotFound(String),

    #[error("transport error: {}", .0.diagnostic())]
    Transport(#[from] TransportError),

    #[error("release document for '{key}' exists but could not be located: {reason}")]
    DiscoveryAmbiguous { key: String, reason: String },

    #[error("release document lookup for '{key}' did not complete: {reason}")]
    DiscoveryIncomplete { key: String, reason: String },

    #[error("invalid classification: {0}")]
    InvalidClassification(String),

    #[error("invalid discovery strategy: {0}")]
    InvalidStrategy(String),

    #[error("invalid document scope: {0}")]
    InvalidScope(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RelnoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognised_kinds_have_remediation() {
        for kind in [
            TransportErrorKind::NotInChannel,
            TransportErrorKind::MissingScope,
            TransportErrorKind::FeatureDisabled,
            TransportErrorKind::TierUnsupported,
            TransportErrorKind::AlreadyExists,
        ] {
            assert!(kind.remediation().is_some(), "{kind} has no remediation");
        }
        assert!(TransportErrorKind::Other.remediation().is_none());
    }

    #[test]
    fn unrecognised_code_keeps_payload_in_diagnostic() {
        let err = TransportError::new(TransportErrorKind::Other, "weird_code", "call failed")
            .with_detail(serde_json::json!({"ok": false, "error": "weird_code", "x": 1}));
        let text = err.diagnostic();
        assert!(text.contains("weird_code"));
        assert!(text.contains("\"x\":1"));
    }

    #[test]
    fn transport_error_display_keeps_raw_code() {
        let err: RelnoteError =
            TransportError::new(TransportErrorKind::NotInChannel, "not_in_channel", "post failed")
                .into();
        let text = err.to_string();
        assert!(text.contains("not_in_channel"));
        assert!(text.contains("/invite"));
    }
}
