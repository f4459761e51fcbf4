//! The one place Slack error codes are interpreted.

use relnote_core::error::{TransportError, TransportErrorKind};
use serde_json::Value;
use thiserror::Error;

/// Failure to construct a client; call failures use [`TransportError`].
#[derive(Debug, Error)]
pub enum SlackError {
    #[error("Slack bot token is empty")]
    MissingToken,

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

pub fn kind_for_code(code: &str) -> TransportErrorKind {
    match code {
        "not_in_channel" | "channel_not_joined" => TransportErrorKind::NotInChannel,
        "missing_scope" | "no_permission" | "restricted_action" => TransportErrorKind::MissingScope,
        "canvas_disabled" | "feature_not_enabled" | "canvas_creation_failed_disabled" => {
            TransportErrorKind::FeatureDisabled
        }
        "free_team_not_allowed" | "team_tier_cannot_create_channel_canvases" | "paid_only" => {
            TransportErrorKind::TierUnsupported
        }
        "channel_canvas_already_exists" => TransportErrorKind::AlreadyExists,
        "canvas_not_found" | "file_not_found" | "channel_not_found" | "file_deleted" => {
            TransportErrorKind::NotFound
        }
        "ratelimited" | "rate_limited" => TransportErrorKind::RateLimited,
        _ => TransportErrorKind::Other,
    }
}

/// Build the error for an `ok: false` envelope. Unrecognised codes keep the
/// whole payload for diagnosis.
pub fn from_payload(method: &str, payload: &Value) -> TransportError {
    let code = payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error");
    let kind = kind_for_code(code);
    let err = TransportError::new(kind, code, format!("{method} failed"));
    if kind == TransportErrorKind::Other {
        err.with_detail(payload.clone())
    } else {
        err
    }
}

pub fn from_reqwest(method: &str, err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(TransportErrorKind::Timeout, "timeout", format!("{method} timed out"));
    }
    if err.status().is_some_and(|s| s.as_u16() == 429) {
        return TransportError::new(TransportErrorKind::RateLimited, "ratelimited", format!("{method} was rate limited"));
    }
    let code = if err.is_decode() { "invalid_response" } else { "http_error" };
    TransportError::new(TransportErrorKind::Other, code, format!("{method} failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognised_codes_map_to_kinds() {
        assert_eq!(kind_for_code("not_in_channel"), TransportErrorKind::NotInChannel);
        assert_eq!(kind_for_code("missing_scope"), TransportErrorKind::MissingScope);
        assert_eq!(kind_for_code("canvas_disabled"), TransportErrorKind::FeatureDisabled);
        assert_eq!(
            kind_for_code("team_tier_cannot_create_channel_canvases"),
            TransportErrorKind::TierUnsupported
        );
        assert_eq!(
            kind_for_code("channel_canvas_already_exists"),
            TransportErrorKind::AlreadyExists
        );
        assert_eq!(kind_for_code("canvas_not_found"), TransportErrorKind::NotFound);
        assert_eq!(kind_for_code("something_new"), TransportErrorKind::Other);
    }

    #[test]
    fn payload_kept_only_for_unknown_codes() {
        let known = from_payload("chat.postMessage", &json!({"ok": false, "error": "not_in_channel"}));
        assert_eq!(known.code, "not_in_channel");
        assert!(known.detail.is_none());

        let unknown = from_payload(
            "canvases.edit",
            &json!({"ok": false, "error": "invalid_blocks", "response_metadata": {"messages": ["bad"]}}),
        );
        assert_eq!(unknown.kind, TransportErrorKind::Other);
        assert!(unknown.diagnostic().contains("\"messages\""));
    }

    #[test]
    fn missing_error_field_is_unknown() {
        let err = from_payload("files.info", &json!({"ok": false}));
        assert_eq!(err.code, "unknown_error");
    }
}
