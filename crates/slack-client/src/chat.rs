use crate::client::SlackClient;
use async_trait::async_trait;
use relnote_core::formatter::ChatMessage;
use relnote_core::transport::{ChatTransport, TransportResult};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Posted {
    #[serde(default)]
    ts: Option<String>,
}

/// `chat.postMessage` payload: the title doubles as the notification
/// fallback, the body goes in one colored attachment.
fn message_payload(channel: &str, message: &ChatMessage) -> serde_json::Value {
    json!({
        "channel": channel,
        "text": message.fallback_text(),
        "attachments": [{
            "color": message.color,
            "title": message.title,
            "text": message.body,
            "mrkdwn_in": ["text"],
        }],
    })
}

#[async_trait]
impl ChatTransport for SlackClient {
    async fn post_message(&self, channel: &str, message: &ChatMessage) -> TransportResult<()> {
        let posted: Posted = self
            .post_json("chat.postMessage", &message_payload(channel, message))
            .await?;
        tracing::debug!(channel, ts = posted.ts.as_deref().unwrap_or(""), "message posted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DEFAULT_TIMEOUT;
    use mockito::{Matcher, Server};
    use relnote_core::TransportErrorKind;

    fn message() -> ChatMessage {
        ChatMessage {
            title: "[api] 🚀 New Release: v1.2.0".to_string(),
            color: "#36a64f".to_string(),
            body: "🕒 Released at 2026-10-17T09:30:00Z".to_string(),
        }
    }

    #[test]
    fn payload_carries_color_title_and_body() {
        let payload = message_payload("C0123ABCDE", &message());
        let attachment = &payload["attachments"][0];
        assert_eq!(attachment["color"], "#36a64f");
        assert_eq!(attachment["title"], "[api] 🚀 New Release: v1.2.0");
        assert_eq!(attachment["text"], "🕒 Released at 2026-10-17T09:30:00Z");
    }

    #[tokio::test]
    async fn posts_to_chat_endpoint() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_body(Matcher::PartialJson(json!({
                "channel": "C0123ABCDE",
                "text": "[api] 🚀 New Release: v1.2.0",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true, "channel": "C0123ABCDE", "ts": "1700000000.000100"}"#)
            .create_async()
            .await;

        let client = SlackClient::with_options("xoxb-test", server.url(), DEFAULT_TIMEOUT).unwrap();
        client.post_message("C0123ABCDE", &message()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn not_in_channel_has_remediation() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat.postMessage")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": false, "error": "not_in_channel"}"#)
            .create_async()
            .await;

        let client = SlackClient::with_options("xoxb-test", server.url(), DEFAULT_TIMEOUT).unwrap();
        let err = client.post_message("#releases", &message()).await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::NotInChannel);
        assert!(err.diagnostic().contains("/invite"));
    }
}
