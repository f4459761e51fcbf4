//! Slack Web API adapter: chat notifications via `chat.postMessage` and
//! release history documents as Slack canvases.

mod canvas;
mod chat;
mod client;
pub mod error;
pub mod types;

pub use client::{SlackClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::SlackError;
