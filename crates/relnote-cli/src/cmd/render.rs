use crate::cmd::ReleaseArgs;
use crate::output::print_json;
use anyhow::Context;
use chrono::Utc;
use clap::Args;
use relnote_core::formatter;
use relnote_core::{Config, ReleaseAnalysis, ReleaseEntry, RelnoteError};
use std::path::Path;

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub release: ReleaseArgs,

    /// Name used in the history document heading (default: repository, then "releases")
    #[arg(long)]
    pub name: Option<String>,
}

pub fn run(root: &Path, args: RenderArgs, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let event = args.release.to_event()?;
    if event.version.is_empty() {
        return Err(RelnoteError::MissingInput("version").into());
    }

    let now = Utc::now();
    let analysis = ReleaseAnalysis::of(event.notes());
    let classification = analysis.classification();
    let message = formatter::render_chat_message(&event, classification, &analysis, now);

    let name = args
        .name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| Some(event.repository_name.clone()).filter(|r| !r.is_empty()))
        .unwrap_or_else(|| "releases".to_string());
    let entry = ReleaseEntry::from_event(&event, &analysis, now);
    let document = formatter::render_document_snapshot(&name, &[entry], config.history.recent_count);

    if json {
        let value = serde_json::json!({
            "classification": classification,
            "message": message,
            "document": document,
        });
        return print_json(&value);
    }

    print_message(&message);
    println!();
    println!("--- document ---");
    print!("{document}");
    Ok(())
}

pub fn print_message(message: &relnote_core::ChatMessage) {
    println!("--- chat message ({}) ---", message.color);
    println!("{}", message.title);
    if !message.body.is_empty() {
        println!();
        println!("{}", message.body);
    }
}
