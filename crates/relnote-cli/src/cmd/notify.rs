use crate::cmd::render::print_message;
use crate::cmd::ReleaseArgs;
use crate::output::print_json;
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use relnote_core::config::WarnLevel;
use relnote_core::discovery::DiscoveryStrategy;
use relnote_core::memory::{InMemoryChat, InMemoryDocumentStore};
use relnote_core::metadata::{FileMetadataStore, MetadataStore};
use relnote_core::publish::ChatStatus;
use relnote_core::{
    ChannelRef, Config, DocumentScope, History, HistoryStatus, PublishReport, Publisher,
    ReconcileSettings, ReleaseEvent, RelnoteError,
};
use slack_client::SlackClient;
use std::path::Path;
use std::time::Duration;

/// Channel id used for name-addressed channels during a dry run.
const DRY_RUN_CHANNEL_ID: &str = "CDRYRUN0000";

#[derive(Args)]
pub struct NotifyArgs {
    /// Target channel: an id (C0123ABCD), #name, or bare name
    #[arg(long, env = "RELNOTE_CHANNEL")]
    pub channel: Option<String>,

    #[command(flatten)]
    pub release: ReleaseArgs,

    /// Slack bot token
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// History scope override: channel or repository
    #[arg(long)]
    pub scope: Option<String>,

    /// Skip the history document for this run
    #[arg(long)]
    pub no_history: bool,

    /// Render everything against an in-memory workspace; nothing is sent
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(root: &Path, args: NotifyArgs, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let errors: Vec<String> = config
        .validate()
        .into_iter()
        .filter(|w| w.level == WarnLevel::Error)
        .map(|w| w.message)
        .collect();
    if !errors.is_empty() {
        anyhow::bail!("invalid config: {}", errors.join("; "));
    }

    let channel = args.channel.clone().unwrap_or_default();
    let event = args.release.to_event()?;
    let mut settings = config.reconcile_settings();
    if let Some(scope) = args.scope.as_deref() {
        settings.scope = scope.parse::<DocumentScope>()?;
    }
    let history_enabled = config.history.enabled && !args.no_history;
    let now = Utc::now();

    let rt = tokio::runtime::Runtime::new()?;
    let (report, document) = if args.dry_run {
        rt.block_on(dry_run(&channel, &event, &settings, history_enabled, now))?
    } else {
        let token = args
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing Slack bot token: pass --token or set SLACK_BOT_TOKEN"))?;
        let client = SlackClient::with_options(
            token,
            config.slack.base_url.as_str(),
            Duration::from_secs(config.slack.timeout_secs),
        )?;
        let metadata = config
            .metadata
            .enabled
            .then(|| FileMetadataStore::for_root(root, config.metadata.dir.as_deref()));
        let report = rt.block_on(live(
            &client,
            metadata.as_ref().map(|m| m as &dyn MetadataStore),
            &channel,
            &event,
            &settings,
            history_enabled,
            now,
        ))?;
        (report, None)
    };

    if json {
        let mut value = serde_json::to_value(&report)?;
        if let Some(document) = &document {
            value["document"] = serde_json::Value::String(document.clone());
        }
        print_json(&value)?;
    } else {
        print_report(&report, args.dry_run);
        if let Some(document) = &document {
            println!();
            println!("--- document ---");
            print!("{document}");
        }
    }

    match &report.chat {
        ChatStatus::Sent => Ok(()),
        ChatStatus::Failed { reason } => anyhow::bail!("release notification failed: {reason}"),
    }
}

async fn live(
    client: &SlackClient,
    metadata: Option<&dyn MetadataStore>,
    channel: &str,
    event: &ReleaseEvent,
    settings: &ReconcileSettings,
    history_enabled: bool,
    now: DateTime<Utc>,
) -> relnote_core::Result<PublishReport> {
    let mut publisher = Publisher::new(client);
    if history_enabled {
        publisher = publisher.with_history(History {
            store: client,
            metadata,
            settings,
        });
    }
    publisher.publish(channel, event, now).await
}

/// Publish against an empty in-memory workspace holding only the target
/// channel. Returns the document the run would have written.
async fn dry_run(
    channel: &str,
    event: &ReleaseEvent,
    settings: &ReconcileSettings,
    history_enabled: bool,
    now: DateTime<Utc>,
) -> anyhow::Result<(PublishReport, Option<String>)> {
    let chat = InMemoryChat::new();
    let store = InMemoryDocumentStore::new();
    match ChannelRef::parse(channel) {
        Some(ChannelRef::Id(id)) => store.add_channel(&id, &id),
        Some(ChannelRef::Name(name)) => store.add_channel(DRY_RUN_CHANNEL_ID, &name),
        None => return Err(RelnoteError::MissingInput("channel").into()),
    }

    // The in-memory store has no propagation delay to wait out.
    let settings = ReconcileSettings {
        plan: settings.plan.without(DiscoveryStrategy::DelayedChannelProperties),
        ..settings.clone()
    };
    let mut publisher = Publisher::new(&chat);
    if history_enabled {
        publisher = publisher.with_history(History {
            store: &store,
            metadata: None,
            settings: &settings,
        });
    }
    let report = publisher.publish(channel, event, now).await?;

    let document = match &report.history {
        HistoryStatus::Created { document_id, .. } | HistoryStatus::Edited { document_id, .. } => {
            store.content(document_id)
        }
        HistoryStatus::Disabled | HistoryStatus::Failed { .. } => None,
    };
    Ok((report, document))
}

fn print_report(report: &PublishReport, dry_run: bool) {
    if dry_run {
        println!("Dry run: nothing was sent to Slack.");
        println!();
    }
    println!("Classification: {} {}", report.classification.emoji(), report.classification);
    match &report.chat {
        ChatStatus::Sent if dry_run => println!("Chat:           rendered"),
        ChatStatus::Sent => println!("Chat:           sent"),
        ChatStatus::Failed { reason } => println!("Chat:           failed: {reason}"),
    }
    match &report.history {
        HistoryStatus::Disabled => println!("History:        disabled"),
        HistoryStatus::Created { document_id, entries } => {
            println!("History:        created {document_id} ({entries} releases)")
        }
        HistoryStatus::Edited { document_id, entries } => {
            println!("History:        updated {document_id} ({entries} releases)")
        }
        HistoryStatus::Failed { reason } => println!("History:        failed: {reason}"),
    }
    if dry_run {
        println!();
        print_message(&report.message);
    }
}
