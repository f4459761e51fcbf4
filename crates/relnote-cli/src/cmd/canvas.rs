use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use relnote_core::formatter;
use relnote_core::metadata::{FileMetadataStore, MetadataRecord};
use relnote_core::Config;
use std::path::Path;

#[derive(Subcommand)]
pub enum CanvasSubcommand {
    /// Show recorded history documents, or one document's stored releases
    Show {
        /// Metadata key: a channel id, or channel_id:repository
        key: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: CanvasSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CanvasSubcommand::Show { key } => show(root, key.as_deref(), json),
    }
}

fn show(root: &Path, key: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let store = FileMetadataStore::for_root(root, config.metadata.dir.as_deref());
    let records = store
        .list()
        .with_context(|| format!("failed to read {}", store.dir().display()))?;

    match key {
        Some(key) => {
            let record = records
                .into_iter()
                .find(|r| r.key == key)
                .with_context(|| format!("no history recorded for '{key}'"))?;
            show_record(&record, config.history.recent_count, json)
        }
        None => list(&records, json),
    }
}

fn list(records: &[MetadataRecord], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No history documents recorded.");
        return Ok(());
    }
    let rows = records
        .iter()
        .map(|r| {
            let meta = r.metadata.as_ref();
            vec![
                r.key.clone(),
                meta.map(|m| m.document_id.clone()).unwrap_or_else(|| "-".to_string()),
                meta.map(|m| m.channel_name.clone()).unwrap_or_else(|| "-".to_string()),
                r.entries.as_ref().map_or(0, Vec::len).to_string(),
                meta.map(|m| m.last_updated.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(&["KEY", "DOCUMENT", "CHANNEL", "RELEASES", "UPDATED"], rows);
    Ok(())
}

fn show_record(record: &MetadataRecord, recent_count: usize, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(record);
    }
    let entries = record.entries.as_deref().unwrap_or_default();
    println!("Key:       {}", record.key);
    match &record.metadata {
        Some(meta) => {
            println!("Document:  {}", meta.document_id);
            println!("Channel:   #{} ({})", meta.channel_name, meta.channel_id);
            println!("Updated:   {}", meta.last_updated.to_rfc3339());
        }
        None => println!("Document:  (not recorded)"),
    }
    println!("Releases:  {}", entries.len());

    if !entries.is_empty() {
        let name = match record.key.split_once(':') {
            Some((_, repository)) => repository.to_string(),
            None => record
                .metadata
                .as_ref()
                .map_or_else(|| record.key.clone(), |m| m.channel_name.clone()),
        };
        println!();
        print!("{}", formatter::render_document_snapshot(&name, entries, recent_count));
    }
    Ok(())
}
