use crate::cmd::NotesArgs;
use crate::output::{print_json, print_table};
use clap::Args;
use relnote_core::ReleaseAnalysis;

#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub notes: NotesArgs,
}

pub fn run(args: AnalyzeArgs, json: bool) -> anyhow::Result<()> {
    let notes = args.notes.read()?;
    let analysis = ReleaseAnalysis::of(Some(notes.as_str()));
    let classification = analysis.classification();

    if json {
        let value = serde_json::json!({
            "classification": classification,
            "analysis": analysis,
        });
        return print_json(&value);
    }

    println!("Classification: {} {}", classification.emoji(), classification);

    let rows = finding_rows(&analysis);
    if rows.is_empty() {
        println!("No breaking, configuration, or E2E findings.");
        return Ok(());
    }
    println!();
    print_table(&["KIND", "DETAIL"], rows);
    Ok(())
}

fn finding_rows(analysis: &ReleaseAnalysis) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for marker in &analysis.breaking.markers {
        rows.push(vec!["breaking-marker".to_string(), marker.clone()]);
    }
    for item in analysis.breaking.items() {
        rows.push(vec!["breaking".to_string(), item.to_string()]);
    }
    for link in &analysis.config.links {
        rows.push(vec!["config-link".to_string(), format!("{} ({})", link.filename, link.url)]);
    }
    for diff in &analysis.config.diffs {
        rows.push(vec![
            "config-diff".to_string(),
            format!("{} [{}]", diff.filename, diff.kind.as_str()),
        ]);
    }
    for link in &analysis.e2e.links {
        rows.push(vec![
            "e2e".to_string(),
            format!("{} {} ({})", link.status.emoji(), link.workflow_name, link.url),
        ]);
    }
    rows
}
