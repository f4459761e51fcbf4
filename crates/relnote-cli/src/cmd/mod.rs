pub mod analyze;
pub mod canvas;
pub mod config;
pub mod notify;
pub mod render;

use anyhow::Context;
use clap::Args;
use relnote_core::ReleaseEvent;
use std::io::Read;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Shared arguments
// ---------------------------------------------------------------------------

#[derive(Args, Debug, Default)]
pub struct NotesArgs {
    /// Release notes text (markdown)
    #[arg(long, env = "RELNOTE_NOTES", hide_env_values = true)]
    pub notes: Option<String>,

    /// Read release notes from a file (`-` for stdin); wins over --notes
    #[arg(long, value_name = "PATH")]
    pub notes_file: Option<PathBuf>,
}

impl NotesArgs {
    /// Empty when no notes were supplied.
    pub fn read(&self) -> anyhow::Result<String> {
        match &self.notes_file {
            Some(path) if path.as_os_str() == "-" => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read notes from stdin")?;
                Ok(buf)
            }
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read notes file {}", path.display())),
            None => Ok(self.notes.clone().unwrap_or_default()),
        }
    }
}

#[derive(Args, Debug)]
pub struct ReleaseArgs {
    /// Released version, e.g. v1.4.0
    #[arg(id = "release_version", long = "release-version", env = "RELNOTE_VERSION")]
    pub version: Option<String>,

    /// Repository name shown in the title and used for repository-scoped history
    #[arg(long, env = "RELNOTE_REPOSITORY")]
    pub repository: Option<String>,

    /// Link to the release page
    #[arg(long, env = "RELNOTE_RELEASE_URL")]
    pub release_url: Option<String>,

    /// Custom message shown above the release notes
    #[arg(long, env = "RELNOTE_MESSAGE")]
    pub message: Option<String>,

    #[command(flatten)]
    pub notes: NotesArgs,
}

impl ReleaseArgs {
    pub fn to_event(&self) -> anyhow::Result<ReleaseEvent> {
        let mut event = ReleaseEvent::new(
            self.version.clone().unwrap_or_default().trim(),
            self.repository.clone().unwrap_or_default().trim(),
        )
        .with_notes(self.notes.read()?);
        if let Some(url) = self.release_url.as_deref().filter(|u| !u.trim().is_empty()) {
            event = event.with_release_url(url.trim());
        }
        if let Some(message) = self.message.as_deref().filter(|m| !m.trim().is_empty()) {
            event = event.with_custom_message(message);
        }
        Ok(event)
    }
}
