mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    analyze::AnalyzeArgs, canvas::CanvasSubcommand, config::ConfigSubcommand, notify::NotifyArgs,
    render::RenderArgs,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "relnote",
    about = "Classify release notes, announce them in Slack, and keep a per-channel release history canvas",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .relnote/ or .git/)
    #[arg(long, global = true, env = "RELNOTE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log progress at info level
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post a release notification and record it in the channel history
    Notify(NotifyArgs),

    /// Run the release-note analyzers and show what they found
    Analyze(AnalyzeArgs),

    /// Preview the chat message and history document without contacting Slack
    Render(RenderArgs),

    /// Inspect locally cached history documents
    Canvas {
        #[command(subcommand)]
        subcommand: CanvasSubcommand,
    },

    /// Create, show, or validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Notify(args) => cmd::notify::run(&root, args, cli.json),
        Commands::Analyze(args) => cmd::analyze::run(args, cli.json),
        Commands::Render(args) => cmd::render::run(&root, args, cli.json),
        Commands::Canvas { subcommand } => cmd::canvas::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
