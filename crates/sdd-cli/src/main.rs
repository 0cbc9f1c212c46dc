mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, ScopeArgs, ValidationFailed};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sdd",
    about = "Cross-document traceability validation and auto-fix for SDD documentation corpora",
    version,
    propagate_version = true
)]
struct Cli {
    /// Corpus root (default: auto-detect from artifact type directories)
    #[arg(long, global = true, env = "AI_DEV_FLOW_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Debug logging on stderr
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the artifact index and list every artifact
    Index,

    /// Classify a reference and look it up in the index
    Resolve {
        /// Tag value, e.g. `REQ-07`, `BRD.01.01.05` or `null`
        reference: String,
    },

    /// Validate the corpus, one layer, or one artifact
    Validate {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Sweep every layer for orphans when validating the whole corpus
        #[arg(long)]
        orphans: bool,

        /// Check that element-level references name a defined element
        #[arg(long)]
        strict_elements: bool,
    },

    /// Apply the deterministic fixes, then re-validate
    Fix {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Remove unresolvable upstream tags without asking
        #[arg(long)]
        force: bool,

        /// Answer yes to every prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Show the fix audit journal
    Audit {
        /// Number of most recent entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Inspect and validate `.sdd/config.yaml`
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
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
    tracing::debug!(root = %root.display(), "corpus root");

    let result = match cli.command {
        Commands::Index => cmd::index::run(&root, cli.json),
        Commands::Resolve { reference } => cmd::resolve::run(&root, &reference, cli.json),
        Commands::Validate {
            scope,
            orphans,
            strict_elements,
        } => cmd::validate::run(&root, &scope, orphans, strict_elements, cli.json),
        Commands::Fix {
            scope,
            dry_run,
            force,
            yes,
        } => cmd::fix::run(&root, &scope, dry_run, force, yes, cli.json),
        Commands::Audit { limit } => cmd::audit::run(&root, limit, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        if let Some(failed) = e.downcast_ref::<ValidationFailed>() {
            eprintln!("{failed}");
            std::process::exit(1);
        }
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(2);
    }
}
