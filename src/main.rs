use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use git_promote::config::load_config;
use git_promote::git::Git2Backend;
use git_promote::tracker::IssueTrackerClient;
use git_promote::{ui, Orchestrator, ReleaseOutcome, ReleaseRequest};

#[derive(clap::Parser)]
#[command(
    name = "git-promote",
    version,
    about = "Cut a release branch and tag when a branch's manifest version differs from production"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(long, default_value = ".", help = "Path to the git repository")]
    repo: PathBuf,

    #[arg(short, long, help = "Branch carrying the candidate version")]
    source_branch: String,

    #[arg(short, long, help = "Override the configured production branch")]
    production_branch: Option<String>,

    #[arg(short, long, help = "Ticket key to use instead of extracting it from the branch name")]
    ticket: Option<String>,

    #[arg(
        long,
        env = "RELEASE_TRACKER_TOKEN",
        hide_env_values = true,
        help = "Issue tracker API token"
    )]
    tracker_token: Option<String>,

    #[arg(long, help = "Preview what would happen without making changes")]
    dry_run: bool,

    #[arg(long, help = "Print the outcome as JSON")]
    json: bool,

    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let request = ReleaseRequest::new(args.source_branch.clone())
        .with_ticket(args.ticket.clone())
        .dry_run(args.dry_run);

    let (outcome, production_branch) = match prepare(&args) {
        Ok(mut orchestrator) => {
            let outcome = orchestrator.run(&request);
            (outcome, orchestrator.config().production_branch.clone())
        }
        Err(e) => (
            ReleaseOutcome::failed(&request, format!("{:#}", e)),
            args.production_branch
                .clone()
                .unwrap_or_else(|| "main".to_string()),
        ),
    };

    if args.json {
        println!("{}", outcome.to_json()?);
    } else {
        ui::display_outcome(&outcome, &production_branch);
    }

    std::process::exit(outcome.exit_code());
}

/// Logs go to stderr so `--json` output stays clean
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "git_promote=debug"
    } else {
        "git_promote=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load configuration, open the repository and wire the tracker
fn prepare(args: &Args) -> Result<Orchestrator<Git2Backend>> {
    let mut config =
        load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(branch) = &args.production_branch {
        config.production_branch = branch.clone();
    }
    config.validate()?;

    let backend = Git2Backend::open(&args.repo, config.remote.clone())
        .with_context(|| format!("Failed to open repository at '{}'", args.repo.display()))?
        .with_identity(config.committer.clone());

    let tracker = match &config.tracker {
        Some(tracker_config) => {
            match IssueTrackerClient::from_config(tracker_config, args.tracker_token.as_deref()) {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!(error = %e, "tracker client unavailable, continuing without it");
                    None
                }
            }
        }
        None => None,
    };

    Ok(Orchestrator::new(config, backend).with_tracker(tracker))
}
