use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use traffic_md::{Config, Overrides, PreviewOutcome};

/// Render GitHub traffic (views, clones, popular paths) for your repositories as markdown.
#[derive(Debug, Parser)]
#[command(name = "traffic-md", version)]
struct Cli {
    /// Repositories to report on; replaces the configured list
    repositories: Vec<String>,

    /// Account owning the repositories
    #[arg(short = 'u', long)]
    owner: Option<String>,

    /// Report file to (over)write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Display order, comma separated
    #[arg(long, value_delimiter = ',', value_name = "REPO,...")]
    order: Option<Vec<String>>,

    /// Skip the markdown preview after writing
    #[arg(long)]
    no_preview: bool,

    /// Maximum requests in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds, 0 disables it
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// REST API root, e.g. for GitHub Enterprise
    #[arg(long)]
    api_base: Option<String>,

    /// Config file (default: ./traffic.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also print the report to standard output
    #[arg(long)]
    stdout: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        let repositories = (!self.repositories.is_empty()).then(|| self.repositories.clone());
        // A new repository list invalidates any configured order.
        let display_order = self.order.clone().or_else(|| repositories.clone());

        Overrides {
            owner: self.owner.clone(),
            repositories,
            output: self.output.clone(),
            display_order,
            preview: self.no_preview.then_some(false),
            api_base: self.api_base.clone(),
            concurrency: self.concurrency,
            timeout_secs: self.timeout,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref(), &cli.overrides())
        .context("Failed to load configuration")?;
    info!(
        owner = %config.owner,
        repositories = config.repositories.len(),
        "starting"
    );

    let document = traffic_md::generate(&config).await?;
    traffic_md::write_report(&document, &config.output)?;

    if cli.stdout {
        print!("{document}");
    } else {
        println!("Generated {} successfully.", config.output.display());
    }

    if config.preview {
        match traffic_md::preview(&config.preview_command, &config.output).await {
            Ok(PreviewOutcome::Finished) => {}
            Ok(PreviewOutcome::Interrupted) => info!("preview interrupted"),
            Err(e) => warn!(error = %e, "preview unavailable"),
        }
    }

    Ok(())
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
