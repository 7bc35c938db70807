mod cmd;
mod handlers;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "strata",
    about = "Staged, multi-account deployment orchestration from a declarative org config",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the organization configuration file
    #[arg(long, global = true, env = "STRATA_CONFIG", default_value = "strata.yaml")]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and pipeline definition
    Validate,

    /// List the organization's accounts
    Accounts,

    /// Show which accounts a configured module (or an ad-hoc target) resolves to
    Resolve {
        /// Resolve the target of this configured module
        #[arg(long, conflicts_with_all = ["account", "ou", "exclude_account"])]
        module: Option<String>,

        /// Include this account name (repeatable)
        #[arg(long = "account")]
        account: Vec<String>,

        /// Include this organizational unit (repeatable)
        #[arg(long = "ou")]
        ou: Vec<String>,

        /// Exclude this account name (repeatable)
        #[arg(long = "exclude-account")]
        exclude_account: Vec<String>,
    },

    /// Execute the pipeline
    Run {
        /// Describe what would happen without performing any mutating call
        #[arg(long)]
        dry_run: bool,

        /// Override the configured per-module concurrency bound
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        max_concurrent: Option<u64>,

        /// Restrict execution to these regions (default: all configured)
        #[arg(long = "region")]
        regions: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Validate => cmd::validate::run(&cli.config, cli.json),
        Commands::Accounts => cmd::accounts::run(&cli.config, cli.json),
        Commands::Resolve {
            module,
            account,
            ou,
            exclude_account,
        } => cmd::resolve::run(
            &cli.config,
            module.as_deref(),
            account,
            ou,
            exclude_account,
            cli.json,
        ),
        Commands::Run {
            dry_run,
            max_concurrent,
            regions,
        } => cmd::run::run(&cli.config, dry_run, max_concurrent, regions, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
