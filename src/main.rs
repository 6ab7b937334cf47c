use clap::{Parser, Subcommand};
use repo_deployer::commands::*;
use repo_deployer::core::{error::Result, print_error};
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "repo-deployer")]
#[command(about = "Download, build and deploy configuration repositories step by step")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a repository (step 1)
    Download {
        /// owner/repo or a GitHub URL
        repository: String,
        #[arg(short, long, default_value = "main")]
        branch: String,
        /// Ignore the cache and download again
        #[arg(long)]
        fresh: bool,
    },
    /// Load deployment credentials from a .env file (step 1)
    Env {
        file: PathBuf,
    },
    /// List the configurations found in the downloaded repository
    Configs,
    /// Select a configuration by environment name (step 2)
    Select {
        environment: String,
    },
    /// Build the selected configuration (step 3)
    Build,
    /// Preview what a deploy would change (step 4)
    DryRun,
    /// Deploy the current build (step 4)
    Deploy,
    /// Show the deployed build (step 5)
    Verify,
    /// Move to a workflow step
    Step {
        number: u8,
    },
    /// Show workflow progress
    Status {
        /// Print the workflow summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start over at step 1
    Reset,
    /// Inspect or clean the repository cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// List the branches of a repository
    Branches {
        repository: String,
    },
    /// Show the remaining GitHub API quota
    RateLimit,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache size and entries
    Stats,
    /// Remove every cached repository
    Clear,
    /// Remove one cached repository
    Evict {
        repository: String,
        #[arg(short, long, default_value = "main")]
        branch: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configure logging based on --debug flag
    if cli.debug {
        env::set_var("RUST_LOG", "debug");
    } else {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let debug = cli.debug;
    let result = match cli.command {
        Commands::Download {
            repository,
            branch,
            fresh,
        } => execute_download(&repository, &branch, fresh, debug),
        Commands::Env { file } => execute_env(&file, debug),
        Commands::Configs => execute_configs(debug),
        Commands::Select { environment } => execute_select(&environment, debug),
        Commands::Build => execute_build(debug),
        Commands::DryRun => execute_dry_run(debug),
        Commands::Deploy => execute_deploy(debug),
        Commands::Verify => execute_verify(debug),
        Commands::Step { number } => execute_step(number, debug),
        Commands::Status { json } => execute_status(json, debug),
        Commands::Reset => execute_reset(debug),
        Commands::Cache { action } => match action {
            CacheAction::Stats => execute_cache_stats(debug),
            CacheAction::Clear => execute_cache_clear(debug),
            CacheAction::Evict { repository, branch } => {
                execute_cache_evict(&repository, &branch, debug)
            }
        },
        Commands::Branches { repository } => execute_branches(&repository, debug),
        Commands::RateLimit => execute_rate_limit(debug),
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }

    Ok(())
}
