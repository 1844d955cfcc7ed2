use anyhow::Result;
use clap::{Parser, Subcommand};
use jobboard_storage::PgJobStore;
use jobboard_sync::IngestConfig;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "jobboard-cli")]
#[command(about = "Remote job board command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one ingestion pass over the configured feeds.
    Pull,
    /// Create the jobs table and its indexes if they are missing.
    InitDb,
    /// Serve the job board (and the pull scheduler when enabled).
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Pull) {
        Commands::Pull => {
            let summary = jobboard_sync::run_pull_once_from_env().await?;
            for source in &summary.sources {
                println!(
                    "{}: items={} persisted={} old={} irrelevant={} duplicate={} failed={}{}",
                    source.source_id,
                    source.items_found,
                    source.outcomes.persisted,
                    source.outcomes.skipped_old,
                    source.outcomes.skipped_irrelevant,
                    source.outcomes.skipped_duplicate,
                    source.outcomes.insert_failed,
                    source
                        .error
                        .as_deref()
                        .map(|e| format!(" error={e}"))
                        .unwrap_or_default(),
                );
            }
            if !summary.is_success() {
                anyhow::bail!(
                    "pull {} failed for sources: {}",
                    summary.run_id,
                    summary.failed_sources().join(", ")
                );
            }
            println!(
                "pull complete: run_id={} persisted={}",
                summary.run_id,
                summary.persisted()
            );
        }
        Commands::InitDb => {
            let config = IngestConfig::from_env();
            let store = PgJobStore::connect(&config.database_url).await?;
            store.ensure_schema().await?;
            println!("jobs schema ready");
        }
        Commands::Serve => {
            jobboard_web::serve_from_env().await?;
        }
    }

    Ok(())
}
