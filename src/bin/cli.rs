//! jobwatch CLI
//!
//! Local execution entry point. For AWS Lambda, use `jobwatch-lambda`.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use jobwatch::{
    error::{AppError, Result},
    models::{Config, Posting, job_link},
    pipeline::{self, RunOptions},
    services::{ChromeTableReader, PageReader},
    storage::{self, RecordStore},
};

/// jobwatch - CSC career board watcher
#[derive(Parser, Debug)]
#[command(
    name = "jobwatch",
    version,
    about = "Publishes new CSC job postings to a Facebook Page"
)]
struct Cli {
    /// Path to storage directory containing config files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape new postings, publish them and move the checkpoint
    Run {
        /// Postings per published message (default: publisher.batch_size)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Report what would be published without posting or saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Scrape new postings and print them as JSON
    Scrape {
        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Write the JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Inspect or edit the stored checkpoint
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },

    /// Capture a full-page screenshot of a posting
    Screenshot {
        /// Job ID as shown on the board
        job_id: String,

        /// Image path (default: {job_id}.png)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,
    },

    /// Validate configuration files
    Validate,
}

#[derive(Subcommand, Debug)]
enum CheckpointAction {
    /// Print the stored checkpoint
    Show,

    /// Remove the checkpoint; the next run reads the first page only
    Clear,

    /// Replace the checkpoint with a posting from a JSON file
    Set {
        /// JSON file holding one posting
        #[arg(long)]
        file: PathBuf,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, config_level: &str) {
    let level = if verbose { "debug" } else { config_level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = cli.storage_dir.join("config.toml");
    let config = if config_path.exists() {
        Config::load(&config_path)
    } else {
        Ok(Config::default())
    };
    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    let result = match config {
        Ok(config) => execute(cli, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn execute(cli: Cli, mut config: Config) -> Result<()> {
    log::info!("jobwatch starting...");
    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    match cli.command {
        Command::Run {
            batch_size,
            headed,
            dry_run,
        } => {
            config.scraper.headless = !headed;
            config.validate()?;

            let options = RunOptions::new(
                batch_size.unwrap_or(config.publisher.batch_size),
                dry_run,
            );
            let summary = pipeline::run_from_config(&config, &cli.storage_dir, options).await?;

            if dry_run {
                println!("{}", serde_json::to_string_pretty(&summary.postings)?);
            }
        }

        Command::Scrape { headed, output } => {
            config.scraper.headless = !headed;
            config.validate()?;

            let store = storage::open_store(&config.store, &cli.storage_dir).await?;
            let result = pipeline::scrape_board(&config, store.as_ref()).await;
            store.close().await?;
            let postings = result?;

            let json = serde_json::to_string_pretty(&postings)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    log::info!("Wrote {} postings to {}", postings.len(), path.display());
                }
                None => println!("{json}"),
            }
        }

        Command::Checkpoint { action } => {
            let store = storage::open_store(&config.store, &cli.storage_dir).await?;
            let result = checkpoint(store.as_ref(), action).await;
            store.close().await?;
            result?;
        }

        Command::Screenshot {
            job_id,
            output,
            headed,
        } => {
            config.scraper.headless = !headed;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{job_id}.png")));
            let link = job_link(&config.scraper.job_link_base, &job_id);

            let mut reader = ChromeTableReader::launch(&config.scraper).await?;
            let result = reader.screenshot(&link, &output).await;
            reader.close().await?;
            result?;
            log::info!("Screenshot saved to {}", output.display());
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} store)", config.store.backend);

            log::info!("All validations passed!");
        }
    }

    log::info!("Done!");

    Ok(())
}

async fn checkpoint(store: &dyn RecordStore, action: CheckpointAction) -> Result<()> {
    match action {
        CheckpointAction::Show => {
            log::info!("{} record(s) stored", store.count().await?);
            match store.get_latest().await? {
                Some(latest) => println!("{}", serde_json::to_string_pretty(&latest)?),
                None => log::info!("No checkpoint stored yet."),
            }
        }
        CheckpointAction::Clear => {
            store.delete_all().await?;
            log::info!("Checkpoint cleared.");
        }
        CheckpointAction::Set { file } => {
            let posting = read_posting(&file)?;
            store.replace_checkpoint(&posting).await?;
            log::info!("Checkpoint set to job {}", posting.job_id);
        }
    }
    Ok(())
}

fn read_posting(path: &Path) -> Result<Posting> {
    let content = std::fs::read_to_string(path)?;
    let posting: Posting = serde_json::from_str(&content)?;
    if posting.job_id.trim().is_empty() {
        return Err(AppError::config(format!(
            "{} has an empty jobid",
            path.display()
        )));
    }
    Ok(posting)
}
