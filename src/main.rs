use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use steam_dataset::calculate::build_record;
use steam_dataset::collect::{CollectOptions, Collector};
use steam_dataset::config::{AppConfig, API_KEY_ENV};
use steam_dataset::dataset::DatasetCreator;
use steam_dataset::fetch::SteamClient;
use steam_dataset::scrape::{GroupScraper, ScrapeOptions};
use steam_dataset::storage::{StorageConfig, UserStore};

#[derive(Parser)]
#[command(name = "steam-dataset")]
#[command(about = "Steam player dataset builder")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the config's
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect users and their libraries from the Steam API
    Collect {
        /// CSV file with steam ids
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Ids per player summaries request (1-100)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Export the analytics dataset from stored users
    Dataset {
        /// Output CSV path
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also write a Parquet copy
        #[arg(long)]
        parquet: bool,
    },

    /// Print the analytics record of one stored user
    Analyze {
        /// Steam id of the user
        steamid: String,
    },

    /// Collect steam ids from a community group's member list
    Scrape {
        /// Group URL
        #[arg(long)]
        group: Option<String>,

        #[arg(long)]
        start_page: Option<u32>,

        #[arg(long)]
        end_page: Option<u32>,

        /// Visit N distinct random pages of the range instead of all of them
        #[arg(long, value_name = "N")]
        sample: Option<usize>,
    },
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    config.apply_log_level(cli.log_level);
    init_tracing(&config.log_level, cli.json_logs);
    tracing::info!("Starting steam-dataset v{}", env!("CARGO_PKG_VERSION"));
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    let storage = StorageConfig::new(config.data_dir.clone());

    match cli.command {
        Commands::Collect { csv, batch_size } => {
            if let Some(csv) = csv {
                config.collect.steam_ids_csv = csv;
            }
            if let Some(batch_size) = batch_size {
                config.collect.batch_size = batch_size;
            }
            config.validate()?;

            if config.steam.api_key.is_empty() {
                bail!(
                    "No Steam API key: set {} or steam.api_key in the config",
                    API_KEY_ENV
                );
            }

            let client = SteamClient::new(&config.steam)?;
            let mut collector =
                Collector::new(client, &storage, CollectOptions::from_config(&config));
            let report = collector.run().await?;

            println!("Collection complete");
            println!("  Processed ids:    {}", report.processed);
            println!("  Valid users:      {}", report.valid_users);
            println!("  Saved users:      {}", report.saved_users);
            println!("  Failed:           {}", report.failed);
        }

        Commands::Dataset { output, parquet } => {
            let output = output.unwrap_or(config.dataset.output_csv);
            let report = DatasetCreator::new(&storage, output.clone())
                .with_parquet(parquet || config.dataset.write_parquet)
                .create()?;

            println!("Dataset written to {}", output.display());
            println!("  Total users:      {}", report.total);
            println!("  Processed:        {}", report.processed);
            println!("  Saved:            {}", report.saved);
            println!("  Skipped:          {}", report.skipped);
            println!("  Failed:           {}", report.failed);
        }

        Commands::Analyze { steamid } => {
            let users = UserStore::open(&storage);
            let Some(user) = users.get(&steamid)? else {
                bail!("User {} not found in {:?}", steamid, users.path());
            };

            match build_record(&user) {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("User {} has no games with playtime", steamid),
            }
        }

        Commands::Scrape {
            group,
            start_page,
            end_page,
            sample,
        } => {
            if let Some(group) = group {
                config.scrape.group_url = group;
            }
            if let Some(start_page) = start_page {
                config.scrape.start_page = start_page;
            }
            if let Some(end_page) = end_page {
                config.scrape.end_page = end_page;
            }
            if sample.is_some() {
                config.scrape.sample_pages = sample;
            }
            config.validate()?;

            let client = SteamClient::new(&config.steam)?;
            let mut scraper = GroupScraper::new(client, ScrapeOptions::from_config(&config));
            let report = scraper.run().await?;

            println!("Scrape complete");
            println!("  Pages:            {}", report.pages);
            println!("  Links:            {}", report.links);
            println!("  Resolved:         {}", report.resolved);
            println!("  Unresolved:       {}", report.unresolved);
        }
    }

    Ok(())
}
