//! Breast Cancer Predictor CLI
//!
//! Trains the artifact bundle offline and queries a running prediction server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{service, training};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Breast Cancer Predictor CLI
#[derive(Parser)]
#[command(name = "bcp")]
#[command(author, version, about = "CLI for the Breast Cancer Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via BCP_API_URL env var)
    #[arg(long, env = "BCP_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the classifier on the embedded dataset and write the bundle
    Train {
        /// Artifact directory (defaults to ./model)
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Seed for the train/test split and calibration folds
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Fraction of samples held out for evaluation
        #[arg(long, default_value_t = 0.2)]
        test_size: f64,

        /// SVM regularization parameter
        #[arg(long, default_value_t = 1.0)]
        c: f64,
    },

    /// List the feature schema of a trained bundle
    Features {
        /// Artifact directory (defaults to ./model)
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },

    /// Request a prediction from the server
    Predict {
        /// Comma separated feature values in schema order
        #[arg(
            long,
            allow_hyphen_values = true,
            conflicts_with = "file",
            required_unless_present = "file"
        )]
        values: Option<String>,

        /// JSON file with a value list, a name map or a full request body
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Check the server's health endpoint
    Health,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::Config::load()?;
    let format = config.format(cli.format);
    debug!(?config, "Loaded CLI configuration");

    // Execute command
    match cli.command {
        Commands::Train {
            model_dir,
            seed,
            test_size,
            c,
        } => {
            let args = training::TrainArgs { seed, test_size, c };
            training::train(config.model_dir(model_dir), args, format)?;
        }
        Commands::Features { model_dir } => {
            training::features(config.model_dir(model_dir), format)?;
        }
        Commands::Predict { values, file } => {
            let features = match (values, file) {
                (Some(values), _) => service::parse_values(&values)?.into(),
                (None, Some(file)) => service::read_features(&file)?,
                (None, None) => anyhow::bail!("Either --values or --file is required"),
            };
            let client = client::ApiClient::new(&config.api_url(cli.api_url.as_deref()))?;
            service::predict(&client, features, format).await?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&config.api_url(cli.api_url.as_deref()))?;
            service::health(&client, format).await?;
        }
    }

    Ok(())
}
