mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use shortlist::config::{PresentationStyle, ShortlistConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shortlist", version, about = "Semantic catalog recommender")]
struct Cli {
    /// Config file (defaults to ~/.shortlist/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API
    Serve,
    /// Recommend catalog entries for a query
    Recommend {
        query: String,
        /// Number of results (defaults to retrieval.default_top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Output layout (defaults to presentation.style)
        #[arg(long, value_enum)]
        style: Option<PresentationStyle>,
        /// Print the raw JSON response instead
        #[arg(long)]
        json: bool,
    },
    /// Run every query in a CSV file and write the matches to another CSV
    Batch {
        input: PathBuf,
        #[arg(short, long, default_value = "data/submission.csv")]
        output: PathBuf,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Embed the catalog CSV and write the embeddings and metadata files
    Build {
        /// Catalog CSV (defaults to catalog.csv_path)
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Check the catalog files and embedding model
    Doctor,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.shortlist/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ShortlistConfig::load_from(path)?,
        None => ShortlistConfig::load()?,
    };

    // Logs go to stderr so `recommend --json` and `batch` output stay clean.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => shortlist::server::serve(config).await?,
        Command::Recommend {
            query,
            top_k,
            style,
            json,
        } => cli::recommend::recommend(&config, &query, top_k, style, json).await?,
        Command::Batch {
            input,
            output,
            top_k,
        } => cli::batch::batch(&config, &input, &output, top_k).await?,
        Command::Build { csv } => cli::build::build(&config, csv.as_deref()).await?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
