use cet_advisor::Result;
use cet_advisor::commands::{run_ask, run_drill_down, run_search, show_status};
use cet_advisor::config::{run_interactive_config, show_config};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cet-advisor")]
#[command(about = "Retrieval-augmented admission counseling for KCET/COMEDK aspirants")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding server and answer generation settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Search colleges semantically, with optional numeric filters
    Search {
        /// Natural-language query, e.g. "best CSE colleges under 6000 rank"
        query: String,
        /// Number of results to return
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        /// Keep only colleges with a cutoff rank at or below this value
        #[arg(long)]
        max_rank: Option<f64>,
        /// Keep only colleges with an average package at or above this value (LPA)
        #[arg(long)]
        min_package: Option<f64>,
    },
    /// Show per-branch cutoff and package tables for one college
    DrillDown {
        /// College name exactly as it appears in the dataset
        college: String,
    },
    /// Ask a question answered from retrieved college records
    Ask {
        /// Natural-language question
        query: String,
        /// Number of records to retrieve as context
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        /// Keep only colleges with a cutoff rank at or below this value
        #[arg(long)]
        max_rank: Option<f64>,
        /// Keep only colleges with an average package at or above this value (LPA)
        #[arg(long)]
        min_package: Option<f64>,
    },
    /// Show dataset and pipeline health
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Search {
            query,
            top_k,
            max_rank,
            min_package,
        } => {
            run_search(&query, top_k, max_rank, min_package)?;
        }
        Commands::DrillDown { college } => {
            run_drill_down(&college)?;
        }
        Commands::Ask {
            query,
            top_k,
            max_rank,
            min_package,
        } => {
            run_ask(&query, top_k, max_rank, min_package)?;
        }
        Commands::Status => {
            show_status()?;
        }
    }

    Ok(())
}
