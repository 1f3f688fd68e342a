//! `lsmvec` command line interface
//!
//! Inspects, analyzes and queries the vector indexes named in a JSON config.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lsmvec::{logging, Config, Database};
use lsmvec_vector::{Metric, SearchMode, SearchParams};

/// lsmvec command line interface
#[derive(Parser, Debug)]
#[command(name = "lsmvec")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the JSON engine configuration
    #[arg(short, long, env = "LSMVEC_CONFIG", default_value = "lsmvec.json", global = true)]
    config: PathBuf,

    /// Log filter directives, e.g. `lsmvec=debug`
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print diagnostics of every configured index as JSON
    Info,

    /// Scan every index to refresh list statistics, then print diagnostics
    Analyze {
        /// Stop after this many rows per index (0 scans everything)
        #[arg(long, default_value_t = 0)]
        max_rows: u64,
    },

    /// Search one index for the nearest neighbours of a vector
    Search {
        /// Name of the index
        #[arg(short, long)]
        index: String,

        /// Query vector, comma separated
        #[arg(short, long, required = true, value_delimiter = ',', allow_hyphen_values = true)]
        vector: Vec<f32>,

        /// Number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Inverted lists to probe
        #[arg(long, default_value_t = 1)]
        nprobe: usize,

        /// Distance metric: l2 or ip
        #[arg(long, default_value = "l2")]
        metric: Metric,
    },
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log.as_deref())?;

    let config = Config::from_json_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let db = Database::open(config)?;

    match cli.command {
        Commands::Info => {
            println!("{}", serde_json::to_string_pretty(&db.registry().dump_info())?);
        }
        Commands::Analyze { max_rows } => {
            let info = db.analyze_all(max_rows, None)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Search { index, vector, limit, nprobe, metric } => {
            let params =
                SearchParams::new(vector, limit).with_nprobe(nprobe).with_metric(metric);
            let rows = db.search(&index, SearchMode::KnnFirst, params)?;
            for row in rows {
                match row.distance {
                    Some(distance) => println!("{}\t{distance}", hex(&row.key)),
                    None => println!("{}", hex(&row.key)),
                }
            }
        }
    }

    Ok(())
}
