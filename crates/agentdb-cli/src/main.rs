#![allow(clippy::doc_markdown)]
//! `AgentDB` CLI - operate on a database directory
//!
//! Usage:
//!   `agentdb import ./vectors.jsonl`
//!   `agentdb build --naive`
//!   `agentdb search --vector "0.1,0.2,0.3" -k 5`
//!   `agentdb compact`

mod import;

use agentdb_core::{AgentDb, AgentDbConfig, FileGraphStore, LogVectorStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "agentdb")]
#[command(author, version, about = "AgentDB CLI - embedded vector database")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "AGENTDB_CONFIG", default_value = "agentdb.toml")]
    config: PathBuf,

    /// Database directory (overrides `storage.data_dir`)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Vector dimension (read from the database when omitted)
    #[arg(long)]
    dimension: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import vectors from a JSONL file of `{id, vector, metadata?}` lines
    Import {
        /// Path to the JSONL file
        file: PathBuf,

        /// Records per batch
        #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
        batch_size: u64,
    },

    /// Rebuild the HNSW index from the stored vectors
    Build {
        /// Write the graph row by row instead of one bulk commit
        #[arg(long)]
        naive: bool,
    },

    /// Search for the nearest vectors
    Search {
        /// Query vector as comma-separated floats
        #[arg(long)]
        vector: String,

        /// Number of results
        #[arg(short, default_value = "10")]
        k: usize,
    },

    /// Delete a vector by id
    Delete {
        /// Vector id
        id: String,
    },

    /// Show database statistics
    Stats,

    /// Rewrite the vector log and graph WAL down to their live contents
    Compact,

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AgentDbConfig::load_from_path(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.to_string_lossy().into_owned();
    }
    config.validate()?;
    init_tracing(&config);

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
        Commands::Import { file, batch_size } => {
            let dimension = match cli.dimension {
                Some(d) => d,
                None => match stored_dimension(&config)? {
                    Some(d) => d,
                    None => import::detect_dimension(&file)?,
                },
            };
            let db = AgentDb::open(dimension, config)?;
            let batch_size = usize::try_from(batch_size).context("batch size too large")?;
            let stats = import::import_jsonl(&db, &file, batch_size)?;

            println!("Imported:   {}", stats.imported);
            if stats.skipped > 0 {
                println!("Skipped:    {}", stats.skipped);
            }
            println!("Duration:   {} ms", stats.duration_ms);
            println!("Index:      {}", if db.is_index_ready() { "ready" } else { "not built" });
        }
        Commands::Build { naive } => {
            let db = open(cli.dimension, config)?;
            let started = Instant::now();
            if naive {
                db.rebuild_naive()?;
            } else {
                db.rebuild()?;
            }
            let stats = db.stats();
            println!(
                "Built index over {} vectors ({} edges, max level {}) in {} ms",
                stats.index.node_count,
                stats.index.edge_count,
                stats.index.max_level,
                started.elapsed().as_millis()
            );
        }
        Commands::Search { vector, k } => {
            let query = parse_vector(&vector)?;
            let dimension = match cli.dimension {
                Some(d) => d,
                None => stored_dimension(&config)?.unwrap_or(query.len()),
            };
            let db = AgentDb::open(dimension, config)?;
            let outcome = db.search(&query, k)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Delete { id } => {
            let db = open(cli.dimension, config)?;
            delete(&db, &id)?;
            println!("Deleted {id}");
        }
        Commands::Stats => {
            let db = open(cli.dimension, config)?;
            println!("{}", serde_json::to_string_pretty(&db.stats())?);
        }
        Commands::Compact => {
            let db = open(cli.dimension, config)?;
            db.compact()?;
            println!("Compacted {} vectors", db.count());
        }
    }

    Ok(())
}

fn init_tracing(config: &AgentDbConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn stored_dimension(config: &AgentDbConfig) -> Result<Option<usize>> {
    let dir = Path::new(&config.storage.data_dir).join("vectors");
    Ok(LogVectorStore::stored_dimension(dir)?)
}

fn open(
    dimension: Option<usize>,
    config: AgentDbConfig,
) -> Result<AgentDb<LogVectorStore, FileGraphStore>> {
    let dimension = match dimension {
        Some(d) => d,
        None => stored_dimension(&config)?.with_context(|| {
            format!(
                "No database at {}; import vectors first or pass --dimension",
                config.storage.data_dir
            )
        })?,
    };
    Ok(AgentDb::open(dimension, config)?)
}

fn delete(db: &AgentDb<LogVectorStore, FileGraphStore>, id: &str) -> Result<()> {
    if db.delete(id)? {
        Ok(())
    } else {
        Err(agentdb_core::Error::VectorNotFound(id.to_string()).into())
    }
}

fn parse_vector(raw: &str) -> Result<Vec<f32>> {
    raw.split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .with_context(|| format!("Invalid vector component '{v}'"))
        })
        .collect()
}
