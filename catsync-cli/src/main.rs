//! catsync: mirror the anime catalog and its Chinese titles
//!
//! Usage:
//!   catsync update anime --mode incremental
//!   catsync wikidata
//!   catsync changeset --export new.tsv --mirror old.tsv --output changes.tsv
//!
//! Upstream requests honor `PROXY_PREFIX` and `PROXY_HEADERS`.

use anyhow::Result;
use catsync_cli::{Dirs, UpdateOptions};
use catsync_sync::{CatalogConfig, SourceSettings, SyncMode, TripleStoreConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "catsync")]
#[command(about = "Catalog sync, title reconciliation and changesets")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct DirArgs {
    /// Directory holding the snapshots
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory receiving the TSV exports
    #[arg(long, default_value = "export")]
    export_dir: PathBuf,
}

impl From<DirArgs> for Dirs {
    fn from(args: DirArgs) -> Self {
        Dirs {
            data_dir: args.data_dir,
            export_dir: args.export_dir,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync one entity type (anime, manga, staff, characters)
    Update {
        entity: String,

        /// full or incremental
        #[arg(long, default_value = "incremental")]
        mode: SyncMode,

        /// Pages to skip before the first request
        #[arg(long, default_value_t = 0)]
        page_offset: u32,

        /// Give up paging after this many seconds
        #[arg(long)]
        budget_secs: Option<u64>,

        /// Catalog endpoint
        #[arg(long)]
        endpoint: Option<String>,

        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Merge Chinese titles from the triple store
    Wikidata {
        /// SPARQL endpoint
        #[arg(long)]
        endpoint: Option<String>,

        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Re-render an export from the stored snapshot
    Export {
        entity: String,

        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Diff a fresh export against a downstream mirror
    Changeset {
        #[arg(long)]
        export: PathBuf,

        #[arg(long)]
        mirror: PathBuf,

        #[arg(long)]
        output: PathBuf,

        #[arg(long, default_value = "ID")]
        id_column: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Command::Update {
            entity,
            mode,
            page_offset,
            budget_secs,
            endpoint,
            dirs,
        } => {
            let mut catalog = CatalogConfig::default();
            if let Some(endpoint) = endpoint {
                catalog.endpoint = endpoint;
            }
            let options = UpdateOptions {
                entity,
                mode,
                page_offset,
                budget: budget_secs.map(Duration::from_secs),
                catalog,
            };
            catsync_cli::update(&dirs.into(), &options, SourceSettings::from_env()).await?;
        }
        Command::Wikidata { endpoint, dirs } => {
            let mut config = TripleStoreConfig::default();
            if let Some(endpoint) = endpoint {
                config.endpoint = endpoint;
            }
            catsync_cli::wikidata(&dirs.into(), config).await?;
        }
        Command::Export { entity, dirs } => {
            let path = catsync_cli::export(&dirs.into(), &entity)?;
            info!("Wrote {}", path.display());
        }
        Command::Changeset {
            export,
            mirror,
            output,
            id_column,
        } => {
            catsync_cli::changeset(&export, &mirror, &output, &id_column)?;
        }
    }

    Ok(())
}
