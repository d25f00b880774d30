use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rusty_dashboard::config::AppConfig;
use rusty_dashboard::data::loader::{generate_and_persist, DatasetKind};
use rusty_dashboard::store::TabularStore;

/// Write the synthetic sales, practice and student datasets into their
/// SQLite files, replacing whatever tables are there.
#[derive(Parser, Debug)]
#[command(version, about = "Seed the dashboard's SQLite files")]
struct Args {
    #[arg(long = "config")]
    config: Option<PathBuf>,

    #[arg(long = "data-dir")]
    data_dir: Option<PathBuf>,

    #[arg(long = "seed")]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_overrides(args.data_dir, args.seed);
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating {}", config.data_dir.display()))?;

    for kind in DatasetKind::ALL {
        let path = config.store_path(kind);
        let mut store = TabularStore::open(&path).with_context(|| format!("opening {}", path.display()))?;
        let dataset = generate_and_persist(&mut store, kind, config.seed)?;
        store.close()?;
        println!("Wrote {} {kind} rows to {}", dataset.len(), path.display());
    }
    Ok(())
}
