use std::{path::PathBuf, time::Duration};

use clap::Parser;
use simpledb::{DbConfig, SimpleDb};

/// Boots a simpledb database directory: creates it if missing, recovers it if not,
/// bootstraps the catalog, and exits. No SQL REPL or network listener — the query,
/// parser, planner, and network layers are out of scope for this crate.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding (or to hold) the database's files.
    db_dir: PathBuf,

    /// Block size in bytes.
    #[arg(long, default_value_t = 400)]
    block_size: usize,

    /// Number of buffers in the buffer pool.
    #[arg(long, default_value_t = 8)]
    buffers: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = DbConfig {
        block_size: args.block_size,
        num_buffers: args.buffers,
        lock_timeout: Duration::from_secs(10),
        buffer_timeout: Duration::from_secs(10),
    };

    let db_dir = args
        .db_dir
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("database directory path is not valid UTF-8"))?;

    let db = SimpleDb::new(db_dir, config)?;
    let mut tx = db.new_tx()?;
    tx.commit()?;

    println!("simpledb ready: {}", args.db_dir.display());
    Ok(())
}
