//! ordkv CLI
//!
//! Command-line interface for inspecting and editing an ordkv database.
//! Keys and values are taken as UTF-8 strings; output is printed lossily.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ordkv::{Config, Database, Direction, WalSyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// ordkv CLI
#[derive(Parser, Debug)]
#[command(name = "ordkv")]
#[command(about = "Embedded ordered key-value store")]
#[command(version)]
struct Args {
    /// Database directory
    #[arg(short, long, default_value = "./ordkv_data")]
    path: String,

    /// Create the directory if it does not exist
    #[arg(long)]
    create: bool,

    /// Leave the open-file limit untouched
    #[arg(long)]
    skip_rlimit: bool,

    /// fsync the WAL after every write
    #[arg(long)]
    sync: bool,

    /// MemTable size limit in MB before flush
    #[arg(short = 'm', long, default_value = "4")]
    memtable_mb: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Delete {
        /// The key to delete
        key: String,
    },

    /// List entries in key order
    Scan {
        /// Start at this key instead of the first (or last) one
        #[arg(long)]
        from: Option<String>,

        /// Walk from high keys to low keys
        #[arg(long)]
        reverse: bool,

        /// Stop after this many entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Write the memtable out to disk
    Flush,

    /// Merge all SSTables into one
    Compact,

    /// Show engine counters
    Stats,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ordkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if !args.skip_rlimit {
        match ordkv::raise_fd_limit() {
            Ok(Some(limit)) => tracing::debug!(soft = limit.soft, hard = limit.hard, "Open-file limit"),
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not raise open-file limit: {}", e),
        }
    }

    let sync = if args.sync {
        WalSyncStrategy::EveryWrite
    } else {
        Config::default().wal_sync_strategy
    };
    let config = Config::builder()
        .data_dir(&args.path)
        .create_if_missing(args.create)
        .wal_sync_strategy(sync)
        .memtable_size_limit(args.memtable_mb * 1024 * 1024)
        .build();

    let db = match Database::open_with_config(config) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = run(&db, args.command).and_then(|_| db.close());
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(db: &Database, command: Commands) -> ordkv::Result<()> {
    match command {
        Commands::Get { key } => match db.get(&key)? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },

        Commands::Put { key, value } => {
            db.put(&key, &value)?;
            println!("OK");
        }

        Commands::Delete { key } => {
            db.delete(&key)?;
            println!("OK");
        }

        Commands::Scan {
            from,
            reverse,
            limit,
        } => {
            let direction = if reverse {
                Direction::Reverse
            } else {
                Direction::Forward
            };
            let cursor = match from {
                Some(key) => db.iterate_from(&key, direction)?,
                None => db.iterator(direction)?,
            };
            for entry in cursor.take(limit.unwrap_or(usize::MAX)) {
                let (key, value) = entry?;
                println!(
                    "{}\t{}",
                    String::from_utf8_lossy(&key),
                    String::from_utf8_lossy(&value)
                );
            }
        }

        Commands::Flush => {
            db.flush()?;
            println!("OK");
        }

        Commands::Compact => match db.compact()? {
            Some(stats) => println!(
                "merged {} tables: {} live, {} dropped",
                stats.input_tables, stats.output_entries, stats.dropped_entries
            ),
            None => println!("nothing to compact"),
        },

        Commands::Stats => {
            let stats = db.stats()?;
            println!("path:             {}", db.path().display());
            println!("memtable entries: {}", stats.memtable_entries);
            println!("memtable bytes:   {}", stats.memtable_bytes);
            println!("sstables:         {}", stats.sstable_count);
            println!("sstable bytes:    {}", stats.sstable_bytes);
            println!("next lsn:         {}", stats.next_lsn);
        }
    }
    Ok(())
}
