//! EmberKV CLI
//!
//! Offline inspection and maintenance of EmberKV log files.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use emberkv::expiry::now_millis;
use emberkv::index::Pattern;
use emberkv::items::ItemStore;
use emberkv::log::LogRecovery;
use emberkv::{CompactionPolicy, Config, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// EmberKV CLI
#[derive(Parser, Debug)]
#[command(name = "emberkv-cli")]
#[command(about = "Inspect and maintain EmberKV log files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check every record of a log without changing it
    Verify {
        /// Log file
        log: PathBuf,
    },

    /// Print the live items of a log
    Dump {
        /// Log file
        log: PathBuf,

        /// Only keys matching this glob
        #[arg(short, long, default_value = "*")]
        pattern: String,
    },

    /// Rewrite a log as a single snapshot
    Compact {
        /// Log file
        log: PathBuf,
    },

    /// Write a snapshot of a log's state to another file
    Save {
        /// Log file
        log: PathBuf,

        /// Snapshot destination
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> emberkv::Result<()> {
    match command {
        Commands::Verify { log } => {
            let result = LogRecovery::verify(&log)?;
            println!("records:   {}", result.entries_recovered);
            println!("snapshots: {}", result.snapshots);
            println!("last lsn:  {}", result.last_lsn);
            println!("valid:     {} bytes", result.valid_len);
            if result.was_truncated {
                println!("torn tail: yes (dropped on next open)");
            }
            Ok(())
        }

        Commands::Dump { log, pattern } => {
            let pattern = Pattern::new(&pattern)?;
            let mut items = ItemStore::new();
            LogRecovery::replay(BufReader::new(File::open(&log)?), &mut items, now_millis())?;

            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            for (key, item) in items.ascend_keys(&pattern) {
                writeln!(out, "{}\t{}", key, String::from_utf8_lossy(&item.value))?;
            }
            out.flush()?;
            Ok(())
        }

        Commands::Compact { log } => {
            let store = open(log)?;
            let before = store.log_size();
            store.compact()?;
            println!("{} -> {} bytes", before, store.log_size());
            store.close()
        }

        Commands::Save { log, out } => {
            let store = open(log)?;
            store.save(BufWriter::new(File::create(&out)?))?;
            println!("saved to {}", out.display());
            store.close()
        }
    }
}

/// Open for maintenance; automatic compaction stays off
fn open(log: PathBuf) -> emberkv::Result<Store> {
    let compaction = CompactionPolicy {
        disabled: true,
        ..CompactionPolicy::default()
    };
    Store::open(Config::builder().path(log).compaction(compaction).build())
}
