use clap::Parser;
use kvs_jobs::{run_batch, run_interactive};
use std::path::PathBuf;
use std::process::exit;
use tracing::{error, Level};

/// A concurrent in-memory key-value store driven by a job command
/// language.
///
/// With no arguments, runs an interactive session reading commands
/// from stdin. With a directory, scans it for `.job` files and runs
/// each one's command script to completion in batch mode.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Directory to scan for `.job` files. Omit for interactive mode.
    directory: Option<PathBuf>,

    /// Maximum number of snapshots that may be materializing at once
    /// per job. Required alongside `directory`.
    #[clap(allow_hyphen_values = true)]
    max_backups: Option<String>,

    /// Number of worker threads to process job files with. Defaults
    /// to 1 if omitted in batch mode.
    #[clap(allow_hyphen_values = true)]
    max_threads: Option<String>,

    /// Increase log verbosity; may be repeated.
    #[clap(short, long, parse(from_occurrences))]
    verbose: u8,
}

enum Mode {
    Interactive,
    Batch {
        directory: PathBuf,
        max_backups: usize,
        max_threads: usize,
    },
}

const USAGE: &str = "usage: kvs-jobs [<dir> <max_backups> [<max_threads>]]";

impl Args {
    fn into_mode(self) -> Result<Mode, String> {
        match (self.directory, self.max_backups, self.max_threads) {
            (None, None, None) => Ok(Mode::Interactive),
            (Some(directory), Some(max_backups), max_threads) => {
                let max_backups = positive(&max_backups, "max_backups")?;
                let max_threads = match max_threads {
                    Some(t) => positive(&t, "max_threads")?,
                    None => 1,
                };
                Ok(Mode::Batch {
                    directory,
                    max_backups,
                    max_threads,
                })
            }
            _ => Err(USAGE.to_owned()),
        }
    }
}

/// Parses `value` as a positive integer, producing a usage diagnostic
/// (never a panic or a clap-level exit) on anything else: non-numeric
/// text, a dash-leading value, zero, or a negative number.
fn positive(value: &str, name: &str) -> Result<usize, String> {
    match value.parse::<i64>() {
        Ok(n) if n > 0 => Ok(n as usize),
        Ok(n) => Err(format!("{} must be a positive integer, got {}", name, n)),
        Err(_) => Err(format!(
            "{} must be a positive integer, got {:?}\n{}",
            name, value, USAGE
        )),
    }
}

fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let mode = match args.into_mode() {
        Ok(mode) => mode,
        Err(message) => {
            eprintln!("{}", message);
            exit(1);
        }
    };

    let outcome = match mode {
        Mode::Interactive => run_interactive(std::io::stdin(), std::io::stdout(), 1),
        Mode::Batch {
            directory,
            max_backups,
            max_threads,
        } => run_batch(&directory, max_backups, max_threads),
    };

    if let Err(err) = outcome {
        error!(%err, "failed to process job directory");
        exit(1);
    }
}
