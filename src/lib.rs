#![deny(missing_docs)]

//! A small in-memory key-value store driven by a command language,
//! with an interactive REPL mode and a batch mode that processes a
//! directory of `.job` files in parallel.

mod constants;
mod error;
mod interpreter;
mod job;
mod lexer;
mod pool;
mod snapshot;
pub mod store;
pub mod thread_pool;
mod walker;

#[macro_use]
extern crate failure;

pub use constants::{MAX_JOB_FILE_NAME_SIZE, MAX_STRING_SIZE, MAX_WRITE_SIZE, TABLE_SIZE};
pub use error::{KvsError, KvsErrorKind};
pub use job::run as run_job;
pub use pool::run_batch;
pub use snapshot::SnapshotManager;
pub use store::Store;

/// Result type used throughout this crate.
pub type Result<T> = core::result::Result<T, KvsError>;

use std::io::{self, BufReader, Write};
use std::sync::Arc;

/// Runs the interactive REPL: reads commands from `input`, writes
/// results to `output`, and prompts `"> "` before each read. Returns
/// once the input stream is exhausted.
pub fn run_interactive<R: io::Read, W: Write>(
    input: R,
    mut output: W,
    max_backups: usize,
) -> Result<()> {
    let store = Arc::new(Store::new());
    let snapshots = Arc::new(SnapshotManager::new("interactive", max_backups));
    let mut reader = BufReader::new(input);

    interpreter::run(&mut reader, &mut output, "interactive", &store, &snapshots, true)?;
    snapshots.join_all()?;
    Ok(())
}
