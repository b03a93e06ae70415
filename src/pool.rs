//! Dispatches job files across a bounded pool of worker threads.

use crate::store::Store;
use crate::thread_pool::{SharedQueueThreadPool, ThreadPool};
use crate::{job, walker, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::error;

/// Enumerates `.job` files under `dir_path` and runs each one through
/// [`job::run`], bounding concurrency to `max_threads` in-flight jobs
/// at a time. Returns once every job has completed; a per-job failure
/// is diagnosed and does not stop the rest of the batch.
pub fn run_batch(dir_path: &Path, max_backups: usize, max_threads: usize) -> Result<()> {
    let files = walker::list_job_files(dir_path)?;
    walker::ensure_nonempty(&files, dir_path)?;

    let store = Arc::new(Store::new());
    let pool = SharedQueueThreadPool::new(max_threads)?;

    for job_path in files {
        let store = Arc::clone(&store);
        pool.spawn(move || {
            if let Err(err) = job::run(&job_path, &store, max_backups) {
                error!(job = %job_path.display(), %err, "job failed");
            }
        });
    }

    // dropping the pool blocks until every queued job has run to
    // completion; see `SharedQueueThreadPool`'s drop semantics
    drop(pool);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn runs_every_job_in_the_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.job"), "WRITE [(k,1)]\nREAD [k]\n").unwrap();
        std::fs::write(temp.path().join("b.job"), "WRITE [(k,1)]\nREAD [k]\n").unwrap();

        run_batch(temp.path(), 1, 2).unwrap();

        let out_a = std::fs::read_to_string(temp.path().join("a.out")).unwrap();
        let out_b = std::fs::read_to_string(temp.path().join("b.out")).unwrap();
        assert_eq!(out_a, "[(k,1)]\n");
        assert_eq!(out_b, "[(k,1)]\n");
    }

    #[test]
    fn empty_directory_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(run_batch(temp.path(), 1, 1).is_err());
    }
}
