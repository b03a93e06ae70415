//! The worker pool that bounds how many job files run concurrently.
//!
//! This generalizes the shared-queue thread pool this crate family
//! already builds for its TCP servers (one worker per pending
//! connection) to a different kind of task: one worker per pending
//! `.job` file. The bounded-concurrency contract is identical either
//! way, so the pool itself doesn't need to know it's running jobs
//! instead of handling connections.

mod shared_queue;

pub use shared_queue::SharedQueueThreadPool;

use crate::Result;

/// A pool of worker threads capable of running arbitrary `FnOnce` tasks.
pub trait ThreadPool: Sized {
    /// Creates a pool with `capacity` worker threads. `capacity` must
    /// be positive.
    fn new(capacity: usize) -> Result<Self>;

    /// Runs `task` on one of the pool's worker threads. Queues if all
    /// workers are currently busy.
    fn spawn<F: FnOnce() + Send + 'static>(&self, task: F);
}
