use super::ThreadPool;
use crate::error::KvsErrorKind;
use crate::Result;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{error, trace};

trait FnBox {
    fn call_from_box(self: Box<Self>) -> Result<()>;
}

impl<F: FnOnce()> FnBox for F {
    fn call_from_box(self: Box<Self>) -> Result<()> {
        catch_unwind(AssertUnwindSafe(*self)).map_err(|_| KvsErrorKind::ThreadPanic.into())
    }
}

type Task = Box<dyn FnBox + Send + 'static>;

enum Message {
    NewTask(Task),
    Terminate,
}

struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Message>>>) -> Self {
        let handle = thread::spawn(move || loop {
            let message = receiver.lock().unwrap().recv().unwrap();
            match message {
                Message::NewTask(task) => {
                    if let Err(err) = task.call_from_box() {
                        error!(worker = id, %err, "task panicked");
                    }
                }
                Message::Terminate => break,
            }
        });

        Self {
            id,
            handle: Some(handle),
        }
    }
}

/// A fixed-size pool backed by an `mpsc` channel shared by all workers.
///
/// # Note
///
/// Dropping a `SharedQueueThreadPool` sends a terminate message to
/// every worker and joins them; a task that never returns (e.g. a job
/// that hangs on `WAIT` forever) will therefore hang the drop too.
pub struct SharedQueueThreadPool {
    num_threads: usize,
    workers: Vec<Worker>,
    sender: mpsc::Sender<Message>,
}

impl ThreadPool for SharedQueueThreadPool {
    fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(KvsErrorKind::ConfigError("thread pool capacity must be positive".into()).into());
        }

        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(capacity);
        for id in 0..capacity {
            workers.push(Worker::new(id, Arc::clone(&receiver)));
        }

        Ok(Self {
            num_threads: capacity,
            workers,
            sender,
        })
    }

    fn spawn<F: FnOnce() + Send + 'static>(&self, task: F) {
        self.sender.send(Message::NewTask(Box::new(task))).unwrap();
    }
}

impl Drop for SharedQueueThreadPool {
    fn drop(&mut self) {
        for _ in 0..self.num_threads {
            let _ = self.sender.send(Message::Terminate);
        }
        for worker in &mut self.workers {
            trace!("dropping worker {}", worker.id);
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_every_task() {
        let pool = SharedQueueThreadPool::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            pool.spawn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(pool);
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(SharedQueueThreadPool::new(0).is_err());
    }

    #[test]
    fn a_panicking_task_does_not_poison_the_pool() {
        let pool = SharedQueueThreadPool::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        pool.spawn(|| panic!("boom"));
        let counter2 = Arc::clone(&counter);
        pool.spawn(move || {
            counter2.fetch_add(1, Ordering::SeqCst);
        });
        drop(pool);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
