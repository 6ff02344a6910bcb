//! Per-group sequential background workers.
//!
//! Tasks are grouped by source-map identity: tasks within one group run
//! FIFO on a single dedicated worker thread, so one map implementation is
//! never touched from two threads at once, while different maps load in
//! parallel on their own workers.

use crossbeam_channel::{unbounded, Sender};
use fxhash::FxHashMap;
use once_cell::sync::Lazy;
use std::sync::Mutex;
use std::thread::JoinHandle;

/// A unit of background work, typically one tile region read.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Identifies a serialization group; the pipeline uses the map identity.
pub type GroupId = usize;

struct Worker {
    tx: Sender<Job>,
    handle: JoinHandle<()>,
}

/// Owns one worker thread per group, spun up lazily on the first job
/// submitted for that group.
pub struct TaskRunner {
    workers: Mutex<FxHashMap<GroupId, Worker>>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self {
            workers: Mutex::new(FxHashMap::default()),
        }
    }

    /// Enqueues a job on its group's worker, spawning the worker if the
    /// group has never been seen. Jobs within a group execute strictly in
    /// submission order.
    pub fn submit(&self, group: GroupId, job: Job) {
        let mut workers = match self.workers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let worker = workers.entry(group).or_insert_with(|| spawn_worker(group));
        if worker.tx.send(job).is_err() {
            // The worker died (a job panicked); replace it so the group
            // keeps making progress.
            log::warn!("respawning worker for group {:#x}", group);
            *worker = spawn_worker(group);
        }
    }

    /// Number of live worker threads.
    pub fn worker_count(&self) -> usize {
        match self.workers.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Drops all queues and joins every worker after it drains its
    /// remaining jobs.
    pub fn shutdown(&self) {
        let workers = {
            let mut guard = match self.workers.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::take(&mut *guard)
        };
        for (group, worker) in workers {
            drop(worker.tx);
            if worker.handle.join().is_err() {
                log::warn!("worker for group {:#x} panicked during shutdown", group);
            }
        }
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_worker(group: GroupId) -> Worker {
    let (tx, rx) = unbounded::<Job>();
    let handle = std::thread::Builder::new()
        .name(format!("tile-worker-{:x}", group))
        .spawn(move || {
            for job in rx.iter() {
                job();
            }
        })
        .expect("failed to spawn background worker thread");
    Worker { tx, handle }
}

/// The process-wide runner shared by all async pixel promises.
pub fn global_runner() -> std::sync::Arc<TaskRunner> {
    static RUNNER: Lazy<std::sync::Arc<TaskRunner>> =
        Lazy::new(|| std::sync::Arc::new(TaskRunner::new()));
    RUNNER.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_jobs_within_group_run_fifo() {
        let runner = TaskRunner::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..32 {
            let log = log.clone();
            runner.submit(
                1,
                Box::new(move || {
                    log.lock().unwrap().push(i);
                }),
            );
        }
        runner.shutdown();
        assert_eq!(*log.lock().unwrap(), (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn test_groups_run_on_distinct_workers() {
        let runner = TaskRunner::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for group in 0..4 {
            let counter = counter.clone();
            runner.submit(
                group,
                Box::new(move || {
                    // Hold the worker long enough that serial execution of
                    // all four jobs would overshoot the deadline below.
                    std::thread::sleep(Duration::from_millis(50));
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }
        assert_eq!(runner.worker_count(), 4);
        let start = std::time::Instant::now();
        runner.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert!(start.elapsed() < Duration::from_millis(180));
    }

    #[test]
    fn test_lazy_worker_spawn() {
        let runner = TaskRunner::new();
        assert_eq!(runner.worker_count(), 0);
        runner.submit(7, Box::new(|| {}));
        assert_eq!(runner.worker_count(), 1);
        runner.submit(7, Box::new(|| {}));
        assert_eq!(runner.worker_count(), 1);
        runner.shutdown();
    }
}
