use std::sync::mpsc::{self, Receiver, TryRecvError};

use rayon::{ThreadPool, ThreadPoolBuilder};

pub use rayon::ThreadPoolBuildError;
use thiserror::Error;
use tracing::{error, warn};

/// Background worker pool. Long jobs (world generation) run here while the
/// tick loop keeps going.
pub struct JobSystem {
    pool: ThreadPool,
}

impl JobSystem {
    pub fn new(num_threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        // Without a handler rayon aborts the process when a spawned job panics.
        let mut builder = ThreadPoolBuilder::new()
            .thread_name(|i| format!("strandhold-job-{i}"))
            .panic_handler(|_| error!("Background job panicked"));
        if let Some(count) = num_threads {
            builder = builder.num_threads(count);
        }

        let pool = builder.build()?;
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `task` on the pool. Its result is handed over in one piece through
    /// the returned handle, so callers never observe partial output.
    pub fn spawn_task<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        self.pool.spawn(move || {
            if tx.send(task()).is_err() {
                warn!("Task finished after its handle was dropped");
            }
        });
        TaskHandle {
            rx,
            state: TaskState::Pending,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("background task ended without producing a result")]
pub struct TaskLost;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TaskState {
    Pending,
    Taken,
    Lost,
}

pub struct TaskHandle<T> {
    rx: Receiver<T>,
    state: TaskState,
}

impl<T> TaskHandle<T> {
    /// Non-blocking. Yields the result exactly once.
    pub fn poll(&mut self) -> Option<T> {
        if self.state != TaskState::Pending {
            return None;
        }
        match self.rx.try_recv() {
            Ok(value) => {
                self.state = TaskState::Taken;
                Some(value)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.state = TaskState::Lost;
                None
            }
        }
    }

    /// True once the task is known to have died without a result.
    pub fn is_lost(&self) -> bool {
        self.state == TaskState::Lost
    }

    pub fn wait(self) -> Result<T, TaskLost> {
        if self.state != TaskState::Pending {
            return Err(TaskLost);
        }
        self.rx.recv().map_err(|_| TaskLost)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    use super::{JobSystem, TaskLost};

    #[test]
    fn spawn_task_publishes_whole_result() {
        let jobs = JobSystem::new(Some(2)).expect("build pool");
        let handle = jobs.spawn_task(|| (0..1_000u32).collect::<Vec<_>>());
        let values = handle.wait().expect("task result");
        assert_eq!(values.len(), 1_000);
        assert_eq!(values[999], 999);
    }

    #[test]
    fn poll_is_pending_until_the_task_finishes() {
        let jobs = JobSystem::new(Some(1)).expect("build pool");
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let mut handle = jobs.spawn_task(move || {
            release_rx.recv().expect("release signal");
            7u8
        });

        assert_eq!(handle.poll(), None);
        release_tx.send(()).expect("release task");

        let deadline = Instant::now() + Duration::from_secs(5);
        let value = loop {
            if let Some(value) = handle.poll() {
                break value;
            }
            assert!(Instant::now() < deadline, "task never completed");
            std::thread::sleep(Duration::from_millis(1));
        };
        assert_eq!(value, 7);
        assert_eq!(handle.poll(), None);
        assert!(!handle.is_lost());
    }

    #[test]
    fn panicking_task_is_reported_lost() {
        let jobs = JobSystem::new(Some(1)).expect("build pool");
        let handle = jobs.spawn_task(|| -> u32 { panic!("generation failed") });
        assert_eq!(handle.wait(), Err(TaskLost));
    }
}
