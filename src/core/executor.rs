use std::{
    future::Future,
    num::NonZeroUsize,
    sync::Arc,
    thread,
    time::Duration,
};

use futures::future::try_join_all;
use log::debug;
use tokio::{
    runtime::{Builder, Runtime},
    sync::{OwnedSemaphorePermit, Semaphore},
    task::JoinHandle,
};

use crate::error::BatchError;

/// Handle on one task running in a [`TaskExecutor`].
///
/// The handle is consumed when resolved. Dropping it does not cancel the
/// task: the task runs to completion and its result is discarded.
pub struct PendingResult<T> {
    handle: JoinHandle<Result<T, BatchError>>,
}

impl<T> PendingResult<T> {
    /// Whether the task finished, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    fn into_future(self) -> impl Future<Output = Result<T, BatchError>> {
        async move {
            match self.handle.await {
                Ok(result) => result,
                Err(join_error) => Err(BatchError::Executor(join_error.to_string())),
            }
        }
    }
}

/// Bounded worker pool used to fan out blocking work.
///
/// At most `pool_size` tasks run at the same time. Submitting while the pool
/// is saturated blocks the caller until a slot frees, or fails with
/// [`BatchError::PoolExhausted`] when a maximum wait is configured.
///
/// The pool owns a private runtime: tasks run on its blocking threads and the
/// calling thread only enters it to wait for a slot or for results. It must
/// therefore not be used from inside another async context.
///
/// # Examples
///
/// ```
/// use async_batch_rs::core::executor::TaskExecutorBuilder;
///
/// let executor = TaskExecutorBuilder::new().pool_size(4).build().unwrap();
///
/// let pending = (1..=3)
///     .map(|n| executor.submit(move || Ok(n * 10)))
///     .collect::<Result<Vec<_>, _>>()
///     .unwrap();
///
/// assert_eq!(executor.join_all(pending).unwrap(), vec![10, 20, 30]);
/// ```
pub struct TaskExecutor {
    runtime: Runtime,
    permits: Arc<Semaphore>,
    pool_size: usize,
    max_wait: Option<Duration>,
}

impl TaskExecutor {
    /// Runs `task` on the pool and returns a handle on its result.
    ///
    /// Blocks while all `pool_size` slots are taken.
    pub fn submit<T, F>(&self, task: F) -> Result<PendingResult<T>, BatchError>
    where
        F: FnOnce() -> Result<T, BatchError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.acquire()?;

        let handle = self.runtime.spawn_blocking(move || {
            // Released when the task returns, panicking or not.
            let _permit = permit;
            task()
        });

        Ok(PendingResult { handle })
    }

    /// Waits for every handle and returns the results in submission order.
    ///
    /// Fails fast: the first task to fail, in completion order, ends the
    /// wait and its error is returned. The other tasks keep running and their
    /// results are discarded.
    pub fn join_all<T>(&self, pending: Vec<PendingResult<T>>) -> Result<Vec<T>, BatchError> {
        self.runtime
            .block_on(try_join_all(pending.into_iter().map(PendingResult::into_future)))
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of free slots. Useful to observe saturation.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    fn acquire(&self) -> Result<OwnedSemaphorePermit, BatchError> {
        let permits = Arc::clone(&self.permits);

        let acquired = match self.max_wait {
            None => self.runtime.block_on(permits.acquire_owned()),
            Some(max_wait) => self
                .runtime
                .block_on(async { tokio::time::timeout(max_wait, permits.acquire_owned()).await })
                .map_err(|_| BatchError::PoolExhausted(max_wait))?,
        };

        acquired.map_err(|error| BatchError::Executor(error.to_string()))
    }
}

/// Default pool size: twice the available parallelism.
pub fn default_pool_size() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
        * 2
}

/// Builder for a [`TaskExecutor`].
pub struct TaskExecutorBuilder {
    pool_size: usize,
    max_wait: Option<Duration>,
    thread_name: String,
}

impl Default for TaskExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskExecutorBuilder {
    pub fn new() -> Self {
        Self {
            pool_size: default_pool_size(),
            max_wait: None,
            thread_name: "batch-worker".to_string(),
        }
    }

    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Maximum time `submit` may wait for a free slot.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn thread_name(mut self, thread_name: &str) -> Self {
        self.thread_name = thread_name.to_string();
        self
    }

    pub fn build(self) -> Result<TaskExecutor, BatchError> {
        if self.pool_size == 0 {
            return Err(BatchError::Configuration(
                "pool size must be greater than zero".to_string(),
            ));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(self.pool_size)
            .thread_name(self.thread_name)
            .enable_time()
            .build()
            .map_err(|error| BatchError::Executor(error.to_string()))?;

        debug!("Task executor started with {} workers", self.pool_size);

        Ok(TaskExecutor {
            runtime,
            permits: Arc::new(Semaphore::new(self.pool_size)),
            pool_size: self.pool_size,
            max_wait: self.max_wait,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            mpsc,
        },
        time::Instant,
    };

    use super::*;

    #[test]
    fn join_all_keeps_submission_order() {
        let executor = TaskExecutorBuilder::new().pool_size(4).build().unwrap();

        let pending = (0..8u64)
            .map(|n| {
                executor.submit(move || {
                    // Later tasks finish first.
                    thread::sleep(Duration::from_millis(40 - n * 5));
                    Ok(n)
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(executor.join_all(pending).unwrap(), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn permits_bound_concurrency() {
        let executor = TaskExecutorBuilder::new().pool_size(2).build().unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let pending = (0..6)
            .map(|_| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                executor.submit(move || {
                    let current = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(current, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        executor.join_all(pending).unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(executor.available_permits(), 2);
    }

    #[test]
    fn join_all_fails_fast_without_waiting_for_slow_siblings() {
        let executor = TaskExecutorBuilder::new().pool_size(2).build().unwrap();

        let slow = executor
            .submit(|| {
                thread::sleep(Duration::from_millis(500));
                Ok(1)
            })
            .unwrap();
        let failing = executor
            .submit(|| Err::<i32, _>(BatchError::ItemProcessor("boom".to_string())))
            .unwrap();

        let start = Instant::now();
        let result = executor.join_all(vec![slow, failing]);

        assert!(matches!(result, Err(BatchError::ItemProcessor(_))));
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn panicking_task_resolves_to_executor_error() {
        let executor = TaskExecutorBuilder::new().pool_size(1).build().unwrap();

        let pending = executor
            .submit(|| -> Result<(), BatchError> { panic!("intentional test panic") })
            .unwrap();

        assert!(matches!(
            executor.join_all(vec![pending]),
            Err(BatchError::Executor(_))
        ));
        assert_eq!(executor.available_permits(), 1);
    }

    #[test]
    fn submit_times_out_when_pool_stays_saturated() {
        let executor = TaskExecutorBuilder::new()
            .pool_size(1)
            .max_wait(Duration::from_millis(20))
            .build()
            .unwrap();
        let (release, blocked) = mpsc::channel::<()>();

        let busy = executor
            .submit(move || {
                let _ = blocked.recv();
                Ok(())
            })
            .unwrap();

        let result = executor.submit(|| Ok(()));
        assert!(matches!(result, Err(BatchError::PoolExhausted(_))));

        release.send(()).unwrap();
        executor.join_all(vec![busy]).unwrap();
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let result = TaskExecutorBuilder::new().pool_size(0).build();

        assert!(matches!(result, Err(BatchError::Configuration(_))));
    }
}
