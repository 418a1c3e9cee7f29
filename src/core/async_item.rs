use std::sync::Arc;

use log::debug;

use crate::error::BatchError;

use super::{
    chunk::Chunk,
    executor::{PendingResult, TaskExecutor},
    item::ItemProcessor,
};

/// Processor shared with the worker threads of a [`TaskExecutor`].
pub type SharedProcessor<I, O> = Arc<dyn ItemProcessor<I, O> + Send + Sync>;

/// Runs a delegate processor on a worker pool, one task per item.
///
/// [`AsyncItemProcessor::submit`] turns a chunk of items into a chunk of
/// pending results and [`AsyncItemProcessor::resolve`] turns those back into
/// processed items. Both keep the position of every item: the i-th result
/// always belongs to the i-th item, whatever order the tasks complete in.
pub struct AsyncItemProcessor<'a, I, O> {
    delegate: SharedProcessor<I, O>,
    executor: &'a TaskExecutor,
}

impl<'a, I, O> AsyncItemProcessor<'a, I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new(delegate: SharedProcessor<I, O>, executor: &'a TaskExecutor) -> Self {
        Self { delegate, executor }
    }

    /// Dispatches every item of the chunk to the pool.
    ///
    /// Returns once the last item has been handed to a worker, blocking while
    /// the pool is saturated.
    pub fn submit(&self, chunk: Chunk<I>) -> Result<Chunk<PendingResult<O>>, BatchError> {
        debug!("Submitting chunk of {} items", chunk.len());

        let shape = chunk.with_items(Vec::<()>::new());
        let mut pending = Vec::with_capacity(chunk.len());

        for item in chunk.into_items() {
            let delegate = Arc::clone(&self.delegate);
            pending.push(self.executor.submit(move || delegate.process(&item))?);
        }

        Ok(shape.with_items(pending))
    }

    /// Waits for every pending result of the chunk.
    ///
    /// The first failure aborts the wait and is returned; results of the
    /// remaining tasks are discarded.
    pub fn resolve(&self, chunk: Chunk<PendingResult<O>>) -> Result<Chunk<O>, BatchError> {
        debug!("Resolving chunk of {} items", chunk.len());

        let shape = chunk.with_items(Vec::<()>::new());
        let items = self.executor.join_all(chunk.into_items())?;

        Ok(shape.with_items(items))
    }
}
