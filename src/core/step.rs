use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::BatchError;

use super::{
    async_item::{AsyncItemProcessor, SharedProcessor},
    build_name,
    checkpoint::{Checkpoint, CheckpointStore},
    chunk::{Chunk, ChunkAccumulator, ChunkStatus},
    executor::TaskExecutor,
    item::{ItemReader, ItemWriter},
};

/// Lifecycle status shared by steps and jobs.
///
/// A step goes `Created → Started → {Completed | Failed | Stopped}`. The last
/// three are terminal: once reached, no further transition is accepted for
/// the same execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Not started yet.
    Created,
    /// Running its chunk loop.
    Started,
    /// Source exhausted and every chunk committed.
    Completed,
    /// Stopped by a chunk-level error; the checkpoint is kept for a restart.
    Failed,
    /// Stopped on request between two chunks; the checkpoint is kept.
    Stopped,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Stopped
        )
    }

    fn can_transition_to(&self, to: BatchStatus) -> bool {
        match self {
            BatchStatus::Created => to == BatchStatus::Started || to == BatchStatus::Failed,
            BatchStatus::Started => to.is_terminal(),
            _ => false,
        }
    }
}

/// Execution details of one run of a step.
#[derive(Debug)]
pub struct StepExecution {
    /// Unique identifier for this step execution
    pub id: Uuid,
    /// Human-readable name for the step
    pub name: String,
    status: BatchStatus,
    pub start_time: Instant,
    pub end_time: Instant,
    pub duration: Duration,
    /// Number of items successfully read
    pub read_count: usize,
    /// Number of malformed items skipped
    pub read_error_count: usize,
    /// Number of items successfully processed
    pub process_count: usize,
    /// Number of items whose processing failed
    pub process_error_count: usize,
    /// Number of items successfully written
    pub write_count: usize,
    /// Number of items in chunks whose write failed
    pub write_error_count: usize,
    /// Number of chunks committed during this execution
    pub commit_count: usize,
    /// Commit cursor, restored from the checkpoint store on resume
    pub checkpoint: Checkpoint,
    /// Message of the error that failed the step, if any
    pub failure: Option<String>,
}

impl StepExecution {
    pub fn new(name: &str) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: BatchStatus::Created,
            start_time: now,
            end_time: now,
            duration: Duration::default(),
            read_count: 0,
            read_error_count: 0,
            process_count: 0,
            process_error_count: 0,
            write_count: 0,
            write_error_count: 0,
            commit_count: 0,
            checkpoint: Checkpoint::default(),
            failure: None,
        }
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    /// Moves the execution to `to`.
    ///
    /// # Errors
    /// [`BatchError::IllegalTransition`] when leaving a terminal status or
    /// skipping `Started`.
    pub fn transition(&mut self, to: BatchStatus) -> Result<(), BatchError> {
        if !self.status.can_transition_to(to) {
            return Err(BatchError::IllegalTransition {
                from: self.status,
                to,
            });
        }
        debug!("Step {}: {:?} -> {:?}", self.name, self.status, to);
        self.status = to;
        Ok(())
    }
}

/// A sequential phase of a job.
pub trait Step {
    fn get_name(&self) -> &str;

    /// Executes the step.
    ///
    /// # Returns
    /// - `Ok(())`: the step completed
    /// - `Err(BatchError::Step)`: the step failed or was stopped; details are
    ///   recorded in `step_execution`
    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError>;
}

/// Cooperative stop request, checked by a running step between two chunks.
#[derive(Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Step reading, enriching and writing items chunk by chunk.
///
/// Chunks never overlap: chunk N+1 is read only after chunk N has been
/// written and committed. Inside a chunk, items are processed concurrently
/// on the executor and written back in read order.
pub struct ChunkOrientedStep<'a, I, O> {
    name: String,
    /// Component responsible for reading items from the source
    reader: &'a dyn ItemReader<I>,
    /// Delegate processor running on the worker pool
    processor: AsyncItemProcessor<'a, I, O>,
    /// Component responsible for writing items to the destination
    writer: &'a dyn ItemWriter<O>,
    /// Number of items to process in each chunk
    chunk_size: usize,
    /// Maximum number of malformed items skipped before failing the step
    skip_limit: usize,
    checkpoint_store: Option<&'a dyn CheckpointStore>,
    stop_signal: Option<StopSignal>,
}

impl<I, O> Step for ChunkOrientedStep<'_, I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn get_name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let start_time = Instant::now();
        step_execution.transition(BatchStatus::Started)?;

        info!(
            "Start of step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        let outcome = self
            .open()
            .and_then(|()| self.run_chunks(step_execution));

        Self::manage_error(self.reader.close());
        Self::manage_error(self.writer.close());

        let status = match outcome {
            Ok(status) => status,
            Err(error) => {
                error!("Step {} failed: {}", self.name, error);
                step_execution.failure = Some(error.to_string());
                BatchStatus::Failed
            }
        };
        step_execution.transition(status)?;

        step_execution.start_time = start_time;
        step_execution.end_time = Instant::now();
        step_execution.duration = start_time.elapsed();

        info!(
            "End of step: {}, id: {}, status: {:?}, written: {}",
            step_execution.name, step_execution.id, status, step_execution.write_count
        );

        if status == BatchStatus::Completed {
            Ok(())
        } else {
            Err(BatchError::Step(self.name.clone()))
        }
    }
}

impl<I, O> ChunkOrientedStep<'_, I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn open(&self) -> Result<(), BatchError> {
        self.reader.open()?;
        self.writer.open()
    }

    /// Runs the chunk loop until the source is exhausted, a stop is
    /// requested or a chunk fails.
    fn run_chunks(&self, step_execution: &mut StepExecution) -> Result<BatchStatus, BatchError> {
        self.restore(step_execution)?;

        let accumulator = ChunkAccumulator::new(self.chunk_size, self.skip_limit);

        loop {
            if self.is_stop_requested() {
                info!(
                    "Stop requested, step {} stops after {} committed items",
                    self.name, step_execution.checkpoint.offset
                );
                return Ok(BatchStatus::Stopped);
            }

            let chunk = match accumulator.fill(self.reader, step_execution.read_error_count) {
                Ok(chunk) => chunk,
                Err(error) => {
                    step_execution.read_error_count += 1;
                    return Err(error);
                }
            };
            step_execution.read_count += chunk.len();
            step_execution.read_error_count += chunk.skipped();

            let status = chunk.status();
            let consumed = chunk.consumed();
            let skipped = chunk.skipped();
            let written = chunk.len();

            if !chunk.is_empty() {
                let processed = self.process_chunk(step_execution, chunk)?;
                self.write_chunk(step_execution, processed.items())?;
            }

            if consumed > 0 {
                self.commit(step_execution, consumed, written, skipped)?;
            }

            if status == ChunkStatus::Finished {
                if let Some(store) = self.checkpoint_store {
                    store.clear(&self.name)?;
                }
                return Ok(BatchStatus::Completed);
            }
        }
    }

    /// Repositions the reader after the last committed chunk of a previous
    /// run, if any, and carries that run's committed counters over.
    fn restore(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let Some(store) = self.checkpoint_store else {
            return Ok(());
        };

        if let Some(checkpoint) = store.load(&self.name)? {
            info!(
                "Resuming step {} after {} items ({} chunks committed)",
                self.name, checkpoint.offset, checkpoint.commit_count
            );
            self.reader.seek(checkpoint.offset)?;
            step_execution.read_count = checkpoint.offset - checkpoint.skip_count;
            step_execution.read_error_count = checkpoint.skip_count;
            step_execution.write_count = checkpoint.write_count;
            step_execution.commit_count = checkpoint.commit_count;
            step_execution.checkpoint = checkpoint;
        }

        Ok(())
    }

    /// Fans the chunk out to the worker pool and waits for every result.
    fn process_chunk(
        &self,
        step_execution: &mut StepExecution,
        chunk: Chunk<I>,
    ) -> Result<Chunk<O>, BatchError> {
        debug!("Processing chunk of {} items", chunk.len());

        let resolved = self
            .processor
            .submit(chunk)
            .and_then(|pending| self.processor.resolve(pending));

        match resolved {
            Ok(processed) => {
                step_execution.process_count += processed.len();
                Ok(processed)
            }
            Err(error) => {
                warn!("Error processing chunk: {}", error);
                step_execution.process_error_count += 1;
                Err(error)
            }
        }
    }

    /// Writes and flushes the whole chunk.
    fn write_chunk(
        &self,
        step_execution: &mut StepExecution,
        processed_items: &[O],
    ) -> Result<(), BatchError> {
        debug!("Writing chunk of {} items", processed_items.len());

        match self
            .writer
            .write(processed_items)
            .and_then(|()| self.writer.flush())
        {
            Ok(()) => {
                step_execution.write_count += processed_items.len();
                Ok(())
            }
            Err(error) => {
                warn!("Error writing items: {}", error);
                step_execution.write_error_count += processed_items.len();
                Err(error)
            }
        }
    }

    /// Advances the commit cursor past the chunk and persists it.
    fn commit(
        &self,
        step_execution: &mut StepExecution,
        consumed: usize,
        written: usize,
        skipped: usize,
    ) -> Result<(), BatchError> {
        let checkpoint = &mut step_execution.checkpoint;
        checkpoint.offset += consumed;
        checkpoint.write_count += written;
        checkpoint.skip_count += skipped;
        checkpoint.commit_count += 1;
        step_execution.commit_count += 1;

        if let Some(store) = self.checkpoint_store {
            store.save(&self.name, &step_execution.checkpoint)?;
        }

        debug!(
            "Chunk committed, step {} now at offset {}",
            self.name, step_execution.checkpoint.offset
        );
        Ok(())
    }

    fn is_stop_requested(&self) -> bool {
        self.stop_signal
            .as_ref()
            .is_some_and(StopSignal::is_stop_requested)
    }

    /// Helper method to handle errors gracefully.
    ///
    /// Used where an error must be logged but must not fail the step.
    fn manage_error(result: Result<(), BatchError>) {
        if let Err(error) = result {
            warn!("Non-fatal error: {}", error);
        }
    }
}

/// Builder for a [`ChunkOrientedStep`].
pub struct ChunkOrientedStepBuilder<'a, I, O> {
    name: String,
    reader: Option<&'a dyn ItemReader<I>>,
    processor: Option<SharedProcessor<I, O>>,
    executor: Option<&'a TaskExecutor>,
    writer: Option<&'a dyn ItemWriter<O>>,
    chunk_size: usize,
    skip_limit: usize,
    checkpoint_store: Option<&'a dyn CheckpointStore>,
    stop_signal: Option<StopSignal>,
}

impl<'a, I, O> ChunkOrientedStepBuilder<'a, I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reader: None,
            processor: None,
            executor: None,
            writer: None,
            chunk_size: 1000,
            skip_limit: 0,
            checkpoint_store: None,
            stop_signal: None,
        }
    }

    pub fn reader(mut self, reader: &'a dyn ItemReader<I>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Processor run once per item on the executor's worker threads.
    pub fn processor(mut self, processor: SharedProcessor<I, O>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn executor(mut self, executor: &'a TaskExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn writer(mut self, writer: &'a dyn ItemWriter<O>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Number of malformed items tolerated over the whole step.
    pub fn skip_limit(mut self, skip_limit: usize) -> Self {
        self.skip_limit = skip_limit;
        self
    }

    pub fn checkpoint_store(mut self, checkpoint_store: &'a dyn CheckpointStore) -> Self {
        self.checkpoint_store = Some(checkpoint_store);
        self
    }

    pub fn stop_signal(mut self, stop_signal: StopSignal) -> Self {
        self.stop_signal = Some(stop_signal);
        self
    }

    pub fn build(self) -> Result<ChunkOrientedStep<'a, I, O>, BatchError> {
        if self.chunk_size == 0 {
            return Err(BatchError::Configuration(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        let missing = |part: &str| {
            BatchError::Configuration(format!(
                "{} is required for building step {}",
                part, self.name
            ))
        };
        let reader = self.reader.ok_or_else(|| missing("Reader"))?;
        let processor = self.processor.ok_or_else(|| missing("Processor"))?;
        let executor = self.executor.ok_or_else(|| missing("Executor"))?;
        let writer = self.writer.ok_or_else(|| missing("Writer"))?;

        Ok(ChunkOrientedStep {
            name: self.name,
            reader,
            processor: AsyncItemProcessor::new(processor, executor),
            writer,
            chunk_size: self.chunk_size,
            skip_limit: self.skip_limit,
            checkpoint_store: self.checkpoint_store,
            stop_signal: self.stop_signal,
        })
    }
}

/// Entry point for building steps.
///
/// ```
/// use std::sync::Arc;
///
/// use async_batch_rs::core::{
///     executor::TaskExecutorBuilder,
///     item::{ItemReader, ItemReaderResult, ItemWriter, ItemWriterResult, PassThroughProcessor},
///     step::{Step, StepBuilder, StepExecution},
/// };
/// use async_batch_rs::BatchError;
///
/// struct Empty;
///
/// impl ItemReader<u32> for Empty {
///     fn read(&self) -> ItemReaderResult<u32> {
///         Ok(None)
///     }
/// }
///
/// struct Discard;
///
/// impl ItemWriter<u32> for Discard {
///     fn write(&self, _items: &[u32]) -> ItemWriterResult {
///         Ok(())
///     }
/// }
///
/// # fn main() -> Result<(), BatchError> {
/// let executor = TaskExecutorBuilder::new().pool_size(2).build()?;
///
/// let step = StepBuilder::new("noop")
///     .chunk::<u32, u32>(10)
///     .reader(&Empty)
///     .processor(Arc::new(PassThroughProcessor::default()))
///     .executor(&executor)
///     .writer(&Discard)
///     .build()?;
///
/// let mut step_execution = StepExecution::new(step.get_name());
/// step.execute(&mut step_execution)?;
/// # Ok(())
/// # }
/// ```
pub struct StepBuilder {
    name: String,
}

impl StepBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// Step with a generated name.
    pub fn unnamed() -> Self {
        Self::new(&build_name())
    }

    pub fn chunk<'a, I, O>(self, chunk_size: usize) -> ChunkOrientedStepBuilder<'a, I, O>
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        ChunkOrientedStepBuilder::new(&self.name).chunk_size(chunk_size)
    }
}
