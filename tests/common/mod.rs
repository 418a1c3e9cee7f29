#![allow(dead_code)]

mod mocks;

pub use mocks::{MockFile, MockWriter};

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use async_batch_rs::{
    BatchError,
    core::item::{
        ItemProcessor, ItemProcessorResult, ItemReader, ItemReaderResult, ItemWriter,
        ItemWriterResult,
    },
};

/// Reader over a fixed list of items, malformed ones included.
pub struct VecReader<T> {
    items: RefCell<VecDeque<Result<T, BatchError>>>,
}

impl<T> VecReader<T> {
    pub fn new(items: Vec<Result<T, BatchError>>) -> Self {
        Self {
            items: RefCell::new(items.into()),
        }
    }
}

impl VecReader<u64> {
    /// Reads `1..=count`.
    pub fn range(count: u64) -> Self {
        Self::new((1..=count).map(Ok).collect())
    }
}

impl<T> ItemReader<T> for VecReader<T> {
    fn read(&self) -> ItemReaderResult<T> {
        self.items.borrow_mut().pop_front().transpose()
    }
}

/// Writer keeping every chunk it received.
pub struct CollectingWriter<T> {
    pub chunks: RefCell<Vec<Vec<T>>>,
}

impl<T> Default for CollectingWriter<T> {
    fn default() -> Self {
        Self {
            chunks: RefCell::new(Vec::new()),
        }
    }
}

impl<T: Clone> CollectingWriter<T> {
    pub fn items(&self) -> Vec<T> {
        self.chunks.borrow().iter().flatten().cloned().collect()
    }

    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunks.borrow().iter().map(Vec::len).collect()
    }
}

impl<T: Clone> ItemWriter<T> for CollectingWriter<T> {
    fn write(&self, items: &[T]) -> ItemWriterResult {
        self.chunks.borrow_mut().push(items.to_vec());
        Ok(())
    }
}

/// Writer failing on its `fail_on`-th call to `write`, counting from 1.
pub struct FailingWriter {
    pub inner: CollectingWriter<u64>,
    calls: RefCell<usize>,
    fail_on: usize,
}

impl FailingWriter {
    pub fn new(fail_on: usize) -> Self {
        Self {
            inner: CollectingWriter::default(),
            calls: RefCell::new(0),
            fail_on,
        }
    }
}

impl ItemWriter<u64> for FailingWriter {
    fn write(&self, items: &[u64]) -> ItemWriterResult {
        *self.calls.borrow_mut() += 1;
        if *self.calls.borrow() == self.fail_on {
            return Err(BatchError::ItemWriter("disk full".to_string()));
        }
        self.inner.write(items)
    }
}

/// Doubles each item after a random delay, tracking how many items are in
/// progress at the same time.
#[derive(Default)]
pub struct RandomLatencyProcessor {
    pub max_delay_ms: u64,
    pub fail_on: Option<u64>,
    active: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

impl RandomLatencyProcessor {
    pub fn new(max_delay_ms: u64) -> Self {
        Self {
            max_delay_ms,
            ..Default::default()
        }
    }

    pub fn failing_on(max_delay_ms: u64, item: u64) -> Self {
        Self {
            max_delay_ms,
            fail_on: Some(item),
            ..Default::default()
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl ItemProcessor<u64, u64> for RandomLatencyProcessor {
    fn process(&self, item: &u64) -> ItemProcessorResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        if self.max_delay_ms > 0 {
            thread::sleep(Duration::from_millis(rand::random_range(0..self.max_delay_ms)));
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on == Some(*item) {
            return Err(BatchError::ItemProcessor(format!("cannot process {}", item)));
        }
        Ok(item * 2)
    }
}

pub fn shared(processor: RandomLatencyProcessor) -> Arc<RandomLatencyProcessor> {
    Arc::new(processor)
}

/// Source and destination at once, tracking items read but not yet written.
pub struct FlowTracker {
    total: u64,
    next: Cell<u64>,
    written: Cell<u64>,
    /// Largest outstanding count seen when an item is read.
    pub peak_outstanding: Cell<u64>,
    /// Outstanding count seen by each `write` call, before the write.
    pub outstanding_at_write: RefCell<Vec<u64>>,
}

impl FlowTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            next: Cell::new(1),
            written: Cell::new(0),
            peak_outstanding: Cell::new(0),
            outstanding_at_write: RefCell::new(Vec::new()),
        }
    }

    fn outstanding(&self) -> u64 {
        self.next.get() - 1 - self.written.get()
    }
}

impl ItemReader<u64> for FlowTracker {
    fn read(&self) -> ItemReaderResult<u64> {
        let item = self.next.get();
        if item > self.total {
            return Ok(None);
        }
        self.next.set(item + 1);
        self.peak_outstanding
            .set(self.peak_outstanding.get().max(self.outstanding()));
        Ok(Some(item))
    }
}

impl ItemWriter<u64> for FlowTracker {
    fn write(&self, items: &[u64]) -> ItemWriterResult {
        self.outstanding_at_write
            .borrow_mut()
            .push(self.outstanding());
        self.written.set(self.written.get() + items.len() as u64);
        Ok(())
    }
}
