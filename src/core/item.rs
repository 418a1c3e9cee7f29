use crate::error::BatchError;

/// Result of reading one item: `Ok(None)` once the source is exhausted.
pub type ItemReaderResult<I> = Result<Option<I>, BatchError>;

/// Result of processing one item.
pub type ItemProcessorResult<O> = Result<O, BatchError>;

/// Result of writing one chunk.
pub type ItemWriterResult = Result<(), BatchError>;

/// Retrieval of input for a step, one item at a time.
///
/// Readers are lazy, finite and restartable. A read that fails with
/// [`BatchError::ItemReader`] still consumes the underlying line, so the
/// following call returns the next item.
pub trait ItemReader<I> {
    /// Reads the next item.
    ///
    /// # Returns
    /// - `Ok(Some(item))` when an item was read
    /// - `Ok(None)` when the source is exhausted
    /// - `Err(BatchError)` when the current item is malformed
    fn read(&self) -> ItemReaderResult<I>;

    fn open(&self) -> Result<(), BatchError> {
        Ok(())
    }

    /// Repositions the reader just after the first `offset` items.
    ///
    /// Malformed items count towards the offset, exactly as they did when they
    /// were first consumed. Seeking past the end leaves the reader exhausted.
    fn seek(&self, offset: usize) -> Result<(), BatchError> {
        for _ in 0..offset {
            match self.read() {
                Ok(Some(_)) | Err(BatchError::ItemReader(_)) => {}
                Ok(None) => break,
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    fn close(&self) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Business logic applied to every item read.
///
/// Processors used by the asynchronous enrichment stage run on worker
/// threads, hence the `Send + Sync` bound there; the trait itself does not
/// require it.
pub trait ItemProcessor<I, O> {
    fn process(&self, item: &I) -> ItemProcessorResult<O>;
}

/// Output of a step, one chunk at a time.
///
/// A chunk is committed only once both [`ItemWriter::write`] and
/// [`ItemWriter::flush`] succeeded for it.
pub trait ItemWriter<O> {
    fn write(&self, items: &[O]) -> ItemWriterResult;

    fn flush(&self) -> ItemWriterResult {
        Ok(())
    }

    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}

/// Identity processor.
#[derive(Default)]
pub struct PassThroughProcessor {}

impl<T: Clone> ItemProcessor<T, T> for PassThroughProcessor {
    fn process(&self, item: &T) -> ItemProcessorResult<T> {
        Ok(item.clone())
    }
}

impl<I, O, F> ItemProcessor<I, O> for F
where
    F: Fn(&I) -> ItemProcessorResult<O>,
{
    fn process(&self, item: &I) -> ItemProcessorResult<O> {
        self(item)
    }
}
