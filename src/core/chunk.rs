use log::{debug, warn};

use crate::error::BatchError;

use super::item::ItemReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    /// The chunk reached its size; more items may follow.
    Full,
    /// The source is exhausted; this is the last chunk.
    Finished,
}

/// Ordered, bounded batch of items forming one commit unit.
///
/// The order of `items` is the order in which they were read from the source
/// and is preserved by every stage of the pipeline.
#[derive(Debug)]
pub struct Chunk<T> {
    items: Vec<T>,
    status: ChunkStatus,
    /// Items pulled from the source to build this chunk, skipped ones included.
    consumed: usize,
    skipped: usize,
}

impl<T> Chunk<T> {
    pub fn new(items: Vec<T>, status: ChunkStatus) -> Self {
        let consumed = items.len();
        Self {
            items,
            status,
            consumed,
            skipped: 0,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn status(&self) -> ChunkStatus {
        self.status
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Replaces the items while keeping status and source accounting.
    ///
    /// Used by the enrichment stage, where each record becomes a pending
    /// result and later an enriched record at the same position.
    pub fn with_items<U>(&self, items: Vec<U>) -> Chunk<U> {
        Chunk {
            items,
            status: self.status,
            consumed: self.consumed,
            skipped: self.skipped,
        }
    }
}

/// Groups items pulled from a reader into chunks of a fixed size.
pub struct ChunkAccumulator {
    chunk_size: usize,
    skip_limit: usize,
}

impl ChunkAccumulator {
    pub fn new(chunk_size: usize, skip_limit: usize) -> Self {
        Self {
            chunk_size,
            skip_limit,
        }
    }

    /// Reads a chunk of items from the reader.
    ///
    /// Stops as soon as the chunk holds `chunk_size` items or the reader is
    /// exhausted, so the last chunk may be partial or empty. Malformed items
    /// are logged and skipped as long as `skipped_so_far` plus the ones
    /// skipped here stays within the skip limit.
    ///
    /// # Returns
    /// - `Ok(chunk)` with status `Full` or `Finished`
    /// - `Err(BatchError)` when the skip limit is exceeded or the reader fails
    ///   for another reason
    pub fn fill<I>(
        &self,
        reader: &dyn ItemReader<I>,
        skipped_so_far: usize,
    ) -> Result<Chunk<I>, BatchError> {
        debug!("Start reading chunk");

        let mut items = Vec::with_capacity(self.chunk_size);
        let mut consumed = 0;
        let mut skipped = 0;

        let status = loop {
            if items.len() >= self.chunk_size {
                break ChunkStatus::Full;
            }

            match reader.read() {
                Ok(Some(item)) => {
                    items.push(item);
                    consumed += 1;
                }
                Ok(None) => break ChunkStatus::Finished,
                Err(BatchError::ItemReader(message)) => {
                    consumed += 1;
                    skipped += 1;
                    if skipped_so_far + skipped > self.skip_limit {
                        return Err(BatchError::ItemReader(message));
                    }
                    warn!("Skipping malformed item: {}", message);
                }
                Err(error) => return Err(error),
            }
        };

        debug!("End reading chunk: {:?}, {} items", status, items.len());

        Ok(Chunk {
            items,
            status,
            consumed,
            skipped,
        })
    }
}
