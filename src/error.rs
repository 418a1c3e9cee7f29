use std::time::Duration;

use thiserror::Error;

use crate::core::step::BatchStatus;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    /// A source item could not be read or parsed.
    #[error("ItemReader from: {0}")]
    ItemReader(String),

    /// The source resource does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Enrichment failed: {0}")]
    Enrichment(#[from] EnrichmentError),

    #[error("ItemProcessor from: {0}")]
    ItemProcessor(String),

    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    /// No worker slot became available within the configured wait.
    #[error("Worker pool exhausted, no slot freed within {0:?}")]
    PoolExhausted(Duration),

    #[error("Task executor: {0}")]
    Executor(String),

    #[error("Checkpoint store: {0}")]
    Checkpoint(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Illegal status transition from {from:?} to {to:?}")]
    IllegalTransition { from: BatchStatus, to: BatchStatus },

    #[error("Step failed: {0}")]
    Step(String),
}

/// Failure of the remote lookup used to enrich a single record.
///
/// The resolver does not distinguish between the variants: any of them fails
/// the chunk that contains the record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("remote error: {0}")]
    Remote(String),
}
