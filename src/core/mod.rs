use rand::distr::{Alphanumeric, SampleString};

pub mod item;

pub mod chunk;

/// Bounded worker pool and pending results
pub mod executor;

/// Asynchronous, order-preserving enrichment stage
pub mod async_item;

/// Commit cursor persistence
pub mod checkpoint;

pub mod job;

pub mod step;

/// Generates a random name consisting of alphanumeric characters.
///
/// # Returns
///
/// A `String` containing the generated random name.
fn build_name() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 8)
}
