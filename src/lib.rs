#![cfg_attr(docsrs, feature(doc_cfg))]
//#![warn(missing_docs)]

/*!
 # Async Batch for Rust

 A chunk-oriented batch toolkit whose processing stage runs on a bounded
 worker pool. Items are read and written in chunks; inside a chunk every item
 is handed to the pool as soon as it is read, and the chunk is written back in
 read order once all of its items are resolved.

 ## Core Concepts

- **Job:** Represents the entire batch process. A `Job` is composed of one or more `Step`s.
- **Step:** A phase of a job. The chunk-oriented step reads a chunk, enriches it concurrently, writes it, then commits.
- **ItemReader:** Retrieval of input for a `Step`, one item at a time.
- **ItemProcessor:** The business logic applied to one item. It runs on the worker pool, so it must be `Send + Sync`.
- **ItemWriter:** The output of a `Step`, one chunk of items at a time.
- **TaskExecutor:** The bounded worker pool. Submitting blocks while every worker is busy.
- **CheckpointStore:** Persists the commit cursor so that a failed run can resume after its last written chunk.

 ## Guarantees

- Output order equals input order, whatever the completion order of the workers.
- A chunk is written whole or not at all: if one item fails, nothing of that chunk reaches the writer.
- At most `pool_size` items are processed at the same time.
- A restarted step resumes after the last committed chunk.

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| csv           | Enables the CSV `ItemReader`                                  |
| json          | Enables the JSON lines `ItemWriter`                           |
| http          | Enables the HTTP photo thumbnail `ItemProcessor`              |
| logger        | Enables a logger `ItemWriter`, useful for debugging purposes  |
| cli           | Builds the `import-clients` binary                            |
| full          | Enables all available features                                |

 ## Getting Started

```toml
[dependencies]
async-batch-rs = { version = "<version>", features = ["<full|csv|json|http|logger>"] }
```

Then, on your main.rs:

```rust
# use std::sync::Arc;
# use serde::Deserialize;
# use async_batch_rs::{
#     core::{
#         executor::TaskExecutorBuilder,
#         item::{ItemProcessor, ItemProcessorResult},
#         job::JobBuilder,
#         step::{BatchStatus, StepBuilder},
#     },
#     error::BatchError,
#     item::{console::ConsoleItemWriter, csv::csv_reader::CsvItemReaderBuilder},
# };
# #[derive(Deserialize, Debug, Clone)]
# struct Car {
#     year: u16,
#     make: String,
#     model: String,
# }
# impl std::fmt::Display for Car {
#     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
#         write!(f, "{} {} {}", self.year, self.make, self.model)
#     }
# }
# struct UpperCaseProcessor;
# impl ItemProcessor<Car, Car> for UpperCaseProcessor {
#     fn process(&self, item: &Car) -> ItemProcessorResult<Car> {
#         Ok(Car {
#             year: item.year,
#             make: item.make.to_uppercase(),
#             model: item.model.to_uppercase(),
#         })
#     }
# }
fn main() -> Result<(), BatchError> {
    let csv = "\
-- year,make,model
1948,Porsche,356
1995,Peugeot,205
2021,Mazda,CX-30";

    let reader = CsvItemReaderBuilder::new()
        .field_names(&["year", "make", "model"])
        .comment_prefix("--")
        .from_reader(csv.as_bytes());

    let writer = ConsoleItemWriter::stdout();

    let executor = TaskExecutorBuilder::new().pool_size(4).build()?;

    let step = StepBuilder::new("cars")
        .chunk::<Car, Car>(2) // set commit interval
        .reader(&reader)
        .processor(Arc::new(UpperCaseProcessor))
        .executor(&executor)
        .writer(&writer)
        .build()?;

    let job = JobBuilder::new().start(&step).build();
    let job_execution = job.execute();

    assert_eq!(job_execution.status, BatchStatus::Completed);
    assert_eq!(job_execution.step_executions[0].write_count, 3);

    Ok(())
}
```
 */

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of item readers, processors and writers (for example: csv reader)
pub mod item;

/// Pipeline settings loaded from a JSON file
pub mod config;
