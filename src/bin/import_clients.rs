use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context;
use async_batch_rs::{
    config::PipelineConfig,
    core::{
        checkpoint::{FileCheckpointStore, resume_point},
        executor::TaskExecutorBuilder,
        item::ItemWriter,
        job::JobBuilder,
        step::{BatchStatus, StepBuilder},
    },
    item::{
        console::ConsoleItemWriter,
        csv::csv_reader::CsvItemReaderBuilder,
        http::photo_processor::{PhotoThumbnailProcessor, http_client},
        json::json_writer::JsonItemWriterBuilder,
        person::Person,
    },
};
use clap::Parser;
use log::{error, info};

const JOB_NAME: &str = "importClientsJob";
const STEP_NAME: &str = "importClientsStep";

/// Imports clients from a CSV file, adding each one's photo thumbnail.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON pipeline configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV file of persons to import
    #[arg(long)]
    source_path: Option<String>,

    /// Number of items per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Number of items enriched at the same time
    #[arg(long)]
    pool_size: Option<usize>,

    /// File where the commit cursor is kept
    #[arg(long)]
    checkpoint: Option<String>,

    /// Resume after the last committed chunk instead of starting over
    #[arg(long)]
    resume: bool,

    /// Write JSON lines to this file instead of printing to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_path(path)
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(source_path) = &self.source_path {
            config.source_path = source_path.clone();
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(pool_size) = self.pool_size {
            config.pool_size = pool_size;
        }
        if let Some(checkpoint) = &self.checkpoint {
            config.checkpoint_path = Some(checkpoint.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

fn run(args: Args) -> anyhow::Result<BatchStatus> {
    let config = args.load_config()?;

    let checkpoint_store = config.checkpoint_path.as_ref().map(FileCheckpointStore::new);
    // Output is appended only when there is committed output to continue.
    let resuming = match &checkpoint_store {
        Some(store) => resume_point(store, STEP_NAME, args.resume)?.is_some(),
        None => false,
    };
    if args.resume && !resuming {
        info!("No checkpoint to resume from, {} starts from the beginning", STEP_NAME);
    }

    let reader = CsvItemReaderBuilder::new()
        .delimiter(config.delimiter_byte())
        .field_names(&config.field_names)
        .comment_prefix(&config.comment_prefix)
        .from_path(&config.source_path)?;

    let client = http_client(config.enrichment_timeout())?;
    let processor = PhotoThumbnailProcessor::new(client, &config.enrichment_base_url);

    let mut executor = TaskExecutorBuilder::new().pool_size(config.pool_size);
    if let Some(max_wait) = config.pool_max_wait() {
        executor = executor.max_wait(max_wait);
    }
    let executor = executor.build()?;

    let writer: Box<dyn ItemWriter<Person>> = match &args.output {
        Some(path) => Box::new(
            JsonItemWriterBuilder::new()
                .append(resuming)
                .from_path(path)?,
        ),
        None => Box::new(ConsoleItemWriter::stdout()),
    };

    let mut step = StepBuilder::new(STEP_NAME)
        .chunk::<Person, Person>(config.chunk_size)
        .reader(&reader)
        .processor(Arc::new(processor))
        .executor(&executor)
        .writer(writer.as_ref())
        .skip_limit(config.skip_limit());
    if let Some(store) = &checkpoint_store {
        step = step.checkpoint_store(store);
    }
    let step = step.build()?;

    let job = JobBuilder::new()
        .name(JOB_NAME.to_string())
        .start(&step)
        .build();
    let job_execution = job.execute();

    info!(
        "Job {} finished with status {:?} in {:?}",
        job_execution.name,
        job_execution.status,
        job_execution.duration
    );
    if let Some(step_execution) = job_execution.failed_step() {
        if let Some(failure) = &step_execution.failure {
            error!("{}: {}", step_execution.name, failure);
        }
    }

    Ok(job_execution.status)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(BatchStatus::Completed) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
