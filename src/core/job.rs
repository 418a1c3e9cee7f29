use std::time::{Duration, Instant};

use log::{error, info};
use uuid::Uuid;

use crate::BatchError;

use super::{
    build_name,
    step::{BatchStatus, Step, StepExecution},
};

/// Type alias for job execution results.
///
/// A `JobResult` is a `Result` that contains either:
/// - A successful `JobExecution` with execution details
/// - A `BatchError` indicating what went wrong
pub type JobResult<T> = Result<T, BatchError>;

/// Represents a job that can be executed.
///
/// A job is a container for a sequence of steps that are executed in order.
/// The job is responsible for orchestrating the steps and reporting the
/// overall result.
pub trait Job {
    /// Runs the job and returns the result of the job execution.
    ///
    /// # Returns
    /// - `Ok(JobExecution)` when every step completed
    /// - `Err(BatchError::Step)` naming the first step that did not complete
    fn run(&self) -> JobResult<JobExecution>;
}

/// Represents the execution of a job.
///
/// Holds the final status, timing information and the execution details of
/// every step that ran, in order.
#[derive(Debug)]
pub struct JobExecution {
    pub id: Uuid,
    pub name: String,
    pub status: BatchStatus,
    /// The time when the job started executing
    pub start: Instant,
    /// The time when the job finished executing
    pub end: Instant,
    /// The total duration of the job execution
    pub duration: Duration,
    pub step_executions: Vec<StepExecution>,
}

impl JobExecution {
    /// The step that ended the job without completing, if any.
    pub fn failed_step(&self) -> Option<&StepExecution> {
        self.step_executions
            .iter()
            .find(|step_execution| step_execution.status() != BatchStatus::Completed)
    }
}

/// Represents an instance of a job.
///
/// A `JobInstance` defines a specific configuration of a job that can be
/// executed: a unique identifier, a name and the steps run in sequence.
pub struct JobInstance<'a> {
    /// Unique identifier for this job instance
    id: Uuid,
    /// Human-readable name for the job
    name: String,
    /// Collection of steps that make up this job, in execution order
    steps: Vec<&'a dyn Step>,
}

impl JobInstance<'_> {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Executes the steps in sequence and always returns the execution
    /// details, whatever the outcome.
    ///
    /// The first step that does not complete ends the job; later steps do not
    /// run. The job status is the status of that step, or `Completed`.
    pub fn execute(&self) -> JobExecution {
        let start = Instant::now();

        info!("Start of job: {}, id: {}", self.name, self.id);

        let mut status = BatchStatus::Completed;
        let mut step_executions = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let mut step_execution = StepExecution::new(step.get_name());
            let result = step.execute(&mut step_execution);
            let step_status = step_execution.status();
            step_executions.push(step_execution);

            if let Err(error) = result {
                error!("Job {} ended by step {}: {}", self.name, step.get_name(), error);
                status = if step_status == BatchStatus::Stopped {
                    BatchStatus::Stopped
                } else {
                    BatchStatus::Failed
                };
                break;
            }
        }

        info!(
            "End of job: {}, id: {}, status: {:?}",
            self.name, self.id, status
        );

        JobExecution {
            id: self.id,
            name: self.name.clone(),
            status,
            start,
            end: Instant::now(),
            duration: start.elapsed(),
            step_executions,
        }
    }
}

impl Job for JobInstance<'_> {
    fn run(&self) -> JobResult<JobExecution> {
        let job_execution = self.execute();

        match job_execution.failed_step() {
            Some(step_execution) => Err(BatchError::Step(step_execution.name.clone())),
            None => Ok(job_execution),
        }
    }
}

/// Builder for creating a job instance.
///
/// ```rust,no_run,compile_fail
/// use async_batch_rs::core::job::JobBuilder;
///
/// let job = JobBuilder::new()
///     .name("import-customers".to_string())
///     .start(&read_step)
///     .next(&write_step)
///     .build();
/// ```
#[derive(Default)]
pub struct JobBuilder<'a> {
    /// Optional name for the job (generated randomly if not specified)
    name: Option<String>,
    /// Collection of steps to be executed, in order
    steps: Vec<&'a dyn Step>,
}

impl<'a> JobBuilder<'a> {
    pub fn new() -> Self {
        Self {
            name: None,
            steps: Vec::new(),
        }
    }

    pub fn name(mut self, name: String) -> JobBuilder<'a> {
        self.name = Some(name);
        self
    }

    /// Sets the first step of the job.
    ///
    /// Semantically identical to `next()`, reads better for the first step.
    pub fn start(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    /// Adds a step to the job. Steps are executed in the order they are added.
    pub fn next(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    /// Builds the job; a random name is generated when none was provided.
    pub fn build(self) -> JobInstance<'a> {
        JobInstance {
            id: Uuid::new_v4(),
            name: self.name.unwrap_or_else(build_name),
            steps: self.steps,
        }
    }
}
