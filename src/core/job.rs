use std::time::{Duration, Instant};

use log::{error, info};
use uuid::Uuid;

use crate::BatchError;

use super::{
    build_name,
    step::{Step, StepExecution},
};

/// Type alias for job execution results.
type JobResult<T> = Result<T, BatchError>;

/// Represents a job that can be executed.
///
/// A job is a container for a sequence of steps that are executed in order.
/// The first failing step stops the job; work committed by earlier chunks and
/// steps is left in place.
pub trait Job {
    /// Runs the job and returns the result of the job execution.
    ///
    /// # Returns
    /// - `Ok(JobExecution)` when every step succeeded
    /// - `Err(BatchError::Step { name, source })` naming the step that failed
    ///   and carrying the read, process or write error that stopped it
    fn run(&self) -> JobResult<JobExecution>;
}

/// Represents the execution of a job.
#[derive(Debug)]
pub struct JobExecution {
    /// The time when the job started executing
    pub start: Instant,
    /// The time when the job finished executing
    pub end: Instant,
    /// The total duration of the job execution
    pub duration: Duration,
    /// One entry per executed step, in execution order
    pub step_executions: Vec<StepExecution>,
}

/// Represents an instance of a job.
///
/// A job instance is created through the `JobBuilder` and executed by calling
/// the `run` method. The steps are executed in the order they were added.
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

    pub fn get_id(&self) -> Uuid {
        self.id
    }
}

impl Job for JobInstance<'_> {
    fn run(&self) -> JobResult<JobExecution> {
        let start = Instant::now();

        info!("Start of job: {}, id: {}", self.name, self.id);

        let mut step_executions = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            match step.execute() {
                Ok(step_execution) => step_executions.push(step_execution),
                Err(err) => {
                    error!(
                        "Job {} stopped: step {} failed: {}",
                        self.name,
                        step.get_name(),
                        err
                    );
                    return Err(BatchError::Step {
                        name: step.get_name().to_owned(),
                        source: Box::new(err),
                    });
                }
            }
        }

        info!("End of job: {}, id: {}", self.name, self.id);

        Ok(JobExecution {
            start,
            end: Instant::now(),
            duration: start.elapsed(),
            step_executions,
        })
    }
}

/// Builder for creating a job instance.
///
/// # Example
///
/// ```
/// use product_batch::core::{
///     item::{ItemWriter, ItemWriterResult},
///     job::{Job, JobBuilder},
///     step::{StepBuilder, StepInstance},
/// };
/// use product_batch::item::csv::csv_reader::CsvItemReaderBuilder;
/// use product_batch::model::{Product, PRODUCT_FIELDS};
/// use product_batch::processor::DiscountProcessor;
///
/// struct PriceLogger;
///
/// impl ItemWriter<Product> for PriceLogger {
///     fn write(&self, items: &[Product]) -> ItemWriterResult {
///         for item in items {
///             println!("{} -> {}", item.name, item.price);
///         }
///         Ok(items.len())
///     }
/// }
///
/// let reader = CsvItemReaderBuilder::new()
///     .names(&PRODUCT_FIELDS)
///     .from_reader("1,Widget,A small widget,100".as_bytes());
/// let processor = DiscountProcessor::default();
///
/// let import_step: StepInstance<Product, Product> = StepBuilder::new()
///     .name("import".to_string())
///     .reader(&reader)
///     .processor(&processor)
///     .writer(&PriceLogger)
///     .chunk(2)
///     .build()
///     .unwrap();
///
/// let job = JobBuilder::new()
///     .name("import-products".to_string())
///     .start(&import_step)
///     .build();
///
/// let execution = job.run().unwrap();
/// assert_eq!(execution.step_executions[0].write_count, 1);
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

    /// Builds the job. If no name has been provided, a random name is generated.
    pub fn build(self) -> JobInstance<'a> {
        JobInstance {
            id: Uuid::new_v4(),
            name: self.name.unwrap_or_else(build_name),
            steps: self.steps,
        }
    }
}
