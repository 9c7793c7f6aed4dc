//! The product import job, wired from a [`JobConfig`].
//!
//! One job, one chunk-oriented step:
//! CSV file -> [`DiscountProcessor`] -> `Product` table, one transaction per chunk.

use std::str::FromStr;

use log::info;
use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePool},
};

use crate::{
    BatchError,
    config::JobConfig,
    core::{
        job::{Job, JobBuilder, JobExecution},
        step::{StepBuilder, StepInstance},
    },
    item::{
        csv::csv_reader::CsvItemReaderBuilder,
        rdbc::{ChunkCheckpoint, SqliteItemWriterBuilder},
    },
    model::{PRODUCT_FIELDS, Product},
    processor::DiscountProcessor,
};

pub const PRODUCT_TABLE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS Product (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    price INTEGER NOT NULL
)";

/// Opens a pool on `database_url`, creating the SQLite file if needed.
pub async fn connect(database_url: &str) -> Result<SqlitePool, BatchError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| BatchError::Configuration(format!("bad database url {}: {}", database_url, e)))?
        .create_if_missing(true);

    SqlitePool::connect_with(options)
        .await
        .map_err(|e| BatchError::ItemWriter(format!("cannot connect to {}: {}", database_url, e)))
}

pub async fn create_product_table(pool: &Pool<Sqlite>) -> Result<(), BatchError> {
    sqlx::query(PRODUCT_TABLE_SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| BatchError::ItemWriter(format!("cannot create Product table: {}", e)))?;
    Ok(())
}

/// Builds and runs the import job.
///
/// Must be called from a multi-threaded tokio runtime. When the job is
/// `restartable`, progress is checkpointed per chunk and a later run resumes
/// after the last committed chunk; the checkpoint is cleared once the job
/// succeeds.
///
/// # Errors
///
/// - `BatchError::Configuration` / `BatchError::Io` before any item is read
/// - `BatchError::Step` when the step failed; its `source` is the
///   `BatchError::ItemReader` (parse) or `BatchError::ItemWriter` (write)
///   error. The chunks committed before the failure stay in the table
pub fn run_product_import(
    config: &JobConfig,
    pool: &Pool<Sqlite>,
) -> Result<JobExecution, BatchError> {
    config.validate()?;

    let reader = CsvItemReaderBuilder::new()
        .delimiter(config.delimiter_byte()?)
        .has_headers(config.has_headers)
        .comment(config.comment_byte()?)
        .names(&PRODUCT_FIELDS)
        .from_path(&config.input_path)?;

    let processor = DiscountProcessor::new(config.discount_percent);

    let checkpoint = ChunkCheckpoint::new(pool, &config.step_name);
    let already_committed = if config.restartable {
        checkpoint.initialize()?;
        checkpoint.load()?
    } else {
        0
    };

    let mut writer = SqliteItemWriterBuilder::<Product>::new()
        .pool(pool)
        .sql(&config.insert_sql);
    if config.restartable {
        writer = writer.checkpoint(&checkpoint, already_committed);
    }
    let writer = writer.build()?;

    let step: StepInstance<Product, Product> = StepBuilder::new()
        .name(config.step_name.clone())
        .reader(&reader)
        .processor(&processor)
        .writer(&writer)
        .chunk(config.chunk_size)
        .start_after(already_committed)
        .build()?;

    let job = JobBuilder::new()
        .name(config.job_name.clone())
        .start(&step)
        .build();

    info!(
        "Importing {} into {} (chunk size {})",
        config.input_path.display(),
        config.database_url,
        config.chunk_size
    );
    let execution = job.run()?;

    if config.restartable {
        checkpoint.reset()?;
    }

    Ok(execution)
}
