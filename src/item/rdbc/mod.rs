use std::future::Future;

use tokio::runtime::{Handle, RuntimeFlavor};

use crate::BatchError;

/// Named-parameter statements (`:name` placeholders).
pub mod named_sql;

/// Per-item lookup of statement parameter values.
pub mod parameter_source;

/// Persisted count of committed items, used to restart a failed step.
pub mod checkpoint;

pub mod sqlite_writer;

pub use checkpoint::ChunkCheckpoint;
pub use named_sql::NamedSql;
pub use parameter_source::{ItemSqlParameterSource, SerdeParameterSource, SqlValue};
pub use sqlite_writer::{SqliteItemWriter, SqliteItemWriterBuilder};

/// Runs a database future to completion from synchronous batch code.
///
/// The batch core is synchronous, so database items park the current worker
/// thread while the query runs. This needs a multi-threaded tokio runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, BatchError> {
    let handle = Handle::try_current().map_err(|error| {
        BatchError::Configuration(format!("database items need a tokio runtime: {}", error))
    })?;

    if handle.runtime_flavor() == RuntimeFlavor::CurrentThread {
        return Err(BatchError::Configuration(
            "database items need a multi-threaded tokio runtime".to_string(),
        ));
    }

    Ok(tokio::task::block_in_place(|| handle.block_on(future)))
}
