use log::{debug, info};
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::BatchError;

use super::block_on;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS batch_step_checkpoint (
    step_name TEXT PRIMARY KEY,
    committed_items INTEGER NOT NULL
)";

const SELECT_COMMITTED: &str =
    "SELECT committed_items FROM batch_step_checkpoint WHERE step_name = ?";

const UPSERT_COMMITTED: &str = "INSERT INTO batch_step_checkpoint (step_name, committed_items) VALUES (?, ?)
    ON CONFLICT(step_name) DO UPDATE SET committed_items = excluded.committed_items";

const DELETE_COMMITTED: &str = "DELETE FROM batch_step_checkpoint WHERE step_name = ?";

/// Number of items a step has committed so far, stored next to the data.
///
/// The row is updated inside each chunk's transaction, so it always matches
/// what is actually in the target table. A restarted step reads it and
/// discards that many items before its first chunk.
pub struct ChunkCheckpoint<'a> {
    pool: &'a Pool<Sqlite>,
    step_name: String,
}

impl<'a> ChunkCheckpoint<'a> {
    pub fn new(pool: &'a Pool<Sqlite>, step_name: &str) -> Self {
        Self {
            pool,
            step_name: step_name.to_string(),
        }
    }

    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// Creates the checkpoint table if needed.
    pub fn initialize(&self) -> Result<(), BatchError> {
        block_on(sqlx::query(CREATE_TABLE).execute(self.pool))?.map_err(checkpoint_error)?;
        Ok(())
    }

    /// Items committed by a previous run of this step, 0 if none.
    pub fn load(&self) -> Result<usize, BatchError> {
        let committed: Option<i64> = block_on(
            sqlx::query_scalar::<_, i64>(SELECT_COMMITTED)
                .bind(self.step_name.as_str())
                .fetch_optional(self.pool),
        )?
        .map_err(checkpoint_error)?;

        let committed = committed.unwrap_or(0).max(0) as usize;
        if committed > 0 {
            info!(
                "Step {} restarts after {} committed items",
                self.step_name, committed
            );
        }
        Ok(committed)
    }

    /// Forgets the progress of this step, once it has completed.
    pub fn reset(&self) -> Result<(), BatchError> {
        block_on(
            sqlx::query(DELETE_COMMITTED)
                .bind(self.step_name.as_str())
                .execute(self.pool),
        )?
        .map_err(checkpoint_error)?;
        debug!("Checkpoint of step {} cleared", self.step_name);
        Ok(())
    }

    /// Records `committed` on the chunk's own connection, inside its transaction.
    pub(crate) async fn save(
        &self,
        connection: &mut SqliteConnection,
        committed: usize,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(UPSERT_COMMITTED)
            .bind(self.step_name.as_str())
            .bind(committed as i64)
            .execute(connection)
            .await?;
        Ok(())
    }
}

fn checkpoint_error(error: sqlx::Error) -> BatchError {
    BatchError::ItemWriter(format!("checkpoint failed: {}", error))
}
