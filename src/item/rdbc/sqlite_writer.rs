use std::cell::Cell;

use log::{debug, error};
use serde::Serialize;
use sqlx::{
    Pool, Sqlite,
    query::Query,
    sqlite::{SqliteArguments, SqliteConnection},
};

use crate::core::item::{ItemWriter, ItemWriterResult};
use crate::BatchError;

use super::{
    block_on,
    checkpoint::ChunkCheckpoint,
    named_sql::NamedSql,
    parameter_source::{ItemSqlParameterSource, SerdeParameterSource, SqlValue},
};

static SERDE_PARAMETER_SOURCE: SerdeParameterSource = SerdeParameterSource;

/// A writer inserting items into a SQLite database using SQLx.
///
/// Each call to `write` is one transaction: the statement is executed once
/// per item, in order, and the transaction is committed only if every
/// statement succeeded. On any failure the transaction is dropped without
/// commit, which rolls it back, and `BatchError::ItemWriter` is returned.
///
/// Statement parameters are named (`:id`, `:price`, ...) and their values are
/// looked up by property name on each item.
///
/// # Examples
///
/// ```no_run
/// use product_batch::core::item::ItemWriter;
/// use product_batch::item::rdbc::SqliteItemWriterBuilder;
/// use product_batch::model::Product;
/// use sqlx::SqlitePool;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = SqlitePool::connect("sqlite://products.db").await?;
///
/// let writer = SqliteItemWriterBuilder::<Product>::new()
///     .pool(&pool)
///     .sql("insert into Product (id,name,description,price) values (:id,:name,:description,:price)")
///     .build()?;
///
/// let products = vec![Product {
///     id: 1,
///     name: "Widget".to_string(),
///     description: "A small widget".to_string(),
///     price: 90,
/// }];
///
/// writer.write(&products)?;
/// # Ok(())
/// # }
/// ```
pub struct SqliteItemWriter<'a, O> {
    pool: &'a Pool<Sqlite>,
    sql: NamedSql,
    parameter_source: &'a dyn ItemSqlParameterSource<O>,
    checkpoint: Option<&'a ChunkCheckpoint<'a>>,
    /// Items committed by this step, including those of a previous run.
    committed: Cell<usize>,
}

impl<O> SqliteItemWriter<'_, O> {
    pub fn sql(&self) -> &NamedSql {
        &self.sql
    }

    /// Items committed so far, including those of a previous run when restarting.
    pub fn committed(&self) -> usize {
        self.committed.get()
    }

    async fn insert_chunk(&self, rows: Vec<Vec<SqlValue>>) -> Result<usize, sqlx::Error> {
        let mut transaction = self.pool.begin().await?;
        let written = rows.len();

        for row in rows {
            insert_row(&mut *transaction, self.sql.statement(), row).await?;
        }

        if let Some(checkpoint) = self.checkpoint {
            checkpoint
                .save(&mut *transaction, self.committed.get() + written)
                .await?;
        }

        transaction.commit().await?;
        Ok(written)
    }
}

async fn insert_row(
    connection: &mut SqliteConnection,
    statement: &str,
    row: Vec<SqlValue>,
) -> Result<(), sqlx::Error> {
    let mut query = sqlx::query(statement);
    for value in row {
        query = bind_value(query, value);
    }
    query.execute(connection).await?;
    Ok(())
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(None::<i64>),
        SqlValue::Bool(value) => query.bind(value),
        SqlValue::Integer(value) => query.bind(value),
        SqlValue::Real(value) => query.bind(value),
        SqlValue::Text(value) => query.bind(value),
    }
}

impl<O> ItemWriter<O> for SqliteItemWriter<'_, O> {
    /// Writes the chunk in one transaction.
    ///
    /// # Returns
    ///
    /// - `Ok(n)` with the number of inserted items once the transaction committed
    /// - `Err(BatchError::ItemWriter)` on a missing property, a constraint
    ///   violation or any database error; nothing from the chunk is persisted
    fn write(&self, items: &[O]) -> ItemWriterResult {
        if items.is_empty() {
            return Ok(0);
        }

        let rows = items
            .iter()
            .map(|item| self.parameter_source.values(item, self.sql.parameters()))
            .collect::<Result<Vec<_>, _>>()?;

        match block_on(self.insert_chunk(rows))? {
            Ok(written) => {
                self.committed.set(self.committed.get() + written);
                debug!(
                    "Committed {} items ({} in total) with: {}",
                    written,
                    self.committed.get(),
                    self.sql.template()
                );
                Ok(written)
            }
            Err(e) => {
                error!("Failed to write chunk of {} items: {}", items.len(), e);
                Err(BatchError::ItemWriter(format!("SQLite write failed: {}", e)))
            }
        }
    }
}

/// Builder for [`SqliteItemWriter`].
///
/// A pool and either a named statement (`sql`) or a table with its columns
/// are required.
pub struct SqliteItemWriterBuilder<'a, O> {
    pool: Option<&'a Pool<Sqlite>>,
    sql: Option<String>,
    table: Option<&'a str>,
    columns: Vec<&'a str>,
    parameter_source: Option<&'a dyn ItemSqlParameterSource<O>>,
    checkpoint: Option<&'a ChunkCheckpoint<'a>>,
    already_committed: usize,
}

impl<O> Default for SqliteItemWriterBuilder<'_, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, O> SqliteItemWriterBuilder<'a, O> {
    pub fn new() -> Self {
        Self {
            pool: None,
            sql: None,
            table: None,
            columns: Vec::new(),
            parameter_source: None,
            checkpoint: None,
            already_committed: 0,
        }
    }

    pub fn pool(mut self, pool: &'a Pool<Sqlite>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Sets the statement, with `:name` placeholders.
    pub fn sql(mut self, sql: &str) -> Self {
        self.sql = Some(sql.to_string());
        self
    }

    /// Sets the target table; used with `add_column` when no `sql` is given.
    pub fn table(mut self, table: &'a str) -> Self {
        self.table = Some(table);
        self
    }

    pub fn add_column(mut self, column: &'a str) -> Self {
        self.columns.push(column);
        self
    }

    /// Overrides how parameter values are taken from items.
    pub fn parameter_source(mut self, source: &'a dyn ItemSqlParameterSource<O>) -> Self {
        self.parameter_source = Some(source);
        self
    }

    /// Records progress in `checkpoint` inside each chunk's transaction.
    ///
    /// `already_committed` is the count loaded from the checkpoint at startup.
    pub fn checkpoint(mut self, checkpoint: &'a ChunkCheckpoint<'a>, already_committed: usize) -> Self {
        self.checkpoint = Some(checkpoint);
        self.already_committed = already_committed;
        self
    }
}

impl<'a, O: Serialize> SqliteItemWriterBuilder<'a, O> {
    pub fn build(self) -> Result<SqliteItemWriter<'a, O>, BatchError> {
        let pool = self
            .pool
            .ok_or_else(|| BatchError::Configuration("a pool is required".to_string()))?;

        let sql = match (self.sql, self.table) {
            (Some(sql), _) => NamedSql::parse(&sql)?,
            (None, Some(table)) => NamedSql::insert(table, &self.columns)?,
            (None, None) => {
                return Err(BatchError::Configuration(
                    "either a statement or a table name is required".to_string(),
                ));
            }
        };

        Ok(SqliteItemWriter {
            pool,
            sql,
            parameter_source: self.parameter_source.unwrap_or(&SERDE_PARAMETER_SOURCE),
            checkpoint: self.checkpoint,
            committed: Cell::new(self.already_committed),
        })
    }
}
