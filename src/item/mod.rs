#[cfg(feature = "csv")]
/// This module provides a CSV item reader.
pub mod csv;

#[cfg(feature = "rdbc-sqlite")]
/// This module provides RDBC (SQLite) item writers and the chunk checkpoint.
pub mod rdbc;
